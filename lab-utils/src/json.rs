use anyhow::{anyhow, Result};
use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{to_string, to_value, Map, Value};
use std::{
    fs,
    io::{Read, Write},
    path::Path,
};

pub fn dejsonify<'a, T>(json_str: &'a str) -> serde_json::Result<T>
where
    T: Deserialize<'a>,
{
    serde_json::from_str::<T>(json_str)
}

/// Serializes with object keys sorted at every depth.
pub fn jsonify<T>(obj: &T) -> Result<String>
where
    T: Serialize,
{
    Ok(to_string(&jsonify_internal(&to_value(obj)?))?)
}

pub fn jsonify_internal(json_value: &Value) -> Value {
    match json_value {
        Value::Object(obj) => {
            let mut sorted_map = Map::new();
            let mut keys: Vec<&String> = obj.keys().collect();
            keys.sort();
            for key in keys {
                if let Some(value) = obj.get(key) {
                    sorted_map.insert(key.clone(), jsonify_internal(value));
                }
            }
            Value::Object(sorted_map)
        }
        Value::Array(items) => Value::Array(items.iter().map(jsonify_internal).collect()),
        _ => json_value.clone(),
    }
}

pub fn decompress_obj<T>(input: &[u8]) -> Result<T>
where
    T: DeserializeOwned,
{
    let mut decoder = ZlibDecoder::new(input);
    let mut decompressed = String::new();
    decoder.read_to_string(&mut decompressed)?;
    Ok(dejsonify(&decompressed)?)
}

pub fn compress_obj<T>(input: T) -> Result<Vec<u8>>
where
    T: Serialize,
{
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(jsonify(&input)?.as_bytes())?;
    Ok(encoder.finish()?)
}

/// Accepts either an inline JSON string or a path to a `.json` file.
pub fn load_json<T>(input: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    let content = if input.ends_with(".json") {
        fs::read_to_string(input).map_err(|e| anyhow!("Failed to read '{}': {}", input, e))?
    } else {
        input.to_string()
    };
    dejsonify::<T>(&content).map_err(|e| anyhow!("Failed to parse '{}': {}", input, e))
}

/// Reads an object written by [`store_obj`]; `.zlib` files are decompressed.
pub fn load_obj<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned,
{
    let bytes = fs::read(path).map_err(|e| anyhow!("Failed to read '{}': {}", path.display(), e))?;
    if path.extension().map_or(false, |ext| ext == "zlib") {
        decompress_obj(&bytes)
    } else {
        Ok(serde_json::from_slice(&bytes)?)
    }
}

pub fn store_obj<T>(path: &Path, obj: &T, compress: bool) -> Result<()>
where
    T: Serialize,
{
    let bytes = if compress {
        compress_obj(obj)?
    } else {
        jsonify(obj)?.into_bytes()
    };
    fs::write(path, bytes).map_err(|e| anyhow!("Failed to write '{}': {}", path.display(), e))
}
