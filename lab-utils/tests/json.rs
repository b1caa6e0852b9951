use lab_utils::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Record {
    name: String,
    values: Vec<f64>,
}

#[test]
fn test_jsonify_sorts_keys() {
    let mut map = HashMap::new();
    map.insert("b", 2);
    map.insert("a", 1);
    map.insert("c", 3);
    assert_eq!(jsonify(&map).unwrap(), r#"{"a":1,"b":2,"c":3}"#);
}

#[test]
fn test_compress_decompress() {
    let record = Record {
        name: "values".to_string(),
        values: vec![0.25, 0.5, 0.75],
    };
    let compressed = compress_obj(&record).unwrap();
    let decompressed: Record = decompress_obj(&compressed).unwrap();
    assert_eq!(record, decompressed);
}

#[test]
fn test_load_json_inline() {
    let record: Record = load_json(r#"{"name": "x", "values": [1.0]}"#).unwrap();
    assert_eq!(record.name, "x");
    assert!(load_json::<Record>("not json").is_err());
    assert!(load_json::<Record>("missing-file.json").is_err());
}

#[test]
fn test_store_and_load_obj() {
    let dir = std::env::temp_dir();
    let record = Record {
        name: "stored".to_string(),
        values: vec![1.0, 2.0],
    };
    for (name, compress) in [("lab-utils-record.json", false), ("lab-utils-record.zlib", true)] {
        let path = dir.join(name);
        store_obj(&path, &record, compress).unwrap();
        let loaded: Record = load_obj(&path).unwrap();
        assert_eq!(record, loaded);
        let _ = std::fs::remove_file(&path);
    }
}
