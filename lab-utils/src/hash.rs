pub fn u8s_from_str(input: &str) -> [u8; 32] {
    blake3::hash(input.as_bytes()).into()
}

/// Derives a 64-bit seed from an arbitrary label, e.g. `"observe"`.
pub fn seed_from_str(input: &str) -> u64 {
    let u8s = u8s_from_str(input);
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&u8s[..8]);
    u64::from_le_bytes(bytes)
}

/// Parses a seed given either as an integer (decimal or `0x` hex) or as a label.
pub fn parse_seed(input: &str) -> u64 {
    let input = input.trim();
    if let Some(hex) = input.strip_prefix("0x") {
        if let Ok(seed) = u64::from_str_radix(hex, 16) {
            return seed;
        }
    }
    input.parse::<u64>().unwrap_or_else(|_| seed_from_str(input))
}
