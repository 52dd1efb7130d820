//! Benchmark utilities.

use rand::Rng;
use zentry_codec::LogicalKey;

/// Generate random payload bytes of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Generate `count` distinct conversion-pair keys.
pub fn generate_keys(count: usize) -> Vec<LogicalKey> {
    (0..count)
        .filter_map(|i| LogicalKey::new(format!("SYS{i} -> IDR")).ok())
        .collect()
}

/// Generate keys paired with random payloads of the specified size.
pub fn generate_facts(count: usize, payload_size: usize) -> Vec<(LogicalKey, Vec<u8>)> {
    generate_keys(count)
        .into_iter()
        .map(|key| (key, random_data(payload_size)))
        .collect()
}
