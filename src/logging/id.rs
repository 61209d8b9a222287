//! Invocation id generation.

use rand::Rng;
use std::time::{SystemTime, UNIX_EPOCH};

const HEX: &[u8; 16] = b"0123456789abcdef";

/// Generate an invocation id: hex microsecond timestamp plus `padding` random hex chars.
pub fn generate_invocation_id(padding: usize) -> String {
    let micros = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_micros())
        .unwrap_or_default();

    let mut id = format!("{:x}", micros);
    let mut rng = rand::thread_rng();
    id.extend((0..padding).map(|_| HEX[rng.gen_range(0..HEX.len())] as char));
    id
}
