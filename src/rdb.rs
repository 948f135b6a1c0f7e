//! Minimal snapshot support: the fixed payload streamed during a full
//! resync and the narrow key probe behind KEYS.
//!
//! Nothing here parses a full snapshot. The server never writes one, and the
//! only read path is extracting the single key name a snapshot produced by
//! an external tool stores right after its `0xFB` hash-table-size marker.

/// An empty database snapshot (version 11), hex-encoded. Sent verbatim as
/// the bulk payload following `+FULLRESYNC`.
const EMPTY_SNAPSHOT_HEX: &str = "524544495330303131fa0972656469732d76657205372e322e30fa0a72656469732d62697473c040fa056374696d65c26d08bc65fa08757365642d6d656dc2b0c41000fa08616f662d62617365c000fff06e3bfec0ff5aa2";

const HASH_TABLE_SIZE_MARKER: u8 = 0xFB;

/// Decodes the embedded snapshot into raw bytes.
pub fn empty_snapshot() -> Vec<u8> {
    decode_hex(EMPTY_SNAPSHOT_HEX)
}

// EMPTY_SNAPSHOT_HEX is a compile-time constant with even length and only
// hex digits, so the conversions cannot fail at runtime.
fn decode_hex(hex: &str) -> Vec<u8> {
    hex.as_bytes()
        .chunks(2)
        .map(|pair| u8::from_str_radix(std::str::from_utf8(pair).unwrap(), 16).unwrap())
        .collect()
}

/// Extracts the key name stored after the `0xFB` marker: the marker is
/// followed by the two hash-table sizes and the value-type byte, then a
/// one-byte key length and the key itself.
///
/// Returns `None` when the marker is missing or the layout does not fit,
/// which callers treat the same as an absent snapshot.
pub fn read_snapshot_key(bytes: &[u8]) -> Option<String> {
    let marker = bytes
        .iter()
        .position(|&byte| byte == HASH_TABLE_SIZE_MARKER)?;

    let length = *bytes.get(marker + 4)? as usize;
    let start = marker + 5;
    let key = bytes.get(start..start + length)?;

    String::from_utf8(key.to_vec()).ok()
}
