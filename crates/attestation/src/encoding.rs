//! Fixed-width identifier encoding.
//!
//! Attestation type and source names travel as `bytes32`: the UTF-8 bytes at
//! the start, zero bytes to the right.

use alloy_primitives::B256;
use claim::PipelineError;

/// Encode `name` as a right zero-padded `bytes32`.
pub fn encode_bytes32(name: &str) -> Result<B256, PipelineError> {
    let bytes = name.as_bytes();
    if bytes.len() > 32 {
        return Err(PipelineError::input(format!(
            "identifier {:?} is {} bytes, at most 32 fit in bytes32",
            name,
            bytes.len()
        )));
    }

    let mut out = [0u8; 32];
    out[..bytes.len()].copy_from_slice(bytes);
    Ok(B256::from(out))
}

/// Decode a `bytes32` produced by [`encode_bytes32`], stripping trailing zero bytes.
pub fn decode_bytes32(value: &B256) -> Result<String, PipelineError> {
    let end = value
        .iter()
        .rposition(|b| *b != 0)
        .map_or(0, |i| i + 1);

    String::from_utf8(value[..end].to_vec())
        .map_err(|e| PipelineError::input(format!("bytes32 is not UTF-8: {}", e)))
}
