//! # Result File Codec
//!
//! Bit-exact encoding of the file a worker hands back through the VCH:
//! one ASCII status digit, then the payload bytes, EOF-delimited. For
//! SUCCESS the payload is a UTF-8 JSON document; for the two error
//! statuses it is a UTF-8 diagnostic string. There is no length prefix
//! and no trailing framing.
//!
//! Both the validator and the assimilator decode through this module, so
//! a file either parses identically for both or is rejected by both.

use thiserror::Error;

use crate::proto::v1::ResultStatus;

/// Decode failure for a result file.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("empty result file")]
    Empty,

    #[error("unknown status byte {0:#04x}")]
    UnknownStatusByte(u8),
}

/// Encode a result file: status digit followed by the raw payload.
pub fn encode(status: ResultStatus, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + payload.len());
    out.push(status.to_wire_byte());
    out.extend_from_slice(payload);
    out
}

/// Decode a result file into its status and payload slice.
///
/// Any first byte outside `'0'..='2'` is rejected as corrupted; callers
/// decide whether that means "reject the result" (validator) or "fail the
/// invocation" (assimilator).
pub fn decode(bytes: &[u8]) -> Result<(ResultStatus, &[u8]), CodecError> {
    let (&first, payload) = bytes.split_first().ok_or(CodecError::Empty)?;
    let status = ResultStatus::from_wire_byte(first).ok_or(CodecError::UnknownStatusByte(first))?;
    Ok((status, payload))
}
