// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Opaque record serialization for argv payloads and on-disk state.
//!
//! JSON wrapped in base64: stable across versions via serde defaults,
//! binary-safe, single-line, and free of shell metacharacters, so encoded
//! records can ride in queue files and process arguments unescaped.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("record encode failed: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("record decode failed: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("payload is not valid utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Encode a record to an opaque single-line string.
pub fn encode<T: Serialize>(value: &T) -> Result<String, CodecError> {
    let json = serde_json::to_vec(value).map_err(CodecError::Encode)?;
    Ok(BASE64.encode(json))
}

/// Decode a record previously produced by [`encode`].
pub fn decode<T: DeserializeOwned>(payload: &str) -> Result<T, CodecError> {
    let json = BASE64.decode(payload.trim())?;
    serde_json::from_slice(&json).map_err(CodecError::Decode)
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
