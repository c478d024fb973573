//! Task payload bytes on the wire.
//!
//! Payloads are opaque and can be large, so they travel as standard base64
//! strings rather than JSON number arrays. Use with
//! `#[serde(with = "crate::payload")]`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_ENGINE;
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&BASE64_ENGINE.encode(bytes))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    BASE64_ENGINE
        .decode(encoded.as_bytes())
        .map_err(serde::de::Error::custom)
}
