//! Content-addressed request fingerprints.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Deterministic cache key derived from request content.
///
/// The hash covers the prompt, every parameter (in order) and the blake3
/// digest of the reference image when one is given. Each field is length
/// prefixed, so `("ab", "c")` and `("a", "bc")` never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestFingerprint(String);

impl RequestFingerprint {
    pub fn new(prompt: &str, params: &[&str], reference: Option<&[u8]>) -> Self {
        let mut hasher = blake3::Hasher::new();
        field(&mut hasher, b"prompt", prompt.as_bytes());
        for param in params {
            field(&mut hasher, b"param", param.as_bytes());
        }
        match reference {
            Some(bytes) => field(&mut hasher, b"reference", blake3::hash(bytes).as_bytes()),
            None => field(&mut hasher, b"reference", &[]),
        }
        Self(hasher.finalize().to_hex().to_string())
    }

    /// Fingerprint for an image generation request.
    pub fn for_image(prompt: &str, aspect_ratio: &str, reference: Option<&str>) -> Self {
        Self::new(prompt, &[aspect_ratio], reference.map(str::as_bytes))
    }

    /// Rebuild from a stored hex digest.
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn field(hasher: &mut blake3::Hasher, tag: &[u8], bytes: &[u8]) {
    hasher.update(tag);
    hasher.update(&(bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}
