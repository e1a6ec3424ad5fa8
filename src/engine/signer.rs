//! Signed path segments for the template service.
//!
//! The template service authorizes `letterman/{sig}/{member}/{template}`
//! requests by recomputing `sha1(secret + ":" + path1 + "/" + path2)` and
//! comparing the first [`SIGNATURE_LEN`] hex characters.

use sha1::{Digest, Sha1};

/// Number of hex characters of the digest kept in a signed path.
pub const SIGNATURE_LEN: usize = 20;

/// Lowercase hex SHA-1 of the UTF-8 bytes of `input`.
fn sha1_hex(input: &str) -> String {
    hex::encode(Sha1::digest(input.as_bytes()))
}

/// Derives secret-bound URL paths.
#[derive(Clone)]
pub struct UrlSigner {
    secret: String,
}

impl std::fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlSigner")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl UrlSigner {
    /// The secret must be non-empty and random; an empty secret still signs
    /// but offers no protection.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Returns `path1/{sig}/path2`.
    pub fn sign(&self, path1: &str, path2: &str) -> String {
        let full = sha1_hex(&format!("{}:{}/{}", self.secret, path1, path2));
        format!("{}/{}/{}", path1, &full[..SIGNATURE_LEN], path2)
    }
}

/// [`UrlSigner::sign`] without keeping a signer around.
pub fn sign(secret: &str, path1: &str, path2: &str) -> String {
    UrlSigner::new(secret).sign(path1, path2)
}

/// Full hex SHA-1 of `session_secret + member_id`, naming the member's
/// project on the compile service.
pub fn project_hash(session_secret: &str, member_id: &str) -> String {
    sha1_hex(&format!("{}{}", session_secret, member_id))
}
