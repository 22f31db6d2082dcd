use base64::{engine::general_purpose, Engine as _};
use rand::{thread_rng, Rng};
use sha2::{Digest, Sha256};

/// Generate a URL-safe invitation token from 32 random bytes.
pub fn generate_invitation_token() -> String {
    let mut token = [0u8; 32];
    thread_rng().fill(&mut token);
    general_purpose::URL_SAFE_NO_PAD.encode(token)
}

/// Only this digest is persisted; the raw token travels out-of-band to the invitee.
pub fn hash_invitation_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.trim().as_bytes());
    format!("{:x}", hasher.finalize())
}
