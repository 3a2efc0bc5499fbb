// ============================
// crates/backend-lib/src/auth/token_generator.rs
// ============================
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
/** Secure random value generation
This module provides cryptographically secure random values
for CSRF tokens and the memory provider's opaque credentials. */
use rand::RngCore;

/// Default token size in bytes (32 bytes = 256 bits of entropy)
const DEFAULT_TOKEN_BYTES: usize = 32;

/// Length of an encoded default-size token: 32 bytes in unpadded base64
pub const DEFAULT_TOKEN_LEN: usize = 43;

/** Generate a cryptographically secure random token
This uses the thread-local CSPRNG (reseeded from OS entropy) to create
a random token suitable for CSRF values.
# Returns
A base64 URL-safe encoded string without padding */
pub fn generate_secure_token() -> String {
    generate_secure_token_with_size(DEFAULT_TOKEN_BYTES)
}

/** Generate a cryptographically secure random token with specified size
# Arguments
* `bytes` - The size of the random token in bytes
# Returns
A base64 URL-safe encoded string without padding */
pub fn generate_secure_token_with_size(bytes: usize) -> String {
    let mut buffer = vec![0u8; bytes];
    rand::rng().fill_bytes(&mut buffer);
    URL_SAFE_NO_PAD.encode(buffer)
}

/// True when `value` has the shape of a default-size token
pub fn is_well_formed_token(value: &str) -> bool {
    value.len() == DEFAULT_TOKEN_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
