use rand::rngs::OsRng;
use rand::RngCore;

/// Raw entropy behind every opaque session token.
pub const SESSION_TOKEN_BYTES: usize = 32;

/// Generate an opaque session token: 256 bits from the OS CSPRNG, hex encoded
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; SESSION_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
