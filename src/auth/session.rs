use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};

/// Raw entropy per session key: 256 bits.
pub const SESSION_KEY_BYTES: usize = 32;

/// Mint a fresh session key from the OS RNG, URL-safe and unpadded.
pub fn issue() -> String {
    let mut bytes = [0u8; SESSION_KEY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    Base64UrlUnpadded::encode_string(&bytes)
}

/// Replace a session key with an unrelated fresh one. The new key is never
/// derived from the old; the argument only names the credential being retired.
pub fn rotate(_current: &str) -> String {
    issue()
}

/// Structural check only: does this look like a key we could have issued?
/// Whether it belongs to a live session is decided against the store.
pub fn is_well_formed(key: &str) -> bool {
    let mut buf = [0u8; SESSION_KEY_BYTES];
    matches!(Base64UrlUnpadded::decode(key, &mut buf), Ok(decoded) if decoded.len() == SESSION_KEY_BYTES)
}
