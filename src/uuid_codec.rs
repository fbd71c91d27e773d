//! UUID codec - conversion between canonical text and packed 16-byte form
//!
//! Encode and decode follow a best-effort normalize contract: input that is
//! not UUID-shaped flows through unchanged in both directions, and neither
//! function ever errors. This keeps re-encoding idempotent and lets callers
//! pass either representation without checking first.

use uuid::Uuid;

/// Generate a new random (v4) UUID
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Pack UUID text into its 16-byte form.
///
/// Input that does not parse as a UUID is returned unchanged.
pub fn encode(value: &[u8]) -> Vec<u8> {
    match std::str::from_utf8(value).ok().and_then(|s| Uuid::try_parse(s).ok()) {
        Some(uuid) => uuid.as_bytes().to_vec(),
        None => value.to_vec(),
    }
}

/// Unpack a 16-byte UUID into canonical hyphenated text.
///
/// Input that already reads as UUID text is returned unchanged; input that
/// is neither UUID text nor 16 bytes long passes through lossily.
pub fn decode(value: &[u8]) -> String {
    if let Ok(text) = std::str::from_utf8(value) {
        if Uuid::try_parse(text).is_ok() {
            return text.to_string();
        }
    }

    match <[u8; 16]>::try_from(value) {
        Ok(bytes) => Uuid::from_bytes(bytes).hyphenated().to_string(),
        Err(_) => String::from_utf8_lossy(value).into_owned(),
    }
}
