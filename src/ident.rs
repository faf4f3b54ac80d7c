//! Identifier validation and the SDBM-32 hash.
//!
//! Class, field and prefab names in a save are .NET identifiers. Validating
//! them early is the cheapest way to detect a misaligned stream: a bad
//! length or flag upstream almost always shows up here first as garbage
//! bytes in a name.

use crate::error::{Result, SaveError};

/// Longest accepted identifier. The C# compiler rejects identifiers of 512
/// characters or more (CS0645), so anything at that length means the
/// stream is misaligned rather than the game writing a real name.
const MAX_IDENTIFIER_LEN: usize = 511;

/// Validate a .NET identifier name read from the stream.
///
/// Rejects null, empty, over-long names and names containing control
/// characters (0x00-0x1F). Returns the name unchanged on success.
pub fn validate_identifier(name: Option<String>) -> Result<String> {
    let name = name.ok_or_else(|| {
        SaveError::corruption("a .NET identifier name must not be null or zero length")
    })?;
    if name.is_empty() {
        return Err(SaveError::corruption(
            "a .NET identifier name must not be null or zero length",
        ));
    }
    if name.chars().count() > MAX_IDENTIFIER_LEN {
        return Err(SaveError::corruption(format!(
            "a .NET identifier name exceeded {MAX_IDENTIFIER_LEN} characters, \
             which most likely indicates a misaligned stream"
        )));
    }
    if name.chars().any(|c| (c as u32) < 0x20) {
        return Err(SaveError::corruption(
            "a .NET identifier name contains control characters, \
             which most likely indicates a misaligned stream",
        ));
    }
    Ok(name)
}

/// Lower-cased SDBM-32 hash, as used by the game's `HashedString`.
///
/// Values of this hash appear throughout save data for element names,
/// traits and similar. The fold is `h = c + (h << 6) + (h << 16) - h`,
/// truncated to signed 32 bits after every character.
pub fn sdbm32_lower(s: &str) -> i32 {
    let mut hash: i32 = 0;
    for c in s.to_lowercase().chars() {
        hash = (c as i32)
            .wrapping_add(hash.wrapping_shl(6))
            .wrapping_add(hash.wrapping_shl(16))
            .wrapping_sub(hash);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers_pass_through() {
        for name in ["Minion", "Klei.SaveFileRoot", "Game+Settings", "a"] {
            assert_eq!(
                validate_identifier(Some(name.to_string())).unwrap(),
                name
            );
        }
    }

    #[test]
    fn test_null_and_empty_rejected() {
        assert!(validate_identifier(None).is_err());
        assert!(validate_identifier(Some(String::new())).is_err());
    }

    #[test]
    fn test_overlong_rejected() {
        assert!(validate_identifier(Some("x".repeat(511))).is_ok());
        assert!(validate_identifier(Some("x".repeat(512))).is_err());
    }

    #[test]
    fn test_control_characters_rejected() {
        assert!(validate_identifier(Some("bad\x00name".to_string())).is_err());
        assert!(validate_identifier(Some("bad\x1fname".to_string())).is_err());
        assert!(validate_identifier(Some("tab\tname".to_string())).is_err());
    }

    #[test]
    fn test_sdbm32_fixtures() {
        assert_eq!(sdbm32_lower(""), 0);
        assert_eq!(sdbm32_lower("test"), 1195757874);
        assert_eq!(sdbm32_lower("minion"), 2129234166);
    }

    #[test]
    fn test_sdbm32_is_case_insensitive() {
        assert_eq!(sdbm32_lower("Minion"), sdbm32_lower("MINION"));
        assert_eq!(sdbm32_lower("Oxygen"), sdbm32_lower("oxygen"));
    }
}
