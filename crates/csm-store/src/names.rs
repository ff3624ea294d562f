//! Logical name validation.
//!
//! A logical name is the final path element under the sharded directory and
//! is used verbatim, so it must be a single, normal path component:
//! - Must be non-empty
//! - Must not be `.` or `..`
//! - Must not contain `/`, `\` or NUL

use crate::error::{StoreError, StoreResult};

const FORBIDDEN_CHARS: &[char] = &['/', '\\', '\0'];

/// Validate a logical name, returning `Ok(())` if it is a safe file name.
///
/// ```
/// use csm_store::names::validate_name;
///
/// assert!(validate_name("avatar.png").is_ok());
/// assert!(validate_name("").is_err());
/// assert!(validate_name("../etc/passwd").is_err());
/// ```
pub fn validate_name(name: &str) -> StoreResult<()> {
    if name.is_empty() {
        return Err(invalid(name, "name must not be empty"));
    }
    if name == "." || name == ".." {
        return Err(invalid(name, "name must not be '.' or '..'"));
    }
    if let Some(ch) = name.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        return Err(invalid(name, &format!("contains forbidden character: {ch:?}")));
    }
    Ok(())
}

fn invalid(name: &str, reason: &str) -> StoreError {
    StoreError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names_ok() {
        for name in ["1.txt", "avatar.png", ".hidden", "a..b", "with space"] {
            assert!(validate_name(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn traversal_rejected() {
        for name in ["", ".", "..", "a/b", "..\\x", "nul\0"] {
            assert!(validate_name(name).is_err(), "{name:?}");
        }
    }

    #[test]
    fn error_names_the_reason() {
        let err = validate_name("a/b").unwrap_err();
        assert!(err.to_string().contains("forbidden character"));
    }
}
