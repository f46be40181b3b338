//! Repository path normalisation.

use crate::{RepoDriveError, Result};

/// Maximum accepted path length in bytes.
pub const MAX_PATH_LENGTH: usize = 1024;

/// Normalise a client-supplied repository path.
///
/// Leading, trailing and repeated slashes are dropped, so `"/storage//docs/"`
/// becomes `"storage/docs"` and `"/"` becomes the repository root `""`.
/// Relative segments (`.` and `..`) and control characters are rejected.
pub fn normalize_path(raw: &str) -> Result<String> {
    if raw.len() > MAX_PATH_LENGTH {
        return Err(RepoDriveError::Validation(format!(
            "path too long: {} bytes (max {})",
            raw.len(),
            MAX_PATH_LENGTH
        )));
    }
    if raw.chars().any(|c| c.is_control()) {
        return Err(RepoDriveError::Validation(
            "path must not contain control characters".to_string(),
        ));
    }

    let mut segments = Vec::new();
    for segment in raw.split('/').filter(|s| !s.is_empty()) {
        if segment == "." || segment == ".." {
            return Err(RepoDriveError::Validation(format!(
                "relative segment '{}' is not allowed in path",
                segment
            )));
        }
        segments.push(segment);
    }

    Ok(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_plain() {
        assert_eq!(normalize_path("storage/a.txt").unwrap(), "storage/a.txt");
    }

    #[test]
    fn test_normalize_slashes() {
        assert_eq!(normalize_path("/storage//docs/").unwrap(), "storage/docs");
        assert_eq!(normalize_path("/").unwrap(), "");
        assert_eq!(normalize_path("").unwrap(), "");
    }

    #[test]
    fn test_normalize_keeps_unicode_and_spaces() {
        assert_eq!(
            normalize_path("storage/my notes/résumé.pdf").unwrap(),
            "storage/my notes/résumé.pdf"
        );
    }

    #[test]
    fn test_normalize_rejects_relative_segments() {
        assert!(matches!(
            normalize_path("storage/../secrets"),
            Err(RepoDriveError::Validation(_))
        ));
        assert!(matches!(
            normalize_path("./storage"),
            Err(RepoDriveError::Validation(_))
        ));
    }

    #[test]
    fn test_normalize_rejects_control_chars() {
        assert!(normalize_path("storage/a\nb").is_err());
        assert!(normalize_path("storage/\0").is_err());
    }

    #[test]
    fn test_normalize_rejects_long_paths() {
        let long = "a/".repeat(MAX_PATH_LENGTH);
        assert!(normalize_path(&long).is_err());
    }
}
