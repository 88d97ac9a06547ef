// file: src/utils/validation.rs
// description: data validation utilities and helpers
// reference: https://cloud.google.com/storage/docs/buckets#naming

use crate::error::{HarvestError, Result};

pub struct Validator;

impl Validator {
    /// Bucket names per the storage service rules: 3 to 63 characters,
    /// lowercase letters, digits, hyphens, underscores and dots, starting
    /// and ending with a letter or digit.
    pub fn validate_bucket_name(name: &str) -> Result<()> {
        if name.len() < 3 || name.len() > 63 {
            return Err(HarvestError::Validation(format!(
                "Invalid bucket name (must be 3-63 characters): {}",
                name
            )));
        }

        let valid_chars = name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'));
        if !valid_chars {
            return Err(HarvestError::Validation(format!(
                "Invalid bucket name (lowercase letters, digits, '-', '_' and '.' only): {}",
                name
            )));
        }

        let edges_ok = name.chars().next().is_some_and(|c| c.is_ascii_alphanumeric())
            && name.chars().last().is_some_and(|c| c.is_ascii_alphanumeric());
        if !edges_ok {
            return Err(HarvestError::Validation(format!(
                "Invalid bucket name (must start and end with a letter or digit): {}",
                name
            )));
        }

        Ok(())
    }

    /// Object names: non-empty, at most 1024 bytes, no newlines and no
    /// leading slash. A leading slash is legal server-side but produces
    /// paths every downstream tool mishandles.
    pub fn validate_object_name(name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(HarvestError::Validation(
                "Object name must not be empty".to_string(),
            ));
        }

        if name.len() > 1024 {
            return Err(HarvestError::Validation(format!(
                "Object name too long ({} bytes, max 1024)",
                name.len()
            )));
        }

        if name.contains('\r') || name.contains('\n') {
            return Err(HarvestError::Validation(
                "Object name must not contain line breaks".to_string(),
            ));
        }

        if name.starts_with('/') {
            return Err(HarvestError::Validation(format!(
                "Object name must not start with '/': {}",
                name
            )));
        }

        if name == "." || name == ".." {
            return Err(HarvestError::Validation(format!(
                "Invalid object name: {}",
                name
            )));
        }

        Ok(())
    }

    /// Listing prefixes follow the same rules as object names.
    pub fn validate_prefix(prefix: &str) -> Result<()> {
        if prefix.is_empty() {
            return Err(HarvestError::Validation(
                "Prefix must not be empty".to_string(),
            ));
        }
        Self::validate_object_name(prefix)
    }

    /// Display names for managed ML resources: 1 to 128 characters.
    pub fn validate_display_name(name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(HarvestError::Validation(
                "Display name must not be empty".to_string(),
            ));
        }

        if name.chars().count() > 128 {
            return Err(HarvestError::Validation(format!(
                "Display name too long (max 128 characters): {}",
                name
            )));
        }

        Ok(())
    }

    /// Truncate for log output. OCR text is arbitrary Unicode, so the cut
    /// backs up to the nearest character boundary.
    pub fn truncate_text(text: &str, max_length: usize) -> String {
        if text.len() <= max_length {
            return text.to_string();
        }
        let mut end = max_length;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &text[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_bucket_name() {
        assert!(Validator::validate_bucket_name("my-bucket").is_ok());
        assert!(Validator::validate_bucket_name("bucket.with.dots").is_ok());
        assert!(Validator::validate_bucket_name("b_1").is_ok());

        assert!(Validator::validate_bucket_name("ab").is_err());
        assert!(Validator::validate_bucket_name("MY-BUCKET").is_err());
        assert!(Validator::validate_bucket_name("-leading-dash").is_err());
        assert!(Validator::validate_bucket_name("trailing-dash-").is_err());
        assert!(Validator::validate_bucket_name(&"x".repeat(64)).is_err());
    }

    #[test]
    fn test_validate_object_name() {
        assert!(Validator::validate_object_name("images/photo.jpg").is_ok());
        assert!(Validator::validate_object_name("a").is_ok());

        assert!(Validator::validate_object_name("").is_err());
        assert!(Validator::validate_object_name("/leading/slash").is_err());
        assert!(Validator::validate_object_name("line\nbreak").is_err());
        assert!(Validator::validate_object_name(".").is_err());
        assert!(Validator::validate_object_name(&"x".repeat(1025)).is_err());
    }

    #[test]
    fn test_validate_prefix() {
        assert!(Validator::validate_prefix("images/").is_ok());
        assert!(Validator::validate_prefix("predictions").is_ok());

        assert!(Validator::validate_prefix("").is_err());
        assert!(Validator::validate_prefix("/images/").is_err());
    }

    #[test]
    fn test_validate_display_name() {
        assert!(Validator::validate_display_name("diagram_dataset_1").is_ok());

        assert!(Validator::validate_display_name("").is_err());
        assert!(Validator::validate_display_name(&"x".repeat(129)).is_err());
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(Validator::truncate_text("short", 10), "short");
        assert_eq!(
            Validator::truncate_text("this is a very long text", 10),
            "this is a ..."
        );
    }

    #[test]
    fn test_truncate_text_respects_char_boundaries() {
        // "→" is three bytes; a cut at 2 lands mid-character and backs up.
        assert_eq!(Validator::truncate_text("a→b→c", 2), "a...");
        assert_eq!(Validator::truncate_text("a→b→c", 4), "a→...");
    }
}
