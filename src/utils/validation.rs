use std::path::Path;
use uuid::Uuid;

/// Longest filename accepted, in bytes
pub const MAX_FILENAME_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Share ids are UUIDs; anything else is rejected before touching a store.
pub fn validate_share_id(id: &str) -> Result<String, ValidationError> {
    Uuid::parse_str(id.trim())
        .map(|u| u.to_string())
        .map_err(|_| ValidationError {
            code: "INVALID_ID",
            message: "Invalid share ID format".to_string(),
        })
}

/// Validates the declared size against the configured maximum
pub fn validate_file_size(size: i64, max_size: u64) -> Result<(), ValidationError> {
    if size < 0 {
        return Err(ValidationError {
            code: "INVALID_SIZE",
            message: "File size cannot be negative".to_string(),
        });
    }
    if size as u64 > max_size {
        return Err(ValidationError {
            code: "FILE_TOO_LARGE",
            message: format!(
                "File size {} bytes exceeds maximum allowed {} bytes ({} MB)",
                size,
                max_size,
                max_size / 1024 / 1024
            ),
        });
    }
    Ok(())
}

/// Link lifetime must be positive and no longer than `max_hours`
pub fn validate_ttl(ttl: chrono::Duration, max_hours: i64) -> Result<(), ValidationError> {
    if ttl <= chrono::Duration::zero() {
        return Err(ValidationError {
            code: "INVALID_TTL",
            message: "Expiry must be positive".to_string(),
        });
    }
    // A bound too large to represent is no bound at all
    let exceeds = chrono::Duration::try_hours(max_hours).is_some_and(|max| ttl > max);
    if exceeds {
        return Err(ValidationError {
            code: "INVALID_TTL",
            message: format!("Expiry cannot exceed {} hours", max_hours),
        });
    }
    Ok(())
}

/// Sanitizes filename to prevent path traversal and key injection.
/// The result is safe to embed in a storage path.
pub fn sanitize_filename(filename: &str) -> Result<String, ValidationError> {
    // Normalise separators so Windows-style paths lose their directories too
    let normalised = filename.replace('\\', "/");
    let name = Path::new(&normalised)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .trim();

    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        tracing::warn!("Path components stripped from filename: {}", filename);
    }

    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_control()
                || c == ':'
                || c == '*'
                || c == '?'
                || c == '"'
                || c == '<'
                || c == '>'
                || c == '|'
                || c == ';'
                || c == '#'
                || c == '%'
            {
                '_'
            } else {
                c
            }
        })
        .collect();

    if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
        return Err(ValidationError {
            code: "INVALID_FILENAME",
            message: "Filename cannot be empty".to_string(),
        });
    }

    // Limit length safely for UTF-8
    let sanitized = if sanitized.len() > MAX_FILENAME_LEN {
        let mut end = MAX_FILENAME_LEN;
        while !sanitized.is_char_boundary(end) {
            end -= 1;
        }
        sanitized[..end].to_string()
    } else {
        sanitized
    };

    Ok(sanitized)
}

/// Rejects obviously malformed MIME types; content is never sniffed
pub fn validate_mime_type(mime_type: &str) -> Result<String, ValidationError> {
    let normalized = mime_type.trim().to_lowercase();
    if normalized.is_empty() {
        return Ok("application/octet-stream".to_string());
    }
    if normalized.parse::<mime::Mime>().is_err() {
        return Err(ValidationError {
            code: "INVALID_MIME_TYPE",
            message: format!("MIME type '{}' is not valid", mime_type),
        });
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_share_id() {
        let id = Uuid::new_v4().to_string();
        assert_eq!(validate_share_id(&id).unwrap(), id);
        assert_eq!(
            validate_share_id(&id.to_uppercase()).unwrap(),
            id
        );
        assert!(validate_share_id("not-a-uuid").is_err());
        assert!(validate_share_id("").is_err());
        assert!(validate_share_id("../etc/passwd").is_err());
    }

    #[test]
    fn test_validate_file_size() {
        assert!(validate_file_size(10, 100).is_ok());
        assert!(validate_file_size(100, 100).is_ok());
        assert!(validate_file_size(0, 100).is_ok());
        assert_eq!(
            validate_file_size(101, 100).unwrap_err().code,
            "FILE_TOO_LARGE"
        );
        assert_eq!(validate_file_size(-1, 100).unwrap_err().code, "INVALID_SIZE");
    }

    #[test]
    fn test_validate_ttl() {
        assert!(validate_ttl(chrono::Duration::hours(1), 168).is_ok());
        assert!(validate_ttl(chrono::Duration::hours(168), 168).is_ok());
        assert!(validate_ttl(chrono::Duration::hours(169), 168).is_err());
        assert!(validate_ttl(chrono::Duration::zero(), 168).is_err());
        assert!(validate_ttl(chrono::Duration::seconds(-5), 168).is_err());
        assert!(validate_ttl(chrono::Duration::hours(1_000_000), i64::MAX).is_ok());
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("a.txt").unwrap(), "a.txt");
        assert_eq!(sanitize_filename("my file.doc").unwrap(), "my file.doc");
        assert_eq!(
            sanitize_filename("test<script>.pdf").unwrap(),
            "test_script_.pdf"
        );
        assert_eq!(sanitize_filename("测试.txt").unwrap(), "测试.txt");

        // Path traversal
        assert_eq!(sanitize_filename("../../../etc/passwd").unwrap(), "passwd");
        assert_eq!(
            sanitize_filename("..\\..\\windows\\system32").unwrap(),
            "system32"
        );

        assert!(sanitize_filename("").is_err());
        assert!(sanitize_filename("   ").is_err());
        assert!(sanitize_filename("..").is_err());
        assert_eq!(sanitize_filename("dir/").unwrap(), "dir");
    }

    #[test]
    fn test_sanitize_filename_truncates_on_char_boundary() {
        let long = "é".repeat(200);
        let sanitized = sanitize_filename(&long).unwrap();
        assert!(sanitized.len() <= MAX_FILENAME_LEN);
        assert!(sanitized.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_validate_mime_type() {
        assert_eq!(validate_mime_type("text/plain").unwrap(), "text/plain");
        assert_eq!(validate_mime_type("Image/PNG").unwrap(), "image/png");
        assert_eq!(
            validate_mime_type("").unwrap(),
            "application/octet-stream"
        );
        assert!(validate_mime_type("not a mime").is_err());
    }
}
