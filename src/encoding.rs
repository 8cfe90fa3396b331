// Base64 helpers for file bodies sent to and received from the contents API.

use std::fs;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::Result;

/// Read a file from disk and encode its bytes.
pub fn encode_file(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    Ok(STANDARD.encode(bytes))
}

pub fn encode(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

/// Decode API-supplied base64 into text.
/// The API wraps encoded content at 60 columns, so whitespace is skipped.
pub fn decode(encoded: &str) -> Result<String> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD.decode(compact)?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HubError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_encode() {
        assert_eq!(encode("hello world"), "aGVsbG8gd29ybGQ=");
    }

    #[test]
    fn test_decode_wrapped_content() {
        let decoded = decode("aGVsbG8g\nd29y\nbGQ=\n").unwrap();
        assert_eq!(decoded, "hello world");
    }

    #[test]
    fn test_decode_invalid() {
        assert!(matches!(decode("not base64!"), Err(HubError::Base64(_))));
    }

    #[test]
    fn test_decode_invalid_utf8() {
        assert!(matches!(decode("/w=="), Err(HubError::Utf8(_))));
    }

    #[test]
    fn test_encode_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# Notes").unwrap();

        let encoded = encode_file(file.path()).unwrap();
        assert_eq!(decode(&encoded).unwrap(), "# Notes\n");
    }

    #[test]
    fn test_encode_missing_file() {
        let result = encode_file(Path::new("/nonexistent/hubfile/source.txt"));
        assert!(matches!(result, Err(HubError::Io(_))));
    }
}
