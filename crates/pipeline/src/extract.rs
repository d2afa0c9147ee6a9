use async_trait::async_trait;
use docsum_common::{DocsumError, Result};
use std::path::Path;
use tracing::debug;

/// Produces plain text from a source file
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, path: &Path) -> Result<String>;

    fn supports(&self, path: &Path) -> bool;
}

/// UTF-8 plain text and markdown files
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    const EXTENSIONS: [&'static str; 3] = ["txt", "md", "text"];
}

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    async fn extract(&self, path: &Path) -> Result<String> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(DocsumError::extraction_failed(format!(
                "file not found: {}",
                path.display()
            )));
        }
        if !self.supports(path) {
            return Err(DocsumError::extraction_failed(format!(
                "unsupported file extension: {}",
                path.display()
            )));
        }

        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            DocsumError::extraction_failed(format!("cannot read {}: {}", path.display(), e))
        })?;

        debug!("Extracted {} chars from {}", text.len(), path.display());
        Ok(text)
    }

    fn supports(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                Self::EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::{tempdir, TempDir};

    fn temp_file(name: &str, contents: &[u8]) -> (TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[tokio::test]
    async fn test_extracts_text_file() {
        let (_dir, path) = temp_file("notes.txt", "Hallo wereld.".as_bytes());
        let text = PlainTextExtractor.extract(&path).await.unwrap();
        assert_eq!(text, "Hallo wereld.");
    }

    #[tokio::test]
    async fn test_rejects_unsupported_extension() {
        let (_dir, path) = temp_file("report.pdf", b"%PDF-1.4");
        let err = PlainTextExtractor.extract(&path).await.unwrap_err();
        assert!(matches!(err, DocsumError::ExtractionFailed(_)));
        assert!(err.to_string().contains("unsupported file extension"));
    }

    #[tokio::test]
    async fn test_rejects_missing_file() {
        let dir = tempdir().unwrap();
        let err = PlainTextExtractor
            .extract(&dir.path().join("missing.txt"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("file not found"));
    }

    #[tokio::test]
    async fn test_rejects_invalid_utf8() {
        let (_dir, path) = temp_file("broken.md", &[0xff, 0xfe, 0x00, 0x41]);
        let err = PlainTextExtractor.extract(&path).await.unwrap_err();
        assert!(matches!(err, DocsumError::ExtractionFailed(_)));
    }

    #[test]
    fn test_supports_is_case_insensitive() {
        assert!(PlainTextExtractor.supports(Path::new("notes.MD")));
        assert!(!PlainTextExtractor.supports(Path::new("notes")));
    }
}
