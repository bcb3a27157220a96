use mime_guess::Mime;
use std::path::Path;

/// Media type detection for crawl candidates.
///
/// `None` means the type could not be determined; such files are never
/// indexed.
#[cfg_attr(test, mockall::automock)]
pub trait ContentTypeDetector: Send + Sync {
    fn detect(&self, path: &Path) -> Option<Mime>;
}

/// Extension-based detection backed by the `mime_guess` tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct MimeGuessDetector;

impl ContentTypeDetector for MimeGuessDetector {
    fn detect(&self, path: &Path) -> Option<Mime> {
        mime_guess::from_path(path).first()
    }
}
