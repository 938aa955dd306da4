use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Semantic kind of a file, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Markdown,
    Pdf,
    Xfdf,
    Image,
    Other,
}

const EXTENSION_KINDS: &[(&str, FileType)] = &[
    ("md", FileType::Markdown),
    ("markdown", FileType::Markdown),
    ("pdf", FileType::Pdf),
    ("xfdf", FileType::Xfdf),
    ("png", FileType::Image),
    ("jpg", FileType::Image),
    ("jpeg", FileType::Image),
    ("gif", FileType::Image),
    ("webp", FileType::Image),
    ("bmp", FileType::Image),
    ("svg", FileType::Image),
    ("tif", FileType::Image),
    ("tiff", FileType::Image),
];

impl FileType {
    pub fn from_extension(extension: &str) -> Self {
        let extension = extension.to_ascii_lowercase();
        EXTENSION_KINDS
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map(|(_, kind)| *kind)
            .unwrap_or(FileType::Other)
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(FileType::Other)
    }

    /// Kinds whose raw contents are served inline by the file API.
    pub fn is_text(self) -> bool {
        matches!(self, FileType::Markdown | FileType::Xfdf)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileType::Markdown => "markdown",
            FileType::Pdf => "pdf",
            FileType::Xfdf => "xfdf",
            FileType::Image => "image",
            FileType::Other => "other",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One file found by a scan. Built fresh on every pass and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    pub path: PathBuf,
    pub identity: String,
    pub content_hash: String,
    pub file_type: FileType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_extensions() {
        assert_eq!(FileType::from_extension("md"), FileType::Markdown);
        assert_eq!(FileType::from_extension("MD"), FileType::Markdown);
        assert_eq!(FileType::from_extension("pdf"), FileType::Pdf);
        assert_eq!(FileType::from_extension("xfdf"), FileType::Xfdf);
        assert_eq!(FileType::from_extension("JPG"), FileType::Image);
        assert_eq!(FileType::from_extension("zip"), FileType::Other);
    }

    #[test]
    fn test_from_path_without_extension() {
        assert_eq!(FileType::from_path(Path::new("/notes/README")), FileType::Other);
        assert_eq!(FileType::from_path(Path::new("/notes/a.markdown")), FileType::Markdown);
    }

    #[test]
    fn test_text_kinds() {
        assert!(FileType::Markdown.is_text());
        assert!(FileType::Xfdf.is_text());
        assert!(!FileType::Pdf.is_text());
        assert!(!FileType::Image.is_text());
    }

    #[test]
    fn test_serializes_lowercase() {
        let json = serde_json::to_string(&FileType::Markdown).unwrap();
        assert_eq!(json, "\"markdown\"");
        assert_eq!(FileType::Image.to_string(), "image");
    }
}
