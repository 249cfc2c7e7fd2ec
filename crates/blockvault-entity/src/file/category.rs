//! Coarse file type classification by extension.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse type classification stored on every file record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "file_category", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum FileCategory {
    Pdf,
    Doc,
    Video,
    Image,
    Archive,
    Audio,
    Text,
    Spreadsheet,
    Presentation,
    /// Has an extension, but not one in the table.
    Other,
    /// No usable extension.
    Unknown,
}

/// Extension (lowercase, no dot) to category.
const EXTENSION_TABLE: &[(&str, FileCategory)] = &[
    ("pdf", FileCategory::Pdf),
    ("doc", FileCategory::Doc),
    ("docx", FileCategory::Doc),
    ("mp4", FileCategory::Video),
    ("avi", FileCategory::Video),
    ("mov", FileCategory::Video),
    ("mkv", FileCategory::Video),
    ("jpg", FileCategory::Image),
    ("jpeg", FileCategory::Image),
    ("png", FileCategory::Image),
    ("gif", FileCategory::Image),
    ("bmp", FileCategory::Image),
    ("zip", FileCategory::Archive),
    ("rar", FileCategory::Archive),
    ("7z", FileCategory::Archive),
    ("tar", FileCategory::Archive),
    ("gz", FileCategory::Archive),
    ("mp3", FileCategory::Audio),
    ("wav", FileCategory::Audio),
    ("flac", FileCategory::Audio),
    ("txt", FileCategory::Text),
    ("md", FileCategory::Text),
    ("xls", FileCategory::Spreadsheet),
    ("xlsx", FileCategory::Spreadsheet),
    ("csv", FileCategory::Spreadsheet),
    ("ppt", FileCategory::Presentation),
    ("pptx", FileCategory::Presentation),
];

impl FileCategory {
    /// Classify a display name by its extension.
    ///
    /// A leading dot (`.bashrc`) is not an extension.
    pub fn from_filename(filename: &str) -> Self {
        let Some(ext) = extension(filename) else {
            return Self::Unknown;
        };
        Self::from_extension(&ext)
    }

    /// Classify a bare extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.to_ascii_lowercase();
        EXTENSION_TABLE
            .iter()
            .find(|(candidate, _)| *candidate == ext)
            .map(|(_, category)| *category)
            .unwrap_or(Self::Other)
    }

    /// Return the category as its stored uppercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Doc => "DOC",
            Self::Video => "VIDEO",
            Self::Image => "IMAGE",
            Self::Archive => "ARCHIVE",
            Self::Audio => "AUDIO",
            Self::Text => "TEXT",
            Self::Spreadsheet => "SPREADSHEET",
            Self::Presentation => "PRESENTATION",
            Self::Other => "OTHER",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extension of a file name, lowercase, if it has one.
pub fn extension(filename: &str) -> Option<String> {
    let dot = filename.rfind('.')?;
    if dot == 0 || dot + 1 == filename.len() {
        return None;
    }
    Some(filename[dot + 1..].to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_lookup() {
        assert_eq!(FileCategory::from_filename("report.PDF"), FileCategory::Pdf);
        assert_eq!(FileCategory::from_filename("a.b.docx"), FileCategory::Doc);
        assert_eq!(FileCategory::from_filename("clip.mkv"), FileCategory::Video);
        assert_eq!(FileCategory::from_filename("backup.tar.gz"), FileCategory::Archive);
        assert_eq!(FileCategory::from_filename("notes.md"), FileCategory::Text);
        assert_eq!(FileCategory::from_filename("deck.pptx"), FileCategory::Presentation);
    }

    #[test]
    fn test_unlisted_and_missing_extensions() {
        assert_eq!(FileCategory::from_filename("main.rs"), FileCategory::Other);
        assert_eq!(FileCategory::from_filename("Makefile"), FileCategory::Unknown);
        assert_eq!(FileCategory::from_filename(".bashrc"), FileCategory::Unknown);
        assert_eq!(FileCategory::from_filename("trailing."), FileCategory::Unknown);
    }

    #[test]
    fn test_every_table_entry_is_lowercase() {
        for (ext, _) in EXTENSION_TABLE {
            assert_eq!(*ext, ext.to_ascii_lowercase());
        }
    }

    #[test]
    fn test_serde_matches_stored_form() {
        let json = serde_json::to_string(&FileCategory::Spreadsheet).expect("serialize");
        assert_eq!(json, "\"SPREADSHEET\"");
        assert_eq!(FileCategory::Spreadsheet.to_string(), "SPREADSHEET");
    }
}
