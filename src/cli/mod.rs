//! Command-line interface for taskomat.
//!
//! Argument parsing, configuration discovery, and small helpers shared by
//! the binary's subcommands.

pub mod args;
pub mod config;

pub use args::{Args, Commands, ScriptsAction};
pub use config::{AppConfig, ConfigDiscovery};

use crate::gemini::Attachment;
use anyhow::Context;
use std::path::Path;

/// Read a file into an [`Attachment`], guessing the mime type from its
/// extension.
pub fn load_attachment(path: &Path) -> anyhow::Result<Attachment> {
    let data = std::fs::read(path)
        .with_context(|| format!("failed to read attachment {}", path.display()))?;
    Ok(Attachment {
        mime_type: guess_mime_type(path).to_string(),
        data,
    })
}

/// Mime type for the attachment part, by file extension.
pub fn guess_mime_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        Some("txt") | Some("md") => "text/plain",
        Some("csv") => "text/csv",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn mime_type_follows_the_extension() {
        assert_eq!(guess_mime_type(&PathBuf::from("shot.PNG")), "image/png");
        assert_eq!(guess_mime_type(&PathBuf::from("pic.jpeg")), "image/jpeg");
        assert_eq!(guess_mime_type(&PathBuf::from("doc.pdf")), "application/pdf");
        assert_eq!(
            guess_mime_type(&PathBuf::from("mystery.bin")),
            "application/octet-stream"
        );
        assert_eq!(
            guess_mime_type(&PathBuf::from("no_extension")),
            "application/octet-stream"
        );
    }
}
