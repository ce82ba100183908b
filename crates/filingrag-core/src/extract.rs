//! Per-page text extraction for corpus files.
//!
//! PDFs go through the `pdftotext` system binary (poppler), which marks page
//! breaks with form feeds. Plain-text files are read directly and split on
//! the same form-feed convention, so fixtures can carry page breaks too.

use std::path::Path;
use std::process::Command;

use anyhow::{anyhow, Context, Result};

use crate::traits::PageExtractor;

/// Extracts ordered page texts from `.pdf` and plain-text files.
#[derive(Debug, Default)]
pub struct FileExtractor;

impl FileExtractor {
    pub fn new() -> Self {
        Self
    }

    fn extract_pdf(&self, path: &Path) -> Result<String> {
        let output = Command::new("pdftotext")
            .arg("-layout")
            .arg("-enc")
            .arg("UTF-8")
            .arg(path)
            .arg("-")
            .output()
            .with_context(|| {
                format!(
                    "failed to run pdftotext for {} (is poppler installed?)",
                    path.display()
                )
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("pdftotext failed for {}: {}", path.display(), stderr));
        }
        let text = String::from_utf8_lossy(&output.stdout).to_string();
        if text.trim().is_empty() {
            return Err(anyhow!("pdftotext produced no text for {}", path.display()));
        }
        Ok(text)
    }

    fn read_text(&self, path: &Path) -> Result<String> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(content),
            Err(_) => Ok(String::from_utf8_lossy(&std::fs::read(path)?).to_string()),
        }
    }
}

impl PageExtractor for FileExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>> {
        let raw = if path.extension().and_then(|s| s.to_str()) == Some("pdf") {
            self.extract_pdf(path)?
        } else {
            self.read_text(path)?
        };
        let mut pages: Vec<String> = raw.split('\u{c}').map(str::to_string).collect();
        // pdftotext ends output with a form feed; drop the empty tail page.
        while pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
            pages.pop();
        }
        Ok(pages)
    }
}
