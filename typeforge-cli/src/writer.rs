//! Output of schema documents, with dry-run support.

use std::path::{Path, PathBuf};

use serde_json::Value as JsonValue;
use tracing::info;

use crate::error::{CliResult, WriteError};

/// Result of a write operation.
#[derive(Debug)]
pub enum WriteResult {
    Written {
        path: PathBuf,
        bytes: usize,
    },
    /// Nothing was written; `content` is what would have been.
    DryRun {
        path: PathBuf,
        content: String,
    },
}

impl WriteResult {
    pub fn path(&self) -> &Path {
        match self {
            WriteResult::Written { path, .. } | WriteResult::DryRun { path, .. } => path,
        }
    }

    pub fn was_written(&self) -> bool {
        matches!(self, WriteResult::Written { .. })
    }
}

/// Writes JSON documents to disk.
#[derive(Debug)]
pub struct SchemaWriter {
    dry_run: bool,
    pretty: bool,
}

impl SchemaWriter {
    pub fn new(dry_run: bool, pretty: bool) -> Self {
        Self { dry_run, pretty }
    }

    /// Render a document the way [`SchemaWriter::write`] stores it.
    pub fn render(&self, document: &JsonValue) -> String {
        let mut text = if self.pretty {
            format!("{document:#}")
        } else {
            document.to_string()
        };
        text.push('\n');
        text
    }

    /// Write `document` to `path`, creating parent directories as needed.
    pub fn write(&self, path: &Path, document: &JsonValue) -> CliResult<WriteResult> {
        let content = self.render(document);
        if self.dry_run {
            return Ok(WriteResult::DryRun {
                path: path.to_path_buf(),
                content,
            });
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| WriteError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        std::fs::write(path, &content).map_err(|source| WriteError::WriteFile {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), bytes = content.len(), "Schema written");

        Ok(WriteResult::Written {
            path: path.to_path_buf(),
            bytes: content.len(),
        })
    }
}
