//! Corpus loading.
//!
//! A corpus is a flat directory of plain-text files. Each file becomes one
//! immutable [`Document`]; the category code is derived from the file name.

use postapply_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A source document loaded from the corpus directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// File name, unique within the corpus directory
    pub id: String,

    /// Full UTF-8 text, unmodified
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,

    /// Path the document was read from
    pub source_path: PathBuf,

    /// Short category code derived from the file name
    pub category: String,
}

impl Document {
    /// Build a document for `path`, deriving id and category from its name.
    pub fn new(path: &Path, content: impl Into<String>) -> Self {
        let id = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            category: category_for(path),
            id,
            content: content.into(),
            source_path: path.to_path_buf(),
        }
    }

    /// Length of the content in characters.
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Category code for a corpus file: the file stem up to the first `_`.
///
/// `07_rl_notes.txt` → `07`, `timing.txt` → `timing`.
pub fn category_for(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match stem.split_once('_') {
        Some((head, _)) if !head.is_empty() => head.to_string(),
        _ => stem,
    }
}

/// Load every matching file in `dir` (non-recursive), sorted by file name.
///
/// Files that are not valid UTF-8 or contain NUL bytes are skipped with a
/// warning. An empty directory yields an empty corpus.
pub fn load_documents(dir: &Path, extensions: &[String]) -> AppResult<Vec<Document>> {
    if !dir.is_dir() {
        return Err(AppError::Knowledge(format!(
            "Corpus directory not found: {:?}",
            dir
        )));
    }

    let mut documents = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .follow_links(false)
    {
        let entry = entry.map_err(|e| {
            AppError::Knowledge(format!("Failed to read corpus directory {:?}: {}", dir, e))
        })?;
        let path = entry.path();

        if !entry.file_type().is_file() || !has_extension(path, extensions) {
            continue;
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Skipping unreadable file {:?}: {}", path, e);
                continue;
            }
        };

        if !is_likely_text(&content) {
            tracing::warn!("Skipping likely binary file: {:?}", path);
            continue;
        }

        tracing::debug!("Loaded {:?} ({} bytes)", path, content.len());
        documents.push(Document::new(path, content));
    }

    tracing::info!("Loaded {} documents from {:?}", documents.len(), dir);
    Ok(documents)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Check if text is likely UTF-8 text (not binary).
fn is_likely_text(data: &str) -> bool {
    !data.contains('\0')
}
