//! Recursive text chunking with configurable size and overlap.
//!
//! Text is split on the coarsest separator first (paragraph break), and any
//! piece that is still too long is re-split on the next separator (line
//! break, sentence end, space). Pieces are then merged greedily into chunk
//! bodies, and each chunk is prefixed with the characters immediately
//! preceding its body so consecutive chunks overlap.
//!
//! All lengths are counted in Unicode scalar values, never bytes.

use crate::document::Document;
use postapply_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Chunking parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Maximum chunk length in characters
    pub max_chars: usize,

    /// Characters repeated from the preceding text at the start of each chunk
    pub overlap_chars: usize,

    /// Separators in priority order, coarsest first
    pub separators: Vec<String>,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_chars: 500,
            overlap_chars: 50,
            separators: vec![
                "\n\n".to_string(),
                "\n".to_string(),
                ". ".to_string(),
                " ".to_string(),
            ],
        }
    }
}

impl ChunkConfig {
    /// Config with the default separators.
    pub fn new(max_chars: usize, overlap_chars: usize) -> Self {
        Self {
            max_chars,
            overlap_chars,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.max_chars == 0 {
            return Err(AppError::Knowledge(
                "Chunk size must be positive".to_string(),
            ));
        }
        if self.overlap_chars >= self.max_chars {
            return Err(AppError::Knowledge(format!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                self.overlap_chars, self.max_chars
            )));
        }
        if self.separators.iter().any(String::is_empty) {
            return Err(AppError::Knowledge(
                "Chunk separators cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Upper bound for the part of a chunk that is not overlap.
    fn body_limit(&self) -> usize {
        self.max_chars - self.overlap_chars
    }
}

/// A bounded span of a document's text, the unit of retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Dense corpus-wide id, assigned in document order
    pub id: usize,

    /// Id of the document this chunk was cut from
    pub document_id: String,

    /// Chunk text: overlap prefix followed by the body
    pub text: String,

    /// Character range of `text` within the document
    pub char_range: Range<usize>,

    /// Number of leading characters repeated from the preceding text
    pub overlap: usize,
}

impl Chunk {
    /// The part of the chunk not shared with its predecessor.
    pub fn body(&self) -> &str {
        match self.text.char_indices().nth(self.overlap) {
            Some((byte, _)) => &self.text[byte..],
            None => "",
        }
    }
}

/// Chunk a whole corpus, assigning dense ids across all documents.
///
/// Ids follow document order, then position within the document, so the
/// output is identical across runs for the same input and configuration.
pub fn chunk_corpus(documents: &[Document], config: &ChunkConfig) -> AppResult<Vec<Chunk>> {
    config.validate()?;

    let mut chunks = Vec::new();
    for document in documents {
        chunks.extend(chunk_document(document, config));
    }
    for (id, chunk) in chunks.iter_mut().enumerate() {
        chunk.id = id;
    }

    tracing::info!(
        "Chunked {} documents into {} chunks (size: {}, overlap: {})",
        documents.len(),
        chunks.len(),
        config.max_chars,
        config.overlap_chars
    );

    Ok(chunks)
}

/// Chunk a single document.
///
/// Ids are local to the document (0, 1, ...) until renumbered by
/// [`chunk_corpus`]. The configuration is assumed valid.
pub fn chunk_document(document: &Document, config: &ChunkConfig) -> Vec<Chunk> {
    let chars: Vec<char> = document.content.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }

    let separators: Vec<Vec<char>> = config
        .separators
        .iter()
        .map(|s| s.chars().collect())
        .collect();

    let mut pieces = Vec::new();
    split_range(
        &chars,
        0..chars.len(),
        &separators,
        config.body_limit(),
        &mut pieces,
    );

    let bodies = merge_pieces(pieces, config.body_limit());

    let chunks: Vec<Chunk> = bodies
        .into_iter()
        .enumerate()
        .map(|(position, body)| {
            let prefix = config
                .overlap_chars
                .min(body.start)
                .min(config.max_chars.saturating_sub(body.len()));
            let range = (body.start - prefix)..body.end;
            Chunk {
                id: position,
                document_id: document.id.clone(),
                text: chars[range.clone()].iter().collect(),
                char_range: range,
                overlap: prefix,
            }
        })
        .collect();

    tracing::debug!("Chunked {} into {} chunks", document.id, chunks.len());
    chunks
}

/// Recursively split `range` until every piece fits `limit`.
///
/// A piece with no separator left to split on is emitted whole.
fn split_range(
    chars: &[char],
    range: Range<usize>,
    separators: &[Vec<char>],
    limit: usize,
    out: &mut Vec<Range<usize>>,
) {
    if range.len() <= limit {
        out.push(range);
        return;
    }

    for (level, separator) in separators.iter().enumerate() {
        let pieces = split_after(chars, range.clone(), separator);
        if pieces.len() > 1 {
            for piece in pieces {
                split_range(chars, piece, &separators[level + 1..], limit, out);
            }
            return;
        }
    }

    out.push(range);
}

/// Split `range` after each occurrence of `separator`.
///
/// The separator stays attached to the piece it ends, so the pieces are
/// contiguous and cover `range` exactly.
fn split_after(chars: &[char], range: Range<usize>, separator: &[char]) -> Vec<Range<usize>> {
    let mut pieces = Vec::new();
    let mut piece_start = range.start;
    let mut i = range.start;

    while i + separator.len() <= range.end {
        if chars[i..i + separator.len()] == *separator {
            i += separator.len();
            pieces.push(piece_start..i);
            piece_start = i;
        } else {
            i += 1;
        }
    }

    if piece_start < range.end {
        pieces.push(piece_start..range.end);
    }
    pieces
}

/// Greedily merge contiguous pieces into bodies of at most `limit` characters.
fn merge_pieces(pieces: Vec<Range<usize>>, limit: usize) -> Vec<Range<usize>> {
    let mut bodies: Vec<Range<usize>> = Vec::new();
    let mut current: Option<Range<usize>> = None;

    for piece in pieces {
        current = match current {
            Some(body) if body.len() + piece.len() <= limit => Some(body.start..piece.end),
            Some(body) => {
                bodies.push(body);
                Some(piece)
            }
            None => Some(piece),
        };
    }

    bodies.extend(current);
    bodies
}
