//! In-memory vector index with an on-disk snapshot.
//!
//! The index owns parallel arrays of vectors and chunk payloads; position is
//! the join key. It is built once (in bulk) or loaded from a snapshot and is
//! read-only afterwards, so any number of concurrent searches may share it.
//!
//! Search is exact: cosine similarity against every stored vector, O(n·d).
//! [`VectorIndex::search`] is the only entry point touching the vectors, so an
//! approximate structure can replace the scan without changing callers.
//!
//! # Snapshot format
//!
//! ```text
//! magic "PAIDX001" | dimension u32 LE | count u64 LE
//! count × dimension f32 LE
//! payload length u64 LE | JSON payload (embedder identity, documents, chunks)
//! SHA-256 of everything above
//! ```
//!
//! Snapshots are written to `<path>.tmp`, fsynced and renamed over the target,
//! so a reader sees either the previous snapshot or the complete new one.

use crate::chunker::Chunk;
use crate::document::Document;
use crate::embeddings::EmbeddingProvider;
use postapply_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const SNAPSHOT_MAGIC: &[u8; 8] = b"PAIDX001";
const CHECKSUM_LEN: usize = 32;

/// One retrieved chunk with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub chunk: Chunk,
    pub score: f32,
    /// File name of the originating document
    pub filename: String,
    /// Category code of the originating document
    pub category: String,
}

/// Summary figures for an index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStats {
    pub documents: usize,
    pub chunks: usize,
    pub dimension: usize,
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotPayload {
    provider: String,
    model: String,
    documents: Vec<Document>,
    chunks: Vec<Chunk>,
}

/// Exact nearest-neighbour index over chunk embeddings.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    dimension: usize,
    /// Row-major, `chunks.len() × dimension`
    vectors: Vec<f32>,
    norms: Vec<f32>,
    chunks: Vec<Chunk>,
    documents: Vec<Document>,
    document_positions: HashMap<String, usize>,
    provider: String,
    model: String,
}

impl VectorIndex {
    /// Embed `chunks` in batches and build an index over them.
    ///
    /// Either every chunk is embedded or the build fails; nothing is
    /// persisted here. Document contents are not retained.
    pub async fn build(
        documents: &[Document],
        chunks: Vec<Chunk>,
        embedder: &dyn EmbeddingProvider,
        batch_size: usize,
    ) -> AppResult<Self> {
        if batch_size == 0 {
            return Err(AppError::Knowledge(
                "Embedding batch size must be positive".to_string(),
            ));
        }

        let dimension = embedder.dimensions();
        if dimension == 0 {
            return Err(AppError::Knowledge(format!(
                "Embedder {} reports zero dimensions",
                embedder.provider_name()
            )));
        }
        let documents: Vec<Document> = documents
            .iter()
            .map(|doc| Document {
                content: String::new(),
                ..doc.clone()
            })
            .collect();

        tracing::info!(
            "Embedding {} chunks with {} ({}, dimension {})",
            chunks.len(),
            embedder.provider_name(),
            embedder.model_name(),
            dimension
        );

        let mut vectors = Vec::with_capacity(chunks.len() * dimension);
        for (batch_no, batch) in chunks.chunks(batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = embedder
                .embed_batch(&texts)
                .await
                .map_err(AppError::into_embedding_error)?;

            if embeddings.len() != texts.len() {
                return Err(AppError::EmbeddingProvider(format!(
                    "Embedder returned {} vectors for {} texts",
                    embeddings.len(),
                    texts.len()
                )));
            }

            for embedding in embeddings {
                if embedding.len() != dimension {
                    return Err(AppError::DimensionMismatch {
                        expected: dimension,
                        actual: embedding.len(),
                    });
                }
                vectors.extend_from_slice(&embedding);
            }

            tracing::debug!("Embedded batch {} ({} chunks)", batch_no + 1, batch.len());
        }

        Self::from_parts(
            dimension,
            vectors,
            chunks,
            documents,
            embedder.provider_name().to_string(),
            embedder.model_name().to_string(),
        )
    }

    /// Build the index and write its snapshot to `path`.
    ///
    /// A failed build leaves any existing snapshot at `path` untouched.
    pub async fn build_and_save(
        documents: &[Document],
        chunks: Vec<Chunk>,
        embedder: &dyn EmbeddingProvider,
        batch_size: usize,
        path: &Path,
    ) -> AppResult<Self> {
        let index = Self::build(documents, chunks, embedder, batch_size).await?;
        index.save(path)?;
        Ok(index)
    }

    fn from_parts(
        dimension: usize,
        vectors: Vec<f32>,
        chunks: Vec<Chunk>,
        documents: Vec<Document>,
        provider: String,
        model: String,
    ) -> AppResult<Self> {
        if dimension == 0 {
            return Err(AppError::Knowledge(
                "Index dimension must be positive".to_string(),
            ));
        }
        if vectors.len() != chunks.len() * dimension {
            return Err(AppError::Knowledge(format!(
                "Vector block holds {} values, expected {} chunks × {} dimensions",
                vectors.len(),
                chunks.len(),
                dimension
            )));
        }

        let document_positions: HashMap<String, usize> = documents
            .iter()
            .enumerate()
            .map(|(i, doc)| (doc.id.clone(), i))
            .collect();

        if let Some(orphan) = chunks
            .iter()
            .find(|c| !document_positions.contains_key(&c.document_id))
        {
            return Err(AppError::Knowledge(format!(
                "Chunk {} references unknown document {}",
                orphan.id, orphan.document_id
            )));
        }

        let norms = vectors
            .chunks_exact(dimension)
            .map(|v| v.iter().map(|x| x * x).sum::<f32>().sqrt())
            .collect();

        Ok(Self {
            dimension,
            vectors,
            norms,
            chunks,
            documents,
            document_positions,
            provider,
            model,
        })
    }

    /// Restore an index from a snapshot without re-embedding.
    pub fn load(path: &Path) -> AppResult<Self> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::IndexMissing(path.to_path_buf()));
            }
            Err(e) => return Err(AppError::Io(e)),
        };

        let index = decode_snapshot(&bytes).map_err(|reason| {
            AppError::Knowledge(format!("Corrupt index snapshot {:?}: {}", path, reason))
        })??;

        tracing::info!(
            "Loaded index snapshot {:?}: {} chunks, dimension {}",
            path,
            index.chunks.len(),
            index.dimension
        );
        Ok(index)
    }

    /// Atomically write the snapshot to `path`.
    pub fn save(&self, path: &Path) -> AppResult<()> {
        let bytes = self.encode_snapshot()?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut tmp_path = path.as_os_str().to_os_string();
        tmp_path.push(".tmp");
        let tmp_path = PathBuf::from(tmp_path);

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)?;

        tracing::info!(
            "Wrote index snapshot {:?} ({} bytes, {} chunks)",
            path,
            bytes.len(),
            self.chunks.len()
        );
        Ok(())
    }

    fn encode_snapshot(&self) -> AppResult<Vec<u8>> {
        let payload = serde_json::to_vec(&SnapshotPayload {
            provider: self.provider.clone(),
            model: self.model.clone(),
            documents: self.documents.clone(),
            chunks: self.chunks.clone(),
        })?;

        let dimension = u32::try_from(self.dimension).map_err(|_| {
            AppError::Knowledge(format!("Dimension {} too large", self.dimension))
        })?;

        let mut bytes = Vec::with_capacity(
            SNAPSHOT_MAGIC.len() + 20 + self.vectors.len() * 4 + payload.len() + CHECKSUM_LEN,
        );
        bytes.extend_from_slice(SNAPSHOT_MAGIC);
        bytes.extend_from_slice(&dimension.to_le_bytes());
        bytes.extend_from_slice(&(self.chunks.len() as u64).to_le_bytes());
        bytes.extend_from_slice(&embedding_to_bytes(&self.vectors));
        bytes.extend_from_slice(&(payload.len() as u64).to_le_bytes());
        bytes.extend_from_slice(&payload);

        let checksum = Sha256::digest(&bytes);
        bytes.extend_from_slice(&checksum);
        Ok(bytes)
    }

    /// Embed `query` and return the `k` most similar chunks.
    ///
    /// Results are ordered by descending score, ties by ascending chunk id.
    /// When the index holds fewer than `k` chunks, all of them are returned.
    pub async fn search(
        &self,
        embedder: &dyn EmbeddingProvider,
        query: &str,
        k: usize,
    ) -> AppResult<Vec<SearchHit>> {
        if k == 0 {
            return Err(AppError::Knowledge("k must be at least 1".to_string()));
        }

        let query_vector = embedder
            .embed(query)
            .await
            .map_err(AppError::into_embedding_error)?;
        self.search_by_vector(&query_vector, k)
    }

    /// Rank stored vectors against an already-embedded query.
    pub fn search_by_vector(&self, query: &[f32], k: usize) -> AppResult<Vec<SearchHit>> {
        if k == 0 {
            return Err(AppError::Knowledge("k must be at least 1".to_string()));
        }
        if query.len() != self.dimension {
            return Err(AppError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if self.chunks.is_empty() {
            return Ok(Vec::new());
        }

        let query_norm = query.iter().map(|x| x * x).sum::<f32>().sqrt();

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(self.dimension)
            .zip(&self.norms)
            .enumerate()
            .map(|(i, (vector, &norm))| (i, cosine_similarity(query, query_norm, vector, norm)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| self.chunks[a.0].id.cmp(&self.chunks[b.0].id))
        });
        scored.truncate(k);

        let hits: Vec<SearchHit> = scored
            .into_iter()
            .map(|(i, score)| {
                let chunk = self.chunks[i].clone();
                let document = self.document(&chunk.document_id);
                SearchHit {
                    filename: document.map(|d| d.id.clone()).unwrap_or_default(),
                    category: document.map(|d| d.category.clone()).unwrap_or_default(),
                    chunk,
                    score,
                }
            })
            .collect();

        tracing::debug!(
            "Retrieved {} chunks (requested top-{}), top score {:?}",
            hits.len(),
            k,
            hits.first().map(|h| h.score)
        );

        Ok(hits)
    }

    /// Fail if `embedder` cannot produce vectors comparable with this index.
    pub fn check_embedder(&self, embedder: &dyn EmbeddingProvider) -> AppResult<()> {
        if embedder.dimensions() != self.dimension {
            return Err(AppError::DimensionMismatch {
                expected: self.dimension,
                actual: embedder.dimensions(),
            });
        }
        if embedder.provider_name() != self.provider || embedder.model_name() != self.model {
            tracing::warn!(
                "Index was built with {}/{} but queries use {}/{}",
                self.provider,
                self.model,
                embedder.provider_name(),
                embedder.model_name()
            );
        }
        Ok(())
    }

    pub fn document(&self, id: &str) -> Option<&Document> {
        self.document_positions
            .get(id)
            .map(|&position| &self.documents[position])
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            documents: self.documents.len(),
            chunks: self.chunks.len(),
            dimension: self.dimension,
            provider: self.provider.clone(),
            model: self.model.clone(),
        }
    }
}

/// Decode a snapshot. The outer error describes structural corruption; the
/// inner result carries index validation errors.
fn decode_snapshot(bytes: &[u8]) -> Result<AppResult<VectorIndex>, String> {
    let header_len = SNAPSHOT_MAGIC.len() + 4 + 8;
    if bytes.len() < header_len + 8 + CHECKSUM_LEN {
        return Err("file too short".to_string());
    }

    let (body, checksum) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
    if Sha256::digest(body).as_slice() != checksum {
        return Err("checksum mismatch".to_string());
    }
    if &body[..SNAPSHOT_MAGIC.len()] != SNAPSHOT_MAGIC {
        return Err("unrecognized header".to_string());
    }

    let mut cursor = SNAPSHOT_MAGIC.len();
    let dimension = read_u32(body, &mut cursor)? as usize;
    let count = read_u64(body, &mut cursor)? as usize;

    let vector_bytes = count
        .checked_mul(dimension)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| "vector block size overflows".to_string())?;
    let vectors = bytes_to_embedding(take(body, &mut cursor, vector_bytes)?)?;

    let payload_len = read_u64(body, &mut cursor)? as usize;
    let payload: SnapshotPayload = serde_json::from_slice(take(body, &mut cursor, payload_len)?)
        .map_err(|e| format!("invalid payload: {}", e))?;

    if cursor != body.len() {
        return Err("trailing bytes after payload".to_string());
    }
    if payload.chunks.len() != count {
        return Err(format!(
            "header declares {} chunks, payload holds {}",
            count,
            payload.chunks.len()
        ));
    }

    Ok(VectorIndex::from_parts(
        dimension,
        vectors,
        payload.chunks,
        payload.documents,
        payload.provider,
        payload.model,
    ))
}

fn take<'a>(bytes: &'a [u8], cursor: &mut usize, len: usize) -> Result<&'a [u8], String> {
    let end = cursor
        .checked_add(len)
        .filter(|&end| end <= bytes.len())
        .ok_or_else(|| "unexpected end of file".to_string())?;
    let slice = &bytes[*cursor..end];
    *cursor = end;
    Ok(slice)
}

fn read_u32(bytes: &[u8], cursor: &mut usize) -> Result<u32, String> {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(take(bytes, cursor, 4)?);
    Ok(u32::from_le_bytes(buf))
}

fn read_u64(bytes: &[u8], cursor: &mut usize) -> Result<u64, String> {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(take(bytes, cursor, 8)?);
    Ok(u64::from_le_bytes(buf))
}

/// Convert embedding values to little-endian bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to embedding values.
fn bytes_to_embedding(bytes: &[u8]) -> Result<Vec<f32>, String> {
    if bytes.len() % 4 != 0 {
        return Err("invalid embedding bytes length".to_string());
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Cosine similarity; zero-norm (or non-finite) inputs score negative infinity.
fn cosine_similarity(query: &[f32], query_norm: f32, vector: &[f32], norm: f32) -> f32 {
    if query_norm == 0.0 || norm == 0.0 {
        return f32::NEG_INFINITY;
    }

    let dot: f32 = query.iter().zip(vector).map(|(x, y)| x * y).sum();
    let score = dot / (query_norm * norm);
    if score.is_nan() {
        f32::NEG_INFINITY
    } else {
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::{chunk_corpus, ChunkConfig};
    use crate::embeddings::providers::hashed::HashedProvider;
    use tempfile::TempDir;

    /// Embeds text "vN" as the N-th standard basis vector and "zero" as all zeros.
    #[derive(Debug)]
    struct BasisEmbedder {
        dimension: usize,
    }

    #[async_trait::async_trait]
    impl EmbeddingProvider for BasisEmbedder {
        fn provider_name(&self) -> &str {
            "basis"
        }
        fn model_name(&self) -> &str {
            "basis"
        }
        fn dimensions(&self) -> usize {
            self.dimension
        }
        async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0.0; self.dimension];
                    if let Some(n) = t.strip_prefix('v').and_then(|n| n.parse::<usize>().ok()) {
                        v[n] = 1.0;
                    }
                    v
                })
                .collect())
        }
    }

    /// Returns vectors of the wrong size after the first call.
    #[derive(Debug)]
    struct ShrinkingEmbedder;

    #[async_trait::async_trait]
    impl EmbeddingProvider for ShrinkingEmbedder {
        fn provider_name(&self) -> &str {
            "shrinking"
        }
        fn model_name(&self) -> &str {
            "shrinking"
        }
        fn dimensions(&self) -> usize {
            3
        }
        async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| if t == "v0" { vec![1.0, 0.0, 0.0] } else { vec![1.0] })
                .collect())
        }
    }

    #[derive(Debug)]
    struct FailingEmbedder;

    #[async_trait::async_trait]
    impl EmbeddingProvider for FailingEmbedder {
        fn provider_name(&self) -> &str {
            "failing"
        }
        fn model_name(&self) -> &str {
            "failing"
        }
        fn dimensions(&self) -> usize {
            3
        }
        async fn embed_batch(&self, _texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            Err(AppError::Llm("connection refused".to_string()))
        }
    }

    fn basis_corpus(texts: &[&str]) -> (Vec<Document>, Vec<Chunk>) {
        let documents: Vec<Document> = texts
            .iter()
            .enumerate()
            .map(|(i, text)| Document::new(Path::new(&format!("{:02}_doc.txt", i)), *text))
            .collect();
        let chunks = chunk_corpus(&documents, &ChunkConfig::new(50, 0)).unwrap();
        (documents, chunks)
    }

    async fn basis_index(texts: &[&str]) -> VectorIndex {
        let (documents, chunks) = basis_corpus(texts);
        VectorIndex::build(&documents, chunks, &BasisEmbedder { dimension: 4 }, 2)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_orthogonal_vectors_self_match() {
        let index = basis_index(&["v0", "v1", "v2", "v3"]).await;
        let embedder = BasisEmbedder { dimension: 4 };

        for i in 0..4 {
            let hits = index.search(&embedder, &format!("v{}", i), 1).await.unwrap();
            assert_eq!(hits.len(), 1);
            assert_eq!(hits[0].chunk.id, i);
            assert!((hits[0].score - 1.0).abs() < 1e-6);
        }
    }

    #[tokio::test]
    async fn test_zero_vector_never_outranks_match() {
        let index = basis_index(&["zero", "v1", "v2"]).await;
        let embedder = BasisEmbedder { dimension: 4 };

        let hits = index.search(&embedder, "v2", 3).await.unwrap();
        assert_eq!(hits[0].chunk.id, 2);
        assert_eq!(hits.last().unwrap().chunk.id, 0);
        assert_eq!(hits.last().unwrap().score, f32::NEG_INFINITY);
    }

    #[tokio::test]
    async fn test_ties_break_by_ascending_id() {
        let index = basis_index(&["v1", "v0", "v1", "v1"]).await;
        let embedder = BasisEmbedder { dimension: 4 };

        let hits = index.search(&embedder, "v1", 3).await.unwrap();
        let ids: Vec<usize> = hits.iter().map(|h| h.chunk.id).collect();
        assert_eq!(ids, vec![0, 2, 3]);
    }

    #[tokio::test]
    async fn test_k_larger_than_corpus() {
        let index = basis_index(&["v0", "v1"]).await;
        let embedder = BasisEmbedder { dimension: 4 };

        let hits = index.search(&embedder, "v0", 10).await.unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn test_k_zero_rejected() {
        let index = basis_index(&["v0"]).await;
        let embedder = BasisEmbedder { dimension: 4 };
        assert!(matches!(
            index.search(&embedder, "v0", 0).await,
            Err(AppError::Knowledge(_))
        ));
    }

    #[tokio::test]
    async fn test_query_dimension_mismatch() {
        let index = basis_index(&["v0"]).await;
        let result = index.search_by_vector(&[1.0, 0.0], 1);
        assert!(matches!(
            result,
            Err(AppError::DimensionMismatch {
                expected: 4,
                actual: 2
            })
        ));
    }

    #[tokio::test]
    async fn test_empty_index_returns_nothing() {
        let index = basis_index(&[]).await;
        let embedder = BasisEmbedder { dimension: 4 };
        assert!(index.search(&embedder, "v0", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_inconsistent_embedder_fails_build() {
        let (documents, chunks) = basis_corpus(&["v0", "v1"]);
        let result = VectorIndex::build(&documents, chunks, &ShrinkingEmbedder, 8).await;
        assert!(matches!(
            result,
            Err(AppError::DimensionMismatch {
                expected: 3,
                actual: 1
            })
        ));
    }

    #[tokio::test]
    async fn test_hits_carry_document_metadata() {
        let index = basis_index(&["v0", "v1"]).await;
        let embedder = BasisEmbedder { dimension: 4 };

        let hits = index.search(&embedder, "v1", 1).await.unwrap();
        assert_eq!(hits[0].filename, "01_doc.txt");
        assert_eq!(hits[0].category, "01");
    }

    #[tokio::test]
    async fn test_snapshot_round_trip_identical_results() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("index/snapshot.bin");

        let documents = vec![
            Document::new(
                Path::new("timing_guide.txt"),
                "Follow up five business days after applying. Startups move faster.",
            ),
            Document::new(
                Path::new("message_tips.txt"),
                "Keep the follow-up email short, specific and polite.",
            ),
        ];
        let chunks = chunk_corpus(&documents, &ChunkConfig::new(40, 8)).unwrap();
        let embedder = HashedProvider::new(64);

        let built = VectorIndex::build_and_save(&documents, chunks, &embedder, 3, &path)
            .await
            .unwrap();
        let loaded = VectorIndex::load(&path).unwrap();

        assert_eq!(built.stats(), loaded.stats());
        for query in ["When should I follow up?", "email length", "startups"] {
            let a = built.search(&embedder, query, 3).await.unwrap();
            let b = loaded.search(&embedder, query, 3).await.unwrap();
            assert_eq!(a, b);
        }
        assert!(!temp.path().join("index/snapshot.bin.tmp").exists());
    }

    #[test]
    fn test_load_missing_snapshot() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("absent.bin");
        assert!(matches!(
            VectorIndex::load(&path),
            Err(AppError::IndexMissing(p)) if p == path
        ));
    }

    #[tokio::test]
    async fn test_load_detects_corruption() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("snapshot.bin");
        basis_index(&["v0", "v1"]).await.save(&path).unwrap();

        let mut bytes = fs::read(&path).unwrap();
        let middle = bytes.len() / 2;
        bytes[middle] ^= 0xff;
        fs::write(&path, bytes).unwrap();

        assert!(matches!(
            VectorIndex::load(&path),
            Err(AppError::Knowledge(msg)) if msg.contains("checksum")
        ));
    }

    #[tokio::test]
    async fn test_failed_build_keeps_previous_snapshot() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("snapshot.bin");
        basis_index(&["v0", "v1"]).await.save(&path).unwrap();
        let before = fs::read(&path).unwrap();

        let (documents, chunks) = basis_corpus(&["v2"]);
        let result =
            VectorIndex::build_and_save(&documents, chunks, &FailingEmbedder, 4, &path).await;

        assert!(matches!(result, Err(AppError::EmbeddingProvider(_))));
        assert_eq!(fs::read(&path).unwrap(), before);
        assert_eq!(VectorIndex::load(&path).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_zero_dimension_rejected() {
        let (documents, chunks) = basis_corpus(&["v0"]);
        let result =
            VectorIndex::build(&documents, chunks, &BasisEmbedder { dimension: 0 }, 2).await;
        assert!(matches!(result, Err(AppError::Knowledge(_))));

        let (documents, chunks) = basis_corpus(&["some text"]);
        let result = VectorIndex::build(&documents, chunks, &HashedProvider::new(0), 2).await;
        assert!(matches!(result, Err(AppError::Knowledge(_))));

        assert!(VectorIndex::from_parts(
            0,
            Vec::new(),
            Vec::new(),
            Vec::new(),
            "basis".to_string(),
            "basis".to_string()
        )
        .is_err());
    }

    #[tokio::test]
    async fn test_build_is_deterministic() {
        let temp = TempDir::new().unwrap();
        let documents = vec![
            Document::new(
                Path::new("timing_guide.txt"),
                "Follow up five to seven business days after applying.\n\nStartups reply faster.",
            ),
            Document::new(
                Path::new("message_templates.txt"),
                "Keep the note short. Mention the role by name and thank the reader.",
            ),
        ];
        let config = ChunkConfig::new(40, 8);
        let embedder = HashedProvider::new(64);

        let mut snapshots = Vec::new();
        for name in ["first.bin", "second.bin"] {
            let path = temp.path().join(name);
            let chunks = chunk_corpus(&documents, &config).unwrap();
            VectorIndex::build_and_save(&documents, chunks, &embedder, 3, &path)
                .await
                .unwrap();
            snapshots.push(fs::read(&path).unwrap());
        }

        assert!(!snapshots[0].is_empty());
        assert_eq!(snapshots[0], snapshots[1]);
    }

    #[tokio::test]
    async fn test_check_embedder_dimension() {
        let index = basis_index(&["v0"]).await;
        assert!(index.check_embedder(&BasisEmbedder { dimension: 4 }).is_ok());
        assert!(matches!(
            index.check_embedder(&HashedProvider::new(8)),
            Err(AppError::DimensionMismatch { .. })
        ));
    }
}
