//! Offline embedding provider based on feature hashing.

use crate::embeddings::provider::EmbeddingProvider;
use postapply_core::{AppError, AppResult};
use std::collections::BTreeMap;

const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them", "should", "i", "you", "your", "my", "do", "how", "what",
    "when",
];

/// Deterministic embedding provider for local, offline operation.
///
/// Each content word contributes to one bucket for the whole word and one
/// bucket per character trigram (with word-boundary padding). Buckets are
/// chosen with FNV-1a and signed by a second hash bit, and the result is
/// normalized to unit length. Not semantically accurate like neural models,
/// but stable across runs and platforms, which makes it suitable for
/// development and tests.
#[derive(Debug)]
pub struct HashedProvider {
    dimensions: usize,
}

impl HashedProvider {
    /// A zero `dimensions` is accepted here and rejected by `embed_batch`.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];

        let lower = text.to_lowercase();
        let mut word_freq: BTreeMap<&str, u32> = BTreeMap::new();
        for word in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() > 1 && !STOP_WORDS.contains(w))
        {
            *word_freq.entry(word).or_insert(0) += 1;
        }

        for (word, freq) in &word_freq {
            let weight = (*freq as f32).sqrt();
            self.accumulate(&mut embedding, word.as_bytes(), weight * 2.0);

            let padded: Vec<char> = std::iter::once('^')
                .chain(word.chars())
                .chain(std::iter::once('$'))
                .collect();
            for window in padded.windows(3) {
                let trigram: String = window.iter().collect();
                self.accumulate(&mut embedding, trigram.as_bytes(), weight);
            }
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
    }

    fn accumulate(&self, embedding: &mut [f32], feature: &[u8], weight: f32) {
        let hash = fnv1a(feature);
        let bucket = (hash % self.dimensions as u64) as usize;
        let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
        embedding[bucket] += sign * weight;
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325u64, |hash, &b| {
        (hash ^ b as u64).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

#[async_trait::async_trait]
impl EmbeddingProvider for HashedProvider {
    fn provider_name(&self) -> &str {
        "hashed"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if self.dimensions == 0 {
            return Err(AppError::EmbeddingProvider(
                "Hashed embeddings need at least one dimension".to_string(),
            ));
        }
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_embed_is_unit_length() {
        let provider = HashedProvider::new(384);
        let embedding = provider.embed("follow up after five days").await.unwrap();

        assert_eq!(embedding.len(), 384);
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_deterministic() {
        let provider = HashedProvider::new(128);
        let a = provider.embed("deterministic test").await.unwrap();
        let b = provider.embed("deterministic test").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_related_texts_score_higher() {
        let provider = HashedProvider::new(384);
        let query = provider.embed("When should I follow up?").await.unwrap();
        let timing = provider
            .embed("Follow up five to seven days after applying.")
            .await
            .unwrap();
        let unrelated = provider
            .embed("Salary negotiation benchmarks for engineers.")
            .await
            .unwrap();

        assert!(cosine(&query, &timing) > cosine(&query, &unrelated));
    }

    #[tokio::test]
    async fn test_empty_text_is_zero_vector() {
        let provider = HashedProvider::new(64);
        let embedding = provider.embed("").await.unwrap();
        assert!(embedding.iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn test_utf8_safety() {
        let provider = HashedProvider::new(64);
        let embedding = provider
            .embed("Olá, já enviei a candidatura 🎮 ontem")
            .await
            .unwrap();
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_zero_dimensions_is_an_error() {
        let provider = HashedProvider::new(0);
        assert!(matches!(
            provider.embed("follow up").await,
            Err(AppError::EmbeddingProvider(_))
        ));
    }

    #[tokio::test]
    async fn test_batch_matches_single() {
        let provider = HashedProvider::new(64);
        let texts = vec!["one text".to_string(), "another text".to_string()];
        let batch = provider.embed_batch(&texts).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[1], provider.embed("another text").await.unwrap());
    }
}
