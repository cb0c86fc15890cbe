//! Retrieval quality evaluation.
//!
//! Runs labelled queries against an index and scores the categories of the
//! retrieved chunks against the expected ones. Retrieval only: no answers
//! are generated.

use crate::embeddings::EmbeddingProvider;
use crate::index::VectorIndex;
use postapply_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// A labelled evaluation query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalCase {
    pub query: String,
    pub expected_categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
}

/// Scores for one case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseResult {
    pub query: String,
    pub expected_categories: Vec<String>,
    /// Category of each retrieved chunk, in rank order
    pub retrieved_categories: Vec<String>,
    pub precision: f64,
    pub recall: f64,
}

/// Per-case scores plus averages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvalReport {
    pub k: usize,
    pub cases: Vec<CaseResult>,
    pub avg_precision: f64,
    pub avg_recall: f64,
    /// Harmonic mean of the average precision and recall
    pub f1: f64,
}

/// Read cases from a JSON array file.
pub fn load_cases(path: &Path) -> AppResult<Vec<EvalCase>> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        AppError::Knowledge(format!("Failed to read evaluation cases {:?}: {}", path, e))
    })?;
    Ok(serde_json::from_str(&contents)?)
}

/// Evaluate retrieval for every case at depth `k`.
pub async fn evaluate(
    index: &VectorIndex,
    embedder: &dyn EmbeddingProvider,
    cases: &[EvalCase],
    k: usize,
) -> AppResult<EvalReport> {
    let mut results = Vec::with_capacity(cases.len());

    for case in cases {
        let hits = index.search(embedder, &case.query, k).await?;
        let retrieved_categories: Vec<String> = hits.into_iter().map(|h| h.category).collect();
        let (precision, recall) = score(&case.expected_categories, &retrieved_categories);

        tracing::debug!(
            "Evaluated {:?}: precision {:.2}, recall {:.2}",
            case.query,
            precision,
            recall
        );

        results.push(CaseResult {
            query: case.query.clone(),
            expected_categories: case.expected_categories.clone(),
            retrieved_categories,
            precision,
            recall,
        });
    }

    let n = results.len().max(1) as f64;
    let avg_precision = results.iter().map(|r| r.precision).sum::<f64>() / n;
    let avg_recall = results.iter().map(|r| r.recall).sum::<f64>() / n;
    let f1 = if avg_precision + avg_recall > 0.0 {
        2.0 * avg_precision * avg_recall / (avg_precision + avg_recall)
    } else {
        0.0
    };

    tracing::info!(
        "Evaluated {} cases at k={}: precision {:.2}, recall {:.2}, F1 {:.2}",
        results.len(),
        k,
        avg_precision,
        avg_recall,
        f1
    );

    Ok(EvalReport {
        k,
        cases: results,
        avg_precision,
        avg_recall,
        f1,
    })
}

/// Set-based precision and recall over category codes.
fn score(expected: &[String], retrieved: &[String]) -> (f64, f64) {
    let expected: BTreeSet<&str> = expected.iter().map(String::as_str).collect();
    let retrieved: BTreeSet<&str> = retrieved.iter().map(String::as_str).collect();
    let matches = expected.intersection(&retrieved).count() as f64;

    let precision = if retrieved.is_empty() {
        0.0
    } else {
        matches / retrieved.len() as f64
    };
    let recall = if expected.is_empty() {
        0.0
    } else {
        matches / expected.len() as f64
    };
    (precision, recall)
}
