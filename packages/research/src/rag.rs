//! In-process retrieval store over aggregated source texts.
//!
//! Source texts are chunked on registration and ranked by term overlap at
//! query time. This is the document store behind the retrieval callback the
//! synthesizer gets; chunk reference counts record which evidence the model
//! actually pulled.

use std::collections::HashSet;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::debug;

use crate::agent::Retriever;
use crate::types::SourceType;

/// Target chunk size in characters; chunks break on paragraph boundaries.
const CHUNK_TARGET_CHARS: usize = 1200;

/// Maximum chunks returned per query.
const MAX_RESULTS: usize = 8;

/// One retrievable span of a source document.
#[derive(Debug, Clone)]
pub struct DocumentChunk {
    pub content: String,
    pub source_type: SourceType,
    pub source_id: String,
    /// How many times retrieval has returned this chunk
    pub reference_count: usize,
}

struct StoredChunk {
    content: String,
    terms: HashSet<String>,
    source_type: SourceType,
    source_id: String,
    reference_count: usize,
}

/// Keyword-scored document store.
#[derive(Default)]
pub struct DocumentStore {
    chunks: RwLock<Vec<StoredChunk>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chunk and index one source's extracted text.
    pub fn register(&self, source_id: &str, source_type: SourceType, content: &str) {
        let mut chunks = self.chunks.write().expect("store lock poisoned");
        let before = chunks.len();
        for piece in chunk_text(content, CHUNK_TARGET_CHARS) {
            let terms = tokenize(&piece);
            if terms.is_empty() {
                continue;
            }
            chunks.push(StoredChunk {
                content: piece,
                terms,
                source_type,
                source_id: source_id.to_string(),
                reference_count: 0,
            });
        }
        debug!(
            source_id = %source_id,
            chunks = chunks.len() - before,
            "registered source in document store"
        );
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.chunks.read().expect("store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn query(&self, query: &str) -> Vec<DocumentChunk> {
        let query_terms = tokenize(query);
        if query_terms.is_empty() {
            return Vec::new();
        }

        let mut chunks = self.chunks.write().expect("store lock poisoned");

        let mut scored: Vec<(usize, usize)> = chunks
            .iter()
            .enumerate()
            .filter_map(|(i, chunk)| {
                let overlap = query_terms.intersection(&chunk.terms).count();
                (overlap > 0).then_some((i, overlap))
            })
            .collect();

        scored.sort_by(|a, b| b.1.cmp(&a.1));
        scored.truncate(MAX_RESULTS);

        scored
            .into_iter()
            .map(|(i, _)| {
                let chunk = &mut chunks[i];
                chunk.reference_count += 1;
                DocumentChunk {
                    content: chunk.content.clone(),
                    source_type: chunk.source_type,
                    source_id: chunk.source_id.clone(),
                    reference_count: chunk.reference_count,
                }
            })
            .collect()
    }
}

#[async_trait]
impl Retriever for DocumentStore {
    async fn retrieve(&self, query: &str) -> Vec<DocumentChunk> {
        let results = self.query(query);
        debug!(query = %query, results = results.len(), "retrieval query");
        results
    }
}

/// Split text into paragraph-bounded chunks of roughly the target size.
fn chunk_text(text: &str, target: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in text.split("\n\n") {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }
        if !current.is_empty() && current.len() + paragraph.len() > target {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);

        // Oversized single paragraphs become their own chunk rather than
        // being split mid-sentence.
        if current.len() >= target {
            chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
        .map(|w| w.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_retrieve() {
        let store = DocumentStore::new();
        store.register(
            "wiki_abc",
            SourceType::Wikipedia,
            "Newton developed calculus in Cambridge.\n\nLeibniz published his own calculus notation.",
        );

        let results = store.retrieve("calculus dispute").await;
        assert!(!results.is_empty());
        assert!(results.iter().all(|c| c.source_id == "wiki_abc"));
        assert!(results[0].content.to_lowercase().contains("calculus"));
    }

    #[tokio::test]
    async fn test_reference_counts_increment() {
        let store = DocumentStore::new();
        store.register("s1", SourceType::Wikipedia, "The priority dispute over calculus.");

        let first = store.retrieve("calculus").await;
        assert_eq!(first[0].reference_count, 1);

        let second = store.retrieve("calculus").await;
        assert_eq!(second[0].reference_count, 2);
    }

    #[tokio::test]
    async fn test_no_match_returns_empty() {
        let store = DocumentStore::new();
        store.register("s1", SourceType::Wikipedia, "Completely unrelated text.");

        assert!(store.retrieve("xylophone").await.is_empty());
        assert!(store.retrieve("").await.is_empty());
    }

    #[test]
    fn test_chunking_respects_paragraphs() {
        let text = format!("{}\n\n{}\n\n{}", "a".repeat(700), "b".repeat(700), "c".repeat(100));
        let chunks = chunk_text(&text, 1200);

        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].contains("aaa"));
        assert!(chunks[1].starts_with("bbb"));
        assert!(chunks[1].contains("ccc"));
    }

    #[test]
    fn test_chunking_handles_oversized_paragraph() {
        let text = "x".repeat(5000);
        let chunks = chunk_text(&text, 1200);
        assert_eq!(chunks.len(), 1);
    }
}
