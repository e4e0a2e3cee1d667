//! Tiered reference retrieval against an in-memory corpus.

mod helpers;

use helpers::*;
use std::sync::Arc;

use amor::services::retrieval::{builtin_references, ReferenceRetriever, RetrievalTier};

fn retriever(embedder: FakeEmbedder, corpus: MemoryCorpus) -> ReferenceRetriever {
    ReferenceRetriever::standard(Arc::new(embedder), Arc::new(corpus), 0.1)
}

#[tokio::test]
async fn test_similarity_results_ranked_descending() {
    let corpus = MemoryCorpus::new()
        .with("Unrelated", "kuch aur", Some(vec![0.0, 1.0]))
        .with("Close", "paas paas", Some(vec![0.8, 0.6]))
        .with("Exact", "bilkul wahi", Some(vec![1.0, 0.0]));

    let result = retriever(FakeEmbedder::returning(vec![1.0, 0.0]), corpus)
        .retrieve("anything", 3)
        .await;

    assert_eq!(result.tier, RetrievalTier::Similarity);
    assert_eq!(result.names(), vec!["Exact", "Close"]);
}

#[tokio::test]
async fn test_keyword_tier_matches_name() {
    let corpus = MemoryCorpus::new()
        .with("Yeh Dosti", "Yeh dosti hum nahin todenge", None)
        .with("Love Story", "Tum se mila to", None);

    let result = retriever(FakeEmbedder::failing(), corpus)
        .retrieve("a love story in the rain", 3)
        .await;

    assert_eq!(result.tier, RetrievalTier::Keyword);
    assert!(result.names().contains(&"Love Story".to_string()));
    assert!(!result.names().contains(&"Yeh Dosti".to_string()));
}

#[tokio::test]
async fn test_quoted_theme_word_matches_keyword_tier() {
    let corpus = MemoryCorpus::new()
        .with("Yeh Dosti", "Yeh dosti hum nahin todenge", None)
        .with("Barsaat", "Rimjhim gire saawan", None);

    let result = retriever(FakeEmbedder::failing(), corpus)
        .retrieve("a song about “Dosti”", 3)
        .await;

    assert_eq!(result.tier, RetrievalTier::Keyword);
    assert_eq!(result.names(), vec!["Yeh Dosti"]);
}

#[tokio::test]
async fn test_danda_terminated_theme_matches_keyword_tier() {
    let corpus = MemoryCorpus::new().with("बारिश के गीत", "सावन की पहली बारिश", None);

    let result = retriever(FakeEmbedder::failing(), corpus)
        .retrieve("पहली बारिश।", 3)
        .await;

    assert_eq!(result.tier, RetrievalTier::Keyword);
}

#[tokio::test]
async fn test_no_keyword_match_falls_back_to_sample() {
    let corpus = MemoryCorpus::new().with("Yeh Dosti", "Yeh dosti hum nahin todenge", None);

    let result = retriever(FakeEmbedder::returning(vec![0.3, 0.7]), corpus)
        .retrieve("A beautiful love story during a festival", 3)
        .await;

    assert_eq!(result.tier, RetrievalTier::Sample);
    assert_eq!(result.names(), vec!["Yeh Dosti"]);
}

#[tokio::test]
async fn test_stop_word_theme_skips_keyword_tier() {
    let corpus = MemoryCorpus::new().with("The Song", "the the the", None);

    let result = retriever(FakeEmbedder::failing(), corpus)
        .retrieve("a song about the", 3)
        .await;

    assert_eq!(result.tier, RetrievalTier::Sample);
}

#[tokio::test]
async fn test_empty_corpus_uses_builtin_list() {
    let result = retriever(FakeEmbedder::returning(vec![1.0]), MemoryCorpus::new())
        .retrieve("festival", 2)
        .await;

    assert_eq!(result.tier, RetrievalTier::BuiltIn);
    assert_eq!(result.references, builtin_references(2));
}

#[tokio::test]
async fn test_unavailable_corpus_never_errors() {
    let result = retriever(FakeEmbedder::failing(), MemoryCorpus::unavailable())
        .retrieve("monsoon", 3)
        .await;

    assert_eq!(result.tier, RetrievalTier::BuiltIn);
    assert!(!result.references.is_empty());
}

#[tokio::test]
async fn test_zero_limit_still_returns_a_reference() {
    let corpus = MemoryCorpus::new().with("Yeh Dosti", "Yeh dosti", None);

    let result = retriever(FakeEmbedder::failing(), corpus)
        .retrieve("xyz", 0)
        .await;

    assert_eq!(result.references.len(), 1);
}
