//! Reference retrieval as an ordered chain of tiers.
//!
//! Each tier either yields entries or falls through to the next one. The
//! chain always ends with a built-in list, so callers always receive at
//! least one reference.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use unicode_segmentation::UnicodeSegmentation;

use crate::models::reference::ReferenceEntry;
use crate::ports::{CorpusStore, EmbeddingService};

/// Words too common to say anything about a theme.
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
    "one", "our", "out", "has", "him", "his", "how", "its", "may", "new", "now", "old", "see",
    "way", "who", "did", "get", "let", "say", "she", "too", "use", "about", "after", "again",
    "also", "been", "before", "being", "between", "both", "could", "does", "doing", "down",
    "during", "each", "from", "further", "have", "having", "here", "into", "just", "more",
    "most", "only", "other", "over", "same", "should", "some", "such", "than", "that", "their",
    "them", "then", "there", "these", "they", "this", "those", "through", "under", "until",
    "very", "were", "what", "when", "where", "which", "while", "with", "would", "your", "song",
    "songs", "want", "make", "like",
];

/// Which tier produced a retrieval result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalTier {
    Similarity,
    Keyword,
    Sample,
    BuiltIn,
}

impl fmt::Display for RetrievalTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RetrievalTier::Similarity => "similarity",
            RetrievalTier::Keyword => "keyword",
            RetrievalTier::Sample => "sample",
            RetrievalTier::BuiltIn => "built_in",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TierError {
    #[error("embedding failed: {0}")]
    Embedding(#[from] crate::services::gemini::GeminiError),

    #[error("corpus query failed: {0}")]
    Store(#[from] crate::ports::StoreError),
}

/// One strategy in the fallback chain.
#[async_trait]
pub trait ReferenceTier: Send + Sync {
    fn kind(&self) -> RetrievalTier;

    async fn fetch(&self, theme: &str, limit: usize) -> Result<Vec<ReferenceEntry>, TierError>;
}

/// Embed the theme and rank stored embeddings by cosine similarity.
pub struct SimilarityTier {
    embedder: Arc<dyn EmbeddingService>,
    corpus: Arc<dyn CorpusStore>,
    threshold: f32,
}

impl SimilarityTier {
    pub fn new(
        embedder: Arc<dyn EmbeddingService>,
        corpus: Arc<dyn CorpusStore>,
        threshold: f32,
    ) -> Self {
        Self {
            embedder,
            corpus,
            threshold,
        }
    }
}

#[async_trait]
impl ReferenceTier for SimilarityTier {
    fn kind(&self) -> RetrievalTier {
        RetrievalTier::Similarity
    }

    async fn fetch(&self, theme: &str, limit: usize) -> Result<Vec<ReferenceEntry>, TierError> {
        let embedding = self.embedder.embed(theme).await?;
        let mut matches = self
            .corpus
            .match_by_embedding(&embedding, self.threshold, limit)
            .await?;

        matches.retain(|m| m.similarity > self.threshold);
        matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        matches.truncate(limit);

        if let Some(best) = matches.first() {
            debug!(best = best.similarity, count = matches.len(), "Similarity matches");
        }
        Ok(matches.into_iter().map(|m| m.entry).collect())
    }
}

/// Case-insensitive substring match of theme keywords against name or text.
pub struct KeywordTier {
    corpus: Arc<dyn CorpusStore>,
}

impl KeywordTier {
    pub fn new(corpus: Arc<dyn CorpusStore>) -> Self {
        Self { corpus }
    }
}

#[async_trait]
impl ReferenceTier for KeywordTier {
    fn kind(&self) -> RetrievalTier {
        RetrievalTier::Keyword
    }

    async fn fetch(&self, theme: &str, limit: usize) -> Result<Vec<ReferenceEntry>, TierError> {
        let keywords = extract_keywords(theme);
        if keywords.is_empty() {
            debug!("No keywords survived filtering");
            return Ok(Vec::new());
        }
        debug!(?keywords, "Keyword search");
        Ok(self.corpus.search_keywords(&keywords, limit).await?)
    }
}

/// Any entries at all.
pub struct SampleTier {
    corpus: Arc<dyn CorpusStore>,
}

impl SampleTier {
    pub fn new(corpus: Arc<dyn CorpusStore>) -> Self {
        Self { corpus }
    }
}

#[async_trait]
impl ReferenceTier for SampleTier {
    fn kind(&self) -> RetrievalTier {
        RetrievalTier::Sample
    }

    async fn fetch(&self, _theme: &str, limit: usize) -> Result<Vec<ReferenceEntry>, TierError> {
        Ok(self.corpus.sample(limit).await?)
    }
}

/// Outcome of a retrieval: the entries and the tier that supplied them.
#[derive(Debug, Clone)]
pub struct Retrieval {
    pub tier: RetrievalTier,
    pub references: Vec<ReferenceEntry>,
}

impl Retrieval {
    pub fn names(&self) -> Vec<String> {
        self.references.iter().map(|r| r.name.clone()).collect()
    }
}

pub struct ReferenceRetriever {
    tiers: Vec<Box<dyn ReferenceTier>>,
}

impl ReferenceRetriever {
    pub fn new(tiers: Vec<Box<dyn ReferenceTier>>) -> Self {
        Self { tiers }
    }

    /// Similarity, then keyword, then sample, then the built-in list.
    pub fn standard(
        embedder: Arc<dyn EmbeddingService>,
        corpus: Arc<dyn CorpusStore>,
        threshold: f32,
    ) -> Self {
        Self::new(vec![
            Box::new(SimilarityTier::new(embedder, corpus.clone(), threshold)),
            Box::new(KeywordTier::new(corpus.clone())),
            Box::new(SampleTier::new(corpus)),
        ])
    }

    /// Up to `limit` references for `theme`; never empty, never an error.
    pub async fn retrieve(&self, theme: &str, limit: usize) -> Retrieval {
        let limit = limit.max(1);

        for tier in &self.tiers {
            match tier.fetch(theme, limit).await {
                Ok(mut references) if !references.is_empty() => {
                    references.truncate(limit);
                    info!(tier = %tier.kind(), count = references.len(), "References retrieved");
                    metrics::counter!("retrieval_tier_total", "tier" => tier.kind().to_string())
                        .increment(1);
                    return Retrieval {
                        tier: tier.kind(),
                        references,
                    };
                }
                Ok(_) => {
                    debug!(tier = %tier.kind(), "Tier returned no references, falling through");
                }
                Err(e) => {
                    warn!(tier = %tier.kind(), error = %e, "Tier failed, falling through");
                }
            }
        }

        warn!("Corpus unavailable, using built-in references");
        metrics::counter!("retrieval_tier_total", "tier" => RetrievalTier::BuiltIn.to_string())
            .increment(1);
        Retrieval {
            tier: RetrievalTier::BuiltIn,
            references: builtin_references(limit),
        }
    }
}

/// Lowercased words of the theme minus stop words and words of two or fewer
/// characters, de-duplicated in first-seen order.
///
/// Words follow Unicode word boundaries, so quotes, dashes and the danda
/// separate words while Devanagari vowel signs stay attached.
pub fn extract_keywords(theme: &str) -> Vec<String> {
    let lowered = theme.to_lowercase();
    let mut keywords: Vec<String> = Vec::new();
    for word in lowered
        .unicode_words()
        .filter(|w| w.chars().count() > 2)
        .filter(|w| !STOP_WORDS.contains(w))
    {
        if !keywords.iter().any(|k| k == word) {
            keywords.push(word.to_string());
        }
    }
    keywords
}

/// Cosine similarity of two vectors; 0.0 for mismatched or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Placeholder references used when the corpus cannot supply any.
pub fn builtin_references(limit: usize) -> Vec<ReferenceEntry> {
    let all = [
        ReferenceEntry::new(
            "Pyaar Ki Baarish",
            "[Verse 1]\nBaadal garje, dil bhi dhadke\nTeri yaadon mein hum bheege\n[Chorus]\nPyaar ki baarish, tere sang sang\nRang de mujhko apne hi rang",
        ),
        ReferenceEntry::new(
            "Safar Dosti Ka",
            "[Verse 1]\nGaliyon mein khele, sapne bune\nHar mod pe saath tere hum chale\n[Chorus]\nYeh safar dosti ka, kabhi na ruke\nTere bina yeh raaste adhoore lage",
        ),
        ReferenceEntry::new(
            "Roshni Ka Tyohaar",
            "[Verse 1]\nDiye jale, aangan mehke\nKhushiyon se har chehra chamke\n[Chorus]\nAaj hai roshni ka tyohaar\nDil mein basa hai sabka pyaar",
        ),
    ];
    all.into_iter().take(limit.max(1)).collect()
}
