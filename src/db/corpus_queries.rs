use sqlx::{PgPool, Row};

use crate::models::reference::{ReferenceEntry, ScoredReference};
use crate::services::retrieval::cosine_similarity;

/// Rank every embedded corpus entry against `embedding` and keep the best
/// `limit` above `threshold`, most similar first.
pub async fn match_by_embedding(
    pool: &PgPool,
    embedding: &[f32],
    threshold: f32,
    limit: usize,
) -> Result<Vec<ScoredReference>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT name, text, embedding
        FROM lyrics
        WHERE embedding IS NOT NULL AND cardinality(embedding) = $1
        "#,
    )
    .bind(embedding.len() as i32)
    .fetch_all(pool)
    .await?;

    let mut scored = Vec::with_capacity(rows.len());
    for row in rows {
        let stored: Vec<f32> = row.try_get("embedding")?;
        let similarity = cosine_similarity(embedding, &stored);
        if similarity > threshold {
            scored.push(ScoredReference {
                entry: ReferenceEntry {
                    name: row.try_get("name")?,
                    text: row.try_get("text")?,
                },
                similarity,
            });
        }
    }

    Ok(rank(scored, limit))
}

fn rank(mut scored: Vec<ScoredReference>, limit: usize) -> Vec<ScoredReference> {
    scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    scored.truncate(limit);
    scored
}

/// Entries whose name or text contains any keyword (case-insensitive)
pub async fn search_keywords(
    pool: &PgPool,
    keywords: &[String],
    limit: usize,
) -> Result<Vec<ReferenceEntry>, sqlx::Error> {
    if keywords.is_empty() {
        return Ok(Vec::new());
    }
    let patterns: Vec<String> = keywords.iter().map(|k| like_pattern(k)).collect();

    let rows = sqlx::query(
        r#"
        SELECT name, text
        FROM lyrics
        WHERE name ILIKE ANY($1) OR text ILIKE ANY($1)
        ORDER BY id
        LIMIT $2
        "#,
    )
    .bind(&patterns)
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|r| {
            Ok(ReferenceEntry {
                name: r.try_get("name")?,
                text: r.try_get("text")?,
            })
        })
        .collect()
}

/// Arbitrary entries
pub async fn sample(pool: &PgPool, limit: usize) -> Result<Vec<ReferenceEntry>, sqlx::Error> {
    let rows = sqlx::query("SELECT name, text FROM lyrics ORDER BY random() LIMIT $1")
        .bind(limit as i64)
        .fetch_all(pool)
        .await?;

    rows.iter()
        .map(|r| {
            Ok(ReferenceEntry {
                name: r.try_get("name")?,
                text: r.try_get("text")?,
            })
        })
        .collect()
}

/// Insert one cleaned corpus entry
pub async fn insert_entry(
    pool: &PgPool,
    entry: &ReferenceEntry,
    embedding: Option<&[f32]>,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO lyrics (name, text, embedding) VALUES ($1, $2, $3)")
        .bind(&entry.name)
        .bind(&entry.text)
        .bind(embedding)
        .execute(pool)
        .await?;
    Ok(())
}

/// Number of entries in the corpus
pub async fn count_entries(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM lyrics")
        .fetch_one(pool)
        .await?;
    row.try_get("n")
}

/// `%keyword%` with LIKE wildcards in the keyword escaped.
fn like_pattern(keyword: &str) -> String {
    let escaped = keyword
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}
