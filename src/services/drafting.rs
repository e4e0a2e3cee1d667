use regex::Regex;
use std::sync::{Arc, OnceLock};

use crate::models::reference::ReferenceEntry;
use crate::ports::TextGenerationService;
use crate::services::gemini::GeminiError;

/// Characters of each reference shown to the model.
const REFERENCE_EXCERPT_CHARS: usize = 300;

/// Lyric used whenever drafting fails.
pub const FALLBACK_LYRICS: &str = "[Verse 1]
Dil ki baatein kehni hain tujhse
Har pal tera intezaar hai mujhe

[Chorus]
Tu hi meri dhadkan, tu hi meri jaan
Tere bina adhoora hai yeh jahaan

[Verse 2]
Chaandni raaton mein tera hi khayal
Har sapne mein bas tera hi sawaal

[Outro]
Tu hi meri dhadkan, tu hi meri jaan";

#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    #[error("Lyric generation failed: {0}")]
    Generation(#[from] GeminiError),

    #[error("Generated text contained no usable lyrics")]
    Empty,
}

/// Drafts lyrics with a single call to the text generation service.
pub struct LyricsDrafter {
    generator: Arc<dyn TextGenerationService>,
}

impl LyricsDrafter {
    pub fn new(generator: Arc<dyn TextGenerationService>) -> Self {
        Self { generator }
    }

    /// One attempt, no retries; callers substitute [`FALLBACK_LYRICS`] on error.
    pub async fn draft(
        &self,
        theme: &str,
        style_tags: &[String],
        references: &[ReferenceEntry],
    ) -> Result<String, DraftError> {
        let prompt = build_prompt(theme, style_tags, references);
        let raw = self.generator.generate(&prompt).await?;
        let lyrics = sanitize_lyrics(&raw);
        if lyrics.is_empty() {
            return Err(DraftError::Empty);
        }
        Ok(lyrics)
    }
}

pub fn build_prompt(theme: &str, style_tags: &[String], references: &[ReferenceEntry]) -> String {
    let style = if style_tags.is_empty() {
        "romantic Bollywood".to_string()
    } else {
        style_tags.join(", ")
    };

    let mut prompt = format!(
        "Write original Hindi song lyrics.\n\n\
         Theme: {theme}\n\
         Style: {style}\n\n\
         STRICT FORMAT RULES:\n\
         - Use only these section labels, each on its own line in square brackets: \
         [Verse 1], [Verse 2], [Chorus], [Bridge], [Outro].\n\
         - Start directly with [Verse 1]. No title, no introduction.\n\
         - Write Hindi in Latin script (Hinglish). No English translation.\n\
         - Do not explain, summarize, or comment on the lyrics.\n\
         - Keep it between 16 and 32 lines.\n"
    );

    if !references.is_empty() {
        prompt.push_str(
            "\nReference songs for mood and vocabulary only. Do NOT copy lines from them:\n",
        );
        for reference in references {
            prompt.push_str(&format!(
                "\n--- {} ---\n{}\n",
                reference.name,
                excerpt(&reference.text, REFERENCE_EXCERPT_CHARS)
            ));
        }
    }

    prompt.push_str("\nNow write the lyrics.");
    prompt
}

fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn section_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?im)^[ \t]*(?:\[\s*(?:intro|verse|pre-chorus|chorus|bridge|hook|outro)\b[^\]\n]*\]|(?:intro|verse|pre-chorus|chorus|bridge|hook|outro)\b[^\n:]{0,12}:)",
        )
        .expect("valid regex")
    })
}

fn trailing_commentary() -> &'static [Regex] {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        [
            r"(?is)\n[ \t]*(?:english\s+)?(?:translation|note|notes|explanation|meaning)\s*:.*\z",
            r"(?is)\n[ \t]*\((?:english\s+)?(?:translation|note|this song)[^)]*\)\s*\z",
            r"(?is)\n[ \t]*(?:i hope|hope you|let me know|feel free|these lyrics|this song)\b.*\z",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("valid regex"))
        .collect()
    })
}

/// Reduce model output to the sectioned lyric body.
pub fn sanitize_lyrics(raw: &str) -> String {
    let text = raw.replace("```", "").replace("**", "");

    let body = match section_marker().find(&text) {
        Some(m) => &text[m.start()..],
        None => text.as_str(),
    };

    let mut body = body.trim().to_string();
    loop {
        let before = body.len();
        for re in trailing_commentary() {
            body = re.replace(&body, "").trim_end().to_string();
        }
        if body.len() == before {
            break;
        }
    }

    body.trim().to_string()
}
