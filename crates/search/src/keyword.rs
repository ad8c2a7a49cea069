use crate::query::{ChatMessage, ChatRole};
use nucleo_matcher::pattern::{CaseMatching, Normalization, Pattern};
use nucleo_matcher::{Matcher, Utf32String};
use sheet_context_chunker::{display_value, Chunk};
use std::collections::BTreeSet;

const STOPWORDS: &[&str] = &[
    "a", "about", "an", "and", "are", "at", "be", "by", "can", "do", "does", "for", "from", "give",
    "how", "i", "in", "is", "it", "me", "my", "of", "on", "or", "please", "show", "tell", "that",
    "the", "this", "to", "was", "what", "which", "with",
];

/// Fuzzy name matches below this quality are ignored
const MIN_FUZZY_QUALITY: f32 = 0.5;

/// Query text plus the recent conversation, tokenised once per locate call
#[derive(Debug, Clone, Default)]
pub struct QueryTerms {
    /// Lowercased query and history text
    pub text: String,
    pub tokens: BTreeSet<String>,
}

impl QueryTerms {
    /// Combine the query with the last `window` user messages
    pub fn new(query: &str, history: &[ChatMessage], window: usize) -> Self {
        let recent: Vec<&str> = history
            .iter()
            .rev()
            .filter(|m| m.role == ChatRole::User)
            .take(window)
            .map(|m| m.content.as_str())
            .collect();

        let mut text = query.trim().to_lowercase();
        for message in recent.into_iter().rev() {
            text.push('\n');
            text.push_str(&message.to_lowercase());
        }

        let tokens = tokenize(&text);
        Self { text, tokens }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Lowercase alphanumeric tokens minus stopwords
pub fn tokenize(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .filter(|t| t.chars().count() > 1 || t.chars().all(|c| c.is_ascii_digit()))
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .collect()
}

/// Searchable words of a chunk: sheet name, summary, anchors, range metadata
pub fn chunk_tokens(chunk: &Chunk) -> BTreeSet<String> {
    let payload = &chunk.payload;
    let mut text = format!("{} {}", payload.sheet_name, payload.summary);
    for anchor in &payload.anchors {
        text.push(' ');
        text.push_str(&display_value(&anchor.value));
        if let Some(formula) = &anchor.formula {
            text.push(' ');
            text.push_str(formula);
        }
    }
    for chart in &payload.charts {
        text.push(' ');
        text.push_str(chart);
    }
    if let Some(meta) = &payload.range {
        text.push(' ');
        text.push_str(&meta.description);
        if let Some(name) = &meta.name {
            text.push(' ');
            text.push_str(name);
        }
    }
    tokenize(&text)
}

/// Fraction of query tokens found in the chunk, in [0, 1]
pub fn keyword_overlap(query: &QueryTerms, chunk_tokens: &BTreeSet<String>) -> f32 {
    if query.tokens.is_empty() {
        return 0.0;
    }
    let hits = query.tokens.intersection(chunk_tokens).count();
    hits as f32 / query.tokens.len() as f32
}

/// True when `needle` occurs in `haystack` bounded by non-alphanumerics
pub fn contains_phrase(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(start, matched)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + matched.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

/// Fuzzy sheet-name matching with nucleo
pub struct NameMatcher {
    matcher: Matcher,
}

impl NameMatcher {
    pub fn new() -> Self {
        Self {
            matcher: Matcher::new(nucleo_matcher::Config::DEFAULT),
        }
    }

    /// Best match quality of any query token against `name`, in [0, 1].
    ///
    /// Quality is the token's score against the name relative to its score
    /// against itself; weak matches below a floor count as zero.
    pub fn quality(&mut self, query: &QueryTerms, name: &str) -> f32 {
        let haystack = Utf32String::from(name);
        let mut best = 0.0f32;

        for token in query.tokens.iter().filter(|t| t.chars().count() >= 3) {
            let pattern = Pattern::parse(token, CaseMatching::Ignore, Normalization::Smart);
            let Some(score) = pattern.score(haystack.slice(..), &mut self.matcher) else {
                continue;
            };
            let own = Utf32String::from(token.as_str());
            let perfect = pattern
                .score(own.slice(..), &mut self.matcher)
                .unwrap_or(score)
                .max(1);
            best = best.max((score as f32 / perfect as f32).min(1.0));
        }

        if best < MIN_FUZZY_QUALITY {
            0.0
        } else {
            best
        }
    }
}

impl Default for NameMatcher {
    fn default() -> Self {
        Self::new()
    }
}
