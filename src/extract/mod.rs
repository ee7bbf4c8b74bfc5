/// Performance extraction from chapter markers and transcripts
///
/// Chapter markers are author-curated and win outright when present;
/// transcript mentions are the heuristic fallback. The two sources are
/// never merged for the same video.

pub mod chapters;
pub mod mentions;
pub mod resolve;

pub use chapters::ChapterExtractor;
pub use mentions::MentionExtractor;

use serde::{Deserialize, Serialize};

/// Where a candidate mention came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MentionSource {
    /// Description chapter line, treated as curated ground truth
    Chapter,
    /// Introduction phrase matched in the transcript
    Transcript,
}

/// An unresolved signal that a new performance begins
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateMention {
    pub source: MentionSource,
    pub contestant_name: String,
    pub start_seconds: u32,
    /// Heuristic trust score in [0, 1]
    pub confidence: f64,
    pub snippet: String,
}

/// Final pipeline output for one performance within a video
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedPerformance {
    pub episode_youtube_id: String,
    pub contestant_name: String,
    pub start_seconds: u32,
    /// None for the last performance of a video when the true end is unknown
    pub end_seconds: Option<u32>,
    pub confidence: f64,
    pub intro_snippet: String,
}

/// Collapse whitespace and capitalize each word. Fully-uppercase caption
/// text is title-cased; mixed-case words (McGregor, O'Neal) keep their
/// interior capitals.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let is_upper = word.chars().all(|c| !c.is_lowercase());
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    let rest: String = chars.collect();
                    let rest = if is_upper { rest.to_lowercase() } else { rest };
                    first.to_uppercase().collect::<String>() + &rest
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Truncate a snippet for storage, appending an ellipsis when cut
pub(crate) fn truncate_snippet(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", cut.trim_end())
}
