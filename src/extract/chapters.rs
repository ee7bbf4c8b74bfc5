use anyhow::Result;
use regex::Regex;

use super::{CandidateMention, MentionSource};
use crate::youtube::Video;

/// Chapter-sourced mentions carry a fixed high confidence; the lines are
/// author-curated.
pub const CHAPTER_CONFIDENCE: f64 = 0.95;

/// Labels that mark show structure rather than a contestant set
const SKIP_LABELS: &[&str] = &[
    "intro",
    "introduction",
    "housekeeping",
    "sponsors",
    "sponsor",
    "ads",
    "ad",
    "intermission",
    "outro",
    "closing",
    "credits",
    "band",
];

/// Parses conventional "HH:MM:SS - label" chapter lists out of video
/// descriptions. Pure; no I/O.
#[derive(Clone)]
pub struct ChapterExtractor {
    line_re: Regex,
    paren_re: Regex,
    name_re: Regex,
    strip_re: Regex,
}

impl ChapterExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            line_re: Regex::new(
                r"^(?P<time>(?:\d{1,2}:)?\d{1,2}:\d{2})\s*(?:[-–—|•])?\s*(?P<label>.+)$",
            )?,
            paren_re: Regex::new(r"\([^)]*\)")?,
            name_re: Regex::new(
                r"[A-Z][A-Za-z'-]+(?:\s+(?:de\s+la\s+|van\s+|von\s+)?[A-Z][A-Za-z'-]+){0,2}",
            )?,
            strip_re: Regex::new(r"[^\w\s'-]")?,
        })
    }

    /// Extract one candidate mention per valid chapter line, sorted by
    /// start time.
    pub fn extract(&self, video: &Video) -> Vec<CandidateMention> {
        let mut mentions = Vec::new();

        for line in video.description.lines() {
            let Some(caps) = self.line_re.captures(line.trim()) else {
                continue;
            };

            let Some(start_seconds) = parse_timestamp(&caps["time"]) else {
                continue;
            };

            let label = caps["label"].trim();
            let Some(contestant_name) = self.contestant_from_label(label) else {
                continue;
            };

            mentions.push(CandidateMention {
                source: MentionSource::Chapter,
                contestant_name,
                start_seconds,
                confidence: CHAPTER_CONFIDENCE,
                snippet: label.to_string(),
            });
        }

        mentions.sort_by_key(|m| m.start_seconds);
        mentions
    }

    /// Pull a contestant name out of a chapter label, or None when the
    /// label marks show structure or carries no name-shaped token.
    fn contestant_from_label(&self, label: &str) -> Option<String> {
        let cleaned = self.paren_re.replace_all(label, "");
        let cleaned = cleaned.trim();
        if cleaned.is_empty() {
            return None;
        }

        if SKIP_LABELS.contains(&cleaned.to_lowercase().as_str()) {
            return None;
        }

        let name_match = self.name_re.find(cleaned)?;
        let name = self
            .strip_re
            .replace_all(name_match.as_str(), "")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        if name.chars().count() < 2 {
            return None;
        }

        Some(name)
    }
}

/// Convert "H:MM:SS" or "MM:SS" to seconds
fn parse_timestamp(value: &str) -> Option<u32> {
    let parts: Vec<u32> = value
        .split(':')
        .map(|part| part.parse::<u32>())
        .collect::<Result<_, _>>()
        .ok()?;

    match parts.as_slice() {
        [h, m, s] => Some(h * 3600 + m * 60 + s),
        [m, s] => Some(m * 60 + s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn video_with_description(description: &str) -> Video {
        Video {
            id: "vid1".to_string(),
            title: "KILL TONY #712".to_string(),
            published_at: Utc::now(),
            duration_seconds: 7200,
            description: description.to_string(),
            url: "https://www.youtube.com/watch?v=vid1".to_string(),
        }
    }

    fn extractor() -> ChapterExtractor {
        ChapterExtractor::new().unwrap()
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("12:34"), Some(754));
        assert_eq!(parse_timestamp("1:02:03"), Some(3723));
        assert_eq!(parse_timestamp("0:45"), Some(45));
        assert_eq!(parse_timestamp("nope"), None);
    }

    #[test]
    fn test_extracts_chapter_lines() {
        let video = video_with_description("12:34 - Jane Doe\n45:10 - John Smith");
        let mentions = extractor().extract(&video);

        assert_eq!(mentions.len(), 2);
        assert_eq!(mentions[0].contestant_name, "Jane Doe");
        assert_eq!(mentions[0].start_seconds, 754);
        assert_eq!(mentions[0].source, MentionSource::Chapter);
        assert!((mentions[0].confidence - 0.95).abs() < f64::EPSILON);
        assert_eq!(mentions[1].contestant_name, "John Smith");
        assert_eq!(mentions[1].start_seconds, 2710);
    }

    #[test]
    fn test_sorted_by_start() {
        let video = video_with_description("45:10 - John Smith\n12:34 - Jane Doe");
        let mentions = extractor().extract(&video);

        assert_eq!(mentions[0].contestant_name, "Jane Doe");
        assert_eq!(mentions[1].contestant_name, "John Smith");
    }

    #[test]
    fn test_skips_structural_labels() {
        let video = video_with_description(
            "0:00 - Intro\n5:00 - Sponsors\n12:34 - Jane Doe\n1:58:00 - Outro",
        );
        let mentions = extractor().extract(&video);

        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].contestant_name, "Jane Doe");
    }

    #[test]
    fn test_skips_lines_without_name_shaped_token() {
        let video = video_with_description("12:34 - the usual chaos\n45:10 - John Smith");
        let mentions = extractor().extract(&video);

        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].contestant_name, "John Smith");
    }

    #[test]
    fn test_strips_parenthetical_asides() {
        let video = video_with_description("12:34 - Jane Doe (first timer)");
        let mentions = extractor().extract(&video);

        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].contestant_name, "Jane Doe");
        // snippet keeps the raw label
        assert_eq!(mentions[0].snippet, "Jane Doe (first timer)");
    }

    #[test]
    fn test_separator_variants() {
        for separator in ["-", "–", "—", "|", "•", ""] {
            let video = video_with_description(&format!("12:34 {} Jane Doe", separator));
            let mentions = extractor().extract(&video);
            assert_eq!(mentions.len(), 1, "separator {:?}", separator);
        }
    }

    #[test]
    fn test_empty_description_yields_nothing() {
        let video = video_with_description("");
        assert!(extractor().extract(&video).is_empty());
    }
}
