use anyhow::Result;
use regex::Regex;
use std::collections::HashSet;

use super::{truncate_snippet, CandidateMention, MentionSource};
use crate::captions::CaptionSegment;
use crate::config::ExtractionConfig;

/// Name-shaped token: 1-3 capitalized words, tolerant of apostrophes,
/// hyphens and common particles.
const NAME_TOKEN: &str =
    r"[A-Z][A-Za-z'-]+(?:\s+(?:de\s+la\s+|van\s+|von\s+)?[A-Z][A-Za-z'-]+){0,2}";

/// Confidence tuning. Scores stay clamped to [0.1, 0.99]; certainty is
/// reserved for curated chapter markers.
const FULL_NAME_BONUS: f64 = 0.08;
const LONG_CONTEXT_BONUS: f64 = 0.05;
const LONG_CONTEXT_CHARS: usize = 40;
const MIN_CONFIDENCE: f64 = 0.1;
const MAX_CONFIDENCE: f64 = 0.99;
const SNIPPET_MAX_CHARS: usize = 200;

/// Words a name capture can never be
const STOPWORDS: &[&str] = &[
    "you", "me", "him", "her", "them", "us", "we", "they", "it", "the", "this", "that",
    "everyone", "everybody", "somebody",
];

/// One introduction phrase rule: the regex captures the name, the base
/// confidence reflects how unambiguous the phrase is.
pub struct IntroPattern {
    pub regex: Regex,
    pub base_confidence: f64,
}

/// Ordered phrase table, most specific first. Curated show phrasings
/// outrank generic transitions.
fn default_patterns() -> Result<Vec<IntroPattern>> {
    let table: &[(String, f64)] = &[
        (
            format!(
                r"(?i:please welcome|put your hands together for|give it up for|coming to the stage|let'?s hear it for|welcome to the stage)\s+(?:(?i:the)\s+)?({})",
                NAME_TOKEN
            ),
            0.85,
        ),
        (
            format!(
                r"(?i:our next comedian is|our next comic is|introducing|here to the stage is)\s+({})",
                NAME_TOKEN
            ),
            0.70,
        ),
        (
            format!(r"(?i:next up|up next)[,:]?\s+(?:(?i:is|we have)\s+)?({})", NAME_TOKEN),
            0.55,
        ),
        (
            format!(r"({}),?\s+(?i:come on up|take the stage|you'?re up)", NAME_TOKEN),
            0.55,
        ),
    ];

    table
        .iter()
        .map(|(pattern, base_confidence)| {
            Ok(IntroPattern {
                regex: Regex::new(pattern)?,
                base_confidence: *base_confidence,
            })
        })
        .collect()
}

/// Scans transcript segments for introduction phrases. Used only for
/// videos whose descriptions carry no usable chapter markers.
pub struct MentionExtractor {
    patterns: Vec<IntroPattern>,
    denylist: HashSet<String>,
    denylist_enabled: bool,
}

impl MentionExtractor {
    pub fn new(config: &ExtractionConfig) -> Result<Self> {
        Ok(Self {
            patterns: default_patterns()?,
            denylist: config
                .denylist
                .iter()
                .map(|name| name.to_lowercase())
                .collect(),
            denylist_enabled: config.denylist_enabled,
        })
    }

    /// Replace the phrase table, keeping the denylist
    pub fn with_patterns(mut self, patterns: Vec<IntroPattern>) -> Self {
        self.patterns = patterns;
        self
    }

    /// Extract candidate mentions from transcript segments. Output order
    /// is unspecified; sorting is the resolver's job.
    pub fn extract(&self, segments: &[CaptionSegment]) -> Vec<CandidateMention> {
        let mut mentions = Vec::new();

        for segment in segments {
            let text = segment.text.trim();
            if text.is_empty() || segment.start_seconds < 0.0 {
                continue;
            }

            for pattern in &self.patterns {
                let Some(caps) = pattern.regex.captures(text) else {
                    continue;
                };
                let Some(name) = caps.get(1).map(|m| m.as_str().trim()) else {
                    continue;
                };
                if self.is_rejected(name) {
                    continue;
                }

                mentions.push(CandidateMention {
                    source: MentionSource::Transcript,
                    contestant_name: name.to_string(),
                    start_seconds: segment.start_seconds.floor() as u32,
                    confidence: score(pattern.base_confidence, name, text),
                    snippet: truncate_snippet(text, SNIPPET_MAX_CHARS),
                });
                break;
            }
        }

        mentions
    }

    fn is_rejected(&self, name: &str) -> bool {
        let lower = name.to_lowercase();

        if lower.chars().count() < 2 {
            return true;
        }
        if name.chars().all(|c| c.is_ascii_digit() || c.is_whitespace()) {
            return true;
        }
        if STOPWORDS.contains(&lower.as_str()) {
            return true;
        }
        if self.denylist_enabled && self.denylist.contains(&lower) {
            return true;
        }

        false
    }
}

fn score(base_confidence: f64, name: &str, context: &str) -> f64 {
    let mut confidence = base_confidence;

    if name.split_whitespace().count() >= 2 {
        confidence += FULL_NAME_BONUS;
    }
    if context.chars().count() > LONG_CONTEXT_CHARS {
        confidence += LONG_CONTEXT_BONUS;
    }

    confidence.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(text: &str, start: f64) -> CaptionSegment {
        CaptionSegment {
            text: text.to_string(),
            start_seconds: start,
            duration_seconds: 3.0,
        }
    }

    fn extractor() -> MentionExtractor {
        MentionExtractor::new(&ExtractionConfig::default()).unwrap()
    }

    #[test]
    fn test_curated_phrase_scores_high() {
        let segments = vec![segment("please welcome Casey Rocket to the stage", 4994.0)];
        let mentions = extractor().extract(&segments);

        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].contestant_name, "Casey Rocket");
        assert_eq!(mentions[0].start_seconds, 4994);
        assert_eq!(mentions[0].source, MentionSource::Transcript);
        assert!(mentions[0].confidence > 0.9, "got {}", mentions[0].confidence);
        assert!(mentions[0].confidence <= 0.99);
    }

    #[test]
    fn test_generic_transition_scores_lower() {
        let curated = extractor().extract(&[segment("give it up for Hans Kim", 10.0)]);
        let generic = extractor().extract(&[segment("next up is Hans Kim", 10.0)]);

        assert_eq!(curated.len(), 1);
        assert_eq!(generic.len(), 1);
        assert!(generic[0].confidence < curated[0].confidence);
    }

    #[test]
    fn test_name_first_pattern() {
        let mentions = extractor().extract(&[segment("David Lucas, come on up", 42.0)]);
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].contestant_name, "David Lucas");
    }

    #[test]
    fn test_full_name_bonus() {
        let single = extractor().extract(&[segment("please welcome Casey", 1.0)]);
        let full = extractor().extract(&[segment("please welcome Casey Rocket", 1.0)]);

        assert_eq!(single.len(), 1);
        assert_eq!(full.len(), 1);
        assert!(full[0].confidence > single[0].confidence);
    }

    #[test]
    fn test_long_context_bonus() {
        let terse = extractor().extract(&[segment("please welcome Hans Kim", 1.0)]);
        let verbose = extractor().extract(&[segment(
            "all right everybody please welcome Hans Kim back to the show one more time",
            1.0,
        )]);

        assert!(verbose[0].confidence > terse[0].confidence);
    }

    #[test]
    fn test_confidence_stays_in_bounds() {
        let mentions = extractor().extract(&[segment(
            "everybody in the building please welcome Jeremiah Wonder to the Kill Tony stage",
            1.0,
        )]);
        assert_eq!(mentions.len(), 1);
        assert!(mentions[0].confidence >= 0.1);
        assert!(mentions[0].confidence <= 0.99);
    }

    #[test]
    fn test_denylist_suppresses_hosts() {
        let mentions = extractor().extract(&[
            segment("give it up for Brian Redban", 5.0),
            segment("please welcome William Montgomery", 50.0),
        ]);
        assert!(mentions.is_empty());
    }

    #[test]
    fn test_denylist_can_be_disabled() {
        let config = ExtractionConfig {
            denylist_enabled: false,
            ..ExtractionConfig::default()
        };
        let extractor = MentionExtractor::new(&config).unwrap();

        let mentions = extractor.extract(&[segment("give it up for Brian Redban", 5.0)]);
        assert_eq!(mentions.len(), 1);
    }

    #[test]
    fn test_rejects_non_names() {
        let extractor = extractor();
        // No capitalized token after the phrase: no match at all
        assert!(extractor
            .extract(&[segment("please welcome everybody", 1.0)])
            .is_empty());
        assert!(extractor.extract(&[segment("random crowd noise", 1.0)]).is_empty());
    }

    #[test]
    fn test_empty_transcript_yields_nothing() {
        assert!(extractor().extract(&[]).is_empty());
    }

    #[test]
    fn test_snippet_carries_segment_text() {
        let mentions = extractor().extract(&[segment("please welcome Casey Rocket", 1.0)]);
        assert_eq!(mentions[0].snippet, "please welcome Casey Rocket");
    }
}
