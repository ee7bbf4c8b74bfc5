use std::collections::HashMap;

use super::{normalize_name, CandidateMention, ExtractedPerformance, MentionSource};

/// No real set is shorter than this; also the floor used for boundary
/// inference.
pub const MIN_SET_SECONDS: u32 = 30;

/// Estimated length for a trailing transcript-mode performance
pub const TYPICAL_SET_SECONDS: u32 = 60;

/// A repeated mention of the same name inside this window is the same
/// set ("one more time for X"), not a new performance.
pub const DEDUP_WINDOW_SECONDS: u32 = 120;

/// Gap left before the next performer's start
pub const NEXT_INTRO_BUFFER_SECONDS: u32 = 5;

/// Merge a video's candidate mentions into ordered, non-overlapping
/// performances.
///
/// Input is single-sourced: callers pass either the chapter mentions or
/// the transcript mentions for a video, never a mix. Output start times
/// are strictly increasing and every closed interval spans at least
/// `MIN_SET_SECONDS`.
pub fn resolve_performances(
    episode_youtube_id: &str,
    mentions: Vec<CandidateMention>,
) -> Vec<ExtractedPerformance> {
    if mentions.is_empty() {
        return Vec::new();
    }

    let source = mentions[0].source;

    let mut sorted = mentions;
    sorted.sort_by_key(|m| m.start_seconds);

    // Window dedup plus minimum spacing. Suppression never refreshes the
    // window; it is measured from the last *emitted* mention of a name.
    let mut survivors: Vec<CandidateMention> = Vec::new();
    let mut last_emitted_at: HashMap<String, u32> = HashMap::new();

    for mention in sorted {
        let key = normalize_name(&mention.contestant_name).to_lowercase();

        if let Some(&previous) = last_emitted_at.get(&key) {
            if mention.start_seconds.saturating_sub(previous) <= DEDUP_WINDOW_SECONDS {
                continue;
            }
        }

        if let Some(last) = survivors.last() {
            // A set shorter than the minimum duration cannot exist
            if mention.start_seconds < last.start_seconds + MIN_SET_SECONDS {
                continue;
            }
        }

        last_emitted_at.insert(key, mention.start_seconds);
        survivors.push(mention);
    }

    let mut performances = Vec::with_capacity(survivors.len());

    for (i, mention) in survivors.iter().enumerate() {
        let end_seconds = match survivors.get(i + 1) {
            Some(next) => Some(
                (mention.start_seconds + MIN_SET_SECONDS)
                    .max(next.start_seconds.saturating_sub(NEXT_INTRO_BUFFER_SECONDS)),
            ),
            None => match source {
                // No chapter gives an exact end for the final set
                MentionSource::Chapter => None,
                MentionSource::Transcript => Some(mention.start_seconds + TYPICAL_SET_SECONDS),
            },
        };

        performances.push(ExtractedPerformance {
            episode_youtube_id: episode_youtube_id.to_string(),
            contestant_name: normalize_name(&mention.contestant_name),
            start_seconds: mention.start_seconds,
            end_seconds,
            confidence: mention.confidence,
            intro_snippet: mention.snippet.clone(),
        });
    }

    performances
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mention(name: &str, start: u32, source: MentionSource) -> CandidateMention {
        CandidateMention {
            source,
            contestant_name: name.to_string(),
            start_seconds: start,
            confidence: if source == MentionSource::Chapter { 0.95 } else { 0.8 },
            snippet: format!("intro for {}", name),
        }
    }

    #[test]
    fn test_chapter_boundaries() {
        let mentions = vec![
            mention("Jane Doe", 754, MentionSource::Chapter),
            mention("John Smith", 2710, MentionSource::Chapter),
        ];

        let performances = resolve_performances("vid1", mentions);
        assert_eq!(performances.len(), 2);

        assert_eq!(performances[0].contestant_name, "Jane Doe");
        assert_eq!(performances[0].start_seconds, 754);
        assert_eq!(performances[0].end_seconds, Some(2705));

        assert_eq!(performances[1].contestant_name, "John Smith");
        assert_eq!(performances[1].start_seconds, 2710);
        assert_eq!(performances[1].end_seconds, None);
    }

    #[test]
    fn test_transcript_last_gets_typical_duration() {
        let mentions = vec![mention("Casey Rocket", 4994, MentionSource::Transcript)];

        let performances = resolve_performances("vid1", mentions);
        assert_eq!(performances.len(), 1);
        assert_eq!(performances[0].end_seconds, Some(4994 + TYPICAL_SET_SECONDS));
    }

    #[test]
    fn test_dedup_window_collapses_repeats() {
        let mentions = vec![
            mention("Kam Patterson", 100, MentionSource::Transcript),
            mention("Kam Patterson", 150, MentionSource::Transcript),
        ];

        let performances = resolve_performances("vid1", mentions);
        assert_eq!(performances.len(), 1);
        assert_eq!(performances[0].start_seconds, 100);
    }

    #[test]
    fn test_same_name_outside_window_is_a_new_set() {
        let mentions = vec![
            mention("Kam Patterson", 100, MentionSource::Transcript),
            mention("Kam Patterson", 400, MentionSource::Transcript),
        ];

        let performances = resolve_performances("vid1", mentions);
        assert_eq!(performances.len(), 2);
    }

    #[test]
    fn test_dedup_is_case_insensitive() {
        let mentions = vec![
            mention("KAM PATTERSON", 100, MentionSource::Transcript),
            mention("Kam Patterson", 150, MentionSource::Transcript),
        ];

        let performances = resolve_performances("vid1", mentions);
        assert_eq!(performances.len(), 1);
        assert_eq!(performances[0].contestant_name, "Kam Patterson");
    }

    #[test]
    fn test_suppression_does_not_refresh_window() {
        let mentions = vec![
            mention("Hans Kim", 100, MentionSource::Transcript),
            mention("Hans Kim", 150, MentionSource::Transcript),
            mention("Hans Kim", 230, MentionSource::Transcript),
        ];

        // 230 - 100 > 120, so the third mention survives even though the
        // suppressed one at 150 was closer.
        let performances = resolve_performances("vid1", mentions);
        assert_eq!(performances.len(), 2);
        assert_eq!(performances[1].start_seconds, 230);
    }

    #[test]
    fn test_unsorted_input_is_sorted() {
        let mentions = vec![
            mention("John Smith", 2710, MentionSource::Chapter),
            mention("Jane Doe", 754, MentionSource::Chapter),
        ];

        let performances = resolve_performances("vid1", mentions);
        assert_eq!(performances[0].contestant_name, "Jane Doe");
        assert_eq!(performances[1].contestant_name, "John Smith");
    }

    #[test]
    fn test_minimum_spacing_suppresses_impossible_sets() {
        let mentions = vec![
            mention("Jane Doe", 100, MentionSource::Transcript),
            mention("John Smith", 110, MentionSource::Transcript),
            mention("Ali Macofsky", 200, MentionSource::Transcript),
        ];

        let performances = resolve_performances("vid1", mentions);
        assert_eq!(performances.len(), 2);
        assert_eq!(performances[0].contestant_name, "Jane Doe");
        assert_eq!(performances[1].contestant_name, "Ali Macofsky");
    }

    #[test]
    fn test_monotonic_and_min_duration_invariants() {
        let mentions = vec![
            mention("A One", 10, MentionSource::Transcript),
            mention("B Two", 45, MentionSource::Transcript),
            mention("C Three", 80, MentionSource::Transcript),
            mention("D Four", 600, MentionSource::Transcript),
        ];

        let performances = resolve_performances("vid1", mentions);
        for pair in performances.windows(2) {
            assert!(pair[0].start_seconds < pair[1].start_seconds);
            if let Some(end) = pair[0].end_seconds {
                assert!(end <= pair[1].start_seconds);
            }
        }
        for performance in &performances {
            if let Some(end) = performance.end_seconds {
                assert!(end - performance.start_seconds >= MIN_SET_SECONDS);
            }
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(resolve_performances("vid1", Vec::new()).is_empty());
    }
}
