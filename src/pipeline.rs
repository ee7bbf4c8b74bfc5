use anyhow::{anyhow, Result};
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::captions::{CaptionFetcher, FetchStatus};
use crate::classify::{Episode, EpisodeClassifier};
use crate::config::Config;
use crate::extract::resolve::resolve_performances;
use crate::extract::{CandidateMention, ChapterExtractor, ExtractedPerformance, MentionExtractor};
use crate::store::CatalogStore;
use crate::youtube::{FetchOptions, Video, YouTubeClient};

/// How a run selects and persists its work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Recent videos up to the configured budget (default)
    Recent,
    /// The whole channel, for initial catalog population
    Full,
    /// Full extraction, printed samples, no persistence
    DryRun,
}

impl FromStr for RunMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "recent" => Ok(Self::Recent),
            "full" => Ok(Self::Full),
            "dry-run" | "dryrun" => Ok(Self::DryRun),
            other => Err(anyhow!(
                "Unknown mode '{}' (expected recent, full or dry-run)",
                other
            )),
        }
    }
}

/// Operator-facing counts emitted at the end of a run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub videos_fetched: usize,
    pub episodes: usize,
    pub performances: usize,
    pub contestants: usize,
    pub videos_missing_captions: usize,
    pub videos_with_errors: usize,
    pub elapsed: Duration,
}

/// Extraction result for one video
#[derive(Debug)]
struct VideoOutcome {
    video_id: String,
    status: FetchStatus,
    reason: Option<String>,
    performances: Vec<ExtractedPerformance>,
}

/// Chapters are author-curated; when a video has any, its transcript
/// mentions are discarded entirely. The two sources never mix.
fn merge_sources(
    chapter_mentions: Vec<CandidateMention>,
    transcript_mentions: Vec<CandidateMention>,
) -> Vec<CandidateMention> {
    if chapter_mentions.is_empty() {
        transcript_mentions
    } else {
        chapter_mentions
    }
}

fn count_distinct_contestants(performances: &[&ExtractedPerformance]) -> usize {
    performances
        .iter()
        .map(|p| p.contestant_name.to_lowercase())
        .collect::<HashSet<_>>()
        .len()
}

/// Orchestrates a full ingestion run: listing, classification,
/// concurrency-bounded caption fetches, extraction and persistence.
pub struct PipelineRunner {
    config: Config,
    youtube: YouTubeClient,
    captions: CaptionFetcher,
    chapter_extractor: ChapterExtractor,
    mention_extractor: MentionExtractor,
    classifier: EpisodeClassifier,
}

impl PipelineRunner {
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self {
            youtube: YouTubeClient::new(&config.youtube)?,
            captions: CaptionFetcher::new(&config.captions)?,
            chapter_extractor: ChapterExtractor::new()?,
            mention_extractor: MentionExtractor::new(&config.extraction)?,
            classifier: EpisodeClassifier::new(&config.extraction)?,
            config,
        })
    }

    /// Run the pipeline. A listing failure aborts the run; per-video
    /// failures degrade that video to zero performances and continue.
    pub async fn run(
        &self,
        mode: RunMode,
        max_videos: Option<usize>,
        store: &dyn CatalogStore,
    ) -> Result<RunSummary> {
        let start = Instant::now();

        let options = FetchOptions {
            max_videos: max_videos.unwrap_or(self.config.pipeline.default_max_videos),
            fetch_all: mode == RunMode::Full,
        };

        info!("🚀 Starting catalog run ({:?} mode)...", mode);
        let videos = self.youtube.fetch_videos(&options).await?;
        info!("📹 Fetched {} videos from the channel", videos.len());

        let episodes = self.classifier.classify(&videos);
        if episodes.is_empty() {
            warn!("No episodes found. Check the API key and channel id.");
            return Ok(RunSummary {
                videos_fetched: videos.len(),
                elapsed: start.elapsed(),
                ..RunSummary::default()
            });
        }
        info!("🎬 Classified {} episodes", episodes.len());

        let outcomes = self.extract_all(&videos, &episodes).await;

        // Summary accounting, in stable episode order
        let mut all_performances: Vec<&ExtractedPerformance> = Vec::new();
        for episode in &episodes {
            if let Some(outcome) = outcomes.get(&episode.youtube_id) {
                all_performances.extend(outcome.performances.iter());
            }
        }

        let missing: Vec<&VideoOutcome> = outcomes
            .values()
            .filter(|o| o.status == FetchStatus::Missing)
            .collect();
        let errored: Vec<&VideoOutcome> = outcomes
            .values()
            .filter(|o| o.status == FetchStatus::Error)
            .collect();

        if !missing.is_empty() {
            info!("Missing captions: {} videos", missing.len());
            for outcome in missing.iter().take(5) {
                info!(
                    "  - {}{}",
                    outcome.video_id,
                    outcome
                        .reason
                        .as_deref()
                        .map(|r| format!(" ({})", r))
                        .unwrap_or_default()
                );
            }
        }
        if !errored.is_empty() {
            warn!("Caption errors: {} videos", errored.len());
            for outcome in errored.iter().take(5) {
                warn!(
                    "  - {}{}",
                    outcome.video_id,
                    outcome
                        .reason
                        .as_deref()
                        .map(|r| format!(" ({})", r))
                        .unwrap_or_default()
                );
            }
        }

        let summary = RunSummary {
            videos_fetched: videos.len(),
            episodes: episodes.len(),
            performances: all_performances.len(),
            contestants: count_distinct_contestants(&all_performances),
            videos_missing_captions: missing.len(),
            videos_with_errors: errored.len(),
            elapsed: start.elapsed(),
        };

        if mode == RunMode::DryRun {
            print_samples(&episodes, &all_performances)?;
            info!("🔍 Dry run: persistence skipped");
            return Ok(summary);
        }

        // Writes run sequentially after all extraction, keeping ordering
        // simple and auditable
        for episode in &episodes {
            let episode_id = store.upsert_episode(episode).await?;
            if let Some(outcome) = outcomes.get(&episode.youtube_id) {
                for performance in &outcome.performances {
                    store.upsert_performance(&episode_id, performance).await?;
                }
            }
        }
        info!("💾 Persisted {} episodes to the catalog store", episodes.len());

        Ok(summary)
    }

    /// Caption fetches run concurrently inside each fixed-size batch;
    /// extraction happens on whichever worker completed the fetch. A
    /// short pause between batches keeps the upstream happy.
    async fn extract_all(
        &self,
        videos: &[Video],
        episodes: &[Episode],
    ) -> HashMap<String, VideoOutcome> {
        let video_by_id: HashMap<&str, &Video> =
            videos.iter().map(|v| (v.id.as_str(), v)).collect();
        let episode_videos: Vec<&Video> = episodes
            .iter()
            .filter_map(|e| video_by_id.get(e.youtube_id.as_str()).copied())
            .collect();

        let total = episode_videos.len();
        let concurrency = self.config.pipeline.concurrency.max(1);
        let batch_delay = Duration::from_millis(self.config.pipeline.batch_delay_ms);

        info!(
            "📝 Fetching captions for {} episodes (concurrency: {})...",
            total, concurrency
        );

        let mut outcomes = HashMap::new();
        let mut processed = 0usize;

        for batch in episode_videos.chunks(concurrency) {
            let results = join_all(batch.iter().map(|video| self.process_video(video))).await;
            for outcome in results {
                outcomes.insert(outcome.video_id.clone(), outcome);
            }

            processed += batch.len();
            info!("📊 Caption progress: {}/{} videos", processed, total);

            if processed < total {
                tokio::time::sleep(batch_delay).await;
            }
        }

        outcomes
    }

    async fn process_video(&self, video: &Video) -> VideoOutcome {
        let duration_hint = if video.duration_seconds > 0 {
            Some(video.duration_seconds)
        } else {
            None
        };
        let captions = self.captions.fetch(&video.id, duration_hint).await;

        let chapter_mentions = self.chapter_extractor.extract(video);
        let transcript_mentions = if chapter_mentions.is_empty() {
            self.mention_extractor.extract(&captions.segments)
        } else {
            debug!(
                "🔖 Using {} chapter markers for {}",
                chapter_mentions.len(),
                video.id
            );
            Vec::new()
        };

        let mentions = merge_sources(chapter_mentions, transcript_mentions);
        let performances = resolve_performances(&video.id, mentions);

        if performances.is_empty() {
            debug!("No performances extracted from {}", video.id);
        }

        VideoOutcome {
            video_id: video.id.clone(),
            status: captions.status,
            reason: captions.reason,
            performances,
        }
    }
}

/// Literal sample records for operator sanity-checking before a
/// persisting run
fn print_samples(episodes: &[Episode], performances: &[&ExtractedPerformance]) -> Result<()> {
    println!("--- sample episodes ---");
    for episode in episodes.iter().take(3) {
        println!("{}", serde_json::to_string_pretty(episode)?);
    }

    println!("--- sample performances ---");
    for performance in performances.iter().take(5) {
        println!("{}", serde_json::to_string_pretty(performance)?);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::MentionSource;

    fn mention(name: &str, start: u32, source: MentionSource) -> CandidateMention {
        CandidateMention {
            source,
            contestant_name: name.to_string(),
            start_seconds: start,
            confidence: 0.9,
            snippet: String::new(),
        }
    }

    fn performance(name: &str) -> ExtractedPerformance {
        ExtractedPerformance {
            episode_youtube_id: "vid1".to_string(),
            contestant_name: name.to_string(),
            start_seconds: 0,
            end_seconds: None,
            confidence: 0.9,
            intro_snippet: String::new(),
        }
    }

    #[test]
    fn test_run_mode_parsing() {
        assert_eq!("recent".parse::<RunMode>().unwrap(), RunMode::Recent);
        assert_eq!("full".parse::<RunMode>().unwrap(), RunMode::Full);
        assert_eq!("dry-run".parse::<RunMode>().unwrap(), RunMode::DryRun);
        assert_eq!("DRY-RUN".parse::<RunMode>().unwrap(), RunMode::DryRun);
        assert!("bogus".parse::<RunMode>().is_err());
    }

    #[test]
    fn test_chapter_precedence() {
        let chapters = vec![mention("Jane Doe", 100, MentionSource::Chapter)];
        let transcript = vec![
            mention("John Smith", 50, MentionSource::Transcript),
            mention("Ali Macofsky", 500, MentionSource::Transcript),
        ];

        let merged = merge_sources(chapters, transcript);
        assert_eq!(merged.len(), 1);
        assert!(merged.iter().all(|m| m.source == MentionSource::Chapter));
    }

    #[test]
    fn test_transcript_used_when_no_chapters() {
        let transcript = vec![mention("John Smith", 50, MentionSource::Transcript)];
        let merged = merge_sources(Vec::new(), transcript);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].source, MentionSource::Transcript);
    }

    #[test]
    fn test_count_distinct_contestants() {
        let a = performance("Casey Rocket");
        let b = performance("casey rocket");
        let c = performance("Hans Kim");
        let performances = vec![&a, &b, &c];

        assert_eq!(count_distinct_contestants(&performances), 2);
    }
}
