use anyhow::Result;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::ExtractionConfig;
use crate::youtube::Video;

/// A video classified as a genuine numbered episode of the show
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub youtube_id: String,
    pub title: String,
    /// Parsed from the title; a missing number does not disqualify the
    /// video, it is surfaced downstream as a data-quality gap.
    pub episode_number: Option<u32>,
    pub published_at: DateTime<Utc>,
    pub duration_seconds: u32,
    pub youtube_url: String,
}

/// Filters the raw video list down to actual episodes and parses
/// episode numbers from titles.
///
/// Common title formats:
/// - "KILL TONY #712"
/// - "Kill Tony Episode 712"
/// - "KILL TONY #712 - Joe Rogan"
#[derive(Clone)]
pub struct EpisodeClassifier {
    show_name: String,
    non_episode_markers: Vec<String>,
    hash_re: Regex,
    episode_re: Regex,
    ep_re: Regex,
}

impl EpisodeClassifier {
    pub fn new(config: &ExtractionConfig) -> Result<Self> {
        Ok(Self {
            show_name: config.show_name.to_lowercase(),
            non_episode_markers: config
                .non_episode_markers
                .iter()
                .map(|marker| marker.to_lowercase())
                .collect(),
            hash_re: Regex::new(r"#(\d+)")?,
            episode_re: Regex::new(r"(?i)episode\s*(\d+)")?,
            ep_re: Regex::new(r"(?i)\bep\.?\s*(\d+)")?,
        })
    }

    /// Pure and stateless: the same input always classifies the same way.
    pub fn classify(&self, videos: &[Video]) -> Vec<Episode> {
        videos
            .iter()
            .filter(|video| self.is_episode(&video.title))
            .map(|video| Episode {
                youtube_id: video.id.clone(),
                title: video.title.clone(),
                episode_number: self.episode_number(&video.title),
                published_at: video.published_at,
                duration_seconds: video.duration_seconds,
                youtube_url: video.url.clone(),
            })
            .collect()
    }

    fn is_episode(&self, title: &str) -> bool {
        let lower = title.to_lowercase();

        if !lower.contains(&self.show_name) {
            return false;
        }

        !self
            .non_episode_markers
            .iter()
            .any(|marker| lower.contains(marker))
    }

    /// Try "#712", then "Episode 712", then "Ep. 712"
    pub fn episode_number(&self, title: &str) -> Option<u32> {
        for re in [&self.hash_re, &self.episode_re, &self.ep_re] {
            if let Some(caps) = re.captures(title) {
                if let Ok(number) = caps[1].parse() {
                    return Some(number);
                }
            }
        }

        None
    }
}
