use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::YouTubeConfig;

const SEARCH_ENDPOINT: &str = "https://www.googleapis.com/youtube/v3/search";
const VIDEOS_ENDPOINT: &str = "https://www.googleapis.com/youtube/v3/videos";

/// One video as fetched from the source platform, fresh each run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    /// Stable external id (YouTube video id)
    pub id: String,
    pub title: String,
    pub published_at: DateTime<Utc>,
    pub duration_seconds: u32,
    /// Free text, may be empty. Chapter markers live here.
    pub description: String,
    pub url: String,
}

/// Options for a catalog fetch
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Maximum number of videos to fetch
    pub max_videos: usize,
    /// Fetch the whole channel (overrides max_videos)
    pub fetch_all: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_videos: 50,
            fetch_all: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    items: Vec<SearchItem>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: SearchSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchSnippet {
    title: String,
    published_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    items: Vec<DetailsItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetailsItem {
    id: String,
    content_details: Option<ContentDetails>,
    snippet: Option<DetailsSnippet>,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetailsSnippet {
    description: Option<String>,
}

#[derive(Debug, Default)]
struct VideoDetails {
    duration_seconds: u32,
    description: String,
}

/// Client for the channel's video catalog
#[derive(Clone)]
pub struct YouTubeClient {
    client: Client,
    api_key: String,
    channel_id: String,
    page_size: u32,
    details_batch_size: usize,
    page_delay: Duration,
    duration_re: Regex,
}

impl YouTubeClient {
    pub fn new(config: &YouTubeConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| anyhow!("YouTube API key not configured"))?;
        let channel_id = config
            .channel_id
            .clone()
            .ok_or_else(|| anyhow!("YouTube channel id not configured"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            api_key,
            channel_id,
            page_size: config.page_size,
            details_batch_size: config.details_batch_size,
            page_delay: Duration::from_millis(config.page_delay_ms),
            duration_re: Regex::new(r"PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?")?,
        })
    }

    /// Fetch the channel's videos, newest first.
    ///
    /// Search failures are fatal for the run; detail lookups degrade to
    /// zero duration / empty description per failed batch.
    pub async fn fetch_videos(&self, options: &FetchOptions) -> Result<Vec<Video>> {
        let mut videos = self.paginate_search(options).await?;

        if videos.is_empty() {
            return Ok(videos);
        }

        info!("📋 Fetching details for {} videos...", videos.len());
        let ids: Vec<String> = videos.iter().map(|v| v.id.clone()).collect();
        let details = self.fetch_details(&ids).await;

        for video in &mut videos {
            if let Some(detail) = details.get(&video.id) {
                video.duration_seconds = detail.duration_seconds;
                video.description = detail.description.clone();
            }
        }

        Ok(videos)
    }

    async fn paginate_search(&self, options: &FetchOptions) -> Result<Vec<Video>> {
        let mut videos: Vec<Video> = Vec::new();
        let mut page_token: Option<String> = None;
        let mut page_count = 0u32;

        loop {
            let mut params = vec![
                ("key", self.api_key.clone()),
                ("channelId", self.channel_id.clone()),
                ("part", "snippet".to_string()),
                ("order", "date".to_string()),
                ("maxResults", self.page_size.to_string()),
                ("type", "video".to_string()),
            ];
            if let Some(token) = &page_token {
                params.push(("pageToken", token.clone()));
            }

            let response = self
                .client
                .get(SEARCH_ENDPOINT)
                .query(&params)
                .send()
                .await
                .map_err(|e| anyhow!("YouTube search request failed: {}", e))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(anyhow!("YouTube search failed: HTTP {} - {}", status, body));
            }

            let payload: SearchResponse = response.json().await?;

            for item in payload.items {
                let Some(video_id) = item.id.video_id else {
                    continue;
                };
                videos.push(Video {
                    url: format!("https://www.youtube.com/watch?v={}", video_id),
                    id: video_id,
                    title: item.snippet.title,
                    published_at: item.snippet.published_at,
                    duration_seconds: 0,
                    description: String::new(),
                });
            }

            page_count += 1;
            info!(
                "📄 Fetched page {}: {} videos so far",
                page_count,
                videos.len()
            );

            let Some(token) = payload.next_page_token else {
                break;
            };
            if !options.fetch_all && videos.len() >= options.max_videos {
                break;
            }
            page_token = Some(token);

            // Small delay to avoid rate limiting
            tokio::time::sleep(self.page_delay).await;
        }

        if !options.fetch_all {
            videos.truncate(options.max_videos);
        }

        Ok(videos)
    }

    /// Bulk duration/description lookup, chunked to the API ceiling.
    /// A failed batch is logged and its videos keep defaults.
    async fn fetch_details(&self, ids: &[String]) -> HashMap<String, VideoDetails> {
        let mut details = HashMap::new();

        for chunk in ids.chunks(self.details_batch_size) {
            let params = [
                ("key", self.api_key.clone()),
                ("part", "contentDetails,snippet".to_string()),
                ("id", chunk.join(",")),
            ];

            let response = match self
                .client
                .get(VIDEOS_ENDPOINT)
                .query(&params)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    warn!("Failed to fetch details for batch of {} videos: {}", chunk.len(), e);
                    continue;
                }
            };

            if !response.status().is_success() {
                warn!(
                    "Details batch of {} videos returned HTTP {}",
                    chunk.len(),
                    response.status()
                );
                continue;
            }

            let payload: DetailsResponse = match response.json().await {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("Failed to parse details batch: {}", e);
                    continue;
                }
            };

            for item in payload.items {
                let duration_seconds = item
                    .content_details
                    .and_then(|c| c.duration)
                    .map(|d| self.parse_iso8601_duration(&d))
                    .unwrap_or(0);
                let description = item
                    .snippet
                    .and_then(|s| s.description)
                    .unwrap_or_default();

                debug!("Details for {}: {}s", item.id, duration_seconds);
                details.insert(
                    item.id,
                    VideoDetails {
                        duration_seconds,
                        description,
                    },
                );
            }
        }

        details
    }

    /// Parse an ISO-8601 duration ("PT1H23M45S") into seconds
    fn parse_iso8601_duration(&self, duration: &str) -> u32 {
        let Some(caps) = self.duration_re.captures(duration) else {
            return 0;
        };

        let part = |i: usize| -> u32 {
            caps.get(i)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0)
        };

        part(1) * 3600 + part(2) * 60 + part(3)
    }
}
