use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::CaptionSegment;
use crate::config::FallbackConfig;

/// Client for the optional secondary transcript provider.
///
/// The provider accepts a video reference and returns segments for
/// videos the primary caption source cannot serve. Long videos are
/// skipped entirely as a cost control.
#[derive(Clone)]
pub struct FallbackClient {
    client: Client,
    url: String,
    max_video_duration_seconds: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FallbackRequest<'a> {
    video_id: &'a str,
    video_url: String,
    duration_seconds: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct FallbackResponse {
    #[serde(default)]
    segments: Vec<FallbackSegment>,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FallbackSegment {
    text: String,
    start: f64,
    #[serde(default)]
    duration: f64,
}

impl FallbackClient {
    pub fn new(config: &FallbackConfig) -> Result<Self> {
        let url = config
            .url
            .clone()
            .ok_or_else(|| anyhow!("Fallback provider URL not configured"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            url,
            max_video_duration_seconds: config.max_video_duration_seconds,
        })
    }

    /// Whether a video of the given duration is eligible for fallback.
    /// Unknown durations are accepted.
    pub fn accepts(&self, duration_hint: Option<u32>) -> bool {
        match duration_hint {
            Some(duration) => duration <= self.max_video_duration_seconds,
            None => true,
        }
    }

    pub async fn fetch(
        &self,
        video_id: &str,
        duration_seconds: u32,
        reason: Option<&str>,
    ) -> Result<Vec<CaptionSegment>> {
        let request = FallbackRequest {
            video_id,
            video_url: format!("https://www.youtube.com/watch?v={}", video_id),
            duration_seconds,
            reason,
        };

        debug!("Requesting fallback transcript for {}", video_id);

        let response = self.client.post(&self.url).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Fallback provider returned HTTP {}",
                response.status()
            ));
        }

        let payload: FallbackResponse = response.json().await?;
        if let Some(reason) = &payload.reason {
            debug!("Fallback provider note for {}: {}", video_id, reason);
        }

        Ok(payload
            .segments
            .into_iter()
            .map(|s| CaptionSegment {
                text: s.text,
                start_seconds: s.start,
                duration_seconds: s.duration,
            })
            .collect())
    }
}
