use anyhow::Result;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{CaptionFetchResult, CaptionSegment, CaptionSource, FallbackClient, FetchStatus};
use crate::config::CaptionConfig;

const WATCH_URL: &str = "https://www.youtube.com/watch";

/// Transient faults worth retrying. Structural absences (no caption
/// tracks at all) are reported through `FetchStatus::Missing` instead
/// and never consume retry budget.
#[derive(Debug, Error)]
enum CaptionError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP {0} from caption source")]
    Status(reqwest::StatusCode),
}

/// One entry of the watch page's embedded caption-track manifest
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: Option<String>,
    language_code: Option<String>,
    /// "asr" marks auto-generated tracks
    kind: Option<String>,
}

/// Fetches and parses caption tracks for individual videos.
///
/// Each fetch call is self-contained; retry state never outlives a call.
#[derive(Clone)]
pub struct CaptionFetcher {
    client: Client,
    max_retries: u32,
    retry_delay: Duration,
    fallback: Option<FallbackClient>,
    text_re: Regex,
    entity_re: Regex,
}

impl CaptionFetcher {
    pub fn new(config: &CaptionConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()?;

        let fallback = if config.fallback.enabled && config.fallback.url.is_some() {
            Some(FallbackClient::new(&config.fallback)?)
        } else {
            None
        };

        Ok(Self {
            client,
            max_retries: config.max_retries.max(1),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            fallback,
            text_re: Regex::new(r#"(?s)<text start="([^"]+)" dur="([^"]+)"[^>]*>(.*?)</text>"#)?,
            entity_re: Regex::new(r"&#(\d+);")?,
        })
    }

    /// Fetch captions for a video, falling back to the secondary provider
    /// when configured and the primary path yields nothing.
    pub async fn fetch(&self, video_id: &str, duration_hint: Option<u32>) -> CaptionFetchResult {
        let primary = self.fetch_primary(video_id).await;
        if primary.status == FetchStatus::Ok {
            return primary;
        }

        let Some(fallback) = &self.fallback else {
            return primary;
        };

        if !fallback.accepts(duration_hint) {
            debug!(
                "Skipping fallback for {} ({}s exceeds fallback duration cap)",
                video_id,
                duration_hint.unwrap_or(0)
            );
            return primary;
        }

        match fallback
            .fetch(video_id, duration_hint.unwrap_or(0), primary.reason.as_deref())
            .await
        {
            Ok(segments) if !segments.is_empty() => {
                info!(
                    "🔁 Fallback provider returned {} segments for {}",
                    segments.len(),
                    video_id
                );
                CaptionFetchResult {
                    segments,
                    status: FetchStatus::Ok,
                    source: CaptionSource::Fallback,
                    reason: None,
                }
            }
            Ok(_) => {
                debug!("Fallback provider returned no segments for {}", video_id);
                primary
            }
            Err(e) => {
                warn!("Fallback provider failed for {}: {}", video_id, e);
                primary
            }
        }
    }

    async fn fetch_primary(&self, video_id: &str) -> CaptionFetchResult {
        let mut last_error: Option<CaptionError> = None;

        for attempt in 1..=self.max_retries {
            match self.attempt_fetch(video_id).await {
                Ok(None) => {
                    debug!("No caption tracks for {}", video_id);
                    return CaptionFetchResult::missing("no caption tracks");
                }
                Ok(Some(segments)) if segments.is_empty() => {
                    return CaptionFetchResult::missing("empty caption payload");
                }
                Ok(Some(segments)) => {
                    debug!("Fetched {} caption segments for {}", segments.len(), video_id);
                    return CaptionFetchResult::ok(segments);
                }
                Err(e) => {
                    if attempt < self.max_retries {
                        warn!(
                            "Caption attempt {}/{} failed for {}: {}",
                            attempt, self.max_retries, video_id, e
                        );
                        tokio::time::sleep(self.retry_delay * attempt).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        let reason = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        warn!(
            "Caption fetch failed for {} after {} attempts: {}",
            video_id, self.max_retries, reason
        );
        CaptionFetchResult::error(reason)
    }

    /// One attempt: `Ok(None)` means the video has no caption tracks.
    async fn attempt_fetch(&self, video_id: &str) -> Result<Option<Vec<CaptionSegment>>, CaptionError> {
        let Some(track_url) = self.caption_track_url(video_id).await? else {
            return Ok(None);
        };

        let response = self.client.get(&track_url).send().await?;
        if !response.status().is_success() {
            return Err(CaptionError::Status(response.status()));
        }

        let payload = response.text().await?;
        Ok(Some(self.parse_timed_text(&payload)))
    }

    async fn caption_track_url(&self, video_id: &str) -> Result<Option<String>, CaptionError> {
        let response = self
            .client
            .get(WATCH_URL)
            .query(&[("v", video_id)])
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CaptionError::Status(response.status()));
        }

        let html = response.text().await?;
        let Some(tracks) = extract_caption_tracks(&html) else {
            return Ok(None);
        };

        Ok(select_track(&tracks))
    }

    /// Parse timed-text XML into segments, decoding HTML entities
    fn parse_timed_text(&self, xml: &str) -> Vec<CaptionSegment> {
        let mut segments = Vec::new();

        for caps in self.text_re.captures_iter(xml) {
            let Ok(start_seconds) = caps[1].parse::<f64>() else {
                continue;
            };
            let duration_seconds = caps[2].parse::<f64>().unwrap_or(0.0);
            let text = self.decode_entities(&caps[3]);

            if text.is_empty() || start_seconds < 0.0 {
                continue;
            }

            segments.push(CaptionSegment {
                text,
                start_seconds,
                duration_seconds,
            });
        }

        segments
    }

    fn decode_entities(&self, text: &str) -> String {
        let named = text
            .replace("&amp;", "&")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&apos;", "'")
            .replace('\n', " ");

        self.entity_re
            .replace_all(&named, |caps: &regex::Captures| {
                caps[1]
                    .parse::<u32>()
                    .ok()
                    .and_then(char::from_u32)
                    .map(String::from)
                    .unwrap_or_default()
            })
            .trim()
            .to_string()
    }
}

/// Track preference: manually authored English, then auto-generated
/// English, then whatever comes first.
fn select_track(tracks: &[CaptionTrack]) -> Option<String> {
    let manual_english = tracks
        .iter()
        .find(|t| t.language_code.as_deref() == Some("en") && t.kind.as_deref() != Some("asr"));
    let auto_english = tracks
        .iter()
        .find(|t| t.language_code.as_deref() == Some("en") && t.kind.as_deref() == Some("asr"));

    manual_english
        .or(auto_english)
        .or_else(|| tracks.first())
        .and_then(|t| t.base_url.clone())
}

/// Locate the `"captionTracks":` manifest literal in the watch page and
/// parse it. The literal sometimes arrives inside an escaped JSON string,
/// so both spellings are tried.
fn extract_caption_tracks(html: &str) -> Option<Vec<CaptionTrack>> {
    if let Some(raw) = extract_json_array(html, r#""captionTracks":"#) {
        if let Ok(tracks) = serde_json::from_str::<Vec<CaptionTrack>>(&raw) {
            return Some(tracks);
        }
    }

    if let Some(raw) = extract_json_array(html, r#"\"captionTracks\":"#) {
        let unescaped = raw.replace(r#"\""#, "\"").replace(r"\\", r"\");
        if let Ok(tracks) = serde_json::from_str::<Vec<CaptionTrack>>(&unescaped) {
            return Some(tracks);
        }
    }

    None
}

/// Extract the bracket-balanced JSON array that follows `marker`,
/// ignoring brackets inside string literals.
fn extract_json_array(html: &str, marker: &str) -> Option<String> {
    let marker_index = html.find(marker)?;
    let after_marker = &html[marker_index + marker.len()..];
    let array_offset = after_marker.find('[')?;
    let array = &after_marker[array_offset..];

    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in array.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }

        match ch {
            '\\' => escaped = true,
            '"' => in_string = !in_string,
            '[' if !in_string => depth += 1,
            ']' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(array[..i + 1].to_string());
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CaptionConfig;

    fn fetcher() -> CaptionFetcher {
        CaptionFetcher::new(&CaptionConfig::default()).unwrap()
    }

    #[test]
    fn test_extract_json_array_plain() {
        let html = r#"stuff {"captionTracks":[{"baseUrl":"https://a/b?x=[1]","languageCode":"en"}],"other":1}"#;
        let raw = extract_json_array(html, r#""captionTracks":"#).unwrap();
        assert!(raw.starts_with('['));
        assert!(raw.ends_with(']'));

        let tracks: Vec<CaptionTrack> = serde_json::from_str(&raw).unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].language_code.as_deref(), Some("en"));
    }

    #[test]
    fn test_extract_caption_tracks_escaped() {
        let html = r#""playerResponse":"{\"captions\":{\"captionTracks\":[{\"baseUrl\":\"https://a/b\",\"languageCode\":\"en\",\"kind\":\"asr\"}]}}""#;
        let tracks = extract_caption_tracks(html).unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].kind.as_deref(), Some("asr"));
        assert_eq!(tracks[0].base_url.as_deref(), Some("https://a/b"));
    }

    #[test]
    fn test_extract_caption_tracks_absent() {
        assert!(extract_caption_tracks("<html>no captions here</html>").is_none());
    }

    #[test]
    fn test_select_track_prefers_manual_english() {
        let tracks = vec![
            CaptionTrack {
                base_url: Some("auto".to_string()),
                language_code: Some("en".to_string()),
                kind: Some("asr".to_string()),
            },
            CaptionTrack {
                base_url: Some("manual".to_string()),
                language_code: Some("en".to_string()),
                kind: None,
            },
            CaptionTrack {
                base_url: Some("spanish".to_string()),
                language_code: Some("es".to_string()),
                kind: None,
            },
        ];

        assert_eq!(select_track(&tracks).as_deref(), Some("manual"));
    }

    #[test]
    fn test_select_track_falls_back_to_auto_then_any() {
        let auto_only = vec![CaptionTrack {
            base_url: Some("auto".to_string()),
            language_code: Some("en".to_string()),
            kind: Some("asr".to_string()),
        }];
        assert_eq!(select_track(&auto_only).as_deref(), Some("auto"));

        let foreign_only = vec![CaptionTrack {
            base_url: Some("spanish".to_string()),
            language_code: Some("es".to_string()),
            kind: None,
        }];
        assert_eq!(select_track(&foreign_only).as_deref(), Some("spanish"));

        assert!(select_track(&[]).is_none());
    }

    #[test]
    fn test_parse_timed_text() {
        let xml = r#"<transcript>
            <text start="4994.0" dur="3.2">please welcome Casey Rocket</text>
            <text start="10.5" dur="2.0">it&amp;s &quot;showtime&quot; &#8212; now</text>
            <text start="20.0" dur="1.0"></text>
        </transcript>"#;

        let segments = fetcher().parse_timed_text(xml);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "please welcome Casey Rocket");
        assert!((segments[0].start_seconds - 4994.0).abs() < f64::EPSILON);
        assert_eq!(segments[1].text, "it&s \"showtime\" \u{2014} now");
    }

    #[test]
    fn test_decode_entities() {
        let f = fetcher();
        assert_eq!(f.decode_entities("Tom &amp; Jerry"), "Tom & Jerry");
        assert_eq!(f.decode_entities("he said &#39;hi&#39;\nthere"), "he said 'hi' there");
        assert_eq!(f.decode_entities("&#72;&#105;"), "Hi");
    }
}
