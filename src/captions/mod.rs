/// Caption retrieval for episode videos
///
/// The primary path scrapes the video's public watch page for a caption
/// track manifest and downloads the timed-text payload; an optional
/// secondary provider covers videos the primary cannot serve.

pub mod fallback;
pub mod fetcher;

pub use fallback::FallbackClient;
pub use fetcher::CaptionFetcher;

use serde::{Deserialize, Serialize};

/// One timed caption line. The pipeline tolerates unsorted and
/// overlapping segments from either provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionSegment {
    pub text: String,
    pub start_seconds: f64,
    pub duration_seconds: f64,
}

/// Outcome classification for one video's caption fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchStatus {
    /// Segments retrieved
    Ok,
    /// No captions exist for this video (structural, never retried)
    Missing,
    /// Retries exhausted on transient failures
    Error,
}

/// Which provider produced the segments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptionSource {
    Primary,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct CaptionFetchResult {
    pub segments: Vec<CaptionSegment>,
    pub status: FetchStatus,
    pub source: CaptionSource,
    pub reason: Option<String>,
}

impl CaptionFetchResult {
    pub fn ok(segments: Vec<CaptionSegment>) -> Self {
        Self {
            segments,
            status: FetchStatus::Ok,
            source: CaptionSource::Primary,
            reason: None,
        }
    }

    pub fn missing(reason: impl Into<String>) -> Self {
        Self {
            segments: Vec::new(),
            status: FetchStatus::Missing,
            source: CaptionSource::Primary,
            reason: Some(reason.into()),
        }
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Self {
            segments: Vec::new(),
            status: FetchStatus::Error,
            source: CaptionSource::Primary,
            reason: Some(reason.into()),
        }
    }
}
