/// Kill Tony Catalog Worker
///
/// Ingests the show's YouTube catalog and extracts individual contestant
/// performances (name, start/end timestamps, confidence, intro snippet)
/// from chapter markers and closed-caption transcripts, ready for
/// idempotent upsert into the catalog store.

pub mod captions;
pub mod classify;
pub mod config;
pub mod extract;
pub mod pipeline;
pub mod store;
pub mod youtube;

// Re-export main types for easy access
pub use crate::captions::{CaptionFetchResult, CaptionFetcher, CaptionSegment, FetchStatus};
pub use crate::classify::{Episode, EpisodeClassifier};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::extract::resolve::resolve_performances;
pub use crate::extract::{
    CandidateMention, ChapterExtractor, ExtractedPerformance, MentionExtractor, MentionSource,
};
pub use crate::pipeline::{PipelineRunner, RunMode, RunSummary};
pub use crate::store::{CatalogStore, JsonCatalogStore, MemoryCatalogStore};
pub use crate::youtube::{FetchOptions, Video, YouTubeClient};
