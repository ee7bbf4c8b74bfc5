use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

use crate::classify::Episode;
use crate::extract::ExtractedPerformance;

/// Narrow boundary to the catalog's storage layer.
///
/// Both operations are idempotent on their natural keys; the pipeline
/// calls them with at-least-once semantics and it is the store's job to
/// make reruns converge to the same rows. Contestant identity resolution
/// (alias lookup, creation on first sight) belongs to the implementor.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Upsert an episode keyed on its YouTube id, returning the internal
    /// episode id.
    async fn upsert_episode(&self, episode: &Episode) -> Result<String>;

    /// Upsert a performance keyed on (episode, contestant, start).
    async fn upsert_performance(
        &self,
        episode_id: &str,
        performance: &ExtractedPerformance,
    ) -> Result<()>;
}

fn performance_key(episode_id: &str, performance: &ExtractedPerformance) -> String {
    format!(
        "{}:{}:{}",
        episode_id,
        performance.contestant_name.to_lowercase(),
        performance.start_seconds
    )
}

/// In-memory store for tests and dry-run inspection
#[derive(Default)]
pub struct MemoryCatalogStore {
    episodes: RwLock<HashMap<String, Episode>>,
    performances: RwLock<HashMap<String, ExtractedPerformance>>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn episode_count(&self) -> usize {
        self.episodes.read().await.len()
    }

    pub async fn performance_count(&self) -> usize {
        self.performances.read().await.len()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn upsert_episode(&self, episode: &Episode) -> Result<String> {
        self.episodes
            .write()
            .await
            .insert(episode.youtube_id.clone(), episode.clone());
        Ok(episode.youtube_id.clone())
    }

    async fn upsert_performance(
        &self,
        episode_id: &str,
        performance: &ExtractedPerformance,
    ) -> Result<()> {
        self.performances
            .write()
            .await
            .insert(performance_key(episode_id, performance), performance.clone());
        Ok(())
    }
}

/// File-backed store writing keyed JSON documents.
///
/// The catalog service proper owns the relational schema; this store
/// keeps run output auditable on disk with the same upsert keys.
pub struct JsonCatalogStore {
    episodes_path: PathBuf,
    performances_path: PathBuf,
}

impl JsonCatalogStore {
    pub fn new(catalog_dir: &Path) -> Self {
        Self {
            episodes_path: catalog_dir.join("episodes.json"),
            performances_path: catalog_dir.join("performances.json"),
        }
    }

    async fn load_map<T: DeserializeOwned>(path: &Path) -> Result<HashMap<String, T>> {
        match tokio::fs::read_to_string(path).await {
            Ok(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("Corrupt catalog file: {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e).with_context(|| format!("Cannot read {}", path.display())),
        }
    }

    async fn save_map<T: Serialize>(path: &Path, map: &HashMap<String, T>) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(map)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for JsonCatalogStore {
    async fn upsert_episode(&self, episode: &Episode) -> Result<String> {
        let mut episodes: HashMap<String, Episode> = Self::load_map(&self.episodes_path).await?;
        episodes.insert(episode.youtube_id.clone(), episode.clone());
        Self::save_map(&self.episodes_path, &episodes).await?;

        debug!("Upserted episode {}", episode.youtube_id);
        Ok(episode.youtube_id.clone())
    }

    async fn upsert_performance(
        &self,
        episode_id: &str,
        performance: &ExtractedPerformance,
    ) -> Result<()> {
        let mut performances: HashMap<String, ExtractedPerformance> =
            Self::load_map(&self.performances_path).await?;
        performances.insert(performance_key(episode_id, performance), performance.clone());
        Self::save_map(&self.performances_path, &performances).await?;

        Ok(())
    }
}
