use crate::model::{LatestEntry, LatestPrices, PriceReading, StorageError};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Last known price per site, carried from one cycle to the next.
#[derive(Debug, Clone, Default)]
pub struct PriceBook {
    entries: BTreeMap<String, LatestEntry>,
}

impl PriceBook {
    pub fn baseline(&self, site: &str) -> Option<&LatestEntry> {
        self.entries.get(site)
    }

    /// Replaces the baselines of the sites read this cycle; other sites keep theirs.
    pub fn record(&mut self, readings: &[PriceReading]) {
        for reading in readings {
            self.entries.insert(reading.site.clone(), LatestEntry::from(reading));
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_latest(&self, product: &str, timestamp: DateTime<Utc>) -> LatestPrices {
        LatestPrices {
            timestamp,
            product: product.to_string(),
            prices: self.entries.values().cloned().collect(),
        }
    }
}

impl From<LatestPrices> for PriceBook {
    fn from(latest: LatestPrices) -> Self {
        Self {
            entries: latest
                .prices
                .into_iter()
                .map(|entry| (entry.site.clone(), entry))
                .collect(),
        }
    }
}

/// The latest-prices JSON file, rewritten in full every cycle.
pub struct LatestPricesFile {
    path: PathBuf,
}

impl LatestPricesFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the stored baselines; a missing or corrupt file starts an empty book.
    pub fn load(&self) -> PriceBook {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => {
                info!("No previous prices at {}", self.path.display());
                return PriceBook::default();
            }
        };
        match serde_json::from_str::<LatestPrices>(&content) {
            Ok(latest) => PriceBook::from(latest),
            Err(e) => {
                warn!("Ignoring unreadable {}: {}", self.path.display(), e);
                PriceBook::default()
            }
        }
    }

    pub fn save(&self, latest: &LatestPrices) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(latest)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}
