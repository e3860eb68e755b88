//! Persistent chunk translation cache used to resume interrupted runs.

use crate::config::Tone;
use crate::error::{Result, SubtransError};
use crate::translate::{TranslationClient, TranslationOutcome};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Where a chunk translation came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Found in the cache; no request was made.
    Cached(String),
    /// Produced by the translation client and stored.
    Fresh(TranslationOutcome),
}

impl Lookup {
    pub fn text(&self) -> &str {
        match self {
            Lookup::Cached(text) => text,
            Lookup::Fresh(outcome) => outcome.text(),
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Lookup::Cached(text) => text,
            Lookup::Fresh(outcome) => outcome.into_text(),
        }
    }
}

/// Map from exact original chunk text to its translation, mirrored to a
/// JSON file after every new entry.
#[derive(Debug)]
pub struct TranslationCache {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl TranslationCache {
    /// Load the cache from `path`. A missing file gives an empty cache.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if !path.exists() {
            debug!("No cache at {:?}, starting fresh", path);
            return Ok(Self {
                path,
                entries: BTreeMap::new(),
            });
        }

        let contents = std::fs::read_to_string(&path)?;
        let entries: BTreeMap<String, String> = serde_json::from_str(&contents).map_err(|e| {
            SubtransError::Cache(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        info!("Resuming with {} cached chunks from {:?}", entries.len(), path);
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, chunk: &str) -> Option<&str> {
        self.entries.get(chunk).map(String::as_str)
    }

    /// Store a translation and persist the whole cache.
    pub fn insert(&mut self, chunk: impl Into<String>, translated: impl Into<String>) -> Result<()> {
        self.entries.insert(chunk.into(), translated.into());
        self.save()
    }

    /// Return the cached translation of `chunk`, or translate it with `client`
    /// and store the result before returning.
    ///
    /// Fallback outcomes are stored as well, so a resumed run does not retry
    /// chunks that already exhausted their budget.
    pub async fn get_or_translate(
        &mut self,
        chunk: &str,
        tone: Tone,
        client: &TranslationClient,
    ) -> Result<Lookup> {
        if let Some(cached) = self.get(chunk) {
            return Ok(Lookup::Cached(cached.to_string()));
        }

        let outcome = client.translate(chunk, tone).await;
        self.insert(chunk, outcome.text())?;
        Ok(Lookup::Fresh(outcome))
    }

    /// Rewrite the cache file. Writes to a temporary file in the same
    /// directory and renames it over the old one.
    pub fn save(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let json = serde_json::to_string_pretty(&self.entries)?;
        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(json.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| SubtransError::Io(e.error))?;

        debug!("Saved {} cache entries to {:?}", self.entries.len(), self.path);
        Ok(())
    }

    /// Delete the cache file. Returns whether a file was removed.
    pub fn remove(&self) -> Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Cache file {:?} has been deleted", self.path);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Cache file {:?} not found, nothing deleted", self.path);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}
