//! Corpus loaders for the supported dataset formats
//!
//! Supports SQuAD-style nested JSON and flat JSON Lines records.

use crate::data::{flatten_squad, CorpusEntry, SquadDataset};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Trait for loading a corpus from a file
pub trait CorpusLoader {
    /// Load every entry of the corpus stored at `path`
    fn load(&self, path: &Path) -> Result<Vec<CorpusEntry>>;

    /// Check if this loader can handle the given file
    fn can_load(&self, path: &Path) -> bool;
}

/// SQuAD-format loader (`.json`)
///
/// Every paragraph under every article becomes one entry whose topic is the
/// article title.
pub struct SquadLoader;

impl CorpusLoader for SquadLoader {
    fn load(&self, path: &Path) -> Result<Vec<CorpusEntry>> {
        let json = fs::read_to_string(path)
            .context(format!("Failed to read SQuAD file: {:?}", path))?;

        let dataset: SquadDataset = serde_json::from_str(&json)
            .context(format!("Failed to parse SQuAD JSON: {:?}", path))?;

        let entries = flatten_squad(&dataset);
        tracing::debug!(
            "Flattened {} articles into {} passages from {:?}",
            dataset.data.len(),
            entries.len(),
            path
        );

        Ok(entries)
    }

    fn can_load(&self, path: &Path) -> bool {
        if let Some(ext) = path.extension() {
            ext == "json"
        } else {
            false
        }
    }
}

/// JSON Lines loader (`.jsonl`), one `{"topic": .., "passage": ..}` per line
pub struct RecordsLoader;

impl CorpusLoader for RecordsLoader {
    fn load(&self, path: &Path) -> Result<Vec<CorpusEntry>> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read records file: {:?}", path))?;

        let mut entries = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let entry: CorpusEntry = serde_json::from_str(line)
                .context(format!("Invalid record on line {} of {:?}", line_no + 1, path))?;
            entries.push(entry);
        }

        Ok(entries)
    }

    fn can_load(&self, path: &Path) -> bool {
        if let Some(ext) = path.extension() {
            ext == "jsonl"
        } else {
            false
        }
    }
}

/// Multi-format loader that delegates to the first loader accepting the path
pub struct MultiFormatLoader {
    loaders: Vec<Box<dyn CorpusLoader>>,
}

impl MultiFormatLoader {
    /// Create a new multi-format loader with all supported loaders
    pub fn new() -> Self {
        let loaders: Vec<Box<dyn CorpusLoader>> = vec![
            Box::new(SquadLoader),
            Box::new(RecordsLoader),
        ];

        Self { loaders }
    }

    /// Load a corpus, automatically selecting the appropriate loader
    pub fn load(&self, path: &Path) -> Result<Vec<CorpusEntry>> {
        for loader in &self.loaders {
            if loader.can_load(path) {
                return loader.load(path);
            }
        }

        anyhow::bail!("No corpus loader found for file: {:?} (expected .json or .jsonl)", path)
    }
}

impl Default for MultiFormatLoader {
    fn default() -> Self {
        Self::new()
    }
}
