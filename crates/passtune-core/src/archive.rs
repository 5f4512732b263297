use crate::error::{PassTuneError, PtResult};
use crate::pipeline::EvaluationStats;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Serialize, Deserialize)]
struct ArchiveMeta {
    fingerprint: String,
}

/// Durable memo of canonical candidate key -> fitness. One pipeline run can
/// take minutes, so every fitness ever computed is kept and re-read on
/// resume. The document is rewritten in full on every insertion, via a temp
/// file and an atomic rename so a crash mid-write cannot destroy the
/// archive.
///
/// Invariant: a present key is never overwritten with a different fitness.
/// The pipeline is treated as deterministic per candidate; see DESIGN.md for
/// the discussion of that assumption.
pub struct FitnessArchive {
    path: PathBuf,
    fingerprint: String,
    entries: HashMap<String, f64>,
}

impl FitnessArchive {
    /// Start a fresh archive at `path` for the landscape identified by
    /// `fingerprint`.
    pub fn create<P: AsRef<Path>>(path: P, fingerprint: &str) -> PtResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let archive = Self {
            path,
            fingerprint: fingerprint.to_string(),
            entries: HashMap::new(),
        };
        archive.write_meta()?;
        Ok(archive)
    }

    /// Resume from an existing archive. The sidecar fingerprint must match
    /// the current catalog: archive keys are positional indices, so scores
    /// from a different catalog would be silently wrong, not merely stale.
    pub fn load<P: AsRef<Path>>(path: P, fingerprint: &str) -> PtResult<Self> {
        let path = path.as_ref().to_path_buf();
        let content = fs::read_to_string(&path)?;
        let entries: HashMap<String, f64> = serde_json::from_str(&content)?;

        let meta_path = Self::meta_path_for(&path);
        match fs::read_to_string(&meta_path) {
            Ok(raw) => {
                let meta: ArchiveMeta = serde_json::from_str(&raw)?;
                if meta.fingerprint != fingerprint {
                    return Err(PassTuneError::ArchiveMismatch {
                        path: path.display().to_string(),
                        expected: fingerprint.to_string(),
                        found: meta.fingerprint,
                    });
                }
            }
            Err(_) => {
                warn!(
                    "No fingerprint sidecar next to '{}'; assuming the archive matches the \
                     current catalog",
                    path.display()
                );
            }
        }

        info!(
            "Resumed fitness archive '{}' with {} entries",
            path.display(),
            entries.len()
        );

        let archive = Self {
            path,
            fingerprint: fingerprint.to_string(),
            entries,
        };
        archive.write_meta()?;
        Ok(archive)
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.entries.get(key).copied()
    }

    /// Insert and flush. Returns false (and changes nothing) if the key is
    /// already present. A flush failure is fatal to the run: losing the
    /// archive silently reintroduces redundant expensive evaluations.
    pub fn record(&mut self, key: &str, fitness: f64) -> PtResult<bool> {
        if self.entries.contains_key(key) {
            return Ok(false);
        }
        self.entries.insert(key.to_string(), fitness);
        self.flush()?;
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> PtResult<()> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn write_meta(&self) -> PtResult<()> {
        let meta = ArchiveMeta {
            fingerprint: self.fingerprint.clone(),
        };
        fs::write(
            Self::meta_path_for(&self.path),
            serde_json::to_string_pretty(&meta)?,
        )?;
        Ok(())
    }

    fn meta_path_for(path: &Path) -> PathBuf {
        path.with_extension("meta.json")
    }
}

/// Per-candidate pipeline diagnostics, keyed like the fitness archive.
/// Write-heavy, read by humans after the fact, never by the search itself,
/// so persistence failures are logged and swallowed.
pub struct StatsArchive {
    path: PathBuf,
    entries: HashMap<String, EvaluationStats>,
}

impl StatsArchive {
    pub fn create<P: AsRef<Path>>(path: P) -> PtResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path,
            entries: HashMap::new(),
        })
    }

    pub fn record(&mut self, key: &str, stats: EvaluationStats) {
        self.entries.insert(key.to_string(), stats);
        if let Err(e) = self.flush() {
            warn!(
                "Failed to persist evaluation stats to '{}': {}",
                self.path.display(),
                e
            );
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn flush(&self) -> PtResult<()> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}
