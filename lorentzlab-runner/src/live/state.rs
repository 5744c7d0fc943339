//! Position persistence between restarts.

use std::fs;
use std::path::{Path, PathBuf};

use lorentzlab_core::domain::ActivePosition;

use super::{CollaboratorError, StateStore};

/// Keeps the last saved list in memory. Counts saves for inspection.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    positions: Vec<ActivePosition>,
    saves: usize,
    fail_saves: bool,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_positions(positions: Vec<ActivePosition>) -> Self {
        Self {
            positions,
            ..Self::default()
        }
    }

    pub fn set_save_failure(&mut self, fail: bool) {
        self.fail_saves = fail;
    }

    pub fn positions(&self) -> &[ActivePosition] {
        &self.positions
    }

    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Result<Vec<ActivePosition>, CollaboratorError> {
        Ok(self.positions.clone())
    }

    fn save(&mut self, positions: &[ActivePosition]) -> Result<(), CollaboratorError> {
        self.saves += 1;
        if self.fail_saves {
            return Err(CollaboratorError::State("save unavailable".into()));
        }
        self.positions = positions.to_vec();
        Ok(())
    }
}

/// Pretty-printed JSON array of positions in a single file.
///
/// Writes are atomic: write to `<file>.tmp`, then rename into place. A
/// missing file loads as an empty list.
#[derive(Debug, Clone)]
pub struct JsonFileStateStore {
    path: PathBuf,
}

impl JsonFileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl StateStore for JsonFileStateStore {
    fn load(&self) -> Result<Vec<ActivePosition>, CollaboratorError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&mut self, positions: &[ActivePosition]) -> Result<(), CollaboratorError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(positions)?;
        let tmp = self.tmp_path();
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            // Clean up temp file on rename failure
            let _ = fs::remove_file(&tmp);
            CollaboratorError::State(format!("atomic rename failed: {e}"))
        })
    }
}
