use anyhow::{Context, Result};
use secretary_core::PlanningContext;
use std::fs;
use std::path::{Path, PathBuf};

pub fn secretary_home() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".secretary"))
}

pub fn ensure_secretary_home() -> Result<PathBuf> {
    let dir = secretary_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

/// Load a task snapshot exported by the task store.
pub fn read_context(path: &Path) -> Result<PlanningContext> {
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&s).with_context(|| format!("parse {}", path.display()))
}
