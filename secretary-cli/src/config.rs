use anyhow::{Context, Result};
use secretary_core::PlannerConfig;
use std::fs;
use std::path::{Path, PathBuf};

use crate::state::ensure_secretary_home;

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_secretary_home()?.join("config.toml"))
}

fn resolve(path: Option<&Path>) -> Result<PathBuf> {
    match path {
        Some(p) => Ok(p.to_path_buf()),
        None => config_path(),
    }
}

/// Missing file means defaults.
pub fn load_config(path: Option<&Path>) -> Result<PlannerConfig> {
    let p = resolve(path)?;
    if !p.exists() {
        tracing::debug!(path = %p.display(), "no config file; using defaults");
        return Ok(PlannerConfig::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config(cfg: &PlannerConfig, path: Option<&Path>) -> Result<PathBuf> {
    let p = resolve(path)?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(p)
}

pub fn init_config(path: Option<&Path>) -> Result<()> {
    let p = resolve(path)?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    let written = save_config(&PlannerConfig::default(), Some(&p))?;
    println!("Wrote {}", written.display());
    Ok(())
}

pub fn show_config(path: Option<&Path>) -> Result<()> {
    let cfg = load_config(path)?;
    print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_survive_toml_round_trip() {
        let s = toml::to_string_pretty(&PlannerConfig::default()).unwrap();
        assert!(s.contains("time_budget_secs = 10.0"));
        assert!(s.contains("[objective]"));
        let back: PlannerConfig = toml::from_str(&s).unwrap();
        assert_eq!(back, PlannerConfig::default());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let cfg: PlannerConfig = toml::from_str("use_exact_solver = false\n").unwrap();
        assert!(!cfg.use_exact_solver);
        assert_eq!(cfg.proposal_count, 5);
    }
}
