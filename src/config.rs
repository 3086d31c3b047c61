//! Loading pool configuration from TOML.
//!
//! Every field has a default, so an empty file (or no file) is a valid config.

use std::time::Duration;

use serde::Deserialize;
use tracing::{info, error};

use crate::domain::DifficultyClass;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
  /// Target number of unused records kept per class.
  pub stock_level: usize,
  /// Share of `stock_level` removed by one low-score eviction.
  pub eviction_fraction: f64,
  /// Run low-score eviction when a replenish finds the class at target.
  pub evict_when_full: bool,
  /// Size of the top-by-score window used once unused stock runs out.
  pub candidate_window: usize,
  /// How many times a selector retries the fresh path after losing a claim race.
  pub claim_attempts: usize,
  pub retention_days: u32,
  /// Classes replenished by the scheduled job and accepted by the problem endpoint.
  pub classes: Vec<DifficultyClass>,
  pub request_timeout_ms: u64,
  pub job_timeout_ms: u64,
  /// Pause between record deletions in the stale sweep.
  pub stale_delete_pause_ms: u64,
  pub cron_header: CronHeader,
  /// `{moves}` is replaced by the class.
  pub caption_template: String,
}

/// Header a scheduler must send to reach the cron endpoints.
#[derive(Clone, Debug, Deserialize)]
pub struct CronHeader {
  pub name: String,
  pub value: String,
}

impl Default for CronHeader {
  fn default() -> Self {
    Self { name: "x-cron-trigger".into(), value: "true".into() }
  }
}

impl Default for PoolConfig {
  fn default() -> Self {
    Self {
      stock_level: 50,
      eviction_fraction: 0.1,
      evict_when_full: true,
      candidate_window: 100,
      claim_attempts: 3,
      retention_days: 60,
      classes: vec![DifficultyClass(1), DifficultyClass(3), DifficultyClass(5)],
      request_timeout_ms: 10_000,
      job_timeout_ms: 60_000,
      stale_delete_pause_ms: 0,
      cron_header: CronHeader::default(),
      caption_template: "{moves}-move mate problem!".into(),
    }
  }
}

impl PoolConfig {
  /// Records removed per low-score eviction: `floor(stock_level * eviction_fraction)`.
  pub fn eviction_count(&self) -> usize {
    (self.stock_level as f64 * self.eviction_fraction.clamp(0.0, 1.0)).floor() as usize
  }

  pub fn retention(&self) -> chrono::Duration {
    chrono::Duration::days(i64::from(self.retention_days))
  }

  pub fn request_timeout(&self) -> Duration { Duration::from_millis(self.request_timeout_ms) }

  pub fn job_timeout(&self) -> Duration { Duration::from_millis(self.job_timeout_ms) }

  pub fn serves(&self, class: DifficultyClass) -> bool {
    self.classes.contains(&class)
  }
}

pub fn parse_config(s: &str) -> Result<PoolConfig, toml::de::Error> {
  toml::from_str::<PoolConfig>(s)
}

/// Attempt to load `PoolConfig` from POOL_CONFIG_PATH. Falls back to defaults on any error.
pub fn load_config_from_env() -> PoolConfig {
  let Ok(path) = std::env::var("POOL_CONFIG_PATH") else {
    info!(target: "tsume_pool", "POOL_CONFIG_PATH not set; using default pool config");
    return PoolConfig::default();
  };
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_config(&s) {
      Ok(cfg) => {
        info!(target: "tsume_pool", %path, "Loaded pool config (TOML)");
        cfg
      }
      Err(e) => {
        error!(target: "tsume_pool", %path, error = %e, "Failed to parse TOML config; using defaults");
        PoolConfig::default()
      }
    },
    Err(e) => {
      error!(target: "tsume_pool", %path, error = %e, "Failed to read TOML config file; using defaults");
      PoolConfig::default()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_file_yields_defaults() {
    let cfg = parse_config("").unwrap();
    assert_eq!(cfg.stock_level, 50);
    assert_eq!(cfg.eviction_count(), 5);
    assert_eq!(cfg.candidate_window, 100);
    assert_eq!(cfg.retention(), chrono::Duration::days(60));
    assert!(cfg.serves(DifficultyClass(5)));
    assert!(!cfg.serves(DifficultyClass(7)));
  }

  #[test]
  fn overrides_are_applied() {
    let cfg = parse_config(r#"
      stock_level = 20
      eviction_fraction = 0.25
      classes = [1, 7]
      [cron_header]
      name = "x-appengine-cron"
      value = "true"
    "#).unwrap();
    assert_eq!(cfg.eviction_count(), 5);
    assert_eq!(cfg.classes, vec![DifficultyClass(1), DifficultyClass(7)]);
    assert_eq!(cfg.cron_header.name, "x-appengine-cron");
    assert_eq!(cfg.job_timeout(), Duration::from_secs(60));
  }

  #[test]
  fn eviction_count_floors() {
    let cfg = PoolConfig { stock_level: 19, eviction_fraction: 0.1, ..PoolConfig::default() };
    assert_eq!(cfg.eviction_count(), 1);
    let cfg = PoolConfig { stock_level: 9, ..PoolConfig::default() };
    assert_eq!(cfg.eviction_count(), 0);
  }
}
