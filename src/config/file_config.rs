use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub log_level: Option<String>,

    // Feature configs
    pub pipeline: Option<PipelineConfig>,
    pub background_jobs: Option<BackgroundJobsConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct PipelineConfig {
    pub affinity_top_k: Option<usize>,
    pub candidate_quota: Option<usize>,
    pub affinity_interval_minutes: Option<u64>,
    pub recommendation_interval_minutes: Option<u64>,
    pub trends_interval_minutes: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct BackgroundJobsConfig {
    pub audit_retention_days: Option<u64>,
    pub audit_cleanup_interval_hours: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            db_dir = "/data"
            log_level = "debug"

            [pipeline]
            affinity_top_k = 3
            candidate_quota = 10
            affinity_interval_minutes = 45

            [background_jobs]
            audit_retention_days = 30
        "#;
        let config: FileConfig = toml::from_str(toml).unwrap();

        assert_eq!(config.db_dir, Some("/data".to_string()));
        assert_eq!(config.log_level, Some("debug".to_string()));
        let pipeline = config.pipeline.unwrap();
        assert_eq!(pipeline.affinity_top_k, Some(3));
        assert_eq!(pipeline.candidate_quota, Some(10));
        assert_eq!(pipeline.affinity_interval_minutes, Some(45));
        assert!(pipeline.recommendation_interval_minutes.is_none());
        assert_eq!(
            config.background_jobs.unwrap().audit_retention_days,
            Some(30)
        );
    }

    #[test]
    fn test_parse_empty_config() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert!(config.db_dir.is_none());
        assert!(config.pipeline.is_none());
        assert!(config.background_jobs.is_none());
    }
}
