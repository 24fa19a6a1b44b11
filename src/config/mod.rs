mod file_config;

pub use file_config::{BackgroundJobsConfig, FileConfig, PipelineConfig};

use anyhow::{bail, Result};
use std::path::PathBuf;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub db_dir: PathBuf,
    pub log_level: String,

    // Feature configs (with defaults)
    pub pipeline: PipelineSettings,
    pub background_jobs: BackgroundJobsSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let log_level = file
            .log_level
            .or_else(|| cli.log_level.clone())
            .unwrap_or_else(|| "info".to_string());

        let pipeline_file = file.pipeline.unwrap_or_default();
        let pipeline_defaults = PipelineSettings::default();
        let pipeline = PipelineSettings {
            affinity_top_k: pipeline_file
                .affinity_top_k
                .unwrap_or(pipeline_defaults.affinity_top_k),
            candidate_quota: pipeline_file
                .candidate_quota
                .unwrap_or(pipeline_defaults.candidate_quota),
            affinity_interval_minutes: pipeline_file
                .affinity_interval_minutes
                .unwrap_or(pipeline_defaults.affinity_interval_minutes),
            recommendation_interval_minutes: pipeline_file
                .recommendation_interval_minutes
                .unwrap_or(pipeline_defaults.recommendation_interval_minutes),
            trends_interval_minutes: pipeline_file
                .trends_interval_minutes
                .unwrap_or(pipeline_defaults.trends_interval_minutes),
        };
        if pipeline.affinity_top_k == 0 {
            bail!("pipeline.affinity_top_k must be at least 1");
        }
        if pipeline.candidate_quota == 0 {
            bail!("pipeline.candidate_quota must be at least 1");
        }

        let jobs_file = file.background_jobs.unwrap_or_default();
        let jobs_defaults = BackgroundJobsSettings::default();
        let background_jobs = BackgroundJobsSettings {
            audit_retention_days: jobs_file
                .audit_retention_days
                .unwrap_or(jobs_defaults.audit_retention_days),
            audit_cleanup_interval_hours: jobs_file
                .audit_cleanup_interval_hours
                .unwrap_or(jobs_defaults.audit_cleanup_interval_hours),
        };

        Ok(Self {
            db_dir,
            log_level,
            pipeline,
            background_jobs,
        })
    }

    pub fn catalog_db_path(&self) -> PathBuf {
        self.db_dir.join("catalog.db")
    }

    pub fn user_db_path(&self) -> PathBuf {
        self.db_dir.join("user.db")
    }

    pub fn derived_db_path(&self) -> PathBuf {
        self.db_dir.join("derived.db")
    }

    pub fn server_db_path(&self) -> PathBuf {
        self.db_dir.join("server.db")
    }
}

/// Tunables for the preference analysis pipeline jobs.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// How many favored facet values to keep per user and facet kind.
    pub affinity_top_k: usize,
    /// How many candidate books to keep per facet value or trend tag.
    pub candidate_quota: usize,
    pub affinity_interval_minutes: u64,
    pub recommendation_interval_minutes: u64,
    pub trends_interval_minutes: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            affinity_top_k: 5,
            candidate_quota: 15,
            affinity_interval_minutes: 30,
            recommendation_interval_minutes: 60,
            trends_interval_minutes: 60,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackgroundJobsSettings {
    pub audit_retention_days: u64,
    pub audit_cleanup_interval_hours: u64,
}

impl Default for BackgroundJobsSettings {
    fn default() -> Self {
        Self {
            audit_retention_days: 90,
            audit_cleanup_interval_hours: 24,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_temp_db_dir() -> TempDir {
        TempDir::new().unwrap()
    }

    #[test]
    fn test_resolve_cli_only() {
        let temp_dir = make_temp_db_dir();
        let cli = CliConfig {
            db_dir: Some(temp_dir.path().to_path_buf()),
            log_level: Some("debug".to_string()),
        };

        let config = AppConfig::resolve(&cli, None).unwrap();

        assert_eq!(config.db_dir, temp_dir.path());
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.pipeline.affinity_top_k, 5);
        assert_eq!(config.pipeline.candidate_quota, 15);
        assert_eq!(config.background_jobs.audit_retention_days, 90);
    }

    #[test]
    fn test_resolve_toml_overrides_cli() {
        let temp_dir = make_temp_db_dir();
        let cli = CliConfig {
            db_dir: Some(PathBuf::from("/should/be/overridden")),
            log_level: Some("info".to_string()),
        };

        let file_config = FileConfig {
            db_dir: Some(temp_dir.path().to_string_lossy().to_string()),
            log_level: Some("trace".to_string()),
            pipeline: Some(PipelineConfig {
                affinity_top_k: Some(3),
                candidate_quota: Some(10),
                ..Default::default()
            }),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, Some(file_config)).unwrap();

        // TOML values should override CLI
        assert_eq!(config.db_dir, temp_dir.path());
        assert_eq!(config.log_level, "trace");
        assert_eq!(config.pipeline.affinity_top_k, 3);
        assert_eq!(config.pipeline.candidate_quota, 10);
        // Defaults used when TOML doesn't specify
        assert_eq!(config.pipeline.affinity_interval_minutes, 30);
    }

    #[test]
    fn test_resolve_missing_db_dir_error() {
        let cli = CliConfig::default();
        let result = AppConfig::resolve(&cli, None);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("db_dir must be specified"));
    }

    #[test]
    fn test_resolve_nonexistent_db_dir_error() {
        let cli = CliConfig {
            db_dir: Some(PathBuf::from("/nonexistent/path/that/should/not/exist")),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("does not exist"));
    }

    #[test]
    fn test_resolve_rejects_zero_top_k() {
        let temp_dir = make_temp_db_dir();
        let cli = CliConfig {
            db_dir: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };
        let file_config = FileConfig {
            pipeline: Some(PipelineConfig {
                affinity_top_k: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        };

        let result = AppConfig::resolve(&cli, Some(file_config));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("affinity_top_k"));
    }

    #[test]
    fn test_db_path_helpers() {
        let temp_dir = make_temp_db_dir();
        let cli = CliConfig {
            db_dir: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, None).unwrap();

        assert_eq!(config.catalog_db_path(), temp_dir.path().join("catalog.db"));
        assert_eq!(config.user_db_path(), temp_dir.path().join("user.db"));
        assert_eq!(config.derived_db_path(), temp_dir.path().join("derived.db"));
        assert_eq!(config.server_db_path(), temp_dir.path().join("server.db"));
    }
}
