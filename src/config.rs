// file: src/config.rs
// description: application configuration management with toml support
// reference: https://docs.rs/config

use crate::error::{AnalysisError, Result};
use crate::utils::Validator;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub scheduler: SchedulerConfig,
    pub pipeline: PipelineConfig,
    pub index: IndexConfig,
    pub llm: LlmConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
    pub max_workers: usize,
    pub task_retention_hours: u64,
    pub cleanup_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    pub step_timeout_secs: u64,
    pub retrieval_k: usize,
    pub max_context_chunks: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    pub output_dir: PathBuf,
}

impl PipelineConfig {
    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv().ok();

        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        } else {
            builder = builder.add_source(config::File::from(Path::new("config/default.toml")));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("BID_ANALYZER")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|e| AnalysisError::Config(e.to_string()))?;

        let mut config: Config = settings
            .try_deserialize()
            .map_err(|e| AnalysisError::Config(e.to_string()))?;

        if config.llm.api_key.is_none() {
            config.llm.api_key = std::env::var("OPENAI_API_KEY").ok();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self {
            scheduler: SchedulerConfig {
                max_workers: 2,
                task_retention_hours: 24,
                cleanup_interval_secs: 3600,
            },
            pipeline: PipelineConfig {
                step_timeout_secs: 120,
                retrieval_k: 3,
                max_context_chunks: 10,
            },
            index: IndexConfig {
                chunk_size: 1000,
                chunk_overlap: 200,
            },
            llm: LlmConfig {
                base_url: "https://api.openai.com/v1".to_string(),
                model: "gpt-4o-mini".to_string(),
                api_key: None,
                temperature: 0.1,
                request_timeout_secs: 90,
            },
            output: OutputConfig {
                output_dir: PathBuf::from("./output"),
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.scheduler.max_workers == 0 {
            return Err(AnalysisError::Config(
                "max_workers must be greater than 0".to_string(),
            ));
        }

        if self.pipeline.step_timeout_secs == 0 {
            return Err(AnalysisError::Config(
                "step_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.pipeline.retrieval_k == 0 || self.pipeline.max_context_chunks == 0 {
            return Err(AnalysisError::Config(
                "retrieval_k and max_context_chunks must be greater than 0".to_string(),
            ));
        }

        if self.index.chunk_size == 0 {
            return Err(AnalysisError::Config(
                "chunk_size must be greater than 0".to_string(),
            ));
        }

        if self.index.chunk_overlap >= self.index.chunk_size {
            return Err(AnalysisError::Config(
                "chunk_overlap must be smaller than chunk_size".to_string(),
            ));
        }

        Validator::validate_url(&self.llm.base_url)
            .map_err(|e| AnalysisError::Config(format!("llm.base_url: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.scheduler.max_workers, 2);
    }

    #[test]
    fn test_rejects_zero_workers() {
        let mut config = Config::default_config();
        config.scheduler.max_workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_overlap_larger_than_chunk() {
        let mut config = Config::default_config();
        config.index.chunk_overlap = config.index.chunk_size;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_url_without_scheme() {
        let mut config = Config::default_config();
        config.llm.base_url = "api.openai.com/v1".to_string();
        assert!(matches!(config.validate(), Err(AnalysisError::Config(_))));
    }

    #[test]
    fn test_load_from_toml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.toml");
        fs::write(
            &path,
            r#"
[scheduler]
max_workers = 4
task_retention_hours = 6
cleanup_interval_secs = 60

[pipeline]
step_timeout_secs = 30
retrieval_k = 2
max_context_chunks = 8

[index]
chunk_size = 500
chunk_overlap = 50

[llm]
base_url = "http://localhost:11434/v1"
model = "qwen2.5"
temperature = 0.0
request_timeout_secs = 30

[output]
output_dir = "./reports"
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.scheduler.max_workers, 4);
        assert_eq!(config.pipeline.step_timeout(), Duration::from_secs(30));
        assert_eq!(config.index.chunk_size, 500);
        assert_eq!(config.output.output_dir, PathBuf::from("./reports"));
    }
}
