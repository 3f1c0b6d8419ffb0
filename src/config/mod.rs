use crate::{
    error::{ApiError, Result},
    ml::ArtifactPaths,
    services::{recommendation, DataSources},
};
use ::config::{Environment, Map};
use log::{info, warn};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "APP";
const DEFAULT_DATA_FILES: &str = "googleplaystore_fixed.csv,googleplaystore.csv,apps_data.csv";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub models_dir: PathBuf,
    /// Comma-separated catalog file names, tried in order.
    pub data_files: String,
    pub default_recommendations: usize,
    pub max_recommendations: usize,
}

impl Config {
    /// Defaults overlaid with `APP_*` environment variables (after `.env` is loaded).
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_environment(None)
    }

    fn from_environment(vars: Option<Map<String, String>>) -> Result<Self> {
        let config: Config = ::config::Config::builder()
            .set_default("host", "127.0.0.1")?
            .set_default("port", 8080)?
            .set_default("data_dir", "data")?
            .set_default("models_dir", "models")?
            .set_default("data_files", DEFAULT_DATA_FILES)?
            .set_default(
                "default_recommendations",
                recommendation::DEFAULT_RECOMMENDATIONS as i64,
            )?
            .set_default(
                "max_recommendations",
                recommendation::DEFAULT_MAX_RECOMMENDATIONS as i64,
            )?
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .source(vars),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.max_recommendations == 0 {
            return Err(ApiError::Config(
                "max_recommendations must be at least 1".to_string(),
            ));
        }
        if self.default_recommendations == 0
            || self.default_recommendations > self.max_recommendations
        {
            return Err(ApiError::Config(format!(
                "default_recommendations must be between 1 and {}",
                self.max_recommendations
            )));
        }
        if self.data_paths().is_empty() {
            return Err(ApiError::Config("data_files lists no files".to_string()));
        }
        Ok(())
    }

    /// Candidate catalog files under the data directory.
    pub fn data_paths(&self) -> Vec<PathBuf> {
        self.data_files
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| self.data_dir.join(name))
            .collect()
    }

    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths::in_dir(&self.models_dir)
    }

    pub fn data_sources(&self) -> DataSources {
        DataSources {
            catalog_paths: self.data_paths(),
            artifacts: self.artifact_paths(),
        }
    }

    /// Required files that are not on disk. Only one catalog file needs to exist, so
    /// data files are reported missing only when none of them is present.
    pub fn verify_paths(&self) -> Vec<PathBuf> {
        let mut missing: Vec<PathBuf> = self
            .artifact_paths()
            .all()
            .into_iter()
            .filter(|path| !path.exists())
            .map(Path::to_path_buf)
            .collect();

        let data = self.data_paths();
        if !data.iter().any(|path| path.exists()) {
            missing.extend(data);
        }

        if missing.is_empty() {
            info!("All required data and artifact files are present");
        } else {
            for path in &missing {
                warn!("Missing file: {}", path.display());
            }
        }
        missing
    }
}
