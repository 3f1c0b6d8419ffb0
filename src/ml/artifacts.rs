use crate::{
    error::{ApiError, Result},
    ml::{CategoricalEncoder, NumericScaler, RatingModel, TextVectorizer},
};
use log::{error, info, warn};
use serde::de::DeserializeOwned;
use std::{
    fs::{self, File},
    io::BufReader,
    path::{Path, PathBuf},
};

pub const VECTORIZER_FILE: &str = "tfidf_vectorizer.json";
pub const ENCODER_FILE: &str = "onehot_encoder.json";
pub const SCALER_FILE: &str = "minmax_scaler.json";
pub const MODEL_FILE: &str = "random_forest_model.json";

/// Locations of the four serialized artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub vectorizer: PathBuf,
    pub encoder: PathBuf,
    pub scaler: PathBuf,
    pub model: PathBuf,
}

impl ArtifactPaths {
    pub fn in_dir(models_dir: impl AsRef<Path>) -> Self {
        let dir = models_dir.as_ref();
        Self {
            vectorizer: dir.join(VECTORIZER_FILE),
            encoder: dir.join(ENCODER_FILE),
            scaler: dir.join(SCALER_FILE),
            model: dir.join(MODEL_FILE),
        }
    }

    pub fn all(&self) -> [&Path; 4] {
        [&self.vectorizer, &self.encoder, &self.scaler, &self.model]
    }
}

/// The pre-fitted transformers and regressor, loaded once and shared read-only.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    pub vectorizer: TextVectorizer,
    pub encoder: CategoricalEncoder,
    pub scaler: NumericScaler,
    pub model: RatingModel,
}

impl ArtifactStore {
    pub fn new(
        vectorizer: TextVectorizer,
        encoder: CategoricalEncoder,
        scaler: NumericScaler,
        model: RatingModel,
    ) -> Self {
        Self {
            vectorizer,
            encoder,
            scaler,
            model,
        }
    }

    pub fn load(paths: &ArtifactPaths) -> Result<Self> {
        let vectorizer: TextVectorizer = load_artifact(&paths.vectorizer)?;
        vectorizer.validate().map_err(|e| context(&paths.vectorizer, e))?;

        let encoder: CategoricalEncoder = load_artifact(&paths.encoder)?;
        encoder.validate().map_err(|e| context(&paths.encoder, e))?;

        let scaler: NumericScaler = load_artifact(&paths.scaler)?;
        scaler.validate().map_err(|e| context(&paths.scaler, e))?;

        let model: RatingModel = load_artifact(&paths.model)?;
        model.validate().map_err(|e| context(&paths.model, e))?;

        let store = Self::new(vectorizer, encoder, scaler, model);
        if store.fused_width() != store.model.n_features() {
            // Not fatal here: similarity still works, predictions fail per call.
            warn!(
                "Artifact widths disagree: text {} + numeric {} + categorical {} = {}, \
                 model expects {}",
                store.vectorizer.width(),
                store.scaler.width(),
                store.encoder.width(),
                store.fused_width(),
                store.model.n_features()
            );
        }

        Ok(store)
    }

    /// Column count of `[text | numeric | categorical]` produced by these transformers.
    pub fn fused_width(&self) -> usize {
        self.vectorizer.width() + self.scaler.width() + self.encoder.width()
    }
}

fn context(path: &Path, err: ApiError) -> ApiError {
    ApiError::ArtifactLoadFailed(format!("{}: {}", path.display(), err))
}

fn load_artifact<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        error!("Artifact file not found: {}", path.display());
        let similar = similar_artifacts(path);
        if !similar.is_empty() {
            warn!("Found similar artifact files: {:?}", similar);
        }
        return Err(ApiError::ArtifactLoadFailed(format!(
            "{} does not exist",
            path.display()
        )));
    }

    let file = File::open(path).map_err(|e| context(path, e.into()))?;
    let artifact = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        error!("Error loading artifact {}: {}", path.display(), e);
        ApiError::ArtifactLoadFailed(format!("{}: {}", path.display(), e))
    })?;

    info!(
        "Successfully loaded artifact: {}",
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    );
    Ok(artifact)
}

fn similar_artifacts(path: &Path) -> Vec<String> {
    let Some(dir) = path.parent() else {
        return Vec::new();
    };
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".json"))
        .collect();
    names.sort();
    names
}
