use crate::{
    error::{ApiError, Result},
    ml::{ArtifactPaths, ArtifactStore, FusedFeatureMatrix},
    models::{
        Catalog, FeatureRow, HealthStatus, PopularApp, RecommendOutcome, StatusReport,
    },
    services::{
        dataset::DatasetLoader,
        features::FeatureFuser,
        resolver::{MatchTier, QueryResolver, Resolution},
        similarity::SimilarityIndex,
    },
};
use std::{fmt, path::PathBuf};
use tracing::{debug, error, info, warn};

pub const DEFAULT_RECOMMENDATIONS: usize = 5;
pub const DEFAULT_MAX_RECOMMENDATIONS: usize = 20;

/// Where the engine reads its catalog and artifacts from.
#[derive(Debug, Clone)]
pub struct DataSources {
    /// Candidate catalog files, in preference order.
    pub catalog_paths: Vec<PathBuf>,
    pub artifacts: ArtifactPaths,
}

/// Lifecycle stages, in the order initialization walks through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStage {
    Uninitialized,
    LoadingData,
    LoadingArtifacts,
    BuildingIndex,
    Ready,
    Failed,
}

impl fmt::Display for EngineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineStage::Uninitialized => "Uninitialized",
            EngineStage::LoadingData => "LoadingData",
            EngineStage::LoadingArtifacts => "LoadingArtifacts",
            EngineStage::BuildingIndex => "BuildingIndex",
            EngineStage::Ready => "Ready",
            EngineStage::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// Everything a ready engine serves from. Immutable once built.
struct LoadedEngine {
    catalog: Catalog,
    artifacts: ArtifactStore,
    index: SimilarityIndex,
    resolver: QueryResolver,
}

enum EngineState {
    Uninitialized,
    LoadingData,
    LoadingArtifacts {
        catalog: Catalog,
    },
    BuildingIndex {
        catalog: Catalog,
        artifacts: ArtifactStore,
    },
    Ready(Box<LoadedEngine>),
    Failed {
        during: EngineStage,
        reason: String,
    },
}

impl EngineState {
    fn stage(&self) -> EngineStage {
        match self {
            EngineState::Uninitialized => EngineStage::Uninitialized,
            EngineState::LoadingData => EngineStage::LoadingData,
            EngineState::LoadingArtifacts { .. } => EngineStage::LoadingArtifacts,
            EngineState::BuildingIndex { .. } => EngineStage::BuildingIndex,
            EngineState::Ready(_) => EngineStage::Ready,
            EngineState::Failed { .. } => EngineStage::Failed,
        }
    }

    /// Run the work of the current stage and return the next state.
    fn advance(self, sources: &DataSources) -> Result<EngineState> {
        match self {
            EngineState::LoadingData => {
                let catalog = DatasetLoader::new(sources.catalog_paths.clone()).load()?;
                Ok(EngineState::LoadingArtifacts { catalog })
            }
            EngineState::LoadingArtifacts { catalog } => {
                let artifacts = ArtifactStore::load(&sources.artifacts)?;
                Ok(EngineState::BuildingIndex { catalog, artifacts })
            }
            EngineState::BuildingIndex { catalog, artifacts } => {
                let index = build_index(&catalog, &artifacts)?;
                let resolver = QueryResolver::new(&catalog);
                Ok(EngineState::Ready(Box::new(LoadedEngine {
                    catalog,
                    artifacts,
                    index,
                    resolver,
                })))
            }
            other => Err(ApiError::InternalError(format!(
                "no initialization step from state {}",
                other.stage()
            ))),
        }
    }
}

fn build_index(catalog: &Catalog, artifacts: &ArtifactStore) -> Result<SimilarityIndex> {
    if catalog.is_empty() {
        return Err(ApiError::IndexBuildFailed(
            "catalog is empty, nothing to index".to_string(),
        ));
    }

    let features = FeatureFuser::new(artifacts)
        .fuse_catalog(catalog)
        .map_err(|e| ApiError::IndexBuildFailed(format!("feature fusion failed: {}", e)))?;
    let index = SimilarityIndex::build(&features)?;

    if index.len() != catalog.len() {
        return Err(ApiError::IndexBuildFailed(format!(
            "similarity matrix has {} rows for {} catalog rows",
            index.len(),
            catalog.len()
        )));
    }
    Ok(index)
}

/// Content-based app recommender.
///
/// Initialization runs once, synchronously: data, then artifacts, then the similarity
/// index. A failure at any step leaves the engine permanently `Failed`; recovering
/// requires a process restart. A `Ready` engine is read-only and can be shared across
/// request handlers without locking.
pub struct RecommendationEngine {
    state: EngineState,
    max_recommendations: usize,
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RecommendationEngine {
    pub fn new() -> Self {
        Self {
            state: EngineState::Uninitialized,
            max_recommendations: DEFAULT_MAX_RECOMMENDATIONS,
        }
    }

    pub fn with_max_recommendations(mut self, max_recommendations: usize) -> Self {
        self.max_recommendations = max_recommendations.max(1);
        self
    }

    /// Initialize and hand back the engine whatever the outcome, so callers can still
    /// report health for a `Failed` engine.
    pub fn bootstrap(sources: &DataSources, max_recommendations: usize) -> Self {
        let mut engine = Self::new().with_max_recommendations(max_recommendations);
        if let Err(e) = engine.initialize(sources) {
            error!("Error initializing recommendation engine: {}", e);
        }
        engine
    }

    pub fn initialize(&mut self, sources: &DataSources) -> Result<()> {
        if !matches!(self.state, EngineState::Uninitialized) {
            return Err(ApiError::InternalError(format!(
                "engine cannot be initialized twice (state: {})",
                self.stage()
            )));
        }

        self.state = EngineState::LoadingData;
        loop {
            let stage = self.state.stage();
            info!(%stage, "Recommendation engine initialization step");

            let current = std::mem::replace(&mut self.state, EngineState::Uninitialized);
            match current.advance(sources) {
                Ok(EngineState::Ready(engine)) => {
                    info!(
                        rows = engine.catalog.len(),
                        feature_width = engine.index.feature_width(),
                        "Recommendation engine initialized successfully"
                    );
                    self.state = EngineState::Ready(engine);
                    return Ok(());
                }
                Ok(next) => self.state = next,
                Err(e) => {
                    error!(%stage, error = %e, "Recommendation engine initialization failed");
                    self.state = EngineState::Failed {
                        during: stage,
                        reason: e.to_string(),
                    };
                    return Err(e);
                }
            }
        }
    }

    pub fn stage(&self) -> EngineStage {
        self.state.stage()
    }

    fn ready(&self) -> Result<&LoadedEngine> {
        match &self.state {
            EngineState::Ready(engine) => Ok(&**engine),
            other => Err(ApiError::EngineNotReady(other.stage().to_string())),
        }
    }

    pub fn health(&self) -> HealthStatus {
        match &self.state {
            EngineState::Ready(_) => HealthStatus {
                data_loaded: true,
                artifacts_loaded: true,
                index_built: true,
            },
            EngineState::Failed { during, .. } => HealthStatus {
                data_loaded: matches!(
                    during,
                    EngineStage::LoadingArtifacts | EngineStage::BuildingIndex
                ),
                artifacts_loaded: *during == EngineStage::BuildingIndex,
                index_built: false,
            },
            _ => HealthStatus::default(),
        }
    }

    pub fn status_report(&self) -> StatusReport {
        let failure = match &self.state {
            EngineState::Failed { during, reason } => Some(format!("{}: {}", during, reason)),
            _ => None,
        };
        let loaded = self.ready().ok();

        StatusReport {
            state: self.stage().to_string(),
            catalog_rows: loaded.map(|e| e.catalog.len()),
            feature_width: loaded.map(|e| e.index.feature_width()),
            similarity_shape: loaded.map(|e| e.index.shape()),
            failure,
        }
    }

    /// Up to `k` apps most similar to `app_name`, or suggestions when the name
    /// cannot be resolved.
    ///
    /// Surrounding whitespace is trimmed before resolution, so `"Facebook "` is an
    /// exact match for `Facebook`.
    pub fn recommend(&self, app_name: &str, k: usize) -> Result<RecommendOutcome> {
        let engine = self.ready()?;
        let query = app_name.trim();
        if query.is_empty() {
            return Err(ApiError::InvalidInput(
                "Please provide a valid app name".to_string(),
            ));
        }
        let k = k.min(self.max_recommendations);

        match engine.resolver.resolve(&engine.catalog, query) {
            Resolution::Matched { index, tier } => {
                if tier != MatchTier::Exact {
                    info!(
                        ?tier,
                        matched = %engine.catalog.rows()[index].name,
                        query,
                        "Resolved query with a fuzzy match"
                    );
                }
                let scores = engine.index.row(index).ok_or_else(|| {
                    ApiError::InternalError(format!("no similarity row for index {}", index))
                })?;
                let recommendations = engine.resolver.rank(&engine.catalog, scores, index, k);
                info!(
                    "Successfully found {} recommendations for {}",
                    recommendations.len(),
                    query
                );
                Ok(RecommendOutcome::Success { recommendations })
            }
            Resolution::NotFound { suggestions } => {
                debug!(query, suggestions = suggestions.len(), "App not found");
                Ok(RecommendOutcome::NotFound {
                    message: format!("App '{}' not found in the dataset", query),
                    suggestions,
                })
            }
        }
    }

    /// Predict a rating for one loosely-populated row.
    pub fn predict_rating(&self, row: &FeatureRow) -> Result<f64> {
        let engine = self.ready()?;
        let expected = engine.artifacts.model.n_features();
        let fused = FeatureFuser::new(&engine.artifacts)
            .fuse_for(std::slice::from_ref(row), expected)?;
        let predictions = self.predict_fused(&fused)?;
        predictions
            .first()
            .copied()
            .ok_or_else(|| ApiError::InternalError("model returned no prediction".to_string()))
    }

    /// Predict ratings for already fused rows; the width must match the model.
    pub fn predict_fused(&self, features: &FusedFeatureMatrix) -> Result<Vec<f64>> {
        let engine = self.ready()?;
        engine.artifacts.model.predict(features).map_err(|e| {
            warn!("Rejected prediction input of shape {:?}: {}", features.shape(), e);
            e
        })
    }

    /// The `count` most reviewed apps; ties keep catalog order.
    pub fn popular(&self, count: usize) -> Result<Vec<PopularApp>> {
        let engine = self.ready()?;
        let rows = engine.catalog.rows();

        let mut order: Vec<usize> = (0..rows.len()).collect();
        order.sort_by(|&a, &b| rows[b].review_count.cmp(&rows[a].review_count));

        Ok(order
            .into_iter()
            .take(count)
            .map(|i| PopularApp {
                name: rows[i].name.clone(),
                category: rows[i].category.clone(),
                rating: rows[i].rating,
                reviews: rows[i].review_count,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ml::{CategoricalEncoder, HandleUnknown, SparseMatrix},
        models::Recommendation,
        test_support,
    };
    use std::collections::HashSet;

    fn ready_engine(dir: &tempfile::TempDir) -> RecommendationEngine {
        let sources = test_support::sources(
            dir.path(),
            test_support::CATALOG_CSV,
            &test_support::artifacts(),
        );
        let mut engine = RecommendationEngine::new();
        engine.initialize(&sources).unwrap();
        engine
    }

    fn names(outcome: &RecommendOutcome) -> Vec<String> {
        match outcome {
            RecommendOutcome::Success { recommendations } => {
                recommendations.iter().map(|r| r.name.clone()).collect()
            }
            other => panic!("expected recommendations, got {:?}", other),
        }
    }

    #[test]
    fn test_uninitialized_engine_is_not_ready() {
        let engine = RecommendationEngine::new();
        assert_eq!(engine.stage(), EngineStage::Uninitialized);
        assert_eq!(engine.health(), HealthStatus::default());
        assert!(matches!(
            engine.recommend("Facebook", 5),
            Err(ApiError::EngineNotReady(_))
        ));
        assert!(matches!(
            engine.predict_rating(&FeatureRow::default()),
            Err(ApiError::EngineNotReady(_))
        ));
    }

    #[test]
    fn test_initialize_reaches_ready_with_square_index() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ready_engine(&dir);

        assert_eq!(engine.stage(), EngineStage::Ready);
        assert!(engine.health().is_healthy());
        let report = engine.status_report();
        assert_eq!(report.catalog_rows, Some(6));
        assert_eq!(report.similarity_shape, Some((6, 6)));
        assert_eq!(report.feature_width, Some(test_support::FUSED_WIDTH));
        assert!(report.failure.is_none());
    }

    #[test]
    fn test_initialize_twice_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = ready_engine(&dir);
        let sources = test_support::sources(
            dir.path(),
            test_support::CATALOG_CSV,
            &test_support::artifacts(),
        );
        assert!(engine.initialize(&sources).is_err());
        assert_eq!(engine.stage(), EngineStage::Ready);
    }

    #[test]
    fn test_recommend_ranks_neighbours_without_self() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ready_engine(&dir);

        let outcome = engine.recommend("Facebook", 5).unwrap();
        let names = names(&outcome);
        assert_eq!(names.first().map(String::as_str), Some("facebook Lite"));
        assert!(!names.iter().any(|n| n == "Facebook"));
        assert!(names.len() <= 5);
    }

    #[test]
    fn test_recommend_skips_listings_sharing_the_query_name() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ready_engine(&dir);

        let names = names(&engine.recommend("chess master", 10).unwrap());
        assert_eq!(names.first().map(String::as_str), Some("Chess Puzzles"));
        assert!(!names.iter().any(|n| n.eq_ignore_ascii_case("chess master")));
        assert_eq!(names.len(), 4);
    }

    #[test]
    fn test_recommend_results_are_distinct_bounded_and_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ready_engine(&dir);

        for query in ["Facebook", "Photo Editor Pro", "puzzles", "CHESS PUZZLES"] {
            let first = engine.recommend(query, 50).unwrap();
            let second = engine.recommend(query, 50).unwrap();
            assert_eq!(first, second);

            let names = names(&first);
            let distinct: HashSet<String> = names.iter().map(|n| n.to_lowercase()).collect();
            assert_eq!(distinct.len(), names.len());
            assert!(names.len() <= 5);
        }

        assert_eq!(names(&engine.recommend("Facebook", 1).unwrap()).len(), 1);
    }

    #[test]
    fn test_recommend_returns_rating_and_category() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ready_engine(&dir);

        match engine.recommend("Facebook", 1).unwrap() {
            RecommendOutcome::Success { recommendations } => assert_eq!(
                recommendations,
                vec![Recommendation {
                    name: "facebook Lite".to_string(),
                    category: "SOCIAL".to_string(),
                    rating: Some(4.3),
                }]
            ),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_unknown_app_yields_not_found_with_suggestions() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ready_engine(&dir);

        match engine.recommend("zzqx", 5).unwrap() {
            RecommendOutcome::NotFound {
                message,
                suggestions,
            } => {
                assert!(message.contains("zzqx"));
                assert!(suggestions.is_empty());
            }
            other => panic!("unexpected outcome {:?}", other),
        }

        match engine.recommend("photo booth", 5).unwrap() {
            RecommendOutcome::NotFound { suggestions, .. } => {
                assert_eq!(suggestions, vec!["Photo Editor Pro"]);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_query_is_trimmed_before_exact_match() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ready_engine(&dir);

        assert_eq!(
            engine.recommend("  Facebook ", 5).unwrap(),
            engine.recommend("Facebook", 5).unwrap()
        );
    }

    #[test]
    fn test_blank_query_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ready_engine(&dir);
        assert!(matches!(
            engine.recommend("   ", 5),
            Err(ApiError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_strict_encoder_accepts_absent_categorical_columns() {
        let dir = tempfile::tempdir().unwrap();
        let mut strict = test_support::artifacts();
        strict.encoder = CategoricalEncoder::new(
            vec![
                vec!["Free".to_string(), "Paid".to_string()],
                vec!["Everyone".to_string(), "Teen".to_string()],
            ],
            HandleUnknown::Error,
        )
        .unwrap();
        // No "Content Rating" column: every catalog row carries the placeholder.
        let csv = "App,Category,Reviews,Type\nFacebook,SOCIAL,100,Free\nChess,GAME,50,Free\n";
        let sources = test_support::sources(dir.path(), csv, &strict);

        let mut engine = RecommendationEngine::new();
        engine.initialize(&sources).unwrap();
        assert!(engine.health().is_healthy());

        let row = FeatureRow {
            name: Some("Messenger".into()),
            category: Some("SOCIAL".into()),
            app_type: Some("Free".into()),
            ..Default::default()
        };
        assert_eq!(engine.predict_rating(&row).unwrap(), 4.5);
    }

    #[test]
    fn test_predict_rating_defaults_missing_columns() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ready_engine(&dir);

        let chess = FeatureRow {
            name: Some("Chess".into()),
            category: Some("GAME".into()),
            ..Default::default()
        };
        assert_eq!(engine.predict_rating(&chess).unwrap(), 4.0);

        let social = FeatureRow {
            name: Some("Messenger".into()),
            category: Some("SOCIAL".into()),
            app_type: Some("Free".into()),
            ..Default::default()
        };
        assert_eq!(engine.predict_rating(&social).unwrap(), 4.5);
    }

    #[test]
    fn test_predict_fused_rejects_wrong_width() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ready_engine(&dir);

        let narrow = SparseMatrix::new(vec![Default::default()], test_support::FUSED_WIDTH - 1)
            .unwrap();
        assert!(matches!(
            engine.predict_fused(&narrow),
            Err(ApiError::FeatureDimensionMismatch { .. })
        ));
        // The engine stays usable after a per-call failure.
        assert!(engine.recommend("Facebook", 2).is_ok());
    }

    #[test]
    fn test_stale_model_fails_prediction_but_not_recommendation() {
        let dir = tempfile::tempdir().unwrap();
        let stale = test_support::artifacts_with_model_width(test_support::FUSED_WIDTH + 3);
        let sources = test_support::sources(dir.path(), test_support::CATALOG_CSV, &stale);
        let mut engine = RecommendationEngine::new();
        engine.initialize(&sources).unwrap();

        let err = engine.predict_rating(&FeatureRow::default()).unwrap_err();
        assert!(matches!(
            err,
            ApiError::FeatureDimensionMismatch { expected, got }
                if expected == test_support::FUSED_WIDTH + 3 && got == test_support::FUSED_WIDTH
        ));
        assert!(engine.recommend("Facebook", 3).is_ok());
    }

    #[test]
    fn test_missing_artifact_leaves_engine_failed() {
        let dir = tempfile::tempdir().unwrap();
        let sources = test_support::sources(
            dir.path(),
            test_support::CATALOG_CSV,
            &test_support::artifacts(),
        );
        std::fs::remove_file(&sources.artifacts.model).unwrap();

        let mut engine = RecommendationEngine::new();
        let err = engine.initialize(&sources).unwrap_err();
        assert!(matches!(err, ApiError::ArtifactLoadFailed(_)));
        assert_eq!(engine.stage(), EngineStage::Failed);
        assert_eq!(
            engine.health(),
            HealthStatus {
                data_loaded: true,
                artifacts_loaded: false,
                index_built: false,
            }
        );
        assert!(matches!(
            engine.recommend("Facebook", 5),
            Err(ApiError::EngineNotReady(_))
        ));
        assert!(engine
            .status_report()
            .failure
            .unwrap()
            .starts_with("LoadingArtifacts"));
    }

    #[test]
    fn test_empty_catalog_fails_index_build() {
        let dir = tempfile::tempdir().unwrap();
        let header_only =
            "App,Category,Rating,Reviews,Size,Installs,Type,Price,Content Rating,Genres\n";
        let sources = test_support::sources(dir.path(), header_only, &test_support::artifacts());

        let engine = RecommendationEngine::bootstrap(&sources, DEFAULT_MAX_RECOMMENDATIONS);
        assert_eq!(engine.stage(), EngineStage::Failed);
        assert_eq!(
            engine.health(),
            HealthStatus {
                data_loaded: true,
                artifacts_loaded: true,
                index_built: false,
            }
        );
    }

    #[test]
    fn test_missing_data_fails_first_stage() {
        let dir = tempfile::tempdir().unwrap();
        let mut sources = test_support::sources(
            dir.path(),
            test_support::CATALOG_CSV,
            &test_support::artifacts(),
        );
        sources.catalog_paths = vec![dir.path().join("nope.csv")];

        let mut engine = RecommendationEngine::new();
        assert!(matches!(
            engine.initialize(&sources),
            Err(ApiError::DataUnavailable(_))
        ));
        assert_eq!(engine.health(), HealthStatus::default());
    }

    #[test]
    fn test_popular_orders_by_reviews() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ready_engine(&dir);

        let popular = engine.popular(3).unwrap();
        let names: Vec<&str> = popular.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Facebook", "facebook Lite", "Chess Puzzles"]);
        assert_eq!(popular[0].reviews, 78_158_306);
    }

    #[test]
    fn test_k_is_clamped_to_maximum() {
        let dir = tempfile::tempdir().unwrap();
        let sources = test_support::sources(
            dir.path(),
            test_support::CATALOG_CSV,
            &test_support::artifacts(),
        );
        let engine = RecommendationEngine::bootstrap(&sources, 2);
        assert_eq!(names(&engine.recommend("Facebook", 10).unwrap()).len(), 2);
    }
}
