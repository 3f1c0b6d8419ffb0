//! Shared fixtures: a small catalog and a matching artifact set.

use crate::{
    ml::{
        ArtifactPaths, ArtifactStore, CategoricalEncoder, DecisionTree, HandleUnknown,
        NumericScaler, RatingModel, TextVectorizer, TreeNode,
    },
    models::{synthesize_features, Catalog, CatalogRow, UNKNOWN},
    services::{dataset::parse_catalog, DataSources},
};
use serde::Serialize;
use std::{fs, path::Path};

pub const CATALOG_CSV: &str = "\u{feff}App,Category,Rating,Reviews,Size,Installs,Type,Price,Content Rating,Genres
Facebook,SOCIAL,4.1,78158306,Varies with device,\"1,000,000,000+\",Free,0,Teen,Social
facebook Lite,SOCIAL,4.3,1000000,10M,\"100,000,000+\",Free,0,Teen,Social
Chess Master,GAME,4.5,N/A,12M,\"10,000+\",Free,0,Everyone,Board
Chess Master,GAME,4.0,500,20M,\"1,000+\",Free,0,Everyone,Board
Photo Editor Pro,PHOTOGRAPHY,,300,30M,\"1,000+\",Paid,$2.99,Everyone,Photography
Chess Puzzles,GAME,4.2,2000,25M,\"50,000+\",Free,0,Everyone,Board;Puzzle
";

const VOCABULARY: [&str; 13] = [
    "social",
    "facebook",
    "lite",
    "game",
    "chess",
    "master",
    "board",
    "photography",
    "photo",
    "editor",
    "pro",
    "puzzles",
    "puzzle",
];

pub const TEXT_WIDTH: usize = VOCABULARY.len();
pub const FUSED_WIDTH: usize = TEXT_WIDTH + 4 + 4;

pub fn catalog() -> Catalog {
    parse_catalog(CATALOG_CSV.as_bytes()).unwrap()
}

pub fn catalog_with_names(names: &[&str]) -> Catalog {
    Catalog::new(
        names
            .iter()
            .map(|name| CatalogRow {
                name: name.to_string(),
                category: "TOOLS".to_string(),
                rating: Some(4.0),
                review_count: 10,
                size_mb: 1.0,
                install_count: 100,
                price: 0.0,
                content_rating: "Everyone".to_string(),
                app_type: "Free".to_string(),
                genres: "Tools".to_string(),
                synthesized_features: synthesize_features("TOOLS", name, Some("Tools")),
            })
            .collect(),
    )
}

pub fn artifacts() -> ArtifactStore {
    artifacts_with_model_width(FUSED_WIDTH)
}

/// Artifacts whose regressor expects `n_features` columns; anything other than
/// `FUSED_WIDTH` simulates a stale model.
pub fn artifacts_with_model_width(n_features: usize) -> ArtifactStore {
    let vocabulary = VOCABULARY
        .iter()
        .enumerate()
        .map(|(col, term)| (term.to_string(), col))
        .collect();
    let vectorizer = TextVectorizer::new(vocabulary, vec![1.0; TEXT_WIDTH]).unwrap();

    let scaler =
        NumericScaler::from_range(&[0.0; 4], &[100_000_000.0, 100.0, 1_000_000_000.0, 10.0])
            .unwrap();

    let encoder = CategoricalEncoder::new(
        vec![
            vec!["Free".to_string(), "Paid".to_string()],
            vec!["Everyone".to_string(), "Teen".to_string()],
        ],
        HandleUnknown::Ignore,
    )
    .unwrap();

    // Apps mentioning "social" are predicted higher.
    let model = RatingModel::new(
        n_features,
        vec![DecisionTree::new(vec![
            TreeNode::Split {
                feature: 0,
                threshold: 0.0,
                left: 1,
                right: 2,
            },
            TreeNode::Leaf { value: 4.0 },
            TreeNode::Leaf { value: 4.5 },
        ])],
    )
    .unwrap();

    ArtifactStore::new(vectorizer, encoder, scaler, model)
}

fn write_json<T: Serialize>(path: &Path, value: &T) {
    fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

pub fn write_artifacts(dir: &Path, store: &ArtifactStore) -> ArtifactPaths {
    let paths = ArtifactPaths::in_dir(dir);
    write_json(&paths.vectorizer, &store.vectorizer);
    write_json(&paths.encoder, &store.encoder);
    write_json(&paths.scaler, &store.scaler);
    write_json(&paths.model, &store.model);
    paths
}

/// Catalog and artifacts written under `dir`, ready for engine initialization.
pub fn sources(dir: &Path, csv: &str, store: &ArtifactStore) -> DataSources {
    let data = dir.join("apps_data.csv");
    fs::write(&data, csv).unwrap();
    DataSources {
        catalog_paths: vec![dir.join("googleplaystore_fixed.csv"), data],
        artifacts: write_artifacts(dir, store),
    }
}

#[test]
fn fixture_catalog_has_no_unknown_categoricals() {
    let catalog = catalog();
    assert!(catalog
        .iter()
        .all(|row| row.app_type != UNKNOWN && row.content_rating != UNKNOWN));
}
