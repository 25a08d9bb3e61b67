use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use cuberec::algorithms::{Encoder, RecommendationAlgorithm};
use cuberec::config::GeneratorConfig;
use cuberec::services::recommendation::RecommendationService;
use cuberec::services::serving::{create_router, ApiResponse};
use cuberec::services::storage;
use cuberec::services::training::TrainingService;
use cuberec::*;
use ndarray::{array, Array2};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

const NAMES: [&str; 10] = [
    "Ancestral Recall",
    "Brainstorm",
    "Counterspell",
    "Dark Ritual",
    "Lim-Dûl's Vault",
    "Lightning Bolt",
    "Swords to Plowshares",
    "Sol Ring",
    "Llanowar Elves",
    "Wrath of God",
];

fn write_inputs(dir: &Path) -> Config {
    let n = NAMES.len();
    let adjacency: Vec<Vec<f32>> = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 0.0 } else { 1.0 + ((i * j) % 4) as f32 }).collect())
        .collect();
    let cubes: Vec<Vec<usize>> = vec![
        vec![1, 2, 3, 4, 0],
        vec![5, 6, 7, 0, 0],
        vec![1, 3, 5, 7, 9],
        vec![2, 4, 6, 8, 10],
        vec![8, 9, 10, 0, 0],
        vec![1, 2, 8, 9, 0],
    ];
    let id_map: std::collections::HashMap<String, String> = NAMES
        .iter()
        .enumerate()
        .map(|(i, name)| (i.to_string(), name.to_string()))
        .collect();

    let mut config = Config::default();
    config.data.adjacency_path = dir.join("adj_mtx.json");
    config.data.cubes_path = dir.join("cubes.json");
    config.data.id_map_path = dir.join("recommender_id_map.json");
    config.data.model_dir = dir.join("models");
    std::fs::write(&config.data.adjacency_path, serde_json::to_string(&adjacency).unwrap()).unwrap();
    std::fs::write(&config.data.cubes_path, serde_json::to_string(&cubes).unwrap()).unwrap();
    std::fs::write(&config.data.id_map_path, serde_json::to_string(&id_map).unwrap()).unwrap();

    config.server.workers = 1;
    config.generator.batch_size = 2;
    config.training.epochs = 2;
    config.training.learning_rate = 0.05;
    config.training.checkpoint_interval = 0;
    config.training.seed = Some(7);
    config.recommendation.amount = 3;
    config
}

#[test]
fn test_single_cube_without_noise() {
    let adjacency = AdjacencyMatrix::new(Array2::from_elem((5, 5), 1.0)).unwrap();
    let cubes = CubeSet::new(vec![vec![1, 2, 3, 0, 0]], 5).unwrap();
    let config = GeneratorConfig {
        batch_size: 1,
        ..GeneratorConfig::default()
    };
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let generator = BatchGenerator::new(&adjacency, cubes, config, &mut rng).unwrap();

    let noised = generator.noise_collection_with_rate(0, 0.0, &mut rng).unwrap();
    let mut slots = noised.slots.clone();
    slots.sort_unstable();
    assert_eq!(slots, vec![0, 0, 1, 2, 3]);
    assert_eq!(noised.target, array![1.0, 1.0, 1.0, 0.0, 0.0]);
}

#[test]
fn test_encoder_output_width_is_shared_across_inputs() {
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let encoder = Encoder::new("encoder", 7, &mut rng);
    let zero = encoder.encode(&Array2::<f32>::zeros((1, 7))).unwrap();
    let identity = encoder.encode(&Array2::<f32>::eye(7)).unwrap();
    assert_eq!(zero.ncols(), 64);
    assert_eq!(identity.ncols(), 64);
    // the same weights serve every row
    let single = encoder.encode(&Array2::<f32>::eye(7).slice(ndarray::s![3..4, ..]).to_owned()).unwrap();
    for (a, b) in identity.row(3).iter().zip(single.row(0).iter()) {
        assert!((a - b).abs() < 1e-6);
    }
}

#[test]
fn test_train_save_and_recommend() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_inputs(dir.path());

    let mut trainer = TrainingService::from_config(&config).unwrap();
    let path = trainer.run().unwrap();
    assert!(path.exists());
    assert_eq!(trainer.history().len(), 2);
    assert!(trainer.history().iter().all(|stats| stats.batches == 3));

    let catalog = storage::load_catalog(&config.data.id_map_path).unwrap();
    let model = storage::load_model(&config.data.model_dir, catalog.len()).unwrap();
    assert_eq!(&model, trainer.model());

    let input = Array2::from_shape_fn((1, 10), |(_, j)| if j < 3 { 1.0 } else { 0.0 });
    let before = trainer.model().reconstruct(&input).unwrap();
    let after = model.reconstruct(&input).unwrap();
    assert!(before.iter().zip(after.iter()).all(|(a, b)| a.to_bits() == b.to_bits()));

    let service = RecommendationService::new(Arc::new(catalog), Arc::new(model), config.recommendation.amount).unwrap();
    let response = service
        .recommend(&RecommendationRequest {
            cards: vec!["LIM-DUL'S VAULT".to_string(), "Brainstorm".to_string(), "Mox Pearl".to_string()],
            amount: None,
        })
        .unwrap();
    assert_eq!(response.matched_cards, 2);
    assert_eq!(response.unknown_cards, 1);
    assert_eq!(response.recommendations.len(), 3);
    assert!(response
        .recommendations
        .iter()
        .all(|s| s.name != "Brainstorm" && s.name != "Lim-Dûl's Vault"));
    assert!(response.recommendations.windows(2).all(|w| w[0].score >= w[1].score));
}

#[tokio::test]
async fn test_http_recommendations() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_inputs(dir.path());
    TrainingService::from_config(&config).unwrap().run().unwrap();

    let state = AppState::new(config).unwrap();
    let app = create_router(state.clone());

    let health = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);

    let body = serde_json::json!({ "cards": ["Sol Ring", "Wrath of God"], "amount": 4 });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/recommendations")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed: ApiResponse<RecommendationResponse> = serde_json::from_slice(&bytes).unwrap();
    let data = parsed.data.unwrap();
    assert_eq!(data.matched_cards, 2);
    assert_eq!(data.recommendations.len(), 4);

    let bad = serde_json::json!({ "cards": [], "amount": 0 });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/recommendations")
                .header("content-type", "application/json")
                .body(Body::from(bad.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let everything = serde_json::json!({ "cards": ["Sol Ring", "Wrath of God"], "amount": 50 });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/recommendations")
                .header("content-type", "application/json")
                .body(Body::from(everything.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed: ApiResponse<RecommendationResponse> = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(parsed.data.unwrap().recommendations.len(), 8);

    let reload = app
        .oneshot(Request::builder().method("POST").uri("/model/reload").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(reload.status(), StatusCode::OK);
    assert_eq!(state.stats.snapshot().reloads, 1);
    assert_eq!(state.stats.snapshot().total_requests, 3);
}

#[test]
fn test_missing_artifact_fails_to_start() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_inputs(dir.path());
    assert!(AppState::new(config).is_err());
}
