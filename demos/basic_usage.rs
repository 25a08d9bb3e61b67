use cuberec::algorithms::RecommendationAlgorithm;
use cuberec::config::{GeneratorConfig, OptimizerKind, TrainingConfig};
use cuberec::services::recommendation::RecommendationService;
use cuberec::services::training::TrainingService;
use cuberec::*;
use ndarray::Array2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

const NAMES: [&str; 12] = [
    "Plains",
    "Island",
    "Swamp",
    "Mountain",
    "Forest",
    "Sol Ring",
    "Brainstorm",
    "Counterspell",
    "Lightning Bolt",
    "Dark Ritual",
    "Llanowar Elves",
    "Swords to Plowshares",
];

fn main() -> anyhow::Result<()> {
    init_tracing();

    println!("CubeRec basic usage");

    // 1. Co-occurrence counts: colors cluster together, Sol Ring goes everywhere.
    let color = |i: usize| if i < 5 { i } else { (i - 5) % 5 };
    let adjacency = AdjacencyMatrix::new(Array2::from_shape_fn((12, 12), |(i, j)| {
        if i == j {
            0.0
        } else if i == 5 || j == 5 {
            4.0
        } else if color(i) == color(j) {
            3.0
        } else {
            1.0
        }
    }))?;

    // 2. Collections as 1-based slot arrays padded with 0.
    let cubes = CubeSet::new(
        vec![
            vec![2, 7, 8, 6, 0],
            vec![4, 9, 6, 1, 12],
            vec![3, 10, 6, 0, 0],
            vec![5, 11, 6, 2, 0],
            vec![1, 12, 6, 4, 9],
            vec![2, 8, 7, 3, 10],
        ],
        12,
    )?;
    println!("Loaded {} cubes over {} cards", cubes.len(), cubes.num_items());

    // 3. Generator and model share one seeded RNG.
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let generator = BatchGenerator::new(
        &adjacency,
        cubes,
        GeneratorConfig {
            batch_size: 2,
            ..GeneratorConfig::default()
        },
        &mut rng,
    )?;
    let batch = generator.batch(0, &mut rng)?;
    println!("First batch noised slots:\n{}", batch.cube_inputs);

    // 4. Train a few epochs into a scratch directory.
    let model_dir = std::env::temp_dir().join("cuberec-demo");
    let model = Recommender::new(12, &mut rng);
    let training = TrainingConfig {
        epochs: 20,
        learning_rate: 0.05,
        optimizer: OptimizerKind::Adagrad,
        checkpoint_interval: 0,
        ..TrainingConfig::default()
    };
    let mut trainer = TrainingService::new(generator, model, training, &model_dir, rng)?;
    let path = trainer.run()?;
    println!("Model saved to {}", path.display());

    // 5. Recommend additions for a blue cube.
    let catalog = Catalog::new(NAMES.iter().map(|s| s.to_string()).collect());
    let model = Arc::new(trainer.into_model());
    println!("Model scores {} items", model.num_items());
    let service = RecommendationService::new(Arc::new(catalog), model, 5)?;
    let response = service.recommend(&RecommendationRequest {
        cards: vec!["island".to_string(), "Counterspell".to_string(), "Black Lotus".to_string()],
        amount: None,
    })?;

    println!(
        "Matched {} cards, skipped {} unknown",
        response.matched_cards, response.unknown_cards
    );
    for suggestion in &response.recommendations {
        println!("  {:<22} {:.3}", suggestion.name, suggestion.score);
    }

    Ok(())
}
