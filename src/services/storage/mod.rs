use crate::algorithms::{Decoder, Encoder, Recommender, RecommendationAlgorithm};
use crate::error::{CubeRecError, Result};
use crate::models::{AdjacencyMatrix, Catalog, CubeSet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Serialized form of a trained [`Recommender`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub num_items: usize,
    pub created_at: DateTime<Utc>,
    pub encoder: Encoder,
    pub decoder: Decoder,
    pub regularization_decoder: Decoder,
}

impl ModelArtifact {
    pub fn from_model(model: &Recommender) -> Self {
        Self {
            num_items: model.num_items(),
            created_at: Utc::now(),
            encoder: model.encoder().clone(),
            decoder: model.decoder().clone(),
            regularization_decoder: model.regularization_decoder().clone(),
        }
    }

    pub fn into_model(self) -> Result<Recommender> {
        let model = Recommender::from_parts(self.encoder, self.decoder, self.regularization_decoder)?;
        if model.num_items() != self.num_items {
            return Err(CubeRecError::ShapeMismatch(format!(
                "artifact declares {} items but its layers take {}",
                self.num_items,
                model.num_items()
            )));
        }
        Ok(model)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

pub fn load_adjacency(path: &Path) -> Result<AdjacencyMatrix> {
    let rows: Vec<Vec<f32>> = read_json(path)?;
    let adjacency = AdjacencyMatrix::from_rows(rows)?;
    info!("Loaded {}x{} adjacency matrix from {:?}", adjacency.num_items(), adjacency.num_items(), path);
    Ok(adjacency)
}

pub fn load_cubes(path: &Path, num_items: usize) -> Result<CubeSet> {
    let cubes: Vec<Vec<usize>> = read_json(path)?;
    let cubes = CubeSet::new(cubes, num_items)?;
    info!("Loaded {} collections with {} slots from {:?}", cubes.len(), cubes.max_cube_size(), path);
    Ok(cubes)
}

pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let id_map: HashMap<String, String> = read_json(path)?;
    let catalog = Catalog::from_id_map(id_map)?;
    info!("Loaded catalog of {} items from {:?}", catalog.len(), path);
    Ok(catalog)
}

/// One card name per line; blank lines are dropped.
pub fn read_card_list(path: &Path) -> Result<Vec<String>> {
    let contents = fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

pub fn artifact_path(model_dir: &Path, num_items: usize) -> PathBuf {
    model_dir.join(format!("recommender_{}.bin", num_items))
}

pub fn save_model(model: &Recommender, model_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(model_dir)?;
    let path = artifact_path(model_dir, model.num_items());
    let tmp = path.with_extension("bin.tmp");
    {
        let writer = BufWriter::new(File::create(&tmp)?);
        bincode::serialize_into(writer, &ModelArtifact::from_model(model))?;
    }
    fs::rename(&tmp, &path)?;
    debug!("Saved model artifact to {:?}", path);
    Ok(path)
}

pub fn load_model_file(path: &Path) -> Result<Recommender> {
    let reader = BufReader::new(File::open(path)?);
    let artifact: ModelArtifact = bincode::deserialize_from(reader)?;
    let created_at = artifact.created_at;
    let model = artifact.into_model()?;
    info!(
        "Loaded model for {} items from {:?} (created {})",
        model.num_items(),
        path,
        created_at
    );
    Ok(model)
}

pub fn load_model(model_dir: &Path, num_items: usize) -> Result<Recommender> {
    let model = load_model_file(&artifact_path(model_dir, num_items))?;
    if model.num_items() != num_items {
        return Err(CubeRecError::ShapeMismatch(format!(
            "expected a model for {} items, artifact holds {}",
            num_items,
            model.num_items()
        )));
    }
    Ok(model)
}
