use crate::algorithms::RecommendationAlgorithm;
use crate::error::{CubeRecError, Result};
use crate::models::{indices_to_multi_hot, Catalog, RecommendationRequest, RecommendationResponse, Suggestion};
use crate::utils::top_k_indices;
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

pub struct RecommendationService {
    catalog: Arc<Catalog>,
    model: Arc<dyn RecommendationAlgorithm>,
    default_amount: usize,
}

impl RecommendationService {
    pub fn new(catalog: Arc<Catalog>, model: Arc<dyn RecommendationAlgorithm>, default_amount: usize) -> Result<Self> {
        if catalog.len() != model.num_items() {
            return Err(CubeRecError::ShapeMismatch(format!(
                "catalog has {} items, model scores {}",
                catalog.len(),
                model.num_items()
            )));
        }
        Ok(Self {
            catalog,
            model,
            default_amount,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn default_amount(&self) -> usize {
        self.default_amount
    }

    pub fn recommend_indices(&self, present: &[usize], amount: usize) -> Result<Vec<(usize, f32)>> {
        let num_items = self.model.num_items();
        let input = indices_to_multi_hot(present, num_items)?;
        let scores = self.model.reconstruct(&input)?;
        if scores.dim() != (1, num_items) {
            return Err(CubeRecError::ShapeMismatch(format!(
                "model returned {:?} scores for one cube of {} items",
                scores.dim(),
                num_items
            )));
        }

        let row = scores.row(0);
        let candidates: Vec<(usize, f32)> = row
            .iter()
            .enumerate()
            .filter(|(index, _)| input[[0, *index]] == 0.0)
            .map(|(index, &score)| (index, score))
            .collect();
        let ranked = top_k_indices(&candidates.iter().map(|(_, s)| *s).collect::<Vec<_>>(), amount);
        Ok(ranked.into_iter().map(|i| candidates[i]).collect())
    }

    pub fn recommend(&self, request: &RecommendationRequest) -> Result<RecommendationResponse> {
        let (present, unknown) = self.catalog.resolve(request.cards.iter().map(String::as_str));
        if unknown > 0 {
            debug!("Skipped {} card names missing from the catalog", unknown);
        }
        let amount = request.amount.unwrap_or(self.default_amount);

        let recommendations = self
            .recommend_indices(&present, amount)?
            .into_iter()
            .map(|(index, score)| Suggestion {
                index,
                name: self.catalog.name(index).unwrap_or_default().to_string(),
                score,
            })
            .collect();

        Ok(RecommendationResponse {
            recommendations,
            matched_cards: present.len(),
            unknown_cards: unknown,
            generated_at: Utc::now(),
        })
    }
}
