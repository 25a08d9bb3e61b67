use crate::config::Config;
use crate::models::RecommendationRequest;
use anyhow::{anyhow, Result};

pub const MAX_REQUEST_CARDS: usize = 10_000;

pub fn validate_recommendation_request(request: &RecommendationRequest) -> Result<()> {
    if request.cards.len() > MAX_REQUEST_CARDS {
        return Err(anyhow!("Too many cards in request (max {})", MAX_REQUEST_CARDS));
    }

    if request.amount == Some(0) {
        return Err(anyhow!("Number of recommendations must be greater than 0"));
    }

    Ok(())
}

/// Checks value ranges that the config crate cannot express.
pub fn validate_config(config: &Config) -> Result<()> {
    let generator = &config.generator;
    if generator.batch_size == 0 {
        return Err(anyhow!("generator.batch_size must be greater than 0"));
    }
    if !generator.noise.is_finite() {
        return Err(anyhow!("generator.noise must be finite"));
    }
    if !generator.noise_std.is_finite() || generator.noise_std < 0.0 {
        return Err(anyhow!("generator.noise_std must be a non-negative number"));
    }

    let training = &config.training;
    if !(training.learning_rate.is_finite() && training.learning_rate > 0.0) {
        return Err(anyhow!("training.learning_rate must be positive"));
    }
    if !(training.regularization_weight.is_finite() && training.regularization_weight >= 0.0) {
        return Err(anyhow!("training.regularization_weight must be non-negative"));
    }

    if config.recommendation.amount == 0 {
        return Err(anyhow!("recommendation.amount must be greater than 0"));
    }
    if config.server.workers == 0 {
        return Err(anyhow!("server.workers must be greater than 0"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_recommendation_request() {
        let mut request = RecommendationRequest {
            cards: vec!["Brainstorm".to_string()],
            amount: Some(5),
        };
        assert!(validate_recommendation_request(&request).is_ok());

        request.amount = Some(0);
        assert!(validate_recommendation_request(&request).is_err());

        // more than the catalog holds just returns every remaining item
        request.amount = Some(1_000_000);
        assert!(validate_recommendation_request(&request).is_ok());

        request.amount = None;
        request.cards.clear();
        assert!(validate_recommendation_request(&request).is_ok());
    }

    #[test]
    fn test_validate_config() {
        let mut config = Config::default();
        config.server.workers = 1;
        assert!(validate_config(&config).is_ok());

        config.generator.noise_std = -0.1;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.server.workers = 1;
        config.training.learning_rate = 0.0;
        assert!(validate_config(&config).is_err());
    }
}
