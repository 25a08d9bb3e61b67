use super::initializer::InitializationMethod;
use super::layers::{Activation, Dense, DenseCache, DenseGradients};
use super::loss::{binary_crossentropy, mean_squared_error};
use super::optimizer::Optimizer;
use super::RecommendationAlgorithm;
use crate::error::{CubeRecError, Result};
use ndarray::Array2;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const ENCODER_UNITS: [usize; 4] = [512, 256, 128, 64];
pub const DECODER_UNITS: [usize; 3] = [128, 256, 512];
pub const LATENT_DIM: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StackLayers")]
pub struct DenseStack {
    layers: Vec<Dense>,
}

#[derive(Deserialize)]
struct StackLayers {
    layers: Vec<Dense>,
}

impl TryFrom<StackLayers> for DenseStack {
    type Error = CubeRecError;

    fn try_from(stack: StackLayers) -> Result<Self> {
        DenseStack::new(stack.layers)
    }
}

pub type StackCache = Vec<DenseCache>;
pub type StackGradients = Vec<DenseGradients>;

impl DenseStack {
    pub fn new(layers: Vec<Dense>) -> Result<Self> {
        if layers.is_empty() {
            return Err(CubeRecError::ShapeMismatch("a layer stack needs at least one layer".to_string()));
        }
        for pair in layers.windows(2) {
            if pair[0].output_dim() != pair[1].input_dim() {
                return Err(CubeRecError::ShapeMismatch(format!(
                    "layer {} outputs {} features but {} expects {}",
                    pair[0].name(),
                    pair[0].output_dim(),
                    pair[1].name(),
                    pair[1].input_dim()
                )));
            }
        }
        Ok(Self { layers })
    }

    pub fn layers(&self) -> &[Dense] {
        &self.layers
    }

    pub fn input_dim(&self) -> usize {
        self.layers[0].input_dim()
    }

    pub fn output_dim(&self) -> usize {
        self.layers[self.layers.len() - 1].output_dim()
    }

    pub fn forward(&self, input: &Array2<f32>) -> Result<Array2<f32>> {
        let mut x = self.layers[0].forward(input)?;
        for layer in &self.layers[1..] {
            x = layer.forward(&x)?;
        }
        Ok(x)
    }

    pub fn forward_cached(&self, input: &Array2<f32>) -> Result<(Array2<f32>, StackCache)> {
        let mut caches = Vec::with_capacity(self.layers.len());
        let mut x = input.clone();
        for layer in &self.layers {
            let (output, cache) = layer.forward_cached(&x)?;
            caches.push(cache);
            x = output;
        }
        Ok((x, caches))
    }

    pub fn backward(&self, caches: &StackCache, grad_output: &Array2<f32>) -> (Array2<f32>, StackGradients) {
        let mut grad = grad_output.clone();
        let mut gradients = Vec::with_capacity(self.layers.len());
        for (layer, cache) in self.layers.iter().zip(caches).rev() {
            let (grad_input, layer_gradients) = layer.backward(cache, &grad);
            gradients.push(layer_gradients);
            grad = grad_input;
        }
        gradients.reverse();
        (grad, gradients)
    }

    pub fn apply_gradients(&mut self, optimizer: &mut dyn Optimizer, gradients: &StackGradients) {
        for (layer, layer_gradients) in self.layers.iter_mut().zip(gradients) {
            layer.apply_gradients(optimizer, layer_gradients);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StackParts")]
pub struct Encoder {
    stack: DenseStack,
}

#[derive(Deserialize)]
struct StackParts {
    stack: DenseStack,
}

impl TryFrom<StackParts> for Encoder {
    type Error = CubeRecError;

    fn try_from(parts: StackParts) -> Result<Self> {
        Encoder::from_stack(parts.stack)
    }
}

impl TryFrom<StackParts> for Decoder {
    type Error = CubeRecError;

    fn try_from(parts: StackParts) -> Result<Self> {
        Decoder::from_stack(parts.stack)
    }
}

impl Encoder {
    pub fn new<R: Rng + ?Sized>(name: &str, input_dim: usize, rng: &mut R) -> Self {
        Self::with_initializer(name, input_dim, InitializationMethod::default(), rng)
    }

    pub fn with_initializer<R: Rng + ?Sized>(
        name: &str,
        input_dim: usize,
        method: InitializationMethod,
        rng: &mut R,
    ) -> Self {
        let names = ["e1", "e2", "e3", "bottleneck"];
        let mut fan_in = input_dim;
        let layers = ENCODER_UNITS
            .iter()
            .zip(names)
            .map(|(&units, suffix)| {
                let layer = Dense::with_initializer(
                    format!("{}_{}", name, suffix),
                    fan_in,
                    units,
                    Activation::Relu,
                    method,
                    rng,
                );
                fan_in = units;
                layer
            })
            .collect();
        Self {
            stack: DenseStack { layers },
        }
    }

    pub fn from_stack(stack: DenseStack) -> Result<Self> {
        if stack.output_dim() != LATENT_DIM {
            return Err(CubeRecError::ShapeMismatch(format!(
                "encoder must output {} features, got {}",
                LATENT_DIM,
                stack.output_dim()
            )));
        }
        Ok(Self { stack })
    }

    pub fn stack(&self) -> &DenseStack {
        &self.stack
    }

    pub fn input_dim(&self) -> usize {
        self.stack.input_dim()
    }

    pub fn encode(&self, input: &Array2<f32>) -> Result<Array2<f32>> {
        self.stack.forward(input)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StackParts")]
pub struct Decoder {
    stack: DenseStack,
}

impl Decoder {
    pub fn new<R: Rng + ?Sized>(name: &str, output_dim: usize, output_activation: Activation, rng: &mut R) -> Self {
        Self::with_initializer(name, output_dim, output_activation, InitializationMethod::default(), rng)
    }

    pub fn with_initializer<R: Rng + ?Sized>(
        name: &str,
        output_dim: usize,
        output_activation: Activation,
        method: InitializationMethod,
        rng: &mut R,
    ) -> Self {
        let mut layers = Vec::with_capacity(DECODER_UNITS.len() + 1);
        let mut fan_in = LATENT_DIM;
        for (i, &units) in DECODER_UNITS.iter().enumerate() {
            layers.push(Dense::with_initializer(
                format!("{}_d{}", name, i + 1),
                fan_in,
                units,
                Activation::Relu,
                method,
                rng,
            ));
            fan_in = units;
        }
        layers.push(Dense::with_initializer(
            format!("{}_reconstruction", name),
            fan_in,
            output_dim,
            output_activation,
            method,
            rng,
        ));
        Self {
            stack: DenseStack { layers },
        }
    }

    pub fn from_stack(stack: DenseStack) -> Result<Self> {
        if stack.input_dim() != LATENT_DIM {
            return Err(CubeRecError::ShapeMismatch(format!(
                "decoder must take {} features, got {}",
                LATENT_DIM,
                stack.input_dim()
            )));
        }
        Ok(Self { stack })
    }

    pub fn stack(&self) -> &DenseStack {
        &self.stack
    }

    pub fn output_dim(&self) -> usize {
        self.stack.output_dim()
    }

    pub fn output_activation(&self) -> Activation {
        self.stack.layers[self.stack.layers.len() - 1].activation()
    }

    pub fn decode(&self, latent: &Array2<f32>) -> Result<Array2<f32>> {
        self.stack.forward(latent)
    }
}

#[derive(Debug, Clone)]
pub struct RecommenderOutput {
    pub reconstruction: Array2<f32>,
    pub regularization: Array2<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepLosses {
    pub reconstruction: f32,
    pub regularization: f32,
    pub total: f32,
}

/// One encoder serves both the collection rows and the single-item identity
/// rows. Its output feeds the sigmoid collection decoder and the softmax
/// regularization decoder respectively.
#[derive(Debug, Clone, PartialEq)]
pub struct Recommender {
    num_items: usize,
    encoder: Encoder,
    decoder: Decoder,
    decoder_for_reg: Decoder,
}

impl Recommender {
    pub fn new<R: Rng + ?Sized>(num_items: usize, rng: &mut R) -> Self {
        Self::with_initializer(num_items, InitializationMethod::default(), rng)
    }

    pub fn with_initializer<R: Rng + ?Sized>(num_items: usize, method: InitializationMethod, rng: &mut R) -> Self {
        Self {
            num_items,
            encoder: Encoder::with_initializer("encoder", num_items, method, rng),
            decoder: Decoder::with_initializer("main", num_items, Activation::Sigmoid, method, rng),
            decoder_for_reg: Decoder::with_initializer("reg", num_items, Activation::Softmax, method, rng),
        }
    }

    pub fn from_parts(encoder: Encoder, decoder: Decoder, decoder_for_reg: Decoder) -> Result<Self> {
        let num_items = encoder.input_dim();
        for (label, part) in [("collection", &decoder), ("regularization", &decoder_for_reg)] {
            if part.output_dim() != num_items {
                return Err(CubeRecError::ShapeMismatch(format!(
                    "{} decoder outputs {} items, encoder takes {}",
                    label,
                    part.output_dim(),
                    num_items
                )));
            }
        }
        if decoder.output_activation() != Activation::Sigmoid || decoder_for_reg.output_activation() != Activation::Softmax {
            return Err(CubeRecError::ShapeMismatch(
                "decoders must end in sigmoid (collection) and softmax (regularization)".to_string(),
            ));
        }
        Ok(Self {
            num_items,
            encoder,
            decoder,
            decoder_for_reg,
        })
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    pub fn regularization_decoder(&self) -> &Decoder {
        &self.decoder_for_reg
    }

    pub fn forward(&self, cubes: &Array2<f32>, identity: &Array2<f32>) -> Result<RecommenderOutput> {
        let encoded = self.encoder.encode(cubes)?;
        let reconstruction = self.decoder.decode(&encoded)?;
        let encoded_for_reg = self.encoder.encode(identity)?;
        let regularization = self.decoder_for_reg.decode(&encoded_for_reg)?;
        Ok(RecommenderOutput {
            reconstruction,
            regularization,
        })
    }

    /// One optimizer step on the joint objective
    /// `BCE(reconstruction, membership) + weight * MSE(regularization, adjacency_rows)`.
    pub fn train_step(
        &mut self,
        cubes: &Array2<f32>,
        identity: &Array2<f32>,
        membership: &Array2<f32>,
        adjacency_rows: &Array2<f32>,
        regularization_weight: f32,
        optimizer: &mut dyn Optimizer,
    ) -> Result<StepLosses> {
        let (encoded, encoder_cache) = self.encoder.stack.forward_cached(cubes)?;
        let (reconstruction, decoder_cache) = self.decoder.stack.forward_cached(&encoded)?;
        let (encoded_for_reg, encoder_reg_cache) = self.encoder.stack.forward_cached(identity)?;
        let (regularization, reg_cache) = self.decoder_for_reg.stack.forward_cached(&encoded_for_reg)?;

        let (reconstruction_loss, grad_reconstruction) = binary_crossentropy(&reconstruction, membership)?;
        let (regularization_loss, grad_regularization) = mean_squared_error(&regularization, adjacency_rows)?;
        let grad_regularization = grad_regularization * regularization_weight;

        let (grad_encoded, decoder_gradients) = self.decoder.stack.backward(&decoder_cache, &grad_reconstruction);
        let (grad_encoded_for_reg, reg_gradients) =
            self.decoder_for_reg.stack.backward(&reg_cache, &grad_regularization);

        // both passes went through the same encoder, so their gradients add
        let (_, mut encoder_gradients) = self.encoder.stack.backward(&encoder_cache, &grad_encoded);
        let (_, encoder_reg_gradients) = self.encoder.stack.backward(&encoder_reg_cache, &grad_encoded_for_reg);
        for (total, extra) in encoder_gradients.iter_mut().zip(&encoder_reg_gradients) {
            total.accumulate(extra);
        }

        self.encoder.stack.apply_gradients(optimizer, &encoder_gradients);
        self.decoder.stack.apply_gradients(optimizer, &decoder_gradients);
        self.decoder_for_reg.stack.apply_gradients(optimizer, &reg_gradients);

        Ok(StepLosses {
            reconstruction: reconstruction_loss,
            regularization: regularization_loss,
            total: reconstruction_loss + regularization_weight * regularization_loss,
        })
    }
}

impl RecommendationAlgorithm for Recommender {
    fn num_items(&self) -> usize {
        self.num_items
    }

    fn reconstruct(&self, cubes: &Array2<f32>) -> Result<Array2<f32>> {
        let encoded = self.encoder.encode(cubes)?;
        self.decoder.decode(&encoded)
    }
}
