use super::initializer::{self, InitializationMethod};
use super::optimizer::Optimizer;
use crate::error::{CubeRecError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    Relu,
    Sigmoid,
    Softmax,
}

impl Activation {
    pub fn apply(&self, mut z: Array2<f32>) -> Array2<f32> {
        match self {
            Activation::Relu => z.mapv_inplace(|v| v.max(0.0)),
            Activation::Sigmoid => z.mapv_inplace(|v| 1.0 / (1.0 + (-v).exp())),
            Activation::Softmax => {
                for mut row in z.axis_iter_mut(Axis(0)) {
                    let max = row.fold(f32::NEG_INFINITY, |a, &b| a.max(b));
                    row.mapv_inplace(|v| (v - max).exp());
                    let sum = row.sum();
                    row.mapv_inplace(|v| v / sum);
                }
            }
        }
        z
    }

    /// Gradient with respect to the pre-activation, given the activation
    /// output and the gradient with respect to that output.
    pub fn backward(&self, output: &Array2<f32>, grad_output: &Array2<f32>) -> Array2<f32> {
        match self {
            Activation::Relu => {
                let mut grad = grad_output.clone();
                grad.zip_mut_with(output, |g, &o| {
                    if o <= 0.0 {
                        *g = 0.0;
                    }
                });
                grad
            }
            Activation::Sigmoid => grad_output * &output.mapv(|o| o * (1.0 - o)),
            Activation::Softmax => {
                let dot = (grad_output * output).sum_axis(Axis(1)).insert_axis(Axis(1));
                output * &(grad_output - &dot)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DenseParameters")]
pub struct Dense {
    name: String,
    weights: Array2<f32>,
    bias: Array1<f32>,
    activation: Activation,
}

#[derive(Deserialize)]
struct DenseParameters {
    name: String,
    weights: Array2<f32>,
    bias: Array1<f32>,
    activation: Activation,
}

impl TryFrom<DenseParameters> for Dense {
    type Error = CubeRecError;

    fn try_from(parameters: DenseParameters) -> Result<Self> {
        Dense::from_parameters(parameters.name, parameters.weights, parameters.bias, parameters.activation)
    }
}

#[derive(Debug, Clone)]
pub struct DenseCache {
    input: Array2<f32>,
    output: Array2<f32>,
}

#[derive(Debug, Clone)]
pub struct DenseGradients {
    pub weights: Array2<f32>,
    pub bias: Array1<f32>,
}

impl DenseGradients {
    pub fn accumulate(&mut self, other: &DenseGradients) {
        self.weights += &other.weights;
        self.bias += &other.bias;
    }
}

impl Dense {
    pub fn new<R: Rng + ?Sized>(
        name: impl Into<String>,
        input_dim: usize,
        output_dim: usize,
        activation: Activation,
        rng: &mut R,
    ) -> Self {
        Self::with_initializer(name, input_dim, output_dim, activation, InitializationMethod::default(), rng)
    }

    pub fn with_initializer<R: Rng + ?Sized>(
        name: impl Into<String>,
        input_dim: usize,
        output_dim: usize,
        activation: Activation,
        method: InitializationMethod,
        rng: &mut R,
    ) -> Self {
        Self {
            name: name.into(),
            weights: method.initialize(input_dim, output_dim, rng),
            bias: initializer::zeros(output_dim),
            activation,
        }
    }

    pub fn from_parameters(
        name: impl Into<String>,
        weights: Array2<f32>,
        bias: Array1<f32>,
        activation: Activation,
    ) -> Result<Self> {
        let name = name.into();
        if weights.is_empty() {
            return Err(CubeRecError::ShapeMismatch(format!("layer {} has no weights", name)));
        }
        if weights.ncols() != bias.len() {
            return Err(CubeRecError::ShapeMismatch(format!(
                "layer {} has {} units but {} biases",
                name,
                weights.ncols(),
                bias.len()
            )));
        }
        Ok(Self {
            name,
            weights,
            bias,
            activation,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input_dim(&self) -> usize {
        self.weights.nrows()
    }

    pub fn output_dim(&self) -> usize {
        self.weights.ncols()
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    pub fn weights(&self) -> &Array2<f32> {
        &self.weights
    }

    pub fn bias(&self) -> &Array1<f32> {
        &self.bias
    }

    fn check_input(&self, input: &Array2<f32>) -> Result<()> {
        if input.ncols() != self.input_dim() {
            return Err(CubeRecError::ShapeMismatch(format!(
                "layer {} expects {} features, got {}",
                self.name,
                self.input_dim(),
                input.ncols()
            )));
        }
        Ok(())
    }

    pub fn forward(&self, input: &Array2<f32>) -> Result<Array2<f32>> {
        self.check_input(input)?;
        Ok(self.activation.apply(input.dot(&self.weights) + &self.bias))
    }

    pub fn forward_cached(&self, input: &Array2<f32>) -> Result<(Array2<f32>, DenseCache)> {
        let output = self.forward(input)?;
        let cache = DenseCache {
            input: input.clone(),
            output: output.clone(),
        };
        Ok((output, cache))
    }

    pub fn backward(&self, cache: &DenseCache, grad_output: &Array2<f32>) -> (Array2<f32>, DenseGradients) {
        let grad_z = self.activation.backward(&cache.output, grad_output);
        let gradients = DenseGradients {
            weights: cache.input.t().dot(&grad_z),
            bias: grad_z.sum_axis(Axis(0)),
        };
        let grad_input = grad_z.dot(&self.weights.t());
        (grad_input, gradients)
    }

    pub fn apply_gradients(&mut self, optimizer: &mut dyn Optimizer, gradients: &DenseGradients) {
        optimizer.update(
            &format!("{}/kernel", self.name),
            self.weights.view_mut().into_dyn(),
            gradients.weights.view().into_dyn(),
        );
        optimizer.update(
            &format!("{}/bias", self.name),
            self.bias.view_mut().into_dyn(),
            gradients.bias.view().into_dyn(),
        );
    }
}
