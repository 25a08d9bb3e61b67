use crate::config::OptimizerKind;
use ndarray::{ArrayD, ArrayViewD, ArrayViewMutD, Zip};
use std::collections::HashMap;

/// Per-tensor update rule. `key` identifies the parameter tensor so stateful
/// optimizers can keep one accumulator per tensor.
pub trait Optimizer: Send + Sync {
    fn update(&mut self, key: &str, params: ArrayViewMutD<'_, f32>, gradients: ArrayViewD<'_, f32>);
}

pub fn build_optimizer(kind: OptimizerKind, learning_rate: f64) -> Box<dyn Optimizer> {
    match kind {
        OptimizerKind::Sgd => Box::new(SGD::new(learning_rate)),
        OptimizerKind::Adam => Box::new(Adam::new(learning_rate, 0.9, 0.999, 1e-7)),
        OptimizerKind::Adagrad => Box::new(AdaGrad::new(learning_rate, 0.1, 1e-7)),
    }
}

#[derive(Debug, Clone)]
pub struct SGD {
    learning_rate: f64,
}

impl SGD {
    pub fn new(learning_rate: f64) -> Self {
        Self { learning_rate }
    }
}

impl Optimizer for SGD {
    fn update(&mut self, _key: &str, mut params: ArrayViewMutD<'_, f32>, gradients: ArrayViewD<'_, f32>) {
        params.scaled_add(-(self.learning_rate as f32), &gradients);
    }
}

#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    steps: HashMap<String, i32>,
    m: HashMap<String, ArrayD<f32>>,
    v: HashMap<String, ArrayD<f32>>,
}

impl Adam {
    pub fn new(learning_rate: f64, beta1: f64, beta2: f64, epsilon: f64) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            steps: HashMap::new(),
            m: HashMap::new(),
            v: HashMap::new(),
        }
    }
}

impl Default for Adam {
    fn default() -> Self {
        Self::new(0.001, 0.9, 0.999, 1e-7)
    }
}

impl Optimizer for Adam {
    fn update(&mut self, key: &str, params: ArrayViewMutD<'_, f32>, gradients: ArrayViewD<'_, f32>) {
        let t = self.steps.entry(key.to_string()).or_insert(0);
        *t += 1;
        let t = *t;

        let m = self
            .m
            .entry(key.to_string())
            .or_insert_with(|| ArrayD::zeros(params.raw_dim()));
        let v = self
            .v
            .entry(key.to_string())
            .or_insert_with(|| ArrayD::zeros(params.raw_dim()));

        let beta1 = self.beta1 as f32;
        let beta2 = self.beta2 as f32;
        let bias1 = 1.0 - beta1.powi(t);
        let bias2 = 1.0 - beta2.powi(t);
        let lr = self.learning_rate as f32;
        let eps = self.epsilon as f32;

        Zip::from(params)
            .and(&gradients)
            .and(m)
            .and(v)
            .for_each(|p, &g, m, v| {
                // biased first and second moment estimates
                *m = beta1 * *m + (1.0 - beta1) * g;
                *v = beta2 * *v + (1.0 - beta2) * g * g;
                let m_hat = *m / bias1;
                let v_hat = *v / bias2;
                *p -= lr * m_hat / (v_hat.sqrt() + eps);
            });
    }
}

#[derive(Debug, Clone)]
pub struct AdaGrad {
    learning_rate: f64,
    initial_accumulator: f64,
    epsilon: f64,
    sum_squared_gradients: HashMap<String, ArrayD<f32>>,
}

impl AdaGrad {
    pub fn new(learning_rate: f64, initial_accumulator: f64, epsilon: f64) -> Self {
        Self {
            learning_rate,
            initial_accumulator,
            epsilon,
            sum_squared_gradients: HashMap::new(),
        }
    }
}

impl Default for AdaGrad {
    fn default() -> Self {
        Self::new(0.001, 0.1, 1e-7)
    }
}

impl Optimizer for AdaGrad {
    fn update(&mut self, key: &str, params: ArrayViewMutD<'_, f32>, gradients: ArrayViewD<'_, f32>) {
        let initial = self.initial_accumulator as f32;
        let sum_sq_grad = self
            .sum_squared_gradients
            .entry(key.to_string())
            .or_insert_with(|| ArrayD::from_elem(params.raw_dim(), initial));

        let lr = self.learning_rate as f32;
        let eps = self.epsilon as f32;

        Zip::from(params)
            .and(&gradients)
            .and(sum_sq_grad)
            .for_each(|p, &g, acc| {
                // accumulate squared gradients, then scale the step by their root
                *acc += g * g;
                *p -= lr * g / (acc.sqrt() + eps);
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array1};

    fn step(optimizer: &mut dyn Optimizer, params: &mut Array1<f32>, gradients: &Array1<f32>) {
        optimizer.update("w", params.view_mut().into_dyn(), gradients.view().into_dyn());
    }

    #[test]
    fn test_sgd() {
        let mut sgd = SGD::new(0.1);
        let mut params = array![1.0f32, 2.0, 3.0];
        step(&mut sgd, &mut params, &array![1.0, -1.0, 0.0]);
        assert_relative_eq!(params[0], 0.9);
        assert_relative_eq!(params[1], 2.1);
        assert_relative_eq!(params[2], 3.0);
    }

    #[test]
    fn test_adam_first_step_moves_by_learning_rate() {
        let mut adam = Adam::new(0.01, 0.9, 0.999, 1e-8);
        let mut params = array![1.0f32, -1.0];
        step(&mut adam, &mut params, &array![0.5, -2.0]);
        // bias-corrected first step is lr * sign(g)
        assert_relative_eq!(params[0], 0.99, epsilon = 1e-5);
        assert_relative_eq!(params[1], -0.99, epsilon = 1e-5);
    }

    #[test]
    fn test_adagrad_keeps_state_per_key() {
        let mut adagrad = AdaGrad::new(0.1, 0.0, 0.0);
        let mut a = array![1.0f32];
        let mut b = array![1.0f32];
        let g = array![1.0f32];

        adagrad.update("a", a.view_mut().into_dyn(), g.view().into_dyn());
        adagrad.update("a", a.view_mut().into_dyn(), g.view().into_dyn());
        adagrad.update("b", b.view_mut().into_dyn(), g.view().into_dyn());

        // second step on "a" is scaled by 1/sqrt(2)
        assert_relative_eq!(a[0], 1.0 - 0.1 - 0.1 / 2.0f32.sqrt(), epsilon = 1e-6);
        assert_relative_eq!(b[0], 0.9, epsilon = 1e-6);
    }

    #[test]
    fn test_build_optimizer() {
        let mut optimizer = build_optimizer(OptimizerKind::Sgd, 0.5);
        let mut params = array![1.0f32];
        step(optimizer.as_mut(), &mut params, &array![1.0]);
        assert_relative_eq!(params[0], 0.5);
    }
}
