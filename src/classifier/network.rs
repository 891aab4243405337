use log::debug;
use ndarray::{Array, Array1, Array2, Axis, Dimension, Zip};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

use super::error::ClassifierError;
use super::utils::{cross_entropy, one_hot, softmax_rows};
use crate::config::TrainingConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Relu,
    Softmax,
}

impl Activation {
    fn apply(self, pre: &Array2<f32>) -> Array2<f32> {
        match self {
            Self::Relu => pre.mapv(|v| v.max(0.0)),
            Self::Softmax => softmax_rows(pre),
        }
    }
}

/// Fully connected layer. `weights` is `[inputs, units]`.
#[derive(Debug, Clone)]
pub struct DenseLayer {
    weights: Array2<f32>,
    bias: Array1<f32>,
    activation: Activation,
}

impl DenseLayer {
    /// Glorot-uniform weights, zero bias.
    fn glorot(inputs: usize, units: usize, activation: Activation, rng: &mut StdRng) -> Self {
        let limit = (6.0 / (inputs + units) as f32).sqrt();
        let weights = Array2::from_shape_fn((inputs, units), |_| rng.random_range(-limit..limit));
        Self {
            weights,
            bias: Array1::zeros(units),
            activation,
        }
    }

    fn pre_activation(&self, input: &Array2<f32>) -> Array2<f32> {
        input.dot(&self.weights) + &self.bias
    }

    pub fn units(&self) -> usize {
        self.bias.len()
    }
}

/// Activations recorded during a forward pass, kept for backpropagation.
struct ForwardTrace {
    /// Layer inputs; `inputs[0]` is the batch itself.
    inputs: Vec<Array2<f32>>,
    /// Pre-activation values per layer.
    pre: Vec<Array2<f32>>,
    output: Array2<f32>,
}

/// Feedforward classifier: ReLU hidden layers followed by a softmax output layer.
#[derive(Debug, Clone)]
pub struct FeedForward {
    input_dim: usize,
    layers: Vec<DenseLayer>,
}

impl FeedForward {
    pub fn new(input_dim: usize, hidden: &[usize], classes: usize, rng: &mut StdRng) -> Self {
        let mut layers = Vec::with_capacity(hidden.len() + 1);
        let mut fan_in = input_dim;
        for &units in hidden {
            layers.push(DenseLayer::glorot(fan_in, units, Activation::Relu, rng));
            fan_in = units;
        }
        layers.push(DenseLayer::glorot(fan_in, classes, Activation::Softmax, rng));
        Self { input_dim, layers }
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn output_dim(&self) -> usize {
        self.layers.last().map_or(0, DenseLayer::units)
    }

    /// Units per layer, input first.
    pub fn layer_sizes(&self) -> Vec<usize> {
        std::iter::once(self.input_dim)
            .chain(self.layers.iter().map(DenseLayer::units))
            .collect()
    }

    pub fn num_parameters(&self) -> usize {
        self.layers
            .iter()
            .map(|layer| layer.weights.len() + layer.bias.len())
            .sum()
    }

    /// Runs inference on a batch of encoded rows and returns one probability row per input.
    ///
    /// # Errors
    /// * `EncodingMismatch` if the batch width differs from the trained input width
    pub fn forward(&self, batch: &Array2<f32>) -> Result<Array2<f32>, ClassifierError> {
        self.check_width(batch.ncols())?;
        Ok(self.trace(batch).output)
    }

    fn check_width(&self, actual: usize) -> Result<(), ClassifierError> {
        if actual != self.input_dim {
            return Err(ClassifierError::EncodingMismatch {
                expected: self.input_dim,
                actual,
            });
        }
        Ok(())
    }

    fn trace(&self, batch: &Array2<f32>) -> ForwardTrace {
        let mut inputs = Vec::with_capacity(self.layers.len());
        let mut pre = Vec::with_capacity(self.layers.len());
        let mut current = batch.to_owned();
        for layer in &self.layers {
            let z = layer.pre_activation(&current);
            let activated = layer.activation.apply(&z);
            inputs.push(std::mem::replace(&mut current, activated));
            pre.push(z);
        }
        ForwardTrace {
            inputs,
            pre,
            output: current,
        }
    }

    /// Gradients of mean cross-entropy for one batch, one `(weights, bias)` pair per layer.
    fn gradients(&self, trace: &ForwardTrace, targets: &Array2<f32>) -> Vec<(Array2<f32>, Array1<f32>)> {
        let rows = targets.nrows().max(1) as f32;
        // Softmax followed by cross-entropy reduces to (p - y).
        let mut delta = (&trace.output - targets) / rows;
        let mut grads = Vec::with_capacity(self.layers.len());
        for idx in (0..self.layers.len()).rev() {
            let grad_w = trace.inputs[idx].t().dot(&delta);
            let grad_b = delta.sum_axis(Axis(0));
            if idx > 0 {
                let relu_mask = trace.pre[idx - 1].mapv(|v| if v > 0.0 { 1.0 } else { 0.0 });
                delta = delta.dot(&self.layers[idx].weights.t()) * relu_mask;
            }
            grads.push((grad_w, grad_b));
        }
        grads.reverse();
        grads
    }

    /// Fits the network with Adam on mini-batches of `inputs`, one pass per epoch.
    ///
    /// `targets` holds the class index of each row. Returns the mean loss of each epoch.
    ///
    /// # Errors
    /// * `EncodingMismatch` if `inputs` is not as wide as the network
    /// * `ValidationError` if the number of rows and targets differ
    pub fn fit(
        &mut self,
        inputs: &Array2<f32>,
        targets: &[usize],
        config: &TrainingConfig,
        rng: &mut StdRng,
    ) -> Result<Vec<f32>, ClassifierError> {
        self.check_width(inputs.ncols())?;
        if inputs.nrows() != targets.len() {
            return Err(ClassifierError::ValidationError(format!(
                "Mismatched inputs and targets: {} rows, {} targets",
                inputs.nrows(),
                targets.len()
            )));
        }

        let classes = self.output_dim();
        let batch_size = config.batch_size.max(1);
        let mut optimizer = Adam::new(config, &self.layers);
        let mut indices: Vec<usize> = (0..inputs.nrows()).collect();
        let mut history = Vec::with_capacity(config.epochs);

        for epoch in 0..config.epochs {
            if config.shuffle {
                indices.shuffle(rng);
            }
            let mut epoch_loss = 0.0f32;
            for batch in indices.chunks(batch_size) {
                let batch_inputs = inputs.select(Axis(0), batch);
                let batch_targets: Vec<usize> = batch.iter().map(|&i| targets[i]).collect();
                let one_hot_targets = one_hot(&batch_targets, classes);

                let trace = self.trace(&batch_inputs);
                epoch_loss += cross_entropy(&trace.output, &one_hot_targets) * batch.len() as f32;
                let grads = self.gradients(&trace, &one_hot_targets);
                optimizer.step(&mut self.layers, &grads);
            }
            let mean_loss = epoch_loss / indices.len().max(1) as f32;
            debug!("Epoch {}/{}: loss = {:.5}", epoch + 1, config.epochs, mean_loss);
            history.push(mean_loss);
        }

        Ok(history)
    }
}

struct Moments {
    m_w: Array2<f32>,
    v_w: Array2<f32>,
    m_b: Array1<f32>,
    v_b: Array1<f32>,
}

/// Adam optimizer state for every layer of one network.
struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    step: i32,
    moments: Vec<Moments>,
}

impl Adam {
    fn new(config: &TrainingConfig, layers: &[DenseLayer]) -> Self {
        let moments = layers
            .iter()
            .map(|layer| Moments {
                m_w: Array2::zeros(layer.weights.raw_dim()),
                v_w: Array2::zeros(layer.weights.raw_dim()),
                m_b: Array1::zeros(layer.bias.raw_dim()),
                v_b: Array1::zeros(layer.bias.raw_dim()),
            })
            .collect();
        Self {
            learning_rate: config.learning_rate,
            beta1: config.beta1,
            beta2: config.beta2,
            epsilon: config.epsilon,
            step: 0,
            moments,
        }
    }

    fn step(&mut self, layers: &mut [DenseLayer], grads: &[(Array2<f32>, Array1<f32>)]) {
        self.step += 1;
        let correction1 = 1.0 - self.beta1.powi(self.step);
        let correction2 = 1.0 - self.beta2.powi(self.step);
        let update = AdamUpdate {
            rate: self.learning_rate * correction2.sqrt() / correction1,
            beta1: self.beta1,
            beta2: self.beta2,
            epsilon: self.epsilon,
        };

        for ((layer, (grad_w, grad_b)), moments) in layers.iter_mut().zip(grads).zip(&mut self.moments) {
            update.apply(&mut layer.weights, grad_w, &mut moments.m_w, &mut moments.v_w);
            update.apply(&mut layer.bias, grad_b, &mut moments.m_b, &mut moments.v_b);
        }
    }
}

/// Bias-corrected hyperparameters for a single optimizer step.
#[derive(Clone, Copy)]
struct AdamUpdate {
    rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
}

impl AdamUpdate {
    fn apply<D: Dimension>(
        self,
        param: &mut Array<f32, D>,
        grad: &Array<f32, D>,
        m: &mut Array<f32, D>,
        v: &mut Array<f32, D>,
    ) {
        Zip::from(param)
            .and(grad)
            .and(m)
            .and(v)
            .for_each(|p, &g, m, v| {
                *m = self.beta1 * *m + (1.0 - self.beta1) * g;
                *v = self.beta2 * *v + (1.0 - self.beta2) * g * g;
                *p -= self.rate * *m / (v.sqrt() + self.epsilon);
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;

    fn small_config(epochs: usize) -> TrainingConfig {
        TrainingConfig {
            epochs,
            batch_size: 2,
            learning_rate: 0.01,
            ..TrainingConfig::default()
        }
    }

    #[test]
    fn test_layer_shapes() {
        let mut rng = StdRng::seed_from_u64(7);
        let net = FeedForward::new(10, &[128, 64], 3, &mut rng);
        assert_eq!(net.layer_sizes(), vec![10, 128, 64, 3]);
        assert_eq!(net.num_parameters(), 10 * 128 + 128 + 128 * 64 + 64 + 64 * 3 + 3);
    }

    #[test]
    fn test_forward_outputs_distribution() -> Result<(), ClassifierError> {
        let mut rng = StdRng::seed_from_u64(7);
        let net = FeedForward::new(4, &[8], 3, &mut rng);
        let probs = net.forward(&array![[1.0, 0.0, 1.0, 0.0], [0.0, 0.0, 0.0, 0.0]])?;
        assert_eq!(probs.dim(), (2, 3));
        for row in probs.axis_iter(Axis(0)) {
            assert!((row.sum() - 1.0).abs() < 1e-5);
        }
        Ok(())
    }

    #[test]
    fn test_forward_rejects_wrong_width() {
        let mut rng = StdRng::seed_from_u64(7);
        let net = FeedForward::new(4, &[8], 2, &mut rng);
        let result = net.forward(&Array2::zeros((1, 5)));
        assert!(matches!(
            result,
            Err(ClassifierError::EncodingMismatch { expected: 4, actual: 5 })
        ));
    }

    #[test]
    fn test_fit_reduces_loss_on_separable_data() -> Result<(), ClassifierError> {
        let mut rng = StdRng::seed_from_u64(42);
        let mut net = FeedForward::new(3, &[16, 8], 2, &mut rng);
        let inputs = array![[1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 1.0]];
        let targets = [0, 0, 1, 1];
        let history = net.fit(&inputs, &targets, &small_config(60), &mut rng)?;
        assert_eq!(history.len(), 60);
        assert!(history[59] < history[0]);

        let probs = net.forward(&inputs)?;
        assert!(probs[[0, 0]] > probs[[0, 1]]);
        assert!(probs[[2, 1]] > probs[[2, 0]]);
        Ok(())
    }

    #[test]
    fn test_fit_is_deterministic_for_a_seed() -> Result<(), ClassifierError> {
        let inputs = array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];
        let targets = [0, 1, 1];
        let run = || -> Result<Array2<f32>, ClassifierError> {
            let mut rng = StdRng::seed_from_u64(3);
            let mut net = FeedForward::new(2, &[4], 2, &mut rng);
            net.fit(&inputs, &targets, &small_config(5), &mut rng)?;
            net.forward(&inputs)
        };
        assert_eq!(run()?, run()?);
        Ok(())
    }

    #[test]
    fn test_fit_rejects_mismatched_targets() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut net = FeedForward::new(2, &[4], 2, &mut rng);
        let result = net.fit(&Array2::zeros((3, 2)), &[0, 1], &small_config(1), &mut rng);
        assert!(matches!(result, Err(ClassifierError::ValidationError(_))));
    }
}
