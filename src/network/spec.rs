use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::activation::activation::{ActivationFunction, DerivativeMode, OutputActivation};
use crate::error::Result;
use crate::math::matrix::Matrix;

/// Fill value of the default, deterministic initialization.
pub const DEFAULT_INIT_VALUE: f64 = 1.0;

/// How freshly built weights and biases are filled.
///
/// Random strategies take an optional seed; without one the generator is
/// seeded from OS entropy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InitStrategy {
    /// Every weight and bias set to the same value.
    Constant(f64),
    Zeros,
    /// Weights and biases uniform in [-1, 1).
    Uniform { seed: Option<u64> },
    /// He-normal weights, zero biases. Suits ReLU hidden layers.
    He { seed: Option<u64> },
    /// Xavier-normal weights, zero biases. Suits sigmoid/tanh/identity layers.
    Xavier { seed: Option<u64> },
}

impl Default for InitStrategy {
    fn default() -> Self {
        InitStrategy::Constant(DEFAULT_INIT_VALUE)
    }
}

impl InitStrategy {
    pub(crate) fn rng(&self) -> StdRng {
        let seed = match self {
            InitStrategy::Uniform { seed } | InitStrategy::He { seed } | InitStrategy::Xavier { seed } => *seed,
            InitStrategy::Constant(_) | InitStrategy::Zeros => Some(0),
        };
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Weight matrix of shape `(fan_out, fan_in)`.
    pub(crate) fn weights(&self, fan_out: usize, fan_in: usize, rng: &mut StdRng) -> Result<Matrix> {
        match self {
            InitStrategy::Constant(value) => Matrix::constant(fan_out, fan_in, *value),
            InitStrategy::Zeros => Matrix::zeros(fan_out, fan_in),
            InitStrategy::Uniform { .. } => Matrix::random(fan_out, fan_in, rng),
            InitStrategy::He { .. } => Matrix::he(fan_out, fan_in, rng),
            InitStrategy::Xavier { .. } => Matrix::xavier(fan_out, fan_in, rng),
        }
    }

    /// Bias column of shape `(fan_out, 1)`.
    pub(crate) fn biases(&self, fan_out: usize, rng: &mut StdRng) -> Result<Matrix> {
        match self {
            InitStrategy::Constant(value) => Matrix::constant(fan_out, 1, *value),
            InitStrategy::Uniform { .. } => Matrix::random(fan_out, 1, rng),
            InitStrategy::Zeros | InitStrategy::He { .. } | InitStrategy::Xavier { .. } => {
                Matrix::zeros(fan_out, 1)
            }
        }
    }
}

/// A serializable description of a network: layer widths, activations and
/// how to initialize and differentiate it.
///
/// Fields:
/// - `input_width`   — features per example
/// - `hidden_layers` — number of hidden layers (0 gives a single affine map)
/// - `hidden_width`  — neurons in every hidden layer
/// - `output_width`  — neurons in the output layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub input_width: usize,
    pub hidden_layers: usize,
    pub hidden_width: usize,
    pub output_width: usize,
    #[serde(default)]
    pub hidden_activation: ActivationFunction,
    #[serde(default)]
    pub output_activation: Option<OutputActivation>,
    #[serde(default)]
    pub init: InitStrategy,
    #[serde(default)]
    pub derivative: DerivativeMode,
}

impl NetworkSpec {
    pub fn new(
        input_width: usize,
        hidden_layers: usize,
        hidden_width: usize,
        output_width: usize,
        hidden_activation: ActivationFunction,
        output_activation: Option<OutputActivation>,
    ) -> NetworkSpec {
        NetworkSpec {
            input_width,
            hidden_layers,
            hidden_width,
            output_width,
            hidden_activation,
            output_activation,
            init: InitStrategy::default(),
            derivative: DerivativeMode::default(),
        }
    }

    pub fn with_init(mut self, init: InitStrategy) -> NetworkSpec {
        self.init = init;
        self
    }

    pub fn with_derivative(mut self, derivative: DerivativeMode) -> NetworkSpec {
        self.derivative = derivative;
        self
    }

    /// Width of every layer, input first and output last.
    pub fn widths(&self) -> Vec<usize> {
        let mut widths = Vec::with_capacity(self.hidden_layers + 2);
        widths.push(self.input_width);
        widths.extend(std::iter::repeat(self.hidden_width).take(self.hidden_layers));
        widths.push(self.output_width);
        widths
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a spec and rejects an unusable derivative step up front.
    pub fn from_json(json: &str) -> Result<NetworkSpec> {
        let spec: NetworkSpec = serde_json::from_str(json)?;
        spec.derivative.validate()?;
        Ok(spec)
    }
}
