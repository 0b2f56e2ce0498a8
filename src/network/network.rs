use serde::{Deserialize, Serialize};

use crate::activation::activation::{ActivationFunction, DerivativeMode, OutputActivation};
use crate::error::{NnError, Result};
use crate::math::matrix::Matrix;
use crate::network::backprop::GradientBundle;
use crate::network::spec::NetworkSpec;

/// A fully connected feed-forward network.
///
/// For an L-layer network (input, hidden layers, output) it owns L-1 weight
/// matrices and L-1 bias columns, with `weights[i]` of shape
/// `(width[i+1], width[i])` and `biases[i]` of shape `(width[i+1], 1)`.
/// Every constructor checks that invariant, deserialization included, so the
/// passes can index freely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawNetwork")]
pub struct Network {
    weights: Vec<Matrix>,
    biases: Vec<Matrix>,
    hidden_activation: ActivationFunction,
    output_activation: Option<OutputActivation>,
    derivative: DerivativeMode,
}

/// Unchecked wire form of `Network`.
#[derive(Deserialize)]
struct RawNetwork {
    weights: Vec<Matrix>,
    biases: Vec<Matrix>,
    hidden_activation: ActivationFunction,
    output_activation: Option<OutputActivation>,
    #[serde(default)]
    derivative: DerivativeMode,
}

impl TryFrom<RawNetwork> for Network {
    type Error = NnError;

    fn try_from(raw: RawNetwork) -> Result<Network> {
        let network = Network {
            weights: raw.weights,
            biases: raw.biases,
            hidden_activation: raw.hidden_activation,
            output_activation: raw.output_activation,
            derivative: raw.derivative,
        };
        network.validate()?;
        Ok(network)
    }
}

impl Network {
    /// Builds a network from its spec, allocating one weight/bias pair per
    /// layer transition.
    pub fn new(spec: &NetworkSpec) -> Result<Network> {
        spec.derivative.validate()?;
        let widths = spec.widths();
        let mut rng = spec.init.rng();
        let mut weights = Vec::with_capacity(widths.len() - 1);
        let mut biases = Vec::with_capacity(widths.len() - 1);

        // An early return drops whatever was already allocated.
        for pair in widths.windows(2) {
            let (fan_in, fan_out) = (pair[0], pair[1]);
            weights.push(spec.init.weights(fan_out, fan_in, &mut rng)?);
            biases.push(spec.init.biases(fan_out, &mut rng)?);
        }

        Ok(Network {
            weights,
            biases,
            hidden_activation: spec.hidden_activation,
            output_activation: spec.output_activation,
            derivative: spec.derivative,
        })
    }

    /// Shorthand for `Network::new` with default initialization and analytic
    /// derivatives.
    pub fn initialize(
        input_width: usize,
        hidden_layers: usize,
        hidden_width: usize,
        output_width: usize,
        hidden_activation: ActivationFunction,
        output_activation: Option<OutputActivation>,
    ) -> Result<Network> {
        Network::new(&NetworkSpec::new(
            input_width,
            hidden_layers,
            hidden_width,
            output_width,
            hidden_activation,
            output_activation,
        ))
    }

    /// Assembles a network from existing matrices, e.g. weights exported by
    /// another framework. Shapes must chain and biases must be columns.
    pub fn from_parts(
        weights: Vec<Matrix>,
        biases: Vec<Matrix>,
        hidden_activation: ActivationFunction,
        output_activation: Option<OutputActivation>,
    ) -> Result<Network> {
        let network = Network {
            weights,
            biases,
            hidden_activation,
            output_activation,
            derivative: DerivativeMode::default(),
        };
        network.validate()?;
        Ok(network)
    }

    pub fn with_derivative_mode(mut self, derivative: DerivativeMode) -> Result<Network> {
        derivative.validate()?;
        self.derivative = derivative;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        self.derivative.validate()?;
        if self.weights.is_empty() {
            return Err(NnError::NullInput("network weights"));
        }
        if self.weights.len() != self.biases.len() {
            return Err(NnError::ShapeMismatch {
                op: "network layers",
                left: (self.weights.len(), 1),
                right: (self.biases.len(), 1),
            });
        }
        for (i, (w, b)) in self.weights.iter().zip(&self.biases).enumerate() {
            if b.shape() != (w.rows(), 1) {
                return Err(NnError::ShapeMismatch {
                    op: "network bias",
                    left: w.shape(),
                    right: b.shape(),
                });
            }
            if i > 0 && w.cols() != self.weights[i - 1].rows() {
                return Err(NnError::ShapeMismatch {
                    op: "network weights",
                    left: self.weights[i - 1].shape(),
                    right: w.shape(),
                });
            }
        }
        Ok(())
    }

    pub fn weights(&self) -> &[Matrix] {
        &self.weights
    }

    pub fn biases(&self) -> &[Matrix] {
        &self.biases
    }

    pub fn hidden_activation(&self) -> ActivationFunction {
        self.hidden_activation
    }

    pub fn output_activation(&self) -> Option<OutputActivation> {
        self.output_activation
    }

    pub fn derivative_mode(&self) -> DerivativeMode {
        self.derivative
    }

    /// Number of layers including input and output.
    pub fn layer_count(&self) -> usize {
        self.weights.len() + 1
    }

    /// Width of every layer, input first.
    pub fn widths(&self) -> Vec<usize> {
        std::iter::once(self.input_width())
            .chain(self.weights.iter().map(Matrix::rows))
            .collect()
    }

    pub fn input_width(&self) -> usize {
        self.weights[0].cols()
    }

    pub fn output_width(&self) -> usize {
        self.weights[self.weights.len() - 1].rows()
    }

    /// Forward pass over one example given as a column vector.
    ///
    /// Hidden layers apply the hidden activation; the last layer applies the
    /// output activation when one is configured and is left linear otherwise.
    pub fn predict(&self, input: &Matrix) -> Result<Matrix> {
        if input.shape() != (self.input_width(), 1) {
            return Err(NnError::ShapeMismatch {
                op: "predict",
                left: input.shape(),
                right: (self.input_width(), 1),
            });
        }

        let last = self.weights.len() - 1;
        let mut a = input.clone();
        for (i, (w, b)) in self.weights.iter().zip(&self.biases).enumerate() {
            let mut z = w.multiply(&a)?;
            z.add_in_place(b)?;
            a = if i < last {
                self.hidden_activation.apply(&z)?
            } else {
                match self.output_activation {
                    Some(output) => output.apply(&z)?,
                    None => z,
                }
            };
        }
        Ok(a)
    }

    /// Index of the largest output, e.g. the predicted class under softmax.
    pub fn classify(&self, input: &Matrix) -> Result<usize> {
        Ok(self.predict(input)?.argmax())
    }

    /// Adds `scale * gradient` to every weight and bias. Shapes are checked
    /// for all layers before any parameter changes.
    pub fn apply_update(&mut self, gradients: &GradientBundle, scale: f64) -> Result<()> {
        let layers = self.weights.len();
        if gradients.weight_gradients.len() != layers || gradients.bias_gradients.len() != layers {
            return Err(NnError::ShapeMismatch {
                op: "apply_update",
                left: (layers, layers),
                right: (gradients.weight_gradients.len(), gradients.bias_gradients.len()),
            });
        }
        let params = self.weights.iter().chain(&self.biases);
        let grads = gradients.weight_gradients.iter().chain(&gradients.bias_gradients);
        if let Some((p, g)) = params.zip(grads).find(|(p, g)| p.shape() != g.shape()) {
            return Err(NnError::ShapeMismatch {
                op: "apply_update",
                left: p.shape(),
                right: g.shape(),
            });
        }

        for (w, g) in self.weights.iter_mut().zip(&gradients.weight_gradients) {
            w.add_scaled_in_place(g, scale)?;
        }
        for (b, g) in self.biases.iter_mut().zip(&gradients.bias_gradients) {
            b.add_scaled_in_place(g, scale)?;
        }
        Ok(())
    }

    /// Serializes weights, biases and activation choices to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Restores a network written by `to_json`, re-checking layer shapes.
    pub fn from_json(json: &str) -> Result<Network> {
        Ok(serde_json::from_str(json)?)
    }
}
