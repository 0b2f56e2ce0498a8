use serde::{Deserialize, Serialize};
use std::f64::consts::E;

use crate::error::{NnError, Result};
use crate::math::matrix::Matrix;

/// Default finite-difference step for `DerivativeMode::Numeric`.
pub const DEFAULT_NUMERIC_STEP: f64 = 1e-6;

/// Scalar activation applied cell by cell to hidden layers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ActivationFunction {
    /// Linear pass-through, `f(x) = x`.
    Identity,
    ReLU,
    LeakyReLU { alpha: f64 },
    Sigmoid,
    Tanh,
}

impl ActivationFunction {
    /// Leaky ReLU with the conventional 0.01 negative slope.
    pub const fn leaky_relu() -> ActivationFunction {
        ActivationFunction::LeakyReLU { alpha: 0.01 }
    }

    pub fn function(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Identity => x,
            ActivationFunction::ReLU => if x >= 0.0 { x } else { 0.0 },
            ActivationFunction::LeakyReLU { alpha } => if x >= 0.0 { x } else { alpha * x },
            ActivationFunction::Sigmoid => 1.0 / (1.0 + E.powf(-x)),
            ActivationFunction::Tanh => x.tanh(),
        }
    }

    /// Closed-form derivative with respect to the pre-activation `x`.
    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Identity => 1.0,
            ActivationFunction::ReLU => if x > 0.0 { 1.0 } else { 0.0 },
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 { 1.0 } else { *alpha },
            ActivationFunction::Sigmoid => {
                let fx = self.function(x);
                fx * (1.0 - fx)
            }
            ActivationFunction::Tanh => {
                let t = x.tanh();
                1.0 - t * t
            }
        }
    }

    /// Derivative expressed through the activation's own output `y = f(x)`.
    ///
    /// Every current variant has one; the `Option` leaves room for
    /// activations whose derivative cannot be recovered from the output alone.
    pub fn derivative_from_output(&self, y: f64) -> Option<f64> {
        match self {
            ActivationFunction::Identity => Some(1.0),
            ActivationFunction::ReLU => Some(if y > 0.0 { 1.0 } else { 0.0 }),
            ActivationFunction::LeakyReLU { alpha } => Some(if y > 0.0 { 1.0 } else { *alpha }),
            ActivationFunction::Sigmoid => Some(y * (1.0 - y)),
            ActivationFunction::Tanh => Some(1.0 - y * y),
        }
    }

    /// Applies the activation to every cell of `z`.
    pub fn apply(&self, z: &Matrix) -> Result<Matrix> {
        z.map(|x| self.function(x))
    }

    /// Derivative of the activation at every cell of `z`, computed the way
    /// `mode` asks for.
    pub fn derivative_matrix(&self, z: &Matrix, mode: DerivativeMode) -> Result<Matrix> {
        match mode {
            DerivativeMode::Analytic => z.map(|x| self.derivative(x)),
            DerivativeMode::Numeric { step } => numeric_derivative(z, |x| self.function(x), step),
        }
    }
}

impl Default for ActivationFunction {
    fn default() -> Self {
        ActivationFunction::Identity
    }
}

/// How backpropagation obtains activation derivatives.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DerivativeMode {
    /// Closed-form derivative of each variant.
    Analytic,
    /// Forward difference `(f(z + step) - f(z)) / step`.
    Numeric { step: f64 },
}

impl DerivativeMode {
    pub const fn numeric() -> DerivativeMode {
        DerivativeMode::Numeric { step: DEFAULT_NUMERIC_STEP }
    }

    /// A numeric step must be finite and strictly positive.
    pub fn validate(&self) -> Result<()> {
        match *self {
            DerivativeMode::Analytic => Ok(()),
            DerivativeMode::Numeric { step } => check_step(step),
        }
    }
}

fn check_step(step: f64) -> Result<()> {
    if step.is_finite() && step > 0.0 {
        Ok(())
    } else {
        Err(NnError::InvalidParameter { name: "numeric derivative step", value: step })
    }
}

impl Default for DerivativeMode {
    fn default() -> Self {
        DerivativeMode::Analytic
    }
}

/// Forward-difference derivative of `activation`, cell by cell over `z`.
///
/// Works for any scalar function at the cost of one extra evaluation per
/// cell and truncation error of order `step`.
pub fn numeric_derivative<F>(z: &Matrix, activation: F, step: f64) -> Result<Matrix>
where
    F: Fn(f64) -> f64,
{
    check_step(step)?;
    let shifted = z.map(|x| activation(x + step))?;
    let base = z.map(&activation)?;
    let mut diff = shifted.subtract(&base)?;
    diff.scale_in_place(1.0 / step);
    Ok(diff)
}

/// Vector-valued activation applied to the whole output column at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputActivation {
    Softmax,
}

impl OutputActivation {
    pub fn apply(&self, z: &Matrix) -> Result<Matrix> {
        match self {
            OutputActivation::Softmax => softmax(z),
        }
    }
}

/// Softmax over a column vector. The maximum cell is subtracted before
/// exponentiating so large logits cannot overflow.
pub fn softmax(column: &Matrix) -> Result<Matrix> {
    if !column.is_column() {
        return Err(NnError::ShapeMismatch {
            op: "softmax",
            left: column.shape(),
            right: (column.rows(), 1),
        });
    }
    let max = column.as_slice().iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut exps = column.map(|x| (x - max).exp())?;
    let sum: f64 = exps.as_slice().iter().sum();
    exps.scale_in_place(1.0 / sum);
    Ok(exps)
}
