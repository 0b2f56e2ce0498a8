pub mod activation;

pub use activation::{numeric_derivative, softmax, ActivationFunction, DerivativeMode, OutputActivation};
