pub mod error;
pub mod math;
pub mod activation;
pub mod loss;
pub mod network;
pub mod optim;
pub mod train;

// Convenience re-exports
pub use error::{NnError, Result};
pub use math::matrix::Matrix;
pub use activation::activation::{softmax, numeric_derivative, ActivationFunction, DerivativeMode, OutputActivation};
pub use loss::{Loss, MseLoss};
pub use network::{backprop, GradientBundle, InitStrategy, Network, NetworkSpec};
pub use optim::sgd::Sgd;
pub use train::{train_loop, train_network, EpochStats, TrainConfig};
