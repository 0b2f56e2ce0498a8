pub mod loss_fn;
pub mod mse;

pub use loss_fn::Loss;
pub use mse::MseLoss;
