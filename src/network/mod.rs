pub mod backprop;
pub mod network;
pub mod spec;

pub use backprop::{backprop, GradientBundle};
pub use network::Network;
pub use spec::{InitStrategy, NetworkSpec};
