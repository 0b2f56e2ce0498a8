use serde::{Deserialize, Serialize};

fn default_log_every() -> usize {
    100
}

/// Configuration for a `train_loop` run.
///
/// # Fields
/// - `epochs`        — total number of full passes over the training data
/// - `learning_rate` — step size of the gradient-descent update
/// - `log_every`     — emit an `info!` line every this many epochs (0 disables)
/// - `shuffle_seed`  — when set, example order is reshuffled every epoch from
///                     a generator seeded with this value; otherwise examples
///                     are visited in the order given
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub epochs: usize,
    pub learning_rate: f64,
    #[serde(default = "default_log_every")]
    pub log_every: usize,
    #[serde(default)]
    pub shuffle_seed: Option<u64>,
}

impl TrainConfig {
    /// Creates a `TrainConfig` that visits examples in order.
    pub fn new(epochs: usize, learning_rate: f64) -> Self {
        TrainConfig {
            epochs,
            learning_rate,
            log_every: default_log_every(),
            shuffle_seed: None,
        }
    }

    pub fn with_log_every(mut self, log_every: usize) -> Self {
        self.log_every = log_every;
        self
    }

    pub fn with_shuffle_seed(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }
}
