use std::time::Instant;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::loss::loss_fn::Loss;
use crate::network::network::Network;
use crate::optim::sgd::Sgd;
use crate::train::epoch_stats::EpochStats;
use crate::train::train_config::TrainConfig;
use crate::train::trainer::{check_dataset, run_one_epoch};

/// Trains `network` for `config.epochs` epochs of per-example gradient
/// descent and returns the statistics of every completed epoch.
///
/// # Arguments
/// - `network`      — modified in place
/// - `train_inputs` — training examples, each of length `input_width`
/// - `train_labels` — corresponding targets, each of length `output_width`
/// - `loss`         — loss used both for reporting and for the gradient
/// - `config`       — epochs, learning rate, logging cadence, shuffling
///
/// # Early termination
/// Stops after the first epoch whose mean loss is not finite; the weights are
/// past saving at that point and further epochs only spread NaNs.
pub fn train_loop<L>(
    network: &mut Network,
    train_inputs: &[Vec<f64>],
    train_labels: &[Vec<f64>],
    loss: &L,
    config: &TrainConfig,
) -> Result<Vec<EpochStats>>
where
    L: Loss + ?Sized,
{
    check_dataset(train_inputs, train_labels)?;

    let optimizer = Sgd::new(config.learning_rate);
    let mut order: Vec<usize> = (0..train_inputs.len()).collect();
    let mut rng = config.shuffle_seed.map(StdRng::seed_from_u64);
    let mut history = Vec::new();

    debug!(
        widths = ?network.widths(),
        epochs = config.epochs,
        learning_rate = config.learning_rate,
        "starting training"
    );

    for epoch in 1..=config.epochs {
        if let Some(rng) = rng.as_mut() {
            order.shuffle(rng);
        }

        let t_start = Instant::now();
        let train_loss = run_one_epoch(network, train_inputs, train_labels, &order, &optimizer, loss)?;
        let elapsed_ms = t_start.elapsed().as_millis() as u64;

        let stats = EpochStats {
            epoch,
            total_epochs: config.epochs,
            train_loss,
            elapsed_ms,
        };

        if !train_loss.is_finite() {
            warn!(epoch, train_loss, "training diverged, stopping early");
            history.push(stats);
            break;
        }
        if config.log_every > 0 && (epoch % config.log_every == 0 || epoch == config.epochs) {
            info!(epoch, total = config.epochs, train_loss, elapsed_ms, "epoch complete");
        }
        history.push(stats);
    }

    Ok(history)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::activation::ActivationFunction;
    use crate::loss::mse::MseLoss;

    fn linear_data() -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
        let inputs: Vec<Vec<f64>> = (0..=10).map(|i| vec![i as f64 / 10.0]).collect();
        let targets = inputs.iter().map(|x| vec![3.0 * x[0] + 5.0]).collect();
        (inputs, targets)
    }

    #[test]
    fn history_has_one_entry_per_epoch() {
        let (inputs, targets) = linear_data();
        let mut net = Network::initialize(1, 1, 2, 1, ActivationFunction::Identity, None).unwrap();
        let config = TrainConfig::new(25, 0.01).with_log_every(0);
        let history = train_loop(&mut net, &inputs, &targets, &MseLoss, &config).unwrap();
        assert_eq!(history.len(), 25);
        assert_eq!(history[0].epoch, 1);
        assert_eq!(history[24].total_epochs, 25);
    }

    #[test]
    fn same_shuffle_seed_gives_same_run() {
        let (inputs, targets) = linear_data();
        let config = TrainConfig::new(10, 0.01).with_shuffle_seed(3);
        let mut a = Network::initialize(1, 1, 2, 1, ActivationFunction::Identity, None).unwrap();
        let mut b = a.clone();
        let ha = train_loop(&mut a, &inputs, &targets, &MseLoss, &config).unwrap();
        let hb = train_loop(&mut b, &inputs, &targets, &MseLoss, &config).unwrap();
        assert_eq!(a, b);
        let la: Vec<f64> = ha.iter().map(|s| s.train_loss).collect();
        let lb: Vec<f64> = hb.iter().map(|s| s.train_loss).collect();
        assert_eq!(la, lb);
    }

    #[test]
    fn huge_epoch_count_does_not_preallocate() {
        let (inputs, targets) = linear_data();
        let mut net = Network::initialize(1, 1, 2, 1, ActivationFunction::Identity, None).unwrap();
        let mut config = TrainConfig::new(usize::MAX, 0.01).with_log_every(0);
        // A bad example aborts the first epoch, after the history is created.
        let bad_inputs = vec![vec![1.0, 2.0]; inputs.len()];
        assert!(train_loop(&mut net, &bad_inputs, &targets, &MseLoss, &config).is_err());
        config.epochs = 3;
        assert_eq!(train_loop(&mut net, &inputs, &targets, &MseLoss, &config).unwrap().len(), 3);
    }

    #[test]
    fn divergence_stops_the_loop() {
        let inputs: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64 * 100.0]).collect();
        let targets: Vec<Vec<f64>> = inputs.iter().map(|x| vec![x[0]]).collect();
        let mut net = Network::initialize(1, 1, 4, 1, ActivationFunction::Identity, None).unwrap();
        let config = TrainConfig::new(1_000, 1.0).with_log_every(0);
        let history = train_loop(&mut net, &inputs, &targets, &MseLoss, &config).unwrap();
        assert!(history.len() < 1_000);
        assert!(!history[history.len() - 1].train_loss.is_finite());
    }
}
