// Demo binary: fits y = 3x + 5 with a tiny linear network.
// All neural network logic lives in the library (src/lib.rs and its modules).
use enn::{train_loop, ActivationFunction, MseLoss, Matrix, Network, TrainConfig};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut network = Network::initialize(1, 1, 2, 1, ActivationFunction::Identity, None)?;

    let inputs: Vec<Vec<f64>> = (0..=10).map(|i| vec![i as f64 / 10.0]).collect();
    let targets: Vec<Vec<f64>> = inputs.iter().map(|x| vec![3.0 * x[0] + 5.0]).collect();

    let config = TrainConfig::new(300, 0.01).with_log_every(50);
    let history = train_loop(&mut network, &inputs, &targets, &MseLoss, &config)?;
    if let Some(last) = history.last() {
        info!(epochs = history.len(), loss = last.train_loss, "training finished");
    }

    for x in [0.25, 0.5, 2.0] {
        let prediction = network.predict(&Matrix::column(vec![x])?)?;
        println!("x = {x:.2} -> y = {:.4} (expected {:.4})", prediction.as_slice()[0], 3.0 * x + 5.0);
    }

    Ok(())
}
