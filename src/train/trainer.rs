use crate::error::{NnError, Result};
use crate::loss::loss_fn::Loss;
use crate::math::matrix::Matrix;
use crate::network::backprop::backprop;
use crate::network::network::Network;
use crate::optim::sgd::Sgd;

/// Checks that a dataset is non-empty and that inputs and targets pair up.
pub(crate) fn check_dataset(inputs: &[Vec<f64>], expected_outputs: &[Vec<f64>]) -> Result<()> {
    if inputs.is_empty() {
        return Err(NnError::NullInput("training inputs"));
    }
    if inputs.len() != expected_outputs.len() {
        return Err(NnError::ShapeMismatch {
            op: "training set",
            left: (inputs.len(), 1),
            right: (expected_outputs.len(), 1),
        });
    }
    Ok(())
}

/// One pass over the examples listed in `order`, updating after each one.
/// Returns the mean loss over the pass.
pub(crate) fn run_one_epoch<L>(
    network: &mut Network,
    inputs: &[Vec<f64>],
    expected_outputs: &[Vec<f64>],
    order: &[usize],
    optimizer: &Sgd,
    loss: &L,
) -> Result<f64>
where
    L: Loss + ?Sized,
{
    let mut total_loss = 0.0;

    for &idx in order {
        let x = Matrix::row(inputs[idx].clone())?;
        let y = Matrix::row(expected_outputs[idx].clone())?;

        let gradients = backprop(network, &x, &y, loss)?;
        total_loss += gradients.loss;
        optimizer.step(network, &gradients)?;
    }

    Ok(total_loss / order.len() as f64)
}

/// Trains `network` for one epoch, one example at a time in the given order.
/// Returns the mean loss of the epoch.
pub fn train_network<L>(
    network: &mut Network,
    inputs: &[Vec<f64>],
    expected_outputs: &[Vec<f64>],
    optimizer: &Sgd,
    loss: &L,
) -> Result<f64>
where
    L: Loss + ?Sized,
{
    check_dataset(inputs, expected_outputs)?;
    let order: Vec<usize> = (0..inputs.len()).collect();
    run_one_epoch(network, inputs, expected_outputs, &order, optimizer, loss)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::activation::ActivationFunction;
    use crate::loss::mse::MseLoss;

    #[test]
    fn empty_dataset_is_rejected() {
        let mut net = Network::initialize(1, 1, 1, 1, ActivationFunction::Identity, None).unwrap();
        let err = train_network(&mut net, &[], &[], &Sgd::new(0.01), &MseLoss).unwrap_err();
        assert!(matches!(err, NnError::NullInput(_)));
    }

    #[test]
    fn mismatched_dataset_is_rejected() {
        let mut net = Network::initialize(1, 1, 1, 1, ActivationFunction::Identity, None).unwrap();
        let err = train_network(&mut net, &[vec![1.0]], &[], &Sgd::new(0.01), &MseLoss).unwrap_err();
        assert!(matches!(err, NnError::ShapeMismatch { op: "training set", .. }));
    }

    #[test]
    fn bad_example_aborts_the_epoch() {
        let mut net = Network::initialize(2, 1, 2, 1, ActivationFunction::Identity, None).unwrap();
        let inputs = vec![vec![1.0, 2.0], vec![1.0]];
        let targets = vec![vec![1.0], vec![1.0]];
        let err = train_network(&mut net, &inputs, &targets, &Sgd::new(0.01), &MseLoss).unwrap_err();
        assert!(matches!(err, NnError::ShapeMismatch { op: "backprop input", .. }));
    }

    #[test]
    fn one_epoch_reduces_loss_on_linear_data() {
        let mut net = Network::initialize(1, 1, 2, 1, ActivationFunction::Identity, None).unwrap();
        let inputs: Vec<Vec<f64>> = (0..=10).map(|i| vec![i as f64 / 10.0]).collect();
        let targets: Vec<Vec<f64>> = inputs.iter().map(|x| vec![3.0 * x[0] + 5.0]).collect();
        let sgd = Sgd::new(0.01);
        let first = train_network(&mut net, &inputs, &targets, &sgd, &MseLoss).unwrap();
        let second = train_network(&mut net, &inputs, &targets, &sgd, &MseLoss).unwrap();
        assert!(second < first);
    }
}
