use crate::error::{NnError, Result};
use crate::loss::loss_fn::Loss;
use crate::math::matrix::Matrix;
use crate::network::network::Network;

/// Gradients for one training example, index-aligned with
/// `Network::weights()` / `Network::biases()`.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientBundle {
    pub weight_gradients: Vec<Matrix>,
    pub bias_gradients: Vec<Matrix>,
    /// Loss of the example under the recorded forward pass.
    pub loss: f64,
}

/// Reverse-mode gradient of `loss` for a single example.
///
/// `train_x` and `train_y` are single-row matrices. The recording pass
/// applies the hidden activation at every layer, the output layer included,
/// and the deltas use that activation's derivative throughout; the output
/// activation only takes part in `Network::predict`.
///
/// Returned gradients point uphill: the descent step is
/// `w -= lr * weight_gradients[i]`.
pub fn backprop<L>(network: &Network, train_x: &Matrix, train_y: &Matrix, loss: &L) -> Result<GradientBundle>
where
    L: Loss + ?Sized,
{
    let weights = network.weights();
    let biases = network.biases();
    let layers = weights.len();

    if train_x.shape() != (1, network.input_width()) {
        return Err(NnError::ShapeMismatch {
            op: "backprop input",
            left: train_x.shape(),
            right: (1, network.input_width()),
        });
    }
    if train_y.shape() != (1, network.output_width()) {
        return Err(NnError::ShapeMismatch {
            op: "backprop target",
            left: train_y.shape(),
            right: (1, network.output_width()),
        });
    }

    let activation = network.hidden_activation();
    let mode = network.derivative_mode();

    // activations[i] feeds weights[i]; zs[i] is the pre-activation it produces.
    let mut activations = Vec::with_capacity(layers + 1);
    let mut zs = Vec::with_capacity(layers);
    activations.push(train_x.transpose()?);
    for (w, b) in weights.iter().zip(biases) {
        let mut z = w.multiply(&activations[activations.len() - 1])?;
        z.add_in_place(b)?;
        activations.push(activation.apply(&z)?);
        zs.push(z);
    }

    let target = train_y.transpose()?;
    let output = &activations[layers];
    let loss_value = loss.loss(output, &target)?;
    let raw_delta = loss.derivative(output, &target)?;
    let mut delta = raw_delta.hadamard(&activation.derivative_matrix(&zs[layers - 1], mode)?)?;

    let mut weight_gradients = Vec::with_capacity(layers);
    let mut bias_gradients = Vec::with_capacity(layers);
    for layer in (0..layers).rev() {
        if layer + 1 < layers {
            let propagated = weights[layer + 1].transpose()?.multiply(&delta)?;
            delta = propagated.hadamard(&activation.derivative_matrix(&zs[layer], mode)?)?;
        }
        weight_gradients.push(delta.multiply(&activations[layer].transpose()?)?);
        bias_gradients.push(delta.clone());

        // Nothing at or above this layer is read again.
        zs.truncate(layer);
        activations.truncate(layer);
    }
    weight_gradients.reverse();
    bias_gradients.reverse();

    Ok(GradientBundle {
        weight_gradients,
        bias_gradients,
        loss: loss_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::activation::{ActivationFunction, DerivativeMode};
    use crate::loss::mse::MseLoss;
    use crate::network::spec::{InitStrategy, NetworkSpec};
    use approx::assert_abs_diff_eq;

    fn sigmoid_net(mode: DerivativeMode) -> Network {
        let spec = NetworkSpec::new(3, 2, 4, 2, ActivationFunction::Sigmoid, None)
            .with_init(InitStrategy::Uniform { seed: Some(11) })
            .with_derivative(mode);
        Network::new(&spec).unwrap()
    }

    fn example() -> (Matrix, Matrix) {
        (
            Matrix::row(vec![0.5, -1.0, 2.0]).unwrap(),
            Matrix::row(vec![0.2, 0.9]).unwrap(),
        )
    }

    fn loss_with_weight(net: &Network, layer: usize, row: usize, col: usize, delta: f64) -> f64 {
        let mut weights = net.weights().to_vec();
        let current = weights[layer].get(row, col).unwrap();
        weights[layer].set(row, col, current + delta).unwrap();
        let perturbed = Network::from_parts(weights, net.biases().to_vec(), net.hidden_activation(), None).unwrap();
        let (x, y) = example();
        backprop(&perturbed, &x, &y, &MseLoss).unwrap().loss
    }

    #[test]
    fn gradients_align_with_parameters() {
        let net = sigmoid_net(DerivativeMode::Analytic);
        let (x, y) = example();
        let grads = backprop(&net, &x, &y, &MseLoss).unwrap();
        assert_eq!(grads.weight_gradients.len(), net.weights().len());
        for (g, w) in grads.weight_gradients.iter().zip(net.weights()) {
            assert_eq!(g.shape(), w.shape());
        }
        for (g, b) in grads.bias_gradients.iter().zip(net.biases()) {
            assert_eq!(g.shape(), b.shape());
        }
    }

    #[test]
    fn weight_gradients_match_finite_differences() {
        let net = sigmoid_net(DerivativeMode::Analytic);
        let (x, y) = example();
        let grads = backprop(&net, &x, &y, &MseLoss).unwrap();
        // The loss derivative drops the 2/n of d(MSE)/d(output).
        let factor = 2.0 / net.output_width() as f64;
        let eps = 1e-5;
        for (layer, g) in grads.weight_gradients.iter().enumerate() {
            for row in 0..g.rows() {
                for col in 0..g.cols() {
                    let numeric = (loss_with_weight(&net, layer, row, col, eps)
                        - loss_with_weight(&net, layer, row, col, -eps))
                        / (2.0 * eps);
                    assert_abs_diff_eq!(g.get(row, col).unwrap() * factor, numeric, epsilon = 1e-7);
                }
            }
        }
    }

    #[test]
    fn numeric_mode_approximates_analytic_mode() {
        let (x, y) = example();
        let analytic = backprop(&sigmoid_net(DerivativeMode::Analytic), &x, &y, &MseLoss).unwrap();
        let numeric = backprop(&sigmoid_net(DerivativeMode::numeric()), &x, &y, &MseLoss).unwrap();
        assert_eq!(analytic.loss, numeric.loss);
        let pairs = analytic.weight_gradients.iter().zip(&numeric.weight_gradients)
            .chain(analytic.bias_gradients.iter().zip(&numeric.bias_gradients));
        for (a, n) in pairs {
            for (av, nv) in a.as_slice().iter().zip(n.as_slice()) {
                assert_abs_diff_eq!(av, nv, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn single_layer_gradient_is_outer_product() {
        let weights = vec![Matrix::from_data(vec![vec![2.0, -1.0]]).unwrap()];
        let biases = vec![Matrix::column(vec![0.5]).unwrap()];
        let net = Network::from_parts(weights, biases, ActivationFunction::Identity, None).unwrap();
        let x = Matrix::row(vec![1.0, 3.0]).unwrap();
        let y = Matrix::row(vec![1.0]).unwrap();
        // output = 2 - 3 + 0.5 = -0.5, delta = -1.5
        let grads = backprop(&net, &x, &y, &MseLoss).unwrap();
        assert_eq!(grads.bias_gradients[0].as_slice(), &[-1.5]);
        assert_eq!(grads.weight_gradients[0].as_slice(), &[-1.5, -4.5]);
        assert_eq!(grads.loss, 2.25);
    }

    #[test]
    fn rejects_column_input_and_wrong_widths() {
        let net = sigmoid_net(DerivativeMode::Analytic);
        let (x, y) = example();
        let column = x.transpose().unwrap();
        assert!(matches!(
            backprop(&net, &column, &y, &MseLoss),
            Err(NnError::ShapeMismatch { op: "backprop input", .. })
        ));
        let wide_y = Matrix::row(vec![0.0, 1.0, 0.0]).unwrap();
        assert!(matches!(
            backprop(&net, &x, &wide_y, &MseLoss),
            Err(NnError::ShapeMismatch { op: "backprop target", .. })
        ));
        let short_x = Matrix::row(vec![1.0, 2.0]).unwrap();
        assert!(backprop(&net, &short_x, &y, &MseLoss).is_err());
    }
}
