use crate::error::Result;
use crate::network::backprop::GradientBundle;
use crate::network::network::Network;

/// Plain gradient descent with a fixed learning rate.
#[derive(Debug, Clone, Copy)]
pub struct Sgd {
    pub learning_rate: f64,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Sgd {
        Sgd { learning_rate }
    }

    /// Applies `w -= lr * grad` to every weight and bias of `network`.
    pub fn step(&self, network: &mut Network, gradients: &GradientBundle) -> Result<()> {
        network.apply_update(gradients, -self.learning_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::activation::ActivationFunction;
    use crate::error::NnError;
    use crate::math::matrix::Matrix;
    use approx::assert_abs_diff_eq;

    #[test]
    fn step_moves_against_the_gradient() {
        let mut net = Network::initialize(2, 0, 1, 1, ActivationFunction::Identity, None).unwrap();
        let gradients = GradientBundle {
            weight_gradients: vec![Matrix::row(vec![1.0, -2.0]).unwrap()],
            bias_gradients: vec![Matrix::column(vec![0.5]).unwrap()],
            loss: 0.0,
        };
        Sgd::new(0.1).step(&mut net, &gradients).unwrap();
        let w = net.weights()[0].as_slice();
        assert_abs_diff_eq!(w[0], 0.9, epsilon = 1e-12);
        assert_abs_diff_eq!(w[1], 1.2, epsilon = 1e-12);
        assert_abs_diff_eq!(net.biases()[0].get(0, 0).unwrap(), 0.95, epsilon = 1e-12);
    }

    #[test]
    fn mismatched_bundle_leaves_network_untouched() {
        let mut net = Network::initialize(2, 1, 2, 1, ActivationFunction::Identity, None).unwrap();
        let before = net.clone();
        let gradients = GradientBundle {
            weight_gradients: vec![Matrix::zeros(2, 2).unwrap(), Matrix::zeros(2, 2).unwrap()],
            bias_gradients: vec![Matrix::zeros(2, 1).unwrap(), Matrix::zeros(1, 1).unwrap()],
            loss: 0.0,
        };
        let err = Sgd::new(0.1).step(&mut net, &gradients).unwrap_err();
        assert!(matches!(err, NnError::ShapeMismatch { op: "apply_update", .. }));
        assert_eq!(net, before);
    }
}
