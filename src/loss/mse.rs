use crate::error::{NnError, Result};
use crate::loss::loss_fn::Loss;
use crate::math::matrix::Matrix;

/// Mean-squared error over column vectors.
#[derive(Debug, Clone, Copy, Default)]
pub struct MseLoss;

/// Both operands must be column vectors with the same number of rows.
fn ensure_columns(actual: &Matrix, predicted: &Matrix, op: &'static str) -> Result<()> {
    if !actual.is_column() || !predicted.is_column() || actual.rows() != predicted.rows() {
        return Err(NnError::ShapeMismatch {
            op,
            left: actual.shape(),
            right: predicted.shape(),
        });
    }
    Ok(())
}

impl MseLoss {
    /// Scalar MSE: (1/n) * sum((actual - predicted)^2)
    pub fn mean_squared_error(actual: &Matrix, predicted: &Matrix) -> Result<f64> {
        ensure_columns(actual, predicted, "mean_squared_error")?;
        let n = actual.rows() as f64;
        Ok(actual.as_slice().iter().zip(predicted.as_slice())
            .map(|(a, p)| (a - p).powi(2))
            .sum::<f64>() / n)
    }

    /// Per-output gradient: actual - predicted.
    ///
    /// The factor 2 of the true derivative is left out; it only rescales the
    /// learning rate.
    pub fn d_mean_squared_error(actual: &Matrix, predicted: &Matrix) -> Result<Matrix> {
        ensure_columns(actual, predicted, "d_mean_squared_error")?;
        actual.subtract(predicted)
    }
}

impl Loss for MseLoss {
    fn loss(&self, actual: &Matrix, predicted: &Matrix) -> Result<f64> {
        MseLoss::mean_squared_error(actual, predicted)
    }

    fn derivative(&self, actual: &Matrix, predicted: &Matrix) -> Result<Matrix> {
        MseLoss::d_mean_squared_error(actual, predicted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn mse_of_identical_vectors_is_zero() {
        let v = Matrix::column(vec![0.5, -1.0, 3.25]).unwrap();
        assert_eq!(MseLoss.loss(&v, &v).unwrap(), 0.0);
    }

    #[test]
    fn mse_averages_squared_error() {
        let actual = Matrix::column(vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let predicted = Matrix::column(vec![1.0, 0.0, 3.0, 5.0]).unwrap();
        assert_abs_diff_eq!(MseLoss::mean_squared_error(&actual, &predicted).unwrap(), 1.25);
    }

    #[test]
    fn mse_rejects_mismatched_rows() {
        let a = Matrix::column(vec![1.0, 2.0]).unwrap();
        let b = Matrix::column(vec![1.0, 2.0, 3.0]).unwrap();
        assert!(matches!(MseLoss.loss(&a, &b), Err(NnError::ShapeMismatch { .. })));
        assert!(MseLoss.derivative(&a, &b).is_err());
    }

    #[test]
    fn mse_rejects_non_column_operands() {
        let row = Matrix::row(vec![1.0, 2.0]).unwrap();
        assert!(MseLoss.loss(&row, &row).is_err());
    }

    #[test]
    fn derivative_is_actual_minus_predicted() {
        let actual = Matrix::column(vec![3.0, -1.0]).unwrap();
        let predicted = Matrix::column(vec![1.0, 1.0]).unwrap();
        let d = MseLoss.derivative(&actual, &predicted).unwrap();
        assert_eq!(d.as_slice(), &[2.0, -2.0]);
    }
}
