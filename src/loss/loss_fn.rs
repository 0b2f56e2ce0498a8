use crate::error::Result;
use crate::math::matrix::Matrix;

/// A loss over column vectors together with its derivative.
///
/// Backpropagation calls `derivative(output, target)` and treats the result
/// as the error signal flowing into the output layer, so implementors return
/// a column shaped like `actual` whose sign points uphill in `actual`.
pub trait Loss {
    fn loss(&self, actual: &Matrix, predicted: &Matrix) -> Result<f64>;

    fn derivative(&self, actual: &Matrix, predicted: &Matrix) -> Result<Matrix>;
}
