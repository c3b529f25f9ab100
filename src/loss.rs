//! Cross-entropy loss with integrated softmax.
//!
//! Softmax and cross-entropy are fused: the loss is computed through a
//! row-wise shifted log-sum-exp, and the gradient uses the closed form
//! `(softmax(logits) - targets) / N` directly. Composing a separate softmax
//! derivative would be both slower and wrong here — the fused form is the
//! derivative of the fused loss.
//!
//! The max-shift before exponentiation is applied unconditionally. Softmax is
//! shift-invariant, so rows of huge uniform logits (e.g. all 2000) produce
//! exactly the same loss as rows of zeros instead of overflowing to NaN.

use crate::Matrix;

/// Softmax cross-entropy over a batch of one-hot targets.
///
/// Stateless; construct once and reuse freely.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossEntropyLoss;

impl CrossEntropyLoss {
    pub fn new() -> Self {
        Self
    }

    /// Mean negative log-likelihood of the true class over the batch.
    ///
    /// Shape contract: `targets` and `logits` are both `(batch, classes)`;
    /// each target row is one-hot.
    pub fn loss(&self, targets: &Matrix, logits: &Matrix) -> f32 {
        assert_eq!(
            targets.shape(),
            logits.shape(),
            "cross-entropy: targets are {}x{}, logits are {}x{}",
            targets.rows(),
            targets.cols(),
            logits.rows(),
            logits.cols()
        );
        assert!(logits.rows() > 0 && logits.cols() > 0, "cross-entropy: empty batch");

        let mut total = 0.0_f32;
        for row in 0..logits.rows() {
            let z = logits.row(row);
            let t = targets.row(row);
            let (ln_sum, max) = shifted_log_sum_exp(z);

            // -log softmax(z)[i] = ln(sum exp(z - max)) - (z[i] - max).
            // The subtraction happens in shifted space: `max + ln_sum` would
            // round at the ulp of `max` and break shift invariance for huge
            // logits, so that intermediate is never formed.
            for (zi, ti) in z.iter().zip(t) {
                if *ti != 0.0 {
                    total += ti * (ln_sum - (zi - max));
                }
            }
        }
        total / logits.rows() as f32
    }

    /// Gradient of [`CrossEntropyLoss::loss`] with respect to the logits:
    /// `(softmax(logits) - targets) / N`, same shape as `logits`.
    pub fn backward(&self, targets: &Matrix, logits: &Matrix) -> Matrix {
        assert_eq!(
            targets.shape(),
            logits.shape(),
            "cross-entropy backward: targets are {}x{}, logits are {}x{}",
            targets.rows(),
            targets.cols(),
            logits.rows(),
            logits.cols()
        );
        assert!(logits.rows() > 0 && logits.cols() > 0, "cross-entropy: empty batch");

        let inv_n = 1.0 / logits.rows() as f32;
        let mut grad = Matrix::zeros(logits.rows(), logits.cols());
        for row in 0..logits.rows() {
            let z = logits.row(row);
            let max = row_max(z);

            let mut sum_exp = 0.0_f32;
            for &zi in z {
                sum_exp += (zi - max).exp();
            }
            let inv_sum = 1.0 / sum_exp;

            for col in 0..logits.cols() {
                let softmax = (z[col] - max).exp() * inv_sum;
                grad.set(row, col, (softmax - targets.get(row, col)) * inv_n);
            }
        }
        grad
    }
}

#[inline]
fn row_max(xs: &[f32]) -> f32 {
    let mut max_x = xs[0];
    for &x in xs.iter().skip(1) {
        if x > max_x {
            max_x = x;
        }
    }
    max_x
}

/// Returns `(ln(sum exp(x - max)), max)`. The un-shifted log-sum-exp
/// `max + ln(...)` is deliberately not computed; callers subtract shifted
/// logits from the first component instead.
#[inline]
fn shifted_log_sum_exp(xs: &[f32]) -> (f32, f32) {
    let max_x = row_max(xs);
    let mut sum_exp = 0.0_f32;
    for &x in xs {
        sum_exp += (x - max_x).exp();
    }
    (sum_exp.ln(), max_x)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_hot_3() -> Matrix {
        Matrix::from_vec(
            vec![
                1.0, 0.0, 0.0, //
                0.0, 1.0, 0.0, //
                0.0, 0.0, 1.0,
            ],
            3,
            3,
        )
        .unwrap()
    }

    #[test]
    fn near_zero_loss_for_well_separated_logits() {
        let targets = one_hot_3();
        let logits = Matrix::from_vec(
            vec![
                10.0, 2.0, -1.0, //
                -1.0, 10.0, 2.0, //
                2.0, -1.0, 10.0,
            ],
            3,
            3,
        )
        .unwrap();

        let loss = CrossEntropyLoss::new().loss(&targets, &logits);
        assert!((loss - 0.00035208222).abs() < 1e-5, "loss {loss}");
    }

    #[test]
    fn loss_is_shift_invariant_for_huge_logits() {
        let targets = one_hot_3();
        let huge = Matrix::from_vec(vec![2000.0; 9], 3, 3).unwrap();
        let zero = Matrix::zeros(3, 3);

        let loss = CrossEntropyLoss::new();
        let loss_huge = loss.loss(&targets, &huge);
        let loss_zero = loss.loss(&targets, &zero);

        assert!(loss_huge.is_finite());
        // Softmax is shift-invariant; the shifted computations are identical.
        assert_eq!(loss_huge, loss_zero);
        assert!((loss_huge - 3.0_f32.ln()).abs() < 1e-6, "loss {loss_huge}");

        // Same must hold for non-uniform rows offset by a huge constant.
        // Entries are multiples of 0.5 so the offset inputs are exact in f32
        // and the comparison tests the loss, not input rounding.
        let base = Matrix::from_vec(
            vec![
                0.0, 1.0, -1.0, //
                2.0, -0.5, 0.5, //
                -1.0, 0.5, 1.5,
            ],
            3,
            3,
        )
        .unwrap();
        let shifted = base.map(|x| x + 2000.0);
        assert_eq!(loss.loss(&targets, &shifted), loss.loss(&targets, &base));
    }

    #[test]
    fn gradient_matches_reference_fixture() {
        let targets = one_hot_3();
        let logits = Matrix::from_vec(
            vec![
                2.0, 2.0, -1.0, //
                -1.0, 2.0, 2.0, //
                2.0, -1.0, 2.0,
            ],
            3,
            3,
        )
        .unwrap();
        let expected = [
            -0.17071481, 0.16261852, 0.0080963, //
            0.0080963, -0.17071481, 0.16261852, //
            0.16261852, 0.0080963, -0.17071481,
        ];

        let grad = CrossEntropyLoss::new().backward(&targets, &logits);
        assert_eq!(grad.shape(), (3, 3));
        for (g, e) in grad.as_slice().iter().zip(expected) {
            assert!((g - e).abs() < 1e-6, "got {g}, expected {e}");
        }
    }

    #[test]
    fn gradient_rows_sum_to_zero_for_one_hot_targets() {
        let targets = one_hot_3();
        let logits = Matrix::from_vec(
            vec![
                0.3, -0.7, 1.2, //
                2.5, 0.0, -1.1, //
                -0.4, 0.9, 0.2,
            ],
            3,
            3,
        )
        .unwrap();
        let grad = CrossEntropyLoss::new().backward(&targets, &logits);
        for row in 0..3 {
            let sum: f32 = grad.row(row).iter().sum();
            assert!(sum.abs() < 1e-6, "row {row} sums to {sum}");
        }
    }

    #[test]
    #[should_panic]
    fn shape_mismatch_panics() {
        let targets = Matrix::zeros(2, 3);
        let logits = Matrix::zeros(3, 3);
        let _ = CrossEntropyLoss::new().loss(&targets, &logits);
    }
}
