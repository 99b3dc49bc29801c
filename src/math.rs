use itertools::Itertools;
use rand::Rng;

use crate::error::{Result, SamplerError};

/// Turn a vector of log-probabilities into probabilities that sum to one.
///
/// The maximum is subtracted before exponentiation, so large log weights do
/// not overflow. `temp` is an annealing exponent applied to the probabilities:
/// `1` keeps the distribution, values below one flatten it towards uniform and
/// values above one sharpen it.
///
/// Entries of `-inf` are allowed and get probability zero. NaN, `+inf` or an
/// input where every entry is `-inf` is rejected, as is a `temp` that is not
/// positive and finite.
pub fn lognormalize(logweights: &[f64], temp: f64) -> Result<Vec<f64>> {
    if logweights.is_empty() {
        return Err(SamplerError::EmptyInput);
    }
    if !(temp > 0. && temp.is_finite()) {
        return Err(SamplerError::InvalidTemperature(temp));
    }
    if logweights.iter().any(|x| x.is_nan() || *x == f64::INFINITY) {
        return Err(SamplerError::DegenerateWeights);
    }

    let max = logweights.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return Err(SamplerError::DegenerateWeights);
    }

    let annealed = logweights
        .iter()
        .map(|x| (x - max).exp().powf(temp))
        .collect_vec();
    let total: f64 = annealed.iter().sum();
    if !(total.is_finite() && total > 0.) {
        return Err(SamplerError::DegenerateWeights);
    }
    Ok(annealed.into_iter().map(|p| p / total).collect())
}

/// Draw one outcome with probability proportional to its weight.
///
/// Weights do not need to be normalized and may be as large as `f64::MAX`;
/// they are scaled by their maximum before summing. A uniform draw is compared against
/// the cumulative normalized weights in input order; if rounding keeps the
/// running sum from ever exceeding the draw, the last outcome is returned.
pub fn sample<'a, A, R: Rng + ?Sized>(
    rng: &mut R,
    outcomes: &'a [A],
    weights: &[f64],
) -> Result<&'a A> {
    if outcomes.len() != weights.len() {
        return Err(SamplerError::ShapeMismatch {
            outcomes: outcomes.len(),
            weights: weights.len(),
        });
    }
    let Some(last) = outcomes.last() else {
        return Err(SamplerError::EmptyInput);
    };
    if weights.iter().any(|w| !w.is_finite() || *w < 0.) {
        return Err(SamplerError::DegenerateWeights);
    }
    let max = weights.iter().copied().fold(0f64, f64::max);
    if max == 0. {
        return Err(SamplerError::DegenerateWeights);
    }
    let total: f64 = weights.iter().map(|w| w / max).sum();

    let r: f64 = rng.random();
    let mut cumulative = 0f64;
    for (outcome, weight) in outcomes.iter().zip(weights) {
        cumulative += weight / max / total;
        if cumulative > r {
            return Ok(outcome);
        }
    }
    Ok(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rand::{Rng, RngCore, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    /// Always produces the largest value, so a uniform `f64` draw is
    /// `1 - 2^-53`.
    struct MaxRng;

    impl RngCore for MaxRng {
        fn next_u32(&mut self) -> u32 {
            u32::MAX
        }

        fn next_u64(&mut self) -> u64 {
            u64::MAX
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(u8::MAX);
        }
    }

    fn entropy(p: &[f64]) -> f64 {
        p.iter()
            .filter(|&&p| p > 0.)
            .map(|&p| -p * p.ln())
            .sum()
    }

    proptest! {
        #[test]
        fn lognormalize_sums_to_one(w in prop::collection::vec(-50f64..50f64, 1..40)) {
            let p = lognormalize(&w, 1.).unwrap();
            prop_assert_eq!(p.len(), w.len());
            prop_assert!((p.iter().sum::<f64>() - 1.).abs() < 1e-9);
            prop_assert!(p.iter().all(|&x| x >= 0.));
        }

        #[test]
        fn lognormalize_shift_invariant(
            w in prop::collection::vec(-20f64..20f64, 1..20),
            shift in -1000f64..1000f64,
        ) {
            let p = lognormalize(&w, 1.).unwrap();
            let shifted = w.iter().map(|x| x + shift).collect_vec();
            let q = lognormalize(&shifted, 1.).unwrap();
            for (a, b) in p.iter().zip(q.iter()) {
                prop_assert!((a - b).abs() < 1e-9);
            }
        }

        #[test]
        fn low_temperature_raises_entropy(
            w in prop::collection::vec(-10f64..10f64, 2..20),
            temp in 0.05f64..0.95f64,
        ) {
            let spread = w.iter().copied().fold(f64::NEG_INFINITY, f64::max)
                - w.iter().copied().fold(f64::INFINITY, f64::min);
            prop_assume!(spread > 0.1);
            let hot = lognormalize(&w, temp).unwrap();
            let cold = lognormalize(&w, 1.).unwrap();
            prop_assert!(entropy(&hot) > entropy(&cold));
        }
    }

    #[test]
    fn lognormalize_equal_inputs_is_uniform() {
        let p = lognormalize(&[3.; 4], 1.).unwrap();
        assert_eq!(p, vec![0.25; 4]);
    }

    #[test]
    fn lognormalize_underflow() {
        let p = lognormalize(&[0., -1e4, -2e4], 1.).unwrap();
        assert_eq!(p, vec![1., 0., 0.]);

        let p = lognormalize(&[f64::NEG_INFINITY, 0.], 0.2).unwrap();
        assert_eq!(p, vec![0., 1.]);
    }

    #[test]
    fn lognormalize_sharpens_above_one() {
        let p = lognormalize(&[0., 2f64.ln()], 2.).unwrap();
        assert_abs_diff_eq!(p[0], 0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(p[1], 0.8, epsilon = 1e-12);
    }

    #[test]
    fn lognormalize_rejects_bad_input() {
        assert!(matches!(
            lognormalize(&[], 1.),
            Err(SamplerError::EmptyInput)
        ));
        assert!(matches!(
            lognormalize(&[0., f64::NAN], 1.),
            Err(SamplerError::DegenerateWeights)
        ));
        assert!(matches!(
            lognormalize(&[0., f64::INFINITY], 1.),
            Err(SamplerError::DegenerateWeights)
        ));
        assert!(matches!(
            lognormalize(&[f64::NEG_INFINITY; 3], 1.),
            Err(SamplerError::DegenerateWeights)
        ));
    }

    #[test]
    fn lognormalize_rejects_bad_temperature() {
        for temp in [0., -1., f64::NAN, f64::INFINITY] {
            assert!(matches!(
                lognormalize(&[f64::NEG_INFINITY, 0.], temp),
                Err(SamplerError::InvalidTemperature(_))
            ));
        }
    }

    #[test]
    fn sample_point_mass() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let outcomes = ["a", "b", "c"];
        for _ in 0..200 {
            assert_eq!(*sample(&mut rng, &outcomes, &[1., 0., 0.]).unwrap(), "a");
            assert_eq!(*sample(&mut rng, &outcomes, &[0., 0., 1.]).unwrap(), "c");
        }
    }

    #[test]
    fn sample_shape_mismatch() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let err = sample(&mut rng, &[1, 2], &[0.2, 0.3, 0.5]).unwrap_err();
        assert!(matches!(
            err,
            SamplerError::ShapeMismatch {
                outcomes: 2,
                weights: 3
            }
        ));
    }

    #[test]
    fn sample_rejects_degenerate_weights() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let outcomes = [1, 2];
        for weights in [[0., 0.], [-1., 2.], [f64::NAN, 1.], [f64::INFINITY, 1.]] {
            assert!(matches!(
                sample(&mut rng, &outcomes, &weights),
                Err(SamplerError::DegenerateWeights)
            ));
        }
        let empty: [i32; 0] = [];
        assert!(matches!(
            sample(&mut rng, &empty, &[]),
            Err(SamplerError::EmptyInput)
        ));
    }

    #[test]
    fn sample_huge_weights() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let outcomes = [0usize, 1];
        let mut counts = [0usize; 2];
        for _ in 0..2_000 {
            counts[*sample(&mut rng, &outcomes, &[f64::MAX, f64::MAX]).unwrap()] += 1;
        }
        assert!(counts.iter().all(|&c| c > 800));

        let draw = sample(&mut rng, &outcomes, &[f64::MAX, 0.]).unwrap();
        assert_eq!(*draw, 0);
    }

    #[test]
    fn sample_falls_back_to_last_outcome() {
        let mut rng = MaxRng;
        let r: f64 = rng.random();
        assert_eq!(r, 1. - f64::EPSILON / 2.);

        let weights = [0.1; 10];
        assert_eq!(weights.iter().sum::<f64>(), 0.9999999999999999);
        let outcomes = (0..10).collect_vec();
        assert_eq!(*sample(&mut MaxRng, &outcomes, &weights).unwrap(), 9);
    }

    #[test]
    fn sample_frequencies() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let outcomes = [0usize, 1, 2];
        // Unnormalized on purpose.
        let weights = [2., 6., 2.];
        let mut counts = [0usize; 3];
        let n = 20_000;
        for _ in 0..n {
            counts[*sample(&mut rng, &outcomes, &weights).unwrap()] += 1;
        }
        assert_abs_diff_eq!(counts[0] as f64 / n as f64, 0.2, epsilon = 0.02);
        assert_abs_diff_eq!(counts[1] as f64 / n as f64, 0.6, epsilon = 0.02);
        assert_abs_diff_eq!(counts[2] as f64 / n as f64, 0.2, epsilon = 0.02);
    }
}
