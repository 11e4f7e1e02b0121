use crate::die::{Die, Face};
use ndarray::{Array1, ArrayView1, Zip};
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// How many times each of `faces` shows up in `rolls`. Rolls of faces not in
/// `faces` are ignored.
pub fn observed_counts<F: Face>(faces: &[F], rolls: &[F]) -> Array1<f64> {
    let mut counts = Array1::<f64>::zeros(faces.len());
    for roll in rolls {
        if let Some(idx) = faces.iter().position(|face| face == roll) {
            counts[idx] += 1.0;
        }
    }
    counts
}

/// The empirical PMF of `rolls` over `faces`.
pub fn observed_pmf<F: Face>(faces: &[F], rolls: &[F]) -> Array1<f64> {
    let counts = observed_counts(faces, rolls);
    if rolls.is_empty() {
        counts
    } else {
        counts / rolls.len() as f64
    }
}

/// The G statistic, `G = 2 Σ O_i ln(O_i / E_i)`, comparing observed counts
/// `O` with expected counts `E`. Faces never observed add nothing.
///
/// `f64::INFINITY` when a face was observed but can't happen (`E_i == 0`).
pub fn g_statistic(observed: ArrayView1<f64>, expected: ArrayView1<f64>) -> f64 {
    2.0 * Zip::from(observed)
        .and(expected)
        .fold(0.0, |sum, &o_i, &e_i| match (o_i > 0.0, e_i > 0.0) {
            (false, _) => sum,
            (true, true) => sum + o_i * (o_i / e_i).ln(),
            (true, false) => f64::INFINITY,
        })
}

/// `Pr[X >= x]` for `X ~ χ²(dof)`. `None` if `dof` isn't positive.
pub fn chisq_sf(dof: f64, x: f64) -> Option<f64> {
    ChiSquared::new(dof).ok().map(|distr| 1.0 - distr.cdf(x))
}

/////////////
// FitTest //
/////////////

/// A G-test of whether a sequence of rolls is plausible under a die's current
/// weights.
#[derive(Clone, Debug, PartialEq)]
pub struct FitTest {
    pub nrolls: usize,
    /// Degrees of freedom: the number of faces that can come up, minus one.
    pub dof: usize,
    pub g: f64,
    /// `Pr[G >= g | rolls drawn from the die]`
    pub pvalue: f64,
}

impl FitTest {
    /// `None` if `rolls` is empty or the die's weights are all zero.
    pub fn new<F: Face>(die: &Die<F>, rolls: &[F]) -> Option<Self> {
        if rolls.is_empty() {
            return None;
        }

        let nrolls = rolls.len();
        let expected = Array1::from_vec(die.distr().ok()?.pmf()) * nrolls as f64;
        let observed = observed_counts(die.faces(), rolls);

        let possible = expected.iter().filter(|&&e_i| e_i > 0.0).count();
        let dof = possible.saturating_sub(1);
        let g = g_statistic(observed.view(), expected.view());

        let pvalue = if g.is_infinite() {
            0.0
        } else {
            // with one possible face every roll matches it, so nothing is
            // surprising
            chisq_sf(dof as f64, g).unwrap_or(1.0)
        };

        log::debug!("FitTest: nrolls: {nrolls}, dof: {dof}, g: {g}, p-value: {pvalue}");

        Some(Self {
            nrolls,
            dof,
            g,
            pvalue,
        })
    }
}

/// Shorthand for [`FitTest::new`]'s p-value.
pub fn die_fit_pvalue<F: Face>(die: &Die<F>, rolls: &[F]) -> Option<f64> {
    FitTest::new(die, rolls).map(|test| test.pvalue)
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use claim::{assert_gt, assert_lt, assert_none};
    use ndarray::array;
    use rand::SeedableRng;
    use rand_xoshiro::Xoroshiro64Star;
    use tabular::{row, Table};

    #[test]
    fn test_observed() {
        let rolls = [1, 1, 3, 1, 9];
        assert_eq!(array![3.0, 0.0, 1.0, 0.0], observed_counts(&[1, 2, 3, 4], &rolls));
        assert_eq!(array![0.6, 0.0, 0.2, 0.0], observed_pmf(&[1, 2, 3, 4], &rolls));
        assert_eq!(array![0.0, 0.0], observed_pmf(&['a', 'b'], &[]));
    }

    #[test]
    fn test_g_statistic() {
        let expected = array![5.0, 5.0];

        assert_relative_eq!(0.0, g_statistic(expected.view(), expected.view()));

        // G = 2 * (8 ln(8/5) + 2 ln(2/5))
        //   = 2 * (3.7600... - 1.8325...)
        //   = 3.8549...
        let observed = array![8.0, 2.0];
        let g = 2.0 * (8.0 * (8.0_f64 / 5.0).ln() + 2.0 * (2.0_f64 / 5.0).ln());
        assert_relative_eq!(g, g_statistic(observed.view(), expected.view()));

        // an unobserved face adds nothing
        let observed = array![10.0, 0.0];
        let g = 2.0 * 10.0 * 2.0_f64.ln();
        assert_relative_eq!(g, g_statistic(observed.view(), expected.view()));

        // observing an impossible face
        let expected = array![10.0, 0.0];
        let observed = array![9.0, 1.0];
        assert!(g_statistic(observed.view(), expected.view()).is_infinite());
    }

    #[test]
    fn test_fit_test_degenerate_dice() {
        // one face that can come up
        let mut die = Die::new([1, 2]).unwrap();
        die.change_weight(&1, 0).unwrap();

        let test = FitTest::new(&die, &[2, 2, 2]).unwrap();
        assert_eq!(0, test.dof);
        assert_relative_eq!(1.0, test.pvalue);

        // rolls the die can't produce
        let test = FitTest::new(&die, &[2, 1, 2]).unwrap();
        assert_eq!(0.0, test.pvalue);

        assert_none!(FitTest::new(&Die::with_weight([1, 2], 0).unwrap(), &[1]));
    }

    #[test]
    fn test_die_fit_pvalue() {
        let mut rng = Xoroshiro64Star::seed_from_u64(0xd15c0);

        let mut biased = Die::new(1..=6).unwrap();
        biased.change_weight(&1, 3).unwrap();
        biased.change_weight(&2, 4).unwrap();
        biased.change_weight(&5, 2).unwrap();
        let fair = Die::new(1..=6).unwrap();

        assert_none!(die_fit_pvalue(&fair, &[]));

        for n in [1_000, 10_000] {
            let rolls = biased.roll(&mut rng, n).unwrap();

            let mut table = Table::new("{:>}  {:<}  {:<}").with_row(row!("face", "p", "p_hat"));
            let p_hat = observed_pmf(biased.faces(), &rolls);
            for (idx, (face, p)) in biased.probabilities().unwrap().into_iter().enumerate() {
                table.add_row(row!(face, p, p_hat[idx]));
            }
            println!("\nn = {n}\n{table}");

            let biased_test = FitTest::new(&biased, &rolls).unwrap();
            let pvalue_fair = die_fit_pvalue(&fair, &rolls).unwrap();
            println!("biased: {biased_test:?}, p-value fair = {pvalue_fair}");

            assert_eq!(n, biased_test.nrolls);
            assert_eq!(5, biased_test.dof);
            assert_gt!(biased_test.pvalue, 0.001);
            assert_lt!(pvalue_fair, 0.001);
        }
    }
}
