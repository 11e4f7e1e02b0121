use crate::{
    error::{Error, Result},
    weight::IntoWeight,
};
use approx::relative_eq;
use claim::debug_assert_ge;
use rand::{
    distributions::{Distribution, Open01},
    Rng,
};
use std::{cell::RefCell, collections::HashSet, fmt, hash::Hash, rc::Rc};
use tabular::{row, Table};

/// The default weight of every face on a freshly constructed die.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// The name of the single column in a [`DieState`] table.
pub const WEIGHT_COLUMN: &str = "weight";

/// A value that can appear on a die face. Faces need a total order and a hash
/// so the analyzer can group and sort outcomes.
pub trait Face: Clone + Ord + Hash + fmt::Debug + fmt::Display {}

impl<T> Face for T where T: Clone + Ord + Hash + fmt::Debug + fmt::Display {}

/// A die shared between its owner and any games that roll it. Weight changes
/// made through one handle are seen by every other handle.
///
/// Rolling borrows the die immutably, so a weight change can't overlap a roll;
/// don't hold a `borrow_mut()` across [`Game::play`](crate::game::Game::play).
pub type SharedDie<F> = Rc<RefCell<Die<F>>>;

///////////////
// FaceDistr //
///////////////

/// A die's face distribution, as a cumulative distribution function (CDF)
/// over face indices, for more efficient sampling.
#[derive(Clone, Debug)]
pub struct FaceDistr {
    cdf: Vec<f64>,
    total: f64,
}

impl FaceDistr {
    /// Weights are scaled by the largest one first, so the total lands in
    /// `[1, n]` no matter how large or tiny the raw weights are.
    pub fn from_weights(weights: &[f64]) -> Result<Self> {
        if let Some(&w) = weights.iter().find(|w| !w.is_finite()) {
            return Err(Error::InvalidWeight(w.to_string()));
        }

        let max = weights.iter().copied().fold(0.0, f64::max);
        if max <= 0.0 {
            return Err(Error::AllWeightsZero);
        }

        let cdf = weights
            .iter()
            .scan(0.0, |acc, &w| {
                *acc += w / max;
                Some(*acc)
            })
            .collect::<Vec<_>>();
        let total = cdf.last().copied().unwrap_or(0.0);
        debug_assert_ge!(total, 1.0);

        Ok(Self { cdf, total })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cdf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cdf.is_empty()
    }

    /// `Pr[X = idx]`
    #[inline]
    pub fn p_face(&self, idx: usize) -> f64 {
        let lo = if idx == 0 { 0.0 } else { self.cdf[idx - 1] };
        (self.cdf[idx] - lo) / self.total
    }

    pub fn pmf(&self) -> Vec<f64> {
        let pmf = (0..self.len()).map(|idx| self.p_face(idx)).collect::<Vec<_>>();
        debug_assert!(relative_eq!(1.0, pmf.iter().sum::<f64>(), epsilon = 1.0e-9));
        pmf
    }

    /// convert a standard sample r ∈ (0, 1) to a face index, according to
    /// this CDF.
    #[inline]
    fn sample_to_face(&self, r: f64) -> usize {
        // x ∈ (0, total], so a zero-weight face (cdf[i] == cdf[i - 1]) is
        // never the first entry with cdf >= x.
        let x = r * self.total;
        let idx = self.cdf.partition_point(|&c| c < x);
        idx.min(self.len() - 1)
    }
}

impl Distribution<usize> for FaceDistr {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        // sample r ∈ (0, 1)
        let r: f64 = Open01.sample(rng);
        self.sample_to_face(r)
    }
}

/////////
// Die //
/////////

/// A die with a fixed set of distinct faces and a mutable weight per face.
#[derive(Clone, PartialEq)]
pub struct Die<F> {
    faces: Vec<F>,
    weights: Vec<f64>,
}

impl<F: Face> Die<F> {
    /// A new die where every face has weight `1.0`.
    pub fn new(faces: impl IntoIterator<Item = F>) -> Result<Self> {
        Self::with_weight(faces, DEFAULT_WEIGHT)
    }

    /// A new die where every face has the same `weight`.
    pub fn with_weight(faces: impl IntoIterator<Item = F>, weight: impl IntoWeight) -> Result<Self> {
        let weight = weight.into_weight()?;
        let faces = faces.into_iter().collect::<Vec<_>>();

        if faces.is_empty() {
            return Err(Error::EmptyFaces);
        }

        let mut seen = HashSet::with_capacity(faces.len());
        if let Some(dup) = faces.iter().find(|&face| !seen.insert(face)) {
            return Err(Error::DuplicateFace(dup.to_string()));
        }

        let weights = vec![weight; faces.len()];
        Ok(Self { faces, weights })
    }

    /// Wrap this die in a handle that can be shared with one or more games.
    pub fn shared(self) -> SharedDie<F> {
        Rc::new(RefCell::new(self))
    }

    #[inline]
    pub fn faces(&self) -> &[F] {
        &self.faces
    }

    #[inline]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    #[inline]
    pub fn nfaces(&self) -> usize {
        self.faces.len()
    }

    pub fn weight(&self, face: &F) -> Option<f64> {
        self.face_idx(face).map(|idx| self.weights[idx])
    }

    fn face_idx(&self, face: &F) -> Option<usize> {
        self.faces.iter().position(|f| f == face)
    }

    /// Overwrite the weight of a single face. Nothing changes if either the
    /// face or the weight is rejected.
    pub fn change_weight(&mut self, face: &F, weight: impl IntoWeight) -> Result<()> {
        let idx = self
            .face_idx(face)
            .ok_or_else(|| Error::FaceNotFound(face.to_string()))?;
        let weight = weight.into_weight()?;

        log::trace!(
            "change_weight: face: {face}, weight: {} -> {weight}",
            self.weights[idx]
        );
        self.weights[idx] = weight;
        Ok(())
    }

    /// The face distribution implied by the current weights.
    pub fn distr(&self) -> Result<FaceDistr> {
        FaceDistr::from_weights(&self.weights)
    }

    /// The normalized probability of each face, in face order. `None` if
    /// every weight is zero.
    pub fn probabilities(&self) -> Option<Vec<(F, f64)>> {
        let distr = self.distr().ok()?;
        Some(self.faces.iter().cloned().zip(distr.pmf()).collect())
    }

    /// Roll the die `times` times. Each roll is an independent draw, with
    /// replacement, weighted by the current face weights.
    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R, times: usize) -> Result<Vec<F>> {
        if times == 0 {
            return Err(Error::invalid_count("roll", times));
        }

        let distr = self.distr()?;
        Ok((0..times)
            .map(|_| self.faces[distr.sample(rng)].clone())
            .collect())
    }

    /// A snapshot of the face/weight table. Later weight changes don't show
    /// up in an already taken snapshot.
    pub fn current_state(&self) -> DieState<F> {
        DieState(
            self.faces
                .iter()
                .cloned()
                .zip(self.weights.iter().copied())
                .collect(),
        )
    }
}

impl<F: fmt::Debug> fmt::Debug for Die<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.faces.iter().zip(self.weights.iter()))
            .finish()
    }
}

//////////////
// DieState //
//////////////

/// An owned copy of a die's face/weight table: one row per face with a single
/// [`WEIGHT_COLUMN`].
#[derive(Clone, Debug, PartialEq)]
pub struct DieState<F>(Vec<(F, f64)>);

impl<F: Face> DieState<F> {
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn column(&self) -> &'static str {
        WEIGHT_COLUMN
    }

    pub fn weight(&self, face: &F) -> Option<f64> {
        self.0.iter().find(|(f, _)| f == face).map(|&(_, w)| w)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&F, f64)> + '_ {
        self.0.iter().map(|(f, w)| (f, *w))
    }

    pub fn to_table(&self) -> Table {
        let mut table = Table::new("{:>}  {:>}").with_row(row!("face", WEIGHT_COLUMN));
        for (face, weight) in &self.0 {
            table.add_row(row!(face, weight));
        }
        table
    }
}

impl<F: Face> fmt::Display for DieState<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_table())
    }
}


///////////
// Tests //
///////////
