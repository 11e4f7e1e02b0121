use crate::{
    die::Face,
    error::Result,
    game::{right_aligned_spec, row_from_cells, Game, OutcomeTable, TRIAL_NUMBER},
};
use itertools::Itertools;
use ndarray::{Array2, ArrayView1};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    rc::Rc,
};
use tabular::{row, Table};

pub const COMBO_COUNTS: &str = "combo_counts";
pub const PERM_COUNTS: &str = "perm_counts";

/// A trial is a jackpot when every die rolled the same face.
#[inline]
fn is_jackpot<F: Face>(faces: ArrayView1<'_, F>) -> bool {
    !faces.is_empty() && faces.iter().all_equal()
}

/// Group key for combinations: the trial's faces in sorted order, so
/// `(4, 5, 6)` and `(6, 4, 5)` collapse into the same multiset.
fn combo_key<F: Face>(faces: ArrayView1<'_, F>) -> Vec<F> {
    faces.iter().cloned().sorted().collect()
}

/// Group key for permutations: the trial's faces in die order.
fn perm_key<F: Face>(faces: ArrayView1<'_, F>) -> Vec<F> {
    faces.to_vec()
}

//////////////
// Analyzer //
//////////////

/// Statistics over a game's current outcome table.
///
/// Nothing is cached: every query reads the game's latest play, so replaying
/// the game is immediately reflected in the next query. Every query fails with
/// [`Error::NotPlayed`](crate::error::Error::NotPlayed) before the first play.
#[derive(Clone)]
pub struct Analyzer<'a, F> {
    game: &'a Game<F>,
}

impl<'a, F: Face> Analyzer<'a, F> {
    pub fn new(game: &'a Game<F>) -> Self {
        Self { game }
    }

    pub fn game(&self) -> &'a Game<F> {
        self.game
    }

    #[inline]
    fn outcomes(&self) -> Result<Rc<OutcomeTable<F>>> {
        self.game.outcomes()
    }

    /// The number of trials where every die rolled the same face.
    pub fn jackpot_count(&self) -> Result<usize> {
        Ok(self.jackpots()?.len())
    }

    /// The trial numbers of every jackpot, in trial order.
    pub fn jackpots(&self) -> Result<Vec<usize>> {
        let outcomes = self.outcomes()?;
        Ok(outcomes
            .trials()
            .filter(|(_, faces)| is_jackpot(faces.view()))
            .map(|(trial_number, _)| trial_number)
            .collect())
    }

    /// For each trial, how many times each face came up. The columns are every
    /// face seen anywhere in the table, in sorted order.
    pub fn face_counts_per_trial(&self) -> Result<FaceCounts<F>> {
        let outcomes = self.outcomes()?;

        let faces = outcomes.faces().cloned().collect::<BTreeSet<_>>();
        let columns = faces
            .iter()
            .enumerate()
            .map(|(col, face)| (face, col))
            .collect::<BTreeMap<_, _>>();

        let mut counts = Array2::<usize>::zeros((outcomes.ntrials(), faces.len()));
        for (trial_number, row) in outcomes.trials() {
            for face in row {
                counts[[trial_number - 1, columns[face]]] += 1;
            }
        }

        Ok(FaceCounts {
            faces: faces.into_iter().collect(),
            counts,
        })
    }

    /// The share of all rolls, across every trial and die, that came up as
    /// each face.
    pub fn face_frequencies(&self) -> Result<Vec<(F, f64)>> {
        let outcomes = self.outcomes()?;
        let nrolls = (outcomes.ntrials() * outcomes.ndice()) as f64;

        let counts = outcomes
            .faces()
            .fold(BTreeMap::<&F, usize>::new(), |mut counts, face| {
                *counts.entry(face).or_insert(0) += 1;
                counts
            });

        Ok(counts
            .into_iter()
            .map(|(face, count)| (face.clone(), (count as f64) / nrolls))
            .collect())
    }

    /// The number of trials producing each distinct multiset of faces.
    pub fn combo_count(&self) -> Result<GroupCounts<F>> {
        self.group_count(COMBO_COUNTS, combo_key)
    }

    /// The number of trials producing each distinct ordered sequence of faces.
    pub fn perm_count(&self) -> Result<GroupCounts<F>> {
        self.group_count(PERM_COUNTS, perm_key)
    }

    fn group_count(
        &self,
        column: &'static str,
        key: impl Fn(ArrayView1<'_, F>) -> Vec<F>,
    ) -> Result<GroupCounts<F>> {
        let outcomes = self.outcomes()?;

        let counts = outcomes
            .trials()
            .map(|(_, faces)| key(faces))
            .fold(BTreeMap::new(), |mut counts, group| {
                *counts.entry(group).or_insert(0) += 1;
                counts
            });

        Ok(GroupCounts { column, counts })
    }
}

impl<F: Face> fmt::Debug for Analyzer<'_, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analyzer").field("game", self.game).finish()
    }
}

////////////////
// FaceCounts //
////////////////

/// Per-trial face counts: one row per trial number and one column per
/// observed face.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FaceCounts<F> {
    faces: Vec<F>,
    counts: Array2<usize>,
}

impl<F: Face> FaceCounts<F> {
    /// The column labels, in sorted order.
    pub fn faces(&self) -> &[F] {
        &self.faces
    }

    #[inline]
    pub fn ntrials(&self) -> usize {
        self.counts.nrows()
    }

    /// How many times `face` came up on trial `trial_number`. `None` if the
    /// trial doesn't exist or the face was never rolled in any trial.
    pub fn count(&self, trial_number: usize, face: &F) -> Option<usize> {
        let trial = trial_number.checked_sub(1)?;
        let col = self.faces.binary_search(face).ok()?;
        self.counts.get((trial, col)).copied()
    }

    /// All face counts for trial `trial_number`, in column order.
    pub fn trial(&self, trial_number: usize) -> Option<ArrayView1<'_, usize>> {
        let trial = trial_number.checked_sub(1)?;
        (trial < self.ntrials()).then(|| self.counts.row(trial))
    }

    pub fn to_table(&self) -> Table {
        let spec = right_aligned_spec(self.faces.len() + 1);
        let heading = std::iter::once(TRIAL_NUMBER.to_owned())
            .chain(self.faces.iter().map(|face| face.to_string()));
        let mut table = Table::new(&spec).with_row(row_from_cells(heading));

        for (trial, counts) in self.counts.rows().into_iter().enumerate() {
            let cells = std::iter::once((trial + 1).to_string())
                .chain(counts.iter().map(|count| count.to_string()));
            table.add_row(row_from_cells(cells));
        }
        table
    }
}

impl<F: Face> fmt::Display for FaceCounts<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_table())
    }
}

/////////////////
// GroupCounts //
/////////////////

/// Trial counts keyed by an outcome tuple, with a single named data column
/// ([`COMBO_COUNTS`] or [`PERM_COUNTS`]).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupCounts<F> {
    column: &'static str,
    counts: BTreeMap<Vec<F>, usize>,
}

impl<F: Face> GroupCounts<F> {
    pub fn column(&self) -> &'static str {
        self.column
    }

    /// The number of distinct groups.
    #[inline]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// The number of trials in the group `faces`; zero for unseen groups.
    pub fn get(&self, faces: &[F]) -> usize {
        self.counts.get(faces).copied().unwrap_or(0)
    }

    /// The total number of trials over all groups.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Iterate over `(faces, count)` in ascending `faces` order.
    pub fn iter(&self) -> impl Iterator<Item = (&[F], usize)> + '_ {
        self.counts
            .iter()
            .map(|(faces, &count)| (faces.as_slice(), count))
    }

    pub fn to_table(&self) -> Table {
        let mut table = Table::new("{:<}  {:>}").with_row(row!("outcome", self.column));
        for (faces, count) in self.iter() {
            table.add_row(row!(format!("({})", faces.iter().join(", ")), count));
        }
        table
    }
}

impl<F: Face> fmt::Display for GroupCounts<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_table())
    }
}

///////////
// Tests //
///////////
