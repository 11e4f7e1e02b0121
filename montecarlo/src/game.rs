use crate::{
    die::{Face, SharedDie},
    error::{Error, Result},
};
use ndarray::{Array2, ArrayView1};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{cell::RefCell, fmt, rc::Rc, str::FromStr};
use tabular::{row, Row, Table};

pub const TRIAL_NUMBER: &str = "trial_number";
pub const DIE_NUMBER: &str = "die_number";
pub const FACE_COLUMN: &str = "face";

/// Build a table format spec with `ncols` right-aligned columns.
pub(crate) fn right_aligned_spec(ncols: usize) -> String {
    vec!["{:>}"; ncols].join("  ")
}

pub(crate) fn row_from_cells(cells: impl IntoIterator<Item = String>) -> Row {
    let mut row = Row::new();
    for cell in cells {
        row.add_cell(cell);
    }
    row
}

////////////
// Layout //
////////////

/// How [`Game::show_results`] lays out the outcome table.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layout {
    /// One row per trial, one column per die.
    #[default]
    Wide,
    /// One row per (trial, die) pair, with a single face column.
    Narrow,
}

impl Layout {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wide => "wide",
            Self::Narrow => "narrow",
        }
    }
}

impl FromStr for Layout {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "wide" => Ok(Self::Wide),
            "narrow" => Ok(Self::Narrow),
            _ => Err(Error::UnknownLayout(s.to_owned())),
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//////////////////
// OutcomeTable //
//////////////////

/// The faces rolled in a played game: `ntrials` rows by `ndice` columns.
///
/// Trial numbers are 1-based, die numbers are 0-based and follow the order the
/// dice were given to the game.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutcomeTable<F> {
    rolls: Array2<F>,
}

impl<F: Face> OutcomeTable<F> {
    /// Build a table from each die's sequence of rolls. Every column must have
    /// the same number of rolls.
    fn from_columns(columns: Vec<Vec<F>>) -> Self {
        let ndice = columns.len();
        let ntrials = columns.first().map(Vec::len).unwrap_or(0);
        debug_assert!(columns.iter().all(|col| col.len() == ntrials));

        let rolls = Array2::from_shape_fn((ntrials, ndice), |(trial, die)| {
            columns[die][trial].clone()
        });
        Self { rolls }
    }

    #[cfg(test)]
    pub(crate) fn from_rows(rows: Vec<Vec<F>>) -> Self {
        let ntrials = rows.len();
        let ndice = rows.first().map(Vec::len).unwrap_or(0);
        let rolls = Array2::from_shape_fn((ntrials, ndice), |(trial, die)| {
            rows[trial][die].clone()
        });
        Self { rolls }
    }

    #[inline]
    pub fn ntrials(&self) -> usize {
        self.rolls.nrows()
    }

    #[inline]
    pub fn ndice(&self) -> usize {
        self.rolls.ncols()
    }

    /// The face `die_number` rolled on trial `trial_number`.
    pub fn get(&self, trial_number: usize, die_number: usize) -> Option<&F> {
        let trial = trial_number.checked_sub(1)?;
        self.rolls.get((trial, die_number))
    }

    /// All faces rolled on trial `trial_number`, in die order.
    pub fn trial(&self, trial_number: usize) -> Option<ArrayView1<'_, F>> {
        let trial = trial_number.checked_sub(1)?;
        (trial < self.ntrials()).then(|| self.rolls.row(trial))
    }

    /// Iterate over `(trial_number, faces)` in trial order.
    pub fn trials(&self) -> impl Iterator<Item = (usize, ArrayView1<'_, F>)> + '_ {
        self.rolls
            .rows()
            .into_iter()
            .enumerate()
            .map(|(trial, row)| (trial + 1, row))
    }

    /// Every rolled face, trial by trial.
    pub fn faces(&self) -> impl Iterator<Item = &F> + '_ {
        self.rolls.iter()
    }

    /// The table reshaped to one row per (trial, die) pair, ordered by trial
    /// and then by die.
    pub fn narrow(&self) -> NarrowTable<F> {
        let rows = self
            .trials()
            .flat_map(|(trial_number, faces)| {
                faces
                    .into_iter()
                    .enumerate()
                    .map(move |(die_number, face)| NarrowRow {
                        trial_number,
                        die_number,
                        face: face.clone(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        NarrowTable(rows)
    }

    pub fn to_table(&self) -> Table {
        let spec = right_aligned_spec(self.ndice() + 1);
        let heading = std::iter::once(TRIAL_NUMBER.to_owned())
            .chain((0..self.ndice()).map(|die_number| die_number.to_string()));
        let mut table = Table::new(&spec).with_row(row_from_cells(heading));

        for (trial_number, faces) in self.trials() {
            let cells = std::iter::once(trial_number.to_string())
                .chain(faces.iter().map(|face| face.to_string()));
            table.add_row(row_from_cells(cells));
        }
        table
    }
}

impl<F: Face> fmt::Display for OutcomeTable<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_table())
    }
}

/////////////////
// NarrowTable //
/////////////////

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NarrowRow<F> {
    pub trial_number: usize,
    pub die_number: usize,
    pub face: F,
}

/// The narrow projection of an [`OutcomeTable`], keyed by
/// `(trial_number, die_number)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NarrowTable<F>(Vec<NarrowRow<F>>);

impl<F: Face> NarrowTable<F> {
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn rows(&self) -> &[NarrowRow<F>] {
        &self.0
    }

    pub fn get(&self, trial_number: usize, die_number: usize) -> Option<&F> {
        self.0
            .iter()
            .find(|row| row.trial_number == trial_number && row.die_number == die_number)
            .map(|row| &row.face)
    }

    pub fn to_table(&self) -> Table {
        let mut table =
            Table::new("{:>}  {:>}  {:>}").with_row(row!(TRIAL_NUMBER, DIE_NUMBER, FACE_COLUMN));
        for row in &self.0 {
            table.add_row(row!(row.trial_number, row.die_number, &row.face));
        }
        table
    }
}

impl<F: Face> fmt::Display for NarrowTable<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_table())
    }
}

/////////////
// Results //
/////////////

/// The outcome table in the layout requested from [`Game::show_results`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Results<F> {
    Wide(Rc<OutcomeTable<F>>),
    Narrow(NarrowTable<F>),
}

impl<F: Face> Results<F> {
    pub fn layout(&self) -> Layout {
        match self {
            Self::Wide(_) => Layout::Wide,
            Self::Narrow(_) => Layout::Narrow,
        }
    }

    /// The number of rows in this layout.
    pub fn nrows(&self) -> usize {
        match self {
            Self::Wide(table) => table.ntrials(),
            Self::Narrow(table) => table.len(),
        }
    }
}

impl<F: Face> fmt::Display for Results<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wide(table) => write!(f, "{}", table),
            Self::Narrow(table) => write!(f, "{}", table),
        }
    }
}

//////////
// Game //
//////////

/// Rolls a set of dice together, many times over.
///
/// The dice are shared handles, so changing a die's weights after the game is
/// built affects every later [`play`](Self::play). The game doesn't check that
/// its dice have the same faces.
pub struct Game<F> {
    dice: Vec<SharedDie<F>>,
    outcomes: RefCell<Option<Rc<OutcomeTable<F>>>>,
}

impl<F: Face> Game<F> {
    pub fn new(dice: impl IntoIterator<Item = SharedDie<F>>) -> Result<Self> {
        let dice = dice.into_iter().collect::<Vec<_>>();
        if dice.is_empty() {
            return Err(Error::EmptyGame);
        }
        Ok(Self {
            dice,
            outcomes: RefCell::new(None),
        })
    }

    #[cfg(test)]
    pub(crate) fn with_outcomes(dice: Vec<SharedDie<F>>, outcomes: OutcomeTable<F>) -> Self {
        Self {
            dice,
            outcomes: RefCell::new(Some(Rc::new(outcomes))),
        }
    }

    #[inline]
    pub fn ndice(&self) -> usize {
        self.dice.len()
    }

    pub fn die(&self, die_number: usize) -> Option<&SharedDie<F>> {
        self.dice.get(die_number)
    }

    /// Roll every die `times` times. Trial `i` holds each die's `i`-th roll.
    ///
    /// The new outcome table replaces the previous one only once every die has
    /// rolled; if any die fails to roll, the previous table stays in place.
    pub fn play<R: Rng + ?Sized>(&self, rng: &mut R, times: usize) -> Result<()> {
        if times == 0 {
            return Err(Error::invalid_count("play", times));
        }

        let columns = self
            .dice
            .iter()
            .map(|die| die.borrow().roll(rng, times))
            .collect::<Result<Vec<_>>>()?;

        let table = OutcomeTable::from_columns(columns);
        log::debug!(
            "play: ntrials: {}, ndice: {}",
            table.ntrials(),
            table.ndice()
        );

        self.outcomes.replace(Some(Rc::new(table)));
        Ok(())
    }

    /// `true` once [`play`](Self::play) has succeeded at least once.
    pub fn is_played(&self) -> bool {
        self.outcomes.borrow().is_some()
    }

    /// The number of trials in the latest play.
    pub fn ntrials(&self) -> Option<usize> {
        self.outcomes.borrow().as_ref().map(|table| table.ntrials())
    }

    /// The outcome table of the latest play. The returned table is unaffected
    /// by later plays.
    pub fn outcomes(&self) -> Result<Rc<OutcomeTable<F>>> {
        self.outcomes.borrow().as_ref().cloned().ok_or(Error::NotPlayed)
    }

    pub fn show_results(&self, layout: Layout) -> Result<Results<F>> {
        let outcomes = self.outcomes()?;
        Ok(match layout {
            Layout::Wide => Results::Wide(outcomes),
            Layout::Narrow => Results::Narrow(outcomes.narrow()),
        })
    }
}

impl<F: Face> fmt::Debug for Game<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Game")
            .field("ndice", &self.ndice())
            .field("ntrials", &self.ntrials())
            .finish()
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        die::{prop::arb_rng, Die},
        error::ErrorKind,
    };
    use claim::{assert_err, assert_ok, assert_some_eq};
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoroshiro64Star;

    fn niters(n: u32) -> ProptestConfig {
        ProptestConfig::with_cases(n)
    }

    fn d6_game(ndice: usize) -> Game<u8> {
        Game::new((0..ndice).map(|_| Die::new(1..=6).unwrap().shared())).unwrap()
    }

    #[test]
    fn test_layout_from_str() {
        assert_eq!(Layout::Wide, "wide".parse::<Layout>().unwrap());
        assert_eq!(Layout::Narrow, "narrow".parse::<Layout>().unwrap());

        let err = "tall".parse::<Layout>().unwrap_err();
        assert_eq!(Error::UnknownLayout("tall".to_owned()), err);
        assert_eq!(ErrorKind::Validation, err.kind());
        assert_err!("Wide".parse::<Layout>());
    }

    #[test]
    fn test_game_new_empty() {
        assert_eq!(Error::EmptyGame, Game::<u8>::new([]).unwrap_err());
    }

    #[test]
    fn test_unplayed_game() {
        let game = d6_game(2);
        assert!(!game.is_played());
        assert_eq!(None, game.ntrials());
        assert_eq!(Error::NotPlayed, game.outcomes().unwrap_err());
        assert_eq!(
            ErrorKind::State,
            game.show_results(Layout::Wide).unwrap_err().kind()
        );
    }

    #[test]
    fn test_play_zero_times() {
        let mut rng = Xoroshiro64Star::seed_from_u64(0xd15c0);
        let game = d6_game(2);
        assert_eq!(
            Error::invalid_count("play", 0),
            game.play(&mut rng, 0).unwrap_err()
        );
        assert!(!game.is_played());
    }

    #[test]
    fn test_play_shape() {
        let mut rng = Xoroshiro64Star::seed_from_u64(0xd15c0);
        let game = d6_game(3);
        game.play(&mut rng, 10).unwrap();

        let table = game.outcomes().unwrap();
        assert_eq!(10, table.ntrials());
        assert_eq!(3, table.ndice());
        assert!(table.faces().all(|face| (1..=6).contains(face)));

        assert!(table.get(0, 0).is_none());
        assert!(table.get(1, 0).is_some());
        assert!(table.get(10, 2).is_some());
        assert!(table.get(11, 0).is_none());
        assert!(table.get(1, 3).is_none());
        assert!(table.trial(0).is_none());
        assert_eq!(3, table.trial(10).unwrap().len());
    }

    #[test]
    fn test_play_rows_follow_die_order() {
        let mut rng = Xoroshiro64Star::seed_from_u64(0xd15c0);
        let game = Game::new([
            Die::new(['a']).unwrap().shared(),
            Die::new(['b']).unwrap().shared(),
            Die::new(['c']).unwrap().shared(),
        ])
        .unwrap();
        game.play(&mut rng, 4).unwrap();

        let table = game.outcomes().unwrap();
        for (trial_number, faces) in table.trials() {
            assert!((1..=4).contains(&trial_number));
            assert_eq!(vec!['a', 'b', 'c'], faces.to_vec());
        }
    }

    #[test]
    fn test_replay_replaces_outcomes() {
        let mut rng = Xoroshiro64Star::seed_from_u64(0xd15c0);
        let game = d6_game(2);

        game.play(&mut rng, 5).unwrap();
        let first = game.outcomes().unwrap();

        game.play(&mut rng, 8).unwrap();
        assert_some_eq!(game.ntrials(), 8);

        // an earlier snapshot isn't touched by a later play
        assert_eq!(5, first.ntrials());
    }

    #[test]
    fn test_play_sees_shared_weight_changes() {
        let mut rng = Xoroshiro64Star::seed_from_u64(0xd15c0);
        let die = Die::new([1, 2, 3]).unwrap().shared();
        let game = Game::new([Rc::clone(&die), Rc::clone(&die)]).unwrap();

        die.borrow_mut().change_weight(&1, 0).unwrap();
        die.borrow_mut().change_weight(&2, 0).unwrap();
        game.play(&mut rng, 20).unwrap();

        assert!(game.outcomes().unwrap().faces().all(|&face| face == 3));
    }

    #[test]
    fn test_failed_play_keeps_previous_outcomes() {
        let mut rng = Xoroshiro64Star::seed_from_u64(0xd15c0);
        let die1 = Die::new([1, 2]).unwrap().shared();
        let die2 = Die::new([1, 2]).unwrap().shared();
        let game = Game::new([Rc::clone(&die1), Rc::clone(&die2)]).unwrap();

        game.play(&mut rng, 6).unwrap();
        let before = game.outcomes().unwrap();

        die2.borrow_mut().change_weight(&1, 0).unwrap();
        die2.borrow_mut().change_weight(&2, 0).unwrap();
        assert_eq!(Error::AllWeightsZero, game.play(&mut rng, 3).unwrap_err());

        assert_eq!(before, game.outcomes().unwrap());
    }

    #[test]
    fn test_show_results_narrow_order() {
        let game = Game::with_outcomes(
            vec![Die::new([1, 2]).unwrap().shared(); 2],
            OutcomeTable::from_rows(vec![vec![1, 2], vec![2, 2], vec![1, 1]]),
        );

        let results = game.show_results(Layout::Narrow).unwrap();
        assert_eq!(Layout::Narrow, results.layout());
        assert_eq!(6, results.nrows());

        let narrow = match results {
            Results::Narrow(narrow) => narrow,
            Results::Wide(_) => panic!("expected a narrow table"),
        };
        let keys = narrow
            .rows()
            .iter()
            .map(|row| (row.trial_number, row.die_number, row.face))
            .collect::<Vec<_>>();
        assert_eq!(
            vec![
                (1, 0, 1),
                (1, 1, 2),
                (2, 0, 2),
                (2, 1, 2),
                (3, 0, 1),
                (3, 1, 1)
            ],
            keys
        );
        assert_some_eq!(narrow.get(2, 0), &2);
    }

    #[test]
    fn test_show_results_display() {
        let game = Game::with_outcomes(
            vec![Die::new([1, 2]).unwrap().shared(); 2],
            OutcomeTable::from_rows(vec![vec![1, 2], vec![2, 2]]),
        );

        let wide = game.show_results(Layout::Wide).unwrap().to_string();
        assert!(wide.contains(TRIAL_NUMBER));
        assert_eq!(3, wide.lines().count());

        let narrow = game.show_results(Layout::Narrow).unwrap().to_string();
        assert!(narrow.contains(DIE_NUMBER));
        assert!(narrow.contains(FACE_COLUMN));
        assert_eq!(5, narrow.lines().count());
    }

    #[test]
    fn test_prop_play_shape() {
        proptest!(niters(100), |(ndice in 1_usize..6, times in 1_usize..100, mut rng in arb_rng())| {
            let game = d6_game(ndice);
            assert_ok!(game.play(&mut rng, times));

            let wide = game.show_results(Layout::Wide).unwrap();
            prop_assert_eq!(times, wide.nrows());
            prop_assert_eq!(ndice, game.outcomes().unwrap().ndice());

            let narrow = game.show_results(Layout::Narrow).unwrap();
            prop_assert_eq!(times * ndice, narrow.nrows());
        });
    }
}
