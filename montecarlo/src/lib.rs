//! # montecarlo
//!
//! A Monte Carlo simulator for weighted dice.
//!
//! ## Overview
//!
//! * A [`Die`] has a fixed set of distinct faces (numbers, strings, anything
//!   totally ordered) and a mutable weight per face. Rolling draws faces with
//!   probability proportional to their current weights.
//! * A [`Game`] rolls several shared dice together `n` times and keeps the
//!   resulting trial-by-die outcome table. Playing again replaces the table.
//! * An [`Analyzer`] derives statistics from a game's latest outcome table:
//!   jackpots (every die showing the same face), per-trial face counts, and
//!   counts of each distinct combination (order-independent) and permutation
//!   (order-sensitive) of faces.
//!
//! ```
//! use montecarlo::{Analyzer, Die, Game};
//! use rand::SeedableRng;
//! use rand_xoshiro::Xoshiro256PlusPlus;
//!
//! let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
//!
//! let mut die = Die::new([4, 5, 6]).unwrap();
//! die.change_weight(&4, "10").unwrap();
//!
//! let die = die.shared();
//! let game = Game::new([die.clone(), die.clone(), die]).unwrap();
//! game.play(&mut rng, 100).unwrap();
//!
//! let analyzer = Analyzer::new(&game);
//! assert!(analyzer.jackpot_count().unwrap() <= 100);
//! assert_eq!(100, analyzer.combo_count().unwrap().total());
//! ```

#[macro_use]
mod macros;

pub mod analyzer;
pub mod cli;
pub mod die;
pub mod error;
pub mod game;
pub mod parse;
pub mod stats;
pub mod weight;

pub use analyzer::{Analyzer, FaceCounts, GroupCounts};
pub use die::{Die, DieState, Face, SharedDie};
pub use error::{Error, ErrorKind, Result};
pub use game::{Game, Layout, OutcomeTable, Results};
pub use weight::IntoWeight;

pub(crate) const DEFAULT_TIMES: usize = 10;
pub(crate) const DEFAULT_NDICE: usize = 1;
pub(crate) const DEFAULT_LAYOUT: Layout = Layout::Wide;
