use crate::{
    analyzer::Analyzer,
    die::Die,
    game::{Game, Layout, Results},
    parse::{self, DieSpec},
    stats, DEFAULT_LAYOUT, DEFAULT_NDICE, DEFAULT_TIMES,
};
use bytesize::ByteSize;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use tabular::{row, Table};
// `std::time::Instant` doesn't work in wasm/web; this crate falls back to
// `performance.now()` there.
use trice::Instant;

///////////////////////////
// String parser helpers //
///////////////////////////

fn parse_req<T>(label: &'static str, s: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    T::from_str(s).map_err(|err| format!("invalid {label}: {err}"))
}

fn parse_opt<T>(label: &'static str, opt_s: Option<&str>) -> Result<Option<T>, String>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    opt_s
        .map(T::from_str)
        .transpose()
        .map_err(|err| format!("invalid {label}: {err}"))
}

fn parse_count(label: &'static str, opt_s: Option<&str>, default: usize) -> Result<usize, String> {
    let count = parse_opt::<usize>(label, opt_s)?.unwrap_or(default);
    if count == 0 {
        return Err(format!("{label} must be a positive integer, got: 0"));
    }
    Ok(count)
}

/// A reproducible RNG when `seed` is given, otherwise one seeded from OS
/// entropy.
fn rng(seed: Option<u64>) -> Xoshiro256PlusPlus {
    match seed {
        Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
        None => Xoshiro256PlusPlus::from_entropy(),
    }
}

//////////////////////
// CLI Args Wrapper //
//////////////////////

pub struct Args(pico_args::Arguments);

impl Args {
    pub fn new(inner: pico_args::Arguments) -> Self {
        Self(inner)
    }

    fn subcommand(&mut self) -> Result<Option<String>, String> {
        self.0.subcommand().map_err(|err| err.to_string())
    }

    fn opt_value(&mut self, keys: impl Into<pico_args::Keys>) -> Result<Option<String>, String> {
        self.0
            .opt_value_from_fn(keys, |s| Result::<_, pico_args::Error>::Ok(s.to_owned()))
            .map_err(|err| err.to_string())
    }

    fn values(&mut self, keys: impl Into<pico_args::Keys>) -> Result<Vec<String>, String> {
        self.0
            .values_from_fn(keys, |s| Result::<_, pico_args::Error>::Ok(s.to_owned()))
            .map_err(|err| err.to_string())
    }

    fn expect_finished(self) -> Result<(), String> {
        let remaining = self.0.finish();
        if !remaining.is_empty() {
            Err(format!("unexpected arguments left: '{:?}'", remaining))
        } else {
            Ok(())
        }
    }

    fn maybe_help(&mut self, usage: &str) {
        if self.0.contains(["-h", "--help"]) {
            print!("{}", usage);
            std::process::exit(0);
        }
    }
}

/////////////
// Metrics //
/////////////

#[derive(Clone, Default, PartialEq, Eq)]
pub struct Metrics(pub Vec<(String, String)>);

impl Metrics {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, label: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.0.push((label.into(), value.into()));
        self
    }

    pub fn to_table(&self) -> Table {
        let mut table = Table::new("{:>}  {:<}");

        for (label, value) in &self.0 {
            table.add_row(row!(label, value));
        }

        table
    }
}

///////////////////
// Command trait //
///////////////////

pub trait Command: Sized {
    const USAGE: &'static str;

    type Output: fmt::Display;

    fn try_from_cli_args(args: Args) -> Result<Self, String>;
    fn run(self) -> Result<Self::Output, String>;
}

//////////////
// DiceArgs //
//////////////

/// The dice and rolling options shared by every command.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiceArgs {
    dice: Vec<DieSpec>,
    ndice: usize,
    times: usize,
    seed: Option<u64>,
}

impl DiceArgs {
    pub fn try_from_str_args(
        dice: &[String],
        ndice: Option<&str>,
        times: Option<&str>,
        seed: Option<&str>,
    ) -> Result<Self, String> {
        let dice = dice
            .iter()
            .map(|s| parse_req::<DieSpec>("die", s))
            .collect::<Result<Vec<_>, _>>()?;
        let dice = if dice.is_empty() {
            vec![DieSpec::standard(6)]
        } else {
            dice
        };

        let ndice = match parse_opt::<usize>("number of dice", ndice)? {
            Some(0) => return Err("number of dice must be a positive integer, got: 0".to_string()),
            Some(ndice) if dice.len() > 1 && ndice != dice.len() => {
                return Err(format!(
                    "--ndice ({}) conflicts with the number of --die options given ({})",
                    ndice,
                    dice.len()
                ))
            }
            Some(ndice) => ndice,
            None => dice.len().max(DEFAULT_NDICE),
        };

        Ok(Self {
            dice,
            ndice,
            times: parse_count("times", times, DEFAULT_TIMES)?,
            seed: parse_opt("seed", seed)?,
        })
    }

    fn from_cli_args(args: &mut Args) -> Result<Self, String> {
        let dice = args.values(["-d", "--die"])?;
        let ndice = args.opt_value(["-n", "--ndice"])?;
        let times = args.opt_value(["-t", "--times"])?;
        let seed = args.opt_value(["-s", "--seed"])?;

        Self::try_from_str_args(&dice, ndice.as_deref(), times.as_deref(), seed.as_deref())
    }

    /// A single `--die` is repeated `ndice` times, as independent dice.
    fn die_specs(&self) -> impl Iterator<Item = &DieSpec> + '_ {
        self.dice.iter().cycle().take(self.ndice)
    }

    fn build_game(&self) -> Result<Game<parse::Face>, String> {
        let dice = self
            .die_specs()
            .map(|spec| spec.to_shared_die())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| err.to_string())?;
        Game::new(dice).map_err(|err| err.to_string())
    }
}

const DICE_OPTIONS: &str = "\
    · --die / -d [face[:weight],..] (default: d6)
      A die, given as its faces with optional weights, or `dn` for the
      faces 1..=n. May be repeated, once per die.
      For example, a die with faces 4, 5, 6 where 4 is ten times as likely
      would be formatted as `-d [4:10,5,6]`

    · --ndice / -n count (default: number of --die options)
      With a single --die, roll that many copies of it.

    · --times / -t count (default: 10)
      The number of rolls, or trials.

    · --seed / -s seed (default: random)
      Seed the random number generator for reproducible results.
";

/////////////////
// RollCommand //
/////////////////

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RollCommand {
    die: DieSpec,
    times: usize,
    seed: Option<u64>,
}

impl Command for RollCommand {
    const USAGE: &'static str = "\
montecarlo roll - roll a single weighted die and compare the observed face
frequencies with its weights

USAGE:
    montecarlo roll [option ...]

EXAMPLES:
    montecarlo roll -d [4:10,5,6] -t 1000
    montecarlo roll -d [H,T] -t 20 -s 42

OPTIONS:
    · --die / -d [face[:weight],..] (default: d6)
      The die to roll.

    · --times / -t count (default: 10)
      The number of rolls.

    · --seed / -s seed (default: random)
      Seed the random number generator for reproducible results.
";

    type Output = RollCommandOutput;

    fn try_from_cli_args(mut args: Args) -> Result<Self, String> {
        args.maybe_help(Self::USAGE);

        let die = args.opt_value(["-d", "--die"])?;
        let times = args.opt_value(["-t", "--times"])?;
        let seed = args.opt_value(["-s", "--seed"])?;
        args.expect_finished()?;

        Ok(Self {
            die: parse_opt("die", die.as_deref())?.unwrap_or_else(|| DieSpec::standard(6)),
            times: parse_count("times", times.as_deref(), DEFAULT_TIMES)?,
            seed: parse_opt("seed", seed.as_deref())?,
        })
    }

    fn run(self) -> Result<Self::Output, String> {
        let die = self.die.to_die().map_err(|err| err.to_string())?;
        let mut rng = rng(self.seed);

        let start_time = Instant::now();
        let rolls = die
            .roll(&mut rng, self.times)
            .map_err(|err| err.to_string())?;
        let roll_duration = start_time.elapsed();

        let mut metrics = Metrics::new();
        metrics.push("rolls", self.times.to_string());
        metrics.push("roll duration", format!("{:.2?}", roll_duration));
        if let Some(fit) = stats::FitTest::new(&die, &rolls) {
            metrics.push("G statistic", format!("{:0.4} (dof {})", fit.g, fit.dof));
            metrics.push("goodness of fit p-value", format!("{:0.4}", fit.pvalue));
        }

        Ok(RollCommandOutput {
            die,
            rolls,
            metrics,
        })
    }
}

pub struct RollCommandOutput {
    pub die: Die<parse::Face>,
    pub rolls: Vec<parse::Face>,
    pub metrics: Metrics,
}

impl RollCommandOutput {
    fn to_table(&self) -> Table {
        let mut table =
            Table::new("{:>}  {:>}  {:>}  {:>}").with_row(row!("face", "weight", "p", "p_hat"));

        let p_hat = stats::observed_pmf(self.die.faces(), &self.rolls);
        let probabilities = self.die.probabilities().unwrap_or_default();
        for (idx, (face, weight)) in self.die.current_state().iter().enumerate() {
            let p = probabilities.get(idx).map(|&(_, p)| p).unwrap_or(0.0);
            table.add_row(row!(
                face,
                weight,
                format!("{:0.4}", p),
                format!("{:0.4}", p_hat[idx])
            ));
        }
        table
    }
}

impl fmt::Display for RollCommandOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\n{}\n{}", self.to_table(), self.metrics.to_table())
    }
}

/////////////////
// PlayCommand //
/////////////////

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayCommand {
    dice: DiceArgs,
    layout: Layout,
}

impl Command for PlayCommand {
    const USAGE: &'static str = "\
montecarlo play - roll a set of dice together and show every trial

USAGE:
    montecarlo play [option ...]

EXAMPLES:
    montecarlo play -d d6 -n 3 -t 5
    montecarlo play -d [1,2] -d [1:3,2] -t 4 -l narrow

OPTIONS:
    · --layout / -l wide|narrow (default: wide)
      `wide` shows one row per trial and one column per die, `narrow` shows
      one row per (trial, die) pair.

";

    type Output = PlayCommandOutput;

    fn try_from_cli_args(mut args: Args) -> Result<Self, String> {
        if args.0.contains(["-h", "--help"]) {
            print!("{}{}", Self::USAGE, DICE_OPTIONS);
            std::process::exit(0);
        }

        let layout = args.opt_value(["-l", "--layout"])?;
        let dice = DiceArgs::from_cli_args(&mut args)?;
        args.expect_finished()?;

        Ok(Self {
            dice,
            layout: parse_opt("layout", layout.as_deref())?.unwrap_or(DEFAULT_LAYOUT),
        })
    }

    fn run(self) -> Result<Self::Output, String> {
        let game = self.dice.build_game()?;
        let mut rng = rng(self.dice.seed);

        let start_time = Instant::now();
        game.play(&mut rng, self.dice.times)
            .map_err(|err| err.to_string())?;
        let play_duration = start_time.elapsed();

        let results = game
            .show_results(self.layout)
            .map_err(|err| err.to_string())?;

        let ncells = self.dice.times * game.ndice();
        let table_size = ncells * std::mem::size_of::<parse::Face>();

        let mut metrics = Metrics::new();
        metrics.push("trials", self.dice.times.to_string());
        metrics.push("dice", game.ndice().to_string());
        metrics.push("play duration", format!("{:.2?}", play_duration));
        metrics.push(
            "outcome table size",
            ByteSize::b(table_size as u64).to_string(),
        );

        Ok(PlayCommandOutput { results, metrics })
    }
}

pub struct PlayCommandOutput {
    pub results: Results<parse::Face>,
    pub metrics: Metrics,
}

impl fmt::Display for PlayCommandOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\n{}\n{}", self.results, self.metrics.to_table())
    }
}

////////////////////
// AnalyzeCommand //
////////////////////

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalyzeCommand {
    dice: DiceArgs,
}

impl Command for AnalyzeCommand {
    const USAGE: &'static str = "\
montecarlo analyze - roll a set of dice together and summarize the trials:
jackpots, combinations, permutations and per-trial face counts

USAGE:
    montecarlo analyze [option ...]

EXAMPLES:
    montecarlo analyze -d d6 -n 3 -t 1000
    montecarlo analyze -d [H,T:2] -n 4 -t 100 -s 7

OPTIONS:
";

    type Output = AnalyzeCommandOutput;

    fn try_from_cli_args(mut args: Args) -> Result<Self, String> {
        if args.0.contains(["-h", "--help"]) {
            print!("{}{}", Self::USAGE, DICE_OPTIONS);
            std::process::exit(0);
        }

        let dice = DiceArgs::from_cli_args(&mut args)?;
        args.expect_finished()?;

        Ok(Self { dice })
    }

    fn run(self) -> Result<Self::Output, String> {
        let game = self.dice.build_game()?;
        let mut rng = rng(self.dice.seed);

        time!("play", {
            game.play(&mut rng, self.dice.times)
                .map_err(|err| err.to_string())?
        });

        let analyzer = Analyzer::new(&game);
        let (jackpots, face_counts, combos, perms, frequencies) = time!("analyze", {
            (
                analyzer.jackpot_count(),
                analyzer.face_counts_per_trial(),
                analyzer.combo_count(),
                analyzer.perm_count(),
                analyzer.face_frequencies(),
            )
        });
        let err_str = |err: crate::error::Error| err.to_string();

        let mut frequencies_table =
            Table::new("{:>}  {:>}").with_row(row!("face", "frequency"));
        for (face, freq) in frequencies.map_err(err_str)? {
            frequencies_table.add_row(row!(face, format!("{:0.4}", freq)));
        }

        let combos = combos.map_err(err_str)?;
        let perms = perms.map_err(err_str)?;

        let mut metrics = Metrics::new();
        metrics.push("trials", self.dice.times.to_string());
        metrics.push("dice", game.ndice().to_string());
        metrics.push("jackpots", jackpots.map_err(err_str)?.to_string());
        metrics.push("distinct combinations", combos.len().to_string());
        metrics.push("distinct permutations", perms.len().to_string());

        Ok(AnalyzeCommandOutput {
            face_counts: face_counts.map_err(err_str)?.to_string(),
            frequencies: frequencies_table.to_string(),
            combos: combos.to_string(),
            perms: perms.to_string(),
            metrics,
        })
    }
}

pub struct AnalyzeCommandOutput {
    pub face_counts: String,
    pub frequencies: String,
    pub combos: String,
    pub perms: String,
    pub metrics: Metrics,
}

impl fmt::Display for AnalyzeCommandOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\n{}\n{}\n{}\n{}\n{}",
            self.face_counts,
            self.frequencies,
            self.combos,
            self.perms,
            self.metrics.to_table()
        )
    }
}

/////////////////
// BaseCommand //
/////////////////

#[derive(Debug)]
pub enum BaseCommand {
    Roll(RollCommand),
    Play(PlayCommand),
    Analyze(AnalyzeCommand),
}

impl Command for BaseCommand {
    const USAGE: &'static str = "\
montecarlo - A Monte Carlo simulator for weighted dice

USAGE:
    montecarlo [option ...] <subcommand>

SUBCOMMANDS:
    · montecarlo roll - roll a single weighted die
    · montecarlo play - roll a set of dice together and show every trial
    · montecarlo analyze - summarize jackpots, combinations and permutations

Set RUST_LOG=debug for timing information.
";

    type Output = String;

    fn try_from_cli_args(mut args: Args) -> Result<Self, String> {
        let maybe_subcommand = args.subcommand()?;

        match maybe_subcommand.as_deref() {
            Some("roll") => Ok(Self::Roll(RollCommand::try_from_cli_args(args)?)),
            Some("play") => Ok(Self::Play(PlayCommand::try_from_cli_args(args)?)),
            Some("analyze") => Ok(Self::Analyze(AnalyzeCommand::try_from_cli_args(args)?)),
            Some(command) => Err(format!("'{}' is not a recognized command", command)),
            None => {
                args.maybe_help(Self::USAGE);
                Err("no subcommand specified".to_string())
            }
        }
    }

    fn run(self) -> Result<String, String> {
        match self {
            Self::Roll(cmd) => cmd.run().map(|out| out.to_string()),
            Self::Play(cmd) => cmd.run().map(|out| out.to_string()),
            Self::Analyze(cmd) => cmd.run().map(|out| out.to_string()),
        }
    }
}

///////////
// Tests //
///////////
