use thiserror::Error;

/// Coarse classification of an [`Error`], mirroring the three families of
/// caller mistakes plus misuse of a game before it has been played.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input: duplicate faces, zero counts, unknown layouts, ...
    Validation,
    /// A value of the wrong shape, like a weight that isn't a number.
    Type,
    /// A face that doesn't exist on the die.
    Lookup,
    /// An operation that needs a played game.
    State,
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum Error {
    #[error("all face values must be distinct: duplicate face '{0}'")]
    DuplicateFace(String),
    #[error("a die needs at least one face")]
    EmptyFaces,
    #[error("a game needs at least one die")]
    EmptyGame,
    #[error("{what} count must be a positive integer, got: {count}")]
    InvalidCount { what: &'static str, count: usize },
    #[error("unrecognized layout '{0}': expected 'wide' or 'narrow'")]
    UnknownLayout(String),
    #[error("weight must not be negative, got: {0}")]
    NegativeWeight(f64),
    #[error("all face weights are zero, there is nothing to sample")]
    AllWeightsZero,
    #[error("weight must be a finite number or a numeric string, got: '{0}'")]
    InvalidWeight(String),
    #[error("face '{0}' not found on this die")]
    FaceNotFound(String),
    #[error("the game hasn't been played yet")]
    NotPlayed,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateFace(_)
            | Self::EmptyFaces
            | Self::EmptyGame
            | Self::InvalidCount { .. }
            | Self::UnknownLayout(_)
            | Self::NegativeWeight(_)
            | Self::AllWeightsZero => ErrorKind::Validation,
            Self::InvalidWeight(_) => ErrorKind::Type,
            Self::FaceNotFound(_) => ErrorKind::Lookup,
            Self::NotPlayed => ErrorKind::State,
        }
    }

    pub(crate) fn invalid_count(what: &'static str, count: usize) -> Self {
        Self::InvalidCount { what, count }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
