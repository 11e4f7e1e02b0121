use crate::{
    die::{Die, SharedDie},
    error::Error,
    weight::parse_weight,
};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

const SPLITTERS: &[char] = &[',', ' ', '\n', '\t'];

/////////////////
// parse::Face //
/////////////////

/// A face value given on the command line: an integer when it parses as one,
/// otherwise a string.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Face {
    Int(i64),
    Str(String),
}

impl FromStr for Face {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("a face can't be empty".to_string());
        }
        Ok(match s.parse::<i64>() {
            Ok(n) => Self::Int(n),
            Err(_) => Self::Str(s.to_owned()),
        })
    }
}

impl fmt::Display for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{}", n),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl fmt::Debug for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

////////////////////
// parse::DieSpec //
////////////////////

/// A die described on the command line, like `[1,2,3,4:10]` or `[H,T:2.5]`.
/// Each face may carry a `:weight` suffix; faces without one weigh `1`.
/// `d<n>` is shorthand for the faces `1..=n`.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct DieSpec(Vec<(Face, Option<String>)>);

impl DieSpec {
    /// An unweighted die with faces `1..=nfaces`.
    pub fn standard(nfaces: u32) -> Self {
        Self(
            (1..=nfaces)
                .map(|n| (Face::Int(n as i64), None))
                .collect(),
        )
    }

    pub fn nfaces(&self) -> usize {
        self.0.len()
    }

    pub fn faces(&self) -> impl Iterator<Item = &Face> + '_ {
        self.0.iter().map(|(face, _)| face)
    }

    /// Build the die, applying each face's weight.
    pub fn to_die(&self) -> Result<Die<Face>, Error> {
        let mut die = Die::new(self.faces().cloned())?;
        for (face, weight) in &self.0 {
            if let Some(weight) = weight {
                die.change_weight(face, weight)?;
            }
        }
        Ok(die)
    }

    pub fn to_shared_die(&self) -> Result<SharedDie<Face>, Error> {
        self.to_die().map(Die::shared)
    }
}

impl FromStr for DieSpec {
    type Err = String;

    // [1,2,3,4:10]

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if let Some(nfaces) = s.strip_prefix('d') {
            if let Ok(nfaces) = nfaces.parse::<u32>() {
                if nfaces == 0 {
                    return Err("a die needs at least one face: 'd0'".to_string());
                }
                return Ok(Self::standard(nfaces));
            }
        }

        let s = s.trim_start_matches('[');
        let s = s.trim_end_matches(']');

        let mut spec = Vec::new();
        for face_str in s.split(SPLITTERS).filter(|s| !s.is_empty()) {
            let (face_str, weight) = match face_str.split_once(':') {
                Some((face_str, weight_str)) => {
                    parse_weight(weight_str).map_err(|err| {
                        format!("invalid weight for face '{}': {}", face_str, err)
                    })?;
                    (face_str, Some(weight_str.to_owned()))
                }
                None => (face_str, None),
            };
            spec.push((Face::from_str(face_str)?, weight));
        }

        if spec.is_empty() {
            return Err(format!("die spec has no faces: '{}'", s));
        }

        Ok(Self(spec))
    }
}

impl fmt::Display for DieSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pieces = self
            .0
            .iter()
            .map(|(face, weight)| match weight {
                Some(weight) => format!("{}:{}", face, weight),
                None => face.to_string(),
            })
            .join(", ");
        write!(f, "[{}]", pieces)
    }
}

impl fmt::Debug for DieSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}


#[cfg(test)]
mod test {
    use super::{prop::*, *};
    use crate::error::ErrorKind;
    use claim::{assert_err, assert_some_eq};
    use proptest::prelude::*;

    fn int(n: i64) -> Face {
        Face::Int(n)
    }

    fn text(s: &str) -> Face {
        Face::Str(s.to_owned())
    }

    #[test]
    fn test_face_from_str() {
        assert_eq!(int(4), Face::from_str("4").unwrap());
        assert_eq!(int(-2), Face::from_str(" -2 ").unwrap());
        assert_eq!(text("H"), Face::from_str("H").unwrap());
        assert_eq!(text("4.5"), Face::from_str("4.5").unwrap());
        assert_err!(Face::from_str(""));

        // integers sort before strings, and numerically among themselves
        assert!(int(10) > int(9));
        assert!(int(100) < text("a"));
    }

    #[test]
    fn test_die_spec_from_str() {
        assert_eq!(
            DieSpec(vec![(int(1), None), (int(2), None), (int(3), Some("10".into()))]),
            DieSpec::from_str("[1,2,3:10]").unwrap(),
        );
        assert_eq!(
            DieSpec(vec![(text("H"), None), (text("T"), Some("2.5".into()))]),
            DieSpec::from_str("[ H, T:2.5 ]").unwrap(),
        );
        assert_eq!(DieSpec::standard(6), DieSpec::from_str("d6").unwrap());
        assert_eq!(DieSpec::standard(3), DieSpec::from_str("1 2 3").unwrap());

        assert_err!(DieSpec::from_str("[]"));
        assert_err!(DieSpec::from_str("d0"));
        assert_err!(DieSpec::from_str("[1,2:heavy]"));
        assert_err!(DieSpec::from_str("[1,2:-1]"));
    }

    #[test]
    fn test_die_spec_display() {
        let spec = DieSpec::from_str("[1, H:3, 2]").unwrap();
        assert_eq!("[1, H:3, 2]", spec.to_string());
        assert_eq!(spec, DieSpec::from_str(&spec.to_string()).unwrap());
    }

    #[test]
    fn test_die_spec_to_die() {
        let die = DieSpec::from_str("[4:10,5,6]").unwrap().to_die().unwrap();
        assert_eq!(3, die.nfaces());
        assert_some_eq!(die.weight(&int(4)), 10.0);
        assert_some_eq!(die.weight(&int(5)), 1.0);

        let err = DieSpec::from_str("[1,2,1]").unwrap().to_die().unwrap_err();
        assert_eq!(ErrorKind::Validation, err.kind());
    }

    proptest! {
        #[test]
        fn test_prop_die_spec_to_die(spec in arb_die_spec()) {
            let die = spec.to_die().unwrap();
            prop_assert_eq!(spec.nfaces(), die.nfaces());
            prop_assert!(spec.faces().zip(die.faces()).all(|(a, b)| a == b));
        }
    }
}
