//! Conversion of loosely-typed weight input into die weights.
//!
//! A weight is accepted as any primitive number or as a string that parses
//! to one (`"10"`, `" 2.5 "`, `"1e3"`). Everything funnels through
//! [`check_weight`], so a weight is always finite and non-negative.

use crate::error::{Error, Result};

/// A value that can be used as a face weight.
pub trait IntoWeight {
    fn into_weight(self) -> Result<f64>;
}

/// Parse a numeric string into a weight. Surrounding whitespace is ignored.
pub fn parse_weight(s: &str) -> Result<f64> {
    let weight = s
        .trim()
        .parse::<f64>()
        .map_err(|_| Error::InvalidWeight(s.to_owned()))?;

    // "inf" and "NaN" parse as f64 but aren't usable weights
    if !weight.is_finite() {
        return Err(Error::InvalidWeight(s.to_owned()));
    }

    check_weight(weight)
}

/// Ensure `weight` is finite and non-negative.
pub fn check_weight(weight: f64) -> Result<f64> {
    if !weight.is_finite() {
        Err(Error::InvalidWeight(weight.to_string()))
    } else if weight < 0.0 {
        Err(Error::NegativeWeight(weight))
    } else {
        Ok(weight)
    }
}

impl IntoWeight for f64 {
    #[inline]
    fn into_weight(self) -> Result<f64> {
        check_weight(self)
    }
}

impl IntoWeight for f32 {
    #[inline]
    fn into_weight(self) -> Result<f64> {
        check_weight(self as f64)
    }
}

macro_rules! impl_into_weight_int {
    ( $($t:ty),+ $(,)? ) => {
        $( impl IntoWeight for $t {
            #[inline]
            fn into_weight(self) -> Result<f64> {
                check_weight(self as f64)
            }
        })+
    }
}

impl_into_weight_int!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

impl IntoWeight for &str {
    #[inline]
    fn into_weight(self) -> Result<f64> {
        parse_weight(self)
    }
}

impl IntoWeight for String {
    #[inline]
    fn into_weight(self) -> Result<f64> {
        parse_weight(&self)
    }
}

impl IntoWeight for &String {
    #[inline]
    fn into_weight(self) -> Result<f64> {
        parse_weight(self)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::ErrorKind;
    use claim::{assert_err, assert_ok_eq};
    use proptest::prelude::*;

    #[test]
    fn test_parse_weight() {
        assert_ok_eq!(parse_weight("10"), 10.0);
        assert_ok_eq!(parse_weight(" 2.5 "), 2.5);
        assert_ok_eq!(parse_weight("1e3"), 1000.0);
        assert_ok_eq!(parse_weight("0"), 0.0);

        assert_eq!(ErrorKind::Type, parse_weight("ten").unwrap_err().kind());
        assert_eq!(ErrorKind::Type, parse_weight("").unwrap_err().kind());
        assert_eq!(ErrorKind::Type, parse_weight("inf").unwrap_err().kind());
        assert_eq!(ErrorKind::Type, parse_weight("NaN").unwrap_err().kind());
        assert_eq!(ErrorKind::Type, parse_weight("1e400").unwrap_err().kind());
        assert_eq!(
            ErrorKind::Validation,
            parse_weight("-1").unwrap_err().kind()
        );
    }

    #[test]
    fn test_into_weight() {
        assert_ok_eq!(3_u8.into_weight(), 3.0);
        assert_ok_eq!(7_i64.into_weight(), 7.0);
        assert_ok_eq!(0.5_f32.into_weight(), 0.5);
        assert_ok_eq!("4".into_weight(), 4.0);
        assert_ok_eq!(String::from("4.25").into_weight(), 4.25);

        assert_err!((-3_i32).into_weight());
        assert_err!(f64::NAN.into_weight());
        assert_err!(f64::INFINITY.into_weight());
    }

    proptest! {
        // a numeric string and the number it spells are the same weight
        #[test]
        fn test_prop_numeric_strings_match_numbers(w in 0_u32..1_000_000) {
            prop_assert_eq!(w.into_weight(), w.to_string().into_weight());
        }
    }
}
