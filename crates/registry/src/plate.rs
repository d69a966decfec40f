//! Plate normalization and format validation.
//!
//! Two grammars are accepted, both seven characters long:
//!
//! | Format   | Shape     | Example   |
//! |----------|-----------|-----------|
//! | Legacy   | `LLLDDDD` | `ABC1234` |
//! | Mercosul | `LLLDLDD` | `ABC1D23` |

use std::{fmt, str::FromStr};

use thiserror::Error;

/// `L` = ASCII uppercase letter, `D` = ASCII digit.
const LEGACY_SHAPE: &[u8; 7] = b"LLLDDDD";
const MERCOSUL_SHAPE: &[u8; 7] = b"LLLDLDD";

/// Strip everything except ASCII letters and digits, then uppercase.
///
/// Never fails; validity is checked separately with [`is_valid`].
#[must_use]
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// `true` iff `plate` matches the legacy or the Mercosul grammar exactly.
#[must_use]
pub fn is_valid(plate: &str) -> bool {
    PlateFormat::detect(plate).is_some()
}

fn matches_shape(plate: &[u8], shape: &[u8; 7]) -> bool {
    plate.len() == shape.len()
        && plate.iter().zip(shape).all(|(c, s)| match s {
            b'L' => c.is_ascii_uppercase(),
            _ => c.is_ascii_digit(),
        })
}

/// Which plate grammar a plate conforms to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlateFormat {
    Legacy,
    Mercosul,
}

impl PlateFormat {
    /// Detect the grammar of an already-normalized plate.
    #[must_use]
    pub fn detect(plate: &str) -> Option<Self> {
        let bytes = plate.as_bytes();
        if matches_shape(bytes, LEGACY_SHAPE) {
            Some(Self::Legacy)
        } else if matches_shape(bytes, MERCOSUL_SHAPE) {
            Some(Self::Mercosul)
        } else {
            None
        }
    }
}

impl fmt::Display for PlateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy => write!(f, "legacy"),
            Self::Mercosul => write!(f, "mercosul"),
        }
    }
}

/// Input that did not normalize into a supported plate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("plate {normalized:?} does not match a supported format")]
pub struct InvalidPlate {
    pub normalized: String,
}

/// A normalized plate that passed validation.
///
/// Only values of this type reach the registry, so a malformed query can never
/// be sent upstream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedPlate {
    value: String,
    format: PlateFormat,
}

impl NormalizedPlate {
    /// Normalize `raw` and validate the result.
    pub fn parse(raw: &str) -> Result<Self, InvalidPlate> {
        let value = normalize(raw);
        match PlateFormat::detect(&value) {
            Some(format) => Ok(Self { value, format }),
            None => Err(InvalidPlate { normalized: value }),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub fn format(&self) -> PlateFormat {
        self.format
    }
}

impl FromStr for NormalizedPlate {
    type Err = InvalidPlate;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for NormalizedPlate {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for NormalizedPlate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("abc-1234", "ABC1234")]
    #[case(" abc 1d23 ", "ABC1D23")]
    #[case("a.b.c/1*2#3$4", "ABC1234")]
    #[case("çãABC1234", "ABC1234")]
    #[case("", "")]
    #[case("---", "")]
    fn normalize_strips_and_uppercases(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize(raw), expected);
    }

    #[rstest]
    #[case("ABC1234")]
    #[case("ab c-1d23")]
    #[case("  xyz 0000\n")]
    #[case("çãoABC1234")]
    #[case("!!!")]
    fn normalize_is_idempotent(#[case] raw: &str) {
        let once = normalize(raw);
        assert_eq!(normalize(&once), once);
    }

    #[rstest]
    #[case("ABC1234", true)]
    #[case("ABC1D23", true)]
    #[case("AB1234", false)]
    #[case("ABCD123", false)]
    #[case("ABC12345", false)]
    #[case("abc1234", false)]
    #[case("ABC12D3", false)]
    #[case("1BC1234", false)]
    #[case("", false)]
    fn is_valid_accepts_exactly_two_grammars(#[case] plate: &str, #[case] valid: bool) {
        assert_eq!(is_valid(plate), valid, "plate {plate:?}");
    }

    #[test]
    fn is_valid_does_not_normalize() {
        assert!(!is_valid("ABC-1234"));
        assert!(is_valid(&normalize("ABC-1234")));
    }

    #[test]
    fn parse_detects_format() {
        let legacy = NormalizedPlate::parse("abc-1234").unwrap();
        assert_eq!(legacy.as_str(), "ABC1234");
        assert_eq!(legacy.format(), PlateFormat::Legacy);

        let mercosul: NormalizedPlate = "abc1d23".parse().unwrap();
        assert_eq!(mercosul.to_string(), "ABC1D23");
        assert_eq!(mercosul.format(), PlateFormat::Mercosul);
    }

    #[test]
    fn parse_rejects_with_normalized_value() {
        let err = NormalizedPlate::parse("12-3").unwrap_err();
        assert_eq!(err.normalized, "123");
    }
}
