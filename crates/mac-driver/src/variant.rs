//! Peripheral test variants
//!
//! The `v2` and `v3` self-tests drive the same register file but poll
//! different status encodings, submit different operand sequences, and
//! check against different reference sums. [`Variant`] bundles those
//! choices so one driver serves both.

use mac_chip::StatusProtocol;

/// Self-test variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Variant {
    /// Idle-when-zero status; reference accumulates both operand pairs.
    #[default]
    V2,
    /// Ready/done status bits; reference accumulates the first pair only.
    V3,
}

impl Variant {
    /// Both variants, in order
    pub const ALL: [Self; 2] = [Self::V2, Self::V3];

    /// Status encoding this variant polls
    pub const fn status_protocol(self) -> StatusProtocol {
        match self {
            Self::V2 => StatusProtocol::IdleWhenZero,
            Self::V3 => StatusProtocol::ReadyDoneBits,
        }
    }

    /// What the variant submits after the first operand pair.
    ///
    /// `V2` resubmits the first pair rather than `(x2, y2)`; `V3` submits
    /// nothing further. Both are the fixtures' observed behaviour.
    pub const fn default_second_submission(self) -> SecondSubmission {
        match self {
            Self::V2 => SecondSubmission::Repeat,
            Self::V3 => SecondSubmission::Skip,
        }
    }

    /// Short name (`v2` / `v3`)
    pub const fn name(self) -> &'static str {
        match self {
            Self::V2 => "v2",
            Self::V3 => "v3",
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "v2" | "a" => Ok(Self::V2),
            "v3" | "b" => Ok(Self::V3),
            other => Err(format!("unknown variant '{other}' (expected v2 or v3)")),
        }
    }
}

/// Operand pair submitted after the first one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecondSubmission {
    /// Submit `(x1, y1)` again
    Repeat,
    /// Submit `(x2, y2)`
    Distinct,
    /// Submit nothing
    Skip,
}

impl SecondSubmission {
    /// The pair to write for test vectors `(x1, y1, x2, y2)`, if any
    pub const fn pair(self, x1: u32, y1: u32, x2: u32, y2: u32) -> Option<(u32, u32)> {
        match self {
            Self::Repeat => Some((x1, y1)),
            Self::Distinct => Some((x2, y2)),
            Self::Skip => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_map_to_their_status_encoding() {
        assert_eq!(Variant::V2.status_protocol(), StatusProtocol::IdleWhenZero);
        assert_eq!(Variant::V3.status_protocol(), StatusProtocol::ReadyDoneBits);
    }

    #[test]
    fn default_second_submission_matches_fixtures() {
        assert_eq!(Variant::V2.default_second_submission(), SecondSubmission::Repeat);
        assert_eq!(Variant::V3.default_second_submission(), SecondSubmission::Skip);
        assert_eq!(SecondSubmission::Repeat.pair(2, 3, 2, 5), Some((2, 3)));
        assert_eq!(SecondSubmission::Distinct.pair(2, 3, 2, 5), Some((2, 5)));
        assert_eq!(SecondSubmission::Skip.pair(2, 3, 2, 5), None);
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("V3".parse::<Variant>().unwrap(), Variant::V3);
        assert_eq!("a".parse::<Variant>().unwrap(), Variant::V2);
        assert!("v4".parse::<Variant>().is_err());
        assert_eq!(Variant::V2.to_string(), "v2");
    }
}
