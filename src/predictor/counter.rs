//! Implementation of a two-bit saturating counter.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Outcome;

/// The state of a two-bit saturating counter used to follow the behavior
/// of a branch.
///
/// States are ordered from "most not-taken" to "most taken", and the
/// discriminant matches the two-bit encoding used in hardware.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FsmState {
    StronglyNotTaken = 0,
    WeaklyNotTaken = 1,
    WeaklyTaken = 2,
    StronglyTaken = 3,
}

impl FsmState {
    /// Number of bits needed to store a counter.
    pub const STORAGE_BITS: usize = 2;

    /// The next state after observing a taken branch.
    pub fn on_taken(self) -> Self {
        match self {
            Self::StronglyNotTaken => Self::WeaklyNotTaken,
            Self::WeaklyNotTaken => Self::WeaklyTaken,
            Self::WeaklyTaken | Self::StronglyTaken => Self::StronglyTaken,
        }
    }

    /// The next state after observing a not-taken branch.
    pub fn on_not_taken(self) -> Self {
        match self {
            Self::StronglyNotTaken | Self::WeaklyNotTaken => Self::StronglyNotTaken,
            Self::WeaklyTaken => Self::WeaklyNotTaken,
            Self::StronglyTaken => Self::WeaklyTaken,
        }
    }

    /// Return the predicted direction.
    pub fn predict(&self) -> Outcome {
        match self {
            Self::WeaklyTaken | Self::StronglyTaken => Outcome::T,
            Self::StronglyNotTaken | Self::WeaklyNotTaken => Outcome::N,
        }
    }

    /// Move one step toward the observed outcome.
    pub fn update(&mut self, outcome: Outcome) {
        *self = match outcome {
            Outcome::T => self.on_taken(),
            Outcome::N => self.on_not_taken(),
        };
    }
}

impl TryFrom<u8> for FsmState {
    type Error = String;
    fn try_from(x: u8) -> Result<Self, Self::Error> {
        match x {
            0 => Ok(Self::StronglyNotTaken),
            1 => Ok(Self::WeaklyNotTaken),
            2 => Ok(Self::WeaklyTaken),
            3 => Ok(Self::StronglyTaken),
            _ => Err(format!("invalid FSM state {} (expected 0..=3)", x)),
        }
    }
}

impl FromStr for FsmState {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SNT" | "strongly_not_taken" => Ok(Self::StronglyNotTaken),
            "WNT" | "weakly_not_taken" => Ok(Self::WeaklyNotTaken),
            "WT" | "weakly_taken" => Ok(Self::WeaklyTaken),
            "ST" | "strongly_taken" => Ok(Self::StronglyTaken),
            _ => s.parse::<u8>()
                .map_err(|_| format!("invalid FSM state '{}'", s))
                .and_then(Self::try_from),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn saturates_at_extremes() {
        let mut s = FsmState::StronglyNotTaken;
        for _ in 0..8 { s.update(Outcome::T); }
        assert_eq!(s, FsmState::StronglyTaken);
        for _ in 0..8 { s.update(Outcome::N); }
        assert_eq!(s, FsmState::StronglyNotTaken);
    }

    #[test]
    fn hysteresis() {
        let mut s = FsmState::StronglyTaken;
        s.update(Outcome::N);
        assert_eq!(s.predict(), Outcome::T);
        s.update(Outcome::N);
        assert_eq!(s.predict(), Outcome::N);
        s.update(Outcome::T);
        assert_eq!(s, FsmState::WeaklyTaken);
    }

    #[test]
    fn parse() {
        assert_eq!("0".parse::<FsmState>(), Ok(FsmState::StronglyNotTaken));
        assert_eq!("2".parse::<FsmState>(), Ok(FsmState::WeaklyTaken));
        assert_eq!("WNT".parse::<FsmState>(), Ok(FsmState::WeaklyNotTaken));
        assert!("4".parse::<FsmState>().is_err());
        assert!("taken".parse::<FsmState>().is_err());
    }

    fn any_state() -> impl Strategy<Value = FsmState> {
        (0u8..=3).prop_map(|x| FsmState::try_from(x).unwrap())
    }

    proptest! {
        // A single step moves by at most one state, in the direction of
        // the outcome.
        #[test]
        fn single_step(s in any_state(), taken in any::<bool>()) {
            let mut next = s;
            next.update(taken.into());
            let (a, b) = (s as i8, next as i8);
            if taken {
                prop_assert_eq!(b, (a + 1).min(3));
            } else {
                prop_assert_eq!(b, (a - 1).max(0));
            }
        }
    }
}
