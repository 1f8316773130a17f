//! Motor status flags as reported by the `state` attribute.

use std::{fmt, str::FromStr};

use bitflags::bitflags;

use crate::error::Error;

bitflags! {
    /// Set of status flags a motor reports in its `state` attribute.
    ///
    /// The text form is the space-separated names of the set flags in the
    /// order declared here; the empty set is the empty string.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MotorState: u8 {
        const RUNNING = 1 << 0;
        const RAMPING = 1 << 1;
        const HOLDING = 1 << 2;
        const OVERLOADED = 1 << 3;
        const STALLED = 1 << 4;
    }
}

/// Flag names in canonical order.
const NAMES: [(MotorState, &str); 5] = [
    (MotorState::RUNNING, "running"),
    (MotorState::RAMPING, "ramping"),
    (MotorState::HOLDING, "holding"),
    (MotorState::OVERLOADED, "overloaded"),
    (MotorState::STALLED, "stalled"),
];

impl fmt::Display for MotorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (flag, name) in NAMES {
            if !self.contains(flag) {
                continue;
            }
            if !first {
                f.write_str(" ")?;
            }
            f.write_str(name)?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for MotorState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut state = MotorState::empty();
        if s.is_empty() {
            return Ok(state);
        }
        for token in s.split(' ') {
            let flag = NAMES
                .iter()
                .find(|(_, name)| *name == token)
                .map(|(flag, _)| *flag)
                .ok_or_else(|| Error::parse("state", s))?;
            state |= flag;
        }
        Ok(state)
    }
}
