//! Guard, round and sticky bits, and the rounding decision made from them.
//!
//! Every rounder in this crate cuts an exact significand at some bit position
//! and then decides, from the bits it cut off, whether to increment what is
//! left. The layout around the cut looks like this:
//!
//! ```notrust
//!       +--------------+-------+-------+----------------+
//! What: |     kept     | guard | round |     sticky     |
//! #Bits:|     any      |   1   |   1   | rest, OR-ed    |
//!       +--------------+-------+-------+----------------+
//! ```
//!
//! A sticky bit coming in from an earlier stage (bits that already fell off
//! the bottom of the quire) is OR-ed into `sticky`.

use crate::RoundingMode;
use num_bigint::BigUint;

/// The bits below the rounding position.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct RoundBits {
    /// The first bit below the kept part (worth half an ulp).
    pub guard: bool,
    /// The second bit below the kept part.
    pub round: bool,
    /// Whether any bit below `round` is set.
    pub sticky: bool,
}

impl RoundBits {
    /// Splits off the lowest `drop` bits of `significand`.
    ///
    /// Returns the kept (truncated) part and the bits describing what was
    /// dropped. `sticky` is a sticky bit from an earlier stage and is carried
    /// into the result.
    pub fn split(significand: &BigUint, drop: u64, sticky: bool) -> (BigUint, RoundBits) {
        if drop == 0 {
            return (significand.clone(), RoundBits { guard: false, round: false, sticky });
        }

        let guard = significand.bit(drop - 1);
        let round = drop >= 2 && significand.bit(drop - 2);
        let below = match significand.trailing_zeros() {
            Some(tz) => drop >= 3 && tz < drop - 2,
            None => false,
        };

        let bits = RoundBits {
            guard,
            round,
            sticky: sticky || below,
        };
        (significand >> drop, bits)
    }

    /// Returns `true` when nothing non-zero was dropped.
    pub fn is_exact(&self) -> bool {
        !(self.guard || self.round || self.sticky)
    }

    /// Decides whether the kept part has to be incremented by one ulp.
    ///
    /// `sign` is the sign of the value being rounded (needed for the directed
    /// modes), `odd` the lsb of the kept part (needed for ties to even).
    pub fn round_up(&self, mode: RoundingMode, sign: bool, odd: bool) -> bool {
        match mode {
            RoundingMode::Nearest => self.guard && (self.round || self.sticky || odd),
            RoundingMode::Zero => false,
            RoundingMode::Up => !sign && !self.is_exact(),
            RoundingMode::Down => sign && !self.is_exact(),
        }
    }
}
