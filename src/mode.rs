//! The mode controller.
//!
//! A pure lookup from [`Mode`] to the pipeline configuration it selects.
//! Nothing here keeps state between reductions.

use crate::canonical::{Canonical, Class};
use crate::{Error, Format};

/// The operating mode of the pipeline.
///
/// Corresponds to a 2-bit mode control register:
///
/// | Register | Mode                  |
/// |----------|-----------------------|
/// | `0b00`   | [`Mode::IeeeCompat`]  |
/// | `0b01`   | [`Mode::MaxPrecision`]|
/// | `0b10`   | [`Mode::Posit`]       |
/// | `0b11`   | reserved              |
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Behaves like a scalar IEEE unit: operands are quantized to the target
    /// format and every step of a reduction is rounded.
    IeeeCompat,
    /// Products are accumulated exactly and the result is rounded once, to
    /// an IEEE format.
    MaxPrecision,
    /// Like `MaxPrecision`, but the result is a posit.
    Posit,
}

impl Mode {
    /// Decodes the mode control register. Only the low 2 bits may be set,
    /// and `0b11` is reserved.
    pub fn from_register(raw: u8) -> Result<Self, Error> {
        match raw {
            0b00 => Ok(Mode::IeeeCompat),
            0b01 => Ok(Mode::MaxPrecision),
            0b10 => Ok(Mode::Posit),
            _ => Err(Error::UnsupportedMode(raw)),
        }
    }

    /// The register encoding of this mode.
    pub fn register(self) -> u8 {
        match self {
            Mode::IeeeCompat => 0b00,
            Mode::MaxPrecision => 0b01,
            Mode::Posit => 0b10,
        }
    }

    /// Returns the pipeline configuration this mode selects.
    pub fn pipeline(self) -> Pipeline {
        match self {
            Mode::IeeeCompat => Pipeline {
                quantizer: true,
                rounder: Rounder::Ieee,
                invalid: Invalid::NaN,
            },
            Mode::MaxPrecision => Pipeline {
                quantizer: false,
                rounder: Rounder::Ieee,
                invalid: Invalid::NaN,
            },
            Mode::Posit => Pipeline {
                quantizer: false,
                rounder: Rounder::Posit,
                invalid: Invalid::NaR,
            },
        }
    }

    /// Maps a decoded operand into the value domain of this mode.
    ///
    /// Posit mode has no infinities and no NaNs; both turn into NaR. Other
    /// modes keep NaR as it is (the quantizer or the IEEE rounder deal with
    /// it).
    pub(crate) fn canonicalize(self, value: Canonical) -> Canonical {
        match (self.pipeline().invalid, value.class()) {
            (Invalid::NaR, Class::Infinity) | (Invalid::NaR, Class::NaN { .. }) => Canonical::nar(),
            _ => value,
        }
    }
}

/// The units a [`Mode`] switches on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Pipeline {
    /// Whether operands go through the input quantizer.
    pub quantizer: bool,
    /// The final rounder that produces the result.
    pub rounder: Rounder,
    /// How invalid results are represented.
    pub invalid: Invalid,
}

/// A final rounder.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Rounder {
    Ieee,
    Posit,
}

impl Rounder {
    /// Whether this rounder produces values of `format`.
    pub fn accepts(self, format: Format) -> bool {
        match self {
            Rounder::Ieee => format.is_ieee(),
            Rounder::Posit => format.is_posit(),
        }
    }
}

/// The canonical invalid value of a mode.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Invalid {
    NaN,
    NaR,
}
