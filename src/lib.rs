//! Bit-exact model of a tri-mode quire floating point pipeline.
//!
//! This emulates the numeric behaviour of a vector floating point unit that
//! accumulates products in an exact wide fixed-point register (the *quire*)
//! and can present its results either as IEEE 754 binary floats or as posits.
//! Only the results matter here: there is no notion of cycles, lanes or
//! register files. The caller supplies operand bit patterns, a [`Mode`] and a
//! [`RoundingMode`], and gets back result bits plus the raised [`Flags`].
//!
//! The pipeline for one reduction is:
//!
//! ```notrust
//! decode -> (quantize) -> exact product -> quire accumulate -> finalize -> round
//! ```
//!
//! The quantizer only runs in [`Mode::IeeeCompat`], which behaves like a
//! scalar IEEE unit that rounds after every step. [`Mode::MaxPrecision`] and
//! [`Mode::Posit`] round exactly once per reduction, so their results do not
//! depend on the order in which terms are supplied.
//!
//! ```
//! use qfpu::{Config, Format, Mode, Flags};
//!
//! let one = 0x3f80_0000;  // 1.0f32
//! let big = 0x4cbe_bc20;  // 1e8f32
//! let neg_big = 0xccbe_bc20;
//!
//! let ieee = Config::new(Mode::IeeeCompat, Format::F32, Format::F32).unwrap();
//! let out = qfpu::sum(ieee, &[big, one, neg_big]).unwrap();
//! assert_eq!(out.bits, 0);
//! assert!(out.flags.contains(Flags::NX));
//!
//! let mpp = Config::new(Mode::MaxPrecision, Format::F32, Format::F32).unwrap();
//! let out = qfpu::sum(mpp, &[big, one, neg_big]).unwrap();
//! assert_eq!(out.bits, one);
//! assert!(out.flags.is_empty());
//! ```

#![doc(html_root_url = "https://docs.rs/qfpu/0.1.0")]
#![warn(missing_debug_implementations)]
//#![warn(missing_docs)]    // FIXME

#[macro_use] extern crate bitflags;
#[macro_use] extern crate log;

mod canonical;
mod decode;
mod format;
mod ieee;
mod mode;
mod ops;
mod posit;
mod product;
mod quantize;
mod quire;
mod reduction;
mod round;

pub use canonical::{Canonical, Class};
pub use decode::decode;
pub use format::{Format, QuireLayout, BANK_BITS, CARRY_BITS};
pub use ieee::{round_ieee, CancelledZero, IeeeRounding, Tininess};
pub use mode::{Invalid, Mode, Pipeline, Rounder};
pub use ops::{add, div, fma, mul, sub};
pub use posit::round_posit;
pub use product::{exact_product, PartialProduct};
pub use quantize::quantize;
pub use quire::{Exact, Finalized, Quire, ZeroSign};
pub use reduction::{dot, sum, Config, Outcome, Reduction};
pub use round::RoundBits;

use std::{error, fmt};

/// The IEEE exceptions that can be raised by the pipeline.
///
/// Raised exceptions never interrupt a computation. They are collected into
/// a [`Flags`] set that is returned with the result.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Exception {
    /// Invalid operation (`0 * Inf`, `Inf - Inf`, `0 / 0`, signaling NaN
    /// operand, posit NaR fed to an IEEE rounder).
    InvalidOperation,
    /// A finite non-zero operand was divided by zero.
    DivideByZero,
    /// The rounded result exceeds the largest finite value of the target.
    Overflow,
    /// A tiny non-zero result lost precision.
    Underflow,
    /// Rounding discarded non-zero bits.
    Inexact,
}

impl Exception {
    /// Returns the flag bit that records this exception.
    pub fn flag(self) -> Flags {
        match self {
            Exception::InvalidOperation => Flags::NV,
            Exception::DivideByZero => Flags::DZ,
            Exception::Overflow => Flags::OF,
            Exception::Underflow => Flags::UF,
            Exception::Inexact => Flags::NX,
        }
    }
}

bitflags! {
    /// Accrued exception flags, laid out like the RISC-V `fflags` register.
    ///
    /// Flags are OR-ed together over all steps of a reduction and reported
    /// once at the end.
    #[derive(Default)]
    pub struct Flags: u8 {
        /// Invalid operation.
        const NV = 1 << 4;
        /// Divide by zero.
        const DZ = 1 << 3;
        /// Overflow.
        const OF = 1 << 2;
        /// Underflow.
        const UF = 1 << 1;
        /// Inexact.
        const NX = 1 << 0;
    }
}

impl Flags {
    /// Returns whether `exception` has been raised.
    pub fn raised(&self, exception: Exception) -> bool {
        self.contains(exception.flag())
    }
}

impl From<Exception> for Flags {
    fn from(e: Exception) -> Self {
        e.flag()
    }
}

/// The rounding modes supported by the IEEE rounders.
///
/// Posit rounding is always round-to-nearest, ties to even, and ignores this.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RoundingMode {
    /// Round results to the nearest representable number. If both surrounding
    /// numbers have the same distance, round to the even number ("ties to
    /// even").
    Nearest,
    /// Round towards 0 (truncate).
    Zero,
    /// Round towards `-Inf`.
    Down,
    /// Round towards `+Inf`.
    Up,
}

impl RoundingMode {
    /// Decodes a rounding mode from a RISC-V style `frm` field.
    ///
    /// * `0b000`: Round to nearest (even).
    /// * `0b001`: Round towards zero.
    /// * `0b010`: Round down (towards `-Inf`).
    /// * `0b011`: Round up (towards `+Inf`).
    ///
    /// Everything else (including the dynamic and ties-to-max encodings) is
    /// rejected.
    pub fn from_register(raw: u8) -> Result<Self, Error> {
        match raw {
            0b000 => Ok(RoundingMode::Nearest),
            0b001 => Ok(RoundingMode::Zero),
            0b010 => Ok(RoundingMode::Down),
            0b011 => Ok(RoundingMode::Up),
            _ => Err(Error::UnsupportedMode(raw)),
        }
    }
}

impl Default for RoundingMode {
    fn default() -> Self {
        RoundingMode::Nearest
    }
}

/// Configuration errors.
///
/// These are programming errors on the caller's side and are reported
/// immediately instead of producing a best-effort value. Numeric problems
/// are reported through [`Flags`] instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The mode (or rounding mode) register holds a reserved value.
    UnsupportedMode(u8),
    /// An operand has bits set above the width of its format.
    WidthMismatch {
        /// Declared width of the operand format.
        width: u32,
        /// The offending operand.
        bits: u64,
    },
    /// A format descriptor is outside the supported parameter range.
    InvalidFormat(&'static str),
    /// The target format is not produced by the mode's final rounder.
    ModeMismatch,
    /// The two operand streams of a dot product differ in length.
    OperandCount {
        left: usize,
        right: usize,
    },
    /// A partial product or carry left the declared quire width.
    QuireOverflow,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::UnsupportedMode(raw) => write!(f, "reserved mode value {:#b}", raw),
            Error::WidthMismatch { width, bits } => {
                write!(f, "operand {:#X} does not fit in {} bits", bits, width)
            }
            Error::InvalidFormat(why) => write!(f, "invalid format descriptor: {}", why),
            Error::ModeMismatch => f.write_str("target format does not match the mode's rounder"),
            Error::OperandCount { left, right } => {
                write!(f, "operand streams differ in length ({} vs. {})", left, right)
            }
            Error::QuireOverflow => f.write_str("value exceeds the declared quire width"),
        }
    }
}

impl error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_layout() {
        assert_eq!(Flags::all().bits(), 0b11111);
        assert_eq!(Flags::NV.bits(), 0b10000);
        assert_eq!(Flags::NX.bits(), 0b00001);
        assert_eq!(Flags::default(), Flags::empty());
    }

    #[test]
    fn exceptions_map_to_flags() {
        let flags = Flags::from(Exception::Overflow) | Exception::Inexact.flag();
        assert!(flags.raised(Exception::Overflow));
        assert!(flags.raised(Exception::Inexact));
        assert!(!flags.raised(Exception::Underflow));
    }

    #[test]
    fn rounding_register() {
        assert_eq!(RoundingMode::from_register(0b000), Ok(RoundingMode::Nearest));
        assert_eq!(RoundingMode::from_register(0b011), Ok(RoundingMode::Up));
        assert_eq!(RoundingMode::from_register(0b100), Err(Error::UnsupportedMode(0b100)));
        assert_eq!(RoundingMode::default(), RoundingMode::Nearest);
    }
}
