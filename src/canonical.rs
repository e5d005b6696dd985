//! Provides the canonical representation every operand is decoded into,
//! independent of whether it came from an IEEE or a posit encoding.

use crate::round::RoundBits;
use crate::{decode, Format};
use ieee754::Ieee754;
use num_bigint::BigUint;
use num_traits::{One, Zero};
use std::{fmt, ops};

/// The kind of value a [`Canonical`] holds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Class {
    /// Signed zero. Posit zero is always positive.
    Zero,
    /// Non-zero finite number.
    Finite,
    /// Signed infinity (IEEE only).
    Infinity,
    /// IEEE Not a Number.
    NaN {
        /// Whether this is a quiet NaN (the msb of the fraction field).
        quiet: bool,
        /// The payload below the quiet bit, left-aligned: the most
        /// significant payload bit of the encoding is bit 63 here. This lets
        /// payloads move between formats of different width while keeping
        /// their most significant bits.
        payload: u64,
    },
    /// Posit Not a Real.
    NaR,
}

/// A decoded operand.
///
/// Finite values represent
///
/// ```notrust
/// (-1)^sign * significand * 2^exponent
/// ```
///
/// where `exponent` is the weight of the least significant significand bit.
/// The significand is kept odd (trailing zeros are folded into the exponent),
/// which makes the representation of every real number unique. Non-finite
/// classes ignore `exponent` and `significand`.
#[derive(Clone, PartialEq, Eq)]
pub struct Canonical {
    pub sign: bool,
    class: Class,
    exponent: i64,
    significand: BigUint,
}

impl Canonical {
    fn special(sign: bool, class: Class) -> Self {
        Self {
            sign,
            class,
            exponent: 0,
            significand: BigUint::zero(),
        }
    }

    pub fn zero(sign: bool) -> Self {
        Self::special(sign, Class::Zero)
    }

    pub fn infinity(sign: bool) -> Self {
        Self::special(sign, Class::Infinity)
    }

    /// Creates a NaN with a left-aligned `payload` (see [`Class::NaN`]).
    pub fn nan(sign: bool, quiet: bool, payload: u64) -> Self {
        Self::special(sign, Class::NaN { quiet, payload })
    }

    /// The quiet NaN returned by invalid operations: positive, no payload.
    pub fn default_nan() -> Self {
        Self::nan(false, true, 0)
    }

    pub fn nar() -> Self {
        Self::special(false, Class::NaR)
    }

    pub fn one() -> Self {
        Self::finite(false, 0, BigUint::one())
    }

    /// Creates a finite number `(-1)^sign * significand * 2^exponent`.
    ///
    /// A zero `significand` yields a signed zero.
    pub fn finite(sign: bool, exponent: i64, significand: BigUint) -> Self {
        match significand.trailing_zeros() {
            None => Self::zero(sign),
            Some(tz) => Self {
                sign,
                class: Class::Finite,
                exponent: exponent + tz as i64,
                significand: significand >> tz,
            },
        }
    }

    /// Converts an `f32` to its canonical form. This is lossless.
    pub fn from_f32(f: f32) -> Self {
        let (sign, raw_exp, fraction) = f.decompose_raw();
        decode::classify_ieee(sign, u64::from(raw_exp), u64::from(fraction), Format::F32)
    }

    /// Converts an `f64` to its canonical form. This is lossless.
    pub fn from_f64(f: f64) -> Self {
        let (sign, raw_exp, fraction) = f.decompose_raw();
        decode::classify_ieee(sign, u64::from(raw_exp), fraction, Format::F64)
    }

    pub fn class(&self) -> Class {
        self.class
    }

    /// Weight of the least significant significand bit.
    pub fn exponent(&self) -> i64 {
        self.exponent
    }

    pub fn significand(&self) -> &BigUint {
        &self.significand
    }

    /// Exponent of the most significant set bit, i.e. `floor(log2(|self|))`
    /// for finite non-zero values.
    pub fn msb_exponent(&self) -> Option<i64> {
        match self.class {
            Class::Finite => Some(self.exponent + self.significand.bits() as i64 - 1),
            _ => None,
        }
    }

    /// Guard, round and sticky bits left over when the significand is cut
    /// down to `precision` bits. `None` for anything but finite values.
    pub fn round_bits(&self, precision: u32) -> Option<RoundBits> {
        if self.class != Class::Finite {
            return None;
        }
        let drop = self.significand.bits().saturating_sub(u64::from(precision));
        Some(RoundBits::split(&self.significand, drop, false).1)
    }

    pub fn is_zero(&self) -> bool {
        self.class == Class::Zero
    }

    pub fn is_finite(&self) -> bool {
        match self.class {
            Class::Zero | Class::Finite => true,
            _ => false,
        }
    }

    pub fn is_infinite(&self) -> bool {
        self.class == Class::Infinity
    }

    pub fn is_nan(&self) -> bool {
        match self.class {
            Class::NaN { .. } => true,
            _ => false,
        }
    }

    pub fn is_signaling(&self) -> bool {
        match self.class {
            Class::NaN { quiet, .. } => !quiet,
            _ => false,
        }
    }

    pub fn is_nar(&self) -> bool {
        self.class == Class::NaR
    }
}

/// Negation flips the sign of every class; NaR has no sign and is unchanged.
impl ops::Neg for Canonical {
    type Output = Canonical;

    fn neg(self) -> Canonical {
        if self.is_nar() {
            self
        } else {
            Canonical {
                sign: !self.sign,
                ..self
            }
        }
    }
}

impl fmt::Debug for Canonical {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.sign && !self.is_nar() {
            write!(f, "-")?;
        }

        match self.class {
            Class::Zero => write!(f, "0"),
            Class::Finite => write!(f, "{:#b}*2^{}", self.significand, self.exponent),
            Class::Infinity => write!(f, "Inf"),
            Class::NaN { quiet: true, payload } => write!(f, "qNaN({:#X})", payload),
            Class::NaN { quiet: false, payload } => write!(f, "sNaN({:#X})", payload),
            Class::NaR => write!(f, "NaR"),
        }
    }
}
