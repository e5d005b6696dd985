//! The IEEE final rounder (and the encoder shared with the input quantizer).
//!
//! Useful resources:
//! * IEEE 754-2019, sections 4.3 (rounding), 6.3 (the sign bit) and 7
//!   (default exception handling)
//! * http://pages.cs.wisc.edu/~markhill/cs354/Fall2008/notes/flpt.apprec.html

use crate::decode::low_mask;
use crate::quire::{Exact, Finalized, ZeroSign};
use crate::round::RoundBits;
use crate::{Error, Flags, Format, RoundingMode};
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use std::cmp;

/// When a result counts as "tiny" for the purpose of raising underflow.
///
/// IEEE 754 leaves this choice to the implementation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Tininess {
    /// Tiny if the result, rounded as though the exponent range were
    /// unbounded, lies strictly between `±2^emin`.
    AfterRounding,
    /// Tiny if the exact result lies strictly between `±2^emin`.
    BeforeRounding,
}

impl Default for Tininess {
    fn default() -> Self {
        Tininess::AfterRounding
    }
}

/// Sign of a zero produced by exact cancellation of non-zero terms (or of
/// zeros of opposite sign).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CancelledZero {
    /// `+0`, except `-0` when rounding towards `-Inf` (IEEE 754 6.3).
    Ieee,
    /// Always `+0`.
    Positive,
}

impl Default for CancelledZero {
    fn default() -> Self {
        CancelledZero::Ieee
    }
}

/// Everything the IEEE rounders need to know besides the target format.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct IeeeRounding {
    pub mode: RoundingMode,
    pub tininess: Tininess,
    pub cancelled: CancelledZero,
}

impl From<RoundingMode> for IeeeRounding {
    fn from(mode: RoundingMode) -> Self {
        IeeeRounding {
            mode,
            ..IeeeRounding::default()
        }
    }
}

/// Rounds a finalized quire to the IEEE `format`.
///
/// This is the only place a reduction in [`Mode::MaxPrecision`] rounds.
/// Returns the encoded result and the exceptions raised by rounding it, or
/// [`Error::ModeMismatch`] if `format` is a posit format.
///
/// [`Mode::MaxPrecision`]: crate::Mode::MaxPrecision
pub fn round_ieee<R: Into<IeeeRounding>>(value: &Finalized, format: Format, rounding: R) -> Result<(u64, Flags), Error> {
    if !format.is_ieee() {
        return Err(Error::ModeMismatch);
    }
    Ok(round_finalized(value, format, rounding.into()))
}

/// [`round_ieee`] for a `format` known to be an IEEE format.
pub(crate) fn round_finalized(value: &Finalized, format: Format, rounding: IeeeRounding) -> (u64, Flags) {
    let result = match value {
        Finalized::NaR => (default_nan(format), Flags::NV),
        Finalized::Invalid => (default_nan(format), Flags::empty()),
        Finalized::NaN { sign, payload } => (nan(format, *sign, *payload), Flags::empty()),
        Finalized::Infinity { sign } => (infinity(format, *sign), Flags::empty()),
        Finalized::Zero(zero) => {
            let sign = match zero {
                ZeroSign::Positive => false,
                ZeroSign::Negative => true,
                ZeroSign::Cancelled => {
                    rounding.cancelled == CancelledZero::Ieee && rounding.mode == RoundingMode::Down
                }
            };
            (sign_bit(format, sign), Flags::empty())
        }
        Finalized::Finite(exact) => round_exact(exact, format, rounding),
    };
    trace!("round_ieee: {:?} to {:?} ({:?}) -> {:#X} {:?}", value, format, rounding, result.0, result.1);
    result
}

fn fields(format: Format) -> (u32, u32) {
    match format {
        Format::Ieee { exponent_bits, fraction_bits } => (exponent_bits, fraction_bits),
        Format::Posit { .. } => unreachable!("IEEE rounding to a posit format"),
    }
}

fn sign_bit(format: Format, sign: bool) -> u64 {
    u64::from(sign) << (format.width() - 1)
}

pub(crate) fn infinity(format: Format, sign: bool) -> u64 {
    let (exponent_bits, fraction_bits) = fields(format);
    sign_bit(format, sign) | low_mask(exponent_bits) << fraction_bits
}

/// The largest finite value of `format`.
fn max_finite(format: Format, sign: bool) -> u64 {
    let (_, fraction_bits) = fields(format);
    (infinity(format, sign) - (1 << fraction_bits)) | low_mask(fraction_bits)
}

/// A quiet NaN carrying the top bits of a left-aligned `payload`.
pub(crate) fn nan(format: Format, sign: bool, payload: u64) -> u64 {
    let (_, fraction_bits) = fields(format);
    let payload_bits = fraction_bits - 1;
    let payload = if payload_bits == 0 { 0 } else { payload >> (64 - payload_bits) };
    infinity(format, sign) | 1 << payload_bits | payload
}

/// The quiet NaN produced by invalid operations.
pub(crate) fn default_nan(format: Format) -> u64 {
    nan(format, false, 0)
}

/// Rounds the finite non-zero value `exact` to `format`.
///
/// This implements the whole normal/subnormal/overflow logic and is shared
/// by the input quantizer and the final rounder.
pub(crate) fn round_exact(exact: &Exact, format: Format, rounding: IeeeRounding) -> (u64, Flags) {
    let (_, fraction_bits) = fields(format);
    let precision = i64::from(fraction_bits) + 1;
    let emin = format.emin();
    let sign = exact.sign;

    // Value consisting of nothing but a sticky bit: stands in for something
    // positive and far below the smallest subnormal.
    let (significand, exponent) = if exact.significand.is_zero() {
        (BigUint::from(1u32), cmp::min(exact.exponent, emin - precision) - 2)
    } else {
        (exact.significand.clone(), exact.exponent)
    };

    let top = exponent + significand.bits() as i64 - 1;
    // Weight of the result's lsb: full precision, but never below the
    // subnormal quantum.
    let quantum = cmp::max(top - (precision - 1), emin - (precision - 1));
    let (mut kept, bits) = align(&significand, exponent, quantum, exact.sticky);
    let odd = kept.bit(0);
    if bits.round_up(rounding.mode, sign, odd) {
        kept += 1u32;
    }

    let mut quantum = quantum;
    if kept.bits() as i64 > precision {
        // Rounding carried out of the top: 0b111..1 + 1 = 0b1000..0
        kept >>= 1;
        quantum += 1;
    }

    let mut flags = Flags::empty();
    let inexact = !bits.is_exact();
    if inexact {
        flags |= Flags::NX;
    }

    let tiny = match rounding.tininess {
        Tininess::BeforeRounding => top < emin,
        Tininess::AfterRounding => {
            if top >= emin {
                false
            } else if top < emin - 1 {
                true
            } else {
                // Only a carry into 2^emin can rescue a value just below it
                let (mut unbounded, ubits) = align(&significand, exponent, top - (precision - 1), exact.sticky);
                if ubits.round_up(rounding.mode, sign, unbounded.bit(0)) {
                    unbounded += 1u32;
                }
                unbounded.bits() as i64 <= precision
            }
        }
    };
    if tiny && inexact {
        flags |= Flags::UF;
    }

    if kept.is_zero() {
        return (sign_bit(format, sign), flags);
    }

    let normal = kept.bits() as i64 == precision;
    let msb = quantum + kept.bits() as i64 - 1;
    if msb > format.emax() {
        let to_infinity = match rounding.mode {
            RoundingMode::Nearest => true,
            RoundingMode::Zero => false,
            RoundingMode::Up => !sign,
            RoundingMode::Down => sign,
        };
        let bits = if to_infinity { infinity(format, sign) } else { max_finite(format, sign) };
        return (bits, flags | Flags::OF | Flags::NX);
    }

    // `kept` has at most `precision <= 62` bits here
    let kept = kept.to_u64().unwrap_or(0);
    let raw_exp = if normal { (quantum + precision - 1 + format.bias()) as u64 } else { 0 };
    let fraction = kept & low_mask(fraction_bits);
    (sign_bit(format, sign) | raw_exp << fraction_bits | fraction, flags)
}

/// Rescales `significand * 2^exponent` so that its lsb has weight
/// `2^quantum`, splitting off whatever falls below.
fn align(significand: &BigUint, exponent: i64, quantum: i64, sticky: bool) -> (BigUint, RoundBits) {
    if quantum >= exponent {
        RoundBits::split(significand, (quantum - exponent) as u64, sticky)
    } else {
        let bits = RoundBits {
            guard: false,
            round: false,
            sticky,
        };
        (significand << (exponent - quantum) as usize, bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exact(sign: bool, exponent: i64, significand: u64) -> Exact {
        Exact {
            sign,
            exponent,
            significand: BigUint::from(significand),
            sticky: false,
        }
    }

    fn rne(x: &Exact, format: Format) -> (u64, Flags) {
        round_exact(x, format, RoundingMode::Nearest.into())
    }

    #[test]
    fn special_encodings() {
        assert_eq!(infinity(Format::F32, false), 0x7f80_0000);
        assert_eq!(infinity(Format::F16, true), 0xfc00);
        assert_eq!(max_finite(Format::F32, false), 0x7f7f_ffff);
        assert_eq!(max_finite(Format::F64, true), 0xffef_ffff_ffff_ffff);
        assert_eq!(default_nan(Format::F32), 0x7fc0_0000);
        assert_eq!(default_nan(Format::F64), 0x7ff8_0000_0000_0000);
        assert_eq!(nan(Format::F32, true, 1 << 63), 0xffe0_0000);
        // payload bits below the target's payload field are lost
        assert_eq!(nan(Format::F16, false, 1 << 63 | 1), 0x7e00 | 0x100);
    }

    #[test]
    fn exact_values() {
        assert_eq!(rne(&exact(false, 0, 1), Format::F32), (0x3f80_0000, Flags::empty()));
        assert_eq!(rne(&exact(true, -1, 3), Format::F32), (0xbfc0_0000, Flags::empty()));
        assert_eq!(rne(&exact(false, -149, 1), Format::F32), (0x0000_0001, Flags::empty()));
        assert_eq!(rne(&exact(false, 104, 0xff_ffff), Format::F32), (0x7f7f_ffff, Flags::empty()));
    }

    #[test]
    fn ties_to_even() {
        // 1 + 2^-24 is halfway between 1 and 1 + 2^-23
        let x = exact(false, -24, (1 << 24) | 1);
        assert_eq!(rne(&x, Format::F32), (0x3f80_0000, Flags::NX));
        // 1 + 3 * 2^-24 is halfway between 1 + 2^-23 and 1 + 2^-22
        let x = exact(false, -24, (1 << 24) | 3);
        assert_eq!(rne(&x, Format::F32), (0x3f80_0002, Flags::NX));
    }

    #[test]
    fn carry_out_of_significand() {
        // 2 - 2^-25 rounds up to 2
        let x = exact(false, -25, (1 << 26) - 1);
        assert_eq!(rne(&x, Format::F32), (0x4000_0000, Flags::NX));
    }

    #[test]
    fn directed_modes() {
        let x = exact(false, -30, (1 << 30) + 1);
        assert_eq!(round_exact(&x, Format::F32, RoundingMode::Up.into()).0, 0x3f80_0001);
        assert_eq!(round_exact(&x, Format::F32, RoundingMode::Down.into()).0, 0x3f80_0000);
        let x = exact(true, -30, (1 << 30) + 1);
        assert_eq!(round_exact(&x, Format::F32, RoundingMode::Down.into()).0, 0xbf80_0001);
        assert_eq!(round_exact(&x, Format::F32, RoundingMode::Zero.into()).0, 0xbf80_0000);
    }

    #[test]
    fn overflow() {
        let huge = exact(false, 128, 1);
        assert_eq!(rne(&huge, Format::F32), (0x7f80_0000, Flags::OF | Flags::NX));
        assert_eq!(
            round_exact(&huge, Format::F32, RoundingMode::Zero.into()),
            (0x7f7f_ffff, Flags::OF | Flags::NX)
        );
        let neg = exact(true, 128, 1);
        assert_eq!(round_exact(&neg, Format::F32, RoundingMode::Up.into()).0, 0xff7f_ffff);
        assert_eq!(round_exact(&neg, Format::F32, RoundingMode::Down.into()).0, 0xff80_0000);
        // rounds up past the largest finite number
        let x = exact(false, 103, (1 << 25) - 1);
        assert_eq!(rne(&x, Format::F32), (0x7f80_0000, Flags::OF | Flags::NX));
    }

    #[test]
    fn underflow() {
        // half the smallest subnormal ties to even zero
        let x = exact(false, -150, 1);
        assert_eq!(rne(&x, Format::F32), (0, Flags::UF | Flags::NX));
        let x = exact(true, -150, 3);
        assert_eq!(rne(&x, Format::F32), (0x8000_0002, Flags::UF | Flags::NX));
        // exact subnormal: no underflow
        let x = exact(false, -149, 5);
        assert_eq!(rne(&x, Format::F32), (5, Flags::empty()));
    }

    #[test]
    fn tininess_detection() {
        // (2^25 - 1) * 2^-151 rounds to 2^-126 even with an unbounded
        // exponent range: tiny only before rounding
        let x = exact(false, -151, (1 << 25) - 1);
        let after = round_exact(&x, Format::F32, RoundingMode::Nearest.into());
        assert_eq!(after, (0x0080_0000, Flags::NX));
        let before = IeeeRounding {
            tininess: Tininess::BeforeRounding,
            ..IeeeRounding::default()
        };
        assert_eq!(round_exact(&x, Format::F32, before), (0x0080_0000, Flags::UF | Flags::NX));
    }

    #[test]
    fn sticky_only() {
        let x = Exact {
            sign: true,
            exponent: -400,
            significand: BigUint::zero(),
            sticky: true,
        };
        assert_eq!(rne(&x, Format::F32), (0x8000_0000, Flags::UF | Flags::NX));
        assert_eq!(round_exact(&x, Format::F32, RoundingMode::Down.into()).0, 0x8000_0001);
    }

    #[test]
    fn zero_signs() {
        let cancelled = Finalized::Zero(ZeroSign::Cancelled);
        assert_eq!(round_ieee(&cancelled, Format::F32, RoundingMode::Nearest).unwrap().0, 0);
        assert_eq!(round_ieee(&cancelled, Format::F32, RoundingMode::Down).unwrap().0, 0x8000_0000);
        let always_positive = IeeeRounding {
            mode: RoundingMode::Down,
            cancelled: CancelledZero::Positive,
            ..IeeeRounding::default()
        };
        assert_eq!(round_ieee(&cancelled, Format::F32, always_positive).unwrap().0, 0);
        assert_eq!(round_ieee(&Finalized::Zero(ZeroSign::Negative), Format::F16, RoundingMode::Up).unwrap().0, 0x8000);
    }

    #[test]
    fn invalid_results() {
        assert_eq!(round_ieee(&Finalized::NaR, Format::F32, RoundingMode::Nearest), Ok((0x7fc0_0000, Flags::NV)));
        assert_eq!(round_ieee(&Finalized::Invalid, Format::F64, RoundingMode::Nearest).unwrap().0, 0x7ff8_0000_0000_0000);
        let nan = Finalized::NaN { sign: true, payload: 0xdead << 48 };
        assert_eq!(round_ieee(&nan, Format::F32, RoundingMode::Nearest).unwrap().0, 0xffc0_0000 | 0xdead << 6);
    }

    #[test]
    fn posit_targets_are_rejected() {
        let one = Finalized::from(crate::Canonical::one());
        assert_eq!(round_ieee(&one, Format::P32, RoundingMode::Nearest), Err(Error::ModeMismatch));
    }
}
