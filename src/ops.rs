//! Single arithmetic operations.
//!
//! Each operation rounds exactly once, in every mode: `add`, `sub`, `mul`
//! and `fma` run through a quire of their own, `div` produces its quotient
//! with enough extra bits and a sticky bit to round correctly.

use crate::canonical::Class;
use crate::quire::{Exact, Finalized, ZeroSign};
use crate::reduction::Reduction;
use crate::{decode, Canonical, Config, Error, Flags, Mode, Outcome};
use num_traits::Zero;

/// Number of quotient bits computed before rounding. Comfortably more than
/// the precision of any supported format plus guard and round bits.
const QUOTIENT_BITS: u64 = 128;

/// `a + b`
pub fn add(config: Config, a: u64, b: u64) -> Result<Outcome, Error> {
    let mut op = Reduction::fused(config);
    op.push(a)?;
    op.push(b)?;
    Ok(op.finish())
}

/// `a - b`
pub fn sub(config: Config, a: u64, b: u64) -> Result<Outcome, Error> {
    let mut op = Reduction::fused(config);
    op.push(a)?;
    op.push_term(-decode(b, config.operands())?)?;
    Ok(op.finish())
}

/// `a * b`
pub fn mul(config: Config, a: u64, b: u64) -> Result<Outcome, Error> {
    let mut op = Reduction::fused(config);
    op.push_product(a, b)?;
    Ok(op.finish())
}

/// `a * b + c`, with a single rounding.
pub fn fma(config: Config, a: u64, b: u64, c: u64) -> Result<Outcome, Error> {
    let mut op = Reduction::fused(config);
    op.push_product(a, b)?;
    op.push(c)?;
    Ok(op.finish())
}

/// `a / b`
///
/// Dividing a finite non-zero value by zero raises DZ and returns an
/// infinity (NaR in posit mode). `0 / 0` and `Inf / Inf` are invalid.
pub fn div(config: Config, a: u64, b: u64) -> Result<Outcome, Error> {
    let (a, fa) = config.prepare(decode(a, config.operands())?)?;
    let (b, fb) = config.prepare(decode(b, config.operands())?)?;
    let mut flags = fa | fb;
    if a.is_signaling() || b.is_signaling() {
        flags |= Flags::NV;
    }

    let sign = a.sign != b.sign;
    let zero = if sign { ZeroSign::Negative } else { ZeroSign::Positive };
    let quotient = match (a.class(), b.class()) {
        (Class::NaR, _) | (_, Class::NaR) => Finalized::NaR,
        (Class::NaN { payload, .. }, _) => Finalized::NaN { sign: a.sign, payload },
        (_, Class::NaN { payload, .. }) => Finalized::NaN { sign: b.sign, payload },
        (Class::Infinity, Class::Infinity) | (Class::Zero, Class::Zero) => {
            flags |= Flags::NV;
            Finalized::Invalid
        }
        (Class::Infinity, _) => Finalized::Infinity { sign },
        (_, Class::Infinity) | (Class::Zero, _) => Finalized::Zero(zero),
        (Class::Finite, Class::Zero) => {
            flags |= Flags::DZ;
            Finalized::Infinity { sign }
        }
        (Class::Finite, Class::Finite) => Finalized::Finite(divide(&a, &b)),
    };

    let (bits, fr) = config.round(&quotient);
    flags |= fr;
    if config.mode() == Mode::Posit {
        flags = Flags::empty();
    }
    trace!("div: {:?} / {:?} = {:?} -> {:#X} {:?}", a, b, quotient, bits, flags);
    Ok(Outcome {
        bits,
        flags,
        roundings: 1,
    })
}

/// Divides two finite non-zero values, truncating after at least
/// `QUOTIENT_BITS` bits and keeping a sticky bit for the remainder.
fn divide(a: &Canonical, b: &Canonical) -> Exact {
    let (dividend, divisor) = (a.significand(), b.significand());
    let shift = (divisor.bits() + QUOTIENT_BITS).saturating_sub(dividend.bits());
    let dividend = dividend << shift as usize;
    let significand = &dividend / divisor;
    let remainder = &dividend % divisor;
    Exact {
        sign: a.sign != b.sign,
        exponent: a.exponent() - b.exponent() - shift as i64,
        significand,
        sticky: !remainder.is_zero(),
    }
}
