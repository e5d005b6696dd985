//! The posit final rounder.
//!
//! Posits have a single rounding mode (nearest, ties to even on the bit
//! pattern), never round a non-zero value to zero or NaR, and saturate at
//! `maxpos` instead of overflowing. The number of fraction bits a value gets
//! depends on how long its regime is, so the rounding position is only known
//! after the regime and exponent have been laid out.

use crate::decode::low_mask;
use crate::quire::{Exact, Finalized};
use crate::round::RoundBits;
use crate::{Error, Format, RoundingMode};
use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};

/// Rounds a finalized quire to the posit `format`.
///
/// Every kind of invalid result (NaR, NaN, invalid operations, infinities)
/// becomes NaR, the pattern with only the sign bit set. Fails with
/// [`Error::ModeMismatch`] if `format` is an IEEE format.
pub fn round_posit(value: &Finalized, format: Format) -> Result<u64, Error> {
    match format {
        Format::Posit { bits, es } => Ok(round_finalized(value, bits, es)),
        Format::Ieee { .. } => Err(Error::ModeMismatch),
    }
}

/// Rounds to a posit of `bits` bits with `es` exponent bits.
pub(crate) fn round_finalized(value: &Finalized, bits: u32, es: u32) -> u64 {
    let result = match value {
        Finalized::NaR | Finalized::NaN { .. } | Finalized::Invalid | Finalized::Infinity { .. } => nar(bits),
        Finalized::Zero(_) => 0,
        Finalized::Finite(exact) => encode(exact, bits, es),
    };
    trace!("round_posit: {:?} to posit<{}, {}> -> {:#X}", value, bits, es, result);
    result
}

pub(crate) fn nar(bits: u32) -> u64 {
    1 << (bits - 1)
}

fn encode(exact: &Exact, bits: u32, es: u32) -> u64 {
    let len = bits - 1;
    let max_scale = i64::from(bits - 2) << es;
    let maxpos = low_mask(len);
    let minpos = 1;

    let magnitude = if exact.significand.is_zero() {
        // Only a sticky bit is left, far below minpos
        minpos
    } else {
        let scale = exact.msb_exponent();
        if scale >= max_scale {
            maxpos
        } else if scale < -max_scale {
            minpos
        } else {
            encode_magnitude(exact, scale, len, es)
        }
    };

    if exact.sign {
        magnitude.wrapping_neg() & low_mask(bits)
    } else {
        magnitude
    }
}

/// Lays out regime, exponent and fraction of `|exact|` and rounds the
/// result to `len` bits. `scale` must be in `-max_scale..max_scale`.
fn encode_magnitude(exact: &Exact, scale: i64, len: u32, es: u32) -> u64 {
    // Floor division: the exponent field is always non-negative
    let k = scale >> es;
    let exponent = (scale - (k << es)) as u64;

    let (regime, regime_len) = if k >= 0 {
        // k + 1 ones, terminated by a zero
        (low_mask(k as u32 + 1) << 1, k as u64 + 2)
    } else {
        // -k zeros, terminated by a one
        (1, (-k) as u64 + 1)
    };

    let fraction_bits = exact.significand.bits() - 1;
    let fraction = &exact.significand - (BigUint::one() << fraction_bits as usize);
    let body = (((BigUint::from(regime) << es as usize) | BigUint::from(exponent)) << fraction_bits as usize) | fraction;
    let body_len = regime_len + u64::from(es) + fraction_bits;

    let rounded = if body_len > u64::from(len) {
        let (mut kept, round) = RoundBits::split(&body, body_len - u64::from(len), exact.sticky);
        if round.round_up(RoundingMode::Nearest, false, kept.bit(0)) {
            kept += 1u32;
        }
        kept
    } else {
        // Pad with zeros; an incoming sticky bit alone never rounds up
        body << (u64::from(len) - body_len) as usize
    };

    // The regime leaves room for at least one zero bit below maxpos, so the
    // increment cannot carry into the sign
    rounded.to_u64().unwrap_or(low_mask(len))
}
