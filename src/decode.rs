//! The canonical decoder: raw IEEE or posit bit patterns to [`Canonical`].
//!
//! Decoding is exact and total; every bit pattern of the declared width maps
//! to exactly one canonical value.

use crate::{Canonical, Error, Format};
use num_bigint::BigUint;

/// Decodes `bits` as a value of `format`.
///
/// Fails only if `bits` does not fit in the format's width.
pub fn decode(bits: u64, format: Format) -> Result<Canonical, Error> {
    let bits = format.check(bits)?;
    let value = match format {
        Format::Ieee { exponent_bits, fraction_bits } => {
            let sign = bits >> (exponent_bits + fraction_bits) & 1 != 0;
            let raw_exp = (bits >> fraction_bits) & low_mask(exponent_bits);
            let fraction = bits & low_mask(fraction_bits);
            classify_ieee(sign, raw_exp, fraction, format)
        }
        Format::Posit { bits: n, es } => decode_posit(bits, n, es),
    };
    trace!("decode: {:#X} as {:?} -> {:?}", bits, format, value);
    Ok(value)
}

/// Mask of the lowest `bits` bits.
pub(crate) fn low_mask(bits: u32) -> u64 {
    if bits >= 64 { !0 } else { (1 << bits) - 1 }
}

/// Builds the canonical value of an IEEE number from its raw fields.
///
/// `raw_exp` is the biased exponent field, `fraction` the trailing
/// significand field (without the hidden bit).
pub(crate) fn classify_ieee(sign: bool, raw_exp: u64, fraction: u64, format: Format) -> Canonical {
    let (exponent_bits, fraction_bits) = match format {
        Format::Ieee { exponent_bits, fraction_bits } => (exponent_bits, fraction_bits),
        Format::Posit { .. } => unreachable!("IEEE fields of a posit format"),
    };

    if raw_exp == 0 {
        // Zero or subnormal: no hidden bit, exponent pinned to emin
        let lsb = format.emin() - i64::from(fraction_bits);
        Canonical::finite(sign, lsb, BigUint::from(fraction))
    } else if raw_exp == low_mask(exponent_bits) {
        if fraction == 0 {
            Canonical::infinity(sign)
        } else {
            let payload_bits = fraction_bits - 1;
            let quiet = fraction >> payload_bits & 1 != 0;
            let payload = fraction & low_mask(payload_bits);
            let payload = if payload_bits == 0 { 0 } else { payload << (64 - payload_bits) };
            Canonical::nan(sign, quiet, payload)
        }
    } else {
        let lsb = raw_exp as i64 - format.bias() - i64::from(fraction_bits);
        Canonical::finite(sign, lsb, BigUint::from(fraction | 1 << fraction_bits))
    }
}

/// Measures the regime of a posit.
///
/// `body` holds the `len` bits following the sign bit (of the absolute
/// value), right-aligned. Returns the number of bits the regime occupies
/// (including its terminating bit, if there is room for one) and the regime
/// value `k`:
///
/// ```notrust
/// 0001... -> k = -3        1110... -> k = 2
/// ```
pub(crate) fn regime(body: u64, len: u32) -> (u32, i64) {
    // Left-align so the run starts at the msb
    let aligned = body << (64 - len);
    let (run, k) = if aligned >> 63 == 1 {
        let run = aligned.leading_ones().min(len);
        (run, i64::from(run) - 1)
    } else {
        let run = aligned.leading_zeros().min(len);
        (run, -i64::from(run))
    };
    ((run + 1).min(len), k)
}

fn decode_posit(bits: u64, n: u32, es: u32) -> Canonical {
    let mask = low_mask(n);
    let nar = 1 << (n - 1);
    if bits == 0 {
        return Canonical::zero(false);
    }
    if bits == nar {
        return Canonical::nar();
    }

    // Fields are defined on the two's complement absolute value
    let sign = bits & nar != 0;
    let abs = if sign { bits.wrapping_neg() & mask } else { bits };

    let len = n - 1;
    let (regime_len, k) = regime(abs, len);
    let remaining = len - regime_len;
    let rest = abs & low_mask(remaining);

    // Exponent bits cut off at the end of the encoding are implicit zeros
    let (exponent, fraction_bits, fraction) = if remaining >= es {
        let fraction_bits = remaining - es;
        (rest >> fraction_bits, fraction_bits, rest & low_mask(fraction_bits))
    } else {
        (rest << (es - remaining), 0, 0)
    };

    let scale = (k << es) + exponent as i64;
    let significand = BigUint::from(fraction | 1 << fraction_bits);
    Canonical::finite(sign, scale - i64::from(fraction_bits), significand)
}
