//! The input quantizer: snaps operands onto the lattice of an IEEE format.
//!
//! Only IEEE-Compat reductions run their operands through here. Afterwards
//! every operand is exactly representable in the target format, just as if
//! it had been loaded into a scalar IEEE register.

use crate::canonical::{Canonical, Class};
use crate::decode::{decode, low_mask};
use crate::ieee::{self, IeeeRounding};
use crate::quire::Exact;
use crate::{Error, Flags, Format};

/// Rounds `value` to the IEEE `target` format.
///
/// * NaR becomes the default quiet NaN and raises NV.
/// * Signaling NaNs are quieted and raise NV; NaN payloads keep as many of
///   their most significant bits as the target can hold.
/// * Zeros become `+0`.
/// * Finite values are rounded with `rounding` and may overflow to infinity
///   (OF, NX) or underflow to a subnormal or zero (UF, NX).
///
/// Operands that already are in `target` don't need to go through this;
/// the pipeline passes them on unchanged. Fails with [`Error::ModeMismatch`]
/// if `target` is a posit format.
pub fn quantize<R: Into<IeeeRounding>>(value: &Canonical, target: Format, rounding: R) -> Result<(Canonical, Flags), Error> {
    if !target.is_ieee() {
        return Err(Error::ModeMismatch);
    }
    let rounding = rounding.into();
    let payload_mask = !low_mask(64 - target.payload_bits());

    let result = match value.class() {
        Class::NaR => (Canonical::default_nan(), Flags::NV),
        Class::NaN { quiet, payload } => {
            let flags = if quiet { Flags::empty() } else { Flags::NV };
            (Canonical::nan(value.sign, true, payload & payload_mask), flags)
        }
        Class::Zero => (Canonical::zero(false), Flags::empty()),
        Class::Infinity => (value.clone(), Flags::empty()),
        Class::Finite => {
            let exact = Exact {
                sign: value.sign,
                exponent: value.exponent(),
                significand: value.significand().clone(),
                sticky: false,
            };
            let (bits, flags) = ieee::round_exact(&exact, target, rounding);
            (decode(bits, target)?, flags)
        }
    };

    trace!("quantize: {:?} to {:?} -> {:?} {:?}", value, target, result.0, result.1);
    Ok(result)
}
