//! The aligner/multiplier: exact products of two canonical operands.
//!
//! Nothing is rounded here. The product of two finite operands is the
//! product of their significands at the sum of their exponents, which the
//! quire then adds in at the right bank offset.

use crate::canonical::{Canonical, Class};
use crate::Flags;
use num_bigint::BigUint;

/// An exact product, or the special value it resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartialProduct {
    /// Signed zero. The sign matters for the sign of an all-zero reduction.
    Zero { sign: bool },
    /// `(-1)^sign * significand * 2^exponent`, with a non-zero significand.
    Finite {
        sign: bool,
        exponent: i64,
        significand: BigUint,
    },
    Infinity { sign: bool },
    /// A quiet NaN (signaling operands have already been quieted and
    /// reported).
    NaN { sign: bool, payload: u64 },
    /// `0 * Inf`. Becomes the default NaN (or NaR) once rounded.
    Invalid,
    NaR,
}

impl PartialProduct {
    /// A single operand entering the quire on its own (multiplied by one).
    pub fn term(value: &Canonical) -> (Self, Flags) {
        exact_product(value, &Canonical::one())
    }

    pub fn is_finite(&self) -> bool {
        match self {
            PartialProduct::Zero { .. } | PartialProduct::Finite { .. } => true,
            _ => false,
        }
    }
}

/// Multiplies `a` and `b` exactly.
///
/// Special operands resolve in this order: NaR beats everything, then NaNs
/// (the left one is preferred; a signaling NaN raises invalid), then
/// `0 * Inf` (invalid), then infinities. Finite operands produce a product
/// that is exact to the last bit.
pub fn exact_product(a: &Canonical, b: &Canonical) -> (PartialProduct, Flags) {
    let sign = a.sign != b.sign;
    let mut flags = Flags::empty();
    if a.is_signaling() || b.is_signaling() {
        flags |= Flags::NV;
    }

    let product = match (a.class(), b.class()) {
        (Class::NaR, _) | (_, Class::NaR) => PartialProduct::NaR,
        (Class::NaN { payload, .. }, _) => PartialProduct::NaN { sign: a.sign, payload },
        (_, Class::NaN { payload, .. }) => PartialProduct::NaN { sign: b.sign, payload },
        (Class::Zero, Class::Infinity) | (Class::Infinity, Class::Zero) => {
            flags |= Flags::NV;
            PartialProduct::Invalid
        }
        (Class::Infinity, _) | (_, Class::Infinity) => PartialProduct::Infinity { sign },
        (Class::Zero, _) | (_, Class::Zero) => PartialProduct::Zero { sign },
        (Class::Finite, Class::Finite) => {
            PartialProduct::Finite {
                sign,
                exponent: a.exponent() + b.exponent(),
                significand: a.significand() * b.significand(),
            }
        }
    };

    trace!("product: {:?} * {:?} = {:?} {:?}", a, b, product, flags);
    (product, flags)
}
