//! The banked quire accumulator.
//!
//! A quire is a wide two's complement fixed-point register split into
//! [`BANK_BITS`]-wide banks. Every partial product is added in exactly, at
//! the bank offset given by its exponent, so the register always holds the
//! exact sum of everything accumulated so far. Integer addition is
//! associative and commutative, which makes the final contents (and the
//! rounded result) independent of the order the products arrived in.
//!
//! ```notrust
//!    bank[banks-1]                bank[1]         bank[0]
//! +-+-------------+-- ... --+---------------+---------------+
//! |S|             |         |               |               |
//! +-+-------------+-- ... --+---------------+---------------+
//!  ^ sign                                         lsb: 2^base_exponent
//! ```
//!
//! Special values do not touch the banks; they are tracked next to them and
//! resolved in [`Quire::finalize`].

use crate::format::{QuireLayout, BANK_BITS};
use crate::product::PartialProduct;
use crate::round::RoundBits;
use crate::{Canonical, Class, Error, Flags};
use num_bigint::BigUint;
use num_traits::Zero;
use std::cmp;

/// The sign a zero result of a reduction gets.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ZeroSign {
    /// Nothing was accumulated, or only `+0` terms.
    Positive,
    /// Only `-0` terms were accumulated.
    Negative,
    /// Non-zero terms cancelled exactly, or zeros of both signs met. The
    /// sign depends on the rounding mode.
    Cancelled,
}

/// The exact non-zero value held by a quire, normalized.
///
/// Represents `(-1)^sign * significand * 2^exponent`, with `significand`
/// odd. If `sticky` is set, the true magnitude is slightly larger: some
/// non-zero bits fell below the quire's lsb. A zero `significand` with
/// `sticky` set means everything that was left fell off the bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exact {
    pub sign: bool,
    pub exponent: i64,
    pub significand: BigUint,
    pub sticky: bool,
}

impl Exact {
    /// Exponent of the most significant set bit.
    pub fn msb_exponent(&self) -> i64 {
        self.exponent + self.significand.bits() as i64 - 1
    }

    /// Guard, round and sticky bits left over when the significand is cut
    /// down to `precision` bits.
    pub fn round_bits(&self, precision: u32) -> RoundBits {
        let drop = self.significand.bits().saturating_sub(u64::from(precision));
        RoundBits::split(&self.significand, drop, self.sticky).1
    }
}

/// What a quire resolves to once all products are in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finalized {
    /// At least one NaR went in.
    NaR,
    /// A quiet NaN. When several went in, the one with the largest payload
    /// (ties broken by sign) wins, so that the result is order independent.
    NaN { sign: bool, payload: u64 },
    /// An invalid operation happened (`0 * Inf`, `Inf - Inf`, ...).
    Invalid,
    Infinity { sign: bool },
    Zero(ZeroSign),
    Finite(Exact),
}

impl From<Canonical> for Finalized {
    /// A single value, as if it was the only thing in a quire.
    fn from(value: Canonical) -> Self {
        match value.class() {
            Class::NaR => Finalized::NaR,
            Class::NaN { payload, .. } => Finalized::NaN { sign: value.sign, payload },
            Class::Infinity => Finalized::Infinity { sign: value.sign },
            Class::Zero if value.sign => Finalized::Zero(ZeroSign::Negative),
            Class::Zero => Finalized::Zero(ZeroSign::Positive),
            Class::Finite => Finalized::Finite(Exact {
                sign: value.sign,
                exponent: value.exponent(),
                significand: value.significand().clone(),
                sticky: false,
            }),
        }
    }
}

/// An exact accumulator for the partial products of one reduction.
#[derive(Debug, Clone)]
pub struct Quire {
    layout: QuireLayout,
    banks: Vec<u64>,
    /// Some non-zero bits fell below bank 0. The banks hold the floor of the
    /// exact sum, so this always means the value is a little above them.
    sticky: bool,
    nar: bool,
    invalid: bool,
    /// `(payload, sign)` of the NaN with the largest payload seen so far.
    nan: Option<(u64, bool)>,
    pos_infinity: bool,
    neg_infinity: bool,
    /// `None` until the first term arrives.
    zero: Option<ZeroSign>,
}

impl Quire {
    /// Creates an empty quire with the given geometry.
    pub fn new(layout: QuireLayout) -> Self {
        Self {
            layout,
            banks: vec![0; layout.banks],
            sticky: false,
            nar: false,
            invalid: false,
            nan: None,
            pos_infinity: false,
            neg_infinity: false,
            zero: None,
        }
    }

    pub fn layout(&self) -> QuireLayout {
        self.layout
    }

    /// The raw banks, least significant first.
    pub fn banks(&self) -> &[u64] {
        &self.banks
    }

    /// Whether the banks, read as one two's complement integer, are negative.
    pub fn is_negative(&self) -> bool {
        match self.banks.last() {
            Some(top) => top >> (BANK_BITS - 1) != 0,
            None => false,
        }
    }

    /// Adds a partial product.
    ///
    /// Fails with [`Error::QuireOverflow`] if the product (or the carry it
    /// causes) does not fit the declared width. The quire is left unchanged
    /// in that case.
    pub fn accumulate(&mut self, product: &PartialProduct) -> Result<(), Error> {
        match product {
            PartialProduct::NaR => self.nar = true,
            PartialProduct::Invalid => self.invalid = true,
            PartialProduct::NaN { sign, payload } => {
                let candidate = (*payload, *sign);
                self.nan = Some(match self.nan {
                    Some(current) => cmp::max(current, candidate),
                    None => candidate,
                });
            }
            PartialProduct::Infinity { sign: false } => self.pos_infinity = true,
            PartialProduct::Infinity { sign: true } => self.neg_infinity = true,
            PartialProduct::Zero { sign } => {
                self.zero = Some(match (self.zero, sign) {
                    (None, false) | (Some(ZeroSign::Positive), false) => ZeroSign::Positive,
                    (None, true) | (Some(ZeroSign::Negative), true) => ZeroSign::Negative,
                    _ => ZeroSign::Cancelled,
                });
            }
            PartialProduct::Finite { sign, exponent, significand } => {
                self.add(*sign, *exponent, significand)?;
                self.zero = Some(ZeroSign::Cancelled);
            }
        }
        Ok(())
    }

    fn add(&mut self, sign: bool, exponent: i64, significand: &BigUint) -> Result<(), Error> {
        let offset = exponent - self.layout.base_exponent;
        let (magnitude, offset, lost) = if offset < 0 {
            let drop = offset.unsigned_abs();
            let lost = significand.trailing_zeros().map_or(false, |tz| tz < drop);
            let mut magnitude = significand >> drop as usize;
            // The banks hold the floor of the exact sum, so a negative term
            // takes away its rounded up magnitude
            if sign && lost {
                magnitude += 1u32;
            }
            (magnitude, 0, lost)
        } else {
            (significand.clone(), offset as u64, false)
        };
        if magnitude.is_zero() {
            self.sticky |= lost;
            return Ok(());
        }

        // The topmost quire bit is the sign and must not be reached
        if offset + magnitude.bits() >= self.layout.width() {
            return Err(Error::QuireOverflow);
        }

        let bank = (offset / u64::from(BANK_BITS)) as usize;
        let shift = (offset % u64::from(BANK_BITS)) as usize;
        let digits = (magnitude << shift).to_u64_digits();

        let was_negative = self.is_negative();
        if sign {
            self.sub_at(bank, &digits);
        } else {
            self.add_at(bank, &digits);
        }

        // Two's complement overflow: adding a positive value made a
        // non-negative quire negative, or subtracting one did the reverse
        if self.is_negative() != was_negative && was_negative == sign {
            if sign {
                self.add_at(bank, &digits);
            } else {
                self.sub_at(bank, &digits);
            }
            return Err(Error::QuireOverflow);
        }

        self.sticky |= lost;
        trace!("quire += {}{:#X} << {}: {:X?}", if sign { "-" } else { "" }, significand, offset, self.banks);
        Ok(())
    }

    /// Adds `digits` starting at bank `start`, rippling the carry upwards
    /// only as far as it goes. A carry out of the top bank wraps.
    fn add_at(&mut self, start: usize, digits: &[u64]) {
        let mut carry = false;
        let mut i = start;
        for &digit in digits {
            let (sum, c1) = self.banks[i].overflowing_add(digit);
            let (sum, c2) = sum.overflowing_add(u64::from(carry));
            self.banks[i] = sum;
            carry = c1 || c2;
            i += 1;
        }
        while carry && i < self.banks.len() {
            let (sum, c) = self.banks[i].overflowing_add(1);
            self.banks[i] = sum;
            carry = c;
            i += 1;
        }
    }

    /// Subtracts `digits` starting at bank `start`, rippling the borrow.
    fn sub_at(&mut self, start: usize, digits: &[u64]) {
        let mut borrow = false;
        let mut i = start;
        for &digit in digits {
            let (diff, b1) = self.banks[i].overflowing_sub(digit);
            let (diff, b2) = diff.overflowing_sub(u64::from(borrow));
            self.banks[i] = diff;
            borrow = b1 || b2;
            i += 1;
        }
        while borrow && i < self.banks.len() {
            let (diff, b) = self.banks[i].overflowing_sub(1);
            self.banks[i] = diff;
            borrow = b;
            i += 1;
        }
    }

    /// Reads out the accumulated value without rounding it, consuming the
    /// quire.
    ///
    /// Specials take precedence in this order: NaR, NaN, invalid products,
    /// infinities. Infinities of both signs are an invalid operation
    /// (`Inf - Inf`) and raise NV. The returned flags only cover what is
    /// detected here; exceptions raised by the products are the caller's.
    pub fn finalize(self) -> (Finalized, Flags) {
        let both_infinities = self.pos_infinity && self.neg_infinity;
        let flags = if both_infinities && !self.nar && self.nan.is_none() {
            Flags::NV
        } else {
            Flags::empty()
        };

        let result = if self.nar {
            Finalized::NaR
        } else if let Some((payload, sign)) = self.nan {
            Finalized::NaN { sign, payload }
        } else if self.invalid || both_infinities {
            Finalized::Invalid
        } else if self.pos_infinity || self.neg_infinity {
            Finalized::Infinity { sign: self.neg_infinity }
        } else {
            self.finalize_finite()
        };

        debug!("finalize: {:?} {:?}", result, flags);
        (result, flags)
    }

    fn finalize_finite(&self) -> Finalized {
        // The exact value is `banks + d`, `d` non-zero iff the sticky bit is
        // set and below one lsb unless several terms were cut off. For a
        // negative total the magnitude is `-banks - d`: `!banks + 1` if
        // exact, `!banks` plus a sticky remainder otherwise.
        let sign = self.is_negative();
        let magnitude: Vec<u64> = if sign {
            let mut carry = !self.sticky;
            self.banks
                .iter()
                .map(|bank| {
                    let (value, c) = (!bank).overflowing_add(u64::from(carry));
                    carry = c;
                    value
                })
                .collect()
        } else {
            self.banks.clone()
        };

        // Leading and trailing zero detection works on whole banks first
        let lowest = magnitude.iter().position(|bank| *bank != 0);
        let highest = magnitude.iter().rposition(|bank| *bank != 0);
        let (lowest, highest) = match (lowest, highest) {
            (Some(lowest), Some(highest)) => (lowest, highest),
            _ if self.sticky => {
                return Finalized::Finite(Exact {
                    sign,
                    exponent: self.layout.base_exponent,
                    significand: BigUint::zero(),
                    sticky: true,
                });
            }
            _ => return Finalized::Zero(self.zero.unwrap_or(ZeroSign::Positive)),
        };

        let tz = magnitude[lowest].trailing_zeros();
        let significand = BigUint::from_slice(&to_u32_digits(&magnitude[lowest..=highest])) >> tz as usize;
        let exponent = self.layout.base_exponent + (lowest as i64 * i64::from(BANK_BITS)) + i64::from(tz);

        Finalized::Finite(Exact {
            sign,
            exponent,
            significand,
            sticky: self.sticky,
        })
    }
}

fn to_u32_digits(banks: &[u64]) -> Vec<u32> {
    banks
        .iter()
        .flat_map(|bank| vec![*bank as u32, (bank >> 32) as u32])
        .collect()
}
