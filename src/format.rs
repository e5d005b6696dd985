//! Format descriptors and the quire geometry derived from them.

use crate::Error;

/// Width of a single quire bank in bits.
pub const BANK_BITS: u32 = 64;

/// Number of carry bits an IEEE-derived quire reserves above the largest
/// possible product, so that at least `2^63` maximal products can be summed.
pub const CARRY_BITS: u32 = 64;

/// Describes a binary floating point format.
///
/// Descriptors are plain values supplied by the caller with every operation;
/// use [`Format::ieee`] and [`Format::posit`] to get validated ones, or one of
/// the predefined constants.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Format {
    /// IEEE 754 binary interchange format with a hidden integer bit.
    Ieee {
        exponent_bits: u32,
        fraction_bits: u32,
    },
    /// Posit with `bits` total bits and an `es` bit exponent field.
    Posit {
        bits: u32,
        es: u32,
    },
}

impl Format {
    /// IEEE binary16.
    pub const F16: Self = Format::Ieee { exponent_bits: 5, fraction_bits: 10 };
    /// bfloat16.
    pub const BF16: Self = Format::Ieee { exponent_bits: 8, fraction_bits: 7 };
    /// IEEE binary32.
    pub const F32: Self = Format::Ieee { exponent_bits: 8, fraction_bits: 23 };
    /// IEEE binary64.
    pub const F64: Self = Format::Ieee { exponent_bits: 11, fraction_bits: 52 };
    /// Standard 8-bit posit.
    pub const P8: Self = Format::Posit { bits: 8, es: 2 };
    /// Standard 16-bit posit.
    pub const P16: Self = Format::Posit { bits: 16, es: 2 };
    /// Standard 32-bit posit.
    pub const P32: Self = Format::Posit { bits: 32, es: 2 };
    /// Standard 64-bit posit.
    pub const P64: Self = Format::Posit { bits: 64, es: 2 };

    /// Creates an IEEE format descriptor.
    ///
    /// The whole encoding has to fit in 64 bits, the exponent field needs
    /// between 2 and 15 bits and there must be at least one fraction bit (so
    /// that NaN and Infinity can be told apart).
    pub fn ieee(exponent_bits: u32, fraction_bits: u32) -> Result<Self, Error> {
        if exponent_bits < 2 || exponent_bits > 15 {
            return Err(Error::InvalidFormat("IEEE exponent field must be 2 to 15 bits"));
        }
        if fraction_bits < 1 {
            return Err(Error::InvalidFormat("IEEE fraction field must not be empty"));
        }
        if 1 + exponent_bits + fraction_bits > 64 {
            return Err(Error::InvalidFormat("IEEE format wider than 64 bits"));
        }
        Ok(Format::Ieee { exponent_bits, fraction_bits })
    }

    /// Creates a posit format descriptor (`3 <= bits <= 64`, `es <= 4`).
    pub fn posit(bits: u32, es: u32) -> Result<Self, Error> {
        if bits < 3 || bits > 64 {
            return Err(Error::InvalidFormat("posit width must be 3 to 64 bits"));
        }
        if es > 4 {
            return Err(Error::InvalidFormat("posit exponent size must be at most 4"));
        }
        Ok(Format::Posit { bits, es })
    }

    /// Total width of an encoded value in bits.
    pub fn width(&self) -> u32 {
        match *self {
            Format::Ieee { exponent_bits, fraction_bits } => 1 + exponent_bits + fraction_bits,
            Format::Posit { bits, .. } => bits,
        }
    }

    pub fn is_ieee(&self) -> bool {
        match self {
            Format::Ieee { .. } => true,
            Format::Posit { .. } => false,
        }
    }

    pub fn is_posit(&self) -> bool {
        !self.is_ieee()
    }

    /// Mask covering all bits of an encoded value.
    pub fn mask(&self) -> u64 {
        match self.width() {
            64 => !0,
            w => (1 << w) - 1,
        }
    }

    /// Checks that `bits` is a valid encoding width-wise.
    pub fn check(&self, bits: u64) -> Result<u64, Error> {
        if bits & !self.mask() != 0 {
            Err(Error::WidthMismatch { width: self.width(), bits })
        } else {
            Ok(bits)
        }
    }

    /// Exponent bias of an IEEE format (0 for posits).
    pub fn bias(&self) -> i64 {
        match *self {
            Format::Ieee { exponent_bits, .. } => (1 << (exponent_bits - 1)) - 1,
            Format::Posit { .. } => 0,
        }
    }

    /// Exponent of the smallest normal number (IEEE) or of `minpos` (posit).
    pub fn emin(&self) -> i64 {
        match self {
            Format::Ieee { .. } => 1 - self.bias(),
            Format::Posit { .. } => -self.max_scale(),
        }
    }

    /// Exponent of the largest finite number.
    pub fn emax(&self) -> i64 {
        match self {
            Format::Ieee { .. } => self.bias(),
            Format::Posit { .. } => self.max_scale(),
        }
    }

    /// Number of significand bits including the integer bit (IEEE), or the
    /// largest number of significand bits any value can carry (posit).
    pub fn precision(&self) -> u32 {
        match *self {
            Format::Ieee { fraction_bits, .. } => fraction_bits + 1,
            Format::Posit { bits, es } => bits.saturating_sub(3 + es) + 1,
        }
    }

    /// Number of NaN payload bits below the quiet bit (0 for posits).
    pub fn payload_bits(&self) -> u32 {
        match *self {
            Format::Ieee { fraction_bits, .. } => fraction_bits - 1,
            Format::Posit { .. } => 0,
        }
    }

    /// `log2(maxpos)` of a posit format, `(bits - 2) * 2^es`.
    pub fn max_scale(&self) -> i64 {
        match *self {
            Format::Posit { bits, es } => i64::from(bits - 2) << es,
            Format::Ieee { .. } => self.emax(),
        }
    }

    /// The quire geometry for products of two values in this format.
    pub fn quire_layout(&self) -> QuireLayout {
        QuireLayout::for_format(*self)
    }
}

/// Where a quire's banks sit on the binary exponent axis.
///
/// Bit 0 of bank 0 has weight `2^base_exponent`; the quire spans
/// `banks * BANK_BITS` bits above that, the topmost one being the two's
/// complement sign.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct QuireLayout {
    pub base_exponent: i64,
    pub banks: usize,
}

impl QuireLayout {
    /// Derives the quire geometry needed to add up products of two values
    /// of `format` without ever losing a bit.
    ///
    /// For posits this is the standard quire of `2^(es+2) * n` bits (rounded
    /// up to whole banks) whose lsb is `minpos^2`. IEEE formats get a quire
    /// spanning the whole product range, from the square of the smallest
    /// subnormal to just above the square of the largest finite number, plus
    /// [`CARRY_BITS`] carry bits and a sign bit.
    pub fn for_format(format: Format) -> Self {
        match format {
            Format::Posit { bits, es } => {
                let width = u64::from(bits) << (es + 2);
                Self {
                    base_exponent: -2 * format.max_scale(),
                    banks: Self::banks_for(width),
                }
            }
            Format::Ieee { fraction_bits, .. } => {
                let lowest = 2 * (format.emin() - i64::from(fraction_bits));
                let highest = 2 * (format.emax() + 1);
                let width = (highest - lowest) as u64 + u64::from(CARRY_BITS) + 1;
                Self {
                    base_exponent: lowest,
                    banks: Self::banks_for(width),
                }
            }
        }
    }

    fn banks_for(width: u64) -> usize {
        ((width + u64::from(BANK_BITS) - 1) / u64::from(BANK_BITS)) as usize
    }

    /// Total width of the quire in bits.
    pub fn width(&self) -> u64 {
        self.banks as u64 * u64::from(BANK_BITS)
    }
}
