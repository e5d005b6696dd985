//! Reductions: feeding a stream of operands through the configured pipeline.
//!
//! A [`Reduction`] owns everything one reduction needs and is consumed when
//! the result is read out, so state can never leak from one reduction into
//! the next. In the exact modes all terms go into one quire that is rounded
//! once at the end. In [`Mode::IeeeCompat`] every step is a fused
//! `acc + a * b` that is rounded right away, like a scalar FMA loop.

use crate::ieee::{self, CancelledZero, IeeeRounding, Tininess};
use crate::mode::Mode;
use crate::posit;
use crate::product::{exact_product, PartialProduct};
use crate::quantize::quantize;
use crate::quire::{Finalized, Quire};
use crate::{decode, Canonical, Error, Flags, Format, QuireLayout, RoundingMode};

/// Everything that configures a reduction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Config {
    mode: Mode,
    operands: Format,
    target: Format,
    rounding: IeeeRounding,
}

impl Config {
    /// Creates a configuration reading operands of format `operands` and
    /// producing a result of format `target`, rounding to nearest.
    ///
    /// Fails with [`Error::ModeMismatch`] if the final rounder of `mode`
    /// does not produce `target` (IEEE modes need an IEEE target, posit mode
    /// a posit target).
    pub fn new(mode: Mode, operands: Format, target: Format) -> Result<Self, Error> {
        if !mode.pipeline().rounder.accepts(target) {
            return Err(Error::ModeMismatch);
        }
        Ok(Self {
            mode,
            operands,
            target,
            rounding: IeeeRounding::default(),
        })
    }

    /// Creates a configuration from raw mode and rounding mode register
    /// values.
    pub fn from_register(mode: u8, frm: u8, operands: Format, target: Format) -> Result<Self, Error> {
        let rounding = RoundingMode::from_register(frm)?;
        Ok(Self::new(Mode::from_register(mode)?, operands, target)?.with_rounding(rounding))
    }

    pub fn with_rounding(mut self, mode: RoundingMode) -> Self {
        self.rounding.mode = mode;
        self
    }

    pub fn with_tininess(mut self, tininess: Tininess) -> Self {
        self.rounding.tininess = tininess;
        self
    }

    pub fn with_cancellation(mut self, cancelled: CancelledZero) -> Self {
        self.rounding.cancelled = cancelled;
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn operands(&self) -> Format {
        self.operands
    }

    pub fn target(&self) -> Format {
        self.target
    }

    pub fn rounding(&self) -> IeeeRounding {
        self.rounding
    }

    /// The geometry of the quire used by reductions with this configuration.
    ///
    /// Quantized operands live in the target format, everything else in the
    /// operand format.
    pub fn quire_layout(&self) -> QuireLayout {
        if self.mode.pipeline().quantizer {
            self.target.quire_layout()
        } else {
            self.operands.quire_layout()
        }
    }

    /// Runs a decoded operand through the front of the pipeline.
    pub(crate) fn prepare(&self, value: Canonical) -> Result<(Canonical, Flags), Error> {
        let value = self.mode.canonicalize(value);
        if self.mode.pipeline().quantizer && self.operands != self.target {
            quantize(&value, self.target, self.rounding)
        } else {
            Ok((value, Flags::empty()))
        }
    }

    /// Rounds with the mode's final rounder. `new` made sure the target
    /// format is the one that rounder produces.
    pub(crate) fn round(&self, value: &Finalized) -> (u64, Flags) {
        match self.target {
            Format::Ieee { .. } => ieee::round_finalized(value, self.target, self.rounding),
            Format::Posit { bits, es } => (posit::round_finalized(value, bits, es), Flags::empty()),
        }
    }
}

/// The result of a reduction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// The result, encoded in the target format.
    pub bits: u64,
    /// Exceptions raised anywhere in the reduction. Always empty in posit
    /// mode.
    pub flags: Flags,
    /// Number of rounding steps the result went through.
    pub roundings: u32,
}

#[derive(Debug, Clone)]
enum State {
    Exact(Quire),
    /// The running, already rounded result and its encoding.
    Sequential(Option<(Canonical, u64)>),
}

/// An in-progress reduction.
#[derive(Debug, Clone)]
pub struct Reduction {
    config: Config,
    state: State,
    flags: Flags,
    roundings: u32,
    terms: usize,
}

impl Reduction {
    pub fn new(config: Config) -> Self {
        let state = if config.mode.pipeline().quantizer {
            State::Sequential(None)
        } else {
            State::Exact(Quire::new(config.quire_layout()))
        };
        Self {
            config,
            state,
            flags: Flags::empty(),
            roundings: 0,
            terms: 0,
        }
    }

    /// A reduction that accumulates exactly and rounds once, whatever the
    /// mode. Used for single operations, which IEEE-Compat rounds once too.
    pub(crate) fn fused(config: Config) -> Self {
        Self {
            state: State::Exact(Quire::new(config.quire_layout())),
            ..Self::new(config)
        }
    }

    pub fn config(&self) -> Config {
        self.config
    }

    /// Adds the operand `bits`.
    pub fn push(&mut self, bits: u64) -> Result<(), Error> {
        let value = decode(bits, self.config.operands)?;
        self.push_term(value)
    }

    /// Adds the product of the operands `a` and `b`.
    pub fn push_product(&mut self, a: u64, b: u64) -> Result<(), Error> {
        let (a, fa) = self.config.prepare(decode(a, self.config.operands)?)?;
        let (b, fb) = self.config.prepare(decode(b, self.config.operands)?)?;
        let (product, fp) = exact_product(&a, &b);
        self.flags |= fa | fb | fp;
        self.add(product)
    }

    /// Adds an already decoded operand.
    pub(crate) fn push_term(&mut self, value: Canonical) -> Result<(), Error> {
        let (value, fv) = self.config.prepare(value)?;
        let (term, ft) = PartialProduct::term(&value);
        self.flags |= fv | ft;
        self.add(term)
    }

    fn add(&mut self, product: PartialProduct) -> Result<(), Error> {
        self.terms += 1;
        match &mut self.state {
            State::Exact(quire) => quire.accumulate(&product),
            State::Sequential(acc) => {
                let mut quire = Quire::new(self.config.quire_layout());
                if let Some((value, _)) = acc {
                    quire.accumulate(&PartialProduct::term(value).0)?;
                }
                quire.accumulate(&product)?;

                let (finalized, ff) = quire.finalize();
                let (bits, fr) = self.config.round(&finalized);
                self.flags |= ff | fr;
                self.roundings += 1;
                *acc = Some((decode(bits, self.config.target)?, bits));
                Ok(())
            }
        }
    }

    /// Rounds the accumulated value and returns the result.
    pub fn finish(self) -> Outcome {
        let Reduction {
            config,
            state,
            mut flags,
            mut roundings,
            terms,
        } = self;

        let bits = match state {
            State::Exact(quire) => {
                let (finalized, ff) = quire.finalize();
                let (bits, fr) = config.round(&finalized);
                flags |= ff | fr;
                roundings += 1;
                bits
            }
            State::Sequential(Some((_, bits))) => bits,
            // Nothing was added: the empty sum is +0
            State::Sequential(None) => 0,
        };

        if config.mode == Mode::Posit {
            flags = Flags::empty();
        }

        debug!(
            "{:?} reduction of {} terms to {:?}: {:#X} {:?} ({} rounding steps)",
            config.mode, terms, config.target, bits, flags, roundings
        );
        Outcome { bits, flags, roundings }
    }
}

/// Sums up `operands`.
pub fn sum(config: Config, operands: &[u64]) -> Result<Outcome, Error> {
    let mut reduction = Reduction::new(config);
    for &bits in operands {
        reduction.push(bits)?;
    }
    Ok(reduction.finish())
}

/// Computes the dot product of `a` and `b`.
///
/// Both slices must be of the same length.
pub fn dot(config: Config, a: &[u64], b: &[u64]) -> Result<Outcome, Error> {
    if a.len() != b.len() {
        return Err(Error::OperandCount {
            left: a.len(),
            right: b.len(),
        });
    }
    let mut reduction = Reduction::new(config);
    for (&a, &b) in a.iter().zip(b) {
        reduction.push_product(a, b)?;
    }
    Ok(reduction.finish())
}
