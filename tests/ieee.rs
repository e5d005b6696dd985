//! Compares IEEE-Compat results against the host's IEEE arithmetic.

extern crate env_logger;
extern crate qfpu;
#[macro_use] extern crate proptest;

use qfpu::*;

fn f32_config() -> Config {
    Config::new(Mode::IeeeCompat, Format::F32, Format::F32).unwrap()
}

fn f64_config() -> Config {
    Config::new(Mode::IeeeCompat, Format::F64, Format::F64).unwrap()
}

/// Compares a result with the host's. NaN propagation is not standardized
/// beyond "the result is a NaN", so NaNs only need to be NaNs.
fn check_f32(op: &str, ours: Outcome, host: f32) {
    let ours_f = f32::from_bits(ours.bits as u32);
    if host.is_nan() {
        assert!(ours_f.is_nan(), "{}: expected NaN, got {:#010X}", op, ours.bits);
    } else {
        assert_eq!(
            ours.bits,
            u64::from(host.to_bits()),
            "{}: expected {} ({:#010X}), got {} ({:#010X}) {:?}",
            op, host, host.to_bits(), ours_f, ours.bits, ours.flags
        );
    }
}

fn check_f64(op: &str, ours: Outcome, host: f64) {
    let ours_f = f64::from_bits(ours.bits);
    if host.is_nan() {
        assert!(ours_f.is_nan(), "{}: expected NaN, got {:#018X}", op, ours.bits);
    } else {
        assert_eq!(
            ours.bits,
            host.to_bits(),
            "{}: expected {} ({:#018X}), got {} ({:#018X}) {:?}",
            op, host, host.to_bits(), ours_f, ours.bits, ours.flags
        );
    }
}

proptest! {
    #[test]
    fn add_f32(lhs_bits: u32, rhs_bits: u32) {
        let (lhs, rhs) = (f32::from_bits(lhs_bits), f32::from_bits(rhs_bits));
        let ours = add(f32_config(), lhs_bits.into(), rhs_bits.into()).unwrap();
        check_f32("add", ours, lhs + rhs);
    }

    #[test]
    fn sub_f32(lhs_bits: u32, rhs_bits: u32) {
        let (lhs, rhs) = (f32::from_bits(lhs_bits), f32::from_bits(rhs_bits));
        let ours = sub(f32_config(), lhs_bits.into(), rhs_bits.into()).unwrap();
        check_f32("sub", ours, lhs - rhs);
    }

    #[test]
    fn mul_f32(lhs_bits: u32, rhs_bits: u32) {
        let (lhs, rhs) = (f32::from_bits(lhs_bits), f32::from_bits(rhs_bits));
        let ours = mul(f32_config(), lhs_bits.into(), rhs_bits.into()).unwrap();
        check_f32("mul", ours, lhs * rhs);
    }

    #[test]
    fn div_f32(lhs_bits: u32, rhs_bits: u32) {
        let (lhs, rhs) = (f32::from_bits(lhs_bits), f32::from_bits(rhs_bits));
        let ours = div(f32_config(), lhs_bits.into(), rhs_bits.into()).unwrap();
        check_f32("div", ours, lhs / rhs);
    }

    #[test]
    fn fma_f32(a_bits: u32, b_bits: u32, c_bits: u32) {
        let (a, b, c) = (f32::from_bits(a_bits), f32::from_bits(b_bits), f32::from_bits(c_bits));
        let ours = fma(f32_config(), a_bits.into(), b_bits.into(), c_bits.into()).unwrap();
        check_f32("fma", ours, a.mul_add(b, c));
    }

    #[test]
    fn add_f64(lhs_bits: u64, rhs_bits: u64) {
        let (lhs, rhs) = (f64::from_bits(lhs_bits), f64::from_bits(rhs_bits));
        let ours = add(f64_config(), lhs_bits, rhs_bits).unwrap();
        check_f64("add", ours, lhs + rhs);
    }

    #[test]
    fn mul_f64(lhs_bits: u64, rhs_bits: u64) {
        let (lhs, rhs) = (f64::from_bits(lhs_bits), f64::from_bits(rhs_bits));
        let ours = mul(f64_config(), lhs_bits, rhs_bits).unwrap();
        check_f64("mul", ours, lhs * rhs);
    }

    #[test]
    fn div_f64(lhs_bits: u64, rhs_bits: u64) {
        let (lhs, rhs) = (f64::from_bits(lhs_bits), f64::from_bits(rhs_bits));
        let ours = div(f64_config(), lhs_bits, rhs_bits).unwrap();
        check_f64("div", ours, lhs / rhs);
    }

    /// binary64 operands are quantized to binary32 before they are added.
    #[test]
    fn quantized_add(lhs_bits: u64, rhs_bits: u64) {
        // the quantizer turns zeros into +0
        let quantize = |x: f64| if x == 0.0 { 0.0 } else { x as f32 };
        let (lhs, rhs) = (f64::from_bits(lhs_bits), f64::from_bits(rhs_bits));
        let config = Config::new(Mode::IeeeCompat, Format::F64, Format::F32).unwrap();
        let ours = add(config, lhs_bits, rhs_bits).unwrap();
        check_f32("quantized add", ours, quantize(lhs) + quantize(rhs));
    }

    /// Decoding and rounding a value back to its own format is exact.
    #[test]
    fn decode_round_trip(bits: u32) {
        let value = decode(u64::from(bits), Format::F32).unwrap();
        let (back, flags) = round_ieee(&Finalized::from(value.clone()), Format::F32, RoundingMode::Nearest).unwrap();
        if value.is_signaling() {
            // only the quiet bit changes
            prop_assert_eq!(back, u64::from(bits | 0x0040_0000));
        } else {
            prop_assert_eq!(back, u64::from(bits));
            prop_assert!(flags.is_empty());
        }
    }
}

const CORNER_CASES: &[u32] = &[
    0x0000_0000, // +0
    0x8000_0000, // -0
    0x7f80_0000, // +Inf
    0xff80_0000, // -Inf
    0x7fc0_0000, // qNaN
    0xffc0_1234, // -qNaN with payload
    0x7f80_0001, // sNaN
    0x0000_0001, // smallest subnormal
    0x807f_ffff, // largest subnormal, negative
    0x0080_0000, // smallest normal
    0x7f7f_ffff, // largest finite
    0xff7f_ffff, // smallest finite
    0x3f80_0000, // 1
    0xbf80_0000, // -1
    0x3fc0_0000, // 1.5
    0x3400_0000, // 2^-23
];

#[test]
fn corner_case_corpus() {
    env_logger::try_init().ok();

    let c = f32_config();
    for &a in CORNER_CASES {
        for &b in CORNER_CASES {
            let (x, y) = (f32::from_bits(a), f32::from_bits(b));
            let (a64, b64) = (u64::from(a), u64::from(b));
            check_f32("add", add(c, a64, b64).unwrap(), x + y);
            check_f32("sub", sub(c, a64, b64).unwrap(), x - y);
            check_f32("mul", mul(c, a64, b64).unwrap(), x * y);
            check_f32("div", div(c, a64, b64).unwrap(), x / y);
            for &d in CORNER_CASES {
                let z = f32::from_bits(d);
                check_f32("fma", fma(c, a64, b64, u64::from(d)).unwrap(), x.mul_add(y, z));
            }
        }
    }
}

#[test]
fn exception_flags() {
    let c = f32_config();
    let max = 0x7f7f_ffff;
    let min_sub = 0x0000_0001;
    let half = 0x3f00_0000;

    let out = add(c, max, max).unwrap();
    assert_eq!((out.bits, out.flags), (0x7f80_0000, Flags::OF | Flags::NX));
    let out = mul(c, min_sub, half).unwrap();
    assert_eq!((out.bits, out.flags), (0, Flags::UF | Flags::NX));
    let out = mul(c, 0, 0x7f80_0000).unwrap();
    assert_eq!((out.bits, out.flags), (0x7fc0_0000, Flags::NV));
    let out = sub(c, 0x7f80_0000, 0x7f80_0000).unwrap();
    assert_eq!((out.bits, out.flags), (0x7fc0_0000, Flags::NV));
    let out = div(c, 0x3f80_0000, 0x8000_0000).unwrap();
    assert_eq!((out.bits, out.flags), (0xff80_0000, Flags::DZ));
    // exact subnormal results don't underflow
    let out = mul(c, 0x0000_0002, half).unwrap();
    assert_eq!((out.bits, out.flags), (0x0000_0001, Flags::empty()));
}

#[test]
fn signaling_nans() {
    let c = f32_config();
    let out = add(c, 0x7f80_0001, 0x3f80_0000).unwrap();
    assert_eq!((out.bits, out.flags), (0x7fc0_0001, Flags::NV));
    let out = mul(c, 0x3f80_0000, 0xff80_0042).unwrap();
    assert_eq!((out.bits, out.flags), (0xffc0_0042, Flags::NV));
    // quiet NaNs propagate silently
    let out = add(c, 0x7fc0_0005, 0x3f80_0000).unwrap();
    assert_eq!((out.bits, out.flags), (0x7fc0_0005, Flags::empty()));
}

#[test]
fn rounding_modes() {
    // 1 + 2^-24 is a tie in binary32
    let one = 0x3f80_0000;
    let tiny = 0x3380_0000;
    let expect = [
        (RoundingMode::Nearest, 0x3f80_0000),
        (RoundingMode::Zero, 0x3f80_0000),
        (RoundingMode::Down, 0x3f80_0000),
        (RoundingMode::Up, 0x3f80_0001),
    ];
    for &(mode, bits) in &expect {
        let out = add(f32_config().with_rounding(mode), one, tiny).unwrap();
        assert_eq!((out.bits, out.flags), (bits, Flags::NX), "{:?}", mode);
    }

    // overflow in directed modes
    let max = 0x7f7f_ffff;
    let out = add(f32_config().with_rounding(RoundingMode::Zero), max, max).unwrap();
    assert_eq!((out.bits, out.flags), (max, Flags::OF | Flags::NX));
    let out = add(f32_config().with_rounding(RoundingMode::Down), max, max).unwrap();
    assert_eq!(out.bits, max);
}

#[test]
fn tininess_is_configurable() {
    // (2^23 - 1) * 2^-149 * (1 + 2^-23) is just below 2^-126 and rounds up
    // to it, even with an unbounded exponent range
    let a = 0x007f_ffff;
    let b = 0x3f80_0001;
    let after = mul(f32_config(), a, b).unwrap();
    let before = mul(f32_config().with_tininess(Tininess::BeforeRounding), a, b).unwrap();
    assert_eq!(after.bits, before.bits);
    assert_eq!(after.flags, Flags::NX);
    assert!(!after.flags.contains(Flags::UF));
    assert_eq!(before.flags, Flags::UF | Flags::NX);
}

#[test]
fn configuration_errors() {
    assert_eq!(
        add(f32_config(), 0x1_0000_0000, 0),
        Err(Error::WidthMismatch { width: 32, bits: 0x1_0000_0000 })
    );
    assert_eq!(Mode::from_register(0b11), Err(Error::UnsupportedMode(0b11)));
    assert_eq!(
        Config::from_register(0b11, 0, Format::F32, Format::F32),
        Err(Error::UnsupportedMode(0b11))
    );
}
