mod common;
use common::*;
use rpl::mach::{Mode, Runtime};

#[test]
fn test_decimal_round_trip() {
    let mut r = Runtime::default();
    assert_eq!(exec(&mut r, "3.141592653589793238"), "3.141592653589793238");
    assert_eq!(exec(&mut r, "drop 0.5"), "0.5");
    assert_eq!(exec(&mut r, "drop -2.75"), "-2.75");
    assert_eq!(exec(&mut r, "drop 2."), "2.");
    assert_eq!(exec(&mut r, "drop 0."), "0.");
}

#[test]
fn test_decimal_exponents() {
    let mut r = Runtime::default();
    assert_eq!(exec(&mut r, "1e-5"), "0.00001");
    assert_eq!(exec(&mut r, "drop 1.5e3"), "1500.");
    assert_eq!(exec(&mut r, "drop 1E12"), "1.E12");
    assert_eq!(exec(&mut r, "drop 2.5e-12"), "2.5E-12");
    assert_eq!(exec(&mut r, "drop 1e"), "?Exponent Without Digits");
}

#[test]
fn test_decimal_addition() {
    let mut r = Runtime::default();
    // Alignment across eleven orders of magnitude
    assert_eq!(exec(&mut r, "1e-5 1 +"), "1.00001");
    assert_eq!(exec(&mut r, "drop 0.1 0.2 +"), "0.3");
    assert_eq!(exec(&mut r, "drop 123.456 0.544 +"), "124.");
    assert_eq!(exec(&mut r, "drop 0.5 0.6 -"), "-0.1");
    assert_eq!(exec(&mut r, "drop 1.5 2 *"), "3.");
    assert_eq!(exec(&mut r, "drop 1 8 / 1. *"), "0.125");
    assert_eq!(exec(&mut r, "drop 1. 3 /"), "0.333333333333333333333333");
}

#[test]
fn test_decimal_comparison_on_stack() {
    let mut r = Runtime::default();
    assert_eq!(exec(&mut r, "1.5 1.49 >"), "1");
    assert_eq!(exec(&mut r, "drop -1.5 1.5 <"), "1");
    assert_eq!(exec(&mut r, "drop 2 2. =="), "1");
}

#[test]
fn test_display_mode_commands() {
    let mut r = Runtime::default();
    assert_eq!(exec(&mut r, "2 fix 0.5"), "0.50");
    assert_eq!(exec(&mut r, "drop 4 sci 12345."), "1.2345E4");
    assert_eq!(exec(&mut r, "drop 4 eng 12345."), "12.345E3");
    assert_eq!(exec(&mut r, "drop std 12345."), "12345.");
    assert_eq!(r.settings.mode, Mode::Std);
}

#[test]
fn test_precision_command() {
    let mut r = Runtime::default();
    assert_eq!(exec(&mut r, "6 precision 1. 3 /"), "0.333333");
    assert_eq!(r.settings.precision, 6);
    assert_eq!(exec(&mut r, "drop 0 precision"), "?Bad Argument Value");
}

#[test]
fn test_promotion_to_decimal() {
    let mut r = Runtime::default();
    assert_eq!(exec(&mut r, "1 2 / 0.25 +"), "0.75");
    assert_eq!(exec(&mut r, "drop 3 1.5 -"), "1.5");
}

mod properties {
    use proptest::prelude::*;
    use rpl::mach::decimal::{self, Dec};

    fn arb_dec() -> impl Strategy<Value = Dec> {
        (any::<u64>(), -9i64..9, any::<bool>()).prop_map(|(m, shift, neg)| {
            let mut dec = Dec::from_u64(m);
            dec.exp += shift;
            dec.neg = neg && !dec.is_zero();
            dec
        })
    }

    proptest! {
        #[test]
        fn compare_is_antisymmetric(x in arb_dec(), y in arb_dec()) {
            prop_assert_eq!(decimal::compare(&x, &y), -decimal::compare(&y, &x));
        }

        #[test]
        fn compare_is_reflexive(x in arb_dec()) {
            prop_assert_eq!(decimal::compare(&x, &x), 0);
        }

        #[test]
        fn addition_commutes(x in arb_dec(), y in arb_dec()) {
            let xy = decimal::add(&x, &y, 24);
            let yx = decimal::add(&y, &x, 24);
            prop_assert_eq!(xy, yx);
        }

        #[test]
        fn subtraction_of_self_is_zero(x in arb_dec()) {
            let zero = decimal::sub(&x, &x, 24);
            prop_assert!(zero.is_zero());
        }

        #[test]
        fn negation_flips_compare(x in arb_dec(), y in arb_dec()) {
            let c = decimal::compare(&x, &y);
            let n = decimal::compare(&decimal::neg(&y), &decimal::neg(&x));
            prop_assert_eq!(c, n);
        }
    }
}
