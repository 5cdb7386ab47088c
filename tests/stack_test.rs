mod common;
use common::*;
use rpl::mach::Runtime;

#[test]
fn test_stack_manipulation() {
    let mut r = Runtime::default();
    assert_eq!(exec(&mut r, "1 2 3"), "3");
    assert_eq!(exec(&mut r, "dup"), "3");
    assert_eq!(r.depth(), 4);
    assert_eq!(exec(&mut r, "drop drop"), "2");
    assert_eq!(exec(&mut r, "swap"), "1");
    assert_eq!(levels(&r), vec!["2", "1"]);
    assert_eq!(exec(&mut r, "over"), "2");
    assert_eq!(exec(&mut r, "rot"), "2");
    assert_eq!(exec(&mut r, "depth"), "4");
}

#[test]
fn test_stack_underflow() {
    let mut r = Runtime::default();
    assert_eq!(exec(&mut r, "drop"), "?Too Few Arguments");
    assert_eq!(exec(&mut r, "1 swap"), "?Too Few Arguments");
}

#[test]
fn test_integer_arithmetic() {
    let mut r = Runtime::default();
    assert_eq!(exec(&mut r, "1 2 +"), "3");
    assert_eq!(exec(&mut r, "10 -"), "-7");
    assert_eq!(exec(&mut r, "-6 *"), "42");
    assert_eq!(exec(&mut r, "neg"), "-42");
    assert_eq!(exec(&mut r, "2 3 - 4 *"), "-4");
}

#[test]
fn test_integer_overflow_promotes() {
    let mut r = Runtime::default();
    assert_eq!(
        exec(&mut r, "18446744073709551615 1 +"),
        "18446744073709551616"
    );
    assert_eq!(
        exec(&mut r, "99999999999999999999 2 *"),
        "199999999999999999998"
    );
    // And back down when the result fits the machine word again
    assert_eq!(exec(&mut r, "99999999999999999999 99999999999999999990 -"), "9");
}

#[test]
fn test_fractions() {
    let mut r = Runtime::default();
    assert_eq!(exec(&mut r, "1 2 /"), "1/2");
    assert_eq!(exec(&mut r, "1 2 / +"), "1");
    assert_eq!(exec(&mut r, "drop 2 3 / 3 *"), "2");
    assert_eq!(exec(&mut r, "drop 4/6"), "2/3");
    assert_eq!(exec(&mut r, "-3/9"), "-1/3");
    assert_eq!(exec(&mut r, "+"), "1/3");
    assert_eq!(exec(&mut r, "1 0 /"), "?Divide By Zero");
}

#[test]
fn test_inv() {
    let mut r = Runtime::default();
    assert_eq!(exec(&mut r, "4 inv"), "1/4");
    assert_eq!(exec(&mut r, "inv"), "4");
}

#[test]
fn test_comparisons() {
    let mut r = Runtime::default();
    assert_eq!(exec(&mut r, "1 2 <"), "1");
    assert_eq!(exec(&mut r, "drop 1 2 >"), "0");
    assert_eq!(exec(&mut r, "drop 2 2 =="), "1");
    assert_eq!(exec(&mut r, "drop 1 2 / 0.5 =="), "1");
    assert_eq!(exec(&mut r, "drop 2 3 / 0.5 >"), "1");
    assert_eq!(exec(&mut r, "drop -1 1 ≤"), "1");
    assert_eq!(exec(&mut r, "drop 1 1 ≠"), "0");
    assert_eq!(exec(&mut r, "drop \"a\" \"a\" =="), "1");
    assert_eq!(exec(&mut r, "drop \"a\" \"b\" =="), "0");
    assert_eq!(exec(&mut r, "drop \"a\" \"b\" <"), "?Bad Argument Type");
}

#[test]
fn test_logic() {
    let mut r = Runtime::default();
    assert_eq!(exec(&mut r, "1 0 and"), "0");
    assert_eq!(exec(&mut r, "drop 1 0 or"), "1");
    assert_eq!(exec(&mut r, "drop 0 not"), "1");
    assert_eq!(exec(&mut r, "drop 0.5 not"), "0");
}

#[test]
fn test_based_integers() {
    let mut r = Runtime::default();
    assert_eq!(exec(&mut r, "#ffh"), "#ffh");
    assert_eq!(exec(&mut r, "#1h +"), "#100h");
    assert_eq!(exec(&mut r, "drop #101b"), "#101b");
    assert_eq!(exec(&mut r, "drop #77o #12d"), "#12d");
}

#[test]
fn test_complex() {
    let mut r = Runtime::default();
    assert_eq!(exec(&mut r, "(1,2) (3,4) +"), "(4,6)");
    assert_eq!(exec(&mut r, "drop (1,2) (3,4) *"), "(-5,10)");
    assert_eq!(exec(&mut r, "drop (4,6) (2,0) /"), "(2,3)");
    assert_eq!(exec(&mut r, "drop (1,2) neg"), "(-1,-2)");
    // Promotion from the reals
    assert_eq!(exec(&mut r, "drop (1,2) 1 +"), "(2,2)");
    // Polar values multiply by magnitude and angle
    assert_eq!(exec(&mut r, "drop (2∠30) (3∠15) *"), "(6∠45)");
    assert_eq!(exec(&mut r, "drop (2∠30) 1 +"), "?Domain Error: polar arithmetic needs a zero angle");
}

#[test]
fn test_variables() {
    let mut r = Runtime::default();
    assert_eq!(exec(&mut r, "42 'X' sto X"), "42");
    assert_eq!(exec(&mut r, "'X' rcl"), "42");
    assert_eq!(exec(&mut r, "drop drop 7 'X' sto X"), "7");
    assert_eq!(exec(&mut r, "'X' purge"), "7");
    assert_eq!(exec(&mut r, "drop X"), "?Undefined Name: X");
}

#[test]
fn test_program_sto_runs_on_name() {
    let mut r = Runtime::default();
    assert_eq!(exec(&mut r, "« dup * » 'sq' sto 9 sq"), "81");
    // rcl recalls the program without running it
    assert_eq!(exec(&mut r, "'sq' rcl"), "« dup * »");
}

#[test]
fn test_eval_command() {
    let mut r = Runtime::default();
    assert_eq!(exec(&mut r, "« 1 2 + » eval"), "3");
    assert_eq!(exec(&mut r, "drop 5 eval"), "5");
    assert_eq!(exec(&mut r, "drop '2+3' eval"), "5");
}

#[test]
fn test_undefined_name() {
    let mut r = Runtime::default();
    assert_eq!(exec(&mut r, "nonesuch"), "?Undefined Name: nonesuch");
}
