mod common;
use common::*;
use rpl::mach::Runtime;

#[test]
fn test_for_next_sum() {
    let mut r = Runtime::default();
    assert_eq!(exec(&mut r, "« 0 1 10 for i i + next » eval"), "55");
}

#[test]
fn test_do_until() {
    let mut r = Runtime::default();
    assert_eq!(exec(&mut r, "1 do dup 2 * dup 1000 > until end"), "1024");
}

#[test]
fn test_do_runs_once_when_condition_true() {
    let mut r = Runtime::default();
    assert_eq!(exec(&mut r, "0 do 1 + until 1 end"), "1");
}

#[test]
fn test_while_repeat() {
    let mut r = Runtime::default();
    assert_eq!(exec(&mut r, "1 while dup 100 < repeat dup + end"), "128");
}

#[test]
fn test_while_false_runs_zero_times() {
    let mut r = Runtime::default();
    assert_eq!(exec(&mut r, "42 while 0 repeat drop 999 end"), "42");
}

#[test]
fn test_for_next_squares() {
    let mut r = Runtime::default();
    assert_eq!(exec(&mut r, "« 1 5 for n n n * next » eval"), "25");
    assert_eq!(levels(&r), vec!["1", "4", "9", "16", "25"]);
}

#[test]
fn test_for_next_iteration_count() {
    let mut r = Runtime::default();
    // max(0, b - a + 1) body evaluations
    assert_eq!(exec(&mut r, "0 3 7 for i 1 + next"), "5");
    assert_eq!(exec(&mut r, "drop 0 5 5 for i 1 + next"), "1");
    assert_eq!(exec(&mut r, "drop 0 5 4 for i 1 + next"), "0");
}

#[test]
fn test_start_next() {
    let mut r = Runtime::default();
    assert_eq!(exec(&mut r, "0 1 5 start 1 + next"), "5");
}

#[test]
fn test_for_step() {
    let mut r = Runtime::default();
    // 1, 3, 5, 7 with step 2
    assert_eq!(exec(&mut r, "0 1 7 for i i + 2 step"), "16");
    // Descending with a negative step
    assert_eq!(exec(&mut r, "drop 0 3 1 for i i + -1 step"), "6");
}

#[test]
fn test_for_step_degrades_to_decimal() {
    let mut r = Runtime::default();
    // 1, 1.5, 2 once the step turns real
    assert_eq!(exec(&mut r, "0 1 2 for i i + 0.5 step"), "4.5");
}

#[test]
fn test_start_real_bounds() {
    let mut r = Runtime::default();
    assert_eq!(exec(&mut r, "0 1 2.5 start 1 + next"), "2");
}

#[test]
fn test_loop_bad_bounds() {
    let mut r = Runtime::default();
    assert_eq!(exec(&mut r, "\"a\" 3 start 1 next"), "?Bad Argument Type");
}

#[test]
fn test_counter_is_local() {
    let mut r = Runtime::default();
    // The loop variable shadows globals and vanishes afterwards
    assert_eq!(exec(&mut r, "9 'i' sto 1 3 for i i next"), "3");
    assert_eq!(levels(&r), vec!["1", "2", "3"]);
    assert_eq!(exec(&mut r, "i"), "9");
    assert_eq!(r.frame_count(), 0);
}

#[test]
fn test_nested_for() {
    let mut r = Runtime::default();
    assert_eq!(exec(&mut r, "0 1 3 for i 1 2 for j i j * + next next"), "18");
}

#[test]
fn test_if_then() {
    let mut r = Runtime::default();
    assert_eq!(exec(&mut r, "if 1 then 42 end"), "42");
    assert_eq!(exec(&mut r, "if 0 then 99 end"), "42");
}

#[test]
fn test_if_then_else() {
    let mut r = Runtime::default();
    assert_eq!(exec(&mut r, "if 0 then 1 else 2 end"), "2");
    assert_eq!(exec(&mut r, "if 1 then 1 else 2 end"), "1");
}

#[test]
fn test_keywords_case_insensitive() {
    let mut r = Runtime::default();
    assert_eq!(exec(&mut r, "0 1 3 FOR i i + NEXT"), "6");
    assert_eq!(exec(&mut r, "drop IF 1 THEN 5 END"), "5");
}

#[test]
fn test_unterminated_loop() {
    let mut r = Runtime::default();
    assert_eq!(exec(&mut r, "do 1 2 +"), "?Unterminated");
    assert_eq!(exec(&mut r, "for + next"), "?Missing Variable Name");
}

#[test]
fn test_interrupt_leaves_no_residue() {
    let mut r = Runtime::default();
    r.interrupt();
    assert_eq!(exec(&mut r, "1 5 for i i next"), "?Interrupted");
    assert_eq!(r.frame_count(), 0);
    assert_eq!(r.locals_count(), 0);
}
