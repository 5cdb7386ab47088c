mod common;
use common::*;
use rpl::mach::{state, Mode, Runtime};

#[test]
fn test_state_round_trip() {
    let mut rt = Runtime::default();
    rt.enter("{ 1 2 3 } 'L' sto 42 'x' sto 7 8.5 \"nine\"").unwrap();
    let saved = state::save_text(&rt).unwrap();

    let mut rt2 = Runtime::default();
    state::load_text(&mut rt2, &saved).unwrap();
    assert_eq!(levels(&rt2), vec!["7", "8.5", "\"nine\""]);
    assert_eq!(exec(&mut rt2, "L"), "{ 1 2 3 }");
    assert_eq!(exec(&mut rt2, "drop x"), "42");
}

#[test]
fn test_state_restores_settings() {
    let mut rt = Runtime::default();
    rt.enter("3 fix 12 precision").unwrap();
    let saved = state::save_text(&rt).unwrap();

    let mut rt2 = Runtime::default();
    state::load_text(&mut rt2, &saved).unwrap();
    assert_eq!(rt2.settings.mode, Mode::Fix);
    assert_eq!(rt2.settings.digits, 3);
    assert_eq!(rt2.settings.precision, 12);
}

#[test]
fn test_state_canonical_rendering() {
    let mut rt = Runtime::default();
    // Display settings must not leak into the persisted text
    rt.enter("0.5 2 fix").unwrap();
    let saved = state::save_text(&rt).unwrap();
    assert!(saved.contains("0.5\n"), "got {:?}", saved);

    let mut rt2 = Runtime::default();
    state::load_text(&mut rt2, &saved).unwrap();
    assert_eq!(rt2.settings.mode, Mode::Fix);
    rt2.settings.mode = Mode::Std;
    assert_eq!(top(&rt2), "0.5");
}

#[test]
fn test_state_program_in_variable() {
    let mut rt = Runtime::default();
    rt.enter("« dup * » 'sq' sto").unwrap();
    let saved = state::save_text(&rt).unwrap();

    let mut rt2 = Runtime::default();
    state::load_text(&mut rt2, &saved).unwrap();
    assert_eq!(exec(&mut rt2, "6 sq"), "36");
}

#[test]
fn test_state_file_round_trip() {
    let dir = std::env::temp_dir();
    let path = dir.join("rpl_state_test.48S");
    let path = path.to_string_lossy().into_owned();

    let mut rt = Runtime::default();
    rt.enter("123 'n' sto 4.25").unwrap();
    state::save(&rt, &path).unwrap();

    let mut rt2 = Runtime::default();
    state::load(&mut rt2, &path).unwrap();
    assert_eq!(top(&rt2), "4.25");
    assert_eq!(exec(&mut rt2, "n"), "123");

    std::fs::remove_file(&path).ok();
}

#[test]
fn test_state_missing_file() {
    let mut rt = Runtime::default();
    let error = state::load(&mut rt, "/nonexistent/rpl.48S").unwrap_err();
    assert!(error.to_string().starts_with("File Not Found"));
}
