mod common;
use common::*;
use rpl::mach::{object, Runtime};

/// Canonical render/parse round trip: the re-parsed object must be byte
/// identical to the original.
fn assert_round_trip(source: &str) {
    let mut rt = Runtime::default();
    assert!(rt.enter(source).is_ok(), "failed to parse {}", source);
    let obj = rt.peek(0).unwrap();
    let text = rt.render_canonical(obj).unwrap();
    assert!(
        rt.enter(&text).is_ok(),
        "failed to re-parse {:?} from {}",
        text,
        source
    );
    let reparsed = rt.peek(0).unwrap();
    let original = rt.peek(1).unwrap();
    assert!(
        rt.obj_eq(original, reparsed).unwrap(),
        "round trip changed {} (rendered {:?})",
        source,
        text
    );
}

#[test]
fn test_round_trips() {
    for source in [
        "0",
        "42",
        "-42",
        "18446744073709551616",
        "-99999999999999999999",
        "#1fh",
        "#101b",
        "1/3",
        "-7/11",
        "3.14",
        "-0.001",
        "2.",
        "1.5e20",
        "(1,2)",
        "(1.5,-2.5)",
        "(2∠45)",
        "\"hello\"",
        "\"say \"\"hi\"\"\"",
        "'x'",
        "'x+1'",
        "'(x+1)*3'",
        "'-x'",
        "'x*y and y<3'",
        "{ 1 2 3 }",
        "{ 1 { 2 3 } \"mixed\" }",
        "« 1 2 + »",
        "« dup « swap » eval »",
        "« do 1 until 2 end »",
        "« while 0 repeat 1 end »",
        "« 1 5 start 2 next »",
        "« 1 5 start 2 step »",
        "« 1 5 for i i next »",
        "« 1 5 for i i 2 step »",
        "« if 1 then 2 end »",
        "« if 1 then 2 else 3 end »",
    ]
    .iter()
    {
        assert_round_trip(source);
    }
}

#[test]
fn test_object_walk_matches_sizes() {
    // Every inline sub-object's size must land exactly on the next one
    let mut rt = Runtime::default();
    rt.enter("« 1 -2 3/4 5.6 \"t\" sym { 7 } »").unwrap_or_else(|e| {
        panic!("parse failed: {}", e);
    });
    let program = rt.peek(0).unwrap();
    let (mut at, end) = rpl::mach::list::content(&rt, program).unwrap();
    let mut count = 0;
    while at < end {
        at = object::skip_at(rt.mem(), at).unwrap();
        count += 1;
    }
    assert_eq!(at, end);
    assert_eq!(count, 7);
}

#[test]
fn test_parse_positions() {
    let mut rt = Runtime::default();
    // Objects separated by arbitrary whitespace
    assert!(rt.enter("  1\n\t 2   3 ").is_ok());
    assert_eq!(levels(&rt), vec!["1", "2", "3"]);
}

#[test]
fn test_syntax_errors() {
    let mut rt = Runtime::default();
    assert_eq!(exec(&mut rt, "« 1 2"), "?Unterminated");
    assert_eq!(exec(&mut rt, "{ 1"), "?Unterminated");
    assert_eq!(exec(&mut rt, "\"abc"), "?Unterminated: text");
    assert_eq!(exec(&mut rt, "'x"), "?Unterminated: expression");
    assert_eq!(exec(&mut rt, "~"), "?Syntax Error");
}

#[test]
fn test_expression_precedence() {
    let mut rt = Runtime::default();
    // RPN storage honours infix precedence
    assert_eq!(exec(&mut rt, "'1+2*3' eval"), "7");
    assert_eq!(exec(&mut rt, "drop '(1+2)*3' eval"), "9");
    assert_eq!(exec(&mut rt, "drop '2*3+4*5' eval"), "26");
    assert_eq!(exec(&mut rt, "drop '-2+3' eval"), "1");
    assert_eq!(exec(&mut rt, "drop '1+2==3' eval"), "1");
}

#[test]
fn test_expression_with_names() {
    let mut rt = Runtime::default();
    assert_eq!(exec(&mut rt, "5 'x' sto 'x*x' eval"), "25");
}

#[test]
fn test_directory_object() {
    let mut rt = Runtime::default();
    assert_eq!(
        exec(&mut rt, "directory { a 1 b « 2 » }"),
        "Directory { a 1 b « 2 » }"
    );
}

#[test]
fn test_symbols_need_word_boundaries() {
    let mut rt = Runtime::default();
    // `dup2` is a name, not the command `dup` followed by `2`
    assert_eq!(exec(&mut rt, "dup2"), "?Undefined Name: dup2");
}
