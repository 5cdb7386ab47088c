mod common;
use common::*;
use rpl::mach::Runtime;

#[test]
fn test_gc_preserves_stack() {
    let mut rt = Runtime::default();
    rt.enter("1 2/3 4.5 \"six\" { 7 8 } « 9 »").unwrap();
    let before = levels(&rt);
    let recycled = rt.gc().unwrap();
    assert_eq!(levels(&rt), before);
    // Nothing on the stack was touched, only dead temporaries
    assert_eq!(rt.gc().unwrap(), 0);
    let _ = recycled;
}

#[test]
fn test_gc_recycles_garbage() {
    let mut rt = Runtime::default();
    // Dead intermediates: everything but the final value is garbage
    rt.enter("1 2 + 3 + 4 + 5 +").unwrap();
    let recycled = rt.gc().unwrap();
    assert!(recycled > 0, "expected dead intermediates to be recycled");
    assert_eq!(top(&rt), "15");
}

#[test]
fn test_gc_preserves_globals() {
    let mut rt = Runtime::default();
    rt.enter("{ 1 2 3 } 'L' sto 42 'x' sto").unwrap();
    rt.gc().unwrap();
    assert_eq!(exec(&mut rt, "L"), "{ 1 2 3 }");
    assert_eq!(exec(&mut rt, "x"), "42");
}

#[test]
fn test_allocation_pressure() {
    // A small arena forces collection during the loop; every iteration
    // makes garbage and the loop must still complete
    let mut rt = Runtime::new(4 * 1024);
    assert_eq!(exec(&mut rt, "0 1 500 for i i + next"), "125250");
}

#[test]
fn test_out_of_memory() {
    let mut rt = Runtime::new(512);
    // The stack keeps everything reachable until memory runs out
    let mut err = None;
    for _ in 0..200 {
        if let Err(e) = rt.enter("123456789") {
            err = Some(e);
            break;
        }
    }
    assert_eq!(
        err.map(|e| e.to_string()),
        Some("Insufficient Memory".to_string())
    );
}

#[test]
fn test_store_replaces_and_stack_survives() {
    let mut rt = Runtime::default();
    // The stack still refers to the old value after it is overwritten
    rt.enter("{ 1 2 3 } 'L' sto L { 9 } 'L' sto").unwrap();
    assert_eq!(top(&rt), "{ 1 2 3 }");
    assert_eq!(exec(&mut rt, "L"), "{ 9 }");
}

#[test]
fn test_purge_keeps_stack_value() {
    let mut rt = Runtime::default();
    rt.enter("{ 4 5 } 'L' sto L 'L' purge").unwrap();
    assert_eq!(top(&rt), "{ 4 5 }");
}
