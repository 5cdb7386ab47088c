//! # RPL
//!
//! Simulator front-end for the RPL calculator engine.

mod term;

fn main() {
    term::main()
}
