//! # RPL
//!
//! A calculator engine in the RPL tradition of the HP 48 family,
//! targeting constrained hardware: objects are densely tagged byte
//! sequences in one compacting garbage-collected arena, numbers range
//! from machine integers to exact fractions and variable-precision
//! base-1000 decimals, and programs run on a stack machine with
//! DO/WHILE/START/FOR loops and local variables.
//!
//! ```text
//! « 0 1 10 for i i + next »
//! eval
//! 1: 55
//! ```

#[macro_use]
pub mod lang;
pub mod mach;
