/*!
## Language module

Streaming text-to-object parsing and object-to-text rendering. The
per-type parse and render bodies live next to their types in `mach`;
this module provides the character source, the candidate dispatch and
the output buffer they share, plus the error type used crate-wide.
*/

#[macro_use]
pub mod error;
pub mod parse;
pub mod render;

pub use error::Error;
pub use error::ErrorCode;
