//! Writers.
//!
//! Code generation for actual shading languages lives outside of this crate; the only writer here renders programs
//! as deterministic pseudocode, for debugging and tests.

pub mod pseudo;
