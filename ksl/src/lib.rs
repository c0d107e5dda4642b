//! KSL, a typed shader IR construction kit.
//!
//! This crate builds GPU shader programs as an in-memory, typed intermediate representation: expressions, scopes and
//! statements, composed into a vertex and a fragment stage. Turning that representation into an actual shading
//! language is the job of a code generator living outside of this crate; [`writer::pseudo`] only renders it as
//! pseudocode.
//!
//! # Typed and erased layers
//!
//! Every node exists in two flavors:
//!
//! - The erased layer ([`ErasedExpr`](expr::ErasedExpr), [`Variable`](var::Variable), …) carries its
//!   [`Type`](types::Type) at run time. Its constructors check operand types and return a [`Result`](error::Result),
//!   which makes it suitable for graphs built dynamically.
//! - The typed layer ([`Expr<T>`](expr::Expr), [`Var<T>`](var::Var)) carries the type as a Rust type parameter.
//!   Operators and built-in functions are only implemented for valid type combinations, so an ill-typed expression
//!   doesn’t compile. It builds the very same erased nodes.
//!
//! ```
//! use ksl::{lit, program::Program, types::{V3, V4}, vec4};
//! use ksl::expr::Expr;
//!
//! let mut program = Program::new("example");
//!
//! program.vertex_stage(|stage| {
//!   let offset = stage.uniform::<V3<f32>>("uOffset")?;
//!   let position = stage.vertex_attrib::<V3<f32>>("attrib_positions")?;
//!   let out = stage.position()?;
//!
//!   stage.main(|s| {
//!     let moved = s.var(position + offset);
//!     let clip: Expr<V4<f32>> = vec4!(moved, 1.);
//!     s.set(&out, None, clip)
//!   })
//! })?;
//! # Ok::<(), ksl::error::KslError>(())
//! ```
//!
//! # Scopes
//!
//! Nested scopes (branches, loops, block bodies, function bodies) are built by closures receiving a `&mut`
//! [`Scope`](scope::Scope). Every statement records the variables it reads and writes, so that a code generator can
//! order or eliminate statements without re-analyzing expressions.
//!
//! # Blocks and data blocks
//!
//! A [block](block) is a named, reusable sub-scope with typed input and output ports; the [`blocks`] module provides
//! the vertex transform, skinning, morphing, displacement and color blocks. [Data blocks](data) are per-program
//! singletons owning uniforms and updating them before every draw call.

pub mod block;
pub mod blocks;
pub mod builtin;
pub mod data;
pub mod erased;
pub mod error;
pub mod expr;
pub mod fun;
pub mod names;
pub mod program;
pub mod scope;
pub mod stage;
pub mod stdlib;
pub mod stmt;
pub mod swizzle;
pub mod types;
pub mod unlit;
pub mod var;
pub mod writer;
