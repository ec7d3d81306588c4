//! # lcsfgen: LCSF protocol code generator
//!
//! Turns a description of LCSF commands and their (possibly nested) attributes into the C
//! sources implementing both ends of the protocol, and optionally into equivalent Rust
//! modules. Hand-written code in a previously generated C main module can be carried
//! over to the next generation.
//!
//! ## Pipeline
//!
//! - **Model** ([`model`]): `Protocol` → `Command` → `Attribute` trees
//! - **Flatten/validate** ([`flatten`]): one [`GenContext`] per run, shared by every pass
//! - **Backends**: [`cgen`] (main header, main modules, bridge, descriptor) and [`rustgen`]
//! - **Round-trip** ([`extract`]): recover handler bodies and custom code from an old main module
//! - **Output** ([`output`]): write every artifact, one result per file
//!
//! ## Schema text
//!
//! ```text
//! protocol Test = 0x01 {
//!     command SC3 = 0x02 bidirectional "Simple command";
//!     command CC1 = 0x03 a_to_b {
//!         optional attribute SA6 = 0x05 : uint8 "Optional byte";
//!     }
//! }
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use lcsfgen::{generate_all, parse, GenerateOptions};
//!
//! let protocol = parse(&std::fs::read_to_string("test.lcsf").unwrap()).unwrap();
//! let report = generate_all(&protocol, &GenerateOptions::new("out")).unwrap();
//! assert!(report.is_success());
//! ```

pub mod cgen;
pub mod extract;
pub mod flatten;
pub mod model;
pub mod output;
pub mod parser;
pub mod resolve;
pub mod rustgen;

pub use extract::{CodeExtractor, ExtractError, ExtractedCode};
pub use flatten::{prepare, validate, GenContext, ValidationError};
pub use model::{Attribute, Command, DataType, Direction, Protocol, Role};
pub use output::{generate_all, render, GenerateError, GenerateOptions, GenerationReport};
pub use parser::parse;
