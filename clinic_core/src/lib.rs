//! `clinic_core` regenerates code in place. Host source files carry
//! delimited regions written in a small DSL; each region is followed by the
//! code generated from it and a checksum marker. Running the engine again
//! rewrites only the generated parts and leaves every other byte alone.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Host file
//!   → BlockParser (verbatim / DSL blocks, checksum verification, preprocessor monitor)
//!   → DslParser (looked up by DSL name, writes into destinations)
//!   → BlockPrinter (re-emits blocks with fresh checksum markers)
//!   → end of pass (forced buffer dumps, satellite files)
//! ```
//!
//! ## Block Syntax
//!
//! For C sources:
//!
//! ```c
//! /*[clinic input]
//! module spam
//! spam.eggs
//! [clinic start generated code]*/
//! ...generated code...
//! /*[clinic end generated code: checksum=0123456789abcdef]*/
//! ```
//!
//! A marker whose checksum does not match the code above it means the code
//! was edited by hand. The pass fails with
//! [`ClinicError::ChecksumMismatch`] and nothing is written.
//!
//! ## Quick Start
//!
//! ```rust
//! use clinic_core::Clinic;
//! use clinic_core::Language;
//!
//! let input = "/*[clinic input]\n[clinic start generated code]*/\n";
//! let mut clinic = Clinic::new();
//! let output = clinic.process(input, None, &Language::c()).unwrap();
//! assert!(output.text.contains("/*[clinic end generated code: checksum="));
//! ```

pub use block::*;
pub use checksum::*;
pub use config::*;
pub use destination::*;
pub use dsl::*;
pub use engine::*;
pub use error::*;
pub use language::*;
pub use monitor::*;
pub use namespace::*;
pub use parser::*;
pub use printer::*;

mod block;
mod checksum;
pub mod config;
mod destination;
pub mod directives;
mod dsl;
mod engine;
#[allow(unused_assignments)]
mod error;
pub mod identifiers;
mod language;
mod monitor;
mod namespace;
mod parser;
mod printer;
pub mod project;
pub(crate) mod render;

#[cfg(test)]
mod __fixtures;
