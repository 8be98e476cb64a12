use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::ClinicResult;
use crate::DestinationRegistry;
use crate::DslBlock;
use crate::Namespace;
use crate::directives::DirectiveParser;

/// The DSL name of the built-in directive parser. Forced buffer dumps and
/// satellite files are written as blocks of this DSL.
pub const DIRECTIVE_DSL_NAME: &str = "clinic";

/// A declaration produced by a DSL parser.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Signature {
	Module { name: String },
	Class { name: String },
	Function(FunctionSignature),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
	/// Dotted name, e.g. `os.path.join`.
	pub full_name: String,
	/// C-safe flattened name, e.g. `os_path_join`.
	pub c_basename: String,
	/// The preprocessor condition in effect where the block was declared.
	pub condition: Option<String>,
}

/// What a DSL parser produced for one block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Generated {
	pub signatures: Vec<Signature>,
	pub output: String,
}

impl Generated {
	pub fn output(output: impl Into<String>) -> Self {
		Self {
			signatures: Vec::new(),
			output: output.into(),
		}
	}
}

/// Per-pass state handed to a DSL parser for one block.
pub struct Session<'a> {
	/// The file being processed, when it has one.
	pub path: Option<&'a Path>,
	/// Condition from the preprocessor monitor at the block's position.
	/// Empty outside any conditional.
	pub condition: String,
	pub destinations: &'a mut DestinationRegistry,
	pub namespace: &'a mut Namespace,
}

impl Session<'_> {
	/// The current condition, or `None` outside any conditional.
	pub fn condition(&self) -> Option<&str> {
		if self.condition.is_empty() {
			None
		} else {
			Some(&self.condition)
		}
	}
}

/// Generates the output of one DSL.
pub trait DslParser {
	/// Parse `block` and return its declarations and generated text. Text
	/// routed to the `block` destination is appended to the output by the
	/// caller.
	fn parse(&mut self, block: &DslBlock, session: &mut Session<'_>) -> ClinicResult<Generated>;
}

/// The parsers available to a run, keyed by DSL name. Built once before the
/// first file is processed.
#[derive(Default)]
pub struct ParserRegistry {
	parsers: BTreeMap<String, Box<dyn DslParser>>,
}

impl ParserRegistry {
	/// An empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// A registry with the built-in directive parser under
	/// [`DIRECTIVE_DSL_NAME`].
	pub fn with_builtins() -> Self {
		Self::new().register(DIRECTIVE_DSL_NAME, DirectiveParser::default())
	}

	#[must_use]
	pub fn register(mut self, name: impl Into<String>, parser: impl DslParser + 'static) -> Self {
		self.parsers.insert(name.into(), Box::new(parser));
		self
	}

	pub fn contains(&self, name: &str) -> bool {
		self.parsers.contains_key(name)
	}

	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.parsers.keys().map(String::as_str)
	}

	pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut (dyn DslParser + 'static)> {
		self.parsers.get_mut(name).map(Box::as_mut)
	}
}

impl fmt::Debug for ParserRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.parsers.keys()).finish()
	}
}
