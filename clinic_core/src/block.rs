use crate::dsl::Signature;

/// One piece of a host file, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
	/// Text outside any DSL region. Re-emitted byte for byte.
	Verbatim(String),
	/// A delimited DSL region and the output generated for it.
	Dsl(DslBlock),
}

impl Block {
	pub fn dsl_name(&self) -> Option<&str> {
		match self {
			Self::Verbatim(_) => None,
			Self::Dsl(block) => Some(&block.name),
		}
	}

	/// The verbatim text, or the DSL body with its prefix removed.
	pub fn input(&self) -> &str {
		match self {
			Self::Verbatim(text) => text,
			Self::Dsl(block) => &block.input,
		}
	}
}

/// A DSL region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DslBlock {
	/// The name captured from the start line, e.g. `clinic`.
	pub name: String,
	/// The body between the start and stop lines, body prefix removed.
	pub input: String,
	/// Declarations produced by the DSL parser.
	pub signatures: Vec<Signature>,
	/// Generated text. `None` when the file had no verified output for this
	/// block yet.
	pub output: Option<String>,
	/// Leading whitespace of the start line.
	pub indent: String,
	/// 1-indexed line of the start marker.
	pub line: usize,
}

impl DslBlock {
	pub fn new(name: impl Into<String>, input: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			input: input.into(),
			..Self::default()
		}
	}

	#[must_use]
	pub fn with_output(mut self, output: impl Into<String>) -> Self {
		self.output = Some(output.into());
		self
	}

	/// 1-indexed line of the first body line.
	pub fn body_line(&self) -> usize {
		self.line + 1
	}
}
