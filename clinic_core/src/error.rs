use std::fmt;
use std::path::Path;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Where an error was detected. Both parts are optional: the block parser
/// knows lines but may be running over in-memory text, and directory level
/// failures have a file but no line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
	pub file: Option<PathBuf>,
	/// 1-indexed line number.
	pub line: Option<usize>,
}

impl Location {
	pub fn new(file: Option<&Path>, line: Option<usize>) -> Self {
		Self {
			file: file.map(Path::to_path_buf),
			line,
		}
	}

	pub fn at_line(line: usize) -> Self {
		Self {
			file: None,
			line: Some(line),
		}
	}
}

impl fmt::Display for Location {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match (&self.file, self.line) {
			(Some(file), Some(line)) => write!(f, " at {}:{line}", file.display()),
			(Some(file), None) => write!(f, " in {}", file.display()),
			(None, Some(line)) => write!(f, " at line {line}"),
			(None, None) => Ok(()),
		}
	}
}

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum ClinicError {
	#[error(transparent)]
	#[diagnostic(code(clinic::io_error))]
	Io(#[from] std::io::Error),

	#[error("malformed markup{location}: {message}")]
	#[diagnostic(
		code(clinic::malformed_markup),
		help("block markers must match the language templates exactly")
	)]
	MalformedMarkup { message: String, location: Location },

	#[error("checksum mismatch{location}: expected `{expected}`, computed `{computed}`")]
	#[diagnostic(
		code(clinic::checksum_mismatch),
		help(
			"generated code was edited by hand; remove all generated code including the end \
			 marker, or rerun with `--force`"
		)
	)]
	ChecksumMismatch {
		expected: String,
		computed: String,
		location: Location,
	},

	#[error("unbalanced conditional{location}: {message}")]
	#[diagnostic(code(clinic::unbalanced_conditional))]
	UnbalancedConditional { message: String, location: Location },

	#[error("invalid preprocessor directive{location}: {message}")]
	#[diagnostic(code(clinic::invalid_directive))]
	InvalidDirective { message: String, location: Location },

	#[error("destination file `{}` modified; not overwriting: {reason}", path.display())]
	#[diagnostic(
		code(clinic::destination_conflict),
		help("delete the file to let clinic regenerate it")
	)]
	DestinationConflict { path: PathBuf, reason: String },

	#[error("destination error{location}: {message}")]
	#[diagnostic(code(clinic::destination))]
	Destination { message: String, location: Location },

	#[error("parent class or module `{path}` does not exist{location}")]
	#[diagnostic(
		code(clinic::resolution),
		help("declare it first with a `module` or `class` directive")
	)]
	Resolution { path: String, location: Location },

	#[error("{message}{location}")]
	#[diagnostic(code(clinic::directive))]
	Directive { message: String, location: Location },

	#[error("no parser registered for `{name}` blocks{location}")]
	#[diagnostic(code(clinic::unknown_dsl))]
	UnknownDsl { name: String, location: Location },

	#[error("invalid language template: {0}")]
	#[diagnostic(
		code(clinic::language),
		help("start and stop lines need `{{dsl_name}}`; the checksum line also needs `{{arguments}}`")
	)]
	Language(String),

	#[error("template rendering failed: {0}")]
	#[diagnostic(code(clinic::template_render))]
	TemplateRender(String),

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(clinic::config_parse),
		help("check that clinic.toml is valid TOML")
	)]
	ConfigParse(String),

	#[error("symlink cycle detected at: `{path}`")]
	#[diagnostic(
		code(clinic::symlink_cycle),
		help("remove the circular symlink or exclude this path")
	)]
	SymlinkCycle { path: String },
}

impl ClinicError {
	pub(crate) fn malformed(message: impl Into<String>, location: Location) -> Self {
		Self::MalformedMarkup {
			message: message.into(),
			location,
		}
	}

	pub(crate) fn destination(message: impl Into<String>) -> Self {
		Self::Destination {
			message: message.into(),
			location: Location::default(),
		}
	}

	pub(crate) fn directive(message: impl Into<String>, location: Location) -> Self {
		Self::Directive {
			message: message.into(),
			location,
		}
	}

	fn location(&self) -> Option<&Location> {
		match self {
			Self::MalformedMarkup { location, .. }
			| Self::ChecksumMismatch { location, .. }
			| Self::UnbalancedConditional { location, .. }
			| Self::InvalidDirective { location, .. }
			| Self::Destination { location, .. }
			| Self::Resolution { location, .. }
			| Self::Directive { location, .. }
			| Self::UnknownDsl { location, .. } => Some(location),
			_ => None,
		}
	}

	fn location_mut(&mut self) -> Option<&mut Location> {
		match self {
			Self::MalformedMarkup { location, .. }
			| Self::ChecksumMismatch { location, .. }
			| Self::UnbalancedConditional { location, .. }
			| Self::InvalidDirective { location, .. }
			| Self::Destination { location, .. }
			| Self::Resolution { location, .. }
			| Self::Directive { location, .. }
			| Self::UnknownDsl { location, .. } => Some(location),
			_ => None,
		}
	}

	/// The file the error was raised in, when known.
	pub fn file(&self) -> Option<&Path> {
		match self {
			Self::DestinationConflict { path, .. } => Some(path),
			_ => self.location().and_then(|l| l.file.as_deref()),
		}
	}

	/// The 1-indexed line the error was raised at, when known.
	pub fn line(&self) -> Option<usize> {
		self.location().and_then(|l| l.line)
	}

	/// Attach a file path unless the error already names one.
	#[must_use]
	pub fn with_file(mut self, file: Option<&Path>) -> Self {
		if let (Some(file), Some(location)) = (file, self.location_mut()) {
			if location.file.is_none() {
				location.file = Some(file.to_path_buf());
			}
		}
		self
	}

	/// Attach a line number unless the error already has one.
	#[must_use]
	pub fn with_line(mut self, line: usize) -> Self {
		if let Some(location) = self.location_mut() {
			if location.line.is_none() {
				location.line = Some(line);
			}
		}
		self
	}
}

pub type ClinicResult<T> = Result<T, ClinicError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
