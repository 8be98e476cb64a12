use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;

use crate::ClinicError;
use crate::ClinicResult;

const DSL_NAME: &str = "{dsl_name}";
const ARGUMENTS: &str = "{arguments}";

/// The marker templates of a host language.
///
/// `start_line`, `stop_line` and `body_prefix` may use `{dsl_name}`;
/// `checksum_line` must use both `{dsl_name}` and `{arguments}`.
///
/// ```toml
/// [languages.tmpl]
/// start_line = "<!--[{dsl_name} input]"
/// body_prefix = ""
/// stop_line = "[{dsl_name} start generated code]-->"
/// checksum_line = "<!--[{dsl_name} end generated code: {arguments}]-->"
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Language {
	#[serde(default = "default_language_name")]
	pub name: String,
	pub start_line: String,
	#[serde(default)]
	pub body_prefix: String,
	pub stop_line: String,
	pub checksum_line: String,
	/// Whether lines of this language should be fed through the C
	/// preprocessor monitor.
	#[serde(default)]
	pub preprocessor: bool,
}

fn default_language_name() -> String {
	"custom".to_string()
}

impl Language {
	/// Build a language, validating that every template carries its
	/// placeholders.
	pub fn new(
		name: impl Into<String>,
		start_line: impl Into<String>,
		body_prefix: impl Into<String>,
		stop_line: impl Into<String>,
		checksum_line: impl Into<String>,
	) -> ClinicResult<Self> {
		let language = Self {
			name: name.into(),
			start_line: start_line.into(),
			body_prefix: body_prefix.into(),
			stop_line: stop_line.into(),
			checksum_line: checksum_line.into(),
			preprocessor: false,
		};
		language.validate()?;
		Ok(language)
	}

	/// C and C-family headers: markers live inside block comments.
	pub fn c() -> Self {
		Self {
			name: "c".to_string(),
			start_line: "/*[{dsl_name} input]".to_string(),
			body_prefix: String::new(),
			stop_line: "[{dsl_name} start generated code]*/".to_string(),
			checksum_line: "/*[{dsl_name} end generated code: {arguments}]*/".to_string(),
			preprocessor: true,
		}
	}

	/// Python: every marker and body line is a `#` comment.
	pub fn python() -> Self {
		Self {
			name: "python".to_string(),
			start_line: "#/*[{dsl_name} input]".to_string(),
			body_prefix: "#".to_string(),
			stop_line: "#[{dsl_name} start generated code]*/".to_string(),
			checksum_line: "#/*[{dsl_name} end generated code: {arguments}]*/".to_string(),
			preprocessor: false,
		}
	}

	/// Look up a built-in language by name.
	pub fn builtin(name: &str) -> Option<Self> {
		match name.to_ascii_lowercase().as_str() {
			"c" | "cpp" | "c++" => Some(Self::c()),
			"python" | "py" => Some(Self::python()),
			_ => None,
		}
	}

	#[must_use]
	pub fn with_preprocessor(mut self, preprocessor: bool) -> Self {
		self.preprocessor = preprocessor;
		self
	}

	pub fn validate(&self) -> ClinicResult<()> {
		for (label, template) in [
			("start_line", &self.start_line),
			("stop_line", &self.stop_line),
			("checksum_line", &self.checksum_line),
		] {
			if template.matches(DSL_NAME).count() != 1 {
				return Err(ClinicError::Language(format!(
					"`{label}` of `{}` must contain `{DSL_NAME}` exactly once: `{template}`",
					self.name
				)));
			}
		}

		if self.checksum_line.matches(ARGUMENTS).count() != 1 {
			return Err(ClinicError::Language(format!(
				"`checksum_line` of `{}` must contain `{ARGUMENTS}` exactly once: `{}`",
				self.name, self.checksum_line
			)));
		}

		if self.start_line.trim().is_empty() || self.stop_line.trim().is_empty() {
			return Err(ClinicError::Language(format!(
				"`{}` has an empty start or stop line",
				self.name
			)));
		}

		Ok(())
	}

	pub fn start_line_for(&self, dsl_name: &str) -> String {
		self.start_line.replace(DSL_NAME, dsl_name)
	}

	pub fn stop_line_for(&self, dsl_name: &str) -> String {
		self.stop_line.replace(DSL_NAME, dsl_name)
	}

	pub fn body_prefix_for(&self, dsl_name: &str) -> String {
		self.body_prefix.replace(DSL_NAME, dsl_name)
	}

	pub fn checksum_line_for(&self, dsl_name: &str, arguments: &str) -> String {
		self.checksum_line
			.replace(DSL_NAME, dsl_name)
			.replace(ARGUMENTS, arguments)
	}

	/// Regex matching a whole start line, capturing the DSL name.
	pub(crate) fn start_regex(&self) -> ClinicResult<Regex> {
		let (before, after) = split_template(&self.start_line, DSL_NAME)?;
		line_regex(before, r"\w+", after)
	}

	/// Regex matching a whole checksum line for `dsl_name`, capturing the
	/// argument list.
	pub(crate) fn checksum_regex(&self, dsl_name: &str) -> ClinicResult<Regex> {
		let template = self.checksum_line.replace(DSL_NAME, dsl_name);
		let (before, after) = split_template(&template, ARGUMENTS)?;
		line_regex(before, ".+", after)
	}
}

fn split_template<'a>(template: &'a str, placeholder: &str) -> ClinicResult<(&'a str, &'a str)> {
	template.split_once(placeholder).ok_or_else(|| {
		ClinicError::Language(format!("`{template}` does not contain `{placeholder}`"))
	})
}

fn line_regex(before: &str, group: &str, after: &str) -> ClinicResult<Regex> {
	let pattern = format!(
		"^{}({group}){}$",
		regex::escape(before),
		regex::escape(after)
	);
	Regex::new(&pattern).map_err(|e| ClinicError::Language(e.to_string()))
}

/// Maps file extensions to languages.
#[derive(Debug, Clone)]
pub struct LanguageMap {
	by_extension: BTreeMap<String, Language>,
}

impl Default for LanguageMap {
	fn default() -> Self {
		let mut by_extension = BTreeMap::new();
		for ext in ["c", "cc", "cpp", "cxx", "h", "hh", "hpp"] {
			by_extension.insert(ext.to_string(), Language::c());
		}
		for ext in ["py", "pyi", "pyw"] {
			by_extension.insert(ext.to_string(), Language::python());
		}
		Self { by_extension }
	}
}

impl LanguageMap {
	pub fn insert(&mut self, extension: impl Into<String>, language: Language) {
		let extension = extension.into();
		let extension = extension.trim_start_matches('.').to_ascii_lowercase();
		self.by_extension.insert(extension, language);
	}

	/// The language registered for `path`'s extension.
	pub fn for_path(&self, path: &Path) -> Option<&Language> {
		let ext = path.extension()?.to_str()?.to_ascii_lowercase();
		self.by_extension.get(&ext)
	}

	pub fn extensions(&self) -> impl Iterator<Item = &str> {
		self.by_extension.keys().map(String::as_str)
	}
}
