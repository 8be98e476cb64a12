use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::ClinicError;
use crate::ClinicResult;
use crate::Language;
use crate::LanguageMap;

/// Default maximum file size in bytes (10 MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] =
	["clinic.toml", ".clinic.toml", ".config/clinic.toml"];

/// A language entry under `[languages]`, keyed by file extension.
///
/// Either the name of a built-in language:
///
/// ```toml
/// [languages]
/// pyx = "python"
/// ```
///
/// or a full descriptor:
///
/// ```toml
/// [languages.tmpl]
/// start_line = "<!--[{dsl_name} input]"
/// stop_line = "[{dsl_name} start generated code]-->"
/// checksum_line = "<!--[{dsl_name} end generated code: {arguments}]-->"
/// ```
#[derive(Debug, Clone, Deserialize, Eq, PartialEq)]
#[serde(untagged)]
#[non_exhaustive]
pub enum LanguageSource {
	Named(String),
	Custom(Language),
}

impl LanguageSource {
	pub fn resolve(&self) -> ClinicResult<Language> {
		match self {
			Self::Named(name) => {
				Language::builtin(name)
					.ok_or_else(|| ClinicError::ConfigParse(format!("unknown language `{name}`")))
			}
			Self::Custom(language) => {
				language.validate()?;
				Ok(language.clone())
			}
		}
	}
}

/// A destination created for every file before its first block.
///
/// ```toml
/// [[destinations]]
/// name = "generated"
/// type = "file"
/// path = "{dirname}/generated/{basename}.h"
/// ```
#[derive(Debug, Clone, Deserialize, Eq, PartialEq)]
pub struct DestinationConfig {
	pub name: String,
	#[serde(rename = "type")]
	pub kind: String,
	/// Path template, only for `file` destinations.
	#[serde(default)]
	pub path: Option<String>,
}

impl DestinationConfig {
	pub fn args(&self) -> Vec<&str> {
		self.path.as_deref().into_iter().collect()
	}
}

/// Configuration loaded from a `clinic.toml` file.
///
/// ```toml
/// verify = true
/// preset = "file"
///
/// [languages]
/// pyx = "python"
///
/// [exclude]
/// patterns = ["vendor/"]
///
/// [include]
/// patterns = ["extra/**/*.inc"]
/// ```
#[derive(Debug, Deserialize)]
pub struct ClinicConfig {
	/// Verify recorded checksums before regenerating. `false` has the same
	/// effect as `--force`.
	#[serde(default = "default_verify")]
	pub verify: bool,
	/// Output preset applied at the start of every file.
	#[serde(default)]
	pub preset: Option<String>,
	/// Extra languages by file extension. These override the built-in
	/// extension table.
	#[serde(default)]
	pub languages: BTreeMap<String, LanguageSource>,
	#[serde(default)]
	pub destinations: Vec<DestinationConfig>,
	/// Exclusion configuration using gitignore-style patterns.
	#[serde(default)]
	pub exclude: ExcludeConfig,
	/// Inclusion configuration, additional glob patterns to scan.
	#[serde(default)]
	pub include: IncludeConfig,
	/// Files larger than this are skipped during discovery.
	#[serde(default = "default_max_file_size")]
	pub max_file_size: u64,
	/// When true, `.gitignore` files are not used for filtering.
	#[serde(default)]
	pub disable_gitignore: bool,
}

impl Default for ClinicConfig {
	fn default() -> Self {
		Self {
			verify: default_verify(),
			preset: None,
			languages: BTreeMap::new(),
			destinations: Vec::new(),
			exclude: ExcludeConfig::default(),
			include: IncludeConfig::default(),
			max_file_size: DEFAULT_MAX_FILE_SIZE,
			disable_gitignore: false,
		}
	}
}

fn default_verify() -> bool {
	true
}

fn default_max_file_size() -> u64 {
	DEFAULT_MAX_FILE_SIZE
}

/// Configuration for excluding files from discovery.
#[derive(Debug, Default, Deserialize)]
pub struct ExcludeConfig {
	/// Gitignore-style patterns relative to the project root.
	///
	/// Examples: `"build/"`, `"*_generated.c"`, `"!keep.c"`.
	#[serde(default)]
	pub patterns: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IncludeConfig {
	/// Additional glob patterns for files to scan, relative to the project
	/// root.
	#[serde(default)]
	pub patterns: Vec<String>,
}

impl ClinicConfig {
	/// The first config file that exists under `root`.
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if there is none.
	pub fn load(root: &Path) -> ClinicResult<Option<ClinicConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		Self::parse(&content).map(Some)
	}

	pub fn parse(content: &str) -> ClinicResult<ClinicConfig> {
		let config: ClinicConfig =
			toml::from_str(content).map_err(|e| ClinicError::ConfigParse(e.to_string()))?;

		for language in config.languages.values() {
			language.resolve()?;
		}

		Ok(config)
	}

	/// The built-in extension table extended with `[languages]`.
	pub fn language_map(&self) -> ClinicResult<LanguageMap> {
		let mut map = LanguageMap::default();
		for (extension, source) in &self.languages {
			map.insert(extension.as_str(), source.resolve()?);
		}
		Ok(map)
	}
}
