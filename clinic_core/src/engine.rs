use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use tempfile::NamedTempFile;
use tracing::debug;
use tracing::warn;

use crate::Block;
use crate::BlockParser;
use crate::BlockPrinter;
use crate::ClinicConfig;
use crate::ClinicError;
use crate::ClinicResult;
use crate::DestinationConfig;
use crate::DestinationKind;
use crate::DestinationRegistry;
use crate::DslBlock;
use crate::DslParser;
use crate::Language;
use crate::LanguageMap;
use crate::Location;
use crate::Namespace;
use crate::ParserRegistry;
use crate::Session;
use crate::dsl::DIRECTIVE_DSL_NAME;

/// Sentinel body of a satellite file that may be regenerated.
pub const PRESERVE_INPUT: &str = "preserve\n";

/// Settings shared by every pass of a run.
#[derive(Debug, Clone)]
pub struct ClinicOptions {
	/// Verify recorded checksums. Disabled by `--force`.
	pub verify: bool,
	/// Preset applied after the built-in routes. `None` keeps the default.
	pub preset: Option<String>,
	/// Destinations created for every file.
	pub destinations: Vec<DestinationConfig>,
}

impl Default for ClinicOptions {
	fn default() -> Self {
		Self {
			verify: true,
			preset: None,
			destinations: Vec::new(),
		}
	}
}

/// A file produced by a `file` destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SatelliteFile {
	/// Name of the destination that produced it.
	pub destination: String,
	pub path: PathBuf,
	pub content: String,
	/// What was on disk before the pass, if anything.
	pub original: Option<String>,
}

impl SatelliteFile {
	pub fn is_changed(&self) -> bool {
		self.original.as_deref() != Some(self.content.as_str())
	}
}

/// The result of one pass over one input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassOutput {
	pub text: String,
	pub satellites: Vec<SatelliteFile>,
}

/// A pass over a file on disk, not yet written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpdate {
	pub path: PathBuf,
	pub original: String,
	pub output: PassOutput,
}

impl FileUpdate {
	/// Whether writing this update would change anything on disk.
	pub fn is_changed(&self) -> bool {
		self.original != self.output.text
			|| self.output.satellites.iter().any(SatelliteFile::is_changed)
	}
}

/// Runs passes over host files. Holds the per-run state: the languages,
/// the DSL parsers and the run options.
#[derive(Debug)]
pub struct Clinic {
	languages: LanguageMap,
	parsers: ParserRegistry,
	options: ClinicOptions,
}

impl Default for Clinic {
	fn default() -> Self {
		Self::new()
	}
}

impl Clinic {
	/// Built-in languages and parsers with default options.
	pub fn new() -> Self {
		Self {
			languages: LanguageMap::default(),
			parsers: ParserRegistry::with_builtins(),
			options: ClinicOptions::default(),
		}
	}

	pub fn from_config(config: &ClinicConfig) -> ClinicResult<Self> {
		Ok(Self {
			languages: config.language_map()?,
			parsers: ParserRegistry::with_builtins(),
			options: ClinicOptions {
				verify: config.verify,
				preset: config.preset.clone(),
				destinations: config.destinations.clone(),
			},
		})
	}

	#[must_use]
	pub fn with_parsers(mut self, parsers: ParserRegistry) -> Self {
		self.parsers = parsers;
		self
	}

	#[must_use]
	pub fn register(mut self, name: impl Into<String>, parser: impl DslParser + 'static) -> Self {
		self.parsers = self.parsers.register(name, parser);
		self
	}

	#[must_use]
	pub fn verify(mut self, verify: bool) -> Self {
		self.options.verify = verify;
		self
	}

	pub fn options(&self) -> &ClinicOptions {
		&self.options
	}

	pub fn options_mut(&mut self) -> &mut ClinicOptions {
		&mut self.options
	}

	pub fn languages(&self) -> &LanguageMap {
		&self.languages
	}

	pub fn parsers(&self) -> &ParserRegistry {
		&self.parsers
	}

	/// Regenerate every DSL block of `input`. Nothing is written; satellite
	/// files are returned alongside the text.
	pub fn process(
		&mut self,
		input: &str,
		path: Option<&Path>,
		language: &Language,
	) -> ClinicResult<PassOutput> {
		self.run_pass(input, path, language)
			.map_err(|e| e.with_file(path))
	}

	fn run_pass(
		&mut self,
		input: &str,
		path: Option<&Path>,
		language: &Language,
	) -> ClinicResult<PassOutput> {
		let Self {
			languages,
			parsers,
			options,
		} = self;

		debug!(path = ?path, language = %language.name, "processing");

		let mut destinations = DestinationRegistry::new(path)?;
		for destination in &options.destinations {
			destinations.add(&destination.name, &destination.kind, &destination.args())?;
		}
		if let Some(preset) = &options.preset {
			destinations.apply_preset(preset)?;
		}
		let mut namespace = Namespace::new();

		let mut parser = BlockParser::new(input, language)?
			.with_file(path)
			.verify(options.verify);
		let mut printer = BlockPrinter::new(language);

		while let Some(block) = parser.next() {
			let mut block = match block? {
				Block::Verbatim(text) => {
					printer.write(&text);
					continue;
				}
				Block::Dsl(block) => block,
			};

			debug!(dsl = %block.name, line = block.line, "regenerating block");

			let Some(dsl_parser) = parsers.get_mut(&block.name) else {
				return Err(ClinicError::UnknownDsl {
					name: block.name,
					location: Location::new(path, Some(block.line)),
				});
			};

			let mut session = Session {
				path,
				condition: parser.monitor().condition(),
				destinations: &mut destinations,
				namespace: &mut namespace,
			};
			let generated = dsl_parser.parse(&block, &mut session)?;

			let mut output = generated.output;
			output.push_str(&destinations.take_inline());
			block.signatures = generated.signatures;
			block.output = Some(output);
			printer.print_dsl_block(&block);
		}

		parser.finish()?;

		let mut satellites = Vec::new();
		for (name, kind, content) in destinations.drain_pending() {
			match kind {
				DestinationKind::Buffer => {
					warn!(destination = %name, path = ?path, "destination buffer not empty at end of file, emptying");
					printer.write("\n");
					let block =
						DslBlock::new(DIRECTIVE_DSL_NAME, format!("dump {name}\n")).with_output(content);
					printer.print_dsl_block(&block);
				}
				DestinationKind::File { path: target } => {
					let satellite_language = languages.for_path(&target).unwrap_or(language);
					satellites.push(render_satellite(
						name,
						target,
						content,
						satellite_language,
					)?);
				}
				DestinationKind::Suppress => {}
			}
		}

		Ok(PassOutput {
			text: printer.finish(),
			satellites,
		})
	}

	/// Read `path`, pick its language by extension and run a pass.
	pub fn process_file(&mut self, path: &Path) -> ClinicResult<FileUpdate> {
		let Some(language) = self.languages.for_path(path).cloned() else {
			return Err(ClinicError::Language(format!(
				"can't identify the language of `{}`",
				path.display()
			)));
		};

		let original = std::fs::read_to_string(path)?;
		let output = self.process(&original, Some(path), &language)?;

		Ok(FileUpdate {
			path: path.to_path_buf(),
			original,
			output,
		})
	}
}

/// Render the content of a `file` destination as a single preserve block,
/// refusing to replace a target that is not such a block.
fn render_satellite(
	destination: String,
	path: PathBuf,
	content: String,
	language: &Language,
) -> ClinicResult<SatelliteFile> {
	let original = match std::fs::read_to_string(&path) {
		Ok(existing) => {
			check_satellite(&existing, &path, language)?;
			Some(existing)
		}
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
		Err(e) => return Err(e.into()),
	};

	let block = DslBlock::new(DIRECTIVE_DSL_NAME, PRESERVE_INPUT).with_output(content);
	let mut printer = BlockPrinter::new(language);
	printer.print_dsl_block(&block);

	Ok(SatelliteFile {
		destination,
		path,
		content: printer.finish(),
		original,
	})
}

fn check_satellite(existing: &str, path: &Path, language: &Language) -> ClinicResult<()> {
	let conflict = |reason: String| {
		ClinicError::DestinationConflict {
			path: path.to_path_buf(),
			reason,
		}
	};

	let blocks: Vec<Block> = BlockParser::new(existing, language)?
		.with_file(Some(path))
		.collect::<ClinicResult<_>>()
		.map_err(|e| conflict(e.to_string()))?;

	match blocks.as_slice() {
		[Block::Dsl(block)] if block.input == PRESERVE_INPUT => Ok(()),
		[_] => Err(conflict("its block does not contain only `preserve`".to_string())),
		_ => Err(conflict(format!("expected one block, found {}", blocks.len()))),
	}
}

/// Write every changed satellite and then the file itself. Returns whether
/// anything was written.
///
/// Every target is staged in a temporary file before any of them is
/// persisted, so a target that cannot be created leaves all of them
/// untouched.
pub fn write_update(update: &FileUpdate) -> ClinicResult<bool> {
	let mut staged = Vec::new();

	for satellite in &update.output.satellites {
		if satellite.is_changed() {
			let file = stage_file(&satellite.path, &satellite.content)?;
			staged.push((satellite.path.as_path(), file));
		}
	}

	if update.original != update.output.text {
		let file = stage_file(&update.path, &update.output.text)?;
		staged.push((update.path.as_path(), file));
	}

	let written = !staged.is_empty();
	for (path, file) in staged {
		persist_file(file, path)?;
	}

	Ok(written)
}

/// Atomically replace `path` with `content`, creating parent directories.
/// The content goes to a temporary file in the same directory first and is
/// renamed over the target.
pub fn write_file(path: &Path, content: &str) -> ClinicResult<()> {
	let file = stage_file(path, content)?;
	persist_file(file, path)
}

fn stage_file(path: &Path, content: &str) -> ClinicResult<NamedTempFile> {
	let dir = match path.parent() {
		Some(parent) if !parent.as_os_str().is_empty() => parent,
		_ => Path::new("."),
	};
	std::fs::create_dir_all(dir)?;

	let mut file = NamedTempFile::new_in(dir)?;
	file.write_all(content.as_bytes())?;
	file.flush()?;
	Ok(file)
}

fn persist_file(file: NamedTempFile, path: &Path) -> ClinicResult<()> {
	file.persist(path).map_err(|e| ClinicError::Io(e.error))?;
	debug!(path = %path.display(), "wrote file");
	Ok(())
}
