use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Regenerate code embedded in source files, in place.",
	long_about = "clinic scans source files for DSL blocks, regenerates the code that follows \
	              each block, and rewrites the file so that everything else is left \
	              untouched.\n\nGenerated code carries a checksum. If it was edited by hand, \
	              clinic refuses to overwrite it unless `--force` is given.\n\nQuick start:\n  \
	              clinic update   Regenerate every block in the project\n  clinic check    \
	              Fail when a file is out of date\n  clinic list     Show every block"
)]
pub struct ClinicCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Enable verbose output and debug logging.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Regenerate the DSL blocks of the given files, or of every source file
	/// in the project.
	///
	/// Files whose generated code was edited by hand are refused. Satellite
	/// files written by `file` destinations are only replaced when they
	/// still hold a single `preserve` block.
	Update {
		/// Files to process. Defaults to every discovered source file.
		files: Vec<PathBuf>,

		/// Regenerate even when a recorded checksum does not match.
		#[arg(long, short, default_value_t = false)]
		force: bool,

		/// Report what would change without writing anything.
		#[arg(long, default_value_t = false)]
		dry_run: bool,

		/// Write the result here instead of over the input. Requires exactly
		/// one input file.
		#[arg(long, short)]
		output: Option<PathBuf>,
	},
	/// Check that every file is up to date.
	///
	/// Exits with a non-zero status when regenerating any file would change
	/// it. Nothing is written.
	Check {
		/// Files to check. Defaults to every discovered source file.
		files: Vec<PathBuf>,

		/// Show a diff for each out of date file.
		#[arg(long, default_value_t = false)]
		diff: bool,

		/// Output format for check results. Use `text` for human-readable
		/// output, `json` for programmatic consumption, or `github` for
		/// GitHub Actions annotations.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
	/// List every DSL block with its file, line and DSL name.
	List {
		/// Files to list. Defaults to every discovered source file.
		files: Vec<PathBuf>,
	},
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text output with colors and formatting.
	Text,
	/// JSON output for programmatic consumption.
	Json,
	/// GitHub Actions annotation format.
	Github,
}
