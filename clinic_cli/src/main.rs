use std::path::Path;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use clinic_cli::ClinicCli;
use clinic_cli::Commands;
use clinic_cli::OutputFormat;
use clinic_core::Block;
use clinic_core::BlockParser;
use clinic_core::Clinic;
use clinic_core::ClinicConfig;
use clinic_core::ClinicError;
use clinic_core::FileUpdate;
use clinic_core::project::ScanOptions;
use clinic_core::project::collect_sources;
use clinic_core::write_file;
use clinic_core::write_update;
use owo_colors::OwoColorize;
use similar::ChangeTag;
use similar::TextDiff;
use tracing::debug;
use tracing_subscriber::EnvFilter;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() {
	let args = ClinicCli::parse();

	let use_color = !args.no_color
		&& std::env::var_os("NO_COLOR").is_none()
		&& supports_color::on(supports_color::Stream::Stderr).is_some();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	let default_level = if args.verbose { "debug" } else { "warn" };
	let _ = tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
		)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.try_init();

	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	let result = match &args.command {
		Some(Commands::Update {
			files,
			force,
			dry_run,
			output,
		}) => run_update(&args, files, *force, *dry_run, output.as_deref()).map(|()| false),
		Some(Commands::Check {
			files,
			diff,
			format,
		}) => run_check(&args, files, *diff, *format),
		Some(Commands::List { files }) => run_list(&args, files).map(|()| false),
		None => {
			eprintln!("No subcommand specified. Run `clinic --help` for usage.");
			process::exit(1);
		}
	};

	match result {
		Ok(false) => {}
		Ok(true) => process::exit(1),
		Err(e) => {
			match e.downcast::<ClinicError>() {
				Ok(clinic_err) => {
					let report: miette::Report = (*clinic_err).into();
					eprintln!("{report:?}");
				}
				Err(e) => {
					eprintln!("{} {e}", colored!("error:", red));
				}
			}
			process::exit(2);
		}
	}
}

fn resolve_root(args: &ClinicCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// The run configured from the project's `clinic.toml`, plus the files to
/// process: the ones named on the command line, or every discovered source.
fn prepare(args: &ClinicCli, files: &[PathBuf]) -> CliResult<(Clinic, Vec<PathBuf>)> {
	let root = resolve_root(args);
	let config = ClinicConfig::load(&root)?.unwrap_or_default();
	let clinic = Clinic::from_config(&config)?;

	let files = if files.is_empty() {
		collect_sources(&root, clinic.languages(), &ScanOptions::from_config(&config))?
	} else {
		files
			.iter()
			.map(|file| {
				if file.is_absolute() || args.path.is_none() {
					file.clone()
				} else {
					root.join(file)
				}
			})
			.collect()
	};

	debug!(root = %root.display(), files = files.len(), "prepared run");
	Ok((clinic, files))
}

fn run_update(
	args: &ClinicCli,
	files: &[PathBuf],
	force: bool,
	dry_run: bool,
	output: Option<&Path>,
) -> CliResult<()> {
	let (clinic, files) = prepare(args, files)?;
	let mut clinic = clinic.verify(!force);
	let root = resolve_root(args);

	if output.is_some() && files.len() != 1 {
		return Err("`--output` requires exactly one input file".into());
	}

	let mut updates: Vec<FileUpdate> = Vec::new();
	for path in &files {
		let update = clinic.process_file(path)?;
		if update.is_changed() || output.is_some() {
			updates.push(update);
		}
	}

	if updates.is_empty() {
		println!("All files are already up to date.");
		return Ok(());
	}

	if dry_run {
		println!("Dry run: would update {} file(s):", updates.len());
		for update in &updates {
			println!("  {}", make_relative(&update.path, &root));
			for satellite in update.output.satellites.iter().filter(|s| s.is_changed()) {
				println!("  {}", make_relative(&satellite.path, &root));
			}
		}
		return Ok(());
	}

	for update in &updates {
		if let Some(output) = output {
			for satellite in update.output.satellites.iter().filter(|s| s.is_changed()) {
				write_file(&satellite.path, &satellite.content)?;
			}
			write_file(output, &update.output.text)?;
		} else {
			write_update(update)?;
		}
	}

	println!("Updated {} file(s).", updates.len());
	if args.verbose {
		for update in &updates {
			println!("  {}", make_relative(&update.path, &root));
		}
	}

	Ok(())
}

/// Returns `true` when any file is out of date.
fn run_check(
	args: &ClinicCli,
	files: &[PathBuf],
	show_diff: bool,
	format: OutputFormat,
) -> CliResult<bool> {
	let (mut clinic, files) = prepare(args, files)?;
	let root = resolve_root(args);

	let mut stale = Vec::new();
	for path in &files {
		let update = clinic.process_file(path)?;
		if update.is_changed() {
			stale.push(update);
		}
	}

	if stale.is_empty() {
		match format {
			OutputFormat::Json => println!("{{\"ok\":true,\"stale\":[]}}"),
			OutputFormat::Github => println!("All files are up to date."),
			OutputFormat::Text => println!("Check passed: all files are up to date."),
		}
		return Ok(false);
	}

	match format {
		OutputFormat::Json => {
			let entries: Vec<serde_json::Value> = stale
				.iter()
				.map(|update| {
					let satellites: Vec<String> = update
						.output
						.satellites
						.iter()
						.filter(|s| s.is_changed())
						.map(|s| make_relative(&s.path, &root))
						.collect();
					serde_json::json!({
						"file": make_relative(&update.path, &root),
						"satellites": satellites,
					})
				})
				.collect();
			let output = serde_json::json!({
				"ok": false,
				"stale": entries,
			});
			println!("{output}");
		}
		OutputFormat::Github => {
			for update in &stale {
				let rel = make_relative(&update.path, &root);
				println!("::warning file={rel}::Generated code in `{rel}` is out of date");
			}
			eprintln!("{} file(s) are out of date", stale.len());
		}
		OutputFormat::Text => {
			eprintln!("Check failed.");
			eprintln!();
			eprintln!("Out of date files:");
			for update in &stale {
				eprintln!("  {}", make_relative(&update.path, &root));
				if show_diff {
					print_diff(&update.original, &update.output.text);
				}
			}
			eprintln!();
			eprintln!(
				"{} file(s) are out of date. Run `clinic update` to regenerate them.",
				stale.len()
			);
		}
	}

	Ok(true)
}

fn run_list(args: &ClinicCli, files: &[PathBuf]) -> CliResult<()> {
	let (clinic, files) = prepare(args, files)?;
	let root = resolve_root(args);

	let mut found = false;
	for path in &files {
		let Some(language) = clinic.languages().for_path(path) else {
			continue;
		};
		let text = std::fs::read_to_string(path)?;
		let rel = make_relative(path, &root);

		for block in BlockParser::new(&text, language)?
			.with_file(Some(path.as_path()))
			.verify(false)
		{
			let Block::Dsl(block) = block? else {
				continue;
			};
			if !found {
				println!("{}", colored!("Blocks:", bold));
				found = true;
			}
			let state = if block.output.is_some() {
				colored!("generated", green)
			} else {
				colored!("pending", red)
			};
			println!("  {rel}:{}  {}  {state}", block.line, block.name);
		}
	}

	if !found {
		println!("No DSL blocks found.");
	}

	Ok(())
}

/// Print a unified diff between two strings, colorized.
fn print_diff(current: &str, expected: &str) {
	let diff = TextDiff::from_lines(current, expected);
	for change in diff.iter_all_changes() {
		match change.tag() {
			ChangeTag::Delete => {
				eprint!("  {}", colored!(format!("-{change}"), red));
			}
			ChangeTag::Insert => {
				eprint!("  {}", colored!(format!("+{change}"), green));
			}
			ChangeTag::Equal => {
				eprint!("   {change}");
			}
		}
	}
}

/// Make a path relative to root for display purposes.
fn make_relative(path: &Path, root: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.display()
		.to_string()
}
