//! Discovery of the host files in a project that contain DSL blocks.

use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use globset::Glob;
use globset::GlobSet;
use globset::GlobSetBuilder;
use ignore::gitignore::Gitignore;
use ignore::gitignore::GitignoreBuilder;
use tracing::debug;
use tracing::warn;

use crate::ClinicConfig;
use crate::ClinicError;
use crate::ClinicResult;
use crate::DEFAULT_MAX_FILE_SIZE;
use crate::LanguageMap;

/// What to walk and what to skip.
#[derive(Debug, Clone)]
pub struct ScanOptions {
	pub exclude_patterns: Vec<String>,
	pub include_patterns: Vec<String>,
	pub max_file_size: u64,
	pub disable_gitignore: bool,
}

impl Default for ScanOptions {
	fn default() -> Self {
		Self {
			exclude_patterns: Vec::new(),
			include_patterns: Vec::new(),
			max_file_size: DEFAULT_MAX_FILE_SIZE,
			disable_gitignore: false,
		}
	}
}

impl ScanOptions {
	pub fn from_config(config: &ClinicConfig) -> Self {
		Self {
			exclude_patterns: config.exclude.patterns.clone(),
			include_patterns: config.include.patterns.clone(),
			max_file_size: config.max_file_size,
			disable_gitignore: config.disable_gitignore,
		}
	}
}

/// Collect every file under `root` with a known language whose text holds at
/// least one start line. The result is sorted.
pub fn collect_sources(
	root: &Path,
	languages: &LanguageMap,
	options: &ScanOptions,
) -> ClinicResult<Vec<PathBuf>> {
	let gitignore = if options.disable_gitignore {
		Gitignore::empty()
	} else {
		build_gitignore(root)
	};
	let exclude = build_exclude_matcher(root, &options.exclude_patterns)?;

	let mut candidates = Vec::new();
	let mut visited_dirs = HashSet::new();
	walk_dir(
		root,
		&mut candidates,
		&gitignore,
		&exclude,
		&mut visited_dirs,
	)?;

	if !options.include_patterns.is_empty() {
		let include = build_include_set(&options.include_patterns)?;
		collect_included_files(root, root, &include, &exclude, &mut candidates)?;
	}

	candidates.sort();
	candidates.dedup();

	let mut sources = Vec::new();
	for path in candidates {
		if has_blocks(&path, languages, options.max_file_size)? {
			sources.push(path);
		}
	}

	debug!(root = %root.display(), count = sources.len(), "collected sources");
	Ok(sources)
}

fn has_blocks(path: &Path, languages: &LanguageMap, max_file_size: u64) -> ClinicResult<bool> {
	let Some(language) = languages.for_path(path) else {
		return Ok(false);
	};

	let size = std::fs::metadata(path)?.len();
	if size > max_file_size {
		warn!(
			path = %path.display(),
			size,
			max_file_size,
			"skipping file larger than the size limit"
		);
		return Ok(false);
	}

	let Ok(content) = std::fs::read_to_string(path) else {
		debug!(path = %path.display(), "skipping file that is not valid UTF-8");
		return Ok(false);
	};

	let start = language.start_regex()?;
	Ok(content
		.lines()
		.any(|line| start.is_match(line.trim_start())))
}

/// Gitignore-style `[exclude]` patterns, applied on top of `.gitignore`.
fn build_exclude_matcher(root: &Path, patterns: &[String]) -> ClinicResult<Gitignore> {
	let mut builder = GitignoreBuilder::new(root);
	for pattern in patterns {
		builder.add_line(None, pattern).map_err(|e| {
			ClinicError::ConfigParse(format!("invalid exclude pattern `{pattern}`: {e}"))
		})?;
	}
	builder
		.build()
		.map_err(|e| ClinicError::ConfigParse(format!("failed to build exclude rules: {e}")))
}

fn build_gitignore(root: &Path) -> Gitignore {
	let mut builder = GitignoreBuilder::new(root);
	let gitignore_path = root.join(".gitignore");
	if gitignore_path.exists() {
		let _ = builder.add(gitignore_path);
	}
	builder.build().unwrap_or_else(|_| Gitignore::empty())
}

fn build_include_set(patterns: &[String]) -> ClinicResult<GlobSet> {
	let mut builder = GlobSetBuilder::new();
	for pattern in patterns {
		let glob = Glob::new(pattern).map_err(|e| {
			ClinicError::ConfigParse(format!("invalid include pattern `{pattern}`: {e}"))
		})?;
		builder.add(glob);
	}
	builder
		.build()
		.map_err(|e| ClinicError::ConfigParse(format!("failed to build include set: {e}")))
}

fn is_ignored_directory_name(name: &str) -> bool {
	name.starts_with('.') || name == "node_modules" || name == "target"
}

fn walk_dir(
	dir: &Path,
	files: &mut Vec<PathBuf>,
	gitignore: &Gitignore,
	exclude: &Gitignore,
	visited_dirs: &mut HashSet<PathBuf>,
) -> ClinicResult<()> {
	if !dir.is_dir() {
		return Ok(());
	}

	let canonical = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
	if !visited_dirs.insert(canonical) {
		return Err(ClinicError::SymlinkCycle {
			path: dir.display().to_string(),
		});
	}

	for entry in std::fs::read_dir(dir)? {
		let path = entry?.path();

		if path
			.file_name()
			.and_then(|n| n.to_str())
			.is_some_and(is_ignored_directory_name)
		{
			continue;
		}

		let is_dir = path.is_dir();
		if gitignore.matched(&path, is_dir).is_ignore() || exclude.matched(&path, is_dir).is_ignore()
		{
			continue;
		}

		if is_dir {
			walk_dir(&path, files, gitignore, exclude, visited_dirs)?;
		} else {
			files.push(path);
		}
	}

	Ok(())
}

/// Files matching `[include]` globs, even where the main walk skipped them.
fn collect_included_files(
	root: &Path,
	dir: &Path,
	include: &GlobSet,
	exclude: &Gitignore,
	files: &mut Vec<PathBuf>,
) -> ClinicResult<()> {
	if !dir.is_dir() {
		return Ok(());
	}

	for entry in std::fs::read_dir(dir)? {
		let path = entry?.path();
		let is_dir = path.is_dir();

		if exclude.matched(&path, is_dir).is_ignore() {
			continue;
		}

		if is_dir {
			if path.is_symlink() {
				continue;
			}
			collect_included_files(root, &path, include, exclude, files)?;
		} else if path
			.strip_prefix(root)
			.is_ok_and(|relative| include.is_match(relative))
		{
			files.push(path);
		}
	}

	Ok(())
}
