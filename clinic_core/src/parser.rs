use std::path::Path;
use std::path::PathBuf;

use regex::Regex;

use crate::Block;
use crate::ClinicError;
use crate::ClinicResult;
use crate::DslBlock;
use crate::Language;
use crate::Location;
use crate::MarkerArguments;
use crate::Monitor;

/// A cursor over the lines of a source buffer. Lines keep their trailing
/// newline. Pushing lines back is a matter of moving the index backwards.
#[derive(Debug, Clone)]
pub(crate) struct LineCursor<'a> {
	lines: Vec<&'a str>,
	index: usize,
}

impl<'a> LineCursor<'a> {
	pub(crate) fn new(text: &'a str) -> Self {
		Self {
			lines: text.split_inclusive('\n').collect(),
			index: 0,
		}
	}

	pub(crate) fn is_exhausted(&self) -> bool {
		self.index >= self.lines.len()
	}

	/// Number of lines consumed so far, which is also the 1-indexed number
	/// of the last consumed line.
	pub(crate) fn position(&self) -> usize {
		self.index
	}

	pub(crate) fn rewind_to(&mut self, position: usize) {
		self.index = position.min(self.index);
	}
}

impl<'a> Iterator for LineCursor<'a> {
	type Item = &'a str;

	fn next(&mut self) -> Option<Self::Item> {
		let line = self.lines.get(self.index).copied()?;
		self.index += 1;
		Some(line)
	}
}

fn strip_newline(line: &str) -> &str {
	line.trim_end_matches(['\n', '\r'])
}

/// A start line seen but not yet turned into a block.
#[derive(Debug, Clone)]
struct PendingStart {
	name: String,
	indent: String,
	line: usize,
}

/// Splits host text into [`Block`]s, lazily and in document order.
///
/// Parsing stops at the first error; after that the iterator yields `None`.
pub struct BlockParser<'a> {
	language: &'a Language,
	cursor: LineCursor<'a>,
	file: Option<PathBuf>,
	verify: bool,
	start_re: Regex,
	checksum_re: Option<(String, Regex)>,
	pending: Option<PendingStart>,
	first_block: bool,
	failed: bool,
	monitor: Monitor,
}

impl<'a> BlockParser<'a> {
	pub fn new(text: &'a str, language: &'a Language) -> ClinicResult<Self> {
		Ok(Self {
			language,
			cursor: LineCursor::new(text),
			file: None,
			verify: true,
			start_re: language.start_regex()?,
			checksum_re: None,
			pending: None,
			first_block: true,
			failed: false,
			monitor: Monitor::new(None),
		})
	}

	/// Name the file being parsed in diagnostics.
	#[must_use]
	pub fn with_file(mut self, file: Option<&Path>) -> Self {
		self.file = file.map(Path::to_path_buf);
		self.monitor = Monitor::new(file);
		self
	}

	/// Whether recorded checksums are verified. Defaults to `true`.
	#[must_use]
	pub fn verify(mut self, verify: bool) -> Self {
		self.verify = verify;
		self
	}

	/// The preprocessor state after every line consumed so far.
	pub fn monitor(&self) -> &Monitor {
		&self.monitor
	}

	/// Check end-of-file invariants once every block has been read.
	pub fn finish(&self) -> ClinicResult<()> {
		if self.language.preprocessor {
			self.monitor.close()?;
		}
		Ok(())
	}

	fn location(&self, line: usize) -> Location {
		Location::new(self.file.as_deref(), Some(line))
	}

	fn feed(&mut self, line: &str) -> ClinicResult<()> {
		if self.language.preprocessor {
			self.monitor
				.write_line_at(strip_newline(line), self.cursor.position())?;
		}
		Ok(())
	}

	fn match_start(&self, line: &str) -> Option<PendingStart> {
		let trimmed = line.trim_start();
		let captures = self.start_re.captures(strip_newline(trimmed))?;
		Some(PendingStart {
			name: captures[1].to_string(),
			indent: line[..line.len() - trimmed.len()].to_string(),
			line: self.cursor.position(),
		})
	}

	fn next_block(&mut self) -> ClinicResult<Option<Block>> {
		loop {
			if let Some(start) = self.pending.take() {
				let block = self.parse_dsl_block(start)?;
				self.first_block = false;
				return Ok(Some(Block::Dsl(block)));
			}

			if self.cursor.is_exhausted() {
				return Ok(None);
			}

			let text = self.parse_verbatim_block()?;
			if self.first_block && text.is_empty() {
				self.first_block = false;
				continue;
			}

			self.first_block = false;
			return Ok(Some(Block::Verbatim(text)));
		}
	}

	fn parse_verbatim_block(&mut self) -> ClinicResult<String> {
		let mut text = String::new();

		while let Some(line) = self.cursor.next() {
			self.feed(line)?;
			if let Some(start) = self.match_start(line) {
				self.pending = Some(start);
				break;
			}
			text.push_str(line);
		}

		Ok(text)
	}

	fn parse_dsl_block(&mut self, start: PendingStart) -> ClinicResult<DslBlock> {
		let stop_line = self.language.stop_line_for(&start.name);
		let body_prefix = self.language.body_prefix_for(&start.name);
		let mut block = DslBlock {
			name: start.name,
			indent: start.indent,
			line: start.line,
			..DslBlock::default()
		};

		while let Some(line) = self.cursor.next() {
			self.feed(line)?;
			let line_number = self.cursor.position();

			if self.is_stop_line(line, &stop_line, line_number)? {
				break;
			}

			if let Some(next) = self.match_start(line) {
				// The body was never closed. The new start line is already
				// consumed, so remember it and leave this block without
				// output.
				self.pending = Some(next);
				return Ok(block);
			}

			if body_prefix.is_empty() {
				block.input.push_str(line);
				continue;
			}

			let Some(rest) = line.trim_start().strip_prefix(body_prefix.as_str()) else {
				return Err(ClinicError::malformed(
					format!(
						"body line {:?} is missing the `{body_prefix}` prefix",
						strip_newline(line)
					),
					self.location(line_number),
				));
			};
			block.input.push_str(rest);
		}

		block.output = self.parse_output(&block.name)?;
		Ok(block)
	}

	fn is_stop_line(&self, line: &str, stop_line: &str, line_number: usize) -> ClinicResult<bool> {
		if let Some(remainder) = line.strip_prefix(stop_line) {
			if !remainder.trim().is_empty() {
				return Err(ClinicError::malformed(
					format!("garbage after stop line: {:?}", strip_newline(remainder)),
					self.location(line_number),
				));
			}
			return Ok(true);
		}

		if line.trim_start().starts_with(stop_line) {
			return Err(ClinicError::malformed(
				format!(
					"whitespace is not allowed before the stop line: {:?}",
					strip_newline(line)
				),
				self.location(line_number),
			));
		}

		Ok(false)
	}

	fn checksum_regex(&mut self, dsl_name: &str) -> ClinicResult<Regex> {
		if let Some((name, regex)) = &self.checksum_re {
			if name == dsl_name {
				return Ok(regex.clone());
			}
		}

		let regex = self.language.checksum_regex(dsl_name)?;
		self.checksum_re = Some((dsl_name.to_string(), regex.clone()));
		Ok(regex)
	}

	/// Scan what follows a DSL body for previously generated output and its
	/// checksum marker. Without a marker the scanned lines are pushed back.
	fn parse_output(&mut self, dsl_name: &str) -> ClinicResult<Option<String>> {
		let checksum_re = self.checksum_regex(dsl_name)?;
		let rewind_position = self.cursor.position();
		let mut output = String::new();
		let mut marker = None;

		while let Some(line) = self.cursor.next() {
			if let Some(captures) = checksum_re.captures(strip_newline(line.trim_start())) {
				marker = Some(captures[1].to_string());
				break;
			}

			output.push_str(line);
			if self.match_start(line).is_some() {
				break;
			}
		}

		let Some(arguments) = marker else {
			self.cursor.rewind_to(rewind_position);
			return Ok(None);
		};

		let location = self.location(self.cursor.position());
		let arguments = MarkerArguments::parse(&arguments, &location)?;
		if self.verify {
			arguments.verify(&output, &location)?;
		}

		Ok(Some(output))
	}
}

impl Iterator for BlockParser<'_> {
	type Item = ClinicResult<Block>;

	fn next(&mut self) -> Option<Self::Item> {
		if self.failed {
			return None;
		}

		let result = self.next_block().transpose();
		if matches!(result, Some(Err(_))) {
			self.failed = true;
		}
		result
	}
}

/// Parse a whole text into blocks, verifying checksums.
pub fn parse_blocks(text: &str, language: &Language) -> ClinicResult<Vec<Block>> {
	BlockParser::new(text, language)?.collect()
}
