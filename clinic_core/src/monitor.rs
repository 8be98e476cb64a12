use std::path::Path;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

use crate::ClinicError;
use crate::ClinicResult;
use crate::Location;

static SIMPLE_DEFINED: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^defined\s*\(\s*[A-Za-z0-9_]+\s*\)$").unwrap_or_else(|e| panic!("{e}"))
});

/// How a conditional frame was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
	/// `#if`, `#ifdef` or `#ifndef`. `#endif` pops up to and including it.
	If,
	/// `#elif`. Popped on the way to the owning `If` frame.
	Elif,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionFrame {
	pub kind: FrameKind,
	pub condition: String,
}

/// Tracks C preprocessor conditional nesting, one line at a time.
///
/// The live condition is every open frame joined with `&&`:
///
/// ```rust
/// use clinic_core::Monitor;
///
/// let mut monitor = Monitor::new(None);
/// monitor.write("#ifdef HAVE_FORK\n#if X > 1\n").unwrap();
/// assert_eq!(monitor.condition(), "defined(HAVE_FORK) && (X > 1)");
/// monitor.write("#else\n").unwrap();
/// assert_eq!(monitor.condition(), "defined(HAVE_FORK) && !(X > 1)");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Monitor {
	file: Option<PathBuf>,
	stack: Vec<ConditionFrame>,
	in_comment: bool,
	continuation: Option<String>,
	line_number: usize,
}

impl Monitor {
	pub fn new(file: Option<&Path>) -> Self {
		Self {
			file: file.map(Path::to_path_buf),
			..Self::default()
		}
	}

	/// The conjunction of all open frames. Empty outside any conditional.
	pub fn condition(&self) -> String {
		self.stack
			.iter()
			.map(|frame| frame.condition.as_str())
			.collect::<Vec<_>>()
			.join(" && ")
	}

	pub fn stack(&self) -> &[ConditionFrame] {
		&self.stack
	}

	pub fn line_number(&self) -> usize {
		self.line_number
	}

	/// Feed several lines at once.
	pub fn write(&mut self, text: &str) -> ClinicResult<()> {
		for line in text.lines() {
			self.write_line(line)?;
		}
		Ok(())
	}

	/// Fails when a conditional is still open.
	pub fn close(&self) -> ClinicResult<()> {
		if self.stack.is_empty() {
			return Ok(());
		}

		Err(ClinicError::UnbalancedConditional {
			message: format!(
				"end of file reached inside a preprocessor conditional block ({})",
				self.condition()
			),
			location: self.location(),
		})
	}

	fn location(&self) -> Location {
		Location::new(self.file.as_deref(), Some(self.line_number))
	}

	pub fn write_line(&mut self, line: &str) -> ClinicResult<()> {
		self.write_line_at(line, self.line_number + 1)
	}

	/// Feed a line whose 1-based position in the file is known. Lines the
	/// caller skipped still count towards later diagnostics.
	pub fn write_line_at(&mut self, line: &str, line_number: usize) -> ClinicResult<()> {
		self.line_number = line_number;
		let mut line = line.trim().to_string();

		if let Some(pending) = self.continuation.take() {
			line = pending + &line;
		}

		if line.is_empty() {
			return Ok(());
		}

		if let Some(stripped) = line.strip_suffix('\\') {
			self.continuation = Some(format!("{} ", stripped.trim_end()));
			return Ok(());
		}

		let Some(line) = self.strip_comments(line) else {
			return Ok(());
		};

		let Some(directive) = line.trim_start().strip_prefix('#') else {
			return Ok(());
		};

		let mut fields = directive.split_whitespace();
		let Some(token) = fields.next() else {
			return Ok(());
		};
		let token = token.to_ascii_lowercase();
		let condition = fields.collect::<Vec<_>>().join(" ");

		match token.as_str() {
			"if" | "elif" => {
				self.require_condition(&token, &condition)?;
				let condition = if SIMPLE_DEFINED.is_match(&condition) {
					condition
				} else {
					format!("({condition})")
				};

				if token == "elif" {
					let previous = self.pop(&token)?;
					self.stack.push(ConditionFrame {
						kind: previous.kind,
						condition: negate(&previous.condition),
					});
					self.stack.push(ConditionFrame {
						kind: FrameKind::Elif,
						condition,
					});
				} else {
					self.stack.push(ConditionFrame {
						kind: FrameKind::If,
						condition,
					});
				}
			}
			"ifdef" | "ifndef" => {
				self.require_condition(&token, &condition)?;
				let symbols: Vec<&str> = condition.split_whitespace().collect();
				let [symbol] = symbols[..] else {
					return Err(ClinicError::InvalidDirective {
						message: format!("#{token} takes exactly one symbol, got `{condition}`"),
						location: self.location(),
					});
				};

				let defined = format!("defined({symbol})");
				let condition = if token == "ifndef" {
					negate(&defined)
				} else {
					defined
				};
				self.stack.push(ConditionFrame {
					kind: FrameKind::If,
					condition,
				});
			}
			"else" => {
				let previous = self.pop(&token)?;
				self.stack.push(ConditionFrame {
					kind: previous.kind,
					condition: negate(&previous.condition),
				});
			}
			"endif" => {
				while self.pop(&token)?.kind != FrameKind::If {}
			}
			_ => {}
		}

		Ok(())
	}

	/// Remove comments from `line`, updating the open-comment state. Returns
	/// `None` when the whole line is inside a comment.
	fn strip_comments(&mut self, mut line: String) -> Option<String> {
		if self.in_comment {
			let close = line.find("*/")?;
			line = line[close + 2..].to_string();
			self.in_comment = false;
		}

		while let Some(open) = line.find("/*") {
			let before = &line[..open];
			let remainder = &line[open + 2..];
			if let Some(close) = remainder.find("*/") {
				let after = &remainder[close + 2..];
				line = format!("{} {}", before.trim_end(), after.trim_start());
				continue;
			}

			// Unterminated: the rest of the line opens a block comment.
			line = before.trim_end().to_string();
			self.in_comment = true;
			break;
		}

		if let Some(comment) = line.find("//") {
			line.truncate(comment);
			line.truncate(line.trim_end().len());
		}

		Some(line)
	}

	fn require_condition(&self, token: &str, condition: &str) -> ClinicResult<()> {
		if condition.is_empty() {
			return Err(ClinicError::InvalidDirective {
				message: format!("#{token} line has no argument"),
				location: self.location(),
			});
		}
		Ok(())
	}

	fn pop(&mut self, token: &str) -> ClinicResult<ConditionFrame> {
		self.stack
			.pop()
			.ok_or_else(|| ClinicError::UnbalancedConditional {
				message: format!("#{token} without matching #if / #ifdef / #ifndef"),
				location: self.location(),
			})
	}
}

fn negate(condition: &str) -> String {
	match condition.strip_prefix('!') {
		Some(positive) => positive.to_string(),
		None => format!("!{condition}"),
	}
}
