use crate::Block;
use crate::DslBlock;
use crate::Language;
use crate::checksum::marker_arguments;

/// Re-emits blocks as host text.
#[derive(Debug)]
pub struct BlockPrinter<'a> {
	language: &'a Language,
	buffer: String,
}

impl<'a> BlockPrinter<'a> {
	pub fn new(language: &'a Language) -> Self {
		Self {
			language,
			buffer: String::new(),
		}
	}

	pub fn write(&mut self, text: &str) {
		self.buffer.push_str(text);
	}

	pub fn print_block(&mut self, block: &Block) {
		match block {
			Block::Verbatim(text) => self.buffer.push_str(text),
			Block::Dsl(block) => self.print_dsl_block(block),
		}
	}

	/// Print a DSL block with a checksum marker computed from its current
	/// output. A block without output is printed with an empty one.
	pub fn print_dsl_block(&mut self, block: &DslBlock) {
		let language = self.language;
		let name = block.name.as_str();

		self.buffer.push_str(&block.indent);
		self.buffer.push_str(&language.start_line_for(name));
		self.buffer.push('\n');

		let body_prefix = language.body_prefix_for(name);
		for line in block.input.split_inclusive('\n') {
			self.buffer.push_str(&body_prefix);
			self.buffer.push_str(line);
		}
		if !block.input.is_empty() && !block.input.ends_with('\n') {
			self.buffer.push('\n');
		}

		self.buffer.push_str(&language.stop_line_for(name));
		self.buffer.push('\n');

		let mut output = block.output.clone().unwrap_or_default();
		if !output.is_empty() && !output.ends_with('\n') {
			output.push('\n');
		}
		self.buffer.push_str(&output);

		let arguments = marker_arguments(&output);
		self.buffer
			.push_str(&language.checksum_line_for(name, &arguments));
		self.buffer.push('\n');
	}

	pub fn finish(self) -> String {
		self.buffer
	}
}

/// Print a sequence of blocks.
pub fn print_blocks<'b>(language: &Language, blocks: impl IntoIterator<Item = &'b Block>) -> String {
	let mut printer = BlockPrinter::new(language);
	for block in blocks {
		printer.print_block(block);
	}
	printer.finish()
}
