use crate::Clinic;
use crate::ClinicResult;
use crate::DslBlock;
use crate::DslParser;
use crate::Generated;
use crate::Language;
use crate::ParserRegistry;
use crate::Session;
use crate::compute_checksum;

/// A language whose markers are plain bracketed tags.
pub(crate) fn marker_language() -> Language {
	Language::new(
		"marker",
		"[start {dsl_name}]",
		"",
		"[stop {dsl_name}]",
		"[end {dsl_name} {arguments}]",
	)
	.unwrap_or_else(|e| panic!("marker language: {e}"))
}

/// Echoes the block body as its output.
#[derive(Debug, Default)]
pub(crate) struct EchoParser;

impl DslParser for EchoParser {
	fn parse(&mut self, block: &DslBlock, _session: &mut Session<'_>) -> ClinicResult<Generated> {
		Ok(Generated::output(block.input.clone()))
	}
}

/// A run that knows the `foo` DSL as an echo.
pub(crate) fn echo_clinic() -> Clinic {
	Clinic::new().with_parsers(ParserRegistry::new().register("foo", EchoParser))
}

/// A `clinic` block in C syntax with no generated output yet.
pub(crate) fn c_block(body: &str) -> String {
	format!("/*[clinic input]\n{body}[clinic start generated code]*/\n")
}

/// A `clinic` block in C syntax with `output` and its valid marker.
pub(crate) fn c_block_with_output(body: &str, output: &str) -> String {
	format!(
		"{}{output}/*[clinic end generated code: checksum={}]*/\n",
		c_block(body),
		compute_checksum(output, 16)
	)
}

/// The end-to-end sample: one `foo` block between two verbatim lines.
pub(crate) fn echo_document() -> String {
	format!(
		"a\n[start foo]\nbody\n[stop foo]\nbody\n[end foo checksum={}]\nb\n",
		compute_checksum("body\n", 16)
	)
}
