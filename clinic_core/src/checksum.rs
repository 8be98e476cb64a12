use sha1::Digest;
use sha1::Sha1;

use crate::ClinicError;
use crate::ClinicResult;
use crate::Location;

/// Number of hex digits written into new checksum markers.
pub const CHECKSUM_LENGTH: usize = 16;

/// Hex SHA-1 of `text`, truncated to `length` digits (at most 40).
pub fn compute_checksum(text: &str, length: usize) -> String {
	let mut digest = hex::encode(Sha1::digest(text.as_bytes()));
	digest.truncate(length);
	digest
}

/// Arguments carried on a checksum marker line.
///
/// Markers written by older releases record the digest under `output=`
/// (alongside an `input=` digest of the block body); current releases write
/// `checksum=`. Both keys are read, and each one that is present must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerArguments {
	pub checksum: Option<String>,
	pub output: Option<String>,
	pub input: Option<String>,
}

impl MarkerArguments {
	/// Parse whitespace separated `key=value` pairs. Unknown keys are
	/// ignored; a field without `=` is malformed.
	pub fn parse(arguments: &str, location: &Location) -> ClinicResult<Self> {
		let mut parsed = Self::default();

		for field in arguments.split_whitespace() {
			let Some((key, value)) = field.split_once('=') else {
				return Err(ClinicError::malformed(
					format!("mangled checksum marker argument `{field}` in `{arguments}`"),
					location.clone(),
				));
			};

			let key = key.trim();
			let value = value.trim().to_string();
			if value.is_empty() && key != "input" {
				return Err(ClinicError::malformed(
					format!("empty digest for `{key}` in `{arguments}`"),
					location.clone(),
				));
			}

			match key {
				"checksum" => parsed.checksum = Some(value),
				"output" => parsed.output = Some(value),
				"input" => parsed.input = Some(value),
				_ => {}
			}
		}

		if parsed.checksum.is_none() && parsed.output.is_none() {
			return Err(ClinicError::malformed(
				format!("checksum marker `{arguments}` has neither `checksum=` nor `output=`"),
				location.clone(),
			));
		}

		Ok(parsed)
	}

	/// Every recorded digest of the generated output.
	fn recorded(&self) -> impl Iterator<Item = &str> {
		self.checksum.iter().chain(self.output.iter()).map(String::as_str)
	}

	/// Check the recorded digests against `output`. Each digest is compared
	/// with a freshly computed one of the same length.
	pub fn verify(&self, output: &str, location: &Location) -> ClinicResult<()> {
		for expected in self.recorded() {
			let computed = compute_checksum(output, expected.len());
			if computed != expected {
				return Err(ClinicError::ChecksumMismatch {
					expected: expected.to_string(),
					computed,
					location: location.clone(),
				});
			}
		}

		Ok(())
	}
}

/// Render the argument list for a freshly printed marker.
pub fn marker_arguments(output: &str) -> String {
	format!("checksum={}", compute_checksum(output, CHECKSUM_LENGTH))
}
