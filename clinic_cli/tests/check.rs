mod common;

use clap::Parser;
use clinic_cli::ClinicCli;
use clinic_cli::Commands;
use clinic_cli::OutputFormat;
use clinic_core::AnyEmptyResult;
use serde_json::Value;
use similar_asserts::assert_eq;

fn update(root: &std::path::Path) {
	common::clinic_cmd()
		.arg("update")
		.arg("--path")
		.arg(root)
		.assert()
		.success();
}

#[test]
fn check_passes_when_up_to_date() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("spam.c"), common::SPAM_SOURCE)?;
	update(tmp.path());

	common::clinic_cmd()
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("up to date"));

	Ok(())
}

#[test]
fn check_fails_when_stale() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("spam.c"), common::SPAM_SOURCE)?;

	common::clinic_cmd()
		.arg("check")
		.arg("--diff")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(1)
		.stderr(predicates::str::contains("Out of date files:"))
		.stderr(predicates::str::contains("+/*[clinic end generated code: checksum="));

	assert_eq!(
		std::fs::read_to_string(tmp.path().join("spam.c"))?,
		common::SPAM_SOURCE
	);

	Ok(())
}

#[test]
fn check_json_lists_stale_files() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("spam.c"), common::SPAM_SOURCE)?;

	let output = common::clinic_cmd()
		.arg("check")
		.arg("--format")
		.arg("json")
		.arg("--path")
		.arg(tmp.path())
		.output()?;
	assert_eq!(output.status.code(), Some(1));

	let json: Value = serde_json::from_slice(&output.stdout)?;
	assert_eq!(json["ok"], Value::Bool(false));
	assert_eq!(json["stale"][0]["file"], Value::String("spam.c".to_string()));
	assert_eq!(
		json["stale"][0]["satellites"][0],
		Value::String("clinic/spam.c.h".to_string())
	);

	Ok(())
}

#[test]
fn check_github_annotations() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("spam.c"), common::SPAM_SOURCE)?;

	common::clinic_cmd()
		.arg("check")
		.arg("--format")
		.arg("github")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(1)
		.stdout(predicates::str::contains("::warning file=spam.c::"));

	Ok(())
}

#[test]
fn check_reports_unbalanced_conditionals() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(
		tmp.path().join("spam.c"),
		format!("{}#endif\n", common::SPAM_SOURCE),
	)?;

	common::clinic_cmd()
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("unbalanced conditional"));

	Ok(())
}

#[test]
fn list_shows_blocks() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("spam.c"), common::SPAM_SOURCE)?;

	common::clinic_cmd()
		.arg("list")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("spam.c:3  clinic  pending"));

	update(tmp.path());

	common::clinic_cmd()
		.arg("list")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("spam.c:3  clinic  generated"));

	Ok(())
}

#[test]
fn list_without_blocks() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("plain.c"), "int main(void) { return 0; }\n")?;

	common::clinic_cmd()
		.arg("list")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("No DSL blocks found."));

	Ok(())
}

#[test]
fn parse_check_arguments() {
	let cli = ClinicCli::parse_from(["clinic", "check", "--diff", "a.c", "b.c"]);
	match cli.command {
		Some(Commands::Check {
			files,
			diff,
			format,
		}) => {
			assert!(diff);
			assert_eq!(files.len(), 2);
			assert!(matches!(format, OutputFormat::Text));
		}
		_ => panic!("expected Check command"),
	}
}

#[test]
fn parse_update_arguments() {
	let cli = ClinicCli::parse_from(["clinic", "update", "--force", "--dry-run"]);
	match cli.command {
		Some(Commands::Update {
			files,
			force,
			dry_run,
			output,
		}) => {
			assert!(force);
			assert!(dry_run);
			assert!(files.is_empty());
			assert!(output.is_none());
		}
		_ => panic!("expected Update command"),
	}
}
