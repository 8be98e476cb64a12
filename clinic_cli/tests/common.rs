use assert_cmd::Command;
use insta_cmd::get_cargo_bin;

pub const SPAM_SOURCE: &str =
	"#include \"Python.h\"\n\n/*[clinic input]\nmodule spam\nspam.eggs\n[clinic start generated \
	 code]*/\n\nstatic PyObject *\nspam_eggs_impl(PyObject *module)\n{\n    Py_RETURN_NONE;\n}\n";

pub fn clinic_cmd() -> Command {
	let mut cmd = Command::new(get_cargo_bin("clinic"));
	cmd.env("NO_COLOR", "1");
	cmd
}
