/// Reserved words of C. A Python-level name that collides with one needs
/// a suffix before it can be used as a C identifier.
const C_KEYWORDS: &[&str] = &[
	"asm", "auto", "break", "case", "char", "const", "continue", "default", "do", "double",
	"else", "enum", "extern", "float", "for", "goto", "if", "inline", "int", "long", "register",
	"return", "short", "signed", "sizeof", "static", "struct", "switch", "typedef", "typeof",
	"union", "unsigned", "void", "volatile", "while",
];

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_legal_c_identifier(name: &str) -> bool {
	let mut chars = name.chars();
	let Some(first) = chars.next() else {
		return false;
	};
	(first.is_ascii_alphabetic() || first == '_')
		&& chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// One or more C identifiers joined by dots.
pub fn is_legal_dotted_name(name: &str) -> bool {
	name.split('.').all(is_legal_c_identifier)
}

/// Append `_value` to C keywords. Returns `None` for names that are not
/// identifiers at all.
pub fn ensure_legal_c_identifier(name: &str) -> Option<String> {
	if !is_legal_c_identifier(name) {
		return None;
	}
	if C_KEYWORDS.contains(&name) {
		return Some(format!("{name}_value"));
	}
	Some(name.to_string())
}

/// Flatten a dotted name into a C name: `os.path.join` → `os_path_join`.
pub fn c_basename(full_name: &str) -> String {
	full_name.replace('.', "_")
}
