use crate::Category;
use crate::ClinicError;
use crate::ClinicResult;
use crate::DslBlock;
use crate::DslParser;
use crate::FunctionSignature;
use crate::Generated;
use crate::Location;
use crate::Session;
use crate::Signature;
use crate::identifiers::c_basename;
use crate::identifiers::is_legal_dotted_name;
use crate::render::render_function;

/// The built-in `clinic` DSL.
///
/// Each non-blank body line not starting with `#` is either a directive
/// (`module`, `class`, `destination`, `output`, `dump`, `preserve`) or a
/// dotted function name. At most one function may be declared per block.
#[derive(Debug, Clone, Default)]
pub struct DirectiveParser;

/// State for one block.
struct BlockState {
	output: String,
	preserve: bool,
	function: Option<String>,
	signatures: Vec<Signature>,
}

impl DslParser for DirectiveParser {
	fn parse(&mut self, block: &DslBlock, session: &mut Session<'_>) -> ClinicResult<Generated> {
		let mut state = BlockState {
			output: String::new(),
			preserve: false,
			function: None,
			signatures: Vec::new(),
		};

		for (offset, line) in block.input.lines().enumerate() {
			let line = line.trim();
			if line.is_empty() || line.starts_with('#') {
				continue;
			}

			let location = Location::new(session.path, Some(block.body_line() + offset));
			let fields: Vec<&str> = line.split_whitespace().collect();
			run_line(&fields, session, &mut state, &location).map_err(|e| {
				e.with_line(block.body_line() + offset)
					.with_file(session.path)
			})?;
		}

		state.output.push_str(&session.destinations.take_inline());

		if state.preserve {
			if !state.output.is_empty() {
				return Err(ClinicError::directive(
					"`preserve` only works for blocks that don't produce any output",
					Location::new(session.path, Some(block.line)),
				));
			}
			return Ok(Generated {
				signatures: state.signatures,
				output: block.output.clone().unwrap_or_default(),
			});
		}

		Ok(Generated {
			signatures: state.signatures,
			output: state.output,
		})
	}
}

fn run_line(
	fields: &[&str],
	session: &mut Session<'_>,
	state: &mut BlockState,
	location: &Location,
) -> ClinicResult<()> {
	match fields {
		["module", name] => {
			require_dotted_name(name, location)?;
			session.namespace.declare_module(name, location)?;
			state.signatures.push(Signature::Module {
				name: (*name).to_string(),
			});
		}
		["class", name] => {
			require_dotted_name(name, location)?;
			session.namespace.declare_class(name, location)?;
			state.signatures.push(Signature::Class {
				name: (*name).to_string(),
			});
		}
		["module" | "class", ..] => {
			return Err(ClinicError::directive(
				format!("`{}` takes exactly one name", fields[0]),
				location.clone(),
			));
		}
		["destination", name, "new", kind, args @ ..] => {
			session.destinations.add(name, kind, args)?;
		}
		["destination", name, "clear"] => {
			session.destinations.clear(name)?;
		}
		["destination", ..] => {
			return Err(ClinicError::directive(
				"usage: `destination NAME new TYPE [PATH]` or `destination NAME clear`",
				location.clone(),
			));
		}
		["output", "push"] => session.destinations.push_routes(),
		["output", "pop"] => session.destinations.pop_routes()?,
		["output", "preset", name] => session.destinations.apply_preset(name)?,
		["output", "everything", destination] => {
			session.destinations.route_everything(destination)?;
		}
		["output", category, destination] => {
			let category: Category = category.parse()?;
			session.destinations.set_route(category, destination, 0)?;
		}
		["output", ..] => {
			return Err(ClinicError::directive(
				"usage: `output CATEGORY DESTINATION`, `output everything DESTINATION`, `output \
				 preset NAME`, `output push` or `output pop`",
				location.clone(),
			));
		}
		["dump", name] => {
			let text = session.destinations.dump(name)?;
			state.output.push_str(&text);
		}
		["preserve"] => {
			if state.preserve {
				return Err(ClinicError::directive("can't have `preserve` twice in one block", location.clone()));
			}
			state.preserve = true;
		}
		[name] if is_legal_dotted_name(name) => declare_function(name, session, state, location)?,
		_ => {
			return Err(ClinicError::directive(
				format!("unknown directive `{}`", fields.join(" ")),
				location.clone(),
			));
		}
	}

	Ok(())
}

fn require_dotted_name(name: &str, location: &Location) -> ClinicResult<()> {
	if is_legal_dotted_name(name) {
		return Ok(());
	}
	Err(ClinicError::directive(
		format!("illegal name `{name}`"),
		location.clone(),
	))
}

fn declare_function(
	full_name: &str,
	session: &mut Session<'_>,
	state: &mut BlockState,
	location: &Location,
) -> ClinicResult<()> {
	if let Some(previous) = &state.function {
		return Err(ClinicError::directive(
			format!("can't declare `{full_name}`: this block already declares `{previous}`"),
			location.clone(),
		));
	}

	let fields: Vec<&str> = full_name.split('.').collect();
	session.namespace.resolve(&fields, location)?;

	let signature = FunctionSignature {
		full_name: full_name.to_string(),
		c_basename: c_basename(full_name),
		condition: session.condition().map(ToString::to_string),
	};
	for (category, text) in render_function(&signature)? {
		session.destinations.write(category, &text)?;
	}

	state.function = Some(full_name.to_string());
	state.signatures.push(Signature::Function(signature));
	Ok(())
}
