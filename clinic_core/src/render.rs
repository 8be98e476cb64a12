use serde::Serialize;

use crate::Category;
use crate::ClinicError;
use crate::ClinicResult;
use crate::FunctionSignature;

const CPP_IF: &str = "{% if condition %}#if {{ condition }}\n\n{% endif %}";

const DOCSTRING_PROTOTYPE: &str = "PyDoc_VAR({{ c_basename }}__doc__);\n\n";

const DOCSTRING_DEFINITION: &str = r#"PyDoc_STRVAR({{ c_basename }}__doc__,
"{{ name }}($module, /)\n"
"--\n"
"\n");

"#;

const METHODDEF_DEFINE: &str = r#"#define {{ methoddef }}    \
    {"{{ name }}", (PyCFunction){{ c_basename }}, METH_NOARGS, {{ c_basename }}__doc__},

"#;

const IMPL_PROTOTYPE: &str = "static PyObject *\n{{ c_basename }}_impl(PyObject *module);\n\n";

const PARSER_PROTOTYPE: &str =
	"static PyObject *\n{{ c_basename }}(PyObject *module, PyObject *Py_UNUSED(ignored));\n\n";

const PARSER_DEFINITION: &str = "static PyObject *
{{ c_basename }}(PyObject *module, PyObject *Py_UNUSED(ignored))
{
    return {{ c_basename }}_impl(module);
}
";

const CPP_ENDIF: &str = "{% if condition %}\n#endif /* {{ condition }} */\n{% endif %}";

const METHODDEF_IFNDEF: &str = "{% if condition %}
#ifndef {{ methoddef }}
    #define {{ methoddef }}
#endif /* !defined({{ methoddef }}) */
{% endif %}";

const IMPL_DEFINITION: &str = "static PyObject *\n{{ c_basename }}_impl(PyObject *module)\n";

fn template_source(category: Category) -> &'static str {
	match category {
		Category::CppIf => CPP_IF,
		Category::DocstringPrototype => DOCSTRING_PROTOTYPE,
		Category::DocstringDefinition => DOCSTRING_DEFINITION,
		Category::MethoddefDefine => METHODDEF_DEFINE,
		Category::ImplPrototype => IMPL_PROTOTYPE,
		Category::ParserPrototype => PARSER_PROTOTYPE,
		Category::ParserDefinition => PARSER_DEFINITION,
		Category::CppEndif => CPP_ENDIF,
		Category::MethoddefIfndef => METHODDEF_IFNDEF,
		Category::ImplDefinition => IMPL_DEFINITION,
	}
}

#[derive(Debug, Serialize)]
struct FunctionContext<'a> {
	full_name: &'a str,
	name: &'a str,
	c_basename: &'a str,
	methoddef: String,
	condition: Option<&'a str>,
}

/// Render every category for one function declaration, in render order.
/// Categories that render to nothing are left out.
pub fn render_function(signature: &FunctionSignature) -> ClinicResult<Vec<(Category, String)>> {
	let mut env = minijinja::Environment::new();
	env.set_keep_trailing_newline(true);
	for category in Category::ALL {
		env.add_template(category.as_str(), template_source(category))
			.map_err(|e| ClinicError::TemplateRender(e.to_string()))?;
	}

	let name = signature
		.full_name
		.rsplit('.')
		.next()
		.unwrap_or(&signature.full_name);
	let context = FunctionContext {
		full_name: &signature.full_name,
		name,
		c_basename: &signature.c_basename,
		methoddef: format!("{}_METHODDEF", signature.c_basename.to_ascii_uppercase()),
		condition: signature.condition.as_deref(),
	};
	let context = minijinja::Value::from_serialize(&context);

	let mut rendered = Vec::with_capacity(Category::ALL.len());
	for category in Category::ALL {
		let text = env
			.get_template(category.as_str())
			.and_then(|template| template.render(&context))
			.map_err(|e| ClinicError::TemplateRender(e.to_string()))?;
		if !text.is_empty() {
			rendered.push((category, text));
		}
	}

	Ok(rendered)
}
