use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;

use crate::ClinicError;
use crate::ClinicResult;

/// Name of the destination drained into each block's own output.
pub const INLINE_DESTINATION: &str = "block";

/// Path template of the built-in `file` destination.
pub const DEFAULT_FILE_TEMPLATE: &str = "{dirname}/clinic/{basename}.h";

/// A kind of generated text. Each category is routed to one destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
	CppIf,
	DocstringPrototype,
	DocstringDefinition,
	MethoddefDefine,
	ImplPrototype,
	ParserPrototype,
	ParserDefinition,
	CppEndif,
	MethoddefIfndef,
	ImplDefinition,
}

impl Category {
	/// Every category in render order.
	pub const ALL: [Self; 10] = [
		Self::CppIf,
		Self::DocstringPrototype,
		Self::DocstringDefinition,
		Self::MethoddefDefine,
		Self::ImplPrototype,
		Self::ParserPrototype,
		Self::ParserDefinition,
		Self::CppEndif,
		Self::MethoddefIfndef,
		Self::ImplDefinition,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::CppIf => "cpp_if",
			Self::DocstringPrototype => "docstring_prototype",
			Self::DocstringDefinition => "docstring_definition",
			Self::MethoddefDefine => "methoddef_define",
			Self::ImplPrototype => "impl_prototype",
			Self::ParserPrototype => "parser_prototype",
			Self::ParserDefinition => "parser_definition",
			Self::CppEndif => "cpp_endif",
			Self::MethoddefIfndef => "methoddef_ifndef",
			Self::ImplDefinition => "impl_definition",
		}
	}
}

impl fmt::Display for Category {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Category {
	type Err = ClinicError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|category| category.as_str() == s)
			.ok_or_else(|| ClinicError::destination(format!("unknown output category `{s}`")))
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationKind {
	/// Text is discarded.
	Suppress,
	/// Text accumulates until dumped.
	Buffer,
	/// Text accumulates and is written to a satellite file at end of pass.
	File { path: PathBuf },
}

impl DestinationKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Suppress => "suppress",
			Self::Buffer => "buffer",
			Self::File { .. } => "file",
		}
	}
}

/// A named sink for generated text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
	pub name: String,
	pub kind: DestinationKind,
	sections: Vec<String>,
}

impl Destination {
	pub fn new(name: impl Into<String>, kind: DestinationKind) -> Self {
		Self {
			name: name.into(),
			kind,
			sections: Vec::new(),
		}
	}

	/// Append text to a section. Lower sections are dumped first.
	pub fn append(&mut self, text: &str, section: usize) {
		if matches!(self.kind, DestinationKind::Suppress) || text.is_empty() {
			return;
		}
		if self.sections.len() <= section {
			self.sections.resize_with(section + 1, String::new);
		}
		self.sections[section].push_str(text);
	}

	pub fn is_empty(&self) -> bool {
		self.sections.iter().all(String::is_empty)
	}

	/// Take the accumulated text, leaving the destination empty.
	pub fn dump(&mut self) -> String {
		std::mem::take(&mut self.sections).concat()
	}

	pub fn clear(&mut self) -> ClinicResult<()> {
		if self.kind != DestinationKind::Buffer {
			return Err(ClinicError::destination(format!(
				"can't clear destination `{}`: it's not of type `buffer`",
				self.name
			)));
		}
		self.sections.clear();
		Ok(())
	}
}

/// Where one category's text goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
	pub destination: String,
	pub section: usize,
}

impl Route {
	fn new(destination: &str, section: usize) -> Self {
		Self {
			destination: destination.to_string(),
			section,
		}
	}
}

/// A named routing that assigns every category in one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preset {
	pub name: String,
	pub routes: BTreeMap<Category, Route>,
}

/// `(preset, everything, [(category, destination, section)])`
type PresetTable = (
	&'static str,
	&'static str,
	&'static [(Category, &'static str, usize)],
);

const PRESETS: &[PresetTable] = &[
	("block", "block", &[
		(Category::MethoddefIfndef, "buffer", 1),
		(Category::DocstringPrototype, "suppress", 0),
		(Category::ParserPrototype, "suppress", 0),
		(Category::CppIf, "suppress", 0),
		(Category::CppEndif, "suppress", 0),
	]),
	("original", "block", &[
		(Category::MethoddefIfndef, "buffer", 1),
		(Category::DocstringPrototype, "suppress", 0),
		(Category::ParserPrototype, "suppress", 0),
		(Category::CppIf, "suppress", 0),
		(Category::CppEndif, "suppress", 0),
	]),
	("file", "file", &[
		(Category::MethoddefIfndef, "file", 1),
		(Category::DocstringPrototype, "suppress", 0),
		(Category::ParserPrototype, "suppress", 0),
		(Category::ImplDefinition, "block", 0),
	]),
	("buffer", "buffer", &[
		(Category::MethoddefIfndef, "buffer", 1),
		(Category::ImplDefinition, "block", 0),
		(Category::DocstringPrototype, "suppress", 0),
		(Category::ImplPrototype, "suppress", 0),
		(Category::ParserPrototype, "suppress", 0),
	]),
	("partial-buffer", "buffer", &[
		(Category::MethoddefIfndef, "buffer", 1),
		(Category::DocstringPrototype, "block", 0),
		(Category::ImplPrototype, "suppress", 0),
		(Category::MethoddefDefine, "block", 0),
		(Category::ParserPrototype, "block", 0),
		(Category::ImplDefinition, "block", 0),
	]),
];

fn builtin_presets() -> BTreeMap<String, Preset> {
	PRESETS
		.iter()
		.map(|(name, everything, overrides)| {
			let mut routes: BTreeMap<Category, Route> = Category::ALL
				.into_iter()
				.map(|category| (category, Route::new(everything, 0)))
				.collect();
			for (category, destination, section) in *overrides {
				routes.insert(*category, Route::new(destination, *section));
			}
			let preset = Preset {
				name: (*name).to_string(),
				routes,
			};
			((*name).to_string(), preset)
		})
		.collect()
}

/// Render a satellite path template against the source file path.
///
/// Supported placeholders: `{path}`, `{dirname}`, `{basename}`,
/// `{basename_root}` and `{basename_extension}` (with its leading dot).
pub fn render_path_template(template: &str, source: &Path) -> ClinicResult<PathBuf> {
	let path = source.to_string_lossy();
	let dirname = source
		.parent()
		.map(|p| p.to_string_lossy().to_string())
		.filter(|d| !d.is_empty())
		.unwrap_or_else(|| ".".to_string());
	let basename = source
		.file_name()
		.map(|n| n.to_string_lossy().to_string())
		.unwrap_or_default();
	let (basename_root, basename_extension) = match basename.rfind('.') {
		Some(dot) if dot > 0 => (basename[..dot].to_string(), basename[dot..].to_string()),
		_ => (basename.clone(), String::new()),
	};

	let values = [
		("path", path.as_ref()),
		("dirname", dirname.as_str()),
		("basename", basename.as_str()),
		("basename_root", basename_root.as_str()),
		("basename_extension", basename_extension.as_str()),
	];

	let mut rendered = String::with_capacity(template.len() + path.len());
	let mut rest = template;
	while let Some(open) = rest.find('{') {
		rendered.push_str(&rest[..open]);
		let Some(close) = rest[open..].find('}') else {
			return Err(ClinicError::destination(format!(
				"unclosed placeholder in path template `{template}`"
			)));
		};
		let key = &rest[open + 1..open + close];
		let Some((_, value)) = values.iter().find(|(name, _)| *name == key) else {
			return Err(ClinicError::destination(format!(
				"unknown placeholder `{{{key}}}` in path template `{template}`"
			)));
		};
		rendered.push_str(value);
		rest = &rest[open + close + 1..];
	}
	rendered.push_str(rest);

	Ok(PathBuf::from(rendered))
}

/// Destinations, category routes and presets for one pass over one file.
#[derive(Debug, Clone)]
pub struct DestinationRegistry {
	source: Option<PathBuf>,
	destinations: Vec<Destination>,
	routes: BTreeMap<Category, Route>,
	route_stack: Vec<BTreeMap<Category, Route>>,
	presets: BTreeMap<String, Preset>,
}

impl DestinationRegistry {
	/// The built-in destinations (`block`, `buffer`, `suppress`, and `file`
	/// when `source` is known) with the `file` preset applied, or `block`
	/// when there is no source path.
	pub fn new(source: Option<&Path>) -> ClinicResult<Self> {
		let mut registry = Self {
			source: source.map(Path::to_path_buf),
			destinations: Vec::new(),
			routes: BTreeMap::new(),
			route_stack: Vec::new(),
			presets: builtin_presets(),
		};

		registry.add(INLINE_DESTINATION, "buffer", &[])?;
		registry.add("suppress", "suppress", &[])?;
		registry.add("buffer", "buffer", &[])?;
		if source.is_some() {
			registry.add("file", "file", &[DEFAULT_FILE_TEMPLATE])?;
			registry.apply_preset("file")?;
		} else {
			registry.apply_preset("block")?;
		}

		Ok(registry)
	}

	/// Create a destination. `file` destinations take exactly one path
	/// template; other types take none.
	pub fn add(&mut self, name: &str, kind: &str, args: &[&str]) -> ClinicResult<()> {
		if self.get(name).is_some() {
			return Err(ClinicError::destination(format!(
				"destination already exists: `{name}`"
			)));
		}

		let expected = usize::from(kind == "file");
		if args.len() < expected {
			return Err(ClinicError::destination(format!(
				"not enough arguments for destination `{name}` new `{kind}`"
			)));
		}
		if args.len() > expected {
			return Err(ClinicError::destination(format!(
				"too many arguments for destination `{name}` new `{kind}`"
			)));
		}

		let kind = match kind {
			"suppress" => DestinationKind::Suppress,
			"buffer" => DestinationKind::Buffer,
			"file" => {
				let Some(source) = &self.source else {
					return Err(ClinicError::destination(format!(
						"destination `{name}` needs a source file path to resolve `{}`",
						args[0]
					)));
				};
				DestinationKind::File {
					path: render_path_template(args[0], source)?,
				}
			}
			other => {
				return Err(ClinicError::destination(format!(
					"invalid destination type `{other}` for `{name}`; must be one of buffer, \
					 file, suppress"
				)));
			}
		};

		self.destinations.push(Destination::new(name, kind));
		Ok(())
	}

	pub fn get(&self, name: &str) -> Option<&Destination> {
		self.destinations.iter().find(|d| d.name == name)
	}

	fn get_mut(&mut self, name: &str) -> ClinicResult<&mut Destination> {
		self.destinations
			.iter_mut()
			.find(|d| d.name == name)
			.ok_or_else(|| ClinicError::destination(format!("destination does not exist: `{name}`")))
	}

	pub fn destinations(&self) -> &[Destination] {
		&self.destinations
	}

	pub fn route(&self, category: Category) -> Option<&Route> {
		self.routes.get(&category)
	}

	/// Route one category to `destination`.
	pub fn set_route(&mut self, category: Category, destination: &str, section: usize) -> ClinicResult<()> {
		self.get_mut(destination)?;
		self.routes.insert(category, Route::new(destination, section));
		Ok(())
	}

	/// Route every category to `destination`.
	pub fn route_everything(&mut self, destination: &str) -> ClinicResult<()> {
		self.get_mut(destination)?;
		for category in Category::ALL {
			self.routes.insert(category, Route::new(destination, 0));
		}
		Ok(())
	}

	pub fn apply_preset(&mut self, name: &str) -> ClinicResult<()> {
		let Some(preset) = self.presets.get(name) else {
			return Err(ClinicError::destination(format!("unknown preset `{name}`")));
		};

		let routes = preset.routes.clone();
		for route in routes.values() {
			self.get_mut(&route.destination)?;
		}
		self.routes.extend(routes);
		Ok(())
	}

	pub fn preset_names(&self) -> impl Iterator<Item = &str> {
		self.presets.keys().map(String::as_str)
	}

	pub fn push_routes(&mut self) {
		self.route_stack.push(self.routes.clone());
	}

	pub fn pop_routes(&mut self) -> ClinicResult<()> {
		let Some(routes) = self.route_stack.pop() else {
			return Err(ClinicError::destination("can't `output pop`, stack is empty"));
		};
		self.routes = routes;
		Ok(())
	}

	/// Send `text` for `category` to its routed destination.
	pub fn write(&mut self, category: Category, text: &str) -> ClinicResult<()> {
		let Some(route) = self.routes.get(&category).cloned() else {
			return Err(ClinicError::destination(format!(
				"no destination for category `{category}`"
			)));
		};
		self.get_mut(&route.destination)?
			.append(text, route.section);
		Ok(())
	}

	/// Dump the named destination.
	pub fn dump(&mut self, name: &str) -> ClinicResult<String> {
		Ok(self.get_mut(name)?.dump())
	}

	pub fn clear(&mut self, name: &str) -> ClinicResult<()> {
		self.get_mut(name)?.clear()
	}

	/// Drain the inline destination.
	pub fn take_inline(&mut self) -> String {
		self.get_mut(INLINE_DESTINATION)
			.map(Destination::dump)
			.unwrap_or_default()
	}

	/// Take every non-empty buffer or file destination, in creation order,
	/// leaving them empty.
	pub fn drain_pending(&mut self) -> Vec<(String, DestinationKind, String)> {
		self.destinations
			.iter_mut()
			.filter(|d| !matches!(d.kind, DestinationKind::Suppress) && !d.is_empty())
			.map(|d| (d.name.clone(), d.kind.clone(), d.dump()))
			.collect()
	}
}
