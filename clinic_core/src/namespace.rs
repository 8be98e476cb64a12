use std::collections::BTreeSet;

use crate::ClinicError;
use crate::ClinicResult;
use crate::Location;

/// The modules and classes declared so far in one pass, by full dotted name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Namespace {
	modules: BTreeSet<String>,
	classes: BTreeSet<String>,
}

/// The module and class a dotted name lives in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parent {
	/// Full name of the enclosing module. Empty at top level.
	pub module: String,
	/// Full name of the enclosing class, if any.
	pub class: Option<String>,
}

impl Namespace {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn has_module(&self, name: &str) -> bool {
		self.modules.contains(name)
	}

	pub fn has_class(&self, name: &str) -> bool {
		self.classes.contains(name)
	}

	/// Resolve the parent path of `fields`, ignoring its last field. Every
	/// prefix must be a declared module, optionally followed by declared
	/// classes.
	pub fn resolve(&self, fields: &[&str], location: &Location) -> ClinicResult<Parent> {
		let mut parent = Parent::default();
		let Some((_, parents)) = fields.split_last() else {
			return Ok(parent);
		};

		let mut path = String::new();
		for field in parents {
			if !path.is_empty() {
				path.push('.');
			}
			path.push_str(field);

			if parent.class.is_none() && self.modules.contains(&path) {
				parent.module.clone_from(&path);
				continue;
			}
			if self.classes.contains(&path) {
				parent.class = Some(path.clone());
				continue;
			}

			return Err(ClinicError::Resolution {
				path,
				location: location.clone(),
			});
		}

		Ok(parent)
	}

	pub fn declare_module(&mut self, name: &str, location: &Location) -> ClinicResult<()> {
		let fields: Vec<&str> = name.split('.').collect();
		let parent = self.resolve(&fields, location)?;
		if let Some(class) = parent.class {
			return Err(ClinicError::directive(
				format!("can't nest module `{name}` inside class `{class}`"),
				location.clone(),
			));
		}
		if !self.modules.insert(name.to_string()) {
			return Err(ClinicError::directive(
				format!("already defined module `{name}`"),
				location.clone(),
			));
		}
		Ok(())
	}

	pub fn declare_class(&mut self, name: &str, location: &Location) -> ClinicResult<()> {
		let fields: Vec<&str> = name.split('.').collect();
		self.resolve(&fields, location)?;
		if self.modules.contains(name) || !self.classes.insert(name.to_string()) {
			return Err(ClinicError::directive(
				format!("already defined class `{name}`"),
				location.clone(),
			));
		}
		Ok(())
	}
}
