use std::collections::HashSet;

use indexmap::{IndexMap, IndexSet};

use crate::error::{Error, Result};
use crate::ir::node::*;
use crate::ir::signal::Logic;

/// Module capabilities consulted by the backends.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Attribute {
  /// Emit the given SystemVerilog text as the module body instead of the
  /// generated one. The template sees the module's declared ports.
  CustomVerilog(String),
}

/// A named scope owning input ports, output ports, internal signals, and
/// sub-modules.
///
/// Sub-modules are never registered by hand: `build` discovers them by
/// tracing the signal graph outward from the ports. Until then the
/// containment fields (`internals`, `submodules`, `parent`,
/// `instance_name`) are empty.
pub struct Module {
  pub(crate) key: usize,
  name: String,
  /// The disambiguated per-parent name. Valid only after build.
  pub(crate) instance_name: Option<String>,
  pub(crate) inputs: IndexMap<String, BaseNode>,
  pub(crate) outputs: IndexMap<String, BaseNode>,
  pub(crate) internals: IndexSet<BaseNode>,
  pub(crate) submodules: Vec<BaseNode>,
  /// Always blocks whose targets this module claimed during build.
  pub(crate) blocks: IndexSet<BaseNode>,
  parent: Option<BaseNode>,
  pub(crate) has_built: bool,
  pub(crate) attrs: HashSet<Attribute>,
}

impl Module {
  pub(crate) fn new(name: &str) -> Self {
    Self {
      key: 0,
      name: name.to_string(),
      instance_name: None,
      inputs: IndexMap::new(),
      outputs: IndexMap::new(),
      internals: IndexSet::new(),
      submodules: Vec::new(),
      blocks: IndexSet::new(),
      parent: None,
      has_built: false,
      attrs: HashSet::new(),
    }
  }

  /// The definition name. Shared by every structurally identical instance.
  pub fn get_name(&self) -> &str {
    &self.name
  }

  pub fn has_built(&self) -> bool {
    self.has_built
  }

  pub fn get_num_inputs(&self) -> usize {
    self.inputs.len()
  }

  pub fn get_num_outputs(&self) -> usize {
    self.outputs.len()
  }

  pub fn get_input(&self, name: &str) -> Option<BaseNode> {
    self.inputs.get(name).copied()
  }

  pub fn get_output(&self, name: &str) -> Option<BaseNode> {
    self.outputs.get(name).copied()
  }

  pub fn has_port(&self, name: &str) -> bool {
    self.inputs.contains_key(name) || self.outputs.contains_key(name)
  }

  pub fn get_attrs(&self) -> &HashSet<Attribute> {
    &self.attrs
  }

  pub fn get_custom_verilog(&self) -> Option<&str> {
    self.attrs.iter().find_map(|attr| match attr {
      Attribute::CustomVerilog(body) => Some(body.as_str()),
    })
  }

  /// The unique name of this instance within its parent.
  pub fn get_instance_name(&self) -> Result<&str> {
    self.instance_name.as_deref().ok_or_else(|| Error::NotBuilt {
      module: self.name.clone(),
    })
  }
}

impl Parented for Module {
  fn get_parent(&self) -> Option<BaseNode> {
    self.parent
  }

  fn set_parent(&mut self, parent: BaseNode) {
    assert!(
      self.parent.is_none() || self.parent == Some(parent),
      "module parent is assigned exactly once"
    );
    self.parent = Some(parent);
  }
}

impl<'sys> ModuleRef<'sys> {
  pub fn input_iter(&self) -> impl Iterator<Item = (&'sys String, LogicRef<'sys>)> + 'sys {
    let sys = self.sys;
    self
      .get()
      .inputs
      .iter()
      .map(move |(name, node)| (name, node.as_ref::<Logic>(sys).unwrap()))
  }

  pub fn output_iter(&self) -> impl Iterator<Item = (&'sys String, LogicRef<'sys>)> + 'sys {
    let sys = self.sys;
    self
      .get()
      .outputs
      .iter()
      .map(move |(name, node)| (name, node.as_ref::<Logic>(sys).unwrap()))
  }

  pub fn submodule_iter(&self) -> impl Iterator<Item = ModuleRef<'sys>> + 'sys {
    let sys = self.sys;
    self
      .get()
      .submodules
      .iter()
      .map(move |node| node.as_ref::<Module>(sys).unwrap())
  }

  pub fn internal_iter(&self) -> impl Iterator<Item = LogicRef<'sys>> + 'sys {
    let sys = self.sys;
    self
      .get()
      .internals
      .iter()
      .map(move |node| node.as_ref::<Logic>(sys).unwrap())
  }

  pub fn block_iter(&self) -> impl Iterator<Item = AlwaysRef<'sys>> + 'sys {
    let sys = self.sys;
    self
      .get()
      .blocks
      .iter()
      .map(move |node| node.as_ref::<crate::ir::block::Always>(sys).unwrap())
  }

  /// The dot-separated instance path from the hierarchy root. Requires a
  /// completed build so instance names exist.
  pub fn hierarchical_path(&self) -> Result<String> {
    let mut segments = vec![self.get().get_instance_name()?.to_string()];
    let mut runner = self.get().get_parent();
    while let Some(parent) = runner {
      let parent = parent.as_ref::<Module>(self.sys).unwrap();
      segments.push(parent.get_instance_name()?.to_string());
      runner = parent.get().get_parent();
    }
    segments.reverse();
    Ok(segments.join("."))
  }
}
