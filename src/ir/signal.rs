use crate::builder::Design;
use crate::ir::module::Module;
use crate::ir::node::*;
use crate::ir::value::Bits;

/// A multi-bit wire in the hardware graph.
///
/// A signal carries a four-state value, has at most one source connection
/// (the node driving it) and any number of destination connections (the
/// nodes reading it). Ports are signals with `is_input`/`is_output` set;
/// everything else is internal to whichever module claims it during build.
pub struct Logic {
  pub(crate) key: usize,
  name: Option<String>,
  width: usize,
  pub(crate) value: Bits,
  pub(crate) source: Option<BaseNode>,
  pub(crate) dests: Vec<BaseNode>,
  parent: Option<BaseNode>,
  pub(crate) is_input: bool,
  pub(crate) is_output: bool,
}

impl Logic {
  pub(crate) fn new(name: Option<&str>, width: usize) -> Self {
    Self {
      key: 0,
      name: name.map(|x| x.to_string()),
      width,
      value: Bits::all_x(width),
      source: None,
      dests: Vec::new(),
      parent: None,
      is_input: false,
      is_output: false,
    }
  }

  pub fn get_width(&self) -> usize {
    self.width
  }

  /// The preferred name, if the user gave one. Unnamed signals are derived
  /// intermediates and render with the collapsible `_t` prefix.
  pub fn get_name(&self) -> Option<&str> {
    self.name.as_deref()
  }

  pub fn display_name(&self) -> String {
    match &self.name {
      Some(name) => name.clone(),
      None => format!("_t{}", self.key),
    }
  }

  pub fn is_unpreferred(&self) -> bool {
    self.name.is_none()
  }

  pub fn get_value(&self) -> &Bits {
    &self.value
  }

  pub fn get_source(&self) -> Option<BaseNode> {
    self.source
  }

  pub fn is_input(&self) -> bool {
    self.is_input
  }

  pub fn is_output(&self) -> bool {
    self.is_output
  }

  pub fn is_port(&self) -> bool {
    self.is_input || self.is_output
  }
}

impl Parented for Logic {
  fn get_parent(&self) -> Option<BaseNode> {
    self.parent
  }

  fn set_parent(&mut self, parent: BaseNode) {
    assert!(
      self.parent.is_none() || self.parent == Some(parent),
      "signal parent is assigned exactly once"
    );
    self.parent = Some(parent);
  }
}

impl LogicRef<'_> {
  pub fn dest_iter(&self) -> impl Iterator<Item = BaseNode> + '_ {
    self.get().dests.iter().copied()
  }

  /// The module owning this signal, when one has claimed it.
  pub fn get_module(&self) -> Option<ModuleRef<'_>> {
    self
      .get()
      .get_parent()
      .map(|x| x.as_ref::<Module>(self.sys).unwrap())
  }
}

/// A constant four-state value participating in the graph the same way a
/// signal does. Interned per value by the design builder.
pub struct Const {
  pub(crate) key: usize,
  value: Bits,
}

impl Const {
  pub(crate) fn new(value: Bits) -> Self {
    Self { key: 0, value }
  }

  pub fn get_value(&self) -> &Bits {
    &self.value
  }
}

impl Design {
  /// Read a signal's current simulation value.
  pub fn value(&self, sig: LogicNode) -> &Bits {
    sig.as_ref(self).get().get_value()
  }

  /// Read a signal as an unsigned integer. Fails with `XZPropagation` when
  /// the value contains X or Z bits.
  pub fn value_u64(&self, sig: LogicNode) -> crate::error::Result<u64> {
    sig.as_ref(self).get().get_value().to_u64()
  }

  /// Read a signal as an arbitrary-width unsigned integer.
  pub fn value_big(&self, sig: LogicNode) -> crate::error::Result<num_bigint::BigUint> {
    sig.as_ref(self).get().get_value().to_big()
  }
}
