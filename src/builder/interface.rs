use std::collections::HashSet;
use std::hash::Hash;

use indexmap::IndexMap;

use crate::builder::Design;
use crate::error::{Error, Result};
use crate::ir::node::LogicNode;

struct IntfPort<T> {
  signal: LogicNode,
  width: usize,
  tags: HashSet<T>,
}

/// A reusable bundle of named ports, each carrying a set of user-defined
/// direction tags.
///
/// An interface starts out bound to loose signals (the instantiator's
/// side). A module takes a copy and calls `connect_io`, which grows real
/// ports on the module, wires them to the other side, and rebinds this
/// copy's view to the new ports, so module-internal code keeps addressing
/// ports by name.
pub struct Interface<T> {
  name: String,
  ports: IndexMap<String, IntfPort<T>>,
}

impl<T: Copy + Eq + Hash> Interface<T> {
  pub fn new(name: &str) -> Self {
    Self {
      name: name.to_string(),
      ports: IndexMap::new(),
    }
  }

  /// Declare a port backed by a fresh loose signal.
  pub fn add_port(
    &mut self,
    sys: &mut Design,
    name: &str,
    width: usize,
    tags: &[T],
  ) -> LogicNode {
    let signal = sys.create_logic(name, width);
    self.ports.insert(
      name.to_string(),
      IntfPort {
        signal,
        width,
        tags: tags.iter().copied().collect(),
      },
    );
    signal
  }

  /// The signal currently backing a port, on whichever side of a
  /// `connect_io` this view sits.
  pub fn signal(&self, name: &str) -> Option<LogicNode> {
    self.ports.get(name).map(|port| port.signal)
  }

  pub fn port_iter(&self) -> impl Iterator<Item = (&String, LogicNode)> + '_ {
    self.ports.iter().map(|(name, port)| (name, port.signal))
  }

  /// A fresh view over the same port definitions, for the module side of a
  /// connection.
  pub fn view(&self) -> Self {
    Self {
      name: self.name.clone(),
      ports: self
        .ports
        .iter()
        .map(|(name, port)| {
          (
            name.clone(),
            IntfPort {
              signal: port.signal,
              width: port.width,
              tags: port.tags.clone(),
            },
          )
        })
        .collect(),
    }
  }

  /// The sole wiring primitive. Ports tagged in `input_tags` become input
  /// ports of `parent` sourced from `other`'s signals; ports tagged in
  /// `output_tags` become output ports of `parent` driving `other`'s
  /// signals. Ports matching neither set are silently omitted; matching
  /// both is ambiguous.
  pub fn connect_io(
    &mut self,
    sys: &mut Design,
    parent: crate::ir::node::ModuleNode,
    other: &Interface<T>,
    input_tags: &[T],
    output_tags: &[T],
  ) -> Result<()> {
    for (name, port) in self.ports.iter_mut() {
      let is_in = port.tags.iter().any(|t| input_tags.contains(t));
      let is_out = port.tags.iter().any(|t| output_tags.contains(t));
      match (is_in, is_out) {
        (true, true) => {
          return Err(Error::AmbiguousDirection {
            interface: self.name.clone(),
            port: name.clone(),
          })
        }
        (false, false) => continue,
        _ => {}
      }
      let far = other.signal(name).unwrap_or_else(|| {
        panic!("interface {} has no port {}", self.name, name)
      });
      if is_in {
        port.signal = sys.add_input(parent, name, far, port.width)?;
      } else {
        let new_port = sys.add_output(parent, name, port.width)?;
        sys.connect(far, new_port)?;
        port.signal = new_port;
      }
    }
    Ok(())
  }
}
