use std::collections::HashSet;

/// NOTE: This module checks the soundness of a built hierarchy. It is a
/// debugging aid for construction code, not an RTL verification tool.
use crate::builder::Design;
use crate::ir::module::Module;
use crate::ir::node::*;

/// Assert the containment invariants over every built module:
///
/// - a signal claimed by a module is exactly one of its input ports, output
///   ports, or internal signals;
/// - every non-root module's parent lists it as a sub-module;
/// - sub-module instance names never collide within one parent.
///
/// Panics on violation; run it after `build` in tests and debugging
/// sessions.
pub fn verify(sys: &Design) {
  for module in sys.module_iter() {
    let node = module.upcast();
    if !module.has_built() {
      continue;
    }

    if let Some(parent) = module.get().get_parent() {
      let parent = parent.as_ref::<Module>(sys).unwrap();
      assert!(
        parent.get().submodules.contains(&node),
        "{} has a parent that does not list it",
        module.get_name()
      );
    }

    let mut names = HashSet::new();
    for sub in module.submodule_iter() {
      let name = sub.get_instance_name().unwrap().to_string();
      assert!(
        names.insert(name.clone()),
        "duplicate instance name {} under {}",
        name,
        module.get_name()
      );
    }

    for (name, port) in module.input_iter() {
      assert!(port.is_input() && !port.is_output(), "input port {} mistagged", name);
      assert_eq!(port.get().get_parent(), Some(node));
    }
    for (name, port) in module.output_iter() {
      assert!(port.is_output() && !port.is_input(), "output port {} mistagged", name);
      assert_eq!(port.get().get_parent(), Some(node));
    }
    for internal in module.internal_iter() {
      assert!(
        !internal.is_port(),
        "{} claimed internally but tagged as a port",
        internal.display_name()
      );
      assert_eq!(internal.get().get_parent(), Some(node));
    }
  }
}
