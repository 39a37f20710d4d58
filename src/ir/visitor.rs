use crate::builder::Design;
use crate::ir::block::Always;
use crate::ir::expr::Expr;
use crate::ir::module::Module;
use crate::ir::node::*;
use crate::ir::signal::{Const, Logic};

/// A kind-dispatching walk over the element graph. Override the hooks that
/// matter; the defaults recurse through a module's ports, internals, and
/// blocks, then into its sub-modules.
pub trait Visitor<T: Default> {
  fn visit_module(&mut self, module: &ModuleRef<'_>) -> T {
    for (_, port) in module.input_iter() {
      self.visit_logic(&port);
    }
    for (_, port) in module.output_iter() {
      self.visit_logic(&port);
    }
    for internal in module.internal_iter() {
      self.visit_logic(&internal);
    }
    for block in module.block_iter() {
      self.visit_always(&block);
    }
    T::default()
  }

  fn visit_logic(&mut self, _: &LogicRef<'_>) -> T {
    T::default()
  }

  fn visit_expr(&mut self, _: &ExprRef<'_>) -> T {
    T::default()
  }

  fn visit_always(&mut self, _: &AlwaysRef<'_>) -> T {
    T::default()
  }

  fn visit_const(&mut self, _: &ConstRef<'_>) -> T {
    T::default()
  }

  fn dispatch(&mut self, sys: &Design, node: BaseNode) -> T {
    match node.get_kind() {
      NodeKind::Module => self.visit_module(&node.as_ref::<Module>(sys).unwrap()),
      NodeKind::Logic => self.visit_logic(&node.as_ref::<Logic>(sys).unwrap()),
      NodeKind::Expr => self.visit_expr(&node.as_ref::<Expr>(sys).unwrap()),
      NodeKind::Always => self.visit_always(&node.as_ref::<Always>(sys).unwrap()),
      NodeKind::Const => self.visit_const(&node.as_ref::<Const>(sys).unwrap()),
      NodeKind::Unknown => panic!("unknown node type"),
    }
  }

  /// Visit every module of the design, in creation order.
  fn enter(&mut self, sys: &Design) -> T {
    for module in sys.module_iter() {
      self.visit_module(&module);
    }
    T::default()
  }
}
