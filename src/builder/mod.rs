pub mod interface;
pub mod naming;
pub mod trace;
pub mod verify;

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::ir::block::{Always, Sensitivity};
use crate::ir::expr::{Binary, Compare, Expr, Opcode, Unary};
use crate::ir::module::{Attribute, Module};
use crate::ir::node::*;
use crate::ir::signal::{Const, Logic};
use crate::ir::stmt::Stmt;
use crate::ir::value::Bits;

pub use interface::Interface;
pub use verify::verify;

/// The `Design` struct not only serves as the data structure of the whole
/// hardware graph, but also works as the syntax-sugared graph builder.
///
/// Every element (module, signal, expression, always block, constant) is
/// stored in one slab and addressed by `BaseNode` handles; such a highly
/// redundant, mutually referenced structure does not fit Rust ownership
/// directly, so edges are handle pairs rather than references.
pub struct Design {
  pub(crate) slab: slab::Slab<Element>,
  /// The name of the design.
  name: String,
  /// The data structure caches the constant values.
  const_cache: HashMap<Bits, BaseNode>,
  /// Every module created so far, in creation order.
  pub(crate) modules: Vec<BaseNode>,
}

macro_rules! create_binary_op_impl {
  ($func_name:ident, $binop:expr) => {
    /// Create a derived signal continuously driven by this operator.
    pub fn $func_name(
      &mut self,
      a: impl Into<BaseNode>,
      b: impl Into<BaseNode>,
    ) -> Result<LogicNode> {
      self.create_binary($binop, a.into(), b.into())
    }
  };
}

macro_rules! create_compare_op_impl {
  ($func_name:ident, $cmp:expr) => {
    /// Create a single-bit derived signal comparing the operands.
    pub fn $func_name(
      &mut self,
      a: impl Into<BaseNode>,
      b: impl Into<BaseNode>,
    ) -> Result<LogicNode> {
      self.create_compare($cmp, a.into(), b.into())
    }
  };
}

impl Design {
  pub fn new(name: &str) -> Self {
    Self {
      slab: slab::Slab::new(),
      name: name.to_string(),
      const_cache: HashMap::new(),
      modules: Vec::new(),
    }
  }

  pub fn get_name(&self) -> &str {
    &self.name
  }

  /// The helper function to get an element and downcast it to its actual
  /// type's immutable view.
  pub(crate) fn get<'a, T: Referencable<'a>>(&'a self, node: BaseNode) -> Result<T::Ref> {
    node
      .as_ref::<T>(self)
      .map_err(|_| internal_kind_error(node))
  }

  /// The mutable counterpart of `get`.
  pub(crate) fn get_mut<'a, T: Mutable<'a>>(&'a mut self, node: BaseNode) -> Result<T::Mut> {
    if node.is_unknown() {
      return Err(internal_kind_error(node));
    }
    node
      .as_mut::<T>(self)
      .map_err(|_| internal_kind_error(node))
  }

  /// The helper function to insert an element into the design's slab and
  /// stamp its own key back into it.
  pub(crate) fn insert_element<T: IsElement + Into<Element>>(&mut self, elem: T) -> BaseNode {
    let key = self.slab.insert(elem.into());
    let node = T::into_node(key);
    T::downcast_mut(&mut self.slab, node).unwrap().set_key(key);
    node
  }

  pub fn module_iter(&self) -> impl Iterator<Item = ModuleRef<'_>> + '_ {
    self.modules.iter().map(|x| x.as_ref::<Module>(self).unwrap())
  }

  // ---- Modules and ports ------------------------------------------------

  /// Create a new, empty module. Ports are registered afterwards with
  /// `add_input`/`add_output`; sub-modules are discovered by `build`.
  pub fn create_module(&mut self, name: &str) -> ModuleNode {
    let node = self.insert_element(Module::new(name));
    self.modules.push(node);
    log::debug!("created module {} ({:?})", name, node);
    node.into()
  }

  pub fn add_module_attr(&mut self, module: ModuleNode, attr: Attribute) {
    self
      .get_mut::<Module>(module.upcast())
      .unwrap()
      .get_mut()
      .attrs
      .insert(attr);
  }

  /// Register an input port and wire it from `external`, the signal the
  /// instantiator provides. The port signal itself lives inside the module;
  /// its destination connections are consumed by the module body.
  pub fn add_input(
    &mut self,
    module: ModuleNode,
    name: &str,
    external: LogicNode,
    width: usize,
  ) -> Result<LogicNode> {
    self.check_port_name(module, name)?;
    let actual = external.as_ref(self).get_width();
    if actual != width {
      return Err(Error::WidthMismatch {
        context: format!("input port {}", name),
        expected: width,
        actual,
      });
    }
    let port = self.create_port(module, name, width, true);
    self.connect(port, external)?;
    self
      .get_mut::<Module>(module.upcast())?
      .get_mut()
      .inputs
      .insert(name.to_string(), port.upcast());
    Ok(port)
  }

  /// Register an output port. The module body must drive it before build.
  pub fn add_output(&mut self, module: ModuleNode, name: &str, width: usize) -> Result<LogicNode> {
    self.check_port_name(module, name)?;
    let port = self.create_port(module, name, width, false);
    self
      .get_mut::<Module>(module.upcast())?
      .get_mut()
      .outputs
      .insert(name.to_string(), port.upcast());
    Ok(port)
  }

  fn check_port_name(&self, module: ModuleNode, name: &str) -> Result<()> {
    if !is_valid_identifier(name) {
      return Err(Error::InvalidIdentifier {
        name: name.to_string(),
      });
    }
    let module = module.as_ref(self);
    if module.has_port(name) {
      return Err(Error::DuplicatePort {
        module: module.get_name().to_string(),
        name: name.to_string(),
      });
    }
    Ok(())
  }

  fn create_port(
    &mut self,
    module: ModuleNode,
    name: &str,
    width: usize,
    is_input: bool,
  ) -> LogicNode {
    let node = self.insert_element(Logic::new(Some(name), width));
    {
      let logic = Logic::downcast_mut(&mut self.slab, node).unwrap();
      logic.is_input = is_input;
      logic.is_output = !is_input;
      logic.set_parent(module.upcast());
    }
    node.into()
  }

  // ---- Signals and connections ------------------------------------------

  /// Create a named internal signal, initially undriven and all-X.
  pub fn create_logic(&mut self, name: &str, width: usize) -> LogicNode {
    self.insert_element(Logic::new(Some(name), width)).into()
  }

  /// Create an unnamed derived signal. These render with a collapsible
  /// prefix and may be elided at emission.
  pub(crate) fn create_derived(&mut self, width: usize) -> LogicNode {
    self.insert_element(Logic::new(None, width)).into()
  }

  /// Intern a constant value.
  pub fn get_const(&mut self, value: Bits) -> ConstNode {
    if let Some(cached) = self.const_cache.get(&value) {
      return (*cached).into();
    }
    let node = self.insert_element(Const::new(value.clone()));
    self.const_cache.insert(value, node);
    node.into()
  }

  /// Intern an integer constant at the given width.
  pub fn const_u64(&mut self, value: u64, width: usize) -> ConstNode {
    self.get_const(Bits::from_u64(value, width))
  }

  /// Establish the unique source driver of `dst`. This is the structural
  /// connection primitive; behavioral assignment goes through always
  /// blocks instead.
  pub fn connect(&mut self, dst: LogicNode, src: impl Into<BaseNode>) -> Result<()> {
    let src = src.into();
    let src_width = src.get_width(self).expect("source carries no value");
    let dst_ref = dst.as_ref(self);
    if dst_ref.get_source().is_some() {
      return Err(Error::DriverConflict {
        signal: dst_ref.display_name(),
        path: "second source connection".to_string(),
      });
    }
    if dst_ref.get_width() != src_width {
      return Err(Error::WidthMismatch {
        context: format!("connection to {}", dst_ref.display_name()),
        expected: dst_ref.get_width(),
        actual: src_width,
      });
    }
    Logic::downcast_mut(&mut self.slab, dst.upcast()).unwrap().source = Some(src);
    self.add_dest(src, dst.upcast());
    Ok(())
  }

  /// Record `user` as a destination connection of `node`. Constants are not
  /// tracked: they never change, so nothing propagates from them.
  pub(crate) fn add_dest(&mut self, node: BaseNode, user: BaseNode) {
    match node.get_kind() {
      NodeKind::Logic => {
        let logic = Logic::downcast_mut(&mut self.slab, node).unwrap();
        if !logic.dests.contains(&user) {
          logic.dests.push(user);
        }
      }
      NodeKind::Expr => {
        // Expressions fan out through their derived result signal.
        let result = Expr::downcast(&self.slab, node).unwrap().get_result();
        self.add_dest(result, user);
      }
      NodeKind::Const => {}
      _ => unreachable!("{:?} cannot drive a connection", node.get_kind()),
    }
  }

  // ---- Expression builders ----------------------------------------------

  /// The common path for operator nodes: insert the expression, materialize
  /// its derived result signal, and hook up the edges in both directions.
  fn create_expr(&mut self, opcode: Opcode, operands: Vec<BaseNode>, width: usize) -> LogicNode {
    let expr = self.insert_element(Expr::new(opcode, operands.clone(), width));
    let result = self.create_derived(width);
    Expr::downcast_mut(&mut self.slab, expr).unwrap().result = result.upcast();
    Logic::downcast_mut(&mut self.slab, result.upcast()).unwrap().source = Some(expr);
    for operand in operands {
      match operand.get_kind() {
        NodeKind::Logic | NodeKind::Expr => self.add_dest(operand, expr),
        NodeKind::Const => {}
        _ => unreachable!("{:?} cannot be an operand", operand.get_kind()),
      }
    }
    result
  }

  fn operand_width(&self, node: BaseNode, context: &str) -> Result<usize> {
    node.get_width(self).ok_or_else(|| Error::WidthMismatch {
      context: context.to_string(),
      expected: 1,
      actual: 0,
    })
  }

  fn create_binary(&mut self, binop: Binary, a: BaseNode, b: BaseNode) -> Result<LogicNode> {
    let wa = self.operand_width(a, "binary lhs")?;
    let wb = self.operand_width(b, "binary rhs")?;
    // Shift amounts keep their own width; everything else lines up.
    if !matches!(binop, Binary::Shl | Binary::Shr) && wa != wb {
      return Err(Error::WidthMismatch {
        context: format!("operands of {}", binop),
        expected: wa,
        actual: wb,
      });
    }
    Ok(self.create_expr(binop.into(), vec![a, b], wa))
  }

  fn create_compare(&mut self, cmp: Compare, a: BaseNode, b: BaseNode) -> Result<LogicNode> {
    let wa = self.operand_width(a, "compare lhs")?;
    let wb = self.operand_width(b, "compare rhs")?;
    if wa != wb {
      return Err(Error::WidthMismatch {
        context: format!("operands of {}", cmp),
        expected: wa,
        actual: wb,
      });
    }
    Ok(self.create_expr(cmp.into(), vec![a, b], 1))
  }

  create_binary_op_impl!(create_and, Binary::And);
  create_binary_op_impl!(create_or, Binary::Or);
  create_binary_op_impl!(create_xor, Binary::Xor);
  create_binary_op_impl!(create_add, Binary::Add);
  create_binary_op_impl!(create_sub, Binary::Sub);
  create_binary_op_impl!(create_mul, Binary::Mul);
  create_binary_op_impl!(create_shl, Binary::Shl);
  create_binary_op_impl!(create_shr, Binary::Shr);

  create_compare_op_impl!(create_eq, Compare::Eq);
  create_compare_op_impl!(create_ne, Compare::Ne);
  create_compare_op_impl!(create_lt, Compare::Lt);
  create_compare_op_impl!(create_le, Compare::Le);
  create_compare_op_impl!(create_gt, Compare::Gt);
  create_compare_op_impl!(create_ge, Compare::Ge);

  /// Create a derived signal carrying the bitwise complement.
  pub fn create_not(&mut self, a: impl Into<BaseNode>) -> Result<LogicNode> {
    let a = a.into();
    let width = self.operand_width(a, "operand of ~")?;
    Ok(self.create_expr(Unary::Not.into(), vec![a], width))
  }

  /// Create a derived signal carrying bits `[hi:lo]` of the operand. Part
  /// selects only apply to signals; slice a constant by constructing the
  /// narrower constant instead.
  pub fn create_slice(&mut self, a: LogicNode, hi: usize, lo: usize) -> Result<LogicNode> {
    let a = a.upcast();
    let width = self.operand_width(a, "slice operand")?;
    if hi < lo || hi >= width {
      return Err(Error::WidthMismatch {
        context: format!("slice [{}:{}]", hi, lo),
        expected: width,
        actual: hi + 1,
      });
    }
    Ok(self.create_expr(Opcode::Slice { hi, lo }, vec![a], hi - lo + 1))
  }

  /// Concatenate the parts, first part highest.
  pub fn create_concat(&mut self, parts: Vec<BaseNode>) -> Result<LogicNode> {
    assert!(!parts.is_empty(), "empty concatenation");
    let mut width = 0;
    for part in &parts {
      width += self.operand_width(*part, "concat operand")?;
    }
    Ok(self.create_expr(Opcode::Concat, parts, width))
  }

  /// A two-way selector: `cond ? on_true : on_false`.
  pub fn create_mux(
    &mut self,
    cond: impl Into<BaseNode>,
    on_true: impl Into<BaseNode>,
    on_false: impl Into<BaseNode>,
  ) -> Result<LogicNode> {
    let (cond, on_true, on_false) = (cond.into(), on_true.into(), on_false.into());
    let wt = self.operand_width(on_true, "mux true arm")?;
    let wf = self.operand_width(on_false, "mux false arm")?;
    if wt != wf {
      return Err(Error::WidthMismatch {
        context: "mux arms".to_string(),
        expected: wt,
        actual: wf,
      });
    }
    Ok(self.create_expr(Opcode::Mux, vec![cond, on_true, on_false], wt))
  }

  // ---- Always blocks -----------------------------------------------------

  /// Bind a conditional tree to continuous sensitivity. Every assigned
  /// signal gets this block as its unique driver.
  pub fn create_comb(&mut self, body: Vec<Stmt>) -> Result<AlwaysNode> {
    self.create_always(Sensitivity::Combinational, body)
  }

  /// Bind a conditional tree to the rising edge of `clock`.
  pub fn create_ff(&mut self, clock: LogicNode, body: Vec<Stmt>) -> Result<AlwaysNode> {
    self.create_always(Sensitivity::PosEdge(clock.upcast()), body)
  }

  fn create_always(&mut self, sensitivity: Sensitivity, body: Vec<Stmt>) -> Result<AlwaysNode> {
    let block = Always::new(sensitivity, body);
    self.check_stmt_widths(block.get_body())?;
    let targets: Vec<BaseNode> = block.target_iter().collect();
    let reads: Vec<BaseNode> = block.read_iter().collect();
    // Reject driver conflicts before mutating anything.
    for target in &targets {
      let logic = Logic::downcast(&self.slab, *target).unwrap();
      if logic.source.is_some() {
        return Err(Error::DriverConflict {
          signal: logic.display_name(),
          path: "already driven before this always block".to_string(),
        });
      }
    }
    let node = self.insert_element(block);
    for target in targets {
      Logic::downcast_mut(&mut self.slab, target).unwrap().source = Some(node);
    }
    for read in reads {
      self.add_dest(read, node);
    }
    if let Sensitivity::PosEdge(clk) = sensitivity {
      self.add_dest(clk, node);
    }
    Ok(node.into())
  }

  fn check_stmt_widths(&self, body: &[Stmt]) -> Result<()> {
    for stmt in body {
      match stmt {
        Stmt::Assign { target, value } => {
          let wt = target.get_width(self).unwrap();
          let wv = self.operand_width(*value, "assignment source")?;
          if wt != wv {
            return Err(Error::WidthMismatch {
              context: format!("assignment to {}", target.to_string(self)),
              expected: wt,
              actual: wv,
            });
          }
        }
        Stmt::If {
          then_body,
          else_body,
          ..
        } => {
          self.check_stmt_widths(then_body)?;
          self.check_stmt_widths(else_body)?;
        }
        Stmt::Case(case) | Stmt::CaseZ(case) => {
          let ws = self.operand_width(case.sel, "case selector")?;
          for item in &case.items {
            if item.pattern.width() != ws {
              return Err(Error::WidthMismatch {
                context: format!("case pattern {:?}", item.pattern),
                expected: ws,
                actual: item.pattern.width(),
              });
            }
            self.check_stmt_widths(&item.body)?;
          }
          self.check_stmt_widths(&case.default)?;
        }
      }
    }
    Ok(())
  }

  // ---- Clocking ----------------------------------------------------------

  /// Create a clock generator module: a single `clk` output toggling every
  /// half period. The module carries a custom emission body (an `initial`
  /// block), and the simulator drives the square wave from `t = 0`, low
  /// first, once `Simulator::start_clock` is pointed at the output.
  pub fn create_clock_generator(&mut self, period: u64) -> Result<(ModuleNode, LogicNode)> {
    let module = self.create_module("clock_gen");
    let clk = self.add_output(module, "clk", 1)?;
    let half = period / 2;
    let body = format!(
      "  initial begin\n    clk = 0;\n    forever #{} clk = ~clk;\n  end",
      half.max(1)
    );
    self.add_module_attr(module, Attribute::CustomVerilog(body));
    Ok((module, clk))
  }
}

fn internal_kind_error(node: BaseNode) -> Error {
  Error::PortViolation {
    signal: format!("{:?}", node),
    path: "internal handle kind mismatch".to_string(),
  }
}

/// Derive an HDL-legal identifier from an arbitrary name: illegal
/// characters become underscores and a leading digit gets one prepended.
pub fn namify(name: &str) -> String {
  let mut res: String = name
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
    .collect();
  if res.chars().next().is_none_or(|c| c.is_ascii_digit()) {
    res.insert(0, '_');
  }
  res
}

/// SystemVerilog identifier rule: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_valid_identifier(name: &str) -> bool {
  let mut chars = name.chars();
  match chars.next() {
    Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
    _ => return false,
  }
  chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
