use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;

use indexmap::IndexSet;

use crate::backend::Config;
use crate::builder::naming::NameTable;
use crate::builder::Design;
use crate::error::{Error, Result};
use crate::ir::block::Sensitivity;
use crate::ir::expr::{Expr, Opcode};
use crate::ir::module::Module;
use crate::ir::node::*;
use crate::ir::signal::{Const, Logic};
use crate::ir::stmt::{CaseStmt, ConditionalKind, Stmt};

use super::utils::{casez_pattern, decl, literal, namify};

const DELIMITER: &str = "// ------------------------------------------------------------";

/// Lower a built hierarchy to SystemVerilog text.
///
/// One definition is emitted per unique module type signature; structurally
/// identical instances collapse onto the first definition. Children print
/// before their parents.
pub fn elaborate(sys: &Design, top: ModuleNode) -> Result<String> {
  if !top.as_ref(sys).has_built() {
    return Err(Error::NotBuilt {
      module: top.as_ref(sys).get_name().to_string(),
    });
  }

  let order = post_order(sys, top);
  let mut def_names: HashMap<BaseNode, String> = HashMap::new();
  let mut signatures: HashMap<String, String> = HashMap::new();
  let mut name_table = NameTable::new();
  let mut chunks = Vec::new();

  for module in order {
    let rendered = ModuleDumper::new(sys, module, &def_names).render()?;
    let module_ref = module.as_ref::<Module>(sys).unwrap();
    let signature = format!("{}\n{}", module_ref.get_name(), rendered);
    if let Some(existing) = signatures.get(&signature) {
      def_names.insert(module, existing.clone());
      continue;
    }
    let def_name = name_table.uniquify(&namify(module_ref.get_name()));
    log::debug!("emitting module {} as {}", module_ref.get_name(), def_name);
    signatures.insert(signature, def_name.clone());
    def_names.insert(module, def_name.clone());
    chunks.push(format!("module {}{}endmodule : {}\n", def_name, rendered, def_name));
  }

  let mut res = String::new();
  res.push_str(DELIMITER);
  res.push('\n');
  res.push_str(&format!("// Design: {}\n", sys.get_name()));
  res.push_str("// Emitted by the weft hardware construction framework.\n");
  res.push_str(DELIMITER);
  res.push_str("\n\n");
  let separator = format!("\n{}\n\n", DELIMITER);
  res.push_str(&chunks.join(separator.as_str()));
  Ok(res)
}

/// Elaborate and write `<design>.sv` under the config's base directory.
pub fn elaborate_to_file(sys: &Design, top: ModuleNode, config: &Config) -> Result<PathBuf> {
  let text = elaborate(sys, top)?;
  let fname = config.fname(sys, "sv");
  if config.override_dump || !fname.exists() {
    fs::write(&fname, text).unwrap_or_else(|e| panic!("cannot write {:?}: {}", fname, e));
  }
  Ok(fname)
}

fn post_order(sys: &Design, top: ModuleNode) -> Vec<BaseNode> {
  let mut res = Vec::new();
  let mut visited = HashSet::new();
  fn walk(sys: &Design, node: BaseNode, visited: &mut HashSet<BaseNode>, res: &mut Vec<BaseNode>) {
    if !visited.insert(node) {
      return;
    }
    let children = node.as_ref::<Module>(sys).unwrap().get().submodules.clone();
    for child in children {
      walk(sys, child, visited, res);
    }
    res.push(node);
  }
  walk(sys, top.upcast(), &mut visited, &mut res);
  res
}

/// Renders one module definition body (everything between the definition
/// name and `endmodule`).
struct ModuleDumper<'a> {
  sys: &'a Design,
  module: BaseNode,
  def_names: &'a HashMap<BaseNode, String>,
  /// Derived signals substituted at their single use site.
  inline: HashSet<BaseNode>,
  /// Foreign sub-module ports to the net bound at the instantiation site.
  nets: HashMap<BaseNode, String>,
  /// Synthesized instance nets needing their own declaration.
  extra_nets: Vec<(String, usize)>,
  /// Local signals driven directly by an instance output, so their
  /// continuous assign is subsumed by the port binding.
  inst_driven: HashSet<BaseNode>,
  /// `assign a = b;` pairs for secondary readers of an instance output.
  aliases: Vec<(String, String)>,
}

impl<'a> ModuleDumper<'a> {
  fn new(sys: &'a Design, module: BaseNode, def_names: &'a HashMap<BaseNode, String>) -> Self {
    Self {
      sys,
      module,
      def_names,
      inline: HashSet::new(),
      nets: HashMap::new(),
      extra_nets: Vec::new(),
      inst_driven: HashSet::new(),
      aliases: Vec::new(),
    }
  }

  fn module_ref(&self) -> ModuleRef<'a> {
    self.module.as_ref::<Module>(self.sys).unwrap()
  }

  fn render(&mut self) -> Result<String> {
    let mut res = String::new();
    res.push_str(&self.render_ports());

    if let Some(custom) = self.module_ref().get_custom_verilog() {
      res.push_str(custom);
      res.push('\n');
      return Ok(res);
    }

    self.plan_elision();
    self.plan_instances();

    let decls = self.render_decls();
    let assigns = self.render_assigns();
    let instances = self.render_instances();
    let blocks = self.render_blocks()?;

    for section in [decls, assigns, instances, blocks] {
      if !section.is_empty() {
        res.push_str(&section);
        res.push('\n');
      }
    }
    Ok(res)
  }

  fn render_ports(&self) -> String {
    let module = self.module_ref();
    let mut lines = Vec::new();
    for (name, port) in module.input_iter() {
      lines.push(format!("  input {}", decl(port.get_width(), name)));
    }
    for (name, port) in module.output_iter() {
      lines.push(format!("  output {}", decl(port.get_width(), name)));
    }
    if lines.is_empty() {
      " ();\n\n".to_string()
    } else {
      format!(" (\n{}\n);\n\n", lines.join(",\n"))
    }
  }

  /// Mark which derived signals can vanish into their single use site. A
  /// sliced signal must stay declared: part-selects apply to names only.
  fn plan_elision(&mut self) {
    let mut forced: HashSet<BaseNode> = HashSet::new();
    for (_, elem) in self.sys.slab.iter() {
      if let Element::Expr(expr) = elem {
        if let Opcode::Slice { .. } = expr.get_opcode() {
          forced.extend(expr.operand_iter().filter(|x| x.get_kind() == NodeKind::Logic));
        }
      }
    }
    let module = self.module_ref();
    for internal in module.internal_iter() {
      let node = internal.upcast();
      let from_expr = internal
        .get_source()
        .is_some_and(|src| src.get_kind() == NodeKind::Expr);
      if internal.is_unpreferred()
        && from_expr
        && internal.get().dests.len() == 1
        && !forced.contains(&node)
      {
        self.inline.insert(node);
      }
    }
  }

  /// Pick the net bound to each sub-module port. An output port whose value
  /// lands in exactly one local signal borrows that signal's name; anything
  /// else gets a synthesized `<instance>_<port>` net.
  fn plan_instances(&mut self) {
    let children = self.module_ref().get().submodules.clone();
    for child in children {
      let child_ref = child.as_ref::<Module>(self.sys).unwrap();
      let inst = child_ref.get_instance_name().unwrap_or("anonymous").to_string();
      for (pname, port) in child_ref.output_iter() {
        let readers: Vec<BaseNode> = port
          .dest_iter()
          .filter(|d| {
            d.get_kind() == NodeKind::Logic
              && Logic::downcast(&self.sys.slab, *d).unwrap().get_parent() == Some(self.module)
              && Logic::downcast(&self.sys.slab, *d).unwrap().get_source() == Some(port.upcast())
          })
          .collect();
        let net = if let Some(first) = readers.first() {
          self.inst_driven.insert(*first);
          self.inline.remove(first);
          let net = Logic::downcast(&self.sys.slab, *first).unwrap().display_name();
          for other in &readers[1..] {
            self.inst_driven.insert(*other);
            let name = Logic::downcast(&self.sys.slab, *other).unwrap().display_name();
            self.aliases.push((name, net.clone()));
          }
          net
        } else {
          let net = format!("{}_{}", inst, pname);
          self.extra_nets.push((net.clone(), port.get_width()));
          net
        };
        self.nets.insert(port.upcast(), net);
      }
    }
  }

  fn render_decls(&self) -> String {
    let mut res = String::new();
    for internal in self.module_ref().internal_iter() {
      let node = internal.upcast();
      if self.inline.contains(&node) {
        continue;
      }
      res.push_str(&format!("  {};\n", decl(internal.get_width(), &internal.display_name())));
    }
    for (name, width) in &self.extra_nets {
      res.push_str(&format!("  {};\n", decl(*width, name)));
    }
    res
  }

  fn render_assigns(&self) -> String {
    let module = self.module_ref();
    let mut res = String::new();
    let driven: Vec<LogicRef> = module
      .output_iter()
      .map(|(_, p)| p)
      .chain(module.internal_iter())
      .collect();
    for sig in driven {
      let node = sig.upcast();
      if self.inline.contains(&node) || self.inst_driven.contains(&node) {
        continue;
      }
      let Some(src) = sig.get_source() else {
        continue;
      };
      match src.get_kind() {
        NodeKind::Always => {}
        NodeKind::Expr => {
          res.push_str(&format!(
            "  assign {} = {};\n",
            sig.display_name(),
            self.expr_body(src)
          ));
        }
        NodeKind::Logic | NodeKind::Const => {
          res.push_str(&format!(
            "  assign {} = {};\n",
            sig.display_name(),
            self.operand_text(src)
          ));
        }
        kind => unreachable!("{:?} cannot drive {}", kind, sig.display_name()),
      }
    }
    for (reader, net) in &self.aliases {
      res.push_str(&format!("  assign {} = {};\n", reader, net));
    }
    res
  }

  fn render_instances(&self) -> String {
    let mut res = String::new();
    let children = self.module_ref().get().submodules.clone();
    for child in children {
      let child_ref = child.as_ref::<Module>(self.sys).unwrap();
      let def_name = self
        .def_names
        .get(&child)
        .cloned()
        .unwrap_or_else(|| namify(child_ref.get_name()));
      let inst = child_ref.get_instance_name().unwrap_or("anonymous").to_string();
      let mut bindings = Vec::new();
      for (pname, port) in child_ref.input_iter() {
        let bound = match port.get_source() {
          Some(src) => self.operand_text(src),
          None => String::new(),
        };
        bindings.push(format!("    .{}({})", pname, bound));
      }
      for (pname, port) in child_ref.output_iter() {
        let net = self.nets.get(&port.upcast()).cloned().unwrap_or_default();
        bindings.push(format!("    .{}({})", pname, net));
      }
      res.push_str(&format!(
        "  {} {} (\n{}\n  );\n",
        def_name,
        inst,
        bindings.join(",\n")
      ));
    }
    res
  }

  fn render_blocks(&self) -> Result<String> {
    let mut res = String::new();
    for block in self.module_ref().block_iter() {
      match block.get_sensitivity() {
        Sensitivity::Combinational => {
          res.push_str("  always_comb begin\n");
          res.push_str(&self.render_stmts(block.get_body(), 2, false));
          res.push_str("  end\n");
        }
        Sensitivity::PosEdge(clk) => {
          self.check_ff_paths(block.get_body())?;
          res.push_str(&format!(
            "  always_ff @(posedge {}) begin\n",
            self.name_of(clk)
          ));
          res.push_str(&self.render_stmts(block.get_body(), 2, true));
          res.push_str("  end\n");
        }
      }
    }
    Ok(res)
  }

  /// Reject a target assigned twice along one control path of an
  /// edge-triggered body. Mutually exclusive branches stay legal.
  fn check_ff_paths(&self, body: &[Stmt]) -> Result<IndexSet<BaseNode>> {
    let mut acc: IndexSet<BaseNode> = IndexSet::new();
    for stmt in body {
      let assigned = match stmt {
        Stmt::Assign { target, .. } => {
          let mut set = IndexSet::new();
          set.insert(*target);
          set
        }
        Stmt::If {
          then_body,
          else_body,
          ..
        } => {
          let mut set = self.check_ff_paths(then_body)?;
          set.extend(self.check_ff_paths(else_body)?);
          set
        }
        Stmt::Case(case) | Stmt::CaseZ(case) => {
          let mut set = IndexSet::new();
          for item in &case.items {
            set.extend(self.check_ff_paths(&item.body)?);
          }
          set.extend(self.check_ff_paths(&case.default)?);
          set
        }
      };
      for target in assigned {
        if !acc.insert(target) {
          return Err(Error::DriverConflict {
            signal: target.to_string(self.sys),
            path: self
              .module_ref()
              .hierarchical_path()
              .unwrap_or_else(|_| self.module_ref().get_name().to_string()),
          });
        }
      }
    }
    Ok(acc)
  }

  fn render_stmts(&self, stmts: &[Stmt], indent: usize, nonblocking: bool) -> String {
    let sp = "  ".repeat(indent);
    let op = if nonblocking { "<=" } else { "=" };
    let mut res = String::new();
    for stmt in stmts {
      match stmt {
        Stmt::Assign { target, value } => {
          res.push_str(&format!(
            "{}{} {} {};\n",
            sp,
            self.name_of(*target),
            op,
            self.operand_text(*value)
          ));
        }
        Stmt::If {
          cond,
          then_body,
          else_body,
        } => {
          res.push_str(&format!("{}if ({}) begin\n", sp, self.operand_text(*cond)));
          res.push_str(&self.render_stmts(then_body, indent + 1, nonblocking));
          if else_body.is_empty() {
            res.push_str(&format!("{}end\n", sp));
          } else {
            res.push_str(&format!("{}end else begin\n", sp));
            res.push_str(&self.render_stmts(else_body, indent + 1, nonblocking));
            res.push_str(&format!("{}end\n", sp));
          }
        }
        Stmt::Case(case) => res.push_str(&self.render_case(case, indent, nonblocking, false)),
        Stmt::CaseZ(case) => res.push_str(&self.render_case(case, indent, nonblocking, true)),
      }
    }
    res
  }

  fn render_case(&self, case: &CaseStmt, indent: usize, nonblocking: bool, wildcard: bool) -> String {
    let sp = "  ".repeat(indent);
    let inner = "  ".repeat(indent + 1);
    let prefix = match case.kind {
      ConditionalKind::None => "",
      ConditionalKind::Unique => "unique ",
      ConditionalKind::Priority => "priority ",
    };
    let keyword = if wildcard { "casez" } else { "case" };
    let mut res = format!("{}{}{} ({})\n", sp, prefix, keyword, self.operand_text(case.sel));
    for item in &case.items {
      let pattern = if wildcard {
        casez_pattern(&item.pattern)
      } else {
        literal(&item.pattern)
      };
      res.push_str(&format!("{}{}: begin\n", inner, pattern));
      res.push_str(&self.render_stmts(&item.body, indent + 2, nonblocking));
      res.push_str(&format!("{}end\n", inner));
    }
    if !case.default.is_empty() {
      res.push_str(&format!("{}default: begin\n", inner));
      res.push_str(&self.render_stmts(&case.default, indent + 2, nonblocking));
      res.push_str(&format!("{}end\n", inner));
    }
    res.push_str(&format!("{}endcase\n", sp));
    res
  }

  /// The name a signal goes by inside this module's text: its own name for
  /// local signals, the instantiation net for foreign sub-module ports.
  fn name_of(&self, sig: BaseNode) -> String {
    let logic = Logic::downcast(&self.sys.slab, sig).unwrap();
    match logic.get_parent() {
      Some(p) if p == self.module => logic.display_name(),
      Some(_) => self
        .nets
        .get(&sig)
        .cloned()
        .unwrap_or_else(|| logic.display_name()),
      None => logic.display_name(),
    }
  }

  fn operand_text(&self, node: BaseNode) -> String {
    match node.get_kind() {
      NodeKind::Const => literal(Const::downcast(&self.sys.slab, node).unwrap().get_value()),
      NodeKind::Expr => format!("({})", self.expr_body(node)),
      NodeKind::Logic => {
        if self.inline.contains(&node) {
          let src = Logic::downcast(&self.sys.slab, node).unwrap().get_source().unwrap();
          format!("({})", self.expr_body(src))
        } else {
          self.name_of(node)
        }
      }
      kind => unreachable!("{:?} has no textual form", kind),
    }
  }

  fn expr_body(&self, node: BaseNode) -> String {
    let expr = Expr::downcast(&self.sys.slab, node).unwrap();
    let operand = |i: usize| self.operand_text(expr.get_operand(i).unwrap());
    match expr.get_opcode() {
      Opcode::Binary { binop } => format!("{} {} {}", operand(0), binop, operand(1)),
      Opcode::Unary { uop } => format!("{}{}", uop, operand(0)),
      Opcode::Compare { cmp } => format!("{} {} {}", operand(0), cmp, operand(1)),
      Opcode::Slice { hi, lo } => {
        format!("{}[{}:{}]", self.name_of(expr.get_operand(0).unwrap()), hi, lo)
      }
      Opcode::Concat => {
        let parts: Vec<String> = expr.operand_iter().map(|x| self.operand_text(x)).collect();
        format!("{{{}}}", parts.join(", "))
      }
      Opcode::Mux => format!("{} ? {} : {}", operand(0), operand(1), operand(2)),
    }
  }
}
