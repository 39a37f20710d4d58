use std::fmt::{Display, Formatter};

use crate::builder::Design;
use crate::ir::block::Sensitivity;
use crate::ir::module::Module;
use crate::ir::node::*;
use crate::ir::stmt::{CaseStmt, Stmt};
use crate::ir::visitor::Visitor;

/// Renders a design into a compact debugging text. This is not the HDL
/// emitter; it prints the raw graph the way it was constructed.
pub struct IRPrinter<'a> {
  sys: &'a Design,
  indent: usize,
}

impl<'a> IRPrinter<'a> {
  pub fn new(sys: &'a Design) -> Self {
    IRPrinter { sys, indent: 0 }
  }

  fn pad(&self) -> String {
    " ".repeat(self.indent)
  }

  fn node_text(&self, node: BaseNode) -> String {
    match node.get_kind() {
      NodeKind::Expr => {
        let expr = self.sys.get::<crate::ir::expr::Expr>(node).unwrap();
        let operands: Vec<String> = expr.operand_iter().map(|x| x.to_string(self.sys)).collect();
        format!("{:?}({})", expr.get_opcode(), operands.join(", "))
      }
      _ => node.to_string(self.sys),
    }
  }

  fn print_module(&mut self, module: &ModuleRef<'_>) -> String {
    let mut res = String::new();
    res.push_str(&format!("{}module {}(", self.pad(), module.get_name()));
    let ports: Vec<String> = module
      .input_iter()
      .map(|(name, port)| format!("in {}: {}", name, port.get_width()))
      .chain(
        module
          .output_iter()
          .map(|(name, port)| format!("out {}: {}", name, port.get_width())),
      )
      .collect();
    res.push_str(&ports.join(", "));
    res.push_str(") {\n");
    self.indent += 2;

    for internal in module.internal_iter() {
      let source = match internal.get_source() {
        Some(src) => self.node_text(src),
        None => "<undriven>".to_string(),
      };
      res.push_str(&format!(
        "{}wire {}[{}] = {}\n",
        self.pad(),
        internal.display_name(),
        internal.get_width(),
        source
      ));
    }

    for block in module.block_iter() {
      let head = match block.get_sensitivity() {
        Sensitivity::Combinational => "comb".to_string(),
        Sensitivity::PosEdge(clk) => format!("ff @ {}", clk.to_string(self.sys)),
      };
      res.push_str(&format!("{}{} {{\n", self.pad(), head));
      self.indent += 2;
      res.push_str(&self.print_stmts(block.get_body()));
      self.indent -= 2;
      res.push_str(&format!("{}}}\n", self.pad()));
    }

    for sub in module.submodule_iter() {
      let label = sub
        .get_instance_name()
        .map(|x| x.to_string())
        .unwrap_or_else(|_| "<unnamed>".to_string());
      res.push_str(&format!("{}instance {} : {}\n", self.pad(), label, sub.get_name()));
    }

    self.indent -= 2;
    res.push_str(&format!("{}}}\n", self.pad()));
    res
  }

  fn print_stmts(&mut self, stmts: &[Stmt]) -> String {
    let mut res = String::new();
    for stmt in stmts {
      match stmt {
        Stmt::Assign { target, value } => {
          res.push_str(&format!(
            "{}{} < {}\n",
            self.pad(),
            target.to_string(self.sys),
            self.node_text(*value)
          ));
        }
        Stmt::If {
          cond,
          then_body,
          else_body,
        } => {
          res.push_str(&format!("{}if {} {{\n", self.pad(), self.node_text(*cond)));
          self.indent += 2;
          res.push_str(&self.print_stmts(then_body));
          self.indent -= 2;
          if else_body.is_empty() {
            res.push_str(&format!("{}}}\n", self.pad()));
          } else {
            res.push_str(&format!("{}}} else {{\n", self.pad()));
            self.indent += 2;
            res.push_str(&self.print_stmts(else_body));
            self.indent -= 2;
            res.push_str(&format!("{}}}\n", self.pad()));
          }
        }
        Stmt::Case(case) => res.push_str(&self.print_case(case, "case")),
        Stmt::CaseZ(case) => res.push_str(&self.print_case(case, "casez")),
      }
    }
    res
  }

  fn print_case(&mut self, case: &CaseStmt, keyword: &str) -> String {
    let mut res = format!("{}{} {} {{\n", self.pad(), keyword, self.node_text(case.sel));
    self.indent += 2;
    for item in &case.items {
      res.push_str(&format!("{}{:?} => {{\n", self.pad(), item.pattern));
      self.indent += 2;
      res.push_str(&self.print_stmts(&item.body));
      self.indent -= 2;
      res.push_str(&format!("{}}}\n", self.pad()));
    }
    if !case.default.is_empty() {
      res.push_str(&format!("{}default => {{\n", self.pad()));
      self.indent += 2;
      res.push_str(&self.print_stmts(&case.default));
      self.indent -= 2;
      res.push_str(&format!("{}}}\n", self.pad()));
    }
    self.indent -= 2;
    res.push_str(&format!("{}}}\n", self.pad()));
    res
  }
}

impl Visitor<String> for IRPrinter<'_> {
  fn visit_module(&mut self, module: &ModuleRef<'_>) -> String {
    self.print_module(module)
  }
}

impl Display for Design {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let mut printer = IRPrinter::new(self);
    writeln!(f, "design {} {{", self.get_name())?;
    for module in self.modules.clone() {
      let module = module.as_ref::<Module>(self).unwrap();
      write!(f, "\n{}", printer.visit_module(&module))?;
    }
    write!(f, "}}")
  }
}
