use std::fmt::{Display, Formatter};

use crate::ir::node::*;

/// Binary operator subcodes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Binary {
  And,
  Or,
  Xor,
  Add,
  Sub,
  Mul,
  Shl,
  Shr,
}

impl Display for Binary {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let mnemonic = match self {
      Binary::And => "&",
      Binary::Or => "|",
      Binary::Xor => "^",
      Binary::Add => "+",
      Binary::Sub => "-",
      Binary::Mul => "*",
      Binary::Shl => "<<",
      Binary::Shr => ">>",
    };
    mnemonic.fmt(f)
  }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Unary {
  Not,
}

impl Display for Unary {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    "~".fmt(f)
  }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Compare {
  Eq,
  Ne,
  Lt,
  Le,
  Gt,
  Ge,
}

impl Display for Compare {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let mnemonic = match self {
      Compare::Eq => "==",
      Compare::Ne => "!=",
      Compare::Lt => "<",
      Compare::Le => "<=",
      Compare::Gt => ">",
      Compare::Ge => ">=",
    };
    mnemonic.fmt(f)
  }
}

/// The operation computed by an expression node.
///
/// Structural accessors (`Slice`, `Concat`) carry their geometry in the
/// opcode so the operand list stays homogeneous.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Opcode {
  Binary { binop: Binary },
  Unary { uop: Unary },
  Compare { cmp: Compare },
  Slice { hi: usize, lo: usize },
  Concat,
  Mux,
}

impl From<Binary> for Opcode {
  fn from(binop: Binary) -> Self {
    Opcode::Binary { binop }
  }
}

impl From<Unary> for Opcode {
  fn from(uop: Unary) -> Self {
    Opcode::Unary { uop }
  }
}

impl From<Compare> for Opcode {
  fn from(cmp: Compare) -> Self {
    Opcode::Compare { cmp }
  }
}

/// An operator node continuously driving a derived signal.
///
/// Operands are `Logic` or `Const` handles; the result is always a fresh
/// unpreferred `Logic`, so an expression's value is observable and traceable
/// like any other signal.
pub struct Expr {
  pub(crate) key: usize,
  opcode: Opcode,
  operands: Vec<BaseNode>,
  /// The derived signal this expression drives. Set right after insertion.
  pub(crate) result: BaseNode,
  width: usize,
}

impl Expr {
  pub(crate) fn new(opcode: Opcode, operands: Vec<BaseNode>, width: usize) -> Self {
    if let Some(arity) = opcode_arity(&opcode) {
      assert_eq!(operands.len(), arity, "{:?} arity mismatch", opcode);
    }
    Self {
      key: 0,
      opcode,
      operands,
      result: BaseNode::unknown(),
      width,
    }
  }

  pub fn get_opcode(&self) -> Opcode {
    self.opcode
  }

  pub fn get_width(&self) -> usize {
    self.width
  }

  pub fn get_result(&self) -> BaseNode {
    self.result
  }

  pub fn get_operand(&self, i: usize) -> Option<BaseNode> {
    self.operands.get(i).copied()
  }

  pub fn operand_iter(&self) -> impl Iterator<Item = BaseNode> + '_ {
    self.operands.iter().copied()
  }

  pub fn get_num_operands(&self) -> usize {
    self.operands.len()
  }
}

fn opcode_arity(opcode: &Opcode) -> Option<usize> {
  match opcode {
    Opcode::Binary { .. } | Opcode::Compare { .. } => Some(2),
    Opcode::Unary { .. } | Opcode::Slice { .. } => Some(1),
    Opcode::Mux => Some(3),
    // Variadic.
    Opcode::Concat => None,
  }
}
