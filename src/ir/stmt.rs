use indexmap::IndexSet;

use crate::ir::node::{BaseNode, LogicNode, NodeKind};
use crate::ir::value::Bits;

/// Overlap and exhaustiveness intent of a case statement, rendered as the
/// `unique`/`priority` keywords at emission.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ConditionalKind {
  None,
  Unique,
  Priority,
}

/// One arm of a case statement: a constant pattern and its body.
#[derive(Clone)]
pub struct CaseItem {
  pub pattern: Bits,
  pub body: Vec<Stmt>,
}

impl CaseItem {
  pub fn new(pattern: Bits, body: Vec<Stmt>) -> Self {
    Self { pattern, body }
  }
}

/// Shared payload of `Case` and `CaseZ`.
#[derive(Clone)]
pub struct CaseStmt {
  pub sel: BaseNode,
  pub items: Vec<CaseItem>,
  pub default: Vec<Stmt>,
  pub kind: ConditionalKind,
}

/// One node of the conditional tree inside an always block.
///
/// A body is an ordered list of these; ordering is the program order the
/// simulator and the emitted HDL both honor.
#[derive(Clone)]
pub enum Stmt {
  Assign {
    target: BaseNode,
    value: BaseNode,
  },
  If {
    cond: BaseNode,
    then_body: Vec<Stmt>,
    else_body: Vec<Stmt>,
  },
  /// Bit-exact pattern matching.
  Case(CaseStmt),
  /// Pattern matching where Z bits in a pattern match any selector bit.
  CaseZ(CaseStmt),
}

impl Stmt {
  pub fn assign(target: LogicNode, value: impl Into<BaseNode>) -> Stmt {
    Stmt::Assign {
      target: target.upcast(),
      value: value.into(),
    }
  }

  pub fn cond(cond: impl Into<BaseNode>, then_body: Vec<Stmt>, else_body: Vec<Stmt>) -> Stmt {
    Stmt::If {
      cond: cond.into(),
      then_body,
      else_body,
    }
  }

  pub fn case(
    sel: impl Into<BaseNode>,
    items: Vec<CaseItem>,
    default: Vec<Stmt>,
    kind: ConditionalKind,
  ) -> Stmt {
    Stmt::Case(CaseStmt {
      sel: sel.into(),
      items,
      default,
      kind,
    })
  }

  pub fn casez(
    sel: impl Into<BaseNode>,
    items: Vec<CaseItem>,
    default: Vec<Stmt>,
    kind: ConditionalKind,
  ) -> Stmt {
    Stmt::CaseZ(CaseStmt {
      sel: sel.into(),
      items,
      default,
      kind,
    })
  }
}

/// Every signal assigned anywhere in the statement tree, in first-assign
/// order.
pub fn collect_targets(body: &[Stmt], into: &mut IndexSet<BaseNode>) {
  for stmt in body {
    match stmt {
      Stmt::Assign { target, .. } => {
        into.insert(*target);
      }
      Stmt::If {
        then_body,
        else_body,
        ..
      } => {
        collect_targets(then_body, into);
        collect_targets(else_body, into);
      }
      Stmt::Case(case) | Stmt::CaseZ(case) => {
        for item in &case.items {
          collect_targets(&item.body, into);
        }
        collect_targets(&case.default, into);
      }
    }
  }
}

/// Every signal read anywhere in the statement tree: right-hand sides,
/// conditions, and selectors. Constants are skipped.
pub fn collect_reads(body: &[Stmt], into: &mut IndexSet<BaseNode>) {
  let mut push = |node: &BaseNode, into: &mut IndexSet<BaseNode>| {
    if node.get_kind() == NodeKind::Logic {
      into.insert(*node);
    }
  };
  for stmt in body {
    match stmt {
      Stmt::Assign { value, .. } => push(value, into),
      Stmt::If {
        cond,
        then_body,
        else_body,
      } => {
        push(cond, into);
        collect_reads(then_body, into);
        collect_reads(else_body, into);
      }
      Stmt::Case(case) | Stmt::CaseZ(case) => {
        push(&case.sel, into);
        for item in &case.items {
          collect_reads(&item.body, into);
        }
        collect_reads(&case.default, into);
      }
    }
  }
}
