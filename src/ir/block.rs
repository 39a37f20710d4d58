use indexmap::IndexSet;

use crate::ir::node::*;
use crate::ir::stmt::{collect_reads, collect_targets, Stmt};

/// What wakes an always block up.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Sensitivity {
  /// Re-evaluated whenever any signal the body reads changes.
  Combinational,
  /// Evaluated on the rising edge of the given clock signal.
  PosEdge(BaseNode),
}

/// A behavioral block binding a conditional tree to its sensitivity.
///
/// Combinational bodies run with blocking semantics (later writes supersede
/// earlier ones, reads observe same-evaluation writes). Edge-triggered
/// bodies run with non-blocking semantics: right-hand sides sample pre-edge
/// values and every target commits at the end of the tick.
pub struct Always {
  pub(crate) key: usize,
  sensitivity: Sensitivity,
  body: Vec<Stmt>,
  /// Signals the body reads, in first-read order. For edge-triggered blocks
  /// this does not include the clock.
  reads: IndexSet<BaseNode>,
  /// Signals the body assigns, in first-assign order.
  targets: IndexSet<BaseNode>,
  parent: Option<BaseNode>,
}

impl Always {
  pub(crate) fn new(sensitivity: Sensitivity, body: Vec<Stmt>) -> Self {
    let mut reads = IndexSet::new();
    let mut targets = IndexSet::new();
    collect_reads(&body, &mut reads);
    collect_targets(&body, &mut targets);
    Self {
      key: 0,
      sensitivity,
      body,
      reads,
      targets,
      parent: None,
    }
  }

  pub fn get_sensitivity(&self) -> Sensitivity {
    self.sensitivity
  }

  pub fn is_sequential(&self) -> bool {
    matches!(self.sensitivity, Sensitivity::PosEdge(_))
  }

  pub fn get_clock(&self) -> Option<BaseNode> {
    match self.sensitivity {
      Sensitivity::PosEdge(clk) => Some(clk),
      Sensitivity::Combinational => None,
    }
  }

  pub fn get_body(&self) -> &[Stmt] {
    &self.body
  }

  pub fn read_iter(&self) -> impl Iterator<Item = BaseNode> + '_ {
    self.reads.iter().copied()
  }

  pub fn target_iter(&self) -> impl Iterator<Item = BaseNode> + '_ {
    self.targets.iter().copied()
  }
}

impl Parented for Always {
  fn get_parent(&self) -> Option<BaseNode> {
    self.parent
  }

  fn set_parent(&mut self, parent: BaseNode) {
    assert!(
      self.parent.is_none() || self.parent == Some(parent),
      "always block parent is assigned exactly once"
    );
    self.parent = Some(parent);
  }
}
