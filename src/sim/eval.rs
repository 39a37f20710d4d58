use std::collections::VecDeque;

use indexmap::{IndexMap, IndexSet};

use crate::builder::Design;
use crate::ir::block::{Always, Sensitivity};
use crate::ir::expr::{Binary, Compare, Expr, Opcode};
use crate::ir::node::*;
use crate::ir::signal::{Const, Logic};
use crate::ir::stmt::{collect_targets, CaseStmt, Stmt};
use crate::ir::value::{Bit, Bits};
use crate::sim::Simulator;

/// Wakeups allowed per committed time step. Feedback through combinational
/// logic that never settles trips this bound; the scheduler does not
/// fixed-point-iterate forever.
const DELTA_LIMIT: usize = 10_000;

/// Settle the graph's initial state: constants never glitch, so signals
/// wired straight to a constant, and combinational blocks that read
/// nothing that has changed yet, get one explicit evaluation here.
/// Idempotent; call it before driving stimulus.
pub(crate) fn initialize(sys: &mut Design, sim: &mut Simulator) {
  let mut const_driven = Vec::new();
  let mut combs = Vec::new();
  for (_, elem) in sys.slab.iter() {
    match elem {
      Element::Logic(logic) => {
        if let Some(src) = logic.get_source() {
          if src.get_kind() == NodeKind::Const {
            const_driven.push((logic.upcast(), src));
          }
        }
      }
      Element::Always(block) if !block.is_sequential() => combs.push(block.upcast()),
      _ => {}
    }
  }
  for (sig, src) in const_driven {
    let value = Const::downcast(&sys.slab, src).unwrap().get_value().clone();
    if let Some(old) = commit(sys, sim, sig, value) {
      propagate(sys, sim, VecDeque::from([(sig, old)]));
    }
  }
  for block in combs {
    for (target, value) in eval_block(sys, block, true) {
      if let Some(old) = commit(sys, sim, target, value) {
        propagate(sys, sim, VecDeque::from([(target, old)]));
      }
    }
  }
}

/// Force a value onto a signal and propagate to completion.
pub(crate) fn put(sys: &mut Design, sim: &mut Simulator, signal: LogicNode, value: Bits) {
  let node = signal.upcast();
  if let Some(old) = commit(sys, sim, node, value) {
    propagate(sys, sim, VecDeque::from([(node, old)]));
  }
}

/// Write a committed value. Returns the previous value when it actually
/// changed, having already notified the glitch stream.
fn commit(sys: &mut Design, sim: &mut Simulator, sig: BaseNode, value: Bits) -> Option<Bits> {
  let time = sim.now();
  let logic = Logic::downcast_mut(&mut sys.slab, sig).unwrap();
  assert_eq!(
    logic.get_width(),
    value.width(),
    "commit width mismatch on {}",
    logic.display_name()
  );
  if logic.value == value {
    return None;
  }
  let old = std::mem::replace(&mut logic.value, value.clone());
  sim.notify(sig.get_key(), time, &value);
  Some(old)
}

/// Fan a set of changed signals out through the graph: directly connected
/// readers, operator nodes, combinational blocks, and (on a rising edge)
/// edge-triggered blocks. Runs to quiescence within the current time.
fn propagate(sys: &mut Design, sim: &mut Simulator, mut work: VecDeque<(BaseNode, Bits)>) {
  let mut wakeups = 0usize;
  while let Some((sig, old)) = work.pop_front() {
    wakeups += 1;
    if wakeups > DELTA_LIMIT {
      panic!(
        "combinational feedback through {} did not settle",
        sig.to_string(sys)
      );
    }
    let (new, dests) = {
      let logic = Logic::downcast(&sys.slab, sig).unwrap();
      (logic.get_value().clone(), logic.dests.clone())
    };
    let mut edge_blocks = Vec::new();
    for user in dests {
      match user.get_kind() {
        NodeKind::Logic => {
          // A directly connected reader follows the driver's value.
          if let Some(prev) = commit(sys, sim, user, new.clone()) {
            work.push_back((user, prev));
          }
        }
        NodeKind::Expr => {
          let value = eval_expr(sys, user);
          let result = Expr::downcast(&sys.slab, user).unwrap().get_result();
          if let Some(prev) = commit(sys, sim, result, value) {
            work.push_back((result, prev));
          }
        }
        NodeKind::Always => {
          let sensitivity = Always::downcast(&sys.slab, user).unwrap().get_sensitivity();
          match sensitivity {
            Sensitivity::Combinational => {
              for (target, value) in eval_block(sys, user, true) {
                if let Some(prev) = commit(sys, sim, target, value) {
                  work.push_back((target, prev));
                }
              }
            }
            Sensitivity::PosEdge(clk) => {
              if clk == sig && rising(&old, &new) {
                edge_blocks.push(user);
              }
            }
          }
        }
        kind => unreachable!("{:?} cannot consume a signal", kind),
      }
    }
    if !edge_blocks.is_empty() {
      // Every block on this edge samples pre-edge state; the updates land
      // simultaneously afterwards.
      let mut updates = Vec::new();
      for block in edge_blocks {
        updates.extend(eval_block(sys, block, false));
      }
      for (target, value) in updates {
        if let Some(prev) = commit(sys, sim, target, value) {
          work.push_back((target, prev));
        }
      }
    }
  }
}

fn rising(old: &Bits, new: &Bits) -> bool {
  old.is_fully_defined() && old.is_all_zero() && new.or_reduce() == Bit::One
}

/// Run a block body to produce its target updates.
///
/// Blocking mode (combinational) lets reads observe writes made earlier in
/// the same evaluation; non-blocking mode (edge-triggered) samples only
/// committed pre-edge state. Either way, later writes to a target supersede
/// earlier ones.
fn eval_block(sys: &Design, block: BaseNode, blocking: bool) -> Vec<(BaseNode, Bits)> {
  let body = Always::downcast(&sys.slab, block).unwrap().get_body();
  let mut env: IndexMap<BaseNode, Bits> = IndexMap::new();
  exec_stmts(sys, body, blocking, &mut env);
  env.into_iter().collect()
}

fn exec_stmts(sys: &Design, stmts: &[Stmt], blocking: bool, env: &mut IndexMap<BaseNode, Bits>) {
  for stmt in stmts {
    match stmt {
      Stmt::Assign { target, value } => {
        let value = read(sys, *value, blocking, env);
        env.insert(*target, value);
      }
      Stmt::If {
        cond,
        then_body,
        else_body,
      } => {
        let cond = read(sys, *cond, blocking, env);
        match cond.or_reduce() {
          Bit::One => exec_stmts(sys, then_body, blocking, env),
          Bit::Zero => exec_stmts(sys, else_body, blocking, env),
          // An undecidable branch contaminates everything either arm
          // could have written.
          _ => {
            contaminate(sys, then_body, env);
            contaminate(sys, else_body, env);
          }
        }
      }
      Stmt::Case(case) => exec_case(sys, case, false, blocking, env),
      Stmt::CaseZ(case) => exec_case(sys, case, true, blocking, env),
    }
  }
}

fn exec_case(
  sys: &Design,
  case: &CaseStmt,
  wildcard: bool,
  blocking: bool,
  env: &mut IndexMap<BaseNode, Bits>,
) {
  let sel = read(sys, case.sel, blocking, env);
  if !sel.is_fully_defined() {
    // No pattern matches an X selector; the default is taken with its
    // side effects contaminated.
    contaminate(sys, &case.default, env);
    return;
  }
  for item in &case.items {
    let hit = if wildcard {
      sel.eq_wildcard_z(&item.pattern)
    } else {
      sel == item.pattern
    };
    if hit {
      exec_stmts(sys, &item.body, blocking, env);
      return;
    }
  }
  exec_stmts(sys, &case.default, blocking, env);
}

fn contaminate(sys: &Design, body: &[Stmt], env: &mut IndexMap<BaseNode, Bits>) {
  let mut targets = IndexSet::new();
  collect_targets(body, &mut targets);
  for target in targets {
    let width = target.get_width(sys).unwrap();
    env.insert(target, Bits::all_x(width));
  }
}

/// Resolve a value as seen from inside a block evaluation.
///
/// Blocking reads observe the overlay: a target assigned earlier in the
/// same evaluation reads its new value, and derived signals re-evaluate
/// their expression against the overlay so the shadowing is transitive.
/// Non-blocking reads sample committed (pre-edge) state only.
fn read(sys: &Design, node: BaseNode, blocking: bool, env: &IndexMap<BaseNode, Bits>) -> Bits {
  if blocking {
    if let Some(shadow) = env.get(&node) {
      return shadow.clone();
    }
    if node.get_kind() == NodeKind::Logic {
      let source = Logic::downcast(&sys.slab, node).unwrap().get_source();
      if let Some(src) = source {
        if src.get_kind() == NodeKind::Expr {
          return eval_expr_env(sys, src, Some(env));
        }
      }
    }
  }
  operand_value(sys, node)
}

fn operand_value(sys: &Design, node: BaseNode) -> Bits {
  match node.get_kind() {
    NodeKind::Const => Const::downcast(&sys.slab, node).unwrap().get_value().clone(),
    NodeKind::Logic => Logic::downcast(&sys.slab, node).unwrap().get_value().clone(),
    NodeKind::Expr => {
      let result = Expr::downcast(&sys.slab, node).unwrap().get_result();
      operand_value(sys, result)
    }
    kind => unreachable!("{:?} carries no value", kind),
  }
}

/// Recompute one operator node from its operands' current values.
pub(crate) fn eval_expr(sys: &Design, expr: BaseNode) -> Bits {
  eval_expr_env(sys, expr, None)
}

fn eval_expr_env(sys: &Design, expr: BaseNode, env: Option<&IndexMap<BaseNode, Bits>>) -> Bits {
  let expr = Expr::downcast(&sys.slab, expr).unwrap();
  let vals: Vec<Bits> = expr
    .operand_iter()
    .map(|op| match env {
      Some(env) => read(sys, op, true, env),
      None => operand_value(sys, op),
    })
    .collect();
  match expr.get_opcode() {
    Opcode::Binary { binop } => {
      let (a, b) = (&vals[0], &vals[1]);
      match binop {
        Binary::And => a & b,
        Binary::Or => a | b,
        Binary::Xor => a ^ b,
        Binary::Add => a.add(b),
        Binary::Sub => a.sub(b),
        Binary::Mul => a.mul(b),
        Binary::Shl => a.shl(b),
        Binary::Shr => a.shr(b),
      }
    }
    Opcode::Unary { .. } => !&vals[0],
    Opcode::Compare { cmp } => eval_compare(cmp, &vals[0], &vals[1]),
    Opcode::Slice { hi, lo } => vals[0].slice(hi, lo),
    Opcode::Concat => {
      let mut acc = vals[0].clone();
      for part in &vals[1..] {
        acc = acc.concat(part);
      }
      acc
    }
    Opcode::Mux => match vals[0].or_reduce() {
      Bit::One => vals[1].clone(),
      Bit::Zero => vals[2].clone(),
      _ => {
        if vals[1] == vals[2] {
          vals[1].clone()
        } else {
          Bits::all_x(expr.get_width())
        }
      }
    },
  }
}

fn eval_compare(cmp: Compare, a: &Bits, b: &Bits) -> Bits {
  match (a.to_big(), b.to_big()) {
    (Ok(a), Ok(b)) => {
      let res = match cmp {
        Compare::Eq => a == b,
        Compare::Ne => a != b,
        Compare::Lt => a < b,
        Compare::Le => a <= b,
        Compare::Gt => a > b,
        Compare::Ge => a >= b,
      };
      Bits::from_bool(res)
    }
    _ => Bits::all_x(1),
  }
}
