use weft::ir::stmt::Stmt;
use weft::ir::value::Bits;
use weft::{Design, Simulator};

/// Within one combinational evaluation, assignments are blocking: a later
/// read of an earlier target observes the in-flight value, and the last
/// write wins. `x < a; x < ~x` therefore settles at `~a`.
#[test]
fn self_referential_block_resolves_to_complement() {
  let mut sys = Design::new("selfref");
  let m = sys.create_module("m");
  let ea = sys.create_logic("ea", 1);
  let a = sys.add_input(m, "a", ea, 1).unwrap();
  let x = sys.add_output(m, "x", 1).unwrap();
  let nx = sys.create_not(x).unwrap();
  sys
    .create_comb(vec![Stmt::assign(x, a), Stmt::assign(x, nx)])
    .unwrap();
  sys.build(m).unwrap();

  let mut sim = Simulator::new();
  sim.initialize(&mut sys);

  sim.put(&mut sys, ea, Bits::from_u64(1, 1));
  assert_eq!(sys.value_u64(x).unwrap(), 0);

  sim.put(&mut sys, ea, Bits::from_u64(0, 1));
  assert_eq!(sys.value_u64(x).unwrap(), 1);
}

/// Re-evaluating a combinational block with unchanged inputs leaves its
/// outputs unchanged.
#[test]
fn reevaluation_with_stable_inputs_is_idempotent() {
  let mut sys = Design::new("stable");
  let m = sys.create_module("m");
  let ea = sys.create_logic("ea", 4);
  let a = sys.add_input(m, "a", ea, 4).unwrap();
  let x = sys.add_output(m, "x", 4).unwrap();
  let nx = sys.create_not(x).unwrap();
  sys
    .create_comb(vec![Stmt::assign(x, a), Stmt::assign(x, nx)])
    .unwrap();
  sys.build(m).unwrap();

  let mut sim = Simulator::new();
  sim.initialize(&mut sys);
  sim.put(&mut sys, ea, Bits::from_u64(0b1010, 4));
  assert_eq!(sys.value_u64(x).unwrap(), 0b0101);
  // Driving the same value again must not disturb anything.
  sim.put(&mut sys, ea, Bits::from_u64(0b1010, 4));
  assert_eq!(sys.value_u64(x).unwrap(), 0b0101);
}

/// Priority if/elseif/else over two inputs:
/// (0,0) -> c=0,d=1; (0,1) -> 1,0; (1,0) -> 1,0; (1,1) -> 0,1.
#[test]
fn priority_if_chain() {
  let mut sys = Design::new("priority");
  let m = sys.create_module("m");
  let ea = sys.create_logic("ea", 1);
  let eb = sys.create_logic("eb", 1);
  let a = sys.add_input(m, "a", ea, 1).unwrap();
  let b = sys.add_input(m, "b", eb, 1).unwrap();
  let c = sys.add_output(m, "c", 1).unwrap();
  let d = sys.add_output(m, "d", 1).unwrap();

  let zero = sys.const_u64(0, 1);
  let one = sys.const_u64(1, 1);
  let nb = sys.create_not(b).unwrap();
  let na = sys.create_not(a).unwrap();
  let only_a = sys.create_and(a, nb).unwrap();
  let only_b = sys.create_and(na, b).unwrap();

  let body = vec![Stmt::cond(
    only_a,
    vec![Stmt::assign(c, one), Stmt::assign(d, zero)],
    vec![Stmt::cond(
      only_b,
      vec![Stmt::assign(c, one), Stmt::assign(d, zero)],
      vec![Stmt::assign(c, zero), Stmt::assign(d, one)],
    )],
  )];
  sys.create_comb(body).unwrap();
  sys.build(m).unwrap();

  let mut sim = Simulator::new();
  sim.initialize(&mut sys);

  let cases = [
    ((0, 0), (0, 1)),
    ((0, 1), (1, 0)),
    ((1, 0), (1, 0)),
    ((1, 1), (0, 1)),
  ];
  for ((va, vb), (vc, vd)) in cases {
    sim.put(&mut sys, ea, Bits::from_u64(va, 1));
    sim.put(&mut sys, eb, Bits::from_u64(vb, 1));
    assert_eq!(sys.value_u64(c).unwrap(), vc, "c for a={} b={}", va, vb);
    assert_eq!(sys.value_u64(d).unwrap(), vd, "d for a={} b={}", va, vb);
  }
}

/// An X condition contaminates every target either branch could write.
#[test]
fn x_condition_poisons_branch_targets() {
  let mut sys = Design::new("xcond");
  let m = sys.create_module("m");
  let ea = sys.create_logic("ea", 1);
  let a = sys.add_input(m, "a", ea, 1).unwrap();
  let c = sys.add_output(m, "c", 1).unwrap();
  let zero = sys.const_u64(0, 1);
  let one = sys.const_u64(1, 1);
  sys
    .create_comb(vec![Stmt::cond(
      a,
      vec![Stmt::assign(c, one)],
      vec![Stmt::assign(c, zero)],
    )])
    .unwrap();
  sys.build(m).unwrap();

  let mut sim = Simulator::new();
  sim.initialize(&mut sys);
  sim.put(&mut sys, ea, Bits::from_u64(1, 1));
  assert_eq!(sys.value_u64(c).unwrap(), 1);
  sim.put(&mut sys, ea, Bits::all_x(1));
  assert!(!sys.value(c).is_fully_defined());
}
