use weft::builder::verify;
use weft::ir::node::Parented;
use weft::{Design, Simulator};

/// A three-level containment tree discovered purely by tracing: the top
/// module never names its children.
///
/// `inner_module2` drives `z = 1`; `inner_module1` passes it through to `y`
/// and also exposes `m = 0`; the top computes `x = y | m`.
fn build_tree(sys: &mut Design) -> (weft::ir::node::ModuleNode, weft::ir::node::LogicNode) {
  let inner2 = sys.create_module("inner_module2");
  let z = sys.add_output(inner2, "z", 1).unwrap();
  let one = sys.const_u64(1, 1);
  sys.connect(z, one).unwrap();

  let inner1 = sys.create_module("inner_module1");
  let m = sys.add_output(inner1, "m", 1).unwrap();
  let zero = sys.const_u64(0, 1);
  sys.connect(m, zero).unwrap();
  let y = sys.add_output(inner1, "y", 1).unwrap();
  let pass = sys.create_logic("pass", 1);
  sys.connect(pass, z).unwrap();
  sys.connect(y, pass).unwrap();

  let top = sys.create_module("top_module");
  let x = sys.add_output(top, "x", 1).unwrap();
  let or = sys.create_or(y, m).unwrap();
  sys.connect(x, or).unwrap();

  sys.build(top).unwrap();
  (top, x)
}

#[test]
fn or_of_nested_outputs_is_one() {
  let mut sys = Design::new("hier");
  let (top, x) = build_tree(&mut sys);
  verify(&sys);

  eprintln!("{}", sys);

  let mut sim = Simulator::new();
  sim.initialize(&mut sys);
  assert_eq!(sys.value_u64(x).unwrap(), 1);

  // Containment: top{ inner_module1{ inner_module2 } }.
  let top_ref = top.as_ref(&sys);
  assert_eq!(top_ref.submodule_iter().count(), 1);
  let inner1 = top_ref.submodule_iter().next().unwrap();
  assert_eq!(inner1.get_name(), "inner_module1");
  assert_eq!(inner1.submodule_iter().count(), 1);
  let inner2 = inner1.submodule_iter().next().unwrap();
  assert_eq!(inner2.get_name(), "inner_module2");
  assert_eq!(inner2.hierarchical_path().unwrap(), "top_module.inner_module1.inner_module2");
  assert_eq!(inner2.get().get_parent(), Some(inner1.upcast()));

  // The passthrough wire was claimed by inner_module1, not the top.
  assert!(inner1.internal_iter().any(|sig| sig.get_name() == Some("pass")));
}

#[test]
fn repeated_construction_builds_identical_hierarchy_and_text() {
  let mut sys_a = Design::new("hier");
  let (top_a, _) = build_tree(&mut sys_a);
  let mut sys_b = Design::new("hier");
  let (top_b, _) = build_tree(&mut sys_b);

  let text_a = weft::backend::verilog::elaborate(&sys_a, top_a).unwrap();
  let text_b = weft::backend::verilog::elaborate(&sys_b, top_b).unwrap();
  assert_eq!(text_a, text_b);

  assert!(text_a.contains("module top_module ("));
  assert!(text_a.contains("module inner_module1 ("));
  assert!(text_a.contains("module inner_module2 ("));
}
