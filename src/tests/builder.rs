use crate::builder::{verify, Design, Interface};
use crate::error::Error;
use crate::ir::node::Parented;
use crate::ir::stmt::Stmt;

#[test]
fn driver_conflict_on_second_source() {
  let mut sys = Design::new("conflict");
  let a = sys.create_logic("a", 1);
  let b = sys.create_logic("b", 1);
  let c = sys.create_logic("c", 1);
  sys.connect(c, a).unwrap();
  let err = sys.connect(c, b).unwrap_err();
  assert!(matches!(err, Error::DriverConflict { .. }));
}

#[test]
fn width_mismatch_on_input() {
  let mut sys = Design::new("widths");
  let m = sys.create_module("m");
  let narrow = sys.create_logic("narrow", 4);
  let err = sys.add_input(m, "a", narrow, 8).unwrap_err();
  assert!(matches!(
    err,
    Error::WidthMismatch {
      expected: 8,
      actual: 4,
      ..
    }
  ));
}

#[test]
fn duplicate_port_name() {
  let mut sys = Design::new("dup");
  let m = sys.create_module("m");
  sys.add_output(m, "x", 1).unwrap();
  let err = sys.add_output(m, "x", 1).unwrap_err();
  assert!(matches!(err, Error::DuplicatePort { .. }));
}

#[test]
fn invalid_port_identifier() {
  let mut sys = Design::new("ident");
  let m = sys.create_module("m");
  for bad in ["1st", "a-b", "", "a b"] {
    let err = sys.add_output(m, bad, 1).unwrap_err();
    assert!(matches!(err, Error::InvalidIdentifier { .. }), "{:?}", bad);
  }
  sys.add_output(m, "_ok_1", 1).unwrap();
}

#[test]
fn build_twice_fails() {
  let mut sys = Design::new("twice");
  let m = sys.create_module("m");
  sys.add_output(m, "x", 1).unwrap();
  sys.build(m).unwrap();
  let err = sys.build(m).unwrap_err();
  assert!(matches!(err, Error::AlreadyBuilt { .. }));
}

#[test]
fn instance_name_requires_build() {
  let mut sys = Design::new("notbuilt");
  let m = sys.create_module("m");
  let err = m.as_ref(&sys).get_instance_name().unwrap_err();
  assert!(matches!(err, Error::NotBuilt { .. }));
  sys.build(m).unwrap();
  assert_eq!(m.as_ref(&sys).get_instance_name().unwrap(), "m");
}

#[test]
fn trace_claims_internals_and_adopts_submodules() {
  let mut sys = Design::new("adopt");

  let inner = sys.create_module("inner");
  let ext = sys.create_logic("ext", 1);
  let a = sys.add_input(inner, "a", ext, 1).unwrap();
  let y = sys.add_output(inner, "y", 1).unwrap();
  let inverted = sys.create_not(a).unwrap();
  sys.connect(y, inverted).unwrap();

  let outer = sys.create_module("outer");
  let outer_in = sys.create_logic("outer_ext", 1);
  let oa = sys.add_input(outer, "a", outer_in, 1).unwrap();
  sys.connect(ext, oa).unwrap();
  let ox = sys.add_output(outer, "x", 1).unwrap();
  sys.connect(ox, y).unwrap();

  sys.build(outer).unwrap();
  verify(&sys);

  let outer_ref = outer.as_ref(&sys);
  assert!(outer_ref.has_built());
  assert_eq!(outer_ref.submodule_iter().count(), 1);
  let inner_ref = inner.as_ref(&sys);
  assert_eq!(inner_ref.get().get_parent(), Some(outer.upcast()));
  assert_eq!(inner_ref.get_instance_name().unwrap(), "inner");
  assert_eq!(inner_ref.hierarchical_path().unwrap(), "outer.inner");
  // The derived inverter output was claimed inside `inner`.
  assert!(inner_ref.internal_iter().any(|sig| sig.is_unpreferred()));
}

#[test]
fn sibling_instances_get_unique_names() {
  let mut sys = Design::new("siblings");
  let top = sys.create_module("top");
  let x = sys.add_output(top, "x", 1).unwrap();

  let mut outs = Vec::new();
  for _ in 0..2 {
    let leaf = sys.create_module("leaf");
    let o = sys.add_output(leaf, "o", 1).unwrap();
    let c = sys.const_u64(1, 1);
    sys.connect(o, c).unwrap();
    outs.push(o);
  }
  let or = sys.create_or(outs[0], outs[1]).unwrap();
  sys.connect(x, or).unwrap();

  sys.build(top).unwrap();
  verify(&sys);

  let names: Vec<String> = top
    .as_ref(&sys)
    .submodule_iter()
    .map(|m| m.get_instance_name().unwrap().to_string())
    .collect();
  assert_eq!(names.len(), 2);
  assert_ne!(names[0], names[1]);
}

#[test]
fn comb_targets_conflict_with_existing_driver() {
  let mut sys = Design::new("combconflict");
  let a = sys.create_logic("a", 1);
  let x = sys.create_logic("x", 1);
  sys.connect(x, a).unwrap();
  let err = sys.create_comb(vec![Stmt::assign(x, a)]).unwrap_err();
  assert!(matches!(err, Error::DriverConflict { .. }));
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum Tag {
  Inward,
  Outward,
  Both,
}

#[test]
fn interface_ambiguous_direction() {
  let mut sys = Design::new("intf");
  let mut outside = Interface::new("bus");
  outside.add_port(&mut sys, "a", 1, &[Tag::Both]);
  let m = sys.create_module("m");
  let mut view = outside.view();
  let err = view
    .connect_io(&mut sys, m, &outside, &[Tag::Inward, Tag::Both], &[Tag::Outward, Tag::Both])
    .unwrap_err();
  assert!(matches!(err, Error::AmbiguousDirection { .. }));
}

#[test]
fn interface_wires_both_directions() {
  let mut sys = Design::new("intfio");
  let mut outside = Interface::new("bus");
  outside.add_port(&mut sys, "req", 4, &[Tag::Inward]);
  outside.add_port(&mut sys, "ack", 4, &[Tag::Outward]);
  outside.add_port(&mut sys, "ignored", 1, &[]);

  let m = sys.create_module("m");
  let mut view = outside.view();
  view
    .connect_io(&mut sys, m, &outside, &[Tag::Inward], &[Tag::Outward])
    .unwrap();

  let req = view.signal("req").unwrap();
  let ack = view.signal("ack").unwrap();
  assert!(req.as_ref(&sys).is_input());
  assert!(ack.as_ref(&sys).is_output());
  // The untagged port never became a module port.
  assert!(m.as_ref(&sys).get_input("ignored").is_none());
  assert!(m.as_ref(&sys).get_output("ignored").is_none());

  sys.connect(ack, req).unwrap();
  sys.build(m).unwrap();
  verify(&sys);
}
