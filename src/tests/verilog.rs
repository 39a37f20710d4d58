use crate::backend::verilog;
use crate::builder::Design;
use crate::error::Error;
use crate::ir::module::Attribute;
use crate::ir::node::ModuleNode;
use crate::ir::stmt::{CaseItem, ConditionalKind, Stmt};
use crate::ir::value::Bits;

fn gate_design(name: &str) -> (Design, ModuleNode) {
  let mut sys = Design::new(name);
  let m = sys.create_module("gate");
  let ea = sys.create_logic("ea", 1);
  let eb = sys.create_logic("eb", 1);
  let a = sys.add_input(m, "a", ea, 1).unwrap();
  let b = sys.add_input(m, "b", eb, 1).unwrap();
  let x = sys.add_output(m, "x", 1).unwrap();
  let or = sys.create_or(a, b).unwrap();
  sys.connect(x, or).unwrap();
  sys.build(m).unwrap();
  (sys, m)
}

#[test]
fn emits_ports_and_inlines_single_use_expression() {
  let (sys, m) = gate_design("gate");
  let text = verilog::elaborate(&sys, m).unwrap();
  assert!(text.contains("module gate ("));
  assert!(text.contains("input logic a"));
  assert!(text.contains("output logic x"));
  // The derived OR signal has one reader, so it folds into the assign.
  assert!(text.contains("assign x = (a | b);"));
  assert!(text.contains("endmodule"));
}

#[test]
fn emission_requires_build() {
  let mut sys = Design::new("raw");
  let m = sys.create_module("raw");
  sys.add_output(m, "x", 1).unwrap();
  let err = verilog::elaborate(&sys, m).unwrap_err();
  assert!(matches!(err, Error::NotBuilt { .. }));
}

#[test]
fn emission_is_deterministic() {
  let (sys_a, top_a) = gate_design("gate");
  let (sys_b, top_b) = gate_design("gate");
  assert_eq!(
    verilog::elaborate(&sys_a, top_a).unwrap(),
    verilog::elaborate(&sys_b, top_b).unwrap()
  );
}

#[test]
fn always_blocks_render_with_their_sensitivity() {
  let mut sys = Design::new("blocks");
  let m = sys.create_module("m");
  let eclk = sys.create_logic("eclk", 1);
  let ed = sys.create_logic("ed", 1);
  let clk = sys.add_input(m, "clk", eclk, 1).unwrap();
  let d = sys.add_input(m, "d", ed, 1).unwrap();
  let q = sys.add_output(m, "q", 1).unwrap();
  let c = sys.add_output(m, "c", 1).unwrap();
  sys.create_ff(clk, vec![Stmt::assign(q, d)]).unwrap();
  sys.create_comb(vec![Stmt::assign(c, d)]).unwrap();
  sys.build(m).unwrap();

  let text = verilog::elaborate(&sys, m).unwrap();
  assert!(text.contains("always_ff @(posedge clk) begin"));
  assert!(text.contains("q <= d;"));
  assert!(text.contains("always_comb begin"));
  assert!(text.contains("c = d;"));
}

#[test]
fn case_kinds_and_wildcards_render() {
  let mut sys = Design::new("cases");
  let m = sys.create_module("m");
  let esel = sys.create_logic("esel", 2);
  let sel = sys.add_input(m, "sel", esel, 2).unwrap();
  let out = sys.add_output(m, "o", 1).unwrap();
  let one = sys.const_u64(1, 1);
  let zero = sys.const_u64(0, 1);
  let body = vec![
    Stmt::case(
      sel,
      vec![CaseItem::new(
        Bits::from_u64(1, 2),
        vec![Stmt::assign(out, one)],
      )],
      vec![Stmt::assign(out, zero)],
      ConditionalKind::Unique,
    ),
    Stmt::casez(
      sel,
      vec![CaseItem::new(
        Bits::from_binary_str("z1").unwrap(),
        vec![Stmt::assign(out, one)],
      )],
      vec![],
      ConditionalKind::None,
    ),
  ];
  // Two case statements over one target in a single block: last write wins
  // in simulation, both render.
  sys.create_comb(body).unwrap();
  sys.build(m).unwrap();

  let text = verilog::elaborate(&sys, m).unwrap();
  assert!(text.contains("unique case (sel)"));
  assert!(text.contains("2'd1: begin"));
  assert!(text.contains("default: begin"));
  assert!(text.contains("casez (sel)"));
  assert!(text.contains("2'b?1: begin"));
  assert!(text.contains("endcase"));
}

#[test]
fn ff_double_assign_on_one_path_is_rejected() {
  let mut sys = Design::new("ffpaths");
  let m = sys.create_module("m");
  let eclk = sys.create_logic("eclk", 1);
  let ed = sys.create_logic("ed", 1);
  let clk = sys.add_input(m, "clk", eclk, 1).unwrap();
  let d = sys.add_input(m, "d", ed, 1).unwrap();
  let q = sys.add_output(m, "q", 1).unwrap();
  let nd = sys.create_not(d).unwrap();
  sys
    .create_ff(clk, vec![Stmt::assign(q, d), Stmt::assign(q, nd)])
    .unwrap();
  sys.build(m).unwrap();

  let err = verilog::elaborate(&sys, m).unwrap_err();
  assert!(matches!(err, Error::DriverConflict { .. }));
}

#[test]
fn ff_assigns_in_exclusive_branches_are_legal() {
  let mut sys = Design::new("ffbranches");
  let m = sys.create_module("m");
  let eclk = sys.create_logic("eclk", 1);
  let ea = sys.create_logic("ea", 1);
  let clk = sys.add_input(m, "clk", eclk, 1).unwrap();
  let a = sys.add_input(m, "a", ea, 1).unwrap();
  let q = sys.add_output(m, "q", 1).unwrap();
  let na = sys.create_not(a).unwrap();
  sys
    .create_ff(
      clk,
      vec![Stmt::cond(
        a,
        vec![Stmt::assign(q, a)],
        vec![Stmt::assign(q, na)],
      )],
    )
    .unwrap();
  sys.build(m).unwrap();
  assert!(verilog::elaborate(&sys, m).is_ok());
}

#[test]
fn structurally_identical_instances_share_one_definition() {
  let mut sys = Design::new("dedup");
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

  let text = verilog::elaborate(&sys, top).unwrap();
  assert_eq!(text.matches("module leaf (").count(), 1);
  assert!(!text.contains("module leaf_0"));
  assert_eq!(text.matches("endmodule").count(), 2);
  // Both instances reference the single shared definition.
  assert_eq!(text.matches("  leaf ").count(), 2);
}

#[test]
fn custom_verilog_body_overrides_generated_one() {
  let mut sys = Design::new("custom");
  let (gen, _clk) = sys.create_clock_generator(10).unwrap();
  sys.build(gen).unwrap();
  let text = verilog::elaborate(&sys, gen).unwrap();
  assert!(text.contains("initial begin"));
  assert!(text.contains("forever #5 clk = ~clk;"));

  let gen_ref = gen.as_ref(&sys);
  let attrs = gen_ref.get_attrs();
  assert!(attrs.iter().any(|a| matches!(a, Attribute::CustomVerilog(_))));
}
