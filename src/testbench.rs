use std::collections::HashMap;

use crate::builder::Design;
use crate::error::Result;
use crate::ir::node::{LogicNode, ModuleNode, NodeKind};
use crate::ir::value::Bits;
use crate::sim::Simulator;

/// A stimulus or expectation value in a test vector.
#[derive(Clone, Debug)]
pub enum VectorValue {
  /// Zero-extended to the declared port width.
  Int(u64),
  Bits(Bits),
  /// The don't-care sentinel: matches any four-state value.
  DontCare,
}

/// One co-simulation step: inputs to apply, then expected outputs after one
/// clock period elapses.
#[derive(Clone, Default)]
pub struct Vector {
  pub inputs: Vec<(String, VectorValue)>,
  pub expected: Vec<(String, VectorValue)>,
}

impl Vector {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_input(mut self, name: &str, value: u64) -> Self {
    self.inputs.push((name.to_string(), VectorValue::Int(value)));
    self
  }

  pub fn expecting(mut self, name: &str, value: u64) -> Self {
    self.expected.push((name.to_string(), VectorValue::Int(value)));
    self
  }

  pub fn expecting_any(mut self, name: &str) -> Self {
    self.expected.push((name.to_string(), VectorValue::DontCare));
    self
  }
}

/// The reference-simulator side of the co-simulation contract. An
/// implementation consumes the generated HDL text, the top module type
/// label, the vectors, and the port width map, and reports the observed
/// outputs per vector.
pub trait ReferenceSimulator {
  fn run(
    &mut self,
    sv_text: &str,
    top: &str,
    vectors: &[Vector],
    widths: &HashMap<String, usize>,
  ) -> Result<Vec<HashMap<String, Bits>>>;
}

/// Apply each vector to the in-memory simulator and panic on the first
/// expectation mismatch. One clock period elapses per vector.
pub fn run_vectors(
  sys: &mut Design,
  sim: &mut Simulator,
  top: ModuleNode,
  period: u64,
  vectors: &[Vector],
) -> Result<()> {
  let observed = run_collect(sys, sim, top, period, vectors)?;
  for (i, (vector, outputs)) in vectors.iter().zip(observed.iter()).enumerate() {
    for (name, expected) in &vector.expected {
      let actual = outputs
        .get(name)
        .unwrap_or_else(|| panic!("vector {}: no output named {}", i, name));
      assert!(
        matches(expected, actual),
        "vector {}: output {} is {}, expected {:?}",
        i,
        name,
        actual,
        expected
      );
    }
  }
  Ok(())
}

/// Run the vectors and collect every declared output's observed value,
/// without judging them.
pub fn run_collect(
  sys: &mut Design,
  sim: &mut Simulator,
  top: ModuleNode,
  period: u64,
  vectors: &[Vector],
) -> Result<Vec<HashMap<String, Bits>>> {
  sim.initialize(sys);
  let mut res = Vec::with_capacity(vectors.len());
  for (i, vector) in vectors.iter().enumerate() {
    for (name, value) in &vector.inputs {
      let port = top
        .as_ref(sys)
        .get_input(name)
        .unwrap_or_else(|| panic!("vector {}: no input named {}", i, name));
      let target = drive_target(sys, port.into());
      let width = target.as_ref(sys).get_width();
      let bits = match value {
        VectorValue::Int(v) => Bits::from_u64(*v, width),
        VectorValue::Bits(b) => b.resize(width),
        VectorValue::DontCare => Bits::all_x(width),
      };
      sim.put(sys, target, bits);
    }
    let deadline = sim.now() + period;
    sim.run_until(sys, deadline);

    let mut outputs = HashMap::new();
    let top_ref = top.as_ref(sys);
    for (name, port) in top_ref.output_iter() {
      outputs.insert(name.clone(), port.get_value().clone());
    }
    res.push(outputs);
  }
  Ok(res)
}

/// Cross-check the in-memory simulator against a reference simulator: both
/// must match the expectations, and each other, bit-exact.
pub fn cross_check(
  sys: &mut Design,
  sim: &mut Simulator,
  top: ModuleNode,
  period: u64,
  vectors: &[Vector],
  reference: &mut dyn ReferenceSimulator,
) -> Result<()> {
  let observed = run_collect(sys, sim, top, period, vectors)?;

  let sv_text = crate::backend::verilog::elaborate(sys, top)?;
  let top_name = top.as_ref(sys).get_name().to_string();
  let widths: HashMap<String, usize> = {
    let top_ref = top.as_ref(sys);
    top_ref
      .input_iter()
      .chain(top_ref.output_iter())
      .map(|(name, port)| (name.clone(), port.get_width()))
      .collect()
  };
  let reference_out = reference.run(&sv_text, &top_name, vectors, &widths)?;
  assert_eq!(
    observed.len(),
    reference_out.len(),
    "reference simulator returned {} vectors, expected {}",
    reference_out.len(),
    observed.len()
  );

  for (i, vector) in vectors.iter().enumerate() {
    for (name, expected) in &vector.expected {
      let ours = &observed[i][name];
      let theirs = reference_out[i]
        .get(name)
        .unwrap_or_else(|| panic!("vector {}: reference lacks output {}", i, name));
      assert_eq!(
        ours, theirs,
        "vector {}: simulators disagree on {} ({} vs {})",
        i, name, ours, theirs
      );
      assert!(
        matches(expected, ours),
        "vector {}: output {} is {}, expected {:?}",
        i,
        name,
        ours,
        expected
      );
    }
  }
  Ok(())
}

/// Inputs are driven through the loose signal feeding the port, so the
/// stimulus flows the same path user wiring does.
fn drive_target(sys: &Design, port: LogicNode) -> LogicNode {
  match port.as_ref(sys).get_source() {
    Some(src) if src.get_kind() == NodeKind::Logic => src.into(),
    _ => port,
  }
}

fn matches(expected: &VectorValue, actual: &Bits) -> bool {
  match expected {
    VectorValue::DontCare => true,
    VectorValue::Int(v) => *actual == Bits::from_u64(*v, actual.width()),
    VectorValue::Bits(b) => *actual == b.resize(actual.width()),
  }
}
