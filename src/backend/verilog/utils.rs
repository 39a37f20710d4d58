use crate::ir::value::{Bit, Bits};

pub use crate::builder::namify;

/// Render a constant as a sized SystemVerilog literal. Fully defined values
/// print in decimal; anything carrying X or Z falls back to binary.
pub(super) fn literal(value: &Bits) -> String {
  match value.to_big() {
    Ok(v) => format!("{}'d{}", value.width(), v),
    Err(_) => {
      let body: String = (0..value.width())
        .rev()
        .map(|i| match value.get(i) {
          Bit::Zero => '0',
          Bit::One => '1',
          Bit::X => 'x',
          Bit::Z => 'z',
        })
        .collect();
      format!("{}'b{}", value.width(), body)
    }
  }
}

/// Render a casez pattern: Z bits become `?` wildcards.
pub(super) fn casez_pattern(value: &Bits) -> String {
  let body: String = (0..value.width())
    .rev()
    .map(|i| match value.get(i) {
      Bit::Zero => '0',
      Bit::One => '1',
      Bit::X => 'x',
      Bit::Z => '?',
    })
    .collect();
  format!("{}'b{}", value.width(), body)
}

/// A signal declaration body: the packed range is omitted at width one.
pub(super) fn decl(width: usize, name: &str) -> String {
  if width == 1 {
    format!("logic {}", name)
  } else {
    format!("logic [{}:0] {}", width - 1, name)
  }
}
