use thiserror::Error;

/// Errors surfaced at the boundary of the user-facing operation that caused
/// them. Construction and emission do not recover locally; the failed call
/// leaves the design untouched except where noted on the operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
  #[error("signal {signal} already has a driver ({path})")]
  DriverConflict { signal: String, path: String },

  #[error("tracing {path} reached {signal} with disallowed port polarity")]
  PortViolation { signal: String, path: String },

  #[error("{context}: expected width {expected}, got {actual}")]
  WidthMismatch {
    context: String,
    expected: usize,
    actual: usize,
  },

  #[error("'{name}' is not a legal SystemVerilog identifier")]
  InvalidIdentifier { name: String },

  #[error("module {module} already has a port named {name}")]
  DuplicatePort { module: String, name: String },

  #[error("module {module} has already been built")]
  AlreadyBuilt { module: String },

  #[error("module {module} has not been built yet")]
  NotBuilt { module: String },

  #[error("value {value} contains X or Z bits")]
  XZPropagation { value: String },

  #[error("interface port {port} is tagged as both input and output")]
  AmbiguousDirection { interface: String, port: String },
}

pub type Result<T> = std::result::Result<T, Error>;
