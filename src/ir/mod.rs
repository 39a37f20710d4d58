pub mod block;
pub mod expr;
pub mod ir_printer;
pub mod module;
pub mod node;
pub mod signal;
pub mod stmt;
pub mod value;
pub mod visitor;

pub use block::{Always, Sensitivity};
pub use expr::{Binary, Compare, Expr, Opcode, Unary};
pub use module::{Attribute, Module};
pub use node::{BaseNode, Element, NodeKind};
pub use signal::{Const, Logic};
pub use stmt::{CaseItem, CaseStmt, ConditionalKind, Stmt};
pub use value::{Bit, Bits};
