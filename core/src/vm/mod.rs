//! Stack-based deterministic VM (§4.5): typed values, bytecode operands,
//! and the gas-metered interpreter loop.

pub mod interpreter;
pub mod opcode;
pub mod value;

pub use interpreter::{Context, Interpreter, VmState};
pub use opcode::{gas_cost, Opcode};
pub use value::Value;
