//! Bytecode operand set (§4.5 VM). Control flow is lowered to absolute jumps
//! by the compiler that isn't in scope here; the interpreter only executes
//! already-lowered code.

use crate::primitives::{Address, I256, U256};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Opcode {
    PushBool(bool),
    PushI256(I256),
    PushU256(U256),
    PushByteVec(Vec<u8>),
    PushAddress(Address),
    Pop,
    Dup,
    Swap,

    Add,
    Sub,
    Mul,
    Div,
    Mod,
    /// Modular add/sub/mul (`⊕ ⊖ ⊗`): wrap within `U256`'s range instead of
    /// aborting on overflow.
    AddMod,
    SubMod,
    MulMod,

    Shl,
    Shr,
    BitAnd,
    BitXor,
    BitOr,

    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,

    And,
    Or,
    Not,

    /// Byte-vec concatenation (`++`).
    Concat,

    Jump(usize),
    JumpIfFalse(usize),
    /// In-contract function call: pushes the return address, jumps to
    /// `target`.
    Call(usize),
    Return,

    /// Cross-context contract method invocation. `method_index` selects
    /// which entry of the callee's code table runs; arguments are already
    /// on the stack.
    ContractCall { method_index: u32 },

    /// Allocates a contract (hash of creating tx + output index is computed
    /// by the caller and pushed as a `ByteVec` argument before this runs).
    CreateContract,
    DestroyContract,

    /// Approves the top-of-stack `(Address, U256)` pair for use by a
    /// subsequent `ContractCall` (§4.5 Asset approval).
    ApproveAsset,

    LoadField(u16),
    StoreField(u16),
}

/// Fixed per-opcode gas cost (§4.5: "every opcode charges a fixed cost").
pub fn gas_cost(op: &Opcode) -> u64 {
    match op {
        Opcode::PushBool(_) | Opcode::PushI256(_) | Opcode::PushU256(_) | Opcode::PushAddress(_) => 2,
        Opcode::PushByteVec(bytes) => 2 + bytes.len() as u64,
        Opcode::Pop | Opcode::Dup | Opcode::Swap => 1,
        Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Mod => 3,
        Opcode::AddMod | Opcode::SubMod | Opcode::MulMod => 4,
        Opcode::Shl | Opcode::Shr | Opcode::BitAnd | Opcode::BitXor | Opcode::BitOr => 3,
        Opcode::Eq | Opcode::Neq | Opcode::Lt | Opcode::Le | Opcode::Gt | Opcode::Ge => 3,
        Opcode::And | Opcode::Or | Opcode::Not => 2,
        Opcode::Concat => 5,
        Opcode::Jump(_) | Opcode::JumpIfFalse(_) => 2,
        Opcode::Call(_) | Opcode::Return => 4,
        Opcode::ContractCall { .. } => 20,
        Opcode::CreateContract => 200,
        Opcode::DestroyContract => 50,
        Opcode::ApproveAsset => 10,
        Opcode::LoadField(_) | Opcode::StoreField(_) => 5,
    }
}
