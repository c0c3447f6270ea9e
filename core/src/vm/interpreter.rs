//! Stack-based deterministic interpreter (§4.5 VM; §9 "VM execution" design
//! note: explicit result values at every opcode, main loop as a tagged state
//! machine rather than exception-style control flow).

use crate::primitives::{Hash, I256, U256};
use crate::vm::opcode::{gas_cost, Opcode};
use crate::vm::value::Value;
use crate::worldstate::WorldState;

/// Outcome of a finished (or still-running) interpreter loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VmState {
    Running,
    Halted(Vec<Value>),
    Failed(String),
}

enum StepOutcome {
    Continue,
    Jumped,
    Halted,
}

/// The two execution contexts (§4.5): `Stateless` scripts (unlock scripts)
/// see only the stack; `Stateful` scripts see the contract's own fields and
/// may call other contracts or mint/destroy contract instances.
pub enum Context<'a> {
    Stateless,
    Stateful { world: &'a mut WorldState, contract_id: Hash, approved: Vec<(crate::primitives::Address, U256)> },
}

/// One script's execution: its code, value stack, call stack (for
/// `Call`/`Return`), remaining gas and world-state context.
pub struct Interpreter<'a> {
    code: Vec<Opcode>,
    stack: Vec<Value>,
    call_stack: Vec<usize>,
    pc: usize,
    gas_remaining: u64,
    context: Context<'a>,
}

impl<'a> Interpreter<'a> {
    pub fn new_stateless(code: Vec<Opcode>, gas_limit: u64) -> Self {
        Interpreter { code, stack: Vec::new(), call_stack: Vec::new(), pc: 0, gas_remaining: gas_limit, context: Context::Stateless }
    }

    pub fn new_stateful(code: Vec<Opcode>, gas_limit: u64, world: &'a mut WorldState, contract_id: Hash) -> Self {
        Interpreter {
            code,
            stack: Vec::new(),
            call_stack: Vec::new(),
            pc: 0,
            gas_remaining: gas_limit,
            context: Context::Stateful { world, contract_id, approved: Vec::new() },
        }
    }

    pub fn gas_remaining(&self) -> u64 {
        self.gas_remaining
    }

    /// Runs until `Halted`, `Failed`, or the gas meter is exhausted.
    /// On `Failed`, the caller must discard any staged world-state writes —
    /// the interpreter itself never undoes them (§4.5: caller-owned
    /// `Staging` is the rollback boundary).
    pub fn run(&mut self) -> VmState {
        loop {
            if self.pc >= self.code.len() {
                return VmState::Halted(std::mem::take(&mut self.stack));
            }
            let op = self.code[self.pc].clone();
            let cost = gas_cost(&op);
            if self.gas_remaining < cost {
                return VmState::Failed("out of gas".to_string());
            }
            self.gas_remaining -= cost;
            match self.step(op) {
                Ok(StepOutcome::Continue) => self.pc += 1,
                Ok(StepOutcome::Jumped) => {}
                Ok(StepOutcome::Halted) => return VmState::Halted(std::mem::take(&mut self.stack)),
                Err(reason) => return VmState::Failed(reason),
            }
        }
    }

    fn pop(&mut self) -> Result<Value, String> {
        self.stack.pop().ok_or_else(|| "stack underflow".to_string())
    }

    fn pop_u256(&mut self) -> Result<U256, String> {
        self.pop()?.as_u256().ok_or_else(|| "expected U256".to_string())
    }

    fn pop_i256(&mut self) -> Result<I256, String> {
        self.pop()?.as_i256().ok_or_else(|| "expected I256".to_string())
    }

    fn pop_bool(&mut self) -> Result<bool, String> {
        self.pop()?.as_bool().ok_or_else(|| "expected Bool".to_string())
    }

    fn pop_bytes(&mut self) -> Result<Vec<u8>, String> {
        match self.pop()? {
            Value::ByteVec(b) => Ok(b),
            _ => Err("expected ByteVec".to_string()),
        }
    }

    fn step(&mut self, op: Opcode) -> Result<StepOutcome, String> {
        match op {
            Opcode::PushBool(b) => self.stack.push(Value::Bool(b)),
            Opcode::PushI256(v) => self.stack.push(Value::I256(v)),
            Opcode::PushU256(v) => self.stack.push(Value::U256(v)),
            Opcode::PushByteVec(v) => self.stack.push(Value::ByteVec(v)),
            Opcode::PushAddress(a) => self.stack.push(Value::Address(a)),
            Opcode::Pop => {
                self.pop()?;
            }
            Opcode::Dup => {
                let top = self.stack.last().ok_or("stack underflow")?.clone();
                self.stack.push(top);
            }
            Opcode::Swap => {
                let len = self.stack.len();
                if len < 2 {
                    return Err("stack underflow".to_string());
                }
                self.stack.swap(len - 1, len - 2);
            }
            Opcode::Add => {
                let (b, a) = (self.pop_u256()?, self.pop_u256()?);
                self.stack.push(Value::U256(a.checked_add(b).ok_or("overflow")?));
            }
            Opcode::Sub => {
                let (b, a) = (self.pop_u256()?, self.pop_u256()?);
                self.stack.push(Value::U256(a.checked_sub(b).ok_or("underflow")?));
            }
            Opcode::Mul => {
                let (b, a) = (self.pop_u256()?, self.pop_u256()?);
                self.stack.push(Value::U256(a.checked_mul(b).ok_or("overflow")?));
            }
            Opcode::Div => {
                let (b, a) = (self.pop_u256()?, self.pop_u256()?);
                if b.is_zero() {
                    return Err("division by zero".to_string());
                }
                self.stack.push(Value::U256(a / b));
            }
            Opcode::Mod => {
                let (b, a) = (self.pop_u256()?, self.pop_u256()?);
                if b.is_zero() {
                    return Err("division by zero".to_string());
                }
                self.stack.push(Value::U256(a % b));
            }
            Opcode::AddMod => {
                let (b, a) = (self.pop_u256()?, self.pop_u256()?);
                self.stack.push(Value::U256(a.overflowing_add(b).0));
            }
            Opcode::SubMod => {
                let (b, a) = (self.pop_u256()?, self.pop_u256()?);
                self.stack.push(Value::U256(a.overflowing_sub(b).0));
            }
            Opcode::MulMod => {
                let (b, a) = (self.pop_u256()?, self.pop_u256()?);
                self.stack.push(Value::U256(a.overflowing_mul(b).0));
            }
            Opcode::Shl => {
                let (b, a) = (self.pop_u256()?, self.pop_u256()?);
                self.stack.push(Value::U256(a << b.as_usize().min(255)));
            }
            Opcode::Shr => {
                let (b, a) = (self.pop_u256()?, self.pop_u256()?);
                self.stack.push(Value::U256(a >> b.as_usize().min(255)));
            }
            Opcode::BitAnd => {
                let (b, a) = (self.pop_u256()?, self.pop_u256()?);
                self.stack.push(Value::U256(a & b));
            }
            Opcode::BitXor => {
                let (b, a) = (self.pop_u256()?, self.pop_u256()?);
                self.stack.push(Value::U256(a ^ b));
            }
            Opcode::BitOr => {
                let (b, a) = (self.pop_u256()?, self.pop_u256()?);
                self.stack.push(Value::U256(a | b));
            }
            Opcode::Eq => {
                let (b, a) = (self.pop()?, self.pop()?);
                self.stack.push(Value::Bool(a == b));
            }
            Opcode::Neq => {
                let (b, a) = (self.pop()?, self.pop()?);
                self.stack.push(Value::Bool(a != b));
            }
            Opcode::Lt => {
                let (b, a) = (self.pop_u256()?, self.pop_u256()?);
                self.stack.push(Value::Bool(a < b));
            }
            Opcode::Le => {
                let (b, a) = (self.pop_u256()?, self.pop_u256()?);
                self.stack.push(Value::Bool(a <= b));
            }
            Opcode::Gt => {
                let (b, a) = (self.pop_u256()?, self.pop_u256()?);
                self.stack.push(Value::Bool(a > b));
            }
            Opcode::Ge => {
                let (b, a) = (self.pop_u256()?, self.pop_u256()?);
                self.stack.push(Value::Bool(a >= b));
            }
            Opcode::And => {
                let (b, a) = (self.pop_bool()?, self.pop_bool()?);
                self.stack.push(Value::Bool(a && b));
            }
            Opcode::Or => {
                let (b, a) = (self.pop_bool()?, self.pop_bool()?);
                self.stack.push(Value::Bool(a || b));
            }
            Opcode::Not => {
                let a = self.pop_bool()?;
                self.stack.push(Value::Bool(!a));
            }
            Opcode::Concat => {
                let (b, mut a) = (self.pop_bytes()?, self.pop_bytes()?);
                a.extend(b);
                self.stack.push(Value::ByteVec(a));
            }
            Opcode::Jump(target) => {
                self.pc = target;
                return Ok(StepOutcome::Jumped);
            }
            Opcode::JumpIfFalse(target) => {
                if !self.pop_bool()? {
                    self.pc = target;
                    return Ok(StepOutcome::Jumped);
                }
            }
            Opcode::Call(target) => {
                self.call_stack.push(self.pc + 1);
                self.pc = target;
                return Ok(StepOutcome::Jumped);
            }
            Opcode::Return => match self.call_stack.pop() {
                Some(ret) => {
                    self.pc = ret;
                    return Ok(StepOutcome::Jumped);
                }
                None => return Ok(StepOutcome::Halted),
            },
            Opcode::ContractCall { method_index } => {
                self.require_stateful()?;
                let _ = method_index;
                return Err("cross-contract dispatch requires a code registry, not available in this context".to_string());
            }
            Opcode::CreateContract => {
                self.require_stateful()?;
                return Err("contract creation requires a code registry, not available in this context".to_string());
            }
            Opcode::DestroyContract => {
                let Context::Stateful { world, contract_id, .. } = &mut self.context else {
                    return Err("DestroyContract requires a stateful context".to_string());
                };
                world.destroy_contract(contract_id);
            }
            Opcode::ApproveAsset => {
                let amount = self.pop_u256()?;
                let address_value = self.pop()?;
                let address = match address_value {
                    Value::Address(a) => a,
                    _ => return Err("expected Address".to_string()),
                };
                let Context::Stateful { approved, .. } = &mut self.context else {
                    return Err("ApproveAsset requires a stateful context".to_string());
                };
                approved.push((address, amount));
            }
            Opcode::LoadField(idx) => {
                let Context::Stateful { world, contract_id, .. } = &self.context else {
                    return Err("LoadField requires a stateful context".to_string());
                };
                let state = world.get_contract(contract_id).ok_or("contract not found")?;
                let field = state.fields.get(idx as usize).ok_or("field index out of range")?;
                self.stack.push(Value::I256(*field));
            }
            Opcode::StoreField(idx) => {
                let value = self.pop_i256()?;
                let Context::Stateful { world, contract_id, .. } = &mut self.context else {
                    return Err("StoreField requires a stateful context".to_string());
                };
                let mut state = world.get_contract(contract_id).ok_or("contract not found")?.clone();
                let slot = state.fields.get_mut(idx as usize).ok_or("field index out of range")?;
                *slot = value;
                let contract_id = *contract_id;
                world.put_contract(contract_id, state);
            }
        }
        Ok(StepOutcome::Continue)
    }

    fn require_stateful(&self) -> Result<(), String> {
        match self.context {
            Context::Stateful { .. } => Ok(()),
            Context::Stateless => Err("opcode requires a stateful context".to_string()),
        }
    }
}
