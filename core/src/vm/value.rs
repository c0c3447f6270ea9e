//! The VM's typed stack value (§4.5 VM: `{Bool, I256, U256, ByteVec, Address}`).

use crate::primitives::{Address, I256, U256};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    I256(I256),
    U256(U256),
    ByteVec(Vec<u8>),
    Address(Address),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "Bool",
            Value::I256(_) => "I256",
            Value::U256(_) => "U256",
            Value::ByteVec(_) => "ByteVec",
            Value::Address(_) => "Address",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_u256(&self) -> Option<U256> {
        match self {
            Value::U256(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i256(&self) -> Option<I256> {
        match self {
            Value::I256(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::ByteVec(v) => Some(v),
            _ => None,
        }
    }
}
