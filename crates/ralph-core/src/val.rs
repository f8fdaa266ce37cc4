//! Compile-time constant values.
//!
//! [`Val`] is the value domain shared by literals, contract constants, enum
//! variants, and the constant folder. 256-bit arithmetic comes from
//! `alloy-primitives`.

use std::fmt;

pub use alloy_primitives::{I256, U256};

/// A compile-time constant value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Val {
    /// A boolean constant.
    Bool(bool),
    /// An unsigned 256-bit integer.
    U256(U256),
    /// A signed 256-bit integer.
    I256(I256),
    /// A byte string (`#…` literal or string contents).
    ByteVec(Vec<u8>),
    /// A decoded address (`@…` literal).
    Address(Vec<u8>),
}

impl Val {
    /// The name of this value's primitive type, as used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Val::Bool(_) => "Bool",
            Val::U256(_) => "U256",
            Val::I256(_) => "I256",
            Val::ByteVec(_) => "ByteVec",
            Val::Address(_) => "Address",
        }
    }

    /// The value as a `U256`, if it is one.
    pub fn as_u256(&self) -> Option<U256> {
        match self {
            Val::U256(v) => Some(*v),
            _ => None,
        }
    }

    /// The value as a `usize`, if it is a `U256` that fits.
    ///
    /// Used for array sizes and constant indices.
    pub fn as_index(&self) -> Option<usize> {
        let v = self.as_u256()?;
        if v > U256::from(usize::MAX) {
            return None;
        }
        Some(v.to::<usize>())
    }
}

impl fmt::Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Val::Bool(b) => write!(f, "{b}"),
            Val::U256(v) => write!(f, "{v}"),
            Val::I256(v) => write!(f, "{v}i"),
            Val::ByteVec(bs) => {
                write!(f, "#")?;
                for b in bs {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
            Val::Address(bs) => {
                write!(f, "@")?;
                for b in bs {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names() {
        assert_eq!(Val::Bool(true).type_name(), "Bool");
        assert_eq!(Val::U256(U256::from(1u64)).type_name(), "U256");
        assert_eq!(Val::I256(I256::ZERO).type_name(), "I256");
        assert_eq!(Val::ByteVec(vec![0xab]).type_name(), "ByteVec");
    }

    #[test]
    fn as_index() {
        assert_eq!(Val::U256(U256::from(7u64)).as_index(), Some(7));
        assert_eq!(Val::Bool(false).as_index(), None);
    }

    #[test]
    fn display_bytevec() {
        assert_eq!(format!("{}", Val::ByteVec(vec![0xde, 0xad])), "#dead");
    }
}
