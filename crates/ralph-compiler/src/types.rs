//! Semantic types.
//!
//! The checker works over resolved [`Type`]s rather than syntactic type
//! expressions. Multi-value signatures (parameter and return lists) are
//! plain `Vec<Type>` and are rendered as `List(…)` in diagnostics.

use std::fmt;

use ralph_core::Val;

/// A resolved Ralph type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// Boolean.
    Bool,
    /// Unsigned 256-bit integer.
    U256,
    /// Signed 256-bit integer.
    I256,
    /// Byte string.
    ByteVec,
    /// Address.
    Address,
    /// Fixed-size array.
    Array(Box<Type>, usize),
    /// Reference to a contract or interface, held as its id.
    Contract(String),
}

impl Type {
    /// Resolve a primitive type name.
    pub fn primitive(name: &str) -> Option<Type> {
        Some(match name {
            "Bool" => Type::Bool,
            "U256" => Type::U256,
            "I256" => Type::I256,
            "ByteVec" => Type::ByteVec,
            "Address" => Type::Address,
            _ => return None,
        })
    }

    /// The type of a compile-time value.
    pub fn of_val(val: &Val) -> Type {
        match val {
            Val::Bool(_) => Type::Bool,
            Val::U256(_) => Type::U256,
            Val::I256(_) => Type::I256,
            Val::ByteVec(_) => Type::ByteVec,
            Val::Address(_) => Type::Address,
        }
    }

    /// Number of scalar slots this type occupies once flattened.
    ///
    /// Arrays expand to consecutive scalar slots in row-major order;
    /// everything else is a single slot.
    pub fn flattened_size(&self) -> usize {
        match self {
            Type::Array(elem, size) => elem.flattened_size() * size,
            _ => 1,
        }
    }

    /// Whether this is a single-slot type.
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Type::Array(..))
    }

    /// Whether this type supports arithmetic (`U256` or `I256`).
    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::U256 | Type::I256)
    }

    /// A 1-byte code for primitive types, used in template-variable
    /// encoding. Arrays and contract references have no code.
    pub fn primitive_code(&self) -> Option<u8> {
        Some(match self {
            Type::Bool => 0,
            Type::U256 => 1,
            Type::I256 => 2,
            Type::ByteVec => 3,
            Type::Address => 4,
            _ => return None,
        })
    }

    /// Inverse of [`primitive_code`](Self::primitive_code).
    pub fn from_primitive_code(code: u8) -> Option<Type> {
        Some(match code {
            0 => Type::Bool,
            1 => Type::U256,
            2 => Type::I256,
            3 => Type::ByteVec,
            4 => Type::Address,
            _ => return None,
        })
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => write!(f, "Bool"),
            Type::U256 => write!(f, "U256"),
            Type::I256 => write!(f, "I256"),
            Type::ByteVec => write!(f, "ByteVec"),
            Type::Address => write!(f, "Address"),
            Type::Array(elem, size) => write!(f, "[{elem}; {size}]"),
            Type::Contract(name) => write!(f, "{name}"),
        }
    }
}

/// Render a type list the way diagnostics expect: `List(U256, Bool)`.
pub fn format_type_list(types: &[Type]) -> String {
    let mut out = String::from("List(");
    for (i, ty) in types.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&ty.to_string());
    }
    out.push(')');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattened_sizes() {
        assert_eq!(Type::U256.flattened_size(), 1);
        assert_eq!(Type::Contract("Foo".into()).flattened_size(), 1);
        let grid = Type::Array(Box::new(Type::Array(Box::new(Type::U256), 3)), 2);
        assert_eq!(grid.flattened_size(), 6);
    }

    #[test]
    fn display() {
        let arr = Type::Array(Box::new(Type::Bool), 4);
        assert_eq!(arr.to_string(), "[Bool; 4]");
        assert_eq!(Type::Contract("Swap".into()).to_string(), "Swap");
    }

    #[test]
    fn type_list_rendering() {
        assert_eq!(format_type_list(&[]), "List()");
        assert_eq!(
            format_type_list(&[Type::U256, Type::Bool]),
            "List(U256, Bool)"
        );
    }

    #[test]
    fn primitive_codes_round_trip() {
        for ty in [Type::Bool, Type::U256, Type::I256, Type::ByteVec, Type::Address] {
            let code = ty.primitive_code().unwrap();
            assert_eq!(Type::from_primitive_code(code), Some(ty));
        }
        assert_eq!(Type::Array(Box::new(Type::U256), 2).primitive_code(), None);
    }
}
