//! Collected, non-fatal diagnostics.
//!
//! Warnings are accumulated across the whole compilation unit and returned
//! alongside successful output. They never change the emitted bytecode.

use std::fmt;

/// A non-fatal diagnostic, prefixed with the contract or function it
/// originates from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// Contract or `Contract.function` identity the warning belongs to.
    pub origin: String,
    /// Human-readable message.
    pub message: String,
}

impl Warning {
    /// Create a new warning.
    pub fn new(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.origin, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_display() {
        let w = Warning::new("Foo.bar", "Found unused variables: x");
        assert_eq!(format!("{w}"), "Foo.bar: Found unused variables: x");
    }
}
