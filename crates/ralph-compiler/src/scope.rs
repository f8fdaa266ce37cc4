//! Function-local scope and slot allocation.
//!
//! Locals are numbered argument slots first, then let-bindings in
//! source order. Arrays expand to contiguous scalar slots whose first
//! index names the whole array. Synthesized temporaries (for
//! array-valued sub-expressions and dynamic indices) are allocated
//! like ordinary locals but are invisible to name lookup.

use rustc_hash::FxHashMap;

use ralph_core::{CompileError, Span};

use crate::types::Type;

/// One named local variable.
#[derive(Debug, Clone)]
pub struct LocalVar<'ast> {
    pub name: &'ast str,
    pub ty: Type,
    pub mutable: bool,
    /// `@unused` annotation; suppresses the unused warning.
    pub unused_anno: bool,
    /// First scalar slot.
    pub base: u8,
    pub is_arg: bool,
    /// Assigned after its binding (for `let mut` diagnostics).
    pub assigned: bool,
    pub used: bool,
    pub span: Span,
}

/// The locals of one function being compiled.
#[derive(Debug, Default)]
pub struct FunctionScope<'ast> {
    vars: Vec<LocalVar<'ast>>,
    by_name: FxHashMap<&'ast str, usize>,
    next_slot: usize,
    /// Number of argument scalar slots.
    args_length: usize,
}

/// Slot numbering is a single byte in the method header.
const MAX_LOCALS: usize = 255;

impl<'ast> FunctionScope<'ast> {
    /// Create an empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a named local. Returns its base slot.
    pub fn declare(
        &mut self,
        name: &'ast str,
        ty: Type,
        mutable: bool,
        unused_anno: bool,
        is_arg: bool,
        span: Span,
    ) -> Result<u8, CompileError> {
        if self.by_name.contains_key(name) {
            return Err(CompileError::name(format!(
                "Local variable \"{name}\" is declared multiple times"
            ))
            .with_span(span));
        }
        let base = self.allocate(ty.flattened_size(), span)?;
        if is_arg {
            self.args_length = self.next_slot;
        }
        self.by_name.insert(name, self.vars.len());
        self.vars.push(LocalVar {
            name,
            ty,
            mutable,
            unused_anno,
            base,
            is_arg,
            assigned: false,
            used: false,
            span,
        });
        Ok(base)
    }

    /// Allocate an anonymous temporary of the given slot count.
    pub fn fresh_temp(&mut self, slots: usize, span: Span) -> Result<u8, CompileError> {
        self.allocate(slots, span)
    }

    fn allocate(&mut self, slots: usize, span: Span) -> Result<u8, CompileError> {
        let base = self.next_slot;
        self.next_slot += slots;
        if self.next_slot > MAX_LOCALS {
            return Err(CompileError::internal(format!(
                "Too many local slots (max {MAX_LOCALS})"
            ))
            .with_span(span));
        }
        Ok(base as u8)
    }

    /// Look up a local by name.
    pub fn lookup(&mut self, name: &str) -> Option<&mut LocalVar<'ast>> {
        let index = *self.by_name.get(name)?;
        Some(&mut self.vars[index])
    }

    /// Whether a local with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Total scalar slots, arguments included.
    pub fn locals_length(&self) -> usize {
        self.next_slot
    }

    /// Argument scalar slots.
    pub fn args_length(&self) -> usize {
        self.args_length
    }

    /// All named locals, in slot order.
    pub fn vars(&self) -> &[LocalVar<'ast>] {
        &self.vars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_sequential_and_arrays_expand() {
        let mut scope = FunctionScope::new();
        let a = scope
            .declare("a", Type::U256, false, false, true, Span::default())
            .unwrap();
        let grid = scope
            .declare(
                "grid",
                Type::Array(Box::new(Type::U256), 3),
                true,
                false,
                true,
                Span::default(),
            )
            .unwrap();
        let b = scope
            .declare("b", Type::Bool, false, false, false, Span::default())
            .unwrap();
        assert_eq!((a, grid, b), (0, 1, 4));
        assert_eq!(scope.args_length(), 4);
        assert_eq!(scope.locals_length(), 5);
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut scope = FunctionScope::new();
        scope
            .declare("x", Type::U256, false, false, false, Span::default())
            .unwrap();
        assert!(scope
            .declare("x", Type::U256, false, false, false, Span::default())
            .is_err());
    }

    #[test]
    fn temps_are_anonymous() {
        let mut scope = FunctionScope::new();
        let t = scope.fresh_temp(2, Span::default()).unwrap();
        assert_eq!(t, 0);
        assert_eq!(scope.locals_length(), 2);
        assert!(scope.vars().is_empty());
    }
}
