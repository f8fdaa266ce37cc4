//! Lowering machinery shared by the statement and expression
//! compilers.
//!
//! Storage is slot-addressed: locals and the two field regions each
//! have their own instruction family. Array accesses reduce to a base
//! slot plus an offset that is either folded to a constant or computed
//! on the stack with a bounds check.

mod calls;
mod expr;
mod stmt;

use ralph_core::{CompileError, Span, Val};
use ralph_parser::ast::Expr;

use crate::fold;
use crate::func_compiler::FuncCompiler;
use crate::instr::Instr;
use crate::types::Type;

/// The token id of the native token: 32 zero bytes.
pub(crate) fn alph_token_id() -> Vec<u8> {
    vec![0u8; 32]
}

/// A slot-addressed storage root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Place {
    /// Local region, at this base slot.
    Local(usize),
    /// Immutable field region, at this base slot.
    ImmField(usize),
    /// Mutable field region, at this base slot.
    MutField(usize),
}

impl Place {
    fn base(self) -> usize {
        match self {
            Place::Local(base) | Place::ImmField(base) | Place::MutField(base) => base,
        }
    }
}

/// An array offset below a [`Place`], accumulated over an index chain.
#[derive(Debug, Clone, Copy)]
pub(crate) struct IndexOffset {
    /// Sum of the folded constant parts.
    pub const_part: usize,
    /// Whether a computed offset sits on the stack.
    pub dynamic: bool,
}

impl<'r, 'ast> FuncCompiler<'r, 'ast> {
    // =========================================
    // Slot access
    // =========================================

    /// Load one scalar slot of a place.
    pub(crate) fn load_slot(&mut self, place: Place, offset: usize) -> Result<(), CompileError> {
        let slot = self.narrow(place.base() + offset)?;
        self.emit(match place {
            Place::Local(_) => Instr::LoadLocal(slot),
            Place::ImmField(_) => Instr::LoadImmField(slot),
            Place::MutField(_) => Instr::LoadMutField(slot),
        });
        Ok(())
    }

    /// Store one scalar slot of a place.
    pub(crate) fn store_slot(&mut self, place: Place, offset: usize) -> Result<(), CompileError> {
        let slot = self.narrow(place.base() + offset)?;
        self.emit(match place {
            Place::Local(_) => Instr::StoreLocal(slot),
            Place::MutField(_) => Instr::StoreMutField(slot),
            Place::ImmField(_) => {
                return Err(CompileError::internal(
                    "store into the immutable field region",
                ));
            }
        });
        Ok(())
    }

    /// Pop `size` values into consecutive slots starting at
    /// `place + offset`, last slot first (matching stack order).
    pub(crate) fn store_slots(
        &mut self,
        place: Place,
        offset: usize,
        size: usize,
    ) -> Result<(), CompileError> {
        for k in (0..size).rev() {
            self.store_slot(place, offset + k)?;
        }
        Ok(())
    }

    /// Push `size` consecutive slots starting at `place + offset`.
    pub(crate) fn load_slots(
        &mut self,
        place: Place,
        offset: usize,
        size: usize,
    ) -> Result<(), CompileError> {
        for k in 0..size {
            self.load_slot(place, offset + k)?;
        }
        Ok(())
    }

    fn load_by_index_instr(place: Place) -> Instr {
        match place {
            Place::Local(_) => Instr::LoadLocalByIndex,
            Place::ImmField(_) => Instr::LoadImmFieldByIndex,
            Place::MutField(_) => Instr::LoadMutFieldByIndex,
        }
    }

    fn store_by_index_instr(place: Place) -> Result<Instr, CompileError> {
        match place {
            Place::Local(_) => Ok(Instr::StoreLocalByIndex),
            Place::MutField(_) => Ok(Instr::StoreMutFieldByIndex),
            Place::ImmField(_) => Err(CompileError::internal(
                "store into the immutable field region",
            )),
        }
    }

    // =========================================
    // Index chains
    // =========================================

    /// Check and lower an index chain over `ty`.
    ///
    /// Constant indices are folded and bounds-checked at compile time.
    /// A variable index emits `<idx>, Dup, U256Const(size), U256Lt,
    /// Assert` and leaves the scaled offset on the stack, accumulating
    /// with any earlier dynamic part via `U256Add`.
    pub(crate) fn compile_indices(
        &mut self,
        mut ty: Type,
        indices: &[&Expr<'ast>],
    ) -> Result<(Type, IndexOffset), CompileError> {
        let mut offset = IndexOffset {
            const_part: 0,
            dynamic: false,
        };
        for &index in indices {
            let span = index.span();
            let (elem, size) = match ty {
                Type::Array(elem, size) => (elem, size),
                other => {
                    return Err(CompileError::type_error(format!(
                        "Cannot index into non-array type {other}"
                    ))
                    .with_span(span));
                }
            };
            let elem_size = elem.flattened_size();
            match fold::fold(index)? {
                Some(Val::U256(value)) => {
                    let constant = Val::U256(value).as_index().ok_or_else(|| {
                        CompileError::type_error(format!("Invalid array index {value}"))
                            .with_span(span)
                    })?;
                    if constant >= size {
                        return Err(CompileError::type_error(format!(
                            "Invalid array index {constant} for array of size {size}"
                        ))
                        .with_span(span));
                    }
                    offset.const_part += constant * elem_size;
                }
                Some(other) => {
                    return Err(CompileError::type_error(format!(
                        "Invalid array index type {}, expected U256",
                        other.type_name()
                    ))
                    .with_span(span));
                }
                None => {
                    let index_ty = self.compile_expr(index)?;
                    let index_ty = self.expect_single(index_ty, span)?;
                    if index_ty != Type::U256 {
                        return Err(CompileError::type_error(format!(
                            "Invalid array index type {index_ty}, expected U256"
                        ))
                        .with_span(span));
                    }
                    self.emit(Instr::Dup);
                    self.emit(Instr::u256_const(ralph_core::U256::from(size)));
                    self.emit(Instr::U256Lt);
                    self.emit(Instr::Assert);
                    if elem_size > 1 {
                        self.emit(Instr::u256_const(ralph_core::U256::from(elem_size)));
                        self.emit(Instr::U256Mul);
                    }
                    if offset.dynamic {
                        self.emit(Instr::U256Add);
                    }
                    offset.dynamic = true;
                }
            }
            ty = *elem;
        }
        Ok((ty, offset))
    }

    /// Load the element selected by an index chain.
    pub(crate) fn load_indexed(
        &mut self,
        place: Place,
        elem_ty: &Type,
        offset: IndexOffset,
        span: Span,
    ) -> Result<(), CompileError> {
        let total = elem_ty.flattened_size();
        if !offset.dynamic {
            return self.load_slots(place, offset.const_part, total);
        }
        let base = place.base() + offset.const_part;
        if total == 1 {
            self.emit(Instr::u256_const(ralph_core::U256::from(base)));
            self.emit(Instr::U256Add);
            self.emit(Self::load_by_index_instr(place));
            return Ok(());
        }
        // A dynamic index selecting a whole sub-array: park the offset
        // in a temporary and load cell by cell.
        let tmp = self.scope.fresh_temp(1, span)?;
        self.emit(Instr::StoreLocal(tmp));
        for k in 0..total {
            self.emit(Instr::LoadLocal(tmp));
            self.emit(Instr::u256_const(ralph_core::U256::from(base + k)));
            self.emit(Instr::U256Add);
            self.emit(Self::load_by_index_instr(place));
        }
        Ok(())
    }

    /// Store the value(s) on the stack into the element selected by an
    /// index chain. The values sit below any dynamic offset.
    pub(crate) fn store_indexed(
        &mut self,
        place: Place,
        elem_ty: &Type,
        offset: IndexOffset,
        span: Span,
    ) -> Result<(), CompileError> {
        let total = elem_ty.flattened_size();
        if !offset.dynamic {
            return self.store_slots(place, offset.const_part, total);
        }
        let base = place.base() + offset.const_part;
        if total == 1 {
            self.emit(Instr::u256_const(ralph_core::U256::from(base)));
            self.emit(Instr::U256Add);
            self.emit(Self::store_by_index_instr(place)?);
            return Ok(());
        }
        let tmp = self.scope.fresh_temp(1, span)?;
        self.emit(Instr::StoreLocal(tmp));
        for k in (0..total).rev() {
            self.emit(Instr::LoadLocal(tmp));
            self.emit(Instr::u256_const(ralph_core::U256::from(base + k)));
            self.emit(Instr::U256Add);
            self.emit(Self::store_by_index_instr(place)?);
        }
        Ok(())
    }

    // =========================================
    // Constants
    // =========================================

    /// Push a compile-time value.
    pub(crate) fn emit_val(&mut self, val: &Val) {
        match val {
            Val::Bool(b) => self.emit(Instr::BoolConst(*b)),
            Val::U256(v) => self.emit(Instr::u256_const(*v)),
            Val::I256(v) => self.emit(Instr::i256_const(*v)),
            Val::ByteVec(bs) => self.emit(Instr::BytesConst(bs.clone())),
            Val::Address(bs) => self.emit(Instr::AddressConst(bs.clone())),
        }
    }
}
