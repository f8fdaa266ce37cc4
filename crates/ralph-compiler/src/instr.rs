//! The instruction set emitted by the code generator.
//!
//! Each instruction has a fixed opcode byte; operands are encoded
//! inline (a 1-byte index, a signed 16-bit offset, or a length-prefixed
//! byte string). The numbering is stable: it is part of the emitted
//! bytecode format and identical for debug and production builds.

use thiserror::Error;

use ralph_core::{I256, U256};

/// Bytecode failed to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("truncated or invalid bytecode at offset {0}")]
pub struct DecodeError(pub usize);

/// A single VM instruction.
///
/// Jump offsets are signed and relative to the *next* instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instr {
    // =====================================================================
    // Constants
    // =====================================================================
    /// Push the `U256` value 0.
    U256Const0,
    /// Push the `U256` value 1.
    U256Const1,
    /// Push the `U256` value 2.
    U256Const2,
    /// Push the `U256` value 3.
    U256Const3,
    /// Push the `U256` value 4.
    U256Const4,
    /// Push the `U256` value 5.
    U256Const5,
    /// Push an arbitrary `U256` constant.
    U256Const(U256),
    /// Push the `I256` value 0.
    I256Const0,
    /// Push the `I256` value -1.
    I256ConstN1,
    /// Push an arbitrary `I256` constant.
    I256Const(I256),
    /// Push a boolean constant.
    BoolConst(bool),
    /// Push a byte-string constant.
    BytesConst(Vec<u8>),
    /// Push an address constant.
    AddressConst(Vec<u8>),

    // =====================================================================
    // Control flow
    // =====================================================================
    /// Unconditional relative jump.
    Jump(i16),
    /// Pop a `Bool`; jump when true.
    IfTrue(i16),
    /// Pop a `Bool`; jump when false.
    IfFalse(i16),
    /// Return from the current method.
    Return,
    /// Pop a `Bool`; abort execution when false.
    Assert,
    /// Pop an error code and a `Bool`; abort with the code when false.
    AssertWithErrorCode,
    /// Abort execution unconditionally.
    Panic,

    // =====================================================================
    // Locals
    // =====================================================================
    /// Push the local at a fixed slot.
    LoadLocal(u8),
    /// Pop into the local at a fixed slot.
    StoreLocal(u8),
    /// Pop a `U256` slot index; push that local.
    LoadLocalByIndex,
    /// Pop a `U256` slot index, then a value; store it.
    StoreLocalByIndex,
    /// Duplicate the top of the stack.
    Dup,
    /// Discard the top of the stack.
    Pop,

    // =====================================================================
    // Fields
    // =====================================================================
    /// Push the immutable field at a fixed slot.
    LoadImmField(u8),
    /// Push the mutable field at a fixed slot.
    LoadMutField(u8),
    /// Pop into the mutable field at a fixed slot.
    StoreMutField(u8),
    /// Pop a `U256` slot index; push that immutable field.
    LoadImmFieldByIndex,
    /// Pop a `U256` slot index; push that mutable field.
    LoadMutFieldByIndex,
    /// Pop a `U256` slot index, then a value; store it.
    StoreMutFieldByIndex,

    // =====================================================================
    // U256 arithmetic and bitwise
    // =====================================================================
    U256Add,
    U256Sub,
    U256Mul,
    U256Div,
    U256Mod,
    U256Exp,
    U256ModExp,
    U256Shl,
    U256Shr,
    U256BitAnd,
    U256BitOr,
    U256Xor,
    U256Lt,
    U256Le,
    U256Gt,
    U256Ge,

    // =====================================================================
    // I256 arithmetic
    // =====================================================================
    I256Add,
    I256Sub,
    I256Mul,
    I256Div,
    I256Mod,
    I256Exp,
    I256Lt,
    I256Le,
    I256Gt,
    I256Ge,

    // =====================================================================
    // Generic comparison and boolean
    // =====================================================================
    /// Pop two equal-typed scalars; push equality.
    Eq,
    /// Pop two equal-typed scalars; push inequality.
    Neq,
    /// Pop a `Bool`; push its negation.
    Not,

    // =====================================================================
    // Calls
    // =====================================================================
    /// Call a method of the current contract by method index.
    CallLocal(u8),
    /// Pop a contract id; call its method by method index.
    CallExternal(u8),
    /// Pop n values (an event index plus its fields) and log them.
    Log(u8),
    /// Pop a `U256` count, then that many values; push their encoding
    /// as a `ByteVec`.
    Encode,

    // =====================================================================
    // Assets
    // =====================================================================
    ApproveAlph,
    ApproveToken,
    AlphRemaining,
    TokenRemaining,
    TransferAlph,
    TransferToken,
    TransferAlphToSelf,
    TransferTokenToSelf,
    TransferAlphFromSelf,
    TransferTokenFromSelf,

    // =====================================================================
    // Introspection / chain
    // =====================================================================
    TxId,
    CallerAddress,
    SelfContractId,
    MigrateWithFields,
    GetSegregatedSignature,
    VerifyBIP340Schnorr,

    // =====================================================================
    // Scripts
    // =====================================================================
    /// A script template placeholder, substituted before execution.
    /// Rendered as `{index}` in template strings.
    TemplateVariable {
        name: String,
        /// Primitive-type code (see `Type::primitive_code`).
        ty: u8,
        index: u8,
    },
}

impl Instr {
    /// The opcode byte of this instruction.
    pub fn opcode(&self) -> u8 {
        use Instr::*;
        match self {
            U256Const0 => 0x00,
            U256Const1 => 0x01,
            U256Const2 => 0x02,
            U256Const3 => 0x03,
            U256Const4 => 0x04,
            U256Const5 => 0x05,
            U256Const(_) => 0x06,
            I256Const0 => 0x07,
            I256ConstN1 => 0x08,
            I256Const(_) => 0x09,
            BoolConst(_) => 0x0a,
            BytesConst(_) => 0x0b,
            AddressConst(_) => 0x0c,
            Jump(_) => 0x10,
            IfTrue(_) => 0x11,
            IfFalse(_) => 0x12,
            Return => 0x13,
            Assert => 0x14,
            AssertWithErrorCode => 0x15,
            Panic => 0x16,
            LoadLocal(_) => 0x20,
            StoreLocal(_) => 0x21,
            LoadLocalByIndex => 0x22,
            StoreLocalByIndex => 0x23,
            Dup => 0x24,
            Pop => 0x25,
            LoadImmField(_) => 0x28,
            LoadMutField(_) => 0x29,
            StoreMutField(_) => 0x2a,
            LoadImmFieldByIndex => 0x2b,
            LoadMutFieldByIndex => 0x2c,
            StoreMutFieldByIndex => 0x2d,
            U256Add => 0x30,
            U256Sub => 0x31,
            U256Mul => 0x32,
            U256Div => 0x33,
            U256Mod => 0x34,
            U256Exp => 0x35,
            U256ModExp => 0x36,
            U256Shl => 0x37,
            U256Shr => 0x38,
            U256BitAnd => 0x39,
            U256BitOr => 0x3a,
            U256Xor => 0x3b,
            U256Lt => 0x3c,
            U256Le => 0x3d,
            U256Gt => 0x3e,
            U256Ge => 0x3f,
            I256Add => 0x40,
            I256Sub => 0x41,
            I256Mul => 0x42,
            I256Div => 0x43,
            I256Mod => 0x44,
            I256Exp => 0x45,
            I256Lt => 0x46,
            I256Le => 0x47,
            I256Gt => 0x48,
            I256Ge => 0x49,
            Eq => 0x4a,
            Neq => 0x4b,
            Not => 0x4c,
            CallLocal(_) => 0x50,
            CallExternal(_) => 0x51,
            Log(_) => 0x52,
            Encode => 0x53,
            ApproveAlph => 0x60,
            ApproveToken => 0x61,
            AlphRemaining => 0x62,
            TokenRemaining => 0x63,
            TransferAlph => 0x64,
            TransferToken => 0x65,
            TransferAlphToSelf => 0x66,
            TransferTokenToSelf => 0x67,
            TransferAlphFromSelf => 0x68,
            TransferTokenFromSelf => 0x69,
            TxId => 0x70,
            CallerAddress => 0x71,
            SelfContractId => 0x72,
            MigrateWithFields => 0x73,
            GetSegregatedSignature => 0x74,
            VerifyBIP340Schnorr => 0x75,
            TemplateVariable { .. } => 0xfe,
        }
    }

    /// Append this instruction's byte encoding to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.opcode());
        match self {
            Instr::U256Const(v) => {
                let bytes = v.to_be_bytes::<32>();
                let skip = bytes.iter().take_while(|b| **b == 0).count();
                out.push((32 - skip) as u8);
                out.extend_from_slice(&bytes[skip..]);
            }
            Instr::I256Const(v) => {
                out.extend_from_slice(&v.into_raw().to_be_bytes::<32>());
            }
            Instr::BoolConst(b) => out.push(*b as u8),
            Instr::BytesConst(bs) | Instr::AddressConst(bs) => {
                out.extend_from_slice(&(bs.len() as u16).to_be_bytes());
                out.extend_from_slice(bs);
            }
            Instr::Jump(offset) | Instr::IfTrue(offset) | Instr::IfFalse(offset) => {
                out.extend_from_slice(&offset.to_be_bytes());
            }
            Instr::LoadLocal(i)
            | Instr::StoreLocal(i)
            | Instr::LoadImmField(i)
            | Instr::LoadMutField(i)
            | Instr::StoreMutField(i)
            | Instr::CallLocal(i)
            | Instr::CallExternal(i)
            | Instr::Log(i) => out.push(*i),
            Instr::TemplateVariable { name, ty, index } => {
                out.push(name.len() as u8);
                out.extend_from_slice(name.as_bytes());
                out.push(*ty);
                out.push(*index);
            }
            _ => {}
        }
    }

    /// Decode one instruction starting at `*pos`, advancing `*pos`.
    pub fn decode(bytes: &[u8], pos: &mut usize) -> Result<Instr, DecodeError> {
        let start = *pos;
        let opcode = *bytes.get(*pos).ok_or(DecodeError(start))?;
        *pos += 1;
        let instr = match opcode {
            0x00 => Instr::U256Const0,
            0x01 => Instr::U256Const1,
            0x02 => Instr::U256Const2,
            0x03 => Instr::U256Const3,
            0x04 => Instr::U256Const4,
            0x05 => Instr::U256Const5,
            0x06 => {
                let len = read_u8(bytes, pos)? as usize;
                if len > 32 {
                    return Err(DecodeError(start));
                }
                let chunk = read_slice(bytes, pos, len)?;
                Instr::U256Const(U256::from_be_slice(chunk))
            }
            0x07 => Instr::I256Const0,
            0x08 => Instr::I256ConstN1,
            0x09 => {
                let chunk = read_slice(bytes, pos, 32)?;
                let mut raw = [0u8; 32];
                raw.copy_from_slice(chunk);
                Instr::I256Const(I256::from_raw(U256::from_be_bytes(raw)))
            }
            0x0a => Instr::BoolConst(read_u8(bytes, pos)? != 0),
            0x0b => Instr::BytesConst(read_bytes16(bytes, pos)?),
            0x0c => Instr::AddressConst(read_bytes16(bytes, pos)?),
            0x10 => Instr::Jump(read_i16(bytes, pos)?),
            0x11 => Instr::IfTrue(read_i16(bytes, pos)?),
            0x12 => Instr::IfFalse(read_i16(bytes, pos)?),
            0x13 => Instr::Return,
            0x14 => Instr::Assert,
            0x15 => Instr::AssertWithErrorCode,
            0x16 => Instr::Panic,
            0x20 => Instr::LoadLocal(read_u8(bytes, pos)?),
            0x21 => Instr::StoreLocal(read_u8(bytes, pos)?),
            0x22 => Instr::LoadLocalByIndex,
            0x23 => Instr::StoreLocalByIndex,
            0x24 => Instr::Dup,
            0x25 => Instr::Pop,
            0x28 => Instr::LoadImmField(read_u8(bytes, pos)?),
            0x29 => Instr::LoadMutField(read_u8(bytes, pos)?),
            0x2a => Instr::StoreMutField(read_u8(bytes, pos)?),
            0x2b => Instr::LoadImmFieldByIndex,
            0x2c => Instr::LoadMutFieldByIndex,
            0x2d => Instr::StoreMutFieldByIndex,
            0x30 => Instr::U256Add,
            0x31 => Instr::U256Sub,
            0x32 => Instr::U256Mul,
            0x33 => Instr::U256Div,
            0x34 => Instr::U256Mod,
            0x35 => Instr::U256Exp,
            0x36 => Instr::U256ModExp,
            0x37 => Instr::U256Shl,
            0x38 => Instr::U256Shr,
            0x39 => Instr::U256BitAnd,
            0x3a => Instr::U256BitOr,
            0x3b => Instr::U256Xor,
            0x3c => Instr::U256Lt,
            0x3d => Instr::U256Le,
            0x3e => Instr::U256Gt,
            0x3f => Instr::U256Ge,
            0x40 => Instr::I256Add,
            0x41 => Instr::I256Sub,
            0x42 => Instr::I256Mul,
            0x43 => Instr::I256Div,
            0x44 => Instr::I256Mod,
            0x45 => Instr::I256Exp,
            0x46 => Instr::I256Lt,
            0x47 => Instr::I256Le,
            0x48 => Instr::I256Gt,
            0x49 => Instr::I256Ge,
            0x4a => Instr::Eq,
            0x4b => Instr::Neq,
            0x4c => Instr::Not,
            0x50 => Instr::CallLocal(read_u8(bytes, pos)?),
            0x51 => Instr::CallExternal(read_u8(bytes, pos)?),
            0x52 => Instr::Log(read_u8(bytes, pos)?),
            0x53 => Instr::Encode,
            0x60 => Instr::ApproveAlph,
            0x61 => Instr::ApproveToken,
            0x62 => Instr::AlphRemaining,
            0x63 => Instr::TokenRemaining,
            0x64 => Instr::TransferAlph,
            0x65 => Instr::TransferToken,
            0x66 => Instr::TransferAlphToSelf,
            0x67 => Instr::TransferTokenToSelf,
            0x68 => Instr::TransferAlphFromSelf,
            0x69 => Instr::TransferTokenFromSelf,
            0x70 => Instr::TxId,
            0x71 => Instr::CallerAddress,
            0x72 => Instr::SelfContractId,
            0x73 => Instr::MigrateWithFields,
            0x74 => Instr::GetSegregatedSignature,
            0x75 => Instr::VerifyBIP340Schnorr,
            0xfe => {
                let name_len = read_u8(bytes, pos)? as usize;
                let name_bytes = read_slice(bytes, pos, name_len)?;
                let name = std::str::from_utf8(name_bytes)
                    .map_err(|_| DecodeError(start))?
                    .to_string();
                let ty = read_u8(bytes, pos)?;
                let index = read_u8(bytes, pos)?;
                Instr::TemplateVariable { name, ty, index }
            }
            _ => return Err(DecodeError(start)),
        };
        Ok(instr)
    }

    /// The best-fitting constant instruction for a `U256` value.
    pub fn u256_const(value: U256) -> Instr {
        if value <= U256::from(5u64) {
            match value.to::<u64>() {
                0 => Instr::U256Const0,
                1 => Instr::U256Const1,
                2 => Instr::U256Const2,
                3 => Instr::U256Const3,
                4 => Instr::U256Const4,
                _ => Instr::U256Const5,
            }
        } else {
            Instr::U256Const(value)
        }
    }

    /// The best-fitting constant instruction for an `I256` value.
    pub fn i256_const(value: I256) -> Instr {
        if value == I256::ZERO {
            Instr::I256Const0
        } else if value == I256::MINUS_ONE {
            Instr::I256ConstN1
        } else {
            Instr::I256Const(value)
        }
    }
}

fn read_u8(bytes: &[u8], pos: &mut usize) -> Result<u8, DecodeError> {
    let b = *bytes.get(*pos).ok_or(DecodeError(*pos))?;
    *pos += 1;
    Ok(b)
}

fn read_i16(bytes: &[u8], pos: &mut usize) -> Result<i16, DecodeError> {
    let chunk = read_slice(bytes, pos, 2)?;
    Ok(i16::from_be_bytes([chunk[0], chunk[1]]))
}

fn read_slice<'a>(bytes: &'a [u8], pos: &mut usize, len: usize) -> Result<&'a [u8], DecodeError> {
    let end = pos.checked_add(len).ok_or(DecodeError(*pos))?;
    let chunk = bytes.get(*pos..end).ok_or(DecodeError(*pos))?;
    *pos = end;
    Ok(chunk)
}

fn read_bytes16(bytes: &[u8], pos: &mut usize) -> Result<Vec<u8>, DecodeError> {
    let chunk = read_slice(bytes, pos, 2)?;
    let len = u16::from_be_bytes([chunk[0], chunk[1]]) as usize;
    Ok(read_slice(bytes, pos, len)?.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(instr: Instr) {
        let mut buf = Vec::new();
        instr.encode(&mut buf);
        let mut pos = 0;
        let decoded = Instr::decode(&buf, &mut pos).unwrap();
        assert_eq!(decoded, instr);
        assert_eq!(pos, buf.len());
    }

    #[test]
    fn encode_round_trips() {
        round_trip(Instr::U256Const0);
        round_trip(Instr::U256Const(U256::from(123_456_789u64)));
        round_trip(Instr::U256Const(U256::ZERO));
        round_trip(Instr::U256Const(U256::MAX));
        round_trip(Instr::I256Const(I256::MINUS_ONE));
        round_trip(Instr::I256Const(I256::try_from(-42i64).unwrap()));
        round_trip(Instr::BoolConst(true));
        round_trip(Instr::BytesConst(vec![0xde, 0xad, 0xbe, 0xef]));
        round_trip(Instr::AddressConst(vec![0x01; 33]));
        round_trip(Instr::Jump(-7));
        round_trip(Instr::IfFalse(300));
        round_trip(Instr::LoadLocal(3));
        round_trip(Instr::StoreMutField(250));
        round_trip(Instr::CallExternal(1));
        round_trip(Instr::Log(4));
        round_trip(Instr::TemplateVariable {
            name: "amount".to_string(),
            ty: 1,
            index: 0,
        });
    }

    #[test]
    fn small_u256_constants_use_short_form() {
        assert_eq!(Instr::u256_const(U256::ZERO), Instr::U256Const0);
        assert_eq!(Instr::u256_const(U256::from(5u64)), Instr::U256Const5);
        assert!(matches!(
            Instr::u256_const(U256::from(6u64)),
            Instr::U256Const(_)
        ));
    }

    #[test]
    fn i256_constants_use_short_form() {
        assert_eq!(Instr::i256_const(I256::ZERO), Instr::I256Const0);
        assert_eq!(Instr::i256_const(I256::MINUS_ONE), Instr::I256ConstN1);
    }

    #[test]
    fn opcodes_are_unique() {
        let instrs = [
            Instr::U256Const0,
            Instr::U256Const(U256::ZERO),
            Instr::I256Const0,
            Instr::Jump(0),
            Instr::Return,
            Instr::LoadLocal(0),
            Instr::LoadImmField(0),
            Instr::U256Add,
            Instr::I256Add,
            Instr::Eq,
            Instr::CallLocal(0),
            Instr::ApproveAlph,
            Instr::TxId,
        ];
        let mut seen = std::collections::HashSet::new();
        for instr in instrs {
            assert!(seen.insert(instr.opcode()), "duplicate opcode");
        }
    }

    #[test]
    fn decode_rejects_unknown_opcode() {
        let mut pos = 0;
        assert!(Instr::decode(&[0xff], &mut pos).is_err());
    }

    #[test]
    fn decode_rejects_truncation() {
        let mut buf = Vec::new();
        Instr::BytesConst(vec![1, 2, 3]).encode(&mut buf);
        buf.pop();
        let mut pos = 0;
        assert!(Instr::decode(&buf, &mut pos).is_err());
    }
}
