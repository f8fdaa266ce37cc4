//! Compiled bytecode containers and their wire format.
//!
//! A [`Method`] is one compiled function: header flags, slot counts, and
//! an instruction vector. Concrete contracts serialize to
//! [`StatefulContract`]; `TxScript`s to [`StatefulScript`]; `AssetScript`s
//! to [`StatelessScript`]. All three round-trip through
//! `serialize`/`deserialize` byte-for-byte.

use crate::instr::{DecodeError, Instr};

/// Method header flag: callable from outside the contract.
const FLAG_PUBLIC: u8 = 0x01;
/// Method header flag: uses preapproved assets.
const FLAG_PREAPPROVED: u8 = 0x02;
/// Method header flag: uses contract assets.
const FLAG_CONTRACT_ASSETS: u8 = 0x04;

/// One compiled method.
///
/// `locals_length` counts every scalar slot, including argument slots
/// and the cells of flattened arrays; the first `args_length` slots are
/// the arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    pub is_public: bool,
    pub use_preapproved_assets: bool,
    pub use_contract_assets: bool,
    pub args_length: u8,
    pub locals_length: u8,
    pub return_length: u8,
    pub instrs: Vec<Instr>,
}

impl Method {
    /// Append this method's byte encoding to `out`.
    pub fn serialize(&self, out: &mut Vec<u8>) {
        let mut flags = 0u8;
        if self.is_public {
            flags |= FLAG_PUBLIC;
        }
        if self.use_preapproved_assets {
            flags |= FLAG_PREAPPROVED;
        }
        if self.use_contract_assets {
            flags |= FLAG_CONTRACT_ASSETS;
        }
        out.push(flags);
        out.push(self.args_length);
        out.push(self.locals_length);
        out.push(self.return_length);
        out.extend_from_slice(&(self.instrs.len() as u16).to_be_bytes());
        for instr in &self.instrs {
            instr.encode(out);
        }
    }

    /// Decode one method starting at `*pos`, advancing `*pos`.
    pub fn deserialize(bytes: &[u8], pos: &mut usize) -> Result<Method, DecodeError> {
        let header = bytes.get(*pos..*pos + 6).ok_or(DecodeError(*pos))?;
        let flags = header[0];
        let args_length = header[1];
        let locals_length = header[2];
        let return_length = header[3];
        let count = u16::from_be_bytes([header[4], header[5]]) as usize;
        *pos += 6;
        let mut instrs = Vec::with_capacity(count);
        for _ in 0..count {
            instrs.push(Instr::decode(bytes, pos)?);
        }
        Ok(Method {
            is_public: flags & FLAG_PUBLIC != 0,
            use_preapproved_assets: flags & FLAG_PREAPPROVED != 0,
            use_contract_assets: flags & FLAG_CONTRACT_ASSETS != 0,
            args_length,
            locals_length,
            return_length,
            instrs,
        })
    }
}

fn serialize_methods(methods: &[Method], out: &mut Vec<u8>) {
    out.push(methods.len() as u8);
    for method in methods {
        method.serialize(out);
    }
}

fn deserialize_methods(bytes: &[u8], pos: &mut usize) -> Result<Vec<Method>, DecodeError> {
    let count = *bytes.get(*pos).ok_or(DecodeError(*pos))? as usize;
    *pos += 1;
    let mut methods = Vec::with_capacity(count);
    for _ in 0..count {
        methods.push(Method::deserialize(bytes, pos)?);
    }
    Ok(methods)
}

/// Render methods as a hex template string, with each
/// [`Instr::TemplateVariable`] replaced by its `{n}` placeholder.
fn methods_template_string(methods: &[Method]) -> String {
    let mut out = String::new();
    let mut buf = Vec::new();
    buf.push(methods.len() as u8);
    for method in methods {
        // Header bytes are never templated; reuse the serializer up to
        // the instruction list.
        let header = Method {
            instrs: Vec::new(),
            ..method.clone()
        };
        let mut header_bytes = Vec::new();
        header.serialize(&mut header_bytes);
        // Fix the instruction count, which the empty header lost.
        let len_bytes = (method.instrs.len() as u16).to_be_bytes();
        header_bytes[4] = len_bytes[0];
        header_bytes[5] = len_bytes[1];
        buf.extend_from_slice(&header_bytes);
        out.push_str(&alloy_primitives::hex::encode(&buf));
        buf.clear();
        for instr in &method.instrs {
            if let Instr::TemplateVariable { index, .. } = instr {
                out.push_str(&format!("{{{index}}}"));
            } else {
                let mut enc = Vec::new();
                instr.encode(&mut enc);
                out.push_str(&alloy_primitives::hex::encode(&enc));
            }
        }
    }
    out
}

/// Bytecode of a concrete contract: the scalar field count followed by
/// its method table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatefulContract {
    /// Total scalar field slots (immutable + mutable), including a
    /// synthetic `@std` slot when present.
    pub field_length: u8,
    pub methods: Vec<Method>,
}

impl StatefulContract {
    /// Serialize to bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.push(self.field_length);
        serialize_methods(&self.methods, &mut out);
        out
    }

    /// Deserialize from bytes. The whole input must be consumed.
    pub fn deserialize(bytes: &[u8]) -> Result<StatefulContract, DecodeError> {
        let mut pos = 0;
        let field_length = *bytes.get(pos).ok_or(DecodeError(pos))?;
        pos += 1;
        let methods = deserialize_methods(bytes, &mut pos)?;
        if pos != bytes.len() {
            return Err(DecodeError(pos));
        }
        Ok(StatefulContract {
            field_length,
            methods,
        })
    }
}

/// Bytecode of a `TxScript`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatefulScript {
    pub methods: Vec<Method>,
}

impl StatefulScript {
    /// Serialize to bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        serialize_methods(&self.methods, &mut out);
        out
    }

    /// Deserialize from bytes. The whole input must be consumed.
    pub fn deserialize(bytes: &[u8]) -> Result<StatefulScript, DecodeError> {
        let mut pos = 0;
        let methods = deserialize_methods(bytes, &mut pos)?;
        if pos != bytes.len() {
            return Err(DecodeError(pos));
        }
        Ok(StatefulScript { methods })
    }

    /// The hex template form, with `{n}` placeholders for template
    /// variables.
    pub fn template_string(&self) -> String {
        methods_template_string(&self.methods)
    }
}

/// Bytecode of an `AssetScript`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatelessScript {
    pub methods: Vec<Method>,
}

impl StatelessScript {
    /// Serialize to bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        serialize_methods(&self.methods, &mut out);
        out
    }

    /// Deserialize from bytes. The whole input must be consumed.
    pub fn deserialize(bytes: &[u8]) -> Result<StatelessScript, DecodeError> {
        let mut pos = 0;
        let methods = deserialize_methods(bytes, &mut pos)?;
        if pos != bytes.len() {
            return Err(DecodeError(pos));
        }
        Ok(StatelessScript { methods })
    }

    /// The hex template form, with `{n}` placeholders for template
    /// variables.
    pub fn template_string(&self) -> String {
        methods_template_string(&self.methods)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ralph_core::U256;

    fn sample_method() -> Method {
        Method {
            is_public: true,
            use_preapproved_assets: false,
            use_contract_assets: true,
            args_length: 2,
            locals_length: 3,
            return_length: 1,
            instrs: vec![
                Instr::LoadLocal(0),
                Instr::LoadLocal(1),
                Instr::U256Add,
                Instr::StoreLocal(2),
                Instr::LoadLocal(2),
                Instr::Return,
            ],
        }
    }

    #[test]
    fn contract_round_trip() {
        let contract = StatefulContract {
            field_length: 4,
            methods: vec![sample_method()],
        };
        let bytes = contract.serialize();
        assert_eq!(StatefulContract::deserialize(&bytes).unwrap(), contract);
    }

    #[test]
    fn script_round_trip() {
        let script = StatelessScript {
            methods: vec![sample_method(), sample_method()],
        };
        let bytes = script.serialize();
        assert_eq!(StatelessScript::deserialize(&bytes).unwrap(), script);
    }

    #[test]
    fn deserialize_rejects_trailing_garbage() {
        let contract = StatefulContract {
            field_length: 0,
            methods: vec![],
        };
        let mut bytes = contract.serialize();
        bytes.push(0x00);
        assert!(StatefulContract::deserialize(&bytes).is_err());
    }

    #[test]
    fn template_string_has_placeholders() {
        let script = StatefulScript {
            methods: vec![Method {
                is_public: true,
                use_preapproved_assets: false,
                use_contract_assets: false,
                args_length: 0,
                locals_length: 0,
                return_length: 0,
                instrs: vec![
                    Instr::TemplateVariable {
                        name: "amount".to_string(),
                        ty: 1,
                        index: 0,
                    },
                    Instr::U256Const(U256::from(9u64)),
                    Instr::U256Add,
                    Instr::Pop,
                    Instr::Return,
                ],
            }],
        };
        let template = script.template_string();
        assert!(template.contains("{0}"));
        // The placeholder replaces the template-variable bytes only.
        assert!(!template.contains("fe"));
    }

    #[test]
    fn method_flags_round_trip() {
        let mut method = sample_method();
        method.is_public = false;
        method.use_preapproved_assets = true;
        let mut out = Vec::new();
        method.serialize(&mut out);
        let mut pos = 0;
        let back = Method::deserialize(&out, &mut pos).unwrap();
        assert_eq!(back, method);
        assert_eq!(pos, out.len());
    }
}
