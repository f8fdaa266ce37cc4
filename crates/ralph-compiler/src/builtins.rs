//! Builtin function tables.
//!
//! Asset builtins are polymorphic in their token-id argument: the
//! literal `ALPH` selects the `…Alph` instruction variant and the
//! argument is not emitted; any other expression takes the `…Token`
//! path. `assert!`, `checkCaller!`, `panic!`, and `debug!` have
//! irregular shapes and are handled directly by the function compiler.

use crate::instr::Instr;
use crate::types::Type;

/// How a builtin touches assets, for the annotation analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetClass {
    /// No asset interaction.
    None,
    /// Spends or inspects preapproved assets; the caller must be
    /// annotated `preapprovedAssets = true`.
    Preapproved,
    /// Touches the contract's own assets; the caller must be annotated
    /// `assetsInContract = true`.
    ContractAssets,
}

/// Parameter kinds of an asset builtin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// An `Address` argument.
    Address,
    /// The polymorphic token-id slot (`ALPH` or a `ByteVec`).
    TokenId,
    /// A `U256` amount.
    Amount,
}

/// An asset builtin with its two lowering variants.
#[derive(Debug)]
pub struct AssetBuiltin {
    pub name: &'static str,
    pub params: &'static [ParamKind],
    /// Whether the builtin pushes a `U256` result.
    pub returns_amount: bool,
    pub class: AssetClass,
    /// Lowering when the token id is the `ALPH` literal.
    pub alph_instr: Instr,
    /// Lowering for any other token id.
    pub token_instr: Instr,
}

use ParamKind::{Address, Amount, TokenId};

static ASSET_BUILTINS: &[AssetBuiltin] = &[
    AssetBuiltin {
        name: "approveToken",
        params: &[Address, TokenId, Amount],
        returns_amount: false,
        class: AssetClass::Preapproved,
        alph_instr: Instr::ApproveAlph,
        token_instr: Instr::ApproveToken,
    },
    AssetBuiltin {
        name: "tokenRemaining",
        params: &[Address, TokenId],
        returns_amount: true,
        class: AssetClass::Preapproved,
        alph_instr: Instr::AlphRemaining,
        token_instr: Instr::TokenRemaining,
    },
    AssetBuiltin {
        name: "transferToken",
        params: &[Address, Address, TokenId, Amount],
        returns_amount: false,
        class: AssetClass::Preapproved,
        alph_instr: Instr::TransferAlph,
        token_instr: Instr::TransferToken,
    },
    AssetBuiltin {
        name: "transferTokenToSelf",
        params: &[Address, TokenId, Amount],
        returns_amount: false,
        class: AssetClass::ContractAssets,
        alph_instr: Instr::TransferAlphToSelf,
        token_instr: Instr::TransferTokenToSelf,
    },
    AssetBuiltin {
        name: "transferTokenFromSelf",
        params: &[Address, TokenId, Amount],
        returns_amount: false,
        class: AssetClass::ContractAssets,
        alph_instr: Instr::TransferAlphFromSelf,
        token_instr: Instr::TransferTokenFromSelf,
    },
];

/// Look up an asset builtin by name (without the `!`).
pub fn asset_builtin(name: &str) -> Option<&'static AssetBuiltin> {
    ASSET_BUILTINS.iter().find(|b| b.name == name)
}

/// A fixed-signature builtin lowered to a single instruction.
#[derive(Debug)]
pub struct SimpleBuiltin {
    pub name: &'static str,
    pub params: &'static [Prim],
    pub ret: Option<Prim>,
    pub instr: Instr,
}

/// Primitive parameter/return types for [`SimpleBuiltin`] signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prim {
    Bool,
    U256,
    ByteVec,
    Address,
}

impl Prim {
    /// The semantic type of this primitive.
    pub fn ty(self) -> Type {
        match self {
            Prim::Bool => Type::Bool,
            Prim::U256 => Type::U256,
            Prim::ByteVec => Type::ByteVec,
            Prim::Address => Type::Address,
        }
    }
}

static SIMPLE_BUILTINS: &[SimpleBuiltin] = &[
    SimpleBuiltin {
        name: "txId",
        params: &[],
        ret: Some(Prim::ByteVec),
        instr: Instr::TxId,
    },
    SimpleBuiltin {
        name: "callerAddress",
        params: &[],
        ret: Some(Prim::Address),
        instr: Instr::CallerAddress,
    },
    SimpleBuiltin {
        name: "selfContractId",
        params: &[],
        ret: Some(Prim::ByteVec),
        instr: Instr::SelfContractId,
    },
    SimpleBuiltin {
        name: "getSegregatedSignature",
        params: &[],
        ret: Some(Prim::ByteVec),
        instr: Instr::GetSegregatedSignature,
    },
    SimpleBuiltin {
        name: "verifyBIP340Schnorr",
        params: &[Prim::ByteVec, Prim::ByteVec, Prim::ByteVec],
        ret: None,
        instr: Instr::VerifyBIP340Schnorr,
    },
    SimpleBuiltin {
        name: "migrateWithFields",
        params: &[Prim::ByteVec, Prim::ByteVec, Prim::ByteVec],
        ret: None,
        instr: Instr::MigrateWithFields,
    },
];

/// Look up a fixed-signature builtin by name (without the `!`).
pub fn simple_builtin(name: &str) -> Option<&'static SimpleBuiltin> {
    SIMPLE_BUILTINS.iter().find(|b| b.name == name)
}

/// The static field-encoding functions callable as `Type.name!(…)`.
pub const STATIC_ENCODE_FUNCS: &[&str] = &["encodeImmFields", "encodeMutFields", "encodeFields"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_lookup() {
        let transfer = asset_builtin("transferToken").unwrap();
        assert_eq!(transfer.params.len(), 4);
        assert_eq!(transfer.class, AssetClass::Preapproved);
        assert_eq!(transfer.alph_instr, Instr::TransferAlph);
        assert!(asset_builtin("transferAlph").is_none());
    }

    #[test]
    fn contract_asset_builtins_classified() {
        assert_eq!(
            asset_builtin("transferTokenToSelf").unwrap().class,
            AssetClass::ContractAssets
        );
        assert_eq!(
            asset_builtin("transferTokenFromSelf").unwrap().class,
            AssetClass::ContractAssets
        );
    }

    #[test]
    fn simple_lookup() {
        let tx_id = simple_builtin("txId").unwrap();
        assert!(tx_id.params.is_empty());
        assert_eq!(tx_id.ret, Some(Prim::ByteVec));
        assert!(simple_builtin("blockHash").is_none());
    }
}
