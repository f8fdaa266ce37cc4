//! End-to-end compiler tests: the documented error contract, the
//! lowering shapes, and the bytecode-level properties.

use ralph_compiler::bytecode::{StatefulContract, StatelessScript};
use ralph_compiler::instr::Instr;
use ralph_compiler::{CompilationResult, Compiler, ScriptKind};

fn compile(source: &str) -> CompilationResult {
    Compiler::compile(source).expect("expected successful compilation")
}

fn compile_err(source: &str) -> String {
    match Compiler::compile(source) {
        Ok(_) => panic!("expected a compilation error"),
        Err(err) => err.to_string(),
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn asset_script_compiles_without_warnings() {
    let result = compile(
        "AssetScript Foo { pub fn bar(a: U256, b: U256) -> (U256) { return a + b } }",
    );
    assert_eq!(result.scripts.len(), 1);
    assert_eq!(result.scripts[0].kind, ScriptKind::AssetScript);
    assert!(result.warnings.is_empty());
    let method = &result.scripts[0].code.methods()[0];
    assert!(method.is_public);
    assert_eq!(method.args_length, 2);
    assert_eq!(method.return_length, 1);
    assert_eq!(
        method.instrs,
        vec![
            Instr::LoadLocal(0),
            Instr::LoadLocal(1),
            Instr::U256Add,
            Instr::Return,
        ]
    );
}

#[test]
fn txscript_requires_main_statements() {
    assert_eq!(
        compile_err("TxScript Foo {}"),
        "Expected main statements for type \"Foo\""
    );
}

#[test]
fn missing_return_is_rejected() {
    let err = compile_err("Contract Foo() { fn foo() -> U256 { if (true) { return 1 } } }");
    assert_eq!(err, "Expected return statement for function \"foo\"");
}

#[test]
fn wrong_return_types_are_rejected() {
    let err = compile_err("Contract Foo() { fn foo() -> () { return 1 } }");
    assert!(err.starts_with("Invalid return types:"), "got: {err}");
}

#[test]
fn uniswap_style_swap_compiles() {
    // With reserves (1_000_000, 100_000) and an input of 1000, the
    // constant-product payout is 100_000 * 1000 / 1_001_000 = 99.
    assert_eq!(100_000u128 * 1000 / (1_000_000 + 1000), 99);

    let result = compile(
        r#"
        Contract Uniswap(mut alphReserve: U256, mut btcReserve: U256) {
            @using(updateFields = true, checkExternalCaller = false)
            pub fn swap(amountIn: U256) -> U256 {
                let amountOut = (btcReserve * amountIn) / (alphReserve + amountIn)
                alphReserve = alphReserve + amountIn
                btcReserve = btcReserve - amountOut
                return amountOut
            }
        }
        "#,
    );
    let contract = &result.contracts[0];
    assert_eq!(contract.code.field_length, 2);
    let swap = &contract.code.methods[0];
    assert_eq!(swap.args_length, 1);
    assert_eq!(swap.return_length, 1);
    assert!(swap.instrs.contains(&Instr::U256Mul));
    assert!(swap.instrs.contains(&Instr::U256Div));
    // Both reserves are stored back.
    assert!(swap.instrs.contains(&Instr::StoreMutField(0)));
    assert!(swap.instrs.contains(&Instr::StoreMutField(1)));
}

#[test]
fn unassigned_mutable_field_is_rejected() {
    let err =
        compile_err("Contract Foo(mut a: U256) { pub fn foo() -> U256 { return a } }");
    assert_eq!(err, "There are unassigned mutable fields in contract Foo: a");
}

#[test]
fn cyclic_inheritance_is_rejected() {
    let err = compile_err(
        r#"
        Abstract Contract A() extends B() { pub fn fa() -> () { return } }
        Abstract Contract B() extends C() { pub fn fb() -> () { return } }
        Abstract Contract C() extends A() { pub fn fc() -> () { return } }
        "#,
    );
    assert_eq!(err, "Cyclic inheritance detected for contract A");
}

#[test]
fn empty_interface_is_rejected() {
    assert_eq!(
        compile_err("Interface Foo {}"),
        "No function definition in Interface Foo"
    );
}

#[test]
fn event_argument_types_are_checked() {
    let err = compile_err(
        r#"
        Contract Foo() {
            event Add(a: U256, b: U256)
            pub fn f(a: U256, z: Bool) -> () {
                emit Add(a, z)
                return
            }
        }
        "#,
    );
    assert_eq!(err, "Invalid args type List(U256, Bool) for event Add(U256, U256)");
}

#[test]
fn events_are_capped_at_eight_fields() {
    let err = compile_err(
        r#"
        Contract Foo() {
            event Big(a: U256, b: U256, c: U256, d: U256, e: U256, f: U256, g: U256, h: U256, i: U256)
            pub fn f() -> () { return }
        }
        "#,
    );
    assert_eq!(err, "Max 8 fields allowed for contract events");
}

#[test]
fn abstract_contracts_cannot_be_emitted() {
    let source = r#"
        Abstract Contract Base() { pub fn f() -> () { return } }
    "#;
    let err = Compiler::compile_contract(source, "Base").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Code generation is not supported for abstract contract \"Base\""
    );
}

// ============================================================================
// Universal properties
// ============================================================================

const ROUND_TRIP_SOURCE: &str = r#"
    Contract Vault(owner: Address, mut balance: U256) {
        event Deposited(who: Address, amount: U256)

        @using(preapprovedAssets = true, updateFields = true, checkExternalCaller = false)
        pub fn deposit(amount: U256) -> () {
            transferToken!(callerAddress!(), ALPH, amount)
            balance = balance + amount
            emit Deposited(callerAddress!(), amount)
        }

        pub fn info() -> (Address, U256) {
            checkCaller!(true, 0)
            return owner, balance
        }
    }

    AssetScript Unlock(key: ByteVec) {
        pub fn check(sig: ByteVec) -> () {
            verifyBIP340Schnorr!(txId!(), key, sig)
        }
    }
"#;

#[test]
fn serialized_bytecode_round_trips() {
    let result = compile(ROUND_TRIP_SOURCE);
    let contract = &result.contracts[0];
    let bytes = contract.code.serialize();
    assert_eq!(StatefulContract::deserialize(&bytes).unwrap(), contract.code);

    let script = &result.scripts[0];
    let script_bytes = script.code.serialize();
    let back = StatelessScript::deserialize(&script_bytes).unwrap();
    assert_eq!(back.methods, script.code.methods());
}

#[test]
fn debug_equals_production_without_debug_builtins() {
    let result = compile(ROUND_TRIP_SOURCE);
    for contract in &result.contracts {
        assert_eq!(contract.code, contract.debug_code);
    }
    for script in &result.scripts {
        assert_eq!(script.code.methods(), script.debug_code.methods());
    }
}

#[test]
fn debug_builtin_only_lands_in_debug_bytecode() {
    let result = compile(
        r#"
        Contract Foo() {
            pub fn f() -> () {
                checkCaller!(true, 0)
                debug!("entering f")
                return
            }
        }
        "#,
    );
    let contract = &result.contracts[0];
    assert_ne!(contract.code, contract.debug_code);
    let debug_instrs = &contract.debug_code.methods[0].instrs;
    assert!(debug_instrs.contains(&Instr::BytesConst(b"entering f".to_vec())));
    let prod_instrs = &contract.code.methods[0].instrs;
    assert!(!prod_instrs.contains(&Instr::BytesConst(b"entering f".to_vec())));
    // The production stream still keeps the caller check.
    assert!(prod_instrs.contains(&Instr::AssertWithErrorCode));
}

#[test]
fn compilation_is_deterministic() {
    let a = compile(ROUND_TRIP_SOURCE);
    let b = compile(ROUND_TRIP_SOURCE);
    assert_eq!(a.contracts, b.contracts);
    assert_eq!(a.scripts, b.scripts);
    assert_eq!(a.warnings, b.warnings);
}

#[test]
fn abstract_contracts_are_not_emitted() {
    let result = compile(
        r#"
        Abstract Contract Base(x: U256) {
            pub fn get() -> U256 { return x }
        }
        Contract Impl(x: U256) extends Base(x) {
            pub fn twice() -> U256 {
                checkCaller!(true, 0)
                return get() + get()
            }
        }
        "#,
    );
    assert_eq!(result.contracts.len(), 1);
    assert_eq!(result.contracts[0].name, "Impl");
}

#[test]
fn field_length_counts_scalar_slots_and_std_field() {
    let result = compile(
        r#"
        @std(id = #414c)
        Interface IVault { pub fn total() -> U256 }
        Contract Vault(grid: [[U256; 2]; 3], mut total: U256) implements IVault {
            pub fn total() -> U256 {
                checkCaller!(true, 0)
                return total
            }
            @using(updateFields = true, checkExternalCaller = false)
            pub fn set(v: U256) -> () {
                total = v
                return
            }
            pub fn cell(i: U256, j: U256) -> U256 {
                checkCaller!(true, 0)
                return grid[i][j]
            }
        }
        "#,
    );
    let contract = &result.contracts[0];
    // 6 slots for the grid + 1 immutable @std slot + 1 mutable total.
    assert_eq!(contract.code.field_length, 8);
}

#[test]
fn dynamic_indexing_carries_bounds_checks() {
    let result = compile(
        r#"
        Contract Grid(rows: [[U256; 2]; 3]) {
            pub fn cell(i: U256, j: U256) -> U256 {
                checkCaller!(true, 0)
                return rows[i][j]
            }
            pub fn first(values: [U256; 4], i: U256) -> U256 {
                checkCaller!(true, 0)
                return values[i]
            }
        }
        "#,
    );
    for method in &result.contracts[0].code.methods {
        for (i, instr) in method.instrs.iter().enumerate() {
            let by_index = matches!(
                instr,
                Instr::LoadLocalByIndex
                    | Instr::LoadImmFieldByIndex
                    | Instr::LoadMutFieldByIndex
                    | Instr::StoreLocalByIndex
                    | Instr::StoreMutFieldByIndex
            );
            if !by_index {
                continue;
            }
            // The window before every by-index access holds the bounds
            // check sequence: Dup, U256Const(size), U256Lt, Assert.
            let window_start = i.saturating_sub(8);
            let checked = (window_start..i.saturating_sub(2)).any(|j| {
                method.instrs[j] == Instr::Dup
                    && method.instrs[j + 2] == Instr::U256Lt
                    && method.instrs[j + 3] == Instr::Assert
            });
            assert!(checked, "no bounds check before by-index access at {i}");
        }
    }
}

// ============================================================================
// Lowering shapes
// ============================================================================

#[test]
fn while_loop_shape() {
    let result = compile(
        r#"
        Contract Loop() {
            pub fn run(n: U256) -> U256 {
                checkCaller!(true, 0)
                let mut i = 0
                while (i < n) { i = i + 1 }
                return i
            }
        }
        "#,
    );
    let instrs = &result.contracts[0].code.methods[0].instrs;
    // checkCaller! occupies the first three instructions.
    let expected = vec![
        Instr::BoolConst(true),
        Instr::U256Const0,
        Instr::AssertWithErrorCode,
        Instr::U256Const0,
        Instr::StoreLocal(1),
        Instr::LoadLocal(1),
        Instr::LoadLocal(0),
        Instr::U256Lt,
        Instr::IfFalse(5),
        Instr::LoadLocal(1),
        Instr::U256Const1,
        Instr::U256Add,
        Instr::StoreLocal(1),
        Instr::Jump(-9),
        Instr::LoadLocal(1),
        Instr::Return,
    ];
    assert_eq!(instrs, &expected);
}

#[test]
fn short_circuit_and_shape() {
    let result = compile(
        r#"
        Contract Logic() {
            pub fn both(a: Bool, b: Bool) -> Bool {
                checkCaller!(true, 0)
                return a && b
            }
        }
        "#,
    );
    let instrs = &result.contracts[0].code.methods[0].instrs;
    let expected = vec![
        Instr::BoolConst(true),
        Instr::U256Const0,
        Instr::AssertWithErrorCode,
        Instr::LoadLocal(0),
        Instr::IfFalse(2),
        Instr::LoadLocal(1),
        Instr::Jump(1),
        Instr::BoolConst(false),
        Instr::Return,
    ];
    assert_eq!(instrs, &expected);
}

#[test]
fn multi_return_with_anonymous_slot() {
    let result = compile(
        r#"
        Contract M() {
            fn two() -> (U256, U256) {
                return 1, 2
            }
            pub fn go() -> U256 {
                checkCaller!(true, 0)
                let (x, _) = two()
                return x
            }
        }
        "#,
    );
    let go = &result.contracts[0].code.methods[1];
    let expected = vec![
        Instr::BoolConst(true),
        Instr::U256Const0,
        Instr::AssertWithErrorCode,
        Instr::CallLocal(0),
        Instr::Pop,
        Instr::StoreLocal(0),
        Instr::LoadLocal(0),
        Instr::Return,
    ];
    assert_eq!(go.instrs, expected);
}

#[test]
fn braces_approval_lowering() {
    let result = compile(
        r#"
        Contract Pool(mut total: U256) {
            @using(preapprovedAssets = true, updateFields = true, checkExternalCaller = false)
            pub fn add(amount: U256) -> () {
                transferToken!(callerAddress!(), ALPH, amount)
                total = total + amount
                return
            }
        }
        @using(preapprovedAssets = true)
        TxScript AddLiquidity(pool: Pool, amount: U256) {
            pool.add{callerAddress!() -> ALPH: amount}(amount)
        }
        "#,
    );
    let script = &result.scripts[0];
    assert_eq!(script.kind, ScriptKind::TxScript);
    let main = &script.code.methods()[0];
    // Clause lowering: address, amount, ApproveAlph; then the call
    // argument, the contract id, and the external call.
    let approve_at = main
        .instrs
        .iter()
        .position(|i| *i == Instr::ApproveAlph)
        .expect("approval instruction missing");
    assert_eq!(main.instrs[approve_at - 2], Instr::CallerAddress);
    assert!(matches!(
        main.instrs[approve_at - 1],
        Instr::TemplateVariable { index: 1, .. }
    ));
    let call_at = main
        .instrs
        .iter()
        .position(|i| matches!(i, Instr::CallExternal(0)))
        .expect("external call missing");
    assert!(approve_at < call_at);
    // The receiver id is a template variable pushed right before the call.
    assert!(matches!(
        main.instrs[call_at - 1],
        Instr::TemplateVariable { index: 0, .. }
    ));
}

#[test]
fn template_string_substitutes_placeholders() {
    let result = compile(
        r#"
        TxScript Transfer(to: Address, amount: U256) {
            transferMine(to, amount)
            fn transferMine(to: Address, amount: U256) -> () {
                checkCaller!(true, 0)
                return
            }
        }
        "#,
    );
    let template = result.scripts[0].code.template_string();
    assert!(template.contains("{0}"));
    assert!(template.contains("{1}"));
}

#[test]
fn encode_fields_static_call() {
    let result = compile(
        r#"
        Contract Token(symbol: ByteVec, mut supply: U256) {
            @using(updateFields = true, checkExternalCaller = false)
            pub fn mint(amount: U256) -> () {
                supply = supply + amount
                return
            }
        }
        TxScript Deploy(symbol: ByteVec, supply: U256) {
            let encodedImm = Token.encodeImmFields!(symbol)
            let encodedMut = Token.encodeMutFields!(supply)
            let (imm, mutFields) = Token.encodeFields!(symbol, supply)
            assert!(imm == encodedImm, 0)
            assert!(mutFields == encodedMut, 1)
        }
        "#,
    );
    let main = &result.scripts[0].code.methods()[0];
    let encodes = main
        .instrs
        .iter()
        .filter(|i| **i == Instr::Encode)
        .count();
    // Two single-region encodings plus the two halves of encodeFields!.
    assert_eq!(encodes, 4);
}

#[test]
fn constant_folding_of_indices() {
    let result = compile(
        r#"
        Contract Fold() {
            pub fn pick(values: [U256; 8]) -> U256 {
                checkCaller!(true, 0)
                return values[1 + 3 * 2]
            }
        }
        "#,
    );
    let instrs = &result.contracts[0].code.methods[0].instrs;
    // The index folds to 7, so the access is a direct load of slot 7;
    // no runtime arithmetic or bounds check remains.
    assert!(!instrs.contains(&Instr::U256Mul));
    assert!(!instrs.contains(&Instr::Assert));
    assert!(instrs.contains(&Instr::LoadLocal(7)));
}

#[test]
fn constant_index_out_of_bounds_is_rejected() {
    let err = compile_err(
        r#"
        Contract Fold() {
            pub fn pick(values: [U256; 4]) -> U256 {
                return values[4]
            }
        }
        "#,
    );
    assert!(err.contains("Invalid array index 4"), "got: {err}");
}

// ============================================================================
// Diagnostics
// ============================================================================

#[test]
fn unused_symbols_are_warned() {
    let result = compile(
        r#"
        Contract Foo(unusedField: U256) {
            const UNUSED_CONST = 1
            enum Codes { Unused = 0 }
            pub fn f() -> U256 {
                checkCaller!(true, 0)
                let dead = 1
                return 2
            }
        }
        "#,
    );
    let rendered: Vec<String> = result.warnings.iter().map(|w| w.to_string()).collect();
    assert!(rendered
        .iter()
        .any(|w| w == "Foo.f: Found unused variables: dead"));
    assert!(rendered
        .iter()
        .any(|w| w == "Foo: Found unused fields: unusedField"));
    assert!(rendered
        .iter()
        .any(|w| w == "Foo: Found unused constants: UNUSED_CONST"));
    assert!(rendered
        .iter()
        .any(|w| w == "Foo: Found unused enum variants: Codes.Unused"));
}

#[test]
fn update_fields_annotation_is_cross_checked() {
    let result = compile(
        r#"
        Contract Foo(mut x: U256) {
            @using(updateFields = true, checkExternalCaller = false)
            pub fn claims_but_reads() -> U256 { return x }
            @using(checkExternalCaller = false)
            pub fn writes_without_claim(v: U256) -> () {
                x = v
                return
            }
        }
        "#,
    );
    let rendered: Vec<String> = result.warnings.iter().map(|w| w.to_string()).collect();
    assert!(rendered.iter().any(|w| w.starts_with("Foo.claims_but_reads:")
        && w.contains("no fields are updated")));
    assert!(rendered
        .iter()
        .any(|w| w.starts_with("Foo.writes_without_claim:")
            && w.contains("not annotated with updateFields = true")));
}

#[test]
fn missing_caller_check_is_warned() {
    let result = compile(
        r#"
        Contract Foo() {
            pub fn open() -> U256 { return 1 }
        }
        "#,
    );
    assert!(result
        .warnings
        .iter()
        .any(|w| w.to_string().starts_with("Foo.open: No external caller check")));
}

#[test]
fn asset_annotation_mismatches_are_errors() {
    let err = compile_err(
        r#"
        Contract Foo() {
            pub fn spend(amount: U256) -> () {
                transferToken!(callerAddress!(), ALPH, amount)
                return
            }
        }
        "#,
    );
    assert!(err.contains("preapprovedAssets = true"), "got: {err}");

    let err = compile_err(
        r#"
        Contract Foo() {
            @using(assetsInContract = true, checkExternalCaller = false)
            pub fn idle() -> () { return }
        }
        "#,
    );
    assert!(err.contains("does not use contract assets"), "got: {err}");
}

#[test]
fn preapproved_callee_requires_braces() {
    let err = compile_err(
        r#"
        Contract Pool() {
            @using(preapprovedAssets = true, checkExternalCaller = false)
            pub fn add(amount: U256) -> () {
                transferToken!(callerAddress!(), ALPH, amount)
                return
            }
            @using(checkExternalCaller = false)
            pub fn broken(amount: U256) -> () {
                add(amount)
                return
            }
        }
        "#,
    );
    assert!(
        err.contains("needs preapproved assets, please use the braces syntax"),
        "got: {err}"
    );
}

#[test]
fn interface_implementation_keeps_method_indices() {
    let result = compile(
        r#"
        Interface ICounter {
            @using(updateFields = true, checkExternalCaller = false)
            pub fn bump() -> U256
            pub fn read() -> U256
        }
        Contract Counter(mut n: U256) implements ICounter {
            @using(updateFields = true, checkExternalCaller = false)
            pub fn bump() -> U256 {
                n = n + 1
                return n
            }
            pub fn read() -> U256 {
                checkCaller!(true, 0)
                return n
            }
        }
        TxScript Drive(counter: ICounter) {
            let value = counter.bump()
            assert!(value > 0, 0)
        }
        "#,
    );
    // `bump` is method 0 through the interface table.
    let main = &result.scripts[0].code.methods()[0];
    assert!(main.instrs.contains(&Instr::CallExternal(0)));
}
