//! End-to-end interpreter scenarios: parsing real script shapes,
//! spend verification, resource limits.

use bitcoin_script_engine::{
    NullChecker, OwnedScript, PushKind, ScriptBuilder, ScriptElem, ScriptError, ScriptPubKey,
    Stack, TransactionChecker, VerifyFlags, eval_script, opcodes, verify_script,
};
use bitcoin_hashes::{Hash, hash160, sha256};
use hex_literal::hex;

fn accept_pair(
    sig: Vec<u8>,
    key: Vec<u8>,
) -> TransactionChecker<impl Fn(&[u8], &[u8], &[u8]) -> bool> {
    TransactionChecker {
        version: 2,
        lock_time: 0,
        sequence: 0,
        verify: move |pub_key: &[u8], sig_bytes: &[u8], _code: &[u8]| {
            pub_key == key && sig_bytes == sig
        },
    }
}

fn dummy_sig(len: usize) -> Vec<u8> {
    // DER skeleton of the requested total length, sighash byte included
    let (r_len, s_len) = match len {
        71 => (32, 32),
        72 => (33, 32),
        _ => panic!("unsupported signature length"),
    };
    let mut sig = vec![0x30, (len - 3) as u8, 0x02, r_len as u8];
    if r_len == 33 {
        sig.push(0x00);
        sig.push(0x80);
        sig.extend([0x11; 31]);
    } else {
        sig.push(0x11);
        sig.extend([0x11; 31]);
    }
    sig.push(0x02);
    sig.push(s_len as u8);
    sig.push(0x22);
    sig.extend([0x22; 31]);
    sig.push(0x01);
    assert_eq!(sig.len(), len);
    sig
}

fn dummy_key(first: u8) -> Vec<u8> {
    let mut key = vec![0x02];
    key.push(first);
    key.extend([0x33; 31]);
    key
}

#[test]
fn test_p2sh_multisig_script_sig_parses() {
    // OP_0, two signature pushes, and an OP_PUSHDATA1 of the 105-byte
    // 2-of-3 redeem script
    let redeem = ScriptBuilder::new()
        .push_opcode(opcodes::OP_2)
        .push_slice(&dummy_key(0xaa))
        .push_slice(&dummy_key(0xbb))
        .push_slice(&dummy_key(0xcc))
        .push_opcode(opcodes::OP_3)
        .push_opcode(opcodes::OP_CHECKMULTISIG)
        .into_bytes();
    assert_eq!(redeem.len(), 105);

    let mut script_sig = vec![0x00];
    script_sig.push(0x47);
    script_sig.extend(dummy_sig(71));
    script_sig.push(0x48);
    script_sig.extend(dummy_sig(72));
    script_sig.push(0x4c);
    script_sig.push(0x69);
    script_sig.extend(&redeem);

    let parsed = OwnedScript::parse_from_bytes(&script_sig).unwrap();
    assert_eq!(parsed.len(), 4);
    assert_eq!(parsed[0], ScriptElem::Op(opcodes::OP_0));
    assert!(matches!(parsed[1], ScriptElem::Push(PushKind::Direct, data) if data.len() == 71));
    assert!(matches!(parsed[2], ScriptElem::Push(PushKind::Direct, data) if data.len() == 72));
    assert!(matches!(parsed[3], ScriptElem::Push(PushKind::Data1, data) if data.len() == 105));
    assert_eq!(parsed.to_bytes(), script_sig);

    // the pushed redeem script is itself the multisig template
    let ScriptElem::Push(_, redeem_bytes) = parsed[3] else {
        panic!("wrong token");
    };
    let ScriptPubKey::Multisig { required, pub_keys } = ScriptPubKey::from_bytes(redeem_bytes)
    else {
        panic!("not a multisig template");
    };
    assert_eq!(required, 2);
    assert_eq!(pub_keys.len(), 3);
}

#[test]
fn test_op_dup_on_prepared_stack() {
    let stack = Stack::from_items(vec![vec![0xab]]);
    let stack = eval_script(&[0x76], stack, VerifyFlags::NONE, &NullChecker).unwrap();

    assert_eq!(stack.len(), 2);
    assert_eq!(stack.get_back(0).unwrap(), &[0xab]);
    assert_eq!(stack.get_back(1).unwrap(), &[0xab]);
}

#[test]
fn test_checkmultisig_one_of_two() {
    let sig1 = dummy_sig(71);
    let pk1 = dummy_key(0x01);
    let pk2 = dummy_key(0x02);

    let checker = accept_pair(sig1.clone(), pk2.clone());

    let stack = Stack::from_items(vec![
        vec![],
        sig1,
        vec![1],
        pk1,
        pk2,
        vec![2],
    ]);
    let stack = eval_script(&[0xae], stack, VerifyFlags::NONE, &checker).unwrap();

    assert_eq!(stack.len(), 1);
    assert_eq!(stack.get_back(0).unwrap(), &[1]);
}

#[test]
fn test_checkmultisig_requires_key_order() {
    let sig1 = dummy_sig(71);
    let pk1 = dummy_key(0x01);
    let pk2 = dummy_key(0x02);

    // the only valid pairing is with the bottom key; scanning burns
    // pk2 first, so the signature can never match
    let checker = accept_pair(sig1.clone(), pk1.clone());

    // 1-of-2 succeeds: the scan reaches pk1 after burning pk2
    let stack = Stack::from_items(vec![vec![], sig1.clone(), vec![1], pk1, pk2, vec![2]]);
    let stack = eval_script(&[0xae], stack, VerifyFlags::NONE, &checker).unwrap();
    assert_eq!(stack.get_back(0).unwrap(), &[1]);

    // 2-of-2 with one matching pair fails
    let sig2 = dummy_sig(72);
    let pk1 = dummy_key(0x01);
    let pk2 = dummy_key(0x02);
    let checker = accept_pair(sig2.clone(), pk1.clone());
    let stack = Stack::from_items(vec![vec![], sig2.clone(), sig2, vec![2], pk1, pk2, vec![2]]);
    let stack = eval_script(&[0xae], stack, VerifyFlags::NONE, &checker).unwrap();
    assert_eq!(stack.get_back(0).unwrap(), &Vec::<u8>::new());
}

#[test]
fn test_checkmultisig_null_dummy() {
    let checker = NullChecker;

    // 0-of-1 multisig: succeeds with no signatures at all
    let script = ScriptBuilder::new()
        .push_opcode(opcodes::OP_0)
        .push_opcode(opcodes::OP_0)
        .push_slice(&dummy_key(0x01))
        .push_opcode(opcodes::OP_1)
        .push_opcode(opcodes::OP_CHECKMULTISIG)
        .into_bytes();
    let stack = eval_script(&script, Stack::new(), VerifyFlags::NONE, &checker).unwrap();
    assert_eq!(stack.get_back(0).unwrap(), &[1]);

    // a non-empty dummy is fatal under NULLDUMMY
    let script = ScriptBuilder::new()
        .push_opcode(opcodes::OP_1)
        .push_opcode(opcodes::OP_0)
        .push_slice(&dummy_key(0x01))
        .push_opcode(opcodes::OP_1)
        .push_opcode(opcodes::OP_CHECKMULTISIG)
        .into_bytes();
    assert_eq!(
        eval_script(&script, Stack::new(), VerifyFlags::NULLDUMMY, &checker).unwrap_err(),
        ScriptError::SigNullDummy
    );
    assert!(eval_script(&script, Stack::new(), VerifyFlags::NONE, &checker).is_ok());
}

#[test]
fn test_checkmultisig_count_limits() {
    // 21 keys exceed the per-multisig pubkey bound
    let mut builder = ScriptBuilder::new().push_opcode(opcodes::OP_0).push_int(0);
    for _ in 0..21 {
        builder = builder.push_slice(&dummy_key(0x01));
    }
    let script = builder
        .push_int(21)
        .push_opcode(opcodes::OP_CHECKMULTISIG)
        .into_bytes();
    assert_eq!(
        eval_script(&script, Stack::new(), VerifyFlags::NONE, &NullChecker).unwrap_err(),
        ScriptError::PubKeyCount
    );

    // more signatures than keys
    let script = ScriptBuilder::new()
        .push_opcode(opcodes::OP_0)
        .push_int(2)
        .push_slice(&dummy_key(0x01))
        .push_int(1)
        .push_opcode(opcodes::OP_CHECKMULTISIG)
        .into_bytes();
    assert_eq!(
        eval_script(&script, Stack::new(), VerifyFlags::NONE, &NullChecker).unwrap_err(),
        ScriptError::SigCount
    );
}

#[test]
fn test_disabled_opcode_rejected_unexecuted() {
    // 0 OP_IF 0 OP_CAT OP_ENDIF: the branch never runs, the script
    // still fails
    let script = [0x00, 0x63, 0x00, 0x7e, 0x68];
    assert_eq!(
        eval_script(&script, Stack::new(), VerifyFlags::NONE, &NullChecker).unwrap_err(),
        ScriptError::DisabledOpcode
    );
}

#[test]
fn test_script_size_limit() {
    let script = vec![0x61; 10_001];
    assert_eq!(
        eval_script(&script, Stack::new(), VerifyFlags::NONE, &NullChecker).unwrap_err(),
        ScriptError::ScriptSize
    );
    // 10,000 NOPs still die, but on the opcode budget
    let script = vec![0x61; 10_000];
    assert_eq!(
        eval_script(&script, Stack::new(), VerifyFlags::NONE, &NullChecker).unwrap_err(),
        ScriptError::OpCount
    );
}

#[test]
fn test_op_count_limit() {
    // 201 non-push opcodes pass, 202 fail
    let mut script = vec![0x51];
    script.extend(vec![0x76; 200]); // 200 OP_DUPs
    script.push(0x69); // one OP_VERIFY: 201 in total
    let stack = eval_script(&script, Stack::new(), VerifyFlags::NONE, &NullChecker).unwrap();
    assert_eq!(stack.len(), 200);

    let mut script = vec![0x51];
    script.extend(vec![0x76; 201]);
    script.push(0x69);
    assert_eq!(
        eval_script(&script, Stack::new(), VerifyFlags::NONE, &NullChecker).unwrap_err(),
        ScriptError::OpCount
    );
}

#[test]
fn test_push_size_limit() {
    let mut script = vec![0x4d, 0x09, 0x02]; // OP_PUSHDATA2, 521
    script.extend(vec![0u8; 521]);
    assert_eq!(
        eval_script(&script, Stack::new(), VerifyFlags::NONE, &NullChecker).unwrap_err(),
        ScriptError::PushSize
    );

    let mut script = vec![0x4d, 0x08, 0x02]; // OP_PUSHDATA2, 520
    script.extend(vec![0u8; 520]);
    assert!(eval_script(&script, Stack::new(), VerifyFlags::NONE, &NullChecker).is_ok());
}

#[test]
fn test_stack_size_limit() {
    // 500 pushes and 500 OP_2DUPs overflow the combined stack bound
    let mut script = vec![0x51, 0x51];
    script.extend(vec![0x6e; 499]); // stack: 2 + 2*499 = 1000, fine
    assert!(eval_script(&script, Stack::new(), VerifyFlags::NONE, &NullChecker).is_ok());

    script.push(0x6e); // 1002
    assert_eq!(
        eval_script(&script, Stack::new(), VerifyFlags::NONE, &NullChecker).unwrap_err(),
        ScriptError::StackSize
    );
}

#[test]
fn test_verify_p2pkh_spend() {
    let key = dummy_key(0x42);
    let sig = dummy_sig(71);
    let pkh = hash160::Hash::hash(&key).to_byte_array();

    let script_pubkey = ScriptPubKey::P2pkh { pub_key_hash: pkh }.to_bytes();
    let script_sig = ScriptBuilder::new()
        .push_slice(&sig)
        .push_slice(&key)
        .into_bytes();

    let checker = accept_pair(sig.clone(), key.clone());
    verify_script(&script_sig, &script_pubkey, &[], VerifyFlags::NONE, &checker).unwrap();

    // wrong key hash
    let other = ScriptPubKey::P2pkh {
        pub_key_hash: hash160::Hash::hash(b"nope").to_byte_array(),
    }
    .to_bytes();
    assert_eq!(
        verify_script(&script_sig, &other, &[], VerifyFlags::NONE, &checker).unwrap_err(),
        ScriptError::EqualVerify
    );

    // oracle rejects: CHECKSIG pushes false, verdict is a false stack
    let bad_checker = accept_pair(dummy_sig(72), key);
    assert_eq!(
        verify_script(&script_sig, &script_pubkey, &[], VerifyFlags::NONE, &bad_checker)
            .unwrap_err(),
        ScriptError::EvalFalse
    );
}

#[test]
fn test_verify_p2sh_spend() {
    let redeem = ScriptBuilder::new().push_opcode(opcodes::OP_1).into_bytes();
    let script_pubkey = ScriptPubKey::p2sh_from_script(&redeem).to_bytes();
    let script_sig = ScriptBuilder::new().push_slice(&redeem).into_bytes();

    verify_script(
        &script_sig,
        &script_pubkey,
        &[],
        VerifyFlags::P2SH,
        &NullChecker,
    )
    .unwrap();

    // without the P2SH flag only the outer hash check runs
    verify_script(&script_sig, &script_pubkey, &[], VerifyFlags::NONE, &NullChecker).unwrap();

    // a redeem script evaluating false fails the inner evaluation
    let false_redeem = ScriptBuilder::new().push_opcode(opcodes::OP_0).into_bytes();
    let script_pubkey = ScriptPubKey::p2sh_from_script(&false_redeem).to_bytes();
    let script_sig = ScriptBuilder::new().push_slice(&false_redeem).into_bytes();
    assert_eq!(
        verify_script(
            &script_sig,
            &script_pubkey,
            &[],
            VerifyFlags::P2SH,
            &NullChecker
        )
        .unwrap_err(),
        ScriptError::EvalFalse
    );

    // non-push scriptSig spending P2SH: "1 OP_DROP <redeem>"
    let script_pubkey = ScriptPubKey::p2sh_from_script(&redeem).to_bytes();
    let mut script_sig = vec![0x51, 0x75];
    script_sig.extend(ScriptBuilder::new().push_slice(&redeem).into_bytes());
    assert_eq!(
        verify_script(
            &script_sig,
            &script_pubkey,
            &[],
            VerifyFlags::P2SH,
            &NullChecker
        )
        .unwrap_err(),
        ScriptError::SigPushOnly
    );
}

#[test]
fn test_verify_p2wpkh_spend() {
    let key = dummy_key(0x42);
    let sig = dummy_sig(71);
    let spk = ScriptPubKey::p2wpkh_from_key(&key);
    let script_pubkey = spk.to_bytes();
    let witness = vec![sig.clone(), key.clone()];

    let checker = accept_pair(sig, key);
    verify_script(
        &[],
        &script_pubkey,
        &witness,
        VerifyFlags::WITNESS,
        &checker,
    )
    .unwrap();

    // a scriptSig on a native witness output is malleation
    assert_eq!(
        verify_script(
            &[0x51],
            &script_pubkey,
            &witness,
            VerifyFlags::WITNESS,
            &checker
        )
        .unwrap_err(),
        ScriptError::WitnessMalleated
    );

    // wrong witness stack arity
    assert_eq!(
        verify_script(
            &[],
            &script_pubkey,
            &witness[1..].to_vec(),
            VerifyFlags::WITNESS,
            &checker
        )
        .unwrap_err(),
        ScriptError::WitnessProgramMismatch
    );
}

#[test]
fn test_verify_p2wsh_spend() {
    let witness_script = ScriptBuilder::new().push_opcode(opcodes::OP_1).into_bytes();
    let script_pubkey = ScriptPubKey::p2wsh_from_script(&witness_script).to_bytes();

    verify_script(
        &[],
        &script_pubkey,
        &[witness_script.clone()],
        VerifyFlags::WITNESS,
        &NullChecker,
    )
    .unwrap();

    // empty witness stack
    assert_eq!(
        verify_script(&[], &script_pubkey, &[], VerifyFlags::WITNESS, &NullChecker)
            .unwrap_err(),
        ScriptError::WitnessProgramWitnessEmpty
    );

    // witness script not matching the program hash
    assert_eq!(
        verify_script(
            &[],
            &script_pubkey,
            &[vec![0x52]],
            VerifyFlags::WITNESS,
            &NullChecker
        )
        .unwrap_err(),
        ScriptError::WitnessProgramMismatch
    );

    // witness script leaving two stack elements fails the one-element rule
    let two_items = ScriptBuilder::new()
        .push_opcode(opcodes::OP_1)
        .push_opcode(opcodes::OP_1)
        .into_bytes();
    let script_pubkey = ScriptPubKey::p2wsh_from_script(&two_items).to_bytes();
    assert_eq!(
        verify_script(
            &[],
            &script_pubkey,
            &[two_items.clone()],
            VerifyFlags::WITNESS,
            &NullChecker
        )
        .unwrap_err(),
        ScriptError::EvalFalse
    );
}

#[test]
fn test_witness_program_lengths_and_versions() {
    // v0 with a 24-byte program
    let mut script_pubkey = vec![0x00, 0x18];
    script_pubkey.extend([0x07; 24]);
    assert_eq!(
        verify_script(&[], &script_pubkey, &[], VerifyFlags::WITNESS, &NullChecker)
            .unwrap_err(),
        ScriptError::WitnessProgramWrongLength
    );

    // future version: anyone can spend, unless discouraged
    let mut script_pubkey = vec![0x51, 0x20];
    script_pubkey.extend([0x07; 32]);
    verify_script(&[], &script_pubkey, &[], VerifyFlags::WITNESS, &NullChecker).unwrap();
    assert_eq!(
        verify_script(
            &[],
            &script_pubkey,
            &[],
            VerifyFlags::WITNESS | VerifyFlags::DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM,
            &NullChecker
        )
        .unwrap_err(),
        ScriptError::DiscourageUpgradableWitnessProgram
    );

    // witness items for a non-witness output
    let script_sig = ScriptBuilder::new().push_int(1).into_bytes();
    let anyone_can_spend = ScriptBuilder::new().push_int(1).into_bytes();
    assert_eq!(
        verify_script(
            &script_sig,
            &anyone_can_spend,
            &[vec![0x01]],
            VerifyFlags::WITNESS,
            &NullChecker
        )
        .unwrap_err(),
        ScriptError::WitnessUnexpected
    );
}

#[test]
fn test_locktime_opcodes() {
    let checker = TransactionChecker {
        version: 2,
        lock_time: 600_000,
        sequence: 5,
        verify: |_: &[u8], _: &[u8], _: &[u8]| false,
    };
    let flags = VerifyFlags::CHECKLOCKTIMEVERIFY | VerifyFlags::CHECKSEQUENCEVERIFY;

    // <500000> OP_CLTV OP_DROP OP_1
    let script = ScriptBuilder::new()
        .push_int(500_000)
        .push_opcode(opcodes::OP_CHECKLOCKTIMEVERIFY)
        .push_opcode(opcodes::OP_DROP)
        .push_int(1)
        .into_bytes();
    let stack = eval_script(&script, Stack::new(), flags, &checker).unwrap();
    assert_eq!(stack.get_back(0).unwrap(), &[1]);

    // locktime above the transaction's fails
    let script = ScriptBuilder::new()
        .push_int(700_000)
        .push_opcode(opcodes::OP_CHECKLOCKTIMEVERIFY)
        .into_bytes();
    assert_eq!(
        eval_script(&script, Stack::new(), flags, &checker).unwrap_err(),
        ScriptError::UnsatisfiedLocktime
    );

    // negative operand
    let script = ScriptBuilder::new()
        .push_int(-1)
        .push_opcode(opcodes::OP_CHECKLOCKTIMEVERIFY)
        .into_bytes();
    assert_eq!(
        eval_script(&script, Stack::new(), flags, &checker).unwrap_err(),
        ScriptError::NegativeLocktime
    );

    // without its flag the opcode is a NOP
    let script = ScriptBuilder::new()
        .push_int(1)
        .push_int(700_000)
        .push_opcode(opcodes::OP_CHECKLOCKTIMEVERIFY)
        .into_bytes();
    assert!(eval_script(&script, Stack::new(), VerifyFlags::NONE, &checker).is_ok());

    // sequence: satisfied and unsatisfied
    let script = ScriptBuilder::new()
        .push_int(4)
        .push_opcode(opcodes::OP_CHECKSEQUENCEVERIFY)
        .into_bytes();
    assert!(eval_script(&script, Stack::new(), flags, &checker).is_ok());

    let script = ScriptBuilder::new()
        .push_int(6)
        .push_opcode(opcodes::OP_CHECKSEQUENCEVERIFY)
        .into_bytes();
    assert_eq!(
        eval_script(&script, Stack::new(), flags, &checker).unwrap_err(),
        ScriptError::UnsatisfiedLocktime
    );

    // disable bit on the operand turns CSV into a NOP
    let script = ScriptBuilder::new()
        .push_int(1i64 << 31)
        .push_opcode(opcodes::OP_CHECKSEQUENCEVERIFY)
        .into_bytes();
    assert!(eval_script(&script, Stack::new(), flags, &checker).is_ok());
}

#[test]
fn test_signature_encoding_flags() {
    let key = dummy_key(0x42);
    // not DER at all
    let sig = vec![0xff; 70];

    let script = ScriptBuilder::new()
        .push_slice(&sig)
        .push_slice(&key)
        .push_opcode(opcodes::OP_CHECKSIG)
        .into_bytes();

    assert_eq!(
        eval_script(&script, Stack::new(), VerifyFlags::DERSIG, &NullChecker).unwrap_err(),
        ScriptError::SigDer
    );

    // without the flag the oracle just rejects and CHECKSIG pushes false
    let stack = eval_script(&script, Stack::new(), VerifyFlags::NONE, &NullChecker).unwrap();
    assert_eq!(stack.get_back(0).unwrap(), &Vec::<u8>::new());

    // STRICTENC rejects a malformed key even with a valid-format signature
    let script = ScriptBuilder::new()
        .push_slice(&dummy_sig(71))
        .push_slice(&[0x05; 33])
        .push_opcode(opcodes::OP_CHECKSIG)
        .into_bytes();
    assert_eq!(
        eval_script(&script, Stack::new(), VerifyFlags::STRICTENC, &NullChecker).unwrap_err(),
        ScriptError::PubKeyType
    );
}

#[test]
fn test_minimal_data_flag() {
    // 1-byte push of 0x07 should have been OP_7
    let script = [0x01, 0x07];
    assert_eq!(
        eval_script(&script, Stack::new(), VerifyFlags::MINIMALDATA, &NullChecker)
            .unwrap_err(),
        ScriptError::MinimalData
    );
    assert!(eval_script(&script, Stack::new(), VerifyFlags::NONE, &NullChecker).is_ok());

    // non-minimal number operand
    let script = [0x02, 0x01, 0x00, 0x8b]; // <0100> OP_1ADD
    assert_eq!(
        eval_script(&script, Stack::new(), VerifyFlags::MINIMALDATA, &NullChecker)
            .unwrap_err(),
        ScriptError::MinimalData
    );
    let stack = eval_script(&script, Stack::new(), VerifyFlags::NONE, &NullChecker).unwrap();
    assert_eq!(stack.get_back(0).unwrap(), &[2]);
}

#[test]
fn test_stack_op_schemas() {
    // Each case: opcode byte, stack before (bottom to top), stack after.
    let a = || vec![0x0a];
    let b = || vec![0x0b];
    let c = || vec![0x0c];
    let d = || vec![0x0d];
    let e = || vec![0x0e];
    let f = || vec![0x0f];

    let cases: &[(u8, Vec<Vec<u8>>, Vec<Vec<u8>>)] = &[
        // OP_DUP: a -> a a
        (0x76, vec![a()], vec![a(), a()]),
        // OP_IFDUP: truthy duplicated, falsy untouched
        (0x73, vec![a()], vec![a(), a()]),
        (0x73, vec![vec![]], vec![vec![]]),
        // OP_DEPTH
        (0x74, vec![a(), b()], vec![a(), b(), vec![2]]),
        // OP_DROP
        (0x75, vec![a(), b()], vec![a()]),
        // OP_NIP: a b -> b
        (0x77, vec![a(), b()], vec![b()]),
        // OP_OVER: a b -> a b a
        (0x78, vec![a(), b()], vec![a(), b(), a()]),
        // OP_PICK: x2 x1 x0 n -> x2 x1 x0 x_n
        (0x79, vec![a(), b(), c(), vec![2]], vec![a(), b(), c(), a()]),
        // OP_ROLL: removes x_n
        (0x7a, vec![a(), b(), c(), vec![2]], vec![b(), c(), a()]),
        // OP_ROT: a b c -> b c a
        (0x7b, vec![a(), b(), c()], vec![b(), c(), a()]),
        // OP_SWAP: a b -> b a
        (0x7c, vec![a(), b()], vec![b(), a()]),
        // OP_TUCK: a b -> b a b
        (0x7d, vec![a(), b()], vec![b(), a(), b()]),
        // OP_2DROP
        (0x6d, vec![a(), b(), c()], vec![a()]),
        // OP_2DUP: a b -> a b a b
        (0x6e, vec![a(), b()], vec![a(), b(), a(), b()]),
        // OP_3DUP: a b c -> a b c a b c
        (0x6f, vec![a(), b(), c()], vec![a(), b(), c(), a(), b(), c()]),
        // OP_2OVER: a b c d -> a b c d a b
        (0x70, vec![a(), b(), c(), d()], vec![a(), b(), c(), d(), a(), b()]),
        // OP_2ROT: a b c d e f -> c d e f a b
        (
            0x71,
            vec![a(), b(), c(), d(), e(), f()],
            vec![c(), d(), e(), f(), a(), b()],
        ),
        // OP_2SWAP: a b c d -> c d a b
        (0x72, vec![a(), b(), c(), d()], vec![c(), d(), a(), b()]),
    ];

    for (opcode, before, after) in cases {
        let stack = Stack::from_items(before.clone());
        let stack = eval_script(&[*opcode], stack, VerifyFlags::NONE, &NullChecker)
            .unwrap_or_else(|err| panic!("opcode 0x{opcode:02x} failed: {err}"));
        assert_eq!(
            &stack.into_items(),
            after,
            "opcode 0x{opcode:02x} schema mismatch"
        );
    }

    // alt-stack transfer: OP_TOALTSTACK then OP_FROMALTSTACK restores
    let stack = Stack::from_items(vec![a(), b()]);
    let stack = eval_script(&[0x6b, 0x6c], stack, VerifyFlags::NONE, &NullChecker).unwrap();
    assert_eq!(stack.into_items(), vec![a(), b()]);

    // underflow probes for the deepest requirement of each opcode
    for (opcode, depth) in [
        (0x76u8, 0usize), // OP_DUP
        (0x77, 1),        // OP_NIP
        (0x78, 1),        // OP_OVER
        (0x7b, 2),        // OP_ROT
        (0x7d, 1),        // OP_TUCK
        (0x6f, 2),        // OP_3DUP
        (0x70, 3),        // OP_2OVER
        (0x71, 5),        // OP_2ROT
        (0x72, 3),        // OP_2SWAP
    ] {
        let stack = Stack::from_items(vec![vec![0x01]; depth]);
        assert_eq!(
            eval_script(&[opcode], stack, VerifyFlags::NONE, &NullChecker).unwrap_err(),
            ScriptError::InvalidStackOperation,
            "opcode 0x{opcode:02x} with {depth} items"
        );
    }
}

#[test]
fn test_spec_hash_opcodes() {
    // OP_SHA256 of "abc"
    let script = ScriptBuilder::new()
        .push_slice(b"abc")
        .push_opcode(opcodes::OP_SHA256)
        .into_bytes();
    let stack = eval_script(&script, Stack::new(), VerifyFlags::NONE, &NullChecker).unwrap();
    assert_eq!(
        stack.get_back(0).unwrap().as_slice(),
        hex!("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
    );

    // OP_HASH160 composes SHA256 and RIPEMD160
    let script = ScriptBuilder::new()
        .push_slice(b"abc")
        .push_opcode(opcodes::OP_HASH160)
        .into_bytes();
    let stack = eval_script(&script, Stack::new(), VerifyFlags::NONE, &NullChecker).unwrap();
    let expected = {
        let sha = sha256::Hash::hash(b"abc").to_byte_array();
        bitcoin_hashes::ripemd160::Hash::hash(&sha).to_byte_array()
    };
    assert_eq!(stack.get_back(0).unwrap().as_slice(), expected);
}
