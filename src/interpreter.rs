//! The script execution engine: an explicit loop over parsed tokens
//! carrying the whole program state by value.

use crate::condition_stack::ConditionStack;
use crate::context::{SignatureChecker, VerifyFlags};
use crate::opcode::{Opcode, opcodes};
use crate::script::convert::{decode_bool, decode_int, encode_bool, encode_int_vec};
use crate::script::stack::Stack;
use crate::script::{OwnedScript, ScriptBuilder, ScriptElem, is_minimal_push};
use crate::script_error::ScriptError;
use crate::script_pubkey::{parse_witness_program_bytes, is_p2sh_bytes};
use crate::util::checksig::{
    check_sighash_type, is_low_der_signature, is_valid_signature_encoding, pub_key_encoding,
};
use crate::util::locktime::SEQUENCE_LOCKTIME_DISABLE_FLAG;
use bitcoin_hashes::{Hash, hash160, ripemd160, sha1, sha256, sha256d};

pub const MAX_SCRIPT_SIZE: usize = 10_000;
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;
pub const MAX_STACK_SIZE: usize = 1_000;
pub const MAX_OPS_PER_SCRIPT: usize = 201;
pub const MAX_PUBKEYS_PER_MULTISIG: i64 = 20;

/// Execution state of one script. Constructed with the initial stack,
/// driven to completion by [`ScriptProgram::run`].
pub struct ScriptProgram<'a> {
    script: OwnedScript<'a>,
    script_code: &'a [u8],
    offset: usize,
    stack: Stack,
    alt_stack: Stack,
    cs: ConditionStack,
    flags: VerifyFlags,
    op_count: usize,
}

impl<'a> ScriptProgram<'a> {
    pub fn new(
        script_bytes: &'a [u8],
        stack: Stack,
        flags: VerifyFlags,
    ) -> Result<Self, ScriptError> {
        if script_bytes.len() > MAX_SCRIPT_SIZE {
            return Err(ScriptError::ScriptSize);
        }

        let script = OwnedScript::parse_from_bytes(script_bytes)
            .map_err(|_| ScriptError::BadOpcode)?;

        Ok(Self {
            script,
            script_code: script_bytes,
            offset: 0,
            stack,
            alt_stack: Stack::new(),
            cs: ConditionStack::new(),
            flags,
            op_count: 0,
        })
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    fn require_minimal(&self) -> bool {
        self.flags.contains(VerifyFlags::MINIMALDATA)
    }

    /// Runs the program to completion and returns the final stack.
    ///
    /// The final stack's truthiness is the caller's concern; this only
    /// reports execution failures.
    pub fn run(mut self, checker: &dyn SignatureChecker) -> Result<Stack, ScriptError> {
        while self.offset < self.script.len() {
            let f_exec = self.cs.all_true();
            let elem = self.script[self.offset];
            self.offset += 1;

            if let ScriptElem::Op(op) = elem {
                // Disabled opcodes fail wherever they appear, executed
                // or not (CVE-2010-5137).
                if op.is_disabled() {
                    return Err(ScriptError::DisabledOpcode);
                }
                if !op.is_push() {
                    self.op_count += 1;
                    if self.op_count > MAX_OPS_PER_SCRIPT {
                        return Err(ScriptError::OpCount);
                    }
                }
            }

            match elem {
                ScriptElem::Push(kind, data) => {
                    if data.len() > MAX_SCRIPT_ELEMENT_SIZE {
                        return Err(ScriptError::PushSize);
                    }
                    if f_exec {
                        if self.require_minimal() && !is_minimal_push(kind, data) {
                            return Err(ScriptError::MinimalData);
                        }
                        self.stack.push(data.to_vec());
                    }
                }
                ScriptElem::Op(op) => {
                    if f_exec || op.is_conditional() {
                        self.exec_opcode(op, f_exec, checker)?;
                    }
                }
            }

            if self.stack.len() + self.alt_stack.len() > MAX_STACK_SIZE {
                return Err(ScriptError::StackSize);
            }
        }

        if !self.cs.is_empty() {
            return Err(ScriptError::UnbalancedConditional);
        }

        Ok(self.stack)
    }

    fn exec_opcode(
        &mut self,
        op: Opcode,
        f_exec: bool,
        checker: &dyn SignatureChecker,
    ) -> Result<(), ScriptError> {
        match op {
            _ if op.small_int_value().is_some() => {
                let n = op.small_int_value().unwrap();
                self.stack.push(encode_int_vec(n));
            }

            opcodes::OP_NOP => {}

            opcodes::OP_IF | opcodes::OP_NOTIF => {
                if f_exec {
                    let [elem] = self
                        .stack
                        .pop()
                        .map_err(|_| ScriptError::UnbalancedConditional)?;
                    if self.flags.contains(VerifyFlags::MINIMALIF)
                        && !(elem.is_empty() || elem == [1])
                    {
                        return Err(ScriptError::MinimalIf);
                    }
                    let mut value = decode_bool(&elem);
                    if op == opcodes::OP_NOTIF {
                        value = !value;
                    }
                    self.cs.push_back(value);
                } else {
                    self.cs.push_back(false);
                }
            }

            opcodes::OP_ELSE => {
                if self.cs.is_empty() {
                    return Err(ScriptError::UnbalancedConditional);
                }
                self.cs.toggle_top();
            }

            opcodes::OP_ENDIF => {
                if self.cs.is_empty() {
                    return Err(ScriptError::UnbalancedConditional);
                }
                self.cs.pop_back();
            }

            opcodes::OP_VERIFY => {
                let [elem] = self.stack.pop()?;
                if !decode_bool(&elem) {
                    return Err(ScriptError::Verify);
                }
            }

            opcodes::OP_RETURN => {
                return Err(ScriptError::OpReturn);
            }

            opcodes::OP_TOALTSTACK => {
                let [elem] = self.stack.pop()?;
                self.alt_stack.push(elem);
            }

            opcodes::OP_FROMALTSTACK => {
                let [elem] = self
                    .alt_stack
                    .pop()
                    .map_err(|_| ScriptError::InvalidAltstackOperation)?;
                self.stack.push(elem);
            }

            opcodes::OP_2DROP => {
                self.stack.pop::<2>()?;
            }

            opcodes::OP_2DUP => {
                self.stack.extend_from_within_back(2, 0)?;
            }

            opcodes::OP_3DUP => {
                self.stack.extend_from_within_back(3, 0)?;
            }

            opcodes::OP_2OVER => {
                self.stack.extend_from_within_back(2, 2)?;
            }

            opcodes::OP_2ROT => {
                let x1 = self.stack.remove_back(5)?;
                let x2 = self.stack.remove_back(4)?;
                self.stack.push(x1);
                self.stack.push(x2);
            }

            opcodes::OP_2SWAP => {
                self.stack.swap_back(0, 2)?;
                self.stack.swap_back(1, 3)?;
            }

            opcodes::OP_IFDUP => {
                let elem = self.stack.get_back(0)?;
                if decode_bool(elem) {
                    let elem = elem.clone();
                    self.stack.push(elem);
                }
            }

            opcodes::OP_DEPTH => {
                self.stack.push(encode_int_vec(self.stack.len() as i64));
            }

            opcodes::OP_DROP => {
                self.stack.pop::<1>()?;
            }

            opcodes::OP_DUP => {
                self.stack.extend_from_within_back(1, 0)?;
            }

            opcodes::OP_NIP => {
                self.stack.remove_back(1)?;
            }

            opcodes::OP_OVER => {
                self.stack.extend_from_within_back(1, 1)?;
            }

            opcodes::OP_PICK | opcodes::OP_ROLL => {
                let index = self.num_from_stack()?;
                if index < 0 || index as usize >= self.stack.len() {
                    return Err(ScriptError::InvalidStackOperation);
                }
                let index = index as usize;
                let elem = match op {
                    opcodes::OP_PICK => self.stack.get_back(index)?.clone(),
                    _ => self.stack.remove_back(index)?,
                };
                self.stack.push(elem);
            }

            opcodes::OP_ROT => {
                self.stack.swap_back(2, 1)?;
                self.stack.swap_back(1, 0)?;
            }

            opcodes::OP_SWAP => {
                self.stack.swap_back(0, 1)?;
            }

            opcodes::OP_TUCK => {
                self.stack.swap_back(0, 1)?;
                self.stack.extend_from_within_back(1, 1)?;
            }

            opcodes::OP_SIZE => {
                let size = self.stack.get_back(0)?.len();
                self.stack.push(encode_int_vec(size as i64));
            }

            opcodes::OP_EQUAL | opcodes::OP_EQUALVERIFY => {
                let [a, b] = self.stack.pop()?;
                let equal = a == b;
                self.stack.push(encode_bool(equal));
                if op == opcodes::OP_EQUALVERIFY {
                    self.verify_top(ScriptError::EqualVerify)?;
                }
            }

            opcodes::OP_1ADD
            | opcodes::OP_1SUB
            | opcodes::OP_NEGATE
            | opcodes::OP_ABS
            | opcodes::OP_NOT
            | opcodes::OP_0NOTEQUAL => {
                let a = self.num_from_stack()?;
                let result = match op {
                    opcodes::OP_1ADD => a + 1,
                    opcodes::OP_1SUB => a - 1,
                    opcodes::OP_NEGATE => -a,
                    opcodes::OP_ABS => a.abs(),
                    opcodes::OP_NOT => (a == 0) as i64,
                    _ => (a != 0) as i64,
                };
                self.stack.push(encode_int_vec(result));
            }

            opcodes::OP_ADD
            | opcodes::OP_SUB
            | opcodes::OP_BOOLAND
            | opcodes::OP_BOOLOR
            | opcodes::OP_NUMEQUAL
            | opcodes::OP_NUMEQUALVERIFY
            | opcodes::OP_NUMNOTEQUAL
            | opcodes::OP_LESSTHAN
            | opcodes::OP_GREATERTHAN
            | opcodes::OP_LESSTHANOREQUAL
            | opcodes::OP_GREATERTHANOREQUAL
            | opcodes::OP_MIN
            | opcodes::OP_MAX => {
                let b = self.num_from_stack()?;
                let a = self.num_from_stack()?;
                let result = match op {
                    opcodes::OP_ADD => a + b,
                    opcodes::OP_SUB => a - b,
                    opcodes::OP_BOOLAND => (a != 0 && b != 0) as i64,
                    opcodes::OP_BOOLOR => (a != 0 || b != 0) as i64,
                    opcodes::OP_NUMEQUAL | opcodes::OP_NUMEQUALVERIFY => (a == b) as i64,
                    opcodes::OP_NUMNOTEQUAL => (a != b) as i64,
                    opcodes::OP_LESSTHAN => (a < b) as i64,
                    opcodes::OP_GREATERTHAN => (a > b) as i64,
                    opcodes::OP_LESSTHANOREQUAL => (a <= b) as i64,
                    opcodes::OP_GREATERTHANOREQUAL => (a >= b) as i64,
                    opcodes::OP_MIN => a.min(b),
                    _ => a.max(b),
                };
                self.stack.push(encode_int_vec(result));
                if op == opcodes::OP_NUMEQUALVERIFY {
                    self.verify_top(ScriptError::NumEqualVerify)?;
                }
            }

            opcodes::OP_WITHIN => {
                let max = self.num_from_stack()?;
                let min = self.num_from_stack()?;
                let a = self.num_from_stack()?;
                self.stack.push(encode_bool(min <= a && a < max));
            }

            opcodes::OP_RIPEMD160
            | opcodes::OP_SHA1
            | opcodes::OP_SHA256
            | opcodes::OP_HASH160
            | opcodes::OP_HASH256 => {
                let [elem] = self.stack.pop()?;
                let digest: Vec<u8> = match op {
                    opcodes::OP_RIPEMD160 => {
                        ripemd160::Hash::hash(&elem).to_byte_array().to_vec()
                    }
                    opcodes::OP_SHA1 => sha1::Hash::hash(&elem).to_byte_array().to_vec(),
                    opcodes::OP_SHA256 => sha256::Hash::hash(&elem).to_byte_array().to_vec(),
                    opcodes::OP_HASH160 => hash160::Hash::hash(&elem).to_byte_array().to_vec(),
                    _ => sha256d::Hash::hash(&elem).to_byte_array().to_vec(),
                };
                self.stack.push(digest);
            }

            opcodes::OP_CODESEPARATOR => {}

            opcodes::OP_CHECKSIG | opcodes::OP_CHECKSIGVERIFY => {
                let [sig, pub_key] = self.stack.pop()?;

                self.check_signature_encoding(&sig)?;
                self.check_pub_key_encoding(&pub_key)?;

                let success =
                    !sig.is_empty() && checker.check_sig(&sig, &pub_key, self.script_code);

                self.stack.push(encode_bool(success));
                if op == opcodes::OP_CHECKSIGVERIFY {
                    self.verify_top(ScriptError::CheckSigVerify)?;
                }
            }

            opcodes::OP_CHECKMULTISIG | opcodes::OP_CHECKMULTISIGVERIFY => {
                let key_count = self.num_from_stack()?;
                if !(0..=MAX_PUBKEYS_PER_MULTISIG).contains(&key_count) {
                    return Err(ScriptError::PubKeyCount);
                }

                // Every key counts against the opcode budget.
                self.op_count += key_count as usize;
                if self.op_count > MAX_OPS_PER_SCRIPT {
                    return Err(ScriptError::OpCount);
                }

                let keys = self.stack.pop_many(key_count as usize)?;

                let sig_count = self.num_from_stack()?;
                if !(0..=key_count).contains(&sig_count) {
                    return Err(ScriptError::SigCount);
                }

                let sigs = self.stack.pop_many(sig_count as usize)?;

                // Off-by-one consensus quirk: one extra element is
                // popped and ignored.
                let [dummy] = self.stack.pop()?;
                if self.flags.contains(VerifyFlags::NULLDUMMY) && !dummy.is_empty() {
                    return Err(ScriptError::SigNullDummy);
                }

                // Walk signatures and keys from the top down; every
                // failed match burns a key, so signatures must appear
                // in key order.
                let mut success = true;
                let mut sigs_left = sigs.len();
                let mut keys_left = keys.len();
                while success && sigs_left > 0 {
                    let sig = &sigs[sigs_left - 1];
                    let pub_key = &keys[keys_left - 1];

                    self.check_signature_encoding(sig)?;
                    self.check_pub_key_encoding(pub_key)?;

                    let ok =
                        !sig.is_empty() && checker.check_sig(sig, pub_key, self.script_code);
                    if ok {
                        sigs_left -= 1;
                    }
                    keys_left -= 1;

                    if sigs_left > keys_left {
                        success = false;
                    }
                }

                self.stack.push(encode_bool(success));
                if op == opcodes::OP_CHECKMULTISIGVERIFY {
                    self.verify_top(ScriptError::CheckMultisigVerify)?;
                }
            }

            opcodes::OP_CHECKLOCKTIMEVERIFY => {
                if !self.flags.contains(VerifyFlags::CHECKLOCKTIMEVERIFY) {
                    return self.upgradable_nop();
                }

                let lock_time =
                    decode_int(self.stack.get_back(0)?, 5, self.require_minimal())?;
                if lock_time < 0 {
                    return Err(ScriptError::NegativeLocktime);
                }
                if !checker.check_lock_time(lock_time) {
                    return Err(ScriptError::UnsatisfiedLocktime);
                }
            }

            opcodes::OP_CHECKSEQUENCEVERIFY => {
                if !self.flags.contains(VerifyFlags::CHECKSEQUENCEVERIFY) {
                    return self.upgradable_nop();
                }

                let sequence =
                    decode_int(self.stack.get_back(0)?, 5, self.require_minimal())?;
                if sequence < 0 {
                    return Err(ScriptError::NegativeLocktime);
                }
                // With the disable bit set the operand is a NOP, so
                // the opcode stays redefinable by a soft fork.
                if sequence & SEQUENCE_LOCKTIME_DISABLE_FLAG as i64 == 0
                    && !checker.check_sequence(sequence)
                {
                    return Err(ScriptError::UnsatisfiedLocktime);
                }
            }

            opcodes::OP_NOP1
            | opcodes::OP_NOP4
            | opcodes::OP_NOP5
            | opcodes::OP_NOP6
            | opcodes::OP_NOP7
            | opcodes::OP_NOP8
            | opcodes::OP_NOP9
            | opcodes::OP_NOP10 => {
                self.upgradable_nop()?;
            }

            _ => {
                return Err(ScriptError::BadOpcode);
            }
        }

        Ok(())
    }

    fn upgradable_nop(&self) -> Result<(), ScriptError> {
        if self.flags.contains(VerifyFlags::DISCOURAGE_UPGRADABLE_NOPS) {
            Err(ScriptError::DiscourageUpgradableNops)
        } else {
            Ok(())
        }
    }

    fn verify_top(&mut self, error: ScriptError) -> Result<(), ScriptError> {
        let [elem] = self.stack.pop()?;
        if !decode_bool(&elem) {
            return Err(error);
        }
        Ok(())
    }

    fn num_from_stack(&mut self) -> Result<i64, ScriptError> {
        let [top] = self.stack.pop()?;
        decode_int(&top, 4, self.require_minimal())
    }

    fn check_signature_encoding(&self, sig: &[u8]) -> Result<(), ScriptError> {
        // An empty signature is a clean failure, not an encoding error.
        if sig.is_empty() {
            return Ok(());
        }

        let strict = self.flags.contains(VerifyFlags::DERSIG)
            || self.flags.contains(VerifyFlags::LOW_S)
            || self.flags.contains(VerifyFlags::STRICTENC);
        if strict && !is_valid_signature_encoding(sig) {
            return Err(ScriptError::SigDer);
        }
        if self.flags.contains(VerifyFlags::LOW_S) && !is_low_der_signature(sig) {
            return Err(ScriptError::SigHighS);
        }
        if self.flags.contains(VerifyFlags::STRICTENC) && !check_sighash_type(sig) {
            return Err(ScriptError::SigHashType);
        }

        Ok(())
    }

    fn check_pub_key_encoding(&self, pub_key: &[u8]) -> Result<(), ScriptError> {
        if self.flags.contains(VerifyFlags::STRICTENC) && pub_key_encoding(pub_key).is_none() {
            return Err(ScriptError::PubKeyType);
        }

        Ok(())
    }
}

/// Evaluates one script on top of `stack` and returns the resulting
/// stack. Truthiness of the result is not checked here.
pub fn eval_script(
    script: &[u8],
    stack: Stack,
    flags: VerifyFlags,
    checker: &dyn SignatureChecker,
) -> Result<Stack, ScriptError> {
    ScriptProgram::new(script, stack, flags)?.run(checker)
}

fn is_push_only(script: &[u8]) -> Result<bool, ScriptError> {
    let parsed = OwnedScript::parse_from_bytes(script).map_err(|_| ScriptError::BadOpcode)?;

    Ok(parsed.iter().all(|elem| match elem {
        ScriptElem::Push(..) => true,
        ScriptElem::Op(op) => op.is_push(),
    }))
}

fn stack_result(stack: &Stack) -> Result<(), ScriptError> {
    if stack.is_empty() || !decode_bool(stack.get_back(0)?) {
        Err(ScriptError::EvalFalse)
    } else {
        Ok(())
    }
}

/// Full output-spend verification: scriptSig, then scriptPubKey, then
/// the witness program or P2SH redeem script where applicable.
pub fn verify_script(
    script_sig: &[u8],
    script_pubkey: &[u8],
    witness: &[Vec<u8>],
    flags: VerifyFlags,
    checker: &dyn SignatureChecker,
) -> Result<(), ScriptError> {
    if flags.contains(VerifyFlags::SIGPUSHONLY) && !is_push_only(script_sig)? {
        return Err(ScriptError::SigPushOnly);
    }

    let stack = eval_script(script_sig, Stack::new(), flags, checker)?;
    let sig_stack = stack.clone();
    let stack = eval_script(script_pubkey, stack, flags, checker)?;
    stack_result(&stack)?;

    let mut had_witness = false;
    if flags.contains(VerifyFlags::WITNESS) {
        if let Some((version, program)) = parse_witness_program_bytes(script_pubkey) {
            had_witness = true;
            if !script_sig.is_empty() {
                return Err(ScriptError::WitnessMalleated);
            }
            verify_witness_program(witness, version, program, flags, checker)?;
        }
    }

    if !had_witness && flags.contains(VerifyFlags::P2SH) && is_p2sh_bytes(script_pubkey) {
        if !is_push_only(script_sig)? {
            return Err(ScriptError::SigPushOnly);
        }

        let mut stack = sig_stack;
        // scriptSig pushed at least the redeem script, or the
        // scriptPubKey evaluation above could not have succeeded.
        let [redeem_script] = stack.pop()?;
        let stack = eval_script(&redeem_script, stack, flags, checker)?;
        stack_result(&stack)?;
    }

    if !had_witness && !witness.is_empty() {
        return Err(ScriptError::WitnessUnexpected);
    }

    Ok(())
}

/// Witness-program dispatch for segwit outputs (BIP141).
pub fn verify_witness_program(
    witness: &[Vec<u8>],
    version: u8,
    program: &[u8],
    flags: VerifyFlags,
    checker: &dyn SignatureChecker,
) -> Result<(), ScriptError> {
    if version == 0 {
        match program.len() {
            32 => {
                // P2WSH: the last witness element is the script.
                let Some((witness_script, stack_items)) = witness.split_last() else {
                    return Err(ScriptError::WitnessProgramWitnessEmpty);
                };
                let script_hash = sha256::Hash::hash(witness_script);
                if script_hash.to_byte_array() != *program {
                    return Err(ScriptError::WitnessProgramMismatch);
                }
                exec_witness_script(witness_script, stack_items, flags, checker)
            }
            20 => {
                // P2WPKH: implicit pay-to-pubkey-hash script.
                if witness.len() != 2 {
                    return Err(ScriptError::WitnessProgramMismatch);
                }
                let script = ScriptBuilder::new()
                    .push_opcode(opcodes::OP_DUP)
                    .push_opcode(opcodes::OP_HASH160)
                    .push_slice(program)
                    .push_opcode(opcodes::OP_EQUALVERIFY)
                    .push_opcode(opcodes::OP_CHECKSIG)
                    .into_bytes();
                exec_witness_script(&script, witness, flags, checker)
            }
            _ => Err(ScriptError::WitnessProgramWrongLength),
        }
    } else if flags.contains(VerifyFlags::DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM) {
        Err(ScriptError::DiscourageUpgradableWitnessProgram)
    } else {
        // Undefined witness versions stay anyone-can-spend until a
        // soft fork defines them.
        Ok(())
    }
}

fn exec_witness_script(
    script: &[u8],
    stack_items: &[Vec<u8>],
    flags: VerifyFlags,
    checker: &dyn SignatureChecker,
) -> Result<(), ScriptError> {
    for item in stack_items {
        if item.len() > MAX_SCRIPT_ELEMENT_SIZE {
            return Err(ScriptError::PushSize);
        }
    }

    let stack = Stack::from_items(stack_items.to_vec());
    let stack = eval_script(script, stack, flags, checker)?;

    // Witness scripts must finish with exactly one truthy element.
    if stack.len() != 1 {
        return Err(ScriptError::EvalFalse);
    }
    stack_result(&stack)
}
