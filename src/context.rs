//! Evaluation configuration: verification flags and the signature
//! oracle the interpreter calls out to.

use crate::util::locktime::{
    LOCKTIME_THRESHOLD, SEQUENCE_FINAL, SEQUENCE_LOCKTIME_DISABLE_FLAG, SEQUENCE_LOCKTIME_MASK,
    SEQUENCE_LOCKTIME_TYPE_FLAG,
};
use core::ops::BitOr;

/// Script verification flag set. Pure configuration: flags only change
/// which opcode semantics are enforced, never the data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VerifyFlags(u32);

impl VerifyFlags {
    pub const NONE: Self = Self(0);
    /// Evaluate P2SH redeem scripts.
    pub const P2SH: Self = Self(1 << 0);
    /// Enforce strict public key and sighash-type encodings.
    pub const STRICTENC: Self = Self(1 << 1);
    /// Enforce strict DER signature encoding (BIP66).
    pub const DERSIG: Self = Self(1 << 2);
    /// Reject signatures with a high S component.
    pub const LOW_S: Self = Self(1 << 3);
    /// The CHECKMULTISIG dummy element must be empty.
    pub const NULLDUMMY: Self = Self(1 << 4);
    /// Signature scripts may only contain pushes.
    pub const SIGPUSHONLY: Self = Self(1 << 5);
    /// Pushes and numbers must use their minimal encodings.
    pub const MINIMALDATA: Self = Self(1 << 6);
    /// Make the upgradable NOPs fatal.
    pub const DISCOURAGE_UPGRADABLE_NOPS: Self = Self(1 << 7);
    /// Enable OP_CHECKLOCKTIMEVERIFY (BIP65).
    pub const CHECKLOCKTIMEVERIFY: Self = Self(1 << 9);
    /// Enable OP_CHECKSEQUENCEVERIFY (BIP112).
    pub const CHECKSEQUENCEVERIFY: Self = Self(1 << 10);
    /// Verify witness programs (BIP141).
    pub const WITNESS: Self = Self(1 << 11);
    /// Make undefined witness versions fatal.
    pub const DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM: Self = Self(1 << 12);
    /// OP_IF/NOTIF operands must be `[]` or `[0x01]`.
    pub const MINIMALIF: Self = Self(1 << 13);

    /// The flag set relay policy applies on top of consensus.
    pub const STANDARD: Self = Self(
        Self::P2SH.0
            | Self::STRICTENC.0
            | Self::DERSIG.0
            | Self::LOW_S.0
            | Self::NULLDUMMY.0
            | Self::MINIMALDATA.0
            | Self::DISCOURAGE_UPGRADABLE_NOPS.0
            | Self::CHECKLOCKTIMEVERIFY.0
            | Self::CHECKSEQUENCEVERIFY.0
            | Self::WITNESS.0
            | Self::DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM.0
            | Self::MINIMALIF.0,
    );

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for VerifyFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// The seam between the interpreter and everything transaction-shaped.
///
/// Implementations are expected to be pure functions of their inputs;
/// callers may memoize them and evaluate scripts concurrently.
pub trait SignatureChecker {
    /// `sig` still carries its trailing sighash-type byte; `script_code`
    /// is the script being evaluated, for sighash computation.
    fn check_sig(&self, sig: &[u8], pub_key: &[u8], script_code: &[u8]) -> bool;

    /// BIP65 comparison of a stack operand against the transaction's
    /// nLockTime.
    fn check_lock_time(&self, lock_time: i64) -> bool;

    /// BIP112 comparison of a stack operand against the spending
    /// input's nSequence.
    fn check_sequence(&self, sequence: i64) -> bool;
}

/// Checker with no transaction context; every check fails. Suits
/// pure-parsing callers that still want to run signature-free scripts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullChecker;

impl SignatureChecker for NullChecker {
    fn check_sig(&self, _sig: &[u8], _pub_key: &[u8], _script_code: &[u8]) -> bool {
        false
    }

    fn check_lock_time(&self, _lock_time: i64) -> bool {
        false
    }

    fn check_sequence(&self, _sequence: i64) -> bool {
        false
    }
}

/// Checker carrying the spending transaction's locktime context and a
/// signature-verification oracle.
///
/// The oracle gets `(pub_key, sig_with_hashtype, script_code)` and is
/// treated as pure and deterministic; sighash computation happens on
/// the oracle's side of the seam.
pub struct TransactionChecker<F>
where
    F: Fn(&[u8], &[u8], &[u8]) -> bool,
{
    /// nVersion of the spending transaction.
    pub version: i32,
    /// nLockTime of the spending transaction.
    pub lock_time: u32,
    /// nSequence of the input being spent.
    pub sequence: u32,
    pub verify: F,
}

impl<F> SignatureChecker for TransactionChecker<F>
where
    F: Fn(&[u8], &[u8], &[u8]) -> bool,
{
    fn check_sig(&self, sig: &[u8], pub_key: &[u8], script_code: &[u8]) -> bool {
        (self.verify)(pub_key, sig, script_code)
    }

    fn check_lock_time(&self, lock_time: i64) -> bool {
        let tx_lock_time = self.lock_time as i64;
        let threshold = LOCKTIME_THRESHOLD as i64;

        // Operand and nLockTime must agree on being a height or a time.
        let same_type = (tx_lock_time < threshold && lock_time < threshold)
            || (tx_lock_time >= threshold && lock_time >= threshold);
        if !same_type {
            return false;
        }

        if lock_time > tx_lock_time {
            return false;
        }

        // A final input never waits on nLockTime.
        if self.sequence == SEQUENCE_FINAL {
            return false;
        }

        true
    }

    fn check_sequence(&self, sequence: i64) -> bool {
        // Relative locktimes only exist from transaction version 2 on.
        if self.version < 2 {
            return false;
        }

        let tx_sequence = self.sequence as i64;
        if tx_sequence & SEQUENCE_LOCKTIME_DISABLE_FLAG as i64 != 0 {
            return false;
        }

        let mask = (SEQUENCE_LOCKTIME_TYPE_FLAG | SEQUENCE_LOCKTIME_MASK) as i64;
        let masked_sequence = sequence & mask;
        let masked_tx_sequence = tx_sequence & mask;

        let type_flag = SEQUENCE_LOCKTIME_TYPE_FLAG as i64;
        let same_type = (masked_tx_sequence < type_flag && masked_sequence < type_flag)
            || (masked_tx_sequence >= type_flag && masked_sequence >= type_flag);
        if !same_type {
            return false;
        }

        if masked_sequence > masked_tx_sequence {
            return false;
        }

        true
    }
}
