// Error kinds and description strings follow the Bitcoin Core source code,
// files src/script/script_error.{h,cpp}.

use core::fmt;

/// Terminal verdict of a failed script evaluation.
///
/// Every kind is fatal; the interpreter never recovers past the first
/// error. Callers get the kind for logging and policy decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptError {
    UnknownError,
    EvalFalse,
    OpReturn,

    /* Max sizes */
    ScriptSize,
    PushSize,
    OpCount,
    StackSize,
    SigCount,
    PubKeyCount,

    /* Failed verify operations */
    Verify,
    EqualVerify,
    CheckMultisigVerify,
    CheckSigVerify,
    NumEqualVerify,

    /* Logical/Format/Canonical errors */
    BadOpcode,
    DisabledOpcode,
    InvalidStackOperation,
    InvalidAltstackOperation,
    UnbalancedConditional,

    /* OP_CHECKLOCKTIMEVERIFY and OP_CHECKSEQUENCEVERIFY */
    NegativeLocktime,
    UnsatisfiedLocktime,

    /* Malleability */
    SigHashType,
    SigDer,
    MinimalData,
    SigPushOnly,
    SigHighS,
    SigNullDummy,
    PubKeyType,
    MinimalIf,

    /* Softfork safeness */
    DiscourageUpgradableNops,
    DiscourageUpgradableWitnessProgram,

    /* Segregated witness */
    WitnessProgramWrongLength,
    WitnessProgramWitnessEmpty,
    WitnessProgramMismatch,
    WitnessMalleated,
    WitnessUnexpected,

    /// Bitcoin Core reports number overflows as unknown error; a
    /// distinct kind is more useful to callers.
    NumOverflow,
}

impl ScriptError {
    pub fn description(&self) -> &'static str {
        match self {
            ScriptError::EvalFalse => {
                "Script evaluated without error but finished with a false/empty top stack element"
            }
            ScriptError::OpReturn => "OP_RETURN was encountered",
            ScriptError::ScriptSize => "Script is too big",
            ScriptError::PushSize => "Push value size limit exceeded",
            ScriptError::OpCount => "Operation limit exceeded",
            ScriptError::StackSize => "Stack size limit exceeded",
            ScriptError::SigCount => "Signature count negative or greater than pubkey count",
            ScriptError::PubKeyCount => "Pubkey count negative or limit exceeded",
            ScriptError::Verify => "Script failed an OP_VERIFY operation",
            ScriptError::EqualVerify => "Script failed an OP_EQUALVERIFY operation",
            ScriptError::CheckMultisigVerify => {
                "Script failed an OP_CHECKMULTISIGVERIFY operation"
            }
            ScriptError::CheckSigVerify => "Script failed an OP_CHECKSIGVERIFY operation",
            ScriptError::NumEqualVerify => "Script failed an OP_NUMEQUALVERIFY operation",
            ScriptError::BadOpcode => "Opcode missing or not understood",
            ScriptError::DisabledOpcode => "Attempted to use a disabled opcode",
            ScriptError::InvalidStackOperation => {
                "Operation not valid with the current stack size"
            }
            ScriptError::InvalidAltstackOperation => {
                "Operation not valid with the current altstack size"
            }
            ScriptError::UnbalancedConditional => "Invalid OP_IF construction",
            ScriptError::NegativeLocktime => "Negative locktime",
            ScriptError::UnsatisfiedLocktime => "Locktime requirement not satisfied",
            ScriptError::SigHashType => "Signature hash type missing or not understood",
            ScriptError::SigDer => "Non-canonical DER signature",
            ScriptError::MinimalData => "Data push larger than necessary",
            ScriptError::SigPushOnly => "Only push operators allowed in signatures",
            ScriptError::SigHighS => "Non-canonical signature: S value is unnecessarily high",
            ScriptError::SigNullDummy => "Dummy CHECKMULTISIG argument must be zero",
            ScriptError::PubKeyType => "Public key is neither compressed or uncompressed",
            ScriptError::MinimalIf => "OP_IF/NOTIF argument must be minimal",
            ScriptError::DiscourageUpgradableNops => "NOPx reserved for soft-fork upgrades",
            ScriptError::DiscourageUpgradableWitnessProgram => {
                "Witness version reserved for soft-fork upgrades"
            }
            ScriptError::WitnessProgramWrongLength => "Witness program has incorrect length",
            ScriptError::WitnessProgramWitnessEmpty => {
                "Witness program was passed an empty witness"
            }
            ScriptError::WitnessProgramMismatch => "Witness program hash mismatch",
            ScriptError::WitnessMalleated => "Witness requires empty scriptSig",
            ScriptError::WitnessUnexpected => "Witness provided for non-witness script",
            ScriptError::NumOverflow => "Script number overflow",
            ScriptError::UnknownError => "unknown error",
        }
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl std::error::Error for ScriptError {}
