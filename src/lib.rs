//! Bitcoin consensus script engine.
//!
//! A stack-based interpreter for Bitcoin script together with the
//! byte-exact codecs around it: script (de)serialization, the standard
//! output-script templates, and the Base58Check/bech32 address forms.
//!
//! Evaluation is pure: a script either runs to a verdict or fails with
//! a typed [`ScriptError`]; no state is shared between evaluations and
//! callers may run scripts concurrently. Signature verification is
//! delegated to a [`SignatureChecker`] oracle supplied by the caller.

pub mod address;
pub mod condition_stack;
mod context;
mod interpreter;
mod opcode;
pub mod script;
pub mod script_error;
pub mod script_pubkey;
pub mod util;

pub use crate::address::{Address, Network};
pub use crate::context::{NullChecker, SignatureChecker, TransactionChecker, VerifyFlags};
pub use crate::interpreter::{
    MAX_OPS_PER_SCRIPT, MAX_PUBKEYS_PER_MULTISIG, MAX_SCRIPT_ELEMENT_SIZE, MAX_SCRIPT_SIZE,
    MAX_STACK_SIZE, ScriptProgram, eval_script, verify_script, verify_witness_program,
};
pub use crate::opcode::{Opcode, opcodes};
pub use crate::script::{
    OwnedScript, ParseScriptError, PushKind, Script, ScriptBuilder, ScriptElem,
};
pub use crate::script::stack::Stack;
pub use crate::script_error::ScriptError;
pub use crate::script_pubkey::{ScriptPubKey, WitnessV0Program};
