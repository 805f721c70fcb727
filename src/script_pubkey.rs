//! Standard output-script taxonomy: byte-exact template matching and
//! construction for the script kinds the network recognizes.

use crate::opcode::{Opcode, opcodes};
use crate::script::{OwnedScript, PushKind, ScriptBuilder, ScriptElem, is_minimal_push};
use crate::util::checksig::pub_key_encoding;
use bitcoin_hashes::{Hash, hash160, sha256};

/// Payload of a version-0 witness output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WitnessV0Program {
    /// P2WPKH, a HASH160 of a compressed public key.
    PubKeyHash([u8; 20]),
    /// P2WSH, a SHA256 of the witness script.
    ScriptHash([u8; 32]),
}

/// A classified output script. Construction and classification are
/// exact inverses over the standard templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptPubKey {
    /// `<pubkey> OP_CHECKSIG`
    P2pk { pub_key: Vec<u8> },
    /// `OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG`
    P2pkh { pub_key_hash: [u8; 20] },
    /// `OP_HASH160 <20 bytes> OP_EQUAL`
    P2sh { script_hash: [u8; 20] },
    /// `<m> <pubkey>... <n> OP_CHECKMULTISIG`
    Multisig { required: u8, pub_keys: Vec<Vec<u8>> },
    /// `OP_0 <20 or 32 bytes>`
    WitnessV0(WitnessV0Program),
    /// A witness program this classifier has no template for: a future
    /// version, or version 0 with a non-standard length.
    WitnessUnknown { version: u8, program: Vec<u8> },
    /// `OP_RETURN` with an optional data push; provably unspendable.
    NullData { data: Vec<u8> },
    /// Anything else.
    NonStandard { bytes: Vec<u8> },
    Empty,
}

/// Reads a multisig participant count: a small-integer opcode for
/// 1..=16, a single-byte push for 17..=20.
fn participant_count(elem: ScriptElem<'_>) -> Option<u8> {
    match elem {
        ScriptElem::Op(op) => match op.small_int_value() {
            Some(n @ 1..=16) => Some(n as u8),
            _ => None,
        },
        ScriptElem::Push(PushKind::Direct, &[n @ 17..=20]) => Some(n),
        _ => None,
    }
}

fn is_plausible_pub_key(data: &[u8]) -> bool {
    pub_key_encoding(data).is_some()
}

/// The witness version a leading opcode encodes, if any (BIP141).
fn witness_version(op: Opcode) -> Option<u8> {
    match op.small_int_value() {
        Some(v @ 0..=16) => Some(v as u8),
        _ => None,
    }
}

impl ScriptPubKey {
    /// Classifies raw output-script bytes. Never fails: scripts that
    /// match no template (including unparseable ones) are NonStandard.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return Self::Empty;
        }

        let Ok(script) = OwnedScript::parse_from_bytes(bytes) else {
            return Self::NonStandard {
                bytes: bytes.to_vec(),
            };
        };

        if let Some(spk) = Self::classify(&script) {
            spk
        } else {
            Self::NonStandard {
                bytes: bytes.to_vec(),
            }
        }
    }

    fn classify(script: &[ScriptElem<'_>]) -> Option<Self> {
        match *script {
            [
                ScriptElem::Op(opcodes::OP_DUP),
                ScriptElem::Op(opcodes::OP_HASH160),
                ScriptElem::Push(PushKind::Direct, hash),
                ScriptElem::Op(opcodes::OP_EQUALVERIFY),
                ScriptElem::Op(opcodes::OP_CHECKSIG),
            ] if hash.len() == 20 => Some(Self::P2pkh {
                pub_key_hash: hash.try_into().unwrap(),
            }),

            [
                ScriptElem::Op(opcodes::OP_HASH160),
                ScriptElem::Push(PushKind::Direct, hash),
                ScriptElem::Op(opcodes::OP_EQUAL),
            ] if hash.len() == 20 => Some(Self::P2sh {
                script_hash: hash.try_into().unwrap(),
            }),

            [
                ScriptElem::Push(PushKind::Direct, pub_key),
                ScriptElem::Op(opcodes::OP_CHECKSIG),
            ] if is_plausible_pub_key(pub_key) => Some(Self::P2pk {
                pub_key: pub_key.to_vec(),
            }),

            [ScriptElem::Op(version_op), ScriptElem::Push(PushKind::Direct, program)]
                if witness_version(version_op).is_some() && (2..=40).contains(&program.len()) =>
            {
                let version = witness_version(version_op).unwrap();
                Some(match (version, program.len()) {
                    (0, 20) => Self::WitnessV0(WitnessV0Program::PubKeyHash(
                        program.try_into().unwrap(),
                    )),
                    (0, 32) => Self::WitnessV0(WitnessV0Program::ScriptHash(
                        program.try_into().unwrap(),
                    )),
                    _ => Self::WitnessUnknown {
                        version,
                        program: program.to_vec(),
                    },
                })
            }

            [ScriptElem::Op(opcodes::OP_RETURN)] => Some(Self::NullData { data: Vec::new() }),

            [ScriptElem::Op(opcodes::OP_RETURN), ScriptElem::Push(kind, data)]
                if data.len() <= 80 && is_minimal_push(kind, data) =>
            {
                Some(Self::NullData {
                    data: data.to_vec(),
                })
            }

            [
                first,
                ref keys @ ..,
                second_last,
                ScriptElem::Op(opcodes::OP_CHECKMULTISIG),
            ] => {
                let required = participant_count(first)?;
                let total = participant_count(second_last)?;
                if keys.len() != total as usize || required > total {
                    return None;
                }
                let pub_keys = keys
                    .iter()
                    .map(|key| match *key {
                        ScriptElem::Push(PushKind::Direct, data)
                            if is_plausible_pub_key(data) =>
                        {
                            Some(data.to_vec())
                        }
                        _ => None,
                    })
                    .collect::<Option<Vec<_>>>()?;
                Some(Self::Multisig { required, pub_keys })
            }

            _ => None,
        }
    }

    /// Serializes the canonical template bytes for this script kind.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::P2pk { pub_key } => ScriptBuilder::new()
                .push_slice(pub_key)
                .push_opcode(opcodes::OP_CHECKSIG)
                .into_bytes(),
            Self::P2pkh { pub_key_hash } => ScriptBuilder::new()
                .push_opcode(opcodes::OP_DUP)
                .push_opcode(opcodes::OP_HASH160)
                .push_slice(pub_key_hash)
                .push_opcode(opcodes::OP_EQUALVERIFY)
                .push_opcode(opcodes::OP_CHECKSIG)
                .into_bytes(),
            Self::P2sh { script_hash } => ScriptBuilder::new()
                .push_opcode(opcodes::OP_HASH160)
                .push_slice(script_hash)
                .push_opcode(opcodes::OP_EQUAL)
                .into_bytes(),
            Self::Multisig { required, pub_keys } => {
                let mut builder = ScriptBuilder::new().push_int(*required as i64);
                for key in pub_keys {
                    builder = builder.push_slice(key);
                }
                builder
                    .push_int(pub_keys.len() as i64)
                    .push_opcode(opcodes::OP_CHECKMULTISIG)
                    .into_bytes()
            }
            Self::WitnessV0(program) => {
                let builder = ScriptBuilder::new().push_opcode(opcodes::OP_0);
                match program {
                    WitnessV0Program::PubKeyHash(hash) => builder.push_slice(hash),
                    WitnessV0Program::ScriptHash(hash) => builder.push_slice(hash),
                }
                .into_bytes()
            }
            Self::WitnessUnknown { version, program } => {
                let version_op = match version {
                    0 => opcodes::OP_0,
                    v => Opcode::from_small_int(*v as i64).unwrap_or(opcodes::OP_INVALIDOPCODE),
                };
                ScriptBuilder::new()
                    .push_opcode(version_op)
                    .push_slice(program)
                    .into_bytes()
            }
            Self::NullData { data } => {
                let builder = ScriptBuilder::new().push_opcode(opcodes::OP_RETURN);
                if data.is_empty() {
                    builder.into_bytes()
                } else {
                    builder.push_slice(data).into_bytes()
                }
            }
            Self::NonStandard { bytes } => bytes.clone(),
            Self::Empty => Vec::new(),
        }
    }

    /// P2PKH locking script for a serialized public key.
    pub fn p2pkh_from_key(pub_key: &[u8]) -> Self {
        Self::P2pkh {
            pub_key_hash: hash160::Hash::hash(pub_key).to_byte_array(),
        }
    }

    /// P2SH locking script for a serialized redeem script.
    pub fn p2sh_from_script(redeem_script: &[u8]) -> Self {
        Self::P2sh {
            script_hash: hash160::Hash::hash(redeem_script).to_byte_array(),
        }
    }

    /// P2WPKH locking script for a serialized public key.
    pub fn p2wpkh_from_key(pub_key: &[u8]) -> Self {
        Self::WitnessV0(WitnessV0Program::PubKeyHash(
            hash160::Hash::hash(pub_key).to_byte_array(),
        ))
    }

    /// P2WSH locking script for a witness script.
    pub fn p2wsh_from_script(witness_script: &[u8]) -> Self {
        Self::WitnessV0(WitnessV0Program::ScriptHash(
            sha256::Hash::hash(witness_script).to_byte_array(),
        ))
    }
}

/// Witness-program pattern on raw script bytes: a version opcode
/// followed by one direct push of 2 to 40 bytes (BIP141).
pub fn parse_witness_program_bytes(script: &[u8]) -> Option<(u8, &[u8])> {
    if script.len() < 4 || script.len() > 42 {
        return None;
    }
    let version = match script[0] {
        0x00 => 0,
        v @ 0x51..=0x60 => v - 0x50,
        _ => return None,
    };
    if script[1] as usize != script.len() - 2 {
        return None;
    }
    Some((version, &script[2..]))
}

/// P2SH pattern on raw script bytes (BIP16 template match).
pub fn is_p2sh_bytes(script: &[u8]) -> bool {
    script.len() == 23
        && script[0] == opcodes::OP_HASH160.opcode
        && script[1] == 0x14
        && script[22] == opcodes::OP_EQUAL.opcode
}
