//! Text address forms: Base58Check for P2PKH/P2SH outputs, bech32 for
//! segwit witness programs, cross-linked to the output-script
//! templates they lock to.

pub mod base58;
pub mod bech32;

use crate::script_pubkey::{ScriptPubKey, WitnessV0Program};
use bitcoin_hashes::{Hash, hash160, sha256};
use core::fmt;
use core::str::FromStr;

/// Network tag an address commits to. Test networks share one tag:
/// they use the same version bytes and HRP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Bitcoin,
    Testnet,
}

impl Network {
    /// Base58Check version byte of P2PKH addresses.
    pub fn p2pkh_version(self) -> u8 {
        match self {
            Network::Bitcoin => 0x00,
            Network::Testnet => 0x6f,
        }
    }

    /// Base58Check version byte of P2SH addresses.
    pub fn p2sh_version(self) -> u8 {
        match self {
            Network::Bitcoin => 0x05,
            Network::Testnet => 0xc4,
        }
    }

    /// Bech32 human-readable part.
    pub fn hrp(self) -> &'static str {
        match self {
            Network::Bitcoin => "bc",
            Network::Testnet => "tb",
        }
    }

    fn from_p2pkh_version(version: u8) -> Option<Self> {
        match version {
            0x00 => Some(Network::Bitcoin),
            0x6f => Some(Network::Testnet),
            _ => None,
        }
    }

    fn from_p2sh_version(version: u8) -> Option<Self> {
        match version {
            0x05 => Some(Network::Bitcoin),
            0xc4 => Some(Network::Testnet),
            _ => None,
        }
    }

    fn from_hrp(hrp: &str) -> Option<Self> {
        match hrp {
            "bc" => Some(Network::Bitcoin),
            "tb" => Some(Network::Testnet),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    Base58(base58::Error),
    Bech32(bech32::Error),
    /// Base58Check version byte matching no known address kind.
    UnknownVersion(u8),
    /// Bech32 HRP matching no known network.
    UnknownHrp(String),
    /// Base58Check payload of the wrong size for a hash.
    InvalidPayloadLength(usize),
    /// Witness program length outside its allowed range.
    InvalidProgramLength(usize),
    /// Witness version symbol above 16.
    WitnessVersionOutOfRange(u8),
    /// The bech32 data part carried no witness version.
    EmptyPayload,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Base58(e) => write!(f, "base58: {e}"),
            Error::Bech32(e) => write!(f, "bech32: {e}"),
            Error::UnknownVersion(v) => write!(f, "unknown address version byte 0x{v:02x}"),
            Error::UnknownHrp(hrp) => write!(f, "unknown bech32 human-readable part {hrp:?}"),
            Error::InvalidPayloadLength(len) => {
                write!(f, "address payload is {len} bytes, expected a 20-byte hash")
            }
            Error::InvalidProgramLength(len) => {
                write!(f, "invalid witness program length {len}")
            }
            Error::WitnessVersionOutOfRange(v) => write!(f, "witness version {v} is above 16"),
            Error::EmptyPayload => write!(f, "bech32 data part is empty"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Base58(e) => Some(e),
            Error::Bech32(e) => Some(e),
            _ => None,
        }
    }
}

impl From<base58::Error> for Error {
    fn from(e: base58::Error) -> Self {
        Error::Base58(e)
    }
}

impl From<bech32::Error> for Error {
    fn from(e: bech32::Error) -> Self {
        Error::Bech32(e)
    }
}

/// A parsed Bitcoin address.
///
/// Round-trip invariant: parsing the display form yields an equal value
/// with a byte-identical locking script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    P2pkh {
        network: Network,
        pub_key_hash: [u8; 20],
    },
    P2sh {
        network: Network,
        script_hash: [u8; 20],
    },
    /// Native segwit, bech32-encoded. Version 0 programs are exactly
    /// 20 (P2WPKH) or 32 (P2WSH) bytes; other versions 2 to 40.
    Witness {
        network: Network,
        version: u8,
        program: Vec<u8>,
    },
}

impl Address {
    /// P2PKH address of a serialized public key.
    pub fn p2pkh_from_key(pub_key: &[u8], network: Network) -> Self {
        Address::P2pkh {
            network,
            pub_key_hash: hash160::Hash::hash(pub_key).to_byte_array(),
        }
    }

    /// P2SH address of a redeem script.
    pub fn p2sh_from_script(redeem_script: &[u8], network: Network) -> Self {
        Address::P2sh {
            network,
            script_hash: hash160::Hash::hash(redeem_script).to_byte_array(),
        }
    }

    /// P2WPKH address of a serialized public key.
    pub fn p2wpkh_from_key(pub_key: &[u8], network: Network) -> Self {
        Address::Witness {
            network,
            version: 0,
            program: hash160::Hash::hash(pub_key).to_byte_array().to_vec(),
        }
    }

    /// P2WSH address of a witness script.
    pub fn p2wsh_from_script(witness_script: &[u8], network: Network) -> Self {
        Address::Witness {
            network,
            version: 0,
            program: sha256::Hash::hash(witness_script).to_byte_array().to_vec(),
        }
    }

    pub fn network(&self) -> Network {
        match *self {
            Address::P2pkh { network, .. }
            | Address::P2sh { network, .. }
            | Address::Witness { network, .. } => network,
        }
    }

    /// The locking script this address stands for.
    pub fn script_pubkey(&self) -> ScriptPubKey {
        match self {
            Address::P2pkh { pub_key_hash, .. } => ScriptPubKey::P2pkh {
                pub_key_hash: *pub_key_hash,
            },
            Address::P2sh { script_hash, .. } => ScriptPubKey::P2sh {
                script_hash: *script_hash,
            },
            Address::Witness {
                version: 0,
                program,
                ..
            } => match program.len() {
                20 => ScriptPubKey::WitnessV0(WitnessV0Program::PubKeyHash(
                    program.as_slice().try_into().unwrap(),
                )),
                32 => ScriptPubKey::WitnessV0(WitnessV0Program::ScriptHash(
                    program.as_slice().try_into().unwrap(),
                )),
                // constructors and parsing keep v0 programs to 20/32
                _ => unreachable!("invalid v0 witness program length"),
            },
            Address::Witness {
                version, program, ..
            } => ScriptPubKey::WitnessUnknown {
                version: *version,
                program: program.clone(),
            },
        }
    }

    /// The address of an output script, if that script kind has one.
    pub fn from_script_pubkey(script_pubkey: &ScriptPubKey, network: Network) -> Option<Self> {
        Some(match script_pubkey {
            ScriptPubKey::P2pkh { pub_key_hash } => Address::P2pkh {
                network,
                pub_key_hash: *pub_key_hash,
            },
            ScriptPubKey::P2sh { script_hash } => Address::P2sh {
                network,
                script_hash: *script_hash,
            },
            ScriptPubKey::WitnessV0(WitnessV0Program::PubKeyHash(hash)) => Address::Witness {
                network,
                version: 0,
                program: hash.to_vec(),
            },
            ScriptPubKey::WitnessV0(WitnessV0Program::ScriptHash(hash)) => Address::Witness {
                network,
                version: 0,
                program: hash.to_vec(),
            },
            _ => return None,
        })
    }

    fn validate_witness(version: u8, program_len: usize) -> Result<(), Error> {
        if version > 16 {
            return Err(Error::WitnessVersionOutOfRange(version));
        }
        match (version, program_len) {
            (0, 20) | (0, 32) => Ok(()),
            (0, len) => Err(Error::InvalidProgramLength(len)),
            (_, 2..=40) => Ok(()),
            (_, len) => Err(Error::InvalidProgramLength(len)),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::P2pkh {
                network,
                pub_key_hash,
            } => {
                let mut payload = Vec::with_capacity(21);
                payload.push(network.p2pkh_version());
                payload.extend(pub_key_hash);
                write!(f, "{}", base58::check_encode(&payload))
            }
            Address::P2sh {
                network,
                script_hash,
            } => {
                let mut payload = Vec::with_capacity(21);
                payload.push(network.p2sh_version());
                payload.extend(script_hash);
                write!(f, "{}", base58::check_encode(&payload))
            }
            Address::Witness {
                network,
                version,
                program,
            } => {
                let mut data = vec![*version];
                data.extend(
                    bech32::convert_bits(program, 8, 5, true)
                        .expect("8-bit input cannot be out of range"),
                );
                let encoded = bech32::encode(network.hrp(), &data)
                    .expect("witness programs fit the bech32 length bound");
                write!(f, "{encoded}")
            }
        }
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        // bech32 addresses of a known network; the HRP check must see
        // the lowercased form, mixed-case rejection stays in the codec
        let prefix = s
            .split_once('1')
            .map(|(hrp, _)| hrp.to_ascii_lowercase());
        if let Some(network) = prefix.as_deref().and_then(Network::from_hrp) {
            let (_, data) = bech32::decode(s)?;
            let (&version, program_symbols) = data.split_first().ok_or(Error::EmptyPayload)?;
            let program = bech32::convert_bits(program_symbols, 5, 8, false)?;

            Self::validate_witness(version, program.len())?;

            return Ok(Address::Witness {
                network,
                version,
                program,
            });
        }

        let payload = base58::check_decode(s)?;
        let [version, hash @ ..] = payload.as_slice() else {
            return Err(Error::InvalidPayloadLength(0));
        };
        if hash.len() != 20 {
            return Err(Error::InvalidPayloadLength(hash.len()));
        }
        let pub_key_hash: [u8; 20] = hash.try_into().unwrap();

        if let Some(network) = Network::from_p2pkh_version(*version) {
            Ok(Address::P2pkh {
                network,
                pub_key_hash,
            })
        } else if let Some(network) = Network::from_p2sh_version(*version) {
            Ok(Address::P2sh {
                network,
                script_hash: pub_key_hash,
            })
        } else {
            Err(Error::UnknownVersion(*version))
        }
    }
}
