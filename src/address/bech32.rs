//! Bech32 encoding and decoding (BIP173).
//!
//! This is the generic layer: human-readable part, 5-bit data symbols
//! and the BCH checksum. Witness-program semantics live in the address
//! module on top of it.

use core::fmt;

pub const CHARSET: &[u8] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";

/// Shortest and longest legal encoded strings.
pub const MIN_LENGTH: usize = 8;
pub const MAX_LENGTH: usize = 90;

const GENERATORS: [u32; 5] = [0x3b6a57b2, 0x26508e6d, 0x1ea119fa, 0x3d4233dd, 0x2a1462b3];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Total encoded length outside `[8, 90]`.
    InvalidLength(usize),
    /// A character outside the bech32 alphabet, or an unprintable HRP
    /// character.
    InvalidChar(char),
    /// No `'1'` separator in the string.
    MissingSeparator,
    /// The checksum did not verify.
    InvalidChecksum,
    /// Both upper- and lowercase letters in one string.
    MixedCase,
    /// Nonzero bits left over when regrouping to 8-bit bytes.
    InvalidPadding,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::InvalidLength(len) => write!(f, "invalid bech32 string length {len}"),
            Error::InvalidChar(c) => write!(f, "invalid bech32 character {c:?}"),
            Error::MissingSeparator => write!(f, "missing bech32 separator '1'"),
            Error::InvalidChecksum => write!(f, "invalid bech32 checksum"),
            Error::MixedCase => write!(f, "bech32 strings must not mix upper and lower case"),
            Error::InvalidPadding => write!(f, "invalid padding in bech32 data"),
        }
    }
}

impl std::error::Error for Error {}

fn polymod(values: impl IntoIterator<Item = u8>) -> u32 {
    let mut chk: u32 = 1;
    for v in values {
        let top = chk >> 25;
        chk = (chk & 0x01ff_ffff) << 5 ^ v as u32;
        for (i, &generator) in GENERATORS.iter().enumerate() {
            if (top >> i) & 1 == 1 {
                chk ^= generator;
            }
        }
    }
    chk
}

/// `[c >> 5 for c in hrp] ++ [0] ++ [c & 31 for c in hrp]`
fn hrp_expand(hrp: &str) -> Vec<u8> {
    let bytes = hrp.as_bytes();
    let mut ret = Vec::with_capacity(bytes.len() * 2 + 1);
    ret.extend(bytes.iter().map(|c| c >> 5));
    ret.push(0);
    ret.extend(bytes.iter().map(|c| c & 31));
    ret
}

fn verify_checksum(hrp: &str, data: &[u8]) -> bool {
    polymod(hrp_expand(hrp).into_iter().chain(data.iter().copied())) == 1
}

fn create_checksum(hrp: &str, data: &[u8]) -> [u8; 6] {
    let values = hrp_expand(hrp)
        .into_iter()
        .chain(data.iter().copied())
        .chain([0u8; 6]);
    let plm = polymod(values) ^ 1;

    let mut checksum = [0u8; 6];
    for (i, c) in checksum.iter_mut().enumerate() {
        *c = ((plm >> (5 * (5 - i))) & 31) as u8;
    }
    checksum
}

/// Encodes an HRP and 5-bit data symbols to a lowercase bech32 string.
pub fn encode(hrp: &str, data: &[u8]) -> Result<String, Error> {
    let total_len = hrp.len() + 1 + data.len() + 6;
    if !(MIN_LENGTH..=MAX_LENGTH).contains(&total_len) {
        return Err(Error::InvalidLength(total_len));
    }

    let mut ret = String::with_capacity(total_len);
    ret.push_str(hrp);
    ret.push('1');
    for &value in data.iter().chain(&create_checksum(hrp, data)) {
        debug_assert!(value < 32);
        ret.push(CHARSET[value as usize] as char);
    }
    Ok(ret)
}

/// Decodes a bech32 string into its HRP (lowercased) and 5-bit data
/// symbols, checksum verified and stripped.
pub fn decode(s: &str) -> Result<(String, Vec<u8>), Error> {
    if !(MIN_LENGTH..=MAX_LENGTH).contains(&s.len()) {
        return Err(Error::InvalidLength(s.len()));
    }

    let has_lower = s.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = s.bytes().any(|b| b.is_ascii_uppercase());
    if has_lower && has_upper {
        return Err(Error::MixedCase);
    }

    let s = s.to_ascii_lowercase();
    let separator = s.rfind('1').ok_or(Error::MissingSeparator)?;
    if separator == 0 || separator + 7 > s.len() {
        // empty HRP, or a data part shorter than the checksum
        return Err(Error::MissingSeparator);
    }

    let (hrp, data_part) = s.split_at(separator);
    for c in hrp.chars() {
        if !('\x21'..='\x7e').contains(&c) {
            return Err(Error::InvalidChar(c));
        }
    }

    let mut data = Vec::with_capacity(data_part.len() - 1);
    for c in data_part[1..].bytes() {
        let value = CHARSET
            .iter()
            .position(|&charset_char| charset_char == c)
            .ok_or(Error::InvalidChar(c as char))?;
        data.push(value as u8);
    }

    if !verify_checksum(hrp, &data) {
        return Err(Error::InvalidChecksum);
    }

    data.truncate(data.len() - 6);
    Ok((hrp.to_string(), data))
}

/// Regroups a bit stream between arbitrary group sizes, most
/// significant bits first. Encoding 8→5 pads the tail; decoding 5→8
/// must not need padding and rejects nonzero leftover bits.
pub fn convert_bits(data: &[u8], from: u32, to: u32, pad: bool) -> Result<Vec<u8>, Error> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let mut ret = Vec::with_capacity((data.len() * from as usize).div_ceil(to as usize));
    let max_value: u32 = (1 << to) - 1;

    for &value in data {
        if (value as u32) >> from != 0 {
            return Err(Error::InvalidPadding);
        }
        acc = (acc << from) | value as u32;
        bits += from;
        while bits >= to {
            bits -= to;
            ret.push(((acc >> bits) & max_value) as u8);
        }
    }

    if pad {
        if bits > 0 {
            ret.push(((acc << (to - bits)) & max_value) as u8);
        }
    } else if bits >= from || ((acc << (to - bits)) & max_value) != 0 {
        return Err(Error::InvalidPadding);
    }

    Ok(ret)
}
