//! Static signature and public-key encoding checks. These inspect
//! byte layouts only; curve math stays behind the signature oracle.

pub const SIGHASH_DEFAULT: u8 = 0;
pub const SIGHASH_ALL: u8 = 1;
pub const SIGHASH_NONE: u8 = 2;
pub const SIGHASH_SINGLE: u8 = 3;
pub const SIGHASH_ANYONECANPAY: u8 = 128;

/// Hash types a signature may end in. SIGHASH_DEFAULT is never
/// spelled out as a suffix byte.
pub const SIG_HASH_TYPES: [u8; 6] = [
    SIGHASH_ALL,
    SIGHASH_NONE,
    SIGHASH_SINGLE,
    SIGHASH_ALL | SIGHASH_ANYONECANPAY,
    SIGHASH_NONE | SIGHASH_ANYONECANPAY,
    SIGHASH_SINGLE | SIGHASH_ANYONECANPAY,
];

/// Serialized public-key forms the strict-encoding rules accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PubKeyEncoding {
    Compressed,
    Uncompressed,
}

/// Classifies a serialized public key by its length and tag byte.
/// Anything else is rejected before the oracle ever sees it.
pub fn pub_key_encoding(pub_key: &[u8]) -> Option<PubKeyEncoding> {
    match (pub_key.len(), pub_key.first()) {
        (33, Some(0x02 | 0x03)) => Some(PubKeyEncoding::Compressed),
        (65, Some(0x04)) => Some(PubKeyEncoding::Uncompressed),
        _ => None,
    }
}

pub fn check_sighash_type(sig: &[u8]) -> bool {
    match sig.last() {
        Some(&hash_type) => SIG_HASH_TYPES.contains(&hash_type),
        None => false,
    }
}

/// Reads one DER integer (`0x02 <len> <bytes>`) off the front of
/// `data`, returning the integer bytes and the remainder.
fn read_der_integer(data: &[u8]) -> Option<(&[u8], &[u8])> {
    let (&[tag, len], rest) = data.split_first_chunk::<2>()?;
    if tag != 0x02 {
        return None;
    }
    let len = len as usize;
    // zero-length integers are not canonical
    if len == 0 || len > rest.len() {
        return None;
    }
    Some(rest.split_at(len))
}

/// Splits a signature into its R and S integers, enforcing the outer
/// structure: compound tag, a length byte spanning everything up to
/// the sighash suffix, and nothing left over but that suffix.
fn split_der_integers(sig: &[u8]) -> Option<(&[u8], &[u8])> {
    if !(9..=73).contains(&sig.len()) {
        return None;
    }
    if sig[0] != 0x30 || sig[1] as usize != sig.len() - 3 {
        return None;
    }

    let (r, rest) = read_der_integer(&sig[2..])?;
    let (s, rest) = read_der_integer(rest)?;
    if rest.len() != 1 {
        return None;
    }

    Some((r, s))
}

/// A canonical DER integer is positive and not zero-padded: the high
/// bit of the first byte is clear, and a leading zero byte appears
/// only when the byte after it would otherwise read as a sign bit.
fn is_canonical_der_integer(int: &[u8]) -> bool {
    if int[0] & 0x80 != 0 {
        return false;
    }
    if int.len() > 1 && int[0] == 0x00 && int[1] & 0x80 == 0 {
        return false;
    }
    true
}

/// Strict DER form for a signature carrying its sighash suffix:
///
/// `0x30 <len> 0x02 <rlen> <R> 0x02 <slen> <S> <sighash>`
///
/// Consensus-critical since BIP66; the rules match Bitcoin Core's
/// IsValidSignatureEncoding.
pub fn is_valid_signature_encoding(sig: &[u8]) -> bool {
    match split_der_integers(sig) {
        Some((r, s)) => is_canonical_der_integer(r) && is_canonical_der_integer(s),
        None => false,
    }
}

/// Half of the secp256k1 group order, big-endian. An S value above it
/// marks the malleable twin of a canonical signature.
const SECP256K1_HALF_ORDER: [u8; 32] = [
    0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0x5d, 0x57, 0x6e, 0x73, 0x57, 0xa4, 0x50, 0x1d, 0xdf, 0xe9, 0x2f, 0x46, 0x68, 0x1b,
    0x20, 0xa0,
];

/// True when the signature's S component sits in the lower half of
/// the group order. Expects a signature that already passed
/// [`is_valid_signature_encoding`]; anything else is rejected.
pub fn is_low_der_signature(sig: &[u8]) -> bool {
    let Some((_, s)) = split_der_integers(sig) else {
        return false;
    };

    // drop the sign-padding byte before comparing magnitudes
    let s = if s.len() > 1 && s[0] == 0 { &s[1..] } else { s };
    if s.len() > 32 {
        return false;
    }

    let mut padded = [0u8; 32];
    padded[32 - s.len()..].copy_from_slice(s);

    padded <= SECP256K1_HALF_ORDER
}
