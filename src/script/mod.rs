pub mod convert;
pub mod stack;

use crate::opcode::{Opcode, opcodes};
use core::fmt;
use core::ops::{Deref, DerefMut};

/// Wire encoding used by a data push. Parsing records which form the
/// script used so that re-serialization is byte-exact and non-minimal
/// pushes stay observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PushKind {
    /// Length byte `0x01..=0x4b` directly followed by the data.
    Direct,
    /// OP_PUSHDATA1 with a 1-byte length field.
    Data1,
    /// OP_PUSHDATA2 with a 2-byte little-endian length field.
    Data2,
    /// OP_PUSHDATA4 with a 4-byte little-endian length field.
    Data4,
}

/// One parsed script token, borrowing push data from the raw script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptElem<'a> {
    Op(Opcode),
    Push(PushKind, &'a [u8]),
}

impl fmt::Display for ScriptElem<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Op(opcode) => write!(f, "{opcode}"),
            Self::Push(_, bytes) => {
                write!(f, "<")?;
                for &byte in bytes {
                    write!(f, "{byte:02x}")?;
                }
                write!(f, ">")
            }
        }
    }
}

/// Longest direct push; longer data needs an OP_PUSHDATA form.
pub const MAX_DIRECT_PUSH: usize = 0x4b;

/// A parsed script that owns its token sequence.
#[derive(Debug, Clone)]
pub struct OwnedScript<'a>(Vec<ScriptElem<'a>>);

impl<'a> OwnedScript<'a> {
    pub fn parse_from_bytes(bytes: &'a [u8]) -> Result<Self, ParseScriptError> {
        let mut a = Vec::new();

        let mut offset = 0;
        while offset < bytes.len() {
            let b = bytes[offset];
            offset += 1;
            let opcode = Opcode { opcode: b };
            if let Some(n) = opcode.pushdata_length() {
                let Some(push_size) = bytes.get(offset..offset + n) else {
                    return Err(ParseScriptError::UnexpectedEndPushdataLength(opcode));
                };
                let l = u32::from_le_bytes({
                    let mut buf = [0u8; 4];
                    buf[0..push_size.len()].copy_from_slice(push_size);
                    buf
                }) as usize;
                offset += n;
                let Some(data) = bytes.get(offset..offset + l) else {
                    return Err(ParseScriptError::UnexpectedEnd(l, bytes.len() - offset));
                };
                offset += l;
                let kind = match n {
                    1 => PushKind::Data1,
                    2 => PushKind::Data2,
                    _ => PushKind::Data4,
                };
                a.push(ScriptElem::Push(kind, data));
            } else if (0x01..=MAX_DIRECT_PUSH as u8).contains(&b) {
                let Some(data) = bytes.get(offset..offset + b as usize) else {
                    return Err(ParseScriptError::UnexpectedEnd(
                        b as usize,
                        bytes.len() - offset,
                    ));
                };
                offset += b as usize;
                a.push(ScriptElem::Push(PushKind::Direct, data));
            } else {
                // Every remaining byte is kept as an opcode token. Bytes
                // without a name in the consensus table only fail when
                // the interpreter reaches them in an executed branch.
                a.push(ScriptElem::Op(opcode));
            }
        }

        Ok(OwnedScript(a))
    }
}

impl<'a> Deref for OwnedScript<'a> {
    type Target = Script<'a>;

    fn deref(&self) -> &Self::Target {
        Script::new(&self.0)
    }
}

impl DerefMut for OwnedScript<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        Script::new_mut(&mut self.0)
    }
}

impl fmt::Display for OwnedScript<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        <Script<'_> as fmt::Display>::fmt(self, f)
    }
}

/// Borrowed view of a token sequence.
#[derive(Debug)]
#[repr(transparent)]
pub struct Script<'a>(pub [ScriptElem<'a>]);

impl<'a> Script<'a> {
    pub fn new<'b>(slice: &'b [ScriptElem<'a>]) -> &'b Self {
        unsafe { &*(slice as *const [ScriptElem<'a>] as *const Self) }
    }

    pub fn new_mut<'b>(slice: &'b mut [ScriptElem<'a>]) -> &'b mut Self {
        unsafe { &mut *(slice as *mut [ScriptElem<'a>] as *mut Self) }
    }

    /// Serializes the tokens back to script bytes, reproducing the
    /// exact push encodings recorded at parse time.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut ret = Vec::new();

        for &e in &**self {
            match e {
                ScriptElem::Op(op) => ret.push(op.opcode),
                ScriptElem::Push(PushKind::Direct, bytes) => {
                    ret.push(bytes.len() as u8);
                    ret.extend(bytes);
                }
                ScriptElem::Push(PushKind::Data1, bytes) => {
                    ret.push(opcodes::OP_PUSHDATA1.opcode);
                    ret.push(bytes.len() as u8);
                    ret.extend(bytes);
                }
                ScriptElem::Push(PushKind::Data2, bytes) => {
                    ret.push(opcodes::OP_PUSHDATA2.opcode);
                    ret.extend(u16::to_le_bytes(bytes.len() as u16));
                    ret.extend(bytes);
                }
                ScriptElem::Push(PushKind::Data4, bytes) => {
                    ret.push(opcodes::OP_PUSHDATA4.opcode);
                    ret.extend(u32::to_le_bytes(bytes.len() as u32));
                    ret.extend(bytes);
                }
            }
        }

        ret
    }

    pub fn fmt_space_separated(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for &e in &**self {
            if first {
                first = false;
            } else {
                write!(f, " ")?;
            }
            write!(f, "{e}")?;
        }

        Ok(())
    }
}

impl<'a> Deref for Script<'a> {
    type Target = [ScriptElem<'a>];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Script<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl fmt::Display for Script<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_space_separated(f)
    }
}

/// True when a push token uses the encoding a minimal encoder picks for
/// its data, the canonical-form rule behind the MINIMALDATA flag.
pub fn is_minimal_push(kind: PushKind, data: &[u8]) -> bool {
    match data.len() {
        // empty data is OP_0, one-byte numbers are OP_1..OP_16/OP_1NEGATE
        0 => false,
        1 if data[0] >= 1 && data[0] <= 16 => false,
        1 if data[0] == 0x81 => false,
        len if len <= MAX_DIRECT_PUSH => kind == PushKind::Direct,
        len if len <= 0xff => kind <= PushKind::Data1,
        len if len <= 0xffff => kind <= PushKind::Data2,
        _ => true,
    }
}

/// Incremental script serializer picking minimal encodings.
#[derive(Debug, Clone, Default)]
pub struct ScriptBuilder {
    bytes: Vec<u8>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_opcode(mut self, op: Opcode) -> Self {
        self.bytes.push(op.opcode);
        self
    }

    /// Appends `data` with the shortest push-length encoding: a direct
    /// push up to 75 bytes, then OP_PUSHDATA1/2/4 by length.
    pub fn push_slice(mut self, data: &[u8]) -> Self {
        match data.len() {
            len @ 0..=MAX_DIRECT_PUSH => self.bytes.push(len as u8),
            len @ ..=0xff => {
                self.bytes.push(opcodes::OP_PUSHDATA1.opcode);
                self.bytes.push(len as u8);
            }
            len @ ..=0xffff => {
                self.bytes.push(opcodes::OP_PUSHDATA2.opcode);
                self.bytes.extend(u16::to_le_bytes(len as u16));
            }
            len => {
                self.bytes.push(opcodes::OP_PUSHDATA4.opcode);
                self.bytes.extend(u32::to_le_bytes(len as u32));
            }
        }
        self.bytes.extend(data);
        self
    }

    /// Appends a number the way a minimal encoder pushes it: the
    /// small-integer opcodes for -1..=16, a minimal data push otherwise.
    pub fn push_int(self, n: i64) -> Self {
        match Opcode::from_small_int(n) {
            Some(op) => self.push_opcode(op),
            None => {
                let buf = &mut [0; convert::INT_MAX_LEN];
                let encoded = convert::encode_int(n, buf);
                self.push_slice(encoded)
            }
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[derive(Debug, Clone)]
pub enum ParseScriptError {
    UnexpectedEndPushdataLength(Opcode),
    UnexpectedEnd(usize, usize),
}

impl fmt::Display for ParseScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEndPushdataLength(opcode) => {
                write!(f, "{opcode} with incomplete push length")
            }
            Self::UnexpectedEnd(expected, actual) => write!(
                f,
                "invalid push length, expected {expected} but got {actual}"
            ),
        }
    }
}

impl std::error::Error for ParseScriptError {}
