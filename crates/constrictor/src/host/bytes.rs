//! Byte buffers and the buffer-protocol format codes.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{HostError, HostResult};

/// Buffer-protocol format codes and their typed-array counterparts.
///
/// The letter codes follow the host convention (signed codes lowercase,
/// unsigned uppercase); dispatch is by item size so the mapping stays
/// correct regardless of what C type a letter nominally names.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatCode {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

impl FormatCode {
    /// Parse a single-letter format code, given the buffer's item size.
    pub fn from_format(format: &str, itemsize: usize) -> HostResult<Self> {
        let mut chars = format.chars();
        let code = match (chars.next(), chars.next()) {
            // No format means unsigned bytes.
            (None, _) => return Ok(FormatCode::U8),
            (Some(c), None) => c,
            _ => {
                return Err(HostError::Type(format!(
                    "unsupported buffer format {format:?}"
                )))
            }
        };
        match code {
            'f' => return Ok(FormatCode::F32),
            'd' => return Ok(FormatCode::F64),
            _ => {}
        }
        let signed = code.is_ascii_lowercase();
        match (itemsize, signed) {
            (1, true) => Ok(FormatCode::I8),
            (1, false) => Ok(FormatCode::U8),
            (2, true) => Ok(FormatCode::I16),
            (2, false) => Ok(FormatCode::U16),
            (4, true) => Ok(FormatCode::I32),
            (4, false) => Ok(FormatCode::U32),
            (8, true) => Ok(FormatCode::I64),
            (8, false) => Ok(FormatCode::U64),
            _ => Err(HostError::Type(format!(
                "unsupported buffer format {code:?} with item size {itemsize}"
            ))),
        }
    }

    pub fn code(self) -> char {
        match self {
            FormatCode::I8 => 'b',
            FormatCode::U8 => 'B',
            FormatCode::I16 => 'h',
            FormatCode::U16 => 'H',
            FormatCode::I32 => 'i',
            FormatCode::U32 => 'I',
            FormatCode::I64 => 'q',
            FormatCode::U64 => 'Q',
            FormatCode::F32 => 'f',
            FormatCode::F64 => 'd',
        }
    }

    pub fn itemsize(self) -> usize {
        match self {
            FormatCode::I8 | FormatCode::U8 => 1,
            FormatCode::I16 | FormatCode::U16 => 2,
            FormatCode::I32 | FormatCode::U32 | FormatCode::F32 => 4,
            FormatCode::I64 | FormatCode::U64 | FormatCode::F64 => 8,
        }
    }

    /// The JS typed-array constructor this code views bytes through.
    pub fn typed_array_name(self) -> &'static str {
        match self {
            FormatCode::I8 => "Int8Array",
            FormatCode::U8 => "Uint8Array",
            FormatCode::I16 => "Int16Array",
            FormatCode::U16 => "Uint16Array",
            FormatCode::I32 => "Int32Array",
            FormatCode::U32 => "Uint32Array",
            FormatCode::I64 => "BigInt64Array",
            FormatCode::U64 => "BigUint64Array",
            FormatCode::F32 => "Float32Array",
            FormatCode::F64 => "Float64Array",
        }
    }

    pub fn from_typed_array_name(name: &str) -> Option<Self> {
        Some(match name {
            "Int8Array" => FormatCode::I8,
            "Uint8Array" | "Uint8ClampedArray" => FormatCode::U8,
            "Int16Array" => FormatCode::I16,
            "Uint16Array" => FormatCode::U16,
            "Int32Array" => FormatCode::I32,
            "Uint32Array" => FormatCode::U32,
            "BigInt64Array" => FormatCode::I64,
            "BigUint64Array" => FormatCode::U64,
            "Float32Array" => FormatCode::F32,
            "Float64Array" => FormatCode::F64,
            _ => return None,
        })
    }
}

/// A shared host byte buffer with a buffer-protocol format.
///
/// Read-only buffers cross to JS through the immutable-bytes proxy; writable
/// buffers cross as typed arrays over an engine ArrayBuffer.
#[derive(Clone)]
pub struct HostBytes {
    data: Rc<RefCell<Vec<u8>>>,
    format: FormatCode,
    readonly: bool,
}

impl HostBytes {
    /// An immutable byte string.
    pub fn immutable(data: Vec<u8>) -> Self {
        HostBytes {
            data: Rc::new(RefCell::new(data)),
            format: FormatCode::U8,
            readonly: true,
        }
    }

    /// A writable buffer with an element format.
    pub fn writable(data: Vec<u8>, format: FormatCode) -> Self {
        HostBytes {
            data: Rc::new(RefCell::new(data)),
            format,
            readonly: false,
        }
    }

    pub fn len(&self) -> usize {
        self.data.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.borrow().is_empty()
    }

    pub fn format(&self) -> FormatCode {
        self.format
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    pub fn byte(&self, index: usize) -> Option<u8> {
        self.data.borrow().get(index).copied()
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.data.borrow().clone()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

impl PartialEq for HostBytes {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.data.borrow() == *other.data.borrow()
    }
}
