// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Wire codec and file envelope for [`Document`] trees.
//!
//! The encoder walks entries in insertion order and is therefore
//! deterministic: the same document always produces the same bytes. The
//! decoder is strict — unknown tags, truncated lengths, invalid UTF-8,
//! duplicate names and trailing bytes are all typed rejections, never
//! best-effort tolerance.

use std::fs;
use std::path::Path;

use crate::document::Document;
use crate::value::{Tag, Value};
use crate::{EnvelopeError, FormatError, BDS_SIGNATURE, MAX_NESTING_DEPTH};

impl Document {
    /// Encodes this document's field list (the wire payload, without the file
    /// signature).
    ///
    /// # Errors
    /// Only [`FormatError::DepthExceeded`] — name and string lengths were
    /// validated on insertion.
    pub fn to_bytes(&self) -> Result<Vec<u8>, FormatError> {
        let mut out = Vec::new();
        enc_fields(self, &mut out, 0)?;
        Ok(out)
    }

    /// Decodes a document from a wire payload produced by
    /// [`Document::to_bytes`].
    ///
    /// The root document's name is not on the wire; the returned document is
    /// unnamed.
    ///
    /// # Errors
    /// Any [`FormatError`] decode variant; the input must be one complete
    /// document with no trailing bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        let mut idx = 0usize;
        let doc = dec_fields(bytes, &mut idx, String::new(), 0)?;
        if idx != bytes.len() {
            return Err(FormatError::TrailingBytes {
                remaining: bytes.len() - idx,
            });
        }
        Ok(doc)
    }

    /// Writes the [`BDS_SIGNATURE`] envelope followed by this document's
    /// payload to `path`.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), EnvelopeError> {
        let payload = self.to_bytes()?;
        let mut bytes = Vec::with_capacity(BDS_SIGNATURE.len() + payload.len());
        bytes.extend_from_slice(&BDS_SIGNATURE);
        bytes.extend_from_slice(&payload);
        fs::write(path, bytes)?;
        Ok(())
    }

    /// Reads an enveloped document from `path`, verifying the signature
    /// before parsing the payload.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, EnvelopeError> {
        let bytes = fs::read(path)?;
        if bytes.len() < BDS_SIGNATURE.len() {
            return Err(EnvelopeError::MissingSignature(bytes.len()));
        }
        let mut sig = [0u8; 6];
        sig.copy_from_slice(&bytes[..BDS_SIGNATURE.len()]);
        if sig != BDS_SIGNATURE {
            return Err(EnvelopeError::BadSignature(sig));
        }
        Ok(Self::from_bytes(&bytes[BDS_SIGNATURE.len()..])?)
    }
}

// --- Encoder --------------------------------------------------------------

fn enc_fields(doc: &Document, out: &mut Vec<u8>, depth: usize) -> Result<(), FormatError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(FormatError::DepthExceeded);
    }
    for (name, value) in doc.entries() {
        out.push(value.tag().to_byte());
        enc_prefixed(name, out);
        match value {
            Value::Byte(v) => out.push(v.to_be_bytes()[0]),
            Value::Char(v) => out.push(*v),
            Value::Short(v) => out.extend_from_slice(&v.to_be_bytes()),
            Value::Int(v) => out.extend_from_slice(&v.to_be_bytes()),
            Value::Long(v) => out.extend_from_slice(&v.to_be_bytes()),
            Value::Float(v) => out.extend_from_slice(&v.to_bits().to_be_bytes()),
            Value::Double(v) => out.extend_from_slice(&v.to_bits().to_be_bytes()),
            Value::Str(s) => enc_prefixed(s, out),
            Value::Document(child) => enc_fields(child, out, depth + 1)?,
            Value::DocumentArray(children) => {
                out.extend_from_slice(&(children.len() as u32).to_be_bytes());
                for child in children {
                    enc_prefixed(child.name(), out);
                    enc_fields(child, out, depth + 1)?;
                }
            }
        }
    }
    out.push(Tag::End.to_byte());
    Ok(())
}

/// Writes a `u16` BE length prefix plus UTF-8 bytes.
///
/// Lengths were validated on insertion, so the cast cannot truncate.
fn enc_prefixed(s: &str, out: &mut Vec<u8>) {
    out.extend_from_slice(&(s.len() as u16).to_be_bytes());
    out.extend_from_slice(s.as_bytes());
}

// --- Decoder --------------------------------------------------------------

fn dec_fields(
    bytes: &[u8],
    idx: &mut usize,
    name: String,
    depth: usize,
) -> Result<Document, FormatError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(FormatError::DepthExceeded);
    }
    let mut doc = Document::new(name);
    loop {
        let offset = *idx;
        let tag_byte = take_byte(bytes, idx)?;
        let Some(tag) = Tag::from_byte(tag_byte) else {
            return Err(FormatError::UnknownTag {
                tag: tag_byte,
                offset,
            });
        };
        if tag == Tag::End {
            return Ok(doc);
        }

        let field_name = dec_prefixed(bytes, idx)?;
        let value = match tag {
            Tag::Byte => Value::Byte(i8::from_be_bytes([take_byte(bytes, idx)?])),
            Tag::Char => Value::Char(take_byte(bytes, idx)?),
            Tag::Short => Value::Short(i16::from_be_bytes(take_array(bytes, idx)?)),
            Tag::Int => Value::Int(i32::from_be_bytes(take_array(bytes, idx)?)),
            Tag::Long => Value::Long(i64::from_be_bytes(take_array(bytes, idx)?)),
            Tag::Float => Value::Float(f32::from_bits(u32::from_be_bytes(take_array(bytes, idx)?))),
            Tag::Double => {
                Value::Double(f64::from_bits(u64::from_be_bytes(take_array(bytes, idx)?)))
            }
            Tag::String => Value::Str(dec_prefixed(bytes, idx)?),
            Tag::Document => {
                let child = dec_fields(bytes, idx, field_name.clone(), depth + 1)?;
                Value::Document(child)
            }
            Tag::DocArray => {
                let count = u32::from_be_bytes(take_array(bytes, idx)?) as usize;
                let mut children = Vec::new();
                for _ in 0..count {
                    let elem_name = dec_prefixed(bytes, idx)?;
                    children.push(dec_fields(bytes, idx, elem_name, depth + 1)?);
                }
                Value::DocumentArray(children)
            }
            Tag::End => unreachable!(),
        };
        doc.insert_decoded(field_name, value)?;
    }
}

fn take_byte(bytes: &[u8], idx: &mut usize) -> Result<u8, FormatError> {
    let offset = *idx;
    let Some(byte) = bytes.get(offset) else {
        return Err(FormatError::Truncated {
            needed: offset + 1,
            got: bytes.len(),
            offset,
        });
    };
    *idx = offset + 1;
    Ok(*byte)
}

fn take_array<const N: usize>(bytes: &[u8], idx: &mut usize) -> Result<[u8; N], FormatError> {
    let offset = *idx;
    let end = offset + N;
    if end > bytes.len() {
        return Err(FormatError::Truncated {
            needed: end,
            got: bytes.len(),
            offset,
        });
    }
    let mut buf = [0u8; N];
    buf.copy_from_slice(&bytes[offset..end]);
    *idx = end;
    Ok(buf)
}

/// Reads a `u16` BE length prefix plus UTF-8 bytes.
fn dec_prefixed(bytes: &[u8], idx: &mut usize) -> Result<String, FormatError> {
    let len = u16::from_be_bytes(take_array(bytes, idx)?) as usize;
    let offset = *idx;
    let end = offset + len;
    if end > bytes.len() {
        return Err(FormatError::Truncated {
            needed: end,
            got: bytes.len(),
            offset,
        });
    }
    let s = std::str::from_utf8(&bytes[offset..end])
        .map_err(|_| FormatError::InvalidUtf8 { offset })?
        .to_string();
    *idx = end;
    Ok(s)
}
