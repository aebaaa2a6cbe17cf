//! BER decoding.
//!
//! A [`Decoder`] walks a `Bytes` buffer without copying: constructed types
//! yield sub-decoders that share the underlying buffer, and octet strings
//! are returned as cheap slices of it.

use bytes::Bytes;

use super::length::decode_length;
use super::tag;
use crate::error::{DecodeErrorKind, Error, Result};
use crate::oid::Oid;

/// Streaming BER decoder over a shared byte buffer.
pub struct Decoder {
    data: Bytes,
    /// Absolute offset of `data[0]` in the original message, for error reporting.
    base: usize,
    pos: usize,
}

impl Decoder {
    /// Create a decoder over the full buffer.
    pub fn new(data: Bytes) -> Self {
        Self {
            data,
            base: 0,
            pos: 0,
        }
    }

    /// Bytes left to decode.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// True when the buffer is exhausted.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Absolute offset of the next byte, for error reporting.
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    /// Look at the next tag without consuming anything.
    pub fn peek_tag(&self) -> Result<u8> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or_else(|| Error::decode(self.offset(), DecodeErrorKind::TruncatedData))
    }

    /// Read one TLV, returning its tag and content bytes.
    pub fn read_tlv(&mut self) -> Result<(u8, Bytes)> {
        let tag = self.peek_tag()?;
        let (len, len_octets) = decode_length(&self.data[self.pos + 1..], self.offset() + 1)?;
        let content_start = self.pos + 1 + len_octets;
        let content_end = content_start
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| Error::decode(self.offset(), DecodeErrorKind::TlvOverflow))?;
        let content = self.data.slice(content_start..content_end);
        self.pos = content_end;
        Ok((tag, content))
    }

    /// Read one TLV and require a specific tag.
    pub fn read_expected(&mut self, expected: u8) -> Result<Bytes> {
        let offset = self.offset();
        let (actual, content) = self.read_tlv()?;
        if actual != expected {
            return Err(Error::decode(
                offset,
                DecodeErrorKind::UnexpectedTag { expected, actual },
            ));
        }
        Ok(content)
    }

    /// Read a constructed TLV with the given tag, yielding a sub-decoder
    /// over its content.
    pub fn read_constructed(&mut self, expected: u8) -> Result<Decoder> {
        let content = self.read_expected(expected)?;
        let base = self.base + self.pos - content.len();
        Ok(Decoder {
            data: content,
            base,
            pos: 0,
        })
    }

    /// Read a SEQUENCE, yielding a sub-decoder over its content.
    pub fn read_sequence(&mut self) -> Result<Decoder> {
        self.read_constructed(tag::universal::SEQUENCE)
    }

    /// Read an INTEGER as `i32`.
    pub fn read_integer(&mut self) -> Result<i32> {
        let offset = self.offset();
        let content = self.read_expected(tag::universal::INTEGER)?;
        parse_i32(&content, offset)
    }

    /// Read an unsigned 32-bit value carried under an application tag
    /// (Counter32, Gauge32, TimeTicks).
    pub fn read_unsigned32(&mut self, expected: u8) -> Result<u32> {
        let offset = self.offset();
        let content = self.read_expected(expected)?;
        parse_u32(&content, offset)
    }

    /// Read a Counter64.
    pub fn read_counter64(&mut self) -> Result<u64> {
        let offset = self.offset();
        let content = self.read_expected(tag::application::COUNTER64)?;
        parse_u64(&content, offset)
    }

    /// Read an OCTET STRING without copying.
    pub fn read_octet_string(&mut self) -> Result<Bytes> {
        self.read_expected(tag::universal::OCTET_STRING)
    }

    /// Read a NULL.
    pub fn read_null(&mut self) -> Result<()> {
        let offset = self.offset();
        let content = self.read_expected(tag::universal::NULL)?;
        if !content.is_empty() {
            return Err(Error::decode(offset, DecodeErrorKind::InvalidNull));
        }
        Ok(())
    }

    /// Read an OBJECT IDENTIFIER.
    pub fn read_oid(&mut self) -> Result<Oid> {
        let content = self.read_expected(tag::universal::OBJECT_IDENTIFIER)?;
        Oid::from_ber(&content)
    }

    /// Read an IpAddress.
    pub fn read_ip_address(&mut self) -> Result<[u8; 4]> {
        let offset = self.offset();
        let content = self.read_expected(tag::application::IP_ADDRESS)?;
        <[u8; 4]>::try_from(&content[..]).map_err(|_| {
            Error::decode(
                offset,
                DecodeErrorKind::InvalidIpAddressLength {
                    length: content.len(),
                },
            )
        })
    }
}

/// Sign-extending i32 parse; minimal encoding is not enforced.
pub(crate) fn parse_i32(content: &[u8], offset: usize) -> Result<i32> {
    if content.is_empty() {
        return Err(Error::decode(offset, DecodeErrorKind::ZeroLengthInteger));
    }
    if content.len() > 4 {
        return Err(Error::decode(offset, DecodeErrorKind::IntegerOverflow));
    }
    let mut value: i32 = if content[0] & 0x80 != 0 { -1 } else { 0 };
    for &byte in content {
        value = (value << 8) | i32::from(byte);
    }
    Ok(value)
}

pub(crate) fn parse_u32(content: &[u8], offset: usize) -> Result<u32> {
    let value = parse_u64_common(content, offset, 5)?;
    u32::try_from(value).map_err(|_| Error::decode(offset, DecodeErrorKind::IntegerOverflow))
}

pub(crate) fn parse_u64(content: &[u8], offset: usize) -> Result<u64> {
    parse_u64_common(content, offset, 9)
}

fn parse_u64_common(content: &[u8], offset: usize, max_len: usize) -> Result<u64> {
    if content.is_empty() {
        return Err(Error::decode(offset, DecodeErrorKind::ZeroLengthInteger));
    }
    if content.len() > max_len || (content.len() == max_len && content[0] != 0) {
        return Err(Error::decode(offset, DecodeErrorKind::IntegerOverflow));
    }
    let mut value: u64 = 0;
    for &byte in content {
        value = (value << 8) | u64::from(byte);
    }
    Ok(value)
}
