//! SNMP value types.

use bytes::Bytes;

use crate::ber::{Decoder, EncodeBuf, tag};
use crate::error::{DecodeErrorKind, Error, Result};
use crate::oid::Oid;

/// An SNMP value as carried in a varbind.
///
/// Besides the regular ASN.1 types this includes the two exception values
/// the agent core uses as sentinels: [`Value::NoSuchObject`] when an OID
/// resolves to no scalar, and [`Value::EndOfMibView`] when a GETNEXT has no
/// lexicographic successor.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// INTEGER (signed 32-bit).
    Integer(i32),
    /// OCTET STRING.
    OctetString(Bytes),
    /// NULL (used as the placeholder value in requests).
    Null,
    /// OBJECT IDENTIFIER.
    ObjectIdentifier(Oid),
    /// IpAddress (4 octets, network order).
    IpAddress([u8; 4]),
    /// Counter32.
    Counter32(u32),
    /// Gauge32 / Unsigned32.
    Gauge32(u32),
    /// TimeTicks (centiseconds).
    TimeTicks(u32),
    /// Opaque (uninterpreted octets).
    Opaque(Bytes),
    /// Counter64.
    Counter64(u64),
    /// Exception: no value exists at the requested name.
    NoSuchObject,
    /// Exception: no lexicographic successor exists.
    EndOfMibView,
}

impl Value {
    /// Build an OCTET STRING from text.
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::OctetString(Bytes::copy_from_slice(s.as_ref().as_bytes()))
    }

    /// True for the exception values.
    pub fn is_exception(&self) -> bool {
        matches!(self, Value::NoSuchObject | Value::EndOfMibView)
    }

    /// Encode to BER.
    pub fn encode(&self, buf: &mut EncodeBuf) {
        match self {
            Value::Integer(v) => buf.push_integer(*v),
            Value::OctetString(data) => buf.push_octet_string(data),
            Value::Null => buf.push_null(),
            Value::ObjectIdentifier(oid) => buf.push_oid(oid),
            Value::IpAddress(addr) => buf.push_ip_address(*addr),
            Value::Counter32(v) => buf.push_unsigned32(tag::application::COUNTER32, *v),
            Value::Gauge32(v) => buf.push_unsigned32(tag::application::GAUGE32, *v),
            Value::TimeTicks(v) => buf.push_unsigned32(tag::application::TIMETICKS, *v),
            Value::Opaque(data) => {
                buf.push_bytes(data);
                buf.push_length(data.len());
                buf.push_tag(tag::application::OPAQUE);
            }
            Value::Counter64(v) => buf.push_counter64(*v),
            Value::NoSuchObject => buf.push_empty(tag::context::NO_SUCH_OBJECT),
            Value::EndOfMibView => buf.push_empty(tag::context::END_OF_MIB_VIEW),
        }
    }

    /// Decode from BER.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let next = decoder.peek_tag()?;
        match next {
            tag::universal::INTEGER => Ok(Value::Integer(decoder.read_integer()?)),
            tag::universal::OCTET_STRING => Ok(Value::OctetString(decoder.read_octet_string()?)),
            tag::universal::NULL => {
                decoder.read_null()?;
                Ok(Value::Null)
            }
            tag::universal::OBJECT_IDENTIFIER => Ok(Value::ObjectIdentifier(decoder.read_oid()?)),
            tag::application::IP_ADDRESS => Ok(Value::IpAddress(decoder.read_ip_address()?)),
            tag::application::COUNTER32 => Ok(Value::Counter32(
                decoder.read_unsigned32(tag::application::COUNTER32)?,
            )),
            tag::application::GAUGE32 => Ok(Value::Gauge32(
                decoder.read_unsigned32(tag::application::GAUGE32)?,
            )),
            tag::application::TIMETICKS => Ok(Value::TimeTicks(
                decoder.read_unsigned32(tag::application::TIMETICKS)?,
            )),
            tag::application::OPAQUE => {
                let (_, content) = decoder.read_tlv()?;
                Ok(Value::Opaque(content))
            }
            tag::application::COUNTER64 => Ok(Value::Counter64(decoder.read_counter64()?)),
            tag::context::NO_SUCH_OBJECT => {
                decoder.read_tlv()?;
                Ok(Value::NoSuchObject)
            }
            tag::context::END_OF_MIB_VIEW => {
                decoder.read_tlv()?;
                Ok(Value::EndOfMibView)
            }
            other => Err(Error::decode(
                decoder.offset(),
                DecodeErrorKind::UnknownValueTag(other),
            )),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{v}"),
            Value::OctetString(data) => match std::str::from_utf8(data) {
                Ok(s) => write!(f, "{s}"),
                Err(_) => {
                    for byte in data.iter() {
                        write!(f, "{byte:02x}")?;
                    }
                    Ok(())
                }
            },
            Value::Null => write!(f, "NULL"),
            Value::ObjectIdentifier(oid) => write!(f, "{oid}"),
            Value::IpAddress([a, b, c, d]) => write!(f, "{a}.{b}.{c}.{d}"),
            Value::Counter32(v) | Value::Gauge32(v) | Value::TimeTicks(v) => write!(f, "{v}"),
            Value::Opaque(data) => {
                for byte in data.iter() {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            Value::Counter64(v) => write!(f, "{v}"),
            Value::NoSuchObject => write!(f, "noSuchObject"),
            Value::EndOfMibView => write!(f, "endOfMibView"),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::OctetString(Bytes::from(s.into_bytes()))
    }
}

impl From<Oid> for Value {
    fn from(oid: Oid) -> Self {
        Value::ObjectIdentifier(oid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    fn round_trip(value: Value) {
        let mut buf = EncodeBuf::new();
        value.encode(&mut buf);
        let bytes = buf.finish();
        let mut decoder = Decoder::new(bytes);
        assert_eq!(Value::decode(&mut decoder).unwrap(), value);
        assert!(decoder.is_empty());
    }

    #[test]
    fn all_variants_round_trip() {
        round_trip(Value::Integer(-42));
        round_trip(Value::string("test"));
        round_trip(Value::Null);
        round_trip(Value::ObjectIdentifier(oid!(1, 3, 6, 1, 4, 1)));
        round_trip(Value::IpAddress([10, 0, 0, 1]));
        round_trip(Value::Counter32(1000));
        round_trip(Value::Gauge32(500));
        round_trip(Value::TimeTicks(123456));
        round_trip(Value::Opaque(Bytes::from_static(&[0xDE, 0xAD])));
        round_trip(Value::Counter64(u64::MAX));
        round_trip(Value::NoSuchObject);
        round_trip(Value::EndOfMibView);
    }

    #[test]
    fn exceptions_flagged() {
        assert!(Value::NoSuchObject.is_exception());
        assert!(Value::EndOfMibView.is_exception());
        assert!(!Value::Integer(0).is_exception());
        assert!(!Value::Null.is_exception());
    }

    #[test]
    fn display_forms() {
        assert_eq!(Value::Integer(7).to_string(), "7");
        assert_eq!(Value::string("up").to_string(), "up");
        assert_eq!(Value::IpAddress([192, 168, 0, 1]).to_string(), "192.168.0.1");
        assert_eq!(Value::NoSuchObject.to_string(), "noSuchObject");
        assert_eq!(
            Value::OctetString(Bytes::from_static(&[0xFF, 0x00])).to_string(),
            "ff00"
        );
    }
}
