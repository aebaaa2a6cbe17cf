//! SNMPv1 message and PDU types.
//!
//! Wire shape (RFC 1157):
//!
//! ```text
//! SEQUENCE {
//!     version    INTEGER (0 for SNMPv1),
//!     community  OCTET STRING,
//!     pdu        GetRequest | GetNextRequest | GetResponse,
//! }
//! ```
//!
//! Each PDU carries a request-id, error-status, error-index and a varbind
//! list. Only the three v1 read PDUs are modelled; SET and trap tags decode
//! to [`DecodeErrorKind::UnknownPduType`] so the serve loop can log and drop
//! them.

use bytes::Bytes;

use crate::ber::{Decoder, EncodeBuf, tag};
use crate::error::{DecodeErrorKind, Error, ErrorStatus, Result};
use crate::varbind::{VarBind, decode_varbind_list, encode_varbind_list};

/// The SNMPv1 version integer.
pub const VERSION_1: i32 = 0;

/// PDU kinds handled by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PduKind {
    /// GetRequest (0xA0).
    GetRequest,
    /// GetNextRequest (0xA1).
    GetNextRequest,
    /// GetResponse (0xA2).
    Response,
}

impl PduKind {
    /// The BER tag for this PDU kind.
    pub fn tag(self) -> u8 {
        match self {
            PduKind::GetRequest => tag::pdu::GET_REQUEST,
            PduKind::GetNextRequest => tag::pdu::GET_NEXT_REQUEST,
            PduKind::Response => tag::pdu::RESPONSE,
        }
    }

    fn from_tag(t: u8) -> Option<Self> {
        match t {
            tag::pdu::GET_REQUEST => Some(PduKind::GetRequest),
            tag::pdu::GET_NEXT_REQUEST => Some(PduKind::GetNextRequest),
            tag::pdu::RESPONSE => Some(PduKind::Response),
            _ => None,
        }
    }
}

/// An SNMPv1 PDU.
#[derive(Debug, Clone, PartialEq)]
pub struct Pdu {
    pub kind: PduKind,
    pub request_id: i32,
    pub error_status: ErrorStatus,
    pub error_index: i32,
    pub varbinds: Vec<VarBind>,
}

impl Pdu {
    /// Create a request PDU with no error fields set.
    pub fn request(kind: PduKind, request_id: i32, varbinds: Vec<VarBind>) -> Self {
        Self {
            kind,
            request_id,
            error_status: ErrorStatus::NoError,
            error_index: 0,
            varbinds,
        }
    }

    /// Turn this PDU into a response shell: same request-id, kind rewritten,
    /// varbinds replaced by the caller afterwards.
    pub fn into_response(mut self) -> Self {
        self.kind = PduKind::Response;
        self
    }

    /// Encode to BER.
    pub fn encode(&self, buf: &mut EncodeBuf) {
        buf.push_constructed(self.kind.tag(), |buf| {
            encode_varbind_list(buf, &self.varbinds);
            buf.push_integer(self.error_index);
            buf.push_integer(self.error_status.as_i32());
            buf.push_integer(self.request_id);
        });
    }

    /// Decode from BER.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let offset = decoder.offset();
        let pdu_tag = decoder.peek_tag()?;
        let kind = PduKind::from_tag(pdu_tag)
            .ok_or_else(|| Error::decode(offset, DecodeErrorKind::UnknownPduType(pdu_tag)))?;
        let mut body = decoder.read_constructed(pdu_tag)?;
        let request_id = body.read_integer()?;
        let error_status = ErrorStatus::from_i32(body.read_integer()?);
        let error_index = body.read_integer()?;
        let varbinds = decode_varbind_list(&mut body)?;
        Ok(Pdu {
            kind,
            request_id,
            error_status,
            error_index,
            varbinds,
        })
    }
}

/// A community-authenticated SNMPv1 message.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub community: Bytes,
    pub pdu: Pdu,
}

impl Message {
    /// Create a message.
    pub fn new(community: impl Into<Bytes>, pdu: Pdu) -> Self {
        Self {
            community: community.into(),
            pdu,
        }
    }

    /// Encode the full message.
    pub fn encode(&self) -> Bytes {
        let mut buf = EncodeBuf::new();
        buf.push_sequence(|buf| {
            self.pdu.encode(buf);
            buf.push_octet_string(&self.community);
            buf.push_integer(VERSION_1);
        });
        buf.finish()
    }

    /// Decode a full message, rejecting any version other than SNMPv1.
    pub fn decode(data: Bytes) -> Result<Self> {
        let mut decoder = Decoder::new(data);
        let mut seq = decoder.read_sequence()?;
        let version_offset = seq.offset();
        let version = seq.read_integer()?;
        if version != VERSION_1 {
            return Err(Error::decode(
                version_offset,
                DecodeErrorKind::UnknownVersion(version),
            ));
        }
        let community = seq.read_octet_string()?;
        let pdu = Pdu::decode(&mut seq)?;
        Ok(Message { community, pdu })
    }
}
