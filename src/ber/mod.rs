//! BER (Basic Encoding Rules) codec for SNMPv1.
//!
//! Encoding and decoding of BER-encoded data as used on the SNMP wire.
//! Follows X.690 with permissive parsing; definite lengths only.

mod decode;
mod encode;
mod length;
pub mod tag;

pub use decode::*;
pub use encode::*;
pub use length::*;
pub use tag::*;
