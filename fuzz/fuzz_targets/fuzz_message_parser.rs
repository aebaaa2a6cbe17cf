#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;

use mib_agent::message::{Message, Pdu};

fuzz_target!(|data: &[u8]| {
    let bytes = Bytes::copy_from_slice(data);

    // Fuzz the SNMPv1 message decoder
    let _ = Message::decode(bytes.clone());

    // Fuzz the PDU decoder directly
    let mut decoder = mib_agent::ber::Decoder::new(bytes.clone());
    let _ = Pdu::decode(&mut decoder);
});
