//! Property-based testing for the DNS wire codec using proptest

use proptest::prelude::*;

use dohd::dns::buffer::{PacketBuffer, VectorPacketBuffer};
use dohd::dns::protocol::{DnsPacket, DnsQuestion, DnsRecord, QueryType};
use std::net::{Ipv4Addr, Ipv6Addr};

// Strategy for generating valid domain names
fn domain_name_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z][a-z0-9-]{0,61}[a-z0-9]?", 1..5).prop_map(|parts| parts.join("."))
}

fn ipv4_strategy() -> impl Strategy<Value = Ipv4Addr> {
    (any::<u8>(), any::<u8>(), any::<u8>(), any::<u8>())
        .prop_map(|(a, b, c, d)| Ipv4Addr::new(a, b, c, d))
}

fn ipv6_strategy() -> impl Strategy<Value = Ipv6Addr> {
    (
        any::<u16>(),
        any::<u16>(),
        any::<u16>(),
        any::<u16>(),
        any::<u16>(),
        any::<u16>(),
        any::<u16>(),
        any::<u16>(),
    )
        .prop_map(|(a, b, c, d, e, f, g, h)| Ipv6Addr::new(a, b, c, d, e, f, g, h))
}

proptest! {
    #[test]
    fn test_qname_roundtrip(name in domain_name_strategy()) {
        let mut buffer = VectorPacketBuffer::new();
        buffer.write_qname(&name).unwrap();
        buffer.pos = 0;

        let mut read_back = String::new();
        buffer.read_qname(&mut read_back).unwrap();
        prop_assert_eq!(read_back, name);
    }

    #[test]
    fn test_qname_reads_are_lowercased(
        parts in prop::collection::vec("[A-Za-z][A-Za-z0-9-]{0,61}[A-Za-z0-9]?", 1..5)
    ) {
        let name = parts.join(".");
        let mut buffer = VectorPacketBuffer::new();
        buffer.write_qname(&name).unwrap();
        buffer.pos = 0;

        let mut read_back = String::new();
        buffer.read_qname(&mut read_back).unwrap();
        prop_assert_eq!(read_back, name.to_lowercase());
    }

    #[test]
    fn test_qname_compression_saves_space(
        prefix in "[a-z][a-z0-9]{0,10}",
        suffix in domain_name_strategy()
    ) {
        // A name followed by a subdomain of it should compress the shared
        // suffix to a two byte pointer, and both must read back intact
        let child = format!("{}.{}", prefix, suffix);

        let mut buffer = VectorPacketBuffer::new();
        buffer.write_qname(&suffix).unwrap();
        let first_len = buffer.pos;
        buffer.write_qname(&child).unwrap();
        let second_len = buffer.pos - first_len;

        // prefix label + 2 byte pointer
        prop_assert_eq!(second_len, prefix.len() + 1 + 2);

        buffer.pos = 0;
        let mut a = String::new();
        let mut b = String::new();
        buffer.read_qname(&mut a).unwrap();
        buffer.read_qname(&mut b).unwrap();
        prop_assert_eq!(a, suffix);
        prop_assert_eq!(b, child);
    }

    #[test]
    fn test_query_packet_roundtrip(
        id in any::<u16>(),
        name in domain_name_strategy(),
        use_a in any::<bool>()
    ) {
        let qtype = if use_a { QueryType::A } else { QueryType::Aaaa };

        let mut packet = DnsPacket::new();
        packet.header.id = id;
        packet.header.recursion_desired = true;
        packet.questions.push(DnsQuestion::new(name.clone(), qtype));

        let mut buffer = VectorPacketBuffer::new();
        packet.write(&mut buffer).unwrap();

        let mut read_buffer = VectorPacketBuffer::from_bytes(&buffer.buffer);
        let parsed = DnsPacket::from_buffer(&mut read_buffer).unwrap();

        prop_assert_eq!(parsed.header.id, id);
        prop_assert!(parsed.header.recursion_desired);
        prop_assert_eq!(parsed.questions.len(), 1);
        prop_assert_eq!(&parsed.questions[0].name, &name);
        prop_assert_eq!(parsed.questions[0].qtype, qtype);
    }

    #[test]
    fn test_answer_packet_roundtrip(
        id in any::<u16>(),
        name in domain_name_strategy(),
        v4 in ipv4_strategy(),
        v6 in ipv6_strategy(),
        ttl in any::<u32>()
    ) {
        let mut packet = DnsPacket::new();
        packet.header.id = id;
        packet.header.response = true;
        packet.header.recursion_available = true;
        packet
            .questions
            .push(DnsQuestion::new(name.clone(), QueryType::A));
        packet.answers.push(DnsRecord::A {
            domain: name.clone(),
            addr: v4,
            ttl,
        });
        packet.answers.push(DnsRecord::Aaaa {
            domain: name.clone(),
            addr: v6,
            ttl,
        });

        let mut buffer = VectorPacketBuffer::new();
        packet.write(&mut buffer).unwrap();

        let mut read_buffer = VectorPacketBuffer::from_bytes(&buffer.buffer);
        let parsed = DnsPacket::from_buffer(&mut read_buffer).unwrap();

        prop_assert_eq!(parsed.header.id, id);
        prop_assert!(parsed.header.response);
        prop_assert_eq!(parsed.answers.len(), 2);
        prop_assert_eq!(&parsed.answers[0], &DnsRecord::A { domain: name.clone(), addr: v4, ttl });
        prop_assert_eq!(&parsed.answers[1], &DnsRecord::Aaaa { domain: name, addr: v6, ttl });
    }

    #[test]
    fn test_querytype_number_roundtrip(num in any::<u16>()) {
        prop_assert_eq!(QueryType::from_num(num).to_num(), num);
    }

    #[test]
    fn test_parser_never_panics_on_random_input(
        random_bytes in prop::collection::vec(any::<u8>(), 0..1024)
    ) {
        let mut buffer = VectorPacketBuffer::from_bytes(&random_bytes);
        let _ = DnsPacket::from_buffer(&mut buffer);
        prop_assert!(true);
    }
}
