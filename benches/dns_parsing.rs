//! Performance benchmarks for the hot path of the gateway: unpacking an
//! inbound query and packing the upstream answer.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use dohd::dns::buffer::{PacketBuffer, VectorPacketBuffer};
use dohd::dns::doh::{build_query, decode_query};
use dohd::dns::protocol::{DnsPacket, DnsQuestion, DnsRecord, QueryType};
use std::net::Ipv4Addr;

fn query_bytes(name: &str) -> Vec<u8> {
    let mut packet = DnsPacket::new();
    packet.header.id = 0x1234;
    packet.header.recursion_desired = true;
    packet
        .questions
        .push(DnsQuestion::new(name.to_string(), QueryType::A));

    let mut buffer = VectorPacketBuffer::new();
    packet.write(&mut buffer).unwrap();
    buffer.buffer
}

fn answer_packet(name: &str, answers: usize) -> DnsPacket {
    let mut packet = DnsPacket::new();
    packet.header.id = 0x1234;
    packet.header.response = true;
    packet
        .questions
        .push(DnsQuestion::new(name.to_string(), QueryType::A));
    for i in 0..answers {
        packet.answers.push(DnsRecord::A {
            domain: name.to_string(),
            addr: Ipv4Addr::new(192, 0, 2, (i % 256) as u8),
            ttl: 300,
        });
    }
    packet
}

fn benchmark_decode_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("Query Decoding");

    let test_domains = [
        "a.com",
        "www.example.com",
        "deeply.nested.subdomain.example.com",
    ];

    for domain in test_domains {
        let message = query_bytes(domain);
        group.throughput(Throughput::Bytes(message.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(domain),
            &message,
            |b, message| {
                b.iter(|| {
                    let result = decode_query(black_box(message));
                    black_box(result)
                });
            },
        );
    }

    group.finish();
}

fn benchmark_base64_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("Parameter Decoding");

    let message = query_bytes("www.example.com");
    let encoded = base64::encode_config(&message, base64::URL_SAFE_NO_PAD);

    group.bench_function("base64url_decode", |b| {
        b.iter(|| {
            let result = base64::decode_config(black_box(&encoded), base64::URL_SAFE_NO_PAD);
            black_box(result)
        });
    });

    group.finish();
}

fn benchmark_build_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("Query Synthesis");

    group.bench_function("build_query_a", |b| {
        b.iter(|| black_box(build_query(black_box("www.example.com"), black_box("A"))));
    });

    group.finish();
}

fn benchmark_pack_answer(c: &mut Criterion) {
    let mut group = c.benchmark_group("Answer Packing");

    for answers in [1, 4, 16] {
        group.bench_with_input(
            BenchmarkId::from_parameter(answers),
            &answers,
            |b, &answers| {
                b.iter(|| {
                    let mut packet = answer_packet("www.example.com", answers);
                    let mut buffer = VectorPacketBuffer::new();
                    packet.write(&mut buffer).unwrap();
                    black_box(buffer.buffer)
                });
            },
        );
    }

    group.finish();
}

fn benchmark_qname_compression(c: &mut Criterion) {
    let mut group = c.benchmark_group("Name Compression");

    group.bench_function("write_qname_with_shared_suffix", |b| {
        b.iter(|| {
            let mut buffer = VectorPacketBuffer::new();
            buffer.write_qname(black_box("example.com")).unwrap();
            buffer.write_qname(black_box("www.example.com")).unwrap();
            buffer.write_qname(black_box("mail.example.com")).unwrap();
            black_box(buffer.buffer)
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_decode_query,
    benchmark_base64_decode,
    benchmark_build_query,
    benchmark_pack_answer,
    benchmark_qname_compression
);
criterion_main!(benches);
