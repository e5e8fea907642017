//! dohd is a small DNS-over-HTTPS gateway: it accepts RFC 8484 requests
//! over HTTP, re-issues each question as a fresh query against a single
//! configured upstream resolver over TCP, and relays the answer back as an
//! `application/dns-message` body.

pub mod dns;
