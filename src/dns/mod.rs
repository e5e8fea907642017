//! DNS protocol handling
//!
//! `buffer` and `protocol` implement the wire format, `netutil` the stream
//! framing, `resolver` the upstream TCP client and `doh` the HTTP surface
//! that ties them together.

pub mod buffer;
pub mod context;
pub mod doh;
pub mod netutil;
pub mod protocol;
pub mod resolver;
