//! DNS-over-HTTPS gateway endpoint
//!
//! Implements the RFC 8484 request surface on top of `tiny_http`: queries
//! arrive either as a base64url `dns` parameter on GET or as a raw
//! `application/dns-message` POST body. Each request is decoded into a
//! `ResolvedQuery`, re-issued as a fresh wire query against the configured
//! upstream resolver and the packed answer is relayed back verbatim.

use std::io::Read;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use derive_more::{Display, Error, From};
use rand::random;
use tiny_http::{Header, Method, Request, Response, ResponseBox, Server};

use crate::dns::buffer::VectorPacketBuffer;
use crate::dns::context::ServerContext;
use crate::dns::protocol::{fqdn, DnsPacket, DnsQuestion, ProtocolError, QueryType, ResultCode};
use crate::dns::resolver::{ResolveError, UpstreamResolver};

/// The only media type RFC 8484 defines for binary DNS messages
pub const DOH_CONTENT_TYPE: &str = "application/dns-message";

#[derive(Debug, Display, From, Error)]
pub enum DohError {
    /// GET without a usable `dns` query parameter
    MissingQuery,
    /// The `dns` parameter was not valid unpadded base64url
    BadEncoding(base64::DecodeError),
    /// The raw bytes did not unpack as a DNS message
    MalformedMessage(ProtocolError),
    /// The inbound message did not carry exactly one question
    InvalidQuestionCount,
    /// POST with a content type other than `application/dns-message`
    UnsupportedMediaType,
    /// Any HTTP method besides GET and POST
    UnsupportedMethod,
    /// Reading the POST body failed
    Body(std::io::Error),
    /// The upstream round trip or answer serialization failed
    Upstream(ResolveError),
}

impl DohError {
    /// Decode-stage failures are the client's fault; everything upstream of
    /// the decoder is ours.
    pub fn status_code(&self) -> u16 {
        match self {
            DohError::Upstream(_) => 500,
            _ => 400,
        }
    }
}

type Result<T> = std::result::Result<T, DohError>;

/// The canonical query extracted from an inbound HTTP request. Lives only
/// for the duration of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedQuery {
    pub name: String,
    /// Symbolic record type name, e.g. "A" or "AAAA"
    pub qtype: String,
    /// Transaction id of the inbound message; informational only, never
    /// reused for the outgoing query
    pub id: u16,
}

/// Extract the `dns` parameter from a request url.
fn dns_param(url: &str) -> Result<&str> {
    let query_string = url.split('?').nth(1).ok_or(DohError::MissingQuery)?;

    let encoded = query_string
        .split('&')
        .find_map(|param| param.strip_prefix("dns="))
        .ok_or(DohError::MissingQuery)?;

    if encoded.is_empty() {
        return Err(DohError::MissingQuery);
    }

    Ok(encoded)
}

/// Unpack raw wire bytes and pull out the single question they must carry.
pub fn decode_query(message: &[u8]) -> Result<ResolvedQuery> {
    let mut buffer = VectorPacketBuffer::from_bytes(message);
    let packet = DnsPacket::from_buffer(&mut buffer)?;

    if packet.questions.len() != 1 {
        return Err(DohError::InvalidQuestionCount);
    }

    log::debug!("unpacked inbound message: {:?}", packet);

    let question = &packet.questions[0];
    Ok(ResolvedQuery {
        name: question.name.clone(),
        qtype: question.qtype.to_string(),
        id: packet.header.id,
    })
}

/// Build a fresh outgoing query for `name`, independent of any state in the
/// inbound message: new random transaction id, recursion desired, one
/// question with the name in fully qualified form, internet class.
///
/// Anything that is not an explicit "A" lookup goes out as AAAA. Kept
/// bug-for-bug compatible with the behavior clients already depend on; do
/// not turn this into a type-aware dispatch without coordinating a
/// behavior change.
pub fn build_query(name: &str, qtype: &str) -> DnsPacket {
    let mut packet = DnsPacket::new();
    packet.header.id = random::<u16>();
    packet.header.opcode = 0;
    packet.header.rescode = ResultCode::NOERROR;
    packet.header.recursion_desired = true;

    let qtype = if qtype == "A" {
        QueryType::A
    } else {
        QueryType::Aaaa
    };

    packet.questions.push(DnsQuestion::new(fqdn(name), qtype));

    packet
}

/// Serialize the resolver's answer to the exact bytes carried in the HTTP
/// body.
fn pack_response(mut response: DnsPacket) -> Result<Vec<u8>> {
    let mut buffer = VectorPacketBuffer::new();
    response
        .write(&mut buffer)
        .map_err(|e| DohError::Upstream(ResolveError::PackFailed(e)))?;

    Ok(buffer.buffer)
}

/// HTTP front of the gateway. Owns the listener loop and spawns one thread
/// per request; no state is shared between requests beyond the read-only
/// context.
pub struct DohServer {
    context: Arc<ServerContext>,
    resolver: UpstreamResolver,
}

impl DohServer {
    pub fn new(context: Arc<ServerContext>) -> DohServer {
        let resolver = UpstreamResolver::new(context.upstream, context.timeout);
        DohServer { context, resolver }
    }

    /// Bind the configured port and serve until the process exits.
    pub fn run_server(self) {
        let server = match Server::http(("0.0.0.0", self.context.http_port)) {
            Ok(x) => x,
            Err(e) => {
                log::error!("Failed to start HTTP server: {:?}", e);
                return;
            }
        };

        log::info!(
            "DoH gateway listening on port {}, forwarding to {}",
            self.context.http_port,
            self.context.upstream
        );

        self.serve(server);
    }

    /// Request loop over an already bound listener.
    pub fn serve(self, server: Server) {
        let handler = Arc::new(self);

        for request in server.incoming_requests() {
            let handler = Arc::clone(&handler);
            thread::spawn(move || handler.handle_request(request));
        }
    }

    fn handle_request(&self, mut request: Request) {
        log::info!("HTTP {:?} {}", request.method(), request.url());

        let response = self.route_request(&mut request);
        if let Err(err) = request.respond(response) {
            log::info!("Failed to write response to client: {:?}", err);
        }
    }

    fn route_request(&self, request: &mut Request) -> ResponseBox {
        let path = match request.url().split('?').next() {
            Some(path) => path.to_string(),
            None => "/".to_string(),
        };

        let method = request.method().clone();
        match (method, path.as_str()) {
            (_, "/dns-query") => self.handle_dns_query(request),
            (Method::Get, "/health") => Response::from_string("ok").boxed(),
            (Method::Get, "/") => {
                Response::from_string("dohd DNS-over-HTTPS gateway, try /dns-query").boxed()
            }
            (_, _) => Response::from_string("Not Found").with_status_code(404).boxed(),
        }
    }

    fn handle_dns_query(&self, request: &mut Request) -> ResponseBox {
        match self.process_query(request) {
            Ok(packed) => {
                let content_type =
                    Header::from_bytes(&b"Content-Type"[..], DOH_CONTENT_TYPE.as_bytes()).unwrap();
                Response::from_data(packed).with_header(content_type).boxed()
            }
            Err(err) => {
                let status = err.status_code();
                let text = if status == 400 {
                    "Bad Request"
                } else {
                    "Internal Server Error"
                };
                Response::from_string(text).with_status_code(status).boxed()
            }
        }
    }

    /// The full pipeline for one request: decode, synthesize, resolve, pack.
    fn process_query(&self, request: &mut Request) -> Result<Vec<u8>> {
        let method = request.method().clone();

        let resolved = match self.parse_request(request) {
            Ok(resolved) => resolved,
            Err(err) => {
                log::info!("Failed parsing {:?} request: {}", method, err);
                return Err(err);
            }
        };

        log::debug!(
            "{:?} resolving: {} {} (inbound id {})",
            method,
            resolved.name,
            resolved.qtype,
            resolved.id
        );

        let mut query = build_query(&resolved.name, &resolved.qtype);

        let start = Instant::now();
        let response = match self.resolver.resolve(&mut query) {
            Ok(response) => response,
            Err(err) => {
                log::info!(
                    "Query for {} failed after {:?}: {}",
                    resolved.name,
                    start.elapsed(),
                    err
                );
                return Err(DohError::Upstream(err));
            }
        };
        let elapsed = start.elapsed();

        let packed = pack_response(response)?;

        log::debug!(
            "{:?} answer: qname='{}' qtype='{}' qid={} elapsed={:?} ({} bytes)",
            method,
            resolved.name,
            resolved.qtype,
            resolved.id,
            elapsed,
            packed.len()
        );

        Ok(packed)
    }

    /// Decode the inbound request into a `ResolvedQuery`, dispatching on the
    /// HTTP method.
    fn parse_request(&self, request: &mut Request) -> Result<ResolvedQuery> {
        let method = request.method().clone();
        match method {
            Method::Get => {
                let encoded = dns_param(request.url())?;
                let message = base64::decode_config(encoded, base64::URL_SAFE_NO_PAD)?;
                decode_query(&message)
            }
            Method::Post => {
                let content_type = request
                    .headers()
                    .iter()
                    .find(|h| h.field.as_str() == "Content-Type")
                    .map(|h| h.value.as_str().to_string());

                // RFC 8484 names a single media type; anything else is
                // rejected outright, parameters included.
                match content_type.as_deref() {
                    Some(DOH_CONTENT_TYPE) => {}
                    other => {
                        log::info!(
                            "Unsupported content type, expected '{}', got {:?}",
                            DOH_CONTENT_TYPE,
                            other
                        );
                        return Err(DohError::UnsupportedMediaType);
                    }
                }

                let mut body = Vec::new();
                request.as_reader().read_to_end(&mut body)?;

                decode_query(&body)
            }
            _ => Err(DohError::UnsupportedMethod),
        }
    }
}
