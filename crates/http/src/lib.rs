//! HTTP-like request/response exchange over arbitrary duplex byte streams.
//!
//! Quasi-HTTP keeps the shape of HTTP (method and target, status code and
//! message, multi-valued headers, streamed bodies) but frames messages itself,
//! so any connection that can read and write bytes will do: sockets, pipes,
//! in-memory streams. One connection carries exactly one exchange.
//!
//! # Example
//!
//! ```
//! use std::convert::Infallible;
//! use quasi_http::application::make_application;
//! use quasi_http::protocol::{QuasiBody, QuasiRequest, QuasiResponse, ProcessingOptions, status};
//! use quasi_http::transport::memory::{MemoryClientTransport, MemoryServerTransport};
//! use quasi_http::{QuasiClient, QuasiServer};
//!
//! async fn shout(mut request: QuasiRequest) -> Result<QuasiResponse, Box<dyn std::error::Error + Send + Sync>> {
//!     let text = match request.body.as_mut() {
//!         Some(body) => body.read_to_bytes(1024).await?,
//!         None => Default::default(),
//!     };
//!     let reply = String::from_utf8_lossy(&text).to_uppercase();
//!     Ok(QuasiResponse::new(status::OK).body(QuasiBody::from_bytes(reply)))
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let (server_transport, connector) = MemoryServerTransport::channel(ProcessingOptions::default());
//! let server = QuasiServer::builder().transport(server_transport).application(make_application(shout)).build()?;
//! tokio::spawn(async move { server.serve().await });
//!
//! let client = QuasiClient::builder().transport(MemoryClientTransport::new().with_endpoint("shout", connector)).build()?;
//! let request = QuasiRequest::new("POST", "/").body(QuasiBody::from_bytes("hello"));
//! let mut response = client.send("shout", request, None).await?;
//!
//! assert_eq!(response.status_code, 200);
//! let body = response.body.as_mut().map(|b| b.read_to_bytes(1024));
//! assert_eq!(body.unwrap().await?, "HELLO");
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`protocol`]: requests, responses, bodies, options and errors
//! - [`codec`]: lead chunk and body chunk wire formats
//! - [`connection`]: a duplex stream plus the exchange deadline
//! - [`transport`]: where connections come from, with an in-memory implementation
//! - [`application`]: the server-side request processor
//! - [`QuasiClient`] / [`QuasiServer`]: the façades tying it together
//!
//! # Wire format
//!
//! Every message starts with a lead chunk: a 6-digit length, a version byte,
//! a flags byte and a CSV section holding the request or status line and the
//! headers. A body with a declared length follows as raw bytes. A body of
//! unknown length is sent as body chunks, each with a 10-digit length, a
//! version byte and a flags byte, closed by an empty chunk.
//!
//! # Error Handling
//!
//! - [`protocol::QuasiHttpError`]: everything a client or server call can fail with
//! - [`protocol::CodecError`]: malformed or oversized frames, unsatisfied content lengths
//!
//! Every error maps to an [`protocol::ErrorReason`] for coarse handling.
//!
//! # Limitations
//!
//! - One exchange per connection, no multiplexing
//! - No retries
//! - No encryption or authentication, left to the transport

pub mod application;
pub mod codec;
pub mod connection;
pub mod protocol;
pub mod transport;

mod client;
mod exchange;
mod server;
mod utils;

pub use client::{QuasiClient, QuasiClientBuilder};
pub use server::{QuasiServer, QuasiServerBuilder};
