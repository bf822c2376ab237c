//! The two halves of a quasi-HTTP exchange over a [`QuasiConnection`](crate::connection::QuasiConnection).
//!
//! - [`send`]: client side, writes the request while fetching the response
//! - [`receive`]: server side, reads the request, asks the application, writes the response
//!
//! Connection allocation, release and error reporting belong to the
//! [`QuasiClient`](crate::QuasiClient) and [`QuasiServer`](crate::QuasiServer) façades.

mod receive;
mod response_body;
mod send;

pub(crate) use receive::receive;
pub(crate) use response_body::ResponseBodyReader;
pub(crate) use send::{response_from_lead_chunk, send};
