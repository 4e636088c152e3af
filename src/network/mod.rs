//! Declarative network queries and their translation into transport calls.
//!
//! A [`NetworkQuery`] describes a request (method, path, url parameters,
//! headers and body). [`NetworkQuery::to_request`] turns it into a
//! [`TransportRequest`] for a given base URL, and an [`HttpTransport`]
//! performs the actual I/O.

mod query;
mod request;
mod transport;

pub use query::{ContentType, Method, NetworkQuery};
pub use request::{RequestBody, TransportRequest};
pub use transport::{HttpTransport, ReqwestTransport};
