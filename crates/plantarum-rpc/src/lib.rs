//! plantarum-rpc — JSON-RPC transport used by the chain reader.
//!
//! - [`RpcTransport`] — the async trait every transport implements
//! - [`JsonRpcRequest`] / [`JsonRpcResponse`] — wire types
//! - [`TransportError`] — structured error type
//! - [`HttpRpcClient`] — `reqwest`-backed transport
//!
//! Transports never retry on their own: a failed call surfaces to the
//! caller, which decides whether to shrink the request or give up.

pub mod error;
pub mod http;
pub mod request;
pub mod transport;

pub use error::TransportError;
pub use http::{HttpClientConfig, HttpRpcClient};
pub use request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcId};
pub use transport::RpcTransport;
