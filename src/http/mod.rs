//! Request construction, transport and execution.

mod executor;
mod request;
mod transport;
pub mod url;

pub use executor::{extract_response, RequestExecutor, Response, SendResult};
pub use request::{Method, RequestBody, RequestSpec};
pub use transport::{
  ReqwestTransport, Transport, TransportFailure, TransportRequest, TransportResponse,
};
pub use self::url::Query;
