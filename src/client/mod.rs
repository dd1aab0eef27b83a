//! Client side of the session: a cookie-carrying HTTP client that renews
//! expired access tokens on its own.

pub mod cookie_jar;
pub mod interceptor;
pub mod transport;

pub use cookie_jar::SessionCookies;
pub use interceptor::{ClientError, RefreshError, SessionClient};
pub use transport::{
    ClientRequest, ClientResponse, HttpTransport, ServiceTransport, Transport, TransportError,
};
