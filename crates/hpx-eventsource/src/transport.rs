//! Transport abstraction used by [`EventSource`](crate::EventSource).
//!
//! A transport turns a request into a response head plus a streaming body.
//! Dropping the body must release the underlying connection; the event source
//! relies on that to tear down a stream on close or reconnect.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use http::{Request, Response};

use crate::error::BoxError;

/// Streaming response body handed to the parser.
pub type ResponseBody = BoxStream<'static, Result<Bytes, BoxError>>;

/// Executes connection attempts for an event source.
#[async_trait]
pub trait EventTransport: Send + Sync + 'static {
    /// Send `request` and return as soon as the response head is available.
    ///
    /// Errors are treated as transient and retried by the caller.
    async fn execute(&self, request: Request<Bytes>) -> Result<Response<ResponseBody>, BoxError>;
}

#[async_trait]
impl<T> EventTransport for Arc<T>
where
    T: EventTransport + ?Sized,
{
    async fn execute(&self, request: Request<Bytes>) -> Result<Response<ResponseBody>, BoxError> {
        (**self).execute(request).await
    }
}

#[cfg(feature = "reqwest")]
pub use self::reqwest_transport::ReqwestTransport;

#[cfg(feature = "reqwest")]
mod reqwest_transport {
    use futures_util::{StreamExt, TryStreamExt};

    use super::*;

    /// [`EventTransport`] backed by a [`reqwest::Client`].
    #[derive(Clone, Debug, Default)]
    pub struct ReqwestTransport {
        client: reqwest::Client,
    }

    impl ReqwestTransport {
        /// Create a transport with a default client.
        pub fn new() -> Self {
            Self::default()
        }

        /// Use a preconfigured client (proxy, TLS roots, pool settings).
        pub fn with_client(client: reqwest::Client) -> Self {
            Self { client }
        }
    }

    #[async_trait]
    impl EventTransport for ReqwestTransport {
        async fn execute(
            &self,
            request: Request<Bytes>,
        ) -> Result<Response<ResponseBody>, BoxError> {
            let request = reqwest::Request::try_from(request)?;
            let response = self.client.execute(request).await?;

            let status = response.status();
            let version = response.version();
            let headers = response.headers().clone();
            let body = response
                .bytes_stream()
                .map_err(|e| Box::new(e) as BoxError)
                .boxed();

            let mut response = Response::new(body);
            *response.status_mut() = status;
            *response.version_mut() = version;
            *response.headers_mut() = headers;
            Ok(response)
        }
    }
}
