//! Reconnecting event source.
//!
//! Provides [`EventSource`], a pull-based client that keeps one event stream
//! open, transparently reconnects after transport failures and retryable
//! statuses, and resumes from the last seen event ID.

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use http::{HeaderName, HeaderValue, Request, Response};
use parking_lot::Mutex;
use tokio::{sync::Mutex as AsyncMutex, time::timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    config::EventSourceConfig,
    error::{BoxError, EventSourceError, EventSourceResult},
    parse::{Event, EventStream},
    request::RequestFactory,
    retry::{StatusClass, classify_status, retry_interval},
    transport::{EventTransport, ResponseBody},
};

/// Header carrying the ID of the last event seen on reconnect.
pub const LAST_EVENT_ID: HeaderName = HeaderName::from_static("last-event-id");

// ---------------------------------------------------------------------------
// Connection state
// ---------------------------------------------------------------------------

/// Observable state of an [`EventSource`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventSourceState {
    /// No stream is held; the next read will connect.
    Disconnected,
    /// A stream is open.
    Connected,
    /// Closed by the caller or by a clean end of stream.
    Closed,
}

impl EventSourceState {
    /// Returns `true` if a stream is open.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns `true` if reads fail with [`EventSourceError::Closed`].
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

type SharedStream = Arc<AsyncMutex<EventStream<ResponseBody>>>;

struct SourceState {
    current: Option<SharedStream>,
    last_event_id: String,
    retry_interval: Option<Duration>,
    closed: bool,
    /// Cancelled by `close`; replaced when an explicit connect reopens.
    cancel: CancellationToken,
}

// ---------------------------------------------------------------------------
// EventSource
// ---------------------------------------------------------------------------

/// A reconnecting event stream reader.
///
/// All methods take `&self`; share it through an [`Arc`] to close it from
/// another task while a read is blocked.
///
/// # Example
///
/// ```rust,no_run
/// use hpx_eventsource::{EventSource, EventSourceConfig, RequestTemplate};
///
/// # async fn example() -> hpx_eventsource::EventSourceResult<()> {
/// let template = RequestTemplate::parse("https://example.com/events")?;
/// let source = EventSource::http(EventSourceConfig::default(), template)?;
///
/// loop {
///     match source.next().await {
///         Ok(event) => println!("{}: {:?}", &*event.id, event.data),
///         Err(err) if err.is_end_of_stream() => break,
///         Err(err) => return Err(err),
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct EventSource {
    config: EventSourceConfig,
    factory: Box<dyn RequestFactory>,
    transport: Box<dyn EventTransport>,
    state: Mutex<SourceState>,
    /// Serializes connection attempts so at most one stream is ever stored.
    connecting: AsyncMutex<()>,
}

impl std::fmt::Debug for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSource")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("last_event_id", &self.last_event_id())
            .finish_non_exhaustive()
    }
}

impl EventSource {
    /// Create an unconnected event source. No request is made until the first
    /// read or an explicit [`connect`](Self::connect).
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` fails validation.
    pub fn new(
        config: EventSourceConfig,
        factory: impl RequestFactory,
        transport: impl EventTransport,
    ) -> EventSourceResult<Self> {
        config.validate().map_err(EventSourceError::config)?;

        Ok(Self {
            config,
            factory: Box::new(factory),
            transport: Box::new(transport),
            state: Mutex::new(SourceState {
                current: None,
                last_event_id: String::new(),
                retry_interval: None,
                closed: false,
                cancel: CancellationToken::new(),
            }),
            connecting: AsyncMutex::new(()),
        })
    }

    /// Create an event source using [`ReqwestTransport`](crate::ReqwestTransport)
    /// with a default client.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` fails validation.
    #[cfg(feature = "reqwest")]
    pub fn http(
        config: EventSourceConfig,
        factory: impl RequestFactory,
    ) -> EventSourceResult<Self> {
        Self::new(config, factory, crate::transport::ReqwestTransport::new())
    }

    /// Read the next event, connecting or reconnecting as needed.
    ///
    /// Transport failures, broken streams and 500/502/503/504 responses are
    /// retried after the current retry interval and never surface here.
    ///
    /// # Errors
    ///
    /// - [`EventSourceError::Closed`] if the source is closed, including by a
    ///   concurrent [`close`](Self::close) while this call is blocked.
    /// - [`EventSourceError::EndOfStream`] when the server ends the stream
    ///   cleanly. The source is closed afterwards.
    /// - [`EventSourceError::BadResponse`] for any other non-200 status.
    pub async fn next(&self) -> EventSourceResult<Event> {
        if self.state.lock().closed {
            return Err(EventSourceError::Closed);
        }

        loop {
            self.establish(false).await?;

            let (stream, cancel) = {
                let state = self.state.lock();
                if state.closed {
                    return Err(EventSourceError::Closed);
                }
                match &state.current {
                    Some(stream) => (Arc::clone(stream), state.cancel.clone()),
                    None => continue,
                }
            };

            let item = {
                let mut parser = tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(EventSourceError::Closed),
                    parser = stream.lock() => parser,
                };
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(EventSourceError::Closed),
                    item = parser.next() => item,
                }
            };

            match item {
                Some(Ok(event)) => {
                    let mut state = self.state.lock();
                    state.last_event_id = String::from(&*event.id);
                    // `retry: 0` leaves the current interval in place.
                    if let Some(retry) = event.retry.filter(|d| !d.is_zero()) {
                        state.retry_interval = Some(retry);
                    }
                    debug!(
                        id = &*event.id,
                        name = &*event.name,
                        len = event.data.len(),
                        "Event received"
                    );
                    return Ok(event);
                }
                None => {
                    info!("Event stream ended by server");
                    self.close();
                    return Err(EventSourceError::EndOfStream);
                }
                Some(Err(err)) => {
                    {
                        let mut state = self.state.lock();
                        if state.closed {
                            return Err(EventSourceError::Closed);
                        }
                        if state
                            .current
                            .as_ref()
                            .is_some_and(|current| Arc::ptr_eq(current, &stream))
                        {
                            state.current = None;
                        }
                    }
                    drop(stream);
                    let err = EventSourceError::from(err);
                    warn!(error = %err, "Event stream broke, reconnecting");
                    self.wait_for_retry(&cancel).await?;
                }
            }
        }
    }

    /// Connect now instead of on the first read.
    ///
    /// Does nothing if a stream is already open. Reopens a closed source:
    /// the last event ID and retry interval are kept.
    ///
    /// # Errors
    ///
    /// [`EventSourceError::BadResponse`] for a non-retryable status, or
    /// [`EventSourceError::Closed`] if [`close`](Self::close) is called while
    /// connecting.
    pub async fn connect(&self) -> EventSourceResult<()> {
        self.establish(true).await
    }

    /// Close the source.
    ///
    /// Releases the open stream, wakes any blocked [`next`](Self::next) call
    /// with [`EventSourceError::Closed`] and makes later reads fail the same
    /// way. Idempotent.
    pub fn close(&self) {
        let released = {
            let mut state = self.state.lock();
            state.closed = true;
            state.cancel.cancel();
            state.current.take()
        };

        if released.is_some() {
            info!("Event source closed");
        } else {
            debug!("Event source closed while disconnected");
        }
    }

    /// ID of the last event read, sent as `Last-Event-ID` on reconnect.
    pub fn last_event_id(&self) -> String {
        self.state.lock().last_event_id.clone()
    }

    /// Override the ID sent on the next connection attempt.
    ///
    /// Affects connections made after this call; an open stream keeps its
    /// own notion of the last ID.
    pub fn set_last_event_id(&self, id: impl Into<String>) {
        self.state.lock().last_event_id = id.into();
    }

    /// Delay that will be used before the next reconnection attempt.
    pub fn retry_interval(&self) -> Duration {
        let state = self.state.lock();
        retry_interval(state.retry_interval, self.config.default_retry_interval)
    }

    /// Current connection state.
    pub fn state(&self) -> EventSourceState {
        let state = self.state.lock();
        if state.closed {
            EventSourceState::Closed
        } else if state.current.is_some() {
            EventSourceState::Connected
        } else {
            EventSourceState::Disconnected
        }
    }

    /// Returns `true` if a stream is open.
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Returns `true` if the source has been closed.
    pub fn is_closed(&self) -> bool {
        self.state().is_closed()
    }

    /// Adapt the source into a [`Stream`] of events.
    ///
    /// The stream ends on [`EventSourceError::EndOfStream`] or
    /// [`EventSourceError::Closed`]. A bad response is yielded once and then
    /// ends the stream.
    pub fn stream(&self) -> impl Stream<Item = EventSourceResult<Event>> + Send + '_ {
        futures_util::stream::unfold(Some(self), |source| async move {
            let source = source?;
            match source.next().await {
                Ok(event) => Some((Ok(event), Some(source))),
                Err(EventSourceError::EndOfStream | EventSourceError::Closed) => None,
                Err(err) => Some((Err(err), None)),
            }
        })
    }

    // -----------------------------------------------------------------------
    // Connection management
    // -----------------------------------------------------------------------

    /// Ensure a stream is open, retrying transient failures.
    ///
    /// With `reopen` a closed source is reopened; otherwise it is an error.
    async fn establish(&self, reopen: bool) -> EventSourceResult<()> {
        let _connecting = self.connecting.lock().await;

        let cancel = {
            let mut state = self.state.lock();
            if state.current.is_some() {
                return Ok(());
            }
            if state.closed {
                if !reopen {
                    return Err(EventSourceError::Closed);
                }
                if state.cancel.is_cancelled() {
                    state.cancel = CancellationToken::new();
                }
            }
            state.cancel.clone()
        };

        let mut attempt: u32 = 0;
        loop {
            let request = self.create_request();
            let uri = request.uri().clone();
            info!(%uri, attempt, "Event source connecting");

            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(EventSourceError::Closed),
                outcome = self.send(request) => outcome,
            };

            match outcome {
                Ok(response) => match classify_status(response.status()) {
                    StatusClass::Success => {
                        let mut state = self.state.lock();
                        if cancel.is_cancelled() {
                            return Err(EventSourceError::Closed);
                        }
                        let mut parser = EventStream::new(response.into_body());
                        parser.set_last_event_id(state.last_event_id.clone());
                        state.current = Some(Arc::new(AsyncMutex::new(parser)));
                        state.closed = false;
                        info!(%uri, "Event source connected");
                        return Ok(());
                    }
                    StatusClass::Retryable => {
                        warn!(%uri, status = %response.status(), "Event source unavailable");
                    }
                    StatusClass::Fatal => {
                        let (parts, _body) = response.into_parts();
                        error!(%uri, status = %parts.status, "Event source rejected connection");
                        return Err(EventSourceError::bad_response(Response::from_parts(
                            parts,
                            (),
                        )));
                    }
                },
                Err(err) => {
                    let err = EventSourceError::transport(err);
                    warn!(%uri, error = %err, "Event source connection failed");
                }
            }

            attempt = attempt.saturating_add(1);
            self.wait_for_retry(&cancel).await?;
        }
    }

    fn create_request(&self) -> Request<Bytes> {
        let mut request = self.factory.create_request();
        let last_event_id = self.state.lock().last_event_id.clone();

        match HeaderValue::from_str(&last_event_id) {
            Ok(value) => {
                request.headers_mut().insert(LAST_EVENT_ID, value);
            }
            Err(_) => {
                request.headers_mut().remove(LAST_EVENT_ID);
                warn!(
                    last_event_id = %last_event_id,
                    "Last event ID is not a valid header value, omitting it"
                );
            }
        }

        request
    }

    async fn send(&self, request: Request<Bytes>) -> Result<Response<ResponseBody>, BoxError> {
        let Some(limit) = self.config.connect_timeout else {
            return self.transport.execute(request).await;
        };

        match timeout(limit, self.transport.execute(request)).await {
            Ok(result) => result,
            Err(_) => Err(format!("connection attempt timed out after {limit:?}").into()),
        }
    }

    async fn wait_for_retry(&self, cancel: &CancellationToken) -> EventSourceResult<()> {
        let delay = self.retry_interval();
        debug!(delay_ms = delay.as_millis() as u64, "Waiting before reconnecting");

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(EventSourceError::Closed),
            () = tokio::time::sleep(delay) => Ok(()),
        }
    }
}
