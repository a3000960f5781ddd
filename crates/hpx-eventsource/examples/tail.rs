//! Print every event from an event stream until it ends or Ctrl-C is pressed.
//!
//! ```sh
//! RUST_LOG=hpx_eventsource=debug cargo run --example tail -- https://example.com/events
//! ```

use std::{sync::Arc, time::Duration};

use hpx_eventsource::{EventSource, EventSourceConfig, RequestTemplate};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let url = std::env::args()
        .nth(1)
        .ok_or("usage: tail <url> [last-event-id]")?;

    let config = EventSourceConfig::new()
        .default_retry_interval(Duration::from_secs(3))
        .connect_timeout(Duration::from_secs(10));
    let source = Arc::new(EventSource::http(config, RequestTemplate::parse(&url)?)?);

    if let Some(last_event_id) = std::env::args().nth(2) {
        source.set_last_event_id(last_event_id);
    }

    // Close from another task; the blocked read returns `Closed`.
    tokio::spawn({
        let source = Arc::clone(&source);
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                source.close();
            }
        }
    });

    loop {
        match source.next().await {
            Ok(event) => {
                let name: &str = if event.name.is_empty() {
                    "message"
                } else {
                    &event.name
                };
                println!(
                    "[{}] {name}: {}",
                    &*event.id,
                    event.data_str().unwrap_or("<binary>")
                );
            }
            Err(err) if err.is_end_of_stream() || err.is_closed() => break,
            Err(err) => return Err(err.into()),
        }
    }

    println!("last event id: {:?}", source.last_event_id());
    Ok(())
}
