//! JSON-lines sink: one object per event on stdout, tagged with its topic.

use std::io::{self, Write};

use fleet_core::emitter::Subscription;
use fleet_core::events::{TOPIC_BOOKINGS, TOPIC_CAR_LIVE_DATA, TOPIC_TRIPS};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Serialize)]
struct Tagged<'a, T> {
    topic: &'static str,
    #[serde(flatten)]
    event: &'a T,
}

/// Renders `event` as a single JSON line with a leading `topic` field.
pub fn json_line<T: Serialize>(topic: &'static str, event: &T) -> serde_json::Result<String> {
    let mut line = serde_json::to_string(&Tagged { topic, event })?;
    line.push('\n');
    Ok(line)
}

/// Writes every event of `events` to `out` until all three categories close.
/// Returns the number of lines written.
pub async fn run_sink<W: Write>(mut events: Subscription, mut out: W) -> io::Result<u64> {
    let mut written = 0u64;
    loop {
        let line = tokio::select! {
            Some(e) = events.status.recv() => json_line(TOPIC_CAR_LIVE_DATA, &e),
            Some(e) = events.trips.recv() => json_line(TOPIC_TRIPS, &e),
            Some(e) = events.bookings.recv() => json_line(TOPIC_BOOKINGS, &e),
            else => break,
        };
        match line {
            Ok(line) => {
                out.write_all(line.as_bytes())?;
                written += 1;
            }
            Err(err) => warn!(%err, "dropping unserializable event"),
        }
    }
    out.flush()?;
    debug!(written, "stdout sink drained");
    Ok(written)
}

pub fn spawn_stdout_sink(events: Subscription) -> JoinHandle<io::Result<u64>> {
    tokio::spawn(run_sink(events, io::LineWriter::new(io::stdout())))
}
