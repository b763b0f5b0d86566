//! Start/finish bookkeeping around every external call.

use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Instant,
};

use {
    chatnest_common::Platform,
    tracing::{Instrument, debug, info_span, warn},
};

use crate::{
    bus::TelemetryBus,
    entry::{TelemetryEntry, ToolStatus},
};

/// Longest result summary kept on an entry.
const MAX_SUMMARY_CHARS: usize = 160;

#[cfg(feature = "metrics")]
mod names {
    /// Invocations by tool and terminal status.
    pub const INVOCATIONS_TOTAL: &str = "chatnest_invocations_total";
    /// Invocation wall time in seconds.
    pub const INVOCATION_DURATION_SECONDS: &str = "chatnest_invocation_duration_seconds";
}

/// Wraps calls with telemetry. The only publisher on its bus.
pub struct Mediator {
    bus: Arc<TelemetryBus>,
    next_id: AtomicU64,
}

impl Mediator {
    pub fn new(bus: Arc<TelemetryBus>) -> Self {
        Self {
            bus,
            next_id: AtomicU64::new(0),
        }
    }

    pub fn bus(&self) -> &Arc<TelemetryBus> {
        &self.bus
    }

    /// Run `call`, publishing a `calling` entry before and exactly one
    /// terminal update after. `describe` turns a successful value into the
    /// entry's result summary; failures use the error's `Display`.
    ///
    /// The entry is finalized before this returns. If the returned future is
    /// dropped first, the entry is finalized as an error (`cancelled`).
    pub async fn invoke<T, E, F, D>(
        &self,
        tool: &str,
        platform: Option<Platform>,
        call: F,
        describe: D,
    ) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
        D: FnOnce(&T) -> String,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let entry = TelemetryEntry::calling(id, tool, platform);
        self.bus.append_or_update(entry.clone());
        let mut pending = Pending {
            bus: &self.bus,
            entry,
            started: Instant::now(),
            finished: false,
        };

        let span = info_span!("invoke", tool, id, platform = platform.map(Platform::as_str));
        let result = call.instrument(span).await;
        match &result {
            Ok(value) => {
                let summary = describe(value);
                debug!(tool, id, summary = %summary, "call done");
                pending.finish(ToolStatus::Done, &summary);
            },
            Err(e) => {
                warn!(tool, id, error = %e, "call failed");
                pending.finish(ToolStatus::Error, &e.to_string());
            },
        }
        result
    }
}

/// Finalizes its entry on drop if nothing else did.
struct Pending<'a> {
    bus: &'a TelemetryBus,
    entry: TelemetryEntry,
    started: Instant,
    finished: bool,
}

impl Pending<'_> {
    fn finish(&mut self, status: ToolStatus, result: &str) {
        if self.finished {
            return;
        }
        self.finished = true;
        let elapsed = self.started.elapsed();
        let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

        #[cfg(feature = "metrics")]
        {
            metrics::counter!(
                names::INVOCATIONS_TOTAL,
                "tool" => self.entry.tool.clone(),
                "status" => status.as_str()
            )
            .increment(1);
            metrics::histogram!(
                names::INVOCATION_DURATION_SECONDS,
                "tool" => self.entry.tool.clone()
            )
            .record(elapsed.as_secs_f64());
        }

        self.bus.append_or_update(
            self.entry
                .finished(status, duration_ms, truncate_summary(result)),
        );
    }
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!(tool = %self.entry.tool, id = self.entry.id, "call abandoned before completion");
            self.finish(ToolStatus::Error, "cancelled");
        }
    }
}

fn truncate_summary(text: &str) -> String {
    let text = text.trim();
    match text.char_indices().nth(MAX_SUMMARY_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
