//! Log event formatting (§2.1).
//!
//! The default `tracing_subscriber` layout renders span context ahead of the
//! target: `LEVEL span1:span2: target: message`. This crate's worker loops
//! each run inside exactly one named span for their whole lifetime
//! (`position_feed`, `matcher` — see the `tokio::spawn` sites in
//! `src/main.rs`), so putting the target first reads better when scanning a
//! log that interleaves both workers: `LEVEL target: span1:span2: message`.

use std::fmt;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::fmt::format::{self, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

/// Event formatter that writes the target ahead of the span chain.
pub struct TargetFirstFormat;

impl<S, N> FormatEvent<S, N> for TargetFirstFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        let level = *metadata.level();
        write!(writer, "{}{:>5}\x1b[0m ", ansi_color(level), level)?;
        write!(writer, "{}: ", metadata.target())?;

        let span_names: Vec<&str> = ctx
            .event_scope()
            .into_iter()
            .flat_map(|scope| scope.from_root())
            .map(|span| span.name())
            .collect();
        if !span_names.is_empty() {
            write!(writer, "{}: ", span_names.join(":"))?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// ANSI escape for the given level, reset separately by the caller.
fn ansi_color(level: Level) -> &'static str {
    match level {
        Level::ERROR => "\x1b[31m",
        Level::WARN => "\x1b[33m",
        Level::INFO => "\x1b[32m",
        Level::DEBUG => "\x1b[34m",
        Level::TRACE => "\x1b[35m",
    }
}
