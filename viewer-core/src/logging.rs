//! src/logging.rs
//! ============================================================================
//! # Logger: File-Only Tracing Setup
//!
//! The terminal belongs to the UI, so events go to a daily rolling file only:
//! `<log_dir>/course-viewer.YYYY-MM-DD`. Each line is
//! `SEQ LEVEL [file:line module] fields`.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Context;
use tracing::Metadata;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{
    EnvFilter,
    filter::Directive,
    fmt::{
        self, FmtContext,
        format::{FormatEvent, FormatFields, Writer},
    },
    prelude::*,
};

use crate::config::LoggingConfig;

const FILE_PREFIX: &str = "course-viewer";

pub struct Logger;

impl Logger {
    /// Call **once** near the start of `main`. Keep the guard alive until
    /// exit or buffered lines are lost.
    pub fn init_tracing(config: &LoggingConfig) -> anyhow::Result<WorkerGuard> {
        std::fs::create_dir_all(&config.log_dir).with_context(|| {
            format!("cannot create log dir {}", config.log_dir.display())
        })?;

        SEQ.get_or_init(|| AtomicUsize::new(1));

        let (writer, guard) =
            tracing_appender::non_blocking(rolling::daily(&config.log_dir, FILE_PREFIX));

        let directive: Directive = config
            .level
            .parse()
            .with_context(|| format!("invalid log level '{}'", config.level))?;
        let filter = EnvFilter::builder()
            .with_default_directive(directive)
            .from_env_lossy();

        let file_layer = fmt::layer()
            .event_format(SeqFileMod)
            .with_writer(writer)
            .with_ansi(false)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(file_layer)
            .try_init()
            .context("tracing subscriber already installed")?;

        Ok(guard)
    }
}

static SEQ: OnceLock<AtomicUsize> = OnceLock::new();

/// `[SEQ] LEVEL [file:line mod::path] message`
struct SeqFileMod;

impl<S, N> FormatEvent<S, N> for SeqFileMod
where
    S: tracing::Subscriber + for<'lookup> tracing_subscriber::registry::LookupSpan<'lookup>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut w: Writer<'_>,
        ev: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let seq: usize = SEQ
            .get()
            .map_or(0, |seq| seq.fetch_add(1, Ordering::Relaxed));

        let meta: &'static Metadata<'static> = ev.metadata();
        write!(
            w,
            "{seq:06} {:5} [{}:{} {}] ",
            meta.level(),
            meta.file().unwrap_or("??"),
            meta.line().unwrap_or(0),
            meta.module_path().unwrap_or("???"),
        )?;

        ctx.field_format().format_fields(w.by_ref(), ev)?;
        writeln!(w)
    }
}
