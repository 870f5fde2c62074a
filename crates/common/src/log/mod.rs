use std::io;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, filter::LevelFilter, fmt, fmt::MakeWriter, prelude::*};

/// Installs the global subscriber writing to stdout. Keep the guard alive for
/// the life of the process or buffered records are lost.
pub fn logging_stdout() -> WorkerGuard {
    let (nonblocking, guard) = tracing_appender::non_blocking(io::stdout());
    init(nonblocking);
    guard
}

/// Same as [`logging_stdout`] but on stderr, for front ends that own stdout.
pub fn logging_stderr() -> WorkerGuard {
    let (nonblocking, guard) = tracing_appender::non_blocking(io::stderr());
    init(nonblocking);
    guard
}

fn init<W>(writer: W)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let default_level = if cfg!(debug_assertions) {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_file(cfg!(debug_assertions))
                .with_line_number(cfg!(debug_assertions)),
        )
        .with(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .init();
}
