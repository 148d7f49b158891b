use std::{panic, thread};

use tracing::{error, level_filters::LevelFilter};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::CargoEnv;

const LOG_DIRECTORY: &str = "logs";
const LOG_FILE_PREFIX: &str = "smoothrelay.log";

/// dropping these flushes the log writer and shuts sentry down, main holds them until exit
pub struct LoggerGuards {
    pub _tracing_guard: WorkerGuard,
    pub _sentry_guard: Option<sentry::ClientInitGuard>,
}

pub struct Logger;

impl Logger {
    pub fn init(cargo_env: CargoEnv, sentry_dsn: Option<String>) -> LoggerGuards {
        let (writer, tracing_guard, max_level) = Self::writer(cargo_env);

        let sentry_guard = sentry_dsn.map(|dsn| {
            sentry::init((
                dsn,
                sentry::ClientOptions {
                    release: sentry::release_name!(),
                    environment: Some(cargo_env.name().into()),
                    attach_stacktrace: true,
                    ..Default::default()
                },
            ))
        });

        let registry = tracing_subscriber::registry()
            .with(max_level)
            .with(tracing_subscriber::fmt::layer().with_writer(writer))
            // None disables the layer
            .with(sentry_guard.as_ref().map(|_| sentry_tracing::layer()));
        registry.init();

        Self::install_panic_hook();

        LoggerGuards {
            _tracing_guard: tracing_guard,
            _sentry_guard: sentry_guard,
        }
    }

    // every proxied segment logs at debug, too much for a file on a small box
    fn writer(cargo_env: CargoEnv) -> (NonBlocking, WorkerGuard, LevelFilter) {
        match cargo_env {
            CargoEnv::Development => {
                let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
                (writer, guard, LevelFilter::DEBUG)
            }
            CargoEnv::Production => {
                let (writer, guard) = tracing_appender::non_blocking(
                    tracing_appender::rolling::daily(LOG_DIRECTORY, LOG_FILE_PREFIX),
                );
                (writer, guard, LevelFilter::INFO)
            }
        }
    }

    fn install_panic_hook() {
        panic::set_hook(Box::new(|info| {
            let current = thread::current();
            let thread_name = current.name().unwrap_or("unknown");

            let payload = info
                .payload()
                .downcast_ref::<&'static str>()
                .copied()
                .or_else(|| info.payload().downcast_ref::<String>().map(String::as_str))
                .unwrap_or("Box<Any>");

            let location = info
                .location()
                .map(|l| format!(" at {}:{}", l.file(), l.line()))
                .unwrap_or_default();

            error!(
                target: "panic",
                "thread '{}' panicked at '{}'{}\n{:?}",
                thread_name,
                payload,
                location,
                backtrace::Backtrace::new()
            );
        }));
    }
}
