use once_cell::sync::OnceCell;
use std::path::PathBuf;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::{
    fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter,
};

/// Target used by the server's per-request access log events.
pub const ACCESS_TARGET: &str = "http.access";

static ACCESS_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Minutely,
    Hourly,
    Daily,
    Never,
}

impl Rotation {
    /// Case-insensitive; anything unrecognised rotates daily.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "minutely" => Self::Minutely,
            "hourly" => Self::Hourly,
            "never" => Self::Never,
            _ => Self::Daily,
        }
    }
}

/// Where access events are copied when file logging is on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessLogFile {
    pub dir: PathBuf,
    pub prefix: String,
    pub rotation: Rotation,
}

impl AccessLogFile {
    fn appender(&self) -> RollingFileAppender {
        let (dir, prefix) = (&self.dir, self.prefix.as_str());
        match self.rotation {
            Rotation::Minutely => tracing_appender::rolling::minutely(dir, prefix),
            Rotation::Hourly => tracing_appender::rolling::hourly(dir, prefix),
            Rotation::Never => tracing_appender::rolling::never(dir, prefix),
            Rotation::Daily => tracing_appender::rolling::daily(dir, prefix),
        }
    }
}

/// Access log settings shared by the subscriber (file sink) and the
/// server's request middleware (what each event carries).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessLogConfig {
    pub enabled: bool,
    pub sample_n: u64,
    pub ua: bool,
    pub ua_hash: bool,
    pub trust_forward: bool,
    /// Only set when the access log itself is enabled.
    pub file: Option<AccessLogFile>,
}

impl Default for AccessLogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            sample_n: 1,
            ua: false,
            ua_hash: false,
            trust_forward: false,
            file: None,
        }
    }
}

impl AccessLogConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str| get(key).as_deref() == Some("1");
        let enabled = flag("BOOKLIB_ACCESS_LOG");
        let file = (enabled && flag("BOOKLIB_ACCESS_LOG_ROLL")).then(|| AccessLogFile {
            dir: get("BOOKLIB_ACCESS_LOG_DIR")
                .or_else(|| get("BOOKLIB_LOGS_DIR"))
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("logs")),
            prefix: get("BOOKLIB_ACCESS_LOG_PREFIX").unwrap_or_else(|| "http-access".into()),
            rotation: get("BOOKLIB_ACCESS_LOG_ROTATION")
                .map(|raw| Rotation::parse(&raw))
                .unwrap_or(Rotation::Daily),
        });
        Self {
            enabled,
            sample_n: get("BOOKLIB_ACCESS_SAMPLE_N")
                .and_then(|s| s.parse().ok())
                .unwrap_or(1u64)
                .max(1),
            ua: flag("BOOKLIB_ACCESS_UA"),
            ua_hash: flag("BOOKLIB_ACCESS_UA_HASH"),
            trust_forward: flag("BOOKLIB_TRUST_FORWARD_HEADERS"),
            file,
        }
    }

    /// Whether the `n`th request (1-based) is logged.
    pub fn sampled(&self, n: u64) -> bool {
        self.sample_n <= 1 || n % self.sample_n == 0
    }
}

/// Install the global subscriber: console output filtered by `RUST_LOG`
/// (default `info`), plus a rolling file of `http.access` events when
/// `access.file` is set. Later calls are no-ops.
pub fn init(access: &AccessLogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console = fmt::layer().with_filter(filter);
    let file_layer = access.file.as_ref().and_then(|file| {
        if let Err(err) = std::fs::create_dir_all(&file.dir) {
            eprintln!(
                "warning: access log directory {} unavailable: {err}",
                file.dir.display()
            );
            return None;
        }
        let (writer, guard) = tracing_appender::non_blocking(file.appender());
        let _ = ACCESS_GUARD.set(guard);
        Some(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(writer)
                .with_filter(Targets::new().with_target(ACCESS_TARGET, tracing::Level::INFO)),
        )
    });
    let _ = tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init();
}
