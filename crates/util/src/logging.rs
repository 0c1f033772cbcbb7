//! Process logger setup and per-component spans.
//!
//! Lines look like `4242 [WARNING] apifuzzer_util::json: message`. When a
//! syslog socket is reachable (and `basic_output` is off) records go to
//! syslog with facility `local2` instead of stderr.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::field::{Field, Visit};
use tracing::level_filters::LevelFilter;
use tracing::{Event, Level, Span, Subscriber};
use tracing_subscriber::fmt::{format::Writer, FmtContext, FormatEvent, FormatFields, FormattedFields};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

use crate::error::UtilError;

const DEFAULT_SYSLOG_PATH: &str = "/dev/log";
const FACILITY_LOCAL2: u8 = 18;

/// Logger verbosity. `critical` parses as [`LogLevel::Error`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    #[default]
    Warning,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

impl FromStr for LogLevel {
    type Err = UtilError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "critical" | "error" => Ok(LogLevel::Error),
            "warning" | "warn" => Ok(LogLevel::Warning),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(UtilError::UnknownLevel(s.to_string())),
        }
    }
}

/// Logger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub level: LogLevel,
    /// Plain stderr output only, never syslog.
    pub basic_output: bool,
    /// Try syslog before falling back to stderr. Default is `true`.
    pub syslog: bool,
    /// Syslog socket. Default is `/dev/log`.
    pub syslog_path: Option<PathBuf>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Warning,
            basic_output: false,
            syslog: true,
            syslog_path: None,
        }
    }
}

/// Span a component runs its work in.
///
/// Components take a span at construction and enter it per call, so their
/// records carry `component=<name>` without touching global state.
pub fn component_span(name: &'static str) -> Span {
    tracing::info_span!("component", component = name)
}

fn level_name(level: Level) -> &'static str {
    match level {
        Level::ERROR => "ERROR",
        Level::WARN => "WARNING",
        Level::INFO => "INFO",
        Level::DEBUG => "DEBUG",
        Level::TRACE => "TRACE",
    }
}

/// Text event format: `<pid> [<LEVEL>] <target>[:<span>{fields}]: <message>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FuzzerFormatter;

impl<S, N> FormatEvent<S, N> for FuzzerFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();
        write!(
            writer,
            "{} [{}] {}",
            std::process::id(),
            level_name(*meta.level()),
            meta.target()
        )?;
        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, ":{}", span.name())?;
                let ext = span.extensions();
                if let Some(fields) = ext.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        write!(writer, "{{{fields}}}")?;
                    }
                }
            }
        }
        write!(writer, ": ")?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

#[cfg(unix)]
struct MessageVisitor {
    msg: String,
}

#[cfg(unix)]
impl MessageVisitor {
    fn push(&mut self, field: &Field, value: &str) {
        if !self.msg.is_empty() {
            self.msg.push(' ');
        }
        if field.name() != "message" {
            self.msg.push_str(field.name());
            self.msg.push('=');
        }
        self.msg.push_str(value);
    }
}

#[cfg(unix)]
impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, value);
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.push(field, &format!("{value:?}"));
    }
}

#[cfg(unix)]
struct SyslogLayer {
    sock: std::os::unix::net::UnixDatagram,
}

#[cfg(unix)]
impl SyslogLayer {
    fn connect(path: &std::path::Path) -> io::Result<Self> {
        let sock = std::os::unix::net::UnixDatagram::unbound()?;
        sock.connect(path)?;
        Ok(Self { sock })
    }
}

#[cfg(unix)]
fn syslog_severity(level: Level) -> u8 {
    match level {
        Level::ERROR => 3,
        Level::WARN => 4,
        Level::INFO => 6,
        Level::DEBUG | Level::TRACE => 7,
    }
}

#[cfg(unix)]
impl<S> Layer<S> for SyslogLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        let mut v = MessageVisitor { msg: String::new() };
        event.record(&mut v);
        let pri = FACILITY_LOCAL2 * 8 + syslog_severity(*meta.level());
        let data = format!(
            "<{pri}>{} [{}] {}: {}",
            std::process::id(),
            level_name(*meta.level()),
            meta.target(),
            v.msg
        );
        // Logging must never fail the caller.
        let _ = self.sock.send(data.as_bytes());
    }
}

/// Builds the process subscriber for `cfg` without installing it.
pub fn subscriber(cfg: &LoggerConfig) -> Box<dyn Subscriber + Send + Sync> {
    let filter = EnvFilter::builder()
        .with_default_directive(cfg.level.filter().into())
        .from_env_lossy();

    #[cfg(unix)]
    let syslog_layer = if cfg.basic_output || !cfg.syslog {
        None
    } else {
        let path = cfg
            .syslog_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SYSLOG_PATH));
        SyslogLayer::connect(&path).ok()
    };
    #[cfg(not(unix))]
    let syslog_layer: Option<tracing_subscriber::layer::Identity> = None;

    let fmt_layer = if syslog_layer.is_none() {
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(false)
                .event_format(FuzzerFormatter),
        )
    } else {
        None
    };

    Box::new(
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .with(syslog_layer),
    )
}

/// Installs the subscriber for `cfg` as the global default.
///
/// # Errors
///
/// Returns [`UtilError::Logger`] if a global subscriber is already set.
pub fn init(cfg: &LoggerConfig) -> Result<(), UtilError> {
    tracing::subscriber::set_global_default(subscriber(cfg))
        .map_err(|e| UtilError::Logger(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn capture<F: FnOnce()>(f: F) -> String {
        let out = Captured::default();
        let writer = out.clone();
        let sub = tracing_subscriber::fmt()
            .with_max_level(LevelFilter::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .event_format(FuzzerFormatter)
            .finish();
        tracing::subscriber::with_default(sub, f);
        out.text()
    }

    #[test]
    fn test_level_parse() {
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!("warn".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!("debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("Critical".parse::<LogLevel>().unwrap(), LogLevel::Error);
        let err = "Loud".parse::<LogLevel>().unwrap_err();
        assert!(matches!(&err, UtilError::UnknownLevel(level) if level == "Loud"));
        assert_eq!(err.to_string(), "unknown log level: Loud");
    }

    #[test]
    fn test_level_filter() {
        assert_eq!(LogLevel::default().filter(), LevelFilter::WARN);
        assert_eq!(LogLevel::Trace.filter(), LevelFilter::TRACE);
    }

    #[test]
    fn test_config_defaults() {
        let cfg: LoggerConfig = serde_json::from_str(r#"{"level": "debug"}"#).unwrap();
        assert_eq!(cfg.level, LogLevel::Debug);
        assert!(cfg.syslog);
        assert!(!cfg.basic_output);
        assert!(cfg.syslog_path.is_none());
    }

    #[test]
    fn test_formatter_line() {
        let text = capture(|| tracing::warn!(target: "fuzzer", "hello"));
        assert_eq!(text, format!("{} [WARNING] fuzzer: hello\n", std::process::id()));
    }

    #[test]
    fn test_formatter_component_span() {
        let text = capture(|| {
            let span = component_span("JsonCoercer");
            let _entered = span.enter();
            tracing::debug!(target: "fuzzer", "inside");
        });
        assert!(text.contains("[DEBUG] fuzzer:component{component=\"JsonCoercer\"}: inside"), "{text}");
    }

    #[test]
    fn test_formatter_fields() {
        let text = capture(|| tracing::error!(target: "fuzzer", kind = "null", "failed"));
        assert!(text.ends_with("[ERROR] fuzzer: failed kind=\"null\"\n"), "{text}");
    }

    #[test]
    fn test_coercer_logs_rejected_input() {
        let text = capture(|| {
            let _ = crate::json::JsonCoercer::default().coerce("not json at all");
        });
        assert!(text.contains("component=\"JsonCoercer\""), "{text}");
        assert!(text.contains("rejected payload: not_json_at_all"), "{text}");
    }

    #[cfg(unix)]
    #[test]
    fn test_syslog_layer_sends_local2() {
        use std::os::unix::net::UnixDatagram;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log");
        let server = UnixDatagram::bind(&path).unwrap();
        let cfg = LoggerConfig {
            level: LogLevel::Debug,
            syslog_path: Some(path),
            ..LoggerConfig::default()
        };
        tracing::subscriber::with_default(subscriber(&cfg), || {
            tracing::warn!(target: "fuzzer", "hello");
        });
        let mut buf = [0u8; 256];
        let n = server.recv(&mut buf).unwrap();
        let msg = std::str::from_utf8(&buf[..n]).unwrap();
        assert!(msg.starts_with("<148>"), "{msg}");
        assert!(msg.ends_with("[WARNING] fuzzer: hello"), "{msg}");
    }

    #[test]
    fn test_basic_output_skips_syslog() {
        let cfg = LoggerConfig {
            basic_output: true,
            syslog_path: Some(PathBuf::from("/nonexistent/socket")),
            ..LoggerConfig::default()
        };
        // Builds with stderr output only; nothing to connect to.
        tracing::subscriber::with_default(subscriber(&cfg), || {
            tracing::warn!("to stderr");
        });
    }
}
