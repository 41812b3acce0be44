use chrono::Local;
use nu_ansi_term::{Color, Style};
use std::fmt;
use tracing::{Event, Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::Targets,
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields},
    prelude::*,
    registry::LookupSpan,
    Layer,
};

/// Installs the global subscriber: coloured console output plus an hourly
/// rolling plain-text file under `logs/`.
///
/// `app_target` is the binary crate's module path (e.g. `xink_project`); it
/// and `core_logic` log at INFO (DEBUG when `verbose`), everything else at
/// WARN. The returned guard flushes the file writer and MUST be kept alive.
pub fn setup_logger(app_target: &str, verbose: bool) -> Option<WorkerGuard> {
    let own_level = if verbose { Level::DEBUG } else { Level::INFO };

    std::fs::create_dir_all("logs").ok();
    let file_appender = tracing_appender::rolling::hourly("logs", "app");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_filter = Targets::new()
        .with_target("core_logic", own_level)
        .with_target(app_target.to_string(), own_level)
        .with_default(Level::WARN);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .event_format(FileFormatter)
        .with_filter(file_filter);

    let console_filter = Targets::new()
        .with_target("core_logic", own_level)
        .with_target(app_target.to_string(), own_level)
        .with_default(Level::WARN);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .event_format(TerminalFormatter)
        .with_filter(console_filter);

    let installed = tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init();

    match installed {
        Ok(()) => Some(guard),
        Err(e) => {
            eprintln!("Logger already initialized: {}", e);
            None
        }
    }
}

// --- Formatters ---

struct MessageVisitor {
    message: String,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        }
    }
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}

fn event_message(event: &Event<'_>) -> String {
    let mut visitor = MessageVisitor {
        message: String::new(),
    };
    event.record(&mut visitor);
    visitor.message
}

/// Picks the console colour for a line.
///
/// Errors are red and warnings yellow. INFO lines are green when they report
/// a success, magenta for account status lines and blue otherwise.
pub fn line_style(level: &Level, msg: &str) -> Style {
    match *level {
        Level::ERROR => Style::new().fg(Color::LightRed),
        Level::WARN => Style::new().fg(Color::Yellow),
        Level::INFO => {
            let lower = msg.to_lowercase();
            if lower.contains("success") {
                Style::new().fg(Color::LightGreen)
            } else if msg.contains("Wallet:") || msg.contains("=====") {
                Style::new().fg(Color::Magenta)
            } else {
                Style::new().fg(Color::LightBlue)
            }
        }
        _ => Style::new().dimmed(),
    }
}

pub struct TerminalFormatter;

impl<S, N> FormatEvent<S, N> for TerminalFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let msg = event_message(event);
        let style = line_style(event.metadata().level(), &msg);
        writeln!(writer, "{}", style.paint(msg))
    }
}

pub struct FileFormatter;

impl<S, N> FormatEvent<S, N> for FileFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let level = event.metadata().level();

        write!(writer, "{} [{}] ", timestamp, level)?;
        writeln!(writer, "{}", event_message(event))
    }
}
