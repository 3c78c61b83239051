use colored::{ColoredString, Colorize};
use log::{Level, LevelFilter, Metadata, Record, SetLoggerError};

static LOGGER: Logger = Logger;

/// Console logger. Info lines are printed bare, other levels carry a label.
/// At debug and trace, records of other crates are hidden and the source
/// location is shown.
pub struct Logger;

impl Logger {
    pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_logger(&LOGGER)?;
        log::set_max_level(level);
        Ok(())
    }
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
            && (metadata.level() <= Level::Info || metadata.target().starts_with("multimpd"))
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = match log::max_level() {
            LevelFilter::Off => return,
            LevelFilter::Error | LevelFilter::Warn | LevelFilter::Info => match record.level() {
                Level::Info => record.args().to_string(),
                level => format!("{} {}", label(level), record.args()),
            },
            LevelFilter::Debug | LevelFilter::Trace => {
                let location = match (record.file(), record.line()) {
                    (Some(file), Some(line)) => format!("[{}:{}]", file, line).dimmed(),
                    _ => "[unk]".dimmed(),
                };

                format!(
                    "{} {} {}",
                    label(record.level()),
                    location,
                    record.args()
                )
            }
        };

        match record.level() {
            Level::Error | Level::Warn => eprintln!("{}", line),
            _ => println!("{}", line),
        }
    }

    fn flush(&self) {}
}

fn label(level: Level) -> ColoredString {
    match level {
        Level::Debug => "[DEBUG]".bold().blue(),
        Level::Error => "[ERROR]".bold().red(),
        Level::Info => "[INFO]".bold().green(),
        Level::Trace => "[TRACE]".bold().purple(),
        Level::Warn => "[WARN]".bold().yellow(),
    }
}
