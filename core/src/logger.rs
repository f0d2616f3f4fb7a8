use crate::parser::entry::{LogEntry, LogLevel};
use std::io::Write;

pub struct Logger {
    use_colors: bool,
}

impl Logger {
    pub fn new() -> Self {
        Self {
            use_colors: atty::is(atty::Stream::Stdout),
        }
    }

    pub fn log_entry(&self, entry: &LogEntry) {
        if self.use_colors {
            self.log_colored(entry);
        } else {
            self.log_plain(entry);
        }
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        if self.use_colors {
            println!("{}{}\x1b[0m", level_color(level), message);
        } else if level >= LogLevel::Warning {
            println!("{}: {}", level.to_str(), message);
        } else {
            println!("{}", message);
        }
    }

    fn log_colored(&self, entry: &LogEntry) {
        let color = level_color(entry.level);
        let timestamp = entry.timestamp.format("%H:%M:%S");

        if let Some(location) = entry.location_string() {
            println!(
                "\x1b[90m[{}]\x1b[0m {}{}\x1b[0m \x1b[36m{}\x1b[0m",
                timestamp, color, entry.message, location
            );
        } else {
            println!("\x1b[90m[{}]\x1b[0m {}{}\x1b[0m", timestamp, color, entry.raw_line);
        }

        std::io::stdout().flush().unwrap();
    }

    fn log_plain(&self, entry: &LogEntry) {
        let timestamp = entry.timestamp.format("%H:%M:%S");
        // a located message has its "error:"/"warning:" marker stripped by
        // the parser, so restore the severity here
        let label = if entry.level >= LogLevel::Warning {
            format!("{}: ", entry.level.to_str())
        } else {
            String::new()
        };

        if let Some(location) = entry.location_string() {
            println!("[{}] {}{} ({})", timestamp, label, entry.message, location);
        } else {
            println!("[{}] {}", timestamp, entry.raw_line);
        }

        std::io::stdout().flush().unwrap();
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

fn level_color(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Debug => "\x1b[90m",
        LogLevel::Info => "\x1b[37m",
        LogLevel::Warning => "\x1b[33m",
        LogLevel::Error => "\x1b[31m",
        LogLevel::Fatal => "\x1b[31;1m",
    }
}
