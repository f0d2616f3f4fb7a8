use super::entry::{LogComponent, LogEntry, LogLevel};
use once_cell::sync::Lazy;
use regex::Regex;

static GCC_CLANG_ERROR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^:]+):(\d+):(\d+): error: (.+)$").unwrap());
static GCC_CLANG_WARNING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^:]+):(\d+):(\d+): warning: (.+)$").unwrap());
static GCC_CLANG_NOTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^:]+):(\d+):(\d+): note: (.+)$").unwrap());
static MSVC_DIAGNOSTIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+)\((\d+)(?:,(\d+))?\)\s*: (error|warning|fatal error) (C\d+): (.+)$").unwrap()
});
static MSVC_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(fatal error|error) (LNK\d+): (.+)$").unwrap());
static LINKER_ERROR_UNDEF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"undefined reference to").unwrap());
static LINKER_ERROR_MULTI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"multiple definition of").unwrap());

static ANSI_ESCAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*m").unwrap());

#[derive(Clone)]
pub struct CompilerOutputParser {
    log_index: usize,
    errors: usize,
    warnings: usize,
}

impl CompilerOutputParser {
    pub fn new() -> Self {
        Self {
            log_index: 0,
            errors: 0,
            warnings: 0,
        }
    }

    pub fn parse_line(&mut self, line: &str) -> LogEntry {
        let entry = self.classify(line);

        match entry.level {
            LogLevel::Error | LogLevel::Fatal => self.errors += 1,
            LogLevel::Warning => self.warnings += 1,
            _ => {}
        }

        entry
    }

    fn classify(&mut self, line: &str) -> LogEntry {
        let stripped = strip_ansi(line);
        let index = self.log_index;
        self.log_index += 1;

        if let Some(caps) = GCC_CLANG_ERROR.captures(&stripped) {
            return LogEntry::new(
                LogLevel::Error,
                caps.get(4).unwrap().as_str().to_string(),
                line.to_string(),
                LogComponent::Compiler,
                index,
            )
            .with_location(
                caps.get(1).unwrap().as_str().to_string(),
                caps.get(2).and_then(|m| m.as_str().parse().ok()),
                caps.get(3).and_then(|m| m.as_str().parse().ok()),
            );
        }

        if let Some(caps) = GCC_CLANG_WARNING.captures(&stripped) {
            return LogEntry::new(
                LogLevel::Warning,
                caps.get(4).unwrap().as_str().to_string(),
                line.to_string(),
                LogComponent::Compiler,
                index,
            )
            .with_location(
                caps.get(1).unwrap().as_str().to_string(),
                caps.get(2).and_then(|m| m.as_str().parse().ok()),
                caps.get(3).and_then(|m| m.as_str().parse().ok()),
            );
        }

        if let Some(caps) = GCC_CLANG_NOTE.captures(&stripped) {
            return LogEntry::new(
                LogLevel::Debug,
                caps.get(4).unwrap().as_str().to_string(),
                line.to_string(),
                LogComponent::Compiler,
                index,
            )
            .with_location(
                caps.get(1).unwrap().as_str().to_string(),
                caps.get(2).and_then(|m| m.as_str().parse().ok()),
                caps.get(3).and_then(|m| m.as_str().parse().ok()),
            );
        }

        if let Some(caps) = MSVC_DIAGNOSTIC.captures(&stripped) {
            let level = match caps.get(4).map(|m| m.as_str()) {
                Some("warning") => LogLevel::Warning,
                Some("fatal error") => LogLevel::Fatal,
                _ => LogLevel::Error,
            };
            let message = format!(
                "{}: {}",
                caps.get(5).map(|m| m.as_str()).unwrap_or(""),
                caps.get(6).map(|m| m.as_str()).unwrap_or("")
            );
            return LogEntry::new(level, message, line.to_string(), LogComponent::Compiler, index)
                .with_location(
                    caps.get(1).unwrap().as_str().to_string(),
                    caps.get(2).and_then(|m| m.as_str().parse().ok()),
                    caps.get(3).and_then(|m| m.as_str().parse().ok()),
                );
        }

        if let Some(caps) = MSVC_LINK.captures(&stripped) {
            let level = if caps.get(1).map(|m| m.as_str()) == Some("fatal error") {
                LogLevel::Fatal
            } else {
                LogLevel::Error
            };
            let message = format!(
                "{}: {}",
                caps.get(2).map(|m| m.as_str()).unwrap_or(""),
                caps.get(3).map(|m| m.as_str()).unwrap_or("")
            );
            return LogEntry::new(level, message, line.to_string(), LogComponent::Linker, index);
        }

        if LINKER_ERROR_UNDEF.is_match(&stripped) || LINKER_ERROR_MULTI.is_match(&stripped) {
            return LogEntry::new(
                LogLevel::Error,
                stripped.clone(),
                line.to_string(),
                LogComponent::Linker,
                index,
            );
        }

        LogEntry::new(
            LogLevel::Info,
            stripped,
            line.to_string(),
            LogComponent::Other("unknown".to_string()),
            index,
        )
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn warning_count(&self) -> usize {
        self.warnings
    }

    pub fn reset(&mut self) {
        self.log_index = 0;
        self.errors = 0;
        self.warnings = 0;
    }
}

impl Default for CompilerOutputParser {
    fn default() -> Self {
        Self::new()
    }
}

fn strip_ansi(s: &str) -> String {
    ANSI_ESCAPE.replace_all(s, "").to_string()
}
