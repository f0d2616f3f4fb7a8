pub mod builder;
pub mod cli;
pub mod config;
pub mod executor;
pub mod history;
pub mod logger;
pub mod parser;
pub mod sources;
pub mod toolchain;

pub use builder::{BuildOutcome, BuildReport, Builder, LinkOutcome};
pub use cli::{Cli, Commands, HistoryCommands, HistoryType, Warning};
pub use config::{BuildOptions, Config};
pub use executor::{execute_binary, execute_step, ExecutionResult};
pub use history::{BuildHistory, BuildHistoryEntry, RunHistory, RunHistoryEntry};
pub use logger::Logger;
pub use parser::{CompilerOutputParser, LogComponent, LogEntry, LogLevel};
pub use toolchain::{BuildStep, Define, LinkPlan, ToolchainCommands, ToolchainError, ToolchainKind};
