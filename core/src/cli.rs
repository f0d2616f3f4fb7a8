use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::toolchain::Define;

#[derive(Parser, Debug)]
#[command(name = "kiln")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[arg(short, long, help = "Remove and recreate the build and bin directories")]
    pub clean: bool,

    #[arg(short, long, help = "Build the program incrementally")]
    pub build: bool,

    #[arg(short, long, help = "Treat every source as stale")]
    pub force: bool,

    #[arg(short, long, help = "Build, then run the produced binary")]
    pub run: bool,

    #[arg(short, long, help = "Single-shot debug compile of all sources")]
    pub debug: bool,

    #[arg(short, long, help = "Use the MSVC toolchain instead of GNU")]
    pub msvc: bool,

    #[arg(
        short = 'O',
        long,
        value_name = "LEVEL",
        value_parser = parse_optimize,
        help = "Optimization level (g | 0-3)"
    )]
    pub optimize: Option<String>,

    #[arg(
        short = 'W',
        value_enum,
        value_name = "WARNING",
        help = "Enable a warning group (-Wall, -Wextra)"
    )]
    pub warnings: Vec<Warning>,

    #[arg(
        short = 'D',
        long = "define",
        value_name = "NAME[=VALUE]",
        value_parser = parse_define,
        help = "Define a preprocessor symbol"
    )]
    pub defines: Vec<Define>,

    #[arg(
        short = 'C',
        long = "directory",
        value_name = "DIR",
        help = "Project root directory"
    )]
    pub directory: Option<PathBuf>,

    #[arg(long, value_name = "FILE", help = "Configuration file path")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Warning {
    All,
    Extra,
}

impl Warning {
    pub fn gnu_flag(&self) -> &'static str {
        match self {
            Warning::All => "-Wall",
            Warning::Extra => "-Wextra",
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum HistoryType {
    Build,
    Run,
    All,
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommands {
    #[command(about = "Show history")]
    Show {
        #[arg(short = 'n', long, help = "Number of entries to show")]
        count: Option<usize>,
    },

    #[command(about = "Clear history")]
    Clear {
        #[arg(
            long,
            value_enum,
            default_value = "all",
            help = "History type to clear"
        )]
        r#type: HistoryType,
    },
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Initialize a new kiln.toml configuration")]
    Init {
        #[arg(long, help = "Target name")]
        name: Option<String>,
    },

    #[command(about = "Manage history")]
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
}

impl Cli {
    pub fn project_root(&self) -> PathBuf {
        self.directory
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap())
    }

    pub fn has_action(&self) -> bool {
        self.clean || self.build || self.run || self.debug || self.command.is_some()
    }
}

fn parse_optimize(value: &str) -> Result<String, String> {
    match value {
        "g" | "0" | "1" | "2" | "3" => Ok(value.to_string()),
        other => Err(format!(
            "invalid optimization level '{}', expected g or 0-3",
            other
        )),
    }
}

fn parse_define(value: &str) -> Result<Define, String> {
    let (name, def_value) = match value.split_once('=') {
        Some((name, rest)) => (name, Some(rest.to_string())),
        None => (value, None),
    };

    if name.is_empty() {
        return Err("definition name must not be empty".to_string());
    }

    Ok(Define {
        name: name.to_string(),
        value: def_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_flags() {
        let cli = Cli::parse_from(["kiln", "-c", "-b", "-r"]);
        assert!(cli.clean);
        assert!(cli.build);
        assert!(cli.run);
        assert!(!cli.debug);
        assert!(!cli.force);
        assert!(!cli.msvc);
    }

    #[test]
    fn test_long_spellings() {
        let cli = Cli::parse_from(["kiln", "--build", "--force", "--msvc"]);
        assert!(cli.build && cli.force && cli.msvc);
    }

    #[test]
    fn test_warning_flags_attach_to_short() {
        let cli = Cli::parse_from(["kiln", "-b", "-Wall", "-Wextra"]);
        assert_eq!(cli.warnings, vec![Warning::All, Warning::Extra]);
        assert_eq!(cli.warnings[0].gnu_flag(), "-Wall");
        assert_eq!(cli.warnings[1].gnu_flag(), "-Wextra");
    }

    #[test]
    fn test_optimize_levels() {
        for level in ["g", "0", "1", "2", "3"] {
            let cli = Cli::parse_from(["kiln", "-b", "-O", level]);
            assert_eq!(cli.optimize.as_deref(), Some(level));
        }

        assert!(Cli::try_parse_from(["kiln", "-b", "-O", "fast"]).is_err());
        assert!(Cli::try_parse_from(["kiln", "-b", "-O", "4"]).is_err());
    }

    #[test]
    fn test_attached_optimize_value() {
        let cli = Cli::parse_from(["kiln", "-b", "-O2"]);
        assert_eq!(cli.optimize.as_deref(), Some("2"));
    }

    #[test]
    fn test_defines_parse_names_and_values() {
        let cli = Cli::parse_from(["kiln", "-b", "-D", "TRACE", "-D", "WIDTH=1280"]);

        assert_eq!(cli.defines.len(), 2);
        assert_eq!(cli.defines[0].name, "TRACE");
        assert_eq!(cli.defines[0].value, None);
        assert_eq!(cli.defines[1].name, "WIDTH");
        assert_eq!(cli.defines[1].value.as_deref(), Some("1280"));
    }

    #[test]
    fn test_empty_define_rejected() {
        assert!(Cli::try_parse_from(["kiln", "-b", "-D", "=1"]).is_err());
    }

    #[test]
    fn test_directory_and_config() {
        let cli = Cli::parse_from(["kiln", "-b", "-C", "/proj", "--config", "alt.toml"]);
        assert_eq!(cli.directory, Some(PathBuf::from("/proj")));
        assert_eq!(cli.config, Some(PathBuf::from("alt.toml")));
        assert_eq!(cli.project_root(), PathBuf::from("/proj"));
    }

    #[test]
    fn test_init_subcommand() {
        let cli = Cli::parse_from(["kiln", "init", "--name", "game"]);
        match cli.command {
            Some(Commands::Init { name }) => assert_eq!(name.as_deref(), Some("game")),
            _ => panic!("expected init subcommand"),
        }
    }

    #[test]
    fn test_history_subcommands() {
        let cli = Cli::parse_from(["kiln", "history", "show", "-n", "5"]);
        match cli.command {
            Some(Commands::History {
                command: HistoryCommands::Show { count },
            }) => assert_eq!(count, Some(5)),
            _ => panic!("expected history show"),
        }

        let cli = Cli::parse_from(["kiln", "history", "clear", "--type", "run"]);
        match cli.command {
            Some(Commands::History {
                command: HistoryCommands::Clear { r#type },
            }) => assert!(matches!(r#type, HistoryType::Run)),
            _ => panic!("expected history clear"),
        }
    }

    #[test]
    fn test_has_action() {
        assert!(!Cli::parse_from(["kiln"]).has_action());
        assert!(!Cli::parse_from(["kiln", "-f"]).has_action());
        assert!(Cli::parse_from(["kiln", "-b"]).has_action());
        assert!(Cli::parse_from(["kiln", "init"]).has_action());
    }
}
