use anyhow::Context;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::config::{BuildOptions, Config};
use crate::executor::{self, ExecutionResult};
use crate::logger::Logger;
use crate::parser::{CompilerOutputParser, LogLevel};
use crate::sources;
use crate::toolchain::{BuildStep, LinkPlan, ToolchainCommands, ToolchainKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    UpToDate,
    CompileFailed { source: PathBuf, code: i32 },
    Linked(LinkOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    Single(i32),
    Pair { x86: i32, x64: i32 },
}

impl LinkOutcome {
    pub fn success(&self) -> bool {
        match self {
            LinkOutcome::Single(code) => *code == 0,
            LinkOutcome::Pair { x86, x64 } => *x86 == 0 && *x64 == 0,
        }
    }

    pub fn failure_code(&self) -> Option<i32> {
        match self {
            LinkOutcome::Single(code) if *code != 0 => Some(*code),
            LinkOutcome::Pair { x86, .. } if *x86 != 0 => Some(*x86),
            LinkOutcome::Pair { x64, .. } if *x64 != 0 => Some(*x64),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuildReport {
    pub outcome: BuildOutcome,
    pub duration: f64,
    pub compiled: usize,
    pub error_count: usize,
    pub warning_count: usize,
}

impl BuildReport {
    pub fn success(&self) -> bool {
        match &self.outcome {
            BuildOutcome::UpToDate => true,
            BuildOutcome::CompileFailed { .. } => false,
            BuildOutcome::Linked(link) => link.success(),
        }
    }

    pub fn failure_code(&self) -> Option<i32> {
        match &self.outcome {
            BuildOutcome::UpToDate => None,
            BuildOutcome::CompileFailed { code, .. } => Some(*code),
            BuildOutcome::Linked(link) => link.failure_code(),
        }
    }

    pub fn is_up_to_date(&self) -> bool {
        matches!(self.outcome, BuildOutcome::UpToDate)
    }
}

pub struct Builder {
    root: PathBuf,
    config: Config,
    options: BuildOptions,
    logger: Arc<Logger>,
}

impl Builder {
    pub fn new(root: PathBuf, config: Config, options: BuildOptions, logger: Arc<Logger>) -> Self {
        Self {
            root,
            config,
            options,
            logger,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.config.bin_dir(&self.root)
    }

    pub fn run_target_name(&self) -> String {
        self.toolchain().run_target_name()
    }

    fn toolchain(&self) -> ToolchainCommands<'_> {
        ToolchainCommands::new(&self.config, &self.options, &self.root)
    }

    pub fn ensure_output_dirs(&self) -> anyhow::Result<()> {
        for dir in [self.config.build_dir(&self.root), self.config.bin_dir(&self.root)] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        Ok(())
    }

    /// Remove and recreate the output directories. Directories that never
    /// existed count as already clean.
    pub fn clean(&self) -> anyhow::Result<()> {
        for dir in [self.config.build_dir(&self.root), self.config.bin_dir(&self.root)] {
            match fs::remove_dir_all(&dir) {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => {
                    return Err(err)
                        .with_context(|| format!("Failed to remove directory: {}", dir.display()))
                }
            }
        }

        self.ensure_output_dirs()
    }

    /// The incremental build: discover sources, compile the stale ones in
    /// order stopping at the first failure, then link the objects of every
    /// discovered source.
    pub async fn build(&self) -> anyhow::Result<BuildReport> {
        let start = Instant::now();
        self.ensure_output_dirs()?;

        let source_dir = self.config.source_dir(&self.root);
        let build_dir = self.config.build_dir(&self.root);
        let discovered = sources::discover(&source_dir, &self.config.project.source_ext);
        let stale = sources::select_stale(&discovered, &build_dir, self.options.force);

        if stale.is_empty() && !self.options.force {
            self.logger.log(LogLevel::Info, "Already up to date");
            return Ok(BuildReport {
                outcome: BuildOutcome::UpToDate,
                duration: start.elapsed().as_secs_f64(),
                compiled: 0,
                error_count: 0,
                warning_count: 0,
            });
        }

        let toolchain = self.toolchain();
        let parser = Arc::new(Mutex::new(CompilerOutputParser::new()));
        let mut compiled = 0usize;

        for source in &stale {
            let step = toolchain.compile_step(source);
            self.logger.log(LogLevel::Info, &step.description);

            let result = self.run_step(&step, &parser).await?;
            if !result.success {
                let code = result.exit_code.unwrap_or(-1);
                self.logger.log(
                    LogLevel::Error,
                    &format!("Compilation failed: {}", source.display()),
                );
                return Ok(self.report(
                    BuildOutcome::CompileFailed {
                        source: source.clone(),
                        code,
                    },
                    start,
                    compiled,
                    &parser,
                ));
            }
            compiled += 1;
        }

        // the link consumes every discovered source's object, not just the
        // ones compiled this round
        let objects: Vec<PathBuf> = discovered
            .iter()
            .map(|source| sources::object_path(source, &build_dir))
            .collect();

        let outcome = match toolchain.link_plan(&objects) {
            LinkPlan::Single(step) => {
                self.logger.log(LogLevel::Info, &step.description);
                let result = self.run_step(&step, &parser).await?;
                LinkOutcome::Single(result.exit_code.unwrap_or(-1))
            }
            LinkPlan::Pair { x86, x64 } => {
                self.logger.log(LogLevel::Info, &x86.description);
                let first = self.run_step(&x86, &parser).await?;
                self.logger.log(LogLevel::Info, &x64.description);
                let second = self.run_step(&x64, &parser).await?;
                LinkOutcome::Pair {
                    x86: first.exit_code.unwrap_or(-1),
                    x64: second.exit_code.unwrap_or(-1),
                }
            }
        };

        if !outcome.success() {
            self.logger.log(LogLevel::Error, "Linking failed");
        }

        let report = self.report(BuildOutcome::Linked(outcome), start, compiled, &parser);
        if report.success() {
            self.logger.log(
                LogLevel::Info,
                &format!(
                    "Build finished in {:.2}s ({} compiled, {} warnings)",
                    report.duration, report.compiled, report.warning_count
                ),
            );
        }

        Ok(report)
    }

    /// Single-shot debug build over every source. No objects are written;
    /// the caller exits with the returned code.
    pub async fn debug_build(&self) -> anyhow::Result<i32> {
        self.ensure_output_dirs()?;

        if self.options.toolchain == ToolchainKind::Msvc {
            self.logger.log(
                LogLevel::Warning,
                "Debug mode always uses the GNU toolchain",
            );
        }

        let source_dir = self.config.source_dir(&self.root);
        let discovered = sources::discover(&source_dir, &self.config.project.source_ext);

        let step = self.toolchain().debug_step(&discovered);
        self.logger.log(LogLevel::Info, &step.description);

        let parser = Arc::new(Mutex::new(CompilerOutputParser::new()));
        let result = self.run_step(&step, &parser).await?;

        Ok(result.exit_code.unwrap_or(-1))
    }

    async fn run_step(
        &self,
        step: &BuildStep,
        parser: &Arc<Mutex<CompilerOutputParser>>,
    ) -> anyhow::Result<ExecutionResult> {
        let parser = Arc::clone(parser);
        let logger = Arc::clone(&self.logger);

        executor::execute_step(&step.command, move |line| {
            let entry = parser.lock().unwrap().parse_line(&line);
            logger.log_entry(&entry);
        })
        .await
    }

    fn report(
        &self,
        outcome: BuildOutcome,
        start: Instant,
        compiled: usize,
        parser: &Arc<Mutex<CompilerOutputParser>>,
    ) -> BuildReport {
        let guard = parser.lock().unwrap();
        BuildReport {
            outcome,
            duration: start.elapsed().as_secs_f64(),
            compiled,
            error_count: guard.error_count(),
            warning_count: guard.warning_count(),
        }
    }
}
