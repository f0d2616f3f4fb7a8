use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

use crate::config::{BuildOptions, Config};
use crate::sources;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ToolchainError {
    #[error("unknown toolchain '{0}', expected 'gnu' or 'msvc'")]
    UnknownKind(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolchainKind {
    Gnu,
    Msvc,
}

impl fmt::Display for ToolchainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ToolchainKind::Gnu => "gnu",
            ToolchainKind::Msvc => "msvc",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for ToolchainKind {
    type Err = ToolchainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gnu" => Ok(ToolchainKind::Gnu),
            "msvc" => Ok(ToolchainKind::Msvc),
            other => Err(ToolchainError::UnknownKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Define {
    pub name: String,
    pub value: Option<String>,
}

impl Define {
    fn spelled(&self, prefix: &str) -> String {
        match &self.value {
            Some(value) => format!("{}{}={}", prefix, self.name, value),
            None => format!("{}{}", prefix, self.name),
        }
    }

    pub fn gnu_flag(&self) -> String {
        self.spelled("-D")
    }

    pub fn msvc_flag(&self) -> String {
        self.spelled("/D")
    }
}

#[derive(Debug, Clone)]
pub struct BuildStep {
    pub description: String,
    pub command: Vec<String>,
}

impl BuildStep {
    pub fn new(description: String, command: Vec<String>) -> Self {
        Self {
            description,
            command,
        }
    }
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.description, self.command.join(" "))
    }
}

/// The link step has a different shape per toolchain: one invocation for
/// g++, two for MSVC (32- and 64-bit variants with their own flag sets).
#[derive(Debug, Clone)]
pub enum LinkPlan {
    Single(BuildStep),
    Pair { x86: BuildStep, x64: BuildStep },
}

/// Command-line construction for the two supported toolchains. All
/// toolchain branching lives here; the orchestrator only runs the argv
/// records this type hands out.
pub struct ToolchainCommands<'a> {
    config: &'a Config,
    options: &'a BuildOptions,
    root: &'a Path,
}

impl<'a> ToolchainCommands<'a> {
    pub fn new(config: &'a Config, options: &'a BuildOptions, root: &'a Path) -> Self {
        Self {
            config,
            options,
            root,
        }
    }

    pub fn kind(&self) -> ToolchainKind {
        self.options.toolchain
    }

    pub fn compile_step(&self, source: &Path) -> BuildStep {
        let object = sources::object_path(source, &self.config.build_dir(self.root));
        let command = match self.kind() {
            ToolchainKind::Gnu => self.gnu_compile(source, &object),
            ToolchainKind::Msvc => self.msvc_compile(source, &object),
        };

        BuildStep::new(format!("Compiling {}", source.display()), command)
    }

    pub fn link_plan(&self, objects: &[PathBuf]) -> LinkPlan {
        match self.kind() {
            ToolchainKind::Gnu => LinkPlan::Single(BuildStep::new(
                format!("Linking {}", self.config.project.target),
                self.gnu_link(objects),
            )),
            ToolchainKind::Msvc => {
                let target = &self.config.project.target;
                LinkPlan::Pair {
                    x86: BuildStep::new(
                        format!("Linking {}.exe (x86)", target),
                        self.msvc_link(objects, &format!("{}.exe", target), true),
                    ),
                    x64: BuildStep::new(
                        format!("Linking {}64.exe (x64)", target),
                        self.msvc_link(objects, &format!("{}64.exe", target), false),
                    ),
                }
            }
        }
    }

    /// Single-shot compile-and-link of every source, no object artifacts.
    /// Always spelled for g++; debug mode does not support MSVC.
    pub fn debug_step(&self, srcs: &[PathBuf]) -> BuildStep {
        let gnu = &self.config.gnu;
        let output = self.config.bin_dir(self.root).join(&self.config.project.target);

        let mut command = vec![gnu.compiler.clone()];
        command.extend(self.gnu_compile_flags());
        command.push("-g".to_string());
        command.push("-o".to_string());
        command.push(output.display().to_string());
        command.extend(srcs.iter().map(|s| s.display().to_string()));
        command.extend(gnu.link_flags.iter().cloned());

        BuildStep::new(format!("Debug build ({} sources)", srcs.len()), command)
    }

    /// Name of the binary `--run` executes, relative to the bin directory.
    /// MSVC builds run the 64-bit variant.
    pub fn run_target_name(&self) -> String {
        let target = &self.config.project.target;
        match self.kind() {
            ToolchainKind::Gnu => target.clone(),
            ToolchainKind::Msvc => format!("{}64", target),
        }
    }

    fn gnu_compile_flags(&self) -> Vec<String> {
        let mut flags = self.config.gnu.compile_flags.clone();
        flags.extend(self.options.defines.iter().map(Define::gnu_flag));
        if let Some(level) = &self.options.optimize {
            flags.push(format!("-O{}", level));
        }
        flags.extend(self.options.warning_flags.iter().cloned());
        flags
    }

    fn msvc_compile_flags(&self) -> Vec<String> {
        let mut flags = self.config.msvc.compile_flags.clone();
        flags.extend(self.options.defines.iter().map(Define::msvc_flag));
        flags
    }

    fn gnu_compile(&self, source: &Path, object: &Path) -> Vec<String> {
        let mut cmd = vec![self.config.gnu.compiler.clone()];
        cmd.extend(self.gnu_compile_flags());
        cmd.push("-c".to_string());
        cmd.push(source.display().to_string());
        cmd.push("-o".to_string());
        cmd.push(object.display().to_string());
        cmd.push(format!("-I{}", self.config.include_dir(self.root).display()));
        cmd
    }

    fn msvc_compile(&self, source: &Path, object: &Path) -> Vec<String> {
        let msvc = &self.config.msvc;

        let mut cmd = vec![msvc.compiler.clone()];
        cmd.extend(self.msvc_compile_flags());
        cmd.push("/c".to_string());
        cmd.push(source.display().to_string());
        cmd.push(format!("/Fo{}", object.display()));
        cmd.push(format!("/I{}", self.config.include_dir(self.root).display()));
        cmd.extend(msvc.include_dirs.iter().map(|dir| format!("/I{}", dir)));
        cmd
    }

    fn gnu_link(&self, objects: &[PathBuf]) -> Vec<String> {
        let gnu = &self.config.gnu;
        let output = self.config.bin_dir(self.root).join(&self.config.project.target);

        let mut cmd = vec![gnu.compiler.clone(), "-pass-exit-codes".to_string()];
        cmd.push("-o".to_string());
        cmd.push(output.display().to_string());
        cmd.extend(objects.iter().map(|o| o.display().to_string()));
        cmd.extend(gnu.link_flags.iter().cloned());
        cmd
    }

    fn msvc_link(&self, objects: &[PathBuf], exe_name: &str, subsystem: bool) -> Vec<String> {
        let msvc = &self.config.msvc;
        let output = self.config.bin_dir(self.root).join(exe_name);

        let mut cmd = vec![msvc.linker.clone(), format!("/OUT:{}", output.display())];
        cmd.extend(objects.iter().map(|o| o.display().to_string()));
        cmd.push(msvc.opt_flag.clone());
        if subsystem {
            cmd.push(msvc.subsystem_flag.clone());
        }
        cmd.extend(msvc.lib_paths.iter().map(|p| format!("/LIBPATH:{}", p)));
        cmd.extend(msvc.extern_libs.iter().cloned());
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(kind: ToolchainKind) -> BuildOptions {
        BuildOptions {
            toolchain: kind,
            optimize: None,
            warning_flags: Vec::new(),
            defines: Vec::new(),
            force: false,
        }
    }

    fn commands<'a>(
        config: &'a Config,
        options: &'a BuildOptions,
        root: &'a Path,
    ) -> ToolchainCommands<'a> {
        ToolchainCommands::new(config, options, root)
    }

    #[test]
    fn test_kind_parse_and_display() {
        assert_eq!("gnu".parse::<ToolchainKind>().unwrap(), ToolchainKind::Gnu);
        assert_eq!("MSVC".parse::<ToolchainKind>().unwrap(), ToolchainKind::Msvc);
        assert_eq!(ToolchainKind::Gnu.to_string(), "gnu");
        assert_eq!(
            "clang".parse::<ToolchainKind>(),
            Err(ToolchainError::UnknownKind("clang".to_string()))
        );
    }

    #[test]
    fn test_define_spelling() {
        let plain = Define {
            name: "NDEBUG".to_string(),
            value: None,
        };
        let valued = Define {
            name: "WIDTH".to_string(),
            value: Some("1280".to_string()),
        };

        assert_eq!(plain.gnu_flag(), "-DNDEBUG");
        assert_eq!(plain.msvc_flag(), "/DNDEBUG");
        assert_eq!(valued.gnu_flag(), "-DWIDTH=1280");
        assert_eq!(valued.msvc_flag(), "/DWIDTH=1280");
    }

    #[test]
    fn test_gnu_compile_command_shape() {
        let config = Config::default();
        let mut opts = options(ToolchainKind::Gnu);
        opts.optimize = Some("2".to_string());
        opts.warning_flags = vec!["-Wall".to_string(), "-Wextra".to_string()];
        opts.defines = vec![Define {
            name: "TRACE".to_string(),
            value: None,
        }];
        let root = Path::new("/proj");
        let tc = commands(&config, &opts, root);

        let step = tc.compile_step(Path::new("/proj/src/main.cpp"));
        let cmd = &step.command;

        assert_eq!(cmd[0], "g++");
        assert!(cmd.contains(&"-g".to_string()));
        assert!(cmd.contains(&"-DTRACE".to_string()));
        assert!(cmd.contains(&"-O2".to_string()));
        assert!(cmd.contains(&"-Wall".to_string()));
        assert!(cmd.contains(&"-Wextra".to_string()));
        assert!(cmd.contains(&"-c".to_string()));
        assert!(cmd.contains(&"/proj/src/main.cpp".to_string()));
        assert!(cmd.contains(&"/proj/build/main.o".to_string()));
        assert!(cmd.contains(&"-I/proj/include".to_string()));

        // -c must come after the flag block, source before its object
        let c_pos = cmd.iter().position(|a| a == "-c").unwrap();
        let src_pos = cmd.iter().position(|a| a == "/proj/src/main.cpp").unwrap();
        let obj_pos = cmd.iter().position(|a| a == "/proj/build/main.o").unwrap();
        assert!(c_pos < src_pos && src_pos < obj_pos);
    }

    #[test]
    fn test_msvc_compile_command_shape() {
        let config = Config::default();
        let mut opts = options(ToolchainKind::Msvc);
        opts.defines = vec![Define {
            name: "WIN32_LEAN_AND_MEAN".to_string(),
            value: None,
        }];
        let root = Path::new("/proj");
        let tc = commands(&config, &opts, root);

        let step = tc.compile_step(Path::new("/proj/src/main.cpp"));
        let cmd = &step.command;

        assert_eq!(cmd[0], "cl");
        assert!(cmd.contains(&"/c".to_string()));
        assert!(cmd.contains(&"/DWIN32_LEAN_AND_MEAN".to_string()));
        assert!(cmd.contains(&"/Fo/proj/build/main.o".to_string()));
        assert!(!cmd.contains(&"-I/proj/include".to_string()));
        assert!(cmd.contains(&"/I/proj/include".to_string()));
        // one /I for the project plus one per configured system include dir
        let include_count = cmd.iter().filter(|a| a.starts_with("/I")).count();
        assert_eq!(include_count, 1 + config.msvc.include_dirs.len());
    }

    #[test]
    fn test_optimize_and_warnings_are_gnu_only() {
        let config = Config::default();
        let mut opts = options(ToolchainKind::Msvc);
        opts.optimize = Some("3".to_string());
        opts.warning_flags = vec!["-Wall".to_string()];
        let root = Path::new("/proj");
        let tc = commands(&config, &opts, root);

        let cmd = tc.compile_step(Path::new("/proj/src/a.cpp")).command;
        assert!(!cmd.contains(&"-O3".to_string()));
        assert!(!cmd.contains(&"-Wall".to_string()));
    }

    #[test]
    fn test_gnu_link_plan_is_single() {
        let config = Config::default();
        let opts = options(ToolchainKind::Gnu);
        let root = Path::new("/proj");
        let tc = commands(&config, &opts, root);

        let objects = vec![
            PathBuf::from("/proj/build/a.o"),
            PathBuf::from("/proj/build/b.o"),
        ];
        match tc.link_plan(&objects) {
            LinkPlan::Single(step) => {
                assert_eq!(step.command[0], "g++");
                assert!(step.command.contains(&"-pass-exit-codes".to_string()));
                assert!(step.command.contains(&"/proj/bin/app".to_string()));
                assert!(step.command.contains(&"/proj/build/a.o".to_string()));
                assert!(step.command.contains(&"/proj/build/b.o".to_string()));
                assert_eq!(*step.command.last().unwrap(), "-Wall".to_string());
            }
            LinkPlan::Pair { .. } => panic!("gnu link must be a single invocation"),
        }
    }

    #[test]
    fn test_msvc_link_plan_is_pair_with_distinct_outputs() {
        let config = Config::default();
        let opts = options(ToolchainKind::Msvc);
        let root = Path::new("/proj");
        let tc = commands(&config, &opts, root);

        let objects = vec![PathBuf::from("/proj/build/a.o")];
        match tc.link_plan(&objects) {
            LinkPlan::Pair { x86, x64 } => {
                assert!(x86.command.contains(&"/OUT:/proj/bin/app.exe".to_string()));
                assert!(x64.command.contains(&"/OUT:/proj/bin/app64.exe".to_string()));
                // only the 32-bit variant carries the subsystem flag
                assert!(x86
                    .command
                    .contains(&config.msvc.subsystem_flag.to_string()));
                assert!(!x64.command.contains(&config.msvc.subsystem_flag.to_string()));
                assert!(x86.command.contains(&"-opt:ref".to_string()));
                assert!(x64.command.contains(&"-opt:ref".to_string()));
                assert!(x86.command.contains(&"user32.lib".to_string()));
            }
            LinkPlan::Single(_) => panic!("msvc link must be a pair of invocations"),
        }
    }

    #[test]
    fn test_debug_step_covers_all_sources() {
        let config = Config::default();
        let opts = options(ToolchainKind::Gnu);
        let root = Path::new("/proj");
        let tc = commands(&config, &opts, root);

        let srcs = vec![
            PathBuf::from("/proj/src/main.cpp"),
            PathBuf::from("/proj/src/util.cpp"),
        ];
        let step = tc.debug_step(&srcs);

        assert_eq!(step.command[0], "g++");
        assert!(step.command.contains(&"-g".to_string()));
        assert!(step.command.contains(&"/proj/bin/app".to_string()));
        assert!(step.command.contains(&"/proj/src/main.cpp".to_string()));
        assert!(step.command.contains(&"/proj/src/util.cpp".to_string()));
        assert!(!step.command.contains(&"-c".to_string()));
    }

    #[test]
    fn test_debug_step_ignores_msvc_selection() {
        let config = Config::default();
        let mut opts = options(ToolchainKind::Msvc);
        opts.defines = vec![Define {
            name: "TRACE".to_string(),
            value: None,
        }];
        let root = Path::new("/proj");
        let tc = commands(&config, &opts, root);

        let step = tc.debug_step(&[PathBuf::from("/proj/src/main.cpp")]);

        assert_eq!(step.command[0], "g++");
        assert!(step.command.contains(&"-DTRACE".to_string()));
        assert!(step.command.contains(&"/proj/bin/app".to_string()));
        assert!(!step.command.contains(&"/MT".to_string()));
        assert!(!step
            .command
            .iter()
            .any(|a| a.starts_with("/Fo") || a.starts_with("/OUT:")));
    }

    #[test]
    fn test_run_target_name_per_toolchain() {
        let config = Config::default();
        let root = Path::new("/proj");

        let gnu_opts = options(ToolchainKind::Gnu);
        assert_eq!(commands(&config, &gnu_opts, root).run_target_name(), "app");

        let msvc_opts = options(ToolchainKind::Msvc);
        assert_eq!(
            commands(&config, &msvc_opts, root).run_target_name(),
            "app64"
        );
    }
}
