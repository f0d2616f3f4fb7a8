use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::toolchain::{Define, ToolchainKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub gnu: GnuConfig,
    #[serde(default)]
    pub msvc: MsvcConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default = "default_target")]
    pub target: String,
    #[serde(default = "default_source_dir")]
    pub source_dir: String,
    #[serde(default = "default_include_dir")]
    pub include_dir: String,
    #[serde(default = "default_build_dir")]
    pub build_dir: String,
    #[serde(default = "default_bin_dir")]
    pub bin_dir: String,
    #[serde(default = "default_source_ext")]
    pub source_ext: String,
    #[serde(default = "default_toolchain")]
    pub toolchain: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GnuConfig {
    #[serde(default = "default_gnu_compiler")]
    pub compiler: String,
    #[serde(default = "default_gnu_compile_flags")]
    pub compile_flags: Vec<String>,
    #[serde(default = "default_gnu_link_flags")]
    pub link_flags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MsvcConfig {
    #[serde(default = "default_msvc_compiler")]
    pub compiler: String,
    #[serde(default = "default_msvc_linker")]
    pub linker: String,
    #[serde(default = "default_msvc_compile_flags")]
    pub compile_flags: Vec<String>,
    #[serde(default = "default_msvc_include_dirs")]
    pub include_dirs: Vec<String>,
    #[serde(default = "default_msvc_lib_paths")]
    pub lib_paths: Vec<String>,
    #[serde(default = "default_msvc_extern_libs")]
    pub extern_libs: Vec<String>,
    #[serde(default = "default_msvc_subsystem_flag")]
    pub subsystem_flag: String,
    #[serde(default = "default_msvc_opt_flag")]
    pub opt_flag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_storage_path")]
    pub storage_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project: ProjectConfig::default(),
            gnu: GnuConfig::default(),
            msvc: MsvcConfig::default(),
            history: HistoryConfig::default(),
        }
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            target: default_target(),
            source_dir: default_source_dir(),
            include_dir: default_include_dir(),
            build_dir: default_build_dir(),
            bin_dir: default_bin_dir(),
            source_ext: default_source_ext(),
            toolchain: default_toolchain(),
        }
    }
}

impl Default for GnuConfig {
    fn default() -> Self {
        Self {
            compiler: default_gnu_compiler(),
            compile_flags: default_gnu_compile_flags(),
            link_flags: default_gnu_link_flags(),
        }
    }
}

impl Default for MsvcConfig {
    fn default() -> Self {
        Self {
            compiler: default_msvc_compiler(),
            linker: default_msvc_linker(),
            compile_flags: default_msvc_compile_flags(),
            include_dirs: default_msvc_include_dirs(),
            lib_paths: default_msvc_lib_paths(),
            extern_libs: default_msvc_extern_libs(),
            subsystem_flag: default_msvc_subsystem_flag(),
            opt_flag: default_msvc_opt_flag(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            storage_path: default_storage_path(),
        }
    }
}

fn default_target() -> String {
    "app".to_string()
}

fn default_source_dir() -> String {
    "src".to_string()
}

fn default_include_dir() -> String {
    "include".to_string()
}

fn default_build_dir() -> String {
    "build".to_string()
}

fn default_bin_dir() -> String {
    "bin".to_string()
}

fn default_source_ext() -> String {
    "cpp".to_string()
}

fn default_toolchain() -> String {
    "gnu".to_string()
}

fn default_gnu_compiler() -> String {
    "g++".to_string()
}

fn default_gnu_compile_flags() -> Vec<String> {
    vec!["-g".to_string()]
}

fn default_gnu_link_flags() -> Vec<String> {
    vec!["-Wall".to_string()]
}

fn default_msvc_compiler() -> String {
    "cl".to_string()
}

fn default_msvc_linker() -> String {
    "link".to_string()
}

fn default_msvc_compile_flags() -> Vec<String> {
    [
        "/MT", "/nologo", "/Gm-", "/GR-", "/EHa", "/Od", "/Oi", "/WX", "/W4", "/wd4127",
        "/wd4701", "/wd4201", "/wd4100", "/wd4189", "/FC", "/Zi",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_msvc_include_dirs() -> Vec<String> {
    [
        "C:/Program Files (x86)/Microsoft Visual Studio/2019/BuildTools/VC/Tools/MSVC/14.29.30133/include",
        "C:/Program Files (x86)/Windows Kits/10/Include/10.0.19041.0/ucrt",
        "C:/Program Files (x86)/Windows Kits/10/Include/10.0.19041.0/um",
        "C:/Program Files (x86)/Windows Kits/10/Include/10.0.19041.0/shared",
        "C:/Program Files (x86)/Windows Kits/10/Include/10.0.19041.0/winrt",
        "C:/Program Files (x86)/Windows Kits/10/Include/10.0.19041.0/cppwinrt/winrt",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_msvc_lib_paths() -> Vec<String> {
    [
        "C:/Program Files (x86)/Windows Kits/10/Lib/10.0.19041.0/um/x64",
        "C:/Program Files (x86)/Windows Kits/10/Lib/10.0.19041.0/ucrt/x64",
        "C:/Program Files (x86)/Microsoft Visual Studio/2019/BuildTools/VC/Tools/MSVC/14.29.30133/lib/x64",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_msvc_extern_libs() -> Vec<String> {
    ["user32.lib", "gdi32.lib", "shlwapi.lib", "winmm.lib"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_msvc_subsystem_flag() -> String {
    "-subsystem:windows,5.1".to_string()
}

fn default_msvc_opt_flag() -> String {
    "-opt:ref".to_string()
}

fn default_max_entries() -> usize {
    50
}

fn default_storage_path() -> String {
    "~/.kiln/build_history.json".to_string()
}

impl Config {
    /// Resolve the configuration for a project root. An explicit `--config`
    /// path must exist; the conventional `<root>/kiln.toml` may be absent,
    /// in which case every field takes its default.
    pub fn load(root: &Path, explicit: Option<&Path>) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => {
                let expanded = Self::expand_path(&path.to_string_lossy());
                if !expanded.exists() {
                    anyhow::bail!("Config file not found: {}", expanded.display());
                }
                Self::load_from_file(&expanded)
            }
            None => Self::load_from_file(root.join("kiln.toml")),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let raw = path.as_ref().to_string_lossy();
        let path = Self::expand_path(&raw);

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    pub fn expand_path(path: &str) -> PathBuf {
        let expanded = shellexpand::tilde(path);
        PathBuf::from(expanded.as_ref())
    }

    pub fn storage_path(&self) -> PathBuf {
        Self::expand_path(&self.history.storage_path)
    }

    pub fn source_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.project.source_dir)
    }

    pub fn include_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.project.include_dir)
    }

    pub fn build_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.project.build_dir)
    }

    pub fn bin_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.project.bin_dir)
    }
}

/// Effective per-invocation settings: the loaded configuration overlaid
/// with command-line flags.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub toolchain: ToolchainKind,
    pub optimize: Option<String>,
    pub warning_flags: Vec<String>,
    pub defines: Vec<Define>,
    pub force: bool,
}

impl BuildOptions {
    pub fn from_cli(cli: &Cli, config: &Config) -> anyhow::Result<Self> {
        let toolchain = if cli.msvc {
            ToolchainKind::Msvc
        } else {
            config
                .project
                .toolchain
                .parse::<ToolchainKind>()
                .with_context(|| {
                    format!(
                        "Invalid toolchain '{}' in configuration",
                        config.project.toolchain
                    )
                })?
        };

        Ok(Self {
            toolchain,
            optimize: cli.optimize.clone(),
            warning_flags: cli.warnings.iter().map(|w| w.gnu_flag().to_string()).collect(),
            defines: cli.defines.clone(),
            force: cli.force,
        })
    }
}
