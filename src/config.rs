// Copyright (c) 2022 Jason White
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
// THE SOFTWARE.

//! Immutable configuration, assembled once at startup from the environment
//! and the command line. Nothing downstream of `Config::from_env` ever reads
//! `std::env` again -- this is the single place that process-wide state gets
//! folded into a value that can just be passed around.

use std::env;
use std::path::PathBuf;

use crate::error::ConfigError;

/// Name of the one-shot sentinel file used to serialize the `BR2_EXTERNAL`
/// setup step. Lives directly under `config_dir`.
pub const LOCK_FILE_NAME: &str = ".br2_external_exec_once";

/// Default finalization target, run after every package has built
/// successfully.
pub const DEFAULT_FINALIZE_TARGETS: &[&str] = &["target-post-image"];

/// The legacy, longer finalizer list kept for reference/compatibility. Not
/// used unless a caller opts in explicitly.
pub const LEGACY_FINALIZE_TARGETS: &[&str] = &[
    "host-finalize",
    "staging-finalize",
    "target-finalize",
    "target-post-image",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugModule {
    All,
    Create,
    Execute,
    None,
}

impl std::str::FromStr for DebugModule {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(DebugModule::All),
            "create" => Ok(DebugModule::Create),
            "execute" => Ok(DebugModule::Execute),
            "none" => Ok(DebugModule::None),
            _ => Err("invalid debug module (expected all|create|execute|none)"),
        }
    }
}

/// Immutable build configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Where package build subdirectories live. Used by the stamp probe.
    pub build_dir: PathBuf,

    /// Where the log directory and sentinel file live.
    pub config_dir: PathBuf,

    /// Passed through to `make` invocations as an environment variable when
    /// non-empty.
    pub br2_external: String,

    /// Number of worker threads to use.
    pub cpu_num: usize,

    /// If set, this package must be built strictly before any other package
    /// sharing its computed priority level (see `priority::assign`).
    pub designated_priority_package: Option<String>,

    /// Finalization targets to run, in order, after every package succeeds.
    pub finalize_targets: Vec<String>,

    /// Whether to retry a build exactly once, after a short delay, if its
    /// output contains a "No rule to make target" line. Off by default; see
    /// `executor`.
    pub retry_missing_rule: bool,

    /// Verbosity level for internal diagnostic logging (0-3).
    pub debug_level: u8,

    /// Which subsystem's debug output to show.
    pub debug_module: DebugModule,
}

impl Config {
    /// Builds a `Config` from the required environment variables and the
    /// given CLI-derived overrides.
    ///
    /// `cpu_num` should already have gone through the "`<= 0` or more than
    /// the detected core count falls back to the detected core count" rule
    /// (see `bin/pbuilder/args.rs`); this function does not repeat that
    /// logic so that it stays testable without touching `num_cpus`.
    pub fn from_env(cpu_num: usize, debug_level: u8, debug_module: DebugModule) -> Result<Config, ConfigError> {
        let build_dir = env_path("BUILD_DIR")?;
        let config_dir = env_path("CONFIG_DIR")?;
        let br2_external = env::var("BR2_EXTERNAL").unwrap_or_default();

        Ok(Config {
            build_dir,
            config_dir,
            br2_external,
            cpu_num,
            designated_priority_package: Some("uclibc".to_string()),
            finalize_targets: DEFAULT_FINALIZE_TARGETS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            retry_missing_rule: false,
            debug_level,
            debug_module,
        })
    }

    /// Directory that per-package build logs are written to.
    pub fn log_dir(&self) -> PathBuf {
        self.config_dir.join("pbuilder_logs")
    }

    /// Path to the one-shot `BR2_EXTERNAL` sentinel file.
    pub fn lock_file(&self) -> PathBuf {
        self.config_dir.join(LOCK_FILE_NAME)
    }
}

fn env_path(name: &'static str) -> Result<PathBuf, ConfigError> {
    env::var_os(name)
        .map(PathBuf::from)
        .ok_or(ConfigError::MissingEnv(name))
}
