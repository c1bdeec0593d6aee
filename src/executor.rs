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

//! Runs `make <target>` for a single package, merging its stdout and stderr
//! into one stream the way a shell's `2>&1` would, tee-ing every line to a
//! per-package log file, and echoing the build system's own "entering
//! directory" style banner lines to the console as they arrive.

use std::ffi::OsString;
use std::fs::OpenOptions;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::time::Duration;

use crate::config::Config;
use crate::error::BuildError;
use crate::retry::Retry;

/// Reverse-video escape the underlying build system uses to highlight a
/// line worth surfacing directly to the console (e.g. `>>> foo 1.0
/// Downloading`).
const BANNER_PREFIX: &str = "\x1B[7m>>>";

/// Everything the executor needs to know about a single build job, beyond
/// the target name itself.
pub struct Job<'a> {
    pub target: &'a str,
    pub log_path: &'a Path,
    /// Whether this job claimed the one-shot `BR2_EXTERNAL` sentinel.
    /// `BR2_EXTERNAL` itself is passed to every invocation when configured;
    /// this flag only ever gated the sentinel claim, never the env var.
    pub owns_br2_external: bool,
}

/// Runs one `make` invocation to completion, writing its merged output to
/// `job.log_path` and calling `on_banner` for each highlighted line.
///
/// Returns `Ok(())` on a zero exit status. A non-zero exit or signal
/// termination is reported as `Err`, never as a panic: a single failing
/// package must not take down the whole build.
pub fn run(
    config: &Config,
    job: &Job,
    mut on_banner: impl FnMut(&str),
) -> Result<(), BuildError> {
    if config.retry_missing_rule {
        run_with_retry(config, job, &mut on_banner)
    } else {
        run_once(config, job, &mut on_banner)
    }
}

fn run_with_retry(
    config: &Config,
    job: &Job,
    on_banner: &mut impl FnMut(&str),
) -> Result<(), BuildError> {
    let retry = Retry::default()
        .with_retries(1)
        .with_delay(Duration::from_secs(2));

    retry.call(
        || run_once(config, job, on_banner),
        |err| matches!(err, BuildError::ExitStatus { .. }),
        crate::retry::progress_dummy,
    )
}

fn run_once(
    config: &Config,
    job: &Job,
    on_banner: &mut impl FnMut(&str),
) -> Result<(), BuildError> {
    let mut log = match OpenOptions::new()
        .create(true)
        .append(true)
        .open(job.log_path)
    {
        Ok(file) => Some(file),
        Err(err) => {
            log::warn!(
                "could not open log file {:?} for `make {}`: {}; proceeding without it",
                job.log_path,
                job.target,
                err
            );
            None
        }
    };

    let (reader, writer) = os_pipe::pipe().map_err(|cause| BuildError::Spawn {
        target: job.target.to_string(),
        cause,
    })?;

    let mut command = Command::new("make");
    command.arg(job.target);
    command.stdin(Stdio::null());

    if !config.br2_external.is_empty() {
        command.env("BR2_EXTERNAL", OsString::from(&config.br2_external));
    }

    let writer_err = writer.try_clone().map_err(|cause| BuildError::Spawn {
        target: job.target.to_string(),
        cause,
    })?;
    command.stdout(writer);
    command.stderr(writer_err);

    log::debug!(
        "spawning `make {}` (owns_br2_external={})",
        job.target,
        job.owns_br2_external
    );

    let mut child = command.spawn().map_err(|cause| BuildError::Spawn {
        target: job.target.to_string(),
        cause,
    })?;

    // Drop our copies of the write end so the pipe's reader sees EOF once
    // the child (and only the child) closes its ends.
    drop(command);

    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {
                let trimmed = line.trim_end_matches('\n');
                if let Some(log) = log.as_mut() {
                    let _ = writeln!(log, "{}", trimmed);
                }
                if trimmed.starts_with(BANNER_PREFIX) {
                    on_banner(trimmed);
                }
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }

    let status = child.wait().map_err(|cause| BuildError::Spawn {
        target: job.target.to_string(),
        cause,
    })?;

    log::debug!("`make {}` exited with {}", job.target, status);

    classify(job.target, status)
}

fn classify(target: &str, status: ExitStatus) -> Result<(), BuildError> {
    if status.success() {
        return Ok(());
    }

    match status.code() {
        Some(code) => Err(BuildError::ExitStatus {
            target: target.to_string(),
            code,
        }),
        None => Err(BuildError::Signaled {
            target: target.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DebugModule;
    use std::path::PathBuf;

    fn test_config(dir: PathBuf) -> Config {
        Config {
            build_dir: dir.clone(),
            config_dir: dir,
            br2_external: String::new(),
            cpu_num: 1,
            designated_priority_package: None,
            finalize_targets: Vec::new(),
            retry_missing_rule: false,
            debug_level: 0,
            debug_module: DebugModule::None,
        }
    }

    #[test]
    fn missing_make_target_is_reported_as_exit_status() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path().to_path_buf());
        let log_path = dir.path().join("job.log");

        let job = Job {
            target: "this-target-does-not-exist-anywhere",
            log_path: &log_path,
            owns_br2_external: false,
        };

        let mut banners = Vec::new();
        let result = run(&config, &job, |line| banners.push(line.to_string()));

        assert!(result.is_err());
        assert!(log_path.exists());
    }

    #[test]
    fn log_file_is_appended_across_invocations_not_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path().to_path_buf());
        let log_path = dir.path().join("job.log");

        let job = Job {
            target: "this-target-does-not-exist-anywhere",
            log_path: &log_path,
            owns_br2_external: false,
        };

        run(&config, &job, |_| {}).unwrap_err();
        let first_len = std::fs::read_to_string(&log_path).unwrap().len();
        assert!(first_len > 0);

        run(&config, &job, |_| {}).unwrap_err();
        let second = std::fs::read_to_string(&log_path).unwrap();
        assert!(
            second.len() > first_len,
            "second invocation must append, not truncate: {:?}",
            second
        );
    }

    #[test]
    fn unopenable_log_path_does_not_fail_the_build() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path().to_path_buf());
        // A directory can never be opened as a log file; the build must
        // proceed without one rather than report `BuildError::Spawn`.
        let log_path = dir.path().to_path_buf();

        let job = Job {
            target: "this-target-does-not-exist-anywhere",
            log_path: &log_path,
            owns_br2_external: false,
        };

        let err = run(&config, &job, |_| {}).unwrap_err();
        assert!(matches!(err, BuildError::ExitStatus { .. }));
    }

    #[test]
    fn classify_reports_success() {
        use std::os::unix::process::ExitStatusExt;
        let status = ExitStatus::from_raw(0);
        assert!(classify("x", status).is_ok());
    }

    #[test]
    fn classify_reports_nonzero_exit() {
        use std::os::unix::process::ExitStatusExt;
        let status = ExitStatus::from_raw(1 << 8); // exit code 1
        let err = classify("x", status).unwrap_err();
        assert!(matches!(
            err,
            BuildError::ExitStatus { code: 1, .. }
        ));
    }

    #[test]
    fn classify_reports_signal() {
        use std::os::unix::process::ExitStatusExt;
        let status = ExitStatus::from_raw(9); // killed by SIGKILL
        let err = classify("x", status).unwrap_err();
        assert!(matches!(err, BuildError::Signaled { .. }));
    }
}
