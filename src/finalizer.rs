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

//! Runs the finalization targets, strictly in order, after every package in
//! the graph has built successfully.
//!
//! Unlike package builds, finalization is never parallelized: each target
//! usually depends on every previous one having already produced its
//! output (e.g. the staging tree before the target tree before the image).

use crate::config::Config;
use crate::error::FinalizerError;
use crate::executor::{self, Job};
use failure::ResultExt;

/// Runs `config.finalize_targets` one at a time, stopping at the first
/// failure.
pub fn run(config: &Config, mut on_banner: impl FnMut(&str)) -> Result<(), FinalizerError> {
    for target in &config.finalize_targets {
        let log_path = config.log_dir().join(format!("{}.log", target));

        let job = Job {
            target,
            log_path: &log_path,
            owns_br2_external: false,
        };

        executor::run(config, &job, &mut on_banner)
            .with_context(|_| format!("finalizer target {:?} failed", target))
            .map_err(|ctx| FinalizerError {
                target: target.clone(),
                cause: ctx.into(),
            })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DebugModule;
    use std::path::PathBuf;

    fn test_config(dir: PathBuf, targets: Vec<&str>) -> Config {
        std::fs::create_dir_all(dir.join("pbuilder_logs")).unwrap();
        Config {
            build_dir: dir.clone(),
            config_dir: dir,
            br2_external: String::new(),
            cpu_num: 1,
            designated_priority_package: None,
            finalize_targets: targets.into_iter().map(|s| s.to_string()).collect(),
            retry_missing_rule: false,
            debug_level: 0,
            debug_module: DebugModule::None,
        }
    }

    #[test]
    fn stops_at_first_failing_target() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(
            dir.path().to_path_buf(),
            vec!["nonexistent-target-a", "nonexistent-target-b"],
        );

        let err = run(&config, |_| {}).unwrap_err();
        assert_eq!(err.target, "nonexistent-target-a");
    }

    #[test]
    fn empty_target_list_succeeds_trivially() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path().to_path_buf(), vec![]);
        assert!(run(&config, |_| {}).is_ok());
    }
}
