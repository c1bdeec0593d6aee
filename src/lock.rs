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

//! The `BR2_EXTERNAL` one-shot sentinel file.
//!
//! Exactly one job across the whole build gets to pass `BR2_EXTERNAL` to its
//! `make` invocation; every other job must not, or the external tree's setup
//! rules would run redundantly in parallel. The sentinel file records
//! whether that one shot has already been claimed.
//!
//! Claiming is a create-if-missing race between worker threads, so it must
//! use `O_CREAT|O_EXCL` semantics (`OpenOptions::create_new`) rather than a
//! check-then-create pair.

use std::fs;
use std::io;

use crate::config::Config;

/// Removes the sentinel file if present. Called once, before the build
/// starts, so that a previous run's sentinel doesn't suppress this run's
/// `BR2_EXTERNAL` setup step.
pub fn reset(config: &Config) -> io::Result<()> {
    match fs::remove_file(config.lock_file()) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

/// Attempts to claim the one-shot slot. Returns `true` if this call is the
/// one that created the file (and should therefore pass `BR2_EXTERNAL`
/// through to its build command); `false` if some other job already claimed
/// it.
pub fn claim(config: &Config) -> io::Result<bool> {
    match fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(config.lock_file())
    {
        Ok(_) => {
            log::debug!("claimed BR2_EXTERNAL sentinel");
            Ok(true)
        }
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(err) => Err(err),
    }
}

/// Removes the sentinel file. Called once, after the build finishes,
/// leaving no trace for the next run.
pub fn remove(config: &Config) -> io::Result<()> {
    match fs::remove_file(config.lock_file()) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
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
    fn first_claim_wins() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path().to_path_buf());

        assert!(claim(&config).unwrap());
        assert!(!claim(&config).unwrap());
    }

    #[test]
    fn reset_clears_a_stale_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path().to_path_buf());

        assert!(claim(&config).unwrap());
        reset(&config).unwrap();
        assert!(claim(&config).unwrap());
    }

    #[test]
    fn reset_on_missing_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path().to_path_buf());
        assert!(reset(&config).is_ok());
    }

    #[test]
    fn remove_clears_the_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path().to_path_buf());

        claim(&config).unwrap();
        remove(&config).unwrap();
        assert!(!config.lock_file().exists());
    }

    #[test]
    fn concurrent_claims_yield_exactly_one_winner() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path().to_path_buf());
        let winners = AtomicUsize::new(0);

        crossbeam::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|_| {
                    if claim(&config).unwrap() {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        })
        .unwrap();

        assert_eq!(winners.load(Ordering::SeqCst), 1);
    }
}
