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

//! The error kinds used throughout this crate. All of them trickle down into
//! the top-level `failure::Error` that `main` reports.

use std::path::PathBuf;

pub use failure::{Error, ResultExt};

/// A failure while loading configuration from the environment or the command
/// line.
#[derive(Fail, Debug)]
pub enum ConfigError {
    #[fail(display = "missing required environment variable {:?}", _0)]
    MissingEnv(&'static str),
}

/// A failure while reading or parsing the edge file.
#[derive(Fail, Debug)]
pub enum EdgeFileError {
    #[fail(display = "failed to open edge file {:?}", path)]
    Open {
        path: PathBuf,
        #[fail(cause)]
        cause: std::io::Error,
    },

    #[fail(display = "{:?}:{}: malformed line: {:?}", path, line, text)]
    Malformed {
        path: PathBuf,
        line: usize,
        text: String,
    },
}

/// A failure constructing the dependency graph.
#[derive(Fail, Debug)]
pub enum GraphError {
    #[fail(display = "failed to create root node")]
    NoRoot,
}

/// A failure assigning build priorities.
#[derive(Fail, Debug)]
pub enum PriorityError {
    #[fail(display = "graph has no root node")]
    NoRoot,
}

/// A failure building a single package or finalization target.
#[derive(Fail, Debug)]
pub enum BuildError {
    #[fail(display = "failed to spawn `make {}`", target)]
    Spawn {
        target: String,
        #[fail(cause)]
        cause: std::io::Error,
    },

    #[fail(display = "`make {}` exited with status {}", target, code)]
    ExitStatus { target: String, code: i32 },

    #[fail(display = "`make {}` was terminated by a signal", target)]
    Signaled { target: String },
}

/// A failure running the serial finalization targets.
#[derive(Fail, Debug)]
#[fail(display = "finalizer target {:?} failed", target)]
pub struct FinalizerError {
    pub target: String,
    #[fail(cause)]
    pub cause: Error,
}

/// The overall outcome of a build: the set of packages whose build failed.
///
/// This is returned (as an `Err`) whenever the scheduler or finalizer set the
/// global error flag. It is intentionally distinct from the per-job errors
/// above: a single failed package does not, by itself, stop the driver from
/// reporting every other failure it saw.
#[derive(Fail, Debug)]
pub struct BuildFailure {
    pub failed_packages: Vec<String>,
}

impl std::fmt::Display for BuildFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.failed_packages.len() == 1 {
            write!(f, "build failed with 1 error")
        } else {
            write!(f, "build failed with {} errors", self.failed_packages.len())
        }
    }
}
