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

use std::str::FromStr;

use structopt::StructOpt;
use termcolor::ColorChoice as TermColorChoice;

#[derive(Debug, StructOpt)]
pub struct GlobalOpts {
    /// Controls when to use color.
    #[structopt(long = "color", default_value = "auto", possible_values = &["auto", "always", "ansi", "never"])]
    pub color: ColorChoice,

    /// Path to the dependency edge file.
    #[structopt(long = "filename", short = "f", parse(from_os_str))]
    pub filename: std::path::PathBuf,

    /// Number of worker threads to use. `<= 0` falls back to the number of
    /// logical CPUs detected.
    #[structopt(long = "cpu", short = "c", default_value = "0")]
    pub cpu: i64,

    /// Verbosity of internal diagnostic logging (0-3).
    #[structopt(long = "debug-level", short = "l", default_value = "0")]
    pub debug_level: u8,

    /// Which subsystem's debug output to show.
    #[structopt(long = "debug-module", short = "m", default_value = "all")]
    pub debug_module: pbuilder::config::DebugModule,

    /// Retry a package once, after a short delay, if its first attempt fails
    /// with "No rule to make target". Works around a benign race where a
    /// sibling package hasn't finished writing out a generated makefile
    /// fragment yet.
    #[structopt(long = "retry-missing-rule")]
    pub retry_missing_rule: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorChoice {
    Auto,
    Always,
    /// Force ANSI escape codes even on Windows consoles that would
    /// otherwise need the native console API.
    Ansi,
    Never,
}

impl FromStr for ColorChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(ColorChoice::Auto),
            "always" => Ok(ColorChoice::Always),
            "ansi" => Ok(ColorChoice::Ansi),
            "never" => Ok(ColorChoice::Never),
            _ => Err(format!("invalid color choice: {:?}", s)),
        }
    }
}

impl From<ColorChoice> for TermColorChoice {
    fn from(c: ColorChoice) -> TermColorChoice {
        match c {
            ColorChoice::Always => TermColorChoice::Always,
            ColorChoice::Ansi => TermColorChoice::AlwaysAnsi,
            ColorChoice::Never => TermColorChoice::Never,
            ColorChoice::Auto => {
                if atty::is(atty::Stream::Stdout) {
                    TermColorChoice::Auto
                } else {
                    TermColorChoice::Never
                }
            }
        }
    }
}
