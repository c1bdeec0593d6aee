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

mod args;
mod opts;

use std::io::Write;
use std::process;

use log::LevelFilter;
use structopt::StructOpt;
use termcolor::{ColorChoice, StandardStream, WriteColor};

use args::Args;
use pbuilder::config::DebugModule;

fn main() {
    let args = Args::from_args();
    init_logger(args.global.debug_level, args.global.debug_module);

    if let Err(err) = args.main() {
        print_error(&err);
        process::exit(1);
    }
}

/// `--debug-level`/`--debug-module` pick a baseline verbosity for this
/// crate's own modules; `RUST_LOG` (if set) always wins, so a developer can
/// still drill into a specific module without recompiling.
fn init_logger(debug_level: u8, debug_module: DebugModule) {
    let level = match debug_level {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let mut builder = pretty_env_logger::formatted_builder();

    match debug_module {
        DebugModule::All => {
            builder.filter_module("pbuilder", level);
        }
        DebugModule::Create => {
            builder.filter_module("pbuilder::graph", level);
            builder.filter_module("pbuilder::priority", level);
            builder.filter_module("pbuilder::edge", level);
        }
        DebugModule::Execute => {
            builder.filter_module("pbuilder::scheduler", level);
            builder.filter_module("pbuilder::executor", level);
            builder.filter_module("pbuilder::lock", level);
        }
        DebugModule::None => {
            builder.filter_level(LevelFilter::Warn);
        }
    }

    if let Ok(spec) = std::env::var("RUST_LOG") {
        builder.parse_filters(&spec);
    }

    builder.init();
}

fn print_error(err: &pbuilder::error::Error) {
    let mut stream = StandardStream::stderr(ColorChoice::Auto);

    let _ = stream.set_color(termcolor::ColorSpec::new().set_fg(Some(termcolor::Color::Red)));
    let _ = write!(stream, "error");
    let _ = stream.reset();
    let _ = writeln!(stream, ": {}", err);

    for cause in err.iter_causes() {
        let _ = writeln!(stream, "  caused by: {}", cause);
    }

    if let Ok(backtrace) = std::env::var("RUST_BACKTRACE") {
        if backtrace != "0" {
            let _ = writeln!(stream, "{}", err.backtrace());
        }
    }
}
