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

//! Renders scheduler events to the console, in color when the output
//! stream is a terminal.

use std::io::Write;
use std::sync::Mutex;

use humantime::format_duration;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::scheduler::Event;

/// A console reporter. Safe to share across worker threads: every write is
/// serialized through an internal mutex so concurrent packages don't
/// interleave mid-line.
pub struct Reporter {
    stream: Mutex<StandardStream>,
}

impl Reporter {
    pub fn new(color: ColorChoice) -> Reporter {
        Reporter {
            stream: Mutex::new(StandardStream::stdout(color)),
        }
    }

    pub fn banner(&self, line: &str) {
        let mut stream = self.stream.lock().unwrap();
        let _ = writeln!(stream, "{}", line);
    }

    pub fn event(&self, event: Event) {
        let mut stream = self.stream.lock().unwrap();

        match event {
            Event::Started { name } => {
                let _ = set_color(&mut stream, Color::Cyan);
                let _ = write!(stream, "  building");
                let _ = stream.reset();
                let _ = writeln!(stream, " {}", name);
            }
            Event::Skipped { name } => {
                let _ = set_color(&mut stream, Color::Blue);
                let _ = write!(stream, "   skipped");
                let _ = stream.reset();
                let _ = writeln!(stream, " {} (already built)", name);
            }
            Event::Succeeded { name, elapsed } => {
                let _ = set_color(&mut stream, Color::Green);
                let _ = write!(stream, "        ok");
                let _ = stream.reset();
                let _ = writeln!(stream, " {} ({})", name, format_duration(round(elapsed)));
            }
            Event::Failed { name, elapsed } => {
                let _ = set_color(&mut stream, Color::Red);
                let _ = write!(stream, "     FAILED");
                let _ = stream.reset();
                let _ = writeln!(stream, " {} ({})", name, format_duration(round(elapsed)));
            }
        }
    }

    pub fn summary_ok(&self, elapsed: std::time::Duration) {
        let mut stream = self.stream.lock().unwrap();
        let _ = set_color(&mut stream, Color::Green);
        let _ = write!(stream, "build succeeded");
        let _ = stream.reset();
        let _ = writeln!(stream, " in {}", format_duration(round(elapsed)));
    }

    pub fn summary_failed(&self, failed_packages: &[String], elapsed: std::time::Duration) {
        let mut stream = self.stream.lock().unwrap();
        let _ = set_color(&mut stream, Color::Red);
        let _ = write!(stream, "build failed");
        let _ = stream.reset();
        let _ = writeln!(
            stream,
            " after {} ({} package(s) failed)",
            format_duration(round(elapsed)),
            failed_packages.len()
        );

        for name in failed_packages {
            let _ = writeln!(stream, "  - {}", name);
        }
    }
}

fn set_color(stream: &mut StandardStream, color: Color) -> std::io::Result<()> {
    stream.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))
}

/// `humantime::format_duration` is verbose down to the nanosecond; truncate
/// to whole seconds for the console, which is all a human cares about here.
fn round(d: std::time::Duration) -> std::time::Duration {
    std::time::Duration::from_secs(d.as_secs())
}
