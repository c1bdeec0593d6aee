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

use std::time::Instant;

use structopt::StructOpt;
use termcolor::ColorChoice as TermColorChoice;

use pbuilder::error::{Error, ResultExt};
use pbuilder::{edge, graph, priority, reporter, scheduler};

use crate::opts::GlobalOpts;

#[derive(Debug, StructOpt)]
#[structopt(name = "pbuilder")]
pub struct Args {
    #[structopt(flatten)]
    pub global: GlobalOpts,
}

impl Args {
    pub fn main(self) -> Result<(), Error> {
        let detected = num_cpus::get();
        let cpu_num = if self.global.cpu <= 0 || (self.global.cpu as usize) > detected {
            detected
        } else {
            self.global.cpu as usize
        };

        let mut config = pbuilder::config::Config::from_env(
            cpu_num,
            self.global.debug_level,
            self.global.debug_module,
        )
        .context("failed to load configuration")?;

        config.retry_missing_rule = self.global.retry_missing_rule;

        let edges = edge::parse(&self.global.filename)
            .with_context(|_| format!("failed to parse edge file {:?}", self.global.filename))?;

        let mut graph = graph::Graph::build(&edges).context("failed to build dependency graph")?;

        priority::assign(&mut graph, config.designated_priority_package.as_deref())
            .context("failed to assign build priorities")?;

        let color: TermColorChoice = self.global.color.into();
        let reporter = reporter::Reporter::new(color);

        let started = Instant::now();
        let result = scheduler::Scheduler::new(config)
            .run(graph, |event| reporter.event(event), |line| reporter.banner(line));

        match result {
            Ok(()) => {
                reporter.summary_ok(started.elapsed());
                Ok(())
            }
            Err(failure) => {
                reporter.summary_failed(&failure.failed_packages, started.elapsed());
                Err(failure.into())
            }
        }
    }
}
