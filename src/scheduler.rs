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

//! The scheduling loop: repeatedly scans the graph in priority order,
//! dispatches every package whose parents have all finished, and waits for
//! the pool to drain once no more progress can be made.
//!
//! This owns exactly the state that needs to be shared across worker
//! threads -- the graph itself (behind a mutex; the scan is cheap and held
//! only for the duration of one pass, never across a build), a pool, and a
//! global error flag. `Graph` itself stays plain data so that it can be unit
//! tested without any of this machinery (see `graph.rs`).

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::error::BuildFailure;
use crate::executor::{self, Job};
use crate::finalizer;
use crate::graph::{Graph, NodeId, Status};
use crate::lock;
use crate::pool::Pool;
use crate::stamp;

/// A notification about a single node's progress, used to drive the console
/// reporter. Not fatal on its own -- a `Failed` event just means the
/// scheduler will stop dispatching new work, not that it stops immediately.
#[derive(Debug, Clone)]
pub enum Event {
    Started { name: String },
    Skipped { name: String },
    Succeeded { name: String, elapsed: Duration },
    Failed { name: String, elapsed: Duration },
}

/// Default time between scheduling passes. The reference implementation
/// polls once a second; this is deliberately coarse; there is no benefit to
/// busy-waiting on a scan that is itself cheap only because the real work
/// happens in the pool.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

pub struct Scheduler {
    config: Config,
    poll_interval: Duration,
}

impl Scheduler {
    pub fn new(config: Config) -> Scheduler {
        Scheduler {
            config,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Overrides the default poll interval. Exposed mainly so tests don't
    /// have to wait a full second per scheduling pass.
    pub fn with_poll_interval(mut self, interval: Duration) -> Scheduler {
        self.poll_interval = interval;
        self
    }

    /// Runs `graph` to completion (or to first failure). `graph` must
    /// already have had `priority::assign` called on it.
    ///
    /// `on_event` and `on_banner` are called from worker threads as jobs
    /// progress; they must tolerate being called concurrently from more than
    /// one thread.
    pub fn run(
        &self,
        graph: Graph,
        on_event: impl Fn(Event) + Send + Sync,
        on_banner: impl Fn(&str) + Send + Sync,
    ) -> Result<(), BuildFailure> {
        lock::reset(&self.config).ok();

        let graph = Mutex::new(graph);
        let active = AtomicUsize::new(0);
        let global_error = AtomicBool::new(false);
        let lock_claimed = AtomicBool::new(false);

        let pool = Pool::new(self.config.cpu_num);

        pool.scope(|pool| {
            loop {
                {
                    let mut g = graph.lock().unwrap();

                    // Should be unreachable given the scan loop's own
                    // bookkeeping below, but cheap to assert.
                    if active.load(Ordering::SeqCst) > pool.cpu_num() {
                        log::warn!("active job count exceeded cpu_num; aborting build");
                        global_error.store(true, Ordering::SeqCst);
                    }

                    if !global_error.load(Ordering::SeqCst) {
                        let order = g.order.clone();
                        for id in order {
                            if active.load(Ordering::SeqCst) >= pool.cpu_num() {
                                break;
                            }

                            if id == NodeId::ROOT {
                                continue;
                            }

                            if g.node(id).status != Status::Ready {
                                continue;
                            }

                            let parents_done = g
                                .node(id)
                                .parents
                                .iter()
                                .all(|&p| g.node(p).status == Status::Done);
                            if !parents_done {
                                continue;
                            }

                            if stamp::already_built(&self.config, g.node(id)) {
                                g.node_mut(id).status = Status::Done;
                                on_event(Event::Skipped {
                                    name: g.node(id).name.clone(),
                                });
                                continue;
                            }

                            g.node_mut(id).status = Status::Processing;
                            g.node_mut(id).timer_start = Some(Instant::now());
                            active.fetch_add(1, Ordering::SeqCst);

                            let name = g.node(id).name.clone();
                            log::info!("dispatching {} (priority {})", name, g.node(id).priority);
                            on_event(Event::Started { name: name.clone() });

                            let log_path = self.config.log_dir().join(format!("{}.log", name));
                            let config = &self.config;
                            let graph_ref = &graph;
                            let active_ref = &active;
                            let global_error_ref = &global_error;
                            let lock_claimed_ref = &lock_claimed;
                            let on_event_ref = &on_event;
                            let on_banner_ref = &on_banner;

                            pool.submit(move || {
                                let _ = std::fs::create_dir_all(config.log_dir());

                                let owns_br2_external = !lock_claimed_ref
                                    .swap(true, Ordering::SeqCst);

                                let owns_br2_external = owns_br2_external
                                    && lock::claim(config).unwrap_or(false);

                                let job = Job {
                                    target: &name,
                                    log_path: &log_path,
                                    owns_br2_external,
                                };

                                let start = Instant::now();
                                let result = executor::run(config, &job, |line| on_banner_ref(line));
                                let elapsed = start.elapsed();

                                let mut g = graph_ref.lock().unwrap();
                                let id = g.node_id(&name).expect("node vanished");
                                g.node_mut(id).elapsed = elapsed;
                                g.node_mut(id).pool_slot = None;

                                match result {
                                    Ok(()) => {
                                        log::debug!("{} finished in {:?}", name, elapsed);
                                        g.node_mut(id).status = Status::Done;
                                        on_event_ref(Event::Succeeded {
                                            name: name.clone(),
                                            elapsed,
                                        });
                                    }
                                    Err(ref err) => {
                                        log::warn!("{} failed after {:?}: {}", name, elapsed, err);
                                        g.node_mut(id).status = Status::Done;
                                        g.node_mut(id).build_failed = true;
                                        global_error_ref.store(true, Ordering::SeqCst);
                                        on_event_ref(Event::Failed {
                                            name: name.clone(),
                                            elapsed,
                                        });
                                    }
                                }

                                active_ref.fetch_sub(1, Ordering::SeqCst);
                            });
                        }
                    }
                }

                let done = {
                    let g = graph.lock().unwrap();
                    g.ids().all(|id| g.node(id).status == Status::Done)
                };

                if active.load(Ordering::SeqCst) == 0
                    && (global_error.load(Ordering::SeqCst) || done)
                {
                    break;
                }

                std::thread::sleep(self.poll_interval);
            }
        });

        lock::remove(&self.config).ok();

        if !global_error.load(Ordering::SeqCst) {
            if let Err(err) = finalizer::run(&self.config, |line| on_banner(line)) {
                log::warn!("finalizer failed: {}", err);
                return Err(BuildFailure {
                    failed_packages: vec![err.target.clone()],
                });
            }
        }

        if global_error.load(Ordering::SeqCst) {
            let g = graph.into_inner().unwrap();
            let failed_packages = g
                .ids()
                .filter(|&id| g.node(id).build_failed)
                .map(|id| g.node(id).name.clone())
                .collect();
            return Err(BuildFailure { failed_packages });
        }

        Ok(())
    }
}
