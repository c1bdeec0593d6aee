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

//! A fixed-size worker pool of scoped threads.
//!
//! Unlike a thread-per-job model, the number of OS threads is bounded by
//! `cpu_num` up front. Jobs are plain closures pushed onto a FIFO queue;
//! workers block on the queue (via a condvar, not a spin loop) until a job
//! arrives or the pool is told to shut down.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

/// A blocking FIFO queue of boxed jobs, shared between the submitter and the
/// worker threads.
///
/// This plays the same role as the reference thread pool's random-order
/// job queue, but preserves submission order: the scheduler already decides
/// dispatch order by priority, so the queue itself should not reorder jobs.
struct Jobs<'a> {
    queue: Mutex<VecDeque<Box<dyn FnOnce() + Send + 'a>>>,
    cond: Condvar,
    closed: Mutex<bool>,
}

impl<'a> Jobs<'a> {
    fn new() -> Jobs<'a> {
        Jobs {
            queue: Mutex::new(VecDeque::new()),
            cond: Condvar::new(),
            closed: Mutex::new(false),
        }
    }

    fn push(&self, job: Box<dyn FnOnce() + Send + 'a>) {
        let mut queue = self.queue.lock().unwrap();
        queue.push_back(job);
        self.cond.notify_one();
    }

    fn close(&self) {
        *self.closed.lock().unwrap() = true;
        self.cond.notify_all();
    }

    /// Blocks until a job is available or the queue is closed and empty, in
    /// which case it returns `None` and the worker should exit.
    fn pop(&self) -> Option<Box<dyn FnOnce() + Send + 'a>> {
        let mut queue = self.queue.lock().unwrap();
        loop {
            if let Some(job) = queue.pop_front() {
                return Some(job);
            }

            if *self.closed.lock().unwrap() {
                return None;
            }

            queue = self.cond.wait(queue).unwrap();
        }
    }
}

/// A pool of `cpu_num` worker threads, alive for the lifetime of a
/// [`Pool::scope`] call.
pub struct Pool<'a> {
    jobs: Jobs<'a>,
    cpu_num: usize,
}

impl<'a> Pool<'a> {
    pub fn new(cpu_num: usize) -> Pool<'a> {
        Pool {
            jobs: Jobs::new(),
            cpu_num: cpu_num.max(1),
        }
    }

    pub fn cpu_num(&self) -> usize {
        self.cpu_num
    }

    /// Submits a job to be run by some worker thread. Panics if called after
    /// the corresponding `scope` call has returned (there is no queue left
    /// to push onto).
    pub fn submit<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'a,
    {
        self.jobs.push(Box::new(job));
    }

    /// Spawns `cpu_num` worker threads and runs `body` with a handle to this
    /// pool. Once `body` returns, the queue is closed and this call blocks
    /// until every in-flight job has finished and all workers have exited.
    pub fn scope<F, T>(&self, body: F) -> T
    where
        F: FnOnce(&Pool<'a>) -> T,
    {
        crossbeam::scope(|scope| {
            for _ in 0..self.cpu_num {
                scope.spawn(move |_| {
                    while let Some(job) = self.jobs.pop() {
                        job();
                    }
                });
            }

            let result = body(self);
            self.jobs.close();
            result
        })
        .unwrap()
    }
}
