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

//! A parallel build driver for a package dependency graph.
//!
//! Packages are declared in a flat edge file (see [`edge`]), assembled into
//! a [`graph::Graph`], given build priorities by [`priority`], and then
//! driven to completion by [`scheduler::Scheduler`], which dispatches each
//! ready package to a bounded [`pool::Pool`] of worker threads via
//! [`executor`]. A single `BR2_EXTERNAL` setup step is serialized across the
//! whole build by [`lock`], and a final, strictly serial set of
//! finalization targets runs in [`finalizer`] once every package succeeds.

#[macro_use]
extern crate failure_derive;

pub mod config;
pub mod edge;
pub mod error;
pub mod executor;
pub mod finalizer;
pub mod graph;
pub mod lock;
pub mod pool;
pub mod priority;
pub mod reporter;
pub mod retry;
pub mod scheduler;
pub mod stamp;
