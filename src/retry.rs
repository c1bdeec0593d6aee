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

//! A small exponential backoff helper.
//!
//! Used by the executor's `retry_missing_rule` workaround: a package whose
//! first build attempt fails with a "No rule to make target" line gets one
//! more attempt after a short delay, in case the failure was caused by a
//! sibling package still writing out its generated makefile fragment.

use std::thread;
use std::time::Duration;

/// Configures retry behavior for a fallible operation.
#[derive(Debug, Clone, Copy)]
pub struct Retry {
    retries: usize,
    delay: Duration,
    backoff: u32,
    max_delay: Option<Duration>,
}

impl Default for Retry {
    fn default() -> Retry {
        Retry {
            retries: 0,
            delay: Duration::from_millis(0),
            backoff: 1,
            max_delay: None,
        }
    }
}

impl Retry {
    /// Sets the number of times to retry after an initial failed attempt.
    pub fn with_retries(mut self, retries: usize) -> Retry {
        self.retries = retries;
        self
    }

    /// Sets the initial delay before the first retry.
    pub fn with_delay(mut self, delay: Duration) -> Retry {
        self.delay = delay;
        self
    }

    /// Sets the multiplier applied to the delay after each failed retry.
    pub fn with_backoff(mut self, backoff: u32) -> Retry {
        self.backoff = backoff;
        self
    }

    /// Caps the delay so that backoff doesn't grow unbounded.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Retry {
        self.max_delay = Some(max_delay);
        self
    }

    /// Calls `f` until it returns `Ok`, `f` returns an error that `should_retry`
    /// rejects, or the retry budget is exhausted. `progress` is called before
    /// each sleep with the delay about to be used and the attempt number
    /// that is about to start.
    pub fn call<F, T, E, P, S>(&self, mut f: F, mut should_retry: S, mut progress: P) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        S: FnMut(&E) -> bool,
        P: FnMut(usize, Duration),
    {
        let mut delay = self.delay;

        for attempt in 0..=self.retries {
            match f() {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if attempt == self.retries || !should_retry(&err) {
                        return Err(err);
                    }

                    progress(attempt + 1, delay);
                    thread::sleep(delay);

                    delay = delay.checked_mul(self.backoff.max(1)).unwrap_or(delay);
                    if let Some(max_delay) = self.max_delay {
                        delay = delay.min(max_delay);
                    }
                }
            }
        }

        unreachable!("loop always returns on the last iteration")
    }
}

/// A `progress` callback that does nothing.
pub fn progress_dummy(_attempt: usize, _delay: Duration) {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn succeeds_immediately_without_retrying() {
        let calls = Cell::new(0);
        let retry = Retry::default().with_retries(3);

        let result: Result<i32, &str> = retry.call(
            || {
                calls.set(calls.get() + 1);
                Ok(42)
            },
            |_| true,
            progress_dummy,
        );

        assert_eq!(result, Ok(42));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn retries_up_to_the_limit_then_gives_up() {
        let calls = Cell::new(0);
        let retry = Retry::default()
            .with_retries(2)
            .with_delay(Duration::from_millis(0));

        let result: Result<i32, &str> = retry.call(
            || {
                calls.set(calls.get() + 1);
                Err("nope")
            },
            |_| true,
            progress_dummy,
        );

        assert_eq!(result, Err("nope"));
        assert_eq!(calls.get(), 3); // initial attempt + 2 retries
    }

    #[test]
    fn succeeds_on_a_later_attempt() {
        let calls = Cell::new(0);
        let retry = Retry::default()
            .with_retries(5)
            .with_delay(Duration::from_millis(0));

        let result: Result<i32, &str> = retry.call(
            || {
                calls.set(calls.get() + 1);
                if calls.get() < 3 {
                    Err("not yet")
                } else {
                    Ok(7)
                }
            },
            |_| true,
            progress_dummy,
        );

        assert_eq!(result, Ok(7));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn should_retry_false_stops_immediately() {
        let calls = Cell::new(0);
        let retry = Retry::default().with_retries(5);

        let result: Result<i32, &str> = retry.call(
            || {
                calls.set(calls.get() + 1);
                Err("fatal")
            },
            |_| false,
            progress_dummy,
        );

        assert_eq!(result, Err("fatal"));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn max_delay_caps_backoff_growth() {
        let retry = Retry::default()
            .with_retries(4)
            .with_delay(Duration::from_millis(10))
            .with_backoff(10)
            .with_max_delay(Duration::from_millis(15));

        let mut seen = Vec::new();
        let _: Result<(), &str> = retry.call(
            || Err("always"),
            |_| true,
            |_, delay| seen.push(delay),
        );

        assert!(seen.iter().all(|&d| d <= Duration::from_millis(15)));
    }
}
