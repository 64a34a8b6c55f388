// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Start times and durations for tests and runs.
//!
//! A start is recorded against both the wall clock (for reports) and the monotonic clock (for
//! durations), so that clock adjustments during a run don't produce negative or skewed durations.

use chrono::{DateTime, Local};
use std::time::{Duration, Instant};

pub(crate) fn stopwatch() -> StopwatchStart {
    StopwatchStart {
        // Taken back to back; close enough for reporting.
        start_time: Local::now(),
        instant: Instant::now(),
    }
}

#[derive(Clone, Debug)]
pub(crate) struct StopwatchStart {
    start_time: DateTime<Local>,
    instant: Instant,
}

impl StopwatchStart {
    pub(crate) fn start_time(&self) -> DateTime<Local> {
        self.start_time
    }

    pub(crate) fn snapshot(&self) -> StopwatchSnapshot {
        StopwatchSnapshot {
            start_time: self.start_time,
            duration: self.instant.elapsed(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct StopwatchSnapshot {
    pub(crate) start_time: DateTime<Local>,
    pub(crate) duration: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_is_monotonic() {
        let start = stopwatch();
        std::thread::sleep(Duration::from_millis(20));
        let first = start.snapshot();
        let second = start.snapshot();

        assert_eq!(first.start_time, start.start_time());
        assert!(first.duration >= Duration::from_millis(20));
        assert!(second.duration >= first.duration);
    }
}
