//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

use std::fmt::Error;
use std::fmt::Formatter;
use std::time::Instant;

use log::info;

/// A simple struct that allows to do naive timing outputs
///
/// Logger is used as an output source, make sure logger backend is configured
///
/// Log output may look like
/// `[2019-12-04T20:14:59Z INFO  protocol] [participant2 | message B size: 10000] elapsed:
/// 0.00625 sec [qps: 1600435]`
///
/// # Example
///
/// ```
/// use common::timer;
/// let t = timer::Timer::new("my method");
/// let values = vec![1, 2, 3];
/// // would send to log info a message like:
/// // [my method | read input size: 3] elapsed 0.231 sec [qps: 2314]
/// t.qps("read input", values.len());
/// ```
pub struct Timer {
    start: Instant,
    label: String,
    extra_label: Option<String>,
    size: Option<usize>,
    silent: bool,
}

/// Semantics assumes that imports happen as:
///
/// ```
/// use common::timer;
/// // AND NOT LIKE: common::timer::{Timer, Builder};
/// // that makes it clear where does the Builder belong:
/// let t = timer::Builder::new().label("round 1").build();
/// ```
pub struct Builder {
    label: String,
    extra_label: Option<String>,
    size: Option<usize>,
    silent: bool,
}

impl Builder {
    pub fn new() -> Builder {
        Builder {
            label: String::from(""),
            extra_label: None,
            size: None,
            silent: false,
        }
    }

    /// The clock starts here, not at `Builder::new`
    pub fn build(&self) -> Timer {
        Timer {
            start: Instant::now(),
            label: String::from(&self.label),
            extra_label: self.extra_label.clone(),
            size: self.size,
            silent: self.silent,
        }
    }

    pub fn size(&mut self, size: usize) -> &mut Builder {
        self.size = Some(size);
        self
    }

    pub fn label(&mut self, label: &str) -> &mut Builder {
        self.label = String::from(label);
        self
    }

    pub fn extra_label(&mut self, extra_label: &str) -> &mut Builder {
        self.extra_label = Some(String::from(extra_label));
        self
    }

    pub fn silent(&mut self, silent: bool) -> &mut Builder {
        self.silent = silent;
        self
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Returns a new timer that reports on drop
    ///
    /// # Arguments
    ///
    /// * label - will work as a prefix to all outputs of a timer
    pub fn new(label: &str) -> Timer {
        Builder::new().label(label).build()
    }

    /// Returns a new timer that only reports on explicit calls
    pub fn new_silent(label: &str) -> Timer {
        Builder::new().label(label).silent(true).build()
    }

    /// Returns a formatted string with labels and elapsed times
    ///
    /// # Arguments
    ///
    /// - label - optional extra label
    ///
    /// - size - optional size of operation required for qps output
    pub fn qps_str(&self, label: Option<&str>, size: Option<usize>) -> String {
        let e = self.start.elapsed().as_secs_f64();

        let fixed_label = label.map(|x| format!(" | {}", x)).unwrap_or_default();
        let fixed_size = size.map(|x| format!(" size: {}", x)).unwrap_or_default();
        let fixed_qps = size
            .map(|x| format!(" [qps: {:.0}]", (x as f64) / e.max(f64::EPSILON)))
            .unwrap_or_default();

        format!(
            "[{}{}{}] elapsed: {:.5} sec{}",
            self.label, fixed_label, fixed_size, e, fixed_qps
        )
    }

    /// Wrapper method that sends formatted string without QPS
    /// to `log.info`
    pub fn elapsed_log(&self, label: Option<&str>) {
        info!("{}", self.qps_str(label, None))
    }

    /// Wrapper method that sends formatted string with QPS
    /// to `log.info`
    pub fn qps(&self, label: &str, size: usize) {
        info!("{}", self.qps_str(Some(label), Some(size)));
    }
}

impl std::fmt::Debug for Timer {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "timer, label: {}", self.label)
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if !self.silent {
            info!("{}", self.qps_str(self.extra_label.as_deref(), self.size));
        }
    }
}
