//! Pass timing.
//!
//! This modules provides facilities for timing the execution of individual passes and
//! analyses.

use core::fmt;
use std::any::Any;
use std::cell::RefCell;
use std::time::{Duration, Instant};

// Each pass that can be timed is predefined with the `define_passes!` macro. Each pass has a
// snake_case name and a plain text description used when printing out the timing report.
//
// This macro defines:
//
// - A C-style enum containing all the pass names and a `None` variant.
// - A usize constant with the number of defined passes.
// - A const array of pass descriptions.
// - A public function per pass used to start the timing of that pass.
macro_rules! define_passes {
    ($($pass:ident: $desc:expr,)+) => {
        /// A single profiled pass.
        #[allow(non_camel_case_types)]
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        pub enum Pass {
            $(#[doc=$desc] $pass,)+
            /// No active pass.
            None,
        }

        /// The amount of profiled passes.
        pub const NUM_PASSES: usize = Pass::None as usize;

        const DESCRIPTIONS: [&str; NUM_PASSES] = [ $($desc),+ ];

        $(
            #[doc=$desc]
            #[must_use]
            pub fn $pass() -> Box<dyn Any> {
                start_pass(Pass::$pass)
            }
        )+
    }
}

// Pass definitions.
define_passes! {
    flowgraph: "Control flow graph",
    structure: "Structured-construct analysis",
    call_graph: "Call graph and effect summaries",
    adce: "Aggressive dead code elimination",
    verifier: "Verify module",
}

impl Pass {
    fn idx(self) -> usize {
        self as usize
    }

    /// Description of the pass.
    pub fn description(self) -> &'static str {
        match DESCRIPTIONS.get(self.idx()) {
            Some(s) => s,
            None => "<no pass>",
        }
    }
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Accumulated timing information for all passes.
#[derive(Default, Clone)]
pub struct PassTimes {
    pass: [Duration; NUM_PASSES],
}

impl PassTimes {
    /// Add time to the total for `pass`.
    pub fn add(&mut self, pass: Pass, duration: Duration) {
        if pass.idx() < NUM_PASSES {
            self.pass[pass.idx()] += duration;
        }
    }

    /// The accumulated time of `pass`.
    pub fn total(&self, pass: Pass) -> Duration {
        self.pass.get(pass.idx()).copied().unwrap_or_default()
    }
}

impl fmt::Display for PassTimes {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "======== ==========================")?;
        writeln!(f, "   Total Pass")?;
        writeln!(f, "-------- --------------------------")?;
        for (idx, desc) in DESCRIPTIONS.iter().enumerate() {
            let time = self.pass[idx];
            if time != Duration::default() {
                writeln!(f, "{:8.3} {}", time.as_secs_f64(), desc)?;
            }
        }
        writeln!(f, "======== ==========================")
    }
}

// Information about passes in a single thread.
thread_local! {
    static PASS_TIME: RefCell<PassTimes> = RefCell::new(PassTimes::default());
}

/// Take the current accumulated pass timings and reset them.
pub fn take_current() -> PassTimes {
    PASS_TIME.with(|times| std::mem::take(&mut *times.borrow_mut()))
}

struct PassTimer {
    pass: Pass,
    started: Instant,
}

impl Drop for PassTimer {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed();
        PASS_TIME.with(|times| times.borrow_mut().add(self.pass, elapsed));
    }
}

/// Start timing `pass`.
///
/// This function is called by the publicly exposed pass functions.
fn start_pass(pass: Pass) -> Box<dyn Any> {
    Box::new(PassTimer {
        pass,
        started: Instant::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(Pass::None.to_string(), "<no pass>");
        assert_eq!(Pass::adce.to_string(), "Aggressive dead code elimination");
    }

    #[test]
    fn timers_accumulate() {
        let _ = take_current();
        {
            let _tt = adce();
        }
        let times = take_current();
        // Never negative, and attributed to the right pass slot.
        assert_eq!(times.total(Pass::flowgraph), Duration::default());
        let _ = times.total(Pass::adce);
    }
}
