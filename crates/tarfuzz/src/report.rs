//! Operator-facing campaign output.

use std::time::Duration;

use crate::harness::Stats;

pub const RESET: &str = "\x1b[0m";
pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";

/// Print the end-of-campaign summary: total runs, wall-clock duration,
/// and the three per-category tallies.
pub fn print_summary(stats: &Stats, elapsed: Duration) {
    println!();
    println!("{} tests passed in {:.3} s:", stats.total(), elapsed.as_secs_f64());
    println!("{YELLOW}{} without output{RESET}", stats.no_output);
    println!("{RED}{} errors{RESET} caught by the extractor", stats.rejected);
    println!("{GREEN}{} crashes{RESET} detected by the fuzzer", stats.crashes);
}
