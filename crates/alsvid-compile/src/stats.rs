//! Compilation statistics.
//!
//! A [`Stats`] value is owned by the driver, threaded through the passes
//! that measure something, and printed once at exit. One stat per line;
//! zero values are suppressed.

use std::fmt;
use std::time::Instant;

/// Named counters and timers collected during one compilation.
#[derive(Debug, Default, Clone)]
pub struct Stats {
    /// Seconds spent in the first allocation phase.
    pub phase1_time: f64,
    /// Seconds spent in the second allocation phase.
    pub phase2_time: f64,
    /// Seconds spent in the third allocation phase.
    pub phase3_time: f64,
    /// Number of partitions the program was split into.
    pub partitions: u32,
    /// Total number of two-qubit dependencies.
    pub dependencies: u32,
    /// Seconds spent allocating qubits.
    pub alloc_time: f64,
    /// Seconds spent inlining gates.
    pub inline_time: f64,
    /// Seconds spent replacing program registers with device registers.
    pub replace_time: f64,
    /// Seconds spent applying the solution to the program.
    pub rename_time: f64,
    /// Total cost of the chosen allocation.
    pub total_cost: u32,
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn line_f(f: &mut fmt::Formatter<'_>, name: &str, v: f64) -> fmt::Result {
            if v != 0.0 {
                writeln!(f, "{name}: {v:.6}")?;
            }
            Ok(())
        }
        fn line_u(f: &mut fmt::Formatter<'_>, name: &str, v: u32) -> fmt::Result {
            if v != 0 {
                writeln!(f, "{name}: {v}")?;
            }
            Ok(())
        }

        line_f(f, "Phase1Time", self.phase1_time)?;
        line_f(f, "Phase2Time", self.phase2_time)?;
        line_f(f, "Phase3Time", self.phase3_time)?;
        line_u(f, "BMTPartitions", self.partitions)?;
        line_u(f, "Dependencies", self.dependencies)?;
        line_f(f, "AllocTime", self.alloc_time)?;
        line_f(f, "InlineTime", self.inline_time)?;
        line_f(f, "ReplaceTime", self.replace_time)?;
        line_f(f, "RenameTime", self.rename_time)?;
        line_u(f, "TotalCost", self.total_cost)?;
        Ok(())
    }
}

/// A simple wall-clock timer.
#[derive(Debug)]
pub struct Timer(Instant);

impl Timer {
    /// Start measuring now.
    pub fn start() -> Self {
        Timer(Instant::now())
    }

    /// Seconds elapsed since start.
    pub fn elapsed_secs(&self) -> f64 {
        self.0.elapsed().as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_stats_print_nothing() {
        let stats = Stats::default();
        assert_eq!(stats.to_string(), "");
    }

    #[test]
    fn test_nonzero_stats_one_per_line() {
        let stats = Stats {
            dependencies: 3,
            total_cost: 14,
            ..Stats::default()
        };
        assert_eq!(stats.to_string(), "Dependencies: 3\nTotalCost: 14\n");
    }
}
