//! Report Module
//!
//! Summary reporting for a finished conversion batch.

use crate::batch::OutcomeCounters;
use crate::progress::format_duration;
use std::path::Path;
use std::time::Duration;

/// Boxed summary, printed in verbose mode.
pub fn print_summary_report(counters: &OutcomeCounters, duration: Duration, operation_name: &str) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║  📊 {:<56} ║", format!("{} Summary Report", operation_name));
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  📁 Files Processed:    {:>10}                           ║", counters.total());
    println!("║  ✅ Converted:          {:>10}                           ║", counters.converted);
    println!("║  ❌ Failed:             {:>10}                           ║", counters.failed);
    println!(
        "║  📈 Success Rate:       {:>9.1}%                           ║",
        counters.success_rate()
    );
    println!(
        "║  ⏱️  Total Time:         {:>10}                           ║",
        format_duration(duration)
    );
    println!("╚══════════════════════════════════════════════════════════════╝");
}

/// The one-line summary every run ends with.
pub fn print_simple_summary(counters: &OutcomeCounters, output_dir: &Path, error_log: &Path) {
    println!("{}", summary_line(counters, output_dir));
    println!("Error log: {}", error_log.display());
}

pub fn summary_line(counters: &OutcomeCounters, output_dir: &Path) -> String {
    format!(
        "\nDone. Converted: {}, Failed: {}. Output: {}",
        counters.converted,
        counters.failed,
        output_dir.display()
    )
}
