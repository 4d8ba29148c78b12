//! Terminal output for the bridge commands.
//!
//! Results go to stdout; progress, prompts and failures go to stderr so
//! `--json` output stays machine-readable.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

/// Width labels are padded to in [`field`].
const LABEL_WIDTH: usize = 16;

pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

pub fn note(msg: &str) {
    eprintln!("{}", msg.dimmed());
}

/// Print `label: value` with labels aligned in a column.
pub fn field(label: &str, value: &str) {
    let label = format!("{label}:");
    println!("{} {}", format!("{label:<LABEL_WIDTH$}").dimmed(), value);
}

/// Print a `[n/total]` step header.
pub fn step(index: usize, total: usize, msg: &str) {
    eprintln!("{} {}", format!("[{}/{}]", index + 1, total).cyan(), msg);
}

/// Print a URL the user has to open.
pub fn link(url: &str) {
    eprintln!("  {}", url.underline());
}

/// Human-readable byte count.
pub fn size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

pub fn json_pretty<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_scale_to_the_largest_fitting_unit() {
        assert_eq!(size(0), "0 B");
        assert_eq!(size(1023), "1023 B");
        assert_eq!(size(1536), "1.5 KiB");
        assert_eq!(size(5 * 1024 * 1024), "5.0 MiB");
    }
}
