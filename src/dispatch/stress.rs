//! STRESS self-benchmark and report formatting
//!
//! Runs synthetic SET/UPDATE/GET/DEL cycles against an ephemeral map and
//! formats a throughput report. The live store and the snapshot file are
//! never touched. The two formatting helpers are shared with STATS and the
//! debug-mode reply timing suffix.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::time::Instant;

/// Run `count` operations of each kind against a throwaway map
pub fn run(count: usize) -> String {
    let overall_start = Instant::now();

    let keys: Vec<String> = (0..count).map(|i| format!("stress:{i}")).collect();
    let mut store: HashMap<String, String> = HashMap::with_capacity(count);

    let set_dur = {
        let start = Instant::now();
        for key in &keys {
            store.insert(key.clone(), "svalue".to_string());
        }
        start.elapsed().as_secs_f64()
    };
    let peak_bytes: u64 = store
        .iter()
        .map(|(k, v)| (k.len() + v.len()) as u64)
        .sum();

    let update_dur = {
        let start = Instant::now();
        for key in &keys {
            store.insert(key.clone(), "nvalue".to_string());
        }
        start.elapsed().as_secs_f64()
    };

    let get_dur = {
        let start = Instant::now();
        for key in &keys {
            let _ = store.get(key);
        }
        start.elapsed().as_secs_f64()
    };

    let del_dur = {
        let start = Instant::now();
        for key in &keys {
            store.remove(key);
        }
        start.elapsed().as_secs_f64()
    };

    let total = overall_start.elapsed().as_secs_f64();

    let mut report = String::new();
    let _ = write!(
        report,
        "Stress Test running for {count} ops ...\n-------------------------------------------"
    );
    append_line(&mut report, "SET:", count, set_dur);
    append_line(&mut report, "UPDATE:", count, update_dur);
    append_line(&mut report, "GET:", count, get_dur);
    append_line(&mut report, "DEL:", count, del_dur);
    let _ = write!(
        report,
        "\n-------------------------------------------\nMAX RAM USAGE: {}\nTotal Stress Test Time: {}",
        format_memory_size(peak_bytes),
        format_duration(total)
    );
    report
}

fn append_line(report: &mut String, label: &str, count: usize, duration: f64) {
    // Guard against a sub-resolution timer reading zero.
    let rate = count as f64 / duration.max(1e-9);
    let _ = write!(
        report,
        "\n{label:<8}{rate:>12.2} ops/sec ({} total)",
        format_duration(duration)
    );
}

/// Human-readable duration: µs below a millisecond, up through hours
pub fn format_duration(seconds: f64) -> String {
    if seconds < 0.001 {
        format!("{:.2}\u{b5}s", seconds * 1_000_000.0)
    } else if seconds < 1.0 {
        format!("{:.2}ms", seconds * 1000.0)
    } else if seconds < 60.0 {
        format!("{seconds:.3}s")
    } else if seconds < 3600.0 {
        format!("{}m {:.2}s", (seconds as u64) / 60, seconds % 60.0)
    } else {
        format!(
            "{}h {}m {:.2}s",
            (seconds as u64) / 3600,
            ((seconds as u64) % 3600) / 60,
            seconds % 60.0
        )
    }
}

/// Human-readable byte count with two decimals
pub fn format_memory_size(bytes: u64) -> String {
    const SUFFIXES: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut value = bytes as f64;
    let mut i = 0;
    while value >= 1024.0 && i < SUFFIXES.len() - 1 {
        value /= 1024.0;
        i += 1;
    }
    format!("{value:.2} {}", SUFFIXES[i])
}
