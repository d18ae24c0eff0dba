//! Panic hook writing crash reports.

use std::backtrace::Backtrace;
use std::fs;
use std::panic::PanicHookInfo;
use std::path::PathBuf;

use raman_qc::config::paths;

/// Install the panic hook for crash reporting.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let backtrace = Backtrace::force_capture();
        let report = build_crash_report(panic_info, &backtrace);

        eprintln!("rqc crashed: {}", panic_message(panic_info));
        if let Some(path) = write_crash_report(&report) {
            eprintln!("Crash report saved to: {}", path.display());
        }
    }));
}

fn panic_message(panic_info: &PanicHookInfo) -> String {
    if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

fn build_crash_report(panic_info: &PanicHookInfo, backtrace: &Backtrace) -> String {
    let version = env!("CARGO_PKG_VERSION");
    let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
    let message = panic_message(panic_info);

    let location = panic_info
        .location()
        .map(|loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()))
        .unwrap_or_else(|| "unknown location".to_string());

    let os_info = format!("{} {}", std::env::consts::OS, std::env::consts::ARCH);

    format!(
        r#"Raman QC Crash Report
=====================

Version: {version}
Timestamp: {timestamp}
OS: {os_info}

Panic Message:
{message}

Location:
{location}

Backtrace:
{backtrace}
"#
    )
}

fn write_crash_report(report: &str) -> Option<PathBuf> {
    let dir = paths::log_dir().ok()?;

    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("crash_{}.txt", timestamp));

    fs::write(&path, report).ok()?;
    Some(path)
}
