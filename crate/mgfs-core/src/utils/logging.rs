use env_logger::Builder;
use std::io::Write;

/// Modules whose logs are shown at info level by default.
const MGFS_MODULES: [&str; 4] = ["mgfs", "mgfs_core", "mgfs_storage", "mgfs_daemon"];

/// Initialize logging with app-wide defaults.
///
/// Level defaults to WARN, and INFO for the mgfs crates, or DEBUG if
/// `verbose` is set. Can be set with the RUST_LOG env variable.
///
/// Output format can be made systemd-friendly by setting
/// RUST_LOG_FORMAT to SYSTEMD.
pub fn init(verbose: bool) {
    let mut builder = env_logger::Builder::new();

    if let Ok(format) = std::env::var("RUST_LOG_FORMAT")
        && format == "SYSTEMD"
    {
        enable_systemd_log_format(&mut builder);
    }

    builder.filter_level(log::LevelFilter::Warn);
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    for module in MGFS_MODULES {
        builder.filter_module(module, level);
    }

    builder.parse_default_env();
    builder.init();
}

/// Set the format of the log output to a systemd-compatible one.
///
/// Time isn't useful since it's tracked by the logging facility.
fn enable_systemd_log_format(builder: &mut Builder) {
    builder.format(|fmt, record| {
        writeln!(
            fmt,
            "<{}>{}: {}",
            // Map to syslog priority level (RFC 5424)
            match record.level() {
                log::Level::Error => 3,
                log::Level::Warn => 4,
                log::Level::Info => 5,
                log::Level::Debug => 7,
                log::Level::Trace => 7,
            },
            record.target(),
            record.args()
        )
    });
}
