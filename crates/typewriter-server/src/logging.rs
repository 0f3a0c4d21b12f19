use std::io::Write;

/// Installs the global `env_logger` backend.
///
/// An explicit `filter` (from `--log-level` / `RUST_LOG`) wins over `debug`.
pub fn init_logging(debug: bool, filter: Option<&str>) {
    let default_filter = default_filter(debug, filter);

    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} [{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .try_init();
}

fn default_filter(debug: bool, filter: Option<&str>) -> String {
    match filter.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => value.to_string(),
        None if debug => "debug".to_string(),
        None => "info".to_string(),
    }
}
