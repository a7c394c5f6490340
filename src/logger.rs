use std::path::PathBuf;

/// Directory the native binary lives in; config and log files sit next to it.
pub fn exe_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|d| d.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(not(target_arch = "wasm32"))]
pub fn init(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339_millis(std::time::SystemTime::now()),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        // reqwest/hyper are chatty at debug
        .level_for("hyper_util", log::LevelFilter::Warn)
        .level_for("reqwest", log::LevelFilter::Warn)
        .chain(std::io::stderr());

    let path = exe_dir().join("log.txt");
    match fern::log_file(&path) {
        Ok(file) => dispatch = dispatch.chain(file),
        Err(e) => eprintln!("Warning: could not open log file {}: {}", path.display(), e),
    }

    if let Err(e) = dispatch.apply() {
        eprintln!("Warning: logger already initialised: {}", e);
    }
}

#[cfg(target_arch = "wasm32")]
pub use console::init;

#[cfg(target_arch = "wasm32")]
mod console {
    use log::{Level, LevelFilter, Log, Metadata, Record};
    use wasm_bindgen::JsValue;

    struct ConsoleLogger;

    static LOGGER: ConsoleLogger = ConsoleLogger;

    impl Log for ConsoleLogger {
        fn enabled(&self, metadata: &Metadata) -> bool {
            metadata.level() <= log::max_level()
        }

        fn log(&self, record: &Record) {
            if !self.enabled(record.metadata()) {
                return;
            }
            let line = JsValue::from_str(&format!("[OT] {}", record.args()));
            match record.level() {
                Level::Error => web_sys::console::error_1(&line),
                Level::Warn => web_sys::console::warn_1(&line),
                Level::Info => web_sys::console::log_1(&line),
                Level::Debug | Level::Trace => web_sys::console::debug_1(&line),
            }
        }

        fn flush(&self) {}
    }

    pub fn init(verbose: bool) {
        // A second content-script injection in the same realm keeps the first logger.
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(if verbose {
                LevelFilter::Debug
            } else {
                LevelFilter::Info
            });
        }
    }
}
