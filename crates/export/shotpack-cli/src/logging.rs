use std::sync::Once;

static INIT: Once = Once::new();

/// Install the global logger once. `RUST_LOG` wins over the default level.
pub fn init_logging(verbose: bool) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();
        if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else if verbose {
            builder.filter_level(log::LevelFilter::Debug);
        } else {
            builder.filter_level(log::LevelFilter::Info);
        }
        builder.format_timestamp(None);
        builder.init();
        log::debug!("logging initialized");
    });
}
