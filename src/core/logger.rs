use env_logger::Env;

/// Initialise `env_logger`. `RUST_LOG` wins over the default `info` level.
/// Panics if a logger is already installed.
pub fn setup_logging() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_logging_installs_logger() {
        setup_logging();
        assert!(log::max_level() >= log::LevelFilter::Error);
        assert!(log::logger().enabled(&log::Metadata::builder().level(log::Level::Error).build()));
    }
}
