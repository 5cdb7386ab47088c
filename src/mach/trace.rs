/// Minimal trace recorder. Channels are enabled by a comma-separated
/// pattern (`gc,eval`, or `all`) from the `-t` flag or the `DB48X_TRACES`
/// environment variable, and write to stderr.

#[derive(Debug, Default)]
pub struct Trace {
    pattern: String,
}

impl Trace {
    pub fn from_env() -> Trace {
        Trace {
            pattern: std::env::var("DB48X_TRACES").unwrap_or_default(),
        }
    }

    pub fn set_pattern(&mut self, pattern: &str) {
        self.pattern = pattern.to_string();
    }

    pub fn enabled(&self, channel: &str) -> bool {
        !self.pattern.is_empty()
            && (self.pattern == "all" || self.pattern.split(',').any(|p| p == channel))
    }

    pub fn record(&self, channel: &str, message: &str) {
        if self.enabled(channel) {
            eprintln!("[{}] {}", channel, message);
        }
    }
}
