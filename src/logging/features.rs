//! Feature-specific log targets and macros

/// Feature categories for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFeature {
    Generation,
    Gateway,
    HttpServer,
    History,
}

impl LogFeature {
    pub const ALL: [LogFeature; 4] = [
        LogFeature::Generation,
        LogFeature::Gateway,
        LogFeature::HttpServer,
        LogFeature::History,
    ];

    /// Get the target string for this feature
    pub fn target(&self) -> &'static str {
        match self {
            LogFeature::Generation => "synthetix::generation",
            LogFeature::Gateway => "synthetix::gateway",
            LogFeature::HttpServer => "synthetix::http_server",
            LogFeature::History => "synthetix::history",
        }
    }

    /// Key used in the `[features]` table of the logging config
    pub fn name(&self) -> &'static str {
        match self {
            LogFeature::Generation => "generation",
            LogFeature::Gateway => "gateway",
            LogFeature::HttpServer => "http_server",
            LogFeature::History => "history",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }
}

#[macro_export]
macro_rules! log_http_info {
    ($($arg:tt)*) => {
        log::info!(target: "synthetix::http_server", $($arg)*)
    };
}

#[macro_export]
macro_rules! log_http_warn {
    ($($arg:tt)*) => {
        log::warn!(target: "synthetix::http_server", $($arg)*)
    };
}

#[macro_export]
macro_rules! log_http_error {
    ($($arg:tt)*) => {
        log::error!(target: "synthetix::http_server", $($arg)*)
    };
}

#[macro_export]
macro_rules! log_history_debug {
    ($($arg:tt)*) => {
        log::debug!(target: "synthetix::history", $($arg)*)
    };
}

#[macro_export]
macro_rules! log_history_warn {
    ($($arg:tt)*) => {
        log::warn!(target: "synthetix::history", $($arg)*)
    };
}

/// Logs the elapsed time of an operation under a feature target.
pub struct PerformanceTimer {
    start: std::time::Instant,
    feature: LogFeature,
    operation: String,
}

impl PerformanceTimer {
    pub fn new(feature: LogFeature, operation: impl Into<String>) -> Self {
        let operation = operation.into();
        log::debug!(target: feature.target(), "Starting timed operation: {}", operation);
        Self {
            start: std::time::Instant::now(),
            feature,
            operation,
        }
    }

    pub fn finish(self) {
        log::info!(
            target: self.feature.target(),
            "Operation '{}' completed in {:?}",
            self.operation,
            self.start.elapsed()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_names_round_trip() {
        for feature in LogFeature::ALL {
            assert_eq!(LogFeature::from_name(feature.name()), Some(feature));
            assert!(feature.target().starts_with("synthetix::"));
        }
        assert_eq!(LogFeature::from_name("network"), None);
    }
}
