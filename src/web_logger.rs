//! Process logger that prints records and keeps the recent ones for `/api/logs`

use log::{LevelFilter, Metadata, Record, SetLoggerError};
use once_cell::sync::OnceCell;
use std::collections::VecDeque;
use std::sync::{Mutex, RwLock};
use tokio::sync::broadcast;

pub const DEFAULT_CAPACITY: usize = 1000;

pub struct WebLogger {
    buffer: Mutex<VecDeque<String>>,
    capacity: usize,
    console: bool,
    sender: broadcast::Sender<String>,
    /// Target prefix to level, most specific first
    target_levels: RwLock<Vec<(String, LevelFilter)>>,
    default_level: RwLock<LevelFilter>,
}

impl WebLogger {
    fn new(capacity: usize, console: bool) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            buffer: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            console,
            sender,
            target_levels: RwLock::new(Vec::new()),
            default_level: RwLock::new(LevelFilter::Info),
        }
    }

    fn level_for(&self, target: &str) -> LevelFilter {
        if let Ok(levels) = self.target_levels.read() {
            if let Some((_, level)) = levels.iter().find(|(prefix, _)| target.starts_with(prefix.as_str())) {
                return *level;
            }
        }
        self.default_level
            .read()
            .map(|level| *level)
            .unwrap_or(LevelFilter::Info)
    }

    fn push(&self, line: String) {
        if let Ok(mut buf) = self.buffer.lock() {
            buf.push_back(line.clone());
            while buf.len() > self.capacity {
                buf.pop_front();
            }
        }
        let _ = self.sender.send(line);
    }
}

static LOGGER: OnceCell<WebLogger> = OnceCell::new();

impl log::Log for WebLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level_for(metadata.target())
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let line = format!(
                "{} {} [{}] {}",
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ"),
                record.level(),
                record.target(),
                record.args()
            );
            if self.console {
                println!("{}", line);
            }
            self.push(line);
        }
    }

    fn flush(&self) {}
}

/// Install the logger with the default buffer size at `Info`.
pub fn init() -> Result<(), SetLoggerError> {
    init_with(DEFAULT_CAPACITY, true)
}

pub fn init_with(capacity: usize, console: bool) -> Result<(), SetLoggerError> {
    let logger = LOGGER.get_or_init(|| WebLogger::new(capacity, console));
    log::set_logger(logger)?;
    log::set_max_level(LevelFilter::Info);
    Ok(())
}

/// Set the fallback level and per-target levels.
///
/// The global `log` max level is raised to the most verbose of them.
pub fn configure_levels(default_level: LevelFilter, targets: Vec<(String, LevelFilter)>) {
    let max = targets
        .iter()
        .map(|(_, level)| *level)
        .fold(default_level, std::cmp::Ord::max);

    if let Some(logger) = LOGGER.get() {
        let mut targets = targets;
        targets.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        if let Ok(mut levels) = logger.target_levels.write() {
            *levels = targets;
        }
        if let Ok(mut level) = logger.default_level.write() {
            *level = default_level;
        }
    }
    log::set_max_level(max);
}

pub fn get_logs() -> Vec<String> {
    LOGGER
        .get()
        .and_then(|l| l.buffer.lock().ok().map(|buf| buf.iter().cloned().collect()))
        .unwrap_or_default()
}

pub fn subscribe() -> Option<broadcast::Receiver<String>> {
    LOGGER.get().map(|l| l.sender.subscribe())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_is_bounded() {
        let logger = WebLogger::new(2, false);
        logger.push("one".into());
        logger.push("two".into());
        logger.push("three".into());
        let buf = logger.buffer.lock().unwrap();
        assert_eq!(buf.iter().cloned().collect::<Vec<_>>(), vec!["two", "three"]);
    }

    #[test]
    fn test_most_specific_target_wins() {
        let logger = WebLogger::new(4, false);
        *logger.target_levels.write().unwrap() = vec![
            ("synthetix::gateway".to_string(), LevelFilter::Debug),
            ("synthetix".to_string(), LevelFilter::Warn),
        ];
        assert_eq!(logger.level_for("synthetix::gateway"), LevelFilter::Debug);
        assert_eq!(logger.level_for("synthetix::history"), LevelFilter::Warn);
        assert_eq!(logger.level_for("actix_web::middleware"), LevelFilter::Info);
    }

    #[test]
    fn test_max_level_is_most_verbose_configured() {
        configure_levels(
            LevelFilter::Warn,
            vec![
                ("synthetix::gateway".to_string(), LevelFilter::Debug),
                ("synthetix::history".to_string(), LevelFilter::Error),
            ],
        );
        assert_eq!(log::max_level(), LevelFilter::Debug);
    }
}
