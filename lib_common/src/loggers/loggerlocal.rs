use super::logrecord::Logrecord;
use chrono::Local;
use colored::*;
use glob::glob;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Every level from Silly (0) to Fatal (6).
const ALL_LEVELS: [i64; 7] = [0, 1, 2, 3, 4, 5, 6];

/// Maps a level name (`silly` .. `fatal`) to its numeric value.
///
/// Unknown names fall back to Info.
pub fn level_from_name(name: &str) -> i64 {
    match name.trim().to_lowercase().as_str() {
        "silly" => 0,
        "trace" => 1,
        "debug" => 2,
        "info" => 3,
        "warn" | "warning" => 4,
        "error" => 5,
        "fatal" => 6,
        _ => 3,
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
/// # Logger Local Options
///
/// Configuration options for the `LoggerLocal` instance, controlling where and how
/// log messages are output.
pub struct LoggerLocalOptions {
    /// A list of log levels that should be printed to the TTY (console).
    pub use_tty: Option<Vec<i64>>,
    /// A list of log levels that should be written to a log file.
    pub use_file: Option<Vec<i64>>,
    /// The directory where log files should be stored. Defaults to the working directory.
    pub log_dir: Option<PathBuf>,
}

impl LoggerLocalOptions {
    /// Console output for every level at or above `min_level`, plus file output
    /// at the same levels when a directory is given.
    pub fn from_min_level(min_level: i64, log_dir: Option<PathBuf>) -> Self {
        let levels: Vec<i64> = ALL_LEVELS.iter().copied().filter(|l| *l >= min_level).collect();
        Self {
            use_tty: Some(levels.clone()),
            use_file: log_dir.as_ref().map(|_| levels),
            log_dir,
        }
    }
}

/// # Logger Local
///
/// Async structured logger shared as `Arc<LoggerLocal>` between the ingestion stages.
#[derive(Debug)]
pub struct LoggerLocal {
    /// The name of the application associated with this logger instance.
    app_name: String,
    /// Configuration options determining logging behavior.
    options: LoggerLocalOptions,
    /// The path to the currently active log file, if file logging is enabled.
    current_log_file: Option<PathBuf>,
}

impl LoggerLocal {
    /// Keeps only the newest `{app_name}-*.log` file in `log_dir`.
    ///
    /// File names embed a sortable timestamp, so name order is age order.
    fn rotate_logs(app_name: &str, log_dir: &Path) {
        let pattern = format!("{}/{}-*.log", log_dir.display(), app_name);
        let entries = match glob(&pattern) {
            Ok(entries) => entries,
            Err(e) => {
                eprintln!("Invalid log rotation pattern {}: {}", pattern, e);
                return;
            }
        };

        let mut log_files: Vec<PathBuf> = entries.filter_map(Result::ok).collect();
        log_files.sort_by(|a, b| b.file_name().cmp(&a.file_name()));

        for old_file in log_files.iter().skip(1) {
            if let Err(e) = std::fs::remove_file(old_file) {
                eprintln!("Error deleting old log file {}: {}", old_file.display(), e);
            }
        }
    }

    /// Creates a new `LoggerLocal` instance.
    ///
    /// If file logging is enabled, it ensures the log directory exists,
    /// rotates old logs, and sets up the current log file path.
    ///
    /// # Arguments
    /// * `app_name` - The name of the application using this logger.
    /// * `options` - Optional `LoggerLocalOptions`. If `None`, every level goes to the TTY only.
    pub fn new(app_name: String, options: Option<LoggerLocalOptions>) -> Self {
        let opts = options.unwrap_or(LoggerLocalOptions {
            use_tty: Some(ALL_LEVELS.to_vec()),
            use_file: None,
            log_dir: None,
        });

        let mut logger = Self {
            app_name: app_name.clone(),
            options: opts,
            current_log_file: None,
        };

        if logger.options.use_file.is_some() {
            let log_base_dir = logger
                .options
                .log_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from("."));

            if let Err(e) = std::fs::create_dir_all(&log_base_dir) {
                eprintln!("Error creating log directory {}: {}", log_base_dir.display(), e);
            }

            LoggerLocal::rotate_logs(&app_name, &log_base_dir);

            let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
            let current_log_filename = format!("{}-{}.log", app_name, timestamp);
            logger.current_log_file = Some(log_base_dir.join(current_log_filename));
        }

        logger
    }

    /// A logger that writes nothing. Handy for tests and library callers
    /// that do their own reporting.
    pub fn silent(app_name: &str) -> Self {
        Self::new(
            app_name.to_string(),
            Some(LoggerLocalOptions {
                use_tty: None,
                use_file: None,
                log_dir: None,
            }),
        )
    }

    /// The file currently receiving log lines, if any.
    pub fn current_log_file(&self) -> Option<&Path> {
        self.current_log_file.as_deref()
    }

    /// Logs a message with a specified level, handling TTY output and file
    /// writing based on the logger's configuration.
    ///
    /// # Arguments
    /// * `log_level` - The numeric log level (e.g., 0 for Silly, 6 for Fatal).
    /// * `log_message` - The main message string to be logged.
    /// * `log_extras` - Additional structured data to include in the log.
    pub async fn log(&self, log_level: i64, log_message: &str, log_extras: Option<Value>) {
        let mut record = Logrecord::default();
        record.app.name = self.app_name.clone();
        record.loglevel = log_level;
        record.message.text = log_message.to_string();
        if let Some(extras) = log_extras {
            record.tags = extras;
        }

        if let Some(tty_levels) = &self.options.use_tty {
            if tty_levels.contains(&log_level) {
                let ts = record.rfc9557.as_str().truecolor(128, 128, 128);
                let app_name_colored = format!("[{}]", self.app_name).truecolor(128, 128, 128);
                let colored_message = match log_level {
                    6 => log_message.bright_white().on_bright_red(), // Fatal
                    5 => log_message.bright_red(),                   // Error
                    4 => log_message.bright_yellow(),                // Warn
                    3 => log_message.bright_green(),                 // Info
                    2 => log_message.bright_white(),                 // Debug
                    1 => log_message.bright_cyan(),                  // Trace
                    _ => log_message.blue(),                         // Silly
                };

                println!("{}{}\n{}", ts, app_name_colored, colored_message);
                if record.has_tags() {
                    if let Ok(tags_str) = serde_json::to_string(&record.tags) {
                        println!("{}{}{}", ts, app_name_colored, tags_str.truecolor(128, 128, 128));
                    }
                }
            }
        }

        if let Some(file_levels) = &self.options.use_file {
            if file_levels.contains(&log_level) {
                if let Some(log_file_path) = &self.current_log_file {
                    self.append_to_file(log_file_path, &record);
                }
            }
        }
    }

    fn append_to_file(&self, log_file_path: &Path, record: &Logrecord) {
        let mut line = format!("{} [{}] {}\n", record.rfc9557, self.app_name, record.message.text);
        if record.has_tags() {
            if let Ok(tags_str) = serde_json::to_string(&record.tags) {
                line.push_str(&tags_str);
                line.push('\n');
            }
        }

        let written = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file_path)
            .and_then(|mut file| file.write_all(line.as_bytes()));
        if let Err(e) = written {
            let warning = format!("Error writing log file {}: {}", log_file_path.display(), e);
            eprintln!("{}", warning.red());
        }
    }

    /// Logs a message at the "Silly" (level 0) log level.
    pub async fn silly(&self, log_message: &str, log_extras: Option<Value>) {
        self.log(0, log_message, log_extras).await;
    }

    /// Logs a message at the "Trace" (level 1) log level.
    pub async fn trace(&self, log_message: &str, log_extras: Option<Value>) {
        self.log(1, log_message, log_extras).await;
    }

    /// Logs a message at the "Debug" (level 2) log level.
    pub async fn debug(&self, log_message: &str, log_extras: Option<Value>) {
        self.log(2, log_message, log_extras).await;
    }

    /// Logs a message at the "Info" (level 3) log level.
    pub async fn info(&self, log_message: &str, log_extras: Option<Value>) {
        self.log(3, log_message, log_extras).await;
    }

    /// Logs a message at the "Warn" (level 4) log level.
    pub async fn warn(&self, log_message: &str, log_extras: Option<Value>) {
        self.log(4, log_message, log_extras).await;
    }

    /// Logs a message at the "Error" (level 5) log level.
    pub async fn error(&self, log_message: &str, log_extras: Option<Value>) {
        self.log(5, log_message, log_extras).await;
    }

    /// Logs a message at the "Fatal" (level 6) log level.
    pub async fn fatal(&self, log_message: &str, log_extras: Option<Value>) {
        self.log(6, log_message, log_extras).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names_map_to_numbers() {
        assert_eq!(level_from_name("silly"), 0);
        assert_eq!(level_from_name("DEBUG"), 2);
        assert_eq!(level_from_name(" warn "), 4);
        assert_eq!(level_from_name("fatal"), 6);
        assert_eq!(level_from_name("nonsense"), 3);
    }

    #[test]
    fn min_level_filters_lower_levels() {
        let opts = LoggerLocalOptions::from_min_level(4, None);
        assert_eq!(opts.use_tty, Some(vec![4, 5, 6]));
        assert!(opts.use_file.is_none());
    }

    #[tokio::test]
    async fn file_logging_writes_message_and_tags() {
        let dir = tempfile::tempdir().unwrap();
        let opts = LoggerLocalOptions {
            use_tty: None,
            use_file: Some(vec![3, 4]),
            log_dir: Some(dir.path().to_path_buf()),
        };
        let logger = LoggerLocal::new("etl_test".into(), Some(opts));

        logger.info("scan finished", Some(serde_json::json!({"max_id": 2}))).await;
        logger.debug("filtered out", None).await;

        let path = logger.current_log_file().unwrap().to_path_buf();
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("[etl_test] scan finished"));
        assert!(content.contains("{\"max_id\":2}"));
        assert!(!content.contains("filtered out"));
    }

    #[test]
    fn rotation_keeps_only_the_newest_file() {
        let dir = tempfile::tempdir().unwrap();
        let older = dir.path().join("etl_rot-20200101_000000.log");
        let newer = dir.path().join("etl_rot-20210101_000000.log");
        let other = dir.path().join("someone_else-20190101_000000.log");
        for p in [&older, &newer, &other] {
            std::fs::write(p, "x").unwrap();
        }

        let opts = LoggerLocalOptions::from_min_level(0, Some(dir.path().to_path_buf()));
        let _logger = LoggerLocal::new("etl_rot".into(), Some(opts));

        assert!(!older.exists());
        assert!(newer.exists());
        assert!(other.exists());
    }
}
