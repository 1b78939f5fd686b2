//! Log levels for the toolchain.
//!
//! Five ordered levels. `Silent` suppresses everything; `Illustrative`
//! narrates compilation and execution on stdout for users who want to watch
//! the pipeline work; the higher levels progressively open up the `log`
//! facade (`debug!`/`trace!`) for developers.

use std::fmt;
use std::str::FromStr;

/// Verbosity selector, ordered from quietest to loudest.
///
/// # Example
///
/// ```
/// use quillc_util::LogLevel;
///
/// assert!(LogLevel::Silent < LogLevel::Verbose);
/// assert_eq!("illustrative".parse::<LogLevel>().unwrap(), LogLevel::Illustrative);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    #[default]
    Silent,
    Illustrative,
    Verbose,
    Effusive,
    Debug,
}

impl LogLevel {
    /// True when user-facing narration should be printed.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_util::LogLevel;
    ///
    /// assert!(!LogLevel::Silent.is_illustrative());
    /// assert!(LogLevel::Illustrative.is_illustrative());
    /// assert!(LogLevel::Debug.is_illustrative());
    /// ```
    pub fn is_illustrative(self) -> bool {
        self >= LogLevel::Illustrative
    }

    /// The matching `log` crate filter for developer tracing.
    ///
    /// The two quiet levels keep the facade off or warnings-only; each
    /// louder level opens one more tier of `log` macros.
    ///
    /// # Example
    ///
    /// ```
    /// use quillc_util::LogLevel;
    ///
    /// assert_eq!(LogLevel::Silent.to_level_filter(), log::LevelFilter::Off);
    /// assert_eq!(LogLevel::Verbose.to_level_filter(), log::LevelFilter::Info);
    /// assert_eq!(LogLevel::Debug.to_level_filter(), log::LevelFilter::Trace);
    /// ```
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Silent => log::LevelFilter::Off,
            LogLevel::Illustrative => log::LevelFilter::Warn,
            LogLevel::Verbose => log::LevelFilter::Info,
            LogLevel::Effusive => log::LevelFilter::Debug,
            LogLevel::Debug => log::LevelFilter::Trace,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Silent => "silent",
            LogLevel::Illustrative => "illustrative",
            LogLevel::Verbose => "verbose",
            LogLevel::Effusive => "effusive",
            LogLevel::Debug => "debug",
        };
        f.write_str(name)
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "silent" => Ok(LogLevel::Silent),
            "illustrative" => Ok(LogLevel::Illustrative),
            "verbose" => Ok(LogLevel::Verbose),
            "effusive" => Ok(LogLevel::Effusive),
            "debug" => Ok(LogLevel::Debug),
            other => Err(format!("unknown log level `{other}`")),
        }
    }
}
