use clap::ValueEnum;
use owo_colors::OwoColorize;
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    #[value(name = "json-pretty")]
    JsonPretty,
}

/// User-facing output on stdout, separate from the tracing log on stderr.
pub struct Output {
    format: OutputFormat,
    quiet: bool,
}

#[derive(Clone, Copy)]
enum Level {
    Success,
    Info,
    Warning,
    Error,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Level::Success => "success",
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
        }
    }
}

impl Output {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn is_json(&self) -> bool {
        self.format != OutputFormat::Human
    }

    pub fn success(&self, msg: impl AsRef<str>) {
        self.emit(Level::Success, msg.as_ref());
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        self.emit(Level::Info, msg.as_ref());
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        self.emit(Level::Warning, msg.as_ref());
    }

    /// Errors are shown even in quiet mode.
    pub fn error(&self, msg: impl AsRef<str>) {
        self.emit(Level::Error, msg.as_ref());
    }

    /// Print a structured document. Only meaningful for the JSON formats.
    pub fn json(&self, data: &serde_json::Value) {
        if self.quiet {
            return;
        }
        self.print_json(data);
    }

    fn shows(&self, level: Level) -> bool {
        !self.quiet || matches!(level, Level::Error)
    }

    fn emit(&self, level: Level, msg: &str) {
        if !self.shows(level) {
            return;
        }

        match self.format {
            OutputFormat::Human => match level {
                Level::Success => println!("{} {}", "✓".green(), msg),
                Level::Info => println!("{}", msg),
                Level::Warning => println!("{} {}", "⚠".yellow(), msg),
                Level::Error => eprintln!("{} {}", "✗".red(), msg),
            },
            OutputFormat::Json | OutputFormat::JsonPretty => {
                self.print_json(&json!({
                    "type": level.as_str(),
                    "message": msg,
                }));
            }
        }
    }

    fn print_json(&self, data: &serde_json::Value) {
        let rendered = match self.format {
            OutputFormat::JsonPretty => serde_json::to_string_pretty(data),
            OutputFormat::Json | OutputFormat::Human => serde_json::to_string(data),
        };
        println!("{}", rendered.unwrap_or_default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_still_shows_errors() {
        let output = Output::new(OutputFormat::Human, true);
        assert!(output.shows(Level::Error));
        assert!(!output.shows(Level::Info));
        assert!(!output.shows(Level::Success));
        assert!(!output.shows(Level::Warning));

        let output = Output::new(OutputFormat::Json, false);
        assert!(output.is_json());
        assert!(output.shows(Level::Info));
        assert_eq!(Level::Error.as_str(), "error");
    }
}
