//! Aligned key/value rendering for decoded records, with a selectable sink.

/// Where rendered output goes.
#[derive(Debug, Clone)]
pub enum LogOutput {
    Log(log::Level),
    LogTarget(log::Level, String),
    StdOut,
    StdErr,
    #[cfg(feature = "log-to-file")]
    File(std::sync::Arc<parking_lot::Mutex<std::fs::File>>),
}

impl From<log::Level> for LogOutput {
    fn from(value: log::Level) -> Self {
        Self::Log(value)
    }
}

impl LogOutput {
    fn print(&self, msg: &str) {
        match self {
            LogOutput::Log(level) => log::log!(*level, "{}", msg),
            LogOutput::LogTarget(level, target) => {
                log::log!(target: target, *level, "{}", msg)
            }
            LogOutput::StdOut => println!("{}", msg),
            LogOutput::StdErr => eprintln!("{}", msg),
            #[cfg(feature = "log-to-file")]
            LogOutput::File(file) => {
                use std::io::Write;

                let mut file = file.lock();
                file.write_all(msg.as_bytes()).ok();
                file.write_all(b"\n").ok();
            }
        }
    }
}

/// One line of rendered output: an indent level, a title, and an optional
/// value the renderer right-aligns against its siblings.
#[derive(Debug)]
pub struct LogItem {
    indent: usize,
    title: String,
    value: Option<String>,
}

impl LogItem {
    pub fn new(indent: usize, title: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            indent,
            title: title.into(),
            value: Some(value.into()),
        }
    }

    pub fn title(indent: usize, title: impl Into<String>) -> Self {
        Self {
            indent,
            title: title.into(),
            value: None,
        }
    }
}

impl<T: ToString, V: ToString> From<(usize, T, V)> for LogItem {
    fn from((indent, title, value): (usize, T, V)) -> Self {
        Self::new(indent, title.to_string(), value.to_string())
    }
}

/// A decoded structure that can render itself as log lines.
pub trait Loggable {
    fn as_log(&self) -> Vec<LogItem>;
}

pub struct Logger;

impl Logger {
    pub fn log<T: Loggable>(output: &LogOutput, value: &T) {
        let items = value.as_log();

        if let Some(first) = items.first() {
            output.print(&first.title);
        }

        let right_align = items
            .iter()
            .skip(1)
            .map(|item| item.title.len())
            .max()
            .unwrap_or(0);

        for item in items.iter().skip(1) {
            let indent = "  ".repeat(item.indent);
            match &item.value {
                Some(value) => {
                    let pad = " ".repeat(right_align - item.title.len());
                    output.print(&format!("{indent}{}: {pad}{value}", item.title));
                }
                None => output.print(&format!("{indent}{}", item.title)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sample;

    impl Loggable for Sample {
        fn as_log(&self) -> Vec<LogItem> {
            vec![
                LogItem::title(0, "Sample"),
                (1, "Key", "value").into(),
                (1, "Longer key", 7).into(),
            ]
        }
    }

    #[test]
    fn items_build_from_tuples() {
        let items = Sample.as_log();
        assert_eq!(items.len(), 3);
        assert_eq!(items[1].title, "Key");
        assert_eq!(items[2].value.as_deref(), Some("7"));

        // Rendering only exercises the sink plumbing here.
        Logger::log(&LogOutput::Log(log::Level::Trace), &Sample);
    }
}
