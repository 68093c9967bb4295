use std::sync::Mutex;

use log::Level;

/// Receiver for leveled messages produced while coefficients are computed.
pub trait DiagnosticSink {
    fn emit(&self, level: Level, message: &str);
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &S {
    fn emit(&self, level: Level, message: &str) {
        (**self).emit(level, message)
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for Box<S> {
    fn emit(&self, level: Level, message: &str) {
        (**self).emit(level, message)
    }
}

/// Forwards every message to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn emit(&self, level: Level, message: &str) {
        log::log!(target: "kinship_core::coancestry", level, "{}", message);
    }
}

/// Keeps every message in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemorySink {
    messages: Mutex<Vec<(Level, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all messages received so far.
    pub fn messages(&self) -> Vec<(Level, String)> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Number of messages at exactly `level`.
    pub fn count(&self, level: Level) -> usize {
        self.messages
            .lock()
            .map(|m| m.iter().filter(|(l, _)| *l == level).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().map(|m| m.is_empty()).unwrap_or(true)
    }
}

impl DiagnosticSink for MemorySink {
    fn emit(&self, level: Level, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push((level, message.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_records_in_order() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());

        sink.emit(Level::Warn, "first");
        (&sink).emit(Level::Error, "second");

        let messages = sink.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], (Level::Warn, "first".to_string()));
        assert_eq!(messages[1].0, Level::Error);
        assert_eq!(sink.count(Level::Warn), 1);
        assert_eq!(sink.count(Level::Info), 0);
    }

    #[test]
    fn test_log_sink_never_fails_without_logger() {
        LogSink.emit(Level::Warn, "no logger installed");
    }
}
