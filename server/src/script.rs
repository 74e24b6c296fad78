use log::info;

/// Sink for chat and script-command text. The real interpreter lives
/// outside this crate and is not reentrant; the server guards its sink
/// with a single lock and never calls it from more than one place at once.
pub trait CommandSink: Send {
    fn execute(&mut self, origin: &str, command: &str);
}

/// Default sink that just writes commands to the log.
pub struct LogSink;

impl CommandSink for LogSink {
    fn execute(&mut self, origin: &str, command: &str) {
        info!("[{origin}] {command}");
    }
}
