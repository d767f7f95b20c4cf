//! User-facing notices from background synchronization.
//!
//! Persistence runs behind the drawing gesture, so failures cannot surface as
//! return values to the user. The adapter pushes them through a [`NoticeSink`]
//! instead; hosts route notices to a toast or status bar, the default sink
//! forwards them to the log.

/// How prominently a notice should be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Receiver for user-facing notices.
pub trait NoticeSink {
    fn notice(&mut self, severity: Severity, message: &str);
}

/// Default sink: notices go to the log at the matching level.
#[derive(Debug, Default)]
pub struct LogNotices;

impl NoticeSink for LogNotices {
    fn notice(&mut self, severity: Severity, message: &str) {
        match severity {
            Severity::Info => log::info!("{message}"),
            Severity::Warning => log::warn!("{message}"),
            Severity::Error => log::error!("{message}"),
        }
    }
}
