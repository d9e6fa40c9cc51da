//! Error-reporting seam for recoverable persistence failures.
//!
//! Save failures never block the reader (the progress just stays
//! unsaved), but they must remain observable. Components forward them to
//! an [`ErrorReporter`] owned by the embedding application.

use log::error;

/// Observability collaborator for failures that are swallowed locally.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, component: &str, message: &str);
}

/// Default reporter that routes everything through the `log` facade.
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, component: &str, message: &str) {
        error!("[{component}] {message}");
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::ErrorReporter;
    use std::sync::Mutex;

    /// Collects reports so tests can assert a failure was surfaced.
    #[derive(Default)]
    pub struct CollectingReporter {
        pub reports: Mutex<Vec<(String, String)>>,
    }

    impl ErrorReporter for CollectingReporter {
        fn report(&self, component: &str, message: &str) {
            self.reports
                .lock()
                .unwrap()
                .push((component.to_string(), message.to_string()));
        }
    }
}
