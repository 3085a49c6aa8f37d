//! Progress-callback trait for batch, file and picture events.
//!
//! Inject an [`Arc<dyn EnrichProgressCallback>`] via
//! [`crate::config::EnrichConfigBuilder::progress_callback`] to receive
//! events as the orchestrator works through a batch. This is the run-scoped
//! observability handle: the library itself only emits `tracing` events and
//! never installs a global subscriber.
//!
//! # Example
//!
//! ```rust
//! use edgequake_docenrich::{EnrichConfig, EnrichProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct SkipCounter {
//!     skipped: AtomicUsize,
//! }
//!
//! impl EnrichProgressCallback for SkipCounter {
//!     fn on_file_skipped(&self, _position: usize, _total: usize, file_name: &str) {
//!         self.skipped.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{file_name}: outputs exist, skipped");
//!     }
//! }
//!
//! let counter = Arc::new(SkipCounter { skipped: AtomicUsize::new(0) });
//!
//! let config = EnrichConfig::builder()
//!     .progress_callback(counter as Arc<dyn EnrichProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the orchestrator and post-processor as work progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. `position` is 1-based within the batch.
pub trait EnrichProgressCallback: Send + Sync {
    /// Called once before the first file.
    fn on_batch_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called when a file passes the skip-check and conversion begins.
    fn on_file_start(&self, position: usize, total: usize, file_name: &str) {
        let _ = (position, total, file_name);
    }

    /// Called when all requested artifacts of a file already exist.
    fn on_file_skipped(&self, position: usize, total: usize, file_name: &str) {
        let _ = (position, total, file_name);
    }

    /// Called after a picture has been processed.
    ///
    /// # Arguments
    /// * `index`     — 1-based picture index
    /// * `total`     — pictures in the document
    /// * `described` — whether a description was obtained
    fn on_image_complete(&self, file_name: &str, index: usize, total: usize, described: bool) {
        let _ = (file_name, index, total, described);
    }

    /// Called when a file's artifacts have been written.
    fn on_file_complete(
        &self,
        position: usize,
        total: usize,
        file_name: &str,
        images_described: usize,
        images_total: usize,
    ) {
        let _ = (position, total, file_name, images_described, images_total);
    }

    /// Called when a file fails.
    fn on_file_error(&self, position: usize, total: usize, file_name: &str, error: &str) {
        let _ = (position, total, file_name, error);
    }

    /// Called once after the last file.
    fn on_batch_complete(&self, converted: usize, skipped: usize, failed: usize) {
        let _ = (converted, skipped, failed);
    }
}

/// A no-op implementation; the default when no callback is configured.
pub struct NoopProgressCallback;

impl EnrichProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::EnrichConfig`].
pub type ProgressCallback = Arc<dyn EnrichProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Tracking {
        files: AtomicUsize,
        images: AtomicUsize,
        described: AtomicUsize,
        errors: AtomicUsize,
    }

    impl EnrichProgressCallback for Tracking {
        fn on_file_start(&self, _position: usize, _total: usize, _file_name: &str) {
            self.files.fetch_add(1, Ordering::SeqCst);
        }

        fn on_image_complete(&self, _file: &str, _index: usize, _total: usize, described: bool) {
            self.images.fetch_add(1, Ordering::SeqCst);
            if described {
                self.described.fetch_add(1, Ordering::SeqCst);
            }
        }

        fn on_file_error(&self, _position: usize, _total: usize, _file: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(2);
        cb.on_file_start(1, 2, "a.pdf");
        cb.on_image_complete("a.pdf", 1, 1, true);
        cb.on_file_complete(1, 2, "a.pdf", 1, 1);
        cb.on_file_skipped(2, 2, "b.pdf");
        cb.on_file_error(2, 2, "b.pdf", "boom");
        cb.on_batch_complete(1, 1, 0);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let t = Tracking::default();
        t.on_file_start(1, 1, "farm.pdf");
        t.on_image_complete("farm.pdf", 1, 3, true);
        t.on_image_complete("farm.pdf", 2, 3, false);
        t.on_image_complete("farm.pdf", 3, 3, true);
        t.on_file_error(1, 1, "farm.pdf", "disk full");

        assert_eq!(t.files.load(Ordering::SeqCst), 1);
        assert_eq!(t.images.load(Ordering::SeqCst), 3);
        assert_eq!(t.described.load(Ordering::SeqCst), 2);
        assert_eq!(t.errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_batch_start(10);
        cb.on_batch_complete(10, 0, 0);
    }
}
