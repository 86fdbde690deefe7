//! Progress-callback trait for per-page cutting events.
//!
//! Inject an [`Arc<dyn CutProgressCallback>`] via
//! [`crate::config::CutConfigBuilder::progress_callback`] to receive events
//! while a document is scanned and its crops are written.
//!
//! Pages are always scanned in order on a single thread (a crop may continue
//! across a page break), so events for one job arrive in page order. The
//! trait is still `Send + Sync` because the job runner moves the config onto
//! a blocking worker thread.
//!
//! # Example
//!
//! ```rust
//! use quizcut::{CutConfig, CutProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct SavedCounter(AtomicUsize);
//!
//! impl CutProgressCallback for SavedCounter {
//!     fn on_crop_saved(&self, _name: &str) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = CutConfig::builder()
//!     .progress_callback(Arc::new(SavedCounter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the cutting pipeline as it works through a document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait CutProgressCallback: Send + Sync {
    /// Called once after anchors are located, before the first page is rendered.
    fn on_job_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called before a page is rendered.
    ///
    /// # Arguments
    /// * `page_num`   : 1-indexed page number
    /// * `total_pages`: total pages in the document
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called after a page has been scanned.
    ///
    /// `crops_so_far` counts every crop in the document so far, including
    /// crops extended (not created) by this page.
    fn on_page_complete(&self, page_num: usize, total_pages: usize, crops_so_far: usize) {
        let _ = (page_num, total_pages, crops_so_far);
    }

    /// Called after each crop image is written.
    fn on_crop_saved(&self, file_name: &str) {
        let _ = file_name;
    }

    /// Called once after every crop has been written.
    fn on_job_complete(&self, total_crops: usize) {
        let _ = total_crops;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl CutProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::CutConfig`].
pub type ProgressCallback = Arc<dyn CutProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl CutProgressCallback for Recorder {
        fn on_job_start(&self, total_pages: usize) {
            self.events.lock().unwrap().push(format!("start {total_pages}"));
        }

        fn on_page_complete(&self, page_num: usize, _total: usize, crops: usize) {
            self.events
                .lock()
                .unwrap()
                .push(format!("page {page_num} {crops}"));
        }

        fn on_crop_saved(&self, file_name: &str) {
            self.events.lock().unwrap().push(file_name.to_string());
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_job_start(2);
        cb.on_page_start(1, 2);
        cb.on_page_complete(1, 2, 5);
        cb.on_crop_saved("exam019.png");
        cb.on_job_complete(5);
    }

    #[test]
    fn recorder_keeps_event_order() {
        let rec = Recorder::default();
        rec.on_job_start(1);
        rec.on_page_start(1, 1);
        rec.on_page_complete(1, 1, 3);
        rec.on_crop_saved("exam019.png");
        let events = rec.events.lock().unwrap().clone();
        assert_eq!(events, vec!["start 1", "page 1 3", "exam019.png"]);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_job_start(10);
        cb.on_job_complete(0);
    }
}
