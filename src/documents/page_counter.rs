use std::sync::Arc;
use std::time::Duration;

use lopdf::Document;
use tracing::{debug, warn};

/// Failures while counting the pages of an uploaded document
#[derive(Debug, thiserror::Error)]
pub enum PageCountError {
    #[error("document could not be read: {0}")]
    Unreadable(String),

    #[error("page counting timed out after {0:?}")]
    TimedOut(Duration),

    #[error("page counting worker failed: {0}")]
    WorkerFailed(String),
}

/// Synchronous page counter over raw document bytes
pub trait PageCounter: Send + Sync + 'static {
    fn count_pages(&self, data: &[u8]) -> Result<usize, PageCountError>;
}

/// Counts PDF pages with `lopdf`
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfPageCounter;

impl PageCounter for LopdfPageCounter {
    fn count_pages(&self, data: &[u8]) -> Result<usize, PageCountError> {
        let document = Document::load_mem(data)
            .map_err(|err| PageCountError::Unreadable(format!("failed to load PDF: {}", err)))?;

        let pages = document.get_pages().len();
        debug!(pages, bytes_len = data.len(), "PDF pages counted");
        Ok(pages)
    }
}

/// Runs a [`PageCounter`] on the blocking pool with an upper bound on wall time.
#[derive(Clone)]
pub struct BoundedPageCounter {
    counter: Arc<dyn PageCounter>,
    timeout: Duration,
}

impl BoundedPageCounter {
    pub fn new(counter: Arc<dyn PageCounter>, timeout: Duration) -> Self {
        Self { counter, timeout }
    }

    /// Count pages, surfacing every failure to the caller
    pub async fn count(&self, data: Vec<u8>) -> Result<i32, PageCountError> {
        let counter = Arc::clone(&self.counter);
        let task = tokio::task::spawn_blocking(move || counter.count_pages(&data));

        let pages = match tokio::time::timeout(self.timeout, task).await {
            Err(_) => return Err(PageCountError::TimedOut(self.timeout)),
            Ok(Err(join_err)) => return Err(PageCountError::WorkerFailed(join_err.to_string())),
            Ok(Ok(result)) => result?,
        };

        Ok(i32::try_from(pages).unwrap_or(i32::MAX))
    }

    /// Count pages for a submission; any failure is logged and yields 0
    pub async fn count_or_zero(&self, data: Vec<u8>, document_name: &str) -> i32 {
        match self.count(data).await {
            Ok(pages) => pages,
            Err(err) => {
                warn!(
                    "Could not count pages of '{}', recording 0 pages: {}",
                    document_name, err
                );
                0
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::{dictionary, Object};

    /// Build a minimal PDF with the given number of blank pages
    pub(crate) fn blank_pdf(page_count: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let kids: Vec<Object> = (0..page_count)
            .map(|_| {
                doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                })
                .into()
            })
            .collect();

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_count as i64,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut output = Vec::new();
        doc.save_to(&mut output).unwrap();
        output
    }

    struct SlowCounter(Duration);

    impl PageCounter for SlowCounter {
        fn count_pages(&self, _data: &[u8]) -> Result<usize, PageCountError> {
            std::thread::sleep(self.0);
            Ok(1)
        }
    }

    struct PanickingCounter;

    impl PageCounter for PanickingCounter {
        fn count_pages(&self, _data: &[u8]) -> Result<usize, PageCountError> {
            panic!("decoder crashed");
        }
    }

    fn bounded(counter: impl PageCounter) -> BoundedPageCounter {
        BoundedPageCounter::new(Arc::new(counter), Duration::from_secs(5))
    }

    #[test]
    fn test_lopdf_counts_pages() {
        let pdf = blank_pdf(3);
        assert_eq!(LopdfPageCounter.count_pages(&pdf).unwrap(), 3);
    }

    #[test]
    fn test_lopdf_rejects_non_pdf_bytes() {
        let result = LopdfPageCounter.count_pages(b"plain text, not a pdf");
        assert!(matches!(result, Err(PageCountError::Unreadable(_))));
    }

    #[tokio::test]
    async fn test_bounded_counter_returns_page_count() {
        let pages = bounded(LopdfPageCounter).count(blank_pdf(4)).await.unwrap();
        assert_eq!(pages, 4);
    }

    #[tokio::test]
    async fn test_bounded_counter_times_out() {
        let counter = BoundedPageCounter::new(
            Arc::new(SlowCounter(Duration::from_millis(500))),
            Duration::from_millis(20),
        );

        let result = counter.count(vec![1, 2, 3]).await;
        assert!(matches!(result, Err(PageCountError::TimedOut(_))));
    }

    #[tokio::test]
    async fn test_worker_panic_is_reported() {
        let result = bounded(PanickingCounter).count(vec![0]).await;
        assert!(matches!(result, Err(PageCountError::WorkerFailed(_))));
    }

    #[tokio::test]
    async fn test_count_or_zero_absorbs_failures() {
        let pages = bounded(LopdfPageCounter)
            .count_or_zero(b"corrupt".to_vec(), "thesis.pdf")
            .await;
        assert_eq!(pages, 0);

        let pages = bounded(PanickingCounter).count_or_zero(vec![0], "notes.pdf").await;
        assert_eq!(pages, 0);
    }
}
