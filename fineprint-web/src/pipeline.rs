use std::any::Any;
use std::sync::Arc;

use anyhow::Result;
use fineprint_config::FineprintConfig;

use crate::error::ExtractionError;
use crate::extract::{ContentExtractor, ExtractOptions, ReadabilityExtractor};
use crate::fetch::{Fetcher, HttpFetcher};
use crate::postprocess::{TextLimits, postprocess};
use crate::result::{Extracted, ExtractionResult};
use crate::validate::validate_url;

/// URL in, [`ExtractionResult`] out.
///
/// Stages run strictly in order (validate, fetch, extract, trim and
/// length-check, truncate) and the first failing stage ends the run. Each
/// collaborator is called at most once per run and nothing is kept between
/// runs.
#[derive(Clone)]
pub struct ExtractionPipeline {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn ContentExtractor>,
    options: ExtractOptions,
    limits: TextLimits,
}

impl ExtractionPipeline {
    pub fn new(fetcher: Arc<dyn Fetcher>, extractor: Arc<dyn ContentExtractor>) -> Self {
        Self {
            fetcher,
            extractor,
            options: ExtractOptions::default(),
            limits: TextLimits::default(),
        }
    }

    /// HTTP fetcher + Readability extractor wired from configuration.
    pub fn from_config(cfg: &FineprintConfig) -> Result<Self> {
        let fetcher = HttpFetcher::from_config(&cfg.fetch)?;
        Ok(Self::new(Arc::new(fetcher), Arc::new(ReadabilityExtractor))
            .with_options(ExtractOptions::from(&cfg.extraction))
            .with_limits(TextLimits::from(&cfg.limits)))
    }

    pub fn with_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_limits(mut self, limits: TextLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Run every stage for `url`. Never fails and never panics: collaborator
    /// errors become [`ExtractionError::Unexpected`].
    pub async fn run(&self, url: &str) -> ExtractionResult {
        tracing::info!(url, "extract.start");
        let result = ExtractionResult::from(self.try_run(url).await);
        match &result {
            ExtractionResult::Success(ok) => {
                tracing::info!(url, length = ok.length(), "extract.result.success")
            }
            ExtractionResult::Failure(err) => {
                tracing::warn!(url, error = %err, "extract.result.failure")
            }
        }
        result
    }

    async fn try_run(&self, raw_url: &str) -> Result<Extracted, ExtractionError> {
        let url = validate_url(raw_url).ok_or(ExtractionError::InvalidUrl)?;

        let document = self
            .fetcher
            .fetch(&url)
            .await
            .map_err(|e| ExtractionError::unexpected(format!("{e:#}")))?
            .filter(|d| !d.body.is_empty())
            .ok_or(ExtractionError::FetchFailed)?;
        tracing::debug!(
            bytes = document.body.len(),
            content_type = ?document.content_type,
            "extract.fetch.done"
        );

        let extractor = Arc::clone(&self.extractor);
        let options = self.options.clone();
        let base = url.clone();
        let extracted = tokio::task::spawn_blocking(move || extractor.extract(&document, &base, &options))
            .await
            .map_err(|join_err| {
                if join_err.is_panic() {
                    ExtractionError::Unexpected(panic_message(join_err.into_panic()))
                } else {
                    ExtractionError::unexpected(join_err)
                }
            })?
            .map_err(|e| ExtractionError::unexpected(format!("{e:#}")))?;

        let raw_text = extracted
            .filter(|t| !t.is_empty())
            .ok_or(ExtractionError::ExtractionFailed)?;
        tracing::debug!(chars = raw_text.chars().count(), "extract.extract.done");

        let text = postprocess(&raw_text, &self.limits)?;
        Ok(Extracted::new(text, raw_url))
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "extractor panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchedDocument;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use url::Url;

    const MARKER: &str = "... (content truncated for analysis)";

    enum FetchOutcome {
        Body(&'static str),
        Nothing,
        Fail(&'static str),
    }

    struct StubFetcher {
        outcome: FetchOutcome,
        calls: AtomicUsize,
        seen: Mutex<Vec<String>>,
    }

    impl StubFetcher {
        fn new(outcome: FetchOutcome) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl Fetcher for StubFetcher {
        async fn fetch(&self, url: &Url) -> Result<Option<FetchedDocument>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(url.to_string());
            match &self.outcome {
                FetchOutcome::Body(b) => Ok(Some(FetchedDocument::new(*b))),
                FetchOutcome::Nothing => Ok(None),
                FetchOutcome::Fail(msg) => Err(anyhow::anyhow!(*msg)),
            }
        }
    }

    enum ExtractOutcome {
        Text(String),
        Nothing,
        Fail(&'static str),
        Panic,
    }

    struct StubExtractor {
        outcome: ExtractOutcome,
        calls: AtomicUsize,
        seen_opts: Mutex<Option<ExtractOptions>>,
    }

    impl StubExtractor {
        fn new(outcome: ExtractOutcome) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                calls: AtomicUsize::new(0),
                seen_opts: Mutex::new(None),
            })
        }
    }

    impl ContentExtractor for StubExtractor {
        fn extract(
            &self,
            _document: &FetchedDocument,
            _url: &Url,
            opts: &ExtractOptions,
        ) -> Result<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen_opts.lock().unwrap() = Some(opts.clone());
            match &self.outcome {
                ExtractOutcome::Text(t) => Ok(Some(t.clone())),
                ExtractOutcome::Nothing => Ok(None),
                ExtractOutcome::Fail(msg) => Err(anyhow::anyhow!(*msg)),
                ExtractOutcome::Panic => panic!("parser exploded"),
            }
        }
    }

    fn pipeline(f: &Arc<StubFetcher>, e: &Arc<StubExtractor>) -> ExtractionPipeline {
        ExtractionPipeline::new(f.clone(), e.clone())
    }

    fn error_of(res: &ExtractionResult) -> String {
        match res {
            ExtractionResult::Failure(err) => err.to_string(),
            ExtractionResult::Success(_) => panic!("expected failure, got {res:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_url_short_circuits() {
        let f = StubFetcher::new(FetchOutcome::Body("<html></html>"));
        let e = StubExtractor::new(ExtractOutcome::Text("x".repeat(500)));
        for bad in [
            "not-a-url",
            "",
            "example.com",
            "http://",
            "mailto:a@b.c",
            "http:example.com",
            "https:/example.com",
        ] {
            let res = pipeline(&f, &e).run(bad).await;
            assert_eq!(
                serde_json::to_value(&res).unwrap(),
                serde_json::json!({ "error": "Invalid URL provided" })
            );
        }
        assert_eq!(f.calls.load(Ordering::SeqCst), 0);
        assert_eq!(e.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_fetch_content_is_fetch_failure() {
        let f = StubFetcher::new(FetchOutcome::Nothing);
        let e = StubExtractor::new(ExtractOutcome::Text("x".repeat(500)));
        let res = pipeline(&f, &e).run("https://example.com/terms").await;
        assert_eq!(error_of(&res), "Could not fetch content from URL");
        assert_eq!(f.calls.load(Ordering::SeqCst), 1);
        assert_eq!(e.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_fetch_body_is_fetch_failure() {
        let f = StubFetcher::new(FetchOutcome::Body(""));
        let e = StubExtractor::new(ExtractOutcome::Text("x".repeat(500)));
        let res = pipeline(&f, &e).run("https://example.com/terms").await;
        assert_eq!(error_of(&res), "Could not fetch content from URL");
    }

    #[tokio::test]
    async fn empty_extraction_is_extraction_failure() {
        let f = StubFetcher::new(FetchOutcome::Body("<html></html>"));
        for outcome in [ExtractOutcome::Text(String::new()), ExtractOutcome::Nothing] {
            let e = StubExtractor::new(outcome);
            let res = pipeline(&f, &e).run("https://example.com/terms").await;
            assert_eq!(error_of(&res), "Could not extract text content from page");
        }
    }

    #[tokio::test]
    async fn short_text_reports_trimmed_length() {
        let f = StubFetcher::new(FetchOutcome::Body("<html></html>"));
        let e = StubExtractor::new(ExtractOutcome::Text(format!("  {}\n", "a".repeat(150))));
        let res = pipeline(&f, &e).run("https://example.com/terms").await;
        assert_eq!(
            error_of(&res),
            "Insufficient content extracted: only 150 characters"
        );
    }

    #[tokio::test]
    async fn whitespace_only_text_is_insufficient_not_missing() {
        let f = StubFetcher::new(FetchOutcome::Body("<html></html>"));
        let e = StubExtractor::new(ExtractOutcome::Text("   \n  ".into()));
        let res = pipeline(&f, &e).run("https://example.com/terms").await;
        assert_eq!(
            error_of(&res),
            "Insufficient content extracted: only 0 characters"
        );
    }

    #[tokio::test]
    async fn long_text_is_truncated_with_marker() {
        let f = StubFetcher::new(FetchOutcome::Body("<html></html>"));
        let e = StubExtractor::new(ExtractOutcome::Text("b".repeat(60_000)));
        let res = pipeline(&f, &e).run("https://example.com/terms").await;

        let ExtractionResult::Success(ok) = res else {
            panic!("expected success, got {res:?}");
        };
        assert!(ok.text().ends_with(MARKER));
        assert_eq!(ok.text().chars().count(), 50_000 + MARKER.chars().count());
        assert_eq!(ok.length(), ok.text().chars().count());
        assert_eq!(&ok.text()[..50_000], "b".repeat(50_000));
    }

    #[tokio::test]
    async fn success_echoes_input_url_and_trims() {
        let f = StubFetcher::new(FetchOutcome::Body("<html></html>"));
        let body = "c".repeat(300);
        let e = StubExtractor::new(ExtractOutcome::Text(format!("\n\n{body}  ")));
        let res = pipeline(&f, &e).run("https://example.com/terms?x=1").await;

        assert_eq!(
            serde_json::to_value(&res).unwrap(),
            serde_json::json!({
                "success": true,
                "text": body,
                "length": 300,
                "url": "https://example.com/terms?x=1"
            })
        );
        assert_eq!(
            f.seen.lock().unwrap().as_slice(),
            ["https://example.com/terms?x=1"]
        );
    }

    #[tokio::test]
    async fn fetch_fault_is_unexpected() {
        let f = StubFetcher::new(FetchOutcome::Fail("connection reset"));
        let e = StubExtractor::new(ExtractOutcome::Text("x".repeat(500)));
        let res = pipeline(&f, &e).run("https://example.com/terms").await;
        assert_eq!(error_of(&res), "Extraction failed: connection reset");
    }

    #[tokio::test]
    async fn extractor_fault_is_unexpected() {
        let f = StubFetcher::new(FetchOutcome::Body("<html></html>"));
        let e = StubExtractor::new(ExtractOutcome::Fail("bad markup"));
        let res = pipeline(&f, &e).run("https://example.com/terms").await;
        assert_eq!(error_of(&res), "Extraction failed: bad markup");
    }

    #[tokio::test]
    async fn extractor_panic_is_contained() {
        let f = StubFetcher::new(FetchOutcome::Body("<html></html>"));
        let e = StubExtractor::new(ExtractOutcome::Panic);
        let res = pipeline(&f, &e).run("https://example.com/terms").await;
        assert_eq!(error_of(&res), "Extraction failed: parser exploded");
    }

    #[tokio::test]
    async fn options_reach_the_extractor() {
        let f = StubFetcher::new(FetchOutcome::Body("<html></html>"));
        let e = StubExtractor::new(ExtractOutcome::Text("d".repeat(250)));
        let _ = pipeline(&f, &e).run("https://example.com/terms").await;
        assert_eq!(
            e.seen_opts.lock().unwrap().clone(),
            Some(ExtractOptions {
                include_comments: false,
                include_tables: true,
                include_formatting: false,
            })
        );
    }

    #[tokio::test]
    async fn custom_limits_apply() {
        let f = StubFetcher::new(FetchOutcome::Body("<html></html>"));
        let e = StubExtractor::new(ExtractOutcome::Text("e".repeat(20)));
        let res = pipeline(&f, &e)
            .with_limits(TextLimits {
                min_chars: 5,
                max_chars: 10,
                truncation_marker: "~".into(),
            })
            .run("https://example.com/terms")
            .await;
        let ExtractionResult::Success(ok) = res else {
            panic!("expected success");
        };
        assert_eq!(ok.text(), "eeeeeeeeee~");
        assert_eq!(ok.length(), 11);
    }

    #[tokio::test]
    async fn repeated_runs_are_identical() {
        let f = StubFetcher::new(FetchOutcome::Body("<html></html>"));
        let e = StubExtractor::new(ExtractOutcome::Text("f".repeat(1_000)));
        let p = pipeline(&f, &e);
        let first = p.run("https://example.com/terms").await;
        let second = p.run("https://example.com/terms").await;
        assert_eq!(first, second);
        assert_eq!(
            first.to_json_pretty().unwrap(),
            second.to_json_pretty().unwrap()
        );
        assert_eq!(f.calls.load(Ordering::SeqCst), 2);
    }
}
