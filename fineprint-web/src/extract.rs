use anyhow::{Result, anyhow};
use dom_query::Document;
use dom_smoothie::Readability;
use fineprint_config::ExtractionConfig;
use url::Url;

use crate::decode::decode_html;
use crate::fetch::FetchedDocument;

/// Switches forwarded to the content extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Keep user comment sections.
    pub include_comments: bool,
    /// Keep tabular content.
    pub include_tables: bool,
    /// Return Readability's cleaned article HTML (markup included) instead
    /// of plain text. Lengths are then counted over that HTML.
    pub include_formatting: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            include_comments: false,
            include_tables: true,
            include_formatting: false,
        }
    }
}

impl From<&ExtractionConfig> for ExtractOptions {
    fn from(cfg: &ExtractionConfig) -> Self {
        Self {
            include_comments: cfg.include_comments,
            include_tables: cfg.include_tables,
            include_formatting: cfg.include_formatting,
        }
    }
}

/// Turns a downloaded document into readable text.
///
/// Implementations are CPU bound and run on the blocking pool. `Ok(None)`
/// means nothing readable was found.
pub trait ContentExtractor: Send + Sync {
    fn extract(
        &self,
        document: &FetchedDocument,
        url: &Url,
        opts: &ExtractOptions,
    ) -> Result<Option<String>>;
}

/// Elements that wrap a comment thread. Content containers (`article`,
/// `main`, `p`) are never pruned, whatever their id or class.
const COMMENT_CONTAINERS: &[&str] = &["div", "section", "aside", "ol", "ul"];

/// Ids and classes blog and CMS themes put on their comment threads.
const COMMENT_MARKERS: &[&str] = &[
    "#comments",
    "#disqus_thread",
    "#respond",
    ".comments",
    ".commentlist",
    ".comment-list",
    ".comments-area",
    ".comment-page",
    ".post-comments",
    ".article-comments",
];

fn comment_selector() -> String {
    COMMENT_CONTAINERS
        .iter()
        .flat_map(|tag| COMMENT_MARKERS.iter().map(move |m| format!("{tag}{m}")))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Readability-style extractor backed by `dom_smoothie`.
#[derive(Debug, Clone, Default)]
pub struct ReadabilityExtractor;

impl ReadabilityExtractor {
    /// Drop the parts of the page that `opts` excludes before Readability
    /// scores it.
    fn prune(&self, html: &str, opts: &ExtractOptions) -> String {
        let doc = Document::from(html);
        if !opts.include_comments {
            doc.select(&comment_selector()).remove();
        }
        if !opts.include_tables {
            doc.select("table").remove();
        }
        doc.html().to_string()
    }
}

impl ContentExtractor for ReadabilityExtractor {
    fn extract(
        &self,
        document: &FetchedDocument,
        url: &Url,
        opts: &ExtractOptions,
    ) -> Result<Option<String>> {
        let html = decode_html(&document.body, document.content_type.as_deref());
        let pruned = self.prune(&html, opts);

        let mut readability = Readability::new(pruned, Some(url.as_str()), None)
            .map_err(|e| anyhow!("could not load document: {e:?}"))?;

        let article = match readability.parse() {
            Ok(article) => article,
            Err(e) => {
                tracing::debug!(error = ?e, "extract.readability.no_article");
                return Ok(None);
            }
        };

        let text = if opts.include_formatting {
            article.content.to_string()
        } else {
            article.text_content.to_string()
        };
        tracing::debug!(
            title = %article.title,
            chars = text.chars().count(),
            "extract.readability.done"
        );

        if text.is_empty() {
            return Ok(None);
        }
        Ok(Some(text))
    }
}
