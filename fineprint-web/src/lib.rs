//! Page-to-text extraction pipeline.
//!
//! - URL validation (`validate`)
//! - Fetch collaborator trait and HTTP-backed implementation (`fetch`)
//! - Charset detection and decoding of the fetched bytes (`decode`)
//! - Content extractor trait and Readability-backed implementation (`extract`)
//! - Length floor and truncation (`postprocess`)
//! - The pipeline itself and its result record (`pipeline`, `result`)
//!
//! Every failure is folded into [`ExtractionResult::Failure`]; nothing the
//! collaborators do escapes [`ExtractionPipeline::run`] as an error or panic.

pub mod decode;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod pipeline;
pub mod postprocess;
pub mod result;
pub mod validate;

pub use error::ExtractionError;
pub use extract::{ContentExtractor, ExtractOptions, ReadabilityExtractor};
pub use decode::decode_html;
pub use fetch::{FetchedDocument, Fetcher, HttpFetcher};
pub use pipeline::ExtractionPipeline;
pub use postprocess::{TextLimits, postprocess};
pub use result::{Extracted, ExtractionResult};
pub use validate::{is_valid_url, validate_url};
