//! WCAG 2.1 audit engine.
//!
//! Fetches a page, builds a [`PageContext`](context::PageContext) from its
//! HTML and runs the registered criterion checks against the static page, the
//! rendered page and the AI reviewer, depending on the requested mode.

pub mod auditor;
pub mod color;
pub mod context;
pub mod css;
pub mod criteria;
pub mod error;
pub mod fetcher;
pub mod outcome;
pub mod scoring;
pub mod title;
pub mod wcag;

pub use auditor::{AuditRun, Auditor, Recommendations};
pub use error::EngineError;
pub use fetcher::{
    FetchError, FetchedPage, HtmlFetcher, HttpRenderer, RenderedLoader, ReqwestFetcher,
    DEFAULT_USER_AGENT,
};
pub use outcome::CriterionOutcome;
