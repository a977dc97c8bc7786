//! Contract models for the audits module
//!
//! These models are transport-agnostic and used for inter-module communication.
//! Free-form payloads (`results`, `details`) stay as JSON values because their
//! shape depends on the criterion that produced them.

use chrono::{DateTime, Utc};

/// Audit strategy requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckMode {
    /// Static HTML only
    Raw,
    /// Rendered DOM from the rendering service
    Rendered,
    /// Language-model review on every criterion
    Ai,
    /// Orchestrator decides per criterion
    Auto,
}

impl CheckMode {
    /// Lenient parsing: unknown values fall back to `Raw`
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "rendered" | "r" => Self::Rendered,
            "ai" => Self::Ai,
            "auto" | "a" => Self::Auto,
            _ => Self::Raw,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Rendered => "rendered",
            Self::Ai => "ai",
            Self::Auto => "auto",
        }
    }
}

/// Per-criterion evaluation outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Verdict {
    Pass,
    Fail,
    Partial,
    /// Not applicable
    Na,
}

impl Verdict {
    pub const ALL: [Verdict; 4] = [Verdict::Pass, Verdict::Fail, Verdict::Partial, Verdict::Na];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pass" => Some(Self::Pass),
            "fail" => Some(Self::Fail),
            "partial" => Some(Self::Partial),
            "na" => Some(Self::Na),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Partial => "partial",
            Self::Na => "na",
        }
    }

    /// 2 / 1 / 0, `None` for not applicable
    pub fn score(&self) -> Option<i16> {
        match self {
            Self::Pass => Some(2),
            Self::Partial => Some(1),
            Self::Fail => Some(0),
            Self::Na => None,
        }
    }
}

/// WCAG conformance level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Level {
    A,
    AA,
    AAA,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::A, Level::AA, Level::AAA];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "A" => Some(Self::A),
            "AA" => Some(Self::AA),
            "AAA" => Some(Self::AAA),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::AA => "AA",
            Self::AAA => "AAA",
        }
    }
}

/// WCAG principle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Principle {
    Perceivable,
    Operable,
    Understandable,
    Robust,
}

impl Principle {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "perceivable" | "perceptible" => Some(Self::Perceivable),
            "operable" => Some(Self::Operable),
            "understandable" | "comprensible" => Some(Self::Understandable),
            "robust" | "robusto" => Some(Self::Robust),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Perceivable => "Perceivable",
            Self::Operable => "Operable",
            Self::Understandable => "Understandable",
            Self::Robust => "Robust",
        }
    }
}

/// Where a criterion measurement came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Source {
    Raw,
    Rendered,
    Ai,
    /// Legacy rows that merged raw and rendered measurements
    Mixed,
}

impl Source {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "raw" | "" => Some(Self::Raw),
            "rendered" => Some(Self::Rendered),
            "ai" => Some(Self::Ai),
            "mixed" => Some(Self::Mixed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Rendered => "rendered",
            Self::Ai => "ai",
            Self::Mixed => "mixed",
        }
    }
}

/// Effective mode of a finished audit, derived from its result sources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveMode {
    Raw,
    Rendered,
    Ai,
}

impl EffectiveMode {
    /// AI wins over RENDERED, which wins over RAW
    pub fn from_sources<I>(sources: I) -> Self
    where
        I: IntoIterator<Item = Source>,
    {
        let mut mode = Self::Raw;
        for source in sources {
            match source {
                Source::Ai => return Self::Ai,
                Source::Rendered => mode = Self::Rendered,
                Source::Raw | Source::Mixed => {}
            }
        }
        mode
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Raw => "RAW",
            Self::Rendered => "RENDERED",
            Self::Ai => "AI",
        }
    }
}

/// Verdict tally
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerdictCounts {
    pub pass: u64,
    pub fail: u64,
    pub partial: u64,
    pub na: u64,
}

impl VerdictCounts {
    pub fn from_verdicts<I>(verdicts: I) -> Self
    where
        I: IntoIterator<Item = Verdict>,
    {
        let mut counts = Self::default();
        for verdict in verdicts {
            counts.add(verdict);
        }
        counts
    }

    pub fn add(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Pass => self.pass += 1,
            Verdict::Fail => self.fail += 1,
            Verdict::Partial => self.partial += 1,
            Verdict::Na => self.na += 1,
        }
    }

    pub fn get(&self, verdict: Verdict) -> u64 {
        match verdict {
            Verdict::Pass => self.pass,
            Verdict::Fail => self.fail,
            Verdict::Partial => self.partial,
            Verdict::Na => self.na,
        }
    }

    pub fn total(&self) -> u64 {
        self.pass + self.fail + self.partial + self.na
    }

    /// Results that received a real verdict
    pub fn evaluated(&self) -> u64 {
        self.pass + self.fail + self.partial
    }
}

/// One stored criterion result
#[derive(Debug, Clone, PartialEq)]
pub struct CriterionResult {
    /// WCAG code, e.g. "1.4.3"
    pub code: String,
    pub title: String,
    /// `None` for legacy rows without metadata
    pub level: Option<Level>,
    pub principle: Option<Principle>,
    pub verdict: Verdict,
    pub source: Source,
    /// 2 pass, 1 partial, 0 fail, `None` when not applicable
    pub score: Option<i16>,
    pub score_hint: Option<f64>,
    pub details: serde_json::Value,
}

/// Stored audit with its criterion results
#[derive(Debug, Clone, PartialEq)]
pub struct Audit {
    pub id: i64,
    pub url: String,
    pub fetched_at: DateTime<Utc>,
    pub status_code: Option<u16>,
    pub elapsed_ms: Option<i64>,
    pub page_title: Option<String>,
    /// Coverage-penalized mean on the 0..2 scale
    pub score: Option<f64>,
    pub results: serde_json::Value,
    pub raw: bool,
    pub rendered: bool,
    pub ai: bool,
    pub criterion_results: Vec<CriterionResult>,
}

impl Audit {
    pub fn verdict_counts(&self) -> VerdictCounts {
        VerdictCounts::from_verdicts(self.criterion_results.iter().map(|r| r.verdict))
    }

    pub fn mode_effective(&self) -> EffectiveMode {
        EffectiveMode::from_sources(self.criterion_results.iter().map(|r| r.source))
    }

    pub fn codes_from(&self, source: Source) -> usize {
        self.criterion_results
            .iter()
            .filter(|r| r.source == source)
            .count()
    }
}

/// Audit about to be persisted
#[derive(Debug, Clone, PartialEq)]
pub struct NewAudit {
    pub url: String,
    pub fetched_at: DateTime<Utc>,
    pub status_code: Option<u16>,
    pub elapsed_ms: Option<i64>,
    pub page_title: Option<String>,
    pub score: Option<f64>,
    pub results: serde_json::Value,
    pub raw: bool,
    pub rendered: bool,
    pub ai: bool,
    pub criterion_results: Vec<CriterionResult>,
}

/// Row of the audit listing
#[derive(Debug, Clone, PartialEq)]
pub struct AuditSummary {
    pub id: i64,
    pub url: String,
    pub fetched_at: DateTime<Utc>,
    pub page_title: Option<String>,
    pub score: Option<f64>,
    pub status_code: Option<u16>,
    pub elapsed_ms: Option<i64>,
    pub rendered: bool,
    pub mode_effective: EffectiveMode,
    pub verdict_counts: VerdictCounts,
    pub rendered_codes_count: usize,
    pub ai_codes_count: usize,
}

impl From<&Audit> for AuditSummary {
    fn from(audit: &Audit) -> Self {
        Self {
            id: audit.id,
            url: audit.url.clone(),
            fetched_at: audit.fetched_at,
            page_title: audit.page_title.clone(),
            score: audit.score,
            status_code: audit.status_code,
            elapsed_ms: audit.elapsed_ms,
            rendered: audit.rendered,
            mode_effective: audit.mode_effective(),
            verdict_counts: audit.verdict_counts(),
            rendered_codes_count: audit.codes_from(Source::Rendered),
            ai_codes_count: audit.codes_from(Source::Ai),
        }
    }
}

/// Criterion catalogue entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriterionInfo {
    pub code: &'static str,
    pub title: &'static str,
    pub level: Level,
    pub principle: Principle,
    /// Whether a check is registered for this code
    pub implemented: bool,
}

/// Audit submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRequest {
    pub url: String,
    pub mode: CheckMode,
    /// Extra AI pass on criteria where it helps, in any mode
    pub use_ai: bool,
    /// Restrict the run to these codes; `None` runs every registered check
    pub selected_codes: Option<Vec<String>>,
}

impl AuditRequest {
    pub fn new(url: impl Into<String>, mode: CheckMode) -> Self {
        Self {
            url: url.into(),
            mode,
            use_ai: false,
            selected_codes: None,
        }
    }

    pub fn with_ai(mut self, use_ai: bool) -> Self {
        self.use_ai = use_ai;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_mode_parsing_is_lenient() {
        assert_eq!(CheckMode::parse("RENDERED"), CheckMode::Rendered);
        assert_eq!(CheckMode::parse(" r "), CheckMode::Rendered);
        assert_eq!(CheckMode::parse("ai"), CheckMode::Ai);
        assert_eq!(CheckMode::parse("a"), CheckMode::Auto);
        assert_eq!(CheckMode::parse("whatever"), CheckMode::Raw);
        assert_eq!(CheckMode::parse(""), CheckMode::Raw);
    }

    #[test]
    fn effective_mode_prefers_ai_then_rendered() {
        let sources = [Source::Raw, Source::Rendered, Source::Raw];
        assert_eq!(EffectiveMode::from_sources(sources), EffectiveMode::Rendered);
        let sources = [Source::Rendered, Source::Ai];
        assert_eq!(EffectiveMode::from_sources(sources), EffectiveMode::Ai);
        assert_eq!(EffectiveMode::from_sources([]), EffectiveMode::Raw);
    }

    #[test]
    fn verdict_scores() {
        assert_eq!(Verdict::Pass.score(), Some(2));
        assert_eq!(Verdict::Partial.score(), Some(1));
        assert_eq!(Verdict::Fail.score(), Some(0));
        assert_eq!(Verdict::Na.score(), None);
    }

    #[test]
    fn principle_accepts_spanish_labels() {
        assert_eq!(Principle::parse("Perceptible"), Some(Principle::Perceivable));
        assert_eq!(Principle::parse("Comprensible"), Some(Principle::Understandable));
        assert_eq!(Principle::parse("Robusto"), Some(Principle::Robust));
        assert_eq!(Principle::parse(""), None);
    }
}
