//! Criterion outcomes and the shared verdict rules.

use serde_json::{Map, Value};

use crate::contract::{CriterionResult, Source, Verdict};

use super::wcag;

/// What a single check produced for one page
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub verdict: Verdict,
    pub score_hint: Option<f64>,
    pub details: Map<String, Value>,
}

impl Evaluation {
    pub fn new(verdict: Verdict, details: Map<String, Value>) -> Self {
        let score_hint = match verdict {
            Verdict::Na => None,
            _ => details.get("ok_ratio").and_then(Value::as_f64),
        };
        Self {
            verdict,
            score_hint,
            details,
        }
    }

    /// Not applicable, with a note explaining why
    pub fn na(note: impl Into<String>) -> Self {
        let mut details = Map::new();
        details.insert("na".into(), Value::Bool(true));
        details.insert("note".into(), Value::String(note.into()));
        Self {
            verdict: Verdict::Na,
            score_hint: None,
            details,
        }
    }
}

/// Evaluation tagged with code and measurement source
#[derive(Debug, Clone, PartialEq)]
pub struct CriterionOutcome {
    pub code: &'static str,
    pub source: Source,
    pub verdict: Verdict,
    pub score_hint: Option<f64>,
    pub details: Map<String, Value>,
}

impl CriterionOutcome {
    pub fn from_evaluation(code: &'static str, source: Source, eval: Evaluation) -> Self {
        Self {
            code,
            source,
            verdict: eval.verdict,
            score_hint: eval.score_hint,
            details: eval.details,
        }
    }

    pub fn score(&self) -> Option<i16> {
        self.verdict.score()
    }

    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Pass
    }

    /// Storage form, labelled from the WCAG catalogue
    pub fn to_result(&self) -> CriterionResult {
        let meta = wcag::meta(self.code);
        CriterionResult {
            code: self.code.to_string(),
            title: meta.map(|m| m.title.to_string()).unwrap_or_default(),
            level: meta.map(|m| m.level),
            principle: meta.map(|m| m.principle),
            verdict: self.verdict,
            source: self.source,
            score: self.score(),
            score_hint: self.score_hint,
            details: Value::Object(self.details.clone()),
        }
    }
}

/// Threshold mapping of a success ratio
pub fn ratio_verdict(ratio: f64, pass_thr: f64, partial_thr: f64) -> Verdict {
    if ratio >= pass_thr {
        Verdict::Pass
    } else if ratio >= partial_thr {
        Verdict::Partial
    } else {
        Verdict::Fail
    }
}

/// Verdict by share of missing items among the required ones.
///
/// `required == 0` is not applicable, nothing missing passes, less than half
/// missing is partial.
pub fn missing_share_verdict(missing: usize, required: usize) -> Verdict {
    if required == 0 {
        Verdict::Na
    } else if missing == 0 {
        Verdict::Pass
    } else if (missing as f64) < required as f64 / 2.0 {
        Verdict::Partial
    } else {
        Verdict::Fail
    }
}

fn number(details: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|k| details.get(*k).and_then(Value::as_f64))
        .find(|v| *v != 0.0)
}

/// Generic verdict from the usual counters of a details map.
///
/// Looks at an explicit `na` flag, then `ratio`/`ok_ratio`, then
/// `tested`/`fails` style counters. `passed` is the check's own opinion when
/// it has one. Without any signal the result is `fail`.
pub fn verdict_from_counts(details: &Map<String, Value>, passed: Option<bool>) -> Verdict {
    if details.get("na").and_then(Value::as_bool) == Some(true) {
        return Verdict::Na;
    }

    let ratio = number(details, &["ratio", "ok_ratio"]);
    let tested = number(details, &["tested", "images_total", "links_total"]);
    let fails = number(details, &["fails", "missing_alt", "invalid_count"]);
    let partial_evidence = matches!(ratio, Some(r) if r > 0.0 && r < 1.0)
        || matches!((tested, fails), (Some(t), Some(f)) if t > 0.0 && f > 0.0 && f < t);

    if let Some(passed) = passed {
        return match (passed, partial_evidence) {
            (_, true) => Verdict::Partial,
            (true, false) => Verdict::Pass,
            (false, false) => Verdict::Fail,
        };
    }

    if let Some(r) = ratio {
        return if r >= 0.999 {
            Verdict::Pass
        } else if r <= 0.001 {
            Verdict::Fail
        } else {
            Verdict::Partial
        };
    }

    match (tested, fails) {
        (Some(t), f) if t > 0.0 => {
            let f = f.unwrap_or(0.0);
            if f <= 0.0 {
                Verdict::Pass
            } else if f >= t {
                Verdict::Fail
            } else {
                Verdict::Partial
            }
        }
        _ => Verdict::Fail,
    }
}

/// Details counters that make a criterion not applicable when all are zero
fn zero_sample_keys(code: &str) -> &'static [&'static str] {
    match code {
        "1.2.1" | "1.4.2" => &["media_total"],
        "1.2.2" => &["requiring_captions", "videos_total"],
        "1.2.3" => &["requiring_ad_or_alt", "videos_total"],
        "1.2.4" => &["live_media_total", "requiring_captions"],
        "1.2.5" => &["videos_total", "requiring_ad"],
        "1.2.6" => &["videos_total", "requiring_sign"],
        "1.2.7" => &["videos_total", "requiring_extended_ad"],
        "1.2.8" => &["videos_total", "requiring_alt"],
        "1.2.9" => &["live_audio_total"],
        "1.3.1" => &[
            "headings_total",
            "lists_total",
            "data_tables",
            "controls_total",
            "main_regions",
        ],
        "1.3.3" => &["texts_examined", "icon_only_interactives"],
        "1.3.4" => &[
            "orientation_lock_scripts",
            "orientation_css_blocks",
            "orientation_overlays",
            "rotation_messages",
        ],
        "1.3.5" => &["applicable", "controls_examined"],
        "1.4.1" => &["links_total", "controls_total", "badges_total", "charts_total"],
        "1.4.3" | "1.4.6" | "1.4.11" | "2.4.7" | "2.5.5" => &["tested"],
        _ => &[],
    }
}

fn is_zero_sample(code: &str, details: &Map<String, Value>) -> bool {
    let mut seen_any = false;
    for key in zero_sample_keys(code) {
        if let Some(value) = details.get(*key) {
            seen_any = true;
            if value.as_f64().unwrap_or(0.0) > 0.0 {
                return false;
            }
        }
    }
    seen_any
}

/// Make `verdict == na` and `details.na == true` agree, and apply the
/// zero-sample rule.
pub fn normalize_na(mut outcome: CriterionOutcome) -> CriterionOutcome {
    let flagged = outcome.details.get("na").and_then(Value::as_bool) == Some(true);
    if flagged || outcome.verdict == Verdict::Na || is_zero_sample(outcome.code, &outcome.details)
    {
        outcome.verdict = Verdict::Na;
        outcome.score_hint = None;
        outcome.details.insert("na".into(), Value::Bool(true));
    }
    outcome
}
