//! Audit scores.
//!
//! Two numbers come out of a run. The stored audit score is the mean of the
//! 0..2 criterion scores over evaluated criteria, penalized by coverage. The
//! breakdown score is a pass/no-pass share over levels A and AA, also
//! penalized by coverage, and is kept in the audit's results payload.

use serde_json::{json, Map, Value};

use crate::contract::{Level, Verdict};

use super::criteria::round4;
use super::outcome::CriterionOutcome;
use super::wcag;

/// Mean of the 0..2 scores of evaluated criteria times `evaluated / total`.
///
/// `None` when every result is not applicable.
pub fn audit_score<I>(verdicts: I) -> Option<f64>
where
    I: IntoIterator<Item = Verdict>,
{
    let mut total = 0usize;
    let mut evaluated = 0usize;
    let mut sum = 0.0;
    for verdict in verdicts {
        total += 1;
        if let Some(score) = verdict.score() {
            evaluated += 1;
            sum += f64::from(score);
        }
    }
    if evaluated == 0 {
        return None;
    }
    let base = sum / evaluated as f64;
    let coverage = evaluated as f64 / total as f64;
    Some(round4(base * coverage))
}

/// Breakdown score and per-level counters.
///
/// AAA criteria are left out. A criterion counts 1 when it passes and 0
/// otherwise; not-applicable ones only count towards coverage.
pub fn score_breakdown(outcomes: &[CriterionOutcome]) -> (Option<f64>, Value) {
    let mut per_level: Map<String, Value> = Map::new();
    let mut totals = [(0u64, 0u64); 3];
    let mut considered = 0u64;
    let mut evaluated = 0u64;
    let mut passed = 0u64;

    for outcome in outcomes {
        let level = wcag::meta(outcome.code).map_or(Level::A, |m| m.level);
        if level == Level::AAA {
            continue;
        }
        let slot = &mut totals[level as usize];
        considered += 1;
        slot.0 += 1;
        if outcome.verdict == Verdict::Na {
            continue;
        }
        evaluated += 1;
        if outcome.passed() {
            passed += 1;
            slot.1 += 1;
        }
    }

    for level in Level::ALL {
        let (total, passed) = totals[level as usize];
        per_level.insert(
            level.as_str().to_string(),
            json!({ "total": total, "passed": passed }),
        );
    }

    if evaluated == 0 {
        return (None, Value::Object(per_level));
    }

    let base = passed as f64 / evaluated as f64;
    let coverage = evaluated as f64 / considered as f64;
    per_level.insert("_coverage".into(), json!(round4(coverage)));
    per_level.insert("_base_score".into(), json!(round4(base)));
    (Some(round4(base * coverage)), Value::Object(per_level))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::Source;

    fn outcome(code: &'static str, verdict: Verdict) -> CriterionOutcome {
        CriterionOutcome {
            code,
            source: Source::Raw,
            verdict,
            score_hint: None,
            details: Map::new(),
        }
    }

    #[test]
    fn audit_score_penalizes_coverage() {
        // mean (2 + 1 + 0) / 3 = 1.0, coverage 3/4
        let score = audit_score([Verdict::Pass, Verdict::Partial, Verdict::Fail, Verdict::Na]);
        assert_eq!(score, Some(0.75));
        assert_eq!(audit_score([Verdict::Pass, Verdict::Pass]), Some(2.0));
    }

    #[test]
    fn audit_score_is_none_when_everything_is_na() {
        assert_eq!(audit_score([Verdict::Na, Verdict::Na]), None);
        assert_eq!(audit_score([]), None);
    }

    #[test]
    fn breakdown_skips_aaa_and_tracks_coverage() {
        let outcomes = vec![
            outcome("1.1.1", Verdict::Pass),    // A
            outcome("1.4.3", Verdict::Fail),    // AA
            outcome("2.4.7", Verdict::Na),      // AA
            outcome("1.4.6", Verdict::Pass),    // AAA, ignored
        ];
        let (score, breakdown) = score_breakdown(&outcomes);
        // base 1/2, coverage 2/3
        assert_eq!(score, Some(0.3333));
        assert_eq!(breakdown["A"], json!({"total": 1, "passed": 1}));
        assert_eq!(breakdown["AA"], json!({"total": 2, "passed": 0}));
        assert_eq!(breakdown["AAA"], json!({"total": 0, "passed": 0}));
        assert_eq!(breakdown["_coverage"], json!(0.6667));
        assert_eq!(breakdown["_base_score"], json!(0.5));
    }

    #[test]
    fn breakdown_without_evaluated_criteria() {
        let (score, breakdown) = score_breakdown(&[outcome("2.4.7", Verdict::Na)]);
        assert_eq!(score, None);
        assert!(breakdown.get("_coverage").is_none());
    }
}
