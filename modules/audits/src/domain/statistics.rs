//! Aggregations over stored audits.
//!
//! Every function here is pure: it receives the audits (with their criterion
//! results) and returns serializable summaries. Percentages and averages are
//! rounded to two decimals and averages of empty sets are 0.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::contract::{Audit, CriterionResult, Level, Verdict, VerdictCounts};
use crate::engine::wcag;

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        round2(part as f64 / total as f64 * 100.0)
    }
}

/// Mean rounded to 2 decimals, 0 for an empty input
fn average<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0u64), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        0.0
    } else {
        round2(sum / n as f64)
    }
}

fn all_results(audits: &[Audit]) -> impl Iterator<Item = &CriterionResult> {
    audits.iter().flat_map(|a| a.criterion_results.iter())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalStatistics {
    pub total_audits: u64,
    pub average_score: f64,
    pub total_unique_urls: u64,
    pub audits_with_render: u64,
    pub audits_with_ai: u64,
}

pub fn global(audits: &[Audit]) -> GlobalStatistics {
    let mut urls: Vec<&str> = audits.iter().map(|a| a.url.as_str()).collect();
    urls.sort_unstable();
    urls.dedup();
    GlobalStatistics {
        total_audits: audits.len() as u64,
        average_score: average(audits.iter().filter_map(|a| a.score)),
        total_unique_urls: urls.len() as u64,
        audits_with_render: audits.iter().filter(|a| a.rendered).count() as u64,
        audits_with_ai: audits.iter().filter(|a| a.ai).count() as u64,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CountShare {
    pub count: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerdictDistribution {
    pub total_results: u64,
    /// Only verdicts that occur
    pub distribution: BTreeMap<&'static str, CountShare>,
}

fn distribution_of(counts: &VerdictCounts) -> BTreeMap<&'static str, CountShare> {
    let total = counts.total();
    Verdict::ALL
        .into_iter()
        .filter(|v| counts.get(*v) > 0)
        .map(|v| {
            let count = counts.get(v);
            (
                v.as_str(),
                CountShare {
                    count,
                    percentage: percentage(count, total),
                },
            )
        })
        .collect()
}

pub fn verdicts(audits: &[Audit]) -> VerdictDistribution {
    let counts = VerdictCounts::from_verdicts(all_results(audits).map(|r| r.verdict));
    VerdictDistribution {
        total_results: counts.total(),
        distribution: distribution_of(&counts),
    }
}

/// Counters shared by the per-criterion and per-group aggregates
#[derive(Debug, Default)]
struct Tally {
    counts: VerdictCounts,
    score_sum: f64,
    scored: u64,
}

impl Tally {
    fn add(&mut self, result: &CriterionResult) {
        self.counts.add(result.verdict);
        if let Some(score) = result.score {
            self.score_sum += f64::from(score);
            self.scored += 1;
        }
    }

    fn total(&self) -> u64 {
        self.counts.total()
    }

    fn average_score(&self) -> f64 {
        if self.scored == 0 {
            0.0
        } else {
            round2(self.score_sum / self.scored as f64)
        }
    }

    fn rate(&self, verdict: Verdict) -> f64 {
        percentage(self.counts.get(verdict), self.total())
    }

    fn group_stats(&self) -> GroupStatistics {
        GroupStatistics {
            total_checks: self.total(),
            pass_count: self.counts.pass,
            fail_count: self.counts.fail,
            partial_count: self.counts.partial,
            na_count: self.counts.na,
            average_score: self.average_score(),
            pass_rate: self.rate(Verdict::Pass),
            fail_rate: self.rate(Verdict::Fail),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriterionStatistics {
    pub code: String,
    pub title: String,
    pub level: String,
    pub principle: String,
    pub total_checks: u64,
    pub pass_count: u64,
    pub fail_count: u64,
    pub partial_count: u64,
    pub na_count: u64,
    pub average_score: f64,
    pub fail_rate: f64,
    pub pass_rate: f64,
}

fn level_key(result: &CriterionResult) -> String {
    result
        .level
        .map_or_else(|| "unknown".to_string(), |l| l.as_str().to_string())
}

fn principle_key(result: &CriterionResult) -> String {
    result
        .principle
        .map_or_else(|| "unknown".to_string(), |p| p.as_str().to_string())
}

/// Per-code aggregates, most failed first (ties by code)
pub fn criteria(audits: &[Audit]) -> Vec<CriterionStatistics> {
    let mut by_code: BTreeMap<&str, (&CriterionResult, Tally)> = BTreeMap::new();
    for result in all_results(audits) {
        by_code
            .entry(result.code.as_str())
            .or_insert_with(|| (result, Tally::default()))
            .1
            .add(result);
    }

    let mut stats: Vec<CriterionStatistics> = by_code
        .into_iter()
        .map(|(code, (first, tally))| CriterionStatistics {
            code: code.to_string(),
            title: first.title.clone(),
            level: level_key(first),
            principle: principle_key(first),
            total_checks: tally.total(),
            pass_count: tally.counts.pass,
            fail_count: tally.counts.fail,
            partial_count: tally.counts.partial,
            na_count: tally.counts.na,
            average_score: tally.average_score(),
            fail_rate: tally.rate(Verdict::Fail),
            pass_rate: tally.rate(Verdict::Pass),
        })
        .collect();
    stats.sort_by(|a, b| {
        b.fail_count
            .cmp(&a.fail_count)
            .then_with(|| catalogue_position(&a.code).cmp(&catalogue_position(&b.code)))
            .then_with(|| a.code.cmp(&b.code))
    });
    stats
}

/// Position in the WCAG catalogue; codes outside it sort last
fn catalogue_position(code: &str) -> usize {
    wcag::CRITERIA
        .iter()
        .position(|c| c.code == code)
        .unwrap_or(usize::MAX)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStatistics {
    pub total_checks: u64,
    pub pass_count: u64,
    pub fail_count: u64,
    pub partial_count: u64,
    pub na_count: u64,
    pub average_score: f64,
    pub pass_rate: f64,
    pub fail_rate: f64,
}

fn grouped<'a, I, K>(results: I, key: K) -> BTreeMap<String, GroupStatistics>
where
    I: IntoIterator<Item = &'a CriterionResult>,
    K: Fn(&CriterionResult) -> String,
{
    let mut tallies: BTreeMap<String, Tally> = BTreeMap::new();
    for result in results {
        tallies.entry(key(result)).or_default().add(result);
    }
    tallies
        .iter()
        .map(|(k, tally)| (k.clone(), tally.group_stats()))
        .collect()
}

pub fn levels(audits: &[Audit]) -> BTreeMap<String, GroupStatistics> {
    grouped(all_results(audits), level_key)
}

pub fn principles(audits: &[Audit]) -> BTreeMap<String, GroupStatistics> {
    grouped(all_results(audits), principle_key)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelinePoint {
    pub date: NaiveDate,
    pub audits_count: u64,
    pub average_score: f64,
}

/// Audits per UTC day, oldest first, limited to the first `days` dates
pub fn timeline(audits: &[Audit], days: usize) -> Vec<TimelinePoint> {
    let mut by_date: BTreeMap<NaiveDate, Vec<&Audit>> = BTreeMap::new();
    for audit in audits {
        by_date.entry(audit.fetched_at.date_naive()).or_default().push(audit);
    }
    by_date
        .into_iter()
        .take(days)
        .map(|(date, day)| TimelinePoint {
            date,
            audits_count: day.len() as u64,
            average_score: average(day.iter().filter_map(|a| a.score)),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingEntry {
    pub url: String,
    pub score: f64,
    pub page_title: Option<String>,
    pub audited_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrlRanking {
    pub best_urls: Vec<RankingEntry>,
    pub worst_urls: Vec<RankingEntry>,
}

pub fn ranking(audits: &[Audit], limit: usize) -> UrlRanking {
    let mut scored: Vec<(&Audit, f64)> = audits
        .iter()
        .filter_map(|a| a.score.map(|s| (a, s)))
        .collect();
    scored.sort_by(|a, b| a.1.total_cmp(&b.1));

    let entry = |(audit, score): &(&Audit, f64)| RankingEntry {
        url: audit.url.clone(),
        score: round2(*score),
        page_title: audit.page_title.clone(),
        audited_at: audit.fetched_at,
    };
    UrlRanking {
        best_urls: scored.iter().rev().take(limit).map(entry).collect(),
        worst_urls: scored.iter().take(limit).map(entry).collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceStatistics {
    pub total_checks: u64,
    pub pass_count: u64,
    pub fail_count: u64,
    pub average_score: f64,
    pub pass_rate: f64,
}

pub fn sources(audits: &[Audit]) -> BTreeMap<String, SourceStatistics> {
    let mut tallies: BTreeMap<&'static str, Tally> = BTreeMap::new();
    for result in all_results(audits) {
        tallies.entry(result.source.as_str()).or_default().add(result);
    }
    tallies
        .into_iter()
        .map(|(source, tally)| {
            let stats = SourceStatistics {
                total_checks: tally.total(),
                pass_count: tally.counts.pass,
                fail_count: tally.counts.fail,
                average_score: tally.average_score(),
                pass_rate: tally.rate(Verdict::Pass),
            };
            (source.to_string(), stats)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditDetailStatistics {
    pub audit_id: i64,
    pub url: String,
    pub score: Option<f64>,
    pub fetched_at: DateTime<Utc>,
    pub total_criteria_checked: u64,
    pub verdict_distribution: BTreeMap<&'static str, CountShare>,
    pub level_distribution: BTreeMap<String, u64>,
    pub principle_distribution: BTreeMap<String, u64>,
}

pub fn audit_detail(audit: &Audit) -> AuditDetailStatistics {
    let counts = audit.verdict_counts();
    let mut level_distribution = BTreeMap::new();
    let mut principle_distribution = BTreeMap::new();
    for result in &audit.criterion_results {
        *level_distribution.entry(level_key(result)).or_insert(0) += 1;
        *principle_distribution.entry(principle_key(result)).or_insert(0) += 1;
    }
    AuditDetailStatistics {
        audit_id: audit.id,
        url: audit.url.clone(),
        score: audit.score,
        fetched_at: audit.fetched_at,
        total_criteria_checked: counts.total(),
        verdict_distribution: distribution_of(&counts),
        level_distribution,
        principle_distribution,
    }
}

/// Score breakdown of a single audit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditStatistics {
    /// Score as a percentage of the 0..2 scale
    pub overall_score: Option<f64>,
    pub level_stats: BTreeMap<String, GroupStatistics>,
    pub principle_stats: BTreeMap<String, GroupStatistics>,
}

pub fn audit_statistics(audit: &Audit) -> AuditStatistics {
    AuditStatistics {
        overall_score: audit.score.map(|s| round2(s / 2.0 * 100.0)),
        level_stats: grouped(&audit.criterion_results, level_key),
        principle_stats: grouped(&audit.criterion_results, principle_key),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub global_statistics: GlobalStatistics,
    pub verdict_distribution: VerdictDistribution,
    pub level_statistics: BTreeMap<String, GroupStatistics>,
    pub principle_statistics: BTreeMap<String, GroupStatistics>,
    pub source_comparison: BTreeMap<String, SourceStatistics>,
    pub top_failing_criteria: Vec<CriterionStatistics>,
    pub url_ranking: UrlRanking,
}

pub fn report(audits: &[Audit]) -> Report {
    let mut top_failing_criteria = criteria(audits);
    top_failing_criteria.truncate(10);
    Report {
        global_statistics: global(audits),
        verdict_distribution: verdicts(audits),
        level_statistics: levels(audits),
        principle_statistics: principles(audits),
        source_comparison: sources(audits),
        top_failing_criteria,
        url_ranking: ranking(audits, 10),
    }
}

// ===== Accessibility levels (Hilera et al., 2013) =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessibilityClass {
    Alto,
    Moderado,
    Deficiente,
    MuyDeficiente,
}

impl AccessibilityClass {
    pub const ALL: [AccessibilityClass; 4] = [
        AccessibilityClass::Alto,
        AccessibilityClass::Moderado,
        AccessibilityClass::Deficiente,
        AccessibilityClass::MuyDeficiente,
    ];

    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 70.0 {
            Self::Alto
        } else if percentage >= 50.0 {
            Self::Moderado
        } else if percentage >= 25.0 {
            Self::Deficiente
        } else {
            Self::MuyDeficiente
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alto => "alto",
            Self::Moderado => "moderado",
            Self::Deficiente => "deficiente",
            Self::MuyDeficiente => "muy_deficiente",
        }
    }
}

/// Hilera percentage of one verdict tally
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HileraScore {
    /// `(100 * pass + 50 * partial) / evaluated`
    pub base: f64,
    /// `evaluated / (evaluated + na)`
    pub coverage: f64,
    pub percentage: f64,
    pub class: AccessibilityClass,
}

/// `None` when nothing was evaluated
pub fn hilera(counts: &VerdictCounts) -> Option<HileraScore> {
    let evaluated = counts.evaluated();
    if evaluated == 0 {
        return None;
    }
    let base = (100.0 * counts.pass as f64 + 50.0 * counts.partial as f64) / evaluated as f64;
    let coverage = evaluated as f64 / (evaluated + counts.na) as f64;
    let percentage = base * coverage;
    Some(HileraScore {
        base,
        coverage,
        percentage,
        class: AccessibilityClass::from_percentage(percentage),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessibilityAudit {
    pub audit_id: i64,
    pub url: String,
    pub pass: u64,
    pub partial: u64,
    pub fail: u64,
    pub na: u64,
    pub coverage: f64,
    pub base_percentage: f64,
    pub evaluated: u64,
    pub percentage: f64,
    pub level: AccessibilityClass,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessibilityLevels {
    pub total_audits_evaluated: u64,
    pub average_accessibility_percentage: f64,
    pub distribution: BTreeMap<&'static str, CountShare>,
    pub summary: BTreeMap<&'static str, u64>,
    /// Highest percentage first; absent from the per-WCAG-level view
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<AccessibilityAudit>>,
}

fn classify<'a, I>(tallies: I) -> (AccessibilityLevels, Vec<AccessibilityAudit>)
where
    I: IntoIterator<Item = (&'a Audit, VerdictCounts)>,
{
    let mut details = Vec::new();
    for (audit, counts) in tallies {
        let Some(h) = hilera(&counts) else {
            continue;
        };
        details.push(AccessibilityAudit {
            audit_id: audit.id,
            url: audit.url.clone(),
            pass: counts.pass,
            partial: counts.partial,
            fail: counts.fail,
            na: counts.na,
            coverage: (h.coverage * 10_000.0).round() / 10_000.0,
            base_percentage: round2(h.base),
            evaluated: counts.evaluated(),
            percentage: h.percentage,
            level: h.class,
        });
    }

    let valid = details.len() as u64;
    let summary: BTreeMap<&'static str, u64> = AccessibilityClass::ALL
        .into_iter()
        .map(|class| {
            let n = details.iter().filter(|d| d.level == class).count() as u64;
            (class.as_str(), n)
        })
        .collect();
    let distribution = summary
        .iter()
        .map(|(class, count)| {
            let share = CountShare {
                count: *count,
                percentage: percentage(*count, valid),
            };
            (*class, share)
        })
        .collect();
    let levels = AccessibilityLevels {
        total_audits_evaluated: valid,
        average_accessibility_percentage: average(details.iter().map(|d| d.percentage)),
        distribution,
        summary,
        details: None,
    };

    for d in &mut details {
        d.percentage = round2(d.percentage);
    }
    details.sort_by(|a, b| b.percentage.total_cmp(&a.percentage));
    (levels, details)
}

pub fn accessibility_levels(audits: &[Audit]) -> AccessibilityLevels {
    let (mut levels, details) = classify(audits.iter().map(|a| (a, a.verdict_counts())));
    levels.details = Some(details);
    levels
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessibilityByWcagLevel {
    pub average_across_levels: f64,
    pub by_wcag_level: BTreeMap<&'static str, AccessibilityLevels>,
}

pub fn accessibility_by_wcag_level(audits: &[Audit]) -> AccessibilityByWcagLevel {
    let by_wcag_level: BTreeMap<&'static str, AccessibilityLevels> = Level::ALL
        .into_iter()
        .map(|level| {
            let tallies = audits.iter().map(|a| {
                let counts = VerdictCounts::from_verdicts(
                    a.criterion_results
                        .iter()
                        .filter(|r| r.level == Some(level))
                        .map(|r| r.verdict),
                );
                (a, counts)
            });
            (level.as_str(), classify(tallies).0)
        })
        .collect();

    let average_across_levels = round2(
        by_wcag_level
            .values()
            .map(|l| l.average_accessibility_percentage)
            .sum::<f64>()
            / Level::ALL.len() as f64,
    );
    AccessibilityByWcagLevel {
        average_across_levels,
        by_wcag_level,
    }
}
