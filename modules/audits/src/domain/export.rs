//! CSV export of stored audits.

use serde_json::Value;

use crate::contract::Audit;

/// Byte order mark so spreadsheet tools detect UTF-8
pub const UTF8_BOM: &str = "\u{feff}";

fn detail_cell(details: &Value, key: &str) -> String {
    match details.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Two sections: one summary row per audit, then one row per criterion result
pub fn audits_csv(audits: &[Audit]) -> anyhow::Result<Vec<u8>> {
    let mut out = UTF8_BOM.as_bytes().to_vec();
    {
        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(&mut out);

        writer.write_record(["=== AUDIT SUMMARY ==="])?;
        writer.write_record([
            "ID", "URL", "Title", "Score (%)", "HTTP Status", "Date", "Time (ms)", "Mode",
            "Total Criteria", "Pass", "Fail", "Partial", "N/A",
        ])?;
        for audit in audits {
            let counts = audit.verdict_counts();
            let score_pct = audit.score.map(|s| (s / 2.0 * 1000.0).round() / 10.0);
            writer.write_record([
                audit.id.to_string(),
                audit.url.clone(),
                audit.page_title.clone().unwrap_or_default(),
                opt(score_pct),
                opt(audit.status_code),
                audit.fetched_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                opt(audit.elapsed_ms),
                audit.mode_effective().as_str().to_string(),
                counts.total().to_string(),
                counts.pass.to_string(),
                counts.fail.to_string(),
                counts.partial.to_string(),
                counts.na.to_string(),
            ])?;
        }

        writer.write_record([""])?;
        writer.write_record(["=== WCAG CRITERIA DETAILS ==="])?;
        writer.write_record([
            "Audit ID", "URL", "Criterion", "Title", "Level", "Principle", "Verdict", "Source",
            "Score", "Offenders", "Note",
        ])?;
        for audit in audits {
            for result in &audit.criterion_results {
                writer.write_record([
                    audit.id.to_string(),
                    audit.url.clone(),
                    result.code.clone(),
                    result.title.clone(),
                    opt(result.level.map(|l| l.as_str())),
                    opt(result.principle.map(|p| p.as_str())),
                    result.verdict.as_str().to_string(),
                    result.source.as_str().to_string(),
                    opt(result.score),
                    detail_cell(&result.details, "offenders"),
                    detail_cell(&result.details, "note"),
                ])?;
            }
        }
        writer.flush()?;
    }
    Ok(out)
}
