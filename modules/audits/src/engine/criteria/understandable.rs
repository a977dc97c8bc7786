//! Principle 3: Understandable

use serde_json::{json, Map, Value};

use crate::contract::Verdict;
use crate::engine::context::PageContext;
use crate::engine::outcome::{ratio_verdict, verdict_from_counts, Evaluation};

use super::{accessible_name, details, fold, judged, note, ratio, Pass, MAX_OFFENDERS};

/// Canonical casing: primary subtag lower, two-letter regions upper
pub(crate) fn canon_lang(tag: &str) -> String {
    tag.trim()
        .split(['-', '_'])
        .filter(|p| !p.is_empty())
        .enumerate()
        .map(|(i, p)| {
            if i > 0 && p.len() == 2 && p.chars().all(|c| c.is_ascii_alphabetic()) {
                p.to_ascii_uppercase()
            } else {
                p.to_ascii_lowercase()
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Loose BCP 47 shape: primary subtag of 2-3 letters, then 2-8 char subtags
pub(crate) fn valid_lang_tag(tag: &str) -> bool {
    let canon = canon_lang(tag);
    let mut parts = canon.split('-');
    let primary_ok = parts
        .next()
        .is_some_and(|p| (2..=3).contains(&p.len()) && p.chars().all(|c| c.is_ascii_alphabetic()));
    primary_ok && parts.all(|p| (2..=8).contains(&p.len()) && p.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// Function words per language, accent-folded
pub(crate) const STOPWORDS: &[(&str, &[&str])] = &[
    ("es", &["de", "la", "que", "el", "en", "y", "a", "los", "se", "del", "las", "por", "un", "para", "con", "no", "una", "su", "al", "lo"]),
    ("en", &["the", "of", "and", "to", "in", "a", "is", "that", "it", "for", "on", "as", "with", "was", "are", "by", "be", "or"]),
    ("pt", &["de", "e", "o", "a", "que", "do", "da", "em", "um", "para", "com", "os", "no", "se", "na", "uma", "dos", "as"]),
    ("fr", &["de", "la", "et", "le", "les", "des", "en", "un", "une", "du", "est", "pour", "que", "dans", "qui", "au", "plus"]),
];

/// Fewer stopword hits than this and no language is guessed
const GUESS_MIN_HITS: usize = 8;

/// Language whose stopwords dominate `text`, with the hit count per language
pub(crate) fn guess_language(text: &str) -> (Option<&'static str>, Vec<(&'static str, usize)>) {
    let folded: String = text.chars().map(fold).collect();
    let mut counts: Vec<(&'static str, usize)> = STOPWORDS.iter().map(|(lang, _)| (*lang, 0)).collect();
    for token in folded.split(|c: char| !c.is_ascii_alphabetic()).filter(|t| !t.is_empty()) {
        for ((_, words), (_, hits)) in STOPWORDS.iter().zip(counts.iter_mut()) {
            if words.contains(&token) {
                *hits += 1;
            }
        }
    }
    // First language wins a tie.
    let best = counts
        .iter()
        .fold(None::<(&'static str, usize)>, |best, &(lang, hits)| match best {
            Some((_, top)) if top >= hits => best,
            _ => Some((lang, hits)),
        });
    let guessed = best.filter(|(_, hits)| *hits >= GUESS_MIN_HITS).map(|(lang, _)| lang);
    (guessed, counts)
}

/// 3.1.1 Language of Page
///
/// The declared language comes from `<html lang>`, then the Content-Language
/// meta, then `og:locale`. A stopword guess over the body text catches a tag
/// that names the wrong language.
pub fn language_of_page(ctx: &PageContext, pass: Pass) -> Evaluation {
    let sources = [
        ("html@lang", ctx.lang.as_str()),
        ("meta@content-language", ctx.meta("content-language").unwrap_or_default()),
        ("og:locale", ctx.meta("og:locale").unwrap_or_default()),
    ];
    let (declared_source, declared) = sources
        .iter()
        .map(|(source, tag)| (*source, canon_lang(tag)))
        .find(|(_, tag)| !tag.is_empty())
        .unwrap_or(("unset", String::new()));
    let has_lang = !declared.is_empty();
    let is_valid = has_lang && valid_lang_tag(&declared);
    let (guessed, counts) = guess_language(&ctx.body_text);
    let primary = declared.split('-').next().unwrap_or_default();
    let mismatch = has_lang && guessed.is_some_and(|g| g != primary);

    let reason = if !has_lang {
        Some("No page language declared.")
    } else if !is_valid {
        Some("Declared language is not a valid BCP 47 tag.")
    } else if mismatch {
        Some("Declared language does not match the text.")
    } else {
        None
    };
    let offenders: Vec<Value> = reason
        .map(|r| json!({ "declared": declared, "guessed": guessed, "reason": r }))
        .into_iter()
        .collect();
    let passed = reason.is_none();
    let guess_counts: Map<String, Value> = counts.iter().map(|(lang, hits)| ((*lang).to_string(), json!(hits))).collect();
    let d = details(json!({
        "applicable": 1,
        "declared": declared,
        "declared_source": declared_source,
        "is_valid_bcp47": is_valid,
        "guessed_lang": guessed,
        "guess_counts": guess_counts,
        "mismatch": mismatch,
        "ok_ratio": if passed { 1.0 } else { 0.0 },
        "offenders": offenders,
        "note": note(pass, "the page must declare its language with a valid tag that matches the text."),
    }));
    judged(d, passed)
}

/// 3.1.2 Language of Parts
pub fn language_of_parts(ctx: &PageContext, pass: Pass) -> Evaluation {
    let mut parts = 0usize;
    let mut invalid = Vec::new();
    for el in ctx.lang_parts() {
        parts += 1;
        let lang = el.attr("lang").unwrap_or_default();
        if !valid_lang_tag(lang) && invalid.len() < MAX_OFFENDERS {
            let mut o = el.describe();
            o["lang"] = json!(lang);
            o["reason"] = json!("Invalid language tag.");
            invalid.push(o);
        }
    }
    // No marked parts gives no signal that any were required.
    let verdict = if parts == 0 {
        Verdict::Na
    } else if invalid.is_empty() {
        Verdict::Pass
    } else {
        Verdict::Partial
    };
    let mut d = details(json!({
        "parts_with_lang": parts,
        "invalid_count": invalid.len(),
        "offenders": invalid,
        "note": note(pass, "passages in another language should carry their own lang attribute."),
    }));
    if parts == 0 {
        d.insert("na".into(), Value::Bool(true));
    }
    Evaluation::new(verdict, d)
}

fn context_change(handler: &str) -> bool {
    let h = handler.to_ascii_lowercase();
    ["submit(", "location", "window.open", "navigate", ".href"]
        .iter()
        .any(|needle| h.contains(needle))
}

fn event_handlers(ctx: &PageContext, pass: Pass, event: &str, label: &str) -> Evaluation {
    if pass == Pass::Raw {
        return Evaluation::na(format!(
            "RAW: {label} is judged on the rendered page where handlers are attached."
        ));
    }
    let mut tested = 0usize;
    let mut offenders = Vec::new();
    for el in ctx.elements.iter() {
        let Some(handler) = el.attr(event) else {
            continue;
        };
        tested += 1;
        if context_change(handler) && offenders.len() < MAX_OFFENDERS {
            let mut o = el.describe();
            o["handler"] = json!(handler.chars().take(120).collect::<String>());
            o["reason"] = json!(format!("{event} handler changes context without user request."));
            offenders.push(o);
        }
    }
    let verdict = if tested == 0 {
        Verdict::Na
    } else if offenders.is_empty() {
        Verdict::Pass
    } else {
        Verdict::Fail
    };
    let mut d = details(json!({
        "tested": tested,
        "offenders": offenders,
        "note": note(pass, &format!("{label}: {event} handlers must not submit forms or navigate.")),
    }));
    if tested == 0 {
        d.insert("na".into(), Value::Bool(true));
    }
    Evaluation::new(verdict, d)
}

/// 3.2.1 On Focus
pub fn on_focus(ctx: &PageContext, pass: Pass) -> Evaluation {
    event_handlers(ctx, pass, "onfocus", "3.2.1 On Focus")
}

/// 3.2.2 On Input
pub fn on_input(ctx: &PageContext, pass: Pass) -> Evaluation {
    event_handlers(ctx, pass, "onchange", "3.2.2 On Input")
}

/// 3.3.2 Labels or Instructions
pub fn labels_or_instructions(ctx: &PageContext, pass: Pass) -> Evaluation {
    let mut applicable = 0usize;
    let mut labeled = 0usize;
    let mut placeholder_only = 0usize;
    let mut offenders = Vec::new();

    for input in ctx.inputs() {
        let kind = input.attr("type").unwrap_or_default().to_ascii_lowercase();
        if matches!(kind.as_str(), "hidden" | "submit" | "reset" | "button" | "image") {
            continue;
        }
        applicable += 1;
        if input.in_label || accessible_name(ctx, input).is_some() {
            labeled += 1;
            continue;
        }
        let reason = if input.attr_nonempty("placeholder").is_some() {
            placeholder_only += 1;
            "Placeholder is the only instruction; it disappears on input."
        } else {
            "Form control without label or instructions."
        };
        if offenders.len() < MAX_OFFENDERS {
            let mut o = input.describe();
            o["type"] = json!(kind);
            o["reason"] = json!(reason);
            offenders.push(o);
        }
    }

    let missing = applicable - labeled;
    let ok_ratio = ratio(labeled, applicable);
    let mut d = details(json!({
        "applicable": applicable,
        "inputs_total": applicable,
        "inputs_labeled": labeled,
        "missing_label": missing,
        "placeholder_only": placeholder_only,
        "ratio": ok_ratio,
        "ok_ratio": ok_ratio,
        "offenders": offenders,
        "note": note(pass, "every form control needs a visible label or instructions; placeholder alone is not enough."),
    }));
    let verdict = if applicable == 0 {
        d.insert("na".into(), Value::Bool(true));
        Verdict::Na
    } else {
        let counted = verdict_from_counts(&d, Some(missing == 0));
        match counted {
            Verdict::Partial => ratio_verdict(ok_ratio, 1.0, 0.3),
            other => other,
        }
    };
    Evaluation::new(verdict, d)
}
