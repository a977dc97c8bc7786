//! Guideline 3.1: Readable, the AAA checks on vocabulary and reading level

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Value};

use crate::engine::context::{Element, PageContext};
use crate::engine::outcome::Evaluation;

use super::understandable::canon_lang;
use super::{cached_match, cached_regex, details, fold, judged, note, round4, Pass, MAX_OFFENDERS};

/// Candidate terms looked up per page
const MAX_TERMS: usize = 80;

/// Below this many words a readability index says nothing
const READING_MIN_WORDS: usize = 300;

static WORD_TOKEN: OnceLock<Option<Regex>> = OnceLock::new();
static TERM_GLOSSARY_LINK: OnceLock<Option<Regex>> = OnceLock::new();
static TERM_GLOSSARY_SECTION: OnceLock<Option<Regex>> = OnceLock::new();
static PRONUNCIATION_CLASS: OnceLock<Option<Regex>> = OnceLock::new();
static PRONUNCIATION_TITLE: OnceLock<Option<Regex>> = OnceLock::new();

const WORD_TOKEN_PATTERN: &str = r"[A-Za-zÁÉÍÓÚÜÑáéíóúüñ]{2,}";
const PRONUNCIATION_CLASS_PATTERN: &str = r"(?i)\b(ipa|pronounce|pronunciaci[oó]n)\b";

fn word_tokens(text: &str) -> Vec<&str> {
    cached_regex(&WORD_TOKEN, WORD_TOKEN_PATTERN)
        .map(|re| re.find_iter(text).map(|m| m.as_str()).collect())
        .unwrap_or_default()
}

fn trimmed_lower(el: &Element) -> Option<String> {
    let text = el.text.trim();
    (!text.is_empty()).then(|| text.to_lowercase())
}

/// A glossary link by its text, or a section by its id or class
fn has_glossary(
    ctx: &PageContext,
    link: (&'static OnceLock<Option<Regex>>, &str),
    section: (&'static OnceLock<Option<Regex>>, &str),
) -> bool {
    ctx.anchors().any(|a| cached_match(link.0, link.1, &a.text))
        || ctx
            .elements
            .iter()
            .any(|el| cached_match(section.0, section.1, el.id()) || cached_match(section.0, section.1, el.class()))
}

fn is_pronunciation_markup(el: &Element) -> bool {
    matches!(el.tag.as_str(), "ruby" | "rt") || cached_match(&PRONUNCIATION_CLASS, PRONUNCIATION_CLASS_PATTERN, el.class())
}

/// 3.1.3 Unusual Words
///
/// Long words repeated on the page stand in for jargon. Each needs a local
/// definition (`dfn`, titled `abbr`, any titled element, `ruby`) unless the
/// page links to a glossary.
pub fn unusual_words(ctx: &PageContext, pass: Pass) -> Evaluation {
    let base_lang = canon_lang(&ctx.lang);
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for token in word_tokens(&ctx.body_text) {
        if token.chars().count() >= 6 {
            *counts.entry(token.to_lowercase()).or_default() += 1;
        }
    }
    counts.retain(|_, n| *n >= 2);

    let defined: BTreeSet<String> = ctx
        .elements
        .iter()
        .filter(|el| matches!(el.tag.as_str(), "dfn" | "ruby") || el.attr_nonempty("title").is_some())
        .filter_map(trimmed_lower)
        .collect();
    let pronounced: Vec<String> = ctx
        .elements
        .iter()
        .filter(|el| is_pronunciation_markup(el))
        .filter_map(trimmed_lower)
        .collect();
    let glossary = has_glossary(
        ctx,
        (&TERM_GLOSSARY_LINK, r"(?i)\b(glosario|glossary|t[eé]rminos|terminolog[ií]a)\b"),
        (&TERM_GLOSSARY_SECTION, r"(?i)glossary|glosario|terminos"),
    );

    let mut ranked: Vec<(&String, &usize)> = counts.iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    let mut covered = 0usize;
    let mut covered_pronunciations = 0usize;
    let mut missing = 0usize;
    let mut offenders = Vec::new();
    for (term, n) in ranked.into_iter().take(MAX_TERMS) {
        if glossary || defined.contains(term) {
            covered += 1;
        } else {
            missing += 1;
            if offenders.len() < MAX_OFFENDERS {
                offenders.push(json!({
                    "term": term,
                    "count": n,
                    "reason": "Repeated uncommon word without a definition or glossary.",
                }));
            }
        }
        if pronounced.iter().any(|p| p.contains(term.as_str())) {
            covered_pronunciations += 1;
        }
    }

    let candidates = counts.len();
    let applicable = candidates > 0 || glossary;
    let violations = if !applicable || glossary { 0 } else { missing };
    let ok_ratio = if violations == 0 {
        1.0
    } else {
        round4(covered as f64 / candidates.max(1) as f64)
    };
    let d = details(json!({
        "base_lang": base_lang,
        "applicable": u8::from(applicable),
        "candidates_total": candidates,
        "covered_definitions": covered,
        "covered_pronunciations": covered_pronunciations,
        "missing": missing,
        "has_global_glossary": glossary,
        "ok_ratio": ok_ratio,
        "offenders": offenders,
        "note": note(pass, "jargon and idioms need a definition in place or a glossary."),
    }));
    judged(d, candidates == 0 || glossary || missing == 0)
}

static ABBR_TAG_TEXT: OnceLock<Option<Regex>> = OnceLock::new();
static ABBR_INLINE: OnceLock<Option<Regex>> = OnceLock::new();
static ABBR_THEN_EXPANSION: OnceLock<Option<Regex>> = OnceLock::new();
static EXPANSION_THEN_ABBR: OnceLock<Option<Regex>> = OnceLock::new();
static ABBR_GLOSSARY_LINK: OnceLock<Option<Regex>> = OnceLock::new();
static ABBR_GLOSSARY_SECTION: OnceLock<Option<Regex>> = OnceLock::new();

/// Abbreviations expanded in running text: `ONU (Organización...)` or `Organización... (ONU)`
fn inline_expansions(text: &str) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    let clip = |s: &str| s.trim().chars().take(140).collect::<String>();
    if let Some(re) = cached_regex(&ABBR_THEN_EXPANSION, r"\b([A-ZÁÉÍÓÚÜÑ]{2,6})\b\s*\(([^)]+)\)") {
        for cap in re.captures_iter(text) {
            if let (Some(ab), Some(exp)) = (cap.get(1), cap.get(2)) {
                out.insert(ab.as_str().to_string(), clip(exp.as_str()));
            }
        }
    }
    if let Some(re) = cached_regex(
        &EXPANSION_THEN_ABBR,
        r"\b([A-Za-zÁÉÍÓÚÜÑ][^()]{6,80}?)\s*\(\s*([A-ZÁÉÍÓÚÜÑ]{2,6})\s*\)",
    ) {
        for cap in re.captures_iter(text) {
            if let (Some(exp), Some(ab)) = (cap.get(1), cap.get(2)) {
                if exp.as_str().trim().chars().count() >= 6 {
                    out.insert(ab.as_str().to_string(), clip(exp.as_str()));
                }
            }
        }
    }
    out
}

/// 3.1.4 Abbreviations
pub fn abbreviations(ctx: &PageContext, pass: Pass) -> Evaluation {
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut explained: BTreeSet<String> = BTreeSet::new();

    for el in ctx.by_tag(&["abbr"]) {
        let text = el.text.trim();
        if !cached_match(&ABBR_TAG_TEXT, r"^[A-ZÁÉÍÓÚÜÑ][A-Z0-9ÁÉÍÓÚÜÑ\.]{1,5}$", text) {
            continue;
        }
        seen.insert(text.to_string());
        if el.attr_nonempty("title").is_some()
            || el.attr_nonempty("aria-label").is_some()
            || el.attr_nonempty("aria-describedby").is_some()
        {
            explained.insert(text.to_string());
        }
    }
    for ab in inline_expansions(&ctx.body_text).into_keys() {
        seen.insert(ab.clone());
        explained.insert(ab);
    }
    if let Some(re) = cached_regex(&ABBR_INLINE, r"\b([A-ZÁÉÍÓÚÜÑ]{2,6}(?:\.[A-ZÁÉÍÓÚÜÑ]{1,5})?)\b") {
        for cap in re.captures_iter(&ctx.body_text) {
            let Some(ab) = cap.get(1).map(|m| m.as_str().trim_matches('.')) else {
                continue;
            };
            if (2..=6).contains(&ab.chars().count()) {
                seen.insert(ab.to_string());
            }
        }
    }

    let glossary = has_glossary(
        ctx,
        (&ABBR_GLOSSARY_LINK, r"(?i)\b(glosario|glossary|abreviaturas|acr[oó]nimos)\b"),
        (&ABBR_GLOSSARY_SECTION, r"(?i)glossary|glosario|abbrev|acron"),
    );
    let unexplained: Vec<&String> = if glossary {
        Vec::new()
    } else {
        seen.iter().filter(|ab| !explained.contains(*ab)).collect()
    };
    let offenders: Vec<Value> = unexplained
        .iter()
        .take(MAX_OFFENDERS)
        .map(|ab| json!({ "abbr": ab, "reason": "Abbreviation without expansion, title or glossary." }))
        .collect();

    let total = seen.len();
    let missing = unexplained.len();
    let applicable = total > 0 || glossary;
    let ok_ratio = if !applicable || glossary || missing == 0 {
        1.0
    } else {
        round4(explained.len() as f64 / total.max(1) as f64)
    };
    let d = details(json!({
        "applicable": u8::from(applicable),
        "abbreviations_total": total,
        "explained": explained.len(),
        "missing": missing,
        "has_global_glossary": glossary,
        "ok_ratio": ok_ratio,
        "offenders": offenders,
        "note": note(pass, "abbreviations need their expanded form via <abbr title>, inline text or a glossary."),
    }));
    judged(d, total == 0 || glossary || missing == 0)
}

static READING_WORD: OnceLock<Option<Regex>> = OnceLock::new();
static SENTENCE_END: OnceLock<Option<Regex>> = OnceLock::new();
static EASY_VERSION_LINK: OnceLock<Option<Regex>> = OnceLock::new();

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Vowel groups after folding accents; English drops a silent final `e` and counts `y`
fn syllables(word: &str, spanish: bool) -> usize {
    let mut w: String = word.chars().map(fold).filter(|c| c.is_ascii_lowercase()).collect();
    if w.is_empty() {
        return 0;
    }
    if !spanish && w.ends_with('e') {
        w.pop();
    }
    let vowel = |c: char| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u') || (!spanish && c == 'y');
    let mut groups = 0usize;
    let mut in_group = false;
    for c in w.chars() {
        let v = vowel(c);
        if v && !in_group {
            groups += 1;
        }
        in_group = v;
    }
    groups.max(1)
}

/// Szigriszt-Pazos for Spanish, Flesch-Kincaid grade otherwise
fn reading_metrics(text: &str, lang: &str) -> Value {
    let words: Vec<&str> = cached_regex(
        &READING_WORD,
        r"[A-Za-zÁÉÍÓÚÜÑáéíóúüñ]+(?:['’-][A-Za-zÁÉÍÓÚÜÑáéíóúüñ]+)?",
    )
    .map(|re| re.find_iter(text).map(|m| m.as_str()).collect())
    .unwrap_or_default();
    let sentences = cached_regex(&SENTENCE_END, r"[\.!?…]+(?:\s+|$)")
        .map(|re| re.split(text).filter(|s| !s.trim().is_empty()).count())
        .unwrap_or(0)
        .max(1);
    let n_words = words.len();
    let spanish = lang.split('-').next() == Some("es");
    let n_syllables: usize = words.iter().map(|w| syllables(w, spanish)).sum();
    let per_word = n_syllables as f64 / n_words.max(1) as f64;
    let words_per_sentence = n_words as f64 / sentences as f64;

    if spanish {
        let index = 206.84 - 62.3 * per_word - words_per_sentence;
        let difficult = index < 55.0;
        json!({
            "words": n_words,
            "sentences": sentences,
            "syllables": n_syllables,
            "index_name": "Szigriszt-Pazos (INFLESZ)",
            "index_value": round2(index),
            "grade_est": if difficult { 10 } else { 8 },
            "difficult_for_lower_secondary": difficult,
        })
    } else {
        let grade = 0.39 * words_per_sentence + 11.8 * per_word - 15.59;
        json!({
            "words": n_words,
            "sentences": sentences,
            "syllables": n_syllables,
            "index_name": "Flesch-Kincaid Grade",
            "index_value": round2(grade),
            "grade_est": (grade * 10.0).round() / 10.0,
            "difficult_for_lower_secondary": grade > 9.0,
        })
    }
}

/// 3.1.5 Reading Level
///
/// Text harder than lower secondary level needs a simpler version, a summary
/// or an audio reading linked from the page.
pub fn reading_level(ctx: &PageContext, pass: Pass) -> Evaluation {
    let lang = canon_lang(&ctx.lang);
    let metrics = reading_metrics(&ctx.body_text, &lang);
    let words = metrics["words"].as_u64().unwrap_or(0) as usize;
    let difficult = metrics["difficult_for_lower_secondary"].as_bool().unwrap_or(false);
    let applicable = words >= READING_MIN_WORDS;

    let support: Vec<Value> = ctx
        .anchors()
        .filter(|a| {
            cached_match(
                &EASY_VERSION_LINK,
                r"(?i)(lectura\s*f[aá]cil|versi[oó]n\s*f[aá]cil|lenguaje\s*claro|lenguaje\s*simple|plain\s*language|easy\s*read|simple\s*version|resumen|summary|audio\s*versi[oó]n|read\s*aloud)",
                &a.text,
            )
        })
        .map(|a| {
            json!({
                "text": a.text.trim().chars().take(120).collect::<String>(),
                "href": a.attr("href").unwrap_or_default().chars().take(180).collect::<String>(),
            })
        })
        .collect();
    let has_support = !support.is_empty();
    let passed = !applicable || !difficult || has_support;
    let d = details(json!({
        "applicable": u8::from(applicable),
        "lang": lang,
        "metrics": metrics,
        "support_links_found": support,
        "has_support": has_support,
        "violations": u8::from(!passed),
        "ok_ratio": if passed { 1.0 } else { 0.0 },
        "note": note(pass, "text above lower secondary reading level needs supplemental content or a simpler version."),
    }));
    judged(d, passed)
}

/// English words whose meaning depends on how they are said
const EN_HETERONYMS: &[&str] = &[
    "lead", "read", "wind", "tear", "row", "bass", "bow", "live", "close", "minute", "record",
    "object", "present", "project", "content", "produce",
];

/// 3.1.6 Pronunciation
pub fn pronunciation(ctx: &PageContext, pass: Pass) -> Evaluation {
    let lang = canon_lang(&ctx.lang);
    let has_markup = ctx.elements.iter().any(|el| {
        is_pronunciation_markup(el)
            || el.has_attr("data-pronounce")
            || el
                .attr("title")
                .is_some_and(|t| cached_match(&PRONUNCIATION_TITLE, r"(?i)pronunciation|pronunciaci[oó]n", t))
    });

    let mut candidates: BTreeSet<String> = BTreeSet::new();
    if lang.split('-').next() == Some("en") {
        for token in word_tokens(&ctx.body_text) {
            let folded: String = token.chars().map(fold).collect();
            if EN_HETERONYMS.contains(&folded.as_str()) {
                candidates.insert(folded);
            }
        }
    }
    let applicable = !candidates.is_empty();
    let missing = if applicable && !has_markup { candidates.len() } else { 0 };
    let offenders: Vec<Value> = if missing > 0 {
        candidates
            .iter()
            .take(MAX_OFFENDERS)
            .map(|t| json!({ "term": t, "reason": "Ambiguous pronunciation without a pronunciation aid." }))
            .collect()
    } else {
        Vec::new()
    };
    let d = details(json!({
        "applicable": u8::from(applicable),
        "lang": lang,
        "candidates": candidates,
        "has_pronunciation_markup": has_markup,
        "missing": missing,
        "violations": missing,
        "ok_ratio": if missing == 0 { 1.0 } else { 0.0 },
        "offenders": offenders,
        "note": note(pass, "words whose meaning depends on pronunciation need ruby, IPA or an audio aid."),
    }));
    judged(d, missing == 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::Verdict;

    fn run(check: fn(&PageContext, Pass) -> Evaluation, html: &str) -> Evaluation {
        let ctx = PageContext::parse(html).unwrap();
        check(&ctx, Pass::Raw)
    }

    #[test]
    fn repeated_jargon_needs_definitions() {
        let undefined = run(
            unusual_words,
            "<html lang=\"es\"><body><p>La interoperabilidad del sistema. La interoperabilidad mejora. \
             El procedimiento es claro. El procedimiento sigue.</p></body></html>",
        );
        assert_eq!(undefined.verdict, Verdict::Fail);
        assert_eq!(undefined.details["missing"], 2);
        assert_eq!(undefined.details["offenders"][0]["term"], "interoperabilidad");

        let partial = run(
            unusual_words,
            "<html lang=\"es\"><body><p>La <dfn>interoperabilidad</dfn> del sistema. La interoperabilidad mejora. \
             El procedimiento es claro. El procedimiento sigue.</p></body></html>",
        );
        assert_eq!(partial.verdict, Verdict::Partial);
        assert_eq!(partial.details["covered_definitions"], 1);

        let glossary = run(
            unusual_words,
            "<html lang=\"es\"><body><p>La interoperabilidad del sistema. La interoperabilidad mejora.</p>\
             <a href=\"/glosario\">Glosario</a></body></html>",
        );
        assert_eq!(glossary.verdict, Verdict::Pass);
        assert_eq!(glossary.details["has_global_glossary"], true);

        let plain = run(unusual_words, "<html lang=\"es\"><body><p>Hola a todos.</p></body></html>");
        assert_eq!(plain.verdict, Verdict::Pass);
        assert_eq!(plain.details["applicable"], 0);
    }

    #[test]
    fn abbreviations_need_an_expansion() {
        let titled = run(
            abbreviations,
            "<html><body><p>Consulte el <abbr title=\"Registro Único de Contribuyentes\">RUC</abbr>.</p></body></html>",
        );
        assert_eq!(titled.verdict, Verdict::Pass);
        assert_eq!(titled.details["abbreviations_total"], 1);

        let inline = run(
            abbreviations,
            "<html><body><p>La Organización Mundial de la Salud (OMS) publicó la guía.</p></body></html>",
        );
        assert_eq!(inline.verdict, Verdict::Pass);
        assert_eq!(inline.details["explained"], 1);

        let mixed = run(
            abbreviations,
            "<html><body><p>Trámite del <abbr title=\"Documento Nacional de Identidad\">DNI</abbr> ante la SUNAT.</p></body></html>",
        );
        assert_eq!(mixed.verdict, Verdict::Partial);
        assert_eq!(mixed.details["offenders"][0]["abbr"], "SUNAT");

        let bare = run(abbreviations, "<html><body><p>Pagos en la SUNAT.</p></body></html>");
        assert_eq!(bare.verdict, Verdict::Fail);

        let none = run(abbreviations, "<html><body><p>Bienvenidos.</p></body></html>");
        assert_eq!(none.verdict, Verdict::Pass);
        assert_eq!(none.details["applicable"], 0);
    }

    #[test]
    fn syllable_counts() {
        assert_eq!(syllables("administración", true), 5);
        assert_eq!(syllables("sol", true), 1);
        assert_eq!(syllables("make", false), 1);
        assert_eq!(syllables("reading", false), 2);
        assert_eq!(syllables("", false), 0);
    }

    #[test]
    fn hard_text_needs_an_easier_version() {
        let hard = "La administración pública implementará procedimientos extraordinarios considerablemente complejos "
            .repeat(40);
        let html = format!("<html lang=\"es\"><body><p>{hard}</p></body></html>");
        let e = run(reading_level, &html);
        assert_eq!(e.verdict, Verdict::Fail);
        assert_eq!(e.details["metrics"]["difficult_for_lower_secondary"], true);
        assert_eq!(e.details["metrics"]["index_name"], "Szigriszt-Pazos (INFLESZ)");

        let html = format!("<html lang=\"es\"><body><p>{hard}</p><a href=\"/facil\">Lectura fácil</a></body></html>");
        let supported = run(reading_level, &html);
        assert_eq!(supported.verdict, Verdict::Pass);
        assert_eq!(supported.details["has_support"], true);

        let easy = format!("<html lang=\"es\"><body><p>{}</p></body></html>", "El sol sale. ".repeat(120));
        let e = run(reading_level, &easy);
        assert_eq!(e.verdict, Verdict::Pass);
        assert_eq!(e.details["applicable"], 1);

        let short = run(reading_level, "<html lang=\"es\"><body><p>Texto breve.</p></body></html>");
        assert_eq!(short.verdict, Verdict::Pass);
        assert_eq!(short.details["applicable"], 0);
    }

    #[test]
    fn heteronyms_need_pronunciation_aids() {
        let bare = run(
            pronunciation,
            "<html lang=\"en\"><body><p>Please read the record before you close it.</p></body></html>",
        );
        assert_eq!(bare.verdict, Verdict::Fail);
        assert_eq!(bare.details["candidates"], json!(["close", "read", "record"]));

        let aided = run(
            pronunciation,
            "<html lang=\"en\"><body><p>Please read the <span class=\"ipa\">record /ˈrekərd/</span>.</p></body></html>",
        );
        assert_eq!(aided.verdict, Verdict::Pass);
        assert_eq!(aided.details["has_pronunciation_markup"], true);

        let spanish = run(pronunciation, "<html lang=\"es\"><body><p>Lea el registro.</p></body></html>");
        assert_eq!(spanish.verdict, Verdict::Pass);
        assert_eq!(spanish.details["applicable"], 0);
    }
}
