//! Guideline 2.4: Navigable, the checks beyond titles, link purpose in context and headings

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use regex::Regex;
use serde_json::json;
use url::Url;

use crate::engine::context::{Element, PageContext};
use crate::engine::outcome::Evaluation;

use super::operable::looks_skip_link;
use super::{accessible_name, cached_match, details, focusable, judged, note, ratio, Pass, MAX_OFFENDERS};

fn contenteditable(el: &Element) -> bool {
    el.attr("contenteditable")
        .is_some_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "" | "true" | "plaintext-only"))
}

/// 2.4.3 Focus Order
///
/// Static markup cannot show the real tab sequence, so this flags what breaks
/// it: positive `tabindex` and focusable elements hidden from view or from
/// assistive technology.
pub fn focus_order(ctx: &PageContext, pass: Pass) -> Evaluation {
    let mut total = 0usize;
    let mut positive_tabindex = 0usize;
    let mut custom_tabindex = 0usize;
    let mut hidden_focusable = 0usize;
    let mut aria_hidden_focusable = 0usize;
    let mut inert_focusable = 0usize;
    let mut offenders = Vec::new();
    let mut flag = |el: &Element, reason: &str| {
        if offenders.len() < MAX_OFFENDERS {
            let mut o = el.describe();
            o["tabindex"] = json!(el.attr("tabindex"));
            o["reason"] = json!(reason);
            offenders.push(o);
        }
    };

    for el in &ctx.elements {
        if el.tag == "input" && el.input_type() == "hidden" {
            continue;
        }
        if !(focusable(el) || contenteditable(el)) {
            continue;
        }
        total += 1;
        if let Some(t) = el.tabindex() {
            custom_tabindex += 1;
            if t > 0 {
                positive_tabindex += 1;
                flag(el, "Positive tabindex overrides the document order.");
            }
        }
        if el.has_attr("hidden") {
            hidden_focusable += 1;
            flag(el, "Focusable element inside hidden content.");
        }
        if el.flag("aria-hidden") {
            aria_hidden_focusable += 1;
            flag(el, "Focusable element hidden from assistive technology.");
        }
        if el.has_attr("inert") {
            inert_focusable += 1;
            flag(el, "Focusable element marked inert.");
        }
    }

    let skip_links = ctx.anchors().filter(|a| looks_skip_link(a)).count();
    let weak_signal_pre_main =
        total >= 10 && !ctx.landmarks.main && skip_links == 0 && positive_tabindex > 0;
    let violations = positive_tabindex + hidden_focusable + aria_hidden_focusable + inert_focusable;
    let applicable = usize::from(total > 0);
    let d = details(json!({
        "focusables_found": total,
        "applicable": applicable,
        "compliant_raw": usize::from(applicable == 1 && violations == 0),
        "violations_suspicions": violations,
        "positive_tabindex": positive_tabindex,
        "custom_tabindex_total": custom_tabindex,
        "hidden_focusable": hidden_focusable,
        "aria_hidden_focusable": aria_hidden_focusable,
        "inert_focusable": inert_focusable,
        "weak_signal_pre_main": weak_signal_pre_main,
        "ok_ratio": if violations == 0 { 1.0 } else { 0.0 },
        "offenders": offenders,
        "note": note(pass, "focus order must follow the meaning of the page; positive tabindex and focusable hidden content break it."),
    }));
    judged(d, violations == 0)
}

const TOC_HINTS: &[&str] = &["table of contents", "contenido", "índice", "indice", "sumario", "contents"];
const SITEMAP_HINTS: &[&str] = &["mapa del sitio", "site map", "sitemap"];
const PROCESS_TITLE_HINTS: &[&str] = &["paso", "step", "wizard", "checkout", "progreso", "progress", "stepper", "steps"];

static STEP_TEXT: OnceLock<Option<Regex>> = OnceLock::new();
static PROCESS_CLASS: OnceLock<Option<Regex>> = OnceLock::new();
static SEARCH_LABEL: OnceLock<Option<Regex>> = OnceLock::new();

/// Step of a checkout or wizard; such pages are exempt from 2.4.5
fn process_page(ctx: &PageContext) -> bool {
    let step_text = cached_match(&STEP_TEXT, r"(?i)\b(paso|step)\s*\d+(\s*(de|of)\s*\d+)?\b", &ctx.body_text);
    let marked = ctx.elements.iter().any(|el| {
        el.attr("aria-current").is_some_and(|v| v.eq_ignore_ascii_case("step"))
            || cached_match(
                &PROCESS_CLASS,
                r"(?i)(stepper|wizard|checkout-step|progress-steps)",
                el.class(),
            )
    });
    let title = ctx.title_text.to_lowercase();
    marked || step_text || PROCESS_TITLE_HINTS.iter().any(|h| title.contains(h))
}

fn breadcrumbs(ctx: &PageContext) -> (bool, serde_json::Value) {
    let aria = ctx.by_tag(&["nav"]).any(|n| {
        let label = n.attr("aria-label").unwrap_or_default().to_lowercase();
        label.contains("breadcrumb") || label.contains("migas")
    });
    let class = ctx
        .elements
        .iter()
        .any(|el| el.class().to_ascii_lowercase().contains("breadcrumb"));
    let schema = ctx
        .elements
        .iter()
        .any(|el| el.attr("itemtype").is_some_and(|t| t.contains("BreadcrumbList")));
    (
        aria || class || schema,
        json!({ "aria_breadcrumb": aria, "class_breadcrumb": class, "schema_breadcrumb": schema }),
    )
}

fn site_search(ctx: &PageContext) -> (bool, serde_json::Value) {
    let by_role = ctx.elements.iter().any(|el| el.role() == "search" || el.tag == "search");
    let type_search = ctx.inputs().filter(|i| i.input_type() == "search").count();
    let labelled = ctx
        .elements
        .iter()
        .filter(|el| {
            ["placeholder", "aria-label"]
                .iter()
                .filter_map(|a| el.attr(a))
                .any(|v| cached_match(&SEARCH_LABEL, r"(?i)(buscar|search)", v))
        })
        .count();
    (
        ctx.landmarks.search || by_role || type_search > 0 || labelled > 0,
        json!({
            "landmark_search": ctx.landmarks.search,
            "by_role": by_role,
            "type_search": type_search,
            "placeholders": labelled,
        }),
    )
}

/// 2.4.5 Multiple Ways
pub fn multiple_ways(ctx: &PageContext, pass: Pass) -> Evaluation {
    let is_process = process_page(ctx);
    let mut mechanisms = BTreeSet::new();
    let mut meta = serde_json::Map::new();

    let nav_links = ctx.anchors().filter(|a| a.in_nav).count();
    if ctx.landmarks.nav || nav_links >= 4 {
        mechanisms.insert("sitewide_navigation");
    }
    meta.insert("nav".into(), json!({ "nav_links_count": nav_links, "landmark_nav": ctx.landmarks.nav }));

    let (search, search_meta) = site_search(ctx);
    if search {
        mechanisms.insert("site_search");
    }
    meta.insert("search".into(), search_meta);

    let (crumbs, crumbs_meta) = breadcrumbs(ctx);
    if crumbs {
        mechanisms.insert("breadcrumbs");
    }
    meta.insert("breadcrumbs".into(), crumbs_meta);

    let toc = ctx.by_tag(&["nav", "aside", "section"]).take(6).any(|n| {
        let label = n.attr("aria-label").unwrap_or_default().to_lowercase();
        TOC_HINTS.iter().any(|h| label.contains(h))
    }) || ctx.elements.iter().any(|el| {
        let id = el.id().to_ascii_lowercase();
        id == "toc" || id == "table-of-contents" || el.class().split_whitespace().any(|c| c == "toc")
    });
    if toc {
        mechanisms.insert("table_of_contents");
    }

    let sitemap_links: Vec<String> = ctx
        .anchors()
        .filter(|a| {
            let href = a.attr("href").unwrap_or_default().to_ascii_lowercase();
            let text = a.text.to_lowercase();
            href.contains("sitemap") || SITEMAP_HINTS.iter().any(|h| text.contains(h))
        })
        .take(5)
        .map(|a| a.attr("href").unwrap_or_default().chars().take(200).collect())
        .collect();
    if !sitemap_links.is_empty() {
        mechanisms.insert("sitemap_link");
    }
    meta.insert("sitemap".into(), json!({ "examples": sitemap_links }));

    let count = mechanisms.len();
    let passed = is_process || count >= 2;
    let offenders: Vec<_> = if passed {
        Vec::new()
    } else {
        vec![json!({ "reason": "Fewer than two ways to locate this page within the site.", "mechanisms": mechanisms })]
    };
    let d = details(json!({
        "applicable": usize::from(!is_process),
        "is_process_like": is_process,
        "mechanisms_found": mechanisms,
        "mechanisms_meta": meta,
        "count_mechanisms": count,
        "ok_ratio": if passed { 1.0 } else { 0.0 },
        "offenders": offenders,
        "note": note(pass, "two or more ways (navigation, search, sitemap, breadcrumbs, table of contents) to reach a page, except steps of a process."),
    }));
    judged(d, passed)
}

/// Separators commonly placed between page and site in a `<title>`
const TITLE_SEPARATORS: &[&str] = &[" — ", " – ", " | ", " · ", " :: ", " - "];

static HUMAN_SEGMENT: OnceLock<Option<Regex>> = OnceLock::new();

fn url_hints(ctx: &PageContext) -> (bool, serde_json::Value) {
    let Some(raw) = ctx.meta("og:url") else {
        return (false, json!({ "url": null }));
    };
    let Ok(url) = Url::parse(raw) else {
        return (false, json!({ "url": raw, "error": "parse-failed" }));
    };
    let segments: Vec<&str> = url.path().split('/').filter(|s| !s.is_empty()).collect();
    let humanish = segments
        .iter()
        .filter(|s| cached_match(&HUMAN_SEGMENT, r"(?i)^[a-z0-9\-_.]{3,}$", s) && !s.chars().all(|c| c.is_ascii_digit()))
        .count();
    (
        segments.len() >= 2 && humanish >= 1,
        json!({ "url": raw, "segments": segments, "humanish": humanish }),
    )
}

/// 2.4.8 Location
pub fn location(ctx: &PageContext, pass: Pass) -> Evaluation {
    let (crumbs, crumbs_meta) = breadcrumbs(ctx);
    let (url_ok, url_meta) = url_hints(ctx);
    let has_nav = ctx.landmarks.nav || ctx.by_tag(&["nav"]).next().is_some();
    let applicable = has_nav || crumbs || url_ok;

    let current: Vec<&Element> = ctx
        .elements
        .iter()
        .filter(|el| {
            el.attr("aria-current")
                .is_some_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "page" | "true"))
        })
        .collect();
    let active_class = ctx
        .elements
        .iter()
        .filter(|el| {
            el.class()
                .split_whitespace()
                .any(|c| matches!(c.to_ascii_lowercase().as_str(), "active" | "current" | "selected"))
        })
        .count();
    let nav_current = !current.is_empty() || active_class > 0;

    let title = ctx.title_text.trim();
    let parts: Vec<&str> = TITLE_SEPARATORS
        .iter()
        .find(|sep| title.contains(**sep))
        .map(|sep| title.split(*sep).map(str::trim).filter(|p| !p.is_empty()).collect())
        .unwrap_or_else(|| vec![title]);
    let includes_site = ctx.site_name_meta.as_deref().is_some_and(|site| {
        let site = site.to_lowercase();
        !site.is_empty() && parts.iter().any(|p| p.to_lowercase().contains(&site))
    });
    let title_hierarchy = parts.len() >= 2 || includes_site;

    let mut mechanisms = Vec::new();
    if crumbs {
        mechanisms.push("breadcrumbs");
    }
    if nav_current {
        mechanisms.push("nav_current");
    }
    if title_hierarchy {
        mechanisms.push("title_hierarchy");
    }
    let passed = !applicable || !mechanisms.is_empty();
    let offenders: Vec<_> = if passed {
        Vec::new()
    } else {
        vec![json!({ "reason": "Page is part of a set but shows no location (breadcrumbs, current navigation item or title hierarchy)." })]
    };
    let examples: Vec<String> = current
        .iter()
        .take(3)
        .map(|el| {
            let text: &str = if el.text.is_empty() { el.attr("href").unwrap_or_default() } else { &el.text };
            text.chars().take(160).collect()
        })
        .collect();
    let d = details(json!({
        "applicable": usize::from(applicable),
        "mechanisms_found": mechanisms,
        "meta": {
            "breadcrumbs": crumbs_meta,
            "nav_current": { "aria_current_page": current.len(), "active_class": active_class, "examples": examples },
            "title_hierarchy": { "title": title, "parts": parts, "includes_site": includes_site },
            "url_hints": url_meta,
        },
        "ok_ratio": if passed { 1.0 } else { 0.0 },
        "offenders": offenders,
        "note": note(pass, "pages within a set should tell users where they are."),
    }));
    judged(d, passed)
}

static GENERIC_LINK: OnceLock<Option<Regex>> = OnceLock::new();

fn generic_link_text(text: &str) -> bool {
    text.trim().is_empty()
        || cached_match(
            &GENERIC_LINK,
            r"(?i)^\s*(clic(k)?\s*aqu[ií]|haz\s*clic\s*aqu[ií]|click\s*here|here|aqu[ií]|m[aá]s|ver\s*m[aá]s|ver|leer\s*m[aá]s|read\s*more|more|learn\s*more|see\s*more|detalles?|details?|info|informaci[oó]n|saber\s*m[aá]s|continuar|seguir|ir|go|open|abrir|enlace|link)\s*$",
            text,
        )
}

/// 2.4.9 Link Purpose (Link Only)
pub fn link_purpose_link_only(ctx: &PageContext, pass: Pass) -> Evaluation {
    let mut examined = 0usize;
    let mut determinable = 0usize;
    let mut missing_name = 0usize;
    let mut generic_text = 0usize;
    let mut offenders = Vec::new();
    let mut hrefs_by_name: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for a in ctx.elements.iter().filter(|el| el.tag == "a" || el.role() == "link") {
        let Some(href) = a.attr_nonempty("href") else {
            continue;
        };
        examined += 1;
        let name = accessible_name(ctx, a).unwrap_or_default();
        let normalized = name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        let reason = if normalized.is_empty() {
            missing_name += 1;
            Some("Link has no accessible name.")
        } else if generic_link_text(&normalized) {
            generic_text += 1;
            Some("Link text alone does not identify its purpose.")
        } else {
            determinable += 1;
            None
        };
        if let (Some(reason), true) = (reason, offenders.len() < MAX_OFFENDERS) {
            offenders.push(json!({
                "href": href.chars().take(180).collect::<String>(),
                "text": name,
                "reason": reason,
            }));
        }
        if !normalized.is_empty() {
            hrefs_by_name.entry(normalized).or_default().insert(href.to_string());
        }
    }

    let mut duplicates_ambiguous = 0usize;
    for (text, hrefs) in &hrefs_by_name {
        if hrefs.len() >= 2 && generic_link_text(text) {
            duplicates_ambiguous += 1;
            if offenders.len() < MAX_OFFENDERS {
                offenders.push(json!({
                    "text": text,
                    "hrefs": hrefs.iter().take(5).collect::<Vec<_>>(),
                    "reason": "Same generic text leads to different destinations.",
                }));
            }
        }
    }

    let violations = missing_name + generic_text + duplicates_ambiguous;
    let d = details(json!({
        "links_examined": examined,
        "applicable": usize::from(examined > 0),
        "determinable": determinable,
        "missing_name": missing_name,
        "generic_text": generic_text,
        "duplicates_ambiguous": duplicates_ambiguous,
        "ok_ratio": ratio(determinable, examined),
        "offenders": offenders,
        "note": note(pass, "the purpose of each link must be clear from the link text alone."),
    }));
    judged(d, violations == 0)
}

static WORD: OnceLock<Option<Regex>> = OnceLock::new();

fn word_count(text: &str) -> usize {
    WORD.get_or_init(|| Regex::new(r"\w+").ok())
        .as_ref()
        .map_or(0, |re| re.find_iter(text).count())
}

/// 2.4.10 Section Headings
pub fn section_headings(ctx: &PageContext, pass: Pass) -> Evaluation {
    let words = word_count(&ctx.body_text);
    let mut total = 0usize;
    let mut nonempty = 0usize;
    let mut offenders = Vec::new();
    for h in ctx.headings() {
        total += 1;
        if h.text.trim().is_empty() {
            if offenders.len() < MAX_OFFENDERS {
                let mut o = h.describe();
                o["reason"] = json!("Empty heading.");
                offenders.push(o);
            }
        } else {
            nonempty += 1;
        }
    }

    let applicable = words >= 150 || total > 0;
    let mut violations = 0usize;
    if words >= 300 && nonempty == 0 {
        violations += 1;
        offenders.push(json!({ "reason": "Long content with no section headings.", "word_count": words }));
    }
    if words >= 800 && nonempty < 2 {
        violations += 1;
        offenders.push(json!({ "reason": "Very long content organised under fewer than two headings.", "word_count": words }));
    }
    let passed = !applicable || (violations == 0 && nonempty >= 1);
    let d = details(json!({
        "word_count": words,
        "headings_total": total,
        "headings_nonempty": nonempty,
        "headings_empty": total - nonempty,
        "applicable": usize::from(applicable),
        "violations": violations,
        "ok_ratio": if passed { 1.0 } else { 0.0 },
        "offenders": offenders,
        "note": note(pass, "sections of content should be organised with headings."),
    }));
    judged(d, passed)
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
    fn positive_tabindex_breaks_focus_order() {
        assert_eq!(run(focus_order, "<p>text</p>").verdict, Verdict::Pass);
        assert_eq!(run(focus_order, r#"<a href="/a">A</a><button>B</button>"#).verdict, Verdict::Pass);

        let eval = run(focus_order, r#"<a href="/a" tabindex="3">A</a><button aria-hidden="true">B</button>"#);
        assert_eq!(eval.details["positive_tabindex"], json!(1));
        assert_eq!(eval.details["aria_hidden_focusable"], json!(1));
        assert_eq!(eval.verdict, Verdict::Fail);
    }

    #[test]
    fn two_ways_to_find_a_page() {
        let one = r#"<nav><a href="/a">Uno</a></nav>"#;
        let eval = run(multiple_ways, one);
        assert_eq!(eval.details["count_mechanisms"], json!(1));
        assert_eq!(eval.verdict, Verdict::Fail);

        let two = r#"<nav><a href="/a">Uno</a></nav><form role="search"><input type="search"></form>"#;
        assert_eq!(run(multiple_ways, two).verdict, Verdict::Pass);

        let checkout = "<title>Checkout</title><p>Paso 2 de 3</p>";
        let eval = run(multiple_ways, checkout);
        assert_eq!(eval.details["is_process_like"], json!(true));
        assert_eq!(eval.verdict, Verdict::Pass);
    }

    #[test]
    fn location_within_a_set() {
        assert_eq!(run(location, "<p>standalone</p>").verdict, Verdict::Pass);

        let lost = "<head><title>Trámites</title></head><body><nav><a href=\"/a\">A</a></nav></body>";
        assert_eq!(run(location, lost).verdict, Verdict::Fail);

        let found = r#"<nav><a href="/" aria-current="page">Inicio</a></nav>"#;
        let eval = run(location, found);
        assert_eq!(eval.details["mechanisms_found"], json!(["nav_current"]));
        assert_eq!(eval.verdict, Verdict::Pass);
    }

    #[test]
    fn generic_links_are_ambiguous_out_of_context() {
        let html = r#"<a href="/informe">Informe anual 2024</a><a href="/a">Leer más</a><a href="/b">leer más</a><a href="/c"></a>"#;
        let eval = run(link_purpose_link_only, html);
        assert_eq!(eval.details["generic_text"], json!(2));
        assert_eq!(eval.details["missing_name"], json!(1));
        assert_eq!(eval.details["duplicates_ambiguous"], json!(1));
        assert_eq!(eval.verdict, Verdict::Partial);

        let clear = r#"<a href="/informe">Informe anual 2024</a>"#;
        assert_eq!(run(link_purpose_link_only, clear).verdict, Verdict::Pass);
    }

    #[test]
    fn long_text_needs_headings() {
        let body = "palabra ".repeat(320);
        let bare = format!("<p>{body}</p>");
        let eval = run(section_headings, &bare);
        assert_eq!(eval.details["violations"], json!(1));
        assert_eq!(eval.verdict, Verdict::Fail);

        let sectioned = format!("<h2>Requisitos</h2><p>{body}</p>");
        assert_eq!(run(section_headings, &sectioned).verdict, Verdict::Pass);
        assert_eq!(run(section_headings, "<p>corto</p>").verdict, Verdict::Pass);
    }
}
