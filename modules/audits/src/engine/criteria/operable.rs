//! Principle 2: Operable

use std::sync::OnceLock;

use regex::Regex;
use serde_json::json;

use crate::contract::Verdict;
use crate::engine::context::{Element, PageContext};
use crate::engine::outcome::{ratio_verdict, verdict_from_counts, Evaluation};

use super::{
    accessible_name, cached_match, details, natively_interactive, needs_browser, note, ratio,
    text_ok, Pass, INTERACTIVE_ROLES, MAX_OFFENDERS,
};

const MOUSE_EVENTS: &[&str] = &[
    "onclick", "onmousedown", "onmouseup", "ondblclick", "oncontextmenu", "ondragstart",
];

const KEY_EVENTS: &[&str] = &["onkeydown", "onkeyup", "onkeypress"];

/// 2.1.1 Keyboard
pub fn keyboard(ctx: &PageContext, pass: Pass) -> Evaluation {
    let mut tabindex_gt0 = 0usize;
    let mut onclick_noninteractive = 0usize;
    let mut offenders = Vec::new();

    for el in &ctx.elements {
        let tabindex = el.attr("tabindex").and_then(|t| t.trim().parse::<i32>().ok());
        if tabindex.is_some_and(|t| t > 0) {
            tabindex_gt0 += 1;
            if offenders.len() < MAX_OFFENDERS {
                let mut o = el.describe();
                o["tabindex"] = json!(tabindex);
                o["reason"] = json!("Positive tabindex alters the natural focus order.");
                offenders.push(o);
            }
        }

        let mouse_only = MOUSE_EVENTS.iter().any(|e| el.has_attr(e))
            && !KEY_EVENTS.iter().any(|e| el.has_attr(e));
        if !mouse_only || natively_interactive(el) {
            continue;
        }
        let focusable = tabindex.is_some_and(|t| t >= 0);
        let has_role = INTERACTIVE_ROLES.contains(&el.role().as_str());
        if !(focusable && has_role) {
            onclick_noninteractive += 1;
            if offenders.len() < MAX_OFFENDERS {
                let mut o = el.describe();
                o["reason"] = json!(
                    "Mouse handler on a non-interactive element without focus, role or key handler."
                );
                offenders.push(o);
            }
        }
    }

    let verdict = match (tabindex_gt0, onclick_noninteractive) {
        (0, 0) => Verdict::Pass,
        (t, o) if t > 5 || o > 5 => Verdict::Fail,
        _ => Verdict::Partial,
    };
    let d = details(json!({
        "tabindex_gt0": tabindex_gt0,
        "onclick_noninteractive": onclick_noninteractive,
        "offenders": offenders,
        "note": note(pass, "flags positive tabindex and mouse-only handlers on elements keyboard users cannot reach."),
    }));
    Evaluation::new(verdict, d)
}

const SKIP_TEXT_HINTS: &[&str] = &[
    "skip to content",
    "skip content",
    "skip navigation",
    "skip nav",
    "jump to content",
    "saltar a contenido",
    "saltar al contenido",
    "ir al contenido",
    "ir directamente al contenido",
    "contenido principal",
    "saltar contenido",
    "ir al inicio del contenido",
];

const SKIP_CLASS_HINTS: &[&str] = &[
    "skip-link",
    "skiplink",
    "skip-nav",
    "visually-hidden-focusable",
    "sr-only-focusable",
];

pub(super) fn looks_skip_link(a: &Element) -> bool {
    let href = a.attr("href").unwrap_or_default().trim();
    if !href.starts_with('#') || href.len() < 2 {
        return false;
    }
    let text = format!(
        "{} {} {}",
        a.text,
        a.attr("aria-label").unwrap_or_default(),
        a.attr("title").unwrap_or_default()
    )
    .to_lowercase();
    let class = a.attr("class").unwrap_or_default().to_lowercase();
    SKIP_TEXT_HINTS.iter().any(|h| text.contains(h)) || SKIP_CLASS_HINTS.iter().any(|h| class.contains(h))
}

/// 2.4.1 Bypass Blocks
pub fn bypass_blocks(ctx: &PageContext, pass: Pass) -> Evaluation {
    let skip_links: Vec<String> = ctx
        .anchors()
        .filter(|a| looks_skip_link(a))
        .map(|a| a.attr("href").unwrap_or_default().to_string())
        .collect();
    let has_main = ctx.landmarks.main;
    let has_skip_link = !skip_links.is_empty();
    let verdict = if has_main || has_skip_link {
        Verdict::Pass
    } else {
        Verdict::Fail
    };
    let d = details(json!({
        "has_main": has_main,
        "has_skip_link": has_skip_link,
        "skip_links_found": skip_links,
        "landmarks": ctx.landmarks,
        "note": note(pass, "a skip link to the main content or a main landmark lets users bypass repeated blocks."),
    }));
    Evaluation::new(verdict, d)
}

static PLACEHOLDER_TITLE: OnceLock<Option<Regex>> = OnceLock::new();

fn is_placeholder_title(title: &str) -> bool {
    cached_match(
        &PLACEHOLDER_TITLE,
        r"(?i)^\s*(untitled|sin\s*t[ií]tulo|new\s*page|page\s*title|document|index|home|inicio|start|default|react\s*app|my\s*app|application)\s*$|^\s*home\s*\|\s*home\s*$",
        title,
    )
}

/// Titles this long are reported, not failed
const TITLE_TOO_LONG: usize = 120;

/// 2.4.2 Page Titled
pub fn page_titled(ctx: &PageContext, pass: Pass) -> Evaluation {
    let title = ctx.title_text.trim();
    let has_title = !title.is_empty();
    let placeholder = has_title && is_placeholder_title(title);
    let length = title.chars().count();
    let letters = title.chars().filter(|c| c.is_alphabetic()).count();
    let too_short = has_title && (length < 4 || (letters < 3 && length < 5));
    let too_long = length > TITLE_TOO_LONG;
    let meaningful = has_title && !placeholder && !too_short;

    let reason = if !has_title {
        Some("Missing or empty <title>.")
    } else if placeholder {
        Some("Title is a generic placeholder.")
    } else if too_short {
        Some("Title is too short to describe the page.")
    } else {
        None
    };
    let h1 = ctx.by_tag(&["h1"]).next().map(|h| h.text.clone());
    let offenders: Vec<_> = reason
        .map(|r| json!({"reason": r, "title": title}))
        .into_iter()
        .collect();
    let d = details(json!({
        "has_title": has_title,
        "title": title,
        "h1_text": h1,
        "placeholder": placeholder,
        "too_short": too_short,
        "too_long": too_long,
        "ok_ratio": if meaningful { 1.0 } else { 0.0 },
        "offenders": offenders,
        "note": note(pass, "the page needs a <title> that describes its topic; placeholders and titles under four characters fail."),
    }));
    let verdict = verdict_from_counts(&d, Some(meaningful));
    Evaluation::new(verdict, d)
}

/// 2.4.4 Link Purpose (In Context)
pub fn link_purpose(ctx: &PageContext, pass: Pass) -> Evaluation {
    let mut total = 0usize;
    let mut meaningful = 0usize;
    let mut offenders = Vec::new();

    for a in ctx.anchors() {
        if !a.has_attr("href") || a.flag("aria-hidden") {
            continue;
        }
        total += 1;
        let name = accessible_name(ctx, a).unwrap_or_default();
        if text_ok(&name) {
            meaningful += 1;
        } else if offenders.len() < MAX_OFFENDERS {
            let href: String = a.attr("href").unwrap_or_default().chars().take(180).collect();
            offenders.push(json!({
                "tag": "a",
                "href": href,
                "text": name,
                "reason": "Link text does not describe its destination.",
            }));
        }
    }

    let link_ratio = ratio(meaningful, total);
    let verdict = if total == 0 {
        Verdict::Na
    } else {
        ratio_verdict(link_ratio, 1.0, 0.3)
    };
    let d = details(json!({
        "links_total": total,
        "meaningful": meaningful,
        "ratio": link_ratio,
        "ok_ratio": link_ratio,
        "offenders": offenders,
        "note": note(pass, "link names (text, aria-label, image alt or title) must describe the destination."),
    }));
    Evaluation::new(verdict, d)
}

static GENERIC_HEADING: OnceLock<Option<Regex>> = OnceLock::new();
static GENERIC_LABEL: OnceLock<Option<Regex>> = OnceLock::new();

fn heading_is_generic(text: &str) -> bool {
    cached_match(
        &GENERIC_HEADING,
        r"(?i)^\s*(seccion|sección|section|bloque|block|modulo|module|heading|encabezado|titulo|título|title|content|contenido)\s*\d*\s*$|^\s*(sin\s*t[ií]tulo|untitled)\s*$",
        text,
    )
}

fn label_is_generic(text: &str) -> bool {
    cached_match(
        &GENERIC_LABEL,
        r"(?i)^\s*(ok|aceptar|accept|submit|enviar|send|go|continuar|siguiente|next|apply|aplicar)\s*$|^\s*(click\s*aqu[ií]|haz\s*clic\s*aqu[ií]|click\s*here|aqu[ií]|here)\s*$|^\s*(mas|m[aá]s|info|informaci[oó]n|details?|detalles?)\s*$",
        text,
    )
}

/// 2.4.6 Headings and Labels
pub fn headings_and_labels(ctx: &PageContext, pass: Pass) -> Evaluation {
    let mut offenders = Vec::new();

    let mut applicable_headings = 0usize;
    let mut headings_empty = 0usize;
    let mut headings_generic = 0usize;
    for h in ctx.headings() {
        if h.flag("aria-hidden") {
            continue;
        }
        applicable_headings += 1;
        let text = accessible_name(ctx, h).unwrap_or_default();
        let reason = if text.trim().is_empty() {
            headings_empty += 1;
            Some("Empty heading.")
        } else if heading_is_generic(&text) {
            headings_generic += 1;
            Some("Generic heading text.")
        } else {
            None
        };
        if let (Some(reason), true) = (reason, offenders.len() < MAX_OFFENDERS) {
            offenders.push(json!({"tag": h.tag, "text": text, "reason": reason}));
        }
    }

    let mut applicable_labels = 0usize;
    let mut labels_missing = 0usize;
    let mut labels_generic = 0usize;
    for input in ctx.inputs() {
        let kind = input.attr("type").unwrap_or_default().to_ascii_lowercase();
        if matches!(kind.as_str(), "hidden" | "submit" | "reset" | "button" | "image") {
            continue;
        }
        applicable_labels += 1;
        let label = accessible_name(ctx, input)
            .or_else(|| input.attr_nonempty("placeholder").map(str::to_string))
            .unwrap_or_default();
        let reason = if label.trim().is_empty() && !input.in_label {
            labels_missing += 1;
            Some("Form control without a label.")
        } else if label_is_generic(&label) {
            labels_generic += 1;
            Some("Generic label text.")
        } else {
            None
        };
        if let (Some(reason), true) = (reason, offenders.len() < MAX_OFFENDERS) {
            let mut o = input.describe();
            o["label"] = json!(label);
            o["reason"] = json!(reason);
            offenders.push(o);
        }
    }

    let total = applicable_headings + applicable_labels;
    let violations = headings_empty + headings_generic + labels_missing + labels_generic;
    let ok_ratio = ratio(total - violations, total);
    let verdict = if total == 0 {
        Verdict::Na
    } else {
        ratio_verdict(ok_ratio, 1.0, 0.3)
    };
    let d = details(json!({
        "applicable_headings": applicable_headings,
        "headings_empty": headings_empty,
        "headings_generic": headings_generic,
        "applicable_labels": applicable_labels,
        "labels_missing": labels_missing,
        "labels_generic": labels_generic,
        "ok_ratio": ok_ratio,
        "offenders": offenders,
        "note": note(pass, "headings and labels must be non-empty and describe their topic or purpose."),
    }));
    Evaluation::new(verdict, d)
}

/// 2.4.7 Focus Visible
pub fn focus_visible(_ctx: &PageContext, pass: Pass) -> Evaluation {
    needs_browser(pass, "focus indicator visibility")
}

/// 2.5.5 Target Size
pub fn target_size(_ctx: &PageContext, pass: Pass) -> Evaluation {
    needs_browser(pass, "pointer target size")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(check: fn(&PageContext, Pass) -> Evaluation, html: &str) -> Evaluation {
        let ctx = PageContext::parse(html).unwrap();
        check(&ctx, Pass::Raw)
    }

    fn titled(title: &str) -> Evaluation {
        let html = format!("<html><head><title>{title}</title></head><body></body></html>");
        let ctx = PageContext::parse(&html).unwrap();
        page_titled(&ctx, Pass::Raw)
    }

    #[test]
    fn placeholder_and_short_titles_fail() {
        for title in ["Inicio", "Home", "1234", "123", "Untitled", ""] {
            let eval = titled(title);
            assert_eq!(eval.verdict, Verdict::Fail, "{title:?}");
            assert_eq!(eval.score_hint, Some(0.0));
        }
    }

    #[test]
    fn descriptive_titles_pass_and_long_ones_are_flagged() {
        let eval = titled("Trámites en línea - Ministerio de Salud");
        assert_eq!(eval.verdict, Verdict::Pass);
        assert_eq!(eval.details["too_long"], json!(false));

        let long = "Portal ".repeat(20);
        let eval = titled(long.trim());
        assert_eq!(eval.verdict, Verdict::Pass);
        assert_eq!(eval.details["too_long"], json!(true));
    }

    #[test]
    fn keyboard_reachability() {
        let native = run(keyboard, r#"<button onclick="buscar()">Buscar</button><a href="/">Inicio</a>"#);
        assert_eq!(native.verdict, Verdict::Pass);

        let repaired = run(keyboard, r#"<div onclick="abrir()" role="button" tabindex="0">Abrir</div>"#);
        assert_eq!(repaired.verdict, Verdict::Pass);

        let mouse_only = run(keyboard, r#"<div onclick="abrir()">Abrir</div>"#);
        assert_eq!(mouse_only.verdict, Verdict::Partial);
        assert_eq!(mouse_only.details["onclick_noninteractive"], 1);

        let reordered = run(keyboard, &r#"<span tabindex="2">x</span>"#.repeat(6));
        assert_eq!(reordered.verdict, Verdict::Fail);
        assert_eq!(reordered.details["tabindex_gt0"], 6);
    }

    #[test]
    fn blocks_can_be_bypassed() {
        assert_eq!(run(bypass_blocks, "<main><p>Contenido</p></main>").verdict, Verdict::Pass);
        let skip = run(bypass_blocks, r##"<a href="#contenido">Saltar al contenido</a><div id="contenido"></div>"##);
        assert_eq!(skip.verdict, Verdict::Pass);
        assert_eq!(run(bypass_blocks, "<div><p>Contenido</p></div>").verdict, Verdict::Fail);
    }

    #[test]
    fn links_describe_their_destination() {
        let good = run(link_purpose, r#"<a href="/tramites">Trámites en línea</a><a href="/c" aria-label="Contacto"></a>"#);
        assert_eq!(good.verdict, Verdict::Pass);

        let half = run(link_purpose, r#"<a href="/tramites">Trámites en línea</a><a href="/n">Leer más</a>"#);
        assert_eq!(half.verdict, Verdict::Partial);
        assert_eq!(half.details["ok_ratio"], 0.5);

        let bad = run(link_purpose, r#"<a href="/a">aquí</a><a href="https://gob.pe/x">https://gob.pe/x</a>"#);
        assert_eq!(bad.verdict, Verdict::Fail);

        assert_eq!(run(link_purpose, "<p>Sin enlaces</p>").verdict, Verdict::Na);
    }

    #[test]
    fn headings_and_labels_are_descriptive() {
        let good = run(
            headings_and_labels,
            r#"<h2>Requisitos del trámite</h2><label for="dni">Número de DNI</label><input id="dni">"#,
        );
        assert_eq!(good.verdict, Verdict::Pass);

        let empty = run(headings_and_labels, "<h2>Requisitos del trámite</h2><h3></h3>");
        assert_eq!(empty.verdict, Verdict::Partial);
        assert_eq!(empty.details["headings_empty"], 1);

        let generic = run(headings_and_labels, r#"<h2>Sección 2</h2><input type="text" placeholder="Enviar">"#);
        assert_eq!(generic.verdict, Verdict::Fail);
        assert_eq!(generic.details["labels_generic"], 1);

        assert_eq!(run(headings_and_labels, "<p>Texto</p>").verdict, Verdict::Na);
    }
}
