//! Principle 4: Robust

use serde_json::{json, Value};

use crate::contract::Verdict;
use crate::engine::context::{Element, PageContext};
use crate::engine::outcome::{ratio_verdict, Evaluation};

use super::{accessible_name, details, note, ratio, Pass, MAX_OFFENDERS};

/// 4.1.1 Parsing
pub fn parsing(ctx: &PageContext, pass: Pass) -> Evaluation {
    let verdict = if ctx.duplicate_ids.is_empty() {
        Verdict::Pass
    } else {
        Verdict::Fail
    };
    let d = details(json!({
        "duplicate_ids": ctx.duplicate_ids,
        "elements_total": ctx.elements.len(),
        "note": note(pass, "ids must be unique within the document."),
    }));
    Evaluation::new(verdict, d)
}

const WIDGET_ROLES: &[&str] = &[
    "button", "link", "checkbox", "radio", "switch", "tab", "menuitem", "combobox", "slider",
    "textbox", "option",
];

fn needs_name(el: &Element) -> bool {
    if el.flag("aria-hidden") || el.has_attr("hidden") {
        return false;
    }
    match el.tag.as_str() {
        "button" | "iframe" | "select" | "textarea" => true,
        "a" => el.has_attr("href"),
        "input" => !matches!(
            el.attr("type").unwrap_or_default().to_ascii_lowercase().as_str(),
            "hidden"
        ),
        _ => WIDGET_ROLES.contains(&el.role().as_str()),
    }
}

/// 4.1.2 Name, Role, Value
pub fn name_role_value(ctx: &PageContext, pass: Pass) -> Evaluation {
    let mut applicable = 0usize;
    let mut violations = 0usize;
    let mut offenders = Vec::new();

    for el in ctx.elements.iter().filter(|e| needs_name(e)) {
        applicable += 1;
        let named = el.in_label || accessible_name(ctx, el).is_some();
        if !named {
            violations += 1;
            if offenders.len() < MAX_OFFENDERS {
                let mut o = el.describe();
                o["role"] = json!(el.role());
                o["reason"] = json!("Interactive element without an accessible name.");
                offenders.push(o);
            }
        }
    }

    let ok_ratio = ratio(applicable - violations, applicable);
    let mut d = details(json!({
        "applicable": applicable,
        "violations": violations,
        "ok_ratio": ok_ratio,
        "offenders": offenders,
        "note": note(pass, "links, buttons, form controls, frames and ARIA widgets need an accessible name."),
    }));
    let verdict = if applicable == 0 {
        d.insert("na".into(), Value::Bool(true));
        Verdict::Na
    } else {
        ratio_verdict(ok_ratio, 1.0, 0.3)
    };
    Evaluation::new(verdict, d)
}

const STATUS_HINTS: &[&str] = &[
    "alert", "toast", "notification", "snackbar", "status", "message", "error", "success",
    "mensaje", "aviso",
];

fn announced(el: &Element) -> bool {
    matches!(el.role().as_str(), "status" | "alert" | "log" | "progressbar")
        || el.attr_nonempty("aria-live").is_some_and(|v| v != "off")
}

/// 4.1.3 Status Messages
pub fn status_messages(ctx: &PageContext, pass: Pass) -> Evaluation {
    if pass == Pass::Raw {
        return Evaluation::na("RAW: status messages are injected at runtime; judged on the rendered page.");
    }

    let mut candidates = 0usize;
    let mut misannotated = Vec::new();
    for el in &ctx.elements {
        let hay = format!("{} {}", el.id(), el.attr("class").unwrap_or_default()).to_lowercase();
        let looks_status = STATUS_HINTS.iter().any(|h| hay.contains(h));
        if !(looks_status || announced(el)) {
            continue;
        }
        candidates += 1;
        if !announced(el) && misannotated.len() < MAX_OFFENDERS {
            let mut o = el.describe();
            o["reason"] = json!("Status-like container without role=status/alert or aria-live.");
            misannotated.push(o);
        }
    }

    let verdict = if candidates == 0 {
        Verdict::Na
    } else if misannotated.is_empty() {
        Verdict::Pass
    } else {
        Verdict::Partial
    };
    let mut d = details(json!({
        "candidates_all": candidates,
        "misannotated": misannotated,
        "note": note(pass, "status messages must be exposed through role=status/alert or aria-live."),
    }));
    if candidates == 0 {
        d.insert("na".into(), Value::Bool(true));
    }
    Evaluation::new(verdict, d)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(check: fn(&PageContext, Pass) -> Evaluation, pass: Pass, html: &str) -> Evaluation {
        let ctx = PageContext::parse(html).unwrap();
        check(&ctx, pass)
    }

    #[test]
    fn ids_are_unique() {
        assert_eq!(run(parsing, Pass::Raw, r#"<p id="a">x</p><p id="b">y</p>"#).verdict, Verdict::Pass);
        let dup = run(parsing, Pass::Raw, r#"<p id="a">x</p><p id="a">y</p>"#);
        assert_eq!(dup.verdict, Verdict::Fail);
        assert_eq!(dup.details["duplicate_ids"][0], "a");
    }

    #[test]
    fn widgets_need_names() {
        let ok = run(
            name_role_value,
            Pass::Raw,
            r#"<a href="/">Inicio</a><button aria-label="Cerrar"></button><div role="tab">Datos</div>"#,
        );
        assert_eq!(ok.verdict, Verdict::Pass);
        assert_eq!(ok.details["applicable"], 3);

        let some = run(
            name_role_value,
            Pass::Raw,
            r#"<a href="/">Inicio</a><a href="/a">A</a><button>Buscar</button><button></button>"#,
        );
        assert_eq!(some.verdict, Verdict::Partial);
        assert_eq!(some.details["violations"], 1);

        let bad = run(name_role_value, Pass::Raw, r#"<button></button><div role="switch"></div>"#);
        assert_eq!(bad.verdict, Verdict::Fail);

        let none = run(name_role_value, Pass::Raw, "<p>Texto</p>");
        assert_eq!(none.verdict, Verdict::Na);
        assert_eq!(none.details["na"], true);
    }

    #[test]
    fn status_regions_are_announced() {
        let html = r#"<div class="toast" role="status">Guardado</div>"#;
        assert_eq!(run(status_messages, Pass::Raw, html).verdict, Verdict::Na);
        assert_eq!(run(status_messages, Pass::Rendered, html).verdict, Verdict::Pass);

        let silent = run(status_messages, Pass::Rendered, r#"<div class="alert-box">Error</div>"#);
        assert_eq!(silent.verdict, Verdict::Partial);
        assert_eq!(run(status_messages, Pass::Rendered, "<p>x</p>").verdict, Verdict::Na);
    }
}
