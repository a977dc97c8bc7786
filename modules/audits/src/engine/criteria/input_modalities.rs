//! Guideline 2.5: Input Modalities, except target size

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Value};

use crate::contract::Verdict;
use crate::engine::context::{Element, PageContext};
use crate::engine::css;
use crate::engine::outcome::{ratio_verdict, Evaluation};

use super::{accessible_name, cached_match, details, fold, has_control, judged, note, ratio, Pass, MAX_OFFENDERS};

static DRAG_CLASS: OnceLock<Option<Regex>> = OnceLock::new();
static GESTURE_TEXT: OnceLock<Option<Regex>> = OnceLock::new();
static ESSENTIAL_PATH: OnceLock<Option<Regex>> = OnceLock::new();
static POINTER_ALTERNATIVE: OnceLock<Option<Regex>> = OnceLock::new();

fn gesture_widget(el: &Element) -> bool {
    if matches!(el.tag.as_str(), "html" | "body" | "head" | "script" | "style") {
        return false;
    }
    let blob = format!(
        "{} {} {}",
        el.attr("title").unwrap_or_default(),
        el.attr("aria-label").unwrap_or_default(),
        el.text
    );
    cached_match(
        &DRAG_CLASS,
        r"(?i)(drag|sortable|resizable|slider|panzoom|pan-zoom|swipe|carousel|slick|swiper|flickity|glide|mapbox|leaflet)",
        el.class(),
    ) || el.attr("draggable").is_some_and(|v| v.eq_ignore_ascii_case("true"))
        || cached_match(
            &GESTURE_TEXT,
            r"(?i)\b(desliza|arrastra|mant[eé]n pulsado|swipe|drag|pinch|pellizca|zoom con dos dedos)\b",
            &blob,
        )
}

/// 2.5.1 Pointer Gestures
pub fn pointer_gestures(ctx: &PageContext, pass: Pass) -> Evaluation {
    let page_alternative = has_control(
        ctx,
        &POINTER_ALTERNATIVE,
        r"(?i)(prev|next|siguiente|anterior|zoom|^\s*[+\-]\s*$|\bm[aá]s\b|\bmenos\b|reset|reinici)",
    );
    let mut candidates = 0usize;
    let mut essential_like = 0usize;
    let mut with_alternative = 0usize;
    let mut violations = 0usize;
    let mut offenders = Vec::new();

    for el in ctx.elements.iter().filter(|el| gesture_widget(el)) {
        candidates += 1;
        let blob = format!(
            "{} {} {} {} {}",
            el.class(),
            el.role(),
            el.attr("title").unwrap_or_default(),
            el.attr("aria-label").unwrap_or_default(),
            el.text
        );
        if el.tag == "canvas"
            || cached_match(&ESSENTIAL_PATH, r"(?i)(signature|firma|lienzo|canvas|draw|dibujo|paint|pintar)", &blob)
        {
            essential_like += 1;
            continue;
        }
        if page_alternative || el.flag("data-has-alternative") {
            with_alternative += 1;
        } else {
            violations += 1;
            if offenders.len() < MAX_OFFENDERS {
                let mut o = el.describe();
                o["reason"] = json!("Path or multipoint gesture without single-pointer controls.");
                offenders.push(o);
            }
        }
    }

    let d = details(json!({
        "candidates_found": candidates,
        "essential_like": essential_like,
        "with_alternative": with_alternative,
        "violations": violations,
        "ok_ratio": ratio(with_alternative, candidates - essential_like),
        "offenders": offenders,
        "note": note(pass, "multipoint or path-based gestures need a single-pointer alternative unless the path is essential."),
    }));
    judged(d, violations == 0)
}

const DOWN_HANDLERS: &[&str] = &["onmousedown", "ontouchstart", "onpointerdown"];
const UP_HANDLERS: &[&str] = &["onclick", "onmouseup", "ontouchend", "onpointerup"];

static RISKY_DOWN: OnceLock<Option<Regex>> = OnceLock::new();

fn pointer_target(el: &Element) -> bool {
    match el.tag.as_str() {
        "button" => true,
        "input" => el.input_type() != "hidden",
        "a" if el.has_attr("href") => true,
        _ => {
            (matches!(el.role().as_str(), "button" | "link" | "tab" | "menuitem" | "switch")
                && (el.has_attr("href") || el.has_attr("tabindex")))
                || DOWN_HANDLERS.iter().chain(UP_HANDLERS).any(|h| el.has_attr(h))
        }
    }
}

/// 2.5.2 Pointer Cancellation
pub fn pointer_cancellation(ctx: &PageContext, pass: Pass) -> Evaluation {
    let mut examined = 0usize;
    let mut risky = 0usize;
    let mut offenders = Vec::new();
    for el in ctx.elements.iter().filter(|el| pointer_target(el)) {
        examined += 1;
        let down: Vec<Value> = DOWN_HANDLERS
            .iter()
            .filter_map(|h| el.attr(h).map(|code| (h, code)))
            .filter(|(_, code)| {
                cached_match(
                    &RISKY_DOWN,
                    r"(?i)(location\.href|window\.location|document\.location|submit\(|dispatchevent\(|click\(\))",
                    code,
                )
            })
            .map(|(h, code)| json!({ "attr": h, "snippet": code.chars().take(160).collect::<String>() }))
            .collect();
        if !down.is_empty() {
            risky += 1;
            if offenders.len() < MAX_OFFENDERS {
                let mut o = el.describe();
                o["handlers"] = json!(down);
                o["reason"] = json!("Action completes on the down-event, so it cannot be aborted.");
                offenders.push(o);
            }
        }
    }
    let d = details(json!({
        "applicable": usize::from(examined > 0),
        "targets_examined": examined,
        "risky_down_handlers": risky,
        "safe_or_unknown": examined - risky,
        "violations": risky,
        "ok_ratio": if risky == 0 { 1.0 } else { 0.0 },
        "offenders": offenders,
        "note": note(pass, "single-pointer actions should complete on the up-event or be abortable or undoable."),
    }));
    judged(d, risky == 0)
}

fn tokens(text: &str) -> Vec<String> {
    text.chars()
        .map(fold)
        .collect::<String>()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// All of `needle` appears in `hay`, in order
fn in_order(needle: &[String], hay: &[String]) -> bool {
    let mut wanted = needle.iter().peekable();
    for word in hay {
        if wanted.peek().is_some_and(|w| *w == word) {
            wanted.next();
        }
    }
    wanted.peek().is_none()
}

fn labelled_control(el: &Element) -> bool {
    match el.tag.as_str() {
        "input" => !matches!(el.input_type().as_str(), "hidden" | "image"),
        "button" | "a" | "select" | "textarea" => true,
        _ => matches!(
            el.role().as_str(),
            "button" | "link" | "textbox" | "combobox" | "listbox" | "switch" | "slider" | "tab" | "menuitem"
        ),
    }
}

/// 2.5.3 Label in Name
pub fn label_in_name(ctx: &PageContext, pass: Pass) -> Evaluation {
    let mut applicable = 0usize;
    let mut ok = 0usize;
    let mut missing_name = 0usize;
    let mut mismatch = 0usize;
    let mut offenders = Vec::new();

    for el in ctx.elements.iter().filter(|el| labelled_control(el)) {
        let visible = if matches!(el.tag.as_str(), "input" | "select" | "textarea") {
            el.attr_nonempty("id")
                .and_then(|id| ctx.labels_for.get(id))
                .cloned()
                .unwrap_or_default()
        } else if el.text.is_empty() {
            el.image_alt.clone()
        } else {
            el.text.clone()
        };
        let visible_tokens = tokens(&visible);
        if visible_tokens.is_empty() {
            continue;
        }
        applicable += 1;
        let name = accessible_name(ctx, el).unwrap_or_default();
        let name_tokens = tokens(&name);
        let reason = if name_tokens.is_empty() {
            missing_name += 1;
            Some("Control has a visible label but no accessible name.")
        } else if in_order(&visible_tokens, &name_tokens) {
            ok += 1;
            None
        } else {
            mismatch += 1;
            Some("Accessible name does not contain the visible label.")
        };
        if let (Some(reason), true) = (reason, offenders.len() < MAX_OFFENDERS) {
            let mut o = el.describe();
            o["visible"] = json!(visible);
            o["name"] = json!(name);
            o["reason"] = json!(reason);
            offenders.push(o);
        }
    }

    let ok_ratio = ratio(ok, applicable);
    let d = details(json!({
        "applicable": applicable,
        "ok": ok,
        "missing_name": missing_name,
        "mismatch": mismatch,
        "ratio": ok_ratio,
        "ok_ratio": ok_ratio,
        "offenders": offenders,
        "note": note(pass, "the accessible name must contain the visible label text, in the same order."),
    }));
    Evaluation::new(ratio_verdict(ok_ratio, 1.0, 0.8), d)
}

static MOTION_API: OnceLock<Option<Regex>> = OnceLock::new();
static MOTION_TEXT: OnceLock<Option<Regex>> = OnceLock::new();
static MOTION_ESSENTIAL: OnceLock<Option<Regex>> = OnceLock::new();
static MOTION_ALTERNATIVE: OnceLock<Option<Regex>> = OnceLock::new();
static MOTION_DISABLE: OnceLock<Option<Regex>> = OnceLock::new();

/// 2.5.4 Motion Actuation
pub fn motion_actuation(ctx: &PageContext, pass: Pass) -> Evaluation {
    let scripts = ctx.script_text();
    let text = &ctx.body_text;
    let uses_motion = cached_match(
        &MOTION_API,
        r"(?i)(devicemotion|deviceorientation|gyroscope|accelerometer|absoluteorientationsensor|linearaccelerationsensor|gravitysensor|magnetometer|shake\.js|orientation\s*sensor)",
        &scripts,
    ) || cached_match(
        &MOTION_TEXT,
        r"(?i)\b(inclina|mueve el dispositivo|sacude|agita|gira el dispositivo|tilt your|shake (your|the) (phone|device)|move your device)",
        text,
    );
    let candidates = usize::from(uses_motion);
    let mut essential_like = 0usize;
    let mut has_ui_alternative = 0usize;
    let mut has_disable = 0usize;
    let mut violations = 0usize;
    let mut offenders = Vec::new();
    if uses_motion {
        let blob = format!("{text} {scripts}");
        essential_like = usize::from(cached_match(
            &MOTION_ESSENTIAL,
            r"(?i)(pedometer|pod[oó]metro|medidor\s*de\s*pasos|juego\s*de\s*equilibrio|app\s*de\s*br[uú]jula|medir\s*orientaci[oó]n)",
            &blob,
        ));
        has_ui_alternative = usize::from(cached_match(
            &MOTION_ALTERNATIVE,
            r"(?i)(bot[oó]n|button|tocar|\btap\b|\bclic|click|usar controles|controles)",
            text,
        ));
        has_disable = usize::from(cached_match(
            &MOTION_DISABLE,
            r"(?i)(desactiv(a|ar)|apagar|disable|\boff\b|bloquear\s*movimiento|sin\s*movimiento)",
            text,
        ));
        if essential_like == 0 && (has_ui_alternative == 0 || has_disable == 0) {
            violations = 1;
            offenders.push(json!({
                "reason": "Device motion operates the page without both a UI alternative and a way to turn it off.",
                "has_ui_alternative": has_ui_alternative == 1,
                "has_disable": has_disable == 1,
            }));
        }
    }
    let d = details(json!({
        "candidates": candidates,
        "essential_like": essential_like,
        "has_ui_alternative": has_ui_alternative,
        "has_disable": has_disable,
        "violations": violations,
        "ok_ratio": if violations > 0 { 0.0 } else { 1.0 },
        "offenders": offenders,
        "note": note(pass, "functions operated by device motion need a UI alternative and a way to disable motion response."),
    }));
    judged(d, violations == 0)
}

static INPUT_RESTRICTION_TEXT: OnceLock<Option<Regex>> = OnceLock::new();
static INPUT_BLOCKING_SCRIPT: OnceLock<Option<Regex>> = OnceLock::new();

/// 2.5.6 Concurrent Input Mechanisms
pub fn concurrent_input_mechanisms(ctx: &PageContext, pass: Pass) -> Evaluation {
    let mut offenders = Vec::new();
    if cached_match(
        &INPUT_RESTRICTION_TEXT,
        r"(?i)(solo\s*t[aá]ctil|touch\s*only|solo\s*touch|no\s*rat[oó]n|no\s*mouse|solo\s*rat[oó]n|mouse\s*only|no\s*t[aá]ctil|no\s*touch|no\s*teclado|keyboard\s*disabled|sin\s*teclado)",
        &ctx.body_text,
    ) {
        offenders.push(json!({ "kind": "text", "reason": "Page text restricts the input modality." }));
    }
    let scripts = ctx.scripts.join("\n");
    if cached_match(
        &INPUT_BLOCKING_SCRIPT,
        r#"(?is)((document|window)\.addeventlistener\(\s*['"](keydown|keypress)['"][^;]{0,200}preventdefault\(\)|document\.onkeydown\s*=\s*function[^}]{0,80}return\s+false|addeventlistener\(\s*['"](touchstart|touchend|mousedown)['"][^;]{0,200}preventdefault\(\))"#,
        &scripts,
    ) {
        offenders.push(json!({ "kind": "script", "reason": "Script cancels a whole input modality." }));
    }
    let blocking_rules: Vec<String> = ctx
        .styles
        .iter()
        .flat_map(|s| css::rules(s))
        .filter(|r| r.targets(&["html", "body"]) || r.selector.trim() == "*")
        .filter(|r| {
            [("pointer-events", "none"), ("touch-action", "none")]
                .iter()
                .any(|(p, v)| r.declaration(p).is_some_and(|d| d.eq_ignore_ascii_case(v)))
        })
        .map(|r| r.selector)
        .collect();
    if !blocking_rules.is_empty() {
        offenders.push(json!({
            "kind": "css",
            "selectors": blocking_rules,
            "reason": "Page-wide CSS disables pointer or touch input.",
        }));
    }
    let risks = offenders.len();
    let d = details(json!({
        "applicable": 1,
        "risks_detected": risks,
        "ok_ratio": if risks > 0 { 0.0 } else { 1.0 },
        "offenders": offenders,
        "note": note(pass, "content must not restrict use of the input modalities the platform offers."),
    }));
    let verdict = if risks == 0 { Verdict::Pass } else { Verdict::Fail };
    Evaluation::new(verdict, d)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(check: fn(&PageContext, Pass) -> Evaluation, html: &str) -> Evaluation {
        let ctx = PageContext::parse(html).unwrap();
        check(&ctx, Pass::Raw)
    }

    #[test]
    fn sliders_need_single_pointer_controls() {
        assert_eq!(run(pointer_gestures, "<p>x</p>").verdict, Verdict::Pass);

        let bare = r#"<div class="swiper"></div>"#;
        let eval = run(pointer_gestures, bare);
        assert_eq!(eval.details["violations"], json!(1));
        assert_eq!(eval.verdict, Verdict::Fail);

        let with_buttons = r#"<div class="swiper"></div><button>Anterior</button><button>Siguiente</button>"#;
        assert_eq!(run(pointer_gestures, with_buttons).verdict, Verdict::Pass);

        let signature = r#"<canvas class="signature-pad" draggable="true"></canvas>"#;
        let eval = run(pointer_gestures, signature);
        assert_eq!(eval.details["essential_like"], json!(1));
        assert_eq!(eval.verdict, Verdict::Pass);
    }

    #[test]
    fn navigation_on_mousedown_cannot_be_cancelled() {
        assert_eq!(run(pointer_cancellation, r#"<button onclick="go()">Ir</button>"#).verdict, Verdict::Pass);
        let html = r#"<div role="button" tabindex="0" onmousedown="window.location='/x'">Ir</div>"#;
        let eval = run(pointer_cancellation, html);
        assert_eq!(eval.details["risky_down_handlers"], json!(1));
        assert_eq!(eval.verdict, Verdict::Fail);
    }

    #[test]
    fn accessible_name_contains_visible_label() {
        let ok = r#"<button aria-label="Buscar trámites">Buscar</button><label for="q">Correo</label><input id="q">"#;
        assert_eq!(run(label_in_name, ok).verdict, Verdict::Pass);

        let html = r#"<button aria-label="Enviar">Buscar</button><button>Uno</button><button>Dos</button><button>Tres</button><button>Cuatro</button>"#;
        let eval = run(label_in_name, html);
        assert_eq!(eval.details["mismatch"], json!(1));
        assert_eq!(eval.verdict, Verdict::Partial);

        let html = r#"<button aria-label="Enviar">Buscar</button><button>Uno</button>"#;
        assert_eq!(run(label_in_name, html).verdict, Verdict::Fail);
        assert!(in_order(&tokens("Más información"), &tokens("mas informacion sobre tramites")));
    }

    #[test]
    fn shake_to_undo_needs_alternative_and_off_switch() {
        assert_eq!(run(motion_actuation, "<p>x</p>").verdict, Verdict::Pass);
        let shake = "<script>window.addEventListener('devicemotion', undo)</script><p>Agita el teléfono para deshacer.</p>";
        assert_eq!(run(motion_actuation, shake).verdict, Verdict::Fail);
        let both = "<script>window.addEventListener('devicemotion', undo)</script><p>Agita o usa el botón Deshacer. Puedes desactivar el movimiento.</p>";
        assert_eq!(run(motion_actuation, both).verdict, Verdict::Pass);
    }

    #[test]
    fn page_wide_input_blocking() {
        assert_eq!(run(concurrent_input_mechanisms, "<p>Hola</p>").verdict, Verdict::Pass);
        let css = "<style>body { touch-action: none }</style>";
        let eval = run(concurrent_input_mechanisms, css);
        assert_eq!(eval.details["risks_detected"], json!(1));
        assert_eq!(eval.verdict, Verdict::Fail);
        let scoped_css = "<style>.overlay { pointer-events: none }</style>";
        assert_eq!(run(concurrent_input_mechanisms, scoped_css).verdict, Verdict::Pass);
    }
}
