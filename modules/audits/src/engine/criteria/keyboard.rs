//! Guideline 2.1: Keyboard Accessible, beyond the basic 2.1.1 check

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::json;

use crate::engine::context::{Element, PageContext};
use crate::engine::outcome::Evaluation;

use super::{cached_match, details, natively_interactive, note, ratio, scoped, Pass, MAX_OFFENDERS};

const ZONE_ROLES: &[&str] = &[
    "dialog", "alertdialog", "menu", "listbox", "tree", "grid", "tabpanel", "tooltip", "combobox",
];
const ZONE_CLASSES: &[&str] = &[
    "modal", "dialog", "drawer", "offcanvas", "popover", "dropdown", "menu", "tooltip",
];
const FOCUS_TRAP_HINTS: &[&str] = &[
    "focus-trap", "focus_trap", "focus-lock", "focuslock", "cdk-focus-trap", "cdktrapfocus",
];

fn focus_zone(el: &Element) -> bool {
    let class = el.class().to_ascii_lowercase();
    ZONE_ROLES.contains(&el.role().as_str())
        || el.flag("aria-modal")
        || el.tag == "dialog"
        || class.split_whitespace().any(|c| ZONE_CLASSES.iter().any(|z| c == *z || c.starts_with(&format!("{z}-"))))
        || el.attrs.keys().any(|k| FOCUS_TRAP_HINTS.iter().any(|h| k.contains(h)))
}

fn traps_tab(el: &Element) -> bool {
    el.flag("aria-modal")
        || el.flag("data-trap-focus")
        || el.attrs.keys().any(|k| FOCUS_TRAP_HINTS.iter().any(|h| k.contains(h)))
        || FOCUS_TRAP_HINTS.iter().any(|h| el.class().to_ascii_lowercase().contains(h))
}

static ESCAPE_KEY: OnceLock<Option<Regex>> = OnceLock::new();
static TAB_PREVENTED: OnceLock<Option<Regex>> = OnceLock::new();
static CLOSE_CONTROL: OnceLock<Option<Regex>> = OnceLock::new();

/// 2.1.2 No Keyboard Trap
pub fn no_keyboard_trap(ctx: &PageContext, pass: Pass) -> Evaluation {
    let scripts = ctx.script_text();
    let handles_escape = cached_match(
        &ESCAPE_KEY,
        r#"(?i)(key\s*===?\s*['"](escape|esc)['"]|keycode\s*===?\s*27|which\s*===?\s*27)"#,
        &scripts,
    );
    let prevents_tab = cached_match(
        &TAB_PREVENTED,
        r#"(?is)(key\s*===?\s*['"]tab['"]|keycode\s*===?\s*9\b).{0,200}preventdefault"#,
        &scripts,
    );
    let close_control = super::has_control(
        ctx,
        &CLOSE_CONTROL,
        r"(?i)^\s*(close|cerrar|salir|×|✕|x)\s*$|\b(close|cerrar)\b",
    );
    let can_escape_page = handles_escape || close_control;

    let mut examined = 0usize;
    let mut pass_zones = 0usize;
    let mut unknown = 0usize;
    let mut violations = 0usize;
    let mut offenders = Vec::new();

    for zone in ctx.elements.iter().filter(|el| focus_zone(el)) {
        examined += 1;
        let can_escape = can_escape_page || zone.flag("data-esc-dismiss") || zone.flag("data-dismissible");
        let reason = if zone.flag("data-requires-pointer") {
            Some("Leaving the component requires a pointer.")
        } else if prevents_tab && !can_escape {
            Some("Tab is cancelled with no keyboard way out.")
        } else if traps_tab(zone) && !can_escape {
            Some("Focus cycles inside with no Escape or close control.")
        } else {
            None
        };
        match reason {
            Some(reason) => {
                violations += 1;
                if offenders.len() < MAX_OFFENDERS {
                    let mut o = zone.describe();
                    o["reason"] = json!(reason);
                    offenders.push(o);
                }
            }
            None if traps_tab(zone) => pass_zones += 1,
            None => unknown += 1,
        }
    }

    let d = details(json!({
        "zones_examined": examined,
        "applicable": examined,
        "pass_zones": pass_zones,
        "unknown": unknown,
        "violations": violations,
        "escape_handler": handles_escape,
        "close_control": close_control,
        "ok_ratio": ratio(examined - violations, examined),
        "offenders": offenders,
        "note": note(pass, "dialogs, menus and other focus-managing widgets must be leavable with the keyboard (Escape, close control, Tab)."),
    }));
    scoped(d, examined > 0, violations == 0)
}

const INTERACTIVE_ROLES_STRICT: &[&str] = &[
    "button", "link", "menuitem", "menuitemcheckbox", "menuitemradio", "checkbox", "radio",
    "switch", "tab", "tabpanel", "textbox", "combobox", "listbox", "option", "gridcell",
    "rowheader", "columnheader", "treeitem", "slider", "spinbutton", "dialog", "scrollbar",
];
const MOUSE_EVENTS: &[&str] = &[
    "onclick", "onmousedown", "onmouseup", "onmouseenter", "onmouseover", "ondblclick",
    "oncontextmenu", "ondragstart", "ondrop", "ondragover",
];
const FRAMEWORK_CLICK: &[&str] = &["data-onclick", "@click", "x-on:click", "(click)", "on:click", "v-on:click"];
const KEY_EVENTS: &[&str] = &["onkeydown", "onkeyup", "onkeypress"];
const FRAMEWORK_KEY: &[&str] = &["(keydown)", "(keyup)", "(keypress)", "@keydown", "@keyup", "x-on:keydown"];
const POINTER_PATH_EVENTS: &[&str] = &[
    "onmousemove", "onpointermove", "ontouchmove", "ondrag", "ondragstart", "ondragover", "ondragend",
];
const POINTER_PATH_HINTS: &[&str] = &[
    "drag", "draggable", "sortable", "draw", "signature", "canvas", "paint", "scribble", "slider",
    "carousel", "panzoom", "pan-zoom", "resize-handle",
];

fn native(el: &Element) -> bool {
    natively_interactive(el) && !(el.tag == "input" && el.input_type() == "hidden")
}

fn mouse_handler(el: &Element) -> bool {
    let class = el.class().to_ascii_lowercase();
    MOUSE_EVENTS.iter().chain(FRAMEWORK_CLICK).any(|e| el.has_attr(e))
        || ["btn", "button", "clickable", "cursor-pointer"]
            .iter()
            .any(|h| class.split_whitespace().any(|c| c == *h))
}

fn key_handler(el: &Element) -> bool {
    KEY_EVENTS.iter().chain(FRAMEWORK_KEY).any(|e| el.has_attr(e))
}

fn pointer_path(el: &Element) -> bool {
    if POINTER_PATH_EVENTS.iter().any(|e| el.has_attr(e)) {
        return true;
    }
    let hay = format!("{} {} {}", el.class(), el.id(), el.attr("name").unwrap_or_default()).to_ascii_lowercase();
    if POINTER_PATH_HINTS.iter().any(|h| hay.contains(h)) {
        return true;
    }
    if matches!(el.tag.as_str(), "canvas" | "svg") && mouse_handler(el) {
        return true;
    }
    matches!(el.role().as_str(), "slider" | "scrollbar") && !key_handler(el) && el.input_type() != "range"
}

/// 2.1.3 Keyboard (No Exception)
pub fn keyboard_no_exception(ctx: &PageContext, pass: Pass) -> Evaluation {
    let mut examined = 0usize;
    let mut applicable = 0usize;
    let mut keyboard_ok = 0usize;
    let mut fails_focus = 0usize;
    let mut fails_no_key_handler = 0usize;
    let mut fails_pointer_path = 0usize;
    let mut offenders = Vec::new();
    let mut push = |el: &Element, reason: &str| {
        if offenders.len() < MAX_OFFENDERS {
            let mut o = el.describe();
            o["reason"] = json!(reason);
            offenders.push(o);
        }
    };

    for el in &ctx.elements {
        examined += 1;
        if el.has_attr("disabled") || el.flag("aria-disabled") || el.flag("aria-hidden") || el.has_attr("inert") {
            continue;
        }
        let role_interactive = INTERACTIVE_ROLES_STRICT.contains(&el.role().as_str());
        if !(native(el) || role_interactive || mouse_handler(el)) {
            continue;
        }
        applicable += 1;
        let tabindex = el.tabindex();
        let focusable = !tabindex.is_some_and(|t| t < 0)
            && (native(el) || role_interactive || tabindex.is_some_and(|t| t >= 0));
        if !focusable {
            fails_focus += 1;
            push(el, "Actionable element that cannot receive keyboard focus.");
            continue;
        }
        let has_key = key_handler(el) || native(el);
        if !has_key && mouse_handler(el) {
            fails_no_key_handler += 1;
            push(el, "Pointer handler without a keyboard equivalent.");
        }
        if !has_key && pointer_path(el) {
            fails_pointer_path += 1;
            push(el, "Path-based pointer interaction without a keyboard alternative.");
        }
        if has_key {
            keyboard_ok += 1;
        }
    }

    let violations = fails_focus + fails_no_key_handler + fails_pointer_path;
    let d = details(json!({
        "examined": examined,
        "applicable": applicable,
        "keyboard_ok": keyboard_ok,
        "fails_focus": fails_focus,
        "fails_no_key_handler": fails_no_key_handler,
        "fails_pointer_path_no_kb": fails_pointer_path,
        "violations": violations,
        "ok_ratio": ratio(keyboard_ok, applicable),
        "offenders": offenders,
        "note": note(pass, "all functionality must work from a keyboard with no timing or path exception."),
    }));
    scoped(d, applicable > 0, violations == 0)
}

static KEY_EQ_CHAR: OnceLock<Option<Regex>> = OnceLock::new();
static KEY_CODE_EQ: OnceLock<Option<Regex>> = OnceLock::new();
static HAS_MODIFIER: OnceLock<Option<Regex>> = OnceLock::new();
static SCOPED_TO_FOCUS: OnceLock<Option<Regex>> = OnceLock::new();
static GLOBAL_LISTENER: OnceLock<Option<Regex>> = OnceLock::new();

/// Single printable character a handler reacts to, from `e.key === "x"` or a key code
fn single_char_keys(code: &str) -> BTreeSet<String> {
    let mut keys = BTreeSet::new();
    let key_eq = KEY_EQ_CHAR.get_or_init(|| {
        Regex::new(r#"(?i)(?:event|evt|e)\.key\s*===?\s*['"]([^'"])['"]"#).ok()
    });
    if let Some(re) = key_eq {
        for cap in re.captures_iter(code) {
            if let Some(k) = cap.get(1).map(|m| m.as_str()) {
                if k.chars().all(|c| !c.is_control()) {
                    keys.insert(k.to_lowercase());
                }
            }
        }
    }
    let key_code = KEY_CODE_EQ.get_or_init(|| {
        Regex::new(r"(?i)(?:event|evt|e)\.(?:keycode|which)\s*===?\s*(\d{1,3})").ok()
    });
    if let Some(re) = key_code {
        for cap in re.captures_iter(code) {
            let Some(n) = cap.get(1).and_then(|m| m.as_str().parse::<u8>().ok()) else {
                continue;
            };
            match n {
                65..=90 => {
                    keys.insert(char::from(n).to_ascii_lowercase().to_string());
                }
                48..=57 | 32 => {
                    keys.insert(char::from(n).to_string());
                }
                _ => {}
            }
        }
    }
    keys
}

/// 2.1.4 Character Key Shortcuts
pub fn character_key_shortcuts(ctx: &PageContext, pass: Pass) -> Evaluation {
    // (source, code, attached to an element)
    let mut handlers: Vec<(String, String, bool)> = ctx
        .scripts
        .iter()
        .enumerate()
        .map(|(i, s)| (format!("script[{i}]"), s.to_ascii_lowercase(), false))
        .collect();
    for el in &ctx.elements {
        for (name, code) in el.event_handlers().filter(|(n, _)| n.starts_with("onkey")) {
            let global = matches!(el.tag.as_str(), "body" | "html");
            handlers.push((format!("{}@{name}", el.tag), code.to_ascii_lowercase(), !global));
        }
    }
    let toggle = ctx.elements.iter().any(|el| {
        el.has_attr("data-shortcuts-toggle")
            || el.class().to_ascii_lowercase().contains("shortcuts-toggle")
    });

    let mut examined = 0usize;
    let mut single_char_total = 0usize;
    let mut with_modifiers = 0usize;
    let mut scoped_only = 0usize;
    let mut violations = 0usize;
    let mut offenders = Vec::new();

    for (source, code, on_element) in &handlers {
        if !code.contains("key") {
            continue;
        }
        examined += 1;
        let keys = single_char_keys(code);
        if keys.is_empty() {
            continue;
        }
        single_char_total += 1;
        let modifier = cached_match(
            &HAS_MODIFIER,
            r"(?i)(ctrlkey|metakey|altkey)\s*===?\s*true|(?:event|evt|e)\.(ctrlkey|metakey|altkey)",
            code,
        );
        let focus_scoped = *on_element
            || cached_match(&SCOPED_TO_FOCUS, r"(?i)(currenttarget|activeelement|:focus)", code);
        let global = !*on_element
            && cached_match(
                &GLOBAL_LISTENER,
                r#"(?i)(document|window|body)\s*\.\s*(addeventlistener\s*\(\s*['"]key(down|up|press)|onkey(down|up|press)\s*=)"#,
                code,
            );
        with_modifiers += usize::from(modifier);
        scoped_only += usize::from(focus_scoped);
        if !modifier && global && !focus_scoped && !toggle {
            violations += 1;
            if offenders.len() < MAX_OFFENDERS {
                offenders.push(json!({
                    "source": source,
                    "keys": keys,
                    "reason": "Document-wide single character shortcut with no modifier, toggle or remapping.",
                }));
            }
        }
    }

    let accesskeys = ctx.elements.iter().filter(|el| el.attr_nonempty("accesskey").is_some()).count();
    let d = details(json!({
        "shortcuts_examined": examined,
        "applicable": single_char_total,
        "single_char_total": single_char_total,
        "with_modifiers": with_modifiers,
        "scoped_only": scoped_only,
        "with_disable": usize::from(toggle) * single_char_total,
        "accesskeys": accesskeys,
        "violations": violations,
        "ok_ratio": ratio(single_char_total - violations, single_char_total),
        "offenders": offenders,
        "note": note(pass, "single character shortcuts need a way to turn them off, remap them, or must be active only on focus. accesskey needs a modifier and is reported only."),
    }));
    scoped(d, single_char_total > 0, violations == 0)
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
    fn modal_without_escape_traps_focus() {
        assert_eq!(run(no_keyboard_trap, "<p>x</p>").verdict, Verdict::Na);

        let trapped = run(
            no_keyboard_trap,
            r#"<div role="dialog" aria-modal="true"><input></div>"#,
        );
        assert_eq!(trapped.details["violations"], json!(1));
        assert_eq!(trapped.verdict, Verdict::Fail);

        let closable = run(
            no_keyboard_trap,
            r#"<div role="dialog" aria-modal="true"><button aria-label="Cerrar">×</button></div>"#,
        );
        assert_eq!(closable.details["pass_zones"], json!(1));
        assert_eq!(closable.verdict, Verdict::Pass);
    }

    #[test]
    fn clickable_divs_need_focus_and_keys() {
        let ok = run(keyboard_no_exception, r#"<button>Enviar</button><a href="/">Inicio</a>"#);
        assert_eq!(ok.verdict, Verdict::Pass);

        let html = r#"<button>Enviar</button><div onclick="go()">Ir</div>"#;
        let eval = run(keyboard_no_exception, html);
        assert_eq!(eval.details["fails_focus"], json!(1));
        assert_eq!(eval.verdict, Verdict::Partial);

        let html = r#"<span role="button" onclick="go()" tabindex="0">Ir</span>"#;
        let eval = run(keyboard_no_exception, html);
        assert_eq!(eval.details["fails_no_key_handler"], json!(1));
        assert_eq!(eval.verdict, Verdict::Fail);
    }

    #[test]
    fn single_key_shortcuts() {
        assert_eq!(run(character_key_shortcuts, "<p>x</p>").verdict, Verdict::Na);

        let global = r#"<script>document.addEventListener('keydown', function (e) { if (e.key === 's') search(); });</script>"#;
        let eval = run(character_key_shortcuts, global);
        assert_eq!(eval.details["violations"], json!(1));
        assert_eq!(eval.verdict, Verdict::Fail);

        let modified = r#"<script>document.addEventListener('keydown', function (e) { if (e.ctrlKey && e.key === 's') save(); });</script>"#;
        assert_eq!(run(character_key_shortcuts, modified).verdict, Verdict::Pass);

        let code = r#"<script>window.onkeydown = function (e) { if (e.keyCode === 75) next(); };</script>"#;
        let eval = run(character_key_shortcuts, code);
        assert_eq!(eval.details["offenders"][0]["keys"], json!(["k"]));
    }
}
