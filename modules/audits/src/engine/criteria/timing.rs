//! Guideline 2.2: Enough Time
//!
//! Time limits, moving content and interruptions are not observable in a static
//! DOM, so these checks work from markers: `meta refresh`, countdown widgets,
//! class names, text cues and explicit `data-*` annotations a site can add
//! (`data-can-pause`, `data-can-extend`, `data-session-timeout`, ...).

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Value};

use crate::engine::context::{Element, PageContext};
use crate::engine::css;
use crate::engine::outcome::Evaluation;

use super::{cached_match, details, has_control, note, ratio, scoped, with_unknowns, Pass, MAX_OFFENDERS};

/// `meta refresh` delays at or above this are treated as no limit (20 hours)
const REFRESH_LIMIT_SECS: f64 = 72_000.0;

const TIMER_HINTS: &[&str] = &["countdown", "timer", "session-timer", "time-left", "timeleft", "expiry"];
const TIMER_ATTRS: &[&str] = &["data-countdown", "data-timeout", "data-time-limit", "data-expires"];

const MOVE_HINT_CLASSES: &[&str] = &[
    "marquee", "ticker", "carousel", "slider", "auto-slide", "auto_advance", "autoplay", "scroller",
    "scrolling", "animate", "moving", "blink", "typing",
];
const UPDATE_HINTS: &[&str] = &[
    "auto-update", "live-update", "feed-refresh", "news-ticker", "stock-ticker", "live-scores",
];

const INTERRUPTIVE_CLASS_HINTS: &[&str] = &[
    "modal", "dialog", "drawer", "offcanvas", "popover", "popup", "overlay", "toast", "snackbar",
    "notification", "banner", "interstitial", "newsletter", "subscribe", "chat-widget",
    "support-widget", "cookie-banner",
];

/// One timed, moving or interrupting thing found on the page
struct Candidate {
    kind: &'static str,
    source: Value,
    /// Fails whatever controls the page offers
    always_violates: bool,
    el: Option<usize>,
}

fn tokens(el: &Element) -> String {
    format!("{} {}", el.class(), el.id()).to_ascii_lowercase()
}

fn hinted(el: &Element, hints: &[&str]) -> bool {
    let hay = tokens(el);
    hints.iter().any(|h| hay.contains(h))
}

/// Delay in seconds of `<meta http-equiv="refresh" content="N; url=...">`
fn refresh_delay(ctx: &PageContext) -> Option<f64> {
    let content = ctx.meta("refresh")?;
    content.split([';', ',']).next()?.trim().parse().ok()
}

static TIME_TEXT: OnceLock<Option<Regex>> = OnceLock::new();

fn timing_candidates(ctx: &PageContext) -> Vec<Candidate> {
    let mut out = Vec::new();
    if let Some(delay) = refresh_delay(ctx) {
        if delay > 0.0 && delay < REFRESH_LIMIT_SECS {
            out.push(Candidate {
                kind: "meta_refresh",
                source: json!({ "delay_seconds": delay }),
                always_violates: true,
                el: None,
            });
        }
    }
    for (i, el) in ctx.elements.iter().enumerate() {
        if matches!(el.tag.as_str(), "html" | "body" | "script" | "style") {
            continue;
        }
        if TIMER_ATTRS.iter().any(|a| el.has_attr(a)) || hinted(el, TIMER_HINTS) {
            out.push(Candidate {
                kind: "timer_element",
                source: el.describe(),
                always_violates: false,
                el: Some(i),
            });
        }
    }
    if out.is_empty()
        && cached_match(
            &TIME_TEXT,
            r"(?i)\b(countdown|time left|time remaining|session expires|tiempo restante|expira en|cuenta atr[aá]s|timeout)\b",
            &ctx.body_text,
        )
    {
        out.push(Candidate {
            kind: "text_hint",
            source: json!({ "text": "time limit wording in page text" }),
            always_violates: false,
            el: None,
        });
    }
    out
}

fn push_offender(offenders: &mut Vec<Value>, c: &Candidate, reason: &str) {
    if offenders.len() < MAX_OFFENDERS {
        let mut o = c.source.clone();
        o["kind"] = json!(c.kind);
        o["reason"] = json!(reason);
        offenders.push(o);
    }
}

fn count_kinds(candidates: &[Candidate]) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for c in candidates {
        *counts.entry(c.kind).or_insert(0) += 1;
    }
    counts
}

static EXTEND_CONTROL: OnceLock<Option<Regex>> = OnceLock::new();

/// 2.2.1 Timing Adjustable
pub fn timing_adjustable(ctx: &PageContext, pass: Pass) -> Evaluation {
    let candidates = timing_candidates(ctx);
    let extend_control = has_control(
        ctx,
        &EXTEND_CONTROL,
        r"(?i)(extend|more time|add time|keep (me )?signed|stay signed|turn off|adjust|ampliar|extender|m[aá]s tiempo|prolongar|seguir conectad|continuar)",
    );

    let mut compliant = 0usize;
    let mut violations = 0usize;
    let mut offenders = Vec::new();
    for c in &candidates {
        let annotated = c
            .el
            .map(|i| &ctx.elements[i])
            .is_some_and(|el| el.flag("data-can-extend") || el.flag("data-adjustable"));
        if !c.always_violates && (extend_control || annotated) {
            compliant += 1;
        } else {
            violations += 1;
            let reason = if c.always_violates {
                "Timed refresh or redirect the user cannot adjust."
            } else {
                "Time limit without a control to turn off, adjust or extend it."
            };
            push_offender(&mut offenders, c, reason);
        }
    }

    let applicable = candidates.len();
    let d = details(json!({
        "timers_examined": applicable,
        "applicable": applicable,
        "compliant": compliant,
        "violations": violations,
        "extend_control": extend_control,
        "types_count": count_kinds(&candidates),
        "ok_ratio": ratio(compliant, applicable),
        "offenders": offenders,
        "note": note(pass, "each time limit needs a way to turn it off, adjust it or extend it."),
    }));
    scoped(d, applicable > 0, violations == 0)
}

static PAUSE_CONTROL: OnceLock<Option<Regex>> = OnceLock::new();

/// 2.2.2 Pause, Stop, Hide
pub fn pause_stop_hide(ctx: &PageContext, pass: Pass) -> Evaluation {
    let mut candidates = Vec::new();
    for (i, el) in ctx.elements.iter().enumerate() {
        let kind = match el.tag.as_str() {
            "marquee" => Some("marquee"),
            "blink" => Some("blink"),
            "img" if el.media_src().to_ascii_lowercase().split(['?', '#']).next().is_some_and(|p| p.ends_with(".gif")) => {
                Some("animated_gif")
            }
            "video" if el.has_attr("autoplay") && el.has_attr("loop") => Some("autoplay_video"),
            "html" | "body" => None,
            _ if hinted(el, UPDATE_HINTS) => Some("auto_update"),
            _ if hinted(el, MOVE_HINT_CLASSES) => Some("moving_class"),
            _ => None,
        };
        if let Some(kind) = kind {
            candidates.push(Candidate {
                kind,
                source: el.describe(),
                always_violates: false,
                el: Some(i),
            });
        }
    }
    let rules = ctx.styles.iter().flat_map(|s| css::rules(s)).collect::<Vec<_>>();
    let reduced_motion = rules
        .iter()
        .any(|r| r.media.as_deref().is_some_and(|m| m.contains("prefers-reduced-motion")));
    for rule in &rules {
        let infinite = ["animation", "animation-iteration-count"]
            .iter()
            .filter_map(|p| rule.declaration(p))
            .any(|v| v.to_ascii_lowercase().contains("infinite"));
        if infinite && rule.media.is_none() {
            candidates.push(Candidate {
                kind: "css_infinite_animation",
                source: json!({ "selector": rule.selector }),
                always_violates: false,
                el: None,
            });
        }
    }

    let pause_control = has_control(
        ctx,
        &PAUSE_CONTROL,
        r"(?i)\b(pause|stop|hide|pausar|detener|parar|ocultar)\b",
    );
    let mut compliant = 0usize;
    let mut violations = 0usize;
    let mut offenders = Vec::new();
    for c in &candidates {
        let el = c.el.map(|i| &ctx.elements[i]);
        let own_control = el.is_some_and(|el| {
            el.flag("data-can-pause") || (el.tag == "video" && el.has_attr("controls"))
        });
        let css_opt_out = c.kind == "css_infinite_animation" && reduced_motion;
        if pause_control || own_control || css_opt_out {
            compliant += 1;
        } else {
            violations += 1;
            push_offender(&mut offenders, c, "Moving, blinking or auto-updating content without pause, stop or hide.");
        }
    }

    let applicable = candidates.len();
    let d = details(json!({
        "items_examined": applicable,
        "applicable": applicable,
        "compliant": compliant,
        "violations": violations,
        "pause_control": pause_control,
        "reduced_motion_styles": reduced_motion,
        "types_count": count_kinds(&candidates),
        "ok_ratio": ratio(compliant, applicable),
        "offenders": offenders,
        "note": note(pass, "content that moves, blinks, scrolls or updates on its own needs a pause, stop or hide mechanism."),
    }));
    scoped(d, applicable > 0, violations == 0)
}

/// 2.2.3 No Timing
pub fn no_timing(ctx: &PageContext, pass: Pass) -> Evaluation {
    let candidates = timing_candidates(ctx);
    let mut offenders = Vec::new();
    for c in &candidates {
        push_offender(&mut offenders, c, "Timing is part of the content.");
    }
    let applicable = candidates.len();
    let d = details(json!({
        "timers_examined": applicable,
        "applicable": applicable,
        "violations": applicable,
        "types_count": count_kinds(&candidates),
        "ok_ratio": 0.0,
        "offenders": offenders,
        "note": note(pass, "at AAA no timing may be essential to the content, except real-time events and non-interactive media."),
    }));
    scoped(d, applicable > 0, applicable == 0)
}

/// 2.2.4 Interruptions
pub fn interruptions(ctx: &PageContext, pass: Pass) -> Evaluation {
    let mut applicable = 0usize;
    let mut compliant = 0usize;
    let mut violations = 0usize;
    let mut offenders = Vec::new();
    for el in &ctx.elements {
        if matches!(el.tag.as_str(), "html" | "body") {
            continue;
        }
        let interrupting = el.role() == "alertdialog"
            || el.attr("aria-live").is_some_and(|v| v.eq_ignore_ascii_case("assertive"))
            || el.class().to_ascii_lowercase().split_whitespace().any(|c| {
                INTERRUPTIVE_CLASS_HINTS.iter().any(|h| c == *h || c.starts_with(&format!("{h}-")) || c.ends_with(&format!("-{h}")))
            });
        if !interrupting {
            continue;
        }
        applicable += 1;
        let deferred = el.is_hidden()
            || el.flag("data-can-postpone")
            || el.flag("data-can-disable")
            || el.flag("data-emergency");
        if deferred {
            compliant += 1;
        } else {
            violations += 1;
            if offenders.len() < MAX_OFFENDERS {
                let mut o = el.describe();
                o["reason"] = json!("Shown on load with no way to postpone or suppress it.");
                offenders.push(o);
            }
        }
    }
    let d = details(json!({
        "items_examined": applicable,
        "applicable": applicable,
        "compliant": compliant,
        "violations": violations,
        "ok_ratio": ratio(compliant, applicable),
        "offenders": offenders,
        "note": note(pass, "interruptions other than emergencies must be postponable or suppressible by the user."),
    }));
    scoped(d, applicable > 0, violations == 0)
}

static SESSION_TEXT: OnceLock<Option<Regex>> = OnceLock::new();
static AUTOSAVE: OnceLock<Option<Regex>> = OnceLock::new();

/// 2.2.5 Re-authenticating
pub fn re_authenticating(ctx: &PageContext, pass: Pass) -> Evaluation {
    let markers: Vec<&Element> = ctx
        .elements
        .iter()
        .filter(|el| el.has_attr("data-session-timeout"))
        .collect();
    let text_hint = cached_match(
        &SESSION_TEXT,
        r"(?i)(session (will )?(expire|time ?out)|your session|logged out|sesi[oó]n (expira|caduca|finaliza)|cerrar[aá] (la )?sesi[oó]n|volver a iniciar sesi[oó]n)",
        &ctx.body_text,
    );
    let applicable = markers.len() + usize::from(markers.is_empty() && text_hint);
    let page_autosave = cached_match(
        &AUTOSAVE,
        r"(autosave|auto-save|savedraft|save_draft|localstorage\.setitem|sessionstorage\.setitem)",
        &ctx.script_text(),
    ) || ctx.elements.iter().any(|el| el.flag("data-autosave"));

    let mut compliant = 0usize;
    let mut violations = 0usize;
    let mut unknown = 0usize;
    let mut offenders = Vec::new();
    let mut judge = |el: Option<&Element>| {
        if el.is_some_and(|el| el.flag("data-loses-data")) {
            violations += 1;
            if offenders.len() < MAX_OFFENDERS {
                let mut o = el.map(Element::describe).unwrap_or(Value::Null);
                o["reason"] = json!("Data entered before the session expires is lost.");
                offenders.push(o);
            }
        } else if page_autosave || el.is_some_and(|el| el.flag("data-preserves-data")) {
            compliant += 1;
        } else {
            unknown += 1;
        }
    };
    if markers.is_empty() {
        if text_hint {
            judge(None);
        }
    } else {
        for el in markers {
            judge(Some(el));
        }
    }

    let d = details(json!({
        "sessions_examined": applicable,
        "applicable": applicable,
        "compliant": compliant,
        "violations": violations,
        "unknown": unknown,
        "autosave_detected": page_autosave,
        "ok_ratio": ratio(compliant, applicable),
        "offenders": offenders,
        "note": note(pass, "after re-authenticating the user must be able to continue without losing data."),
    }));
    with_unknowns(d, applicable, violations, unknown)
}

static INACTIVITY_TEXT: OnceLock<Option<Regex>> = OnceLock::new();
static DURATION_NOTICE: OnceLock<Option<Regex>> = OnceLock::new();

/// 2.2.6 Timeouts
pub fn timeouts(ctx: &PageContext, pass: Pass) -> Evaluation {
    let annotated: Vec<&Element> = ctx
        .elements
        .iter()
        .filter(|el| el.has_attr("data-inactivity-timeout") || el.has_attr("data-session-timeout"))
        .collect();
    let text_hint = cached_match(
        &INACTIVITY_TEXT,
        r"(?i)(inactivity|inactive for|idle|inactividad|sin actividad|data (will be|is) lost|se perder[aá]n)",
        &ctx.body_text,
    );
    let applicable = annotated.len() + usize::from(annotated.is_empty() && text_hint);
    let global_notice = cached_match(
        &DURATION_NOTICE,
        r"(?i)\b\d+\s*(seconds?|minutes?|hours?|days?|segundos?|minutos?|horas?|d[ií]as?)\b",
        &ctx.body_text,
    ) && text_hint;
    let notices = ctx
        .elements
        .iter()
        .filter(|el| el.has_attr("data-timeout-notice"))
        .count();

    let mut compliant = 0usize;
    let mut violations = 0usize;
    let mut offenders = Vec::new();
    if annotated.is_empty() {
        if text_hint {
            if global_notice || notices > 0 {
                compliant += 1;
            } else {
                violations += 1;
                offenders.push(json!({ "kind": "text_hint", "reason": "Inactivity timeout mentioned without its duration." }));
            }
        }
    } else {
        for el in &annotated {
            if global_notice || notices > 0 || el.has_attr("data-timeout-notice") {
                compliant += 1;
            } else {
                violations += 1;
                if offenders.len() < MAX_OFFENDERS {
                    let mut o = el.describe();
                    o["reason"] = json!("Inactivity timeout not announced with its duration.");
                    offenders.push(o);
                }
            }
        }
    }

    let d = details(json!({
        "timeouts_examined": applicable,
        "applicable": applicable,
        "compliant": compliant,
        "violations": violations,
        "notices_detected": notices,
        "global_notice_with_duration": global_notice,
        "ok_ratio": ratio(compliant, applicable),
        "offenders": offenders,
        "note": note(pass, "users must be warned how long inactivity may last before data is lost."),
    }));
    scoped(d, applicable > 0, violations == 0)
}
