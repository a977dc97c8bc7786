//! Guideline 2.3: Seizures and Physical Reactions
//!
//! Flash rates come from CSS animations (duration and what the keyframes
//! toggle), flashy class names and `data-flashes-per-second` annotations on
//! media. Nothing is measured frame by frame.

use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Value};

use crate::engine::context::{Element, PageContext};
use crate::engine::css::{self, Rule};
use crate::engine::outcome::Evaluation;

use super::{details, has_control, note, ratio, scoped, Pass, MAX_OFFENDERS};

/// At most three flashes in any one second period
const MAX_FLASHES_PER_SEC: f64 = 3.0;

const FLASHY_CLASS_HINTS: &[&str] = &[
    "strobe", "strobing", "flash", "flashing", "blink", "blinking", "rapid", "danger-flash",
    "warning-flash", "pulse-fast", "pulse-rapid",
];

const MOTION_CLASS_HINTS: &[&str] = &[
    "parallax", "scroll-parallax", "tilt", "hover-animate", "shake-on-hover", "scroll-animate",
    "spin-on-click", "bounce-on-hover", "headshake", "rubberband",
];

/// Selector pseudo-class and the interaction it stands for
const INTERACTION_TRIGGERS: &[(&str, &str)] = &[(":hover", "hover"), (":focus", "focus"), (":active", "press")];

const MOTION_PROPS: &[&str] = &["transform", "translate", "rotate", "scale", "offset-path", "parallax"];

struct Flash {
    source: Value,
    flashes_per_sec: Option<f64>,
    /// Flashy by name only, rate unknown
    hinted: bool,
    red: bool,
    below_threshold: bool,
}

fn has_class_hint(el: &Element, hints: &[&str]) -> bool {
    let class = el.class().to_ascii_lowercase();
    class.split_whitespace().any(|c| hints.iter().any(|h| c.contains(h)))
}

/// Name and duration of the animation a rule declares
fn animation_of(rule: &Rule) -> Option<(String, f64, bool)> {
    let shorthand = rule.declaration("animation").unwrap_or_default().to_ascii_lowercase();
    let name = rule
        .declaration("animation-name")
        .map(str::to_string)
        .or_else(|| {
            shorthand
                .split_whitespace()
                .find(|t| css::seconds(t).is_none() && !ANIMATION_KEYWORDS.contains(t) && t.parse::<f64>().is_err() && !t.contains('('))
                .map(|t| t.to_string())
        })?;
    let duration = rule
        .declaration("animation-duration")
        .and_then(css::seconds)
        .or_else(|| shorthand.split_whitespace().find_map(css::seconds))?;
    let count = rule
        .declaration("animation-iteration-count")
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| shorthand.clone());
    let repeats = count.contains("infinite")
        || count.split_whitespace().any(|t| t.parse::<f64>().is_ok_and(|n| n >= 3.0));
    Some((name.trim().to_string(), duration, repeats))
}

const ANIMATION_KEYWORDS: &[&str] = &[
    "infinite", "linear", "ease", "ease-in", "ease-out", "ease-in-out", "step-start", "step-end",
    "alternate", "alternate-reverse", "normal", "reverse", "forwards", "backwards", "both", "none",
    "running", "paused",
];

fn css_flashes(ctx: &PageContext) -> Vec<Flash> {
    let mut frames: HashMap<String, String> = HashMap::new();
    let mut rules = Vec::new();
    for sheet in &ctx.styles {
        frames.extend(css::keyframes(sheet).into_iter().map(|(n, b)| (n.to_ascii_lowercase(), b)));
        rules.extend(css::rules(sheet));
    }
    let mut out = Vec::new();
    for rule in &rules {
        let Some((name, duration, repeats)) = animation_of(rule) else {
            continue;
        };
        if !repeats || duration <= 0.0 {
            continue;
        }
        let body = frames.get(&name.to_ascii_lowercase()).map(String::as_str).unwrap_or_default();
        let mut alternations = 0u8;
        if body.contains("opacity") || body.contains("visibility") {
            alternations += 1;
        }
        if body.contains("background") || body.contains("color") || body.contains("filter") {
            alternations += 1;
        }
        if alternations == 0 && name.to_ascii_lowercase().contains("blink") {
            alternations = 1;
        }
        if alternations == 0 {
            continue;
        }
        let rate = f64::from(alternations) / duration;
        out.push(Flash {
            source: json!({ "selector": rule.selector, "animation": name, "duration_s": duration }),
            flashes_per_sec: Some(super::round4(rate)),
            hinted: duration <= 0.25,
            red: body.contains("red") || body.contains("#f00") || body.contains("#ff0000"),
            below_threshold: false,
        });
    }
    out
}

fn element_flashes(ctx: &PageContext) -> Vec<Flash> {
    ctx.elements
        .iter()
        .filter_map(|el| {
            let rate = el
                .attr("data-flashes-per-second")
                .and_then(|v| v.trim().parse::<f64>().ok());
            let hinted = has_class_hint(el, FLASHY_CLASS_HINTS);
            if rate.is_none() && !hinted {
                return None;
            }
            Some(Flash {
                source: el.describe(),
                flashes_per_sec: rate,
                hinted: hinted && rate.is_none(),
                red: el.flag("data-red-flash"),
                below_threshold: el.flag("data-below-threshold"),
            })
        })
        .collect()
}

fn flashes(ctx: &PageContext, pass: Pass, threshold_exception: bool) -> Evaluation {
    let mut items = element_flashes(ctx);
    items.extend(css_flashes(ctx));

    let examined = items.len();
    let mut applicable = 0usize;
    let mut compliant = 0usize;
    let mut violations = 0usize;
    let mut offenders = Vec::new();
    for item in &items {
        if !item.hinted && !item.flashes_per_sec.is_some_and(|r| r > 0.0) {
            continue;
        }
        applicable += 1;
        let too_fast = item.flashes_per_sec.is_some_and(|r| r > MAX_FLASHES_PER_SEC);
        let violates = if threshold_exception && item.below_threshold {
            false
        } else {
            too_fast || item.hinted || (threshold_exception && item.red)
        };
        if violates {
            violations += 1;
            if offenders.len() < MAX_OFFENDERS {
                let mut o = item.source.clone();
                o["flashes_per_sec"] = json!(item.flashes_per_sec);
                o["red"] = json!(item.red);
                o["reason"] = json!("Flashes more than three times per second.");
                offenders.push(o);
            }
        } else {
            compliant += 1;
        }
    }

    let text = if threshold_exception {
        "no more than three flashes in any second, unless below the general and red flash thresholds."
    } else {
        "no more than three flashes in any second, with no threshold exception."
    };
    let d = details(json!({
        "items_examined": examined,
        "applicable": applicable,
        "compliant": compliant,
        "violations": violations,
        "unknown": 0,
        "ok_ratio": ratio(compliant, applicable),
        "offenders": offenders,
        "note": note(pass, text),
    }));
    scoped(d, applicable > 0, violations == 0)
}

/// 2.3.1 Three Flashes or Below Threshold
pub fn three_flashes_or_below_threshold(ctx: &PageContext, pass: Pass) -> Evaluation {
    flashes(ctx, pass, true)
}

/// 2.3.2 Three Flashes
pub fn three_flashes(ctx: &PageContext, pass: Pass) -> Evaluation {
    flashes(ctx, pass, false)
}

static MOTION_TOGGLE: OnceLock<Option<Regex>> = OnceLock::new();

/// 2.3.3 Animation from Interactions
pub fn animation_from_interactions(ctx: &PageContext, pass: Pass) -> Evaluation {
    let mut items: Vec<(&'static str, Value, bool)> = Vec::new();
    for el in &ctx.elements {
        if has_class_hint(el, MOTION_CLASS_HINTS) && !el.flag("data-essential") {
            let mut source = el.describe();
            source["trigger"] = json!("scroll");
            items.push(("scroll", source, el.flag("data-can-disable")));
        }
    }

    let mut has_prm_reduce = false;
    let mut prm_selectors = 0usize;
    for sheet in &ctx.styles {
        for rule in css::rules(sheet) {
            let in_prm = rule.media.as_deref().is_some_and(|m| m.contains("prefers-reduced-motion"));
            if in_prm {
                has_prm_reduce = true;
                prm_selectors += 1;
                continue;
            }
            let selector = rule.selector.to_ascii_lowercase();
            let Some(&(_, trigger)) = INTERACTION_TRIGGERS.iter().find(|(p, _)| selector.contains(p)) else {
                continue;
            };
            let body = rule.body.to_ascii_lowercase();
            let moves = MOTION_PROPS.iter().any(|p| body.contains(p)) || rule.declaration("animation").is_some();
            if moves {
                items.push((trigger, json!({ "selector": rule.selector, "trigger": trigger }), false));
            }
        }
    }
    let has_toggle = ctx.elements.iter().any(|el| el.has_attr("data-reduce-motion"))
        || has_control(
            ctx,
            &MOTION_TOGGLE,
            r"(?i)(reduce motion|reduced motion|disable animations?|stop animations?|reducir (el )?movimiento|desactivar animaciones|sin animaciones)",
        );
    let supported = has_prm_reduce || has_toggle;

    let mut types_count: BTreeMap<&str, usize> = BTreeMap::new();
    let mut compliant = 0usize;
    let mut violations = 0usize;
    let mut offenders = Vec::new();
    for (trigger, source, can_disable) in &items {
        *types_count.entry(*trigger).or_insert(0) += 1;
        if supported || *can_disable {
            compliant += 1;
        } else {
            violations += 1;
            if offenders.len() < MAX_OFFENDERS {
                let mut o = source.clone();
                o["reason"] = json!("Motion triggered by interaction with no way to turn it off.");
                offenders.push(o);
            }
        }
    }

    let applicable = items.len();
    let d = details(json!({
        "items_examined": applicable,
        "applicable": applicable,
        "compliant": compliant,
        "violations": violations,
        "unknown": 0,
        "types_count": types_count,
        "support": {
            "has_prm_reduce": has_prm_reduce,
            "prm_selectors": prm_selectors,
            "has_toggle": has_toggle,
        },
        "ok_ratio": ratio(compliant, applicable),
        "offenders": offenders,
        "note": note(pass, "motion triggered by interaction must be possible to disable (prefers-reduced-motion or a toggle)."),
    }));
    scoped(d, applicable > 0, violations == 0)
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
    fn fast_css_blink_fails_both_flash_criteria() {
        assert_eq!(run(three_flashes, "<p>calm</p>").verdict, Verdict::Na);

        let html = "<style>@keyframes pulse { 50% { opacity: 0 } } .alert { animation: pulse 0.2s infinite }</style><div class=\"alert\">!</div>";
        let strict = run(three_flashes, html);
        assert_eq!(strict.details["applicable"], json!(1));
        assert_eq!(strict.verdict, Verdict::Fail);
        assert_eq!(run(three_flashes_or_below_threshold, html).verdict, Verdict::Fail);

        let slow = "<style>@keyframes pulse { 50% { opacity: 0 } } .alert { animation: pulse 2s infinite }</style>";
        assert_eq!(run(three_flashes, slow).verdict, Verdict::Pass);
    }

    #[test]
    fn threshold_annotation_only_counts_for_the_a_level() {
        let html = r#"<video src="/promo.mp4" data-flashes-per-second="5" data-below-threshold="true"></video>"#;
        assert_eq!(run(three_flashes_or_below_threshold, html).verdict, Verdict::Pass);
        assert_eq!(run(three_flashes, html).verdict, Verdict::Fail);

        let mixed = r#"<div class="strobe"></div><video data-flashes-per-second="1"></video>"#;
        let eval = run(three_flashes, mixed);
        assert_eq!(eval.details["violations"], json!(1));
        assert_eq!(eval.verdict, Verdict::Partial);
    }

    #[test]
    fn interaction_motion_needs_an_off_switch() {
        assert_eq!(run(animation_from_interactions, "<p>x</p>").verdict, Verdict::Na);

        let html = "<style>.card:hover { transform: scale(1.1) }</style><div class=\"parallax\"></div>";
        let eval = run(animation_from_interactions, html);
        assert_eq!(eval.details["types_count"], json!({ "hover": 1, "scroll": 1 }));
        assert_eq!(eval.verdict, Verdict::Fail);

        let html = "<style>.card:hover { transform: scale(1.1) } @media (prefers-reduced-motion: reduce) { .card { transform: none } }</style>";
        assert_eq!(run(animation_from_interactions, html).verdict, Verdict::Pass);
    }
}
