//! Guideline 3.2: Predictable, beyond focus and input handlers

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Value};
use url::Url;

use crate::engine::context::{collapse_ws, Element, PageContext};
use crate::engine::outcome::Evaluation;

use super::{accessible_name, cached_match, cached_regex, details, fold, judged, note, Pass, MAX_OFFENDERS};

/// Links kept per navigation signature
const MAX_SIGNATURE: usize = 200;

fn canon_name(text: &str) -> String {
    collapse_ws(&text.chars().map(fold).collect::<String>())
}

/// Path without query, fragment or trailing slash; absolute URLs keep only the path
fn canon_href(href: &str) -> String {
    let href = href.trim();
    if let Ok(url) = Url::parse(href) {
        if matches!(url.scheme(), "http" | "https") {
            let path = url.path().trim_end_matches('/');
            return if path.is_empty() { "/".into() } else { path.to_string() };
        }
    }
    let bare = href.split(['#', '?']).next().unwrap_or_default();
    let bare = if bare.len() > 1 { bare.trim_end_matches('/') } else { bare };
    if bare.is_empty() {
        "/".into()
    } else {
        bare.to_string()
    }
}

/// `name|href` keys of the links inside one navigation block, in order
fn nav_blocks(ctx: &PageContext) -> BTreeMap<usize, Vec<String>> {
    let mut blocks: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    for a in ctx.anchors() {
        let (Some(region), Some(href)) = (a.nav_region, a.attr_nonempty("href")) else {
            continue;
        };
        let key = format!("{}|{}", canon_name(&a.text), canon_href(href));
        let links = blocks.entry(region).or_default();
        if !links.contains(&key) && links.len() < MAX_SIGNATURE {
            links.push(key);
        }
    }
    blocks
}

/// Pairs of shared links that appear in the opposite order
fn inversions(reference: &[String], seq: &[String]) -> usize {
    let position: HashMap<&str, usize> = reference.iter().enumerate().map(|(i, k)| (k.as_str(), i)).collect();
    let common: Vec<usize> = seq.iter().filter_map(|k| position.get(k.as_str()).copied()).collect();
    let mut count = 0;
    for (i, a) in common.iter().enumerate() {
        count += common[i + 1..].iter().filter(|b| a > *b).count();
    }
    count
}

/// 3.2.3 Consistent Navigation
///
/// A single page has no sibling pages to compare against, so the navigation
/// blocks that repeat links within the page (header menu, footer menu, mobile
/// menu) must list the shared links in the same relative order.
pub fn consistent_navigation(ctx: &PageContext, pass: Pass) -> Evaluation {
    let blocks: Vec<Vec<String>> = nav_blocks(ctx).into_values().collect();
    let mut compared = 0usize;
    let mut violations = 0usize;
    let mut offenders = Vec::new();
    for (i, reference) in blocks.iter().enumerate() {
        for (j, seq) in blocks.iter().enumerate().skip(i + 1) {
            let shared = seq.iter().filter(|k| reference.contains(*k)).count();
            if shared < 2 {
                continue;
            }
            compared += 1;
            let inverted = inversions(reference, seq);
            if inverted > 0 {
                violations += inverted;
                if offenders.len() < MAX_OFFENDERS {
                    offenders.push(json!({
                        "blocks": [i, j],
                        "shared_links": shared,
                        "inversions": inverted,
                        "reason": "Repeated navigation lists shared links in a different order.",
                    }));
                }
            }
        }
    }
    let signature: Vec<&String> = blocks.iter().flatten().take(MAX_SIGNATURE).collect();
    let applicable = compared > 0;
    let d = details(json!({
        "applicable": u8::from(applicable),
        "signature": signature,
        "blocks_found": blocks.len(),
        "blocks_compared": compared,
        "violations": violations,
        "ok_ratio": if violations == 0 { 1.0 } else { 0.0 },
        "offenders": offenders,
        "note": note(pass, "repeated navigation should keep the same relative order."),
    }));
    judged(d, violations == 0)
}

static ONCLICK_TARGET: OnceLock<Option<Regex>> = OnceLock::new();

const IDENTIFIED_ROLES: &[&str] = &["button", "link", "switch", "tab", "menuitem", "option", "slider", "spinbutton"];

fn identifiable(el: &Element) -> bool {
    match el.tag.as_str() {
        "a" => el.attr_nonempty("href").is_some(),
        "input" => el.input_type() != "hidden",
        "button" | "select" | "textarea" => true,
        _ => IDENTIFIED_ROLES.contains(&el.role().as_str()),
    }
}

/// What the control does, as far as markup tells
fn action_key(el: &Element) -> String {
    if el.tag == "a" {
        if let Some(href) = el.attr_nonempty("href") {
            return format!("href:{}", canon_href(href));
        }
    }
    for attr in ["formaction", "data-action", "data-target", "aria-controls"] {
        if let Some(v) = el.attr_nonempty(attr) {
            return format!("{attr}:{}", canon_name(v));
        }
    }
    if let Some(target) = el
        .attr("onclick")
        .and_then(|oc| cached_regex(&ONCLICK_TARGET, r#"(?i)(https?://[^\s'";]+|/[^\s'";]+)"#)?.find(oc))
    {
        return format!("onclick:{}", canon_href(target.as_str()));
    }
    let role = el.role();
    let kind = el.input_type();
    if !role.is_empty() || !kind.is_empty() {
        let role = if role.is_empty() { "ctrl".to_string() } else { role };
        let kind = if kind.is_empty() { el.tag.clone() } else { kind };
        return format!("{role}:{kind}");
    }
    el.tag.clone()
}

/// 3.2.4 Consistent Identification
///
/// Controls that do the same thing (same destination or same action target)
/// should carry the same name.
pub fn consistent_identification(ctx: &PageContext, pass: Pass) -> Evaluation {
    // key -> (members, distinct names, sample)
    let mut groups: BTreeMap<String, (usize, BTreeSet<String>, Vec<Value>)> = BTreeMap::new();
    let mut applicable = 0usize;
    for el in ctx.elements.iter().filter(|el| identifiable(el)) {
        applicable += 1;
        let name = accessible_name(ctx, el)
            .or_else(|| el.attr_nonempty("name").map(str::to_string))
            .map(|n| canon_name(&n))
            .unwrap_or_default();
        let group = groups.entry(action_key(el)).or_default();
        group.0 += 1;
        if group.2.len() < 5 {
            let mut o = el.describe();
            o["name"] = json!(name);
            group.2.push(o);
        }
        if !name.is_empty() {
            group.1.insert(name);
        }
    }

    let mut violations = 0usize;
    let mut offenders = Vec::new();
    for (key, (members, names, sample)) in &groups {
        if *members < 2 || names.len() < 2 {
            continue;
        }
        violations += 1;
        if offenders.len() < MAX_OFFENDERS {
            offenders.push(json!({
                "action": key,
                "names": names,
                "sample": sample,
                "reason": "Same function identified with different names.",
            }));
        }
    }
    let d = details(json!({
        "applicable": u8::from(applicable > 0),
        "groups_examined": groups.len(),
        "violations": violations,
        "ok_ratio": if violations == 0 { 1.0 } else { 0.0 },
        "offenders": offenders,
        "note": note(pass, "components with the same function should be identified consistently."),
    }));
    judged(d, groups.is_empty() || violations == 0)
}

static JS_AUTO_NAV: OnceLock<Option<Regex>> = OnceLock::new();
static JS_DIRECT_NAV: OnceLock<Option<Regex>> = OnceLock::new();
static AUTO_SUBMIT: OnceLock<Option<Regex>> = OnceLock::new();
static CHANGE_WARNING: OnceLock<Option<Regex>> = OnceLock::new();
static CHANGE_TOGGLE: OnceLock<Option<Regex>> = OnceLock::new();

/// 3.2.5 Change on Request
pub fn change_on_request(ctx: &PageContext, pass: Pass) -> Evaluation {
    let scripts = ctx.scripts.join("\n");
    let text = &ctx.body_text;
    let meta_refresh = ctx.meta.contains_key("refresh");
    let js_auto_nav = cached_match(
        &JS_AUTO_NAV,
        r"(?is)(setTimeout|setInterval)\s*\(.*?(location\.(href|assign|replace)|window\.open|history\.(pushState|replaceState))",
        &scripts,
    );
    let js_direct_nav = cached_match(
        &JS_DIRECT_NAV,
        r"(?i)(location\.(href|assign|replace)\s*=|document\.location|window\.open\s*\()",
        &scripts,
    );
    let auto_submit = cached_match(&AUTO_SUBMIT, r"(?i)\.submit\s*\(", &scripts);
    let has_warning = cached_match(
        &CHANGE_WARNING,
        r"(?i)(se\s+actualizar[aá]\s+autom[aá]ticamente|redirigir[aá]\s+autom[aá]ticamente|auto(\s*|-)?refresh|auto(\s*|-)?redirect|auto(\s*|-)?submit|esta\s+p[aá]gina\s+cambiar[aá]\s+sin\s*interacci[oó]n)",
        text,
    );
    let has_toggle = cached_match(
        &CHANGE_TOGGLE,
        r"(?i)(detener|parar|pausar|desactivar|apagar|stop|pause|disable)\s+(actualizaci[oó]n|auto|autom[aá]tico|redirect|refresh|cambio)",
        text,
    );

    let mut offenders = Vec::new();
    let mut flag = |kind: &str, reason: &str| offenders.push(json!({ "type": kind, "reason": reason }));
    let mut violations = 0usize;
    if meta_refresh {
        violations += 1;
        flag("meta_refresh", "Meta refresh changes the page without a request.");
    }
    if js_auto_nav {
        violations += 1;
        flag("js_auto_nav", "Timer-driven navigation.");
    }
    if js_direct_nav && !has_warning && !has_toggle {
        violations += 1;
        flag("js_direct_nav", "Script navigation with no warning or way to turn it off.");
    }
    if auto_submit && !has_warning {
        violations += 1;
        flag("auto_submit", "Script submits a form without warning.");
    }
    // A warned change the user can switch off forgives one violation.
    if has_toggle && has_warning && violations > 0 {
        violations -= 1;
        flag("mitigation", "Warning and off switch present.");
    }

    let d = details(json!({
        "applicable": 1,
        "meta_refresh": meta_refresh,
        "js_auto_nav": js_auto_nav,
        "js_direct_nav": js_direct_nav,
        "auto_submit": auto_submit,
        "has_warning": has_warning,
        "has_toggle": has_toggle,
        "violations": violations,
        "ok_ratio": if violations == 0 { 1.0 } else { 0.0 },
        "offenders": offenders,
        "note": note(pass, "changes of context happen only on user request or can be turned off."),
    }));
    judged(d, violations == 0)
}
