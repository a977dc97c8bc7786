//! Registry of implemented WCAG checks.
//!
//! A check is a plain function from a page context to an [`Evaluation`]. The
//! orchestrator runs it against the static page first and, when useful,
//! against the rendered page.

mod adaptable;
mod distinguishable;
mod input_assistance;
mod input_modalities;
mod keyboard;
mod media;
mod navigable;
mod operable;
mod perceivable;
mod predictable;
mod readable;
mod robust;
mod seizures;
mod timing;
mod understandable;

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::contract::{CriterionInfo, Verdict};

use super::context::{Element, PageContext};
use super::outcome::{verdict_from_counts, Evaluation};
use super::wcag;

/// Which page view a check is looking at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    Raw,
    Rendered,
}

pub type CheckFn = fn(&PageContext, Pass) -> Evaluation;

#[derive(Clone, Copy)]
pub struct Check {
    pub code: &'static str,
    pub run: CheckFn,
}

static CHECKS: &[Check] = &[
    Check { code: "1.1.1", run: perceivable::non_text_content },
    Check { code: "1.2.1", run: media::audio_video_only },
    Check { code: "1.2.2", run: media::captions_prerecorded },
    Check { code: "1.2.3", run: media::audio_description_or_alternative },
    Check { code: "1.2.4", run: media::captions_live },
    Check { code: "1.2.5", run: media::audio_description },
    Check { code: "1.2.6", run: media::sign_language },
    Check { code: "1.2.7", run: media::extended_audio_description },
    Check { code: "1.2.8", run: media::media_alternative },
    Check { code: "1.2.9", run: media::audio_only_live },
    Check { code: "1.3.1", run: perceivable::info_and_relationships },
    Check { code: "1.3.2", run: adaptable::meaningful_sequence },
    Check { code: "1.3.3", run: adaptable::sensory_characteristics },
    Check { code: "1.3.4", run: adaptable::orientation },
    Check { code: "1.3.5", run: perceivable::identify_input_purpose },
    Check { code: "1.3.6", run: adaptable::identify_purpose },
    Check { code: "1.4.1", run: distinguishable::use_of_color },
    Check { code: "1.4.2", run: perceivable::audio_control },
    Check { code: "1.4.3", run: perceivable::contrast_minimum },
    Check { code: "1.4.4", run: perceivable::resize_text },
    Check { code: "1.4.5", run: distinguishable::images_of_text_aa },
    Check { code: "1.4.6", run: perceivable::contrast_enhanced },
    Check { code: "1.4.7", run: distinguishable::low_background_audio },
    Check { code: "1.4.8", run: distinguishable::visual_presentation },
    Check { code: "1.4.9", run: distinguishable::images_of_text_no_exception },
    Check { code: "1.4.10", run: perceivable::reflow },
    Check { code: "1.4.11", run: perceivable::non_text_contrast },
    Check { code: "1.4.12", run: distinguishable::text_spacing },
    Check { code: "1.4.13", run: distinguishable::content_on_hover_or_focus },
    Check { code: "2.1.1", run: operable::keyboard },
    Check { code: "2.1.2", run: keyboard::no_keyboard_trap },
    Check { code: "2.1.3", run: keyboard::keyboard_no_exception },
    Check { code: "2.1.4", run: keyboard::character_key_shortcuts },
    Check { code: "2.2.1", run: timing::timing_adjustable },
    Check { code: "2.2.2", run: timing::pause_stop_hide },
    Check { code: "2.2.3", run: timing::no_timing },
    Check { code: "2.2.4", run: timing::interruptions },
    Check { code: "2.2.5", run: timing::re_authenticating },
    Check { code: "2.2.6", run: timing::timeouts },
    Check { code: "2.3.1", run: seizures::three_flashes_or_below_threshold },
    Check { code: "2.3.2", run: seizures::three_flashes },
    Check { code: "2.3.3", run: seizures::animation_from_interactions },
    Check { code: "2.4.1", run: operable::bypass_blocks },
    Check { code: "2.4.2", run: operable::page_titled },
    Check { code: "2.4.3", run: navigable::focus_order },
    Check { code: "2.4.4", run: operable::link_purpose },
    Check { code: "2.4.5", run: navigable::multiple_ways },
    Check { code: "2.4.6", run: operable::headings_and_labels },
    Check { code: "2.4.7", run: operable::focus_visible },
    Check { code: "2.4.8", run: navigable::location },
    Check { code: "2.4.9", run: navigable::link_purpose_link_only },
    Check { code: "2.4.10", run: navigable::section_headings },
    Check { code: "2.5.1", run: input_modalities::pointer_gestures },
    Check { code: "2.5.2", run: input_modalities::pointer_cancellation },
    Check { code: "2.5.3", run: input_modalities::label_in_name },
    Check { code: "2.5.4", run: input_modalities::motion_actuation },
    Check { code: "2.5.5", run: operable::target_size },
    Check { code: "2.5.6", run: input_modalities::concurrent_input_mechanisms },
    Check { code: "3.1.1", run: understandable::language_of_page },
    Check { code: "3.1.2", run: understandable::language_of_parts },
    Check { code: "3.1.3", run: readable::unusual_words },
    Check { code: "3.1.4", run: readable::abbreviations },
    Check { code: "3.1.5", run: readable::reading_level },
    Check { code: "3.1.6", run: readable::pronunciation },
    Check { code: "3.2.1", run: understandable::on_focus },
    Check { code: "3.2.2", run: understandable::on_input },
    Check { code: "3.2.3", run: predictable::consistent_navigation },
    Check { code: "3.2.4", run: predictable::consistent_identification },
    Check { code: "3.2.5", run: predictable::change_on_request },
    Check { code: "3.3.1", run: input_assistance::error_identification },
    Check { code: "3.3.2", run: understandable::labels_or_instructions },
    Check { code: "3.3.3", run: input_assistance::error_suggestion },
    Check { code: "3.3.4", run: input_assistance::error_prevention_legal },
    Check { code: "3.3.5", run: input_assistance::help },
    Check { code: "3.3.6", run: input_assistance::error_prevention_all },
    Check { code: "4.1.1", run: robust::parsing },
    Check { code: "4.1.2", run: robust::name_role_value },
    Check { code: "4.1.3", run: robust::status_messages },
];

pub fn get_check(code: &str) -> Option<&'static Check> {
    CHECKS.iter().find(|c| c.code == code)
}

/// Registered codes in WCAG document order
pub fn list_available_codes() -> Vec<&'static str> {
    wcag::CRITERIA
        .iter()
        .map(|m| m.code)
        .filter(|code| get_check(code).is_some())
        .collect()
}

/// Every WCAG 2.1 criterion with its implementation status
pub fn catalogue() -> Vec<CriterionInfo> {
    wcag::CRITERIA
        .iter()
        .map(|m| CriterionInfo {
            code: m.code,
            title: m.title,
            level: m.level,
            principle: m.principle,
            implemented: get_check(m.code).is_some(),
        })
        .collect()
}

/// Link texts that say nothing about the destination
const BAD_LINK_TEXT: &[&str] = &[
    "click here",
    "clickhere",
    "here",
    "aquí",
    "leer más",
    "read more",
    "más",
    "ver más",
    "ver mas",
    "more",
];

/// Whether a link or control text describes its purpose
pub(crate) fn text_ok(text: &str) -> bool {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    if normalized.is_empty() || BAD_LINK_TEXT.contains(&normalized.as_str()) {
        return false;
    }
    if (normalized.starts_with("http://") || normalized.starts_with("https://"))
        && !normalized.contains(' ')
    {
        return false;
    }
    normalized.chars().count() >= 3
}

/// Accessible name from the usual sources, in precedence order
pub(crate) fn accessible_name(ctx: &PageContext, el: &Element) -> Option<String> {
    if let Some(ids) = el.attr_nonempty("aria-labelledby") {
        let text: Vec<&str> = ids.split_whitespace().filter_map(|id| ctx.text_of_id(id)).collect();
        if !text.is_empty() {
            return Some(text.join(" "));
        }
    }
    if let Some(label) = el.attr_nonempty("aria-label") {
        return Some(label.to_string());
    }
    if let Some(label) = el
        .attr_nonempty("id")
        .and_then(|id| ctx.labels_for.get(id))
        .filter(|t| !t.trim().is_empty())
    {
        return Some(label.clone());
    }
    if !el.text.is_empty() {
        return Some(el.text.clone());
    }
    if !el.image_alt.is_empty() {
        return Some(el.image_alt.clone());
    }
    if el.tag == "input" {
        let kind = el.attr("type").unwrap_or_default().to_ascii_lowercase();
        if matches!(kind.as_str(), "submit" | "button" | "reset") {
            if let Some(value) = el.attr_nonempty("value") {
                return Some(value.to_string());
            }
        }
        if kind == "image" {
            if let Some(alt) = el.attr_nonempty("alt") {
                return Some(alt.to_string());
            }
        }
    }
    el.attr_nonempty("title").map(str::to_string)
}

/// Lazily compiled pattern; `None` when it fails to compile
pub(crate) fn cached_regex(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

/// Match against a lazily compiled pattern; a pattern that fails to compile never matches
pub(crate) fn cached_match(cell: &'static OnceLock<Option<Regex>>, pattern: &str, text: &str) -> bool {
    cached_regex(cell, pattern).is_some_and(|re| re.is_match(text))
}

pub(crate) const INTERACTIVE_ROLES: &[&str] = &[
    "button", "link", "menuitem", "menuitemcheckbox", "menuitemradio", "checkbox", "radio",
    "switch", "tab", "textbox", "combobox", "listbox", "option", "slider", "spinbutton",
    "treeitem",
];

pub(crate) fn natively_interactive(el: &Element) -> bool {
    match el.tag.as_str() {
        "a" => el.has_attr("href"),
        "button" | "input" | "select" | "textarea" | "summary" | "option" => true,
        _ => false,
    }
}

/// Focus candidates: native controls, interactive roles or `tabindex >= 0`, minus disabled ones
pub(crate) fn focusable(el: &Element) -> bool {
    !el.has_attr("disabled")
        && (natively_interactive(el)
            || INTERACTIVE_ROLES.contains(&el.role().as_str())
            || el.tabindex().is_some_and(|t| t >= 0))
}

/// Note prefixed with the page view it was measured on
pub(crate) fn note(pass: Pass, text: &str) -> String {
    match pass {
        Pass::Raw => format!("RAW: {text}"),
        Pass::Rendered => format!("RENDERED: {text}"),
    }
}

/// Details map from a `json!` object literal
pub(crate) fn details(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

pub(crate) fn ratio(ok: usize, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        round4(ok as f64 / total as f64)
    }
}

pub(crate) fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Not applicable when nothing was in scope, otherwise the counters and `passed` decide
pub(crate) fn scoped(mut d: Map<String, Value>, in_scope: bool, passed: bool) -> Evaluation {
    if !in_scope {
        d.insert("na".into(), Value::Bool(true));
        d.insert("ok_ratio".into(), Value::Null);
        return Evaluation::new(Verdict::Na, d);
    }
    let verdict = verdict_from_counts(&d, Some(passed));
    Evaluation::new(verdict, d)
}

/// Like [`scoped`], for checks that leave some candidates undecided: any undecided
/// candidate keeps a clean page at Partial and asks for manual review
pub(crate) fn with_unknowns(mut d: Map<String, Value>, applicable: usize, violations: usize, unknown: usize) -> Evaluation {
    let verdict = if applicable == 0 {
        d.insert("na".into(), Value::Bool(true));
        d.insert("ok_ratio".into(), Value::Null);
        Verdict::Na
    } else if violations == 0 && unknown == 0 {
        Verdict::Pass
    } else if violations < applicable {
        Verdict::Partial
    } else {
        Verdict::Fail
    };
    if unknown > 0 && verdict != Verdict::Na {
        d.insert("manual_required".into(), Value::Bool(true));
    }
    Evaluation::new(verdict, d)
}

/// Verdict from the counted details, with `passed` as the overall flag
pub(crate) fn judged(d: Map<String, Value>, passed: bool) -> Evaluation {
    let verdict = verdict_from_counts(&d, Some(passed));
    Evaluation::new(verdict, d)
}

/// Lower-case ASCII fold of the accented letters used in Spanish and Portuguese
pub(crate) fn fold(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' | 'ã' | 'Á' | 'À' | 'Ä' | 'Â' | 'Ã' => 'a',
        'é' | 'è' | 'ë' | 'ê' | 'É' | 'È' | 'Ë' | 'Ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' | 'Í' | 'Ì' | 'Ï' | 'Î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' | 'õ' | 'Ó' | 'Ò' | 'Ö' | 'Ô' | 'Õ' => 'o',
        'ú' | 'ù' | 'ü' | 'û' | 'Ú' | 'Ù' | 'Ü' | 'Û' => 'u',
        'ñ' | 'Ñ' => 'n',
        'ç' | 'Ç' => 'c',
        other => other.to_ascii_lowercase(),
    }
}

/// Some button-like control on the page has a name matching `pattern`
pub(crate) fn has_control(ctx: &PageContext, cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> bool {
    ctx.elements
        .iter()
        .filter(|el| {
            matches!(el.tag.as_str(), "button" | "a" | "summary")
                || matches!(el.role().as_str(), "button" | "switch" | "link")
                || (el.tag == "input" && matches!(el.input_type().as_str(), "button" | "submit" | "checkbox"))
        })
        .filter_map(|el| accessible_name(ctx, el))
        .any(|name| cached_match(cell, pattern, &name))
}

/// Cap on offender lists kept in details
pub(crate) const MAX_OFFENDERS: usize = 25;

/// Outcome for criteria that need layout or event data a serialized DOM lacks
pub(crate) fn needs_browser(pass: Pass, what: &str) -> Evaluation {
    match pass {
        Pass::Raw => Evaluation::na(format!(
            "RAW: {what} needs a rendered page; static HTML cannot answer it."
        )),
        Pass::Rendered => Evaluation::na(format!(
            "RENDERED: {what} needs live layout measurements the rendered DOM does not carry."
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_in_wcag_order() {
        let codes = list_available_codes();
        assert_eq!(codes.len(), CHECKS.len());
        assert_eq!(codes.len(), wcag::CRITERIA.len());
        assert_eq!(codes.first(), Some(&"1.1.1"));
        assert_eq!(codes.last(), Some(&"4.1.3"));
        let pos = |c: &str| codes.iter().position(|x| *x == c);
        assert!(pos("1.4.4") < pos("1.4.10"));
    }

    #[test]
    fn catalogue_flags_implemented_codes() {
        let catalogue = catalogue();
        assert_eq!(catalogue.len(), 78);
        assert!(catalogue.iter().all(|c| c.implemented), "every criterion has a check");
    }

    #[test]
    fn link_text_quality() {
        assert!(text_ok("Descargar informe anual"));
        assert!(!text_ok("  Read   More "));
        assert!(!text_ok("https://example.org/x"));
        assert!(!text_ok("ok"));
        assert!(!text_ok(""));
    }
}
