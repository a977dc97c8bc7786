//! Guideline 1.4: Distinguishable (color use, images of text, presentation,
//! spacing and hover content). Contrast, resize and audio control stay in
//! `perceivable`.
//!
//! Styles come from inline `style` attributes and `<style>` blocks; external
//! sheets are not fetched. A declaration that cannot be resolved counts as
//! unknown, never as a failure.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Value};

use crate::engine::color::inline_style;
use crate::engine::context::{Element, PageContext};
use crate::engine::css::{self, Rule};
use crate::engine::outcome::{verdict_from_counts, Evaluation};

use super::{cached_match, details, note, ratio, round4, scoped, with_unknowns, Pass, MAX_OFFENDERS};

/// Plain (non-`@media`) rules of the page's style blocks
fn page_rules(ctx: &PageContext) -> Vec<Rule> {
    css::rules(&ctx.styles.join("\n"))
        .into_iter()
        .filter(|r| r.media.is_none())
        .collect()
}

/// Declared value of `prop` for `el`: inline style first, then the last rule
/// selecting the element, then the last rule naming one of `inherit_from`.
fn declared(rules: &[Rule], el: &Element, prop: &str, inherit_from: &[&str]) -> Option<String> {
    if let Some(v) = el.attr("style").and_then(|s| inline_style(s, prop)) {
        return Some(v.to_ascii_lowercase());
    }
    let classes: Vec<&str> = el.class().split_whitespace().collect();
    rules
        .iter()
        .rev()
        .find(|r| r.applies_to(&el.tag, &classes, el.id()) && r.declaration(prop).is_some())
        .or_else(|| {
            rules
                .iter()
                .rev()
                .find(|r| r.targets(inherit_from) && r.declaration(prop).is_some())
        })
        .and_then(|r| r.declaration(prop))
        .map(str::to_ascii_lowercase)
}

fn snippet(el: &Element) -> String {
    el.text.chars().take(120).collect()
}

const REQUIRED_WORDS: &[&str] = &["requerido", "obligatorio", "required", "mandatory"];
const STATUS_CLASSES: &[&str] = &[
    "badge", "status", "tag", "pill", "label-success", "label-danger", "label-warning",
    "success", "danger", "warning", "error", "ok",
];

/// 1.4.1 Use of Color
pub fn use_of_color(ctx: &PageContext, pass: Pass) -> Evaluation {
    let rules = page_rules(ctx);
    let mut offenders = Vec::new();
    let mut push = |el: &Element, kind: &str, reason: &str| {
        if offenders.len() < MAX_OFFENDERS {
            let mut o = el.describe();
            o["type"] = json!(kind);
            o["reason"] = json!(reason);
            offenders.push(o);
        }
    };

    // links inside running text must be told apart by more than color
    let mut links_total = 0usize;
    let mut links_color_only = 0usize;
    for a in ctx.anchors().filter(|a| a.in_paragraph && !a.in_nav && !a.text.is_empty()) {
        links_total += 1;
        let undecorated = declared(&rules, a, "text-decoration", &[])
            .or_else(|| declared(&rules, a, "text-decoration-line", &[]))
            .is_some_and(|v| v.contains("none"));
        if !undecorated {
            continue;
        }
        let bold = declared(&rules, a, "font-weight", &[])
            .is_some_and(|v| v.contains("bold") || v.parse::<u32>().is_ok_and(|w| w >= 600));
        let bordered = declared(&rules, a, "border-bottom", &[]).is_some_and(|v| !v.contains("none"));
        if !(bold || bordered) {
            links_color_only += 1;
            push(a, "link", "Link in text with underline removed and no other visual cue.");
        }
    }

    let mut controls_total = 0usize;
    let mut required_color_only = 0usize;
    let mut error_color_only = 0usize;
    for field in ctx.inputs().filter(|i| !matches!(i.input_type().as_str(), "hidden" | "submit" | "button")) {
        controls_total += 1;
        let label = field
            .attr_nonempty("id")
            .and_then(|id| ctx.labels_for.get(id))
            .map(|l| l.to_lowercase())
            .unwrap_or_default();
        if field.attr("aria-invalid").is_some_and(|v| v.trim() == "true")
            && field.attr_nonempty("aria-describedby").is_none()
            && field.attr_nonempty("aria-errormessage").is_none()
        {
            error_color_only += 1;
            push(field, "error", "Invalid field flagged without a text message.");
        }
        let marked_required = field
            .class()
            .to_ascii_lowercase()
            .split_whitespace()
            .any(|c| c.contains("required"));
        let says_required = label.contains('*')
            || REQUIRED_WORDS.iter().any(|w| label.contains(w))
            || field.has_attr("required")
            || field.flag("aria-required");
        if marked_required && !says_required {
            required_color_only += 1;
            push(field, "required", "Required state conveyed only by styling.");
        }
    }

    let mut badges_total = 0usize;
    let mut badges_color_only = 0usize;
    let mut charts_total = 0usize;
    let mut charts_color_only = 0usize;
    for el in &ctx.elements {
        let class = el.class().to_ascii_lowercase();
        let classes: Vec<&str> = class.split_whitespace().collect();
        if matches!(el.tag.as_str(), "span" | "div" | "i")
            && classes.iter().any(|c| STATUS_CLASSES.contains(c))
        {
            badges_total += 1;
            if el.text.is_empty() && el.attr_nonempty("aria-label").is_none() && el.attr_nonempty("title").is_none() {
                badges_color_only += 1;
                push(el, "badge", "Status indicator with color and no text.");
            }
        }
        if classes.iter().any(|c| c.contains("chart")) && matches!(el.tag.as_str(), "div" | "canvas" | "svg" | "figure") {
            charts_total += 1;
            let described = !el.text.is_empty()
                || el.attr_nonempty("aria-label").is_some()
                || el.attr_nonempty("aria-labelledby").is_some()
                || el.attr_nonempty("title").is_some();
            if !described {
                charts_color_only += 1;
                push(el, "chart", "Chart without a legend, label or text equivalent.");
            }
        }
    }

    let hard = links_color_only + required_color_only + error_color_only + badges_color_only + charts_color_only;
    let denominator = links_total + controls_total + badges_total + charts_total;
    let d = details(json!({
        "links_total": links_total,
        "links_color_only": links_color_only,
        "controls_total": controls_total,
        "required_color_only": required_color_only,
        "error_color_only": error_color_only,
        "badges_total": badges_total,
        "badges_color_only": badges_color_only,
        "charts_total": charts_total,
        "charts_color_only": charts_color_only,
        "ok_ratio": ratio(denominator.saturating_sub(hard), denominator),
        "offenders": offenders,
        "note": note(pass, "color must not be the only cue for links in text, required or invalid fields, status badges and charts."),
    }));
    scoped(d, denominator > 0, hard == 0)
}

static IMAGE_TEXT_FILENAME: OnceLock<Option<Regex>> = OnceLock::new();
static IMAGE_TEXT_CLASS: OnceLock<Option<Regex>> = OnceLock::new();

fn logo_like(img: &Element) -> bool {
    let hay = format!(
        "{} {} {}",
        img.attr("alt").unwrap_or_default(),
        img.class(),
        img.attr("src").unwrap_or_default()
    )
    .to_lowercase();
    ["logo", "logotipo", "brand", "marca"].iter().any(|w| hay.contains(w))
}

fn text_image_hint(img: &Element) -> bool {
    let src = img.media_src();
    let filename = src.rsplit('/').next().unwrap_or(src).split('?').next().unwrap_or_default();
    cached_match(
        &IMAGE_TEXT_FILENAME,
        r"(?i)(btn|button|cta|banner|headline|title|heading|texto|text|copy|promo)",
        filename,
    ) || cached_match(
        &IMAGE_TEXT_CLASS,
        r"(?i)(btn|button|cta|headline|title|heading|tagline|banner|promo|sprite)",
        img.class(),
    )
}

/// Images of text; `allow_essential` admits `data-essential` images besides logos
fn images_of_text(ctx: &PageContext, pass: Pass, allow_essential: bool) -> Evaluation {
    let mut total = 0usize;
    let mut flagged = 0usize;
    let mut violations = 0usize;
    let mut exempt_logos = 0usize;
    let mut exempt_essential = 0usize;
    let mut risky = 0usize;
    let mut offenders = Vec::new();

    for img in ctx.imgs() {
        total += 1;
        if logo_like(img) {
            exempt_logos += 1;
            continue;
        }
        let marked = img.flag("data-image-of-text") || img.flag("data-text-image");
        if marked {
            flagged += 1;
            if allow_essential && img.flag("data-essential") {
                exempt_essential += 1;
                continue;
            }
            violations += 1;
            if offenders.len() < MAX_OFFENDERS {
                offenders.push(json!({
                    "src": img.media_src().chars().take(180).collect::<String>(),
                    "alt": img.attr("alt").unwrap_or_default(),
                    "reason": "Image marked as rendering text.",
                }));
            }
        } else if text_image_hint(img) {
            risky += 1;
        }
    }

    let canvases = ctx.by_tag(&["canvas"]).count();
    if canvases > 0 && ctx.script_text().contains("filltext(") {
        violations += 1;
        if offenders.len() < MAX_OFFENDERS {
            offenders.push(json!({
                "tag": "canvas",
                "reason": "Canvas draws text with fillText.",
            }));
        }
    }
    let svg_text_ok = ctx.by_tag(&["text"]).count();

    let examined = total + usize::from(canvases > 0);
    let mut d = details(json!({
        "img_total": total,
        "flagged_image_of_text": flagged,
        "violations": violations,
        "exempt_logos": exempt_logos,
        "risky_heuristics": risky,
        "svg_text_ok": svg_text_ok,
        "ok_ratio": ratio(examined.saturating_sub(violations), examined),
        "offenders": offenders,
        "note": note(pass, "text must be real text, not an image of it; logos are exempt. File names like banner/btn are reported as risks for review."),
    }));
    if allow_essential {
        d.insert("exempt_essential".into(), json!(exempt_essential));
    }
    let verdict = verdict_from_counts(&d, Some(violations == 0));
    Evaluation::new(verdict, d)
}

/// 1.4.5 Images of Text
pub fn images_of_text_aa(ctx: &PageContext, pass: Pass) -> Evaluation {
    images_of_text(ctx, pass, true)
}

/// 1.4.9 Images of Text (No Exception)
pub fn images_of_text_no_exception(ctx: &PageContext, pass: Pass) -> Evaluation {
    images_of_text(ctx, pass, false)
}

const SPEECH_HINTS: &[&str] = &[
    "podcast", "entrevista", "interview", "voz", "voice", "narracion", "narración", "speech",
    "charla", "talk", "locucion", "locución", "audio description", "narrator",
];

fn prerecorded(el: &Element) -> bool {
    let src = el.media_src().to_ascii_lowercase();
    !(el.flag("data-live") || el.flag("live"))
        && !["live=", "/live/", "stream", "livestream"].iter().any(|h| src.contains(h))
}

fn speech_like(el: &Element) -> bool {
    let hay = format!(
        "{} {} {} {}",
        el.media_src(),
        el.attr("title").unwrap_or_default(),
        el.attr("aria-label").unwrap_or_default(),
        el.class()
    )
    .to_lowercase();
    el.flag("data-speech") || SPEECH_HINTS.iter().any(|h| hay.contains(h))
}

fn db_attr(el: &Element, name: &str) -> Option<f64> {
    el.attr(name).and_then(|v| v.trim().trim_end_matches("db").trim().parse().ok())
}

/// 1.4.7 Low or No Background Audio
pub fn low_background_audio(ctx: &PageContext, pass: Pass) -> Evaluation {
    let mut examined = 0usize;
    let mut applicable = 0usize;
    let mut no_background = 0usize;
    let mut toggle_off = 0usize;
    let mut minus_20db = 0usize;
    let mut unknown = 0usize;
    let mut violations = 0usize;
    let mut offenders = Vec::new();

    for el in ctx.by_tag(&["audio", "video"]) {
        examined += 1;
        if !prerecorded(el) || !speech_like(el) {
            continue;
        }
        applicable += 1;
        let background = el.attr("data-background-audio").map(|v| {
            !matches!(v.trim().to_ascii_lowercase().as_str(), "false" | "none" | "0" | "no")
        });
        if background == Some(false) {
            no_background += 1;
            continue;
        }
        if el.flag("data-bg-toggle") || el.flag("data-music-toggle") {
            toggle_off += 1;
            continue;
        }
        let level_ok = db_attr(el, "data-bg-to-speech-db")
            .map(|db| db <= -20.0)
            .or_else(|| db_attr(el, "data-speech-to-bg-db").map(|db| db >= 20.0));
        match (level_ok, background) {
            (Some(true), _) => minus_20db += 1,
            (None, None) => unknown += 1,
            _ => {
                violations += 1;
                if offenders.len() < MAX_OFFENDERS {
                    let mut o = el.describe();
                    o["src"] = json!(el.media_src().chars().take(180).collect::<String>());
                    o["reason"] = json!("Speech over background audio less than 20 dB quieter, with no way to turn it off.");
                    offenders.push(o);
                }
            }
        }
    }

    let d = details(json!({
        "media_examined": examined,
        "applicable": applicable,
        "pass_no_background": no_background,
        "pass_toggle_off_background": toggle_off,
        "pass_background_minus_20db": minus_20db,
        "unknown_metrics": unknown,
        "violations": violations,
        "ok_ratio": ratio(no_background + toggle_off + minus_20db, applicable),
        "offenders": offenders,
        "note": note(pass, "prerecorded speech needs no background audio, a way to turn it off, or background at least 20 dB below speech. Levels come from data-* annotations."),
    }));
    scoped(d, applicable > 0, violations == 0)
}

fn cjk(lang: &str) -> bool {
    let base = lang.split(['-', '_']).next().unwrap_or_default().to_ascii_lowercase();
    matches!(base.as_str(), "zh" | "ja" | "ko")
}

/// Theme switchers, contrast toggles or `prefers-color-scheme` support
fn has_color_mechanism(ctx: &PageContext) -> bool {
    let styles = ctx.style_text();
    if styles.contains("prefers-color-scheme") || styles.contains("prefers-contrast") {
        return true;
    }
    ctx.elements.iter().any(|el| {
        let hay = format!("{} {}", el.class(), el.id()).to_ascii_lowercase();
        ["theme-toggle", "theme-switch", "dark-mode", "darkmode", "high-contrast", "contrast-toggle", "color-scheme"]
            .iter()
            .any(|h| hay.contains(h))
    })
}

/// Characters per line implied by a width declaration
fn line_chars(width: &str, font_px: f64) -> Option<f64> {
    let width = width.trim();
    if let Some(ch) = width.strip_suffix("ch") {
        return ch.trim().parse().ok();
    }
    if width.ends_with('%') || width == "auto" || width == "none" {
        return None;
    }
    css::px(width).map(|px| px / (font_px * 0.5))
}

/// 1.4.8 Visual Presentation
pub fn visual_presentation(ctx: &PageContext, pass: Pass) -> Evaluation {
    let rules = page_rules(ctx);
    let blocks: Vec<&Element> = ctx.by_tag(&["p"]).filter(|p| !p.text.is_empty()).collect();
    let is_cjk = cjk(&ctx.lang);
    let max_chars = if is_cjk { 40.0 } else { 80.0 };
    let inherit = ["body", "html", "main", "article"];

    let mut width_checked = 0usize;
    let mut width_ok = 0usize;
    let mut justified = 0usize;
    let mut lh_checked = 0usize;
    let mut lh_ok = 0usize;
    let mut spacing_checked = 0usize;
    let mut spacing_ok = 0usize;
    let mut width_offenders = Vec::new();
    let mut spacing_offenders = Vec::new();

    for p in &blocks {
        let font_px = declared(&rules, p, "font-size", &inherit)
            .and_then(|v| css::px(&v))
            .unwrap_or(16.0);
        if let Some(chars) = declared(&rules, p, "max-width", &inherit)
            .or_else(|| declared(&rules, p, "width", &[]))
            .and_then(|w| line_chars(&w, font_px))
        {
            width_checked += 1;
            if chars <= max_chars {
                width_ok += 1;
            } else {
                width_offenders.push(json!({
                    "type": "width",
                    "snippet": snippet(p),
                    "max_line_chars": round4(chars),
                    "allowed": max_chars,
                }));
            }
        }
        if declared(&rules, p, "text-align", &inherit).is_some_and(|v| v.contains("justify")) {
            justified += 1;
        }
        let line_height = declared(&rules, p, "line-height", &inherit)
            .and_then(|v| css::line_height_ratio(&v, font_px));
        if let Some(lh) = line_height {
            lh_checked += 1;
            if lh >= 1.5 {
                lh_ok += 1;
            } else {
                spacing_offenders.push(json!({
                    "type": "line_height",
                    "snippet": snippet(p),
                    "line_height_ratio": round4(lh),
                    "required": 1.5,
                }));
            }
        }
        let margin = declared(&rules, p, "margin-bottom", &[]).and_then(|v| css::px(&v));
        if let (Some(margin), Some(lh)) = (margin, line_height) {
            spacing_checked += 1;
            let spacing = margin / (lh * font_px);
            if spacing >= 1.5 {
                spacing_ok += 1;
            } else {
                spacing_offenders.push(json!({
                    "type": "paragraph_spacing",
                    "snippet": snippet(p),
                    "paragraph_spacing_ratio": round4(spacing),
                    "required": 1.5,
                }));
            }
        }
    }

    let color_mechanism = has_color_mechanism(ctx);
    let width_fine = width_checked == 0 || width_ok as f64 / width_checked as f64 >= 0.7;
    let lines_fine = lh_checked == 0 || lh_ok as f64 / lh_checked as f64 >= 0.7;
    let spacing_fine = spacing_checked == 0 || spacing_ok as f64 / spacing_checked as f64 >= 0.7;

    let mut offenders: Vec<Value> = Vec::new();
    let mut hard = false;
    if !color_mechanism {
        offenders.push(json!({
            "type": "color_mechanism",
            "reason": "No mechanism to pick foreground and background colors.",
        }));
    }
    if !width_fine {
        hard = true;
        offenders.extend(width_offenders.iter().cloned());
    }
    if justified > 0 {
        hard = true;
        offenders.push(json!({ "type": "justify", "blocks": justified }));
    }
    if !lines_fine || !spacing_fine {
        hard = true;
        offenders.extend(spacing_offenders.iter().cloned());
    }
    offenders.truncate(MAX_OFFENDERS);

    let total = blocks.len();
    let penalties = usize::from(justified > 0) + width_offenders.len() + spacing_offenders.len();
    let d = details(json!({
        "lang_cjk": is_cjk,
        "total_blocks": total,
        "has_color_mechanism": color_mechanism,
        "width_checked": width_checked,
        "width_ok": width_ok,
        "width_unknown": total - width_checked,
        "max_chars_allowed": max_chars,
        "justify_blocks": justified,
        "lineheight_checked": lh_checked,
        "lineheight_ok": lh_ok,
        "lineheight_unknown": total - lh_checked,
        "paragraph_spacing_ok": spacing_fine,
        "paragraph_spacing_unknown": total - spacing_checked,
        "ok_ratio": ratio(total.saturating_sub(penalties), total),
        "offenders": offenders,
        "note": note(pass, "text blocks need lines of at most 80 characters (40 CJK), no justification, line-height 1.5 and paragraph spacing 1.5 times that."),
    }));
    scoped(d, total > 0, !hard)
}

static LONG_WORD: OnceLock<Option<Regex>> = OnceLock::new();

/// 1.4.12 Text Spacing
pub fn text_spacing(ctx: &PageContext, pass: Pass) -> Evaluation {
    let rules = page_rules(ctx);
    let mut examined = 0usize;
    let mut fixed_height = 0usize;
    let mut truncation = 0usize;
    let mut nowrap = 0usize;
    let mut hard_override = 0usize;
    let mut offenders = Vec::new();

    let blocks = ctx.elements.iter().filter(|el| {
        matches!(el.tag.as_str(), "p" | "li" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "button" | "label" | "td")
            && !el.text.is_empty()
    });
    for el in blocks {
        examined += 1;
        let mut risks: Vec<&str> = Vec::new();
        let overflow = declared(&rules, el, "overflow", &[])
            .or_else(|| declared(&rules, el, "overflow-y", &[]))
            .unwrap_or_default();
        let fixed = declared(&rules, el, "height", &[])
            .is_some_and(|h| h.trim().ends_with("px") || h.trim().ends_with("em"));
        if fixed && (overflow.contains("hidden") || overflow.contains("clip")) {
            fixed_height += 1;
            risks.push("fixed_height_clip");
        }
        let class = el.class().to_ascii_lowercase();
        if declared(&rules, el, "text-overflow", &[]).is_some_and(|v| v.contains("ellipsis"))
            || declared(&rules, el, "-webkit-line-clamp", &[]).is_some()
            || class.contains("truncate")
            || class.contains("line-clamp")
        {
            truncation += 1;
            risks.push("clamp_or_ellipsis");
        }
        let white_space = declared(&rules, el, "white-space", &[]).unwrap_or_default();
        if white_space.contains("nowrap")
            || cached_match(&LONG_WORD, r"[A-Za-z0-9_]{40,}", &el.text)
        {
            nowrap += 1;
            risks.push("nowrap_or_longword");
        }
        let important = ["line-height", "letter-spacing", "word-spacing"].iter().any(|prop| {
            declared(&rules, el, prop, &[]).is_some_and(|v| v.contains("!important"))
        });
        if important {
            hard_override += 1;
            risks.push("hard_to_override");
        }
        for kind in risks {
            if offenders.len() < MAX_OFFENDERS {
                offenders.push(json!({ "type": kind, "tag": el.tag, "snippet": snippet(el) }));
            }
        }
    }

    let risky = fixed_height + truncation + nowrap;
    let d = details(json!({
        "blocks_examined": examined,
        "risks_fixed_height": fixed_height,
        "risks_truncation": truncation,
        "risks_nowrap": nowrap,
        "risks_hard_override": hard_override,
        "violations": 0,
        "ok_ratio": ratio(examined.saturating_sub(risky), examined),
        "offenders": offenders,
        "note": note(pass, "raised spacing (line-height 1.5, letter 0.12em, word 0.16em, paragraph 2em) must not clip content. Static markup only shows risks; a rendered run confirms them."),
    }));
    scoped(d, examined > 0, true)
}

const TOOLTIP_ATTRS: &[&str] = &["title", "data-title", "data-tooltip"];
const POPUP_ATTRS: &[&str] = &["aria-haspopup", "aria-expanded", "aria-controls", "data-popover", "data-menu"];
const POPUP_CLASSES: &[&str] = &["tooltip", "popover", "menu", "dropdown", "hovercard", "hover-card"];

fn hover_trigger(el: &Element) -> bool {
    let class = el.class().to_ascii_lowercase();
    TOOLTIP_ATTRS.iter().chain(POPUP_ATTRS).any(|a| el.attr_nonempty(a).is_some())
        || matches!(el.role().as_str(), "combobox" | "menuitem" | "treeitem" | "gridcell")
        || POPUP_CLASSES.iter().any(|c| class.contains(c))
}

/// 1.4.13 Content on Hover or Focus
pub fn content_on_hover_or_focus(ctx: &PageContext, pass: Pass) -> Evaluation {
    let candidates = ctx.elements.iter().filter(|el| {
        matches!(el.tag.as_str(), "a" | "button" | "input" | "select" | "textarea" | "abbr" | "span" | "i")
            || el.has_attr("data-tooltip")
    });

    let mut examined = 0usize;
    let mut applicable = 0usize;
    let mut dismissible = 0usize;
    let mut hoverable = 0usize;
    let mut persistent = 0usize;
    let mut unknown = 0usize;
    let mut violations = 0usize;
    let mut offenders = Vec::new();

    for el in candidates {
        examined += 1;
        if !hover_trigger(el) {
            continue;
        }
        applicable += 1;
        let flags = (
            el.flag("data-dismissible") || el.flag("data-esc-dismiss"),
            el.flag("data-hoverable"),
            el.flag("data-persistent"),
        );
        dismissible += usize::from(flags.0);
        hoverable += usize::from(flags.1);
        persistent += usize::from(flags.2);
        // a native title tooltip can be neither dismissed, hovered nor kept open
        let native_title = el.attr_nonempty("title").is_some() && !(flags.0 || flags.1 || flags.2);
        if native_title {
            violations += 1;
            if offenders.len() < MAX_OFFENDERS {
                let mut o = el.describe();
                o["title"] = json!(el.attr("title").unwrap_or_default());
                o["reason"] = json!("Native title tooltip: not dismissible, not hoverable, not persistent.");
                offenders.push(o);
            }
        } else if !(flags.0 && flags.1 && flags.2) {
            unknown += 1;
        }
    }

    let d = details(json!({
        "triggers_examined": examined,
        "applicable": applicable,
        "pass_dismissible": dismissible,
        "pass_hoverable": hoverable,
        "pass_persistent": persistent,
        "unknown_behavior": unknown,
        "violations": violations,
        "ok_ratio": ratio(applicable.saturating_sub(violations), applicable),
        "offenders": offenders,
        "note": note(pass, "tooltips and popups opened on hover or focus must be dismissible, hoverable and persistent."),
    }));
    with_unknowns(d, applicable, violations, unknown)
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
    fn color_only_links_and_fields() {
        let ok = run(use_of_color, r#"<p>Lea <a href="/t">los términos</a>.</p>"#);
        assert_eq!(ok.details["links_total"], json!(1));
        assert_eq!(ok.verdict, Verdict::Pass);

        let html = r#"<style>p a { text-decoration: none; color: #c00 }</style>
            <p>Lea <a href="/t">los términos</a>.</p>
            <input id="e" aria-invalid="true"><label for="e">Correo</label>"#;
        let eval = run(use_of_color, html);
        assert_eq!(eval.details["links_color_only"], json!(1));
        assert_eq!(eval.details["error_color_only"], json!(1));
        assert_eq!(eval.verdict, Verdict::Fail);

        let none = run(use_of_color, "<h1>Sin enlaces</h1>");
        assert_eq!(none.verdict, Verdict::Na);
    }

    #[test]
    fn images_of_text_with_logo_exception() {
        let html = r#"<img src="/logo.png" alt="Marca"><img src="/promo-banner.png" alt="Oferta">"#;
        let eval = run(images_of_text_no_exception, html);
        assert_eq!(eval.details["exempt_logos"], json!(1));
        assert_eq!(eval.details["risky_heuristics"], json!(1));
        assert_eq!(eval.verdict, Verdict::Pass);

        let html = r#"<img src="/a.png" alt="Horario" data-image-of-text="true"><img src="/b.jpg" alt="Foto">"#;
        let strict = run(images_of_text_no_exception, html);
        assert_eq!(strict.verdict, Verdict::Partial);

        let html = r#"<img src="/a.png" alt="Diagrama" data-image-of-text="true" data-essential="true">"#;
        assert_eq!(run(images_of_text_aa, html).verdict, Verdict::Pass);
        assert_eq!(run(images_of_text_no_exception, html).verdict, Verdict::Fail);
    }

    #[test]
    fn background_audio_annotations() {
        let none = run(low_background_audio, r#"<audio src="/music.mp3"></audio>"#);
        assert_eq!(none.verdict, Verdict::Na);

        let html = r#"
            <audio src="/podcast-1.mp3" data-background-audio="none"></audio>
            <audio src="/podcast-2.mp3" data-bg-to-speech-db="-8"></audio>"#;
        let eval = run(low_background_audio, html);
        assert_eq!(eval.details["applicable"], json!(2));
        assert_eq!(eval.details["violations"], json!(1));
        assert_eq!(eval.verdict, Verdict::Partial);
    }

    #[test]
    fn presentation_of_text_blocks() {
        let none = run(visual_presentation, "<div>x</div>");
        assert_eq!(none.verdict, Verdict::Na);

        let html = r#"<style>body { line-height: 1.6 } @media (prefers-color-scheme: dark) { body { color: #eee } }</style>
            <p style="max-width: 60ch">Uno</p><p>Dos</p>"#;
        let eval = run(visual_presentation, html);
        assert_eq!(eval.details["has_color_mechanism"], json!(true));
        assert_eq!(eval.verdict, Verdict::Pass);

        let html = r#"<style>p { text-align: justify; line-height: 1.1 }</style><p>Uno</p>"#;
        let eval = run(visual_presentation, html);
        assert_eq!(eval.details["justify_blocks"], json!(1));
        assert_eq!(eval.verdict, Verdict::Fail);
    }

    #[test]
    fn spacing_risks_lower_the_ratio() {
        let clean = run(text_spacing, "<p>Texto normal</p>");
        assert_eq!(clean.verdict, Verdict::Pass);

        let html = r#"<style>p.clip { height: 40px; overflow: hidden }</style>
            <p class="clip">Recortado</p><p>Libre</p>"#;
        let eval = run(text_spacing, html);
        assert_eq!(eval.details["risks_fixed_height"], json!(1));
        assert_eq!(eval.verdict, Verdict::Partial);

        assert_eq!(run(text_spacing, "<div></div>").verdict, Verdict::Na);
    }

    #[test]
    fn hover_content() {
        assert_eq!(run(content_on_hover_or_focus, r#"<a href="/">x</a>"#).verdict, Verdict::Na);

        let titled = run(content_on_hover_or_focus, r#"<a href="/" title="Ir al inicio">Inicio</a>"#);
        assert_eq!(titled.details["violations"], json!(1));
        assert_eq!(titled.verdict, Verdict::Fail);

        let menu = run(content_on_hover_or_focus, r#"<button aria-haspopup="true">Menú</button>"#);
        assert_eq!(menu.details["unknown_behavior"], json!(1));
        assert_eq!(menu.verdict, Verdict::Partial);

        let declared = run(
            content_on_hover_or_focus,
            r#"<button aria-haspopup="true" data-dismissible="true" data-hoverable="true" data-persistent="true">Menú</button>"#,
        );
        assert_eq!(declared.verdict, Verdict::Pass);
    }
}
