//! Principle 1: Perceivable

use serde_json::{json, Value};

use crate::contract::Verdict;
use crate::engine::color::{contrast_ratio, inline_style, is_large_text, parse_css_color};
use crate::engine::context::{Element, PageContext};
use crate::engine::outcome::{ratio_verdict, Evaluation};

use super::{details, needs_browser, note, ratio, Pass, MAX_OFFENDERS};

fn decorative(el: &Element) -> bool {
    el.flag("aria-hidden") || matches!(el.role().as_str(), "presentation" | "none")
}

fn src_of(el: &Element) -> String {
    el.attr("src").unwrap_or_default().chars().take(180).collect()
}

/// 1.1.1 Non-text Content
pub fn non_text_content(ctx: &PageContext, pass: Pass) -> Evaluation {
    let mut total = 0usize;
    let mut with_alt = 0usize;
    let mut decorative_count = 0usize;
    let mut offenders = Vec::new();

    for img in ctx.imgs() {
        total += 1;
        let reason = match img.attr("alt") {
            Some(alt) if !alt.trim().is_empty() => {
                with_alt += 1;
                None
            }
            _ if decorative(img) => {
                decorative_count += 1;
                None
            }
            Some(_) if img.in_link => Some("Linked image with empty alt; it must describe the destination."),
            Some(_) => Some("Empty alt without an explicit decorative marker."),
            None => Some("Missing alt attribute on a non-decorative image."),
        };
        if let Some(reason) = reason {
            if offenders.len() < MAX_OFFENDERS {
                offenders.push(json!({
                    "tag": "img",
                    "src": src_of(img),
                    "id": img.id(),
                    "role": img.role(),
                    "reason": reason,
                }));
            }
        }
    }

    let missing = total - with_alt - decorative_count;
    let ok_ratio = ratio(with_alt + decorative_count, total);
    let verdict = if total == 0 {
        Verdict::Na
    } else if missing == 0 {
        Verdict::Pass
    } else if ok_ratio >= 0.8 {
        Verdict::Partial
    } else {
        Verdict::Fail
    };

    let mut d = details(json!({
        "images_total": total,
        "with_alt": with_alt,
        "decorative": decorative_count,
        "missing_alt": missing,
        "ok_ratio": ok_ratio,
        "offenders": offenders,
        "note": note(pass, "counts present/missing alt and decorative images (alt=\"\" with aria-hidden or role=presentation). Linked images with empty alt fail."),
    }));
    if total == 0 {
        d.insert("na".into(), Value::Bool(true));
    }
    Evaluation::new(verdict, d)
}

/// Largest jumps in heading levels (h2 followed by h4, ...)
fn heading_jumps(levels: &[u8]) -> Vec<(u8, u8)> {
    levels
        .windows(2)
        .filter(|w| w[1] > w[0] + 1)
        .map(|w| (w[0], w[1]))
        .collect()
}

const NON_LABELLED_INPUT_TYPES: &[&str] = &["hidden", "button", "submit", "reset", "image"];

/// 1.3.1 Info and Relationships
pub fn info_and_relationships(ctx: &PageContext, pass: Pass) -> Evaluation {
    let levels: Vec<u8> = ctx.headings().filter_map(Element::heading_level).collect();
    let jumps = heading_jumps(&levels);
    let hierarchy_ok = jumps.is_empty();

    let lists: Vec<&Element> = ctx.by_tag(&["ul", "ol", "dl"]).collect();
    let lists_bad = lists.iter().filter(|l| l.item_count == 0).count();

    let mut data_tables = 0usize;
    let mut tables_without_th = 0usize;
    let mut offenders = Vec::new();
    for table in ctx.tables() {
        if decorative(table) || table.row_count < 2 {
            continue;
        }
        data_tables += 1;
        if table.th_count == 0 {
            tables_without_th += 1;
            if offenders.len() < MAX_OFFENDERS {
                let mut o = table.describe();
                o["rows"] = json!(table.row_count);
                o["reason"] = json!("Data table without header cells (<th>).");
                offenders.push(o);
            }
        }
    }

    let mut controls_total = 0usize;
    let mut controls_missing_label = 0usize;
    for input in ctx.inputs() {
        let kind = input.attr("type").unwrap_or_default().to_ascii_lowercase();
        if NON_LABELLED_INPUT_TYPES.contains(&kind.as_str()) {
            continue;
        }
        controls_total += 1;
        let labelled = input.in_label || super::accessible_name(ctx, input).is_some();
        if !labelled {
            controls_missing_label += 1;
            if offenders.len() < MAX_OFFENDERS {
                let mut o = input.describe();
                o["reason"] = json!("Form control without a programmatic label.");
                offenders.push(o);
            }
        }
    }

    let jump_labels: Vec<String> = jumps.iter().map(|(a, b)| format!("h{a}->h{b}")).collect();
    let main_regions = ctx
        .elements
        .iter()
        .filter(|e| e.tag == "main" || e.role() == "main")
        .count();

    let structural_issues = tables_without_th + lists_bad + controls_missing_label;
    let verdict = match (structural_issues == 0, hierarchy_ok) {
        (true, true) => Verdict::Pass,
        (false, false) => Verdict::Fail,
        _ => Verdict::Partial,
    };

    let d = details(json!({
        "headings_total": levels.len(),
        "h1_present": levels.contains(&1),
        "heading_hierarchy_ok": hierarchy_ok,
        "heading_jumps": jump_labels,
        "lists_total": lists.len(),
        "lists_bad": lists_bad,
        "tables_total": ctx.tables().count(),
        "data_tables": data_tables,
        "tables_without_th": tables_without_th,
        "controls_total": controls_total,
        "controls_missing_label": controls_missing_label,
        "main_regions": main_regions,
        "offenders": offenders,
        "note": note(pass, "checks heading hierarchy, list structure, header cells in data tables and labels on form controls."),
    }));
    Evaluation::new(verdict, d)
}

/// Autocomplete tokens from the HTML input purpose list
const AUTOCOMPLETE_TOKENS: &[&str] = &[
    "name", "honorific-prefix", "given-name", "additional-name", "family-name",
    "honorific-suffix", "nickname", "email", "username", "new-password", "current-password",
    "organization-title", "organization", "street-address", "address-line1", "address-line2",
    "address-line3", "address-level4", "address-level3", "address-level2", "address-level1",
    "country", "country-name", "postal-code", "cc-name", "cc-given-name", "cc-additional-name",
    "cc-family-name", "cc-number", "cc-exp", "cc-exp-month", "cc-exp-year", "cc-csc", "cc-type",
    "transaction-currency", "transaction-amount", "language", "bday", "bday-day", "bday-month",
    "bday-year", "sex", "tel", "tel-country-code", "tel-national", "tel-area-code", "tel-local",
    "tel-local-prefix", "tel-local-suffix", "tel-extension", "impp", "url", "photo",
    "one-time-code",
];

/// Qualifiers that may precede a purpose token
const AUTOCOMPLETE_QUALIFIERS: &[&str] = &[
    "shipping", "billing", "home", "work", "mobile", "fax", "pager", "webauthn",
];

/// Field name fragments that suggest personal data
const PERSONAL_HINTS: &[&str] = &[
    "name", "mail", "phone", "tel", "address", "zip", "postal", "city", "country", "user",
    "login", "birth", "card", "cc-", "nombre", "apellido", "correo", "telefono", "teléfono",
    "direccion", "dirección", "ciudad", "pais", "país", "usuario", "nacimiento", "tarjeta", "dni",
    "documento",
];

fn looks_personal(text: &str) -> bool {
    let text = text.to_lowercase();
    PERSONAL_HINTS.iter().any(|h| text.contains(h))
}

pub(super) fn autocomplete_valid(value: &str) -> bool {
    let tokens: Vec<String> = value.split_whitespace().map(str::to_ascii_lowercase).collect();
    let Some(last) = tokens.last() else {
        return false;
    };
    let prefix_ok = tokens[..tokens.len() - 1]
        .iter()
        .all(|t| t.starts_with("section-") || AUTOCOMPLETE_QUALIFIERS.contains(&t.as_str()));
    prefix_ok && AUTOCOMPLETE_TOKENS.contains(&last.as_str())
}

/// 1.3.5 Identify Input Purpose
pub fn identify_input_purpose(ctx: &PageContext, pass: Pass) -> Evaluation {
    let mut examined = 0usize;
    let mut applicable = 0usize;
    let mut with_autocomplete = 0usize;
    let mut offenders = Vec::new();

    for input in ctx.by_tag(&["input", "select", "textarea"]) {
        examined += 1;
        let kind = input.attr("type").unwrap_or_default().to_ascii_lowercase();
        let always = matches!(kind.as_str(), "email" | "tel" | "password");
        let text_like = matches!(kind.as_str(), "" | "text" | "url" | "search") || input.tag != "input";
        let named = format!(
            "{} {} {}",
            input.attr("name").unwrap_or_default(),
            input.id(),
            input.attr("placeholder").unwrap_or_default()
        );
        if !(always || (text_like && looks_personal(&named))) {
            continue;
        }
        applicable += 1;
        match input.attr("autocomplete") {
            Some(v) if autocomplete_valid(v) => with_autocomplete += 1,
            other => {
                if offenders.len() < MAX_OFFENDERS {
                    let mut o = input.describe();
                    o["type"] = json!(kind);
                    o["name"] = json!(input.attr("name").unwrap_or_default());
                    o["autocomplete"] = json!(other);
                    o["reason"] = json!(if other.is_some() {
                        "Autocomplete value is not a valid input purpose token."
                    } else {
                        "Personal data field without autocomplete."
                    });
                    offenders.push(o);
                }
            }
        }
    }

    let ok_ratio = ratio(with_autocomplete, applicable);
    let verdict = if applicable == 0 {
        Verdict::Na
    } else {
        ratio_verdict(ok_ratio, 1.0, 0.3)
    };
    let d = details(json!({
        "controls_examined": examined,
        "applicable": applicable,
        "inputs_total": applicable,
        "inputs_with_autocomplete": with_autocomplete,
        "ok_ratio": ok_ratio,
        "offenders": offenders,
        "note": note(pass, "personal data fields must expose their purpose with a valid autocomplete token."),
    }));
    Evaluation::new(verdict, d)
}

/// 1.4.2 Audio Control
pub fn audio_control(ctx: &PageContext, pass: Pass) -> Evaluation {
    let media: Vec<&Element> = ctx.by_tag(&["audio", "video"]).collect();
    let mut offenders = Vec::new();
    let mut issues = 0usize;
    for m in &media {
        if m.has_attr("autoplay") && !m.has_attr("muted") && !m.has_attr("controls") {
            issues += 1;
            if offenders.len() < MAX_OFFENDERS {
                let mut o = m.describe();
                o["src"] = json!(src_of(m));
                o["reason"] = json!("Autoplaying media with sound and no controls.");
                offenders.push(o);
            }
        }
    }
    let verdict = if media.is_empty() {
        Verdict::Na
    } else if issues == 0 {
        Verdict::Pass
    } else {
        Verdict::Fail
    };
    let d = details(json!({
        "media_total": media.len(),
        "autoplay_issues": issues,
        "offenders": offenders,
        "note": note(pass, "autoplaying audio needs a mechanism to pause or mute it."),
    }));
    Evaluation::new(verdict, d)
}

fn contrast(ctx: &PageContext, pass: Pass, normal_min: f64, large_min: f64, label: &str) -> Evaluation {
    if pass == Pass::Raw {
        return needs_browser(pass, label);
    }

    let mut tested = 0usize;
    let mut fails = 0usize;
    let mut offenders = Vec::new();
    for el in ctx.elements.iter().filter(|e| !e.text.is_empty()) {
        let Some(style) = el.attr("style") else {
            continue;
        };
        let fg = inline_style(style, "color").and_then(parse_css_color);
        let bg = inline_style(style, "background-color")
            .or_else(|| inline_style(style, "background"))
            .and_then(parse_css_color);
        let (Some(fg), Some(bg)) = (fg, bg) else {
            continue;
        };
        tested += 1;
        let large = is_large_text(&el.tag, &el.text);
        let required = if large { large_min } else { normal_min };
        let measured = contrast_ratio(fg, bg);
        if measured < required {
            fails += 1;
            if offenders.len() < MAX_OFFENDERS {
                let text: String = el.text.chars().take(80).collect();
                let mut o = el.describe();
                o["text"] = json!(text);
                o["ratio"] = json!(super::round4(measured));
                o["required"] = json!(required);
                o["large_text"] = json!(large);
                offenders.push(o);
            }
        }
    }

    let ok_ratio = ratio(tested - fails, tested);
    let mut d = details(json!({
        "tested": tested,
        "fails": fails,
        "ok_ratio": ok_ratio,
        "min_ratio_normal": normal_min,
        "min_ratio_large": large_min,
        "offenders": offenders,
        "note": note(pass, "contrast measured on elements with explicit color and background declarations."),
    }));
    let verdict = if tested == 0 {
        d.insert("na".into(), Value::Bool(true));
        Verdict::Na
    } else {
        ratio_verdict(ok_ratio, 1.0, 0.3)
    };
    Evaluation::new(verdict, d)
}

/// 1.4.3 Contrast (Minimum)
pub fn contrast_minimum(ctx: &PageContext, pass: Pass) -> Evaluation {
    contrast(ctx, pass, 4.5, 3.0, "text contrast")
}

/// 1.4.6 Contrast (Enhanced)
pub fn contrast_enhanced(ctx: &PageContext, pass: Pass) -> Evaluation {
    contrast(ctx, pass, 7.0, 4.5, "enhanced text contrast")
}

/// 1.4.4 Resize Text
pub fn resize_text(ctx: &PageContext, pass: Pass) -> Evaluation {
    let viewport = ctx.meta_viewport.clone().unwrap_or_default().to_ascii_lowercase();
    let mut user_scalable_no = false;
    let mut maximum_scale: Option<f64> = None;
    for part in viewport.split([',', ';']) {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        match key.trim() {
            "user-scalable" => {
                user_scalable_no = matches!(value.trim(), "no" | "0");
            }
            "maximum-scale" => maximum_scale = value.trim().parse().ok(),
            _ => {}
        }
    }
    let zoom_blocked = user_scalable_no || maximum_scale.is_some_and(|s| s < 2.0);
    let verdict = if zoom_blocked { Verdict::Fail } else { Verdict::Pass };
    let d = details(json!({
        "meta_viewport": ctx.meta_viewport,
        "user_scalable_no": user_scalable_no,
        "maximum_scale": maximum_scale,
        "zoom_blocked": zoom_blocked,
        "note": note(pass, "zoom must not be disabled by the viewport (user-scalable=no or maximum-scale < 2)."),
    }));
    Evaluation::new(verdict, d)
}

/// 1.4.10 Reflow
pub fn reflow(_ctx: &PageContext, pass: Pass) -> Evaluation {
    needs_browser(pass, "horizontal overflow at 320px")
}

/// 1.4.11 Non-text Contrast
pub fn non_text_contrast(_ctx: &PageContext, pass: Pass) -> Evaluation {
    needs_browser(pass, "contrast of UI components and graphics")
}
