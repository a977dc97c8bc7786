//! Guideline 1.3: Adaptable (the criteria beyond structure and input purpose)

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Value};

use crate::engine::context::{collapse_ws, Element, PageContext};
use crate::engine::css;
use crate::engine::outcome::Evaluation;

use super::{
    accessible_name, cached_match, details, focusable, note, ratio, scoped, Pass,
    INTERACTIVE_ROLES, MAX_OFFENDERS,
};
use super::perceivable::autocomplete_valid;

fn push(offenders: &mut Vec<Value>, el: &Element, reason: &str) {
    if offenders.len() < MAX_OFFENDERS {
        let mut o = el.describe();
        o["reason"] = json!(reason);
        offenders.push(o);
    }
}

/// No accessible name beyond a glyph or two
fn unnamed(ctx: &PageContext, el: &Element) -> bool {
    accessible_name(ctx, el).map_or(true, |n| n.trim().chars().count() <= 2)
}

fn has_class(el: &Element, names: &[&str]) -> bool {
    el.class()
        .split_whitespace()
        .any(|c| names.contains(&c.to_ascii_lowercase().as_str()))
}

/// 1.3.2 Meaningful Sequence
pub fn meaningful_sequence(ctx: &PageContext, pass: Pass) -> Evaluation {
    let mut focusables = 0usize;
    let mut positive_tabindex = 0usize;
    let mut focusable_hidden = 0usize;
    let mut focusable_aria_hidden = 0usize;
    let mut noninteractive_tabbable = 0usize;
    let mut css_reorder_flags = 0usize;
    let mut positioned_flags = 0usize;
    let mut aria_flowto_count = 0usize;
    let mut offenders = Vec::new();

    for el in &ctx.elements {
        if el.has_attr("aria-flowto") {
            aria_flowto_count += 1;
        }
        let style = el.attr("style").unwrap_or_default().to_ascii_lowercase().replace(' ', "");
        if style.contains("flex-direction:row-reverse")
            || style.contains("flex-direction:column-reverse")
            || style.split(';').any(|d| d.strip_prefix("order:").is_some_and(|v| v != "0"))
        {
            css_reorder_flags += 1;
        }
        if style.contains("position:absolute") || style.contains("position:fixed") {
            positioned_flags += 1;
        }

        if !focusable(el) {
            continue;
        }
        focusables += 1;
        if el.tabindex().is_some_and(|t| t > 0) {
            positive_tabindex += 1;
            push(&mut offenders, el, "Positive tabindex overrides the DOM reading order.");
        }
        if el.has_attr("hidden") || has_class(el, &["hidden", "sr-only", "visually-hidden"]) {
            focusable_hidden += 1;
            push(&mut offenders, el, "Focusable element that is visually hidden.");
        }
        if el.flag("aria-hidden") {
            focusable_aria_hidden += 1;
            push(&mut offenders, el, "Focusable element inside the sequence but aria-hidden.");
        }
        let native = super::natively_interactive(el) || INTERACTIVE_ROLES.contains(&el.role().as_str());
        if !native && el.tabindex().is_some_and(|t| t >= 0) {
            noninteractive_tabbable += 1;
            push(&mut offenders, el, "Non-interactive element placed in the tab sequence.");
        }
    }

    for rule in css::rules(&ctx.styles.join("\n")) {
        let reversed = rule
            .declaration("flex-direction")
            .is_some_and(|v| v.contains("reverse"));
        let ordered = rule.declaration("order").is_some_and(|v| v.trim() != "0");
        if reversed || ordered {
            css_reorder_flags += 1;
        }
    }

    let violations =
        positive_tabindex + focusable_hidden + focusable_aria_hidden + noninteractive_tabbable;
    let empty = focusables == 0 && css_reorder_flags == 0 && positioned_flags == 0 && aria_flowto_count == 0;
    let d = details(json!({
        "focusables_total": focusables,
        "positive_tabindex": positive_tabindex,
        "focusable_hidden": focusable_hidden,
        "focusable_aria_hidden": focusable_aria_hidden,
        "noninteractive_tabbable": noninteractive_tabbable,
        "css_reorder_flags": css_reorder_flags,
        "positioned_flags": positioned_flags,
        "aria_flowto_count": aria_flowto_count,
        "violations": violations,
        "ok_ratio": ratio(focusables.saturating_sub(violations), focusables),
        "offenders": offenders,
        "note": note(pass, "DOM order must give a meaningful sequence: no positive tabindex, no hidden focus stops. CSS reordering is reported for review."),
    }));
    scoped(d, !empty, violations == 0)
}

const COLOR_WORDS: &[&str] = &[
    "rojo", "roja", "verde", "azul", "amarillo", "amarilla", "negro", "negra", "blanco",
    "blanca", "naranja", "morado", "lila", "violeta", "rosado", "rosa", "celeste", "cian",
    "turquesa", "gris", "plomo", "fucsia", "marrón", "marron", "beige", "dorado", "plateado",
];

const SHAPE_WORDS: &[&str] = &[
    "círculo", "circulo", "cuadrado", "rectángulo", "rectangulo", "triángulo", "triangulo",
    "rombo", "estrella", "flecha", "ovalo", "óvalo", "hexágono", "hexagono", "icono", "ícono",
    "íconos", "iconos",
];

const LOCATION_WORDS: &[&str] = &[
    "izquierda", "derecha", "arriba", "abajo", "superior", "inferior", "a la izquierda",
    "a la derecha", "columna izquierda", "columna derecha", "panel izquierdo", "panel derecho",
    "primer cuadro", "segundo cuadro",
];

const SOUND_WORDS: &[&str] = &[
    "sonido", "audio", "pitido", "campana", "alarma", "vibración", "vibracion", "tono", "beep",
    "bip",
];

static SENSORY_INSTRUCTION: OnceLock<Option<Regex>> = OnceLock::new();

fn mentions(words: &[String], text: &str, vocabulary: &[&str]) -> bool {
    vocabulary.iter().any(|v| {
        if v.contains(' ') {
            text.contains(v)
        } else {
            words.iter().any(|w| w == v)
        }
    })
}

/// Instruction-like texts: headings, paragraphs, labels, control names
fn instruction_texts(ctx: &PageContext) -> Vec<(&Element, String)> {
    let mut out = Vec::new();
    for el in &ctx.elements {
        let text = match el.tag.as_str() {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "p" | "label" | "button" | "a" | "legend"
            | "figcaption" | "li" => el.text.clone(),
            "input" | "select" | "textarea" => ["aria-label", "title", "placeholder"]
                .iter()
                .filter_map(|a| el.attr_nonempty(a))
                .collect::<Vec<_>>()
                .join(" "),
            _ => continue,
        };
        let text = collapse_ws(&text);
        if !text.is_empty() {
            out.push((el, text.chars().take(500).collect()));
        }
    }
    out
}

/// 1.3.3 Sensory Characteristics
pub fn sensory_characteristics(ctx: &PageContext, pass: Pass) -> Evaluation {
    let texts = instruction_texts(ctx);
    let mut flagged = 0usize;
    let mut flagged_color = 0usize;
    let mut flagged_shape = 0usize;
    let mut flagged_location = 0usize;
    let mut flagged_sound = 0usize;
    let mut offenders = Vec::new();

    for (el, text) in &texts {
        let low = text.to_lowercase();
        let words: Vec<String> = low
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect();
        let color = mentions(&words, &low, COLOR_WORDS);
        let shape = mentions(&words, &low, SHAPE_WORDS);
        let location = mentions(&words, &low, LOCATION_WORDS);
        let sound = mentions(&words, &low, SOUND_WORDS);
        let pattern = cached_match(
            &SENSORY_INSTRUCTION,
            r"(?i)\b(bot[oó]n|enlace|link)\s+(rojo|verde|azul|amarill[oa]|negr[oa]|blanc[oa])|\b(haz clic|click|presiona|pulse|selecciona)\s+(en\s+el|en\s+la|en|el|la)\s+(c[ií]rculo|cuadrado|tri[aá]ngulo|flecha)|\b(a la|en la|en el)\s+(izquierda|derecha|parte superior|parte inferior)\b|\b(sigue|use|utiliza|utilice)\s+el\s+sonido\b",
            text,
        );
        // single cues are noise on their own; an instruction needs a pattern or two cues
        let cues = [color, shape, location, sound].iter().filter(|c| **c).count();
        if !(pattern || cues >= 2) {
            continue;
        }
        flagged += 1;
        flagged_color += usize::from(color);
        flagged_shape += usize::from(shape);
        flagged_location += usize::from(location);
        flagged_sound += usize::from(sound);
        if offenders.len() < MAX_OFFENDERS {
            let mut o = el.describe();
            o["text"] = json!(text.chars().take(160).collect::<String>());
            o["reason"] = json!("Instruction relies on color, shape, position or sound.");
            offenders.push(o);
        }
    }

    let icon_only = ctx
        .by_tag(&["button", "a"])
        .filter(|el| !el.text.is_empty() && unnamed(ctx, el))
        .count();

    let d = details(json!({
        "texts_examined": texts.len(),
        "flagged_texts": flagged,
        "flagged_color": flagged_color,
        "flagged_shape": flagged_shape,
        "flagged_location": flagged_location,
        "flagged_sound": flagged_sound,
        "icon_only_interactives": icon_only,
        "ok_ratio": ratio(texts.len() - flagged, texts.len()),
        "offenders": offenders,
        "note": note(pass, "instructions must not rely only on color, shape, location or sound."),
    }));
    scoped(d, !texts.is_empty() || icon_only > 0, flagged == 0)
}

const LOCK_CALLS: &[&str] = &[
    "screen.orientation.lock(",
    "lockorientation(",
    "mozlockorientation(",
    "mslockorientation(",
];

const OVERLAY_HINTS: &[&str] = &[
    "rotate", "rotation", "landscape-only", "portrait-only", "orientation-lock", "rotate-device",
    "only-landscape", "only-portrait",
];

static ROTATE_MESSAGE: OnceLock<Option<Regex>> = OnceLock::new();

fn hides(rule: &css::Rule) -> bool {
    rule.declaration("display").is_some_and(|v| v.trim().starts_with("none"))
        || rule.declaration("visibility").is_some_and(|v| v.trim().starts_with("hidden"))
}

/// 1.3.4 Orientation
pub fn orientation(ctx: &PageContext, pass: Pass) -> Evaluation {
    let scripts = ctx.script_text().replace(' ', "");
    let lock_scripts = LOCK_CALLS.iter().filter(|c| scripts.contains(*c)).count();

    let css_blocks = css::rules(&ctx.styles.join("\n"))
        .into_iter()
        .filter(|r| r.media.as_deref().is_some_and(|m| m.contains("orientation")))
        .filter(|r| {
            r.targets(&["html", "body", "main"])
                || r.selector.contains("#root")
                || r.selector.contains("#app")
        })
        .filter(hides)
        .count();

    let mut overlays = 0usize;
    let mut messages = 0usize;
    let mut offenders = Vec::new();
    for el in &ctx.elements {
        let id = el.id().to_ascii_lowercase();
        if has_class(el, OVERLAY_HINTS) || OVERLAY_HINTS.iter().any(|h| id.contains(h)) {
            overlays += 1;
            push(&mut offenders, el, "Overlay asking to rotate or restricting orientation.");
        }
        if matches!(el.tag.as_str(), "p" | "h1" | "h2" | "h3" | "div" | "span" | "strong")
            && !el.text.is_empty()
            && el.text.len() < 300
            && cached_match(
                &ROTATE_MESSAGE,
                r"(?i)\b(gira|gire|girar|rotar|rote|rotaci[oó]n)\b.*\b(dispositivo|pantalla|tel[eé]fono|m[óo]vil)\b|\b(please rotate|landscape only|portrait only)\b|\bsolo\s+en\s+(modo|orientaci[oó]n)\s+(horizontal|vertical|paisaje|retrato)\b",
                &el.text,
            )
        {
            messages += 1;
        }
    }

    let hard = lock_scripts + css_blocks + overlays;
    let d = details(json!({
        "orientation_lock_scripts": lock_scripts,
        "orientation_css_blocks": css_blocks,
        "orientation_overlays": overlays,
        "rotation_messages": messages,
        "ok_ratio": if hard > 0 { 0.0 } else { 1.0 },
        "offenders": offenders,
        "note": note(pass, "content must not be locked to one orientation (screen.orientation.lock, orientation media queries hiding the page, rotate overlays)."),
    }));
    scoped(d, hard + messages > 0, hard == 0)
}

static COMMON_PURPOSE: OnceLock<Option<Regex>> = OnceLock::new();
static ICON_CLASS: OnceLock<Option<Regex>> = OnceLock::new();

fn common_purpose(name: &str, class: &str) -> bool {
    cached_match(
        &COMMON_PURPOSE,
        r"(?i)\b(home|inicio|principal|men[uú]|search|buscar|b[uú]squeda|busqueda|settings|ajustes|configuraci[oó]n|help|ayuda|soporte|info|informaci[oó]n|close|cerrar|salir|back|atr[aá]s|volver|next|siguiente|continuar|prev|previo|anterior|edit|editar|save|guardar|delete|eliminar|borrar|add|agregar|a[nñ]adir|remove|quitar|download|descargar|upload|subir|share|compartir|print|imprimir|filter|filtrar|filtro|sort|ordenar|refresh|recargar|actualizar|full\s?screen|pantalla completa|zoom in|acercar|zoom out|alejar|play|reproducir|pause|pausa|stop|detener|mute|silencio|silenciar|login|log in|iniciar sesi[oó]n|entrar|logout|log out|cerrar sesi[oó]n|register|sign ?up|registro|crear cuenta|profile|perfil|account|cuenta|cart|carrito|cesta|basket|wishlist|email|correo|phone|tel[eé]fono|llamar|chat|mensaje|calendar|calendario|agenda|bookmark|marcador|favorito)\b",
        name,
    ) || cached_match(
        &ICON_CLASS,
        r"(?i)(icon|fa|bi|mdi)[-\s_:]?(search|close|menu|home|settings|download|upload|print|share|play|pause|stop|cart|trash|delete|edit|save|filter|sort|star|heart)",
        class,
    )
}

const LANDMARK_ROLES: &[&str] = &[
    "banner", "main", "contentinfo", "navigation", "search", "complementary", "form", "region",
];

const STRUCTURE_CLASS_HINTS: &[&str] = &[
    "nav", "menu", "header", "footer", "sidebar", "aside", "search", "navbar", "topbar",
    "masthead", "breadcrumb",
];

/// 1.3.6 Identify Purpose
pub fn identify_purpose(ctx: &PageContext, pass: Pass) -> Evaluation {
    let mut icons = 0usize;
    let mut missing_name = 0usize;
    let mut with_purpose = 0usize;
    let mut unknown_purpose = 0usize;
    let mut offenders = Vec::new();

    for el in &ctx.elements {
        let interactive = match el.tag.as_str() {
            "a" => el.has_attr("href") || el.tabindex().is_some_and(|t| t >= 0),
            "button" | "summary" => true,
            "input" => !matches!(el.input_type().as_str(), "hidden"),
            _ => INTERACTIVE_ROLES.contains(&el.role().as_str()),
        };
        if !interactive {
            continue;
        }
        icons += 1;
        let name = accessible_name(ctx, el).unwrap_or_default();
        if unnamed(ctx, el) {
            missing_name += 1;
            push(&mut offenders, el, "Icon-only control without an accessible name.");
        } else if common_purpose(&name, el.class()) {
            with_purpose += 1;
        } else {
            unknown_purpose += 1;
        }
    }

    let mut landmarks = 0usize;
    let mut gaps = 0usize;
    for el in &ctx.elements {
        let role = el.role();
        let is_landmark = LANDMARK_ROLES.contains(&role.as_str())
            || matches!(el.tag.as_str(), "main" | "nav" | "header" | "footer" | "aside" | "form");
        if is_landmark {
            landmarks += 1;
            let generic = role == "region" || role == "form";
            if generic && el.attr_nonempty("aria-label").is_none() && el.attr_nonempty("aria-labelledby").is_none() {
                gaps += 1;
                push(&mut offenders, el, "Generic region or form landmark without a name.");
            }
            continue;
        }
        if matches!(el.tag.as_str(), "div" | "section" | "ul")
            && el
                .class()
                .to_ascii_lowercase()
                .split([' ', '-', '_'])
                .any(|c| STRUCTURE_CLASS_HINTS.contains(&c))
        {
            gaps += 1;
            push(&mut offenders, el, "Navigation-like container without a landmark.");
        }
    }

    let input_purpose_tokens = ctx
        .by_tag(&["input", "select", "textarea"])
        .filter_map(|el| el.attr_nonempty("autocomplete"))
        .filter(|ac| autocomplete_valid(ac))
        .count();

    let examined = icons + landmarks;
    let fine = (icons - missing_name) + landmarks.saturating_sub(gaps);
    let violations = missing_name + gaps;
    let d = details(json!({
        "icons_examined": icons,
        "icons_missing_name": missing_name,
        "icons_with_common_purpose": with_purpose,
        "icons_unknown_purpose": unknown_purpose,
        "landmarks_detected": landmarks,
        "landmark_gaps": gaps,
        "input_purpose_tokens": input_purpose_tokens,
        "violations": violations,
        "ok_ratio": ratio(fine.min(examined), examined),
        "offenders": offenders,
        "note": note(pass, "the purpose of controls, icons and regions must be programmatically determinable (names, landmarks, autocomplete)."),
    }));
    scoped(d, icons + landmarks + gaps > 0, violations == 0)
}
