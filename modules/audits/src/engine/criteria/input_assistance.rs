//! Guideline 3.3: Input Assistance, except labels
//!
//! The error checks only look at controls already marked `aria-invalid`,
//! which is how a rendered page reports a failed submission. The prevention
//! and help checks work per `<form>`.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Map, Value};

use crate::engine::context::{Element, PageContext};
use crate::engine::outcome::{ratio_verdict, Evaluation};

use super::{cached_match, details, note, round4, Pass, MAX_OFFENDERS};

/// Forms looked at per page
const MAX_FORMS: usize = 25;

/// Below this share of compliant items the verdict is a fail, not a partial
const STRICT_PARTIAL: f64 = 0.8;

fn assisted_control(el: &Element) -> bool {
    match el.tag.as_str() {
        "input" => !matches!(el.input_type().as_str(), "hidden" | "button" | "submit" | "reset" | "image"),
        "textarea" | "select" => true,
        _ => matches!(el.role().as_str(), "textbox" | "combobox" | "listbox" | "spinbutton" | "slider"),
    }
}

/// Controls flagged invalid, with their position in the document
fn invalid_controls(ctx: &PageContext) -> impl Iterator<Item = (usize, &Element)> {
    ctx.elements.iter().enumerate().filter(|(_, el)| {
        assisted_control(el) && el.attr("aria-invalid").is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    })
}

/// Text of the elements named by `aria-describedby`
fn described_text(ctx: &PageContext, el: &Element) -> String {
    el.attr("aria-describedby")
        .unwrap_or_default()
        .split_whitespace()
        .take(6)
        .filter_map(|id| ctx.text_of_id(id))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Pass only at 100%; partial down to 80%, fail below
fn strict(mut d: Map<String, Value>, applicable: usize, missing: usize) -> Evaluation {
    let ratio = if applicable == 0 || missing == 0 {
        1.0
    } else {
        (applicable - missing) as f64 / applicable as f64
    };
    d.insert("ratio".into(), json!(round4(ratio)));
    Evaluation::new(ratio_verdict(ratio, 1.0, STRICT_PARTIAL), d)
}

fn describe_control(el: &Element, reason: &str) -> Value {
    let mut o = el.describe();
    o["name"] = json!(el.attr("name"));
    o["reason"] = json!(reason);
    o
}

static ERROR_WORDS: OnceLock<Option<Regex>> = OnceLock::new();
static ERROR_CLASS: OnceLock<Option<Regex>> = OnceLock::new();

const ERROR_WORDS_PATTERN: &str = r"(?i)(error|inv[aá]lido|incorrect[oa]|requerid[oa]|obligatorio|missing|invalid|must\s+be|please\s+enter|is\s+required|formato|format[oa])";

fn error_words(text: &str) -> bool {
    cached_match(&ERROR_WORDS, ERROR_WORDS_PATTERN, text)
}

/// 3.3.1 Error Identification
pub fn error_identification(ctx: &PageContext, pass: Pass) -> Evaluation {
    let mut applicable = 0usize;
    let mut with_message = 0usize;
    let mut offenders = Vec::new();

    for (index, el) in invalid_controls(ctx) {
        applicable += 1;
        let mut found = error_words(&described_text(ctx, el));
        if !found {
            let label = ctx.labels_for.get(el.id()).map(String::as_str).unwrap_or_default();
            let nameish = [
                el.attr("aria-label").unwrap_or_default(),
                label,
                el.attr("placeholder").unwrap_or_default(),
                el.attr("title").unwrap_or_default(),
            ]
            .join(" ");
            found = error_words(&nameish);
        }
        if !found {
            // A message element right after the control
            found = ctx.elements.iter().skip(index + 1).take(3).any(|next| {
                cached_match(&ERROR_CLASS, r"(?i)(error|invalid|help|message)", next.class()) && error_words(&next.text)
            });
        }
        if found {
            with_message += 1;
        } else if offenders.len() < MAX_OFFENDERS {
            offenders.push(describe_control(el, "Invalid field without a text error message."));
        }
    }

    let missing = applicable - with_message;
    let has_alert_region = ctx
        .elements
        .iter()
        .any(|el| matches!(el.role().as_str(), "alert" | "status") || el.has_attr("aria-live"));
    let ok_ratio = if missing == 0 {
        1.0
    } else {
        round4(with_message as f64 / applicable as f64)
    };
    let d = details(json!({
        "applicable": applicable,
        "with_message": with_message,
        "missing_message": missing,
        "has_alert_region": has_alert_region,
        "ok_ratio": ok_ratio,
        "offenders": offenders,
        "note": note(pass, "fields in error need a text message that identifies the problem."),
    }));
    strict(d, applicable, missing)
}

static SUGGESTION: OnceLock<Option<Regex>> = OnceLock::new();
static EXAMPLE_PLACEHOLDER: OnceLock<Option<Regex>> = OnceLock::new();

const SUGGESTION_PATTERN: &str = r"(?i)(debe\s+ser|usa[r]?\s+formato|ejemplo|example|e\.?g\.?|formato\s+v[áa]lido|should\s+be|enter\s+a\s+valid|expected\s+format|for\s+example)";

fn has_suggestion(ctx: &PageContext, el: &Element) -> bool {
    let named = format!("{} {}", el.attr("title").unwrap_or_default(), el.attr("aria-label").unwrap_or_default());
    cached_match(&SUGGESTION, SUGGESTION_PATTERN, &described_text(ctx, el))
        || cached_match(&SUGGESTION, SUGGESTION_PATTERN, &named)
        || cached_match(
            &EXAMPLE_PLACEHOLDER,
            r"(?i)\b(ej\.?|ejemplo|example|e\.?g\.?)\b",
            el.attr("placeholder").unwrap_or_default(),
        )
}

/// 3.3.3 Error Suggestion
pub fn error_suggestion(ctx: &PageContext, pass: Pass) -> Evaluation {
    let mut applicable = 0usize;
    let mut with_suggestion = 0usize;
    let mut offenders = Vec::new();
    for (_, el) in invalid_controls(ctx) {
        applicable += 1;
        if has_suggestion(ctx, el) {
            with_suggestion += 1;
        } else if offenders.len() < MAX_OFFENDERS {
            offenders.push(describe_control(el, "Invalid field without a correction suggestion."));
        }
    }
    let missing = applicable - with_suggestion;
    let ok_ratio = if missing == 0 {
        1.0
    } else {
        round4(with_suggestion as f64 / applicable as f64)
    };
    let d = details(json!({
        "applicable": applicable,
        "with_suggestion": with_suggestion,
        "missing_suggestion": missing,
        "ok_ratio": ok_ratio,
        "offenders": offenders,
        "note": note(pass, "when a correction is known, suggest it: expected format or an example."),
    }));
    strict(d, applicable, missing)
}

static TRANSACTIONAL: OnceLock<Option<Regex>> = OnceLock::new();
static REVIEW_STEP: OnceLock<Option<Regex>> = OnceLock::new();
static REVERSIBLE: OnceLock<Option<Regex>> = OnceLock::new();
static VALIDATION_HINT: OnceLock<Option<Regex>> = OnceLock::new();
static REVIEW_STEP_ALL: OnceLock<Option<Regex>> = OnceLock::new();
static REVERSIBLE_ALL: OnceLock<Option<Regex>> = OnceLock::new();
static VALIDATION_HINT_ALL: OnceLock<Option<Regex>> = OnceLock::new();

/// Patterns that count as a way to prevent or undo a mistaken submission
struct Safeguards {
    review: (&'static OnceLock<Option<Regex>>, &'static str),
    reversible: (&'static OnceLock<Option<Regex>>, &'static str),
    validation: (&'static OnceLock<Option<Regex>>, &'static str),
}

static LEGAL_SAFEGUARDS: Safeguards = Safeguards {
    review: (&REVIEW_STEP, r"(?i)(confirmar|revise|revisar|revisi[oó]n|resumen|summary|review|step\s*\d+\s*of\s*\d+)"),
    reversible: (&REVERSIBLE, r"(?i)(cancelar|anular|deshacer|undo|reembols[oa]|refund|revocar|withdraw|editar|cambiar)"),
    validation: (&VALIDATION_HINT, r"(?i)(formato|format|ejemplo|example|debe\s+ser|should\s+be|inv[aá]lido|invalid|requerid[oa]|required)"),
};

static ALL_SAFEGUARDS: Safeguards = Safeguards {
    review: (&REVIEW_STEP_ALL, r"(?i)(confirmar|revise|revisar|resumen|summary|review|step\s*\d+\s*of\s*\d+)"),
    reversible: (&REVERSIBLE_ALL, r"(?i)(cancelar|anular|deshacer|undo|revert|reembols[oa]|refund|editar|cambiar)"),
    validation: (&VALIDATION_HINT_ALL, r"(?i)(formato|format|ejemplo|example|debe\s+ser|should\s+be|inv[aá]lido|invalid|requerid[oa]|required|error)"),
};

impl Safeguards {
    /// (reversible, review, validation)
    fn found(&self, text: &str, scripts: &str) -> (bool, bool, bool) {
        let reversible =
            cached_match(self.reversible.0, self.reversible.1, text) || cached_match(self.reversible.0, self.reversible.1, scripts);
        (
            reversible,
            cached_match(self.review.0, self.review.1, text),
            cached_match(self.validation.0, self.validation.1, text),
        )
    }
}

/// Position of every form, capped
fn form_indices(ctx: &PageContext) -> Vec<usize> {
    ctx.elements
        .iter()
        .enumerate()
        .filter(|(_, el)| el.tag == "form")
        .map(|(i, _)| i)
        .take(MAX_FORMS)
        .collect()
}

/// Forms judged on their own text plus the page text; controls outside any
/// form count as one implicit form
fn prevention(
    ctx: &PageContext,
    pass: Pass,
    safeguards: &Safeguards,
    transactional_only: bool,
    scripts: &str,
    explain: &str,
) -> Evaluation {
    let forms = form_indices(ctx);
    let loose_controls = ctx.inputs().any(|el| el.form.is_none());
    let mut texts: Vec<(Option<usize>, String)> = forms.iter().map(|&i| (Some(i), ctx.form_text(i))).collect();
    if forms.is_empty() && loose_controls {
        texts.push((None, String::new()));
    }

    let page_text = &ctx.body_text;
    let mut applicable = 0usize;
    let mut ok_cases = 0usize;
    let mut offenders = Vec::new();
    for (form, text) in &texts {
        let combined = format!("{page_text} {text}");
        if transactional_only && !cached_match(&TRANSACTIONAL, TRANSACTIONAL_PATTERN, &combined) {
            continue;
        }
        applicable += 1;
        let (reversible, review, validation) = safeguards.found(&combined, scripts);
        if reversible || review || validation {
            ok_cases += 1;
        } else if offenders.len() < MAX_OFFENDERS {
            let mut o = form
                .and_then(|i| ctx.elements.get(i))
                .map_or_else(|| json!({ "tag": "form" }), Element::describe);
            o["reason"] = json!("No review step, undo or validation hints.");
            offenders.push(o);
        }
    }

    let violations = applicable - ok_cases;
    let ok_ratio = if violations == 0 {
        1.0
    } else {
        round4(ok_cases as f64 / applicable as f64)
    };
    let d = details(json!({
        "applicable": applicable,
        "forms_found": forms.len(),
        "ok_cases": ok_cases,
        "violations": violations,
        "ok_ratio": ok_ratio,
        "offenders": offenders,
        "note": note(pass, explain),
    }));
    strict(d, applicable, violations)
}

const TRANSACTIONAL_PATTERN: &str = r"(?i)(pago|pagar|compr(a|ar)|pedido|checkout|facturaci[oó]n|suscripci[oó]n|transferencia|bancari[ao]|tarjeta|financ(i|e)r[oa]|legal|contrato|renuncia|t[eé]rminos|declaraci[oó]n|impuesto|tax|invoice|billing|place\s+order)";

/// 3.3.4 Error Prevention (Legal, Financial, Data)
pub fn error_prevention_legal(ctx: &PageContext, pass: Pass) -> Evaluation {
    let scripts = ctx.scripts.join("\n");
    prevention(
        ctx,
        pass,
        &LEGAL_SAFEGUARDS,
        true,
        &scripts,
        "legal and financial submissions need a review step, an undo or input checking.",
    )
}

/// 3.3.6 Error Prevention (All)
pub fn error_prevention_all(ctx: &PageContext, pass: Pass) -> Evaluation {
    prevention(
        ctx,
        pass,
        &ALL_SAFEGUARDS,
        false,
        "",
        "every form submission needs a review step, an undo or input checking.",
    )
}

static HELP: OnceLock<Option<Regex>> = OnceLock::new();

const HELP_PATTERN: &str = r"(?i)(ayuda|help|soporte|support|faq|preguntas\s+frecuentes|contacto|asistencia|gu[ií]a|instrucciones|manual|tooltip|\?)";

/// 3.3.5 Help
///
/// Each form needs a help link or field-level hints (title, aria-label or a
/// tooltip class).
pub fn help(ctx: &PageContext, pass: Pass) -> Evaluation {
    let forms = form_indices(ctx);
    let mut with_help = 0usize;
    let mut offenders = Vec::new();
    for &form in &forms {
        let members = || ctx.elements.iter().filter(move |el| el.form == Some(form));
        let link_help = members().filter(|el| el.tag == "a").any(|a| {
            cached_match(&HELP, HELP_PATTERN, &a.text) || cached_match(&HELP, HELP_PATTERN, a.attr("href").unwrap_or_default())
        });
        let field_help = members().any(|el| {
            let textish = format!(
                "{} {} {}",
                el.attr("title").unwrap_or_default(),
                el.attr("aria-label").unwrap_or_default(),
                el.class()
            );
            cached_match(&HELP, HELP_PATTERN, &textish)
        });
        if link_help || field_help {
            with_help += 1;
        } else if offenders.len() < MAX_OFFENDERS {
            let mut o = ctx.elements.get(form).map_or_else(|| json!({ "tag": "form" }), Element::describe);
            o["reason"] = json!("Form without help link or field hints.");
            offenders.push(o);
        }
    }

    let applicable = forms.len();
    let violations = applicable - with_help;
    let ok_ratio = if applicable == 0 {
        1.0
    } else {
        round4(with_help as f64 / applicable as f64)
    };
    let d = details(json!({
        "applicable": applicable,
        "with_help": with_help,
        "violations": violations,
        "ok_ratio": ok_ratio,
        "offenders": offenders,
        "note": note(pass, "forms should offer context-sensitive help."),
    }));
    strict(d, applicable, violations)
}
