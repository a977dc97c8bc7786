//! WCAG 2.1 success criteria catalogue
//!
//! Metadata used to label results (title, level, principle) and the capability
//! flags that tell the orchestrator which sources are worth trying per code.

use crate::contract::{Level, Principle};

/// What a criterion can be judged from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Static HTML gives a usable answer
    pub raw_ok: bool,
    /// Only a rendered DOM can answer
    pub needs_rendered: bool,
    /// Rendered DOM improves the raw answer
    pub rendered_better: bool,
    /// Semantic judgement where a language model helps
    pub ai_helpful: bool,
}

/// Static description of one success criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CriterionMeta {
    pub code: &'static str,
    pub title: &'static str,
    pub level: Level,
    pub principle: Principle,
    pub caps: Capabilities,
}

const RAW: Capabilities = Capabilities {
    raw_ok: true,
    needs_rendered: false,
    rendered_better: false,
    ai_helpful: false,
};
const RAW_AI: Capabilities = Capabilities {
    ai_helpful: true,
    ..RAW
};
const RAW_BETTER: Capabilities = Capabilities {
    rendered_better: true,
    ..RAW
};
const RAW_BETTER_AI: Capabilities = Capabilities {
    rendered_better: true,
    ai_helpful: true,
    ..RAW
};
const RENDERED: Capabilities = Capabilities {
    raw_ok: false,
    needs_rendered: true,
    rendered_better: false,
    ai_helpful: false,
};

macro_rules! criterion {
    ($code:literal, $title:literal, $level:ident, $principle:ident, $caps:expr) => {
        CriterionMeta {
            code: $code,
            title: $title,
            level: Level::$level,
            principle: Principle::$principle,
            caps: $caps,
        }
    };
}

/// Every WCAG 2.1 success criterion, in document order
pub static CRITERIA: &[CriterionMeta] = &[
    // Perceivable
    criterion!("1.1.1", "Non-text Content", A, Perceivable, RAW_AI),
    criterion!("1.2.1", "Audio-only and Video-only (Prerecorded)", A, Perceivable, RAW),
    criterion!("1.2.2", "Captions (Prerecorded)", A, Perceivable, RAW),
    criterion!("1.2.3", "Audio Description or Media Alternative (Prerecorded)", A, Perceivable, RAW),
    criterion!("1.2.4", "Captions (Live)", AA, Perceivable, RAW),
    criterion!("1.2.5", "Audio Description (Prerecorded)", AA, Perceivable, RAW),
    criterion!("1.2.6", "Sign Language (Prerecorded)", AAA, Perceivable, RAW),
    criterion!("1.2.7", "Extended Audio Description (Prerecorded)", AAA, Perceivable, RAW),
    criterion!("1.2.8", "Media Alternative (Prerecorded)", AAA, Perceivable, RAW),
    criterion!("1.2.9", "Audio-only (Live)", AAA, Perceivable, RAW),
    criterion!("1.3.1", "Info and Relationships", A, Perceivable, RAW_BETTER),
    criterion!("1.3.2", "Meaningful Sequence", A, Perceivable, RAW),
    criterion!("1.3.3", "Sensory Characteristics", A, Perceivable, RAW),
    criterion!("1.3.4", "Orientation", AA, Perceivable, RAW),
    criterion!("1.3.5", "Identify Input Purpose", AA, Perceivable, RAW_BETTER_AI),
    criterion!("1.3.6", "Identify Purpose", AAA, Perceivable, RAW_BETTER_AI),
    criterion!("1.4.1", "Use of Color", A, Perceivable, RAW),
    criterion!("1.4.2", "Audio Control", A, Perceivable, RAW),
    criterion!("1.4.3", "Contrast (Minimum)", AA, Perceivable, RENDERED),
    criterion!("1.4.4", "Resize Text", AA, Perceivable, RAW),
    criterion!("1.4.5", "Images of Text", AA, Perceivable, RAW),
    criterion!("1.4.6", "Contrast (Enhanced)", AAA, Perceivable, RENDERED),
    criterion!("1.4.7", "Low or No Background Audio", AAA, Perceivable, RAW),
    criterion!("1.4.8", "Visual Presentation", AAA, Perceivable, RAW),
    criterion!("1.4.9", "Images of Text (No Exception)", AAA, Perceivable, RAW),
    criterion!("1.4.10", "Reflow", AA, Perceivable, RENDERED),
    criterion!("1.4.11", "Non-text Contrast", AA, Perceivable, RENDERED),
    criterion!("1.4.12", "Text Spacing", AA, Perceivable, RAW),
    criterion!("1.4.13", "Content on Hover or Focus", AA, Perceivable, RAW),
    // Operable
    criterion!("2.1.1", "Keyboard", A, Operable, RAW_BETTER),
    criterion!("2.1.2", "No Keyboard Trap", A, Operable, RAW),
    criterion!("2.1.3", "Keyboard (No Exception)", AAA, Operable, RAW),
    criterion!("2.1.4", "Character Key Shortcuts", A, Operable, RAW),
    criterion!("2.2.1", "Timing Adjustable", A, Operable, RAW_BETTER),
    criterion!("2.2.2", "Pause, Stop, Hide", A, Operable, RAW),
    criterion!("2.2.3", "No Timing", AAA, Operable, RAW),
    criterion!("2.2.4", "Interruptions", AAA, Operable, RAW),
    criterion!("2.2.5", "Re-authenticating", AAA, Operable, RAW),
    criterion!("2.2.6", "Timeouts", AAA, Operable, RAW),
    criterion!("2.3.1", "Three Flashes or Below Threshold", A, Operable, RAW),
    criterion!("2.3.2", "Three Flashes", AAA, Operable, RAW),
    criterion!("2.3.3", "Animation from Interactions", AAA, Operable, RAW),
    criterion!("2.4.1", "Bypass Blocks", A, Operable, RAW),
    criterion!("2.4.2", "Page Titled", A, Operable, RAW),
    criterion!("2.4.3", "Focus Order", A, Operable, RAW_BETTER),
    criterion!("2.4.4", "Link Purpose (In Context)", A, Operable, RAW),
    criterion!("2.4.5", "Multiple Ways", AA, Operable, RAW),
    criterion!("2.4.6", "Headings and Labels", AA, Operable, RAW),
    criterion!("2.4.7", "Focus Visible", AA, Operable, RENDERED),
    criterion!("2.4.8", "Location", AAA, Operable, RAW),
    criterion!("2.4.9", "Link Purpose (Link Only)", AAA, Operable, RAW),
    criterion!("2.4.10", "Section Headings", AAA, Operable, RAW),
    criterion!("2.5.1", "Pointer Gestures", A, Operable, RAW_BETTER),
    criterion!("2.5.2", "Pointer Cancellation", A, Operable, RAW),
    criterion!("2.5.3", "Label in Name", A, Operable, RAW),
    criterion!("2.5.4", "Motion Actuation", A, Operable, RAW),
    criterion!("2.5.5", "Target Size", AAA, Operable, RENDERED),
    criterion!("2.5.6", "Concurrent Input Mechanisms", AAA, Operable, RAW),
    // Understandable
    criterion!("3.1.1", "Language of Page", A, Understandable, RAW),
    criterion!("3.1.2", "Language of Parts", AA, Understandable, RAW),
    criterion!("3.1.3", "Unusual Words", AAA, Understandable, RAW),
    criterion!("3.1.4", "Abbreviations", AAA, Understandable, RAW),
    criterion!("3.1.5", "Reading Level", AAA, Understandable, RAW),
    criterion!("3.1.6", "Pronunciation", AAA, Understandable, RAW),
    criterion!("3.2.1", "On Focus", A, Understandable, RENDERED),
    criterion!("3.2.2", "On Input", A, Understandable, RENDERED),
    criterion!("3.2.3", "Consistent Navigation", AA, Understandable, RAW),
    criterion!("3.2.4", "Consistent Identification", AA, Understandable, RAW),
    criterion!("3.2.5", "Change on Request", AAA, Understandable, RAW),
    criterion!("3.3.1", "Error Identification", A, Understandable, RAW_AI),
    criterion!("3.3.2", "Labels or Instructions", A, Understandable, RAW_AI),
    criterion!("3.3.3", "Error Suggestion", AA, Understandable, RAW_AI),
    criterion!("3.3.4", "Error Prevention (Legal, Financial, Data)", AA, Understandable, RAW_AI),
    criterion!("3.3.5", "Help", AAA, Understandable, RAW_AI),
    criterion!("3.3.6", "Error Prevention (All)", AAA, Understandable, RAW_AI),
    // Robust
    criterion!("4.1.1", "Parsing", A, Robust, RAW),
    criterion!("4.1.2", "Name, Role, Value", A, Robust, RAW_BETTER),
    criterion!("4.1.3", "Status Messages", AA, Robust, RENDERED),
];

/// Metadata lookup by code
pub fn meta(code: &str) -> Option<&'static CriterionMeta> {
    CRITERIA.iter().find(|c| c.code == code)
}

/// Capabilities by code; unknown codes get no capability at all
pub fn caps(code: &str) -> Capabilities {
    meta(code).map(|m| m.caps).unwrap_or_default()
}
