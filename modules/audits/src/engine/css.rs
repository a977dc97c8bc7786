//! Just enough CSS reading for the presentation checks: rule blocks of a
//! style sheet and lengths in px.

/// One style rule; `media` is the enclosing `@media` prelude, lower-cased
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub media: Option<String>,
    pub selector: String,
    pub body: String,
}

impl Rule {
    pub fn declaration(&self, prop: &str) -> Option<&str> {
        super::color::inline_style(&self.body, prop)
    }

    /// Selector list targets one of `tags` directly (`a`, `a:hover`, `p.lead`, ...)
    pub fn targets(&self, tags: &[&str]) -> bool {
        self.selector.split(',').any(|sel| {
            let last = sel.split_whitespace().last().unwrap_or_default();
            let name: String = last
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
                .collect();
            tags.contains(&name.to_ascii_lowercase().as_str())
        })
    }

    /// Last compound of some selector matches an element with this tag, classes and id.
    /// Ancestor parts are ignored, so this over-approximates.
    pub fn applies_to(&self, tag: &str, classes: &[&str], id: &str) -> bool {
        self.selector.split(',').any(|sel| {
            let last = sel.split_whitespace().last().unwrap_or_default();
            let last = last.split(':').next().unwrap_or_default();
            if last.is_empty() {
                return false;
            }
            let name_end = last.find(['.', '#', '[']).unwrap_or(last.len());
            let name = &last[..name_end];
            if !(name.is_empty() || name == "*" || name.eq_ignore_ascii_case(tag)) {
                return false;
            }
            let rest = last[name_end..].split('[').next().unwrap_or_default();
            let mut parts = Vec::new();
            let mut current = String::new();
            for c in rest.chars() {
                if (c == '.' || c == '#') && !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                }
                current.push(c);
            }
            if !current.is_empty() {
                parts.push(current);
            }
            if name.is_empty() && parts.is_empty() {
                return false;
            }
            parts.iter().all(|p| match p.split_at(1) {
                (".", class) => classes.contains(&class),
                ("#", wanted) => wanted == id,
                _ => false,
            })
        })
    }
}

fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

/// Flatten a style sheet into rules. Nested at-rules other than `@media` are skipped.
pub fn rules(sheet: &str) -> Vec<Rule> {
    let sheet = strip_comments(sheet);
    let mut out = Vec::new();
    collect(&sheet, None, &mut out);
    out
}

fn collect(text: &str, media: Option<&str>, out: &mut Vec<Rule>) {
    let mut rest = text;
    while let Some(open) = rest.find('{') {
        let prelude = rest[..open].trim();
        let Some(close) = matching_brace(rest, open) else {
            return;
        };
        let inner = &rest[open + 1..close];
        if let Some(query) = prelude.strip_prefix("@media") {
            collect(inner, Some(query.trim()), out);
        } else if !prelude.starts_with('@') {
            let selector = prelude.rsplit(';').next().unwrap_or(prelude).trim();
            out.push(Rule {
                media: media.map(str::to_ascii_lowercase),
                selector: selector.to_string(),
                body: inner.trim().to_string(),
            });
        }
        rest = &rest[close + 1..];
    }
}

/// `@keyframes` blocks as (name, lower-cased body), including those nested in `@media`
pub fn keyframes(sheet: &str) -> Vec<(String, String)> {
    let sheet = strip_comments(sheet);
    let mut out = Vec::new();
    collect_keyframes(&sheet, &mut out);
    out
}

fn collect_keyframes(text: &str, out: &mut Vec<(String, String)>) {
    let mut rest = text;
    while let Some(open) = rest.find('{') {
        let prelude = rest[..open].trim();
        let prelude = prelude.rsplit(['}', ';']).next().unwrap_or(prelude).trim();
        let Some(close) = matching_brace(rest, open) else {
            return;
        };
        let inner = &rest[open + 1..close];
        let name = prelude
            .strip_prefix("@keyframes")
            .or_else(|| prelude.strip_prefix("@-webkit-keyframes"));
        if let Some(name) = name {
            out.push((name.trim().to_string(), inner.to_ascii_lowercase()));
        } else if prelude.starts_with("@media") {
            collect_keyframes(inner, out);
        }
        rest = &rest[close + 1..];
    }
}

/// Duration in seconds from a CSS time (`200ms`, `1.5s`)
pub fn seconds(value: &str) -> Option<f64> {
    let value = value.trim().to_ascii_lowercase();
    if let Some(ms) = value.strip_suffix("ms") {
        return ms.trim().parse::<f64>().ok().map(|v| v / 1000.0);
    }
    value.strip_suffix('s')?.trim().parse().ok()
}

fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text[open..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Length in CSS px; relative units resolve against a 16px font
pub fn px(value: &str) -> Option<f64> {
    let value = value.trim().trim_end_matches("!important").trim().to_ascii_lowercase();
    let split = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);
    let number: f64 = number.parse().ok()?;
    match unit.trim() {
        "px" | "" => Some(number),
        "pt" => Some(number * 96.0 / 72.0),
        "em" | "rem" => Some(number * 16.0),
        "%" => Some(number / 100.0 * 16.0),
        _ => None,
    }
}

/// `line-height` as a multiple of the font size
pub fn line_height_ratio(value: &str, font_px: f64) -> Option<f64> {
    let value = value.trim().to_ascii_lowercase();
    if value == "normal" {
        return None;
    }
    if let Ok(unitless) = value.parse::<f64>() {
        return Some(unitless);
    }
    if let Some(pct) = value.strip_suffix('%') {
        return pct.trim().parse::<f64>().ok().map(|p| p / 100.0);
    }
    if value.ends_with("em") {
        return value.trim_end_matches("rem").trim_end_matches("em").parse().ok();
    }
    px(&value).filter(|_| font_px > 0.0).map(|lh| lh / font_px)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_media_blocks() {
        let sheet = "/* x */ a { color: red }\n@media (orientation: portrait) { body { display: none } }\n@font-face { font-family: x }";
        let parsed = rules(sheet);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].selector, "a");
        assert_eq!(parsed[0].declaration("color"), Some("red"));
        assert_eq!(parsed[1].media.as_deref(), Some("(orientation: portrait)"));
        assert!(parsed[1].targets(&["body"]));
    }

    #[test]
    fn selector_matching() {
        let rule = |selector: &str| Rule {
            media: None,
            selector: selector.to_string(),
            body: String::new(),
        };
        assert!(rule("p.clip").applies_to("p", &["clip", "x"], ""));
        assert!(!rule("p.clip").applies_to("p", &["x"], ""));
        assert!(rule(".card p, #main").applies_to("div", &[], "main"));
        assert!(rule("a:hover").applies_to("a", &[], ""));
        assert!(!rule("li").applies_to("p", &[], ""));
    }

    #[test]
    fn keyframes_and_times() {
        let sheet = "@keyframes Blink { 50% { opacity: 0 } }\n@media screen { @keyframes spin { to { transform: rotate(1turn) } } }\n.x { animation: blink .2s infinite }";
        let frames = keyframes(sheet);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].0, "Blink");
        assert!(frames[0].1.contains("opacity"));
        assert_eq!(frames[1].0, "spin");
        assert_eq!(seconds("200ms"), Some(0.2));
        assert_eq!(seconds(".5s"), Some(0.5));
        assert_eq!(seconds("infinite"), None);
    }

    #[test]
    fn lengths() {
        assert_eq!(px("12px"), Some(12.0));
        assert_eq!(px("1.5em"), Some(24.0));
        assert_eq!(px("12pt"), Some(16.0));
        assert_eq!(px("auto"), None);
        assert_eq!(line_height_ratio("1.2", 16.0), Some(1.2));
        assert_eq!(line_height_ratio("24px", 16.0), Some(1.5));
        assert_eq!(line_height_ratio("normal", 16.0), None);
    }
}
