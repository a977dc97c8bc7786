//! CSS color parsing and WCAG contrast math.

pub type Rgb = (u8, u8, u8);

const NAMED: &[(&str, Rgb)] = &[
    ("black", (0, 0, 0)),
    ("silver", (192, 192, 192)),
    ("gray", (128, 128, 128)),
    ("grey", (128, 128, 128)),
    ("white", (255, 255, 255)),
    ("maroon", (128, 0, 0)),
    ("red", (255, 0, 0)),
    ("purple", (128, 0, 128)),
    ("fuchsia", (255, 0, 255)),
    ("magenta", (255, 0, 255)),
    ("green", (0, 128, 0)),
    ("lime", (0, 255, 0)),
    ("olive", (128, 128, 0)),
    ("yellow", (255, 255, 0)),
    ("navy", (0, 0, 128)),
    ("blue", (0, 0, 255)),
    ("teal", (0, 128, 128)),
    ("aqua", (0, 255, 255)),
    ("cyan", (0, 255, 255)),
    ("orange", (255, 165, 0)),
    ("darkgray", (169, 169, 169)),
    ("darkgrey", (169, 169, 169)),
    ("lightgray", (211, 211, 211)),
    ("lightgrey", (211, 211, 211)),
    ("gainsboro", (220, 220, 220)),
    ("whitesmoke", (245, 245, 245)),
    ("dimgray", (105, 105, 105)),
    ("dimgrey", (105, 105, 105)),
    ("darkblue", (0, 0, 139)),
    ("darkred", (139, 0, 0)),
    ("darkgreen", (0, 100, 0)),
    ("crimson", (220, 20, 60)),
    ("gold", (255, 215, 0)),
    ("beige", (245, 245, 220)),
    ("ivory", (255, 255, 240)),
    ("pink", (255, 192, 203)),
    ("brown", (165, 42, 42)),
];

fn hex_to_rgb(value: &str) -> Option<Rgb> {
    let hex = value.strip_prefix('#').filter(|h| h.is_ascii())?;
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 | 4 => {
            let mut it = hex.chars().map(|c| channel(&format!("{c}{c}")));
            Some((it.next()??, it.next()??, it.next()??))
        }
        6 | 8 => Some((channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
        _ => None,
    }
}

/// Parse `#rgb`, `#rrggbb`, `rgb()`/`rgba()` or a named color
pub fn parse_css_color(value: &str) -> Option<Rgb> {
    let value = value.trim().to_ascii_lowercase();
    if value.is_empty() {
        return None;
    }
    if value.starts_with('#') {
        return hex_to_rgb(&value);
    }
    if let Some(args) = value
        .strip_prefix("rgba(")
        .or_else(|| value.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let parts: Vec<f64> = args
            .split(|c| c == ',' || c == ' ' || c == '/')
            .filter(|p| !p.trim().is_empty())
            .take(3)
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .ok()?;
        if parts.len() < 3 {
            return None;
        }
        let clamp = |v: f64| v.clamp(0.0, 255.0) as u8;
        return Some((clamp(parts[0]), clamp(parts[1]), clamp(parts[2])));
    }
    NAMED.iter().find(|(name, _)| *name == value).map(|(_, rgb)| *rgb)
}

/// WCAG relative luminance
pub fn relative_luminance((r, g, b): Rgb) -> f64 {
    let channel = |c: u8| {
        let c = f64::from(c) / 255.0;
        if c <= 0.03928 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    0.2126 * channel(r) + 0.7152 * channel(g) + 0.0722 * channel(b)
}

pub fn contrast_ratio(a: Rgb, b: Rgb) -> f64 {
    let la = relative_luminance(a) + 0.05;
    let lb = relative_luminance(b) + 0.05;
    la.max(lb) / la.min(lb)
}

/// Value of one declaration of an inline `style` attribute
pub fn inline_style<'a>(style: &'a str, prop: &str) -> Option<&'a str> {
    style.split(';').find_map(|decl| {
        let (name, value) = decl.split_once(':')?;
        name.trim()
            .eq_ignore_ascii_case(prop)
            .then(|| value.trim().trim_end_matches("!important").trim())
    })
}

/// Headings and long paragraphs count as large text
pub fn is_large_text(tag: &str, text: &str) -> bool {
    matches!(tag, "h1" | "h2" | "h3") || (tag == "p" && text.chars().count() >= 30)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_color_forms() {
        assert_eq!(parse_css_color("#fff"), Some((255, 255, 255)));
        assert_eq!(parse_css_color("#336699"), Some((51, 102, 153)));
        assert_eq!(parse_css_color("rgb(10, 20, 300)"), Some((10, 20, 255)));
        assert_eq!(parse_css_color("rgba(0,0,0,0.5)"), Some((0, 0, 0)));
        assert_eq!(parse_css_color("Navy"), Some((0, 0, 128)));
        assert_eq!(parse_css_color("var(--x)"), None);
        assert_eq!(parse_css_color("#12"), None);
    }

    #[test]
    fn contrast_extremes() {
        let ratio = contrast_ratio((0, 0, 0), (255, 255, 255));
        assert!((ratio - 21.0).abs() < 1e-9);
        assert!((contrast_ratio((120, 120, 120), (120, 120, 120)) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn reads_inline_declarations() {
        let style = "font-size: 12px; COLOR: #777 !important;background-color:white";
        assert_eq!(inline_style(style, "color"), Some("#777"));
        assert_eq!(inline_style(style, "background-color"), Some("white"));
        assert_eq!(inline_style(style, "border"), None);
    }
}
