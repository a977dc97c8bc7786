//! Page context: the parsed view of an HTML document that every check reads.
//!
//! The document is walked once with `tl`; each tag becomes an [`Element`] with
//! its attributes, text and a few ancestry facts (inside a link, inside a
//! label). Checks never touch the parser directly.
//!
//! The walk keeps its own stack, so arbitrarily deep markup cannot exhaust the
//! thread stack.

use std::collections::{BTreeMap, HashMap, HashSet};

use tl::{HTMLTag, Node, NodeHandle, Parser, ParserOptions};

use super::error::EngineError;

/// Tags whose text content is collected during the walk
const TEXT_TAGS: &[&str] = &[
    "a", "button", "label", "legend", "caption", "summary", "title", "h1", "h2", "h3", "h4", "h5",
    "h6", "p", "li", "th", "td", "span", "option", "abbr", "acronym", "dt", "dd", "figcaption",
    "strong", "em", "b", "i", "small", "q", "blockquote", "ruby", "rt", "dfn", "output",
];

/// Upper bound on the text kept per element
const ELEMENT_TEXT_CAP: usize = 4_096;

/// Upper bound on the collected document text
const BODY_TEXT_CAP: usize = 100_000;

/// One HTML tag, flattened
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    /// Lower-case tag name
    pub tag: String,
    /// Attribute names are lower-cased; valueless attributes map to ""
    pub attrs: BTreeMap<String, String>,
    /// Whitespace-collapsed inner text (only for text-bearing tags or styled elements)
    pub text: String,
    /// Has an `<a>` ancestor
    pub in_link: bool,
    /// Has a `<label>` ancestor
    pub in_label: bool,
    /// Inside a `<fieldset>` that has a `<legend>`
    pub in_fieldset: bool,
    /// Has a `<form>` ancestor
    pub in_form: bool,
    /// Index of the nearest enclosing `<form>`
    pub form: Option<usize>,
    /// Has a `<nav>` (or `role=navigation`) ancestor
    pub in_nav: bool,
    /// Inside running text (`<p>`, `<li>` or `<td>`)
    pub in_paragraph: bool,
    /// Index of the outermost enclosing navigation block (`nav`, `role=navigation`, `header`, `footer`)
    pub nav_region: Option<usize>,
    /// `<th>` descendants (tables)
    pub th_count: usize,
    /// `<tr>` descendants (tables)
    pub row_count: usize,
    /// `<li>` / `<dt>` / `<dd>` children (lists)
    pub item_count: usize,
    /// `kind` of every `<track>` child (media)
    pub track_kinds: Vec<String>,
    /// `src` of every `<track>` child (media)
    pub track_srcs: Vec<String>,
    /// `label` of every `<track>` child (media)
    pub track_labels: Vec<String>,
    /// `src` of every `<source>` child (media)
    pub source_srcs: Vec<String>,
    /// `alt` of descendant images (links and buttons)
    pub image_alt: String,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// Trimmed attribute value, `None` when absent or blank
    pub fn attr_nonempty(&self, name: &str) -> Option<&str> {
        self.attr(name).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }

    /// Boolean-ish attribute (`aria-hidden="true"`, `hidden`, ...)
    pub fn flag(&self, name: &str) -> bool {
        match self.attr(name) {
            Some(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "" | "true" | "1" | "yes"),
            None => false,
        }
    }

    pub fn role(&self) -> String {
        self.attr("role").unwrap_or_default().trim().to_ascii_lowercase()
    }

    pub fn id(&self) -> &str {
        self.attr("id").unwrap_or_default()
    }

    pub fn class(&self) -> &str {
        self.attr("class").unwrap_or_default()
    }

    /// `type` of an input, lower-cased
    pub fn input_type(&self) -> String {
        self.attr("type").unwrap_or_default().trim().to_ascii_lowercase()
    }

    pub fn tabindex(&self) -> Option<i32> {
        self.attr("tabindex").and_then(|t| t.trim().parse().ok())
    }

    /// `src`, falling back to `data-src` and `href`
    pub fn media_src(&self) -> &str {
        self.attr_nonempty("src")
            .or_else(|| self.attr_nonempty("data-src"))
            .or_else(|| self.attr_nonempty("href"))
            .unwrap_or_default()
    }

    /// Hidden from everyone (`hidden`, `aria-hidden`, inline `display:none`)
    pub fn is_hidden(&self) -> bool {
        if self.has_attr("hidden") || self.flag("aria-hidden") {
            return true;
        }
        let style = self.attr("style").unwrap_or_default().to_ascii_lowercase().replace(' ', "");
        style.contains("display:none") || style.contains("visibility:hidden")
    }

    /// Names of the `on*` handler attributes present
    pub fn event_handlers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs
            .iter()
            .filter(|(k, _)| k.starts_with("on") && k.len() > 2)
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Heading level for `h1`..`h6`
    pub fn heading_level(&self) -> Option<u8> {
        let bytes = self.tag.as_bytes();
        if bytes.len() == 2 && bytes[0] == b'h' && (b'1'..=b'6').contains(&bytes[1]) {
            Some(bytes[1] - b'0')
        } else {
            None
        }
    }

    /// Short identification used in offender lists
    pub fn describe(&self) -> serde_json::Value {
        serde_json::json!({
            "tag": self.tag,
            "id": self.id(),
            "class": self.class(),
        })
    }
}

/// Landmark presence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct Landmarks {
    pub main: bool,
    pub nav: bool,
    pub search: bool,
    pub contentinfo: bool,
    pub banner: bool,
    pub complementary: bool,
}

/// Parsed page
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub title_text: String,
    /// `<html lang>`, lower-cased
    pub lang: String,
    /// `content` of `<meta name="viewport">`
    pub meta_viewport: Option<String>,
    /// `og:site_name` or `application-name`
    pub site_name_meta: Option<String>,
    /// `<meta>` content keyed by lower-cased `name`, `property` or `http-equiv`; first one wins
    pub meta: HashMap<String, String>,
    pub elements: Vec<Element>,
    /// `label[for]` target id to label text
    pub labels_for: HashMap<String, String>,
    pub landmarks: Landmarks,
    /// Ids used more than once, in first-seen order
    pub duplicate_ids: Vec<String>,
    /// Bodies of inline `<script>` elements
    pub scripts: Vec<String>,
    /// Bodies of `<style>` elements
    pub styles: Vec<String>,
    /// Whitespace-collapsed text outside `<head>`, scripts and styles
    pub body_text: String,
}

enum Step {
    Enter(NodeHandle),
    Leave,
}

impl PageContext {
    /// Parse a document. Only a parser failure is an error; malformed markup is tolerated.
    pub fn parse(html: &str) -> Result<Self, EngineError> {
        let dom = tl::parse(html, ParserOptions::default())
            .map_err(|e| EngineError::Parse(format!("{e:?}")))?;
        let parser = dom.parser();

        let mut walker = Walker::new(parser);
        let mut stack: Vec<Step> = dom.children().iter().rev().map(|h| Step::Enter(*h)).collect();
        while let Some(step) = stack.pop() {
            match step {
                Step::Enter(handle) => walker.enter(handle, &mut stack),
                Step::Leave => walker.leave(),
            }
        }
        Ok(walker.finish())
    }

    pub fn by_tag<'a>(&'a self, tags: &'a [&'a str]) -> impl Iterator<Item = &'a Element> + 'a {
        self.elements.iter().filter(move |e| tags.contains(&e.tag.as_str()))
    }

    pub fn imgs(&self) -> impl Iterator<Item = &Element> {
        self.by_tag(&["img"])
    }

    pub fn videos(&self) -> impl Iterator<Item = &Element> {
        self.by_tag(&["video"])
    }

    pub fn audios(&self) -> impl Iterator<Item = &Element> {
        self.by_tag(&["audio"])
    }

    pub fn iframes(&self) -> impl Iterator<Item = &Element> {
        self.by_tag(&["iframe"])
    }

    pub fn tables(&self) -> impl Iterator<Item = &Element> {
        self.by_tag(&["table"])
    }

    pub fn anchors(&self) -> impl Iterator<Item = &Element> {
        self.by_tag(&["a"])
    }

    pub fn buttons(&self) -> impl Iterator<Item = &Element> {
        self.by_tag(&["button"])
    }

    /// `input`, `select` and `textarea`
    pub fn inputs(&self) -> impl Iterator<Item = &Element> {
        self.by_tag(&["input", "select", "textarea"])
    }

    pub fn forms(&self) -> impl Iterator<Item = &Element> {
        self.by_tag(&["form"])
    }

    /// Text of the elements inside the form at `form`
    pub fn form_text(&self, form: usize) -> String {
        self.elements
            .iter()
            .filter(|e| e.form == Some(form) && !e.text.is_empty())
            .map(|e| e.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn headings(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter().filter(|e| e.heading_level().is_some())
    }

    /// Elements below `<html>` carrying their own `lang`
    pub fn lang_parts(&self) -> impl Iterator<Item = &Element> {
        self.elements
            .iter()
            .filter(|e| e.tag != "html" && e.attr_nonempty("lang").is_some())
    }

    /// Text of the element referenced by `id` (for `aria-labelledby`)
    pub fn text_of_id(&self, id: &str) -> Option<&str> {
        self.elements
            .iter()
            .find(|e| e.id() == id)
            .map(|e| e.text.as_str())
            .filter(|t| !t.is_empty())
    }

    pub fn meta(&self, key: &str) -> Option<&str> {
        self.meta.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    /// Inline scripts plus every `on*` handler attribute, lower-cased
    pub fn script_text(&self) -> String {
        let mut out = String::new();
        for script in &self.scripts {
            out.push_str(script);
            out.push('\n');
        }
        for el in &self.elements {
            for (_, handler) in el.event_handlers() {
                out.push_str(handler);
                out.push('\n');
            }
        }
        out.to_lowercase()
    }

    /// Style sheets plus inline `style` attributes, lower-cased
    pub fn style_text(&self) -> String {
        let mut out = self.styles.join("\n");
        for el in &self.elements {
            if let Some(style) = el.attr("style") {
                out.push('\n');
                out.push_str(style);
            }
        }
        out.to_lowercase()
    }
}

/// An element whose closing step is still pending
struct Open {
    index: usize,
    /// First text chunk seen inside the element
    text_from: usize,
}

struct Walker<'p, 'buf> {
    parser: &'p Parser<'buf>,
    elements: Vec<Element>,
    open: Vec<Open>,
    /// Open element indices per tag name
    open_tags: HashMap<String, Vec<usize>>,
    /// Open `nav` / `role=navigation` elements
    nav_depth: usize,
    /// Open navigation blocks, outermost first
    regions: Vec<usize>,
    chunks: Vec<String>,
    ctx: PageContext,
    seen_ids: HashSet<String>,
}

impl<'p, 'buf> Walker<'p, 'buf> {
    fn new(parser: &'p Parser<'buf>) -> Self {
        Self {
            parser,
            elements: Vec::new(),
            open: Vec::new(),
            open_tags: HashMap::new(),
            nav_depth: 0,
            regions: Vec::new(),
            chunks: Vec::new(),
            ctx: PageContext::default(),
            seen_ids: HashSet::new(),
        }
    }

    fn enter(&mut self, handle: NodeHandle, stack: &mut Vec<Step>) {
        let Some(node) = handle.get(self.parser) else {
            return;
        };
        let tag = match node {
            Node::Tag(tag) => tag,
            Node::Raw(raw) => {
                self.text(&raw.as_utf8_str());
                return;
            }
            Node::Comment(_) => return,
        };

        let element = self.element_from(tag);
        self.record(&element);

        let opaque = matches!(element.tag.as_str(), "script" | "style");
        if opaque {
            let mut body = raw_body(&tag.raw().as_utf8_str());
            if body.trim().is_empty() {
                // Unclosed in the parser's eyes; fall back to the direct text children.
                body = tag
                    .children()
                    .top()
                    .iter()
                    .filter_map(|h| h.get(self.parser))
                    .filter_map(Node::as_raw)
                    .map(|b| b.as_utf8_str().into_owned())
                    .collect();
            }
            if !body.trim().is_empty() {
                if element.tag == "script" {
                    self.ctx.scripts.push(body);
                } else {
                    self.ctx.styles.push(body);
                }
            }
        }

        let index = self.elements.len();
        if is_nav(&element) {
            self.nav_depth += 1;
        }
        if is_nav(&element) || matches!(element.tag.as_str(), "header" | "footer") {
            self.regions.push(index);
        }
        self.open_tags
            .entry(element.tag.clone())
            .or_default()
            .push(index);
        self.elements.push(element);
        self.open.push(Open {
            index,
            text_from: self.chunks.len(),
        });
        stack.push(Step::Leave);
        if !opaque {
            for child in tag.children().top().as_slice().iter().rev() {
                stack.push(Step::Enter(*child));
            }
        }
    }

    fn leave(&mut self) {
        let Some(open) = self.open.pop() else {
            return;
        };
        if let Some(indices) = self.open_tags.get_mut(&self.elements[open.index].tag) {
            indices.pop();
        }
        if is_nav(&self.elements[open.index]) {
            self.nav_depth = self.nav_depth.saturating_sub(1);
        }
        if self.regions.last() == Some(&open.index) {
            self.regions.pop();
        }
        let collects = {
            let el = &self.elements[open.index];
            TEXT_TAGS.contains(&el.tag.as_str()) || el.has_attr("style")
        };
        if collects {
            let mut text = String::new();
            for chunk in &self.chunks[open.text_from..] {
                if text.len() >= ELEMENT_TEXT_CAP {
                    break;
                }
                text.push_str(chunk);
            }
            self.elements[open.index].text = collapse_ws(&text);
        }

        let el = &self.elements[open.index];
        match el.tag.as_str() {
            "title" if self.ctx.title_text.is_empty() => {
                self.ctx.title_text = el.text.clone();
            }
            "label" => {
                if let Some(target) = el.attr_nonempty("for") {
                    self.ctx
                        .labels_for
                        .insert(target.to_string(), el.text.clone());
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, raw: &str) {
        if raw.trim().is_empty() {
            self.chunks.push(" ".to_string());
            return;
        }
        self.chunks.push(raw.to_string());
        if self.has_ancestor("head") || self.ctx.body_text.len() >= BODY_TEXT_CAP {
            return;
        }
        if !self.ctx.body_text.is_empty() {
            self.ctx.body_text.push(' ');
        }
        self.ctx.body_text.push_str(&collapse_ws(raw));
    }

    fn element_from(&self, tag: &HTMLTag<'buf>) -> Element {
        let name = tag.name().as_utf8_str().to_ascii_lowercase();

        let mut attrs = BTreeMap::new();
        for (key, value) in tag.attributes().iter() {
            attrs.insert(
                key.to_ascii_lowercase(),
                value.map(|v| v.trim().to_string()).unwrap_or_default(),
            );
        }
        if let Some(id) = tag.attributes().id() {
            attrs
                .entry("id".to_string())
                .or_insert_with(|| id.as_utf8_str().trim().to_string());
        }
        if let Some(class) = tag.attributes().class() {
            attrs
                .entry("class".to_string())
                .or_insert_with(|| class.as_utf8_str().trim().to_string());
        }

        let in_link = self.has_ancestor("a");
        let in_label = self.has_ancestor("label");
        let form = self.open_tags.get("form").and_then(|open| open.last().copied());
        let in_form = form.is_some();
        let in_nav = self.nav_depth > 0;
        let in_paragraph = ["p", "li", "td"].iter().any(|t| self.has_ancestor(t));
        let in_fieldset = self
            .open_tags
            .get("fieldset")
            .is_some_and(|open| open.iter().any(|&i| self.elements[i].item_count > 0));

        Element {
            tag: name,
            attrs,
            in_link,
            in_label,
            in_fieldset,
            in_form,
            form,
            in_nav,
            in_paragraph,
            nav_region: self.regions.first().copied(),
            ..Element::default()
        }
    }

    fn has_ancestor(&self, tag: &str) -> bool {
        self.open_tags.get(tag).is_some_and(|open| !open.is_empty())
    }

    fn nearest_ancestor(&mut self, tags: &[&str]) -> Option<&mut Element> {
        let index = tags
            .iter()
            .filter_map(|t| self.open_tags.get(*t).and_then(|open| open.last().copied()))
            .max()?;
        self.elements.get_mut(index)
    }

    /// Page-level facts and counts on enclosing elements
    fn record(&mut self, el: &Element) {
        match el.tag.as_str() {
            "html" => {
                self.ctx.lang = el.attr("lang").unwrap_or_default().trim().to_lowercase();
            }
            "meta" => {
                let name = el.attr("name").unwrap_or_default().to_ascii_lowercase();
                let property = el.attr("property").unwrap_or_default().to_ascii_lowercase();
                let equiv = el.attr("http-equiv").unwrap_or_default().to_ascii_lowercase();
                let content = el.attr("content").unwrap_or_default().trim().to_string();
                for key in [&name, &property, &equiv] {
                    if !key.is_empty() {
                        self.ctx
                            .meta
                            .entry(key.clone())
                            .or_insert_with(|| content.clone());
                    }
                }
                if name == "viewport" && self.ctx.meta_viewport.is_none() {
                    self.ctx.meta_viewport = Some(content);
                } else if (property == "og:site_name" || name == "application-name")
                    && !content.is_empty()
                    && (self.ctx.site_name_meta.is_none() || property == "og:site_name")
                {
                    self.ctx.site_name_meta = Some(content);
                }
            }
            "th" => {
                if let Some(table) = self.nearest_ancestor(&["table"]) {
                    table.th_count += 1;
                }
            }
            "tr" => {
                if let Some(table) = self.nearest_ancestor(&["table"]) {
                    table.row_count += 1;
                }
            }
            "li" | "dt" | "dd" => {
                if let Some(list) = self.nearest_ancestor(&["ul", "ol", "dl", "menu"]) {
                    list.item_count += 1;
                }
            }
            "legend" => {
                if let Some(fieldset) = self.nearest_ancestor(&["fieldset"]) {
                    fieldset.item_count += 1;
                }
            }
            "img" => {
                let alt = el.attr_nonempty("alt").unwrap_or_default().to_string();
                if let Some(owner) = self.nearest_ancestor(&["a", "button"]) {
                    if !alt.is_empty() {
                        if !owner.image_alt.is_empty() {
                            owner.image_alt.push(' ');
                        }
                        owner.image_alt.push_str(&alt);
                    }
                }
            }
            "track" => {
                let kind = el.attr("kind").unwrap_or_default().to_ascii_lowercase();
                let src = el.attr("src").unwrap_or_default().to_string();
                let label = el.attr("label").unwrap_or_default().to_lowercase();
                if let Some(media) = self.nearest_ancestor(&["video", "audio"]) {
                    media.track_kinds.push(kind);
                    media.track_srcs.push(src);
                    media.track_labels.push(label);
                }
            }
            "source" => {
                let src = el.attr("src").unwrap_or_default().to_string();
                if let Some(media) = self.nearest_ancestor(&["video", "audio"]) {
                    media.source_srcs.push(src);
                }
            }
            _ => {}
        }

        let role = el.role();
        let landmarks = &mut self.ctx.landmarks;
        match (el.tag.as_str(), role.as_str()) {
            ("main", _) | (_, "main") => landmarks.main = true,
            ("nav", _) | (_, "navigation") => landmarks.nav = true,
            (_, "search") => landmarks.search = true,
            (_, "contentinfo") => landmarks.contentinfo = true,
            (_, "banner") => landmarks.banner = true,
            (_, "complementary") => landmarks.complementary = true,
            _ => {}
        }

        if let Some(id) = el.attr_nonempty("id") {
            if !self.seen_ids.insert(id.to_string()) && !self.ctx.duplicate_ids.iter().any(|d| d == id)
            {
                self.ctx.duplicate_ids.push(id.to_string());
            }
        }
    }

    fn finish(mut self) -> PageContext {
        self.ctx.elements = self.elements;
        self.ctx
    }
}

fn is_nav(el: &Element) -> bool {
    el.tag == "nav" || el.role() == "navigation"
}

/// Content between the opening and closing tag of a raw `<script>`/`<style>` slice
fn raw_body(raw: &str) -> String {
    let start = raw.find('>').map(|i| i + 1).unwrap_or(0);
    let end = raw.rfind("</").filter(|&e| e >= start).unwrap_or(raw.len());
    raw[start..end].to_string()
}

/// Collapse runs of whitespace and trim
pub fn collapse_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r##"<!doctype html>
<html lang="ES">
<head>
  <title> Inicio </title>
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <meta property="og:site_name" content="Banco Demo">
</head>
<body>
  <nav><a href="#main">Saltar al contenido</a></nav>
  <main id="main">
    <a href="/x"><img src="logo.png" alt=""></a>
    <label for="q">Buscar</label><input id="q" type="text">
    <label>Nombre <input id="n" name="n"></label>
    <table><tr><th>A</th></tr><tr><td>1</td></tr></table>
    <ul><li>uno</li><li>dos</li></ul>
    <video controls><track kind="captions" src="c.vtt"></video>
    <p id="dup">a</p><p id="dup">b</p>
  </main>
</body>
</html>"##;

    #[test]
    fn parses_page_facts() {
        let ctx = PageContext::parse(PAGE).unwrap();
        assert_eq!(ctx.title_text, "Inicio");
        assert_eq!(ctx.lang, "es");
        assert_eq!(
            ctx.meta_viewport.as_deref(),
            Some("width=device-width, initial-scale=1")
        );
        assert_eq!(ctx.site_name_meta.as_deref(), Some("Banco Demo"));
        assert!(ctx.landmarks.main);
        assert!(ctx.landmarks.nav);
        assert!(!ctx.landmarks.search);
        assert_eq!(ctx.labels_for.get("q").map(String::as_str), Some("Buscar"));
        assert_eq!(ctx.duplicate_ids, vec!["dup".to_string()]);
    }

    #[test]
    fn tracks_ancestry_and_nested_counts() {
        let ctx = PageContext::parse(PAGE).unwrap();

        let img = ctx.imgs().next().unwrap();
        assert!(img.in_link);
        assert_eq!(img.attr("alt"), Some(""));

        let wrapped = ctx.inputs().find(|e| e.id() == "n").unwrap();
        assert!(wrapped.in_label);

        let table = ctx.tables().next().unwrap();
        assert_eq!(table.th_count, 1);
        assert_eq!(table.row_count, 2);

        let list = ctx.by_tag(&["ul"]).next().unwrap();
        assert_eq!(list.item_count, 2);

        let video = ctx.videos().next().unwrap();
        assert_eq!(video.track_kinds, vec!["captions".to_string()]);
        assert!(video.has_attr("controls"));
    }

    #[test]
    fn collects_scripts_styles_and_body_text() {
        let html = r#"<html><head>
            <meta http-equiv="Content-Language" content="es-PE">
            <style>.a { color: red }</style>
            <script>if (a < b) { go(); }</script>
            <title>Cuenta</title>
        </head><body><p>Hola <b>mundo</b></p><script src="x.js"></script></body></html>"#;
        let ctx = PageContext::parse(html).unwrap();
        assert_eq!(ctx.meta("content-language"), Some("es-PE"));
        assert_eq!(ctx.styles.len(), 1);
        assert!(ctx.styles[0].contains("color: red"));
        assert_eq!(ctx.scripts.len(), 1);
        assert!(ctx.scripts[0].contains("go()"));
        assert_eq!(ctx.body_text, "Hola mundo");
        assert_eq!(ctx.title_text, "Cuenta");
        let p = ctx.by_tag(&["p"]).next().unwrap();
        assert_eq!(p.text, "Hola mundo");
    }

    #[test]
    fn deeply_nested_markup_does_not_overflow() {
        let depth = 50_000;
        let mut html = String::with_capacity(depth * 12);
        for _ in 0..depth {
            html.push_str("<div><span>");
        }
        html.push_str("fondo");
        for _ in 0..depth {
            html.push_str("</span></div>");
        }
        // A small stack makes a recursive walk fail long before this depth.
        let handle = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(move || PageContext::parse(&html).map(|ctx| ctx.elements.len()))
            .unwrap();
        let elements = handle.join().expect("walker thread panicked").unwrap();
        assert_eq!(elements, depth * 2);
    }

    #[test]
    fn navigation_blocks_group_their_links() {
        let ctx = PageContext::parse(
            r#"<header><a href="/">Inicio</a><nav><a href="/a">A</a></nav></header>
            <main><a href="/b">B</a></main>
            <footer><a href="/c">C</a></footer>"#,
        )
        .unwrap();
        let regions: Vec<_> = ctx.anchors().map(|a| a.nav_region).collect();
        assert!(regions[0].is_some());
        assert_eq!(regions[0], regions[1], "nested nav stays in the header block");
        assert_eq!(regions[2], None);
        assert!(regions[3].is_some());
        assert_ne!(regions[3], regions[0]);
    }

    #[test]
    fn form_membership_and_text() {
        let ctx = PageContext::parse(
            r#"<form id="a"><label>Nombre <input name="n"></label><button>Enviar</button></form>
            <input name="fuera"><form id="b"><p>Pago</p></form>"#,
        )
        .unwrap();
        let forms: Vec<usize> = ctx
            .elements
            .iter()
            .enumerate()
            .filter(|(_, e)| e.tag == "form")
            .map(|(i, _)| i)
            .collect();
        assert_eq!(forms.len(), 2);
        let inside = ctx.inputs().find(|e| e.attr("name") == Some("n")).unwrap();
        assert_eq!(inside.form, Some(forms[0]));
        assert!(inside.in_form);
        let outside = ctx.inputs().find(|e| e.attr("name") == Some("fuera")).unwrap();
        assert_eq!(outside.form, None);
        assert!(ctx.form_text(forms[0]).contains("Enviar"));
        assert_eq!(ctx.form_text(forms[1]), "Pago");
    }

    #[test]
    fn heading_levels() {
        let ctx = PageContext::parse("<h1>a</h1><h3>b</h3><hr>").unwrap();
        let levels: Vec<_> = ctx.headings().filter_map(Element::heading_level).collect();
        assert_eq!(levels, vec![1, 3]);
    }
}
