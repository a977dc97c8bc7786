//! Guideline 1.2: Time-based Media
//!
//! Everything here works from markup signals: `<track>` kinds, `data-*`
//! annotations left by the publisher and the player URL. Nothing inspects the
//! media stream itself, so an unannotated video with audio is assumed to need
//! every alternative its criterion asks for.

use serde_json::{json, Map, Value};
use url::Url;

use crate::contract::Verdict;
use crate::engine::context::{Element, PageContext};
use crate::engine::outcome::{missing_share_verdict, Evaluation};

use super::{details, note, ratio, Pass, MAX_OFFENDERS};

fn decorative(el: &Element) -> bool {
    el.flag("aria-hidden") || matches!(el.role().as_str(), "presentation" | "none")
}

/// Silent looping background video without controls
fn background_video(el: &Element) -> bool {
    el.has_attr("autoplay") && el.has_attr("muted") && el.has_attr("loop") && !el.has_attr("controls")
}

fn decorative_video(el: &Element) -> bool {
    decorative(el) || background_video(el)
}

/// Unknown counts as having audio
fn has_audio(el: &Element) -> bool {
    !(el.flag("noaudio") || el.flag("data-noaudio"))
}

fn media_alt_for_text(el: &Element) -> bool {
    el.flag("data-media-alt-for-text")
}

fn src_of(el: &Element) -> String {
    el.media_src().chars().take(180).collect()
}

fn track_kind(el: &Element, kinds: &[&str]) -> bool {
    el.track_kinds.iter().any(|k| kinds.contains(&k.as_str()))
}

fn has_captions(el: &Element) -> bool {
    track_kind(el, &["captions", "subtitles"])
        || el
            .track_srcs
            .iter()
            .any(|s| s.to_ascii_lowercase().ends_with(".vtt"))
        || el.attr_nonempty("data-captions").is_some()
}

/// Host and query keys of a player URL
fn url_parts(src: &str) -> (String, Vec<String>) {
    match Url::parse(src.trim()) {
        Ok(url) => (
            url.host_str().unwrap_or_default().to_ascii_lowercase(),
            url.query_pairs().map(|(k, _)| k.into_owned()).collect(),
        ),
        Err(_) => (String::new(), Vec::new()),
    }
}

fn streaming_src(src: &str) -> bool {
    let src = src.to_ascii_lowercase();
    src.contains(".m3u8") || src.contains(".mpd")
}

/// Platform of an embedded player and whether its URL hints at a live stream
fn platform_info(src: &str) -> (Option<&'static str>, bool) {
    let (host, query) = url_parts(src);
    let lower = src.to_ascii_lowercase();
    if host.contains("youtube.com") || host.contains("youtu.be") {
        (Some("youtube"), lower.contains("live") || query.iter().any(|k| k == "cc_load_policy"))
    } else if host.contains("vimeo.com") {
        (Some("vimeo"), lower.contains("live"))
    } else if host.contains("twitch.tv") {
        (Some("twitch"), true)
    } else if host.contains("facebook.com") || host.contains("fb.watch") {
        (Some("facebook"), lower.contains("live"))
    } else if streaming_src(src) {
        (Some("generic_stream"), true)
    } else {
        (None, false)
    }
}

fn is_live(el: &Element) -> bool {
    if el.flag("is_live") || el.flag("data-live") || el.flag("live") {
        return true;
    }
    let aria_live = el.attr("aria-live").unwrap_or_default().to_ascii_lowercase();
    if matches!(aria_live.as_str(), "polite" | "assertive")
        && matches!(el.tag.as_str(), "video" | "iframe" | "embed")
    {
        return true;
    }
    let src = el.media_src();
    if streaming_src(src) || el.source_srcs.iter().any(|s| streaming_src(s)) {
        return true;
    }
    platform_info(src).1 || el.flag("streaming") || el.flag("data-stream")
}

fn offender(el: &Element, reason: &str) -> Value {
    json!({
        "tag": el.tag,
        "src": src_of(el),
        "id": el.id(),
        "class": el.class(),
        "track_kinds": el.track_kinds,
        "reason": reason,
    })
}

fn push_offender(offenders: &mut Vec<Value>, el: &Element, reason: &str) {
    if offenders.len() < MAX_OFFENDERS {
        offenders.push(offender(el, reason));
    }
}

/// Tally for the "required / with / missing" family of media checks
#[derive(Default)]
struct Tally {
    total: usize,
    decorative: usize,
    without_audio: usize,
    exempt: usize,
    live_exempt: usize,
    required: usize,
    satisfied: usize,
    offenders: Vec<Value>,
}

impl Tally {
    fn missing(&self) -> usize {
        self.required - self.satisfied
    }

    fn check(&mut self, el: &Element, ok: bool, reason: &str) {
        self.required += 1;
        if ok {
            self.satisfied += 1;
        } else {
            push_offender(&mut self.offenders, el, reason);
        }
    }

    /// Share of media that needs nothing more
    fn ok_ratio(&self) -> f64 {
        let fine = self.total - self.missing();
        ratio(fine, self.total)
    }
}

fn finish(tally: Tally, mut d: Map<String, Value>) -> Evaluation {
    let verdict = if tally.total == 0 {
        Verdict::Na
    } else {
        missing_share_verdict(tally.missing(), tally.required)
    };
    d.insert("ok_ratio".into(), json!(tally.ok_ratio()));
    d.insert("offenders".into(), Value::Array(tally.offenders));
    Evaluation::new(verdict, d)
}

/// 1.2.1 Audio-only and Video-only (Prerecorded)
pub fn audio_video_only(ctx: &PageContext, pass: Pass) -> Evaluation {
    let mut total = 0usize;
    let mut audios = 0usize;
    let mut videos = 0usize;
    let mut with_alt = 0usize;
    let mut decorative_count = 0usize;
    let mut offenders = Vec::new();

    for el in ctx.by_tag(&["audio", "video"]) {
        total += 1;
        if el.tag == "audio" {
            audios += 1;
        } else {
            videos += 1;
        }
        let is_decorative = decorative(el) || (el.tag == "video" && background_video(el));
        if is_decorative {
            decorative_count += 1;
            continue;
        }
        let has_alt = ["aria-label", "aria-labelledby", "title", "longdesc", "data-transcript", "data-description"]
            .iter()
            .any(|a| el.attr_nonempty(a).is_some())
            || track_kind(el, &["descriptions"]);
        if has_alt {
            with_alt += 1;
        } else {
            push_offender(
                &mut offenders,
                el,
                "Prerecorded media without a nearby text alternative.",
            );
        }
    }

    let missing = total - with_alt - decorative_count;
    let verdict = if total == 0 {
        Verdict::Na
    } else if missing == 0 {
        Verdict::Pass
    } else if missing >= total {
        Verdict::Fail
    } else {
        Verdict::Partial
    };
    let ok_ratio = (total > 0).then(|| ratio(with_alt + decorative_count, total));
    let mut d = details(json!({
        "media_total": total,
        "audios": audios,
        "videos": videos,
        "with_alt": with_alt,
        "decorative": decorative_count,
        "missing_alt": missing,
        "ok_ratio": ok_ratio,
        "offenders": offenders,
        "note": note(pass, "prerecorded audio and video need a text alternative (aria-label, title, longdesc, data-transcript) or a descriptions track. Background and hidden media are decorative."),
    }));
    if total == 0 {
        d.insert("na".into(), Value::Bool(true));
    }
    Evaluation::new(verdict, d)
}

/// 1.2.2 Captions (Prerecorded)
pub fn captions_prerecorded(ctx: &PageContext, pass: Pass) -> Evaluation {
    let mut tally = Tally::default();
    for video in ctx.videos() {
        tally.total += 1;
        if decorative_video(video) {
            tally.decorative += 1;
            continue;
        }
        if !has_audio(video) {
            tally.without_audio += 1;
            continue;
        }
        tally.check(
            video,
            has_captions(video),
            "Video with audio and no captions/subtitles track.",
        );
    }

    let d = details(json!({
        "videos_total": tally.total,
        "decorative": tally.decorative,
        "without_audio": tally.without_audio,
        "requiring_captions": tally.required,
        "with_captions": tally.satisfied,
        "missing_captions": tally.missing(),
        "note": note(pass, "prerecorded video with audio needs <track kind=captions|subtitles>. Background videos (autoplay+muted+loop, no controls) are excluded."),
    }));
    finish(tally, d)
}

fn has_media_alternative(el: &Element) -> bool {
    ["data-transcript", "data-media-alt", "longdesc"]
        .iter()
        .any(|a| el.attr_nonempty(a).is_some())
}

/// 1.2.3 Audio Description or Media Alternative (Prerecorded)
pub fn audio_description_or_alternative(ctx: &PageContext, pass: Pass) -> Evaluation {
    let mut tally = Tally::default();
    for video in ctx.videos() {
        tally.total += 1;
        if decorative_video(video) {
            tally.decorative += 1;
            continue;
        }
        if !has_audio(video) {
            tally.without_audio += 1;
            continue;
        }
        if media_alt_for_text(video) {
            tally.exempt += 1;
            continue;
        }
        let ok = track_kind(video, &["descriptions"]) || has_media_alternative(video);
        tally.check(
            video,
            ok,
            "Prerecorded video with audio without audio description or a media alternative.",
        );
    }

    let d = details(json!({
        "videos_total": tally.total,
        "requiring_ad_or_alt": tally.required,
        "with_ad_or_alt": tally.satisfied,
        "missing_ad_or_alt": tally.missing(),
        "without_audio": tally.without_audio,
        "decorative": tally.decorative,
        "exempt_media_alt_for_text": tally.exempt,
        "note": note(pass, "needs a descriptions track or a scene-by-scene text alternative; captions alone do not count."),
    }));
    finish(tally, d)
}

fn has_live_captions(el: &Element) -> bool {
    if el.tag == "video" && has_captions(el) {
        return true;
    }
    let (_, query) = url_parts(el.media_src());
    query.iter().any(|k| k == "cc_load_policy")
        || el.flag("data-cc-enabled")
        || el.flag("cc_enabled")
        || el.flag("data-live-captions")
}

/// 1.2.4 Captions (Live)
pub fn captions_live(ctx: &PageContext, pass: Pass) -> Evaluation {
    let candidates: Vec<&Element> = ctx
        .videos()
        .filter(|v| is_live(v))
        .chain(ctx.iframes().filter(|f| !f.media_src().is_empty() && is_live(f)))
        .collect();

    let mut tally = Tally {
        total: candidates.len(),
        ..Tally::default()
    };
    for el in candidates {
        let hidden = if el.tag == "video" {
            decorative_video(el)
        } else {
            decorative(el)
        };
        if hidden {
            tally.decorative += 1;
            continue;
        }
        if !has_audio(el) {
            tally.without_audio += 1;
            continue;
        }
        let ok = has_live_captions(el);
        tally.required += 1;
        if ok {
            tally.satisfied += 1;
        } else if tally.offenders.len() < MAX_OFFENDERS {
            let mut o = offender(el, "Live stream with audio and no live captions.");
            o["platform"] = json!(platform_info(el.media_src()).0);
            tally.offenders.push(o);
        }
    }

    let d = details(json!({
        "live_media_total": tally.total,
        "requiring_captions": tally.required,
        "with_captions": tally.satisfied,
        "missing_captions": tally.missing(),
        "without_audio": tally.without_audio,
        "decorative": tally.decorative,
        "note": note(pass, "live video and live embeds (flags, HLS/DASH sources, platform hints) with audio need live captions."),
    }));
    finish(tally, d)
}

fn has_ad_variant(el: &Element) -> bool {
    el.flag("data-audio-described") || el.attr_nonempty("data-ad-src").is_some()
}

/// 1.2.5 Audio Description (Prerecorded)
pub fn audio_description(ctx: &PageContext, pass: Pass) -> Evaluation {
    let mut tally = Tally::default();
    for video in ctx.videos() {
        tally.total += 1;
        if decorative_video(video) {
            tally.decorative += 1;
            continue;
        }
        if !has_audio(video) {
            tally.without_audio += 1;
            continue;
        }
        if media_alt_for_text(video) {
            tally.exempt += 1;
            continue;
        }
        let ok = track_kind(video, &["descriptions"]) || has_ad_variant(video);
        tally.check(
            video,
            ok,
            "Prerecorded video with audio and no audio description.",
        );
    }

    let d = details(json!({
        "videos_total": tally.total,
        "requiring_ad": tally.required,
        "with_ad": tally.satisfied,
        "missing_ad": tally.missing(),
        "without_audio": tally.without_audio,
        "decorative": tally.decorative,
        "exempt_media_alt_for_text": tally.exempt,
        "note": note(pass, "accepts <track kind=descriptions> or an audio-described version (data-audio-described, data-ad-src)."),
    }));
    finish(tally, d)
}

const SIGN_LABEL_HINTS: &[&str] = &["sign", "señas", "lsp", "asl", "bsl", "lsek", "lsc", "lpi"];

fn has_sign_language(el: &Element) -> bool {
    track_kind(el, &["sign", "signlanguage"])
        || el
            .track_labels
            .iter()
            .any(|l| SIGN_LABEL_HINTS.iter().any(|h| l.contains(h)))
        || el.attr_nonempty("data-sign-language").is_some()
        || el.flag("data-sign-overlay")
}

/// 1.2.6 Sign Language (Prerecorded)
pub fn sign_language(ctx: &PageContext, pass: Pass) -> Evaluation {
    let mut tally = Tally::default();
    for video in ctx.videos() {
        tally.total += 1;
        if decorative_video(video) {
            tally.decorative += 1;
            continue;
        }
        if is_live(video) {
            tally.live_exempt += 1;
            continue;
        }
        if !has_audio(video) {
            tally.without_audio += 1;
            continue;
        }
        tally.check(
            video,
            has_sign_language(video),
            "Prerecorded video with audio and no sign language interpretation.",
        );
    }

    let d = details(json!({
        "videos_total": tally.total,
        "requiring_sign": tally.required,
        "with_sign": tally.satisfied,
        "missing_sign": tally.missing(),
        "without_audio": tally.without_audio,
        "decorative": tally.decorative,
        "live_exempt": tally.live_exempt,
        "note": note(pass, "accepts a sign language track, an interpreter overlay or data-sign-language."),
    }));
    finish(tally, d)
}

fn needs_extended_ad(el: &Element) -> bool {
    ["data-needs-extended-ad", "data-dense-audio", "data-no-dialogue-pauses"]
        .iter()
        .any(|a| el.flag(a))
}

/// 1.2.7 Extended Audio Description (Prerecorded)
pub fn extended_audio_description(ctx: &PageContext, pass: Pass) -> Evaluation {
    let mut tally = Tally::default();
    for video in ctx.videos() {
        tally.total += 1;
        if decorative_video(video) {
            tally.decorative += 1;
            continue;
        }
        if !has_audio(video) {
            tally.without_audio += 1;
            continue;
        }
        if !needs_extended_ad(video) {
            continue;
        }
        let ok = video.flag("data-extended-ad") || video.attr_nonempty("data-extended-ad-src").is_some();
        tally.check(
            video,
            ok,
            "Video marked as lacking pauses for description has no extended audio description.",
        );
    }

    let d = details(json!({
        "videos_total": tally.total,
        "requiring_extended_ad": tally.required,
        "with_extended_ad": tally.satisfied,
        "missing_extended_ad": tally.missing(),
        "decorative": tally.decorative,
        "without_audio": tally.without_audio,
        "note": note(pass, "applies only to videos annotated as needing extended description (data-needs-extended-ad, data-dense-audio)."),
    }));
    finish(tally, d)
}

/// 1.2.8 Media Alternative (Prerecorded)
pub fn media_alternative(ctx: &PageContext, pass: Pass) -> Evaluation {
    let mut tally = Tally::default();
    for video in ctx.videos() {
        tally.total += 1;
        if decorative(video) {
            tally.decorative += 1;
            continue;
        }
        if is_live(video) {
            tally.live_exempt += 1;
            continue;
        }
        tally.check(
            video,
            has_media_alternative(video),
            "Prerecorded video without a full text alternative.",
        );
    }

    let d = details(json!({
        "videos_total": tally.total,
        "requiring_alt": tally.required,
        "with_alt": tally.satisfied,
        "missing_alt": tally.missing(),
        "decorative": tally.decorative,
        "live_exempt": tally.live_exempt,
        "note": note(pass, "every prerecorded video, with or without audio, needs a full text alternative (data-transcript, data-media-alt, longdesc)."),
    }));
    finish(tally, d)
}

fn has_live_text_alt(el: &Element) -> bool {
    el.flag("data-live-transcript") || el.flag("data-live-captions") || el.attr_nonempty("data-transcript").is_some()
}

/// 1.2.9 Audio-only (Live)
pub fn audio_only_live(ctx: &PageContext, pass: Pass) -> Evaluation {
    let audios_total = ctx.audios().count();
    let live: Vec<&Element> = ctx.audios().filter(|a| is_live(a)).collect();
    let mut tally = Tally {
        total: live.len(),
        ..Tally::default()
    };
    for audio in live {
        if decorative(audio) {
            tally.decorative += 1;
            continue;
        }
        tally.check(
            audio,
            has_live_text_alt(audio),
            "Live audio without a real-time text alternative.",
        );
    }

    let d = details(json!({
        "audios_total": audios_total,
        "live_audio_total": tally.total,
        "with_live_text_alt": tally.satisfied,
        "missing_live_text_alt": tally.missing(),
        "decorative": tally.decorative,
        "note": note(pass, "live audio needs a real-time transcript (data-live-transcript or equivalent)."),
    }));
    finish(tally, d)
}
