//! Quality and language hints parsed from torrent titles.

use once_cell::sync::Lazy;
use regex_lite::Regex;

/// Binge-group marker for BluRay remuxes.
pub const BRREMUX_TAG: &str = "BluRay REMUX";

const BINGE_PREFIX: &str = "mirador";

fn patterns(list: &[(&'static str, &str)]) -> Vec<(&'static str, Regex)> {
    list.iter()
        .map(|(label, pattern)| (*label, Regex::new(pattern).unwrap()))
        .collect()
}

/// Low-quality sources; these win over the resolution.
static LOW_SOURCES: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    patterns(&[
        ("CAM", r"(?i)\b(cam|camrip|hdcam|cam-rip)\b"),
        ("TeleSync", r"(?i)\b(ts|hdts|telesync|pdvd)\b"),
        ("TeleCine", r"(?i)\b(tc|hdtc|telecine)\b"),
        ("SCR", r"(?i)\b(scr|screener|dvdscr|bdscr)\b"),
    ])
});

static RESOLUTIONS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    patterns(&[
        ("4k", r"(?i)\b(2160p|4k|uhd)\b"),
        ("1440p", r"(?i)\b1440p\b"),
        ("1080p", r"(?i)\b1080[pi]\b"),
        ("720p", r"(?i)\b720p\b"),
        ("576p", r"(?i)\b576p\b"),
        ("480p", r"(?i)\b480p\b"),
        ("360p", r"(?i)\b360p\b"),
    ])
});

static OTHER_SOURCES: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    patterns(&[
        ("BDRip", r"(?i)\bbd-?rip\b"),
        ("BRRip", r"(?i)\bbr-?rip\b"),
        ("DVDRip", r"(?i)\bdvd-?rip\b"),
        ("HDRip", r"(?i)\bhd-?rip\b"),
        ("WEBRip", r"(?i)\bweb-?rip\b"),
        ("WEB-DL", r"(?i)\bweb[ .-]?dl\b"),
        ("HDTV", r"(?i)\bhdtv\b"),
        ("BluRay", r"(?i)\bblu-?ray\b"),
        ("DVD", r"(?i)\bdvd(5|9)?\b"),
    ])
});

static HDR10_PLUS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bhdr10(\+|plus)").unwrap());
static HDR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bhdr(10)?\b").unwrap());
static DOLBY_VISION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(dv|dovi)\b|dolby[ .]?vision").unwrap());
static THREE_D: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b3d\b").unwrap());
static REMUX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bremux\b").unwrap());
static BLURAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(blu-?ray|bd-?remux)\b").unwrap());

static LANGUAGES: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    patterns(&[
        ("multi", r"(?i)\b(multi|dual[ .-]?audio)\b"),
        ("french", r"(?i)\b(french|truefrench|vff|vfq|vf2)\b"),
        ("spanish", r"(?i)\b(spanish|castellano|esp|latino)\b"),
        ("italian", r"(?i)\b(italian|ita)\b"),
        ("german", r"(?i)\b(german|ger|deutsch)\b"),
        ("russian", r"(?i)\b(russian|rus)\b"),
        ("portuguese", r"(?i)\b(portuguese|dublado|pt-br)\b"),
        ("polish", r"(?i)\b(polish|pl|lektor)\b"),
        ("hindi", r"(?i)\bhindi\b"),
        ("japanese", r"(?i)\b(japanese|jap)\b"),
    ])
});

fn first_match(list: &[(&'static str, Regex)], title: &str) -> Option<&'static str> {
    list.iter()
        .find(|(_, re)| re.is_match(title))
        .map(|(label, _)| *label)
}

/// Resolution bucket found in a title, if any.
pub fn detect_resolution(title: &str) -> Option<String> {
    first_match(&RESOLUTIONS, title).map(str::to_string)
}

/// Languages mentioned in a title.
pub fn detect_languages(title: &str) -> Vec<String> {
    LANGUAGES
        .iter()
        .filter(|(_, re)| re.is_match(title))
        .map(|(label, _)| label.to_string())
        .collect()
}

fn normalize_resolution(resolution: &str) -> Option<&'static str> {
    first_match(&RESOLUTIONS, resolution)
}

/// Quality label shown to clients, e.g. `"1080p HDR DV"` or `"CAM"`.
///
/// The first token is the source or resolution bucket, followed by visual
/// tags. `None` when nothing could be recognised.
pub fn quality_label(resolution: Option<&str>, title: &str) -> Option<String> {
    let base = first_match(&LOW_SOURCES, title)
        .or_else(|| resolution.and_then(normalize_resolution))
        .or_else(|| first_match(&RESOLUTIONS, title))
        .or_else(|| first_match(&OTHER_SOURCES, title))?;

    let mut tags = vec![base];
    if HDR10_PLUS.is_match(title) {
        tags.push("HDR10+");
    } else if HDR.is_match(title) {
        tags.push("HDR");
    }
    if DOLBY_VISION.is_match(title) {
        tags.push("DV");
    }
    if THREE_D.is_match(title) {
        tags.push("3D");
    }
    Some(tags.join(" "))
}

/// Binge group used by clients to auto-pick the next episode's stream.
pub fn binge_group(quality: Option<&str>, title: &str) -> String {
    let mut group = format!("{BINGE_PREFIX}|{}", quality.unwrap_or("unknown"));
    if REMUX.is_match(title) && BLURAY.is_match(title) {
        group.push('|');
        group.push_str(BRREMUX_TAG);
    }
    group
}
