use once_cell::sync::Lazy;
use regex::Regex;

static KANA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\u3040-\u30FF]").expect("kana"));
static YEAR_LIKE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"20[1-2]\d").expect("year"));
static PERFORMER_SEP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*[&＆]\s*").expect("performer separator"));
// Footnote markers copied from wiki tables: "※..." tails and "[注1]" style refs.
static VOICE_FOOTNOTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\[［]注\d*[\]］]|※.*$").expect("voice footnote"));
static TRAILING_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*[0-9０-９]+$").expect("trailing number"));

/// Hiragana or katakana anywhere in `text`.
pub fn contains_kana(text: &str) -> bool {
    KANA_RE.is_match(text)
}

/// A "20xx" fragment, typical of datestamps leaking out of wiki templates.
pub fn is_year_like(text: &str) -> bool {
    YEAR_LIKE_RE.is_match(text)
}

/// Splits a shared credit such as `"A＆B"` into individual names. A credit
/// without a separator yields nothing.
pub fn split_performers(credit: &str) -> Vec<String> {
    if !PERFORMER_SEP_RE.is_match(credit) {
        return Vec::new();
    }
    PERFORMER_SEP_RE
        .split(credit)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Voice line titles carry instance counters ("会話3") and footnotes that are
/// not part of the translatable name.
pub fn normalize_voice_name(name: &str) -> String {
    let stripped = VOICE_FOOTNOTE_RE.replace_all(name, "");
    let stripped = stripped.trim();
    TRAILING_NUMBER_RE.replace(stripped, "").trim().to_string()
}
