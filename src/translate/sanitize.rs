// Cleanup of raw model output
//
// Each stage is a pure function over the whole text and the stages run in a
// fixed order:
// 1. strip_meta_labels: "Translation:" style prefixes and note lines
// 2. drop_foreign_script_lines: lines written only in a script the target does not use
// 3. drop_cjk_heavy_lines: CJK leakage into non-CJK targets
// 4. collapse_blank_lines: squeeze runs of blank lines and trim

use once_cell::sync::Lazy;
use regex::Regex;

use super::prompt::is_cjk_language;

/// Lines that are commentary as a whole
static NOTE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(?:translation\s+note|translator'?s?\s+note|note|nota|remarque|anmerkung|注释|注|說明|说明|備考|참고)\s*[:：]",
    )
    .expect("valid note pattern")
});

/// Labels in front of the actual translation, e.g. "Spanish translation:"
static LABEL_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(?:[^:：\n]{0,40}?\s)?(?:translation|traducción|traduccion|traduction|übersetzung|tradução|traduzione|перевод|翻译|翻訳|번역|译文)\s*[:：]\s*",
    )
    .expect("valid label pattern")
});

static BLANK_RUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n(?:[ \t]*\n){2,}").expect("valid blank run pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Script {
    Hangul,
    Kana,
    Han,
    Cyrillic,
    Arabic,
    Hebrew,
    Thai,
    Devanagari,
}

impl Script {
    fn of(c: char) -> Option<Self> {
        match c as u32 {
            0x1100..=0x11FF | 0x3130..=0x318F | 0xA960..=0xA97F | 0xAC00..=0xD7AF | 0xD7B0..=0xD7FF => {
                Some(Self::Hangul)
            }
            0x3040..=0x309F | 0x30A0..=0x30FF | 0x31F0..=0x31FF | 0xFF66..=0xFF9F => Some(Self::Kana),
            0x3400..=0x4DBF | 0x4E00..=0x9FFF | 0xF900..=0xFAFF | 0x20000..=0x2A6DF => Some(Self::Han),
            0x0400..=0x052F => Some(Self::Cyrillic),
            0x0600..=0x06FF | 0x0750..=0x077F | 0xFB50..=0xFDFF | 0xFE70..=0xFEFF => Some(Self::Arabic),
            0x0590..=0x05FF => Some(Self::Hebrew),
            0x0E00..=0x0E7F => Some(Self::Thai),
            0x0900..=0x097F => Some(Self::Devanagari),
            _ => None,
        }
    }

    /// Language codes whose text is expected in this script
    fn languages(self) -> &'static [&'static str] {
        match self {
            Self::Hangul => &["ko"],
            Self::Kana => &["ja"],
            Self::Han => &["ja", "zh"],
            Self::Cyrillic => &["ru", "uk", "bg", "sr", "mk", "be", "kk", "ky", "mn", "tg"],
            Self::Arabic => &["ar", "fa", "ur", "ps"],
            Self::Hebrew => &["he", "yi"],
            Self::Thai => &["th"],
            Self::Devanagari => &["hi", "mr", "ne", "sa"],
        }
    }

    fn allowed_for(self, target_language: &str) -> bool {
        let target = target_language.to_lowercase();
        self.languages().contains(&target.as_str())
    }
}

fn is_cjk_char(c: char) -> bool {
    matches!(
        c as u32,
        0x1100..=0x11FF
            | 0x3000..=0x303F
            | 0x3040..=0x30FF
            | 0x3130..=0x318F
            | 0x31F0..=0x31FF
            | 0x3300..=0x33FF
            | 0x3400..=0x4DBF
            | 0x4E00..=0x9FFF
            | 0xAC00..=0xD7AF
            | 0xF900..=0xFAFF
            | 0xFF00..=0xFFEF
            | 0x20000..=0x2A6DF
    )
}

/// Remove meta-labels at line starts. Note lines are dropped entirely;
/// translation labels are cut and the text after them kept.
pub fn strip_meta_labels(text: &str) -> String {
    let mut kept = Vec::new();

    'lines: for line in text.lines() {
        let mut current = line;
        loop {
            if NOTE_LINE.is_match(current) {
                continue 'lines;
            }
            match LABEL_PREFIX.find(current) {
                Some(label) => {
                    current = &current[label.end()..];
                    if current.trim().is_empty() {
                        continue 'lines;
                    }
                }
                None => break,
            }
        }
        kept.push(current);
    }

    kept.join("\n")
}

/// Drop lines whose letters all belong to scripts the target language does
/// not use, e.g. pure Hangul lines in a French translation.
pub fn drop_foreign_script_lines(text: &str, target_language: &str) -> String {
    text.lines()
        .filter(|line| !is_foreign_script_line(line, target_language))
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_foreign_script_line(line: &str, target_language: &str) -> bool {
    let mut letters = line.chars().filter(|c| c.is_alphabetic()).peekable();
    if letters.peek().is_none() {
        return false;
    }
    letters.all(|c| matches!(Script::of(c), Some(script) if !script.allowed_for(target_language)))
}

/// Share of CJK characters among the non-whitespace characters of a line
pub fn cjk_fraction(line: &str) -> f64 {
    let (cjk, total) = line
        .chars()
        .filter(|c| !c.is_whitespace())
        .fold((0usize, 0usize), |(cjk, total), c| {
            (cjk + usize::from(is_cjk_char(c)), total + 1)
        });

    if total == 0 {
        0.0
    } else {
        cjk as f64 / total as f64
    }
}

/// For non-CJK targets, drop lines whose CJK fraction reaches `threshold`
pub fn drop_cjk_heavy_lines(text: &str, target_language: &str, threshold: f64) -> String {
    if is_cjk_language(target_language) {
        return text.to_string();
    }

    text.lines()
        .filter(|line| cjk_fraction(line) < threshold)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Squeeze two or more consecutive blank lines into one and trim the ends
pub fn collapse_blank_lines(text: &str) -> String {
    BLANK_RUN.replace_all(text, "\n\n").trim().to_string()
}

/// Runs the cleanup stages in order
#[derive(Debug, Clone)]
pub struct Sanitizer {
    cjk_threshold: f64,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl Sanitizer {
    pub fn new(cjk_threshold: f64) -> Self {
        Self { cjk_threshold }
    }

    pub fn sanitize(&self, raw: &str, target_language: &str) -> String {
        let text = raw.replace("\r\n", "\n");
        let text = strip_meta_labels(&text);
        let text = drop_foreign_script_lines(&text, target_language);
        let text = drop_cjk_heavy_lines(&text, target_language, self.cjk_threshold);
        collapse_blank_lines(&text)
    }
}
