//! Script-ratio language detection.
//!
//! Only two languages are distinguished: Korean (Hangul syllables, the
//! default) and English (ASCII letters). Links, mentions, hashtags and
//! punctuation are removed before counting.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"http\S+|www\S+|@\w+|#\w+").expect("static regex")
});

static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("static regex"));

/// Hangul ratio above which text is Korean outright.
const KOREAN_RATIO: f64 = 0.3;

/// ASCII-letter ratio above which text is English outright.
const ENGLISH_RATIO: f64 = 0.7;

/// Response language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    #[default]
    Korean,
    English,
}

impl Language {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Korean => "korean",
            Self::English => "english",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn is_hangul_syllable(c: char) -> bool {
    ('\u{AC00}'..='\u{D7A3}').contains(&c)
}

/// Classify `text`. Total: every input maps to exactly one language.
pub fn detect(text: &str) -> Language {
    if text.is_empty() {
        return Language::default();
    }

    let without_noise = NOISE.replace_all(text, "");
    let cleaned = PUNCTUATION.replace_all(&without_noise, "");

    let korean = cleaned.chars().filter(|c| is_hangul_syllable(*c)).count();
    let english = cleaned.chars().filter(|c| c.is_ascii_alphabetic()).count();
    let total = korean + english;

    if total == 0 {
        return Language::default();
    }

    let korean_ratio = korean as f64 / total as f64;
    let english_ratio = english as f64 / total as f64;

    if korean_ratio > KOREAN_RATIO {
        Language::Korean
    } else if english_ratio > ENGLISH_RATIO {
        Language::English
    } else if korean >= english {
        Language::Korean
    } else {
        Language::English
    }
}
