//! Purpose: Provide the internal runtime JSON decode entrypoints and failure hints.
//! Exports: `from_str`, `from_slice`, `ParseFailureCategory`, `categorize_error`, `hint_for_error`.
//! Role: Parser boundary that centralizes serde_json usage details.
//! Invariants: Object key order is preserved so override precedence follows the document.
//! Invariants: Hints never echo payload content; they name a category and a context only.
//! Notes: Error mapping is done by callsites so domain context stays explicit.

use serde::de::DeserializeOwned;
use serde_json::error::Category;

pub(crate) fn from_str<T: DeserializeOwned>(input: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(input)
}

pub(crate) fn from_slice<T: DeserializeOwned>(input: &[u8]) -> Result<T, serde_json::Error> {
    serde_json::from_slice(input)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum ParseFailureCategory {
    Syntax,
    Eof,
    Shape,
    NumericRange,
    Utf8,
    DepthLimit,
    Io,
    Unknown,
}

impl ParseFailureCategory {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            ParseFailureCategory::Syntax => "syntax",
            ParseFailureCategory::Eof => "eof",
            ParseFailureCategory::Shape => "shape",
            ParseFailureCategory::NumericRange => "numeric-range",
            ParseFailureCategory::Utf8 => "utf8",
            ParseFailureCategory::DepthLimit => "depth-limit",
            ParseFailureCategory::Io => "io",
            ParseFailureCategory::Unknown => "unknown",
        }
    }
}

pub(crate) fn categorize_error(err: &serde_json::Error) -> ParseFailureCategory {
    match err.classify() {
        Category::Io => ParseFailureCategory::Io,
        Category::Eof => ParseFailureCategory::Eof,
        Category::Data => ParseFailureCategory::Shape,
        Category::Syntax => match categorize_message(&err.to_string()) {
            ParseFailureCategory::Unknown => ParseFailureCategory::Syntax,
            specific => specific,
        },
    }
}

/// Best-effort mapping from parser message text to a category.
pub(crate) fn categorize_message(message: &str) -> ParseFailureCategory {
    let lower = message.to_ascii_lowercase();
    if lower.contains("recursion limit") {
        ParseFailureCategory::DepthLimit
    } else if lower.contains("utf-8") || lower.contains("utf8") || lower.contains("unicode") {
        ParseFailureCategory::Utf8
    } else if lower.contains("out of range") {
        ParseFailureCategory::NumericRange
    } else if lower.contains("eof") {
        ParseFailureCategory::Eof
    } else {
        ParseFailureCategory::Unknown
    }
}

pub(crate) fn hint_for_error(err: &serde_json::Error, context: &str) -> String {
    format!(
        "parse category: {}; context: {context}; line {} column {}",
        categorize_error(err).as_str(),
        err.line(),
        err.column()
    )
}
