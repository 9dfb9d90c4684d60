//! Language-agnostic sanitizers for text copied from a spec into generated code
//!
//! Descriptions and summaries in an OpenAPI document are untrusted and end up
//! inside docstrings and comments; these helpers keep them on one line and
//! free of sequences that would terminate the surrounding construct.

use once_cell::sync::Lazy;
use regex::Regex;

static SMART_PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\u{2018}\u{2019}\u{201C}\u{201D}\u{2014}]").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Collapse Markdown into a single safe line of documentation text.
///
/// Smart quotes and em-dashes become ASCII, whitespace runs collapse to one
/// space, empty lines disappear.
///
/// # Examples
/// ```
/// use sdkforge::generation::sanitizers::sanitize_markdown;
///
/// let output = sanitize_markdown("List   all\n\npets\u{2014}fast");
/// assert_eq!(output, "List all pets-fast");
/// ```
pub fn sanitize_markdown(input: &str) -> String {
    input
        .lines()
        .map(|line| {
            let line = SMART_PUNCTUATION.replace_all(line, |caps: &regex::Captures| {
                match &caps[0] {
                    "\u{2018}" | "\u{2019}" => "'",
                    "\u{201C}" | "\u{201D}" => "\"",
                    _ => "-",
                }
            });
            WHITESPACE.replace_all(line.trim(), " ").to_string()
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Sanitize text destined for a Python docstring.
///
/// Every quote is escaped, so the text can neither close the docstring nor
/// run into its closing quotes.
pub fn sanitize_docstring(input: &str) -> String {
    sanitize_markdown(input)
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
}

/// Sanitize text destined for a `/** ... */` block comment.
pub fn sanitize_block_comment(input: &str) -> String {
    sanitize_markdown(input).replace("*/", "*\\/")
}
