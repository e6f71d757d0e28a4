//! Text-node transformation: LaTeX delimiters to MathML, and custom
//! diff-style marker expansion inside code blocks.
//!
//! The transformer operates on one text node at a time. Input text is
//! HTML-escaped first, then pattern substitution runs over the escaped
//! string, and the result is spliced back into the document as literal
//! markup (a raw node the serializer emits verbatim). Raw nodes are
//! never revisited, so re-running the transformer is a no-op.

use log::warn;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::dom::Dom;
use crate::util::escape_html;

const MATHML_NS: &str = "http://www.w3.org/1998/Math/MathML";

/// Sentinel standing in for a backslash-escaped `$` during matching.
/// The regex crate has no lookbehind, so `\$` is masked out before the
/// delimiter patterns run and restored afterwards.
const ESCAPED_DOLLAR: char = '\u{e000}';

/// Ancestor tags that make a text node a math-exclusion zone.
pub const CODE_ANCESTORS: &[&str] = &["pre", "code"];

/// Display class of a matched math expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathDisplay {
    Block,
    Inline,
}

impl MathDisplay {
    fn as_attr(self) -> &'static str {
        match self {
            MathDisplay::Block => "block",
            MathDisplay::Inline => "inline",
        }
    }

    fn to_converter(self) -> latex2mathml::DisplayStyle {
        match self {
            MathDisplay::Block => latex2mathml::DisplayStyle::Block,
            MathDisplay::Inline => latex2mathml::DisplayStyle::Inline,
        }
    }
}

/// One delimiter rule: a compiled pattern and its display class.
struct MathPattern {
    regex: Regex,
    display: MathDisplay,
}

/// Delimiter rules in precedence order. Block delimiters come first so
/// `$$ ... $$` is never consumed as two adjacent inline matches. All
/// patterns are non-greedy and span newlines.
static MATH_PATTERNS: Lazy<Vec<MathPattern>> = Lazy::new(|| {
    vec![
        MathPattern {
            regex: Regex::new(r"(?s)\$\$(.+?)\$\$").unwrap(),
            display: MathDisplay::Block,
        },
        MathPattern {
            regex: Regex::new(r"(?s)\\\[(.+?)\\\]").unwrap(),
            display: MathDisplay::Block,
        },
        MathPattern {
            regex: Regex::new(r"(?s)\$(.+?)\$").unwrap(),
            display: MathDisplay::Inline,
        },
        MathPattern {
            regex: Regex::new(r"(?s)\\\((.+?)\\\)").unwrap(),
            display: MathDisplay::Inline,
        },
    ]
});

/// Structural context of the text node being transformed.
#[derive(Debug, Clone, Copy)]
pub struct TextContext {
    /// Is the node a descendant of `<pre>` or `<code>`?
    pub in_code: bool,
    /// Does the containing page reference a math-rendering script?
    pub math_enabled: bool,
}

/// Transform a single text node's content.
///
/// Returns the replacement markup, or `None` if no substitution applies.
/// Inside code/pre ancestry only custom markers are expanded; math
/// delimiters are deliberately left alone there so code samples keep
/// their literal `$` sequences.
pub fn transform_text(text: &str, ctx: &TextContext) -> Option<String> {
    let escaped = escape_html(text);

    if ctx.in_code {
        let expanded = expand_markers(&escaped);
        return (expanded != escaped).then_some(expanded);
    }

    if !ctx.math_enabled {
        return None;
    }

    let masked: String = escaped.replace("\\$", &ESCAPED_DOLLAR.to_string());
    let mut current = masked.clone();

    for pattern in MATH_PATTERNS.iter() {
        current = pattern
            .regex
            .replace_all(&current, |caps: &Captures| {
                let raw = caps[1].trim();
                let latex = raw.replace(ESCAPED_DOLLAR, "\\$");
                match latex2mathml::latex_to_mathml(&latex, pattern.display.to_converter()) {
                    Ok(mathml) => rewrap_math(&mathml, pattern.display),
                    Err(err) => {
                        warn!("failed to convert LaTeX expression {latex:?}: {err}");
                        // Keep the sentinel here; it is restored below along
                        // with the rest of the string.
                        format!("<!-- Failed to convert LaTeX: {raw} -->")
                    }
                }
            })
            .into_owned();
    }

    if current == masked {
        return None;
    }
    Some(current.replace(ESCAPED_DOLLAR, "\\$"))
}

/// Expand the four literal highlight tokens. Disjoint, non-overlapping
/// token sets, so replacement order does not matter.
fn expand_markers(text: &str) -> String {
    text.replace("[[MARK]]", "<mark class=\"add\">")
        .replace("[[/MARK]]", "</mark>")
        .replace("[[SMARK]]", "<mark class=\"del\"><strike>")
        .replace("[[/SMARK]]", "</strike></mark>")
}

/// Normalize converter output into a `<math>` element that always
/// carries the display attribute matching the delimiter class.
fn rewrap_math(converted: &str, display: MathDisplay) -> String {
    let start = converted.find('>').map(|i| i + 1).unwrap_or(0);
    let end = converted.rfind("</math>").unwrap_or(converted.len());
    format!(
        "<math xmlns=\"{}\" display=\"{}\">{}</math>",
        MATHML_NS,
        display.as_attr(),
        &converted[start..end]
    )
}

/// Walk every text node of a document depth-first and apply
/// [`transform_text`] with per-node code/pre ancestry.
///
/// Returns the number of replaced nodes.
pub fn transform_document(dom: &mut Dom, math_enabled: bool) -> usize {
    let mut replaced = 0;
    for id in dom.text_node_ids() {
        let in_code = dom.has_ancestor_in(id, CODE_ANCESTORS);
        let ctx = TextContext {
            in_code,
            math_enabled,
        };
        let Some(text) = dom.text_content(id) else {
            continue;
        };
        if let Some(markup) = transform_text(text, &ctx) {
            dom.replace_with_raw(id, markup);
            replaced += 1;
        }
    }
    replaced
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROSE_MATH: TextContext = TextContext {
        in_code: false,
        math_enabled: true,
    };
    const PROSE_PLAIN: TextContext = TextContext {
        in_code: false,
        math_enabled: false,
    };
    const CODE: TextContext = TextContext {
        in_code: true,
        math_enabled: true,
    };

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(transform_text("no delimiters here", &PROSE_MATH), None);
        assert_eq!(transform_text("price is 3 dollars", &PROSE_MATH), None);
        assert_eq!(transform_text("$a$", &PROSE_PLAIN), None);
    }

    #[test]
    fn test_block_math() {
        let out = transform_text("$$a$$", &PROSE_MATH).expect("converted");
        assert!(out.starts_with("<math xmlns=\"http://www.w3.org/1998/Math/MathML\""));
        assert!(out.contains("display=\"block\""));

        // Whitespace around the expression is trimmed before conversion
        let spaced = transform_text("$$ a $$", &PROSE_MATH).expect("converted");
        assert_eq!(out, spaced);
    }

    #[test]
    fn test_bracket_delimiters() {
        let block = transform_text(r"\[ x \]", &PROSE_MATH).expect("converted");
        assert!(block.contains("display=\"block\""));

        let inline = transform_text(r"\( x \)", &PROSE_MATH).expect("converted");
        assert!(inline.contains("display=\"inline\""));
    }

    #[test]
    fn test_two_inline_matches_stay_separate() {
        let out = transform_text("first $a$ then $b$ done", &PROSE_MATH).expect("converted");
        assert_eq!(out.matches("display=\"inline\"").count(), 2);
        assert!(out.contains("first "));
        assert!(out.contains(" then "));
        assert!(out.contains(" done"));
    }

    #[test]
    fn test_block_takes_precedence_over_inline() {
        let out = transform_text("$$a$$", &PROSE_MATH).expect("converted");
        assert_eq!(out.matches("<math").count(), 1);
        assert!(out.contains("display=\"block\""));
    }

    #[test]
    fn test_escaped_dollar_does_not_delimit() {
        assert_eq!(transform_text(r"costs \$5 or \$10", &PROSE_MATH), None);

        // An escaped dollar inside a match does not terminate it: the
        // whole expression is substituted exactly once
        let out = transform_text(r"$a \$ b$", &PROSE_MATH).expect("substituted");
        let substitutions = out.matches("<math").count() + out.matches("<!-- Failed").count();
        assert_eq!(substitutions, 1);
    }

    #[test]
    fn test_match_spans_newlines() {
        let out = transform_text("$$a\n+ b$$", &PROSE_MATH).expect("converted");
        assert!(out.contains("display=\"block\""));
    }

    #[test]
    fn test_code_context_skips_math() {
        assert_eq!(transform_text("$PATH and $HOME$", &CODE), None);
    }

    #[test]
    fn test_code_context_expands_markers() {
        let out = transform_text("x [[MARK]]new[[/MARK]] y", &CODE).expect("expanded");
        assert_eq!(out, "x <mark class=\"add\">new</mark> y");

        let out = transform_text("[[SMARK]]old[[/SMARK]]", &CODE).expect("expanded");
        assert_eq!(out, "<mark class=\"del\"><strike>old</strike></mark>");
    }

    #[test]
    fn test_markers_ignored_outside_code() {
        assert_eq!(transform_text("[[MARK]]hi[[/MARK]]", &PROSE_PLAIN), None);
    }

    #[test]
    fn test_escaping_happens_before_matching() {
        let out = transform_text("a < b and $x$", &PROSE_MATH).expect("converted");
        assert!(out.starts_with("a &lt; b and "));

        let code = transform_text("if a < b { [[MARK]]ok[[/MARK]] }", &CODE).expect("expanded");
        assert!(code.contains("a &lt; b"));
        assert!(code.contains("<mark class=\"add\">ok</mark>"));
    }

    #[test]
    fn test_conversion_failure_leaves_comment() {
        let out = transform_text(r"$\frac{$", &PROSE_MATH).expect("substituted");
        assert!(out.contains("<!-- Failed to convert LaTeX:"));
    }

    #[test]
    fn test_document_transform_is_idempotent() {
        let html = "<html><body><p>sum $a$ here</p>\
                    <pre><code>[[MARK]]x[[/MARK]]</code></pre></body></html>";
        let mut dom = Dom::parse(html);

        let first = transform_document(&mut dom, true);
        assert!(first >= 2);
        let serialized = dom.serialize();
        assert!(serialized.contains("<math"));
        assert!(serialized.contains("<mark class=\"add\">x</mark>"));

        let second = transform_document(&mut dom, true);
        assert_eq!(second, 0);
        assert_eq!(dom.serialize(), serialized);
    }

    #[test]
    fn test_code_zone_applies_per_node() {
        let html = "<html><body><p>$a$</p><pre>$b$</pre></body></html>";
        let mut dom = Dom::parse(html);
        transform_document(&mut dom, true);
        let out = dom.serialize();
        assert!(out.contains("<math"));
        assert!(out.contains("<pre>$b$</pre>"));
    }
}
