//! Markdown clean-up applied to every specialist draft.
//!
//! Models regularly wrap answers in code fences, quote amounts in backticks,
//! drop the `$` from `R$` or emit half of a `**` pair. `normalize_markup`
//! rewrites those into one canonical form:
//!
//! - money: `**R$ 1.000,00**`
//! - percentages: `**15%**`
//! - citations: `**Lei 8.245/91**`, `**Art. 5º**`
//!
//! The pass is idempotent. It walks each pattern's matches left to right and
//! decides from the `**` parity of the text already emitted on the current
//! line whether the match is already inside emphasis, so existing bold spans
//! are never doubled.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref INLINE_CODE_NUMBER: Regex =
        Regex::new(r"`((?:R\$?\s?)?\d[\d.,]*(?:\s?%)?)`").unwrap();
    static ref REPEATED_SPACES: Regex = Regex::new(r"(\S) {2,}").unwrap();
    static ref CURRENCY: Regex =
        Regex::new(r"\bR(?:\$[ \u{a0}]?| )(\d(?:[\d.,]*\d)?)").unwrap();
    static ref PERCENT: Regex = Regex::new(r"\b\d+(?:[.,]\d+)* ?%").unwrap();
    static ref LAW: Regex =
        Regex::new(r"(?i)\blei (?:n[º°o.]* ?)?\d(?:[\d./-]*\d)?").unwrap();
    static ref ARTICLE: Regex = Regex::new(r"(?i)\b(?:art\.?|artigo) \d+[º°ª]?").unwrap();
}

/// Normalize currency, percentage and citation markup in a model answer.
pub fn normalize_markup(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    let text = text.replace("```markdown", "").replace("```", "");
    let text = INLINE_CODE_NUMBER.replace_all(&text, "$1");
    let text = text.replace("\\$", "$");
    let text = REPEATED_SPACES.replace_all(&text, "$1 ");

    let text = emphasize(&text, &CURRENCY, |caps| format!("R$ {}", &caps[1]));
    let text = emphasize(&text, &PERCENT, |caps| caps[0].to_string());
    let text = emphasize(&text, &LAW, |caps| caps[0].to_string());
    let text = emphasize(&text, &ARTICLE, |caps| caps[0].to_string());

    text.trim().to_string()
}

/// Escape `$` as `\$` for renderers that treat it as a math delimiter.
///
/// Idempotent: already escaped glyphs are left alone.
pub fn escape_currency_glyph(text: &str) -> String {
    text.replace("\\$", "$").replace('$', "\\$")
}

/// Currency and percentage tokens that are not inside `**` emphasis.
///
/// Empty for any output of `normalize_markup` outside of URLs.
pub fn unemphasized_amounts(text: &str) -> Vec<String> {
    let mut found = Vec::new();
    for re in [&*CURRENCY, &*PERCENT] {
        for m in re.find_iter(text) {
            let line_start = text[..m.start()].rfind('\n').map(|i| i + 1).unwrap_or(0);
            if !odd_emphasis(&text[line_start..m.start()]) && !inside_url(text, m.start()) {
                found.push(m.as_str().to_string());
            }
        }
    }
    found
}

fn emphasize<F>(source: &str, re: &Regex, render: F) -> String
where
    F: Fn(&Captures) -> String,
{
    let mut out = String::with_capacity(source.len() + 32);
    let mut last = 0;

    for caps in re.captures_iter(source) {
        let Some(m) = caps.get(0) else { continue };
        out.push_str(&source[last..m.start()]);
        last = m.end();

        if inside_url(source, m.start()) {
            out.push_str(m.as_str());
            continue;
        }

        let token = render(&caps);
        let line_start = out.rfind('\n').map(|i| i + 1).unwrap_or(0);

        if odd_emphasis(&out[line_start..]) {
            out.push_str(&token);
        } else if source[m.end()..].starts_with("**") {
            // dangling closer from the model, reuse it
            out.push_str("**");
            out.push_str(&token);
        } else {
            out.push_str("**");
            out.push_str(&token);
            out.push_str("**");
        }
    }

    out.push_str(&source[last..]);
    out
}

fn odd_emphasis(line_prefix: &str) -> bool {
    line_prefix.matches("**").count() % 2 == 1
}

fn inside_url(source: &str, pos: usize) -> bool {
    let token_start = source[..pos]
        .rfind(char::is_whitespace)
        .map(|i| i + 1)
        .unwrap_or(0);
    let prefix = &source[token_start..pos];
    prefix.contains("://") || prefix.contains("www.")
}
