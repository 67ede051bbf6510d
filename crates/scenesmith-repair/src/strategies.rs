//! Individual text transforms applied by the repair chain
//!
//! Each transform returns `None` when it does not apply to the input, so the
//! chain can tell "nothing to do" apart from "tried and still not JSON".

use regex::Regex;
use std::sync::LazyLock;

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)```").expect("fenced block pattern is valid")
});

/// Content of the first markdown code fence. An unterminated fence loses its
/// opening line.
pub(crate) fn strip_code_fences(text: &str) -> Option<String> {
    if let Some(inner) = FENCED_BLOCK.captures(text).and_then(|c| c.get(1)) {
        return Some(inner.as_str().trim().to_string());
    }

    let rest = text.trim_start().strip_prefix("```")?;
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    Some(body.trim().to_string())
}

/// The first balanced `{...}` or `[...]` region, honoring quoted strings.
pub(crate) fn balanced_region(text: &str) -> Option<String> {
    let start = text.find(['{', '['])?;
    let mut stack: Vec<char> = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' => quote = Some(c),
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.pop() != Some(c) {
                    return None;
                }
                if stack.is_empty() {
                    let end = start + offset + c.len_utf8();
                    return Some(text[start..end].to_string());
                }
            }
            _ => {}
        }
    }

    None
}

/// Rewrite Python-flavoured pseudo-JSON into JSON.
///
/// Outside double-quoted strings: smart quotes become ASCII quotes,
/// single-quoted strings become double-quoted, `None`/`True`/`False` become
/// `null`/`true`/`false`, tuple parentheses become brackets, and trailing
/// commas before a closing bracket are removed.
pub(crate) fn coerce_quotes(text: &str) -> Option<String> {
    let chars: Vec<char> = text
        .chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            other => other,
        })
        .collect();

    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' => {
                out.push('"');
                i += 1;
                while i < chars.len() {
                    let d = chars[i];
                    out.push(d);
                    i += 1;
                    if d == '\\' && i < chars.len() {
                        out.push(chars[i]);
                        i += 1;
                    } else if d == '"' {
                        break;
                    }
                }
                continue;
            }
            '\'' => {
                out.push('"');
                i += 1;
                while i < chars.len() {
                    let d = chars[i];
                    i += 1;
                    match d {
                        '\\' if i < chars.len() => {
                            let e = chars[i];
                            i += 1;
                            if e == '\'' {
                                out.push('\'');
                            } else {
                                out.push('\\');
                                out.push(e);
                            }
                        }
                        '\'' => break,
                        '"' => out.push_str("\\\""),
                        _ => out.push(d),
                    }
                }
                out.push('"');
                continue;
            }
            '(' => out.push('['),
            ')' => out.push(']'),
            ',' => {
                let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if !matches!(next, Some('}' | ']' | ')')) {
                    out.push(',');
                }
            }
            c if c.is_ascii_alphabetic() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                out.push_str(match word.as_str() {
                    "None" => "null",
                    "True" => "true",
                    "False" => "false",
                    other => other,
                });
                continue;
            }
            _ => out.push(c),
        }
        i += 1;
    }

    (out != text).then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fences() {
        assert_eq!(
            strip_code_fences("Here you go:\n```json\n{\"a\": 1}\n```\nthanks").as_deref(),
            Some("{\"a\": 1}")
        );
        assert_eq!(strip_code_fences("```\n[1, 2]").as_deref(), Some("[1, 2]"));
        assert_eq!(strip_code_fences("{\"a\": 1}"), None);
    }

    #[test]
    fn test_balanced_region() {
        assert_eq!(
            balanced_region("Sure! {\"a\": {\"b\": \"}\"}} trailing").as_deref(),
            Some("{\"a\": {\"b\": \"}\"}}")
        );
        assert_eq!(balanced_region("list: [1, [2, 3]] done").as_deref(), Some("[1, [2, 3]]"));
        assert_eq!(balanced_region("{\"a\": 1"), None);
        assert_eq!(balanced_region("{\"a\": 1]"), None);
        assert_eq!(balanced_region("no json here"), None);
    }

    #[test]
    fn test_coerce_quotes() {
        assert_eq!(
            coerce_quotes("{'op': 'add_cube'}").as_deref(),
            Some("{\"op\": \"add_cube\"}")
        );
        assert_eq!(
            coerce_quotes("{'loc': (0, 0, 1), 'smooth': True, 'mat': None,}").as_deref(),
            Some("{\"loc\": [0, 0, 1], \"smooth\": true, \"mat\": null}")
        );
        assert_eq!(
            coerce_quotes("{'say': 'it\\'s \"fine\"'}").as_deref(),
            Some("{\"say\": \"it's \\\"fine\\\"\"}")
        );
        assert_eq!(
            coerce_quotes("{\u{201C}a\u{201D}: \u{2018}b\u{2019}}").as_deref(),
            Some("{\"a\": \"b\"}")
        );
    }

    #[test]
    fn test_coerce_leaves_double_quoted_content() {
        // Literals inside strings are untouched
        assert_eq!(
            coerce_quotes("{\"text\": \"None (x)\",}").as_deref(),
            Some("{\"text\": \"None (x)\"}")
        );
        assert_eq!(coerce_quotes("{\"a\": 1}"), None);
    }
}
