//! Extraction of operation signatures from Sphinx-style API reference pages
//!
//! Pages are scanned with regular expressions rather than a DOM: each
//! `<dl class="py function">` block is one candidate operation. Anything the
//! patterns cannot make sense of is reported as skipped, never as an error.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::classify::categorize;
use crate::model::{OperationSpec, ParamSpec, ParamType};

static FUNCTION_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<dl class="py function">"#).expect("function block pattern is valid")
});

static SIGNATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<dt\b([^>]*\bclass="sig[^"]*"[^>]*)>(.*?)</dt>"#)
        .expect("signature pattern is valid")
});

static ID_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bid="([^"]+)""#).expect("id pattern is valid"));

static SIG_PRENAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<span class="sig-prename[^"]*">(.*?)<span class="sig-name"#)
        .expect("prename pattern is valid")
});

static SIG_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<span class="sig-name[^"]*">(.*?)(?:<span class="sig-paren|$)"#)
        .expect("name pattern is valid")
});

static SIG_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<em class="sig-param">(.*?)</em>"#).expect("sig param pattern is valid")
});

static PARAGRAPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<p>(.*?)</p>").expect("paragraph pattern is valid"));

static PARAMETERS_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<dt class="field-[a-z]+">\s*Parameters.*?</dt>\s*<dd[^>]*>(.*?)</dd>"#)
        .expect("parameters field pattern is valid")
});

static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<li>(.*?)</li>").expect("list item pattern is valid"));

static STRONG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<strong>(.*?)</strong>(.*)").expect("strong pattern is valid")
});

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("tag pattern is valid"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(.*?)\]").expect("bracket pattern is valid"));

static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'([^']+)'").expect("quoted pattern is valid"));

/// Result of scanning one page
#[derive(Debug, Default)]
pub struct PageParse {
    pub operations: Vec<OperationSpec>,
    /// Blocks without a usable signature
    pub skipped_blocks: usize,
}

/// Extract every operation defined on a page.
#[must_use]
pub fn parse_page(html: &str) -> PageParse {
    let starts: Vec<usize> = FUNCTION_BLOCK.find_iter(html).map(|m| m.start()).collect();
    let mut result = PageParse::default();

    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(html.len());
        match parse_block(&html[start..end]) {
            Some(op) => result.operations.push(op),
            None => result.skipped_blocks += 1,
        }
    }

    result
}

fn parse_block(block: &str) -> Option<OperationSpec> {
    let sig = SIGNATURE.captures(block)?;
    let attrs = sig.get(1).map_or("", |m| m.as_str());
    let sig_body = sig.get(2).map_or("", |m| m.as_str());
    let after_sig = &block[sig.get(0).map_or(block.len(), |m| m.end())..];

    let name = signature_name(attrs, sig_body)?;
    let defaults = signature_defaults(sig_body);
    let description = first_paragraph(after_sig);
    let parameters = parameter_list(after_sig, &defaults);
    let categories = categorize(&name, &description);

    Some(OperationSpec {
        name,
        parameters,
        description,
        categories,
    })
}

fn signature_name(attrs: &str, sig_body: &str) -> Option<String> {
    if let Some(id) = ID_ATTR.captures(attrs).and_then(|c| c.get(1)) {
        let id = id.as_str().trim();
        if !id.is_empty() {
            return Some(id.to_string());
        }
    }

    let prename = SIG_PRENAME
        .captures(sig_body)
        .and_then(|c| c.get(1))
        .map(|m| text_of(m.as_str()))?;
    let name = SIG_NAME
        .captures(sig_body)
        .and_then(|c| c.get(1))
        .map(|m| text_of(m.as_str()))?;
    if name.is_empty() {
        return None;
    }
    Some(format!("{prename}{name}").replace(' ', ""))
}

/// `name=value` pairs from the rendered signature
fn signature_defaults(sig_body: &str) -> HashMap<String, String> {
    SIG_PARAM
        .captures_iter(sig_body)
        .filter_map(|c| {
            let text = text_of(c.get(1)?.as_str());
            let (name, value) = text.split_once('=')?;
            Some((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

fn first_paragraph(body: &str) -> String {
    let head = body.split("<dl class=\"field-list").next().unwrap_or(body);
    PARAGRAPH
        .captures_iter(head)
        .filter_map(|c| c.get(1))
        .map(|m| text_of(m.as_str()))
        .find(|t| !t.is_empty())
        .unwrap_or_default()
}

fn parameter_list(body: &str, defaults: &HashMap<String, String>) -> Vec<ParamSpec> {
    let Some(field) = PARAMETERS_FIELD.captures(body).and_then(|c| c.get(1)) else {
        return Vec::new();
    };
    let field = field.as_str();

    let items: Vec<&str> = LIST_ITEM
        .captures_iter(field)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();

    // A single parameter is rendered without a list
    let items = if items.is_empty() { vec![field] } else { items };

    items
        .into_iter()
        .filter_map(|item| parse_parameter(item, defaults))
        .collect()
}

fn parse_parameter(item: &str, defaults: &HashMap<String, String>) -> Option<ParamSpec> {
    let caps = STRONG.captures(item)?;
    let name = text_of(caps.get(1)?.as_str());
    if name.is_empty() {
        return None;
    }

    let rest = text_of(caps.get(2).map_or("", |m| m.as_str()));
    let type_text = rest
        .split(['\u{2013}', '\u{2014}'])
        .next()
        .unwrap_or("")
        .trim();
    let type_text = type_text
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .unwrap_or(type_text);

    let info = TypeInfo::parse(type_text);
    let default = defaults.get(&name).cloned();
    let required = !info.optional && default.is_none();

    Some(ParamSpec {
        name,
        param_type: info.param_type,
        required,
        default,
        constraints: info.constraints,
        enum_values: info.enum_values,
    })
}

/// What the type text of one parameter says
#[derive(Debug, PartialEq)]
struct TypeInfo {
    param_type: ParamType,
    constraints: Option<String>,
    optional: bool,
    enum_values: Option<Vec<String>>,
}

impl TypeInfo {
    fn parse(type_text: &str) -> Self {
        let optional = type_text.contains("(optional)");
        let text = type_text.replace("(optional)", "");
        let text = text.trim().trim_end_matches(',').trim();

        // Only the part before any bracketed constraint names the type
        let head = text.split('[').next().unwrap_or(text);
        let param_type = [
            ("float", ParamType::Float),
            ("int", ParamType::Int),
            ("bool", ParamType::Boolean),
            ("str", ParamType::String),
            ("enum", ParamType::Enum),
            ("array", ParamType::Array),
        ]
        .into_iter()
        .find(|(word, _)| head.contains(word))
        .map_or(ParamType::Unknown, |(_, t)| t);

        let constraints = BRACKETED
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());

        let enum_values = (param_type == ParamType::Enum)
            .then(|| {
                QUOTED
                    .captures_iter(text)
                    .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
                    .collect::<Vec<_>>()
            })
            .filter(|values| !values.is_empty());

        Self {
            param_type,
            constraints,
            optional,
            enum_values,
        }
    }
}

/// Visible text of an HTML fragment: tags removed, entities decoded,
/// whitespace collapsed
fn text_of(fragment: &str) -> String {
    let stripped = TAG.replace_all(fragment, "");
    let decoded = stripped
        .replace("&#8211;", "\u{2013}")
        .replace("&#8212;", "\u{2014}")
        .replace("&#8216;", "'")
        .replace("&#8217;", "'")
        .replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");
    WHITESPACE.replace_all(&decoded, " ").trim().to_string()
}
