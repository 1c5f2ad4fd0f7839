//! Route template compiler.
//!
//! Turns `/produto/{slug}/{params*}` into an anchored regex plus the ordered list
//! of placeholder names. The order is the index used to pair capture groups with
//! names after a match.

use crate::error::ConfigError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Capture used for `{name}`: exactly one non-empty segment.
const SINGLE_SEGMENT: &str = "([^/]+)";
/// Capture used for `{name*}`: one or more remaining segments, greedy.
const MULTI_SEGMENT: &str = "(.+)";

/// A placeholder name as declared in a template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParamName {
    name: String,
    multi: bool,
}

impl ParamName {
    /// Name without the trailing `*`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `true` for `{name*}` placeholders.
    #[must_use]
    pub fn is_multi(&self) -> bool {
        self.multi
    }
}

impl fmt::Display for ParamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.multi {
            write!(f, "{}*", self.name)
        } else {
            f.write_str(&self.name)
        }
    }
}

/// A template compiled into a matchable form.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    regex: Regex,
    params: Vec<ParamName>,
}

impl CompiledPattern {
    #[must_use]
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Regex source, e.g. `^/user/([^/]+)$`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Placeholder names in textual order.
    #[must_use]
    pub fn params(&self) -> &[ParamName] {
        &self.params
    }
}

/// One lexical piece of a template.
#[derive(Debug, PartialEq, Eq)]
enum Token<'a> {
    Literal(&'a str),
    Param(ParamName),
}

/// `true` when the template holds no placeholder and can be looked up verbatim.
#[must_use]
pub fn is_static(template: &str) -> bool {
    !template.contains('{')
}

/// Check a template without building its regex.
///
/// Registration calls this so a malformed template is reported to the code that
/// registered it, long before the table is compiled.
pub fn validate_template(template: &str) -> Result<(), ConfigError> {
    tokenize(template).map(|_| ())
}

/// Compile a template into an anchored regex and its ordered parameter names.
///
/// ```
/// use switchyard::router::compile_pattern;
///
/// let compiled = compile_pattern("/produto/{slug}/{params*}").unwrap();
/// assert_eq!(compiled.as_str(), "^/produto/([^/]+)/(.+)$");
/// assert!(compiled.regex().is_match("/produto/shoes/red/large"));
/// ```
pub fn compile_pattern(template: &str) -> Result<CompiledPattern, ConfigError> {
    let tokens = tokenize(template)?;

    let mut source = String::with_capacity(template.len() + 16);
    source.push('^');
    let mut params = Vec::with_capacity(tokens.len() / 2);

    for token in tokens {
        match token {
            Token::Literal(text) => source.push_str(&regex::escape(text)),
            Token::Param(param) => {
                source.push_str(if param.multi {
                    MULTI_SEGMENT
                } else {
                    SINGLE_SEGMENT
                });
                params.push(param);
            }
        }
    }
    source.push('$');

    let regex = Regex::new(&source).map_err(|e| invalid(template, e.to_string()))?;
    Ok(CompiledPattern { regex, params })
}

fn tokenize(template: &str) -> Result<Vec<Token<'_>>, ConfigError> {
    if template.trim().is_empty() {
        return Err(invalid(template, "template is empty"));
    }

    let mut tokens = Vec::new();
    let mut rest = template;

    while !rest.is_empty() {
        let open = rest.find('{');
        let close = rest.find('}');

        match (open, close) {
            (None, None) => {
                tokens.push(Token::Literal(rest));
                break;
            }
            (None, Some(_)) => return Err(invalid(template, "unmatched '}'")),
            (Some(o), Some(c)) if c < o => return Err(invalid(template, "unmatched '}'")),
            (Some(_), None) => return Err(invalid(template, "unmatched '{'")),
            (Some(o), Some(c)) => {
                let body = &rest[o + 1..c];
                if body.contains('{') {
                    return Err(invalid(template, "nested '{' inside placeholder"));
                }
                if o > 0 {
                    tokens.push(Token::Literal(&rest[..o]));
                }
                tokens.push(Token::Param(parse_param(template, body)?));
                rest = &rest[c + 1..];
            }
        }
    }

    // A greedy capture anywhere but the tail would swallow the segments meant
    // for the placeholders after it.
    let last_param = tokens
        .iter()
        .rposition(|t| matches!(t, Token::Param(_)));
    let multi_elsewhere = tokens.iter().enumerate().any(|(i, t)| {
        matches!(t, Token::Param(p) if p.multi) && (Some(i) != last_param || i + 1 != tokens.len())
    });
    if multi_elsewhere {
        return Err(invalid(
            template,
            "a '{name*}' placeholder must be the final path segment",
        ));
    }

    Ok(tokens)
}

fn parse_param(template: &str, body: &str) -> Result<ParamName, ConfigError> {
    let (name, multi) = match body.strip_suffix('*') {
        Some(name) => (name, true),
        None => (body, false),
    };

    let mut chars = name.chars();
    let valid_head = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_tail = chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid_head || !valid_tail {
        return Err(invalid(
            template,
            format!("'{{{body}}}' is not a valid placeholder name"),
        ));
    }

    Ok(ParamName {
        name: name.to_string(),
        multi,
    })
}

fn invalid(template: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidPattern {
        template: template.to_string(),
        reason: reason.into(),
    }
}
