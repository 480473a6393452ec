use std::sync::Arc;

use ca_model::{ParamValue, ParsedParameters};
use tracing::trace;

use crate::{
    DirectiveError, DirectiveResult, ParameterRegistry, RegisteredParameter, ValueKind, extract,
};

/// A single recognised directive, in script order.
///
/// `raw_value` is `None` for switches and for optional-value options written
/// without a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub external_name: String,
    pub raw_value: Option<String>,
}

/// Parses directive tokens against the grammar described by a [`ParameterRegistry`].
#[derive(Debug, Clone)]
pub struct DirectiveParser {
    registry: Arc<ParameterRegistry>,
}

impl DirectiveParser {
    pub fn new(registry: Arc<ParameterRegistry>) -> Self {
        Self { registry }
    }

    /// Extracts and parses every directive in `script`.
    pub fn parse(&self, script: &str) -> DirectiveResult<ParsedParameters> {
        let tokens = extract::tokenize(script);
        self.parse_tokens(&tokens)
    }

    /// Parses a flat token stream; later directives overwrite earlier ones.
    pub fn parse_tokens(&self, tokens: &[String]) -> DirectiveResult<ParsedParameters> {
        let mut params = ParsedParameters::new();
        for directive in self.directives(tokens)? {
            let value = self.coerce(&directive)?;
            params.insert(directive.external_name, value);
        }
        Ok(params)
    }

    /// Consumes `tokens` greedily and returns the directives in order.
    ///
    /// Every token that is neither a known option nor the value of one is
    /// collected; if any are found the whole stream is rejected.
    pub fn directives(&self, tokens: &[String]) -> DirectiveResult<Vec<Directive>> {
        let mut out = Vec::new();
        let mut unknown = Vec::new();
        let mut it = tokens.iter().peekable();

        while let Some(token) = it.next() {
            let Some((entry, inline)) = self.resolve(token) else {
                unknown.push(token.clone());
                continue;
            };

            let directive = match entry.kind() {
                ValueKind::Flag { .. } => Directive {
                    external_name: entry.external_name().to_string(),
                    raw_value: None,
                },
                ValueKind::Alias { target, value } => Directive {
                    external_name: target.replace('-', "_"),
                    raw_value: Some(value.to_string()),
                },
                ValueKind::Str | ValueKind::Choice(_) | ValueKind::YesNo => {
                    let value = match inline {
                        Some(v) => v,
                        None => match it.peek() {
                            Some(next) if !self.is_option(next) => {
                                it.next().map(|s| s.to_string()).unwrap_or_default()
                            }
                            _ => {
                                return Err(DirectiveError::MissingValue {
                                    flag: token.clone(),
                                });
                            }
                        },
                    };
                    Directive {
                        external_name: entry.external_name().to_string(),
                        raw_value: Some(value),
                    }
                }
                ValueKind::OptionalStr { .. } => {
                    let value = match inline {
                        Some(v) => Some(v),
                        None => match it.peek() {
                            Some(next) if !next.starts_with('-') => it.next().cloned(),
                            _ => None,
                        },
                    };
                    Directive {
                        external_name: entry.external_name().to_string(),
                        raw_value: value,
                    }
                }
            };
            trace!(name = %directive.external_name, value = ?directive.raw_value, "directive");
            out.push(directive);
        }

        if !unknown.is_empty() {
            return Err(DirectiveError::Unrecognized(unknown));
        }
        Ok(out)
    }

    /// Resolves a token to a registry entry and an optional attached value.
    ///
    /// Besides exact `--long` / `-s` matches, a short option taking a value may
    /// carry it directly (`-Jname`).
    fn resolve(&self, token: &str) -> Option<(&RegisteredParameter, Option<String>)> {
        if let Some(entry) = self.registry.by_flag(token) {
            return Some((entry, None));
        }
        if token.starts_with("--") || !token.starts_with('-') {
            return None;
        }
        let split = token.char_indices().nth(2).map(|(i, _)| i)?;
        let (flag, rest) = token.split_at(split);
        let entry = self.registry.by_flag(flag)?;
        match entry.kind() {
            ValueKind::Str
            | ValueKind::Choice(_)
            | ValueKind::YesNo
            | ValueKind::OptionalStr { .. } => Some((entry, Some(rest.to_string()))),
            _ => None,
        }
    }

    fn is_option(&self, token: &str) -> bool {
        self.resolve(token).is_some()
    }

    fn coerce(&self, directive: &Directive) -> DirectiveResult<ParamValue> {
        let entry = self
            .registry
            .by_external(&directive.external_name)
            .ok_or_else(|| DirectiveError::Mapping(directive.external_name.clone()))?;

        let value = match (entry.kind(), directive.raw_value.as_deref()) {
            (ValueKind::Flag { value }, _) => ParamValue::Switch(value),
            (ValueKind::YesNo, Some(v)) => match v.to_ascii_lowercase().as_str() {
                "yes" => ParamValue::Switch(true),
                "no" => ParamValue::Switch(false),
                _ => {
                    return Err(DirectiveError::InvalidChoice {
                        flag: entry.long_flag().to_string(),
                        value: v.to_string(),
                        expected: vec!["yes", "no"],
                    });
                }
            },
            (ValueKind::OptionalStr { bare }, None) => ParamValue::from(bare),
            (ValueKind::Choice(choices), Some(v)) => {
                if !choices.contains(&v) {
                    return Err(DirectiveError::InvalidChoice {
                        flag: entry.long_flag().to_string(),
                        value: v.to_string(),
                        expected: choices.to_vec(),
                    });
                }
                ParamValue::from(v)
            }
            (_, Some(v)) => ParamValue::from(v),
            (_, None) => {
                return Err(DirectiveError::MissingValue {
                    flag: entry.long_flag().to_string(),
                });
            }
        };
        Ok(value)
    }
}
