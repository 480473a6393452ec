use std::collections::HashMap;

use tracing::trace;

use crate::{DirectiveError, DirectiveResult, SBATCH_PARAMETERS};

/// How the value of a directive is read from the token stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Switch without a value; writes `value` when present.
    Flag { value: bool },
    /// Exactly one value, kept verbatim as text.
    Str,
    /// Exactly one value, restricted to the listed choices.
    Choice(&'static [&'static str]),
    /// Exactly one value, `yes` or `no`, read as a boolean.
    YesNo,
    /// Zero or one value; `bare` is used when the value is omitted.
    OptionalStr { bare: &'static str },
    /// Switch that writes `value` into the parameter registered as `target`.
    Alias {
        target: &'static str,
        value: &'static str,
    },
}

impl ValueKind {
    fn describe(&self) -> &'static str {
        match self {
            ValueKind::Flag { .. } => "flag",
            ValueKind::Str => "string",
            ValueKind::Choice(_) => "choice",
            ValueKind::YesNo => "yes/no",
            ValueKind::OptionalStr { .. } => "optional string",
            ValueKind::Alias { .. } => "alias",
        }
    }
}

/// One supported directive.
///
/// `long` is the option name without leading dashes (`job-name`); the external
/// parameter name is derived from it by replacing dashes with underscores
/// (`job_name`). `internal` is the resource-manager field name; `None` marks
/// directives that are accepted but never forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterSpec {
    pub long: &'static str,
    pub short: Option<char>,
    pub internal: Option<&'static str>,
    pub kind: ValueKind,
}

impl ParameterSpec {
    pub const fn new(long: &'static str, kind: ValueKind) -> Self {
        Self {
            long,
            short: None,
            internal: None,
            kind,
        }
    }

    pub const fn flag(long: &'static str) -> Self {
        Self::new(long, ValueKind::Flag { value: true })
    }

    /// Switch that turns a resource-manager setting off, e.g. `--no-kill`.
    pub const fn negated(long: &'static str) -> Self {
        Self::new(long, ValueKind::Flag { value: false })
    }

    pub const fn yes_no(long: &'static str) -> Self {
        Self::new(long, ValueKind::YesNo)
    }

    pub const fn string(long: &'static str) -> Self {
        Self::new(long, ValueKind::Str)
    }

    pub const fn choice(long: &'static str, choices: &'static [&'static str]) -> Self {
        Self::new(long, ValueKind::Choice(choices))
    }

    pub const fn optional(long: &'static str, bare: &'static str) -> Self {
        Self::new(long, ValueKind::OptionalStr { bare })
    }

    pub const fn alias(long: &'static str, target: &'static str, value: &'static str) -> Self {
        Self::new(long, ValueKind::Alias { target, value })
    }

    /// Single-character alias, e.g. `'J'` for `-J`.
    pub const fn short(mut self, c: char) -> Self {
        self.short = Some(c);
        self
    }

    /// Resource-manager field this directive is forwarded as.
    pub const fn maps_to(mut self, internal: &'static str) -> Self {
        self.internal = Some(internal);
        self
    }
}

/// A validated registry entry with its derived names.
#[derive(Debug, Clone)]
pub struct RegisteredParameter {
    spec: ParameterSpec,
    external_name: String,
    long_flag: String,
    short_flag: Option<String>,
}

impl RegisteredParameter {
    fn new(spec: ParameterSpec) -> Self {
        Self {
            external_name: spec.long.replace('-', "_"),
            long_flag: format!("--{}", spec.long),
            short_flag: spec.short.map(|c| format!("-{c}")),
            spec,
        }
    }

    pub fn spec(&self) -> &ParameterSpec {
        &self.spec
    }

    /// Key used in parsed parameters (`job_name`).
    pub fn external_name(&self) -> &str {
        &self.external_name
    }

    /// Long option as written in scripts (`--job-name`).
    pub fn long_flag(&self) -> &str {
        &self.long_flag
    }

    /// Short option as written in scripts (`-J`).
    pub fn short_flag(&self) -> Option<&str> {
        self.short_flag.as_deref()
    }

    pub fn internal_name(&self) -> Option<&'static str> {
        self.spec.internal
    }

    pub fn kind(&self) -> ValueKind {
        self.spec.kind
    }
}

/// Immutable, validated set of supported directives.
///
/// Long names, short aliases, external names and internal names are each
/// unique across the registry; this is checked once in [`ParameterRegistry::build`].
#[derive(Debug, Clone)]
pub struct ParameterRegistry {
    entries: Vec<RegisteredParameter>,
    by_flag: HashMap<String, usize>,
    by_external: HashMap<String, usize>,
    by_internal: HashMap<&'static str, usize>,
}

impl ParameterRegistry {
    /// Registry of all supported `#SBATCH` directives.
    pub fn sbatch() -> DirectiveResult<Self> {
        Self::build(SBATCH_PARAMETERS)
    }

    /// Validates `specs` and builds the lookup tables.
    pub fn build(specs: &[ParameterSpec]) -> DirectiveResult<Self> {
        let mut registry = Self {
            entries: Vec::with_capacity(specs.len()),
            by_flag: HashMap::new(),
            by_external: HashMap::new(),
            by_internal: HashMap::new(),
        };

        for spec in specs {
            validate_long_name(spec.long)?;
            let entry = RegisteredParameter::new(*spec);
            let idx = registry.entries.len();

            insert_unique(&mut registry.by_flag, entry.long_flag.clone(), idx, "option")?;
            if let Some(short) = &entry.short_flag {
                if !spec.short.is_some_and(|c| c.is_ascii_alphanumeric()) {
                    return Err(DirectiveError::Registry(format!(
                        "short alias {short} of --{} must be alphanumeric",
                        spec.long
                    )));
                }
                insert_unique(&mut registry.by_flag, short.clone(), idx, "short alias")?;
            }
            insert_unique(
                &mut registry.by_external,
                entry.external_name.clone(),
                idx,
                "external name",
            )?;
            if let Some(internal) = spec.internal {
                if internal.is_empty() {
                    return Err(DirectiveError::Registry(format!(
                        "--{} has an empty internal name",
                        spec.long
                    )));
                }
                insert_unique(&mut registry.by_internal, internal, idx, "internal name")?;
            }
            registry.entries.push(entry);
        }

        registry.validate_aliases()?;
        trace!(entries = registry.entries.len(), "parameter registry built");
        Ok(registry)
    }

    /// Alias targets must exist, accept a text value and must not be aliases themselves.
    fn validate_aliases(&self) -> DirectiveResult<()> {
        for entry in &self.entries {
            let ValueKind::Alias { target, .. } = entry.spec.kind else {
                continue;
            };
            if entry.spec.internal.is_some() {
                return Err(DirectiveError::Registry(format!(
                    "alias {} must not declare its own internal name",
                    entry.long_flag
                )));
            }
            let target_entry = self
                .by_external(&target.replace('-', "_"))
                .ok_or_else(|| {
                    DirectiveError::Registry(format!(
                        "alias {} targets unknown option --{target}",
                        entry.long_flag
                    ))
                })?;
            match target_entry.spec.kind {
                ValueKind::Str | ValueKind::OptionalStr { .. } => {}
                other => {
                    return Err(DirectiveError::Registry(format!(
                        "alias {} targets --{target} of kind {}",
                        entry.long_flag,
                        other.describe()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Resolves `--long` or `-s` exactly.
    pub fn by_flag(&self, flag: &str) -> Option<&RegisteredParameter> {
        self.by_flag.get(flag).map(|&i| &self.entries[i])
    }

    pub fn by_external(&self, name: &str) -> Option<&RegisteredParameter> {
        self.by_external.get(name).map(|&i| &self.entries[i])
    }

    pub fn by_internal(&self, name: &str) -> Option<&RegisteredParameter> {
        self.by_internal.get(name).map(|&i| &self.entries[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredParameter> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn validate_long_name(long: &str) -> DirectiveResult<()> {
    let valid = !long.is_empty()
        && !long.starts_with('-')
        && !long.ends_with('-')
        && long.chars().all(|c| c.is_ascii_lowercase() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(DirectiveError::Registry(format!(
            "invalid long option name: {long:?}"
        )))
    }
}

fn insert_unique<K>(
    map: &mut HashMap<K, usize>,
    key: K,
    idx: usize,
    what: &str,
) -> DirectiveResult<()>
where
    K: std::hash::Hash + Eq + std::fmt::Display,
{
    if map.contains_key(&key) {
        return Err(DirectiveError::Registry(format!("duplicate {what}: {key}")));
    }
    map.insert(key, idx);
    Ok(())
}
