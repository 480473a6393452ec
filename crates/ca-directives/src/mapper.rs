use std::collections::{HashMap, HashSet};

use ca_model::{MappedParameters, ParsedParameters};
use tracing::debug;

use crate::{DirectiveError, DirectiveResult, ParameterRegistry};

/// Bijective renaming between external directive names and wire field names.
///
/// Directives registered without an internal name are known but unmapped:
/// [`NamespaceMapper::map_to_wire`] drops them. Keys the registry has never
/// heard of are a [`DirectiveError::Mapping`].
#[derive(Debug, Clone)]
pub struct NamespaceMapper {
    to_wire: HashMap<String, &'static str>,
    from_wire: HashMap<&'static str, String>,
    unmapped: HashSet<String>,
}

impl NamespaceMapper {
    pub fn new(registry: &ParameterRegistry) -> Self {
        let mut to_wire = HashMap::new();
        let mut from_wire = HashMap::new();
        let mut unmapped = HashSet::new();

        for entry in registry.iter() {
            match entry.internal_name() {
                Some(internal) => {
                    to_wire.insert(entry.external_name().to_string(), internal);
                    from_wire.insert(internal, entry.external_name().to_string());
                }
                None => {
                    unmapped.insert(entry.external_name().to_string());
                }
            }
        }
        Self {
            to_wire,
            from_wire,
            unmapped,
        }
    }

    /// Wire field name for an external name, if it is forwarded.
    pub fn wire_name(&self, external: &str) -> Option<&'static str> {
        self.to_wire.get(external).copied()
    }

    /// External name for a wire field name.
    pub fn external_name(&self, wire: &str) -> Option<&str> {
        self.from_wire.get(wire).map(String::as_str)
    }

    /// Renames every key to its wire field name; values are untouched.
    pub fn map_to_wire(&self, params: &ParsedParameters) -> DirectiveResult<MappedParameters> {
        let mut out = MappedParameters::new();
        for (key, value) in params.iter() {
            match self.to_wire.get(key) {
                Some(wire) => {
                    out.insert(*wire, value.clone());
                }
                None if self.unmapped.contains(key) => {
                    debug!(parameter = key, "dropping unmapped directive");
                }
                None => return Err(DirectiveError::Mapping(key.to_string())),
            }
        }
        Ok(out)
    }

    /// Inverse of [`NamespaceMapper::map_to_wire`].
    pub fn map_from_wire(&self, params: &MappedParameters) -> DirectiveResult<ParsedParameters> {
        let mut out = ParsedParameters::new();
        for (key, value) in params.iter() {
            let external = self
                .from_wire
                .get(key)
                .ok_or_else(|| DirectiveError::Mapping(key.to_string()))?;
            out.insert(external.clone(), value.clone());
        }
        Ok(out)
    }
}
