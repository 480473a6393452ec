use std::sync::Arc;

use ca_model::{MappedParameters, ParsedParameters};
use tracing::{debug, instrument};

use crate::{DirectiveParser, DirectiveResult, NamespaceMapper, ParameterRegistry};

/// Immutable parser/mapper pair built once from a registry.
///
/// Cheap to share behind an `Arc`; holds no per-call state.
#[derive(Debug, Clone)]
pub struct Directives {
    registry: Arc<ParameterRegistry>,
    parser: DirectiveParser,
    mapper: NamespaceMapper,
}

impl Directives {
    /// Builds the pair for the built-in `#SBATCH` table.
    pub fn sbatch() -> DirectiveResult<Self> {
        Ok(Self::new(ParameterRegistry::sbatch()?))
    }

    pub fn new(registry: ParameterRegistry) -> Self {
        let registry = Arc::new(registry);
        let mapper = NamespaceMapper::new(&registry);
        let parser = DirectiveParser::new(Arc::clone(&registry));
        Self {
            registry,
            parser,
            mapper,
        }
    }

    pub fn registry(&self) -> &ParameterRegistry {
        &self.registry
    }

    pub fn parser(&self) -> &DirectiveParser {
        &self.parser
    }

    pub fn mapper(&self) -> &NamespaceMapper {
        &self.mapper
    }

    /// Parses the directives of `script` keyed by external name.
    pub fn parse(&self, script: &str) -> DirectiveResult<ParsedParameters> {
        self.parser.parse(script)
    }

    /// Effective wire parameters of `script`.
    ///
    /// `defaults` are keyed by wire field name; every parameter derived from the
    /// script overrides the default of the same field.
    #[instrument(level = "debug", skip(self, script, defaults), fields(defaults = defaults.len()))]
    pub fn job_parameters(
        &self,
        script: &str,
        defaults: &MappedParameters,
    ) -> DirectiveResult<MappedParameters> {
        let parsed = self.parser.parse(script)?;
        let mapped = self.mapper.map_to_wire(&parsed)?;
        debug!(directives = parsed.len(), forwarded = mapped.len(), "script parameters mapped");
        Ok(defaults.merged(&mapped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DirectiveError;
    use ca_model::ParamValue;

    const SCRIPT: &str = "#!/bin/bash
#SBATCH --job-name=custom
#SBATCH -n 4 # four tasks
#SBATCH --verbose
echo done
";

    #[test]
    fn script_overrides_defaults() {
        let directives = Directives::sbatch().unwrap();
        let mut defaults = MappedParameters::new();
        defaults.insert("name", "default").insert("partition", "debug");

        let params = directives.job_parameters(SCRIPT, &defaults).unwrap();

        assert_eq!(params.get("name"), Some(&ParamValue::from("custom")));
        assert_eq!(params.get("tasks"), Some(&ParamValue::from("4")));
        assert_eq!(params.get("partition"), Some(&ParamValue::from("debug")));
        assert!(params.get("verbose").is_none());
    }

    #[test]
    fn defaults_survive_when_script_is_silent() {
        let directives = Directives::sbatch().unwrap();
        let mut defaults = MappedParameters::new();
        defaults.insert("name", "default");

        let params = directives
            .job_parameters("#!/bin/bash\necho hi\n", &defaults)
            .unwrap();
        assert_eq!(params, defaults);
    }

    #[test]
    fn no_kill_disables_kill_on_node_fail() {
        let directives = Directives::sbatch().unwrap();
        let mut defaults = MappedParameters::new();
        defaults.insert("name", "x");

        for script in ["#SBATCH --no-kill\n", "#SBATCH -k\n"] {
            let params = directives.job_parameters(script, &defaults).unwrap();
            assert_eq!(
                params.get("kill_on_node_fail"),
                Some(&ParamValue::Switch(false)),
                "{script}"
            );
        }

        let params = directives
            .job_parameters("#SBATCH --kill-on-invalid-dep=no\n", &defaults)
            .unwrap();
        assert_eq!(
            params.get("kill_on_invalid_dependency"),
            Some(&ParamValue::Switch(false))
        );
    }

    #[test]
    fn bad_directive_fails_whole_script() {
        let directives = Directives::sbatch().unwrap();
        let script = "#SBATCH --job-name=ok\n#SBATCH --frobnicate\n";

        let err = directives
            .job_parameters(script, &MappedParameters::new())
            .unwrap_err();
        assert!(err.is_parse());
        assert!(matches!(err, DirectiveError::Unrecognized(_)));
    }
}
