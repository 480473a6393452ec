//! `#SBATCH` directive translation.
//!
//! - [`ParameterRegistry`] — declarative table of supported directives, validated once.
//! - [`extract`] — finds directive lines in a script and splits them into tokens.
//! - [`DirectiveParser`] — turns the token stream into [`ParsedParameters`](ca_model::ParsedParameters).
//! - [`NamespaceMapper`] — renames directive keys to resource-manager field names.
//! - [`Directives`] — the immutable parser/mapper pair used by the agent.
mod error;
pub use error::{DirectiveError, DirectiveResult};

pub mod extract;

mod registry;
pub use registry::{ParameterRegistry, ParameterSpec, RegisteredParameter, ValueKind};

mod table;
pub use table::SBATCH_PARAMETERS;

mod parser;
pub use parser::{Directive, DirectiveParser};

mod mapper;
pub use mapper::NamespaceMapper;

mod directives;
pub use directives::Directives;
