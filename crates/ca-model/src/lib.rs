mod error;
pub use error::{ModelError, ModelResult};

mod ids;
pub use ids::{RemoteJobId, SubmissionId};

mod params;
pub use params::{MappedParameters, ParamValue, ParsedParameters};

mod state;
pub use state::JobState;

mod submission;
pub use submission::{
    ActiveSubmission, JobScriptFiles, PendingRecord, PendingSubmission, SubmissionOutcome,
};

pub mod wire;
