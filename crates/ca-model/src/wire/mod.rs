//! Payloads exchanged with the resource manager and the job-management service.
mod report;
pub use report::StatusUpdate;

mod slurm;
pub use slurm::{
    JobProperties, JobSubmission, JobsResponse, OneOrMany, RemoteError, RemoteJob, SubmitResponse,
};
