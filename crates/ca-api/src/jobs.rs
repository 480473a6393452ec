use std::sync::Arc;

use async_trait::async_trait;
use ca_core::{AgentError, AgentResult, CredentialCache, JobManagementApi};
use ca_model::{
    ActiveSubmission, JobState, PendingRecord, PendingSubmission, RemoteJobId, SubmissionId,
    wire::StatusUpdate,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::{
    ApiError, ApiResult,
    http::{endpoint, expect_success, parse_base},
};

const PENDING_PATH: &str = "jobbergate/job-submissions/agent/pending";
const ACTIVE_PATH: &str = "jobbergate/job-submissions/agent/active";
const UPDATE_PATH: &str = "jobbergate/job-submissions/agent";

/// Credential-cache identity of the job-management token.
pub const CLUSTER_API_IDENTITY: &str = "cluster-api";

type ErrorKind = fn(String) -> AgentError;

/// Job-management service client.
///
/// Every request carries `Authorization: Bearer <token>` from the credential cache.
/// A `401` drops the cached token so the next request obtains a new one.
pub struct JobManagementClient {
    http: Client,
    base: Url,
    credentials: Arc<CredentialCache>,
}

impl JobManagementClient {
    pub fn new(http: Client, base_url: &str, credentials: Arc<CredentialCache>) -> ApiResult<Self> {
        Ok(Self {
            http,
            base: parse_base(base_url)?,
            credentials,
        })
    }

    /// GET `path` and decode the JSON body; failures are wrapped with `kind`.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        kind: ErrorKind,
    ) -> AgentResult<T> {
        let url = self.url(path, kind)?;
        let resp = self.send(self.http.get(url).query(query), kind).await?;
        resp.json::<T>()
            .await
            .map_err(|e| kind(ApiError::Decode(format!("{path}: {e}")).to_string()))
    }

    fn url(&self, path: &str, kind: ErrorKind) -> AgentResult<Url> {
        endpoint(&self.base, path).map_err(|e| kind(e.to_string()))
    }

    async fn send(&self, req: RequestBuilder, kind: ErrorKind) -> AgentResult<Response> {
        let token = self.credentials.acquire(CLUSTER_API_IDENTITY).await?;
        let resp = req
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| kind(ApiError::from(e).to_string()))?;
        debug!(url = %resp.url(), status = %resp.status(), "job-management response");

        if resp.status() == StatusCode::UNAUTHORIZED {
            self.credentials.invalidate(CLUSTER_API_IDENTITY).await;
        }
        expect_success(resp).await.map_err(|e| kind(e.to_string()))
    }

    async fn fetch_raw(&self, path: &str) -> AgentResult<Vec<serde_json::Value>> {
        self.get_json(path, &[], AgentError::Fetch).await
    }

    async fn update(&self, id: SubmissionId, body: &StatusUpdate) -> AgentResult<()> {
        let url = self.url(&format!("{UPDATE_PATH}/{id}"), AgentError::ApiUpdate)?;
        self.send(self.http.put(url).json(body), AgentError::ApiUpdate)
            .await?;
        Ok(())
    }
}

/// Decodes a pending record; one that fails but has an id is kept as malformed.
fn decode_pending(item: serde_json::Value) -> Option<PendingRecord> {
    let id = item
        .get("id")
        .and_then(|v| serde_json::from_value::<SubmissionId>(v.clone()).ok());
    match serde_json::from_value::<PendingSubmission>(item) {
        Ok(sub) => Some(PendingRecord::Valid(sub)),
        Err(e) => match id {
            Some(id) => {
                warn!(id = %id, error = %e, "malformed pending record");
                Some(PendingRecord::Malformed {
                    id,
                    reason: e.to_string(),
                })
            }
            None => {
                warn!(error = %e, "skipping pending record without an id");
                None
            }
        },
    }
}

/// Keeps every record that decodes; the others are logged and skipped.
fn decode_records<T: DeserializeOwned>(raw: Vec<serde_json::Value>) -> Vec<T> {
    raw.into_iter()
        .filter_map(|item| {
            let id = item.get("id").cloned();
            match serde_json::from_value(item) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(id = ?id, error = %e, "skipping malformed record");
                    None
                }
            }
        })
        .collect()
}

#[async_trait]
impl JobManagementApi for JobManagementClient {
    #[instrument(level = "debug", skip(self))]
    async fn fetch_pending(&self) -> AgentResult<Vec<PendingRecord>> {
        let raw = self.fetch_raw(PENDING_PATH).await?;
        Ok(raw.into_iter().filter_map(decode_pending).collect())
    }

    #[instrument(level = "debug", skip(self))]
    async fn fetch_active(&self) -> AgentResult<Vec<ActiveSubmission>> {
        Ok(decode_records(self.fetch_raw(ACTIVE_PATH).await?))
    }

    #[instrument(level = "debug", skip(self))]
    async fn report_submitted(
        &self,
        id: SubmissionId,
        remote_job_id: RemoteJobId,
    ) -> AgentResult<()> {
        self.update(id, &StatusUpdate::submitted(remote_job_id)).await
    }

    #[instrument(level = "debug", skip(self))]
    async fn report_status(
        &self,
        id: SubmissionId,
        state: JobState,
        message: &str,
    ) -> AgentResult<()> {
        self.update(id, &StatusUpdate::status(state, message)).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use axum::{
        Json, Router,
        extract::{Path, State},
        http::{HeaderMap, StatusCode as AxumStatus},
        routing::{get, put},
    };
    use serde_json::{Value, json};

    use super::*;
    use crate::testing::{failing_credentials, fixed_credentials, spawn_server};

    #[derive(Default)]
    struct Seen {
        auth: Vec<String>,
        updates: Vec<(u64, Value)>,
    }

    type Shared = Arc<Mutex<Seen>>;

    fn record_auth(seen: &Shared, headers: &HeaderMap) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        seen.lock().unwrap().auth.push(auth);
    }

    async fn pending(State(seen): State<Shared>, headers: HeaderMap) -> Json<Value> {
        record_auth(&seen, &headers);
        Json(json!([
            {
                "id": 1,
                "job_submission_name": "first",
                "job_submission_owner_email": "a@example.com",
                "job_script_files": {"main_file_path": "main.sh", "files": {"main.sh": "#!/bin/sh\n"}},
                "extra_field": true
            },
            {"id": 2, "job_submission_name": "broken"},
            {
                "id": 3,
                "job_submission_name": "overrides",
                "job_submission_owner_email": "c@example.com",
                "execution_parameters": {"nice": null, "ratio": 0.5, "partition": "debug"},
                "job_script_files": {"main_file_path": "main.sh", "files": {"main.sh": "#!/bin/sh\n"}}
            },
            {"job_submission_name": "anonymous"}
        ]))
    }

    async fn active(State(seen): State<Shared>, headers: HeaderMap) -> Json<Value> {
        record_auth(&seen, &headers);
        Json(json!([{"id": 5, "slurm_job_id": 55}, {"id": 6, "slurm_job_id": null}]))
    }

    async fn update(
        State(seen): State<Shared>,
        Path(id): Path<u64>,
        Json(body): Json<Value>,
    ) -> AxumStatus {
        seen.lock().unwrap().updates.push((id, body));
        if id == 404 {
            AxumStatus::NOT_FOUND
        } else {
            AxumStatus::OK
        }
    }

    async fn server() -> (String, Shared) {
        let seen = Shared::default();
        let router = Router::new()
            .route("/jobbergate/job-submissions/agent/pending", get(pending))
            .route("/jobbergate/job-submissions/agent/active", get(active))
            .route("/jobbergate/job-submissions/agent/{id}", put(update))
            .with_state(seen.clone());
        (spawn_server(router).await, seen)
    }

    fn client(base: &str, credentials: Arc<CredentialCache>) -> JobManagementClient {
        JobManagementClient::new(Client::new(), base, credentials).unwrap()
    }

    #[tokio::test]
    async fn fetch_pending_keeps_ids_of_malformed_records() {
        let (base, seen) = server().await;
        let jobs = client(&base, fixed_credentials("tkn"));

        let pending = jobs.fetch_pending().await.unwrap();

        assert_eq!(pending.len(), 3);
        match &pending[0] {
            PendingRecord::Valid(sub) => {
                assert_eq!(sub.id, SubmissionId(1));
                assert_eq!(sub.name, "first");
            }
            other => panic!("unexpected record {other:?}"),
        }
        match &pending[1] {
            PendingRecord::Malformed { id, reason } => {
                assert_eq!(*id, SubmissionId(2));
                assert!(reason.contains("missing field"), "{reason}");
            }
            other => panic!("unexpected record {other:?}"),
        }
        match &pending[2] {
            PendingRecord::Valid(sub) => assert_eq!(sub.execution_parameters.len(), 3),
            other => panic!("unexpected record {other:?}"),
        }
        assert_eq!(seen.lock().unwrap().auth, vec!["Bearer tkn".to_string()]);
    }

    #[tokio::test]
    async fn fetch_active_reads_remote_ids() {
        let (base, _) = server().await;
        let active = client(&base, fixed_credentials("tkn"))
            .fetch_active()
            .await
            .unwrap();
        assert_eq!(
            active,
            vec![ActiveSubmission {
                id: SubmissionId(5),
                remote_job_id: RemoteJobId(55),
            }]
        );
    }

    #[tokio::test]
    async fn reports_use_status_update_bodies() {
        let (base, seen) = server().await;
        let jobs = client(&base, fixed_credentials("tkn"));

        jobs.report_submitted(SubmissionId(1), RemoteJobId(77)).await.unwrap();
        jobs.report_status(SubmissionId(2), JobState::Rejected, "bad directive")
            .await
            .unwrap();

        let updates = seen.lock().unwrap().updates.clone();
        assert_eq!(
            updates,
            vec![
                (1, json!({"new_status": "SUBMITTED", "slurm_job_id": 77})),
                (2, json!({"new_status": "REJECTED", "reported_message": "bad directive"})),
            ]
        );
    }

    #[tokio::test]
    async fn failed_update_is_an_api_update_error() {
        let (base, _) = server().await;
        let res = client(&base, fixed_credentials("tkn"))
            .report_status(SubmissionId(404), JobState::Completed, "")
            .await;
        assert!(matches!(res, Err(AgentError::ApiUpdate(_))));
    }

    #[tokio::test]
    async fn missing_token_fails_before_sending() {
        let (base, seen) = server().await;
        let res = client(&base, failing_credentials()).fetch_pending().await;

        assert!(matches!(res, Err(AgentError::Authentication(_))));
        assert!(seen.lock().unwrap().auth.is_empty());
    }

    #[tokio::test]
    async fn unreachable_service_is_a_fetch_error() {
        let res = client("http://127.0.0.1:9/", fixed_credentials("tkn"))
            .fetch_active()
            .await;
        assert!(matches!(res, Err(AgentError::Fetch(_))));
    }
}
