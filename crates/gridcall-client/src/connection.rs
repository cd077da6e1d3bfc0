//! # Connection
//!
//! Lazily dialed channel to a task gateway. The channel is opened on
//! first use and shared by every task submitted or restored through the
//! connection; overlapping `submit()` and `result()` calls multiplex
//! over it freely.

use tokio::sync::OnceCell;
use tonic::transport::{Channel, Endpoint};
use tracing::{debug, info};

use gridcall_shared::proto::v1::task_service_client::TaskServiceClient;
use gridcall_shared::proto::v1::{CreateTaskRequest, PollTaskRequest, PollTaskResponse};
use gridcall_shared::GRPC_MAX_MESSAGE_BYTES;

use crate::config::NetworkConfig;
use crate::error::ClientResult;
use crate::task::{SubmittedTask, TaskSpec};

/// Connection to a task gateway.
///
/// `address` is a full URI such as `http://broker.internal:50051`.
#[derive(Debug)]
pub struct Connection {
    address: String,
    config: NetworkConfig,
    client: OnceCell<TaskServiceClient<Channel>>,
}

impl Connection {
    /// Create a connection with default network configuration. No I/O
    /// happens until the first RPC.
    pub fn new(address: impl Into<String>) -> Self {
        Self::with_config(address, NetworkConfig::default())
    }

    pub fn with_config(address: impl Into<String>, config: NetworkConfig) -> Self {
        Self {
            address: address.into(),
            config,
            client: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    async fn client(&self) -> ClientResult<TaskServiceClient<Channel>> {
        let client = self
            .client
            .get_or_try_init(|| async {
                debug!(address = %self.address, "Dialing task gateway");
                let endpoint = Endpoint::from_shared(self.address.clone())?
                    .timeout(self.config.timeout);
                let channel = endpoint.connect().await?;
                // Call specs and predicate blobs can be heavy; match the
                // server's 1 GiB ceiling in both directions.
                Ok::<_, crate::error::ClientError>(
                    TaskServiceClient::new(channel)
                        .max_decoding_message_size(GRPC_MAX_MESSAGE_BYTES)
                        .max_encoding_message_size(GRPC_MAX_MESSAGE_BYTES),
                )
            })
            .await?;
        Ok(client.clone())
    }

    /// Submit a task and return a handle carrying only its id; the
    /// blobs are serialized once and sent with this call.
    pub async fn submit(&self, spec: TaskSpec) -> ClientResult<SubmittedTask<'_>> {
        let request = CreateTaskRequest {
            flavor: spec.flavor,
            call_spec: spec.call_spec,
            init_valid_func: spec.init_valid_func,
            compare_valid_func: spec.compare_valid_func,
            redundancy_options: Some(spec.redundancy),
        };

        let mut client = self.client().await?;
        let response = client.create_task(request).await?.into_inner();
        info!(task_id = %response.task_id, "Task submitted");

        Ok(SubmittedTask::new(self, response.task_id))
    }

    /// Re-attach to a task submitted earlier (possibly by another
    /// process); the handle polls exactly like a fresh submission.
    pub fn restore_task(&self, task_id: impl Into<String>) -> SubmittedTask<'_> {
        SubmittedTask::new(self, task_id.into())
    }

    pub(crate) async fn poll_task(&self, task_id: &str) -> ClientResult<PollTaskResponse> {
        let mut client = self.client().await?;
        let response = client
            .poll_task(PollTaskRequest {
                task_id: task_id.to_string(),
            })
            .await?
            .into_inner();
        Ok(response)
    }
}
