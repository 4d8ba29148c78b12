//! assetpack-rpc - Bridge RPC client, login flow and pack downloads.

mod authorized;
mod callback;
mod client;
mod envelope;
pub mod operations;
mod pipeline;

pub use authorized::AuthorizedClient;
pub use callback::{
    CallbackFlow, DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT, FlowHandle, FlowState, PollConfig,
};
pub use client::{BRIDGE_PATH, DEFAULT_TIMEOUT, RpcClient, download_client, http_client};
pub use envelope::extract_result;
pub use pipeline::{DownloadEvent, PackDownloader};
