//! sw_install and sw_activate tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::proxy::{ActivateReport, InstallReport, RegistrationStatus};
use swcache_client::{OfflineProxy, WorkerEvents};

use super::json_result;

/// Parameters for the sw_install tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InstallParams {
    /// Activate right away when install allows it (default: true).
    #[serde(default = "default_true")]
    pub activate: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct InstallOutput {
    pub install: InstallReport,
    /// Present when install was followed by activation.
    pub activate: Option<ActivateReport>,
    pub registration: RegistrationStatus,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ActivateOutput {
    pub activate: ActivateReport,
    pub registration: RegistrationStatus,
}

/// Implementation of the sw_install tool.
pub async fn install_impl(proxy: &OfflineProxy, params: InstallParams) -> Result<CallToolResult, McpError> {
    let install = proxy.install().await;
    let activate = if params.activate && proxy.registration().may_activate() {
        Some(proxy.activate().await)
    } else {
        None
    };

    json_result(&InstallOutput { install, activate, registration: proxy.registration().status() })
}

/// Implementation of the sw_activate tool.
pub async fn activate_impl(proxy: &OfflineProxy) -> Result<CallToolResult, McpError> {
    let activate = WorkerEvents::activate(proxy).await;
    json_result(&ActivateOutput { activate, registration: proxy.registration().status() })
}
