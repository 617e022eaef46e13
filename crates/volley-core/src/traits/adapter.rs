// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity and liveness shared by every backend.

use async_trait::async_trait;

use crate::error::VolleyError;
use crate::types::{AdapterType, HealthStatus};

/// Common surface of completion transports and stores.
///
/// The gateway's `/health` endpoint reports storage through this trait, so it
/// does not care which concrete backend is wired in.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Short identifier, e.g. `"openai"` or `"sqlite"`.
    fn name(&self) -> &str;

    fn version(&self) -> semver::Version;

    fn adapter_type(&self) -> AdapterType;

    /// Cheap probe; must not spend tokens against the completion endpoint.
    async fn health_check(&self) -> Result<HealthStatus, VolleyError>;
}
