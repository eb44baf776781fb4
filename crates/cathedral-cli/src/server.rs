use std::sync::Arc;

use cathedral_core::{Controller, Transition, UserProfile, today};
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// MCP front end. Every tool call holds the controller lock for its whole
/// duration, so a preset change is observed as one transaction.
#[derive(Clone)]
pub struct CathedralServer {
    controller: Arc<Mutex<Controller>>,
    tool_router: ToolRouter<Self>,
}

impl CathedralServer {
    pub fn new(controller: Controller) -> Self {
        Self {
            controller: Arc::new(Mutex::new(controller)),
            tool_router: Self::tool_router(),
        }
    }

    fn persist(controller: &mut Controller) {
        if let Err(e) = controller.save() {
            tracing::error!("failed to persist settings: {e}");
        }
    }

    fn scalars_json(controller: &Controller) -> serde_json::Value {
        serde_json::json!({
            "mode": controller.mode(),
            "intensity": controller.intensity(),
            "safety_level": controller.safety_level(),
            "active": controller.toggles().active_names().count(),
        })
    }
}

fn json_result(value: &impl Serialize) -> CallToolResult {
    CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(value).unwrap_or_default(),
    )])
}

// --- Tool parameter types ---

#[derive(Debug, Deserialize, JsonSchema)]
struct DatasetRequest {
    /// Dataset name, e.g. "angels_72"
    name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ToggleRequest {
    /// Dataset name, e.g. "crystal_frequencies"
    name: String,
    /// Desired state. Omit to flip the current value.
    active: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ModeRequest {
    /// One of: beginner, intermediate, advanced, custom
    mode: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct LevelRequest {
    /// Level name
    level: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct NodeRequest {
    /// Codex node id
    id: u32,
    /// Attach correlated records from every active dataset
    include_connections: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct CorrelationRequest {
    /// Codex node id
    id: u32,
    /// Dataset tags to correlate against. Omit for every active dataset.
    types: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SearchRequest {
    /// Healing need keyword, e.g. "anxiety"
    term: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct FocusRequest {
    /// Day of the year (1-366). Defaults to today (UTC).
    day: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ProfileRequest {
    /// Experience level (1-5). Omit to clear the profile.
    experience_level: Option<u8>,
    /// Display name
    name: Option<String>,
}

#[tool_router]
impl CathedralServer {
    #[tool(
        description = "Current session state: mode, intensity, safety level, profile, every dataset toggle with its category, registered datasets and any load failures."
    )]
    async fn cathedral_status(&self) -> Result<CallToolResult, McpError> {
        let controller = self.controller.lock().await;
        Ok(json_result(&controller.status()))
    }

    #[tool(description = "Whether a dataset is currently active. Unknown names are inactive.")]
    async fn cathedral_is_active(
        &self,
        Parameters(req): Parameters<DatasetRequest>,
    ) -> Result<CallToolResult, McpError> {
        let controller = self.controller.lock().await;
        let result = serde_json::json!({
            "name": req.name,
            "active": controller.is_active(&req.name),
        });
        Ok(json_result(&result))
    }

    #[tool(
        description = "Switch a dataset on or off (omit `active` to flip). Safety datasets can never be switched off and experience-gated datasets need a qualifying profile; refusals come back with applied=false and a reason."
    )]
    async fn cathedral_toggle(
        &self,
        Parameters(req): Parameters<ToggleRequest>,
    ) -> Result<CallToolResult, McpError> {
        let mut controller = self.controller.lock().await;
        let result = match controller.toggle(&req.name, req.active.into()) {
            Transition::Applied { active } => serde_json::json!({
                "name": req.name,
                "applied": true,
                "active": active,
            }),
            Transition::Rejected(reason) => serde_json::json!({
                "name": req.name,
                "applied": false,
                "active": controller.is_active(&req.name),
                "reason": reason.to_string(),
            }),
        };
        Ok(json_result(&result))
    }

    #[tool(
        description = "Apply a mode preset (beginner, intermediate, advanced, custom). Presets set the dataset toggles, intensity and safety level together; custom only records the mode."
    )]
    async fn cathedral_set_mode(
        &self,
        Parameters(req): Parameters<ModeRequest>,
    ) -> Result<CallToolResult, McpError> {
        let mut controller = self.controller.lock().await;
        let applied = controller.set_mode(&req.mode);
        if applied {
            Self::persist(&mut controller);
        }
        let mut result = Self::scalars_json(&controller);
        result["applied"] = applied.into();
        Ok(json_result(&result))
    }

    #[tool(
        description = "Set intensity (gentle, moderate, deep, advanced). Gentle switches challenge datasets off; leaving gentle does not switch them back on."
    )]
    async fn cathedral_set_intensity(
        &self,
        Parameters(req): Parameters<LevelRequest>,
    ) -> Result<CallToolResult, McpError> {
        let mut controller = self.controller.lock().await;
        let applied = controller.set_intensity(&req.level);
        if applied {
            Self::persist(&mut controller);
        }
        let mut result = Self::scalars_json(&controller);
        result["applied"] = applied.into();
        Ok(json_result(&result))
    }

    #[tool(description = "Set safety level (maximum, standard, advanced_practitioner).")]
    async fn cathedral_set_safety_level(
        &self,
        Parameters(req): Parameters<LevelRequest>,
    ) -> Result<CallToolResult, McpError> {
        let mut controller = self.controller.lock().await;
        let applied = controller.set_safety_level(&req.level);
        if applied {
            Self::persist(&mut controller);
        }
        let mut result = Self::scalars_json(&controller);
        result["applied"] = applied.into();
        Ok(json_result(&result))
    }

    #[tool(
        description = "Look up a codex node. With include_connections, the node carries angels, alchemy processes, crystals and geometry from whichever of those datasets are active."
    )]
    async fn cathedral_get_node(
        &self,
        Parameters(req): Parameters<NodeRequest>,
    ) -> Result<CallToolResult, McpError> {
        let controller = self.controller.lock().await;
        let node = controller.get_node(req.id, req.include_connections.unwrap_or(false));
        Ok(json_result(&serde_json::json!({ "id": req.id, "node": node })))
    }

    #[tool(
        description = "Correlate a codex node against dataset tags (angels_72, alchemy_operations, crystal_frequencies, sacred_geometry, tarot_integration). Unsupported tags are ignored."
    )]
    async fn cathedral_correlations(
        &self,
        Parameters(req): Parameters<CorrelationRequest>,
    ) -> Result<CallToolResult, McpError> {
        let controller = self.controller.lock().await;
        let types: Vec<&str> = req
            .types
            .iter()
            .flatten()
            .map(String::as_str)
            .collect();
        let correlations = controller.get_correlations(req.id, Some(types.as_slice()));
        Ok(json_result(&correlations))
    }

    #[tool(
        description = "Search active datasets by healing need (anxiety, depression, trauma). Returns matching entities, angels, alchemy and crystals; inactive datasets contribute nothing."
    )]
    async fn cathedral_search(
        &self,
        Parameters(req): Parameters<SearchRequest>,
    ) -> Result<CallToolResult, McpError> {
        let controller = self.controller.lock().await;
        Ok(json_result(&controller.search_by_healing(&req.term)))
    }

    #[tool(description = "The codex node and supporting angel for a day of the year.")]
    async fn cathedral_daily_focus(
        &self,
        Parameters(req): Parameters<FocusRequest>,
    ) -> Result<CallToolResult, McpError> {
        let controller = self.controller.lock().await;
        let day = req.day.unwrap_or_else(today);
        Ok(json_result(&controller.daily_focus(day)))
    }

    #[tool(
        description = "Emergency gentle mode: switches challenge datasets off, supportive ones on, forces gentle intensity and maximum safety, and returns grounding practices to offer."
    )]
    async fn cathedral_emergency(&self) -> Result<CallToolResult, McpError> {
        let mut controller = self.controller.lock().await;
        let practices = controller.activate_emergency_gentle_mode();
        Self::persist(&mut controller);
        let mut result = Self::scalars_json(&controller);
        result["grounding_techniques"] = practices.into();
        Ok(json_result(&result))
    }

    #[tool(
        description = "Set or clear the user profile. The experience level decides which gated datasets (daemon_guardians, shadow_work_elements, advanced_alchemy) may be switched on."
    )]
    async fn cathedral_set_profile(
        &self,
        Parameters(req): Parameters<ProfileRequest>,
    ) -> Result<CallToolResult, McpError> {
        if req.experience_level.is_none() && req.name.is_some() {
            return Err(McpError::invalid_params(
                "experience_level is required when name is given".to_string(),
                None,
            ));
        }
        let mut controller = self.controller.lock().await;
        let profile = req.experience_level.map(|level| UserProfile {
            name: req.name,
            ..UserProfile::with_level(level)
        });
        controller.set_profile(profile);
        Self::persist(&mut controller);
        Ok(json_result(&serde_json::json!({ "profile": controller.profile() })))
    }
}

#[tool_handler]
impl ServerHandler for CathedralServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Cathedral dataset controller. Decides which symbolic datasets are active for this \
                 session and answers correlation queries over them.\n\n\
                 - Call cathedral_status first to see mode, intensity, safety level and toggles.\n\
                 - Safety datasets (trauma_safeguards, grounding_techniques, emergency_exits) are \
                   always on. Toggle refusals are normal results, not errors.\n\
                 - If the user seems overwhelmed, call cathedral_emergency and offer the returned \
                   grounding techniques.\n\
                 - Settings persist across sessions automatically."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
