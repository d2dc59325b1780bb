//! Generic discovered resources
//!
//! Watchers may publish resources other than service entries into the cache's
//! config store, keyed by group/version/kind. MCP server declarations are the
//! only kind with a typed spec; anything else is kept as raw JSON.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Kubernetes-style group/version/kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupVersionKind {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl GroupVersionKind {
    pub fn new(group: &str, version: &str, kind: &str) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            kind: kind.to_string(),
        }
    }

    /// GVK of MCP server declarations
    pub fn mcp_server() -> Self {
        Self::new("networking.bridgeport.io", "v1", "McpServer")
    }
}

impl Display for GroupVersionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.group, self.version, self.kind)
    }
}

/// A discovered resource held in the cache's config store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub group_version_kind: GroupVersionKind,
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    pub spec: ConfigSpec,
}

impl Config {
    pub fn mcp_server(namespace: &str, server: McpServer) -> Self {
        Self {
            group_version_kind: GroupVersionKind::mcp_server(),
            name: server.name.clone(),
            namespace: namespace.to_string(),
            spec: ConfigSpec::McpServer(server),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum ConfigSpec {
    McpServer(McpServer),
    Other(serde_json::Value),
}

/// MCP server exported from a registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpServer {
    pub name: String,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub path_match_rule: PathMatchRule,
    #[serde(default)]
    pub upstream_type: String,
    #[serde(default)]
    pub enable_path_rewrite: bool,
    #[serde(default)]
    pub path_rewrite_prefix: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathMatchRule {
    #[serde(default)]
    pub match_rule_domain: String,
    /// `exact`, `prefix`, `suffix`, `contains` or `regex`
    #[serde(default)]
    pub match_rule_type: String,
    #[serde(default)]
    pub match_rule_path: String,
}
