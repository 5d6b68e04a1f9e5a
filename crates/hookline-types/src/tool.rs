//! Tool description types.
//!
//! A tool is a named operation the conversational agent can invoke. Its
//! [`ToolSchema`] is what gets pasted into the agent's tool configuration;
//! its [`JobSettings`] control how the bridge runs it.

use serde::{Deserialize, Serialize};

/// JSON-schema-like parameter type names understood by agent platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
}

/// A single named argument accepted by a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParameterType,
    pub description: String,
    #[serde(default = "default_required")]
    pub required: bool,
    /// Allowed values, when the parameter is an enumeration.
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
}

fn default_required() -> bool {
    true
}

impl ToolParameter {
    pub fn required(
        name: impl Into<String>,
        param_type: ParameterType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: description.into(),
            required: true,
            enum_values: None,
        }
    }

    pub fn optional(
        name: impl Into<String>,
        param_type: ParameterType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type, description)
        }
    }
}

/// Public description of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<ToolParameter>,
}

impl ToolSchema {
    /// Render the schema in the `{"type": "object", "properties": ...}` form
    /// most agent platforms expect for tool parameters.
    pub fn to_json_schema(&self) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for p in &self.parameters {
            let mut prop = serde_json::json!({
                "type": p.param_type,
                "description": p.description,
            });
            if let Some(values) = &p.enum_values {
                prop["enum"] = serde_json::json!(values);
            }
            properties.insert(p.name.clone(), prop);
            if p.required {
                required.push(p.name.clone());
            }
        }
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "parameters": {
                "type": "object",
                "properties": properties,
                "required": required,
            }
        })
    }
}

/// How the bridge runs a tool as a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSettings {
    /// Seconds the HTTP caller is held while waiting for the job to finish
    /// before getting a job id back instead. `None` uses the global default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_threshold_secs: Option<f64>,
    /// Whether cancel requests are accepted.
    #[serde(default = "default_cancelable")]
    pub cancelable: bool,
    /// Title of the completion notification, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_title: Option<String>,
    /// Body template of the completion notification. `{param}` placeholders
    /// are filled from the job input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_message: Option<String>,
}

fn default_cancelable() -> bool {
    true
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            sync_threshold_secs: None,
            cancelable: true,
            notify_title: None,
            notify_message: None,
        }
    }
}

impl JobSettings {
    pub fn with_sync_threshold(mut self, secs: f64) -> Self {
        self.sync_threshold_secs = Some(secs);
        self
    }

    pub fn with_notification(
        mut self,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        self.notify_title = Some(title.into());
        self.notify_message = Some(message.into());
        self
    }

    pub fn cancelable(mut self, cancelable: bool) -> Self {
        self.cancelable = cancelable;
        self
    }
}
