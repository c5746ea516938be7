use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// `{statusCode, body}` where `body` is itself JSON text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpEnvelope {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl HttpEnvelope {
    pub fn new<T: Serialize>(status_code: u16, payload: &T) -> Self {
        let body = serde_json::to_string(payload)
            .unwrap_or_else(|e| Value::String(format!("unserializable response: {}", e)).to_string());
        Self { status_code, body }
    }

    pub fn ok<T: Serialize>(payload: &T) -> Self {
        Self::new(200, payload)
    }

    /// Error responses carry a bare JSON string message
    pub fn error(status_code: u16, message: impl Into<String>) -> Self {
        Self::new(status_code, &message.into())
    }

    /// The decoded body
    pub fn json_body(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or_else(|_| Value::String(self.body.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResponse {
    pub action_group: String,
    pub api_path: String,
    pub http_method: String,
    pub http_status_code: u16,
    pub response_body: Map<String, Value>,
}

/// Response shape required by agent-triggered invocations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentEnvelope {
    pub response: AgentResponse,
    pub message_version: Value,
}

impl AgentEnvelope {
    pub fn new<T: Serialize>(
        action_group: impl Into<String>,
        api_path: impl Into<String>,
        http_method: impl Into<String>,
        http_status_code: u16,
        message_version: Value,
        payload: &T,
    ) -> Self {
        let body = serde_json::to_string(payload).unwrap_or_default();
        let mut response_body = Map::new();
        response_body.insert("application/json".to_string(), json!({ "body": body }));
        Self {
            response: AgentResponse {
                action_group: action_group.into(),
                api_path: api_path.into(),
                http_method: http_method.into(),
                http_status_code,
                response_body,
            },
            message_version,
        }
    }

    /// The JSON text placed under `responseBody["application/json"].body`
    pub fn body_text(&self) -> Option<&str> {
        self.response
            .response_body
            .get("application/json")
            .and_then(|v| v.get("body"))
            .and_then(Value::as_str)
    }
}

/// What a handler hands back to its transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HandlerResponse {
    Agent(AgentEnvelope),
    Http(HttpEnvelope),
}

impl HandlerResponse {
    pub fn status(&self) -> u16 {
        match self {
            HandlerResponse::Agent(envelope) => envelope.response.http_status_code,
            HandlerResponse::Http(envelope) => envelope.status_code,
        }
    }
}

impl From<HttpEnvelope> for HandlerResponse {
    fn from(envelope: HttpEnvelope) -> Self {
        HandlerResponse::Http(envelope)
    }
}

impl From<AgentEnvelope> for HandlerResponse {
    fn from(envelope: AgentEnvelope) -> Self {
        HandlerResponse::Agent(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_envelope_shape() {
        let envelope = HttpEnvelope::error(400, "Unknown action: drop");
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"statusCode": 400, "body": "\"Unknown action: drop\""})
        );
        assert_eq!(envelope.json_body(), json!("Unknown action: drop"));
        assert_eq!(HttpEnvelope::ok(&42).body, "42");
    }

    #[test]
    fn test_agent_envelope_shape() {
        let envelope = AgentEnvelope::new("github", "/branches", "GET", 200, json!("1.0"), &json!([]));
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "response": {
                    "actionGroup": "github",
                    "apiPath": "/branches",
                    "httpMethod": "GET",
                    "httpStatusCode": 200,
                    "responseBody": {"application/json": {"body": "[]"}}
                },
                "messageVersion": "1.0"
            })
        );
        assert_eq!(envelope.body_text(), Some("[]"));
        assert_eq!(HandlerResponse::from(envelope).status(), 200);
    }
}
