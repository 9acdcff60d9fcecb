use serde::{ Serialize, Deserialize };
use serde_json::Value as JsonValue;
use crate::widget::WidgetError;

/// Body posted to the question-answering endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskRequest {
    pub query: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

impl AskResponse {
    /// Decodes a response body. Any JSON value other than `null` is accepted;
    /// only a non-empty string `answer` member counts as an answer.
    pub fn from_body(body: &str) -> Result<Self, WidgetError> {
        let root: JsonValue = serde_json::from_str(body)?;
        if root.is_null() {
            return Err(WidgetError::EmptyBody);
        }
        let answer = root
            .get("answer")
            .and_then(|a| a.as_str())
            .filter(|a| !a.is_empty())
            .map(str::to_owned);
        Ok(Self { answer })
    }
}
