use serde_json::Value;

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub status_text: String,
    pub duration_ms: u128,
    pub body: String,
}

impl ApiResponse {
    /// The body parsed as JSON, or `None` for plain-text bodies such as
    /// `Created` or `Not Found`.
    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}
