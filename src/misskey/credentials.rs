use serde_json::{Map, Value};

#[derive(Clone)]
pub struct MisskeyCredentials {
    api_url: String,
    api_key: String,
}

impl core::fmt::Debug for MisskeyCredentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MisskeyCredentials")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl MisskeyCredentials {
    pub fn new(api_url: &str, api_key: String) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_owned(),
            api_key,
        }
    }

    pub fn as_api_url(&self) -> &str {
        &self.api_url
    }

    pub fn as_api_key(&self) -> &str {
        &self.api_key
    }

    pub fn endpoint(&self, endpoint: &str) -> String {
        format!("{}/api/{endpoint}", self.api_url)
    }

    /// Request body with the token (`i`) prepended to `params`.
    pub fn as_body(&self, params: Map<String, Value>) -> Value {
        let mut body = Map::with_capacity(params.len() + 1);
        body.insert("i".to_owned(), Value::String(self.api_key.clone()));
        body.extend(params);
        Value::Object(body)
    }
}
