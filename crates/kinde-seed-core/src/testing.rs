//! In-memory management API used by the unit tests.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::client::{ManagementApi, Method};
use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

struct Rule {
    method: Method,
    path: String,
    /// Only match calls whose body carries this `key`
    key: Option<String>,
    reply: Result<Value, ApiError>,
}

impl Rule {
    fn matches(&self, method: &Method, path: &str, body: Option<&Value>) -> bool {
        if self.method != *method || self.path != path {
            return false;
        }
        match &self.key {
            Some(key) => body.and_then(|b| b.get("key")).and_then(Value::as_str) == Some(key.as_str()),
            None => true,
        }
    }
}

/// Accepts every call unless a rule says otherwise, and records each call in
/// the order it was issued. Create calls answer with a predictable id such as
/// `rol_admin` or `perm_read`.
#[derive(Default)]
pub struct ScriptedApi {
    rules: Vec<Rule>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(mut self, method: Method, path: &str, status: u16, body: &str) -> Self {
        self.rules.push(Rule {
            reply: Err(ApiError::status(method.as_str(), path, status, body)),
            method,
            path: path.to_string(),
            key: None,
        });
        self
    }

    /// Like [`ScriptedApi::fail`], restricted to bodies with the given `key`.
    pub fn fail_for_key(
        mut self,
        method: Method,
        path: &str,
        key: &str,
        status: u16,
        body: &str,
    ) -> Self {
        self.rules.push(Rule {
            reply: Err(ApiError::status(method.as_str(), path, status, body)),
            method,
            path: path.to_string(),
            key: Some(key.to_string()),
        });
        self
    }

    pub fn reply(mut self, method: Method, path: &str, value: Value) -> Self {
        self.rules.push(Rule {
            method,
            path: path.to_string(),
            key: None,
            reply: Ok(value),
        });
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|c| format!("{} {}", c.method, c.path))
            .collect()
    }

    /// Position of the first call matching `method path`, if any.
    pub fn position(&self, call: &str) -> Option<usize> {
        self.paths().iter().position(|p| p == call)
    }

    fn default_reply(method: &Method, path: &str, body: Option<&Value>) -> Value {
        let field = |name: &str| {
            body.and_then(|b| b.get(name))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let key_or_name = || {
            let key = field("key");
            if key.is_empty() { field("name") } else { key }
        };

        match (method.as_str(), path) {
            ("POST", "/applications") => {
                json!({ "application": { "id": format!("app_{}", key_or_name()) } })
            }
            ("POST", "/apis") => json!({ "api": { "id": format!("api_{}", key_or_name()) } }),
            ("POST", "/roles") => json!({ "role": { "id": format!("rol_{}", field("key")) } }),
            ("POST", "/permissions") => {
                json!({ "permission": { "id": format!("perm_{}", field("key")) } })
            }
            ("GET", p) if p.starts_with("/applications/") => {
                let key = p.trim_start_matches("/applications/");
                json!({ "application": { "id": format!("app_{key}") } })
            }
            _ => Value::Null,
        }
    }
}

#[async_trait]
impl ManagementApi for ScriptedApi {
    async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        self.calls.lock().unwrap().push(RecordedCall {
            method: method.clone(),
            path: path.to_string(),
            body: body.clone(),
        });
        // Let sibling futures interleave like they would on real I/O.
        tokio::task::yield_now().await;

        if let Some(rule) = self
            .rules
            .iter()
            .find(|r| r.matches(&method, path, body.as_ref()))
        {
            return rule.reply.clone();
        }
        Ok(Self::default_reply(&method, path, body.as_ref()))
    }
}
