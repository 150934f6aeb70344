//! Remote-store credentials and the tolerant parser that produces them.
//!
//! Users paste whatever their console hands them: a JSON document, a TOML
//! table, or a JavaScript snippet such as
//!
//! ```text
//! const firebaseConfig = {
//!   apiKey: 'abc123',
//!   projectId: "my-project",
//! };
//! ```
//!
//! [`RemoteCredentials::parse`] accepts all three.  The two identity fields
//! (`api_key`, `project_id`) are mandatory; without them no remote adapter is
//! ever constructed.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential blob is empty")]
    Empty,
    #[error("credential blob is not JSON, TOML, or an object literal")]
    Unparseable,
    #[error("credential blob is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("invalid base_url `{value}`: {source}")]
    InvalidUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCredentials {
    pub api_key: String,
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl fmt::Debug for RemoteCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteCredentials")
            .field("api_key", &"<redacted>")
            .field("project_id", &self.project_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

static SINGLE_QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"'([^'\\]*)'"#).expect("static regex"));
static BARE_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([\{,]\s*)([A-Za-z_$][A-Za-z0-9_$]*)\s*:"#).expect("static regex")
});
static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#",\s*([\}\]])"#).expect("static regex"));

impl RemoteCredentials {
    pub fn parse(raw: &str) -> Result<Self, CredentialError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(CredentialError::Empty);
        }

        let object = parse_object(raw).ok_or(CredentialError::Unparseable)?;
        Self::from_object(&object)
    }

    fn from_object(object: &Map<String, Value>) -> Result<Self, CredentialError> {
        let api_key = lookup(object, &["api_key", "apiKey"]);
        let project_id = lookup(object, &["project_id", "projectId"]);

        // Some consoles wrap the config in a single named table.
        if api_key.is_none() && project_id.is_none() && object.len() == 1 {
            if let Some(Value::Object(inner)) = object.values().next() {
                return Self::from_object(inner);
            }
        }

        let api_key = api_key.ok_or(CredentialError::MissingField("api_key"))?;
        let project_id = project_id.ok_or(CredentialError::MissingField("project_id"))?;
        let base_url = match lookup(object, &["base_url", "baseUrl"]) {
            Some(value) => {
                url::Url::parse(&value)
                    .map_err(|source| CredentialError::InvalidUrl { value: value.clone(), source })?;
                Some(value)
            }
            None => None,
        };

        Ok(Self {
            api_key,
            project_id,
            base_url,
        })
    }
}

fn lookup(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(String::from)
}

fn parse_object(raw: &str) -> Option<Map<String, Value>> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw) {
        return Some(map);
    }

    if let Ok(table) = toml::from_str::<toml::Table>(raw) {
        if let Ok(Value::Object(map)) = serde_json::to_value(table) {
            return Some(map);
        }
    }

    let normalized = normalize_object_literal(raw)?;
    match serde_json::from_str::<Value>(&normalized) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Rewrite a JavaScript object literal into JSON: cut the outermost braces
/// out of any surrounding `const x = …;`, double-quote single-quoted strings
/// and bare keys, and drop trailing commas.
fn normalize_object_literal(raw: &str) -> Option<String> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    let body = &raw[start..=end];
    let body = SINGLE_QUOTED.replace_all(body, "\"$1\"");
    let body = BARE_KEY.replace_all(&body, "$1\"$2\":");
    let body = TRAILING_COMMA.replace_all(&body, "$1");
    Some(body.into_owned())
}
