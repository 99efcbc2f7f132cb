//! Transport seam
//!
//! The adapter never builds HTTP requests itself. It hands a method, a
//! service name, a path relative to the service root and a parameter object
//! to a [`Transport`], which is already authenticated and JSON-capable.

use crate::error::TransportError;
use futures::future::BoxFuture;
use serde_json::Value;
use std::fmt;

/// HTTP verb understood by a [`Transport`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }

    /// GET and DELETE send params as a query string, the others as a JSON body
    pub fn params_in_query(&self) -> bool {
        matches!(self, Self::Get | Self::Delete)
    }

    /// Parse a method name as written in resource definitions
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated request function provided by the caller
pub trait Transport: Send + Sync {
    fn call<'a>(
        &'a self,
        method: Method,
        service: &'a str,
        path: &'a str,
        params: &'a Value,
    ) -> BoxFuture<'a, Result<Value, TransportError>>;
}

/// Append string/number/bool params of a JSON object as a query string.
/// Arrays repeat the key once per element.
pub fn add_query_params(url: &str, params: &Value) -> String {
    let Value::Object(map) = params else {
        return url.to_string();
    };

    let mut query_parts: Vec<String> = Vec::new();

    for (key, value) in map {
        match value {
            Value::String(s) => {
                query_parts.push(format!("{}={}", key, urlencoding::encode(s)));
            },
            Value::Number(n) => {
                query_parts.push(format!("{}={}", key, n));
            },
            Value::Bool(b) => {
                query_parts.push(format!("{}={}", key, b));
            },
            Value::Array(arr) => {
                for item in arr {
                    if let Value::String(s) = item {
                        query_parts.push(format!("{}={}", key, urlencoding::encode(s)));
                    }
                }
            },
            _ => {},
        }
    }

    if query_parts.is_empty() {
        url.to_string()
    } else if url.contains('?') {
        format!("{}&{}", url, query_parts.join("&"))
    } else {
        format!("{}?{}", url, query_parts.join("&"))
    }
}
