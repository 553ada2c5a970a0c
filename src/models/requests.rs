//! Inbound models
//!
//! The intercepted request descriptor and the messages foreground pages post
//! to the worker.

use serde::{Deserialize, Serialize};

/// What kind of resource the page asked for.
///
/// `Document` marks a top-level navigation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Document,
    Script,
    Style,
    Image,
    Font,
    #[default]
    Empty,
    #[serde(other)]
    Other,
}

/// Descriptor of an intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Absolute request URL
    pub url: String,
    /// Upper-case HTTP method
    pub method: String,
    /// Destination kind reported by the host
    pub destination: Destination,
}

impl Request {
    /// Creates a request with an explicit method and destination.
    pub fn new(
        url: impl Into<String>,
        method: impl AsRef<str>,
        destination: Destination,
    ) -> Self {
        Self {
            url: url.into(),
            method: method.as_ref().to_ascii_uppercase(),
            destination,
        }
    }

    /// Creates a GET subresource request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(url, "GET", Destination::Empty)
    }

    /// Creates a top-level navigation request.
    pub fn navigate(url: impl Into<String>) -> Self {
        Self::new(url, "GET", Destination::Document)
    }

    /// Returns true for GET requests.
    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    /// Returns true for top-level navigations.
    pub fn is_navigation(&self) -> bool {
        self.is_get() && self.destination == Destination::Document
    }
}

/// Query string accepted by `GET /fetch`.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchQuery {
    pub url: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub destination: Option<Destination>,
}

impl FetchQuery {
    /// Converts the query into a request descriptor.
    pub fn into_request(self) -> Request {
        Request::new(
            self.url,
            self.method.as_deref().unwrap_or("GET"),
            self.destination.unwrap_or_default(),
        )
    }
}

/// Messages a foreground page can post to the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// Activate the waiting worker right away
    SkipWaiting,
    /// Ask for the deployed version; answered on the reply channel
    GetVersion,
    /// Take control of all open pages
    ClaimClients,
    /// Anything else is ignored
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Reads a message from an arbitrary JSON payload.
    ///
    /// Payloads without a recognised `type` become [`ClientMessage::Unknown`].
    pub fn from_value(value: serde_json::Value) -> Self {
        serde_json::from_value(value).unwrap_or(ClientMessage::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_method_is_uppercased() {
        let req = Request::new("https://app.test/api", "post", Destination::Empty);
        assert_eq!(req.method, "POST");
        assert!(!req.is_get());
    }

    #[test]
    fn test_navigation_requires_get_document() {
        assert!(Request::navigate("https://app.test/").is_navigation());
        assert!(!Request::get("https://app.test/").is_navigation());
        let post = Request::new("https://app.test/", "POST", Destination::Document);
        assert!(!post.is_navigation());
    }

    #[test]
    fn test_message_parsing() {
        assert_eq!(
            ClientMessage::from_value(json!({"type": "SKIP_WAITING"})),
            ClientMessage::SkipWaiting
        );
        assert_eq!(
            ClientMessage::from_value(json!({"type": "GET_VERSION"})),
            ClientMessage::GetVersion
        );
        assert_eq!(
            ClientMessage::from_value(json!({"type": "CLAIM_CLIENTS"})),
            ClientMessage::ClaimClients
        );
    }

    #[test]
    fn test_unrecognised_messages_are_unknown() {
        assert_eq!(
            ClientMessage::from_value(json!({"type": "REFRESH_EVERYTHING"})),
            ClientMessage::Unknown
        );
        assert_eq!(ClientMessage::from_value(json!({})), ClientMessage::Unknown);
        assert_eq!(ClientMessage::from_value(json!(null)), ClientMessage::Unknown);
    }

    #[test]
    fn test_fetch_query_defaults() {
        let query: FetchQuery =
            serde_json::from_value(json!({"url": "https://app.test/a.js"})).unwrap();
        let req = query.into_request();
        assert_eq!(req.method, "GET");
        assert_eq!(req.destination, Destination::Empty);
    }
}
