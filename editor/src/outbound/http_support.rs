//! Identity and response handling shared by the reqwest adapters.

use reqwest::StatusCode;

use super::element_dto::ElementsResponseDto;
use crate::domain::OsmElement;
use crate::domain::ports::ElementSourceError;

const PREVIEW_CHAR_LIMIT: usize = 160;

/// Default user agent sent upstream.
pub const DEFAULT_USER_AGENT: &str = "osm-gtfs-editor/0.1";

/// Outbound identity sent with every request.
///
/// Both public services ask clients to identify themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpIdentity {
    /// HTTP user agent.
    pub user_agent: String,
    /// `Contact` header value; omitted when `None`.
    pub contact: Option<String>,
}

impl Default for HttpIdentity {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            contact: None,
        }
    }
}

impl HttpIdentity {
    pub(crate) fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request
            .header(reqwest::header::USER_AGENT, self.user_agent.as_str())
            .header(reqwest::header::ACCEPT, "application/json");
        match &self.contact {
            Some(contact) => request.header("Contact", contact.as_str()),
            None => request,
        }
    }
}

pub(crate) fn map_transport_error(error: reqwest::Error) -> ElementSourceError {
    if error.is_timeout() {
        ElementSourceError::timeout(error.to_string())
    } else {
        ElementSourceError::transport(error.to_string())
    }
}

pub(crate) fn map_status_error(status: StatusCode, body: &[u8]) -> ElementSourceError {
    let preview = body_preview(body);
    let message = if preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {preview}", status.as_u16())
    };

    match status {
        StatusCode::TOO_MANY_REQUESTS => ElementSourceError::rate_limited(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            ElementSourceError::timeout(message)
        }
        _ if status.is_client_error() => ElementSourceError::invalid_request(message),
        _ => ElementSourceError::transport(message),
    }
}

pub(crate) fn body_preview(body: &[u8]) -> String {
    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

pub(crate) fn parse_elements(body: &[u8]) -> Result<Vec<OsmElement>, ElementSourceError> {
    let decoded: ElementsResponseDto = serde_json::from_slice(body).map_err(|error| {
        ElementSourceError::decode(format!("invalid elements JSON payload: {error}"))
    })?;
    Ok(decoded.into_domain_elements())
}
