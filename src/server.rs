//! Plain-text HTTP query interface using Axum
//!
//! Overlays poll these endpoints for one value at a time:
//!
//! - `GET /numberofmessages`
//! - `GET /{index}/user`, `GET /{index}/message`
//! - `GET /numberofevents`
//! - `GET /event/{index}/{eventname|time|location|description|bannerurl}`
//!
//! Every response is `text/plain`. Errors are a status code plus one fixed
//! line of text.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::SecondsFormat;
use thiserror::Error;
use tower_http::trace::TraceLayer;

use crate::error::{RelayError, Result};
use crate::model::Event;
use crate::service::RelayService;

/// Body served for a message without text (attachments, embeds)
pub const EMPTY_MESSAGE_PLACEHOLDER: &str = "[Empty message content]";

/// Request errors, flattened to status code and text for the caller
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryError {
    #[error("Invalid request format. Use /{{index}}/user or /{{index}}/message")]
    MessagePathFormat,

    #[error("Invalid request format. Use /event/{{index}}/{{field}}")]
    EventPathFormat,

    #[error("Invalid message index")]
    InvalidMessageIndex,

    #[error("Invalid event index")]
    InvalidEventIndex,

    #[error("Message index out of range")]
    MessageOutOfRange,

    #[error("Event index out of range")]
    EventOutOfRange,

    #[error("Invalid field requested. Use eventname, time, location, description, or bannerurl")]
    UnknownEventField,

    #[error("This event has no image")]
    NoImage,

    #[error("404 page not found")]
    NoRoute,
}

impl QueryError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MessagePathFormat
            | Self::EventPathFormat
            | Self::InvalidMessageIndex
            | Self::InvalidEventIndex
            | Self::UnknownEventField => StatusCode::BAD_REQUEST,
            Self::MessageOutOfRange | Self::EventOutOfRange | Self::NoImage | Self::NoRoute => {
                StatusCode::NOT_FOUND
            }
        }
    }
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

/// Fields an overlay can ask for on an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventField {
    Name,
    Time,
    Location,
    Description,
    BannerUrl,
}

impl std::str::FromStr for EventField {
    type Err = QueryError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "eventname" => Ok(Self::Name),
            "time" => Ok(Self::Time),
            "location" => Ok(Self::Location),
            "description" => Ok(Self::Description),
            "bannerurl" => Ok(Self::BannerUrl),
            _ => Err(QueryError::UnknownEventField),
        }
    }
}

impl EventField {
    /// Render this field of `event` as the response body
    pub fn render(self, event: &Event) -> std::result::Result<String, QueryError> {
        match self {
            Self::Name => Ok(event.name.clone()),
            Self::Time => Ok(event.start_time.to_rfc3339_opts(SecondsFormat::Secs, true)),
            Self::Location => Ok(event.location.clone()),
            Self::Description => Ok(event.description.clone()),
            Self::BannerUrl => event.image_url.clone().ok_or(QueryError::NoImage),
        }
    }
}

/// Which halves of the API are mounted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteToggles {
    pub messages: bool,
    pub events: bool,
}

/// Shared handler state
pub struct ServerState {
    service: Arc<RelayService>,
    routes: RouteToggles,
}

/// Query server bound to one address
pub struct OverlayServer {
    addr: String,
    state: Arc<ServerState>,
}

impl OverlayServer {
    pub fn new(addr: impl Into<String>, service: Arc<RelayService>, routes: RouteToggles) -> Self {
        Self {
            addr: addr.into(),
            state: Arc::new(ServerState { service, routes }),
        }
    }

    /// Build the router
    pub fn router(&self) -> Router {
        let mut router = Router::new();
        if self.state.routes.messages {
            router = router.route("/numberofmessages", get(number_of_messages));
        }
        if self.state.routes.events {
            router = router.route("/numberofevents", get(number_of_events));
        }

        router
            .fallback(dispatch)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind and serve until the process exits
    pub async fn run(&self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr)
            .await
            .map_err(RelayError::Io)?;

        tracing::info!("Starting HTTP server on {}", self.addr);

        axum::serve(listener, self.router())
            .await
            .map_err(|e| RelayError::Internal(e.to_string()))?;

        Ok(())
    }
}

async fn number_of_messages(State(state): State<Arc<ServerState>>) -> String {
    state.service.message_count().await.to_string()
}

async fn number_of_events(State(state): State<Arc<ServerState>>) -> String {
    state.service.event_count().await.to_string()
}

/// Route index paths the way a prefix mux would: `/event/...` to events
/// when enabled, everything else to messages when enabled
async fn dispatch(State(state): State<Arc<ServerState>>, uri: Uri) -> Response {
    let path = uri.path();

    if state.routes.events && path.starts_with("/event/") {
        return event_request(&state.service, path).await.into_response();
    }
    if state.routes.messages {
        return message_request(&state.service, path).await.into_response();
    }
    QueryError::NoRoute.into_response()
}

fn segments(path: &str) -> Vec<&str> {
    path.trim_matches('/').split('/').collect()
}

/// Parse an index; negative values are valid integers that no item has
fn parse_index(raw: &str, invalid: QueryError) -> std::result::Result<Option<usize>, QueryError> {
    let index: i64 = raw.parse().map_err(|_| invalid)?;
    Ok(usize::try_from(index).ok())
}

async fn message_request(
    service: &RelayService,
    path: &str,
) -> std::result::Result<String, QueryError> {
    let parts = segments(path);
    let [index, field] = parts.as_slice() else {
        return Err(QueryError::MessagePathFormat);
    };
    if *field != "user" && *field != "message" {
        return Err(QueryError::MessagePathFormat);
    }

    let index = parse_index(index, QueryError::InvalidMessageIndex)?
        .ok_or(QueryError::MessageOutOfRange)?;

    if *field == "user" {
        return service
            .message_user(index)
            .await
            .ok_or(QueryError::MessageOutOfRange);
    }

    let content = service
        .resolved_message(index)
        .await
        .ok_or(QueryError::MessageOutOfRange)?;
    if content.is_empty() {
        return Ok(EMPTY_MESSAGE_PLACEHOLDER.to_string());
    }
    Ok(content)
}

async fn event_request(
    service: &RelayService,
    path: &str,
) -> std::result::Result<String, QueryError> {
    let parts = segments(path);
    let ["event", index, field] = parts.as_slice() else {
        return Err(QueryError::EventPathFormat);
    };

    let index = parse_index(index, QueryError::InvalidEventIndex)?
        .ok_or(QueryError::EventOutOfRange)?;
    let event = service
        .event(index)
        .await
        .ok_or(QueryError::EventOutOfRange)?;

    field.parse::<EventField>()?.render(&event)
}
