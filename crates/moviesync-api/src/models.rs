// ── Wire types ──
//
// JSON shapes exchanged with the movie server, both over HTTP and the
// push channel. Field names follow the server (`_id`, camelCase).

use serde::{Deserialize, Serialize};

/// A movie record as the server and local cache store it.
///
/// `id` is absent until the server assigns one on create. Two movies are
/// the same entity only when both carry an id and the ids are equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub investment: f64,
    /// `DD.MM.YYYY`, never parsed here.
    pub release_date: String,
    pub has_sequel: bool,
}

impl Movie {
    /// A new, unsaved movie.
    pub fn new(
        title: impl Into<String>,
        investment: f64,
        release_date: impl Into<String>,
        has_sequel: bool,
    ) -> Self {
        Self {
            id: None,
            title: title.into(),
            investment,
            release_date: release_date.into(),
            has_sequel,
        }
    }

    /// Same movie with a server-assigned id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Entity identity: both ids present and equal.
    pub fn same_entity(&self, other: &Movie) -> bool {
        matches!((&self.id, &other.id), (Some(a), Some(b)) if a == b)
    }
}

/// Inbound push envelope: `{ "type": "...", "payload": ... }`.
///
/// The payload stays raw JSON until the type is known, so unknown message
/// kinds with arbitrary payloads still parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Classified push message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushKind {
    Created,
    Updated,
    Other,
}

impl PushMessage {
    pub fn kind(&self) -> PushKind {
        match self.kind.as_str() {
            "created" => PushKind::Created,
            "updated" => PushKind::Updated,
            _ => PushKind::Other,
        }
    }

    /// Decode the payload as a movie.
    pub fn movie(&self) -> Result<Movie, serde_json::Error> {
        Movie::deserialize(&self.payload)
    }
}

/// Outbound authorization frame, always the first frame on a new channel.
#[derive(Debug, Serialize)]
pub(crate) struct AuthorizationFrame<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub payload: AuthorizationPayload<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AuthorizationPayload<'a> {
    pub token: &'a str,
}

impl<'a> AuthorizationFrame<'a> {
    pub(crate) fn new(token: &'a str) -> Self {
        Self {
            kind: "authorization",
            payload: AuthorizationPayload { token },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn movie_uses_server_field_names() {
        let movie = Movie::new("Alien", 11.0, "25.05.1979", true).with_id("m1");
        let value = serde_json::to_value(&movie).unwrap();
        assert_eq!(
            value,
            json!({
                "_id": "m1",
                "title": "Alien",
                "investment": 11.0,
                "releaseDate": "25.05.1979",
                "hasSequel": true
            })
        );
    }

    #[test]
    fn unsaved_movie_omits_id() {
        let movie = Movie::new("A", 100.0, "01.01.2020", false);
        let value = serde_json::to_value(&movie).unwrap();
        assert!(value.get("_id").is_none());
    }

    #[test]
    fn identity_requires_both_ids() {
        let a = Movie::new("A", 1.0, "01.01.2020", false);
        let b = a.clone();
        assert!(!a.same_entity(&b), "unsaved movies never match");

        let a1 = a.clone().with_id("1");
        let b1 = b.with_id("1");
        assert!(a1.same_entity(&b1));
        assert!(!a1.same_entity(&a));
    }

    #[test]
    fn push_message_classifies_type() {
        let msg: PushMessage = serde_json::from_value(json!({
            "type": "updated",
            "payload": {
                "_id": "x1",
                "title": "B",
                "investment": 200,
                "releaseDate": "01.01.2020",
                "hasSequel": true
            }
        }))
        .unwrap();

        assert_eq!(msg.kind(), PushKind::Updated);
        let movie = msg.movie().unwrap();
        assert_eq!(movie.id(), Some("x1"));
        assert!((movie.investment - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_push_type_parses_with_any_payload() {
        let msg: PushMessage =
            serde_json::from_value(json!({ "type": "unknown", "payload": { "x": 1 } })).unwrap();
        assert_eq!(msg.kind(), PushKind::Other);
        assert!(msg.movie().is_err());
    }

    #[test]
    fn authorization_frame_shape() {
        let frame = AuthorizationFrame::new("secret");
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            json!({ "type": "authorization", "payload": { "token": "secret" } })
        );
    }
}
