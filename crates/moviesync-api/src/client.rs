// Movie record HTTP client
//
// Wraps `reqwest::Client` with endpoint URL construction, bearer
// authorization, and status/body mapping. No caching and no retries:
// write-through and retry policy belong to the caller.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::Movie;
use crate::transport::TransportConfig;

const MOVIE_PATH: &str = "api/movie";

/// Raw HTTP client for the movie record endpoints.
pub struct MovieClient {
    http: reqwest::Client,
    base_url: Url,
}

impl MovieClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the server root (e.g. `http://localhost:3000`).
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The server base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// `{base}/api/movie`
    pub(crate) fn movies_url(&self) -> Result<Url, Error> {
        let full = format!("{}/{MOVIE_PATH}", self.base_url.as_str().trim_end_matches('/'));
        Ok(Url::parse(&full)?)
    }

    /// `{base}/api/movie/{id}`
    pub(crate) fn movie_url(&self, id: &str) -> Result<Url, Error> {
        let mut url = self.movies_url()?;
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .push(id);
        Ok(url)
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// `GET /api/movie`
    pub async fn list_movies(&self, token: &SecretString) -> Result<Vec<Movie>, Error> {
        let url = self.movies_url()?;
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        parse_json(resp).await
    }

    /// `POST /api/movie` -- the response carries the server-assigned id.
    pub async fn create_movie(&self, token: &SecretString, movie: &Movie) -> Result<Movie, Error> {
        let url = self.movies_url()?;
        debug!("POST {}", url);
        self.send_json(self.http.post(url), token, movie).await
    }

    /// `PUT /api/movie/{id}`
    pub async fn update_movie(&self, token: &SecretString, movie: &Movie) -> Result<Movie, Error> {
        let id = movie.id().ok_or(Error::MissingId { operation: "update" })?;
        let url = self.movie_url(id)?;
        debug!("PUT {}", url);
        self.send_json(self.http.put(url), token, movie).await
    }

    /// `DELETE /api/movie/{id}` -- the response body is ignored.
    pub async fn delete_movie(&self, token: &SecretString, id: &str) -> Result<(), Error> {
        let url = self.movie_url(id)?;
        debug!("DELETE {}", url);

        let resp = self
            .http
            .delete(url)
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        check_status(resp).await.map(drop)
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
        token: &SecretString,
        body: &impl Serialize,
    ) -> Result<T, Error> {
        let resp = builder
            .bearer_auth(token.expose_secret())
            .json(body)
            .send()
            .await?;

        parse_json(resp).await
    }
}

/// Map auth and non-success statuses to errors, passing success through.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = resp.status();

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(Error::Authentication {
            message: format!("server rejected credential (HTTP {})", status.as_u16()),
        });
    }

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Status {
            status: status.as_u16(),
            body,
        });
    }

    Ok(resp)
}

/// Check the status, then decode the body, keeping it on failure.
async fn parse_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let resp = check_status(resp).await?;
    let body = resp.text().await?;

    serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body,
    })
}
