//! Typed client for the read-only Modrinth endpoints used by packsync.
//!
//! [`CollectionSource`] and [`ProjectLookup`] decouple orchestration from the
//! HTTP transport. Tests use scripted implementations that never touch the
//! network.

use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::core::types::{ProjectInfo, ProjectRef};

/// Slugs that are safe to use as a file stem under the mods directory.
static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^[\w!@$()`.+,"\-']{3,64}$"#).unwrap());

/// A remote collection: display metadata plus ordered project ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub name: Option<String>,
    pub description: Option<String>,
    pub projects: Vec<ProjectRef>,
}

/// Failure looking up one project.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("project not found")]
    NotFound,
    #[error("{0}")]
    Transport(String),
    #[error("{0}")]
    Malformed(String),
}

/// Source of ordered project ids for a collection.
pub trait CollectionSource {
    fn fetch_collection(&self, collection_id: &str) -> Result<Collection>;
}

/// Lookup of canonical slug/title for a project id.
pub trait ProjectLookup {
    fn fetch_project(&self, id: &str) -> Result<ProjectInfo, LookupError>;
}

/// Blocking client for `api.modrinth.com`.
pub struct ModrinthClient {
    agent: ureq::Agent,
    api_base: String,
    user_agent: String,
}

impl ModrinthClient {
    pub fn new(api_base: &str, user_agent: &str, timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self {
            agent,
            api_base: api_base.trim_end_matches('/').to_string(),
            user_agent: user_agent.to_string(),
        }
    }

    fn get_text(&self, url: &str) -> Result<String, ureq::Error> {
        let mut response = self
            .agent
            .get(url)
            .header("User-Agent", &self.user_agent)
            .call()?;
        response.body_mut().read_to_string()
    }
}

impl CollectionSource for ModrinthClient {
    #[instrument(skip(self))]
    fn fetch_collection(&self, collection_id: &str) -> Result<Collection> {
        let url = format!("{}/v3/collection/{}", self.api_base, collection_id);
        debug!(%url, "fetching collection");
        let body = match self.get_text(&url) {
            Ok(body) => body,
            Err(ureq::Error::StatusCode(404)) => {
                return Err(anyhow!("collection {collection_id} not found"));
            }
            Err(err) => {
                return Err(err).with_context(|| format!("fetch collection {collection_id}"));
            }
        };
        parse_collection(&body).with_context(|| format!("parse collection {collection_id}"))
    }
}

impl ProjectLookup for ModrinthClient {
    #[instrument(skip(self))]
    fn fetch_project(&self, id: &str) -> Result<ProjectInfo, LookupError> {
        let url = format!("{}/v2/project/{}", self.api_base, id);
        match self.get_text(&url) {
            Ok(body) => parse_project(id, &body),
            Err(ureq::Error::StatusCode(404)) => Err(LookupError::NotFound),
            Err(err) => {
                warn!(err = %err, "project lookup failed");
                Err(LookupError::Transport(err.to_string()))
            }
        }
    }
}

#[derive(Deserialize)]
struct CollectionBody {
    name: Option<String>,
    description: Option<String>,
    projects: Vec<String>,
}

#[derive(Deserialize)]
struct ProjectBody {
    slug: Option<String>,
    title: Option<String>,
}

/// Parse a `/v3/collection/{id}` response body. Project order is preserved.
pub fn parse_collection(body: &str) -> Result<Collection> {
    let raw: CollectionBody = serde_json::from_str(body).context("decode collection json")?;
    Ok(Collection {
        name: raw.name,
        description: raw.description,
        projects: raw.projects.into_iter().map(ProjectRef::new).collect(),
    })
}

/// Parse a `/v2/project/{id}` response body into [`ProjectInfo`].
pub fn parse_project(id: &str, body: &str) -> Result<ProjectInfo, LookupError> {
    let raw: ProjectBody = serde_json::from_str(body)
        .map_err(|err| LookupError::Malformed(format!("decode project json: {err}")))?;
    let slug = required(raw.slug, "slug")?;
    let title = required(raw.title, "title")?;
    if !is_valid_slug(&slug) {
        return Err(LookupError::Malformed(format!("invalid slug {slug:?}")));
    }
    Ok(ProjectInfo {
        id: id.to_string(),
        slug,
        title,
    })
}

pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_RE.is_match(slug)
}

fn required(value: Option<String>, field: &str) -> Result<String, LookupError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(LookupError::Malformed(format!("missing field `{field}`"))),
    }
}
