//! Content identifiers accepted by the stream endpoint.
//!
//! Movies are addressed as `tt0111161` or `kitsu:1234`, series episodes as
//! `tt0944947:1:2`, `kitsu:1234` or `kitsu:1234:5`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Kind of content requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Movie,
    Series,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Movie => "movie",
            ContentType::Series => "series",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = ContentIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(ContentType::Movie),
            "series" => Ok(ContentType::Series),
            other => Err(ContentIdError::UnsupportedType(other.to_string())),
        }
    }
}

/// Errors raised while parsing a content identifier.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContentIdError {
    #[error("unsupported content type: {0}")]
    UnsupportedType(String),

    #[error("unsupported {content_type} id: {id}")]
    UnsupportedId {
        content_type: ContentType,
        id: String,
    },
}

/// Which catalog an id belongs to, with its episode coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum ContentSource {
    Imdb {
        id: String,
        season: Option<u32>,
        episode: Option<u32>,
    },
    Kitsu {
        id: u64,
        episode: Option<u32>,
    },
}

/// A parsed, validated content identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentId {
    raw: String,
    content_type: ContentType,
    source: ContentSource,
}

impl ContentId {
    /// Parse a raw id for the given content type.
    pub fn parse(content_type: ContentType, raw: &str) -> Result<Self, ContentIdError> {
        let unsupported = || ContentIdError::UnsupportedId {
            content_type,
            id: raw.to_string(),
        };
        let parts: Vec<&str> = raw.split(':').collect();

        let source = match (content_type, parts.as_slice()) {
            (ContentType::Movie, [imdb]) if is_imdb_id(imdb) => ContentSource::Imdb {
                id: imdb.to_string(),
                season: None,
                episode: None,
            },
            (ContentType::Series, [imdb, season, episode]) if is_imdb_id(imdb) => {
                ContentSource::Imdb {
                    id: imdb.to_string(),
                    season: Some(parse_number(season).ok_or_else(unsupported)?),
                    episode: Some(parse_number(episode).ok_or_else(unsupported)?),
                }
            }
            (_, ["kitsu", id]) => ContentSource::Kitsu {
                id: parse_number(id).ok_or_else(unsupported)?,
                episode: None,
            },
            (ContentType::Series, ["kitsu", id, episode]) => ContentSource::Kitsu {
                id: parse_number(id).ok_or_else(unsupported)?,
                episode: Some(parse_number(episode).ok_or_else(unsupported)?),
            },
            _ => return Err(unsupported()),
        };

        Ok(Self {
            raw: raw.to_string(),
            content_type,
            source,
        })
    }

    /// Parse from the raw type segment and id of a request path.
    pub fn from_request(content_type: &str, raw: &str) -> Result<Self, ContentIdError> {
        Self::parse(content_type.parse()?, raw)
    }

    /// Key used for coalescing and for the stream cache tier.
    pub fn key(&self) -> &str {
        &self.raw
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn source(&self) -> &ContentSource {
        &self.source
    }

    /// IMDb id, when the content comes from IMDb.
    pub fn imdb_id(&self) -> Option<&str> {
        match &self.source {
            ContentSource::Imdb { id, .. } => Some(id),
            ContentSource::Kitsu { .. } => None,
        }
    }

    pub fn season(&self) -> Option<u32> {
        match &self.source {
            ContentSource::Imdb { season, .. } => *season,
            ContentSource::Kitsu { .. } => None,
        }
    }

    pub fn episode(&self) -> Option<u32> {
        match &self.source {
            ContentSource::Imdb { episode, .. } | ContentSource::Kitsu { episode, .. } => *episode,
        }
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.content_type, self.raw)
    }
}

fn is_imdb_id(s: &str) -> bool {
    s.len() > 2 && s.starts_with("tt") && s[2..].bytes().all(|b| b.is_ascii_digit())
}

fn parse_number<T: FromStr>(s: &str) -> Option<T> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
