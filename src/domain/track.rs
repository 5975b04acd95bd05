use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Jump-to markers beyond this count are dropped.
pub const MAX_MARKERS: usize = 4;

/// Stable identifier of a catalog entry.
///
/// Catalogs in the wild use both numeric and textual ids, so both are
/// accepted when deserializing; the id is always kept as text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TrackId(pub String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for TrackId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => TrackId(s),
            RawId::Number(n) => TrackId(n.to_string()),
        })
    }
}

/// A catalog entry describing one playable recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    #[serde(default)]
    pub id: TrackId,
    pub title: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default, deserialize_with = "nullable_tags")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub url: String,
    #[serde(default, alias = "coverArtUrl", skip_serializing_if = "Option::is_none")]
    pub cover_art_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_markers")]
    pub markers: Vec<f64>,
    #[serde(default, alias = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Track {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackError {
    #[error("{0} is required")]
    MissingField(&'static str),
}

/// Fields of a track that is about to be created.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewTrack {
    pub title: String,
    pub genre: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub url: String,
    pub cover_art_url: Option<String>,
    pub markers: Vec<f64>,
}

impl NewTrack {
    /// Trims text fields, drops empty optionals and sanitizes markers, then
    /// checks that title, genre and url are present.
    pub fn normalized(self) -> Result<Self, TrackError> {
        let title = self.title.trim().to_string();
        let genre = self.genre.trim().to_string();
        let url = self.url.trim().to_string();

        if title.is_empty() {
            return Err(TrackError::MissingField("title"));
        }
        if genre.is_empty() {
            return Err(TrackError::MissingField("genre"));
        }
        if url.is_empty() {
            return Err(TrackError::MissingField("url"));
        }

        Ok(Self {
            title,
            genre,
            description: non_empty(self.description),
            tags: clean_tags(self.tags),
            url,
            cover_art_url: non_empty(self.cover_art_url),
            markers: sanitize_markers(self.markers),
        })
    }
}

/// Partial update of a track. `None` leaves a field untouched; an empty
/// description or cover art URL clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackPatch {
    pub title: Option<String>,
    pub genre: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub url: Option<String>,
    pub cover_art_url: Option<String>,
    pub markers: Option<Vec<f64>>,
}

impl TrackPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(self, track: &mut Track) -> Result<(), TrackError> {
        if let Some(title) = self.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(TrackError::MissingField("title"));
            }
            track.title = title.to_string();
        }
        if let Some(genre) = self.genre {
            let genre = genre.trim();
            if genre.is_empty() {
                return Err(TrackError::MissingField("genre"));
            }
            track.genre = genre.to_string();
        }
        if let Some(url) = self.url {
            let url = url.trim();
            if url.is_empty() {
                return Err(TrackError::MissingField("url"));
            }
            track.url = url.to_string();
        }
        if self.description.is_some() {
            track.description = non_empty(self.description);
        }
        if self.cover_art_url.is_some() {
            track.cover_art_url = non_empty(self.cover_art_url);
        }
        if let Some(tags) = self.tags {
            track.tags = clean_tags(tags);
        }
        if let Some(markers) = self.markers {
            track.markers = sanitize_markers(markers);
        }
        Ok(())
    }
}

/// Splits a comma separated tag list, e.g. `"film, commercial, upbeat"`.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parses user-supplied marker offsets (seconds).
///
/// Unparseable, non-finite and negative entries are dropped and at most
/// [`MAX_MARKERS`] survive, in input order.
pub fn validate_markers<I, S>(raw: I) -> Vec<f64>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    sanitize_markers(
        raw.into_iter()
            .filter_map(|s| s.as_ref().trim().parse::<f64>().ok()),
    )
}

pub fn sanitize_markers(values: impl IntoIterator<Item = f64>) -> Vec<f64> {
    values
        .into_iter()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .take(MAX_MARKERS)
        .collect()
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn nullable_tags<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_markers<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(sanitize_markers(raw.into_iter().filter_map(|v| match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })))
}
