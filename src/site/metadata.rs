use std::sync::mpsc::Receiver;

use serde::{Deserialize, Serialize};

pub const DEFAULT_TITLE: &str = "Audio Portfolio";
pub const DEFAULT_DESCRIPTION: &str = "Showcasing creative audio work and musical compositions";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteMetadata {
    pub title: String,
    pub description: String,
}

impl Default for SiteMetadata {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
        }
    }
}

/// Announced after site metadata has been committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataChanged {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Page header kept up to date from metadata events.
pub struct SiteHeader {
    metadata: SiteMetadata,
    events: Receiver<MetadataChanged>,
}

impl SiteHeader {
    pub fn new(initial: SiteMetadata, events: Receiver<MetadataChanged>) -> Self {
        Self {
            metadata: initial,
            events,
        }
    }

    /// Applies every pending change. Returns whether anything changed.
    pub fn refresh(&mut self) -> bool {
        let mut changed = false;
        for event in self.events.try_iter() {
            if let Some(title) = event.title {
                self.metadata.title = title;
                changed = true;
            }
            if let Some(description) = event.description {
                self.metadata.description = description;
                changed = true;
            }
        }
        changed
    }

    pub fn title(&self) -> &str {
        &self.metadata.title
    }

    pub fn description(&self) -> &str {
        &self.metadata.description
    }
}
