use std::sync::mpsc::Receiver;

use log::{debug, info, warn};
use serde::Serialize;

use crate::storage::kv::KeyValueStore;

use super::bus::EventBus;
use super::metadata::{MetadataChanged, SiteHeader, SiteMetadata};
use super::style::{StyleConfig, StyleEditError, StyleField, StyleVars};

pub const STYLE_KEY: &str = "background_style";
/// Single colour written by releases that predate the two-spot gradient.
pub const LEGACY_COLOR_KEY: &str = "background_color";
pub const TITLE_KEY: &str = "site_title";
pub const DESCRIPTION_KEY: &str = "site_description";

const NOTICE_TTL_MS: u64 = 3000;

/// Short-lived confirmation for the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub message: String,
    pub ttl_ms: u64,
}

impl Notice {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ttl_ms: NOTICE_TTL_MS,
        }
    }
}

/// Owner of the committed and draft background style and the site
/// metadata. Nothing else writes these values.
///
/// `live` is whatever the renderer should currently show: the draft while
/// editing, the committed style after a commit or rollback.
pub struct ConfigDraftManager<S: KeyValueStore> {
    store: S,
    committed: StyleConfig,
    draft: StyleConfig,
    live: StyleConfig,
    metadata: SiteMetadata,
    metadata_events: EventBus<MetadataChanged>,
}

impl<S: KeyValueStore> ConfigDraftManager<S> {
    /// Reads the persisted configuration. Anything missing or unreadable
    /// falls back to defaults.
    pub fn load(store: S) -> Self {
        let committed = load_style(&store);
        let metadata = load_metadata(&store);
        debug!("loaded site config: {committed:?}, {metadata:?}");

        Self {
            draft: committed.clone(),
            live: committed.clone(),
            committed,
            metadata,
            store,
            metadata_events: EventBus::new(),
        }
    }

    pub fn committed_style(&self) -> &StyleConfig {
        &self.committed
    }

    pub fn draft_style(&self) -> &StyleConfig {
        &self.draft
    }

    pub fn live_style(&self) -> &StyleConfig {
        &self.live
    }

    pub fn live_vars(&self) -> StyleVars {
        self.live.vars()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.draft != self.committed
    }

    pub fn metadata(&self) -> &SiteMetadata {
        &self.metadata
    }

    /// Overwrites one draft field and previews the result immediately.
    pub fn edit_draft(&mut self, field: StyleField, value: &str) -> Result<(), StyleEditError> {
        self.draft.set(field, value)?;
        self.live = self.draft.clone();
        Ok(())
    }

    /// Replaces the draft with the built-in defaults. Still needs a commit.
    pub fn reset_draft(&mut self) {
        self.draft = StyleConfig::default();
        self.live = self.draft.clone();
    }

    pub fn commit_style(&mut self) -> Notice {
        self.committed = self.draft.clone();
        match serde_json::to_string(&self.committed) {
            Ok(json) => persist(&mut self.store, STYLE_KEY, &json),
            Err(e) => warn!("could not encode background style: {e}"),
        }
        self.live = self.committed.clone();
        info!("background style committed");
        Notice::new("Background saved")
    }

    /// Throws away unsaved edits.
    pub fn rollback_style(&mut self) {
        self.draft = self.committed.clone();
        self.live = self.committed.clone();
    }

    /// Saves title and description and tells every subscribed listener.
    pub fn commit_metadata(&mut self, title: &str, description: &str) -> Notice {
        let title = title.trim().to_string();
        let description = description.trim().to_string();

        persist(&mut self.store, TITLE_KEY, &title);
        persist(&mut self.store, DESCRIPTION_KEY, &description);
        self.metadata = SiteMetadata {
            title: title.clone(),
            description: description.clone(),
        };

        let delivered = self.metadata_events.publish(MetadataChanged {
            title: Some(title),
            description: Some(description),
        });
        info!("site metadata committed, {delivered} listener(s) notified");
        Notice::new("Site details saved")
    }

    pub fn subscribe_metadata(&mut self) -> Receiver<MetadataChanged> {
        self.metadata_events.subscribe()
    }

    /// A header that starts from the current metadata and follows commits.
    pub fn header(&mut self) -> SiteHeader {
        SiteHeader::new(self.metadata.clone(), self.subscribe_metadata())
    }
}

fn read(store: &impl KeyValueStore, key: &str) -> Option<String> {
    match store.get(key) {
        Ok(value) => value,
        Err(e) => {
            warn!("could not read '{key}' from the config store: {e}");
            None
        }
    }
}

fn persist(store: &mut impl KeyValueStore, key: &str, value: &str) {
    if let Err(e) = store.set(key, value) {
        warn!("could not persist '{key}', keeping it for this session only: {e}");
    }
}

fn load_style(store: &impl KeyValueStore) -> StyleConfig {
    if let Some(raw) = read(store, STYLE_KEY) {
        match StyleConfig::from_json(&raw) {
            Ok(style) => return style,
            Err(e) => debug!("ignoring stored background style: {e}"),
        }
    }
    if let Some(raw) = read(store, LEGACY_COLOR_KEY) {
        match StyleConfig::from_legacy_color(&raw) {
            Ok(style) => {
                info!("migrated legacy background colour {}", style.color1);
                return style;
            }
            Err(e) => debug!("ignoring legacy background colour: {e}"),
        }
    }
    StyleConfig::default()
}

fn load_metadata(store: &impl KeyValueStore) -> SiteMetadata {
    let defaults = SiteMetadata::default();
    SiteMetadata {
        title: read(store, TITLE_KEY).unwrap_or(defaults.title),
        description: read(store, DESCRIPTION_KEY).unwrap_or(defaults.description),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::{DEFAULT_COLOR_2, DEFAULT_TITLE};
    use crate::storage::error::StorageError;
    use crate::storage::kv::MemoryStore;

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Internal(anyhow::anyhow!("disk on fire")))
        }
        fn set(&mut self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Internal(anyhow::anyhow!("disk on fire")))
        }
    }

    fn store_with(pairs: &[(&str, &str)]) -> MemoryStore {
        let mut store = MemoryStore::default();
        for (k, v) in pairs {
            store.set(k, v).unwrap();
        }
        store
    }

    #[test]
    fn empty_store_loads_defaults() {
        let manager = ConfigDraftManager::load(MemoryStore::default());
        assert_eq!(manager.committed_style(), &StyleConfig::default());
        assert_eq!(manager.draft_style(), manager.committed_style());
        assert_eq!(manager.live_style(), manager.committed_style());
        assert_eq!(manager.metadata(), &SiteMetadata::default());
    }

    #[test]
    fn corrupt_style_falls_back_to_defaults() {
        let manager = ConfigDraftManager::load(store_with(&[(STYLE_KEY, "{oops")]));
        assert_eq!(manager.committed_style(), &StyleConfig::default());
    }

    #[test]
    fn unreadable_store_falls_back_to_defaults() {
        let manager = ConfigDraftManager::load(BrokenStore);
        assert_eq!(manager.committed_style(), &StyleConfig::default());
        assert_eq!(manager.metadata().title, DEFAULT_TITLE);
    }

    #[test]
    fn legacy_colour_becomes_first_colour() {
        let manager = ConfigDraftManager::load(store_with(&[(LEGACY_COLOR_KEY, "#123456")]));

        let expected = StyleConfig {
            color1: "#123456".into(),
            ..StyleConfig::default()
        };
        assert_eq!(manager.committed_style(), &expected);
        assert_eq!(manager.draft_style(), &expected);
        assert_eq!(manager.committed_style().color2, DEFAULT_COLOR_2);
    }

    #[test]
    fn structured_style_wins_over_legacy_colour() {
        let manager = ConfigDraftManager::load(store_with(&[
            (LEGACY_COLOR_KEY, "#123456"),
            (STYLE_KEY, r##"{"color1":"#abcdef"}"##),
        ]));
        assert_eq!(manager.committed_style().color1, "#abcdef");
    }

    #[test]
    fn blank_legacy_colour_is_ignored() {
        let manager = ConfigDraftManager::load(store_with(&[(LEGACY_COLOR_KEY, "   ")]));
        assert_eq!(manager.committed_style(), &StyleConfig::default());
    }

    #[test]
    fn edit_previews_draft_without_touching_committed() {
        let mut manager = ConfigDraftManager::load(MemoryStore::default());

        manager.edit_draft(StyleField::Intensity, "1.5").unwrap();

        assert_eq!(manager.draft_style().intensity, 1.5);
        assert_eq!(manager.live_style().intensity, 1.5);
        assert_eq!(manager.committed_style().intensity, 1.0);
        assert!(manager.has_unsaved_changes());
    }

    #[test]
    fn last_edit_wins() {
        let mut manager = ConfigDraftManager::load(MemoryStore::default());
        manager.edit_draft(StyleField::Pos1X, "10").unwrap();
        manager.edit_draft(StyleField::Pos1X, "11").unwrap();
        manager.edit_draft(StyleField::Pos1X, "12").unwrap();
        assert_eq!(manager.draft_style().pos1x, 12.0);
    }

    #[test]
    fn rejected_edit_leaves_draft_alone() {
        let mut manager = ConfigDraftManager::load(MemoryStore::default());
        assert!(manager.edit_draft(StyleField::Pos1X, "left").is_err());
        assert!(!manager.has_unsaved_changes());
    }

    #[test]
    fn rollback_restores_committed() {
        let mut manager = ConfigDraftManager::load(MemoryStore::default());
        let before = manager.committed_style().clone();

        manager.edit_draft(StyleField::Intensity, "1.5").unwrap();
        manager.rollback_style();

        assert_eq!(manager.draft_style(), &before);
        assert_eq!(manager.live_style(), &before);
    }

    #[test]
    fn commit_persists_and_makes_rollback_a_no_op() {
        let mut manager = ConfigDraftManager::load(MemoryStore::default());
        manager.edit_draft(StyleField::Intensity, "1.5").unwrap();

        let notice = manager.commit_style();
        assert_eq!(notice.message, "Background saved");
        assert_eq!(manager.committed_style().intensity, 1.5);

        manager.rollback_style();
        assert_eq!(manager.draft_style().intensity, 1.5);
        assert_eq!(manager.live_style().intensity, 1.5);

        let stored = manager.store.get(STYLE_KEY).unwrap().unwrap();
        assert_eq!(StyleConfig::from_json(&stored).unwrap().intensity, 1.5);
    }

    #[test]
    fn committed_style_survives_reload() {
        let mut manager = ConfigDraftManager::load(MemoryStore::default());
        manager.edit_draft(StyleField::Color2, "#000").unwrap();
        manager.commit_style();

        let reloaded = ConfigDraftManager::load(manager.store);
        assert_eq!(reloaded.committed_style().color2, "#000");
    }

    #[test]
    fn failed_write_keeps_session_state() {
        let mut manager = ConfigDraftManager::load(BrokenStore);
        manager.edit_draft(StyleField::Color1, "#fff").unwrap();
        manager.commit_style();
        assert_eq!(manager.committed_style().color1, "#fff");

        manager.commit_metadata("Beats", "New stuff");
        assert_eq!(manager.metadata().title, "Beats");
    }

    #[test]
    fn metadata_commit_reaches_subscribers() {
        let mut manager = ConfigDraftManager::load(MemoryStore::default());
        let mut header = manager.header();
        let raw = manager.subscribe_metadata();

        manager.commit_metadata(" Night Sessions ", "Late recordings");

        assert!(header.refresh());
        assert_eq!(header.title(), "Night Sessions");
        assert_eq!(header.description(), "Late recordings");
        assert_eq!(
            raw.try_recv().unwrap(),
            MetadataChanged {
                title: Some("Night Sessions".into()),
                description: Some("Late recordings".into()),
            }
        );
        assert!(!header.refresh());
    }

    #[test]
    fn late_header_sees_committed_value_but_no_replay() {
        let mut manager = ConfigDraftManager::load(MemoryStore::default());
        manager.commit_metadata("First", "one");

        let mut header = manager.header();
        assert_eq!(header.title(), "First");
        assert!(!header.refresh());
    }

    #[test]
    fn metadata_survives_reload() {
        let mut manager = ConfigDraftManager::load(MemoryStore::default());
        manager.commit_metadata("Beats", "desc");

        let reloaded = ConfigDraftManager::load(manager.store);
        assert_eq!(reloaded.metadata().title, "Beats");
        assert_eq!(reloaded.metadata().description, "desc");
    }
}
