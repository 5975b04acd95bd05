use anyhow::anyhow;
use log::info;
use rouille::{Request, Response};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{
    config::{Config, HttpConfig},
    domain::track::Track,
    filter::FilterSelection,
    http::error::ApiError,
    playback::{SourceCandidate, fallback_sources, format_time},
    site::{ConfigDraftManager, Notice, SiteHeader, StyleConfig, StyleField, StyleVars},
    storage::{
        assets::AssetStore,
        auth::{AuthService, LocalAuth, User},
        catalog::CatalogSource,
        error::StorageError,
        kv::SettingsStore,
    },
    view::{CatalogView, LoadState},
};

/// Everything the host serves, behind one lock.
///
/// Reads are public. Style and site changes need the local session that
/// `soundfolio login` or `POST /api/login` opens.
pub struct SiteState {
    pub catalog: CatalogSource,
    pub config: ConfigDraftManager<SettingsStore>,
    pub header: SiteHeader,
    pub assets: AssetStore,
    pub auth: LocalAuth,
}

impl SiteState {
    pub fn new(
        catalog: CatalogSource,
        settings: SettingsStore,
        assets: AssetStore,
        auth: LocalAuth,
    ) -> Self {
        let mut config = ConfigDraftManager::load(settings);
        let header = config.header();
        Self {
            catalog,
            config,
            header,
            assets,
            auth,
        }
    }

    pub fn from_config(cfg: &Config) -> Result<Self, StorageError> {
        Ok(Self::new(
            CatalogSource::from_config(cfg)?,
            SettingsStore::new(&cfg.database)?,
            AssetStore::new(&cfg.catalog.assets_dir),
            LocalAuth::new(&cfg.database)?,
        ))
    }

    fn require_user(&self) -> Result<User, ApiError> {
        self.auth
            .current_user()?
            .ok_or_else(|| ApiError::Unauthorized("log in to edit the site".into()))
    }
}

pub struct HttpServer {
    state: Arc<Mutex<SiteState>>,
    pub config: HttpConfig,
}

impl HttpServer {
    pub fn new(state: SiteState, config: HttpConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            config,
        }
    }

    pub fn run(self) {
        let addr = format!("{}:{}", self.config.bind_addr, self.config.port);
        rouille::start_server(addr, move |request| self.handle_request(request));
    }

    fn handle_request(&self, request: &Request) -> Response {
        Self::log_request(request);

        let response = rouille::router!(request,
            (GET) (/api/tracks) => {
                self.respond(|state| Self::handle_list_tracks(request, state))
            },
            (GET) (/api/site) => {
                self.respond(Self::handle_get_site)
            },
            (POST) (/api/login) => {
                self.respond(|state| Self::handle_login(request, state))
            },
            (POST) (/api/logout) => {
                self.respond(Self::handle_logout)
            },
            (GET) (/api/session) => {
                self.respond(|state| Ok(Response::json(&SessionResponse {
                    user: state.auth.current_user()?,
                })))
            },
            (POST) (/api/style/draft) => {
                self.respond_signed_in(|state| Self::handle_edit_draft(request, state))
            },
            (POST) (/api/style/commit) => {
                self.respond_signed_in(|state| Ok(Response::json(&state.config.commit_style())))
            },
            (POST) (/api/style/rollback) => {
                self.respond_signed_in(Self::handle_rollback)
            },
            (POST) (/api/site) => {
                self.respond_signed_in(|state| Self::handle_commit_site(request, state))
            },
            (GET) (/assets/{kind: String}/{name: String}) => {
                self.respond(|state| Self::handle_get_asset(&kind, &name, state))
            },
            _ => {
                if request.method() == "GET" && request.url() == "/style.css" {
                    self.respond(Self::handle_style_css)
                } else {
                    Response::empty_404()
                }
            }
        );

        info!("Response: {} {}", request.method(), response.status_code);
        response
    }

    fn log_request(request: &Request) {
        info!("{} {}", request.method(), request.url());
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, SiteState>, ApiError> {
        self.state.lock().map_err(|e| {
            StorageError::Internal(anyhow!("Could not access site state under lock: {e}")).into()
        })
    }

    fn respond<F>(&self, handler: F) -> Response
    where
        F: FnOnce(&mut SiteState) -> Result<Response, ApiError>,
    {
        let result = self
            .lock_state()
            .and_then(|mut state| handler(&mut *state));
        match result {
            Ok(r) => r,
            Err(e) => e.into_response(),
        }
    }

    /// Like `respond`, but answers 401 unless someone is logged in.
    fn respond_signed_in<F>(&self, handler: F) -> Response
    where
        F: FnOnce(&mut SiteState) -> Result<Response, ApiError>,
    {
        self.respond(|state| {
            let user = state.require_user()?;
            log::debug!("{} is editing the site", user.email);
            handler(state)
        })
    }

    fn handle_login(request: &Request, state: &mut SiteState) -> Result<Response, ApiError> {
        let body: Credentials = rouille::input::json_input(request)
            .map_err(|e| ApiError::BadRequest(format!("invalid login: {e}")))?;
        let user = state.auth.login(&body.email, &body.password)?;
        Ok(Response::json(&SessionResponse { user: Some(user) }))
    }

    fn handle_logout(state: &mut SiteState) -> Result<Response, ApiError> {
        state.auth.logout()?;
        Ok(Response::json(&SessionResponse { user: None }))
    }

    fn handle_list_tracks(request: &Request, state: &mut SiteState) -> Result<Response, ApiError> {
        let mut view = CatalogView::new();
        view.finish_load(state.catalog.load());

        if let Some(genre) = request.get_param("genre") {
            view.select_genre(&genre);
        }
        if let Some(tag) = request.get_param("tag") {
            view.select_tag(&tag);
        }

        Ok(Response::json(&TracksResponse::from_view(&view)))
    }

    fn handle_get_site(state: &mut SiteState) -> Result<Response, ApiError> {
        state.header.refresh();
        let config = &state.config;

        Ok(Response::json(&SiteResponse {
            title: state.header.title().to_string(),
            description: state.header.description().to_string(),
            committed: config.committed_style().clone(),
            draft: config.draft_style().clone(),
            live: config.live_style().clone(),
            unsaved_changes: config.has_unsaved_changes(),
            vars: config.live_vars(),
        }))
    }

    fn handle_style_css(state: &mut SiteState) -> Result<Response, ApiError> {
        Ok(Response::text(state.config.live_vars().to_css())
            .with_unique_header("Content-Type", "text/css; charset=utf-8"))
    }

    fn handle_edit_draft(request: &Request, state: &mut SiteState) -> Result<Response, ApiError> {
        let edit: DraftEdit = rouille::input::json_input(request)
            .map_err(|e| ApiError::BadRequest(format!("invalid draft edit: {e}")))?;
        let field: StyleField = edit.field.parse()?;
        let value = match edit.value {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };

        state.config.edit_draft(field, &value)?;
        Ok(Response::json(state.config.draft_style()))
    }

    fn handle_rollback(state: &mut SiteState) -> Result<Response, ApiError> {
        state.config.rollback_style();
        Ok(Response::json(state.config.committed_style()))
    }

    fn handle_commit_site(request: &Request, state: &mut SiteState) -> Result<Response, ApiError> {
        let body: SiteUpdate = rouille::input::json_input(request)
            .map_err(|e| ApiError::BadRequest(format!("invalid site details: {e}")))?;
        let notice: Notice = state.config.commit_metadata(&body.title, &body.description);
        Ok(Response::json(&notice))
    }

    fn handle_get_asset(kind: &str, name: &str, state: &mut SiteState) -> Result<Response, ApiError> {
        let path = state
            .assets
            .resolve(kind, name)
            .ok_or_else(|| ApiError::NotFound(format!("asset {kind}/{name} not found")))?;

        let file = match std::fs::File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ApiError::NotFound(format!("asset {kind}/{name} not found")));
            }
            Err(e) => return Err(StorageError::Fs(e).into()),
        };
        let mime = mime_guess::from_path(&path).first_or_octet_stream().to_string();
        log::debug!("ASSET {kind}/{name} -> {}, MIME type: {mime}", path.display());

        Ok(Response::from_file(mime, file))
    }
}

#[derive(Deserialize)]
struct DraftEdit {
    field: String,
    value: serde_json::Value,
}

#[derive(Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

#[derive(Serialize)]
struct SessionResponse {
    user: Option<User>,
}

#[derive(Deserialize)]
struct SiteUpdate {
    title: String,
    description: String,
}

#[derive(Serialize)]
struct TrackResponse<'a> {
    #[serde(flatten)]
    track: &'a Track,
    created: String,
    marker_labels: Vec<String>,
    sources: Vec<SourceCandidate>,
}

impl<'a> TrackResponse<'a> {
    fn from_domain(track: &'a Track) -> Self {
        Self {
            track,
            created: track.created_at.format("%Y-%m-%d").to_string(),
            marker_labels: track.markers.iter().map(|m| format_time(*m)).collect(),
            sources: fallback_sources(&track.url),
        }
    }
}

#[derive(Serialize)]
struct TracksResponse<'a> {
    tracks: Vec<TrackResponse<'a>>,
    selection: &'a FilterSelection,
    genres: Vec<String>,
    tags: Vec<String>,
    status: &'a LoadState,
    error: Option<&'a str>,
}

impl<'a> TracksResponse<'a> {
    fn from_view(view: &'a CatalogView) -> Self {
        Self {
            tracks: view
                .visible()
                .into_iter()
                .map(TrackResponse::from_domain)
                .collect(),
            selection: view.selection(),
            genres: view.genre_controls().unwrap_or_default(),
            tags: view.tag_controls().unwrap_or_default(),
            status: view.load_state(),
            error: view.error_message(),
        }
    }
}

#[derive(Serialize)]
struct SiteResponse {
    title: String,
    description: String,
    committed: StyleConfig,
    draft: StyleConfig,
    live: StyleConfig,
    unsaved_changes: bool,
    vars: StyleVars,
}

#[cfg(test)]
pub fn parse_json_response<T: serde::de::DeserializeOwned>(
    response: rouille::Response,
) -> anyhow::Result<T> {
    Ok(serde_json::from_reader(
        response.data.into_reader_and_size().0,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::track::NewTrack,
        storage::{
            assets::AssetKind,
            catalog::{CatalogService, tests::setup_catalog},
            schema,
        },
    };

    use rouille::Request;
    use rusqlite::Connection;
    use serde_json::Value;
    use std::{fs, io::Read, path::Path};
    use tempfile::{TempDir, tempdir};

    pub fn parse_text_response(response: rouille::Response) -> String {
        let mut buf = String::new();
        let mut reader = response.data.into_reader_and_size().0;
        reader.read_to_string(&mut buf).unwrap();
        buf
    }

    fn json_post(url: &str, body: &str) -> Request {
        Request::fake_http(
            "POST",
            url,
            vec![("Content-Type".to_owned(), "application/json".to_owned())],
            body.as_bytes().to_vec(),
        )
    }

    fn settings() -> anyhow::Result<SettingsStore> {
        let conn = Connection::open_in_memory()?;
        schema::init(&conn)?;
        Ok(SettingsStore::from_existing_conn(conn))
    }

    const ADMIN: &str = "admin@example.com";
    const PASSWORD: &str = "secret1";

    /// An account that is already logged in.
    fn signed_in() -> anyhow::Result<LocalAuth> {
        let conn = Connection::open_in_memory()?;
        schema::init(&conn)?;
        let mut auth = LocalAuth::from_existing_conn(conn);
        auth.signup(ADMIN, PASSWORD)?;
        Ok(auth)
    }

    fn create_server(catalog: CatalogSource, assets_dir: &Path) -> anyhow::Result<HttpServer> {
        Ok(HttpServer::new(
            SiteState::new(catalog, settings()?, AssetStore::new(assets_dir), signed_in()?),
            HttpConfig {
                bind_addr: "127.0.0.1".to_string(),
                port: 8080,
            },
        ))
    }

    fn create_server_with_tracks(dir: &TempDir) -> anyhow::Result<HttpServer> {
        let mut catalog = setup_catalog(dir.path())?;
        for (title, genre, tags) in [
            ("Dawn", "Ambient", vec!["calm"]),
            ("Drive", "Lofi", vec!["night", "calm"]),
            ("Pulse", "Lofi", vec!["upbeat"]),
        ] {
            catalog.create_track(NewTrack {
                title: title.into(),
                genre: genre.into(),
                tags: tags.into_iter().map(String::from).collect(),
                url: format!("/assets/audio/{title}.ogg"),
                markers: vec![75.0],
                ..NewTrack::default()
            })?;
        }
        create_server(CatalogSource::Live(catalog), dir.path())
    }

    fn titles(body: &Value) -> Vec<String> {
        body["tracks"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["title"].as_str().unwrap().to_string())
            .collect()
    }

    // --------------------------------------------------
    // tracks
    // --------------------------------------------------

    #[test]
    fn test_http_list_tracks() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let server = create_server_with_tracks(&dir)?;

        let request = Request::fake_http("GET", "/api/tracks", vec![], vec![]);
        let response = server.handle_request(&request);

        assert_eq!(response.status_code, 200);
        let body: Value = parse_json_response(response)?;

        assert_eq!(titles(&body).len(), 3);
        assert_eq!(body["genres"][0], "All");
        assert_eq!(body["error"], Value::Null);

        let first = &body["tracks"][0];
        assert_eq!(first["sources"][0]["mime"], "audio/ogg");
        assert_eq!(first["sources"].as_array().unwrap().len(), 3);
        assert_eq!(first["marker_labels"][0], "1:15");

        Ok(())
    }

    #[test]
    fn test_http_list_tracks_filtered() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let server = create_server_with_tracks(&dir)?;

        let request = Request::fake_http("GET", "/api/tracks?genre=Lofi&tag=calm", vec![], vec![]);
        let body: Value = parse_json_response(server.handle_request(&request))?;

        assert_eq!(titles(&body), vec!["Drive"]);
        assert_eq!(body["selection"]["selected_genre"], "Lofi");

        Ok(())
    }

    #[test]
    fn test_http_list_tracks_catalog_failure() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let server = create_server(
            CatalogSource::Static(dir.path().join("missing.json")),
            dir.path(),
        )?;

        let request = Request::fake_http("GET", "/api/tracks?genre=Lofi", vec![], vec![]);
        let response = server.handle_request(&request);

        assert_eq!(response.status_code, 200);
        let body: Value = parse_json_response(response)?;

        assert!(titles(&body).is_empty());
        assert_eq!(body["error"], "Failed to load tracks. Please try again.");
        assert_eq!(body["genres"].as_array().unwrap().len(), 0);
        assert_eq!(body["tags"].as_array().unwrap().len(), 0);

        Ok(())
    }

    // --------------------------------------------------
    // style + metadata
    // --------------------------------------------------

    #[test]
    fn test_http_draft_commit_rollback() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let server = create_server_with_tracks(&dir)?;

        let response = server.handle_request(&json_post(
            "/api/style/draft",
            r##"{"field": "color1", "value": "#112233"}"##,
        ));
        assert_eq!(response.status_code, 200);

        let css = parse_text_response(
            server.handle_request(&Request::fake_http("GET", "/style.css", vec![], vec![])),
        );
        assert!(css.contains("--bg-color-1: #112233;"));

        let response = server.handle_request(&json_post("/api/style/rollback", ""));
        let committed: StyleConfig = parse_json_response(response)?;
        assert_eq!(committed.color1, "#667eea");

        server.handle_request(&json_post(
            "/api/style/draft",
            r#"{"field": "intensity", "value": 1.5}"#,
        ));
        let notice: Value =
            parse_json_response(server.handle_request(&json_post("/api/style/commit", "")))?;
        assert_eq!(notice["message"], "Background saved");

        let site: Value = parse_json_response(
            server.handle_request(&Request::fake_http("GET", "/api/site", vec![], vec![])),
        )?;
        assert_eq!(site["committed"]["intensity"], 1.5);
        assert_eq!(site["unsaved_changes"], false);

        Ok(())
    }

    #[test]
    fn test_http_draft_rejects_bad_input() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let server = create_server_with_tracks(&dir)?;

        let unknown = server.handle_request(&json_post(
            "/api/style/draft",
            r#"{"field": "shadow", "value": "1"}"#,
        ));
        assert_eq!(unknown.status_code, 400);

        let junk = server.handle_request(&json_post(
            "/api/style/draft",
            r#"{"field": "pos1x", "value": "left"}"#,
        ));
        assert_eq!(junk.status_code, 400);

        let malformed = server.handle_request(&json_post("/api/style/draft", "{"));
        assert_eq!(malformed.status_code, 400);

        Ok(())
    }

    #[test]
    fn test_http_site_metadata_reaches_header() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let server = create_server_with_tracks(&dir)?;

        let before: Value = parse_json_response(
            server.handle_request(&Request::fake_http("GET", "/api/site", vec![], vec![])),
        )?;
        assert_eq!(before["title"], "Audio Portfolio");

        let response = server.handle_request(&json_post(
            "/api/site",
            r#"{"title": " Field Recordings ", "description": "Wind and water"}"#,
        ));
        assert_eq!(response.status_code, 200);

        let after: Value = parse_json_response(
            server.handle_request(&Request::fake_http("GET", "/api/site", vec![], vec![])),
        )?;
        assert_eq!(after["title"], "Field Recordings");
        assert_eq!(after["description"], "Wind and water");

        Ok(())
    }

    #[test]
    fn test_http_edits_need_a_session() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let server = create_server_with_tracks(&dir)?;

        let logout = server.handle_request(&json_post("/api/logout", ""));
        assert_eq!(logout.status_code, 200);

        let edits = [
            json_post("/api/style/draft", r##"{"field": "color1", "value": "#112233"}"##),
            json_post("/api/style/commit", ""),
            json_post("/api/style/rollback", ""),
            json_post("/api/site", r#"{"title": "Taken over", "description": ""}"#),
        ];
        for request in &edits {
            assert_eq!(server.handle_request(request).status_code, 401, "{}", request.url());
        }

        let site: Value = parse_json_response(
            server.handle_request(&Request::fake_http("GET", "/api/site", vec![], vec![])),
        )?;
        assert_eq!(site["title"], "Audio Portfolio");
        assert_eq!(site["live"]["color1"], "#667eea");

        let tracks = server.handle_request(&Request::fake_http("GET", "/api/tracks", vec![], vec![]));
        assert_eq!(tracks.status_code, 200);

        Ok(())
    }

    #[test]
    fn test_http_login_opens_a_session() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let server = create_server_with_tracks(&dir)?;
        server.handle_request(&json_post("/api/logout", ""));

        let wrong = server.handle_request(&json_post(
            "/api/login",
            &format!(r#"{{"email": "{ADMIN}", "password": "nope-nope"}}"#),
        ));
        assert_eq!(wrong.status_code, 401);

        let session: Value = parse_json_response(
            server.handle_request(&Request::fake_http("GET", "/api/session", vec![], vec![])),
        )?;
        assert_eq!(session["user"], Value::Null);

        let login = server.handle_request(&json_post(
            "/api/login",
            &format!(r#"{{"email": "{ADMIN}", "password": "{PASSWORD}"}}"#),
        ));
        assert_eq!(login.status_code, 200);
        let body: Value = parse_json_response(login)?;
        assert_eq!(body["user"]["email"], ADMIN);

        let response = server.handle_request(&json_post(
            "/api/site",
            r#"{"title": "Field Recordings", "description": ""}"#,
        ));
        assert_eq!(response.status_code, 200);

        Ok(())
    }

    // --------------------------------------------------
    // assets
    // --------------------------------------------------

    #[test]
    fn test_http_serves_uploaded_asset() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let mut catalog = setup_catalog(dir.path())?;
        let url = catalog.upload_asset(b"OggS", AssetKind::audio("ogg"))?;
        let server = create_server(CatalogSource::Live(catalog), dir.path())?;

        let response = server.handle_request(&Request::fake_http("GET", url, vec![], vec![]));

        assert_eq!(response.status_code, 200);
        let content_type = response
            .headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("Content-Type"))
            .map(|(_, v)| v.to_string());
        assert_eq!(content_type.as_deref(), Some("audio/ogg"));

        let mut body = Vec::new();
        response
            .data
            .into_reader_and_size()
            .0
            .read_to_end(&mut body)?;
        assert_eq!(body, b"OggS");

        Ok(())
    }

    #[test]
    fn test_http_asset_not_found() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let server = create_server_with_tracks(&dir)?;

        let missing = format!("/assets/audio/{}.mp3", "0".repeat(64));
        let response = server.handle_request(&Request::fake_http("GET", missing, vec![], vec![]));
        assert_eq!(response.status_code, 404);

        let traversal = server.handle_request(&Request::fake_http(
            "GET",
            "/assets/audio/..%2F..%2Fetc%2Fpasswd",
            vec![],
            vec![],
        ));
        assert_eq!(traversal.status_code, 404);

        Ok(())
    }

    #[test]
    fn test_site_state_from_in_memory_config() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let static_path = dir.path().join("tracks.json");
        fs::write(&static_path, r#"[{"title": "Solo", "genre": "Jazz", "url": "/a.mp3"}]"#)?;

        let cfg: Config = toml::from_str(&format!(
            r#"
version = 1

[database]
in_memory = true

[catalog]
source = "static"
static_path = "{}"

[http]
bind_addr = "127.0.0.1"
port = 8080
"#,
            static_path.display()
        ))?;
        assert!(cfg.database.in_memory);

        let state = SiteState::from_config(&cfg)?;
        let server = HttpServer::new(state, cfg.http.clone());

        let body: Value = parse_json_response(
            server.handle_request(&Request::fake_http("GET", "/api/tracks", vec![], vec![])),
        )?;
        assert_eq!(titles(&body), vec!["Solo"]);

        Ok(())
    }
}
