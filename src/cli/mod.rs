use anyhow::{Context, anyhow, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::{self, Config};
use crate::domain::track::{NewTrack, Track, TrackId, TrackPatch, parse_tags, validate_markers};
use crate::http::server::{HttpServer, SiteState};
use crate::site::{ConfigDraftManager, Notice, StyleField};
use crate::storage::assets::AssetKind;
use crate::storage::auth::{AuthService, LocalAuth, User};
use crate::storage::catalog::{CatalogService, CatalogSource, CatalogStore};
use crate::storage::db::to_local_time;
use crate::storage::fs::{scan_music_files, title_from_path};
use crate::storage::kv::SettingsStore;
use crate::view::CatalogView;

mod player;

const MISSING_FIELDS: &str = "Please fill in all required fields and select a file.";

#[derive(Parser)]
#[command(name = "soundfolio")]
#[command(version = "0.1")]
#[command(about = "Audio portfolio host")]
pub struct Cli {
    /// Path to the config TOML file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run http server hosting the portfolio
    Serve,
    /// List tracks, newest first
    List {
        #[arg(short, long)]
        genre: Option<String>,
        #[arg(short, long)]
        tag: Option<String>,
    },
    /// Upload an audio file as a new track
    Add {
        #[arg(short, long)]
        file: Option<PathBuf>,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long)]
        genre: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        /// Comma separated, e.g. "film, upbeat"
        #[arg(long)]
        tags: Option<String>,
        /// Cover art image
        #[arg(long)]
        cover: Option<PathBuf>,
        /// Comma separated offsets in seconds, at most four
        #[arg(long)]
        markers: Option<String>,
    },
    /// Change fields of an existing track
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long)]
        genre: Option<String>,
        /// Empty string clears it
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        tags: Option<String>,
        #[arg(long)]
        cover: Option<PathBuf>,
        #[arg(long)]
        markers: Option<String>,
    },
    /// Delete a track
    Remove { id: String },
    /// Add every audio file under a directory
    Import {
        dir: PathBuf,
        #[arg(short, long)]
        genre: String,
        #[arg(long)]
        tags: Option<String>,
    },
    /// Create an account and log in
    Signup {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    Logout,
    /// Show the logged in account
    Whoami,
    /// Background appearance
    Style {
        #[command(subcommand)]
        action: StyleAction,
    },
    /// Set the site title and description
    Site {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Play a track on this machine
    Play { id: String },
}

#[derive(Subcommand)]
pub enum StyleAction {
    /// Print the saved style and its CSS
    Show,
    /// Change one field and save
    Set { field: StyleField, value: String },
    /// Restore the built-in gradient and save
    Reset,
}

/// Entrypoint for CLI
pub fn run() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config.to_string_lossy())?;

    match cli.command {
        Commands::Serve => {
            println!("Starting HTTP server...");

            let state = SiteState::from_config(&cfg).context("Failed to initialize storage")?;
            let http_server = HttpServer::new(state, cfg.http);

            println!(
                "HTTP server running at http://{}:{}",
                http_server.config.bind_addr, http_server.config.port
            );
            http_server.run();
        }

        Commands::List { genre, tag } => {
            let source = CatalogSource::from_config(&cfg)?;
            let mut view = CatalogView::new();
            view.finish_load(source.load());

            if let Some(msg) = view.error_message() {
                bail!("{msg}");
            }
            if let Some(genre) = genre {
                view.select_genre(&genre);
            }
            if let Some(tag) = tag {
                view.select_tag(&tag);
            }

            if let Some(genres) = view.genre_controls() {
                println!("Genres: {}", genres.join(" | "));
            }
            if let Some(tags) = view.tag_controls() {
                println!("Tags: {}", tags.join(" | "));
            }
            for track in view.visible() {
                print_track(track);
            }
        }

        Commands::Add {
            file,
            title,
            genre,
            description,
            tags,
            cover,
            markers,
        } => {
            require_login(&cfg.database)?;
            let (Some(file), Some(title), Some(genre)) = (file, title, genre) else {
                bail!(MISSING_FIELDS);
            };
            if title.trim().is_empty() || genre.trim().is_empty() {
                bail!(MISSING_FIELDS);
            }

            let mut source = CatalogSource::from_config(&cfg)?;
            let catalog = live_catalog(&mut source)?;

            let url = upload(catalog, &file, AssetKind::audio)?;
            let cover_art_url = cover
                .map(|path| upload(catalog, &path, AssetKind::cover_art))
                .transpose()?;

            let track = catalog.create_track(NewTrack {
                title,
                genre,
                description,
                tags: tags.as_deref().map(parse_tags).unwrap_or_default(),
                url,
                cover_art_url,
                markers: markers.as_deref().map(parse_markers).unwrap_or_default(),
            })?;
            println!("Added track {}", track.id);
            print_track(&track);
        }

        Commands::Edit {
            id,
            title,
            genre,
            description,
            tags,
            cover,
            markers,
        } => {
            require_login(&cfg.database)?;
            let mut source = CatalogSource::from_config(&cfg)?;
            let catalog = live_catalog(&mut source)?;

            let cover_art_url = cover
                .map(|path| upload(catalog, &path, AssetKind::cover_art))
                .transpose()?;
            let patch = TrackPatch {
                title,
                genre,
                description,
                tags: tags.as_deref().map(parse_tags),
                url: None,
                cover_art_url,
                markers: markers.as_deref().map(parse_markers),
            };
            if patch.is_empty() {
                bail!("nothing to change");
            }

            let track = catalog.update_track(&TrackId::new(id), patch)?;
            println!("Updated track {}", track.id);
            print_track(&track);
        }

        Commands::Remove { id } => {
            require_login(&cfg.database)?;
            let mut source = CatalogSource::from_config(&cfg)?;
            let id = TrackId::new(id);
            live_catalog(&mut source)?.delete_track(&id)?;
            println!("Removed track {id}");
        }

        Commands::Import { dir, genre, tags } => {
            require_login(&cfg.database)?;
            let mut source = CatalogSource::from_config(&cfg)?;
            let catalog = live_catalog(&mut source)?;
            let tags = tags.as_deref().map(parse_tags).unwrap_or_default();

            let files = scan_music_files(&dir, false)?;
            println!("Importing {} files from {}", files.len(), dir.display());
            for file in &files {
                let url = upload(catalog, file, AssetKind::audio)?;
                let track = catalog.create_track(NewTrack {
                    title: title_from_path(file),
                    genre: genre.clone(),
                    tags: tags.clone(),
                    url,
                    ..NewTrack::default()
                })?;
                println!("    - {} '{}' from {}", track.id, track.title, file.display());
            }
        }

        Commands::Signup { email, password } => {
            let user = LocalAuth::new(&cfg.database)?.signup(&email, &password)?;
            println!("Signed up and logged in as {}", user.email);
        }

        Commands::Login { email, password } => {
            let user = LocalAuth::new(&cfg.database)?.login(&email, &password)?;
            println!("Logged in as {}", user.email);
        }

        Commands::Logout => {
            LocalAuth::new(&cfg.database)?.logout()?;
            println!("Logged out");
        }

        Commands::Whoami => match LocalAuth::new(&cfg.database)?.current_user()? {
            Some(user) => println!("{}", user.email),
            None => println!("Not logged in"),
        },

        Commands::Style { action } => {
            let (manager, notice) = apply_style_action(&cfg.database, action)?;
            if let Some(notice) = notice {
                println!("{}", notice.message);
            }
            let style = manager.committed_style();
            for field in StyleField::ALL {
                println!("{field:>10}: {}", style.get(field));
            }
            print!("{}", manager.live_vars().to_css());
        }

        Commands::Site { title, description } => {
            require_login(&cfg.database)?;
            let mut manager = ConfigDraftManager::load(SettingsStore::new(&cfg.database)?);
            let current = manager.metadata().clone();
            let notice = manager.commit_metadata(
                title.as_deref().unwrap_or(&current.title),
                description.as_deref().unwrap_or(&current.description),
            );
            let header = manager.metadata();
            println!("{}", notice.message);
            println!("{}\n{}", header.title, header.description);
        }

        Commands::Play { id } => {
            let source = CatalogSource::from_config(&cfg)?;
            let tracks = source.load()?;
            let id = TrackId::new(id);
            let track = tracks
                .iter()
                .find(|t| t.id == id)
                .ok_or_else(|| anyhow!("track {id} not found"))?;

            let path = local_path(&cfg.catalog, &track.url)?;
            player::play(track, &path);
        }
    }

    Ok(())
}

/// Runs a `style` subcommand. Anything other than `show` needs a login.
fn apply_style_action(
    db: &config::Database,
    action: StyleAction,
) -> anyhow::Result<(ConfigDraftManager<SettingsStore>, Option<Notice>)> {
    if !matches!(action, StyleAction::Show) {
        require_login(db)?;
    }

    let mut manager = ConfigDraftManager::load(SettingsStore::new(db)?);
    let notice = match action {
        StyleAction::Show => None,
        StyleAction::Set { field, value } => {
            manager.edit_draft(field, &value)?;
            Some(manager.commit_style())
        }
        StyleAction::Reset => {
            manager.reset_draft();
            Some(manager.commit_style())
        }
    };
    Ok((manager, notice))
}

fn require_login(db: &config::Database) -> anyhow::Result<User> {
    LocalAuth::new(db)?
        .current_user()?
        .ok_or_else(|| anyhow!("You need to log in first (soundfolio login)"))
}

fn live_catalog(source: &mut CatalogSource) -> anyhow::Result<&mut CatalogStore> {
    source
        .live_mut()
        .ok_or_else(|| anyhow!("The catalog is read-only; set catalog.source = \"live\" to edit it"))
}

fn upload(
    catalog: &mut CatalogStore,
    path: &Path,
    kind: fn(&str) -> AssetKind,
) -> anyhow::Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_default();
    Ok(catalog.upload_asset(&bytes, kind(&ext))?)
}

fn parse_markers(raw: &str) -> Vec<f64> {
    validate_markers(raw.split(','))
}

/// Maps a track URL to a file this machine can decode.
fn local_path(catalog: &config::CatalogConfig, url: &str) -> anyhow::Result<PathBuf> {
    let assets = crate::storage::assets::AssetStore::new(&catalog.assets_dir);
    if let Some(path) = assets.path_for_url(url) {
        return Ok(path);
    }
    if url.contains("://") {
        bail!("{url} is not a local file");
    }
    Ok(PathBuf::from(url))
}

fn print_track(track: &Track) {
    println!("Track {}: {}", track.id, track.title);
    println!("  Genre: {}", track.genre);
    if !track.tags.is_empty() {
        println!("  Tags: {}", track.tags.join(", "));
    }
    if let Some(description) = &track.description {
        println!("  {description}");
    }
    if !track.markers.is_empty() {
        let labels: Vec<_> = track
            .markers
            .iter()
            .map(|m| crate::playback::format_time(*m))
            .collect();
        println!("  Markers: {}", labels.join(", "));
    }
    println!("  Added: {}", to_local_time(track.created_at).format("%Y-%m-%d %H:%M"));
    println!("  Source: {}", track.url);
}
