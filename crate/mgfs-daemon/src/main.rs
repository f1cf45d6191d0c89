//! Mount a GridFS bucket as a filesystem.

use anyhow::Context as _;
use clap::Parser;
use futures_util::stream::StreamExt as _;
use mgfs_core::config::MountConfig;
use mgfs_core::session::MountSession;
use mgfs_core::utils::logging;
use mgfs_storage::{GridFsStore, StoreConfig};
use serde::Deserialize;
use signal_hook_tokio::Signals;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::{fs, process};

/// A FUSE filesystem which uses MongoDB GridFS as a storage backend.
///
/// Files of the bucket appear under the mountpoint, in directories
/// derived from the / in their names. Files can be read and deleted.
/// Stop it with SIGTERM or Ctrl-C.
///
/// Settings can be read from a TOML file with --config; options
/// given on the command line take precedence.
///
/// By default, outputs errors and warnings to stderr. To configure
/// the output, set the env variable RUST_LOG. Set the env variable
/// RUST_LOG_FORMAT=SYSTEMD to a systemd-friendly log output.
#[derive(Parser, Debug, Default)]
#[command(name = "mgfs", author, version, about, long_about, verbatim_doc_comment)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// MongoDB host or IP to connect to (required)
    #[arg(short = 'a', long)]
    addr: Option<String>,

    /// MongoDB port to connect to (default: 27017)
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Username to access MongoDB
    #[arg(short = 'u', long)]
    user: Option<String>,

    /// Password to access MongoDB
    #[arg(short = 'P', long)]
    password: Option<String>,

    /// Bucket (database) name in MongoDB (default: fs)
    #[arg(short = 'b', long)]
    bucket: Option<String>,

    /// Mount point on the local filesystem (required)
    #[arg(short = 'm', long)]
    mount: Option<PathBuf>,

    /// Log debug messages
    #[arg(short = 'v', long)]
    verbose: bool,
}

/// Config file structure
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    mongodb: MongoSection,
    #[serde(default)]
    mount: MountSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct MongoSection {
    address: Option<String>,
    port: Option<u16>,
    user: Option<String>,
    password: Option<String>,
    database: Option<String>,
    bucket: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct MountSection {
    point: Option<PathBuf>,
    fs_name: Option<String>,
    allow_other: Option<bool>,
}

/// Settings from the command line and config file, combined.
#[derive(Debug, PartialEq)]
struct Settings {
    store: StoreConfig,
    mount: MountConfig,
    mountpoint: PathBuf,
}

impl Settings {
    fn merge(cli: Cli, file: ConfigFile) -> anyhow::Result<Settings> {
        let Some(address) = cli.addr.or(file.mongodb.address) else {
            anyhow::bail!("addr (--addr, -a) is required");
        };
        let Some(mountpoint) = cli.mount.or(file.mount.point) else {
            anyhow::bail!("mount point (--mount, -m) is required");
        };

        let mut store = StoreConfig::new(address);
        if let Some(port) = cli.port.or(file.mongodb.port) {
            store.port = port;
        }
        store.user = cli.user.or(file.mongodb.user);
        store.password = cli.password.or(file.mongodb.password);
        if let Some(database) = cli.bucket.or(file.mongodb.database) {
            store.database = database;
        }
        if let Some(bucket) = file.mongodb.bucket {
            store.bucket = bucket;
        }

        let mut mount = MountConfig::default();
        if let Some(fs_name) = file.mount.fs_name {
            mount.fs_name = fs_name;
        }
        if let Some(allow_other) = file.mount.allow_other {
            mount.allow_other = allow_other;
        }

        Ok(Settings {
            store,
            mount,
            mountpoint,
        })
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(err) = execute(cli).await {
        eprintln!("ERROR: {err:#}");
        process::exit(1);
    };
}

async fn execute(cli: Cli) -> anyhow::Result<()> {
    let file = match &cli.config {
        Some(path) => parse_config(path)
            .with_context(|| format!("{}: failed to read TOML config file", path.display()))?,
        None => ConfigFile::default(),
    };
    let settings = Settings::merge(cli, file)?;
    check_mountpoint(&settings.mountpoint)?;

    let store = GridFsStore::connect(&settings.store)
        .await
        .with_context(|| {
            format!(
                "failed to connect to MongoDB at {}:{}",
                settings.store.address, settings.store.port
            )
        })?;

    let mut signals = Signals::new([
        signal_hook::consts::SIGHUP,
        signal_hook::consts::SIGTERM,
        signal_hook::consts::SIGINT,
        signal_hook::consts::SIGQUIT,
    ])?;

    let session = MountSession::mount(Arc::new(store), &settings.mountpoint, &settings.mount)?;

    tokio::select! {
        _ = signals.next() => {
            log::info!("Exit signal received, cleaning up.");
        }
        _ = session.wait_for_external_unmount() => {
            log::info!("{} was unmounted, exiting.", settings.mountpoint.display());
        }
    }
    signals.handle().close(); // A 2nd signal kills the process
    session.unmount().await?;

    Ok(())
}

/// Checks that the mount point is an existing directory.
fn check_mountpoint(path: &Path) -> anyhow::Result<()> {
    match fs::metadata(path) {
        Err(err) => anyhow::bail!("mount point {}: {err}", path.display()),
        Ok(m) if !m.is_dir() => {
            anyhow::bail!("mount point {} is not a directory", path.display())
        }
        Ok(_) => Ok(()),
    }
}

fn parse_config(path: &Path) -> anyhow::Result<ConfigFile> {
    let content = fs::read_to_string(path)?;

    Ok(toml::from_str(&content)?)
}
