/*!
# Campaign Database Lifecycle

1. **Open** the live campaign database with `open_campaign_db()`, creating it and
   applying migrations when missing
2. **Create** a throwaway writeable database with `new_writeable_campaign_db()`
   (tests, simulations)
3. **Backup** any campaign database with `backup_campaign_db()`
4. **Inspect** a backup with `open_readonly_campaign_db()`

All engine state (accounts, task records, opened boxes, inventory) lives in one
sqlite file. Writes go through short transactions; sqlite serializes writers and
the engine retries on lock contention.
*/

use hiibox_migrations::MigratorTrait as _;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use std::path::Path;
use tracing::{debug, info};
use url::Url;

/// Connections held by a throwaway database
const EPHEMERAL_POOL_SIZE: u32 = 8;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    SeaOrm(#[from] sea_orm::DbErr),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

fn sqlite_url(path: &Path, mode: &str) -> Result<Url> {
    let mut url = Url::parse("sqlite:///").map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;
    url.set_path(&path.to_string_lossy());
    url.set_query(Some(&format!("mode={mode}")));
    Ok(url)
}

async fn connect(url: &Url, max_connections: u32) -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(url.as_str());
    options
        .max_connections(max_connections.max(1))
        .sqlx_logging(false);

    let conn = Database::connect(options).await?;
    Ok(conn)
}

/// Open the live campaign database, creating it if needed
///
/// Pending migrations are applied on every open, so an older file is upgraded
/// in place.
pub async fn open_campaign_db<P: AsRef<Path>>(
    path: P,
    max_connections: u32,
) -> Result<DatabaseConnection> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let url = sqlite_url(path, "rwc")?;
    let conn = connect(&url, max_connections).await?;
    hiibox_migrations::Migrator::up(&conn, None).await?;

    info!("Opened campaign database {}", path.display());
    Ok(conn)
}

/// Open a backed-up campaign database in read-only mode
pub async fn open_readonly_campaign_db<P: AsRef<Path>>(path: P) -> Result<DatabaseConnection> {
    let url = sqlite_url(path.as_ref(), "ro")?;
    connect(&url, 1).await
}

/// Create a new writeable campaign database
///
/// The database is backed by a temporary file that lives until the process
/// exits. Callers should treat it as ephemeral.
pub async fn new_writeable_campaign_db() -> Result<DatabaseConnection> {
    // VACUUM INTO does not work reliably against :memory: databases
    let temp = tempfile::NamedTempFile::new()?;
    let url = sqlite_url(temp.path(), "rw")?;

    let conn = connect(&url, EPHEMERAL_POOL_SIZE).await?;
    hiibox_migrations::Migrator::up(&conn, None).await?;
    debug!("Created writeable campaign database {}", temp.path().display());

    // Keep the temp file alive by forgetting it (cleaned up when process exits)
    std::mem::forget(temp);

    Ok(conn)
}

/// Backup a campaign database to a compact, read-only file
///
/// # Errors
///
/// Returns an error if the target file already exists.
pub async fn backup_campaign_db<P: AsRef<Path>>(conn: &DatabaseConnection, path: P) -> Result<()> {
    let path = path.as_ref();

    if path.exists() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("Database file already exists: {}", path.display()),
        )));
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let path_str = path.to_string_lossy();
    let vacuum_stmt = sea_orm::Statement::from_string(
        sea_orm::DbBackend::Sqlite,
        format!("VACUUM INTO '{}'", path_str.replace('\'', "''")),
    );

    conn.execute(vacuum_stmt).await?;

    if !path.exists() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Database file was not created",
        )));
    }

    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_readonly(true);
    std::fs::set_permissions(path, perms)?;

    info!("Backed up campaign database to {}", path.display());
    Ok(())
}
