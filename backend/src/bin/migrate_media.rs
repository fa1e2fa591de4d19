//! Upload legacy image files to the media host and rewrite stored
//! references to point at it.
//!
//! Uploading is optional: without `--upload-from` only the database rewrite
//! runs. A failed upload is logged and the run continues.

use std::env;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use cap_std::{ambient_authority, fs::Dir};
use clap::Parser;
use mockable::DefaultClock;
use reqwest::Url;
use tracing::{info, warn};
use zeroize::Zeroizing;

use tourbook::domain::MediaMaintenanceService;
use tourbook::domain::ports::{ImageTransform, ImageUpload, MediaFolder, MediaStore};
use tourbook::outbound::media::{CloudinaryConfig, CloudinaryStore};
use tourbook::outbound::persistence::{
    DbPool, DieselTourRepository, DieselUserRepository, PoolConfig, run_migrations,
};

const API_SECRET_ENV: &str = "TOURBOOK_MEDIA_API_SECRET";
const DATABASE_URL_ENV: &str = "TOURBOOK_DATABASE_URL";
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Parser)]
#[command(
    name = "migrate-media",
    about = "Move legacy tour and user images onto the media host",
    version
)]
struct CliArgs {
    /// Database URL. Falls back to `TOURBOOK_DATABASE_URL`.
    #[arg(long)]
    database_url: Option<String>,
    /// Base URL that rewritten references are placed under.
    #[arg(long)]
    media_base_url: String,
    /// Directory holding `tours/` and `users/` image folders to upload.
    #[arg(long)]
    upload_from: Option<PathBuf>,
    /// Media host account name; required with `--upload-from`.
    #[arg(long)]
    cloud_name: Option<String>,
    /// Media host API key; required with `--upload-from`.
    #[arg(long)]
    api_key: Option<String>,
    /// Media host API root.
    #[arg(long, default_value = "https://api.cloudinary.com/")]
    media_api_base: Url,
}

fn main() -> io::Result<()> {
    if let Err(error) = tracing_subscriber::fmt().try_init() {
        eprintln!("tracing init failed: {error}");
    }
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async_main())
}

async fn async_main() -> io::Result<()> {
    let args = CliArgs::try_parse().map_err(io::Error::other)?;
    let database_url = resolve_database_url(args.database_url.clone())?;

    if let Some(source) = args.upload_from.as_deref() {
        let store = build_store(&args)?;
        let uploaded = upload_directory(&store, source).await?;
        info!(uploaded, "legacy images uploaded");
    }

    run_migrations(&database_url)
        .await
        .map_err(|error| io::Error::other(format!("run migrations: {error}")))?;
    let pool = DbPool::new(PoolConfig::new(&database_url))
        .await
        .map_err(|error| io::Error::other(format!("connect to database: {error}")))?;

    let service = MediaMaintenanceService::new(
        Arc::new(DieselTourRepository::new(pool.clone())),
        Arc::new(DieselUserRepository::new(pool)),
        args.media_base_url,
    );
    let report = service
        .run()
        .await
        .map_err(|error| io::Error::other(format!("rewrite media references: {error}")))?;

    println!(
        "tours updated: {}, users updated: {}",
        report.tours_updated, report.users_updated
    );
    Ok(())
}

fn build_store(args: &CliArgs) -> io::Result<CloudinaryStore> {
    let missing = |flag: &str| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{flag} is required with --upload-from"),
        )
    };
    let cloud_name = args.cloud_name.clone().ok_or_else(|| missing("--cloud-name"))?;
    let api_key = args.api_key.clone().ok_or_else(|| missing("--api-key"))?;
    let api_secret = env::var(API_SECRET_ENV).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{API_SECRET_ENV} must be set to upload images"),
        )
    })?;

    let config = CloudinaryConfig {
        api_base: args.media_api_base.clone(),
        cloud_name,
        api_key,
        api_secret: Zeroizing::new(api_secret),
    };
    CloudinaryStore::new(config, UPLOAD_TIMEOUT, Arc::new(DefaultClock)).map_err(io::Error::other)
}

/// Upload every JPEG under `source/tours` and `source/users`.
///
/// Returns the number of files that uploaded successfully.
async fn upload_directory(store: &dyn MediaStore, source: &Path) -> io::Result<usize> {
    let root = Dir::open_ambient_dir(source, ambient_authority()).map_err(|error| {
        io::Error::other(format!(
            "open upload directory '{}': {error}",
            source.display()
        ))
    })?;

    let mut uploaded = 0;
    for (folder, transform) in [
        (MediaFolder::Tours, ImageTransform::TOUR_IMAGE),
        (MediaFolder::Users, ImageTransform::USER_PHOTO),
    ] {
        let files = match read_images(&root, folder.as_str()) {
            Ok(files) => files,
            Err(error) => {
                warn!(folder = folder.as_str(), %error, "skipping image folder");
                continue;
            }
        };
        for (public_id, bytes) in files {
            let upload = ImageUpload {
                folder,
                public_id: public_id.clone(),
                bytes,
                transform,
            };
            match store.upload(upload).await {
                Ok(url) => {
                    info!(%public_id, %url, "uploaded");
                    uploaded += 1;
                }
                Err(error) => warn!(%public_id, %error, "upload failed"),
            }
        }
    }
    Ok(uploaded)
}

/// Read `.jpg`/`.jpeg` files from `root/folder`, keyed by file stem.
fn read_images(root: &Dir, folder: &str) -> io::Result<Vec<(String, Vec<u8>)>> {
    let dir = root.open_dir(folder)?;
    let mut images = Vec::new();
    for entry in dir.entries()? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(stem) = jpeg_stem(Path::new(&name)) else {
            continue;
        };
        let mut bytes = Vec::new();
        entry.open()?.read_to_end(&mut bytes)?;
        images.push((stem, bytes));
    }
    images.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(images)
}

fn jpeg_stem(path: &Path) -> Option<String> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    if extension != "jpg" && extension != "jpeg" {
        return None;
    }
    path.file_stem()?.to_str().map(str::to_owned)
}

fn resolve_database_url(explicit: Option<String>) -> io::Result<String> {
    let value = match explicit {
        Some(value) => value,
        None => env::var(DATABASE_URL_ENV).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("database URL missing: set --database-url or {DATABASE_URL_ENV}"),
            )
        })?,
    };
    if value.trim().is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "database URL must not be empty",
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use cap_std::{ambient_authority, fs::Dir};
    use rstest::rstest;
    use tempfile::TempDir;

    use super::{jpeg_stem, read_images, resolve_database_url};
    use std::path::Path;

    #[rstest]
    #[case("tour-1-cover.jpg", Some("tour-1-cover"))]
    #[case("user-7.JPEG", Some("user-7"))]
    #[case("notes.txt", None)]
    #[case("no-extension", None)]
    fn jpeg_stem_accepts_only_jpeg_files(#[case] name: &str, #[case] expected: Option<&str>) {
        assert_eq!(jpeg_stem(Path::new(name)).as_deref(), expected);
    }

    #[rstest]
    fn read_images_skips_other_files() {
        let temp = TempDir::new().expect("temp dir");
        let tours = temp.path().join("tours");
        fs::create_dir(&tours).expect("tours dir");
        fs::write(tours.join("b.jpg"), b"b").expect("write");
        fs::write(tours.join("a.jpeg"), b"a").expect("write");
        fs::write(tours.join("readme.md"), b"x").expect("write");

        let root = Dir::open_ambient_dir(temp.path(), ambient_authority()).expect("open");
        let images = read_images(&root, "tours").expect("read");
        assert_eq!(
            images,
            vec![("a".to_owned(), b"a".to_vec()), ("b".to_owned(), b"b".to_vec())]
        );
    }

    #[rstest]
    fn read_images_reports_missing_folder() {
        let temp = TempDir::new().expect("temp dir");
        let root = Dir::open_ambient_dir(temp.path(), ambient_authority()).expect("open");
        assert!(read_images(&root, "users").is_err());
    }

    #[rstest]
    fn resolve_database_url_rejects_blank_explicit_value() {
        let error = resolve_database_url(Some("  ".to_owned())).expect_err("blank");
        assert_eq!(error.kind(), std::io::ErrorKind::InvalidInput);
    }
}
