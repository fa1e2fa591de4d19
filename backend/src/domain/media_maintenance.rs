//! Rewrites legacy image file names into hosted media URLs.

use std::sync::Arc;

use tracing::info;

use super::crud::map_repository_error;
use super::ports::{MediaFolder, PageRequest, TourRepository, UserRepository};
use super::user::is_absolute_url;
use super::{Actor, Capability, Error, Tour, User};

/// Counts of rewritten rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MediaMigrationReport {
    pub tours_updated: u32,
    pub users_updated: u32,
}

/// New reference for `reference`, or `None` when it already lives on the
/// media host.
///
/// Absolute URLs on other hosts keep only their file name.
///
/// # Examples
/// ```
/// use tourbook::domain::ports::MediaFolder;
/// use tourbook::domain::rewrite_reference;
///
/// let base = "https://media.example/tourbook";
/// assert_eq!(
///     rewrite_reference(base, MediaFolder::Tours, "tour-2-cover.jpg").as_deref(),
///     Some("https://media.example/tourbook/tours/tour-2-cover.jpg"),
/// );
/// assert_eq!(
///     rewrite_reference(base, MediaFolder::Users, "https://media.example/tourbook/users/u.jpg"),
///     None,
/// );
/// ```
pub fn rewrite_reference(base_url: &str, folder: MediaFolder, reference: &str) -> Option<String> {
    let base = base_url.trim_end_matches('/');
    if reference.is_empty() || reference.starts_with(&format!("{base}/")) {
        return None;
    }
    let file = if is_absolute_url(reference) {
        reference.rsplit('/').next().filter(|name| !name.is_empty())?
    } else {
        reference.trim_start_matches('/')
    };
    Some(format!("{base}/{}/{file}", folder.as_str()))
}

fn rewrite_tour(base_url: &str, tour: &Tour) -> Option<Tour> {
    let mut details = tour.details.clone();
    let mut changed = false;
    if let Some(cover) = rewrite_reference(base_url, MediaFolder::Tours, &details.image_cover) {
        details.image_cover = cover;
        changed = true;
    }
    for image in &mut details.images {
        if let Some(url) = rewrite_reference(base_url, MediaFolder::Tours, image) {
            *image = url;
            changed = true;
        }
    }
    changed.then(|| tour.clone().with_details(details))
}

fn rewrite_user(base_url: &str, user: &User) -> Option<User> {
    let photo = rewrite_reference(base_url, MediaFolder::Users, &user.photo)?;
    Some(User {
        photo,
        ..user.clone()
    })
}

/// Bulk media reference rewrite over every tour and user.
#[derive(Clone)]
pub struct MediaMaintenanceService {
    tours: Arc<dyn TourRepository>,
    users: Arc<dyn UserRepository>,
    media_base_url: String,
}

impl MediaMaintenanceService {
    pub fn new(
        tours: Arc<dyn TourRepository>,
        users: Arc<dyn UserRepository>,
        media_base_url: impl Into<String>,
    ) -> Self {
        Self {
            tours,
            users,
            media_base_url: media_base_url.into(),
        }
    }

    /// Run the rewrite on behalf of an administrator.
    pub async fn migrate(&self, actor: &Actor) -> Result<MediaMigrationReport, Error> {
        actor.require(Capability::RunMaintenance)?;
        self.run().await
    }

    /// Run the rewrite without an acting user, for offline tooling.
    pub async fn run(&self) -> Result<MediaMigrationReport, Error> {
        let mut report = MediaMigrationReport::default();
        let mut page = PageRequest::default();
        loop {
            let tours = self
                .tours
                .list(page)
                .await
                .map_err(map_repository_error::<Tour>)?;
            for tour in tours.iter().filter_map(|t| rewrite_tour(&self.media_base_url, t)) {
                self.tours
                    .update(&tour)
                    .await
                    .map_err(map_repository_error::<Tour>)?;
                report.tours_updated += 1;
            }
            if tours.len() < page.limit() as usize {
                break;
            }
            page = page.next();
        }

        let mut page = PageRequest::default();
        loop {
            let users = self
                .users
                .list(page)
                .await
                .map_err(map_repository_error::<User>)?;
            for user in users.iter().filter_map(|u| rewrite_user(&self.media_base_url, u)) {
                self.users
                    .update(&user)
                    .await
                    .map_err(map_repository_error::<User>)?;
                report.users_updated += 1;
            }
            if users.len() < page.limit() as usize {
                break;
            }
            page = page.next();
        }

        info!(
            tours_updated = report.tours_updated,
            users_updated = report.users_updated,
            "media references migrated"
        );
        Ok(report)
    }
}
