//! Tour catalogue use-cases.

use std::sync::Arc;

use mockable::Clock;
use tracing::info;

use super::crud::CrudService;
use super::ports::{
    ImageTransform, ImageUpload, MediaFolder, MediaStore, PageRequest, TourRepository,
};
use super::user_service::map_media_error;
use super::{Actor, Capability, Error, Tour, TourDetails, TourId, TourPatch};

/// Most gallery images accepted in one upload.
pub const MAX_GALLERY_IMAGES: usize = 3;

/// Raw image bytes submitted for a tour.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TourImages {
    pub cover: Option<Vec<u8>>,
    pub gallery: Vec<Vec<u8>>,
}

impl TourImages {
    pub fn is_empty(&self) -> bool {
        self.cover.is_none() && self.gallery.is_empty()
    }
}

#[derive(Clone)]
pub struct TourService {
    crud: CrudService<Tour, dyn TourRepository>,
    media: Arc<dyn MediaStore>,
    clock: Arc<dyn Clock>,
}

impl TourService {
    pub fn new(
        tours: Arc<dyn TourRepository>,
        media: Arc<dyn MediaStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            crud: CrudService::new(tours),
            media,
            clock,
        }
    }

    pub async fn list_tours(&self, page: PageRequest) -> Result<Vec<Tour>, Error> {
        self.crud.get_all(page).await
    }

    pub async fn get_tour(&self, id: TourId) -> Result<Tour, Error> {
        self.crud.get_one(id).await
    }

    pub async fn create_tour(&self, actor: &Actor, details: TourDetails) -> Result<Tour, Error> {
        actor.require(Capability::ManageTours)?;
        let tour = self.crud.create(Tour::new(details, self.clock.utc())).await?;
        info!(tour_id = %tour.id, slug = %tour.slug, "tour created");
        Ok(tour)
    }

    pub async fn update_tour(
        &self,
        actor: &Actor,
        id: TourId,
        patch: TourPatch,
    ) -> Result<Tour, Error> {
        actor.require(Capability::ManageTours)?;
        let tour = self.crud.get_one(id).await?;
        let details = patch.apply(tour.details.clone());
        self.crud.update(tour.with_details(details)).await
    }

    pub async fn delete_tour(&self, actor: &Actor, id: TourId) -> Result<(), Error> {
        actor.require(Capability::ManageTours)?;
        self.crud.delete(id).await?;
        info!(tour_id = %id, "tour deleted");
        Ok(())
    }

    /// Host a new cover and/or gallery and store their URLs on the tour.
    ///
    /// A submitted gallery replaces the stored one. Nothing submitted leaves
    /// the tour untouched.
    pub async fn upload_images(
        &self,
        actor: &Actor,
        id: TourId,
        images: TourImages,
    ) -> Result<Tour, Error> {
        actor.require(Capability::ManageTours)?;
        if images.gallery.len() > MAX_GALLERY_IMAGES {
            return Err(Error::invalid_request(format!(
                "A tour accepts at most {MAX_GALLERY_IMAGES} gallery images per upload"
            )));
        }
        let tour = self.crud.get_one(id).await?;
        if images.is_empty() {
            return Ok(tour);
        }

        let stamp = format!("tour-{}-{}", tour.id, self.clock.utc().timestamp_millis());
        let mut details = tour.details.clone();
        if let Some(bytes) = images.cover {
            details.image_cover = self.upload(format!("{stamp}-cover"), bytes).await?;
        }
        if !images.gallery.is_empty() {
            let mut urls = Vec::with_capacity(images.gallery.len());
            for (index, bytes) in images.gallery.into_iter().enumerate() {
                urls.push(self.upload(format!("{stamp}-{}", index + 1), bytes).await?);
            }
            details.images = urls;
        }
        self.crud.update(tour.with_details(details)).await
    }

    async fn upload(&self, public_id: String, bytes: Vec<u8>) -> Result<String, Error> {
        self.media
            .upload(ImageUpload {
                folder: MediaFolder::Tours,
                public_id,
                bytes,
                transform: ImageTransform::TOUR_IMAGE,
            })
            .await
            .map_err(map_media_error)
    }
}

#[cfg(test)]
#[path = "tour_service_tests.rs"]
mod tests;
