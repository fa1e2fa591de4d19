//! Uniform get-one/get-all/create/update/delete over any [`Entity`].
//!
//! Aggregate services wrap a [`CrudService`] for their plain operations and
//! add their own rules around it.

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::warn;

use super::Error;
use super::ports::{Entity, PageRequest, Repository, RepositoryError};

/// `NotFound` error naming the aggregate.
pub fn not_found<E: Entity>() -> Error {
    Error::not_found(format!("No {} found with that ID", E::LABEL))
}

/// Map a repository failure into the API taxonomy.
pub fn map_repository_error<E: Entity>(error: RepositoryError) -> Error {
    match error {
        RepositoryError::Connection { message } => {
            warn!(entity = E::LABEL, %message, "repository unavailable");
            Error::service_unavailable(format!("{} repository unavailable", E::LABEL))
        }
        RepositoryError::Query { message } => {
            Error::internal(format!("{} repository error: {message}", E::LABEL))
        }
        RepositoryError::DuplicateKey { constraint } => {
            Error::duplicate_key(E::DUPLICATE_MESSAGE).with_details(serde_json::json!({
                "constraint": constraint,
            }))
        }
    }
}

/// Generic CRUD operations backed by a [`Repository<E>`].
pub struct CrudService<E, R: ?Sized> {
    repo: Arc<R>,
    entity: PhantomData<fn() -> E>,
}

impl<E, R: ?Sized> Clone for CrudService<E, R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            entity: PhantomData,
        }
    }
}

impl<E, R> CrudService<E, R>
where
    E: Entity,
    R: Repository<E> + ?Sized,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self {
            repo,
            entity: PhantomData,
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repo
    }

    /// Fetch one entity or fail with `NotFound`.
    pub async fn get_one(&self, id: E::Id) -> Result<E, Error> {
        self.repo
            .find_by_id(id)
            .await
            .map_err(map_repository_error::<E>)?
            .ok_or_else(not_found::<E>)
    }

    /// One page of entities, newest first.
    pub async fn get_all(&self, page: PageRequest) -> Result<Vec<E>, Error> {
        self.repo
            .list(page)
            .await
            .map_err(map_repository_error::<E>)
    }

    /// Validate and insert.
    pub async fn create(&self, entity: E) -> Result<E, Error> {
        entity.validate().map_err(Error::invalid_request)?;
        self.repo
            .insert(&entity)
            .await
            .map_err(map_repository_error::<E>)?;
        Ok(entity)
    }

    /// Validate and overwrite an existing entity.
    pub async fn update(&self, entity: E) -> Result<E, Error> {
        entity.validate().map_err(Error::invalid_request)?;
        let updated = self
            .repo
            .update(&entity)
            .await
            .map_err(map_repository_error::<E>)?;
        if updated {
            Ok(entity)
        } else {
            Err(not_found::<E>())
        }
    }

    /// Remove an entity or fail with `NotFound`.
    pub async fn delete(&self, id: E::Id) -> Result<(), Error> {
        let deleted = self
            .repo
            .delete(id)
            .await
            .map_err(map_repository_error::<E>)?;
        if deleted { Ok(()) } else { Err(not_found::<E>()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ErrorCode, Tour};
    use crate::test_support::{sample_tour_details, tour_repository};
    use chrono::Utc;
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn missing_entity_names_the_aggregate() {
        let crud = CrudService::<Tour, _>::new(tour_repository());
        let err = crud
            .get_one(crate::domain::TourId::random())
            .await
            .expect_err("missing");
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.message(), "No tour found with that ID");
    }

    #[rstest]
    #[tokio::test]
    async fn create_rejects_invalid_entities() {
        let crud = CrudService::<Tour, _>::new(tour_repository());
        let mut details = sample_tour_details("The Sea Explorer");
        details.price = 0;
        let err = crud
            .create(Tour::new(details, Utc::now()))
            .await
            .expect_err("invalid");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[rstest]
    #[tokio::test]
    async fn duplicate_names_surface_as_duplicate_key() {
        let crud = CrudService::<Tour, _>::new(tour_repository());
        crud.create(Tour::new(sample_tour_details("The Sea Explorer"), Utc::now()))
            .await
            .expect("first insert");
        let err = crud
            .create(Tour::new(sample_tour_details("The Sea Explorer"), Utc::now()))
            .await
            .expect_err("duplicate");
        assert_eq!(err.code(), ErrorCode::DuplicateKey);
        assert_eq!(err.message(), "A tour with this name already exists");
    }

    #[rstest]
    #[tokio::test]
    async fn update_and_delete_report_missing_rows() {
        let crud = CrudService::<Tour, _>::new(tour_repository());
        let tour = Tour::new(sample_tour_details("The Park Camper"), Utc::now());
        let err = crud.update(tour.clone()).await.expect_err("not stored");
        assert_eq!(err.code(), ErrorCode::NotFound);
        let err = crud.delete(tour.id).await.expect_err("not stored");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[rstest]
    fn connection_failures_are_unavailable() {
        let err = map_repository_error::<Tour>(RepositoryError::connection("refused"));
        assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
    }
}
