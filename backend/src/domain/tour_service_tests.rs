//! Tests for the tour catalogue service.

use std::sync::Arc;

use super::*;
use crate::domain::ports::{MediaStoreError, MockMediaStore};
use crate::domain::{ErrorCode, Role, UserId};
use crate::outbound::memory::InMemoryStore;
use crate::test_support::{MutableClock, fixture_now, sample_tour_details};
use rstest::rstest;

fn service(store: &InMemoryStore, media: MockMediaStore) -> TourService {
    TourService::new(
        Arc::new(store.tours()),
        Arc::new(media),
        Arc::new(MutableClock::new(fixture_now())),
    )
}

fn lead_guide() -> Actor {
    Actor::new(UserId::random(), Role::LeadGuide)
}

#[rstest]
#[case(Role::User)]
#[case(Role::Guide)]
#[tokio::test]
async fn only_tour_managers_create_tours(#[case] role: Role) {
    let store = InMemoryStore::default();
    let tours = service(&store, MockMediaStore::new());
    let err = tours
        .create_tour(
            &Actor::new(UserId::random(), role),
            sample_tour_details("The Sea Explorer"),
        )
        .await
        .expect_err("forbidden");
    assert_eq!(err.code(), ErrorCode::Forbidden);
}

#[rstest]
#[tokio::test]
async fn created_tours_are_publicly_listed() {
    let store = InMemoryStore::default();
    let tours = service(&store, MockMediaStore::new());
    let created = tours
        .create_tour(&lead_guide(), sample_tour_details("The Sea Explorer"))
        .await
        .expect("create");
    assert_eq!(created.slug, "the-sea-explorer");

    let listed = tours
        .list_tours(PageRequest::default())
        .await
        .expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(tours.get_tour(created.id).await.expect("get"), created);
}

#[rstest]
#[tokio::test]
async fn update_revalidates_and_reslugs() {
    let store = InMemoryStore::default();
    let tours = service(&store, MockMediaStore::new());
    let actor = lead_guide();
    let created = tours
        .create_tour(&actor, sample_tour_details("The Sea Explorer"))
        .await
        .expect("create");

    let err = tours
        .update_tour(
            &actor,
            created.id,
            TourPatch {
                price_discount: Some(Some(created.details.price)),
                ..TourPatch::default()
            },
        )
        .await
        .expect_err("invalid discount");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);

    let renamed = tours
        .update_tour(
            &actor,
            created.id,
            TourPatch {
                name: Some("The Ocean Explorer".to_owned()),
                ..TourPatch::default()
            },
        )
        .await
        .expect("rename");
    assert_eq!(renamed.slug, "the-ocean-explorer");
    assert_eq!(renamed.details.price, created.details.price);
}

#[rstest]
#[tokio::test]
async fn image_upload_names_cover_and_gallery() {
    let store = InMemoryStore::default();
    let seed = service(&store, MockMediaStore::new());
    let actor = lead_guide();
    let tour = seed
        .create_tour(&actor, sample_tour_details("The Sea Explorer"))
        .await
        .expect("create");
    let stamp = format!("tour-{}-{}", tour.id, fixture_now().timestamp_millis());

    let mut media = MockMediaStore::new();
    let expected = stamp.clone();
    media
        .expect_upload()
        .withf(move |upload| {
            upload.folder == MediaFolder::Tours
                && upload.transform == ImageTransform::TOUR_IMAGE
                && (upload.public_id == format!("{expected}-cover")
                    || upload.public_id == format!("{expected}-1")
                    || upload.public_id == format!("{expected}-2"))
        })
        .times(3)
        .returning(|upload| Ok(format!("https://media.example/tours/{}.jpg", upload.public_id)));

    let tours = service(&store, media);
    let updated = tours
        .upload_images(
            &actor,
            tour.id,
            TourImages {
                cover: Some(vec![1]),
                gallery: vec![vec![2], vec![3]],
            },
        )
        .await
        .expect("upload");
    assert_eq!(
        updated.details.image_cover,
        format!("https://media.example/tours/{stamp}-cover.jpg")
    );
    assert_eq!(
        updated.details.images,
        vec![
            format!("https://media.example/tours/{stamp}-1.jpg"),
            format!("https://media.example/tours/{stamp}-2.jpg"),
        ]
    );
}

#[rstest]
#[tokio::test]
async fn too_many_gallery_images_are_rejected_before_upload() {
    let store = InMemoryStore::default();
    let mut media = MockMediaStore::new();
    media.expect_upload().times(0);
    let tours = service(&store, media);
    let err = tours
        .upload_images(
            &lead_guide(),
            crate::domain::TourId::random(),
            TourImages {
                cover: None,
                gallery: vec![vec![1]; MAX_GALLERY_IMAGES + 1],
            },
        )
        .await
        .expect_err("too many");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn failed_upload_keeps_stored_images() {
    let store = InMemoryStore::default();
    let actor = lead_guide();
    let tour = service(&store, MockMediaStore::new())
        .create_tour(&actor, sample_tour_details("The Sea Explorer"))
        .await
        .expect("create");

    let mut media = MockMediaStore::new();
    media
        .expect_upload()
        .times(1)
        .returning(|_| Err(MediaStoreError::rejected(400_u16, "bad image")));
    let tours = service(&store, media);
    let err = tours
        .upload_images(
            &actor,
            tour.id,
            TourImages {
                cover: Some(vec![1]),
                gallery: Vec::new(),
            },
        )
        .await
        .expect_err("upload fails");
    assert_eq!(err.code(), ErrorCode::InternalError);
    let stored = tours.get_tour(tour.id).await.expect("stored");
    assert_eq!(stored.details.image_cover, tour.details.image_cover);
}
