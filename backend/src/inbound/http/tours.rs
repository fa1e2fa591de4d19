//! Tour catalogue endpoints.
//!
//! ```text
//! GET    /api/v1/tours
//! GET    /api/v1/tours/{id}
//! POST   /api/v1/tours                 (admin, lead-guide)
//! PATCH  /api/v1/tours/{id}            (admin, lead-guide)
//! DELETE /api/v1/tours/{id}            (admin, lead-guide)
//! PATCH  /api/v1/tours/{id}/images     (multipart `imageCover`, `images`)
//! ```
//!
//! Prices are USD cents.

use actix_multipart::Multipart;
use actix_web::{HttpResponse, delete, get, patch, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

use crate::domain::{
    Difficulty, Location, MAX_GALLERY_IMAGES, Tour, TourDetails, TourId, TourImages, TourPatch,
    TourSummary, UserId,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::AuthContext;
use crate::inbound::http::envelope::{Envelope, Wrapped};
use crate::inbound::http::schemas::{DifficultySchema, ErrorSchema, LocationSchema};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::uploads::{ImageField, collect_images};
use crate::inbound::http::validation::{
    FieldName, PageQuery, invalid_field, non_negative, parse_id, parse_rfc3339_timestamp,
};

const COVER_FIELD: ImageField = ImageField::new("imageCover", 1);
const GALLERY_FIELD: ImageField = ImageField::new("images", MAX_GALLERY_IMAGES);

/// Tour as returned to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TourDto {
    #[schema(value_type = String)]
    pub id: TourId,
    #[schema(example = "The Forest Hiker")]
    pub name: String,
    #[schema(example = "the-forest-hiker")]
    pub slug: String,
    /// Length in days.
    pub duration: u32,
    pub max_group_size: u32,
    #[schema(value_type = DifficultySchema)]
    pub difficulty: Difficulty,
    pub ratings_average: f64,
    pub ratings_quantity: u32,
    pub price: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_discount: Option<u32>,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub image_cover: String,
    pub images: Vec<String>,
    pub start_dates: Vec<DateTime<Utc>>,
    #[schema(value_type = Option<LocationSchema>)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_location: Option<Location>,
    #[schema(value_type = Vec<LocationSchema>)]
    pub locations: Vec<Location>,
    #[schema(value_type = Vec<String>)]
    pub guides: Vec<UserId>,
    pub created_at: DateTime<Utc>,
}

impl From<&Tour> for TourDto {
    fn from(tour: &Tour) -> Self {
        let details = &tour.details;
        Self {
            id: tour.id,
            name: details.name.clone(),
            slug: tour.slug.clone(),
            duration: details.duration_days,
            max_group_size: details.max_group_size,
            difficulty: details.difficulty,
            ratings_average: tour.ratings.average,
            ratings_quantity: tour.ratings.quantity,
            price: details.price,
            price_discount: details.price_discount,
            summary: details.summary.clone(),
            description: details.description.clone(),
            image_cover: details.image_cover.clone(),
            images: details.images.clone(),
            start_dates: details.start_dates.clone(),
            start_location: details.start_location.clone(),
            locations: details.locations.clone(),
            guides: details.guides.clone(),
            created_at: tour.created_at,
        }
    }
}

/// Minimal tour fields joined onto bookings and reviews.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TourSummaryDto {
    #[schema(value_type = String)]
    pub id: TourId,
    pub name: String,
    pub slug: String,
    pub image_cover: String,
    pub start_dates: Vec<DateTime<Utc>>,
    pub duration: u32,
    #[schema(value_type = DifficultySchema)]
    pub difficulty: Difficulty,
    pub price: u32,
}

impl From<&TourSummary> for TourSummaryDto {
    fn from(summary: &TourSummary) -> Self {
        Self {
            id: summary.id,
            name: summary.name.clone(),
            slug: summary.slug.clone(),
            image_cover: summary.image_cover.clone(),
            start_dates: summary.start_dates.clone(),
            duration: summary.duration_days,
            difficulty: summary.difficulty,
            price: summary.price,
        }
    }
}

/// Body of `POST /tours`.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTourBody {
    pub name: String,
    pub duration: i64,
    pub max_group_size: i64,
    #[schema(example = "easy")]
    pub difficulty: String,
    pub price: i64,
    pub price_discount: Option<i64>,
    pub summary: String,
    pub description: Option<String>,
    pub image_cover: String,
    #[serde(default)]
    pub images: Vec<String>,
    /// RFC 3339 timestamps.
    #[serde(default)]
    pub start_dates: Vec<String>,
    #[schema(value_type = Option<LocationSchema>)]
    pub start_location: Option<Location>,
    #[schema(value_type = Vec<LocationSchema>)]
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub guides: Vec<String>,
}

/// `Some(None)` for an explicit `null`, `None` when the key is absent.
fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Body of `PATCH /tours/{id}`; absent fields keep stored values.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTourBody {
    pub name: Option<String>,
    pub duration: Option<i64>,
    pub max_group_size: Option<i64>,
    pub difficulty: Option<String>,
    pub price: Option<i64>,
    /// `null` clears the discount.
    #[serde(default, deserialize_with = "explicit_null")]
    #[schema(value_type = Option<i64>)]
    pub price_discount: Option<Option<i64>>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub image_cover: Option<String>,
    pub images: Option<Vec<String>>,
    pub start_dates: Option<Vec<String>>,
    #[schema(value_type = Option<LocationSchema>)]
    pub start_location: Option<Location>,
    #[schema(value_type = Option<Vec<LocationSchema>>)]
    pub locations: Option<Vec<Location>>,
    pub guides: Option<Vec<String>>,
}

fn difficulty(raw: &str) -> ApiResult<Difficulty> {
    raw.parse()
        .map_err(|err| invalid_field(FieldName::new("difficulty"), err))
}

fn start_dates(raw: &[String]) -> ApiResult<Vec<DateTime<Utc>>> {
    raw.iter()
        .map(|value| parse_rfc3339_timestamp(value, FieldName::new("startDates")))
        .collect()
}

fn guides(raw: &[String]) -> ApiResult<Vec<UserId>> {
    raw.iter()
        .map(|value| parse_id(value, FieldName::new("guides")))
        .collect()
}

fn optional_count(value: Option<i64>, field: &'static str) -> ApiResult<Option<u32>> {
    value
        .map(|raw| non_negative(raw, FieldName::new(field)))
        .transpose()
}

impl TryFrom<CreateTourBody> for TourDetails {
    type Error = crate::domain::Error;

    fn try_from(body: CreateTourBody) -> Result<Self, Self::Error> {
        Ok(Self {
            duration_days: non_negative(body.duration, FieldName::new("duration"))?,
            max_group_size: non_negative(body.max_group_size, FieldName::new("maxGroupSize"))?,
            difficulty: difficulty(&body.difficulty)?,
            price: non_negative(body.price, FieldName::new("price"))?,
            price_discount: optional_count(body.price_discount, "priceDiscount")?,
            start_dates: start_dates(&body.start_dates)?,
            guides: guides(&body.guides)?,
            name: body.name,
            summary: body.summary,
            description: body.description,
            image_cover: body.image_cover,
            images: body.images,
            start_location: body.start_location,
            locations: body.locations,
        })
    }
}

impl TryFrom<UpdateTourBody> for TourPatch {
    type Error = crate::domain::Error;

    fn try_from(body: UpdateTourBody) -> Result<Self, Self::Error> {
        Ok(Self {
            duration_days: optional_count(body.duration, "duration")?,
            max_group_size: optional_count(body.max_group_size, "maxGroupSize")?,
            difficulty: body.difficulty.as_deref().map(difficulty).transpose()?,
            price: optional_count(body.price, "price")?,
            price_discount: body
                .price_discount
                .map(|discount| optional_count(discount, "priceDiscount"))
                .transpose()?,
            start_dates: body.start_dates.as_deref().map(start_dates).transpose()?,
            guides: body.guides.as_deref().map(guides).transpose()?,
            name: body.name,
            summary: body.summary,
            description: body.description,
            image_cover: body.image_cover,
            images: body.images,
            start_location: body.start_location,
            locations: body.locations,
        })
    }
}

pub(crate) fn tour_id(raw: &str) -> ApiResult<TourId> {
    parse_id(raw, FieldName::new("tourId"))
}

fn one(tour: &Tour) -> web::Json<Envelope<Wrapped<TourDto>>> {
    web::Json(Envelope::one(TourDto::from(tour)))
}

/// Newest tours first.
#[utoipa::path(
    get,
    path = "/api/v1/tours",
    params(PageQuery),
    responses((status = 200, description = "Tours", body = Envelope<Wrapped<Vec<TourDto>>>)),
    tags = ["tours"],
    operation_id = "listTours",
    security([])
)]
#[get("/tours")]
pub async fn list_tours(
    state: web::Data<HttpState>,
    query: web::Query<PageQuery>,
) -> ApiResult<web::Json<Envelope<Wrapped<Vec<TourDto>>>>> {
    let tours = state.tours.list_tours(query.into_inner().into()).await?;
    Ok(web::Json(Envelope::many(
        tours.iter().map(TourDto::from).collect(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/tours/{id}",
    params(("id" = String, Path, description = "Tour id")),
    responses(
        (status = 200, description = "Tour", body = Envelope<Wrapped<TourDto>>),
        (status = 400, description = "Malformed id", body = ErrorSchema),
        (status = 404, description = "No tour found with that ID", body = ErrorSchema)
    ),
    tags = ["tours"],
    operation_id = "getTour",
    security([])
)]
#[get("/tours/{id}")]
pub async fn get_tour(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<Envelope<Wrapped<TourDto>>>> {
    let tour = state.tours.get_tour(tour_id(&path)?).await?;
    Ok(one(&tour))
}

#[utoipa::path(
    post,
    path = "/api/v1/tours",
    request_body = CreateTourBody,
    responses(
        (status = 201, description = "Tour created", body = Envelope<Wrapped<TourDto>>),
        (status = 400, description = "Invalid tour or duplicate name", body = ErrorSchema),
        (status = 401, description = "Not logged in", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["tours"],
    operation_id = "createTour"
)]
#[post("/tours")]
pub async fn create_tour(
    state: web::Data<HttpState>,
    auth: AuthContext,
    payload: web::Json<CreateTourBody>,
) -> ApiResult<HttpResponse> {
    let actor = auth.actor();
    let details = TourDetails::try_from(payload.into_inner())?;
    let tour = state.tours.create_tour(&actor, details).await?;
    Ok(HttpResponse::Created().json(Envelope::one(TourDto::from(&tour))))
}

#[utoipa::path(
    patch,
    path = "/api/v1/tours/{id}",
    params(("id" = String, Path, description = "Tour id")),
    request_body = UpdateTourBody,
    responses(
        (status = 200, description = "Tour updated", body = Envelope<Wrapped<TourDto>>),
        (status = 400, description = "Invalid tour", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "No tour found with that ID", body = ErrorSchema)
    ),
    tags = ["tours"],
    operation_id = "updateTour"
)]
#[patch("/tours/{id}")]
pub async fn update_tour(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<String>,
    payload: web::Json<UpdateTourBody>,
) -> ApiResult<web::Json<Envelope<Wrapped<TourDto>>>> {
    let id = tour_id(&path)?;
    let patch = TourPatch::try_from(payload.into_inner())?;
    let tour = state.tours.update_tour(&auth.actor(), id, patch).await?;
    Ok(one(&tour))
}

#[utoipa::path(
    delete,
    path = "/api/v1/tours/{id}",
    params(("id" = String, Path, description = "Tour id")),
    responses(
        (status = 204, description = "Tour deleted"),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "No tour found with that ID", body = ErrorSchema)
    ),
    tags = ["tours"],
    operation_id = "deleteTour"
)]
#[delete("/tours/{id}")]
pub async fn delete_tour(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = tour_id(&path)?;
    state.tours.delete_tour(&auth.actor(), id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Upload a cover (`imageCover`) and up to three gallery images (`images`).
#[utoipa::path(
    patch,
    path = "/api/v1/tours/{id}/images",
    params(("id" = String, Path, description = "Tour id")),
    request_body(
        content_type = "multipart/form-data",
        description = "Fields `imageCover` and `images`"
    ),
    responses(
        (status = 200, description = "Images stored", body = Envelope<Wrapped<TourDto>>),
        (status = 400, description = "Non-image or unexpected field", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "No tour found with that ID", body = ErrorSchema),
        (status = 503, description = "Media host unavailable", body = ErrorSchema)
    ),
    tags = ["tours"],
    operation_id = "uploadTourImages"
)]
#[patch("/tours/{id}/images")]
pub async fn upload_tour_images(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<String>,
    payload: Multipart,
) -> ApiResult<web::Json<Envelope<Wrapped<TourDto>>>> {
    let id = tour_id(&path)?;
    let actor = auth.require(crate::domain::Capability::ManageTours)?;
    let mut images = TourImages::default();
    for image in collect_images(payload, &[COVER_FIELD, GALLERY_FIELD]).await? {
        if image.field == COVER_FIELD.name {
            images.cover = Some(image.bytes);
        } else {
            images.gallery.push(image.bytes);
        }
    }
    let tour = state.tours.upload_images(&actor, id, images).await?;
    Ok(one(&tour))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use crate::test_support::http::{MultipartPart, TestApp, bearer, multipart_request};
    use actix_web::http::StatusCode;
    use actix_web::test;
    use rstest::{fixture, rstest};
    use serde_json::{Value, json};

    #[fixture]
    fn harness() -> TestApp {
        TestApp::new()
    }

    fn new_tour_json(name: &str) -> Value {
        json!({
            "name": name,
            "duration": 7,
            "maxGroupSize": 15,
            "difficulty": "medium",
            "price": 99_700,
            "summary": "Exploring the jaw-dropping US east coast by foot and by boat",
            "imageCover": "tour-2-cover.jpg",
            "startDates": ["2025-06-19T09:00:00Z"],
            "startLocation": {
                "description": "Miami, USA",
                "coordinates": [-80.185942, 25.774772]
            }
        })
    }

    #[rstest]
    #[actix_web::test]
    async fn tours_are_public(harness: TestApp) {
        let tour = harness.seed_tour("The Forest Hiker").await;
        let app = test::init_service(harness.app()).await;
        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/api/v1/tours").to_request(),
        )
        .await;
        assert_eq!(body["results"], 1);
        assert_eq!(body["data"]["data"][0]["slug"], "the-forest-hiker");

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get()
                .uri(&format!("/api/v1/tours/{}", tour.id))
                .to_request(),
        )
        .await;
        assert_eq!(body["data"]["data"]["ratingsAverage"], 4.5);
        assert_eq!(body["data"]["data"]["startLocation"]["coordinates"][0], -115.570154);
    }

    #[rstest]
    #[actix_web::test]
    async fn unknown_tours_are_not_found(harness: TestApp) {
        let app = test::init_service(harness.app()).await;
        let res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri(&format!("/api/v1/tours/{}", TourId::random()))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["message"], "No tour found with that ID");
    }

    #[rstest]
    #[case(Role::LeadGuide, StatusCode::CREATED)]
    #[case(Role::Admin, StatusCode::CREATED)]
    #[case(Role::Guide, StatusCode::FORBIDDEN)]
    #[case(Role::User, StatusCode::FORBIDDEN)]
    #[actix_web::test]
    async fn creating_tours_requires_manage_tours(
        harness: TestApp,
        #[case] role: Role,
        #[case] expected: StatusCode,
    ) {
        let (_, token) = harness.seed_user("Staff", "staff@example.com", role).await;
        let app = test::init_service(harness.app()).await;
        let req = test::TestRequest::post()
            .uri("/api/v1/tours")
            .insert_header(bearer(&token))
            .set_json(new_tour_json("The Sea Explorer"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), expected);
    }

    #[rstest]
    #[actix_web::test]
    async fn invalid_difficulty_is_a_field_error(harness: TestApp) {
        let (_, token) = harness.seed_user("Root", "root@example.com", Role::Admin).await;
        let app = test::init_service(harness.app()).await;
        let mut body = new_tour_json("The Sea Explorer");
        body["difficulty"] = json!("extreme");
        let req = test::TestRequest::post()
            .uri("/api/v1/tours")
            .insert_header(bearer(&token))
            .set_json(body)
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["details"]["field"], "difficulty");
    }

    #[rstest]
    #[actix_web::test]
    async fn patching_keeps_unsent_fields_and_clears_discount_on_null(harness: TestApp) {
        let (_, token) = harness.seed_user("Root", "root@example.com", Role::Admin).await;
        let tour = harness.seed_tour("The Forest Hiker").await;
        let app = test::init_service(harness.app()).await;
        let uri = format!("/api/v1/tours/{}", tour.id);
        let req = test::TestRequest::patch()
            .uri(&uri)
            .insert_header(bearer(&token))
            .set_json(json!({ "priceDiscount": 100 }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["data"]["priceDiscount"], 100);

        let req = test::TestRequest::patch()
            .uri(&uri)
            .insert_header(bearer(&token))
            .set_json(json!({ "name": "The Forest Walker", "priceDiscount": null }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let data = &body["data"]["data"];
        assert_eq!(data["slug"], "the-forest-walker");
        assert!(data.get("priceDiscount").is_none());
        assert_eq!(data["price"], 49_700);
    }

    #[rstest]
    #[actix_web::test]
    async fn image_uploads_replace_cover_and_gallery(harness: TestApp) {
        let (_, token) = harness.seed_user("Root", "root@example.com", Role::Admin).await;
        let tour = harness.seed_tour("The Forest Hiker").await;
        let app = test::init_service(harness.app()).await;
        let req = multipart_request(
            test::TestRequest::patch()
                .uri(&format!("/api/v1/tours/{}/images", tour.id))
                .insert_header(bearer(&token)),
            &[
                MultipartPart::image("imageCover", b"cover"),
                MultipartPart::image("images", b"one"),
                MultipartPart::image("images", b"two"),
            ],
        )
        .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = test::read_body_json(res).await;
        let data = &body["data"]["data"];
        let cover = data["imageCover"].as_str().expect("cover");
        assert!(cover.starts_with(&format!("https://media.test/tours/tour-{}-", tour.id)));
        assert!(cover.ends_with("-cover.jpg"));
        assert_eq!(data["images"].as_array().map(Vec::len), Some(2));
    }

    #[rstest]
    #[actix_web::test]
    async fn a_fourth_gallery_image_is_rejected(harness: TestApp) {
        let (_, token) = harness.seed_user("Root", "root@example.com", Role::Admin).await;
        let tour = harness.seed_tour("The Forest Hiker").await;
        let app = test::init_service(harness.app()).await;
        let parts = [MultipartPart::image("images", b"x"); 4];
        let req = multipart_request(
            test::TestRequest::patch()
                .uri(&format!("/api/v1/tours/{}/images", tour.id))
                .insert_header(bearer(&token)),
            &parts,
        )
        .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(harness.media.uploads().is_empty());
    }
}
