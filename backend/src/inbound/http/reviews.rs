//! Review endpoints, including the nested `/tours/{tourId}/reviews` routes.

use actix_web::{HttpResponse, delete, get, patch, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{
    Error, Rating, Review, ReviewId, ReviewPatch, ReviewText, ReviewWithTour, TourId, UserId,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::AuthContext;
use crate::inbound::http::envelope::{Envelope, Wrapped};
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::tours::tour_id;
use crate::inbound::http::validation::{FieldName, PageQuery, invalid_field, parse_id};

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDto {
    #[schema(value_type = String)]
    pub id: ReviewId,
    pub review: String,
    #[schema(minimum = 1, maximum = 5)]
    pub rating: u8,
    #[schema(value_type = String)]
    pub tour_id: TourId,
    #[schema(value_type = String)]
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl From<&Review> for ReviewDto {
    fn from(review: &Review) -> Self {
        Self {
            id: review.id,
            review: review.text.as_str().to_owned(),
            rating: review.rating.get(),
            tour_id: review.tour_id,
            user_id: review.user_id,
            created_at: review.created_at,
        }
    }
}

/// One of the caller's reviews with the reviewed tour's name.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MyReviewDto {
    #[serde(flatten)]
    pub review: ReviewDto,
    #[schema(example = "The Forest Hiker")]
    pub tour_name: String,
    pub tour_image: Option<String>,
}

impl From<&ReviewWithTour> for MyReviewDto {
    fn from(value: &ReviewWithTour) -> Self {
        Self {
            review: ReviewDto::from(&value.review),
            tour_name: value.tour_name().to_owned(),
            tour_image: value.tour.as_ref().map(|tour| tour.image_cover.clone()),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MyReviews {
    pub reviews: Vec<MyReviewDto>,
}

/// Review fields. On create both are required; on update either may be sent.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewBody {
    #[schema(example = 5)]
    pub rating: Option<i64>,
    #[schema(example = "Loved every minute")]
    pub review: Option<String>,
    /// Reviewed tour for `POST /reviews`; ignored on nested routes.
    #[serde(alias = "tour")]
    pub tour_id: Option<String>,
}

impl ReviewBody {
    fn rating(&self) -> ApiResult<Option<Rating>> {
        self.rating
            .map(|value| {
                Rating::new(value).map_err(|err| invalid_field(FieldName::new("rating"), err))
            })
            .transpose()
    }

    fn text(&self) -> ApiResult<Option<ReviewText>> {
        self.review
            .as_deref()
            .map(|value| {
                ReviewText::new(value).map_err(|err| invalid_field(FieldName::new("review"), err))
            })
            .transpose()
    }

    fn into_new_review(self) -> ApiResult<(Rating, ReviewText)> {
        let rating = self
            .rating()?
            .ok_or_else(|| missing(FieldName::new("rating"), "A review must have a rating"))?;
        let text = self
            .text()?
            .ok_or_else(|| missing(FieldName::new("review"), "Review can not be empty!"))?;
        Ok((rating, text))
    }
}

fn missing(field: FieldName, message: &'static str) -> Error {
    invalid_field(field, message)
}

fn review_id(raw: &str) -> ApiResult<ReviewId> {
    parse_id(raw, FieldName::new("id"))
}

async fn submit(
    state: &HttpState,
    auth: &AuthContext,
    tour: TourId,
    body: ReviewBody,
) -> ApiResult<HttpResponse> {
    let (rating, text) = body.into_new_review()?;
    let review = state
        .reviews
        .create_review(&auth.actor(), tour, rating, text)
        .await?;
    Ok(HttpResponse::Created().json(Envelope::one(ReviewDto::from(&review))))
}

async fn list(
    state: &HttpState,
    tour: Option<TourId>,
    query: PageQuery,
) -> ApiResult<web::Json<Envelope<Wrapped<Vec<ReviewDto>>>>> {
    let reviews = state.reviews.list_reviews(tour, query.into()).await?;
    Ok(web::Json(Envelope::many(
        reviews.iter().map(ReviewDto::from).collect(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/reviews",
    params(PageQuery),
    responses((status = 200, description = "Reviews", body = Envelope<Wrapped<Vec<ReviewDto>>>)),
    tags = ["reviews"],
    operation_id = "listReviews",
    security([])
)]
#[get("/reviews")]
pub async fn list_reviews(
    state: web::Data<HttpState>,
    query: web::Query<PageQuery>,
) -> ApiResult<web::Json<Envelope<Wrapped<Vec<ReviewDto>>>>> {
    list(&state, None, query.into_inner()).await
}

#[utoipa::path(
    post,
    path = "/api/v1/reviews",
    request_body = ReviewBody,
    responses(
        (status = 201, description = "Review created", body = Envelope<Wrapped<ReviewDto>>),
        (status = 400, description = "Invalid review or already reviewed", body = ErrorSchema),
        (status = 403, description = "Only users may review", body = ErrorSchema),
        (status = 404, description = "No tour found with that ID", body = ErrorSchema)
    ),
    tags = ["reviews"],
    operation_id = "createReview"
)]
#[post("/reviews")]
pub async fn create_review(
    state: web::Data<HttpState>,
    auth: AuthContext,
    payload: web::Json<ReviewBody>,
) -> ApiResult<HttpResponse> {
    let body = payload.into_inner();
    let tour = body
        .tour_id
        .as_deref()
        .ok_or_else(|| missing(FieldName::new("tourId"), "Review must belong to a tour"))
        .and_then(tour_id)?;
    submit(&state, &auth, tour, body).await
}

/// The caller's reviews, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/reviews/my-reviews",
    responses(
        (status = 200, description = "Reviews", body = Envelope<MyReviews>),
        (status = 401, description = "Not logged in", body = ErrorSchema)
    ),
    tags = ["reviews"],
    operation_id = "listMyReviews"
)]
#[get("/reviews/my-reviews")]
pub async fn my_reviews(
    state: web::Data<HttpState>,
    auth: AuthContext,
) -> ApiResult<web::Json<Envelope<MyReviews>>> {
    let reviews = state.reviews.list_my_reviews(&auth.actor()).await?;
    let count = reviews.len();
    Ok(web::Json(
        Envelope::new(MyReviews {
            reviews: reviews.iter().map(MyReviewDto::from).collect(),
        })
        .with_results(count),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/reviews/{id}",
    params(("id" = String, Path, description = "Review id")),
    responses(
        (status = 200, description = "Review", body = Envelope<Wrapped<ReviewDto>>),
        (status = 404, description = "No review found with that ID", body = ErrorSchema)
    ),
    tags = ["reviews"],
    operation_id = "getReview",
    security([])
)]
#[get("/reviews/{id}")]
pub async fn get_review(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<Envelope<Wrapped<ReviewDto>>>> {
    let review = state.reviews.get_review(review_id(&path)?).await?;
    Ok(web::Json(Envelope::one(ReviewDto::from(&review))))
}

/// Edit a review. Authors edit their own; admins edit any.
#[utoipa::path(
    patch,
    path = "/api/v1/reviews/{id}",
    params(("id" = String, Path, description = "Review id")),
    request_body = ReviewBody,
    responses(
        (status = 200, description = "Review updated", body = Envelope<Wrapped<ReviewDto>>),
        (status = 403, description = "Not the author", body = ErrorSchema),
        (status = 404, description = "No review found with that ID", body = ErrorSchema)
    ),
    tags = ["reviews"],
    operation_id = "updateReview"
)]
#[patch("/reviews/{id}")]
pub async fn update_review(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<String>,
    payload: web::Json<ReviewBody>,
) -> ApiResult<web::Json<Envelope<Wrapped<ReviewDto>>>> {
    let id = review_id(&path)?;
    let patch = ReviewPatch {
        rating: payload.rating()?,
        text: payload.text()?,
    };
    let review = state
        .reviews
        .update_review(&auth.actor(), id, patch)
        .await?;
    Ok(web::Json(Envelope::one(ReviewDto::from(&review))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/reviews/{id}",
    params(("id" = String, Path, description = "Review id")),
    responses(
        (status = 204, description = "Review deleted"),
        (status = 403, description = "Not the author", body = ErrorSchema),
        (status = 404, description = "No review found with that ID", body = ErrorSchema)
    ),
    tags = ["reviews"],
    operation_id = "deleteReview"
)]
#[delete("/reviews/{id}")]
pub async fn delete_review(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = review_id(&path)?;
    state.reviews.delete_review(&auth.actor(), id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/api/v1/tours/{tourId}/reviews",
    params(("tourId" = String, Path, description = "Tour id"), PageQuery),
    responses((
        status = 200,
        description = "Reviews of one tour",
        body = Envelope<Wrapped<Vec<ReviewDto>>>
    )),
    tags = ["reviews"],
    operation_id = "listTourReviews",
    security([])
)]
#[get("/tours/{tourId}/reviews")]
pub async fn list_tour_reviews(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> ApiResult<web::Json<Envelope<Wrapped<Vec<ReviewDto>>>>> {
    let tour = tour_id(&path)?;
    list(&state, Some(tour), query.into_inner()).await
}

#[utoipa::path(
    post,
    path = "/api/v1/tours/{tourId}/reviews",
    params(("tourId" = String, Path, description = "Tour id")),
    request_body = ReviewBody,
    responses(
        (status = 201, description = "Review created", body = Envelope<Wrapped<ReviewDto>>),
        (status = 400, description = "Invalid review or already reviewed", body = ErrorSchema),
        (status = 403, description = "Only users may review", body = ErrorSchema),
        (status = 404, description = "No tour found with that ID", body = ErrorSchema)
    ),
    tags = ["reviews"],
    operation_id = "createTourReview"
)]
#[post("/tours/{tourId}/reviews")]
pub async fn create_tour_review(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<String>,
    payload: web::Json<ReviewBody>,
) -> ApiResult<HttpResponse> {
    let tour = tour_id(&path)?;
    submit(&state, &auth, tour, payload.into_inner()).await
}
