//! Maintenance endpoint for administrators.
//!
//! ```text
//! POST /api/v1/admin/update-database
//! ```

use actix_web::{post, web};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::MediaMigrationReport;
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::AuthContext;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MigrationCounts {
    pub tours_updated: u32,
    pub users_updated: u32,
}

impl From<MediaMigrationReport> for MigrationCounts {
    fn from(report: MediaMigrationReport) -> Self {
        Self {
            tours_updated: report.tours_updated,
            users_updated: report.users_updated,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MigrationResponse {
    #[schema(value_type = String, example = "success")]
    pub status: &'static str,
    #[schema(value_type = String)]
    pub message: &'static str,
    pub data: MigrationCounts,
}

/// Rewrite legacy image file names to hosted media URLs.
#[utoipa::path(
    post,
    path = "/api/v1/admin/update-database",
    responses(
        (status = 200, description = "Media references rewritten", body = MigrationResponse),
        (status = 401, description = "Not logged in", body = ErrorSchema),
        (status = 403, description = "Admins only", body = ErrorSchema)
    ),
    tags = ["admin"],
    operation_id = "updateDatabase"
)]
#[post("/admin/update-database")]
pub async fn update_database(
    state: web::Data<HttpState>,
    auth: AuthContext,
) -> ApiResult<web::Json<MigrationResponse>> {
    let report = state.maintenance.migrate(&auth.actor()).await?;
    Ok(web::Json(MigrationResponse {
        status: "success",
        message: "Database updated successfully",
        data: report.into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use crate::domain::ports::Repository;
    use crate::test_support::MEDIA_TEST_BASE;
    use crate::test_support::http::{TestApp, bearer};
    use actix_web::http::StatusCode;
    use actix_web::test;
    use rstest::{fixture, rstest};
    use serde_json::Value;

    #[fixture]
    fn harness() -> TestApp {
        TestApp::new()
    }

    #[rstest]
    #[actix_web::test]
    async fn admins_rewrite_legacy_references_once(harness: TestApp) {
        let (_, token) = harness.seed_user("Root", "root@example.com", Role::Admin).await;
        let tour = harness.seed_tour("The Forest Hiker").await;
        let app = test::init_service(harness.app()).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/admin/update-database")
            .insert_header(bearer(&token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "Database updated successfully");
        assert_eq!(body["data"]["toursUpdated"], 1);

        let stored = harness
            .store
            .tours()
            .find_by_id(tour.id)
            .await
            .expect("lookup")
            .expect("tour");
        assert_eq!(
            stored.details.image_cover,
            format!("{MEDIA_TEST_BASE}/tours/tour-1-cover.jpg")
        );

        let req = test::TestRequest::post()
            .uri("/api/v1/admin/update-database")
            .insert_header(bearer(&token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["toursUpdated"], 0);
    }

    #[rstest]
    #[case(Role::User)]
    #[case(Role::LeadGuide)]
    #[actix_web::test]
    async fn non_admins_are_forbidden(harness: TestApp, #[case] role: Role) {
        let (_, token) = harness.seed_user("Ada", "ada@example.com", role).await;
        let app = test::init_service(harness.app()).await;
        let req = test::TestRequest::post()
            .uri("/api/v1/admin/update-database")
            .insert_header(bearer(&token))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }
}
