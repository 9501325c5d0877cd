use actix_web::{web, HttpResponse};

use crate::models::{SchoolDomain, SchoolSummary};
use crate::services::GeoService;
use crate::utils::AppError;

/// GET /api/schools - Todas as escolas
#[utoipa::path(
    get,
    path = "/api/schools",
    tag = "Schools",
    responses(
        (status = 200, description = "All schools", body = Vec<SchoolSummary>)
    )
)]
pub async fn list_schools(geo: web::Data<GeoService>) -> HttpResponse {
    let schools: Vec<SchoolSummary> = geo.universities().iter().map(SchoolSummary::from).collect();
    HttpResponse::Ok().json(schools)
}

/// GET /api/schools/states
#[utoipa::path(
    get,
    path = "/api/schools/states",
    tag = "Schools",
    responses(
        (status = 200, description = "Distinct state codes, sorted", body = Vec<String>)
    )
)]
pub async fn list_states(geo: web::Data<GeoService>) -> HttpResponse {
    HttpResponse::Ok().json(geo.states())
}

/// GET /api/schools/{state}
#[utoipa::path(
    get,
    path = "/api/schools/{state}",
    tag = "Schools",
    params(("state" = String, Path, description = "Two-letter state code")),
    responses(
        (status = 200, description = "Schools in the state", body = Vec<SchoolSummary>)
    )
)]
pub async fn get_schools_by_state(path: web::Path<String>, geo: web::Data<GeoService>) -> HttpResponse {
    let schools: Vec<SchoolSummary> = geo
        .schools_in_state(&path)
        .into_iter()
        .map(SchoolSummary::from)
        .collect();

    log::debug!("🏫 {} schools in {}", schools.len(), path);
    HttpResponse::Ok().json(schools)
}

/// GET /api/schools/domain/{name} - Domínio de email e cores da escola
#[utoipa::path(
    get,
    path = "/api/schools/domain/{name}",
    tag = "Schools",
    params(("name" = String, Path, description = "School name")),
    responses(
        (status = 200, description = "School email domain", body = SchoolDomain),
        (status = 404, description = "School not found")
    )
)]
pub async fn get_school_domain(path: web::Path<String>, geo: web::Data<GeoService>) -> Result<HttpResponse, AppError> {
    let school_not_found = || AppError::NotFound("School not found".to_string());

    let university = geo.find_university(&path).ok_or_else(school_not_found)?;
    let domain = university.domains.first().ok_or_else(school_not_found)?;

    Ok(HttpResponse::Ok().json(SchoolDomain {
        domain: domain.clone(),
        colors: university.colors.clone(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::geo_service::tests::sample_geo;
    use actix_web::{http::StatusCode, test, App};

    #[actix_web::test]
    async fn test_schools_and_domain_lookup() {
        let app = test::init_service(
            App::new().app_data(web::Data::new(sample_geo())).service(
                web::scope("/api/schools")
                    .route("", web::get().to(list_schools))
                    .route("/states", web::get().to(list_states))
                    .route("/domain/{name}", web::get().to(get_school_domain))
                    .route("/{state}", web::get().to(get_schools_by_state)),
            ),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/schools/UT").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body[0]["name"], "Utah State University");
        assert_eq!(body[0]["domain"], "usu.edu");

        let req = test::TestRequest::get()
            .uri("/api/schools/domain/Utah%20State%20University")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["domain"], "usu.edu");

        let req = test::TestRequest::get()
            .uri("/api/schools/domain/Nowhere%20College")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "School not found");
    }

    #[actix_web::test]
    async fn test_list_all_schools_and_states() {
        let app = test::init_service(
            App::new().app_data(web::Data::new(sample_geo())).service(
                web::scope("/api/schools")
                    .route("", web::get().to(list_schools))
                    .route("/states", web::get().to(list_states))
                    .route("/{state}", web::get().to(get_schools_by_state)),
            ),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/schools/states").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, serde_json::json!(["UT"]));

        let req = test::TestRequest::get().uri("/api/schools").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(
            body[0],
            serde_json::json!({
                "name": "Utah State University",
                "domain": "usu.edu",
                "state": "UT",
                "colors": null
            })
        );
    }
}
