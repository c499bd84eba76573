//! HTTP endpoints: JSON search, spreadsheet export and health check.

use crate::aggregator::summarize;
use crate::error::ApiError;
use crate::export::{export_filename, write_workbook, XLSX_CONTENT_TYPE};
use crate::models::{ListingRecord, SearchResult};
use crate::scrapers::{ListingSource, RateSource, SearchParams};
use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

/// Listing and rate sources shared by every request
#[derive(Clone)]
pub struct AppState {
    pub listings: Arc<dyn ListingSource>,
    pub rates: Arc<dyn RateSource>,
}

impl AppState {
    /// Scrape every page, then fetch the exchange rate once
    async fn scrape_with_rate(
        &self,
        params: &SearchParams,
    ) -> anyhow::Result<(Vec<ListingRecord>, f64)> {
        let listings = self.listings.scrape(params).await?;
        let rate = self.rates.fetch_rate().await;
        Ok((listings, rate))
    }

    pub async fn search(&self, params: &SearchParams) -> anyhow::Result<SearchResult> {
        let (listings, rate) = self.scrape_with_rate(params).await?;
        Ok(summarize(listings, rate))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/search", post(search))
        .route("/api/export", post(export))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthCheck {
    status: String,
    message: String,
    version: String,
}

async fn health_check() -> Json<HealthCheck> {
    Json(HealthCheck {
        status: "ok".to_string(),
        message: "Autos Scout API is running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Accept the JSON body only when it names a non-blank version
fn validated(payload: Result<Json<SearchParams>, JsonRejection>) -> Result<SearchParams, ApiError> {
    let Json(mut params) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    params.version = params.version.trim().to_string();
    if params.version.is_empty() {
        return Err(ApiError::BadRequest("Versión requerida".to_string()));
    }
    Ok(params)
}

async fn search(
    State(state): State<AppState>,
    payload: Result<Json<SearchParams>, JsonRejection>,
) -> Result<Json<SearchResult>, ApiError> {
    let params = validated(payload)?;
    info!("Search request for {:?}", params.query());

    let result = state.search(&params).await?;
    info!(
        "Returning {} listings, average {}",
        result.listings.len(),
        result.average_price
    );
    Ok(Json(result))
}

async fn export(
    State(state): State<AppState>,
    payload: Result<Json<SearchParams>, JsonRejection>,
) -> Result<Response, ApiError> {
    let params = validated(payload)?;
    info!("Export request for {:?}", params.query());

    let (listings, rate) = state.scrape_with_rate(&params).await?;
    let workbook = write_workbook(&listings, rate)?;

    let filename = export_filename(&params, Local::now().date_naive());
    let disposition =
        HeaderValue::from_str(&content_disposition(&filename)).context("Invalid export filename")?;

    info!("Exported {} listings to {}", listings.len(), filename);
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(XLSX_CONTENT_TYPE)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        workbook,
    )
        .into_response())
}

/// Characters left unescaped in `filename*` (a subset of RFC 5987 `attr-char`)
const FILENAME_ATTR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Attachment header with an ASCII `filename` and the UTF-8 `filename*`
fn content_disposition(filename: &str) -> String {
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii_filename(filename),
        utf8_percent_encode(filename, FILENAME_ATTR)
    )
}

/// Keep the filename safe inside a quoted ASCII header parameter
fn ascii_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if !c.is_ascii() || c == '"' || c == '\\' || c.is_ascii_control() {
                '_'
            } else {
                c
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::scrapers::{BnaRateFetcher, MercadoLibreScraper};
    use crate::test_support::serve;
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct StubListings(Vec<ListingRecord>);

    #[async_trait]
    impl ListingSource for StubListings {
        async fn scrape(&self, _params: &SearchParams) -> anyhow::Result<Vec<ListingRecord>> {
            Ok(self.0.clone())
        }

        fn source_name(&self) -> &'static str {
            "stub"
        }
    }

    struct BrokenListings;

    #[async_trait]
    impl ListingSource for BrokenListings {
        async fn scrape(&self, _params: &SearchParams) -> anyhow::Result<Vec<ListingRecord>> {
            anyhow::bail!("markup changed")
        }

        fn source_name(&self) -> &'static str {
            "broken"
        }
    }

    struct FixedRate(f64);

    #[async_trait]
    impl RateSource for FixedRate {
        async fn fetch_rate(&self) -> f64 {
            self.0
        }
    }

    fn stub_app() -> Router {
        let listings = vec![
            ListingRecord {
                title: "Corolla XEI".to_string(),
                link: "https://auto.mercadolibre.com.ar/MLA-1".to_string(),
                raw_price: 5_000_000,
                km: 15_000,
                ..Default::default()
            },
            ListingRecord {
                title: "Corolla SEG".to_string(),
                link: "https://auto.mercadolibre.com.ar/MLA-2".to_string(),
                raw_price: 20_000,
                is_usd: true,
                km: 5_000,
                ..Default::default()
            },
        ];
        router(AppState {
            listings: Arc::new(StubListings(listings)),
            rates: Arc::new(FixedRate(1155.0)),
        })
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let response = stub_app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn blank_version_is_rejected() {
        for body in [json!({ "version": "" }), json!({ "version": "   " }), json!({})] {
            let response = stub_app().oneshot(post_json("/api/search", body)).await.unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(json_body(response).await["error"], "Versión requerida");
        }
    }

    #[tokio::test]
    async fn malformed_body_is_rejected() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/search")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = stub_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn search_returns_summary() {
        let response = stub_app()
            .oneshot(post_json("/api/search", json!({ "version": "Corolla", "year": "2023" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["datos"].as_array().unwrap().len(), 2);
        assert_eq!(body["datos"][1]["precio_ars"], 23_100_000.0);
        assert_eq!(body["promedio"], 14_050_000);
        assert_eq!(body["price_min"], 5_000_000.0);
        assert_eq!(body["price_max"], 23_100_000.0);
        assert_eq!(body["km_min"], 5_000);
        assert_eq!(body["km_max"], 15_000);
    }

    #[tokio::test]
    async fn scrape_failure_is_a_server_error() {
        let app = router(AppState {
            listings: Arc::new(BrokenListings),
            rates: Arc::new(FixedRate(1155.0)),
        });
        let response = app
            .oneshot(post_json("/api/search", json!({ "version": "Corolla" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["error"], "markup changed");
    }

    #[tokio::test]
    async fn export_returns_workbook_attachment() {
        let response = stub_app()
            .oneshot(post_json("/api/export", json!({ "version": "Corolla", "year": "2023" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], XLSX_CONTENT_TYPE);
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment; filename=\"Corolla-2023-"));
        assert!(disposition.contains(".xlsx\"; filename*=UTF-8''Corolla-2023-"));
        assert!(disposition.ends_with(".xlsx"));

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }

    #[tokio::test]
    async fn export_requires_version() {
        let response = stub_app()
            .oneshot(post_json("/api/export", json!({ "year": "2023" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn search_against_live_style_sites() {
        const RESULTS: &str = r#"<html><body><ol>
            <li class="ui-search-layout__item"><div class="poly-card__content">
              <h3 class="poly-component__title-wrapper"><a href="https://x/MLA-1">Toyota Corolla</a></h3>
              <div class="poly-component__price"><span>U$S</span><span>10.000</span></div>
              <div class="poly-component__attributes-list"><ul class="poly-attributes_list">
                <li>2023</li><li>12.000 Km</li></ul></div>
            </div></li>
        </ol></body></html>"#;
        const EMPTY: &str = "<html><body><ol></ol></body></html>";
        const BNA: &str = r#"<span class="value sell">1.000,00</span>"#;

        let site = serve(
            Router::new()
                .route("/Corolla-2023", get(|| async { axum::response::Html(RESULTS) }))
                .route("/Corolla-2023_Desde_2", get(|| async { axum::response::Html(EMPTY) }))
                .route("/bna", get(|| async { axum::response::Html(BNA) })),
        )
        .await;
        let config = AppConfig::default()
            .with_search_base_url(site.clone())
            .with_rate_url(format!("{}bna", site));
        let app = router(AppState {
            listings: Arc::new(MercadoLibreScraper::new(&config).unwrap()),
            rates: Arc::new(BnaRateFetcher::new(&config).unwrap()),
        });

        let response = app
            .oneshot(post_json("/api/search", json!({ "version": "Corolla", "year": "2023" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let datos = body["datos"].as_array().unwrap();
        assert_eq!(datos.len(), 1);
        assert_eq!(datos[0]["es_usd"], true);
        assert_eq!(datos[0]["km"], 12_000);
        assert_eq!(body["promedio"], 10_000_000);
    }

    #[test]
    fn filename_quotes_are_replaced() {
        assert_eq!(ascii_filename("Ka \"Sport\".xlsx"), "Ka _Sport_.xlsx");
    }

    #[test]
    fn non_ascii_filename_gets_utf8_parameter() {
        assert_eq!(
            content_disposition("Citroën C4-2023-19-10-2026.xlsx"),
            "attachment; filename=\"Citro_n C4-2023-19-10-2026.xlsx\"; \
             filename*=UTF-8''Citro%C3%ABn%20C4-2023-19-10-2026.xlsx"
        );
    }

    #[tokio::test]
    async fn export_header_survives_accented_version() {
        let response = stub_app()
            .oneshot(post_json("/api/export", json!({ "version": "Citroën", "year": "2023" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.starts_with("attachment; filename=\"Citro_n-2023-"));
        assert!(disposition.contains("filename*=UTF-8''Citro%C3%ABn-2023-"));
    }
}
