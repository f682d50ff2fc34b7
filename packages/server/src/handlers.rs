//! HTTP handler functions for the `RegionIQ` API.

use actix_web::{HttpRequest, HttpResponse, web};
use chrono::{SecondsFormat, Utc};
use regioniq_boundary::registry::all_levels;
use regioniq_metrics::catalogue::all_metrics;
use regioniq_metrics_models::{Measure, MetricDefinition, Scenario};
use regioniq_overlay::{ApplyOutcome, OverlayRequest};
use regioniq_region_models::{
    RegionLevel,
    codes::{ITL1_CODES, itl1_name},
};
use regioniq_server_models::{
    ApiError, ApiHealth, ApiLevel, ApiOverlay, ApiRegion, ApiSchema, ApiVersion,
    OverlayQueryParams, TimeCoverage,
    query::{MAX_YEAR, MIN_YEAR, QueryRequest, QueryResponse, ResponseMeta},
};

use crate::{
    AppState, DATA_SOURCE,
    observations::{self, GEO_SCHEMA},
};

/// Extra measure advertised by the schema alongside the stored ones.
const GROWTH_MEASURE: &str = "growth_yoy";

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/version`
pub async fn version(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiVersion {
        service: "RegionIQ Data API".to_string(),
        api_version: "v1".to_string(),
        forecast_vintage: state.info.forecast_vintage.clone(),
        build: state.info.git_sha.clone(),
        env: state.info.env.clone(),
    })
}

/// `GET /api/schema`
///
/// Returns the metric catalogue, the ITL1 region catalogue, the
/// registered levels and the query options.
pub async fn schema(state: web::Data<AppState>) -> HttpResponse {
    let mut metrics: Vec<MetricDefinition> = all_metrics().to_vec();
    metrics.sort_by(|a, b| a.metric_id.cmp(&b.metric_id));

    let mut regions: Vec<ApiRegion> = ITL1_CODES
        .iter()
        .map(|(db, uk, _)| ApiRegion {
            region_code: (*uk).to_string(),
            region_name: itl1_name(db).unwrap_or(*uk).to_string(),
            level: RegionLevel::Itl1,
            geo_schema: GEO_SCHEMA.to_string(),
            parent_region_code: Some("UK".to_string()),
            valid_from: "2025-01-01".to_string(),
            valid_to: None,
        })
        .collect();
    regions.sort_by(|a, b| a.region_code.cmp(&b.region_code));

    let levels = all_levels()
        .iter()
        .map(|def| ApiLevel {
            level: def.level,
            table: def.table.clone(),
            code_property: def.code_property.clone(),
            name_property: def.name_property.clone(),
        })
        .collect();

    let measures = [Measure::Value, Measure::CiLower, Measure::CiUpper]
        .iter()
        .map(ToString::to_string)
        .chain(std::iter::once(GROWTH_MEASURE.to_string()))
        .collect();

    HttpResponse::Ok().json(ApiSchema {
        version: "v1".to_string(),
        generated_at: Utc::now(),
        lifecycle: state.info.lifecycle(),
        metrics,
        regions,
        levels,
        scenarios: Scenario::all().to_vec(),
        measures,
        time_coverage: TimeCoverage {
            min_year: MIN_YEAR,
            max_year: MAX_YEAR,
        },
    })
}

/// `GET /api/overlay`
///
/// Renders one choropleth frame. Requests that share a `session` share
/// a controller, so a newer request supersedes an older in-flight one.
/// Requests without a session render on their own.
pub async fn overlay(
    state: web::Data<AppState>,
    params: web::Query<OverlayQueryParams>,
) -> HttpResponse {
    let Ok(level) = params.level.parse::<RegionLevel>() else {
        return HttpResponse::BadRequest().json(
            ApiError::new("INVALID_LEVEL", format!("Unknown region level: {}", params.level))
                .with_detail("level", params.level.as_str()),
        );
    };

    let session = params.session.clone();
    let controller = state.controller_for(session.as_deref());

    let mut request = OverlayRequest::new(level, params.metric.clone(), params.year);
    request.scenario = params
        .scenario
        .as_deref()
        .map_or(Scenario::Baseline, Scenario::parse_or_baseline);
    request.mode = params.mode();
    request.selected.clone_from(&params.selected);
    request.focus.clone_from(&params.focus);
    request.mask = params.mask_codes();

    match controller.apply(request).await {
        ApplyOutcome::Ready(frame) => HttpResponse::Ok().json(ApiOverlay {
            session,
            level: frame.overlay.level,
            metric: frame.request.metric_id.clone(),
            year: frame.request.year,
            scenario: frame.request.scenario,
            mode: frame.overlay.mode,
            features: frame.overlay.feature_collection(),
            domain: frame.overlay.domain,
            paint: frame.overlay.paint.clone(),
            summary: frame.overlay.summary.clone(),
            camera: frame.camera,
        }),
        ApplyOutcome::Superseded => HttpResponse::Conflict().json(
            ApiError::new("SUPERSEDED", "A newer overlay request replaced this one.")
                .with_detail("session", session.unwrap_or_default()),
        ),
        ApplyOutcome::NoGeometry => HttpResponse::ServiceUnavailable().json(
            ApiError::new(
                "GEOMETRY_UNAVAILABLE",
                format!("Boundary geometry for {level} could not be loaded."),
            )
            .with_detail("level", level.to_string()),
        ),
    }
}

/// `POST /api/v1/observations/query`
pub async fn observations_query(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<QueryRequest>,
) -> HttpResponse {
    let outcome = match observations::run_query(state.store.as_ref(), &body).await {
        Ok(outcome) => outcome,
        Err(e) => {
            log::warn!("Observation query rejected: {e}");
            return HttpResponse::build(e.status()).json(e.to_api_error());
        }
    };

    let accessed_at = Utc::now();
    let lifecycle = state.info.lifecycle();
    let citation = format!(
        "RegionIQ Data API ({}). Accessed {}. Source: {DATA_SOURCE}.",
        lifecycle.vintage,
        accessed_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    );
    let returned_records = u64::try_from(outcome.records.len()).unwrap_or(u64::MAX);

    log::info!(
        "endpoint=/api/v1/observations/query estimated_records={} returned_records={returned_records} truncated={}",
        outcome.estimated_records,
        outcome.truncated
    );

    HttpResponse::Ok().json(QueryResponse {
        meta: ResponseMeta {
            lifecycle,
            generated_at: accessed_at,
            estimated_records: outcome.estimated_records,
            returned_records,
            truncated: outcome.truncated,
            warnings: Vec::new(),
            citation,
            url: req.full_url().to_string(),
            accessed_at,
            next_cursor: outcome.next_cursor,
        },
        data: outcome.records,
    })
}
