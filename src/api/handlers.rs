use super::error::ApiError;
use super::models::{ConfigResponse, CronResponse, LofQuery, LofResponse, PushBody};
use crate::models::BotResponse;
use crate::monitor::{Monitor, QueryParams};
use crate::pipeline::render;
use axum::{
    body::Bytes,
    extract::{Query, State},
    response::Json,
};
use chrono::Utc;
use std::sync::Arc;

/// GET /health: simple liveness check
pub async fn health() -> &'static str {
    "OK"
}

/// GET /api/config: configured defaults for the page's filter form
pub async fn get_config(State(monitor): State<Arc<Monitor>>) -> Json<ConfigResponse> {
    let config = monitor.config();
    Json(ConfigResponse {
        dis_limit: config.dis_limit,
        pre_limit: config.pre_limit,
        max_items: config.max_items,
    })
}

/// GET /api/lof: selected funds plus the table markdown; query params override config
pub async fn get_lof(
    State(monitor): State<Arc<Monitor>>,
    Query(query): Query<LofQuery>,
) -> Result<Json<LofResponse>, ApiError> {
    let data = monitor.query(&query.into()).await?;
    let markdown = render::to_table(&data);

    Ok(Json(LofResponse {
        success: true,
        data,
        markdown,
        wechat_response: None,
    }))
}

/// POST /api/lof: same selection, pushed to the chat bot
pub async fn post_lof(
    State(monitor): State<Arc<Monitor>>,
    body: Bytes,
) -> Result<Json<LofResponse>, ApiError> {
    if !monitor.can_push() {
        return Err(ApiError::BadRequest(
            "Missing WECHAT_WEBHOOK_KEY environment variable".to_string(),
        ));
    }

    let params: QueryParams = PushBody::parse(&body).into();
    let report = monitor.push(&params, Utc::now()).await?;

    let wechat_response = report.response.unwrap_or_else(|| BotResponse {
        errcode: 0,
        errmsg: "No data to send".to_string(),
    });

    Ok(Json(LofResponse {
        success: wechat_response.is_ok(),
        data: report.records,
        markdown: report.table,
        wechat_response: Some(wechat_response),
    }))
}

/// GET /api/cron: scheduled push with configured defaults
pub async fn cron(State(monitor): State<Arc<Monitor>>) -> Result<Json<CronResponse>, ApiError> {
    let report = monitor.push(&QueryParams::default(), Utc::now()).await?;

    let response = match report.response {
        Some(reply) => CronResponse {
            success: reply.is_ok(),
            message: None,
            count: report.records.len(),
            wechat_response: Some(reply),
        },
        None => CronResponse {
            success: true,
            message: Some("No matching data"),
            count: 0,
            wechat_response: None,
        },
    };

    Ok(Json(response))
}
