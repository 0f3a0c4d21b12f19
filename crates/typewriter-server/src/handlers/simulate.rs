use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, Result};

#[derive(Debug, Deserialize)]
pub struct SimulateRequest {
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct SimulateResponse {
    pub message: String,
}

/// Non-streaming echo kept for clients of the first version of the demo.
pub async fn handler(req: web::Json<SimulateRequest>) -> Result<HttpResponse> {
    let data = match req.into_inner().data {
        Some(Value::Null) | None => {
            return Err(AppError::InvalidRequest(
                "Field 'data' is required".to_string(),
            ))
        }
        Some(data) => data,
    };

    let data = display_value(&data);
    log::info!("Received data: {}", data);

    Ok(HttpResponse::Ok().json(SimulateResponse {
        message: format!("Processed data: {}", data),
    }))
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
