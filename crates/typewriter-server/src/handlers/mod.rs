pub mod health;
pub mod root;
pub mod simulate;
pub mod stream;

use actix_web::{HttpRequest, HttpResponse};

use crate::error::{AppError, Result};

pub async fn not_found(req: HttpRequest) -> Result<HttpResponse> {
    Err(AppError::NotFound(req.path().to_string()))
}
