//! HTTP response envelope

use actix_web::{HttpResponse, HttpResponseBuilder, http::StatusCode};
use serde::{Deserialize, Serialize};

pub const SUCCESS_CODE: i32 = 0;
pub const NOT_READY_CODE: i32 = 503;

/// Envelope of every API response
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RestResult<T> {
    pub code: i32,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> RestResult<T> {
    pub fn new(code: i32, message: String, data: T) -> Self {
        RestResult {
            code,
            message,
            data,
        }
    }

    pub fn success(data: T) -> Self {
        RestResult {
            code: SUCCESS_CODE,
            message: "success".to_string(),
            data,
        }
    }

    pub fn http_success(data: T) -> HttpResponse {
        HttpResponse::Ok().json(RestResult::success(data))
    }

    pub fn http_response(status: u16, code: i32, message: String, data: T) -> HttpResponse {
        HttpResponseBuilder::new(StatusCode::from_u16(status).unwrap_or_default())
            .json(RestResult::new(code, message, data))
    }
}
