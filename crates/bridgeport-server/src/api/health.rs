use actix_web::{Responder, get, web};

use crate::model::RestResult;

#[get("liveness")]
async fn liveness() -> impl Responder {
    RestResult::<String>::http_success("ok".to_string())
}

pub fn routes() -> actix_web::Scope {
    web::scope("/health").service(liveness)
}
