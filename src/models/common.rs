use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const MAX_PAGE_SIZE: u64 = 100;
/// SQL OFFSET is a signed 64-bit value on both backends.
const MAX_OFFSET: u64 = i64::MAX as u64;

/// Turns 1-based `page`/`limit` query values into `(offset, limit)`.
pub fn page_window(page: Option<u64>, limit: Option<u64>, default_limit: u64) -> (u64, u64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(default_limit).clamp(1, MAX_PAGE_SIZE);
    ((page - 1).saturating_mul(limit).min(MAX_OFFSET), limit)
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PageQuery {
    #[schema(example = 1)]
    pub page: Option<u64>,
    #[schema(example = 20)]
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DetailResponse {
    pub detail: String,
}

impl DetailResponse {
    pub fn new(detail: impl Into<String>) -> Self {
        DetailResponse {
            detail: detail.into(),
        }
    }
}
