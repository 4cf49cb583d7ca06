//! JSON envelopes shared by every endpoint.

use serde::Serialize;
use store::Page;

/// `{ "success": true, "data": ..., "pagination": ... }`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationResponse>,
}

#[derive(Debug, Serialize)]
pub struct PaginationResponse {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            pagination: None,
        }
    }
}

impl<T> ApiResponse<Vec<T>> {
    /// Wraps one page of results, converting each item.
    pub fn page<U>(page: Page<U>, convert: impl FnMut(U) -> T) -> Self {
        let page = page.map(convert);
        Self {
            success: true,
            pagination: Some(PaginationResponse {
                page: page.page,
                limit: page.limit,
                total: page.total,
                pages: page.pages,
            }),
            data: page.items,
        }
    }
}
