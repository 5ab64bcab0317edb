use std::collections::HashMap;

use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Page and limit from the query string. Garbage falls back to the defaults
/// instead of failing the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn from_query(queries: &HashMap<String, String>) -> Self {
        let parse = |key: &str| queries.get(key).and_then(|v| v.trim().parse::<i64>().ok());

        let page = parse("page").filter(|p| *p >= 1).unwrap_or(1);
        let limit = parse("limit")
            .filter(|l| (1..=MAX_PAGE_SIZE).contains(l))
            .unwrap_or(DEFAULT_PAGE_SIZE);

        PageRequest { page, limit }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_comments: i64,
    pub per_page: i64,
}

impl Pagination {
    pub fn new(req: PageRequest, total: i64) -> Self {
        Pagination {
            current_page: req.page,
            total_pages: (total + req.limit - 1) / req.limit,
            total_comments: total,
            per_page: req.limit,
        }
    }
}
