//! Trade list filters, sort order and pagination.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::error::JournalError;
use super::trade::{Side, TradeStatus, parse_timestamp};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Date,
    Symbol,
    Side,
    EntryPrice,
    ExitPrice,
    Quantity,
    ProfitLoss,
    Status,
    StrategyTag,
    CreatedAt,
}

impl SortField {
    pub fn parse(raw: &str) -> Option<Self> {
        let field = match raw {
            "date" => SortField::Date,
            "symbol" => SortField::Symbol,
            "side" => SortField::Side,
            "entryPrice" => SortField::EntryPrice,
            "exitPrice" => SortField::ExitPrice,
            "quantity" => SortField::Quantity,
            "profitLoss" => SortField::ProfitLoss,
            "status" => SortField::Status,
            "strategyTag" => SortField::StrategyTag,
            "createdAt" => SortField::CreatedAt,
            _ => return None,
        };
        Some(field)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeFilter {
    pub symbol: Option<String>,
    pub side: Option<Side>,
    pub status: Option<TradeStatus>,
    pub strategy: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeQuery {
    pub filter: TradeFilter,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    pub page: u32,
    pub page_size: u32,
}

impl Default for TradeQuery {
    fn default() -> Self {
        Self {
            filter: TradeFilter::default(),
            sort_by: SortField::Date,
            sort_order: SortOrder::Desc,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl TradeQuery {
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }
}

/// Raw query string. Values stay strings so bad input becomes a
/// field-level validation error instead of an extractor rejection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeQueryParams {
    pub symbol: Option<String>,
    pub side: Option<String>,
    pub status: Option<String>,
    pub strategy: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
    /// Older name for `pageSize`; ignored when both are sent.
    pub limit: Option<String>,
}

fn present(raw: Option<String>) -> Option<String> {
    raw.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_positive(field: &str, raw: &str) -> Result<u32, JournalError> {
    match raw.parse::<u32>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(JournalError::validation(
            field,
            format!("{field} must be a positive integer"),
        )),
    }
}

fn parse_bound(field: &str, raw: &str, end_of_day: bool) -> Result<DateTime<Utc>, JournalError> {
    if end_of_day {
        if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            if let Some(dt) = day.and_hms_micro_opt(23, 59, 59, 999_999) {
                return Ok(dt.and_utc());
            }
        }
    }
    parse_timestamp(raw)
        .ok_or_else(|| JournalError::validation(field, format!("Invalid {field}: {raw}")))
}

impl TradeQueryParams {
    pub fn validate(self) -> Result<TradeQuery, JournalError> {
        let mut query = TradeQuery::default();

        query.filter.symbol = present(self.symbol).map(|s| s.to_uppercase());
        query.filter.side = present(self.side).map(|s| s.parse()).transpose()?;
        query.filter.status = present(self.status).map(|s| s.parse()).transpose()?;
        query.filter.strategy = present(self.strategy);
        query.filter.start = present(self.start_date)
            .map(|s| parse_bound("startDate", &s, false))
            .transpose()?;
        query.filter.end = present(self.end_date)
            .map(|s| parse_bound("endDate", &s, true))
            .transpose()?;
        if let (Some(start), Some(end)) = (query.filter.start, query.filter.end) {
            if start > end {
                return Err(JournalError::validation(
                    "startDate",
                    "startDate must not be after endDate",
                ));
            }
        }

        if let Some(raw) = present(self.sort_by) {
            query.sort_by = SortField::parse(&raw).ok_or_else(|| {
                JournalError::validation("sortBy", format!("Cannot sort by {raw}"))
            })?;
        }
        if let Some(raw) = present(self.sort_order) {
            query.sort_order = match raw.as_str() {
                "asc" => SortOrder::Asc,
                "desc" => SortOrder::Desc,
                _ => {
                    return Err(JournalError::validation(
                        "sortOrder",
                        "sortOrder must be asc or desc",
                    ));
                }
            };
        }
        if let Some(raw) = present(self.page) {
            query.page = parse_positive("page", &raw)?;
        }
        let page_size = present(self.page_size)
            .map(|raw| ("pageSize", raw))
            .or_else(|| present(self.limit).map(|raw| ("limit", raw)));
        if let Some((field, raw)) = page_size {
            query.page_size = parse_positive(field, &raw)?.min(MAX_PAGE_SIZE);
        }

        Ok(query)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub page_size: u32,
    pub total_pages: u64,
    pub total_count: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(page: u32, page_size: u32, total_count: u64) -> Self {
        let total_pages = total_count.div_ceil(u64::from(page_size));
        Self {
            current_page: page,
            page_size,
            total_pages,
            total_count,
            has_next: u64::from(page) < total_pages,
            has_prev: page > 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub trades: Vec<T>,
    pub pagination: Pagination,
}
