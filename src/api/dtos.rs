use serde::{Deserialize, Serialize};

use crate::config::SiteDescriptor;
use crate::entities::{PolicyFilter, PolicyStatus};

pub const DEFAULT_LOG_LIMIT: usize = 50;
pub const MAX_LOG_LIMIT: usize = 500;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSummary {
    pub id: String,
    pub name: String,
    pub url: String,
    pub enabled: bool,
    pub category: String,
}

impl From<&SiteDescriptor> for SiteSummary {
    fn from(site: &SiteDescriptor) -> Self {
        Self {
            id: site.id.clone(),
            name: site.name.clone(),
            url: site.url.clone(),
            enabled: site.enabled,
            category: site.category.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<usize>,
}

impl LogsQuery {
    pub fn limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_LOG_LIMIT)
            .clamp(1, MAX_LOG_LIMIT)
    }
}

/// Query string for `GET /api/policies`.
#[derive(Debug, Default, Deserialize)]
pub struct PoliciesQuery {
    pub site_id: Option<String>,
    pub category: Option<String>,
    pub status: Option<PolicyStatus>,
    pub credit_required: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PoliciesQuery {
    pub fn validate(&self) -> Result<(), String> {
        if self.limit.is_some_and(|l| l <= 0) {
            return Err("limit must be positive".to_string());
        }
        if self.offset.is_some_and(|o| o < 0) {
            return Err("offset cannot be negative".to_string());
        }
        Ok(())
    }
}

impl From<PoliciesQuery> for PolicyFilter {
    fn from(query: PoliciesQuery) -> Self {
        Self {
            site_id: query.site_id,
            category: query.category,
            status: query.status,
            credit_required: query.credit_required,
            limit: query.limit,
            offset: query.offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_limit_defaults_and_clamps() {
        assert_eq!(LogsQuery::default().limit(), 50);
        assert_eq!(LogsQuery { limit: Some(0) }.limit(), 1);
        assert_eq!(LogsQuery { limit: Some(10_000) }.limit(), 500);
        assert_eq!(LogsQuery { limit: Some(7) }.limit(), 7);
    }

    #[test]
    fn policies_query_rejects_bad_paging() {
        let query = PoliciesQuery {
            limit: Some(0),
            ..Default::default()
        };
        assert!(query.validate().is_err());

        let query = PoliciesQuery {
            offset: Some(-1),
            ..Default::default()
        };
        assert!(query.validate().is_err());

        assert!(PoliciesQuery::default().validate().is_ok());
    }
}
