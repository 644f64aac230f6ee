use serde::{Deserialize, Serialize};

use crate::domain::{AccountId, Relative};
use crate::hierarchy::TeamSummary;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RelativeDto {
    pub account_id: AccountId,
    pub depth: u32,
}

impl From<Relative> for RelativeDto {
    fn from(relative: Relative) -> Self {
        Self {
            account_id: relative.account,
            depth: relative.depth,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LevelDto {
    pub depth: u32,
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct TeamSummaryDto {
    pub account_id: AccountId,
    pub total: u64,
    pub levels: Vec<LevelDto>,
}

impl From<TeamSummary> for TeamSummaryDto {
    fn from(summary: TeamSummary) -> Self {
        Self {
            account_id: summary.account,
            total: summary.total,
            levels: summary
                .levels
                .into_iter()
                .map(|(depth, count)| LevelDto { depth, count })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct DepthQuery {
    pub max_depth: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct HealthDto {
    pub status: &'static str,
    pub database: bool,
    pub uptime_seconds: u64,
    pub version: &'static str,
}
