pub mod pagination;

use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;

pub use pagination::PaginationParams;

/// `?from=&to=` inclusive date window
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn check(&self) -> Result<(), crate::error::ApiError> {
        match (self.from, self.to) {
            (Some(from), Some(to)) if from > to => Err(crate::error::ApiError::validation(
                "`from` must not be after `to`",
            )),
            _ => Ok(()),
        }
    }
}

/// `?date=`, defaulting to today
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DateQuery {
    pub date: Option<NaiveDate>,
}
