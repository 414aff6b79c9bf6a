//! Registry implementations.

mod edgar_company;
mod edgar_search;
mod filings_api;

pub use edgar_company::EdgarCompanySource;
pub use edgar_search::EdgarSearchSource;
pub use filings_api::FilingsApiSource;

use std::sync::Arc;

use chrono::NaiveDate;

use crate::config::FilingsApiSettings;
use crate::discovery::{DiscoveryError, DiscoverySource};
use crate::http_client::HttpClient;
use crate::models::DataSource;

/// Build the source registered for `source`.
pub fn create_source(
    source: DataSource,
    client: HttpClient,
    filings_api: &FilingsApiSettings,
) -> Result<Arc<dyn DiscoverySource>, DiscoveryError> {
    match source {
        DataSource::EdgarSearch => Ok(Arc::new(EdgarSearchSource::new(client))),
        DataSource::EdgarCompany => Ok(Arc::new(EdgarCompanySource::new(client))),
        DataSource::FilingsApi => Ok(Arc::new(FilingsApiSource::from_settings(
            client,
            filings_api,
        )?)),
        DataSource::Manual => Err(DiscoveryError::Config(
            "manual documents are not discovered".to_string(),
        )),
    }
}

/// Parse the `YYYY-MM-DD` prefix registries put on dates and timestamps.
pub(crate) fn parse_registry_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    raw.get(..10)
        .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_registry_date() {
        assert_eq!(
            parse_registry_date("2024-03-01"),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(
            parse_registry_date("2024-03-01T16:05:00.000Z"),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(parse_registry_date("March 2024"), None);
    }
}
