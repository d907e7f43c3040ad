use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use chrono::NaiveDate;
use futures::{stream, StreamExt};
use reqwest::Client;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    models::{fund::Fund, holding_record::HoldingRecord},
    services::{
        columns::FieldRole,
        parsers::{parse_amount, parse_date},
        shared::{
            constants::{DEFAULT_FETCH_DELAY_MS, DEFAULT_FETCH_TIMEOUT_SECS, FMP_BASE_URL},
            env::{get_env_u64, get_env_variable},
        },
    },
};

/// One row of the `institutional-ownership/portfolio-holdings` response.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct FmpHolding {
    pub security_name: Option<String>,
    pub symbol: Option<String>,
    pub security_cusip: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub shares_number: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub market_value: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub weight: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub ownership: Option<Decimal>,
    pub filing_date: Option<String>,
    pub industry_title: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Number(Decimal),
    Text(String),
}

/// Accepts numbers as well as formatted strings such as `"1,200"` or `"N/A"`.
fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawAmount>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawAmount::Number(amount)) => Ok(Some(amount)),
        Some(RawAmount::Text(raw)) => parse_amount(&raw, FieldRole::MarketValue)
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid amount '{}'", raw))),
    }
}

/// Holdings of one filing plus the number of provider records that could not be read.
#[derive(Debug, Clone, Default)]
pub struct FmpHoldings {
    pub holdings: Vec<FmpHolding>,
    pub malformed: usize,
}

#[derive(Deserialize, Debug)]
struct FmpPortfolioDate {
    date: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FundFetchSummary {
    pub fund_name: String,
    pub cik: String,
    pub holdings: usize,
    /// Provider records dropped because they could not be read.
    pub malformed: usize,
    pub total_value: Decimal,
    pub top_holding: Option<String>,
}

#[derive(Debug, Default)]
pub struct FetchRun {
    pub records: Vec<HoldingRecord>,
    pub summaries: Vec<FundFetchSummary>,
    /// Funds that could not be fetched, with the reason.
    pub failures: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy)]
pub struct FetchSettings {
    /// Pause before each request to stay below the provider's rate limit.
    pub delay: Duration,
    /// Requests allowed in flight at once.
    pub concurrency: usize,
}

impl FetchSettings {
    pub fn from_env(concurrency: usize) -> Self {
        FetchSettings {
            delay: Duration::from_millis(get_env_u64("FETCH_DELAY_MS", DEFAULT_FETCH_DELAY_MS)),
            concurrency: concurrency.max(1),
        }
    }
}

pub struct FmpClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl FmpClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Couldn't build HTTP client")?;
        Ok(FmpClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = get_env_variable("FMP_API_KEY")
            .ok_or_else(|| anyhow!("Please set FMP_API_KEY to fetch holdings from financialmodelingprep.com"))?;
        let base_url = get_env_variable("FMP_BASE_URL").unwrap_or_else(|| FMP_BASE_URL.to_string());
        let timeout = Duration::from_secs(get_env_u64("FETCH_TIMEOUT_SECS", DEFAULT_FETCH_TIMEOUT_SECS));
        Self::new(&base_url, &api_key, timeout)
    }

    async fn get_list(&self, path: &str, query: &[(&str, String)]) -> anyhow::Result<Vec<Value>> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            bail!("FMP responded with status {}", status);
        }

        let body = response.text().await?;
        match serde_json::from_str::<Value>(&body)? {
            Value::Array(items) => Ok(items),
            other => bail!("Expected a list from FMP, got: {}", other),
        }
    }

    pub async fn get_portfolio_holdings(
        &self,
        cik: &str,
        date: NaiveDate,
    ) -> anyhow::Result<FmpHoldings> {
        let items = self
            .get_list(
                "/api/v4/institutional-ownership/portfolio-holdings",
                &[("cik", cik.to_string()), ("date", date.format("%Y-%m-%d").to_string())],
            )
            .await?;

        let mut result = FmpHoldings::default();
        for (index, item) in items.into_iter().enumerate() {
            match serde_json::from_value::<FmpHolding>(item) {
                Ok(holding) => result.holdings.push(holding),
                Err(e) => {
                    warn!(target: "fetch", "Dropping record {} for CIK {}: {}", index, cik, e);
                    result.malformed += 1;
                }
            }
        }
        Ok(result)
    }

    /// Quarter-end dates the provider has holdings for, newest first.
    pub async fn get_portfolio_dates(&self, cik: &str) -> anyhow::Result<Vec<NaiveDate>> {
        let items = self
            .get_list(
                "/api/v4/institutional-ownership/portfolio-date",
                &[("cik", cik.to_string())],
            )
            .await?;

        let mut dates: Vec<NaiveDate> = vec![];
        for item in items {
            let parsed = serde_json::from_value::<FmpPortfolioDate>(item.clone())
                .ok()
                .and_then(|entry| parse_date(&entry.date).ok());
            match parsed {
                Some(date) => dates.push(date),
                None => warn!(target: "fetch", "Ignoring unreadable filing date {}", item),
            }
        }
        dates.sort_by(|a, b| b.cmp(a));
        dates.dedup();
        Ok(dates)
    }
}

/// Interchange rows for one fund, largest position first.
pub fn to_holding_records(fund: &Fund, date: NaiveDate, holdings: Vec<FmpHolding>) -> Vec<HoldingRecord> {
    let mut records: Vec<HoldingRecord> = holdings
        .into_iter()
        .map(|holding| HoldingRecord {
            fund_name: fund.name.clone(),
            cik: fund.cik.clone(),
            company: holding.security_name.unwrap_or_default(),
            ticker: holding.symbol.unwrap_or_default(),
            cusip: holding.security_cusip.unwrap_or_default(),
            shares: holding.shares_number.unwrap_or_default(),
            value: holding.market_value.unwrap_or_default(),
            weight: holding.weight.unwrap_or_default(),
            ownership: holding.ownership.unwrap_or_default(),
            date: date.format("%Y-%m-%d").to_string(),
            filing_date: holding.filing_date.unwrap_or_default(),
            industry: holding.industry_title.unwrap_or_default(),
        })
        .collect();
    records.sort_by(|a, b| b.value.cmp(&a.value));
    records
}

fn summarize(fund: &Fund, records: &[HoldingRecord], malformed: usize) -> FundFetchSummary {
    FundFetchSummary {
        fund_name: fund.name.clone(),
        cik: fund.cik.clone(),
        holdings: records.len(),
        malformed,
        total_value: records
            .iter()
            .fold(dec!(0), |total, record| total.saturating_add(record.value)),
        top_holding: records.first().map(|record| record.company.clone()),
    }
}

/// Fetches every fund's holdings as of `date`. A fund that fails is logged and skipped.
pub async fn fetch_all_funds(
    client: &FmpClient,
    funds: &[Fund],
    date: NaiveDate,
    settings: FetchSettings,
) -> FetchRun {
    let results: Vec<(&Fund, anyhow::Result<FmpHoldings>)> = stream::iter(funds)
        .map(|fund| async move {
            sleep(settings.delay).await;
            info!(target: "fetch", "Fetching {} (CIK: {})", fund.name, fund.cik);
            (fund, client.get_portfolio_holdings(&fund.cik, date).await)
        })
        .buffered(settings.concurrency.max(1))
        .collect()
        .await;

    let mut run = FetchRun::default();
    for (fund, result) in results {
        match result {
            Ok(fetched) if fetched.holdings.is_empty() => {
                warn!(target: "fetch", "No holdings found for {}", fund.name);
                let reason = match fetched.malformed {
                    0 => "no holdings found".to_string(),
                    n => format!("no readable holdings, {} malformed records", n),
                };
                run.failures.push((fund.name.clone(), reason));
            }
            Ok(fetched) => {
                let records = to_holding_records(fund, date, fetched.holdings);
                let summary = summarize(fund, &records, fetched.malformed);
                info!(
                    target: "fetch",
                    "{}: {} holdings worth {} ({} malformed)",
                    fund.name, summary.holdings, summary.total_value, summary.malformed
                );
                run.summaries.push(summary);
                run.records.extend(records);
            }
            Err(e) => {
                warn!(target: "fetch", "Failed to fetch {}: {:?}", fund.name, e);
                run.failures.push((fund.name.clone(), e.to_string()));
            }
        }
    }
    run
}
