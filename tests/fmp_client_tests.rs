use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use serde_json::json;
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

use fundwatch::{
    models::fund::Fund,
    services::market_data::fmp::{fetch_all_funds, FetchSettings, FmpClient},
};

const HOLDINGS_PATH: &str = "/api/v4/institutional-ownership/portfolio-holdings";
const DATES_PATH: &str = "/api/v4/institutional-ownership/portfolio-date";

fn q1() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 31).unwrap()
}

fn client(server: &MockServer) -> FmpClient {
    FmpClient::new(&server.uri(), "test-key", Duration::from_secs(5)).unwrap()
}

fn no_delay() -> FetchSettings {
    FetchSettings {
        delay: Duration::ZERO,
        concurrency: 2,
    }
}

#[tokio::test]
async fn fetches_holdings_with_cik_date_and_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(HOLDINGS_PATH))
        .and(query_param("cik", "0001633313"))
        .and(query_param("date", "2025-03-31"))
        .and(query_param("apikey", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "securityName": "Insmed Inc",
                "symbol": "INSM",
                "securityCusip": "457669307",
                "sharesNumber": 1500000,
                "marketValue": 114450000,
                "weight": 6.1,
                "ownership": 0.83,
                "filingDate": "2025-05-15",
                "industryTitle": "Pharmaceutical Preparations"
            },
            {"securityName": "Tiny Bio"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let holdings = client(&server)
        .get_portfolio_holdings("0001633313", q1())
        .await
        .unwrap();

    assert_eq!(holdings.malformed, 0);
    assert_eq!(holdings.holdings.len(), 2);
    assert_eq!(holdings.holdings[0].symbol.as_deref(), Some("INSM"));
    assert_eq!(holdings.holdings[0].market_value, Some(dec!(114450000)));
    assert_eq!(holdings.holdings[1].market_value, None);
}

#[tokio::test]
async fn unreadable_records_are_counted_per_fund() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(HOLDINGS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"securityName": "Insmed Inc", "marketValue": "1,200,000"},
            {"securityName": "Blank Value Bio", "marketValue": "N/A", "sharesNumber": 10},
            {"securityName": "Broken Bio", "marketValue": "call us"},
            "not a record"
        ])))
        .mount(&server)
        .await;

    let fetched = client(&server)
        .get_portfolio_holdings("0001633313", q1())
        .await
        .unwrap();
    assert_eq!(fetched.holdings.len(), 2);
    assert_eq!(fetched.malformed, 2);
    assert_eq!(fetched.holdings[0].market_value, Some(dec!(1200000)));
    assert_eq!(fetched.holdings[1].market_value, Some(dec!(0)));

    let funds = vec![Fund::new("Avoro Capital Advisors LLC", "0001633313")];
    let run = fetch_all_funds(&client(&server), &funds, q1(), no_delay()).await;
    assert_eq!(run.summaries.len(), 1);
    assert_eq!(run.summaries[0].holdings, 2);
    assert_eq!(run.summaries[0].malformed, 2);
    assert!(run.failures.is_empty());
}

#[tokio::test]
async fn error_status_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(HOLDINGS_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_string("Invalid API KEY"))
        .mount(&server)
        .await;

    let result = client(&server).get_portfolio_holdings("0001633313", q1()).await;
    assert!(result.unwrap_err().to_string().contains("403"));
}

#[tokio::test]
async fn non_list_body_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(HOLDINGS_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"Error Message": "Limit Reach"})),
        )
        .mount(&server)
        .await;

    let result = client(&server).get_portfolio_holdings("0001633313", q1()).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn portfolio_dates_are_newest_first() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(DATES_PATH))
        .and(query_param("cik", "0001056807"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"date": "2024-09-30"},
            {"date": "2025-03-31"},
            {"date": "2024-12-31"},
            {"date": "2025-03-31"}
        ])))
        .mount(&server)
        .await;

    let dates = client(&server).get_portfolio_dates("0001056807").await.unwrap();
    assert_eq!(
        dates,
        vec![
            NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            NaiveDate::from_ymd_opt(2024, 9, 30).unwrap(),
        ]
    );
}

#[tokio::test]
async fn failing_funds_are_skipped_not_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(HOLDINGS_PATH))
        .and(query_param("cik", "0000000001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"securityName": "Small", "marketValue": 10},
            {"securityName": "Large", "marketValue": 1000}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(HOLDINGS_PATH))
        .and(query_param("cik", "0000000002"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(HOLDINGS_PATH))
        .and(query_param("cik", "0000000003"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let funds = vec![
        Fund::new("Good Fund", "0000000001"),
        Fund::new("Broken Fund", "0000000002"),
        Fund::new("Empty Fund", "0000000003"),
    ];
    let run = fetch_all_funds(&client(&server), &funds, q1(), no_delay()).await;

    assert_eq!(run.records.len(), 2);
    assert_eq!(run.records[0].company, "Large");
    assert_eq!(run.records[0].fund_name, "Good Fund");
    assert_eq!(run.records[0].date, "2025-03-31");
    assert_eq!(run.summaries.len(), 1);
    assert_eq!(run.summaries[0].total_value, dec!(1010));

    let failed: Vec<&str> = run.failures.iter().map(|(fund, _)| fund.as_str()).collect();
    assert_eq!(failed, vec!["Broken Fund", "Empty Fund"]);
}
