//! Re-login after a run of empty results

use chrono::NaiveDate;
use serde_json::json;
use std::sync::Arc;

use org_status_sync_lib::application::{BatchCollector, SpreadsheetGateway, StatusFetcher, SyncLoop, SyncSettings, SyncState};
use org_status_sync_lib::infrastructure::{AppConfig, UploadReportParser};
use org_status_sync_lib::test_utils::{EMPTY_PAGE, FakePortal, FakeSheets, ManualClock, full_page};

const TEMPLATE: &str = "https://portal.test/s?id={id}";

async fn run_one_cycle(threshold: Option<usize>, portal: Arc<FakePortal>) -> Arc<FakePortal> {
    let mut config = AppConfig::default();
    config.portal.status_url_template = TEMPLATE.to_string();
    config.sheets.spreadsheet_id = "spreadsheet".to_string();
    config.sheets.access_token = Some("token".to_string());
    config.schedule.reauth_after_consecutive_empty = threshold;

    let sheets = Arc::new(FakeSheets::default().with_range(
        "Sheet1!A2:A163",
        vec![vec![json!("1")], vec![json!("2")], vec![json!("3")], vec![json!("4")]],
    ));
    let now = NaiveDate::from_ymd_opt(2026, 10, 15)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap();
    let fetcher = StatusFetcher::from_config(&config.portal, UploadReportParser::new().unwrap());
    let mut sync = SyncLoop::new(
        SyncSettings::from_config(&config).unwrap(),
        portal.clone(),
        BatchCollector::new(fetcher),
        SpreadsheetGateway::new(sheets),
        Arc::new(ManualClock::at(now)),
    );

    for _ in 0..4 {
        sync.step().await.unwrap();
    }
    assert_eq!(sync.state(), &SyncState::Sleeping);
    portal
}

fn url(id: &str) -> String {
    TEMPLATE.replace("{id}", id)
}

#[tokio::test]
async fn consecutive_empty_pages_trigger_relogin() {
    let portal = Arc::new(
        FakePortal::default()
            .with_page(url("1"), full_page("ok", "01.10.2026"))
            .with_page(url("2"), EMPTY_PAGE)
            .with_page(url("3"), EMPTY_PAGE),
    );
    let portal = run_one_cycle(Some(3), portal).await;
    assert_eq!(portal.reauthentications(), 1);
}

#[tokio::test]
async fn scattered_empty_pages_do_not_trigger_relogin() {
    let portal = Arc::new(
        FakePortal::default()
            .with_page(url("1"), EMPTY_PAGE)
            .with_page(url("2"), full_page("ok", "01.10.2026"))
            .with_page(url("3"), EMPTY_PAGE)
            .with_page(url("4"), full_page("ok", "02.10.2026")),
    );
    let portal = run_one_cycle(Some(2), portal).await;
    assert_eq!(portal.reauthentications(), 0);
}

#[tokio::test]
async fn disabled_by_default() {
    let portal = run_one_cycle(None, Arc::new(FakePortal::default())).await;
    assert_eq!(portal.reauthentications(), 0);
}
