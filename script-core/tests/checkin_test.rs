use proptest::prelude::*;
use script_core::fakes::{FakeHost, ScriptedHttpClient};
use script_core::{
    Account, AccountTable, CheckinConfig, CheckinOutcome, CheckinRunner, CheckinStatus,
    PersistentStore,
};
use serde_json::json;
use std::time::Duration;

fn accounts(n: usize) -> AccountTable {
    AccountTable::new(
        (0..n)
            .map(|i| Account {
                name: format!("member-{}", i),
                id: format!("100808{:032x}", i),
            })
            .collect(),
    )
}

fn id_param(url: &str) -> String {
    url::Url::parse(url)
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == "id")
        .map(|(_, v)| v.into_owned())
        .unwrap()
}

const SUCCESS: &str = r#"{"code":"100000","msg":"","data":{"tipMessage":"ok","alert_title":"Day 1","alert_subtitle":"+4"}}"#;

#[tokio::test]
async fn test_calls_are_serial_and_in_order() {
    let http = ScriptedHttpClient::with_latency(Duration::from_millis(20));
    for _ in 0..4 {
        http.push_body(200, SUCCESS);
    }
    let host = FakeHost::new().with_http(http);
    host.store.write("super_cookie", "SUB=session").unwrap();

    let table = accounts(4);
    let runner = CheckinRunner::new(CheckinConfig::default(), table.clone());
    let report = runner.run(&host.context()).await;

    let requests = host.http.requests();
    assert_eq!(requests.len(), 4);
    assert_eq!(host.http.max_in_flight(), 1, "calls must not overlap");

    let sent_ids: Vec<String> = requests.iter().map(|r| id_param(&r.url)).collect();
    let expected_ids: Vec<String> = table.iter().map(|a| a.id.clone()).collect();
    assert_eq!(sent_ids, expected_ids);

    for request in &requests {
        assert_eq!(request.header("Cookie"), Some("SUB=session"));
    }

    assert_eq!(report.entries.len(), 4);
    assert_eq!(report.succeeded(), 4);
    assert_eq!(host.notifier.posted().len(), 4);
}

#[tokio::test]
async fn test_transport_failure_does_not_stop_later_accounts() {
    let http = ScriptedHttpClient::new();
    http.push_body(200, SUCCESS);
    http.push_error("connection reset by peer");
    http.push_body(200, r#"{"code":382004,"msg":"already checked in(382004)"}"#);
    let host = FakeHost::new().with_http(http);

    let runner = CheckinRunner::new(CheckinConfig::default(), accounts(3));
    let report = runner.run(&host.context()).await;

    assert_eq!(host.http.requests().len(), 3);
    assert_eq!(report.failed(), 1);
    assert!(matches!(
        report.entries[1].outcome,
        CheckinOutcome::TransportFailed(_)
    ));

    let posted = host.notifier.posted();
    assert_eq!(posted.len(), 3);
    let failures: Vec<_> = posted.iter().filter(|n| n.title.ends_with("error!")).collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].title, "member-1 super-topic check-in error!");
    assert!(failures[0].body.contains("connection reset by peer"));

    assert_eq!(posted[2].body, "already checked in 🎉");
}

#[tokio::test]
async fn test_malformed_response_is_reported_and_skipped() {
    let http = ScriptedHttpClient::new();
    http.push_body(502, "<html>Bad Gateway</html>");
    http.push_body(200, SUCCESS);
    let host = FakeHost::new().with_http(http);

    let runner = CheckinRunner::new(CheckinConfig::default(), accounts(2));
    let report = runner.run(&host.context()).await;

    assert!(matches!(
        report.entries[0].outcome,
        CheckinOutcome::MalformedResponse(_)
    ));
    assert!(matches!(
        report.entries[1].outcome,
        CheckinOutcome::Completed(CheckinStatus::Success { .. })
    ));
    assert!(host.notifier.posted()[0].body.contains("HTTP 502"));
}

#[tokio::test]
async fn test_missing_cookie_still_checks_in() {
    let http = ScriptedHttpClient::new();
    http.push_body(200, SUCCESS);
    let host = FakeHost::new().with_http(http);

    let runner = CheckinRunner::new(CheckinConfig::default(), accounts(1));
    runner.run(&host.context()).await;

    let requests = host.http.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].header("Cookie"), None);
}

#[tokio::test]
async fn test_empty_table_issues_no_calls() {
    let host = FakeHost::new();
    let runner = CheckinRunner::new(CheckinConfig::default(), AccountTable::default());
    let report = runner.run(&host.context()).await;
    assert!(report.entries.is_empty());
    assert!(host.http.requests().is_empty());
    assert!(host.notifier.posted().is_empty());
}

fn account() -> Account {
    Account {
        name: "Alice".to_string(),
        id: "100808abc".to_string(),
    }
}

proptest! {
    #[test]
    fn prop_status_mapping_is_total(code in any::<i64>(), msg in "[a-z ]{0,20}") {
        let body = json!({"code": code, "msg": msg, "data": {"location": "loc"}});
        let status = CheckinStatus::from_json(&body);
        let expected_variant = match code {
            100000 => "success",
            100003 => "reverify",
            382004 => "already",
            _ => "other",
        };
        let variant = match status {
            CheckinStatus::Success { .. } => "success",
            CheckinStatus::Reverify { .. } => "reverify",
            CheckinStatus::AlreadyCheckedIn { .. } => "already",
            CheckinStatus::Other { .. } => "other",
        };
        prop_assert_eq!(variant, expected_variant);
    }

    #[test]
    fn prop_already_checked_in_never_shows_code(prefix in "[a-z ]{0,10}", suffix in "[a-z ]{0,10}") {
        let msg = format!("{}(382004){}", prefix, suffix);
        let status = CheckinStatus::from_json(&json!({"code": 382004, "msg": msg}));
        let notification = status.notification(&account());
        prop_assert!(!notification.body.contains("(382004)"));
        prop_assert!(!notification.subtitle.contains("(382004)"));
    }
}
