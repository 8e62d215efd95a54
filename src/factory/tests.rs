use super::*;
use crate::config::PacingConfig;
use crate::notify::MemorySink;
use wiremock::matchers::{method, query_param, query_param_contains};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.endpoints.mall_base = server.uri();
    config.pacing = PacingConfig::immediate();
    config
}

fn ok_reply(result: serde_json::Value) -> serde_json::Value {
    json!({"code": 0, "data": {"bizCode": 0, "bizMsg": "ok", "result": result}})
}

fn home_reply() -> serde_json::Value {
    ok_reply(json!({
        "haveProduct": 1,
        "factoryInfo": {
            "name": "Thermos",
            "couponCount": 12,
            "useScore": 300,
            "totalScore": 1000,
            "remainScore": 45
        }
    }))
}

async fn mount_function(server: &MockServer, function_id: &str, reply: serde_json::Value) {
    Mock::given(method("POST"))
        .and(query_param("functionId", function_id))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply))
        .mount(server)
        .await;
}

async fn mount_baseline(server: &MockServer, tasks: serde_json::Value) {
    mount_function(server, "factory_getHomeData", home_reply()).await;
    mount_function(
        server,
        "factory_collectElectricity",
        ok_reply(json!({"collected": 5, "battery": 100})),
    )
    .await;
    mount_function(
        server,
        "factory_getTaskDetail",
        ok_reply(json!({ "tasks": tasks })),
    )
    .await;
}

#[tokio::test]
async fn daily_check_in_invokes_the_handler_exactly_once() {
    let server = MockServer::start().await;
    mount_baseline(
        &server,
        json!([{
            "taskType": 13,
            "taskName": "Daily Check-In",
            "status": 1,
            "recordInfo": {"taskToken": "tok13"}
        }]),
    )
    .await;
    Mock::given(method("POST"))
        .and(query_param("functionId", "factory_collectScore"))
        .and(query_param_contains("body", "tok13"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_reply(json!({"score": 20}))))
        .expect(1)
        .mount(&server)
        .await;

    let sink = MemorySink::new();
    let summary = run(&test_config(&server), &Credential::new("alice", "sk"), &sink)
        .await
        .unwrap();

    let done: Vec<_> = sink
        .lines()
        .into_iter()
        .filter(|l| l.contains("completed task Daily Check-In"))
        .collect();
    assert_eq!(done.len(), 1);
    // Battery collect (5) plus the check-in score (20).
    assert_eq!(summary.points_earned, 25);
}

#[tokio::test]
async fn non_pending_tasks_never_reach_a_handler() {
    let server = MockServer::start().await;
    mount_baseline(
        &server,
        json!([{
            "taskType": 13,
            "taskName": "Daily Check-In",
            "status": 2,
            "recordInfo": {"taskToken": "tok13"}
        }]),
    )
    .await;
    Mock::given(method("POST"))
        .and(query_param("functionId", "factory_collectScore"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_reply(json!({}))))
        .expect(0)
        .mount(&server)
        .await;

    let sink = MemorySink::new();
    run(&test_config(&server), &Credential::new("alice", "sk"), &sink)
        .await
        .unwrap();
    assert!(sink.lines().iter().any(|l| l.contains("already done, skipping")));
}

#[tokio::test]
async fn unknown_discriminant_routes_to_the_noop_handler() {
    let server = MockServer::start().await;
    mount_baseline(
        &server,
        json!([{
            "taskType": 99,
            "taskName": "Mystery Task",
            "status": 1
        }]),
    )
    .await;
    Mock::given(method("POST"))
        .and(query_param("functionId", "factory_collectScore"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_reply(json!({}))))
        .expect(0)
        .mount(&server)
        .await;

    let sink = MemorySink::new();
    let summary = run(&test_config(&server), &Credential::new("alice", "sk"), &sink)
        .await
        .unwrap();
    assert!(sink
        .lines()
        .iter()
        .any(|l| l.contains("unrecognized type 99")));
    // The unknown task still counts as processed (skipped), alongside the
    // battery collect.
    assert_eq!(summary.processed, 2);
}

#[tokio::test]
async fn patrol_skips_a_closed_window() {
    let server = MockServer::start().await;
    mount_baseline(
        &server,
        json!([{
            "taskType": 10,
            "taskName": "Factory Patrol",
            "status": 1,
            "patrolInfos": [
                {"taskToken": "slot1", "status": 0},
                {"taskToken": "slot2", "status": 1}
            ]
        }]),
    )
    .await;
    Mock::given(method("POST"))
        .and(query_param("functionId", "factory_collectScore"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_reply(json!({"score": 10}))))
        .expect(0)
        .mount(&server)
        .await;

    let sink = MemorySink::new();
    run(&test_config(&server), &Credential::new("alice", "sk"), &sink)
        .await
        .unwrap();
    assert!(sink
        .lines()
        .iter()
        .any(|l| l.contains("current window already closed")));
}

#[tokio::test]
async fn calendar_entries_need_enter_and_complete() {
    let server = MockServer::start().await;
    mount_baseline(
        &server,
        json!([{
            "taskType": 9,
            "taskName": "Event Calendar",
            "status": 1,
            "activityInfos": [
                {"taskToken": "cal1", "title": "Day One", "status": 1, "waitDuration": 0},
                {"taskToken": "cal2", "title": "Day Two", "status": 2}
            ]
        }]),
    )
    .await;
    // Both the enter (actionType 1) and complete (actionType 2) collects for
    // the open entry; the completed entry gets neither.
    Mock::given(method("POST"))
        .and(query_param("functionId", "factory_collectScore"))
        .and(query_param_contains("body", "cal1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_reply(json!({
            "score": 15, "times": 1, "maxTimes": 7
        }))))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(query_param("functionId", "factory_collectScore"))
        .and(query_param_contains("body", "cal2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_reply(json!({}))))
        .expect(0)
        .mount(&server)
        .await;

    let sink = MemorySink::new();
    run(&test_config(&server), &Credential::new("alice", "sk"), &sink)
        .await
        .unwrap();
    assert!(sink.lines().iter().any(|l| l.contains("completed entry Day One")));
    assert!(sink.lines().iter().any(|l| l.contains("entry Day Two already completed")));
}

#[tokio::test]
async fn browse_stops_once_the_progress_cap_is_reached() {
    let server = MockServer::start().await;
    mount_baseline(
        &server,
        json!([{
            "taskType": 15,
            "taskName": "Browse Items",
            "status": 1,
            "browseInfos": [
                {"taskToken": "b1"},
                {"taskToken": "b2"},
                {"taskToken": "b3"}
            ]
        }]),
    )
    .await;
    Mock::given(method("POST"))
        .and(query_param("functionId", "factory_collectScore"))
        .and(query_param_contains("body", "b1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_reply(json!({
            "score": 10, "times": 4, "maxTimes": 5
        }))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(query_param("functionId", "factory_collectScore"))
        .and(query_param_contains("body", "b2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_reply(json!({
            "score": 10, "times": 5, "maxTimes": 5
        }))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(query_param("functionId", "factory_collectScore"))
        .and(query_param_contains("body", "b3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_reply(json!({}))))
        .expect(0)
        .mount(&server)
        .await;

    let sink = MemorySink::new();
    run(&test_config(&server), &Credential::new("alice", "sk"), &sink)
        .await
        .unwrap();
}

#[tokio::test]
async fn assist_credits_peers_but_skips_the_own_code() {
    let server = MockServer::start().await;
    mount_baseline(
        &server,
        json!([{
            "taskType": 14,
            "taskName": "Friend Assist",
            "status": 1,
            "times": 2,
            "maxTimes": 6,
            "assistInfo": {"taskToken": "my-own-code"}
        }]),
    )
    .await;
    Mock::given(method("POST"))
        .and(query_param("functionId", "factory_collectScore"))
        .and(query_param_contains("body", "my-own-code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_reply(json!({}))))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(query_param("functionId", "factory_collectScore"))
        .and(query_param_contains("body", "peer-code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_reply(json!({}))))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config(&server);
    config.factory.assist_codes = vec!["my-own-code".to_string(), "peer-code".to_string()];

    let sink = MemorySink::new();
    run(&config, &Credential::new("alice", "sk"), &sink)
        .await
        .unwrap();
    assert!(sink.lines().iter().any(|l| l.contains("own assist code: my-own-code")));
    assert!(sink.lines().iter().any(|l| l.contains("assisted friend peer-code")));
}

#[tokio::test]
async fn a_product_is_selected_when_none_is_chosen() {
    let server = MockServer::start().await;
    mount_function(
        &server,
        "factory_getHomeData",
        ok_reply(json!({"haveProduct": 2, "factoryInfo": {"name": "", "couponCount": 0}})),
    )
    .await;
    mount_function(
        &server,
        "factory_collectElectricity",
        ok_reply(json!({"collected": 0, "battery": 0})),
    )
    .await;
    mount_function(&server, "factory_getTaskDetail", ok_reply(json!({"tasks": []}))).await;
    mount_function(
        &server,
        "factory_getProductList",
        ok_reply(json!({"products": [
            {"name": "Sold Out Cup", "skuId": "s0", "couponCount": 9, "sellOut": 1},
            {"name": "Thermos", "skuId": "s1", "couponCount": 7, "sellOut": 0},
            {"name": "Tea Set", "skuId": "s2", "couponCount": 3, "sellOut": 0}
        ]})),
    )
    .await;
    Mock::given(method("POST"))
        .and(query_param("functionId", "factory_makeProduct"))
        .and(query_param_contains("body", "s1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_reply(json!({}))))
        .expect(1)
        .mount(&server)
        .await;

    let sink = MemorySink::new();
    run(&test_config(&server), &Credential::new("alice", "sk"), &sink)
        .await
        .unwrap();
    assert!(sink.lines().iter().any(|l| l.contains("selected product: Thermos")));
}

#[tokio::test]
async fn the_closing_summary_carries_redemption_progress() {
    let server = MockServer::start().await;
    mount_baseline(&server, json!([])).await;

    let sink = MemorySink::new();
    let summary = run(&test_config(&server), &Credential::new("alice", "sk"), &sink)
        .await
        .unwrap();
    let redemption = summary.redemption.as_ref().expect("redemption progress");
    assert_eq!(redemption.product, "Thermos");
    assert_eq!(redemption.remaining_stock, 12);
    assert_eq!(redemption.invested, 300);
    assert_eq!(redemption.required, 1000);
    assert_eq!(redemption.uncollected, 45);
    assert!(summary.render().contains("[Invested/Required] 300/1000"));
}

#[tokio::test]
async fn a_failed_home_bootstrap_aborts_the_run() {
    let server = MockServer::start().await;
    mount_function(
        &server,
        "factory_getHomeData",
        json!({"code": 0, "data": {"bizCode": 9, "bizMsg": "activity closed"}}),
    )
    .await;
    Mock::given(method("POST"))
        .and(query_param("functionId", "factory_getTaskDetail"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_reply(json!({}))))
        .expect(0)
        .mount(&server)
        .await;

    let sink = MemorySink::new();
    let result = run(&test_config(&server), &Credential::new("alice", "sk"), &sink).await;
    assert!(result.is_err());
    assert!(sink
        .lines()
        .iter()
        .any(|l| l.contains("cannot fetch activity data")));
}

#[tokio::test]
async fn browse_interaction_failure_skips_the_collect() {
    let server = MockServer::start().await;
    mount_baseline(
        &server,
        json!([{
            "taskType": 23,
            "taskName": "Featured Page",
            "status": 1,
            "recordInfo": {"taskToken": "tok23"}
        }]),
    )
    .await;
    Mock::given(method("POST"))
        .and(query_param("functionId", "queryPageComponent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": "3"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(query_param("functionId", "factory_collectScore"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_reply(json!({}))))
        .expect(0)
        .mount(&server)
        .await;

    let sink = MemorySink::new();
    run(&test_config(&server), &Credential::new("alice", "sk"), &sink)
        .await
        .unwrap();
    assert!(sink
        .lines()
        .iter()
        .any(|l| l.contains("browse interaction failed")));
}

#[tokio::test]
async fn a_failed_task_listing_degrades_to_an_empty_catalog() {
    let server = MockServer::start().await;
    mount_function(&server, "factory_getHomeData", home_reply()).await;
    mount_function(
        &server,
        "factory_collectElectricity",
        ok_reply(json!({"collected": 5, "battery": 100})),
    )
    .await;
    mount_function(
        &server,
        "factory_getTaskDetail",
        json!({"code": 0, "data": {"bizCode": 7, "bizMsg": "listing unavailable"}}),
    )
    .await;

    let sink = MemorySink::new();
    let summary = run(&test_config(&server), &Credential::new("alice", "sk"), &sink)
        .await
        .unwrap();
    // The run still reaches reporting with the battery collect alone.
    assert_eq!(summary.processed, 1);
    assert!(sink.lines().iter().any(|l| l.contains("cannot fetch task list")));
}
