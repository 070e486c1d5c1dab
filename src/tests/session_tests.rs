use crate::error::CheckError;
use crate::session::{CheckSession, CheckStage, DemoSource, FollowChecker, ProxyClient};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn profile_json(is_private: bool) -> serde_json::Value {
    json!({
        "id": "1234",
        "username": "subject",
        "full_name": "Test Subject",
        "is_private": is_private,
        "follower_count": 3,
        "following_count": 2
    })
}

async fn mock_proxy(is_private: bool) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/profile/subject"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_json(is_private)))
        .mount(&server)
        .await;
    Mock::given(path("/api/followers/1234"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": ["Ana", "bob", "cleo"],
            "total": 3
        })))
        .mount(&server)
        .await;
    Mock::given(path("/api/following/1234"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": ["@bob", "dan"],
            "total": 2,
            "partial": true
        })))
        .mount(&server)
        .await;
    server
}

fn checker(server: &MockServer) -> FollowChecker<ProxyClient> {
    FollowChecker::new(ProxyClient::new(&server.uri(), Duration::from_secs(5)).unwrap())
}

#[tokio::test]
async fn test_check_compares_normalized_lists() {
    let server = mock_proxy(false).await;

    let report = checker(&server).check("@Subject").await.unwrap();

    assert_eq!(report.subject, "subject");
    assert_eq!(report.followers, vec!["ana", "bob", "cleo"]);
    assert_eq!(report.following, vec!["bob", "dan"]);
    assert_eq!(report.comparison.mutual, vec!["bob"]);
    assert_eq!(report.comparison.only_in_a, vec!["ana", "cleo"]);
    assert_eq!(report.comparison.only_in_b, vec!["dan"]);
    assert!(report.partial);
}

#[tokio::test]
async fn test_check_reports_stages_in_order() {
    let server = mock_proxy(false).await;
    let stages = Mutex::new(Vec::new());

    checker(&server)
        .check_with_progress("subject", |stage| stages.lock().push(stage))
        .await
        .unwrap();

    let stages = stages.into_inner();
    assert_eq!(
        stages,
        vec![
            CheckStage::LookingUpProfile("subject".to_string()),
            CheckStage::FetchingLists {
                follower_count: Some(3),
                following_count: Some(2),
            },
            CheckStage::Comparing,
        ]
    );
}

#[tokio::test]
async fn test_private_profile_stops_before_lists() {
    let server = MockServer::start().await;
    Mock::given(path("/api/profile/subject"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_json(true)))
        .mount(&server)
        .await;
    Mock::given(path("/api/followers/1234"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = checker(&server).check("subject").await;
    assert_eq!(result, Err(CheckError::PrivateProfile));
}

#[tokio::test]
async fn test_proxy_statuses_map_to_errors() {
    let server = MockServer::start().await;
    Mock::given(path("/api/profile/ghost"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "error": "User not found" })),
        )
        .mount(&server)
        .await;
    Mock::given(path("/api/profile/busy"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({ "error": "slow down" })))
        .mount(&server)
        .await;
    Mock::given(path("/api/profile/down"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let checker = checker(&server);
    assert_eq!(checker.check("ghost").await, Err(CheckError::NotFound));
    assert!(matches!(
        checker.check("busy").await,
        Err(CheckError::Throttled { .. })
    ));
    assert_eq!(
        checker.check("down").await,
        Err(CheckError::UpstreamError(502))
    );
}

#[tokio::test]
async fn test_list_failure_fails_the_check() {
    let server = MockServer::start().await;
    Mock::given(path("/api/profile/subject"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_json(false)))
        .mount(&server)
        .await;
    Mock::given(path("/api/followers/1234"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "users": [], "total": 0 })))
        .mount(&server)
        .await;
    Mock::given(path("/api/following/1234"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = checker(&server).check("subject").await;
    assert_eq!(result, Err(CheckError::UpstreamError(500)));
}

#[tokio::test]
async fn test_invalid_handle_never_calls_proxy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = checker(&server).check("   ").await;
    assert!(matches!(result, Err(CheckError::InvalidInput(_))));
}

#[tokio::test]
async fn test_url_characters_in_handle_are_rejected() {
    let server = MockServer::start().await;
    Mock::given(path("/api/profile/ana"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_json(false)))
        .expect(0)
        .mount(&server)
        .await;

    let checker = checker(&server);
    for typed in ["ana#evil", "ana?x=1", "ana/../ana"] {
        let result = checker.check(typed).await;
        assert!(
            matches!(result, Err(CheckError::InvalidInput(_))),
            "{typed} gave {result:?}"
        );
    }
}

#[tokio::test]
async fn test_throttled_keeps_retry_after() {
    let server = MockServer::start().await;
    Mock::given(path("/api/profile/busy"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "30")
                .set_body_json(json!({ "error": "slow down" })),
        )
        .mount(&server)
        .await;

    let result = checker(&server).check("busy").await;
    assert_eq!(
        result,
        Err(CheckError::Throttled {
            retry_after: Some(Duration::from_secs(30))
        })
    );
}

#[tokio::test]
async fn test_session_holds_last_report() {
    let mut rng = StdRng::seed_from_u64(1);
    let checker = FollowChecker::new(DemoSource::new(&mut rng, 10, 8, 5));
    let mut session = CheckSession::new();

    assert!(session.export().is_none());

    let report = checker.check("demo").await.unwrap();
    assert_eq!(report.comparison.mutual.len(), 5);
    session.store(report.clone());

    let document = session.export().unwrap();
    assert_eq!(document.username, "demo");
    assert_eq!(document.filename(), "demo_data.json");
    assert_eq!(document.mutuals, report.comparison.mutual);
    assert_eq!(document.only_followers, report.comparison.only_in_a);
    assert_eq!(document.only_following, report.comparison.only_in_b);
    assert_eq!(document.followers, report.followers);

    session.reset();
    assert!(session.current().is_none());
    assert!(session.export().is_none());
}

#[test]
fn test_stage_messages() {
    assert_eq!(
        CheckStage::LookingUpProfile("ana".to_string()).to_string(),
        "Looking up @ana"
    );
    assert_eq!(
        CheckStage::FetchingLists {
            follower_count: Some(5),
            following_count: None
        }
        .to_string(),
        "Fetching lists (followers: 5, following: ?)"
    );
}
