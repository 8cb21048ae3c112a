//! Integration tests for the broker auth backend

use axum::body::{to_bytes, Body};
use axum::http::{header::CONTENT_TYPE, Request, StatusCode};
use broker_authz::acl::{ResourceRequest, TopicRequest, UserRequest, VhostRequest};
use broker_authz::auth::PASSWORD_LEN;
use broker_authz::config::*;
use broker_authz::server::{router, AppState};
use broker_authz::{DecisionEngine, Verdict};
use proptest::prelude::*;
use tower::ServiceExt;

fn path_style_engine() -> DecisionEngine {
    let mut config = BrokerAuthConfig::default();
    config.topics.root = "fleet".to_string();
    config.topics.routing_key_style = RoutingKeyStyle::Path;
    DecisionEngine::new(&config).unwrap()
}

fn user(username: &str, password: &str) -> UserRequest {
    UserRequest {
        username: Some(username.to_string()),
        password: Some(password.to_string()),
        ..Default::default()
    }
}

fn topic(username: &str, permission: &str, routing_key: &str) -> TopicRequest {
    TopicRequest {
        username: Some(username.to_string()),
        vhost: Some("/".to_string()),
        resource: Some("topic".to_string()),
        name: None,
        permission: Some(permission.to_string()),
        routing_key: Some(routing_key.to_string()),
    }
}

async fn post_form(app: axum::Router, uri: &str, body: &str) -> (StatusCode, String) {
    let response = app
        .oneshot(
            Request::post(uri)
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), 1024).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

/// Decision table from the broker's point of view
#[test]
fn test_decision_table() {
    let engine = path_style_engine();
    let bus7 = engine.devices().derive("Bus-7");
    let bus51 = engine.devices().derive("Bus-51");

    assert_eq!(
        engine.user(&user("admin", "admin123")).verdict,
        Verdict::AllowAdministrator
    );
    assert_eq!(engine.user(&user("Bus-7", &bus7)).verdict, Verdict::Allow);
    assert_eq!(engine.user(&user("Bus-7", "wrong")).verdict, Verdict::Deny);
    assert_eq!(engine.user(&user("Bus-51", &bus51)).verdict, Verdict::Deny);

    let vhost = |v: &str| VhostRequest {
        username: Some("Bus-1".to_string()),
        vhost: Some(v.to_string()),
        ip: Some("10.0.0.1".to_string()),
    };
    assert_eq!(engine.vhost(&vhost("/")).verdict, Verdict::Allow);
    assert_eq!(engine.vhost(&vhost("other")).verdict, Verdict::Deny);

    let resource = |kind: &str, permission: &str| ResourceRequest {
        username: Some("Bus-1".to_string()),
        vhost: Some("/".to_string()),
        resource: Some(kind.to_string()),
        name: Some("amq.topic".to_string()),
        permission: Some(permission.to_string()),
    };
    assert_eq!(engine.resource(&resource("topic", "write")).verdict, Verdict::Allow);
    assert_eq!(engine.resource(&resource("queue", "configure")).verdict, Verdict::Deny);

    assert_eq!(engine.topic(&topic("Bus-3", "write", "fleet/Bus-3")).verdict, Verdict::Allow);
    assert_eq!(
        engine.topic(&topic("Bus-3", "write", "fleet/Bus-3/sub")).verdict,
        Verdict::Allow
    );
    assert_eq!(engine.topic(&topic("Bus-3", "write", "fleet/Bus-31")).verdict, Verdict::Deny);
    assert_eq!(engine.topic(&topic("Bus-3", "read", "fleet/Bus-99")).verdict, Verdict::Allow);
}

/// Devices provisioned from the fleet table can log in and publish under their own path
#[test]
fn test_provisioned_fleet_round_trip() {
    let engine = DecisionEngine::new(&BrokerAuthConfig::default()).unwrap();

    for credential in engine.devices().fleet() {
        assert_eq!(
            engine.user(&user(&credential.device, &credential.password)).verdict,
            Verdict::Allow
        );

        let own = engine.topics().device_routing_key(&credential.device);
        assert_eq!(
            engine.topic(&topic(&credential.device, "write", &own)).verdict,
            Verdict::Allow
        );
    }
    assert_eq!(engine.devices().fleet().count(), 50);
}

/// Secrets from configuration change every derived password
#[test]
fn test_configured_secret() {
    let mut config = BrokerAuthConfig::default();
    config.devices.secret = Some("other-secret".to_string());
    let engine = DecisionEngine::new(&config).unwrap();

    assert_eq!(engine.user(&user("Bus-7", "eiYtHYDBqMAmMWEa")).verdict, Verdict::Allow);
    assert_eq!(engine.user(&user("Bus-7", "HAvR+Ih1zNbpj8v4")).verdict, Verdict::Deny);
}

/// Configuration deserialization with every section
#[test]
fn test_config_deserialization() {
    let json = r#"{
        "admin": { "username": "ops", "password": "hunter2" },
        "devices": {
            "prefix": "Tram",
            "fleet-size": 5,
            "resources": ["topic"]
        },
        "vhost": { "name": "city" },
        "topics": { "root": "city/trams", "routing-key-style": "path" }
    }"#;

    let config: BrokerAuthConfig = serde_json::from_str(json).expect("Failed to parse config");
    let engine = DecisionEngine::new(&config).unwrap();

    assert_eq!(engine.user(&user("ops", "hunter2")).verdict, Verdict::AllowAdministrator);
    assert_eq!(engine.user(&user("admin", "admin123")).verdict, Verdict::Deny);

    let tram = engine.devices().derive("Tram-5");
    assert_eq!(engine.user(&user("Tram-5", &tram)).verdict, Verdict::Allow);
    assert!(!engine.devices().is_valid_device("Tram-6"));
    assert!(!engine.devices().is_valid_device("Bus-1"));

    assert_eq!(
        engine.topic(&topic("Tram-5", "write", "city/trams/Tram-5/gps")).verdict,
        Verdict::Allow
    );
}

#[test]
fn test_invalid_config_rejected() {
    let mut config = BrokerAuthConfig::default();
    config.admin.username = "Bus-1".to_string();
    assert!(DecisionEngine::new(&config).is_err());
}

#[tokio::test]
async fn test_http_decision_points() {
    let engine = DecisionEngine::new(&BrokerAuthConfig::default()).unwrap();
    let password = engine.devices().derive("Bus-3");
    let app = router(AppState::new(engine));

    let (status, body) = post_form(
        app.clone(),
        "/user",
        &format!("username=Bus-3&password={}", urlencoding::encode(&password)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "allow");

    let (_, body) = post_form(app.clone(), "/user", "user=admin&pass=admin123").await;
    assert_eq!(body, "allow administrator management");

    let (status, body) = post_form(
        app.clone(),
        "/user",
        &format!(
            "username=&user=Bus-3&password={}&pass=ignored",
            urlencoding::encode(&password)
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "allow");

    let (_, body) = post_form(app.clone(), "/vhost", "username=Bus-3&vhost=%2F").await;
    assert_eq!(body, "allow");

    let (_, body) = post_form(
        app.clone(),
        "/resource",
        "username=Bus-3&vhost=%2F&resource=exchange&name=amq.topic&permission=configure",
    )
    .await;
    assert_eq!(body, "deny");

    let (_, body) = post_form(
        app.clone(),
        "/topic",
        "username=Bus-3&vhost=%2F&resource=topic&name=amq.topic&permission=write&routing_key=.some.path.Bus-3.speed",
    )
    .await;
    assert_eq!(body, "allow");

    let (_, body) = post_form(
        app,
        "/topic",
        "username=Bus-3&vhost=%2F&resource=topic&name=amq.topic&permission=write&routing_key=.some.path.Bus-31",
    )
    .await;
    assert_eq!(body, "deny");
}

proptest! {
    #[test]
    fn prop_derive_is_deterministic(id in ".*") {
        let engine = DecisionEngine::new(&BrokerAuthConfig::default()).unwrap();
        let first = engine.devices().derive(&id);
        prop_assert_eq!(first.chars().count(), PASSWORD_LEN);
        prop_assert_eq!(first, engine.devices().derive(&id));
    }

    #[test]
    fn prop_out_of_fleet_never_verifies(n in 51u32..1_000_000, password in "[A-Za-z0-9+/]{16}") {
        let engine = DecisionEngine::new(&BrokerAuthConfig::default()).unwrap();
        let id = format!("Bus-{}", n);
        prop_assert!(!engine.devices().is_valid_device(&id));
        prop_assert!(!engine.devices().verify(&id, &password));
        let derived = engine.devices().derive(&id);
        prop_assert!(!engine.devices().verify(&id, &derived));
    }

    #[test]
    fn prop_foreign_names_never_valid(id in "[a-z]{1,8}-[0-9]{1,3}") {
        let engine = DecisionEngine::new(&BrokerAuthConfig::default()).unwrap();
        prop_assert!(!engine.devices().is_valid_device(&id));
    }

    #[test]
    fn prop_write_stays_in_own_subtree(n in 1u32..=50, suffix in "[A-Za-z0-9]{1,6}") {
        let engine = path_style_engine();
        let device = format!("Bus-{}", n);

        let sub = format!("fleet/{}/{}", device, suffix);
        prop_assert_eq!(engine.topic(&topic(&device, "write", &sub)).verdict, Verdict::Allow);

        let glued = format!("fleet/{}{}", device, suffix);
        prop_assert_eq!(engine.topic(&topic(&device, "write", &glued)).verdict, Verdict::Deny);
    }
}
