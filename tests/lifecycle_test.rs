//! End-to-end lifecycle tests against a real listener on loopback.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{routing::get, Router};

use tenant_runtime::events::LOG_TOPIC;
use tenant_runtime::http::{HealthRoutes, RouteSpecifier, X_CORRELATION_ID};
use tenant_runtime::lifecycle::{App, BootstrapOptions, LifecycleError, LifecycleState};
use tenant_runtime::observability::{CaptureSink, Level};

mod common;

use common::{lazy_pool, local_config, refused, RecordingDispatcher};

async fn bootstrap(config: tenant_runtime::ServiceConfig) -> (CaptureSink, App) {
    let sink = CaptureSink::new();
    let options = BootstrapOptions::new("lifecycle-test", config, Arc::new(sink.clone()));
    let app = App::bootstrap_with(options, || async { Ok(lazy_pool()) })
        .await
        .unwrap();
    (sink, app)
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

#[tokio::test]
async fn full_lifecycle_serves_and_stops() {
    let (sink, app) = bootstrap(local_config()).await;
    let app = Arc::new(app);
    assert_eq!(app.state(), LifecycleState::Initializing);
    assert!(app.database().is_none());

    app.initialize(&[&HealthRoutes]).unwrap();
    assert_eq!(app.state(), LifecycleState::Ready);

    let runner = Arc::clone(&app);
    let serving = tokio::spawn(async move { runner.start().await });

    let addr = app.listening_addr().await.expect("server should bind");
    let response = client()
        .get(format!("http://{}/health", addr))
        .header(X_CORRELATION_ID, "health-check-1")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    drop(response);
    assert_eq!(app.state(), LifecycleState::Running);

    app.stop().await.unwrap();
    assert_eq!(app.state(), LifecycleState::Stopped);
    serving.await.unwrap().unwrap();

    let end = sink
        .with_message("End.")
        .into_iter()
        .find(|r| r.str_field("correlationId") == Some("health-check-1"))
        .expect("ingress end line");
    assert_eq!(end.str_field("module"), Some("Ingress"));
    assert_eq!(end.str_field("service"), Some("lifecycle-test"));
    assert_eq!(end.field("status").and_then(|v| v.as_int()), Some(200));
}

#[tokio::test]
async fn phases_must_run_in_order() {
    let (_sink, app) = bootstrap(local_config()).await;

    assert!(matches!(
        app.start().await,
        Err(LifecycleError::InvalidTransition {
            from: LifecycleState::Initializing,
            to: LifecycleState::Running,
        })
    ));
    assert!(matches!(app.stop().await, Err(LifecycleError::InvalidTransition { .. })));

    app.initialize(&[&HealthRoutes]).unwrap();
    assert!(matches!(
        app.initialize(&[&HealthRoutes]),
        Err(LifecycleError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn malformed_port_falls_back_with_error_line() {
    let mut config = local_config();
    config.listener.port = Some("not-a-port".into());
    let (sink, app) = bootstrap(config).await;

    app.initialize(&[&HealthRoutes]).unwrap();

    let errors: Vec<_> = sink
        .records()
        .into_iter()
        .filter(|r| r.level == Level::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("not-a-port is not a number"));
}

#[tokio::test]
async fn tls_without_certificate_fails_start() {
    let mut config = local_config();
    config.tls.enabled = true;
    let (_sink, app) = bootstrap(config).await;

    app.initialize(&[&HealthRoutes]).unwrap();
    assert!(matches!(app.start().await, Err(LifecycleError::Tls(_))));
}

#[tokio::test]
async fn required_database_retries_refused_connections() {
    let mut config = local_config();
    config.database.required = true;
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    let sink = CaptureSink::new();
    let options = BootstrapOptions::new("db-test", config, Arc::new(sink.clone()));

    let app = App::bootstrap_with(options, move || {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        async move {
            if n < 2 {
                Err(refused())
            } else {
                Ok(lazy_pool())
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(app.database().is_some());
    assert_eq!(sink.with_message("Database connected!").len(), 1);

    let app = Arc::new(app);
    app.initialize(&[&HealthRoutes]).unwrap();
    let runner = Arc::clone(&app);
    let serving = tokio::spawn(async move { runner.start().await });
    app.listening_addr().await.expect("server should bind");

    app.stop().await.unwrap();
    serving.await.unwrap().unwrap();
    assert!(app.database().map(|pool| pool.is_closed()).unwrap_or(false));
}

#[tokio::test]
async fn required_database_gives_up_after_attempts() {
    let mut config = local_config();
    config.database.required = true;
    config.database.connect_attempts = 2;
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    let options = BootstrapOptions::new("db-test", config, Arc::new(CaptureSink::new()));

    let result = App::bootstrap_with(options, move || {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Err(refused()) }
    })
    .await;

    assert!(matches!(result, Err(LifecycleError::Database(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn non_refused_database_error_is_not_retried() {
    let mut config = local_config();
    config.database.required = true;
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    let options = BootstrapOptions::new("db-test", config, Arc::new(CaptureSink::new()));

    let result = App::bootstrap_with(options, move || {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Err(sqlx::Error::PoolTimedOut) }
    })
    .await;

    assert!(matches!(result, Err(LifecycleError::Database(sqlx::Error::PoolTimedOut))));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn events_disabled_dispatch_is_a_no_op() {
    let (sink, app) = bootstrap(local_config()).await;

    let warning = sink
        .records()
        .into_iter()
        .find(|r| r.level == Level::Warn)
        .expect("dispatcher warning");
    assert!(warning.message.contains("Event dispatcher not enabled"));

    app.dispatch_event("token", "corr", "tenants", serde_json::json!({"id": 1}));
}

#[tokio::test]
async fn log_lines_are_mirrored_to_the_dispatcher() {
    let mut config = local_config();
    config.events.log_to_events = true;
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let options = BootstrapOptions::new("events-test", config, Arc::new(CaptureSink::new()))
        .with_dispatcher(dispatcher.clone());
    let app = App::bootstrap_with(options, || async { Ok(lazy_pool()) })
        .await
        .unwrap();

    let ctx = app.execution_context_with_system_identity(None, "corr-9", "createTenant", true);
    ctx.log_action_completion().msg("tenant created");
    app.dispatch_event("secret", "corr-9", "tenants", serde_json::json!({"id": 7}));

    let events = dispatcher.events();
    let mirrored = events
        .iter()
        .find(|e| e.topic == LOG_TOPIC && e.payload["message"] == "tenant created")
        .expect("mirrored log line");
    assert_eq!(mirrored.correlation_id, "corr-9");
    assert_eq!(mirrored.payload["action"], "createTenant");

    let direct = events.iter().find(|e| e.topic == "tenants").expect("direct event");
    assert_eq!(direct.token, "secret");
    assert_eq!(direct.payload["id"], 7);
}

#[tokio::test]
async fn events_enabled_without_mirroring_keeps_logs_local() {
    let mut config = local_config();
    config.events.enable_dispatcher = true;
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let sink = CaptureSink::new();
    let options = BootstrapOptions::new("events-test", config, Arc::new(sink.clone()))
        .with_dispatcher(dispatcher.clone());
    let app = App::bootstrap_with(options, || async { Ok(lazy_pool()) })
        .await
        .unwrap();

    app.logger("Tenants").info().msg("local only");
    assert!(dispatcher.events().is_empty());
    assert_eq!(sink.with_message("local only").len(), 1);
}

struct SlowRoutes;

impl RouteSpecifier for SlowRoutes {
    fn register_routes(&self, router: Router) -> Router {
        router.route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                "finally"
            }),
        )
    }
}

#[tokio::test]
async fn stop_abandons_requests_after_grace_window() {
    let mut config = local_config();
    config.timeouts.write_secs = 0;
    config.timeouts.shutdown_grace_secs = 1;
    let (_sink, app) = bootstrap(config).await;
    let app = Arc::new(app);

    app.initialize(&[&HealthRoutes, &SlowRoutes]).unwrap();
    let runner = Arc::clone(&app);
    let serving = tokio::spawn(async move { runner.start().await });
    let addr = app.listening_addr().await.expect("server should bind");

    let in_flight = tokio::spawn(async move {
        client().get(format!("http://{}/slow", addr)).send().await
    });
    tokio::time::sleep(Duration::from_millis(200)).await;

    let started = Instant::now();
    app.stop().await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(app.state(), LifecycleState::Stopped);
    assert!(elapsed >= Duration::from_millis(900), "stopped after {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(10), "stopped after {:?}", elapsed);

    let outcome = in_flight.await.unwrap();
    assert!(outcome.is_err(), "slow request should have been cut off");
    serving.await.unwrap().unwrap();
}
