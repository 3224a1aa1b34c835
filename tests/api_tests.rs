use hr_directory::{
    AppConfig, AppState, InMemoryStore, Stores, SystemClock, create_router,
    seed::{self, DEMO_PASSWORD},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Debug)]
pub struct TestApp {
    pub address: String,
}

/// Serves a freshly seeded in-memory instance on an ephemeral port.
async fn spawn_app() -> TestApp {
    let config = AppConfig::default();
    let stores = Stores::from_backend(Arc::new(InMemoryStore::new()));
    let state = AppState::new(config.clone(), stores, Arc::new(SystemClock));

    seed::seed(&state.roles, &state.divisions, &state.employees)
        .await
        .expect("Failed to seed demo data");

    let router = create_router(state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp { address }
}

async fn login(client: &reqwest::Client, app: &TestApp, email: &str) -> String {
    let response = client
        .post(format!("{}/api/v1/auth/login", app.address))
        .json(&json!({ "email": email, "password": DEMO_PASSWORD }))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    body["data"]["jwt"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/status", app.address))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
}

#[tokio::test]
async fn test_seeded_directory_is_browsable() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let jwt = login(&client, &app, "devoncthomas@superrito.com").await;

    let roles: Value = client
        .get(format!("{}/api/v1/roles", app.address))
        .bearer_auth(&jwt)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(roles["meta"]["info"]["count"], 2);

    let divisions: Value = client
        .get(format!("{}/api/v1/divisions?page_size=2", app.address))
        .bearer_auth(&jwt)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(divisions["meta"]["info"]["count"], 3);
    assert_eq!(divisions["meta"]["info"]["more_records"], true);

    let employees: Value = client
        .get(format!("{}/api/v1/employees?search=easter", app.address))
        .bearer_auth(&jwt)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(employees["meta"]["info"]["count"], 1);
    assert_eq!(employees["data"][0]["fullname"], "Bettina M. Easter");
    assert_eq!(employees["data"][0]["division"]["name"], "Information Technology");
}

#[tokio::test]
async fn test_employee_self_service_lifecycle() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // Register, then edit and finally delete the own record.
    let signup = client
        .post(format!("{}/api/v1/auth/signup", app.address))
        .json(&json!({
            "fullname": "Quinn Newcomer",
            "email": "quinn@example.com",
            "password": "quinn-password",
            "division_id": 3
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(signup.status(), 201);
    let body: Value = signup.json().await.unwrap();
    let id = body["data"]["employee"]["id"].as_i64().unwrap();
    let jwt = body["data"]["jwt"].as_str().unwrap().to_string();

    let updated = client
        .put(format!("{}/api/v1/employees/{id}", app.address))
        .bearer_auth(&jwt)
        .json(&json!({ "fullname": "Quinn N." }))
        .send()
        .await
        .unwrap();
    assert_eq!(updated.status(), 200);

    let other = client
        .put(format!("{}/api/v1/employees/1", app.address))
        .bearer_auth(&jwt)
        .json(&json!({ "fullname": "Not Vincent" }))
        .send()
        .await
        .unwrap();
    assert_eq!(other.status(), 401);

    let deleted = client
        .delete(format!("{}/api/v1/employees/{id}", app.address))
        .bearer_auth(&jwt)
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), 200);

    // The token outlives the record, but the record is gone.
    let gone = client
        .get(format!("{}/api/v1/employees/{id}", app.address))
        .bearer_auth(&jwt)
        .send()
        .await
        .unwrap();
    assert_eq!(gone.status(), 404);
}

#[tokio::test]
async fn test_admin_can_add_division() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let admin = login(&client, &app, "vincentlhubbard@superrito.com").await;
    let user = login(&client, &app, "bettinameaster@superrito.com").await;

    let denied = client
        .post(format!("{}/api/v1/divisions", app.address))
        .bearer_auth(&user)
        .json(&json!({ "name": "Legal" }))
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), 401);

    let created = client
        .post(format!("{}/api/v1/divisions", app.address))
        .bearer_auth(&admin)
        .json(&json!({ "name": "Legal" }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), 201);
}

#[tokio::test]
async fn test_seeding_twice_is_harmless() {
    let stores = Stores::from_backend(Arc::new(InMemoryStore::new()));
    let state = AppState::new(AppConfig::default(), stores, Arc::new(SystemClock));

    seed::seed(&state.roles, &state.divisions, &state.employees)
        .await
        .unwrap();
    seed::seed(&state.roles, &state.divisions, &state.employees)
        .await
        .unwrap();

    let window = hr_directory::pagination::Window::default();
    assert_eq!(state.roles.find_all(&window).await.unwrap().info.count, 2);
    assert_eq!(state.divisions.find_all(&window).await.unwrap().info.count, 3);
    assert_eq!(state.employees.find_all(&window).await.unwrap().info.count, 3);
}
