use reqwest::{StatusCode, header, redirect::Policy};
use stayhub::{AppConfig, AppState, InMemoryRepository, create_app};
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Debug)]
pub struct TestApp {
    pub address: String,
}

async fn spawn_app() -> TestApp {
    let state = AppState {
        repo: Arc::new(InMemoryRepository::new()),
        config: AppConfig::default(),
    };
    let app = create_app(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(
            listener,
            axum::ServiceExt::<axum::extract::Request>::into_make_service(app),
        )
        .await
        .unwrap();
    });

    TestApp { address }
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(Policy::none())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = client()
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_browser_flow_over_http() {
    let app = spawn_app().await;
    let client = client();

    // Sign in through the development form.
    let response = client
        .post(format!("{}/login", app.address))
        .form(&[("username", "ana")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let session = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("session="))
        .and_then(|v| v.split(';').next())
        .expect("login should set a session cookie")
        .to_string();

    // Create a listing as that user.
    let response = client
        .post(format!("{}/listings", app.address))
        .header(header::COOKIE, &session)
        .form(&[
            ("listing[title]", "Lake house"),
            ("listing[description]", "By the water"),
            ("listing[price]", "1250"),
            ("listing[location]", "Hallstatt"),
            ("listing[country]", "Austria"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/listings");

    let page = client
        .get(format!("{}/listings", app.address))
        .header(header::COOKIE, &session)
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("Lake house"));
    assert!(page.contains("1,250"));
    assert!(page.contains("Signed in as"));
}
