use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{auth, meals, users};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .merge(auth::router())
                .merge(users::router())
                .merge(meals::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, host: &str, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::{ADMIN_EMAIL, ADMIN_PASSWORD, USER_EMAIL, USER_PASSWORD};
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        app.clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn login(app: &Router, email: &str, password: &str) -> String {
        let response = send(
            app,
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        json_body(response).await["access_token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    async fn app() -> Router {
        build_app(AppState::fake().await)
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = app().await;
        let response = send(&app, Method::GET, "/api/v1/health", None, None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn meals_require_authentication() {
        let app = app().await;
        let response = send(&app, Method::GET, "/api/v1/meals", None, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn login_rejects_wrong_password() {
        let app = app().await;
        let response = send(
            &app,
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": USER_EMAIL, "password": "nope-nope" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn lists_own_meals_with_excess_flags() {
        let app = app().await;
        let token = login(&app, USER_EMAIL, USER_PASSWORD).await;

        let response = send(&app, Method::GET, "/api/v1/meals", Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let meals = json_body(response).await;
        let meals = meals.as_array().unwrap();
        assert_eq!(meals.len(), 7);
        // newest first
        assert_eq!(meals[0]["date_time"], "2020-01-31T20:00:00");
        for meal in meals {
            let on_31st = meal["date_time"].as_str().unwrap().starts_with("2020-01-31");
            assert_eq!(meal["excess"], on_31st);
        }
    }

    #[tokio::test]
    async fn filters_by_date_and_time() {
        let app = app().await;
        let token = login(&app, USER_EMAIL, USER_PASSWORD).await;

        let response = send(
            &app,
            Method::GET,
            "/api/v1/meals/filter?start_date=2020-01-30&end_date=2020-01-31&start_time=07:00&end_time=12:00",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let meals = json_body(response).await;
        assert_eq!(
            meals,
            json!([
                {
                    "id": meals[0]["id"],
                    "date_time": "2020-01-31T10:00:00",
                    "description": "Breakfast",
                    "calories": 1000,
                    "excess": true
                },
                {
                    "id": meals[1]["id"],
                    "date_time": "2020-01-30T10:00:00",
                    "description": "Breakfast",
                    "calories": 500,
                    "excess": false
                }
            ])
        );
    }

    #[tokio::test]
    async fn single_day_filter_keeps_whole_day_sum() {
        let app = app().await;
        let token = login(&app, USER_EMAIL, USER_PASSWORD).await;

        let response = send(
            &app,
            Method::GET,
            "/api/v1/meals/filter?start_date=2020-01-31&end_date=2020-01-31&start_time=&end_time=01:00",
            Some(&token),
            None,
        )
        .await;
        let meals = json_body(response).await;
        let meals = meals.as_array().unwrap();
        assert_eq!(meals.len(), 1);
        assert_eq!(meals[0]["calories"], 100);
        assert_eq!(meals[0]["excess"], true);
    }

    #[tokio::test]
    async fn overnight_window_is_rejected() {
        let app = app().await;
        let token = login(&app, USER_EMAIL, USER_PASSWORD).await;
        let response = send(
            &app,
            Method::GET,
            "/api/v1/meals/filter?start_time=22:00&end_time=06:00",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn ui_view_adds_date_time_ui() {
        let app = app().await;
        let token = login(&app, USER_EMAIL, USER_PASSWORD).await;
        let response = send(&app, Method::GET, "/api/v1/meals?view=ui", Some(&token), None).await;
        let meals = json_body(response).await;
        assert_eq!(meals[0]["date_time_ui"], "2020-01-31 20:00");

        let response = send(&app, Method::GET, "/api/v1/meals", Some(&token), None).await;
        let meals = json_body(response).await;
        assert!(meals[0].get("date_time_ui").is_none());
    }

    #[tokio::test]
    async fn meal_crud_round() {
        let app = app().await;
        let token = login(&app, USER_EMAIL, USER_PASSWORD).await;

        let created = send(
            &app,
            Method::POST,
            "/api/v1/meals",
            Some(&token),
            Some(json!({
                "date_time": "2020-02-01T18:00:00",
                "description": "Created dinner",
                "calories": 300
            })),
        )
        .await;
        assert_eq!(created.status(), StatusCode::CREATED);
        let location = created.headers()[header::LOCATION].to_str().unwrap().to_string();
        let id = json_body(created).await["id"].as_str().unwrap().to_string();
        assert_eq!(location, format!("/api/v1/meals/{id}"));

        let updated = send(
            &app,
            Method::PUT,
            &location,
            Some(&token),
            Some(json!({
                "date_time": "2020-02-01T18:30:00",
                "description": "Updated dinner",
                "calories": 350
            })),
        )
        .await;
        assert_eq!(updated.status(), StatusCode::NO_CONTENT);

        let fetched = json_body(send(&app, Method::GET, &location, Some(&token), None).await).await;
        assert_eq!(fetched["description"], "Updated dinner");
        assert_eq!(fetched["date_time"], "2020-02-01T18:30:00");

        let deleted = send(&app, Method::DELETE, &location, Some(&token), None).await;
        assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
        let missing = send(&app, Method::GET, &location, Some(&token), None).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn cannot_touch_someone_elses_meal() {
        let app = app().await;
        let admin = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
        let user = login(&app, USER_EMAIL, USER_PASSWORD).await;

        let admin_meals = json_body(send(&app, Method::GET, "/api/v1/meals", Some(&admin), None).await).await;
        let id = admin_meals[0]["id"].as_str().unwrap();
        let uri = format!("/api/v1/meals/{id}");

        let response = send(&app, Method::GET, &uri, Some(&user), None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let response = send(&app, Method::DELETE, &uri, Some(&user), None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_meal_is_rejected() {
        let app = app().await;
        let token = login(&app, USER_EMAIL, USER_PASSWORD).await;
        let response = send(
            &app,
            Method::POST,
            "/api/v1/meals",
            Some(&token),
            Some(json!({ "date_time": "2020-02-01T18:00:00", "description": "x", "calories": 300 })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let duplicate = send(
            &app,
            Method::POST,
            "/api/v1/meals",
            Some(&token),
            Some(json!({ "date_time": "2020-01-30T10:00:00", "description": "Again", "calories": 300 })),
        )
        .await;
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn users_are_admin_only() {
        let app = app().await;
        let user = login(&app, USER_EMAIL, USER_PASSWORD).await;
        let response = send(&app, Method::GET, "/api/v1/users", Some(&user), None).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let admin = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
        let response = send(&app, Method::GET, "/api/v1/users", Some(&admin), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let users = json_body(response).await;
        let names: Vec<_> = users
            .as_array()
            .unwrap()
            .iter()
            .map(|u| u["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["Admin", "User"]);
        assert!(!users.to_string().contains("password"));
    }

    #[tokio::test]
    async fn disabled_user_cannot_log_in() {
        let app = app().await;
        let admin = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

        let user = json_body(
            send(
                &app,
                Method::GET,
                &format!("/api/v1/users/by-email?email={USER_EMAIL}"),
                Some(&admin),
                None,
            )
            .await,
        )
        .await;
        let id = user["id"].as_str().unwrap();

        let response = send(
            &app,
            Method::PATCH,
            &format!("/api/v1/users/{id}/enabled?enabled=false"),
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = send(
            &app,
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": USER_EMAIL, "password": USER_PASSWORD })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn register_then_use_own_threshold() {
        let app = app().await;
        let response = send(
            &app,
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({
                "name": "New",
                "email": "new@gmail.com",
                "password": "newPass",
                "calories_per_day": 400
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let token = json_body(response).await["access_token"]
            .as_str()
            .unwrap()
            .to_string();

        for (time, calories) in [("08:00:00", 300), ("12:00:00", 200)] {
            let response = send(
                &app,
                Method::POST,
                "/api/v1/meals",
                Some(&token),
                Some(json!({
                    "date_time": format!("2020-03-01T{time}"),
                    "description": "Snack",
                    "calories": calories
                })),
            )
            .await;
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let meals = json_body(send(&app, Method::GET, "/api/v1/meals", Some(&token), None).await).await;
        assert!(meals
            .as_array()
            .unwrap()
            .iter()
            .all(|m| m["excess"] == true));

        let me = json_body(send(&app, Method::GET, "/api/v1/me", Some(&token), None).await).await;
        assert_eq!(me["calories_per_day"], 400);
        assert_eq!(me["roles"], json!(["USER"]));
    }

    #[tokio::test]
    async fn refresh_issues_new_pair() {
        let app = app().await;
        let response = send(
            &app,
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD })),
        )
        .await;
        let body = json_body(response).await;
        let refresh_token = body["refresh_token"].as_str().unwrap();

        let response = send(
            &app,
            Method::POST,
            "/api/v1/auth/refresh",
            None,
            Some(json!({ "refresh_token": refresh_token })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let access = json_body(response).await["access_token"]
            .as_str()
            .unwrap()
            .to_string();
        let response = send(&app, Method::GET, "/api/v1/users", Some(&access), None).await;
        assert_eq!(response.status(), StatusCode::OK);

        // An access token is not accepted for refresh.
        let response = send(
            &app,
            Method::POST,
            "/api/v1/auth/refresh",
            None,
            Some(json!({ "refresh_token": access })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn deleting_profile_drops_meals() {
        let app = app().await;
        let admin = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
        let user = login(&app, USER_EMAIL, USER_PASSWORD).await;

        let response = send(&app, Method::DELETE, "/api/v1/me", Some(&user), None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = send(&app, Method::GET, "/api/v1/meals", Some(&user), None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let users = json_body(send(&app, Method::GET, "/api/v1/users", Some(&admin), None).await).await;
        assert_eq!(users.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deleted_account_cannot_write_meals() {
        let state = AppState::fake().await;
        let app = build_app(state.clone());
        let user_id = state.users.get_by_email(USER_EMAIL).await.unwrap().unwrap().id;
        let user = login(&app, USER_EMAIL, USER_PASSWORD).await;
        let admin = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
        let meal_id = state.meals.get_all(user_id).await.unwrap()[0].id;

        let response = send(&app, Method::DELETE, "/api/v1/me", Some(&user), None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = send(
            &app,
            Method::POST,
            "/api/v1/meals",
            Some(&user),
            Some(json!({ "date_time": "2020-02-01T10:00:00", "description": "Ghost", "calories": 300 })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let uri = format!("/api/v1/meals/{meal_id}");
        let response = send(
            &app,
            Method::PUT,
            &uri,
            Some(&user),
            Some(json!({ "date_time": "2020-02-01T10:00:00", "description": "Ghost", "calories": 300 })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        for method in [Method::GET, Method::DELETE] {
            let response = send(&app, method, &uri, Some(&user), None).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
        assert!(state.meals.get_all(user_id).await.unwrap().is_empty());

        // Same for an account removed by an admin.
        let admin_id = state.users.get_by_email(ADMIN_EMAIL).await.unwrap().unwrap().id;
        assert!(state.users.delete(admin_id).await.unwrap());
        let response = send(
            &app,
            Method::POST,
            "/api/v1/meals",
            Some(&admin),
            Some(json!({ "date_time": "2020-02-01T10:00:00", "description": "Ghost", "calories": 300 })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_manages_users() {
        let app = app().await;
        let admin = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

        let created = send(
            &app,
            Method::POST,
            "/api/v1/users",
            Some(&admin),
            Some(json!({ "name": "New", "email": "New@Gmail.com", "password": "newPass" })),
        )
        .await;
        assert_eq!(created.status(), StatusCode::CREATED);
        let location = created.headers()[header::LOCATION].to_str().unwrap().to_string();
        let user = json_body(created).await;
        assert_eq!(user["email"], "new@gmail.com");
        assert_eq!(user["calories_per_day"], 2000);
        assert!(user.get("password").is_none());
        assert!(user.get("password_hash").is_none());

        let duplicate = send(
            &app,
            Method::POST,
            "/api/v1/users",
            Some(&admin),
            Some(json!({ "name": "Dup", "email": "new@gmail.com", "password": "newPass" })),
        )
        .await;
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);

        let updated = send(
            &app,
            Method::PUT,
            &location,
            Some(&admin),
            Some(json!({
                "name": "Promoted",
                "email": "new@gmail.com",
                "password": "otherPass",
                "roles": ["USER", "ADMIN"]
            })),
        )
        .await;
        assert_eq!(updated.status(), StatusCode::NO_CONTENT);
        let promoted = login(&app, "new@gmail.com", "otherPass").await;
        let response = send(&app, Method::GET, "/api/v1/users", Some(&promoted), None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let deleted = send(&app, Method::DELETE, &location, Some(&admin), None).await;
        assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
        let missing = send(&app, Method::GET, &location, Some(&admin), None).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}
