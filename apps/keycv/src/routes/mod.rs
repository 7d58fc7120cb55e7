pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::state::AppState;
use crate::workflow::handlers;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Accounts
        .route("/api/auth/signup", post(handlers::handle_sign_up))
        .route("/api/auth/signin", post(handlers::handle_sign_in))
        .route("/api/auth/signout", post(handlers::handle_sign_out))
        .route("/api/auth/session", get(handlers::handle_session))
        // Analysis
        .route(
            "/api/analyze",
            post(handlers::handle_analyze).layer(DefaultBodyLimit::max(state.upload_limit_bytes)),
        )
        // Saved feedback
        .route(
            "/api/feedback",
            post(handlers::handle_save_feedback).get(handlers::handle_list_feedback),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use async_trait::async_trait;
    use tokio::sync::Notify;
    use uuid::Uuid;

    use crate::gateway::{GatewayReply, MockAnalysisGateway};
    use crate::identity::MockIdentityProvider;
    use crate::models::analysis::{AnalysisReport, ResumeFile};
    use crate::models::records::{FeedbackRecord, NewFeedbackRecord, NewResumeRecord, ResumeRecord};
    use crate::models::user::{AuthSession, AuthUser, UserId};
    use crate::storage::{MockBlobStore, MockRecordStore, RecordStore, StoreError};
    use crate::workflow::accounts::AccountService;
    use crate::workflow::controller::SubmissionController;
    use crate::workflow::gallery::FeedbackGallery;
    use crate::workflow::reconciler::PersistenceReconciler;

    const BOUNDARY: &str = "keycv-test-boundary";

    fn state_with(gateway: MockAnalysisGateway) -> AppState {
        build_state(
            gateway,
            MockIdentityProvider::new(),
            Arc::new(MockRecordStore::new()),
            1024 * 1024,
        )
    }

    fn build_state(
        gateway: MockAnalysisGateway,
        identity: MockIdentityProvider,
        records: Arc<dyn RecordStore>,
        upload_limit_bytes: usize,
    ) -> AppState {
        AppState {
            submissions: Arc::new(SubmissionController::new(Arc::new(gateway))),
            reconciler: Arc::new(PersistenceReconciler::new(
                records.clone(),
                Arc::new(MockBlobStore::new()),
            )),
            accounts: Arc::new(AccountService::new(Arc::new(identity), records.clone())),
            gallery: Arc::new(FeedbackGallery::new(records)),
            upload_limit_bytes,
        }
    }

    /// Gateway that scores every upload and echoes the file name back as the cv name.
    fn echoing_gateway() -> MockAnalysisGateway {
        let mut gateway = MockAnalysisGateway::new();
        gateway.expect_analyze().returning(|_, file: &ResumeFile| {
            Ok(GatewayReply {
                report: AnalysisReport {
                    match_score: 70.0,
                    ..Default::default()
                },
                resume_text: Some(format!("text of {}", file.file_name)),
                cv_name: Some(file.file_name.clone()),
                ..Default::default()
            })
        });
        gateway
    }

    fn signing_in(user_id: UserId) -> MockIdentityProvider {
        let mut identity = MockIdentityProvider::new();
        identity.expect_sign_in().return_once(move |_, _| {
            Ok(AuthSession {
                user: AuthUser {
                    id: user_id,
                    email: Some("a@example.com".to_string()),
                },
                access_token: "token-123".to_string(),
            })
        });
        identity
    }

    async fn signed_in_state(
        user_id: UserId,
        records: Arc<dyn RecordStore>,
    ) -> AppState {
        let state = build_state(echoing_gateway(), signing_in(user_id), records, 1024 * 1024);
        state
            .accounts
            .sign_in("a@example.com", "password1")
            .await
            .unwrap();
        state
    }

    fn existing_cv(user_id: UserId, name: &str) -> ResumeRecord {
        ResumeRecord {
            id: Uuid::new_v4(),
            user_id,
            name: name.to_string(),
            cv_storage_id: format!("{user_id}/{name}.txt"),
        }
    }

    fn save_request() -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/feedback")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"label":"Spring2025"}"#))
            .unwrap()
    }

    async fn analyze(app: &Router, file_name: &str) -> StatusCode {
        app.clone()
            .oneshot(analyze_request(multipart_body(
                "Backend engineer role",
                Some((file_name, &b"%PDF-1.4"[..])),
            )))
            .await
            .unwrap()
            .status()
    }

    /// Record store whose cv lookup parks until released.
    struct PausedLookupStore {
        user_id: UserId,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl RecordStore for PausedLookupStore {
        async fn insert_user(&self, _user_id: UserId) -> Result<(), StoreError> {
            Ok(())
        }

        async fn find_resumes(
            &self,
            _user_id: UserId,
            name: &str,
        ) -> Result<Vec<ResumeRecord>, StoreError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(vec![existing_cv(self.user_id, name)])
        }

        async fn insert_resume(
            &self,
            _record: &NewResumeRecord,
        ) -> Result<Option<Uuid>, StoreError> {
            Ok(Some(Uuid::new_v4()))
        }

        async fn insert_feedback(&self, _record: &NewFeedbackRecord) -> Result<Uuid, StoreError> {
            Ok(Uuid::new_v4())
        }

        async fn list_feedback(&self, _user_id: UserId) -> Result<Vec<FeedbackRecord>, StoreError> {
            Ok(Vec::new())
        }
    }

    fn multipart_body(job_description: &str, file: Option<(&str, &[u8])>) -> Body {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"job_description\"\r\n\r\n{job_description}\r\n"
        )
        .into_bytes();
        if let Some((file_name, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"cv_file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Body::from(body)
    }

    fn analyze_request(body: Body) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/analyze")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(body)
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = build_router(state_with(MockAnalysisGateway::new()));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_analyze_without_file_is_bad_request() {
        let mut gateway = MockAnalysisGateway::new();
        gateway.expect_analyze().times(0);

        let app = build_router(state_with(gateway));
        let response = app
            .oneshot(analyze_request(multipart_body("Rust engineer", None)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["message"], "Please attach a CV file.");
    }

    #[tokio::test]
    async fn test_analyze_renders_result_card() {
        let mut gateway = MockAnalysisGateway::new();
        gateway
            .expect_analyze()
            .withf(|jd, file| jd == "Rust engineer" && file.file_name == "cv.pdf")
            .times(1)
            .return_once(|_, _| {
                Ok(GatewayReply {
                    message: Some("Analysis complete".to_string()),
                    report: AnalysisReport {
                        match_score: 82.4,
                        present_keywords: vec!["Rust".to_string()],
                        missing_keywords: vec![],
                        recommendations: vec!["Mention tokio".to_string()],
                    },
                    resume_text: Some("resume text".to_string()),
                    ..Default::default()
                })
            });

        let app = build_router(state_with(gateway));
        let response = app
            .oneshot(analyze_request(multipart_body(
                "  Rust engineer  ",
                Some(("cv.pdf", &b"%PDF-1.4"[..])),
            )))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["state"], "succeeded");
        assert_eq!(body["message"], "Analysis complete");
        assert_eq!(body["view"]["match_score"], "82%");
    }

    #[tokio::test]
    async fn test_save_while_signed_out_is_unauthorized() {
        let app = build_router(state_with(MockAnalysisGateway::new()));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/feedback")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"label":"Spring2025"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"]["code"], "NOT_AUTHENTICATED");
    }

    #[tokio::test]
    async fn test_session_is_empty_when_signed_out() {
        let app = build_router(state_with(MockAnalysisGateway::new()));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/auth/session")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(json_body(response).await["user"].is_null());
    }

    #[tokio::test]
    async fn test_list_while_signed_out_is_unauthorized() {
        let app = build_router(state_with(MockAnalysisGateway::new()));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/feedback")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_successful_save_clears_pending_analysis() {
        let user_id = UserId::random();
        let mut records = MockRecordStore::new();
        records
            .expect_find_resumes()
            .times(1)
            .returning(move |_, name| Ok(vec![existing_cv(user_id, name)]));
        records
            .expect_insert_feedback()
            .times(1)
            .returning(|_| Ok(Uuid::new_v4()));

        let state = signed_in_state(user_id, Arc::new(records)).await;
        let app = build_router(state.clone());
        assert_eq!(analyze(&app, "resume.pdf").await, StatusCode::OK);

        let response = app.clone().oneshot(save_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["ack"]["reused_resume"], true);
        assert!(state.submissions.pending().is_none());

        let again = app.oneshot(save_request()).await.unwrap();
        assert_eq!(again.status(), StatusCode::CONFLICT);
        assert_eq!(json_body(again).await["error"]["code"], "INCOMPLETE_ANALYSIS");
    }

    #[tokio::test]
    async fn test_failed_save_keeps_pending_analysis() {
        let user_id = UserId::random();
        let mut records = MockRecordStore::new();
        records
            .expect_find_resumes()
            .times(1)
            .returning(|_, _| Err(StoreError::Query("connection reset".to_string())));
        records.expect_insert_feedback().times(0);

        let state = signed_in_state(user_id, Arc::new(records)).await;
        let app = build_router(state.clone());
        assert_eq!(analyze(&app, "resume.pdf").await, StatusCode::OK);

        let response = app.oneshot(save_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(json_body(response).await["error"]["code"], "SAVE_FAILED");

        let pending = state.submissions.pending().unwrap();
        assert_eq!(pending.resume_name.as_deref(), Some("resume.pdf"));
    }

    #[tokio::test]
    async fn test_save_keeps_analysis_submitted_while_saving() {
        let user_id = UserId::random();
        let store = Arc::new(PausedLookupStore {
            user_id,
            entered: Notify::new(),
            release: Notify::new(),
        });

        let state = signed_in_state(user_id, store.clone()).await;
        let app = build_router(state.clone());
        assert_eq!(analyze(&app, "a.pdf").await, StatusCode::OK);

        let save = tokio::spawn(app.clone().oneshot(save_request()));
        store.entered.notified().await;

        assert_eq!(analyze(&app, "b.pdf").await, StatusCode::OK);
        store.release.notify_one();

        let response = save.await.unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let pending = state.submissions.pending().unwrap();
        assert_eq!(pending.resume_name.as_deref(), Some("b.pdf"));
    }

    #[tokio::test]
    async fn test_oversized_upload_is_payload_too_large() {
        let mut gateway = MockAnalysisGateway::new();
        gateway.expect_analyze().times(0);

        let state = build_state(
            gateway,
            MockIdentityProvider::new(),
            Arc::new(MockRecordStore::new()),
            256,
        );
        let app = build_router(state);
        let big_file = vec![b'x'; 4096];
        let response = app
            .oneshot(analyze_request(multipart_body(
                "Backend engineer role",
                Some(("resume.pdf", &big_file[..])),
            )))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json_body(response).await["error"]["code"], "UPLOAD_TOO_LARGE");
    }
}
