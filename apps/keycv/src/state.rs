use std::sync::Arc;

use crate::workflow::accounts::AccountService;
use crate::workflow::controller::SubmissionController;
use crate::workflow::gallery::FeedbackGallery;
use crate::workflow::reconciler::PersistenceReconciler;

/// Shared application state injected into all route handlers via Axum extractors.
///
/// One instance serves one user session: the controller holds the pending
/// analysis and the account service holds the signed-in user.
#[derive(Clone)]
pub struct AppState {
    pub submissions: Arc<SubmissionController>,
    pub reconciler: Arc<PersistenceReconciler>,
    pub accounts: Arc<AccountService>,
    pub gallery: Arc<FeedbackGallery>,
    /// Request body cap for the multipart upload route.
    pub upload_limit_bytes: usize,
}
