use crate::{APP_USER_AGENT, GIT_COMMIT_HASH};

// axum handler for `/`
pub async fn root() -> String {
    format!("{APP_USER_AGENT} ({GIT_COMMIT_HASH})")
}
