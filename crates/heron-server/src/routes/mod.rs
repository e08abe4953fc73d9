// Export route modules
pub mod meta;
pub mod reply;
pub mod session;

use crate::state::AppState;
use axum::Router;

// Function to configure all routes
pub fn configure(state: AppState) -> Router {
    Router::new()
        .merge(meta::routes())
        .merge(session::routes(state.clone()))
        .merge(reply::routes(state))
}
