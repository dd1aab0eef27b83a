use axum::{Json, extract::{Extension, State}};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::CurrentUser;
use crate::models::user::UserProfile;
use crate::state::AppState;

pub async fn list_users(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<Json<Vec<UserProfile>>> {
    if !current_user.role.is_admin() {
        return Err(AppError::Forbidden);
    }

    let users = state.auth.list_users().await?;
    Ok(Json(users.into_iter().map(UserProfile::from).collect()))
}
