use axum::{Json, extract::{Extension, State}};

use crate::error::AppResult;
use crate::middleware::auth::CurrentUser;
use crate::models::user::UserProfile;
use crate::state::AppState;

pub async fn get_current_user(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<Json<UserProfile>> {
    let user = state.auth.find_user(current_user.id).await?;
    Ok(Json(user.into()))
}
