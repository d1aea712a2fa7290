use axum::extract::Path;
use axum::Json;

use crate::routes::error::{ApiError, CurrentUser};
use crate::services::permissions::{manifest_for, resolve_permissions, ResolvedPermissions};

/// GET /api/v1/permissoes/{tela}: the caller's effective permissions on a screen.
pub async fn screen_permissions(
    user: CurrentUser,
    Path(screen): Path<String>,
) -> Result<Json<ResolvedPermissions>, ApiError> {
    let manifest = manifest_for(&screen).ok_or(ApiError::UnknownScreen(screen))?;
    Ok(Json(resolve_permissions(manifest, &user.grants)))
}
