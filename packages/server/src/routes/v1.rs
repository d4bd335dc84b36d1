use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::files::list_files,
            handlers::files::upload_file
        ))
        .routes(routes!(handlers::files::storage_savings))
        .routes(routes!(handlers::files::get_file))
        .routes(routes!(handlers::files::download_file))
}
