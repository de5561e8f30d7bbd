use crate::db::ItemFilter;
use crate::error::CatalogError;
use crate::server::guards::MaybeSession;
use crate::server::router::CatalogState;
use axum::{Json, extract::State};
use catalog_schema::{CatalogExport, CategoryView, IndexPage, ItemView};

const LATEST_ITEMS: u32 = 10;

/// GET /
pub async fn index(
    State(state): State<CatalogState>,
    MaybeSession(session): MaybeSession,
) -> Result<Json<IndexPage>, CatalogError> {
    let categories = state.db.list_categories().await?;
    let latest = state
        .db
        .list_items(ItemFilter {
            latest: Some(LATEST_ITEMS),
            ..Default::default()
        })
        .await?;

    Ok(Json(IndexPage {
        user: session.map(|s| s.user.into()),
        categories: categories.into_iter().map(CategoryView::from).collect(),
        latest_items: latest.into_iter().map(ItemView::from).collect(),
    }))
}

/// GET /api/json
pub async fn export(State(state): State<CatalogState>) -> Result<Json<CatalogExport>, CatalogError> {
    Ok(Json(state.db.export_catalog().await?))
}
