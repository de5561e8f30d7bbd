use super::{catalog_path, form_body};
use crate::db::{CategoryKey, DbCategory, ItemFilter};
use crate::error::CatalogError;
use crate::server::guards::{MaybeSession, RequireSession};
use crate::server::router::CatalogState;
use crate::service::validation;
use axum::{
    Form, Json,
    extract::{Path, State, rejection::FormRejection},
    response::Redirect,
};
use catalog_schema::{CategoryForm, CategoryPage, CategoryView, FormView, ItemView};
use tracing::info;

/// Loads a category for an edit or delete view; only its owner may see those.
async fn owned_category(
    state: &CatalogState,
    user_id: i64,
    name: String,
) -> Result<DbCategory, CatalogError> {
    let category = state.db.get_category(CategoryKey::Name(name)).await?;
    if category.owner_user_id != user_id {
        return Err(CatalogError::NotOwner);
    }
    Ok(category)
}

/// GET /catalog/categories/new
pub async fn new_form(RequireSession(_session): RequireSession) -> Json<FormView> {
    Json(FormView::new("/catalog/categories/new", ["name"]))
}

/// POST /catalog/categories/new
pub async fn create(
    State(state): State<CatalogState>,
    RequireSession(session): RequireSession,
    payload: Result<Form<CategoryForm>, FormRejection>,
) -> Result<Redirect, CatalogError> {
    let create = validation::category_create(&form_body(payload)?)?;
    let category = state.db.create_category(session.user_id(), create).await?;
    info!(category_id = category.id, user_id = session.user_id(), "category created");
    Ok(Redirect::to(&catalog_path(&[&category.name])))
}

/// GET /catalog/{category}
pub async fn show(
    State(state): State<CatalogState>,
    MaybeSession(session): MaybeSession,
    Path(name): Path<String>,
) -> Result<Json<CategoryPage>, CatalogError> {
    let category = state.db.get_category(CategoryKey::Name(name)).await?;
    let items = state
        .db
        .list_items(ItemFilter {
            category_id: Some(category.id),
            ..Default::default()
        })
        .await?;

    let editable = session.is_some_and(|s| s.user_id() == category.owner_user_id);
    Ok(Json(CategoryPage {
        category: category.into(),
        items: items.into_iter().map(ItemView::from).collect(),
        editable,
    }))
}

/// GET /catalog/{category}/edit
pub async fn edit_form(
    State(state): State<CatalogState>,
    RequireSession(session): RequireSession,
    Path(name): Path<String>,
) -> Result<Json<FormView>, CatalogError> {
    let category = owned_category(&state, session.user_id(), name).await?;
    let action = catalog_path(&[&category.name, "edit"]);
    Ok(Json(
        FormView::new(action, ["name"]).with_current(&CategoryView::from(category)),
    ))
}

/// POST /catalog/{category}/edit
pub async fn update(
    State(state): State<CatalogState>,
    RequireSession(session): RequireSession,
    Path(name): Path<String>,
    payload: Result<Form<CategoryForm>, FormRejection>,
) -> Result<Redirect, CatalogError> {
    let patch = validation::category_patch(&form_body(payload)?)?;
    let category = state
        .db
        .update_category(session.user_id(), CategoryKey::Name(name), patch)
        .await?;
    info!(category_id = category.id, "category renamed");
    Ok(Redirect::to(&catalog_path(&[&category.name])))
}

/// GET /catalog/{category}/delete
pub async fn delete_form(
    State(state): State<CatalogState>,
    RequireSession(session): RequireSession,
    Path(name): Path<String>,
) -> Result<Json<FormView>, CatalogError> {
    let category = owned_category(&state, session.user_id(), name).await?;
    let action = catalog_path(&[&category.name, "delete"]);
    Ok(Json(
        FormView::new(action, Vec::<String>::new()).with_current(&CategoryView::from(category)),
    ))
}

/// POST /catalog/{category}/delete
///
/// Refused with a conflict while the category still holds items.
pub async fn delete(
    State(state): State<CatalogState>,
    RequireSession(session): RequireSession,
    Path(name): Path<String>,
) -> Result<Redirect, CatalogError> {
    let category = state
        .db
        .delete_category(session.user_id(), CategoryKey::Name(name))
        .await?;
    info!(category_id = category.id, "category deleted");
    Ok(Redirect::to("/"))
}
