use super::{catalog_path, form_body, parse_item_id};
use crate::db::{CategoryKey, DbCategory, DbItem, ItemKey};
use crate::error::CatalogError;
use crate::server::guards::{MaybeSession, RequireSession};
use crate::server::router::CatalogState;
use crate::service::validation;
use axum::{
    Form, Json,
    extract::{Path, State, rejection::FormRejection},
    response::Redirect,
};
use catalog_schema::{CategoryView, FormView, ItemForm, ItemPage, ItemView};
use tracing::info;

const ITEM_FIELDS: [&str; 3] = ["title", "description", "category_id"];

async fn category_choices(state: &CatalogState) -> Result<Vec<CategoryView>, CatalogError> {
    Ok(state
        .db
        .list_categories()
        .await?
        .into_iter()
        .map(CategoryView::from)
        .collect())
}

fn item_path(category: &DbCategory, item: &DbItem) -> String {
    catalog_path(&[&category.name, &item.id.to_string()])
}

/// Loads an item in its category context for an edit or delete view.
async fn owned_item(
    state: &CatalogState,
    user_id: i64,
    category: String,
    raw_id: &str,
) -> Result<(DbCategory, DbItem), CatalogError> {
    let key = ItemKey::in_category(category, parse_item_id(raw_id)?);
    let (category, item) = state.db.get_item(key).await?;
    if item.owner_user_id != user_id {
        return Err(CatalogError::NotOwner);
    }
    Ok((category, item))
}

/// GET /catalog/items/new
pub async fn new_form(
    State(state): State<CatalogState>,
    RequireSession(_session): RequireSession,
) -> Result<Json<FormView>, CatalogError> {
    let form = FormView::new("/catalog/items/new", ITEM_FIELDS)
        .with_categories(category_choices(&state).await?);
    Ok(Json(form))
}

/// POST /catalog/items/new
pub async fn create(
    State(state): State<CatalogState>,
    RequireSession(session): RequireSession,
    payload: Result<Form<ItemForm>, FormRejection>,
) -> Result<Redirect, CatalogError> {
    let create = validation::item_create(&form_body(payload)?)?;
    let item = state.db.create_item(session.user_id(), create).await?;
    let category = state
        .db
        .get_category(CategoryKey::Id(item.category_id))
        .await?;
    info!(item_id = item.id, category_id = category.id, "item created");
    Ok(Redirect::to(&item_path(&category, &item)))
}

/// GET /catalog/{category}/{item_id}
pub async fn show(
    State(state): State<CatalogState>,
    MaybeSession(session): MaybeSession,
    Path((category, raw_id)): Path<(String, String)>,
) -> Result<Json<ItemPage>, CatalogError> {
    let key = ItemKey::in_category(category, parse_item_id(&raw_id)?);
    let (category, item) = state.db.get_item(key).await?;
    let editable = session.is_some_and(|s| s.user_id() == item.owner_user_id);
    Ok(Json(ItemPage {
        category: category.into(),
        item: item.into(),
        editable,
    }))
}

/// GET /catalog/{category}/{item_id}/edit
pub async fn edit_form(
    State(state): State<CatalogState>,
    RequireSession(session): RequireSession,
    Path((category, raw_id)): Path<(String, String)>,
) -> Result<Json<FormView>, CatalogError> {
    let (category, item) = owned_item(&state, session.user_id(), category, &raw_id).await?;
    let action = catalog_path(&[&category.name, &item.id.to_string(), "edit"]);
    let form = FormView::new(action, ITEM_FIELDS)
        .with_current(&ItemView::from(item))
        .with_categories(category_choices(&state).await?);
    Ok(Json(form))
}

/// POST /catalog/{category}/{item_id}/edit
pub async fn update(
    State(state): State<CatalogState>,
    RequireSession(session): RequireSession,
    Path((category, raw_id)): Path<(String, String)>,
    payload: Result<Form<ItemForm>, FormRejection>,
) -> Result<Redirect, CatalogError> {
    let patch = validation::item_patch(&form_body(payload)?)?;
    let key = ItemKey::in_category(category, parse_item_id(&raw_id)?);
    let item = state.db.update_item(session.user_id(), key, patch).await?;
    // The item may have moved to another category.
    let category = state
        .db
        .get_category(CategoryKey::Id(item.category_id))
        .await?;
    info!(item_id = item.id, "item updated");
    Ok(Redirect::to(&item_path(&category, &item)))
}

/// GET /catalog/{category}/{item_id}/delete
pub async fn delete_form(
    State(state): State<CatalogState>,
    RequireSession(session): RequireSession,
    Path((category, raw_id)): Path<(String, String)>,
) -> Result<Json<FormView>, CatalogError> {
    let (category, item) = owned_item(&state, session.user_id(), category, &raw_id).await?;
    let action = catalog_path(&[&category.name, &item.id.to_string(), "delete"]);
    Ok(Json(
        FormView::new(action, Vec::<String>::new()).with_current(&ItemView::from(item)),
    ))
}

/// POST /catalog/{category}/{item_id}/delete
pub async fn delete(
    State(state): State<CatalogState>,
    RequireSession(session): RequireSession,
    Path((category, raw_id)): Path<(String, String)>,
) -> Result<Redirect, CatalogError> {
    let key = ItemKey::in_category(category.clone(), parse_item_id(&raw_id)?);
    let item = state.db.delete_item(session.user_id(), key).await?;
    info!(item_id = item.id, "item deleted");
    Ok(Redirect::to(&catalog_path(&[&category])))
}
