use crate::db::models::{DbCategory, DbItem};
use crate::db::patch::{
    CategoryCreate, CategoryKey, CategoryPatch, ItemCreate, ItemFilter, ItemKey, ItemPatch,
};
use crate::error::CatalogError;
use catalog_schema::{CatalogExport, ExportCategory, ExportItem};
use chrono::Utc;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};

const CATEGORY_COLUMNS: &str = "id, name, owner_user_id, created_at";
const ITEM_COLUMNS: &str = "id, title, description, category_id, owner_user_id, created_at";

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

pub(super) async fn find_category(
    conn: &mut SqliteConnection,
    key: &CategoryKey,
) -> Result<Option<DbCategory>, CatalogError> {
    let row = match key {
        CategoryKey::Id(id) => {
            sqlx::query_as::<_, DbCategory>(&format!(
                "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?"
            ))
            .bind(*id)
            .fetch_optional(&mut *conn)
            .await?
        }
        CategoryKey::Name(name) => {
            sqlx::query_as::<_, DbCategory>(&format!(
                "SELECT {CATEGORY_COLUMNS} FROM categories WHERE name = ?"
            ))
            .bind(name.as_str())
            .fetch_optional(&mut *conn)
            .await?
        }
    };
    Ok(row)
}

pub(super) async fn get_category(
    conn: &mut SqliteConnection,
    key: &CategoryKey,
) -> Result<DbCategory, CatalogError> {
    find_category(conn, key)
        .await?
        .ok_or_else(|| CatalogError::NotFound("Category not found.".to_string()))
}

async fn ensure_category_name_free(
    conn: &mut SqliteConnection,
    name: &str,
    except_id: Option<i64>,
) -> Result<(), CatalogError> {
    match find_category(conn, &CategoryKey::Name(name.to_string())).await? {
        Some(existing) if Some(existing.id) != except_id => Err(CatalogError::Conflict(format!(
            "Category '{name}' already exists."
        ))),
        _ => Ok(()),
    }
}

pub(super) async fn create_category(
    conn: &mut SqliteConnection,
    owner_user_id: i64,
    create: CategoryCreate,
) -> Result<DbCategory, CatalogError> {
    ensure_category_name_free(conn, &create.name, None).await?;

    let row = sqlx::query_as::<_, DbCategory>(&format!(
        r#"
        INSERT INTO categories (name, owner_user_id, created_at)
        VALUES (?, ?, ?)
        RETURNING {CATEGORY_COLUMNS}
        "#
    ))
    .bind(create.name)
    .bind(owner_user_id)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;
    Ok(row)
}

async fn owned_category(
    conn: &mut SqliteConnection,
    acting_user_id: i64,
    key: &CategoryKey,
) -> Result<DbCategory, CatalogError> {
    let category = get_category(conn, key).await?;
    if category.owner_user_id != acting_user_id {
        return Err(CatalogError::NotOwner);
    }
    Ok(category)
}

pub(super) async fn update_category(
    conn: &mut SqliteConnection,
    acting_user_id: i64,
    key: &CategoryKey,
    patch: CategoryPatch,
) -> Result<DbCategory, CatalogError> {
    let mut category = owned_category(conn, acting_user_id, key).await?;

    if let Some(name) = patch.name {
        ensure_category_name_free(conn, &name, Some(category.id)).await?;
        sqlx::query("UPDATE categories SET name = ? WHERE id = ?")
            .bind(&name)
            .bind(category.id)
            .execute(&mut *conn)
            .await?;
        category.name = name;
    }
    Ok(category)
}

pub(super) async fn delete_category(
    conn: &mut SqliteConnection,
    acting_user_id: i64,
    key: &CategoryKey,
) -> Result<DbCategory, CatalogError> {
    let category = owned_category(conn, acting_user_id, key).await?;

    let item_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items WHERE category_id = ?")
        .bind(category.id)
        .fetch_one(&mut *conn)
        .await?;
    if item_count > 0 {
        return Err(CatalogError::Conflict(format!(
            "Category '{}' still has {item_count} item(s); delete them first.",
            category.name
        )));
    }

    sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(category.id)
        .execute(&mut *conn)
        .await?;
    Ok(category)
}

pub(super) async fn list_categories(
    conn: &mut SqliteConnection,
) -> Result<Vec<DbCategory>, CatalogError> {
    let rows = sqlx::query_as::<_, DbCategory>(&format!(
        "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY name"
    ))
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

async fn ensure_category_exists(
    conn: &mut SqliteConnection,
    category_id: i64,
) -> Result<(), CatalogError> {
    if find_category(conn, &CategoryKey::Id(category_id))
        .await?
        .is_none()
    {
        return Err(CatalogError::Validation(format!(
            "Category {category_id} does not exist."
        )));
    }
    Ok(())
}

/// Fetch an item, and its category, checking the caller's category context if one is given.
pub(super) async fn get_item(
    conn: &mut SqliteConnection,
    key: &ItemKey,
) -> Result<(DbCategory, DbItem), CatalogError> {
    let not_found = || CatalogError::NotFound("Item not found.".to_string());

    let item = sqlx::query_as::<_, DbItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM items WHERE id = ?"
    ))
    .bind(key.id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(not_found)?;

    if let Some(expected) = &key.category {
        let category = get_category(conn, expected).await?;
        if category.id != item.category_id {
            return Err(not_found());
        }
        return Ok((category, item));
    }

    let category = get_category(conn, &CategoryKey::Id(item.category_id)).await?;
    Ok((category, item))
}

pub(super) async fn create_item(
    conn: &mut SqliteConnection,
    owner_user_id: i64,
    create: ItemCreate,
) -> Result<DbItem, CatalogError> {
    ensure_category_exists(conn, create.category_id).await?;

    let row = sqlx::query_as::<_, DbItem>(&format!(
        r#"
        INSERT INTO items (title, description, category_id, owner_user_id, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING {ITEM_COLUMNS}
        "#
    ))
    .bind(create.title)
    .bind(create.description)
    .bind(create.category_id)
    .bind(owner_user_id)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;
    Ok(row)
}

async fn owned_item(
    conn: &mut SqliteConnection,
    acting_user_id: i64,
    key: &ItemKey,
) -> Result<DbItem, CatalogError> {
    let (_, item) = get_item(conn, key).await?;
    if item.owner_user_id != acting_user_id {
        return Err(CatalogError::NotOwner);
    }
    Ok(item)
}

pub(super) async fn update_item(
    conn: &mut SqliteConnection,
    acting_user_id: i64,
    key: &ItemKey,
    patch: ItemPatch,
) -> Result<DbItem, CatalogError> {
    let mut item = owned_item(conn, acting_user_id, key).await?;

    if let Some(category_id) = patch.category_id {
        ensure_category_exists(conn, category_id).await?;
        item.category_id = category_id;
    }
    if let Some(title) = patch.title {
        item.title = title;
    }
    if let Some(description) = patch.description {
        item.description = description;
    }

    sqlx::query("UPDATE items SET title = ?, description = ?, category_id = ? WHERE id = ?")
        .bind(&item.title)
        .bind(&item.description)
        .bind(item.category_id)
        .bind(item.id)
        .execute(&mut *conn)
        .await?;
    Ok(item)
}

pub(super) async fn delete_item(
    conn: &mut SqliteConnection,
    acting_user_id: i64,
    key: &ItemKey,
) -> Result<DbItem, CatalogError> {
    let item = owned_item(conn, acting_user_id, key).await?;
    sqlx::query("DELETE FROM items WHERE id = ?")
        .bind(item.id)
        .execute(&mut *conn)
        .await?;
    Ok(item)
}

pub(super) async fn list_items(
    conn: &mut SqliteConnection,
    filter: &ItemFilter,
) -> Result<Vec<DbItem>, CatalogError> {
    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {ITEM_COLUMNS} FROM items WHERE 1 = 1"));
    if let Some(category_id) = filter.category_id {
        qb.push(" AND category_id = ").push_bind(category_id);
    }
    if let Some(owner) = filter.owner_user_id {
        qb.push(" AND owner_user_id = ").push_bind(owner);
    }
    match filter.latest {
        Some(limit) => {
            qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
                .push_bind(i64::from(limit));
        }
        None => {
            qb.push(" ORDER BY id");
        }
    }

    let rows = qb
        .build_query_as::<DbItem>()
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

#[derive(FromRow)]
struct CategoryExportRow {
    id: i64,
    name: String,
    owner: String,
}

#[derive(FromRow)]
struct ItemExportRow {
    id: i64,
    title: String,
    description: String,
    category_id: i64,
    owner: String,
}

pub(super) async fn export(conn: &mut SqliteConnection) -> Result<CatalogExport, CatalogError> {
    let categories = sqlx::query_as::<_, CategoryExportRow>(
        r#"
        SELECT c.id, c.name, u.username AS owner
        FROM categories c
        JOIN users u ON u.id = c.owner_user_id
        ORDER BY c.id
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    let items = sqlx::query_as::<_, ItemExportRow>(
        r#"
        SELECT i.id, i.title, i.description, i.category_id, u.username AS owner
        FROM items i
        JOIN users u ON u.id = i.owner_user_id
        ORDER BY i.id
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(CatalogExport::assemble(
        categories.into_iter().map(|c| ExportCategory {
            id: c.id,
            name: c.name,
            owner: c.owner,
            items: Vec::new(),
        }),
        items.into_iter().map(|i| {
            (
                i.category_id,
                ExportItem {
                    id: i.id,
                    title: i.title,
                    description: i.description,
                    owner: i.owner,
                },
            )
        }),
    ))
}
