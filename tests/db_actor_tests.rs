use catalog::CatalogError;
use catalog::db::{
    CategoryCreate, CategoryKey, CategoryPatch, ItemCreate, ItemFilter, ItemKey, ItemPatch,
    OauthUserUpsert, SessionCreate, UserCreate,
};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::SystemTime;

async fn spawn_fresh_db(tag: &str) -> catalog::db::DbActorHandle {
    let tmp_dir = std::env::temp_dir();
    let mut hasher = DefaultHasher::new();
    SystemTime::now().hash(&mut hasher);
    tag.hash(&mut hasher);
    let db_path = tmp_dir.join(format!("test_catalog_db_{tag}_{}.sqlite", hasher.finish()));
    let database_url = format!("sqlite:{}", db_path.to_str().expect("utf-8 temp path"));
    catalog::db::spawn(&database_url)
        .await
        .expect("spawn db actor")
}

fn user(username: &str) -> UserCreate {
    UserCreate {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password_hash: "$argon2id$placeholder".to_string(),
    }
}

fn session(id: &str, user_id: i64) -> SessionCreate {
    SessionCreate {
        id: id.to_string(),
        user_id,
        provider: None,
        provider_subject: None,
        provider_access_token: None,
    }
}

#[tokio::test]
async fn test_user_and_session_baseline() {
    let db = spawn_fresh_db("users").await;

    let alice = db.create_user(user("alice")).await.unwrap();
    assert!(alice.id > 0);
    assert_eq!(
        db.find_user_by_username("alice".to_string()).await.unwrap(),
        Some(alice.clone())
    );
    assert_eq!(db.get_user(alice.id).await.unwrap(), Some(alice.clone()));

    let mut dup_email = user("alice2");
    dup_email.email = alice.email.clone();
    let err = db.create_user(dup_email).await.unwrap_err();
    assert!(matches!(err, CatalogError::Conflict(ref m) if m == "Current email taken."));

    db.create_session(session("s-1", alice.id)).await.unwrap();
    let (row, owner) = db
        .touch_session("s-1".to_string(), chrono::Duration::days(7))
        .await
        .unwrap()
        .expect("live session");
    assert_eq!(row.user_id, alice.id);
    assert_eq!(owner.username, "alice");

    // Any positive idle time exceeds a negative timeout: the session is expired and removed.
    let expired = db
        .touch_session("s-1".to_string(), chrono::Duration::seconds(-1))
        .await
        .unwrap();
    assert!(expired.is_none());
    assert!(
        db.touch_session("s-1".to_string(), chrono::Duration::days(7))
            .await
            .unwrap()
            .is_none()
    );

    db.create_session(session("s-2", alice.id)).await.unwrap();
    db.create_session(session("s-3", alice.id)).await.unwrap();
    assert_eq!(
        db.purge_idle_sessions(chrono::Duration::seconds(-1))
            .await
            .unwrap(),
        2
    );
    assert!(db.delete_session("s-2".to_string()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_oauth_upsert_links_or_creates() {
    let db = spawn_fresh_db("oauth-upsert").await;
    let alice = db.create_user(user("alice")).await.unwrap();

    let linked = db
        .upsert_oauth_user(OauthUserUpsert {
            email: alice.email.clone(),
            name: Some("Alice Liddell".to_string()),
            link_existing_accounts: true,
        })
        .await
        .unwrap();
    assert_eq!(linked.id, alice.id);

    let err = db
        .upsert_oauth_user(OauthUserUpsert {
            email: alice.email.clone(),
            name: None,
            link_existing_accounts: false,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Conflict(_)));

    // New accounts take a unique username derived from the display name.
    db.create_user(user("carol")).await.unwrap();
    let created = db
        .upsert_oauth_user(OauthUserUpsert {
            email: "carol@gmail.example".to_string(),
            name: Some("carol".to_string()),
            link_existing_accounts: true,
        })
        .await
        .unwrap();
    assert_eq!(created.username, "carol-2");
    assert!(created.password_hash.is_none());
}

#[tokio::test]
async fn test_catalog_baseline() {
    let db = spawn_fresh_db("catalog").await;
    let alice = db.create_user(user("alice")).await.unwrap();
    let bob = db.create_user(user("bob")).await.unwrap();

    let books = db
        .create_category(
            alice.id,
            CategoryCreate {
                name: "Books".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(books.owner_user_id, alice.id);
    assert_eq!(
        db.get_category(CategoryKey::Name("Books".to_string()))
            .await
            .unwrap(),
        books
    );

    let err = db
        .update_category(
            bob.id,
            CategoryKey::Id(books.id),
            CategoryPatch {
                name: Some("Mine".to_string()),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::NotOwner));

    let first = db
        .create_item(
            alice.id,
            ItemCreate {
                title: "Dune".to_string(),
                description: String::new(),
                category_id: books.id,
            },
        )
        .await
        .unwrap();
    let second = db
        .create_item(
            bob.id,
            ItemCreate {
                title: "Emma".to_string(),
                description: String::new(),
                category_id: books.id,
            },
        )
        .await
        .unwrap();

    let latest = db
        .list_items(ItemFilter {
            latest: Some(1),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(latest, vec![second.clone()]);

    let bobs = db
        .list_items(ItemFilter {
            owner_user_id: Some(bob.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(bobs, vec![second.clone()]);

    let err = db
        .update_item(
            alice.id,
            ItemKey::id(second.id),
            ItemPatch {
                title: Some("Persuasion".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::NotOwner));

    let err = db
        .delete_category(alice.id, CategoryKey::Id(books.id))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Conflict(_)));

    let export = db.export_catalog().await.unwrap();
    assert_eq!(export.categories.len(), 1);
    let titles: Vec<&str> = export.categories[0]
        .items
        .iter()
        .map(|i| i.title.as_str())
        .collect();
    assert_eq!(titles, ["Dune", "Emma"]);
    assert_eq!(export.categories[0].items[1].owner, "bob");

    db.delete_item(alice.id, ItemKey::id(first.id)).await.unwrap();
    db.delete_item(bob.id, ItemKey::id(second.id)).await.unwrap();
    db.delete_category(alice.id, CategoryKey::Id(books.id))
        .await
        .unwrap();
    assert!(db.list_categories().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_purge_with_unbounded_timeout_keeps_actor_alive() {
    let db = spawn_fresh_db("purge-max").await;
    let alice = db.create_user(user("alice")).await.unwrap();
    db.create_session(session("s-live", alice.id)).await.unwrap();

    assert_eq!(
        db.purge_idle_sessions(chrono::Duration::MAX).await.unwrap(),
        0
    );

    // The actor still answers and the session survived.
    assert!(
        db.touch_session("s-live".to_string(), chrono::Duration::MAX)
            .await
            .unwrap()
            .is_some()
    );
    let bob = db.create_user(user("bob")).await.unwrap();
    assert!(bob.id > alice.id);
}
