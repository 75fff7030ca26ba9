//! Database tests

use super::*;
use tempfile::TempDir;

/// Helper to create a test database
async fn create_test_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::connect_path(&db_path).await.unwrap();
    (db, temp_dir)
}

fn new_post(title: &str, content: &str) -> NewPost {
    NewPost {
        title: title.to_string(),
        content: content.to_string(),
        author_email: "author@example.com".to_string(),
    }
}

#[tokio::test]
async fn test_database_connection() {
    let (db, _temp_dir) = create_test_db().await;
    db.ping().await.unwrap();
}

#[tokio::test]
async fn test_connect_creates_missing_parent_directory() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("data").join("postboard.db");
    let config = crate::config::DatabaseConfig {
        url: format!("sqlite://{}?mode=rwc", db_path.display()),
        max_connections: 2,
        min_connections: 1,
        idle_timeout_secs: 60,
        max_lifetime_secs: 60,
    };

    let db = Database::connect(&config).await.unwrap();
    db.ping().await.unwrap();
    assert!(db_path.exists());
}

#[tokio::test]
async fn test_writes_are_visible_to_the_next_query() {
    let (db, _temp_dir) = create_test_db().await;

    for i in 0..200 {
        let post = db.create(new_post("Loop", &format!("post {i}"))).await.unwrap();
        let fetched = db.get_by_id(post.id).await.unwrap();
        assert_eq!(fetched.id, post.id);

        let mut edited = fetched.clone();
        edited.content = format!("edited {i}");
        db.edit(&edited).await.unwrap();
        assert_eq!(db.get_by_id(post.id).await.unwrap().content, edited.content);
    }

    for i in 0..50 {
        let email = format!("user{i}@example.com");
        let user = db.create_user("Loop", &email).await.unwrap();
        assert_eq!(db.get_user_by_email(&email).await.unwrap().id, user.id);
    }
}

#[tokio::test]
async fn test_post_create_assigns_id_and_timestamp() {
    let (db, _temp_dir) = create_test_db().await;

    let first = db.create(new_post("First", "Hello")).await.unwrap();
    let second = db.create(new_post("Second", "World")).await.unwrap();

    assert!(first.id > 0);
    assert!(second.id > first.id);
    assert_eq!(first.title, "First");
    assert_eq!(first.author_email, "author@example.com");
    assert_eq!(first.photo_url, "");
    assert!(first.created_at <= second.created_at);
}

#[tokio::test]
async fn test_post_crud() {
    let (db, _temp_dir) = create_test_db().await;

    let post = db.create(new_post("Title", "Body")).await.unwrap();

    // Get by ID
    let retrieved = db.get_by_id(post.id).await.unwrap();
    assert_eq!(retrieved, post);

    // Edit content and photo
    let mut edited = retrieved.clone();
    edited.content = "Updated body".to_string();
    edited.photo_url = "/public/photo.png".to_string();
    let saved = db.edit(&edited).await.unwrap();
    assert_eq!(saved.content, "Updated body");
    assert_eq!(saved.photo_url, "/public/photo.png");
    assert_eq!(saved.title, "Title");
    assert_eq!(saved.created_at, post.created_at);

    // Delete
    db.delete(post.id).await.unwrap();
    assert!(matches!(
        db.get_by_id(post.id).await,
        Err(StoreError::NotFound)
    ));
}

#[tokio::test]
async fn test_post_list_is_ordered_and_keeps_photo() {
    let (db, _temp_dir) = create_test_db().await;

    let first = db.create(new_post("A", "a")).await.unwrap();
    let mut second = db.create(new_post("B", "b")).await.unwrap();
    second.photo_url = "/public/b.jpg".to_string();
    db.edit(&second).await.unwrap();

    let posts = db.list().await.unwrap();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].id, first.id);
    assert_eq!(posts[1].photo_url, "/public/b.jpg");
}

#[tokio::test]
async fn test_missing_post_maps_to_not_found() {
    let (db, _temp_dir) = create_test_db().await;

    assert!(matches!(db.get_by_id(42).await, Err(StoreError::NotFound)));
    assert!(matches!(db.delete(42).await, Err(StoreError::NotFound)));

    let ghost = Post {
        id: 42,
        title: "ghost".to_string(),
        content: "ghost".to_string(),
        author_email: String::new(),
        created_at: chrono::Utc::now(),
        photo_url: String::new(),
    };
    assert!(matches!(db.edit(&ghost).await, Err(StoreError::NotFound)));
}

#[tokio::test]
async fn test_delete_twice_reports_not_found() {
    let (db, _temp_dir) = create_test_db().await;

    let post = db.create(new_post("Once", "only")).await.unwrap();
    db.delete(post.id).await.unwrap();
    assert!(matches!(db.delete(post.id).await, Err(StoreError::NotFound)));
}

#[tokio::test]
async fn test_user_create_and_lookup() {
    let (db, _temp_dir) = create_test_db().await;

    let user = db.create_user("Ada", "ada@example.com").await.unwrap();
    assert!(user.id > 0);
    assert_eq!(user.username, "Ada");

    let by_id = db.get_user_by_id(user.id).await.unwrap();
    assert_eq!(by_id, user);

    let by_email = db.get_user_by_email("ada@example.com").await.unwrap();
    assert_eq!(by_email.id, user.id);

    assert!(matches!(
        db.get_user_by_email("nobody@example.com").await,
        Err(StoreError::NotFound)
    ));
}

#[tokio::test]
async fn test_duplicate_email_is_rejected_without_new_row() {
    let (db, _temp_dir) = create_test_db().await;

    let original = db.create_user("Ada", "ada@example.com").await.unwrap();
    let duplicate = db.create_user("Ada Again", "ada@example.com").await;
    assert!(matches!(duplicate, Err(StoreError::DuplicateUser)));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(count, 1);

    let stored = db.get_user_by_email("ada@example.com").await.unwrap();
    assert_eq!(stored.username, original.username);
}
