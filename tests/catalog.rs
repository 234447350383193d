//! Catalog behavior: upload bookkeeping, paging, bulk edits, likes — plus
//! the settings cache and blog moderation rules that back the site.

mod common;

use bytes::Bytes;
use gallery_store::services::{
    blog_service::{BlogService, NewPost, UpdatePost},
    catalog_service::{BulkEdit, CatalogService, LikeOutcome, NewPhoto, PhotoQuery},
    media_store::MediaStore,
    settings_service::SettingsService,
};
use sqlx::SqlitePool;
use std::{io, sync::Arc};
use uuid::Uuid;

fn catalog(db: Arc<SqlitePool>) -> (CatalogService, std::path::PathBuf) {
    let dir = std::env::temp_dir().join(format!("catalog-test-{}", Uuid::new_v4()));
    (CatalogService::new(db, MediaStore::new(&dir)), dir)
}

fn jpeg_stream() -> impl futures::Stream<Item = io::Result<Bytes>> + Send {
    futures::stream::iter(vec![Ok(Bytes::from_static(b"not really a jpeg"))])
}

fn new_photo(title: &str) -> NewPhoto {
    NewPhoto {
        title: title.into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn upload_records_size_etag_and_pending_state() {
    let db = common::test_pool().await;
    let (service, dir) = catalog(db);
    let photo = service
        .create_photo(new_photo("Golden Hour"), "jpg", Some("image/jpeg".into()), jpeg_stream())
        .await
        .unwrap();

    assert_eq!(photo.slug, "golden-hour");
    assert_eq!(photo.size_bytes, 17);
    assert!(photo.etag.is_some());
    assert!(!photo.is_published);
    assert_eq!(
        photo.processing_status,
        gallery_store::models::photo::ProcessingStatus::Pending
    );
    // A second upload with the same title gets a suffixed slug.
    let second = service
        .create_photo(new_photo("Golden Hour"), "jpg", None, jpeg_stream())
        .await
        .unwrap();
    assert_eq!(second.slug, "golden-hour-2");
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn listing_pages_with_a_cursor() {
    let db = common::test_pool().await;
    let (service, dir) = catalog(db.clone());
    for slug in ["alpha", "bravo", "charlie"] {
        common::insert_photo(&db, slug, true).await;
    }
    common::insert_photo(&db, "delta-unpublished", false).await;

    let page = service
        .list_photos(PhotoQuery {
            published_only: true,
            max_items: 2,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.photos.len(), 2);
    assert!(page.is_truncated);
    let cursor = page.next_cursor.clone().unwrap();

    let rest = service
        .list_photos(PhotoQuery {
            published_only: true,
            max_items: 2,
            cursor: Some(cursor),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(rest.photos.len(), 1);
    assert!(!rest.is_truncated);
    assert_eq!(rest.photos[0].slug, "charlie");
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn unpublished_photos_are_invisible_to_the_public_lookup() {
    let db = common::test_pool().await;
    let (service, dir) = catalog(db.clone());
    common::insert_photo(&db, "hidden", false).await;

    assert!(service.get_photo_by_slug("hidden", true).await.is_err());
    assert!(service.get_photo_by_slug("hidden", false).await.is_ok());
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn bulk_edit_publishes_and_tags_many_photos() {
    let db = common::test_pool().await;
    let (service, dir) = catalog(db.clone());
    let a = common::insert_photo(&db, "a", false).await;
    let b = common::insert_photo(&db, "b", false).await;

    let affected = service
        .bulk_edit(
            &[a, b],
            BulkEdit {
                is_published: Some(true),
                add_tags: vec!["Iceland".into()],
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(affected, 2);

    assert!(service.get_photo(a).await.unwrap().is_published);
    let tags = service.tags_for_photo(b).await.unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].slug, "iceland");
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn likes_toggle_and_keep_the_count_consistent() {
    let db = common::test_pool().await;
    let (service, dir) = catalog(db.clone());
    let photo = common::insert_photo(&db, "liked", true).await;

    assert_eq!(
        service.toggle_like("sess-1", photo).await.unwrap(),
        LikeOutcome::Liked(1)
    );
    assert_eq!(
        service.toggle_like("sess-2", photo).await.unwrap(),
        LikeOutcome::Liked(2)
    );
    assert_eq!(
        service.toggle_like("sess-1", photo).await.unwrap(),
        LikeOutcome::Unliked(1)
    );
    assert_eq!(service.get_photo(photo).await.unwrap().like_count, 1);
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn view_counting_is_monotonic() {
    let db = common::test_pool().await;
    let (service, dir) = catalog(db.clone());
    let photo = common::insert_photo(&db, "seen", true).await;
    service.record_photo_view(photo).await.unwrap();
    service.record_photo_view(photo).await.unwrap();
    assert_eq!(service.get_photo(photo).await.unwrap().view_count, 2);
    let _ = std::fs::remove_dir_all(dir);
}

// --- Settings ---

#[tokio::test]
async fn settings_read_through_and_invalidate_on_write() {
    let db = common::test_pool().await;
    let settings = SettingsService::new(db);

    assert_eq!(settings.get("site.description").await.unwrap(), None);
    assert_eq!(
        settings.get_or("site.description", "fallback").await.unwrap(),
        "fallback"
    );

    settings.set("site.description", "Landscapes").await.unwrap();
    assert_eq!(
        settings.get("site.description").await.unwrap().as_deref(),
        Some("Landscapes")
    );

    // A write through the same service must not serve the stale cache.
    settings.set("site.description", "Portraits").await.unwrap();
    assert_eq!(
        settings.get("site.description").await.unwrap().as_deref(),
        Some("Portraits")
    );

    settings.remove("site.description").await.unwrap();
    assert_eq!(settings.get("site.description").await.unwrap(), None);

    settings.set("pricing.tax_rate_bps", "1000").await.unwrap();
    assert_eq!(settings.get_i64("pricing.tax_rate_bps", 800).await.unwrap(), 1000);
    assert_eq!(settings.get_i64("pricing.missing", 800).await.unwrap(), 800);
}

// --- Blog ---

#[tokio::test]
async fn posts_publish_with_a_stamp_and_comments_await_moderation() {
    let db = common::test_pool().await;
    let blog = BlogService::new(db);

    let draft = blog
        .create_post(NewPost {
            title: "Printing at home".into(),
            body: "Long form words.".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(!draft.is_published);
    assert!(draft.published_at.is_none());
    assert!(blog.get_published_by_slug("printing-at-home").await.is_err());

    let published = blog
        .update_post(
            draft.id,
            UpdatePost {
                is_published: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(published.published_at.is_some());
    assert!(blog.get_published_by_slug("printing-at-home").await.is_ok());

    let comment = blog
        .add_comment(published.id, "Reader", "reader@example.com", "Nice!")
        .await
        .unwrap();
    assert!(!comment.is_approved);
    assert!(blog.approved_comments(published.id).await.unwrap().is_empty());

    blog.approve_comment(comment.id).await.unwrap();
    assert_eq!(blog.approved_comments(published.id).await.unwrap().len(), 1);
}
