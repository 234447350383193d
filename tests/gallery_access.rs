//! Client gallery access rules: token resolution, expiry, passwords and
//! view accounting.

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use gallery_store::{
    errors::AppError,
    models::gallery::GalleryKind,
    services::gallery_service::{GalleryError, GalleryService, NewGallery, UpdateGallery},
};

fn client_gallery(title: &str) -> NewGallery {
    NewGallery {
        title: title.into(),
        kind: Some(GalleryKind::Client),
        ..Default::default()
    }
}

#[tokio::test]
async fn client_galleries_resolve_by_token_only() {
    let db = common::test_pool().await;
    let service = GalleryService::new(db);
    let gallery = service.create(client_gallery("Smith Wedding")).await.unwrap();
    let token = gallery.access_token.clone().expect("client gallery token");

    let resolved = service.resolve_client(&token).await.unwrap();
    assert_eq!(resolved.id, gallery.id);

    assert!(matches!(
        service.resolve_client("0000deadbeef0000deadbeef0000dead").await,
        Err(GalleryError::NotFound(_))
    ));
    // Client galleries never surface through the public slug path.
    assert!(matches!(
        service.resolve_public(&gallery.slug).await,
        Err(GalleryError::NotFound(_))
    ));
}

#[tokio::test]
async fn expired_galleries_are_terminal_regardless_of_password_state() {
    let db = common::test_pool().await;
    let service = GalleryService::new(db);
    let mut new = client_gallery("Expired Shoot");
    new.password = Some("hunter2".into());
    let gallery = service.create(new).await.unwrap();
    let token = gallery.access_token.clone().unwrap();

    service
        .update(
            gallery.id,
            UpdateGallery {
                expires_at: Some(Utc::now() - Duration::days(1)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // Expiry wins over everything: no password prompt, no content.
    let err = service.resolve_client(&token).await.unwrap_err();
    assert!(matches!(err, GalleryError::Expired));
    let app: AppError = err.into();
    assert_eq!(app.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn expiry_in_the_future_is_not_expired() {
    let db = common::test_pool().await;
    let service = GalleryService::new(db);
    let mut new = client_gallery("Active Shoot");
    new.expires_at = Some(Utc::now() + Duration::days(7));
    let gallery = service.create(new).await.unwrap();
    let token = gallery.access_token.clone().unwrap();
    assert!(service.resolve_client(&token).await.is_ok());
}

#[tokio::test]
async fn password_verification_and_error_mapping() {
    let db = common::test_pool().await;
    let service = GalleryService::new(db);
    let mut new = client_gallery("Protected");
    new.password = Some("correct horse".into());
    let gallery = service.create(new).await.unwrap();

    assert!(service.check_password(&gallery, "correct horse").is_ok());
    let err = service.check_password(&gallery, "wrong").unwrap_err();
    assert!(matches!(err, GalleryError::WrongPassword));
    let app: AppError = err.into();
    assert_eq!(app.status, StatusCode::UNAUTHORIZED);

    // The locked state maps to 401 as well, distinct from expiry's 403.
    let locked: AppError = GalleryError::PasswordRequired.into();
    assert_eq!(locked.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn galleries_without_password_accept_anything() {
    let db = common::test_pool().await;
    let service = GalleryService::new(db);
    let gallery = service.create(client_gallery("Open")).await.unwrap();
    assert!(service.check_password(&gallery, "").is_ok());
}

#[tokio::test]
async fn views_bump_counters_and_stamp_access_time() {
    let db = common::test_pool().await;
    let service = GalleryService::new(db);
    let gallery = service.create(client_gallery("Counted")).await.unwrap();
    assert_eq!(gallery.view_count, 0);
    assert!(gallery.last_accessed_at.is_none());

    service.record_view(gallery.id).await.unwrap();
    service.record_view(gallery.id).await.unwrap();

    let after = service.get(gallery.id).await.unwrap();
    assert_eq!(after.view_count, 2);
    assert!(after.last_accessed_at.is_some());
}

#[tokio::test]
async fn regenerating_the_token_invalidates_the_old_link() {
    let db = common::test_pool().await;
    let service = GalleryService::new(db);
    let gallery = service.create(client_gallery("Rotated")).await.unwrap();
    let old_token = gallery.access_token.clone().unwrap();

    let rotated = service.regenerate_token(gallery.id).await.unwrap();
    let new_token = rotated.access_token.clone().unwrap();
    assert_ne!(old_token, new_token);

    assert!(service.resolve_client(&new_token).await.is_ok());
    assert!(matches!(
        service.resolve_client(&old_token).await,
        Err(GalleryError::NotFound(_))
    ));
}

#[tokio::test]
async fn gallery_photo_membership() {
    let db = common::test_pool().await;
    let service = GalleryService::new(db.clone());
    let gallery = service.create(client_gallery("Members")).await.unwrap();
    let inside = common::insert_photo(&db, "inside", true).await;
    let outside = common::insert_photo(&db, "outside", true).await;

    service.attach_photo(gallery.id, inside, 0).await.unwrap();
    assert!(service.contains_photo(gallery.id, inside).await.unwrap());
    assert!(!service.contains_photo(gallery.id, outside).await.unwrap());

    let photos = service.photos_in(gallery.id).await.unwrap();
    assert_eq!(photos.len(), 1);
    assert_eq!(photos[0].slug, "inside");

    service.detach_photo(gallery.id, inside).await.unwrap();
    assert!(!service.contains_photo(gallery.id, inside).await.unwrap());
}
