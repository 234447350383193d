//! Session selection set: toggle involution, limits, clearing and exports.

mod common;

use gallery_store::services::selection_service::{SelectionService, ToggleOutcome};

#[tokio::test]
async fn toggling_twice_returns_to_the_original_state() {
    let db = common::test_pool().await;
    let service = SelectionService::new(db.clone());
    let photo = common::insert_photo(&db, "dunes", true).await;

    let first = service.toggle("sess-1", photo, None, None).await.unwrap();
    assert_eq!(first, ToggleOutcome::Selected(1));
    let second = service.toggle("sess-1", photo, None, None).await.unwrap();
    assert_eq!(second, ToggleOutcome::Deselected(0));
    assert_eq!(service.count("sess-1").await.unwrap(), 0);
}

#[tokio::test]
async fn selections_are_scoped_to_the_session() {
    let db = common::test_pool().await;
    let service = SelectionService::new(db.clone());
    let photo = common::insert_photo(&db, "ridge", true).await;

    service.toggle("sess-a", photo, None, None).await.unwrap();
    assert_eq!(service.count("sess-a").await.unwrap(), 1);
    assert_eq!(service.count("sess-b").await.unwrap(), 0);
}

#[tokio::test]
async fn the_limit_rejects_with_a_signal_and_count_stays_put() {
    let db = common::test_pool().await;
    let service = SelectionService::new(db.clone());
    let a = common::insert_photo(&db, "a", true).await;
    let b = common::insert_photo(&db, "b", true).await;
    let c = common::insert_photo(&db, "c", true).await;

    assert_eq!(
        service.toggle("sess", a, None, Some(2)).await.unwrap(),
        ToggleOutcome::Selected(1)
    );
    assert_eq!(
        service.toggle("sess", b, None, Some(2)).await.unwrap(),
        ToggleOutcome::Selected(2)
    );
    assert_eq!(
        service.toggle("sess", c, None, Some(2)).await.unwrap(),
        ToggleOutcome::LimitReached(2)
    );
    assert_eq!(service.count("sess").await.unwrap(), 2);

    // Deselecting below the limit still works at the cap.
    assert_eq!(
        service.toggle("sess", a, None, Some(2)).await.unwrap(),
        ToggleOutcome::Deselected(1)
    );
    assert_eq!(
        service.toggle("sess", c, None, Some(2)).await.unwrap(),
        ToggleOutcome::Selected(2)
    );
}

#[tokio::test]
async fn clear_removes_only_this_sessions_rows() {
    let db = common::test_pool().await;
    let service = SelectionService::new(db.clone());
    let a = common::insert_photo(&db, "a", true).await;
    let b = common::insert_photo(&db, "b", true).await;

    service.toggle("sess-1", a, None, None).await.unwrap();
    service.toggle("sess-1", b, None, None).await.unwrap();
    service.toggle("sess-2", a, None, None).await.unwrap();

    assert_eq!(service.clear("sess-1").await.unwrap(), 2);
    assert_eq!(service.count("sess-1").await.unwrap(), 0);
    assert_eq!(service.count("sess-2").await.unwrap(), 1);
}

#[tokio::test]
async fn export_rows_join_photo_titles() {
    let db = common::test_pool().await;
    let service = SelectionService::new(db.clone());
    let photo = common::insert_photo(&db, "sunset", true).await;

    service.toggle("sess", photo, None, None).await.unwrap();
    let rows = service.export_rows("sess").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].photo_slug, "sunset");
    assert_eq!(rows[0].photo_title, "Photo sunset");
    assert!(rows[0].gallery_title.is_none());
}
