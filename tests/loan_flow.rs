//! End-to-end loan and wishlist flows over the in-memory backend.
//!
//! Each `Session` models one client; sessions sharing a backend see
//! each other's writes through the live feeds.

use std::sync::Arc;
use std::time::Duration;

use neon_archive::{
    backend::{identity::MemoryIdentity, memory::MemoryBackend},
    config::AppConfig,
    models::book::{Book, BookAvailability},
    AppError, Session,
};

fn book(id: &str, title: &str) -> Book {
    Book {
        id: id.to_string(),
        title: title.to_string(),
        author: "William Gibson".to_string(),
        cover: None,
        year: Some(1984),
    }
}

fn open_session(backend: &Arc<MemoryBackend>) -> Session {
    Session::new(
        Arc::clone(backend) as Arc<dyn neon_archive::backend::DocumentBackend>,
        Arc::new(MemoryIdentity::new()),
        AppConfig::default(),
    )
}

async fn sign_up(session: &Session, email: &str, name: &str) -> String {
    session
        .services
        .session
        .sign_up(email, "sprawl-trilogy", Some(name))
        .await
        .unwrap()
        .id
}

/// Spawned watchers (session reset) run asynchronously; poll until the
/// condition holds or give up.
async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..100 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within timeout");
}

#[tokio::test]
async fn test_borrow_and_return_flow() {
    let backend = Arc::new(MemoryBackend::new());
    let session = open_session(&backend);
    let services = &session.services;
    let user_id = sign_up(&session, "case@neon.example", "Case").await;

    let _active = services.loans.watch_active_loans();
    let _mine = services.loans.watch_user_loans(&user_id);

    let neuromancer = book("OL27258W", "Neuromancer");
    let loan = services.borrow_book(&neuromancer).await.unwrap();
    assert!(loan.is_active());
    assert_eq!(
        (loan.due_date.unwrap() - loan.borrowed_at).num_days(),
        14
    );

    // The memory backend pushes snapshots synchronously, so the store
    // reflects the loan as soon as borrow_book returns.
    assert_eq!(
        services.loans.get_book_availability(&neuromancer.id),
        BookAvailability::Borrowed
    );
    assert!(services
        .loans
        .is_book_borrowed_by_user(&neuromancer.id, &user_id));
    assert_eq!(services.loans.user_loans().len(), 1);

    services.return_book(&loan.id).await.unwrap();
    assert_eq!(
        services.loans.get_book_availability(&neuromancer.id),
        BookAvailability::Available
    );
    assert!(services.loans.user_loans().is_empty());
    // Returned loans stay in the history feed.
    assert_eq!(services.loans.loan_history().len(), 1);
}

#[tokio::test]
async fn test_second_user_cannot_borrow_an_active_loan() {
    let backend = Arc::new(MemoryBackend::new());
    let case = open_session(&backend);
    let molly = open_session(&backend);
    sign_up(&case, "case@neon.example", "Case").await;
    sign_up(&molly, "molly@neon.example", "Molly").await;

    let neuromancer = book("OL27258W", "Neuromancer");
    case.services.borrow_book(&neuromancer).await.unwrap();

    // Molly holds no feed, so her cache is empty; the write-time check
    // against the backing store still rejects the borrow.
    let err = molly.services.borrow_book(&neuromancer).await.unwrap_err();
    assert!(matches!(err, AppError::AlreadyBorrowed(_)));

    // Once she watches the feed, her cache converges too.
    let _active = molly.services.loans.watch_active_loans();
    assert_eq!(
        molly.services.loans.get_book_availability(&neuromancer.id),
        BookAvailability::Borrowed
    );
}

#[tokio::test]
async fn test_rapid_double_borrow_by_same_user() {
    let backend = Arc::new(MemoryBackend::new());
    let session = open_session(&backend);
    let services = &session.services;
    sign_up(&session, "case@neon.example", "Case").await;

    let neuromancer = book("OL27258W", "Neuromancer");
    services.borrow_book(&neuromancer).await.unwrap();

    let err = services.borrow_book(&neuromancer).await.unwrap_err();
    assert!(matches!(err, AppError::AlreadyBorrowedByUser(_)));

    // Exactly one loan document exists.
    let _active = services.loans.watch_active_loans();
    assert_eq!(services.loans.store().snapshot().loans.len(), 1);
}

#[tokio::test]
async fn test_concurrent_watchers_share_one_feed() {
    let backend = Arc::new(MemoryBackend::new());
    let session = open_session(&backend);
    let services = &session.services;
    sign_up(&session, "case@neon.example", "Case").await;

    let first = services.loans.watch_active_loans();
    let second = services.loans.watch_active_loans();
    assert_eq!(services.subscriptions.active_feeds(), 1);

    drop(first);
    assert_eq!(services.subscriptions.active_feeds(), 1);

    // The surviving watcher still receives updates.
    let neuromancer = book("OL27258W", "Neuromancer");
    services.borrow_book(&neuromancer).await.unwrap();
    assert_eq!(
        services.loans.get_book_availability(&neuromancer.id),
        BookAvailability::Borrowed
    );

    drop(second);
    assert_eq!(services.subscriptions.active_feeds(), 0);
}

#[tokio::test]
async fn test_return_unknown_loan() {
    let backend = Arc::new(MemoryBackend::new());
    let session = open_session(&backend);
    sign_up(&session, "case@neon.example", "Case").await;

    let err = session.services.return_book("no-such-loan").await.unwrap_err();
    assert!(matches!(err, AppError::LoanNotFound(_)));
}

#[tokio::test]
async fn test_wishlist_dedupe_and_remove() {
    let backend = Arc::new(MemoryBackend::new());
    let session = open_session(&backend);
    let services = &session.services;
    let user_id = sign_up(&session, "case@neon.example", "Case").await;

    let _wishlist = services.wishlist.watch_user_wishlist(&user_id);

    let count_zero = book("OL38501W", "Count Zero");
    services.add_to_wishlist(&count_zero).await.unwrap();
    assert!(services.wishlist.is_book_in_wishlist(&count_zero.id, &user_id));

    let err = services.add_to_wishlist(&count_zero).await.unwrap_err();
    assert!(matches!(err, AppError::AlreadyInWishlist(_)));
    assert_eq!(services.wishlist.items().len(), 1);

    services.remove_from_wishlist(&count_zero.id).await.unwrap();
    assert!(services.wishlist.items().is_empty());

    // Removing again is a no-op.
    services.remove_from_wishlist(&count_zero.id).await.unwrap();
}

#[tokio::test]
async fn test_sign_out_resets_stores_and_releases_feeds() {
    let backend = Arc::new(MemoryBackend::new());
    let session = open_session(&backend);
    let services = &session.services;
    let user_id = sign_up(&session, "case@neon.example", "Case").await;

    let _active = services.loans.watch_active_loans();
    let _wishlist = services.wishlist.watch_user_wishlist(&user_id);

    let neuromancer = book("OL27258W", "Neuromancer");
    services.borrow_book(&neuromancer).await.unwrap();
    services.add_to_wishlist(&neuromancer).await.unwrap();
    assert_eq!(services.subscriptions.active_feeds(), 2);

    services.session.sign_out().await.unwrap();

    let subscriptions = Arc::clone(&services.subscriptions);
    wait_until(move || subscriptions.active_feeds() == 0).await;
    assert!(services.loans.user_loans().is_empty());
    assert!(services.wishlist.items().is_empty());
    assert_eq!(
        services.loans.get_book_availability(&neuromancer.id),
        BookAvailability::Available
    );

    // Session-bound operations now fail.
    let err = services.borrow_book(&neuromancer).await.unwrap_err();
    assert!(matches!(err, AppError::NotAuthenticated));

    // Signing back in starts clean and re-converges through new feeds.
    sign_up(&session, "molly@neon.example", "Molly").await;
    let _active = services.loans.watch_active_loans();
    assert_eq!(
        services.loans.get_book_availability(&neuromancer.id),
        BookAvailability::Borrowed
    );
}

#[tokio::test]
async fn test_enrichment_reflects_session_state() {
    let backend = Arc::new(MemoryBackend::new());
    let case = open_session(&backend);
    let molly = open_session(&backend);
    let case_id = sign_up(&case, "case@neon.example", "Case").await;
    sign_up(&molly, "molly@neon.example", "Molly").await;

    let neuromancer = book("OL27258W", "Neuromancer");
    let count_zero = book("OL38501W", "Count Zero");

    let _active = case.services.loans.watch_active_loans();
    let _wishlist = case.services.wishlist.watch_user_wishlist(&case_id);
    case.services.borrow_book(&neuromancer).await.unwrap();
    case.services.add_to_wishlist(&count_zero).await.unwrap();

    let books = [neuromancer.clone(), count_zero.clone()];
    let enriched = case.services.enrich_books(&books);
    assert_eq!(enriched.len(), 2);
    assert_eq!(enriched[0].internal_status, BookAvailability::Borrowed);
    assert!(enriched[0].is_borrowed_by_current_user);
    assert!(!enriched[0].is_borrowable);
    assert_eq!(enriched[1].internal_status, BookAvailability::Available);
    assert!(enriched[1].is_borrowable);
    assert!(enriched[1].is_in_wishlist);

    // Molly sees the same availability but none of the ownership flags.
    let _active = molly.services.loans.watch_active_loans();
    let enriched = molly.services.enrich_books(&books);
    assert_eq!(enriched[0].internal_status, BookAvailability::Borrowed);
    assert!(!enriched[0].is_borrowed_by_current_user);
    assert!(!enriched[1].is_in_wishlist);
}
