// End-to-end lookups against a local bookstore (tests/support).

mod support;

use std::sync::Arc;
use std::time::{Duration, Instant};

use kyobo_lookup::{Identifiers, IdentifierCache, Kyobobook, LookupRequest, MemoryCache};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use support::{default_prefs, detail_page, search_page, Reply, Store};

const ISBN: &str = "9788936470111";
const TITLE: &str = "나의 문화유산답사기 1";
const AUTHOR: &str = "유홍준";

// Search, product page and cover for the one book this store sells.
fn bookstore(url: &str, base: &str) -> Reply {
    if url.starts_with("/web/search") {
        return Reply::html(search_page(&[(TITLE, ISBN, AUTHOR)]));
    }
    if url.starts_with("/product/detailView") && url.contains(ISBN) {
        return Reply::html(detail_page(base, TITLE, AUTHOR, ISBN));
    }
    if url.starts_with("/images/") {
        return Reply::image(4096);
    }
    Reply::not_found()
}

fn source(store: &Store, cache: Arc<MemoryCache>) -> Kyobobook {
    Kyobobook::new(store.settings(default_prefs()), cache, Duration::from_secs(5)).unwrap()
}

fn by_isbn(isbn: &str) -> LookupRequest {
    LookupRequest {
        identifiers: Identifiers {
            isbn: Some(isbn.to_string()),
            kyobobook: None,
        },
        ..LookupRequest::default()
    }
}

#[tokio::test]
async fn test_isbn_lookup_end_to_end() {
    let store = Store::spawn(bookstore);
    let cache = Arc::new(MemoryCache::new());
    let kyobo = source(&store, cache.clone());

    let results = kyobo.identify_all(&by_isbn(ISBN), &CancellationToken::new()).await;

    assert_eq!(results.len(), 1);
    let mi = &results[0];
    assert!(mi.title.contains(TITLE));
    assert_eq!(mi.authors, vec![AUTHOR]);
    assert_eq!(mi.isbn.as_deref(), Some(ISBN));
    assert_eq!(mi.identifiers.kyobobook.as_deref(), Some(ISBN));
    assert_eq!(mi.publisher.as_deref(), Some("창비"));
    assert_eq!(mi.rating, Some(5));
    assert_eq!(mi.language.as_deref(), Some("kor"));
    assert!(mi.has_cover);

    assert_eq!(store.hits(&format!("vPstrKeyWord={}", ISBN)), 1);
    assert_eq!(store.hits("/product/detailView"), 1);

    assert_eq!(cache.cached_isbn_to_identifier(ISBN).as_deref(), Some(ISBN));
    assert_eq!(cache.cached_identifier_to_cover_url(ISBN), mi.cover_url);
}

#[tokio::test]
async fn test_keyword_search_filters_rows() {
    let store = Store::spawn(|url, base| {
        if url.starts_with("/web/search") {
            return Reply::html(search_page(&[
                ("모비 딕", "9788937462788", "허먼 멜빌"),
                (TITLE, ISBN, AUTHOR),
            ]));
        }
        bookstore(url, base)
    });
    let kyobo = source(&store, Arc::new(MemoryCache::new()));

    let request = LookupRequest {
        title: Some("문화유산답사기".into()),
        authors: vec![AUTHOR.into()],
        ..LookupRequest::default()
    };
    let results = kyobo.identify_all(&request, &CancellationToken::new()).await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].authors, vec![AUTHOR]);
    assert_eq!(store.hits("9788937462788"), 0);
    assert_eq!(store.hits(&format!("barcode={}", ISBN)), 1);
}

#[tokio::test]
async fn test_known_id_goes_straight_to_product_page() {
    let store = Store::spawn(bookstore);
    let kyobo = source(&store, Arc::new(MemoryCache::new()));

    let request = LookupRequest {
        identifiers: Identifiers {
            isbn: None,
            kyobobook: Some(ISBN.into()),
        },
        ..LookupRequest::default()
    };
    let (tx, mut rx) = mpsc::unbounded_channel();
    let launched = kyobo.identify(&request, &tx, &CancellationToken::new()).await;

    assert_eq!(launched, 1);
    assert_eq!(rx.try_recv().unwrap().identifiers.kyobobook.as_deref(), Some(ISBN));
    assert_eq!(store.hits("/web/search"), 0);
}

#[tokio::test]
async fn test_retry_without_identifiers() {
    let store = Store::spawn(|url, base| {
        if url.starts_with("/web/search") && url.contains(ISBN) {
            return Reply::html(search_page(&[]));
        }
        bookstore(url, base)
    });
    let kyobo = source(&store, Arc::new(MemoryCache::new()));

    let request = LookupRequest {
        title: Some("문화유산답사기".into()),
        authors: vec![AUTHOR.into()],
        ..by_isbn(ISBN)
    };
    let results = kyobo.identify_all(&request, &CancellationToken::new()).await;

    assert_eq!(results.len(), 1);
    assert_eq!(store.hits("/web/search"), 2);
}

#[tokio::test]
async fn test_no_retry_without_authors() {
    let store = Store::spawn(|url, base| {
        if url.starts_with("/web/search") && url.contains(ISBN) {
            return Reply::html(search_page(&[]));
        }
        bookstore(url, base)
    });
    let kyobo = source(&store, Arc::new(MemoryCache::new()));

    let request = LookupRequest {
        title: Some("문화유산답사기".into()),
        ..by_isbn(ISBN)
    };
    let results = kyobo.identify_all(&request, &CancellationToken::new()).await;

    assert!(results.is_empty());
    assert_eq!(store.hits("/web/search"), 1);
    assert_eq!(store.hits("/product/detailView"), 0);
}

#[tokio::test]
async fn test_euc_kr_product_page() {
    let store = Store::spawn(|url, base| {
        if url.starts_with("/product/detailView") {
            return Reply::euc_kr(&detail_page(base, TITLE, AUTHOR, ISBN));
        }
        bookstore(url, base)
    });
    let kyobo = source(&store, Arc::new(MemoryCache::new()));

    let results = kyobo.identify_all(&by_isbn(ISBN), &CancellationToken::new()).await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].title, TITLE);
    assert_eq!(results[0].authors, vec![AUTHOR]);
    assert_eq!(results[0].publisher.as_deref(), Some("창비"));
    assert_eq!(results[0].language.as_deref(), Some("kor"));
}

#[tokio::test]
async fn test_cover_falls_back_to_page_image() {
    let store = Store::spawn(|url, base| {
        if url.starts_with("/product/detailView") {
            let image_box = format!(
                r#"<p class="book_img_box"><img src="/images/book/large/{ISBN}.jpg"/></p>
<div class="author">"#
            );
            let html = detail_page(base, TITLE, AUTHOR, ISBN).replacen(r#"<div class="author">"#, &image_box, 1);
            return Reply::html(html);
        }
        if url.starts_with("/images/book/xlarge/") {
            return Reply::image(200);
        }
        bookstore(url, base)
    });
    let kyobo = source(&store, Arc::new(MemoryCache::new()));

    let results = kyobo.identify_all(&by_isbn(ISBN), &CancellationToken::new()).await;

    assert_eq!(results.len(), 1);
    assert!(results[0].has_cover);
    let cover = results[0].cover_url.as_deref().unwrap();
    assert!(cover.ends_with(&format!("/images/book/large/{}.jpg", ISBN)));
    assert!(store.hits("/images/book/xlarge/") >= 1);
}

#[tokio::test]
async fn test_page_without_title_yields_nothing() {
    let store = Store::spawn(|url, base| {
        if url.starts_with("/product/detailView") {
            let html = detail_page(base, TITLE, AUTHOR, ISBN).replace(r#"<h1 class="title">"#, "<h1>");
            return Reply::html(html);
        }
        bookstore(url, base)
    });
    let kyobo = source(&store, Arc::new(MemoryCache::new()));

    let results = kyobo.identify_all(&by_isbn(ISBN), &CancellationToken::new()).await;

    assert!(results.is_empty());
    assert_eq!(store.hits("/product/detailView"), 1);
}

#[tokio::test]
async fn test_small_cover_is_not_kept() {
    let store = Store::spawn(|url, base| {
        if url.starts_with("/images/") {
            return Reply::image(200);
        }
        bookstore(url, base)
    });
    let kyobo = source(&store, Arc::new(MemoryCache::new()));

    let results = kyobo.identify_all(&by_isbn(ISBN), &CancellationToken::new()).await;

    assert_eq!(results.len(), 1);
    assert!(!results[0].has_cover);
    assert_eq!(results[0].cover_url, None);
}

#[tokio::test]
async fn test_cancellation_stops_waiting() {
    let store = Store::spawn(|url, base| {
        let reply = bookstore(url, base);
        if url.starts_with("/product/detailView") {
            return reply.delayed(Duration::from_secs(4));
        }
        reply
    });
    let kyobo = source(&store, Arc::new(MemoryCache::new()));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let results = kyobo.identify_all(&by_isbn(ISBN), &cancel).await;

    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_download_cover() {
    let store = Store::spawn(bookstore);
    let cache = Arc::new(MemoryCache::new());
    let kyobo = source(&store, cache.clone());

    let (tx, mut rx) = mpsc::unbounded_channel();
    kyobo.download_cover(&by_isbn(ISBN), &tx, &CancellationToken::new()).await;
    assert_eq!(rx.try_recv().unwrap().len(), 4096);
    assert_eq!(store.hits("/product/detailView"), 1);

    // The second download uses the cached cover URL and skips the lookup.
    kyobo.download_cover(&by_isbn(ISBN), &tx, &CancellationToken::new()).await;
    assert_eq!(rx.try_recv().unwrap().len(), 4096);
    assert_eq!(store.hits("/product/detailView"), 1);
    assert_eq!(store.hits("/web/search"), 1);
}

#[tokio::test]
async fn test_unreachable_store_yields_nothing() {
    let store = Store::spawn(|_, _| Reply::not_found());
    let kyobo = source(&store, Arc::new(MemoryCache::new()));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let launched = kyobo.identify(&by_isbn(ISBN), &tx, &CancellationToken::new()).await;

    assert_eq!(launched, 0);
    assert!(rx.try_recv().is_err());
}
