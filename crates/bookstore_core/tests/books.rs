use bookstore_core::db::open_db_in_memory;
use bookstore_core::repo::book_repo::{BookSort, SqliteBookRepository};
use bookstore_core::{
    BookDraft, BookSearch, BookService, CsvExporter, FixedClock, Logged, PageRequest,
    ServiceError, SortDirection,
};
use rusqlite::Connection;
use std::sync::Arc;

fn service(conn: &Connection, clock: Arc<FixedClock>) -> BookService<Logged<SqliteBookRepository<'_>>> {
    BookService::new(Logged::new(SqliteBookRepository::new(conn)), clock)
}

fn draft(title: &str, author: &str, isbn: &str, price: i64) -> BookDraft {
    BookDraft::new(title, author, isbn, price)
}

#[test]
fn create_and_get_book() {
    let conn = open_db_in_memory().unwrap();
    let clock = Arc::new(FixedClock::new(1_000));
    let books = service(&conn, clock);

    let created = books
        .create_book(&draft(" Clean Code ", "Robert C. Martin", "978-0-13-235088-4", 3300))
        .unwrap();
    assert_eq!(created.title, "Clean Code");
    assert_eq!(created.isbn, "9780132350884");
    assert_eq!(created.created_at, 1_000);
    assert!(created.available);

    assert_eq!(books.get_book(created.id).unwrap(), created);
    assert_eq!(books.get_book_by_isbn("9780132350884").unwrap().id, created.id);
    assert!(matches!(
        books.get_book(999),
        Err(ServiceError::NotFound { entity: "Book", .. })
    ));
}

#[test]
fn duplicate_isbn_is_rejected_even_after_soft_delete() {
    let conn = open_db_in_memory().unwrap();
    let books = service(&conn, Arc::new(FixedClock::new(0)));

    let first = books
        .create_book(&draft("Dune", "Frank Herbert", "9780441013593", 1999))
        .unwrap();
    books.delete_book(first.id).unwrap();

    let err = books
        .create_book(&draft("Dune Messiah", "Frank Herbert", "978-0441013593", 1799))
        .unwrap_err();
    assert_eq!(err.code(), "DUPLICATE_ISBN");
}

#[test]
fn invalid_draft_reports_field_violations() {
    let conn = open_db_in_memory().unwrap();
    let books = service(&conn, Arc::new(FixedClock::new(0)));

    match books.create_book(&draft("", "Someone", "123", -1)).unwrap_err() {
        ServiceError::Validation(err) => {
            let fields: Vec<_> = err.violations().iter().map(|v| v.field).collect();
            assert_eq!(fields, vec!["title", "isbn", "price"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn soft_delete_hides_book_and_restore_brings_it_back() {
    let conn = open_db_in_memory().unwrap();
    let clock = Arc::new(FixedClock::new(10));
    let books = service(&conn, Arc::clone(&clock));

    let book = books
        .create_book(&draft("Emma", "Jane Austen", "9780141439587", 850))
        .unwrap();
    clock.set(20);
    books.delete_book(book.id).unwrap();

    assert!(matches!(
        books.get_book(book.id),
        Err(ServiceError::NotFound { .. })
    ));
    assert_eq!(
        books
            .list_books(PageRequest::new(None, None, 10), BookSort::default(), SortDirection::Desc)
            .unwrap()
            .total_elements,
        0
    );
    assert_eq!(books.delete_book(book.id).unwrap_err().code(), "DELETED_BOOK_ACCESS");
    assert_eq!(
        books
            .update_book(book.id, &draft("Emma", "Jane Austen", "9780141439587", 900))
            .unwrap_err()
            .code(),
        "DELETED_BOOK_ACCESS"
    );

    let stats = books.statistics().unwrap();
    assert_eq!(stats.total_books, 1);
    assert_eq!(stats.active_books, 0);
    assert_eq!(stats.deleted_books, 1);

    clock.set(30);
    let restored = books.restore_book(book.id).unwrap();
    assert!(restored.deleted_at.is_none());
    assert_eq!(restored.updated_at, Some(30));
    assert_eq!(books.restore_book(book.id).unwrap_err().code(), "INVALID_BOOK_STATE");
}

#[test]
fn update_checks_isbn_uniqueness_against_other_books() {
    let conn = open_db_in_memory().unwrap();
    let books = service(&conn, Arc::new(FixedClock::new(0)));

    let dune = books
        .create_book(&draft("Dune", "Frank Herbert", "9780441013593", 1999))
        .unwrap();
    books
        .create_book(&draft("Emma", "Jane Austen", "9780141439587", 850))
        .unwrap();

    let renamed = books
        .update_book(dune.id, &draft("Dune (Deluxe)", "Frank Herbert", "9780441013593", 2999))
        .unwrap();
    assert_eq!(renamed.title, "Dune (Deluxe)");
    assert_eq!(renamed.price, 2999);

    let err = books
        .update_book(dune.id, &draft("Dune", "Frank Herbert", "9780141439587", 1999))
        .unwrap_err();
    assert_eq!(err.code(), "DUPLICATE_ISBN");
}

#[test]
fn text_and_price_searches_cover_active_books_only() {
    let conn = open_db_in_memory().unwrap();
    let books = service(&conn, Arc::new(FixedClock::new(0)));

    books
        .create_book(&draft("Spring in Action", "Craig Walls", "9781617294945", 4500))
        .unwrap();
    books
        .create_book(&draft("Rust in Action", "Tim McNamara", "9781617294556", 3900))
        .unwrap();
    let gone = books
        .create_book(&draft("Spring Recipes", "Gary Mak", "9781430224990", 2500))
        .unwrap();
    books.delete_book(gone.id).unwrap();

    let titles: Vec<_> = books
        .search_by_title("spring")
        .unwrap()
        .into_iter()
        .map(|book| book.title)
        .collect();
    assert_eq!(titles, vec!["Spring in Action"]);

    assert_eq!(books.search_by_author("walls").unwrap().len(), 1);
    assert_eq!(books.search_by_keyword("mcnamara").unwrap().len(), 1);
    assert!(books.search_by_title("   ").unwrap().is_empty());
    assert!(books.search_by_keyword("100%").unwrap().is_empty());

    let cheap = books.search_by_price_range(None, Some(4000)).unwrap();
    assert_eq!(cheap.len(), 1);
    assert_eq!(cheap[0].title, "Rust in Action");
    assert_eq!(books.search_by_price_range(None, None).unwrap().len(), 2);
    assert_eq!(
        books.search_by_price_range(Some(5000), Some(100)).unwrap_err().code(),
        "INVALID_PRICE_RANGE"
    );
    assert_eq!(
        books.search_by_price_range(Some(-1), None).unwrap_err().code(),
        "VALIDATION_FAILED"
    );
}

#[test]
fn filtered_search_pages_and_sorts() {
    let conn = open_db_in_memory().unwrap();
    let books = service(&conn, Arc::new(FixedClock::new(0)));

    for (idx, isbn) in ["9780000000001", "9780000000002", "9780000000003"]
        .iter()
        .enumerate()
    {
        books
            .create_book(&draft(
                &format!("Volume {}", idx + 1),
                "Series Author",
                isbn,
                1000 * (idx as i64 + 1),
            ))
            .unwrap();
    }

    let search = BookSearch {
        author: Some("series".to_string()),
        min_price: Some(1500),
        ..BookSearch::default()
    };
    let page = books
        .search_books(
            &search,
            PageRequest::new(Some(0), Some(1), 10),
            BookSort::Price,
            SortDirection::Desc,
        )
        .unwrap();
    assert_eq!(page.total_elements, 2);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.content.len(), 1);
    assert_eq!(page.content[0].title, "Volume 3");
}

#[test]
fn availability_updates_and_lookup() {
    let conn = open_db_in_memory().unwrap();
    let books = service(&conn, Arc::new(FixedClock::new(0)));

    let book = books
        .create_book(&draft("Emma", "Jane Austen", "9780141439587", 850))
        .unwrap();
    let updated = books.update_availability(book.id, false).unwrap();
    assert!(!updated.available);

    assert_eq!(books.books_by_availability(false).unwrap().len(), 1);
    assert!(books.books_by_availability(true).unwrap().is_empty());
    assert!(books.isbn_exists("978-0141439587").unwrap());
    assert!(!books.isbn_exists("9780000000000").unwrap());
}

#[test]
fn export_and_import_round_through_service() {
    let conn = open_db_in_memory().unwrap();
    let books = service(&conn, Arc::new(FixedClock::new(0)));

    let created = books
        .import_feed(
            "title\tauthor\tisbn\tprice\n\
             Dune\tFrank Herbert\t9780441013593\t1999\n\
             Emma\tJane Austen\t9780141439587\t850\n",
        )
        .unwrap();
    assert_eq!(created.len(), 2);

    let csv = books.export_books(&CsvExporter).unwrap();
    let lines: Vec<_> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].contains("Dune"));
    assert!(lines[2].contains("Emma"));

    let err = books
        .import_feed("Dune\tFrank Herbert\t9780441013593\t1999\n")
        .unwrap_err();
    assert_eq!(err.code(), "DUPLICATE_ISBN");
}
