//! Repository behaviour against a real PostgreSQL (`TEST_DATABASE_URL`, run with `--ignored`).

mod common;

use book_store::{
    BookListing, BookPatch, GroupField, ListQuery, Pagination, Sort, SortDirection, SortField,
};
use chrono::{TimeZone, Utc};
use common::{book, fill_with_books, setup};
use serde_json::json;
use std::collections::HashSet;

fn list(field: SortField, direction: SortDirection, group: Option<GroupField>, page: u32, page_size: u32) -> ListQuery {
    ListQuery {
        sort: Sort { field, direction },
        group,
        pagination: Pagination { page, page_size },
    }
}

fn books(listing: BookListing) -> Vec<book_store::Book> {
    match listing {
        BookListing::Books(rows) => rows,
        BookListing::Groups(_) => panic!("expected flat rows"),
    }
}

#[tokio::test]
#[ignore = "needs PostgreSQL at TEST_DATABASE_URL"]
async fn create_then_get_one() {
    let db = setup().await;
    let id = db
        .repo
        .create(book("book title", "Author name", "book description"))
        .await
        .unwrap();
    assert!(id > 0);

    let fetched = db.repo.get_one(id).await.unwrap().unwrap();
    assert_eq!(fetched.id, id);
    assert_eq!(fetched.title, "book title");
    assert_eq!(fetched.author.as_deref(), Some("Author name"));
    assert_eq!(fetched.description, "book description");
    assert_eq!(fetched.image, "image url");
    assert_eq!(fetched.date, Utc.with_ymd_and_hms(2017, 12, 22, 0, 0, 0).unwrap());
    db.teardown().await;
}

#[tokio::test]
#[ignore = "needs PostgreSQL at TEST_DATABASE_URL"]
async fn get_one_absent_is_none() {
    let db = setup().await;
    assert_eq!(db.repo.get_one(1).await.unwrap(), None);
    db.teardown().await;
}

#[tokio::test]
#[ignore = "needs PostgreSQL at TEST_DATABASE_URL"]
async fn create_table_is_idempotent() {
    let db = setup().await;
    db.repo.create_table().await.unwrap();
    db.teardown().await;
}

#[tokio::test]
#[ignore = "needs PostgreSQL at TEST_DATABASE_URL"]
async fn patch_without_date_keeps_date() {
    let db = setup().await;
    let id = db
        .repo
        .create(book("book title", "Author name", "book description"))
        .await
        .unwrap();

    let patch = BookPatch {
        title: Some("another title".into()),
        author: Some("Author 2name".into()),
        image: Some("another image".into()),
        ..Default::default()
    };
    assert_eq!(db.repo.update(id, patch).await.unwrap(), 1);

    let fetched = db.repo.get_one(id).await.unwrap().unwrap();
    assert_eq!(fetched.title, "another title");
    assert_eq!(fetched.author.as_deref(), Some("Author 2name"));
    assert_eq!(fetched.image, "another image");
    assert_eq!(fetched.description, "book description");
    assert_eq!(fetched.date, Utc.with_ymd_and_hms(2017, 12, 22, 0, 0, 0).unwrap());
    db.teardown().await;
}

#[tokio::test]
#[ignore = "needs PostgreSQL at TEST_DATABASE_URL"]
async fn patch_with_date_changes_only_date() {
    let db = setup().await;
    let id = db.repo.create(book("t", "a", "d")).await.unwrap();
    let new_date = Utc.with_ymd_and_hms(2020, 5, 1, 12, 30, 0).unwrap();
    let patch = BookPatch {
        date: Some(new_date),
        ..Default::default()
    };
    assert_eq!(db.repo.update(id, patch).await.unwrap(), 1);
    let fetched = db.repo.get_one(id).await.unwrap().unwrap();
    assert_eq!(fetched.date, new_date);
    assert_eq!(fetched.title, "t");
    assert_eq!(fetched.author.as_deref(), Some("a"));
    db.teardown().await;
}

#[tokio::test]
#[ignore = "needs PostgreSQL at TEST_DATABASE_URL"]
async fn same_author_name_reuses_author_row() {
    let db = setup().await;
    db.repo.create(book("one", "X", "d")).await.unwrap();
    db.repo.create(book("two", "X", "d")).await.unwrap();

    assert_eq!(db.count("SELECT COUNT(*) FROM authors").await, 1);
    assert_eq!(db.count("SELECT COUNT(DISTINCT author) FROM books").await, 1);
    db.teardown().await;
}

#[tokio::test]
#[ignore = "needs PostgreSQL at TEST_DATABASE_URL"]
async fn first_page_in_insertion_order() {
    let db = setup().await;
    let ids = fill_with_books(&db.repo, 4).await;

    let rows = books(
        db.repo
            .get_many(&list(SortField::Id, SortDirection::Ascending, None, 0, 2))
            .await
            .unwrap(),
    );
    assert_eq!(rows.iter().map(|b| b.id).collect::<Vec<_>>(), ids[..2].to_vec());

    let second = books(
        db.repo
            .get_many(&list(SortField::Id, SortDirection::Ascending, None, 1, 2))
            .await
            .unwrap(),
    );
    assert_eq!(second.iter().map(|b| b.id).collect::<Vec<_>>(), ids[2..].to_vec());
    db.teardown().await;
}

#[tokio::test]
#[ignore = "needs PostgreSQL at TEST_DATABASE_URL"]
async fn descending_returns_last_inserted_first() {
    let db = setup().await;
    let ids = fill_with_books(&db.repo, 4).await;

    let rows = books(
        db.repo
            .get_many(&list(SortField::Id, SortDirection::Descending, None, 0, 2))
            .await
            .unwrap(),
    );
    assert_eq!(rows.iter().map(|b| b.id).collect::<Vec<_>>(), vec![ids[3], ids[2]]);
    db.teardown().await;
}

#[tokio::test]
#[ignore = "needs PostgreSQL at TEST_DATABASE_URL"]
async fn sort_by_title_descending() {
    let db = setup().await;
    fill_with_books(&db.repo, 4).await;

    let rows = books(
        db.repo
            .get_many(&list(SortField::Title, SortDirection::Descending, None, 0, 2))
            .await
            .unwrap(),
    );
    assert_eq!(rows[0].title, "book title3");
    assert_eq!(rows[1].title, "book title2");
    db.teardown().await;
}

#[tokio::test]
#[ignore = "needs PostgreSQL at TEST_DATABASE_URL"]
async fn sort_by_author_uses_author_name() {
    let db = setup().await;
    let ids = fill_with_books(&db.repo, 4).await;

    let rows = books(
        db.repo
            .get_many(&list(SortField::Author, SortDirection::Ascending, None, 0, 4))
            .await
            .unwrap(),
    );
    let authors: Vec<_> = rows.iter().map(|b| b.author.clone().unwrap()).collect();
    assert_eq!(authors, vec!["Author name3", "Author name3", "Author name4", "Author name4"]);
    assert_ne!(rows.iter().map(|b| b.id).collect::<Vec<_>>(), ids);
    db.teardown().await;
}

#[tokio::test]
#[ignore = "needs PostgreSQL at TEST_DATABASE_URL"]
async fn group_by_description_counts() {
    let db = setup().await;
    fill_with_books(&db.repo, 4).await;

    let listing = db
        .repo
        .get_many(&list(
            SortField::Description,
            SortDirection::Ascending,
            Some(GroupField::Description),
            0,
            4,
        ))
        .await
        .unwrap();
    assert_eq!(
        serde_json::to_value(&listing).unwrap(),
        json!([
            { "description": "book description0", "count": 2 },
            { "description": "book description1", "count": 2 },
        ])
    );
    db.teardown().await;
}

#[tokio::test]
#[ignore = "needs PostgreSQL at TEST_DATABASE_URL"]
async fn group_with_default_sort_orders_by_group() {
    let db = setup().await;
    fill_with_books(&db.repo, 4).await;

    let query = ListQuery {
        group: Some(GroupField::Title),
        ..ListQuery::default()
    };
    let listing = db.repo.get_many(&query).await.unwrap();
    assert_eq!(
        serde_json::to_value(&listing).unwrap(),
        json!([
            { "title": "book title0", "count": 1 },
            { "title": "book title1", "count": 1 },
            { "title": "book title2", "count": 1 },
            { "title": "book title3", "count": 1 },
        ])
    );
    db.teardown().await;
}

#[tokio::test]
#[ignore = "needs PostgreSQL at TEST_DATABASE_URL"]
async fn group_by_author_counts_by_name() {
    let db = setup().await;
    fill_with_books(&db.repo, 3).await;

    let listing = db
        .repo
        .get_many(&list(
            SortField::Author,
            SortDirection::Descending,
            Some(GroupField::Author),
            0,
            10,
        ))
        .await
        .unwrap();
    assert_eq!(
        serde_json::to_value(&listing).unwrap(),
        json!([
            { "author": "Author name4", "count": 2 },
            { "author": "Author name3", "count": 1 },
        ])
    );
    db.teardown().await;
}

#[tokio::test]
#[ignore = "needs PostgreSQL at TEST_DATABASE_URL"]
async fn group_by_date_renders_timestamp() {
    let db = setup().await;
    fill_with_books(&db.repo, 2).await;

    let listing = db
        .repo
        .get_many(&list(SortField::Date, SortDirection::Ascending, Some(GroupField::Date), 0, 10))
        .await
        .unwrap();
    assert_eq!(
        serde_json::to_value(&listing).unwrap(),
        json!([{ "date": "2017-12-22T00:00:00Z", "count": 2 }])
    );
    db.teardown().await;
}

#[tokio::test]
#[ignore = "needs PostgreSQL at TEST_DATABASE_URL"]
async fn update_unknown_id_changes_nothing() {
    let db = setup().await;
    let patch = BookPatch {
        author: Some("Ghost".into()),
        ..Default::default()
    };
    assert_eq!(db.repo.update(999, patch).await.unwrap(), 0);
    assert_eq!(db.count("SELECT COUNT(*) FROM authors").await, 0);
    db.teardown().await;
}

#[tokio::test]
#[ignore = "needs PostgreSQL at TEST_DATABASE_URL"]
async fn delete_all_empties_both_tables() {
    let db = setup().await;
    let ids = fill_with_books(&db.repo, 4).await;

    db.repo.delete_all().await.unwrap();

    let listing = db.repo.get_many(&ListQuery::default()).await.unwrap();
    assert!(listing.is_empty());
    for id in ids {
        assert_eq!(db.repo.get_one(id).await.unwrap(), None);
    }
    assert_eq!(db.count("SELECT COUNT(*) FROM authors").await, 0);
    db.teardown().await;
}

#[tokio::test]
#[ignore = "needs PostgreSQL at TEST_DATABASE_URL"]
async fn deleting_referenced_author_is_restricted() {
    let db = setup().await;
    db.repo.create(book("t", "Kept", "d")).await.unwrap();

    let err = db
        .repo
        .database()
        .execute("DELETE FROM authors", &[])
        .await
        .unwrap_err();
    assert!(err.is_constraint_violation());
    db.teardown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "needs PostgreSQL at TEST_DATABASE_URL"]
async fn concurrent_creates_share_one_new_author() {
    let db = setup().await;

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..16 {
        let repo = db.repo.clone();
        tasks.spawn(async move { repo.create(book(&format!("race {}", i), "Brand New Author", "d")).await });
    }
    let mut ids = HashSet::new();
    while let Some(joined) = tasks.join_next().await {
        ids.insert(joined.unwrap().unwrap());
    }
    assert_eq!(ids.len(), 16);

    assert_eq!(
        db.count("SELECT COUNT(*) FROM authors WHERE name = 'Brand New Author'").await,
        1
    );
    assert_eq!(db.count("SELECT COUNT(DISTINCT author) FROM books").await, 1);
    db.teardown().await;
}
