use catalog_dal::{
    author::{AuthorRepository, CreateAuthor},
    book::{BookRepository, CreateBook},
    book_instance::{BookInstanceRepository, CreateBookInstance, InstanceStatus},
    genre::{CreateGenre, GenreRepository},
};
use catalog_dal::Resource as _;
use futures::TryStreamExt as _;
use sqlx::Executor as _;
use time::macros::date;

const TEST_DATA: &str = r#"
INSERT INTO author (id, first_name, family_name, date_of_birth, date_of_death)
VALUES (1, 'Jane', 'Austen', '1775-12-16', '1817-07-18');
INSERT INTO author (id, first_name, family_name, date_of_birth, date_of_death)
VALUES (2, 'Isaac', 'Asimov', '1920-01-02', NULL);

INSERT INTO genre (id, name) VALUES (1, 'Romance');
INSERT INTO genre (id, name) VALUES (2, 'Science Fiction');
INSERT INTO genre (id, name) VALUES (3, 'Classic');

INSERT INTO book (id, title, author_id, summary, isbn)
VALUES (1, 'Pride and Prejudice', 1, 'Elizabeth and Mr Darcy', '9780141439518');
INSERT INTO book (id, title, author_id, summary, isbn)
VALUES (2, 'Foundation', 2, 'Psychohistory', '9780553293357');

INSERT INTO book_genre (book_id, genre_id) VALUES (1, 1);
INSERT INTO book_genre (book_id, genre_id) VALUES (1, 3);
INSERT INTO book_genre (book_id, genre_id) VALUES (2, 2);

INSERT INTO book_instance (id, book_id, imprint, status, due_back)
VALUES (1, 1, 'Penguin 2003', 'Available', NULL);
INSERT INTO book_instance (id, book_id, imprint, status, due_back)
VALUES (2, 1, 'Penguin 2003', 'Loaned', '2026-11-01');
"#;

async fn init_db() -> catalog_dal::Pool {
    let pool = catalog_dal::new_memory_pool().await.unwrap();
    pool.execute_many(TEST_DATA)
        .try_collect::<Vec<_>>()
        .await
        .unwrap();
    pool
}

#[tokio::test]
async fn test_authors() {
    let pool = init_db().await;
    let repo = AuthorRepository::new(pool);

    let authors = repo.list().await.unwrap();
    let names: Vec<_> = authors.iter().map(|a| a.name()).collect();
    assert_eq!(names, vec!["Asimov, Isaac", "Austen, Jane"]);

    let austen = repo.get(1).await.unwrap().unwrap();
    assert_eq!(austen.date_of_birth, Some(date!(1775 - 12 - 16)));
    assert_eq!(austen.lifespan(), "1775 - 1817");

    let id = repo
        .create(&CreateAuthor {
            first_name: "Mary".to_string(),
            family_name: "Shelley".to_string(),
            date_of_birth: Some(date!(1797 - 08 - 30)),
            date_of_death: None,
        })
        .await
        .unwrap();
    let shelley = repo.get(id).await.unwrap().unwrap();
    assert_eq!(shelley.name(), "Shelley, Mary");
    assert_eq!(shelley.date_of_death, None);
    assert_eq!(repo.count().await.unwrap(), 3);

    repo.update(
        id,
        &CreateAuthor {
            first_name: "Mary".to_string(),
            family_name: "Shelley".to_string(),
            date_of_birth: Some(date!(1797 - 08 - 30)),
            date_of_death: Some(date!(1851 - 02 - 01)),
        },
    )
    .await
    .unwrap();
    let shelley = repo.get(id).await.unwrap().unwrap();
    assert_eq!(shelley.id, id);
    assert_eq!(shelley.date_of_death, Some(date!(1851 - 02 - 01)));

    repo.delete(id).await.unwrap();
    assert!(repo.get(id).await.unwrap().is_none());
    assert!(matches!(
        repo.delete(id).await,
        Err(catalog_dal::Error::RecordNotFound(_))
    ));
    assert!(matches!(
        repo.update(id, &CreateAuthor {
            first_name: "X".to_string(),
            family_name: "Y".to_string(),
            date_of_birth: None,
            date_of_death: None,
        })
        .await,
        Err(catalog_dal::Error::RecordNotFound(_))
    ));
}

#[tokio::test]
async fn test_author_with_books_cannot_be_removed_by_store() {
    let pool = init_db().await;
    let repo = AuthorRepository::new(pool);
    assert!(matches!(
        repo.delete(1).await,
        Err(catalog_dal::Error::DatabaseError(_))
    ));
}

#[tokio::test]
async fn test_genres() {
    let pool = init_db().await;
    let repo = GenreRepository::new(pool);

    let genres = repo.list().await.unwrap();
    let names: Vec<_> = genres.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["Classic", "Romance", "Science Fiction"]);

    let found = repo.find_by_name("Romance").await.unwrap().unwrap();
    assert_eq!(found.id, 1);
    assert_eq!(found.url(), "/catalog/genre/1");
    assert!(repo.find_by_name("romance").await.unwrap().is_none());

    let book_genres = repo.list_by_book(1).await.unwrap();
    assert_eq!(book_genres.len(), 2);
    assert_eq!(book_genres[0].name, "Classic");

    let id = repo
        .create(&CreateGenre {
            name: "Poetry".to_string(),
        })
        .await
        .unwrap();
    repo.update(
        id,
        &CreateGenre {
            name: "Verse".to_string(),
        },
    )
    .await
    .unwrap();
    assert_eq!(repo.get(id).await.unwrap().unwrap().name, "Verse");
    assert_eq!(repo.count().await.unwrap(), 4);

    // association goes away with the genre
    repo.delete(3).await.unwrap();
    assert_eq!(repo.list_by_book(1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_books() {
    let pool = init_db().await;
    let repo = BookRepository::new(pool.clone());

    let books = repo.list().await.unwrap();
    assert_eq!(books.len(), 2);
    assert_eq!(books[0].title, "Foundation");
    assert_eq!(books[0].author.name(), "Asimov, Isaac");
    assert_eq!(books[1].author.id, 1);

    let book = repo.get(1).await.unwrap().unwrap();
    assert_eq!(book.genre_ids, vec![1, 3]);

    let resolved = repo.get_with_author(1).await.unwrap().unwrap();
    assert_eq!(resolved.author.family_name, "Austen");
    assert_eq!(resolved.isbn, "9780141439518");

    let by_author = repo.list_by_author(1).await.unwrap();
    assert_eq!(by_author.len(), 1);
    assert_eq!(by_author[0].summary, "Elizabeth and Mr Darcy");

    let by_genre = repo.list_by_genre(2).await.unwrap();
    assert_eq!(by_genre.len(), 1);
    assert_eq!(by_genre[0].title, "Foundation");

    let id = repo
        .create(&CreateBook {
            title: "Emma".to_string(),
            author_id: 1,
            summary: "Matchmaking".to_string(),
            isbn: "123".to_string(),
            genre_ids: vec![1],
        })
        .await
        .unwrap();
    let emma = repo.get(id).await.unwrap().unwrap();
    assert_eq!(emma.genre_ids, vec![1]);

    repo.update(
        id,
        &CreateBook {
            title: "Emma".to_string(),
            author_id: 1,
            summary: "Matchmaking in Highbury".to_string(),
            isbn: "123".to_string(),
            genre_ids: vec![],
        },
    )
    .await
    .unwrap();
    let emma = repo.get(id).await.unwrap().unwrap();
    assert_eq!(emma.id, id);
    assert_eq!(emma.summary, "Matchmaking in Highbury");
    assert!(emma.genre_ids.is_empty());

    let titles = repo.list_titles().await.unwrap();
    let titles: Vec<_> = titles.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Emma", "Foundation", "Pride and Prejudice"]);

    repo.delete(id).await.unwrap();
    assert!(repo.get(id).await.unwrap().is_none());
    assert_eq!(repo.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_book_instances() {
    let pool = init_db().await;
    let repo = BookInstanceRepository::new(pool);

    let all = repo.list().await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].book.title, "Pride and Prejudice");

    let loaned = repo.get_with_book(2).await.unwrap().unwrap();
    assert_eq!(loaned.status, InstanceStatus::Loaned);
    assert_eq!(loaned.due_back, Some(date!(2026 - 11 - 01)));
    assert_eq!(loaned.due_back_formatted(), "Nov 1, 2026");

    assert_eq!(repo.list_by_book(1).await.unwrap().len(), 2);
    assert!(repo.list_by_book(2).await.unwrap().is_empty());
    assert_eq!(
        repo.count_by_status(InstanceStatus::Available).await.unwrap(),
        1
    );

    let id = repo
        .create(&CreateBookInstance {
            book_id: 2,
            imprint: "Bantam 1991".to_string(),
            status: InstanceStatus::Maintenance,
            due_back: None,
        })
        .await
        .unwrap();
    repo.update(
        id,
        &CreateBookInstance {
            book_id: 2,
            imprint: "Bantam 1991".to_string(),
            status: InstanceStatus::Reserved,
            due_back: Some(date!(2026 - 12 - 24)),
        },
    )
    .await
    .unwrap();
    let copy = repo.get(id).await.unwrap().unwrap();
    assert_eq!(copy.id, id);
    assert_eq!(copy.status, InstanceStatus::Reserved);
    assert_eq!(copy.url(), format!("/catalog/bookinstance/{id}"));
    assert_eq!(repo.count().await.unwrap(), 3);

    repo.delete(id).await.unwrap();
    assert!(repo.get(id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_existence_lookups() {
    let pool = init_db().await;
    let authors = AuthorRepository::new(pool.clone());
    let genres = GenreRepository::new(pool.clone());
    let books = BookRepository::new(pool.clone());
    let instances = BookInstanceRepository::new(pool);

    assert!(authors.exists(2).await.unwrap());
    assert!(!authors.exists(99).await.unwrap());
    assert!(books.exists(1).await.unwrap());
    assert!(!books.exists(3).await.unwrap());
    assert!(instances.exists(2).await.unwrap());
    assert!(!instances.exists(3).await.unwrap());

    assert_eq!(genres.existing_ids(&[3, 1, 42]).await.unwrap(), vec![1, 3]);
    assert!(genres.existing_ids(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_returns_all_records() {
    let pool = catalog_dal::new_memory_pool().await.unwrap();
    pool.execute(
        "WITH RECURSIVE seq(n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM seq WHERE n < 10050)
         INSERT INTO author (first_name, family_name) SELECT 'A', printf('A%05d', n) FROM seq",
    )
    .await
    .unwrap();
    let repo = AuthorRepository::new(pool);
    let id = repo
        .create(&CreateAuthor {
            first_name: "Emile".to_string(),
            family_name: "Zola".to_string(),
            date_of_birth: None,
            date_of_death: None,
        })
        .await
        .unwrap();

    let authors = repo.list().await.unwrap();
    assert_eq!(authors.len(), 10051);
    assert_eq!(authors.last().unwrap().id, id);
    assert!(repo.exists(id).await.unwrap());
}
