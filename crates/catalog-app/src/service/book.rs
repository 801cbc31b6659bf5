use catalog_dal::{
    author::{Author, AuthorRepository},
    book::{book_url, BookListing, BookRepository, BookWithAuthor, CreateBook},
    book_instance::{BookInstance, BookInstanceRepository},
    genre::{Genre, GenreRepository},
    Pool, Resource as _,
};
use serde::Serialize;
use tracing::debug;

use super::{
    author::AuthorView, book_instance::InstanceView, deleted, linked, not_found, Deletion,
    FormPage, Linked, Rejected, Saved, Submission,
};
use crate::{
    error::{Error, Result},
    form::{validated, BookForm, FieldError, FormInput as _, Selection},
};

/// Book with its author resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookEntry {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub author: AuthorView,
}

impl From<BookListing> for BookEntry {
    fn from(book: BookListing) -> Self {
        BookEntry {
            url: book.url(),
            id: book.id,
            title: book.title,
            author: book.author.into(),
        }
    }
}

impl From<BookWithAuthor> for BookEntry {
    fn from(book: BookWithAuthor) -> Self {
        BookEntry {
            url: book.url(),
            id: book.id,
            title: book.title,
            author: book.author.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BookView {
    pub id: i64,
    pub title: String,
    pub summary: String,
    pub isbn: String,
    pub url: String,
    pub author: AuthorView,
    pub genres: Vec<Linked<Genre>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookDetail {
    pub book: BookView,
    pub instances: Vec<InstanceView>,
}

/// Book and the copies which prevent its deletion.
#[derive(Debug, Clone, Serialize)]
pub struct BookDependents {
    pub book: BookEntry,
    pub instances: Vec<InstanceView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenreOption {
    pub id: i64,
    pub name: String,
    pub checked: bool,
}

/// Choices offered by the book form.
#[derive(Debug, Clone, Serialize)]
pub struct BookFormContext {
    pub authors: Vec<AuthorView>,
    pub genres: Vec<GenreOption>,
}

impl BookFormContext {
    fn new(authors: Vec<Author>, genres: Vec<Genre>, selected: &Selection) -> Self {
        BookFormContext {
            authors: authors.into_iter().map(AuthorView::from).collect(),
            genres: genres
                .into_iter()
                .map(|g| GenreOption {
                    checked: selected.contains(g.id),
                    id: g.id,
                    name: g.name,
                })
                .collect(),
        }
    }
}

pub type BookSubmission = Submission<BookForm, BookFormContext>;

pub struct BookService {
    books: BookRepository,
    authors: AuthorRepository,
    genres: GenreRepository,
    instances: BookInstanceRepository,
}

crate::service_from_request!(BookService);

impl BookService {
    pub fn new(pool: Pool) -> Self {
        BookService {
            books: BookRepository::new(pool.clone()),
            authors: AuthorRepository::new(pool.clone()),
            genres: GenreRepository::new(pool.clone()),
            instances: BookInstanceRepository::new(pool),
        }
    }

    /// All books ordered by title, with their authors.
    pub async fn list(&self) -> Result<Vec<BookEntry>> {
        let books = self.books.list().await?;
        Ok(books.into_iter().map(BookEntry::from).collect())
    }

    pub async fn get(&self, id: i64) -> Result<BookDetail> {
        let (book, genres, instances) = futures::try_join!(
            self.books.get_with_author(id),
            self.genres.list_by_book(id),
            self.instances.list_by_book(id)
        )?;
        let book = book.ok_or(Error::NotFound("Book"))?;
        Ok(BookDetail {
            book: BookView {
                url: book.url(),
                id: book.id,
                title: book.title,
                summary: book.summary,
                isbn: book.isbn,
                author: book.author.into(),
                genres: linked(genres),
            },
            instances: instance_views(instances),
        })
    }

    pub async fn prepare_create_form(&self) -> Result<FormPage<BookForm, BookFormContext>> {
        let input = BookForm::default();
        let context = self.form_context(&input.genre).await?;
        Ok(FormPage { input, context })
    }

    pub async fn prepare_update_form(
        &self,
        id: i64,
    ) -> Result<FormPage<BookForm, BookFormContext>> {
        let (book, authors, genres) = futures::try_join!(
            self.books.get(id),
            self.authors.list(),
            self.genres.list()
        )?;
        let book = book.ok_or(Error::NotFound("Book"))?;
        let input = BookForm {
            title: book.title,
            author: book.author_id.to_string(),
            summary: book.summary,
            isbn: book.isbn,
            genre: Selection::new(book.genre_ids.iter().map(|id| id.to_string())),
        };
        let context = BookFormContext::new(authors, genres, &input.genre);
        Ok(FormPage { input, context })
    }

    pub async fn create(&self, form: BookForm) -> Result<BookSubmission> {
        let payload = match self.check(form).await? {
            Ok(payload) => payload,
            Err(rejected) => return Ok(Submission::Rejected(rejected)),
        };
        let id = self.books.create(&payload).await?;
        Ok(Submission::Saved(Saved::new(id, book_url(id))))
    }

    /// Overwrites all fields of the book, including its genres.
    pub async fn update(&self, id: i64, form: BookForm) -> Result<BookSubmission> {
        let payload = match self.check(form).await? {
            Ok(payload) => payload,
            Err(rejected) => return Ok(Submission::Rejected(rejected)),
        };
        self.books
            .update(id, &payload)
            .await
            .map_err(not_found("Book"))?;
        Ok(Submission::Saved(Saved::new(id, book_url(id))))
    }

    pub async fn prepare_delete(&self, id: i64) -> Result<Option<BookDependents>> {
        let (book, instances) = futures::try_join!(
            self.books.get_with_author(id),
            self.instances.list_by_book(id)
        )?;
        Ok(book.map(|book| BookDependents {
            book: book.into(),
            instances: instance_views(instances),
        }))
    }

    pub async fn delete(&self, id: i64) -> Result<Deletion<BookDependents>> {
        let Some(dependents) = self.prepare_delete(id).await? else {
            return Ok(Deletion::Missing);
        };
        if !dependents.instances.is_empty() {
            debug!("Book {id} still has {} copies", dependents.instances.len());
            return Ok(Deletion::Blocked(dependents));
        }
        deleted(self.books.delete(id).await)
    }

    async fn form_context(&self, selected: &Selection) -> Result<BookFormContext> {
        let (authors, genres) = futures::try_join!(self.authors.list(), self.genres.list())?;
        Ok(BookFormContext::new(authors, genres, selected))
    }

    /// Validates the form and resolves its references.
    async fn check(
        &self,
        form: BookForm,
    ) -> Result<Result<CreateBook, Rejected<BookForm, BookFormContext>>> {
        let (errors, form) = match validated(form) {
            Ok(form) => {
                let payload = form.payload();
                let errors = self.unknown_references(&payload).await?;
                if errors.is_empty() {
                    return Ok(Ok(payload));
                }
                (errors, form)
            }
            Err(invalid) => (invalid.errors, invalid.input),
        };
        let context = self.form_context(&form.genre).await?;
        Ok(Err(Rejected {
            errors,
            input: form,
            context,
        }))
    }

    async fn unknown_references(&self, payload: &CreateBook) -> Result<Vec<FieldError>> {
        let (author_exists, known_genres) = futures::try_join!(
            self.authors.exists(payload.author_id),
            self.genres.existing_ids(&payload.genre_ids)
        )?;
        let mut errors = Vec::new();
        if !author_exists {
            errors.push(FieldError::new("author", "Author not found"));
        }
        if known_genres.len() < payload.genre_ids.len() {
            errors.push(FieldError::new("genre", "Genre not found"));
        }
        Ok(errors)
    }
}

fn instance_views(instances: Vec<BookInstance>) -> Vec<InstanceView> {
    instances.into_iter().map(InstanceView::from).collect()
}
