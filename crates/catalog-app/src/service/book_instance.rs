use std::convert::Infallible;

use catalog_dal::{
    book::{BookRepository, BookTitle},
    book_instance::{
        book_instance_url, BookInstance, BookInstanceListing, BookInstanceRepository,
        CreateBookInstance, InstanceStatus,
    },
    dates, Pool, Resource as _,
};
use serde::Serialize;
use time::Date;

use super::{deleted, not_found, Deletion, FormPage, Linked, Rejected, Saved, Submission};
use crate::{
    error::{Error, Result},
    form::{parse_id, validated, BookInstanceForm, FieldError, FormInput as _},
};

/// Copy of a book, as listed on the page of its book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceView {
    pub id: i64,
    pub imprint: String,
    pub status: InstanceStatus,
    pub due_back: Option<Date>,
    pub due_back_formatted: String,
    pub url: String,
}

impl From<BookInstance> for InstanceView {
    fn from(instance: BookInstance) -> Self {
        InstanceView {
            due_back_formatted: instance.due_back_formatted(),
            url: instance.url(),
            id: instance.id,
            imprint: instance.imprint,
            status: instance.status,
            due_back: instance.due_back,
        }
    }
}

/// Copy of a book with the book resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceEntry {
    pub id: i64,
    pub imprint: String,
    pub status: InstanceStatus,
    pub due_back: Option<Date>,
    pub due_back_formatted: String,
    pub url: String,
    pub book: Linked<BookTitle>,
}

impl From<BookInstanceListing> for InstanceEntry {
    fn from(instance: BookInstanceListing) -> Self {
        InstanceEntry {
            due_back_formatted: instance.due_back_formatted(),
            url: instance.url(),
            id: instance.id,
            imprint: instance.imprint,
            status: instance.status,
            due_back: instance.due_back,
            book: instance.book.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookOption {
    pub id: i64,
    pub title: String,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookInstanceFormContext {
    pub books: Vec<BookOption>,
    pub statuses: Vec<InstanceStatus>,
}

impl BookInstanceFormContext {
    fn new(books: Vec<BookTitle>, selected: Option<i64>) -> Self {
        BookInstanceFormContext {
            books: books
                .into_iter()
                .map(|b| BookOption {
                    selected: Some(b.id) == selected,
                    id: b.id,
                    title: b.title,
                })
                .collect(),
            statuses: InstanceStatus::ALL.to_vec(),
        }
    }
}

pub type BookInstanceSubmission = Submission<BookInstanceForm, BookInstanceFormContext>;

pub struct BookInstanceService {
    instances: BookInstanceRepository,
    books: BookRepository,
}

crate::service_from_request!(BookInstanceService);

impl BookInstanceService {
    pub fn new(pool: Pool) -> Self {
        BookInstanceService {
            instances: BookInstanceRepository::new(pool.clone()),
            books: BookRepository::new(pool),
        }
    }

    pub async fn list(&self) -> Result<Vec<InstanceEntry>> {
        let instances = self.instances.list().await?;
        Ok(instances.into_iter().map(InstanceEntry::from).collect())
    }

    pub async fn get(&self, id: i64) -> Result<InstanceEntry> {
        self.instances
            .get_with_book(id)
            .await?
            .map(InstanceEntry::from)
            .ok_or(Error::NotFound("BookInstance"))
    }

    pub async fn prepare_create_form(
        &self,
    ) -> Result<FormPage<BookInstanceForm, BookInstanceFormContext>> {
        let books = self.books.list_titles().await?;
        Ok(FormPage {
            input: BookInstanceForm::default(),
            context: BookInstanceFormContext::new(books, None),
        })
    }

    pub async fn prepare_update_form(
        &self,
        id: i64,
    ) -> Result<FormPage<BookInstanceForm, BookInstanceFormContext>> {
        let (instance, books) =
            futures::try_join!(self.instances.get(id), self.books.list_titles())?;
        let instance = instance.ok_or(Error::NotFound("BookInstance"))?;
        let context = BookInstanceFormContext::new(books, Some(instance.book_id));
        Ok(FormPage {
            input: BookInstanceForm {
                book: instance.book_id.to_string(),
                imprint: instance.imprint,
                status: instance.status.to_string(),
                due_back: instance
                    .due_back
                    .as_ref()
                    .map(dates::format_iso)
                    .unwrap_or_default(),
            },
            context,
        })
    }

    pub async fn create(&self, form: BookInstanceForm) -> Result<BookInstanceSubmission> {
        let payload = match self.check(form).await? {
            Ok(payload) => payload,
            Err(rejected) => return Ok(Submission::Rejected(rejected)),
        };
        let id = self.instances.create(&payload).await?;
        Ok(Submission::Saved(Saved::new(id, book_instance_url(id))))
    }

    pub async fn update(&self, id: i64, form: BookInstanceForm) -> Result<BookInstanceSubmission> {
        let payload = match self.check(form).await? {
            Ok(payload) => payload,
            Err(rejected) => return Ok(Submission::Rejected(rejected)),
        };
        self.instances
            .update(id, &payload)
            .await
            .map_err(not_found("BookInstance"))?;
        Ok(Submission::Saved(Saved::new(id, book_instance_url(id))))
    }

    pub async fn prepare_delete(&self, id: i64) -> Result<Option<InstanceEntry>> {
        let instance = self.instances.get_with_book(id).await?;
        Ok(instance.map(InstanceEntry::from))
    }

    /// Copies have no dependents, so deletion is never refused.
    pub async fn delete(&self, id: i64) -> Result<Deletion<Infallible>> {
        deleted(self.instances.delete(id).await)
    }

    async fn check(
        &self,
        form: BookInstanceForm,
    ) -> Result<Result<CreateBookInstance, Rejected<BookInstanceForm, BookInstanceFormContext>>>
    {
        let (errors, form) = match validated(form) {
            Ok(form) => {
                let payload = form.payload();
                if self.books.exists(payload.book_id).await? {
                    return Ok(Ok(payload));
                }
                (vec![FieldError::new("book", "Book not found")], form)
            }
            Err(invalid) => (invalid.errors, invalid.input),
        };
        let books = self.books.list_titles().await?;
        let context = BookInstanceFormContext::new(books, parse_id(&form.book));
        Ok(Err(Rejected {
            errors,
            input: form,
            context,
        }))
    }
}
