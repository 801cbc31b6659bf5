//! Operations on catalog entities.
//!
//! Services combine repositories, form processing and the integrity rules
//! between entities. They return plain data structures, the mapping to HTTP
//! lives in [`crate::rest_api`].

pub mod author;
pub mod book;
pub mod book_instance;
pub mod genre;
pub mod summary;

use catalog_dal::Resource;
use serde::Serialize;

use crate::{
    error::Error,
    form::{FieldError, Invalid},
};

pub use author::AuthorService;
pub use book::BookService;
pub use book_instance::BookInstanceService;
pub use genre::GenreService;
pub use summary::SummaryService;

/// Record stored under `id`, available at `url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Saved {
    pub id: i64,
    pub url: String,
}

impl Saved {
    fn new(id: i64, url: String) -> Self {
        Saved { id, url }
    }
}

/// Form to display, either empty or filled with current values.
#[derive(Debug, Clone, Serialize)]
pub struct FormPage<F, C = ()> {
    pub input: F,
    #[serde(flatten)]
    pub context: C,
}

/// Submitted form which cannot be saved, with data to show it again.
#[derive(Debug, Clone, Serialize)]
pub struct Rejected<F, C = ()> {
    pub errors: Vec<FieldError>,
    pub input: F,
    #[serde(flatten)]
    pub context: C,
}

impl<F> Rejected<F, ()> {
    fn from_invalid(invalid: Invalid<F>) -> Self {
        Rejected {
            errors: invalid.errors,
            input: invalid.input,
            context: (),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Submission<F, C = ()> {
    Saved(Saved),
    Rejected(Rejected<F, C>),
}

impl<F, C> Submission<F, C> {
    pub fn saved(&self) -> Option<&Saved> {
        match self {
            Submission::Saved(saved) => Some(saved),
            Submission::Rejected(_) => None,
        }
    }

    pub fn is_saved(&self) -> bool {
        self.saved().is_some()
    }
}

#[derive(Debug, Clone)]
pub enum Deletion<D> {
    Deleted,
    /// Nothing to delete, record does not exist (anymore).
    Missing,
    /// Record is still referenced, carries the record and its dependents.
    Blocked(D),
}

impl<D> Deletion<D> {
    pub fn is_deleted(&self) -> bool {
        matches!(self, Deletion::Deleted)
    }
}

/// Record extended with its canonical url.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Linked<T> {
    #[serde(flatten)]
    pub record: T,
    pub url: String,
}

impl<T: Resource> From<T> for Linked<T> {
    fn from(record: T) -> Self {
        let url = record.url();
        Linked { record, url }
    }
}

pub(crate) fn linked<T: Resource>(records: Vec<T>) -> Vec<Linked<T>> {
    records.into_iter().map(Linked::from).collect()
}

/// Store reports a missing record on update or delete.
pub(crate) fn not_found(entity: &'static str) -> impl FnOnce(catalog_dal::Error) -> Error {
    move |e| match e {
        catalog_dal::Error::RecordNotFound(_) => Error::NotFound(entity),
        other => Error::Store(other),
    }
}

/// Deletion of a record, which just disappeared, counts as done.
pub(crate) fn deleted<D>(result: catalog_dal::Result<()>) -> crate::error::Result<Deletion<D>> {
    match result {
        Ok(()) => Ok(Deletion::Deleted),
        Err(catalog_dal::Error::RecordNotFound(_)) => Ok(Deletion::Missing),
        Err(e) => Err(e.into()),
    }
}
