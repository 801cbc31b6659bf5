//! Sanitization and validation of submitted forms.
//!
//! Raw bodies are deserialized into the `*Form` structs below, where every
//! field is kept as text so it can be echoed back unchanged when validation
//! fails. [`process`] trims the values, runs the `garde` rules and, if they
//! pass, turns the form into the payload stored by the repositories.

use std::fmt;

use catalog_dal::{
    author::CreateAuthor, book::CreateBook, book_instance::CreateBookInstance,
    book_instance::InstanceStatus, dates, genre::CreateGenre,
};
use garde::Validate;
use serde::{
    de::{self, SeqAccess, Visitor},
    Deserialize, Deserializer, Serialize,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        FieldError {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors of the report, in the order the fields appear on the form.
fn field_errors(report: &garde::Report, fields: &[&str]) -> Vec<FieldError> {
    let mut errors: Vec<FieldError> = report
        .iter()
        .map(|(path, error)| FieldError::new(path.to_string(), error.to_string()))
        .collect();
    errors.sort_by_key(|e| {
        fields
            .iter()
            .position(|f| *f == e.field)
            .unwrap_or(fields.len())
    });
    errors
}

/// Form which failed validation, with its (trimmed) values for re-display.
#[derive(Debug, Clone, Serialize)]
pub struct Invalid<F> {
    pub errors: Vec<FieldError>,
    pub input: F,
}

pub trait FormInput: Validate<Context = ()> + Sized {
    type Payload;

    /// Field names in form order.
    const FIELDS: &'static [&'static str];

    fn sanitize(self) -> Self;

    /// Only called on a sanitized form which passed validation.
    fn payload(&self) -> Self::Payload;
}

/// Sanitizes and validates the form, returning the sanitized form.
pub fn validated<F: FormInput>(form: F) -> Result<F, Invalid<F>> {
    let form = form.sanitize();
    match form.validate() {
        Ok(()) => Ok(form),
        Err(report) => Err(Invalid {
            errors: field_errors(&report, F::FIELDS),
            input: form,
        }),
    }
}

pub fn process<F: FormInput>(form: F) -> Result<F::Payload, Invalid<F>> {
    validated(form).map(|form| form.payload())
}

pub fn parse_id(value: &str) -> Option<i64> {
    value.parse::<i64>().ok().filter(|id| *id > 0)
}

fn optional_date(value: &str) -> Option<time::Date> {
    if value.is_empty() {
        None
    } else {
        dates::parse_date(value)
    }
}

// Selection ==================================================================

/// Value of a multi-choice field.
///
/// A form posts a single choice as a plain value and several choices as
/// repeated keys, JSON clients may send a scalar or an array. All shapes
/// deserialize into a sequence, a missing field into an empty one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Selection(Vec<String>);

impl Selection {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Selection(values.into_iter().map(Into::into).collect())
    }

    pub fn values(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, id: i64) -> bool {
        self.0.iter().any(|v| parse_id(v) == Some(id))
    }

    /// Trims the values and drops empty ones.
    pub fn sanitize(self) -> Self {
        Selection(
            self.0
                .into_iter()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect(),
        )
    }

    pub fn ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.0.iter().filter_map(|v| parse_id(v)).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

struct ScalarVisitor;

impl<'de> Visitor<'de> for ScalarVisitor {
    type Value = String;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a string or a number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(v.to_string())
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(v.to_string())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(v.to_string())
    }
}

struct Scalar(String);

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ScalarVisitor).map(Scalar)
    }
}

struct SelectionVisitor;

impl<'de> Visitor<'de> for SelectionVisitor {
    type Value = Selection;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a single value or a sequence of values")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(Selection(vec![v.to_string()]))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(Selection(vec![v.to_string()]))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Selection(vec![v.to_string()]))
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(Selection::default())
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(Selection::default())
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut values = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(Scalar(value)) = seq.next_element()? {
            values.push(value);
        }
        Ok(Selection(values))
    }
}

impl<'de> Deserialize<'de> for Selection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(SelectionVisitor)
    }
}

/// Reference fields hold an id, which JSON clients may send as a number.
fn reference<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    struct ReferenceVisitor;

    impl<'de> Visitor<'de> for ReferenceVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("an identifier")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(String::new())
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(String::new())
        }
    }

    deserializer.deserialize_any(ReferenceVisitor)
}

// Validators =================================================================

fn required(value: &str, message: &'static str) -> garde::Result {
    if value.is_empty() {
        Err(garde::Error::new(message))
    } else {
        Ok(())
    }
}

fn person_name(value: &str, label: &str) -> garde::Result {
    if value.is_empty() {
        Err(garde::Error::new(format!("{label} must be specified.")))
    } else if !value.chars().all(char::is_alphanumeric) {
        Err(garde::Error::new(format!(
            "{label} has non-alphanumeric characters."
        )))
    } else {
        Ok(())
    }
}

fn date(value: &str, message: &'static str) -> garde::Result {
    if value.is_empty() || dates::parse_date(value).is_some() {
        Ok(())
    } else {
        Err(garde::Error::new(message))
    }
}

fn reference_to(value: &str, missing: &'static str, invalid: &'static str) -> garde::Result {
    required(value, missing)?;
    parse_id(value)
        .map(|_| ())
        .ok_or_else(|| garde::Error::new(invalid))
}

fn valid_first_name(value: &str, _ctx: &()) -> garde::Result {
    person_name(value, "First name")
}

fn valid_family_name(value: &str, _ctx: &()) -> garde::Result {
    person_name(value, "Family name")
}

fn valid_date_of_birth(value: &str, _ctx: &()) -> garde::Result {
    date(value, "Invalid date of birth")
}

fn valid_date_of_death(value: &str, _ctx: &()) -> garde::Result {
    date(value, "Invalid date of death")
}

fn valid_genre_name(value: &str, _ctx: &()) -> garde::Result {
    required(value, "Genre name required")
}

fn valid_title(value: &str, _ctx: &()) -> garde::Result {
    required(value, "Title must not be empty.")
}

fn valid_author(value: &str, _ctx: &()) -> garde::Result {
    reference_to(value, "Author must not be empty.", "Invalid author")
}

fn valid_summary(value: &str, _ctx: &()) -> garde::Result {
    required(value, "Summary must not be empty.")
}

fn valid_isbn(value: &str, _ctx: &()) -> garde::Result {
    required(value, "ISBN must not be empty")
}

fn valid_genres(value: &Selection, _ctx: &()) -> garde::Result {
    if value.values().iter().all(|v| parse_id(v).is_some()) {
        Ok(())
    } else {
        Err(garde::Error::new("Invalid genre"))
    }
}

fn valid_book(value: &str, _ctx: &()) -> garde::Result {
    reference_to(value, "Book must be specified", "Invalid book")
}

fn valid_imprint(value: &str, _ctx: &()) -> garde::Result {
    required(value, "Imprint must be specified")
}

fn valid_status(value: &str, _ctx: &()) -> garde::Result {
    if value.is_empty() || value.parse::<InstanceStatus>().is_ok() {
        Ok(())
    } else {
        Err(garde::Error::new("Invalid status"))
    }
}

fn valid_due_back(value: &str, _ctx: &()) -> garde::Result {
    date(value, "Invalid date")
}

// Forms ======================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AuthorForm {
    #[garde(custom(valid_first_name), length(chars, max = 100))]
    pub first_name: String,
    #[garde(custom(valid_family_name), length(chars, max = 100))]
    pub family_name: String,
    #[garde(custom(valid_date_of_birth))]
    pub date_of_birth: String,
    #[garde(custom(valid_date_of_death))]
    pub date_of_death: String,
}

impl FormInput for AuthorForm {
    type Payload = CreateAuthor;
    const FIELDS: &'static [&'static str] =
        &["first_name", "family_name", "date_of_birth", "date_of_death"];

    fn sanitize(self) -> Self {
        AuthorForm {
            first_name: self.first_name.trim().to_string(),
            family_name: self.family_name.trim().to_string(),
            date_of_birth: self.date_of_birth.trim().to_string(),
            date_of_death: self.date_of_death.trim().to_string(),
        }
    }

    fn payload(&self) -> CreateAuthor {
        CreateAuthor {
            first_name: self.first_name.clone(),
            family_name: self.family_name.clone(),
            date_of_birth: optional_date(&self.date_of_birth),
            date_of_death: optional_date(&self.date_of_death),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct GenreForm {
    #[garde(custom(valid_genre_name))]
    pub name: String,
}

impl FormInput for GenreForm {
    type Payload = CreateGenre;
    const FIELDS: &'static [&'static str] = &["name"];

    fn sanitize(self) -> Self {
        GenreForm {
            name: self.name.trim().to_string(),
        }
    }

    fn payload(&self) -> CreateGenre {
        CreateGenre {
            name: self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct BookForm {
    #[garde(custom(valid_title))]
    pub title: String,
    #[serde(deserialize_with = "reference")]
    #[garde(custom(valid_author))]
    pub author: String,
    #[garde(custom(valid_summary))]
    pub summary: String,
    #[garde(custom(valid_isbn))]
    pub isbn: String,
    #[garde(custom(valid_genres))]
    pub genre: Selection,
}

impl FormInput for BookForm {
    type Payload = CreateBook;
    const FIELDS: &'static [&'static str] = &["title", "author", "summary", "isbn", "genre"];

    fn sanitize(self) -> Self {
        BookForm {
            title: self.title.trim().to_string(),
            author: self.author.trim().to_string(),
            summary: self.summary.trim().to_string(),
            isbn: self.isbn.trim().to_string(),
            genre: self.genre.sanitize(),
        }
    }

    fn payload(&self) -> CreateBook {
        CreateBook {
            title: self.title.clone(),
            author_id: parse_id(&self.author).unwrap_or_default(),
            summary: self.summary.clone(),
            isbn: self.isbn.clone(),
            genre_ids: self.genre.ids(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct BookInstanceForm {
    #[serde(deserialize_with = "reference")]
    #[garde(custom(valid_book))]
    pub book: String,
    #[garde(custom(valid_imprint))]
    pub imprint: String,
    #[garde(custom(valid_status))]
    pub status: String,
    #[garde(custom(valid_due_back))]
    pub due_back: String,
}

impl FormInput for BookInstanceForm {
    type Payload = CreateBookInstance;
    const FIELDS: &'static [&'static str] = &["book", "imprint", "status", "due_back"];

    fn sanitize(self) -> Self {
        BookInstanceForm {
            book: self.book.trim().to_string(),
            imprint: self.imprint.trim().to_string(),
            status: self.status.trim().to_string(),
            due_back: self.due_back.trim().to_string(),
        }
    }

    fn payload(&self) -> CreateBookInstance {
        CreateBookInstance {
            book_id: parse_id(&self.book).unwrap_or_default(),
            imprint: self.imprint.clone(),
            status: self.status.parse().unwrap_or_default(),
            due_back: optional_date(&self.due_back),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_dal::book_instance::InstanceStatus;
    use time::macros::date;

    fn author_form(first_name: &str, family_name: &str) -> AuthorForm {
        AuthorForm {
            first_name: first_name.to_string(),
            family_name: family_name.to_string(),
            ..Default::default()
        }
    }

    fn fields<F>(invalid: &Invalid<F>) -> Vec<&str> {
        invalid.errors.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn test_author_trimmed() {
        let mut form = author_form("  Jane ", "\tAusten\n");
        form.date_of_birth = " 1775-12-16 ".to_string();
        let payload = process(form).unwrap();
        assert_eq!(payload.first_name, "Jane");
        assert_eq!(payload.family_name, "Austen");
        assert_eq!(payload.date_of_birth, Some(date!(1775 - 12 - 16)));
        assert_eq!(payload.date_of_death, None);
    }

    #[test]
    fn test_author_required() {
        let invalid = process(author_form("   ", "")).unwrap_err();
        assert_eq!(fields(&invalid), vec!["first_name", "family_name"]);
        assert_eq!(invalid.errors[0].message, "First name must be specified.");
        assert_eq!(invalid.errors[1].message, "Family name must be specified.");
        assert_eq!(invalid.input.first_name, "");
    }

    #[test]
    fn test_author_alphanumeric() {
        let invalid = process(author_form("Jane!", "Austen")).unwrap_err();
        assert_eq!(fields(&invalid), vec!["first_name"]);
        assert_eq!(
            invalid.errors[0].message,
            "First name has non-alphanumeric characters."
        );

        assert!(process(author_form("Božena", "Němcová")).is_ok());
        assert!(process(author_form("Jane", "Austen2")).is_ok());
        assert!(process(author_form("Mary Ann", "Evans")).is_err());
    }

    #[test]
    fn test_author_name_too_long() {
        let invalid = process(author_form(&"a".repeat(101), "Austen")).unwrap_err();
        assert_eq!(fields(&invalid), vec!["first_name"]);
        assert!(process(author_form("Jane", &"ž".repeat(100))).is_ok());
        assert!(process(author_form(&"a".repeat(100), "Austen")).is_ok());
    }

    #[test]
    fn test_author_dates() {
        let mut form = author_form("Jane", "Austen");
        form.date_of_birth = "16/12/1775".to_string();
        form.date_of_death = "1817-07-18".to_string();
        let invalid = process(form).unwrap_err();
        assert_eq!(fields(&invalid), vec!["date_of_birth"]);
        assert_eq!(invalid.errors[0].message, "Invalid date of birth");

        let mut form = author_form("Jane", "Austen");
        form.date_of_death = "  ".to_string();
        assert_eq!(process(form).unwrap().date_of_death, None);
    }

    #[test]
    fn test_errors_in_form_order() {
        let form = AuthorForm {
            first_name: String::new(),
            family_name: "Austen!".to_string(),
            date_of_birth: "x".to_string(),
            date_of_death: "y".to_string(),
        };
        let invalid = process(form).unwrap_err();
        assert_eq!(
            fields(&invalid),
            vec!["first_name", "family_name", "date_of_birth", "date_of_death"]
        );

        let form = BookInstanceForm {
            due_back: "later".to_string(),
            status: "Lost".to_string(),
            ..Default::default()
        };
        let invalid = process(form).unwrap_err();
        assert_eq!(fields(&invalid), vec!["book", "imprint", "status", "due_back"]);
    }

    #[test]
    fn test_validated_returns_sanitized_form() {
        let form = validated(GenreForm {
            name: "  Poetry ".to_string(),
        })
        .unwrap();
        assert_eq!(form.name, "Poetry");
    }

    #[test]
    fn test_genre() {
        let invalid = process(GenreForm {
            name: "  ".to_string(),
        })
        .unwrap_err();
        assert_eq!(invalid.errors, vec![FieldError::new("name", "Genre name required")]);

        let payload = process(GenreForm {
            name: " Fantasy ".to_string(),
        })
        .unwrap();
        assert_eq!(payload.name, "Fantasy");
    }

    #[test]
    fn test_book() {
        let form = BookForm {
            title: " Emma ".to_string(),
            author: "3".to_string(),
            summary: "Matchmaking".to_string(),
            isbn: "123".to_string(),
            genre: Selection::new(["2", " ", "1", "2"]),
        };
        let payload = process(form).unwrap();
        assert_eq!(payload.title, "Emma");
        assert_eq!(payload.author_id, 3);
        assert_eq!(payload.genre_ids, vec![1, 2]);
    }

    #[test]
    fn test_book_invalid() {
        let form = BookForm {
            author: "abc".to_string(),
            genre: Selection::new(["x"]),
            ..Default::default()
        };
        let invalid = process(form).unwrap_err();
        assert_eq!(
            fields(&invalid),
            vec!["title", "author", "summary", "isbn", "genre"]
        );
        assert_eq!(invalid.errors[1].message, "Invalid author");

        let invalid = process(BookForm::default()).unwrap_err();
        assert_eq!(invalid.errors[1].message, "Author must not be empty.");
    }

    #[test]
    fn test_book_instance() {
        let form = BookInstanceForm {
            book: "1".to_string(),
            imprint: "Penguin".to_string(),
            status: "Loaned".to_string(),
            due_back: "2026-11-01".to_string(),
        };
        let payload = process(form).unwrap();
        assert_eq!(payload.status, InstanceStatus::Loaned);
        assert_eq!(payload.due_back, Some(date!(2026 - 11 - 01)));

        let form = BookInstanceForm {
            book: "1".to_string(),
            imprint: "Penguin".to_string(),
            ..Default::default()
        };
        let payload = process(form).unwrap();
        assert_eq!(payload.status, InstanceStatus::Maintenance);
        assert_eq!(payload.due_back, None);
    }

    #[test]
    fn test_book_instance_invalid() {
        let form = BookInstanceForm {
            book: "1".to_string(),
            imprint: "Penguin".to_string(),
            status: "Lost".to_string(),
            due_back: "not-a-date".to_string(),
        };
        let invalid = process(form).unwrap_err();
        assert_eq!(
            invalid.errors,
            vec![
                FieldError::new("status", "Invalid status"),
                FieldError::new("due_back", "Invalid date"),
            ]
        );
        assert_eq!(invalid.input.due_back, "not-a-date");
    }

    #[test]
    fn test_selection_from_json() {
        let form: BookForm = serde_json::from_str(r#"{"title": "Emma", "genre": "4"}"#).unwrap();
        assert_eq!(form.genre, Selection::new(["4"]));

        let form: BookForm =
            serde_json::from_str(r#"{"author": 3, "genre": [4, "5"]}"#).unwrap();
        assert_eq!(form.author, "3");
        assert_eq!(form.genre, Selection::new(["4", "5"]));

        let form: BookForm = serde_json::from_str(r#"{"title": "Emma"}"#).unwrap();
        assert_eq!(form.genre, Selection::default());

        let form: BookForm = serde_json::from_str(r#"{"genre": null}"#).unwrap();
        assert!(form.genre.values().is_empty());
    }

    #[test]
    fn test_selection_from_urlencoded() {
        let form: BookForm = serde_html_form::from_str("title=Emma&genre=4").unwrap();
        assert_eq!(form.genre, Selection::new(["4"]));

        let form: BookForm = serde_html_form::from_str("genre=4&genre=5&author=2").unwrap();
        assert_eq!(form.genre, Selection::new(["4", "5"]));
        assert_eq!(form.author, "2");

        let form: BookForm = serde_html_form::from_str("title=Emma").unwrap();
        assert!(form.genre.values().is_empty());
    }
}
