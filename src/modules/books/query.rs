//! Turns search parameters into a validated [`BookQuery`].

use std::cmp::Ordering;

use serde::Deserialize;

use super::error::BookError;
use super::models::{non_blank, Book};

const DEFAULT_PAGE: u64 = 1;
const DEFAULT_LIMIT: u64 = 10;

/// Raw query string of the search endpoint; every value arrives as text.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
    pub genre: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Title,
    Author,
    Genre,
    Isbn,
    PublicationDate,
}

impl SortField {
    pub const ALL: [SortField; 7] = [
        SortField::CreatedAt,
        SortField::UpdatedAt,
        SortField::Title,
        SortField::Author,
        SortField::Genre,
        SortField::Isbn,
        SortField::PublicationDate,
    ];

    /// Field name as stored and as accepted in `sortBy`.
    pub fn key(self) -> &'static str {
        match self {
            SortField::CreatedAt => "createdAt",
            SortField::UpdatedAt => "updatedAt",
            SortField::Title => "title",
            SortField::Author => "author",
            SortField::Genre => "genre",
            SortField::Isbn => "ISBN",
            SortField::PublicationDate => "publicationDate",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_i32(self) -> i32 {
        match self {
            SortOrder::Asc => 1,
            SortOrder::Desc => -1,
        }
    }
}

/// Offset pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u64,
    pub limit: u64,
}

impl Page {
    pub fn skip(self) -> u64 {
        (self.number - 1).saturating_mul(self.limit)
    }
}

/// Filter, ordering and window for a book listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookQuery {
    /// Case-insensitive literal substring of title or author.
    pub search: Option<String>,
    /// Exact genre.
    pub genre: Option<String>,
    pub sort: SortField,
    pub order: SortOrder,
    /// `None` returns every match.
    pub page: Option<Page>,
}

impl BookQuery {
    /// Every book, newest first.
    pub fn everything() -> Self {
        Self {
            search: None,
            genre: None,
            sort: SortField::CreatedAt,
            order: SortOrder::Desc,
            page: None,
        }
    }

    pub fn from_params(params: ListParams, max_page_size: Option<u64>) -> Result<Self, BookError> {
        let number = parse_positive("page", params.page.as_deref(), DEFAULT_PAGE)?;
        let limit = parse_positive("limit", params.limit.as_deref(), DEFAULT_LIMIT)?;
        let offset = (number - 1)
            .checked_mul(limit)
            .filter(|offset| i64::try_from(*offset).is_ok() && i64::try_from(limit).is_ok());
        if offset.is_none() {
            return Err(BookError::invalid_field(
                "page",
                format!("page {number} with limit {limit} is out of range"),
            ));
        }
        if let Some(max) = max_page_size {
            if limit > max {
                return Err(BookError::invalid_field(
                    "limit",
                    format!("limit must not exceed {max}"),
                ));
            }
        }

        let sort = match params.sort_by.as_deref().and_then(non_blank) {
            None => SortField::default(),
            Some(raw) => SortField::parse(&raw).ok_or_else(|| {
                let allowed: Vec<&str> = SortField::ALL.iter().map(|f| f.key()).collect();
                BookError::invalid_field(
                    "sortBy",
                    format!("cannot sort by '{raw}'; expected one of {}", allowed.join(", ")),
                )
            })?,
        };

        let order = match params.order.as_deref().and_then(non_blank) {
            None => SortOrder::default(),
            Some(raw) if raw.eq_ignore_ascii_case("asc") => SortOrder::Asc,
            Some(raw) if raw.eq_ignore_ascii_case("desc") => SortOrder::Desc,
            Some(raw) => {
                return Err(BookError::invalid_field(
                    "order",
                    format!("order must be 'asc' or 'desc', got '{raw}'"),
                ))
            }
        };

        Ok(Self {
            search: params.search.and_then(non_blank),
            genre: params.genre.and_then(non_blank),
            sort,
            order,
            page: Some(Page { number, limit }),
        })
    }

    /// In-process equivalent of the store filter.
    pub fn matches(&self, book: &Book) -> bool {
        if let Some(genre) = &self.genre {
            if book.genre.as_deref() != Some(genre.as_str()) {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let contains = |value: Option<&str>| {
                value.is_some_and(|v| v.to_lowercase().contains(&needle))
            };
            if !contains(Some(&book.title)) && !contains(book.author.as_deref()) {
                return false;
            }
        }
        true
    }

    /// In-process equivalent of the store sort; ties fall back to id.
    pub fn compare(&self, a: &Book, b: &Book) -> Ordering {
        let by_field = match self.sort {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            SortField::Title => a.title.cmp(&b.title),
            SortField::Author => a.author.cmp(&b.author),
            SortField::Genre => a.genre.cmp(&b.genre),
            SortField::Isbn => a.isbn.cmp(&b.isbn),
            SortField::PublicationDate => a.publication_date.cmp(&b.publication_date),
        }
        .then_with(|| a.id.cmp(&b.id));

        match self.order {
            SortOrder::Asc => by_field,
            SortOrder::Desc => by_field.reverse(),
        }
    }
}

fn parse_positive(field: &'static str, raw: Option<&str>, default: u64) -> Result<u64, BookError> {
    let Some(raw) = raw.and_then(non_blank) else {
        return Ok(default);
    };
    match raw.parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(BookError::invalid_field(
            field,
            format!("{field} must be a positive integer, got '{raw}'"),
        )),
    }
}

/// Escape regex metacharacters so `input` matches literally.
pub fn escape_pattern(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(
            c,
            '\\' | '.' | '+' | '*' | '?' | '(' | ')' | '|' | '[' | ']' | '{' | '}' | '^' | '$'
                | '#' | '&' | '-' | '~'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
