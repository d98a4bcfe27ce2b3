//! Opaque cursor and page envelope primitives.
//!
//! List queries that can grow without bound (comment threads, follow
//! suggestions) are served one page at a time. Callers receive an opaque
//! cursor string with each page; the string encodes the sort key of the last
//! row so the next request can resume strictly after it.
//!
//! Cursors are base64url-encoded JSON. They are opaque to clients but
//! deliberately not signed: a tampered cursor can only move the window, not
//! widen what the backend is willing to return.

use std::fmt;
use std::marker::PhantomData;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Smallest page a caller may request.
pub const MIN_PAGE_LIMIT: usize = 1;
/// Largest page a caller may request.
pub const MAX_PAGE_LIMIT: usize = 100;
/// Page size used when the caller does not specify one.
pub const DEFAULT_PAGE_LIMIT: usize = 20;

/// Errors raised while decoding a cursor string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CursorError {
    /// The cursor is not valid base64url.
    #[error("cursor is not valid base64url: {message}")]
    InvalidEncoding {
        /// Decoder diagnostic.
        message: String,
    },
    /// The decoded payload does not match the expected key shape.
    #[error("cursor payload is malformed: {message}")]
    InvalidPayload {
        /// Deserializer diagnostic.
        message: String,
    },
}

/// Errors raised when a requested page size is out of range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("page limit must be between {min} and {max}, got {actual}")]
pub struct PageLimitError {
    /// Lower bound.
    pub min: usize,
    /// Upper bound.
    pub max: usize,
    /// Rejected value.
    pub actual: usize,
}

/// Validated number of items per page.
///
/// # Examples
/// ```
/// use pagination::PageLimit;
///
/// let limit = PageLimit::new(5).expect("valid limit");
/// assert_eq!(limit.get(), 5);
/// assert!(PageLimit::new(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageLimit(usize);

impl PageLimit {
    /// Validate and construct a page limit.
    pub fn new(value: usize) -> Result<Self, PageLimitError> {
        if (MIN_PAGE_LIMIT..=MAX_PAGE_LIMIT).contains(&value) {
            Ok(Self(value))
        } else {
            Err(PageLimitError {
                min: MIN_PAGE_LIMIT,
                max: MAX_PAGE_LIMIT,
                actual: value,
            })
        }
    }

    /// Clamp an arbitrary value into the accepted range.
    pub fn saturating(value: usize) -> Self {
        Self(value.clamp(MIN_PAGE_LIMIT, MAX_PAGE_LIMIT))
    }

    /// Number of items per page.
    pub fn get(self) -> usize {
        self.0
    }

    /// Number of rows to request from storage so the presence of a further
    /// page can be detected without a count query.
    pub fn overfetch(self) -> usize {
        self.0.saturating_add(1)
    }
}

impl Default for PageLimit {
    fn default() -> Self {
        Self(DEFAULT_PAGE_LIMIT)
    }
}

/// Opaque continuation token wrapping a typed sort key.
///
/// # Examples
/// ```
/// use pagination::Cursor;
///
/// let cursor = Cursor::new(42_u64);
/// let encoded = cursor.encode();
/// let decoded = Cursor::<u64>::decode(&encoded).expect("round trip");
/// assert_eq!(decoded.key(), &42);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Cursor<K> {
    key: K,
}

impl<K> Cursor<K> {
    /// Wrap a sort key.
    pub fn new(key: K) -> Self {
        Self { key }
    }

    /// Borrow the sort key.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Unwrap the sort key.
    pub fn into_key(self) -> K {
        self.key
    }
}

impl<K: Serialize> Cursor<K> {
    /// Encode the key as an opaque string.
    pub fn encode(&self) -> String {
        // Keys are plain data structs; serialisation cannot fail for them.
        let payload = serde_json::to_vec(&self.key).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(payload)
    }
}

impl<K: DeserializeOwned> Cursor<K> {
    /// Decode an opaque string produced by [`Cursor::encode`].
    pub fn decode(value: &str) -> Result<Self, CursorError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(value.trim())
            .map_err(|err| CursorError::InvalidEncoding {
                message: err.to_string(),
            })?;
        let key = serde_json::from_slice(&bytes).map_err(|err| CursorError::InvalidPayload {
            message: err.to_string(),
        })?;
        Ok(Self { key })
    }
}

impl<K> fmt::Debug for Cursor<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Cursor(..)")
    }
}

/// Request for one page of a keyset-ordered listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest<K> {
    after: Option<K>,
    limit: PageLimit,
}

impl<K> PageRequest<K> {
    /// Request the first page.
    pub fn first(limit: PageLimit) -> Self {
        Self { after: None, limit }
    }

    /// Request the page following `key`.
    pub fn after(key: K, limit: PageLimit) -> Self {
        Self {
            after: Some(key),
            limit,
        }
    }

    /// Sort key the page resumes after, if any.
    pub fn after_key(&self) -> Option<&K> {
        self.after.as_ref()
    }

    /// Requested page size.
    pub fn limit(&self) -> PageLimit {
        self.limit
    }
}

impl<K: DeserializeOwned> PageRequest<K> {
    /// Build a request from an optional opaque cursor string.
    pub fn from_cursor(cursor: Option<&str>, limit: PageLimit) -> Result<Self, CursorError> {
        match cursor {
            Some(raw) => Ok(Self::after(Cursor::<K>::decode(raw)?.into_key(), limit)),
            None => Ok(Self::first(limit)),
        }
    }
}

/// One page of results plus the cursor for the next page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T, K> {
    items: Vec<T>,
    next: Option<Cursor<K>>,
    _key: PhantomData<K>,
}

impl<T, K> Page<T, K> {
    /// Build a page from rows fetched with [`PageLimit::overfetch`].
    ///
    /// When more rows than `limit` were returned the surplus is dropped and a
    /// cursor pointing at the last kept row is produced.
    ///
    /// # Examples
    /// ```
    /// use pagination::{Page, PageLimit};
    ///
    /// let limit = PageLimit::new(2).expect("valid limit");
    /// let page: Page<u32, u32> = Page::from_overfetch(vec![9, 8, 7], limit, |n| *n);
    /// assert_eq!(page.items(), &[9, 8]);
    /// assert!(page.has_more());
    /// ```
    pub fn from_overfetch(
        mut rows: Vec<T>,
        limit: PageLimit,
        key_of: impl Fn(&T) -> K,
    ) -> Self {
        let has_more = rows.len() > limit.get();
        rows.truncate(limit.get());
        let next = if has_more {
            rows.last().map(|row| Cursor::new(key_of(row)))
        } else {
            None
        };
        Self {
            items: rows,
            next,
            _key: PhantomData,
        }
    }

    /// Page with no further results.
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next: None,
            _key: PhantomData,
        }
    }

    /// Items on this page.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Consume the page, returning its items.
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Whether a further page exists.
    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }

    /// Cursor for the following page, if any.
    pub fn next_cursor(&self) -> Option<&Cursor<K>> {
        self.next.as_ref()
    }

    /// Split into items and continuation.
    pub fn into_parts(self) -> (Vec<T>, Option<Cursor<K>>) {
        (self.items, self.next)
    }
}
