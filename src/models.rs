use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::TempFileRegistry;
use crate::{Error, Result, ShareRequest};

/// A single payload handed to the activity sheet.
#[derive(Clone)]
pub enum ShareItem {
    Text(String),
    Url(String),
    /// A file on disk, shared by path.
    File(PathBuf),
    /// An application-defined object. Native pickers skip it; custom actions
    /// receive it untouched.
    Custom(Arc<dyn Any + Send + Sync>),
}

impl ShareItem {
    pub fn url(url: impl Into<String>) -> Self {
        ShareItem::Url(url.into())
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        ShareItem::File(path.into())
    }

    pub fn custom<T: Any + Send + Sync>(value: T) -> Self {
        ShareItem::Custom(Arc::new(value))
    }

    /// Borrows the custom payload if it is a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            ShareItem::Custom(value) => value.downcast_ref::<T>(),
            _ => None,
        }
    }

    fn describe(&self) -> Option<String> {
        match self {
            ShareItem::Text(text) | ShareItem::Url(text) => Some(text.clone()),
            ShareItem::File(path) => Some(path.to_string_lossy().into_owned()),
            ShareItem::Custom(_) => None,
        }
    }
}

impl fmt::Debug for ShareItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShareItem::Text(text) => f.debug_tuple("Text").field(text).finish(),
            ShareItem::Url(url) => f.debug_tuple("Url").field(url).finish(),
            ShareItem::File(path) => f.debug_tuple("File").field(path).finish(),
            ShareItem::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl PartialEq for ShareItem {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ShareItem::Text(a), ShareItem::Text(b)) => a == b,
            (ShareItem::Url(a), ShareItem::Url(b)) => a == b,
            (ShareItem::File(a), ShareItem::File(b)) => a == b,
            (ShareItem::Custom(a), ShareItem::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<String> for ShareItem {
    fn from(text: String) -> Self {
        ShareItem::Text(text)
    }
}

impl From<&str> for ShareItem {
    fn from(text: &str) -> Self {
        ShareItem::Text(text.to_string())
    }
}

impl From<PathBuf> for ShareItem {
    fn from(path: PathBuf) -> Self {
        ShareItem::File(path)
    }
}

/// Identifies a share destination or action, e.g. mail or a custom action.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DestinationKind(Cow<'static, str>);

impl DestinationKind {
    pub const MAIL: DestinationKind = DestinationKind(Cow::Borrowed("mail"));
    pub const MESSAGE: DestinationKind = DestinationKind(Cow::Borrowed("message"));
    pub const COPY_TO_PASTEBOARD: DestinationKind =
        DestinationKind(Cow::Borrowed("copy-to-pasteboard"));
    pub const PRINT: DestinationKind = DestinationKind(Cow::Borrowed("print"));
    pub const AIR_DROP: DestinationKind = DestinationKind(Cow::Borrowed("airdrop"));
    pub const SAVE_TO_FILES: DestinationKind = DestinationKind(Cow::Borrowed("save-to-files"));

    pub fn new(id: impl Into<String>) -> Self {
        DestinationKind(Cow::Owned(id.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DestinationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

bitflags! {
    /// Directions the popover arrow may point to when the picker is anchored.
    /// Passed through to the platform untouched.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct ArrowDirections: u8 {
        const UP = 1 << 0;
        const DOWN = 1 << 1;
        const LEFT = 1 << 2;
        const RIGHT = 1 << 3;
        const ANY = Self::UP.bits() | Self::DOWN.bits() | Self::LEFT.bits() | Self::RIGHT.bits();
    }
}

impl Default for ArrowDirections {
    fn default() -> Self {
        ArrowDirections::ANY
    }
}

/// What the picker reports when the user is done with it.
#[derive(Debug)]
pub struct ActivityOutcome {
    pub destination: Option<DestinationKind>,
    pub completed: bool,
    pub returned_items: Option<Vec<ShareItem>>,
    pub error: Option<Error>,
}

impl ActivityOutcome {
    pub fn cancelled() -> Self {
        Self {
            destination: None,
            completed: false,
            returned_items: None,
            error: None,
        }
    }

    pub fn completed(destination: DestinationKind) -> Self {
        Self {
            destination: Some(destination),
            completed: true,
            returned_items: None,
            error: None,
        }
    }

    pub fn failed(destination: Option<DestinationKind>, error: Error) -> Self {
        Self {
            destination,
            completed: false,
            returned_items: None,
            error: Some(error),
        }
    }

    pub fn with_returned_items(mut self, items: Vec<ShareItem>) -> Self {
        self.returned_items = Some(items);
        self
    }
}

/// Represents a file sent from the frontend as Base64 content.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedFile {
    pub data: String,
    pub name: String,
    pub mime_type: String,
}

/// Options accepted by the `present` command.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareOptions {
    pub text: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub files: Option<Vec<SharedFile>>,
    pub excluded_kinds: Option<Vec<DestinationKind>>,
    pub permitted_arrow_directions: Option<ArrowDirections>,
}

impl ShareOptions {
    /// Builds the request, writing any files into `files` under `owner`.
    ///
    /// On error some files may already be registered; the caller releases
    /// `owner`.
    pub fn into_request(self, files: &TempFileRegistry, owner: Uuid) -> Result<ShareRequest> {
        let mut items = Vec::new();
        if let Some(text) = self.text.filter(|text| !text.is_empty()) {
            items.push(ShareItem::Text(text));
        }
        if let Some(url) = self.url.filter(|url| !url.is_empty()) {
            items.push(ShareItem::Url(url));
        }
        for file in self.files.unwrap_or_default() {
            items.push(ShareItem::File(files.materialize(owner, &file)?));
        }
        if items.is_empty() {
            return Err(Error::InvalidArgs("No content provided to share.".to_string()));
        }
        let request = ShareRequest::from_items(items)
            .with_excluded_kinds(self.excluded_kinds.unwrap_or_default());
        Ok(match self.title.filter(|title| !title.is_empty()) {
            Some(title) => request.with_title(title),
            None => request,
        })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanShareResult {
    pub value: bool,
}

/// Event payload emitted to the window once its activity sheet is dismissed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareCompletedPayload {
    pub activity_type: Option<DestinationKind>,
    pub completed: bool,
    pub returned_items: Option<Vec<String>>,
    pub error: Option<String>,
}

impl From<&ActivityOutcome> for ShareCompletedPayload {
    fn from(outcome: &ActivityOutcome) -> Self {
        Self {
            activity_type: outcome.destination.clone(),
            completed: outcome.completed,
            returned_items: outcome
                .returned_items
                .as_ref()
                .map(|items| items.iter().filter_map(ShareItem::describe).collect()),
            error: outcome.error.as_ref().map(ToString::to_string),
        }
    }
}
