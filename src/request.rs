use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::action::CustomAction;
use crate::models::{DestinationKind, ShareItem};

/// What to share: items, extra actions, and destinations to hide.
///
/// A request is immutable once built. To change what is shared, build a new
/// request and store it in the binding.
///
/// There are two ways to build one. [`share_request!`](crate::share_request)
/// takes a short, fixed list of items. [`ShareRequest::from_items`] takes a
/// sequence the caller already holds. Passing a `Vec` to the macro does not
/// compile, so a sequence is never wrapped up as a single item.
#[derive(Clone, Default)]
pub struct ShareRequest {
    title: Option<String>,
    items: Vec<ShareItem>,
    actions: Vec<Arc<dyn CustomAction>>,
    excluded_kinds: BTreeSet<DestinationKind>,
}

impl ShareRequest {
    pub fn from_items<I>(items: I) -> Self
    where
        I: IntoIterator<Item = ShareItem>,
    {
        Self {
            title: None,
            items: items.into_iter().collect(),
            actions: Vec::new(),
            excluded_kinds: BTreeSet::new(),
        }
    }

    pub fn with_title(self, title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..self
        }
    }

    pub fn with_actions<I>(self, actions: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn CustomAction>>,
    {
        Self {
            actions: actions.into_iter().collect(),
            ..self
        }
    }

    pub fn with_excluded_kinds<I>(self, kinds: I) -> Self
    where
        I: IntoIterator<Item = DestinationKind>,
    {
        Self {
            excluded_kinds: kinds.into_iter().collect(),
            ..self
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn items(&self) -> &[ShareItem] {
        &self.items
    }

    pub fn actions(&self) -> &[Arc<dyn CustomAction>] {
        &self.actions
    }

    pub fn excluded_kinds(&self) -> &BTreeSet<DestinationKind> {
        &self.excluded_kinds
    }
}

impl fmt::Debug for ShareRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let actions: Vec<&str> = self.actions.iter().map(|action| action.title()).collect();
        f.debug_struct("ShareRequest")
            .field("title", &self.title)
            .field("items", &self.items)
            .field("actions", &actions)
            .field("excluded_kinds", &self.excluded_kinds)
            .finish()
    }
}

/// Builds a [`ShareRequest`] from a fixed list of items, converting each
/// one with `ShareItem::from`.
///
/// ```
/// use tauri_plugin_activity_sheet::share_request;
///
/// let request = share_request!["Check this out", String::from("https://tauri.app")];
/// assert_eq!(request.items().len(), 2);
/// ```
#[macro_export]
macro_rules! share_request {
    ($($item:expr),* $(,)?) => {
        {
            let items: ::std::vec::Vec<$crate::ShareItem> =
                ::std::vec![$($crate::ShareItem::from($item)),*];
            $crate::ShareRequest::from_items(items)
        }
    };
}
