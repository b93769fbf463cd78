use crate::models::{ActivityOutcome, DestinationKind, ShareItem};
use crate::Result;

/// An application-defined action offered next to the system destinations.
pub trait CustomAction: Send + Sync {
    /// Reported back as the outcome's destination when this action runs.
    fn kind(&self) -> DestinationKind;

    fn title(&self) -> &str;

    /// Name or path of the icon shown for the action, if any.
    fn icon(&self) -> Option<&str> {
        None
    }

    fn can_perform(&self, items: &[ShareItem]) -> bool {
        !items.is_empty()
    }

    /// Runs the action. `Ok(Some(..))` hands items back to the caller.
    fn perform(&self, items: &[ShareItem]) -> Result<Option<Vec<ShareItem>>>;
}

type PerformFn = dyn Fn(&[ShareItem]) -> Result<Option<Vec<ShareItem>>> + Send + Sync;

/// A [`CustomAction`] backed by a closure.
pub struct FnAction {
    kind: DestinationKind,
    title: String,
    icon: Option<String>,
    perform: Box<PerformFn>,
}

impl FnAction {
    pub fn new<F>(kind: DestinationKind, title: impl Into<String>, perform: F) -> Self
    where
        F: Fn(&[ShareItem]) -> Result<Option<Vec<ShareItem>>> + Send + Sync + 'static,
    {
        Self {
            kind,
            title: title.into(),
            icon: None,
            perform: Box::new(perform),
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

impl CustomAction for FnAction {
    fn kind(&self) -> DestinationKind {
        self.kind.clone()
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    fn perform(&self, items: &[ShareItem]) -> Result<Option<Vec<ShareItem>>> {
        (self.perform)(items)
    }
}

/// Runs `action` on `items` and describes the result the way a picker
/// reports it. Pickers call this when the user picks a custom action.
pub fn perform_action(action: &dyn CustomAction, items: &[ShareItem]) -> ActivityOutcome {
    let kind = action.kind();
    match action.perform(items) {
        Ok(returned) => ActivityOutcome {
            destination: Some(kind),
            completed: true,
            returned_items: returned,
            error: None,
        },
        Err(err) => ActivityOutcome::failed(Some(kind), err),
    }
}
