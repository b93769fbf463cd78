//! The platform side of a presentation: the picker itself and the view that
//! presents it.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;
use std::sync::Arc;

use crate::action::CustomAction;
use crate::models::{ActivityOutcome, ArrowDirections, DestinationKind, ShareItem};

/// The caller's completion callback.
pub type CompletionHandler = Rc<dyn Fn(ActivityOutcome)>;

/// The single callback a picker fires when it is done.
pub type PickerCompletion = Box<dyn FnOnce(ActivityOutcome)>;

/// Rectangle, in the presenting view's logical coordinates, the picker is
/// anchored to.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Anchor {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Anchor {
    /// A zero-sized anchor at the center of a `width` x `height` view.
    pub fn centered(width: f64, height: f64) -> Self {
        Self {
            x: width / 2.0,
            y: height / 2.0,
            width: 0.0,
            height: 0.0,
        }
    }
}

/// A native share picker, configured once before it is presented.
pub trait Picker {
    /// Subject shown by the share UI. Pickers without one ignore it.
    fn set_title(&self, _title: Option<&str>) {}

    fn set_excluded_kinds(&self, kinds: &BTreeSet<DestinationKind>);

    fn set_permitted_directions(&self, directions: ArrowDirections);

    fn set_anchor(&self, anchor: Anchor);

    /// Registers the completion. A later call replaces the earlier one.
    fn set_completion(&self, completion: PickerCompletion);
}

/// The view a picker is presented from.
pub trait Presenter {
    type Picker: Picker + 'static;

    fn make_picker(
        &self,
        items: &[ShareItem],
        actions: &[Arc<dyn CustomAction>],
    ) -> Rc<Self::Picker>;

    fn anchor(&self) -> Anchor;

    /// Whether a picker is on screen right now.
    ///
    /// Must already be `false` when a picker fires its completion.
    fn is_presenting(&self) -> bool;

    fn present(&self, picker: Rc<Self::Picker>);
}

/// Holds a picker's registered completion until it fires.
#[derive(Default)]
pub struct CompletionSlot {
    completion: RefCell<Option<PickerCompletion>>,
}

impl CompletionSlot {
    pub fn register(&self, completion: PickerCompletion) {
        *self.completion.borrow_mut() = Some(completion);
    }

    pub fn is_registered(&self) -> bool {
        self.completion.borrow().is_some()
    }

    /// Fires the completion at most once. Returns whether one was registered.
    pub fn fire(&self, outcome: ActivityOutcome) -> bool {
        let completion = self.completion.borrow_mut().take();
        match completion {
            Some(completion) => {
                completion(outcome);
                true
            }
            None => false,
        }
    }
}
