use std::cell::{Cell, RefCell};
use std::rc::Rc;

use log::{debug, trace};

use crate::binding::Binding;
use crate::models::ArrowDirections;
use crate::picker::{CompletionHandler, Picker, Presenter};
use crate::request::ShareRequest;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PresentationState {
    Idle,
    Presenting,
}

// What a completion reads when it fires. Shared with in-flight pickers so
// they see the binding and handler of the latest update, even after the
// controller itself is gone.
struct Wiring {
    request: Binding<ShareRequest>,
    completion: Option<CompletionHandler>,
}

/// Keeps a native picker on screen exactly while the bound request is set.
///
/// The host owns the [`Binding`]. Storing a request in it and then calling
/// [`update`](Self::update) (or [`update_state`](Self::update_state))
/// presents a picker, unless one is already showing. When the picker
/// finishes, the binding is reset to `None` first, then the completion
/// handler current at that moment receives the outcome.
///
/// Every method takes `&self`, so a completion handler may reconcile the
/// same controller again while the platform is still inside
/// [`Presenter::present`].
///
/// Dropping the controller does not dismiss an open picker.
pub struct PresentationController<P: Presenter> {
    presenter: P,
    permitted_directions: Cell<ArrowDirections>,
    wiring: Rc<RefCell<Wiring>>,
}

impl<P: Presenter> PresentationController<P> {
    pub fn new(
        presenter: P,
        request: Binding<ShareRequest>,
        permitted_directions: ArrowDirections,
        completion: Option<CompletionHandler>,
    ) -> Self {
        Self {
            presenter,
            permitted_directions: Cell::new(permitted_directions),
            wiring: Rc::new(RefCell::new(Wiring {
                request,
                completion,
            })),
        }
    }

    /// Call once the presenter is attached to its view.
    pub fn did_mount(&self) {
        self.update_state();
    }

    /// Reconfigures the controller with the host's current binding and
    /// handler, then synchronizes.
    pub fn update(&self, request: Binding<ShareRequest>, completion: Option<CompletionHandler>) {
        {
            let mut wiring = self.wiring.borrow_mut();
            wiring.request = request;
            wiring.completion = completion;
        }
        self.update_state();
    }

    /// Applies to the next presentation only.
    pub fn set_permitted_directions(&self, directions: ArrowDirections) {
        self.permitted_directions.set(directions);
    }

    pub fn permitted_directions(&self) -> ArrowDirections {
        self.permitted_directions.get()
    }

    pub fn request(&self) -> Binding<ShareRequest> {
        self.wiring.borrow().request.clone()
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn state(&self) -> PresentationState {
        if self.presenter.is_presenting() {
            PresentationState::Presenting
        } else {
            PresentationState::Idle
        }
    }

    /// Presents a picker if the binding holds a request and none is showing.
    pub fn update_state(&self) {
        let Some(request) = self.request().get() else {
            return;
        };
        if self.presenter.is_presenting() {
            trace!("activity sheet already presented, ignoring update");
            return;
        }

        let picker = self
            .presenter
            .make_picker(request.items(), request.actions());
        picker.set_title(request.title());
        picker.set_excluded_kinds(request.excluded_kinds());
        picker.set_permitted_directions(self.permitted_directions.get());
        picker.set_anchor(self.presenter.anchor());

        // The completion keeps its picker alive until it has run, however
        // early the presenter lets go of it.
        let retained = Rc::clone(&picker);
        let wiring = Rc::clone(&self.wiring);
        picker.set_completion(Box::new(move |outcome| {
            let (request, completion) = {
                let wiring = wiring.borrow();
                (wiring.request.clone(), wiring.completion.clone())
            };
            request.set(None);
            debug!("activity sheet dismissed");
            if let Some(completion) = completion {
                completion(outcome);
            }
            drop(retained);
        }));

        debug!(
            "presenting activity sheet with {} item(s) and {} custom action(s)",
            request.items().len(),
            request.actions().len()
        );
        self.presenter.present(picker);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::BTreeSet;
    use std::rc::{Rc, Weak};
    use std::sync::Arc;

    use super::*;
    use crate::action::{perform_action, CustomAction, FnAction};
    use crate::models::{ActivityOutcome, DestinationKind, ShareItem};
    use crate::picker::{Anchor, CompletionSlot, PickerCompletion};
    use crate::{share_request, Error};

    struct FakePicker {
        title: RefCell<Option<String>>,
        items: Vec<ShareItem>,
        actions: Vec<Arc<dyn CustomAction>>,
        excluded: RefCell<BTreeSet<DestinationKind>>,
        directions: Cell<ArrowDirections>,
        anchor: Cell<Option<Anchor>>,
        completion: CompletionSlot,
    }

    impl Picker for FakePicker {
        fn set_title(&self, title: Option<&str>) {
            *self.title.borrow_mut() = title.map(str::to_string);
        }

        fn set_excluded_kinds(&self, kinds: &BTreeSet<DestinationKind>) {
            *self.excluded.borrow_mut() = kinds.clone();
        }

        fn set_permitted_directions(&self, directions: ArrowDirections) {
            self.directions.set(directions);
        }

        fn set_anchor(&self, anchor: Anchor) {
            self.anchor.set(Some(anchor));
        }

        fn set_completion(&self, completion: PickerCompletion) {
            self.completion.register(completion);
        }
    }

    #[derive(Default)]
    struct Screen {
        // Fail the next presentation before it reaches the screen.
        fail_next: Cell<bool>,
        presented: RefCell<Option<Rc<FakePicker>>>,
        shown: RefCell<Vec<Weak<FakePicker>>>,
        shown_items: RefCell<Vec<Vec<ShareItem>>>,
    }

    // Stands in for the hosting view. Clones share one screen.
    #[derive(Clone, Default)]
    struct FakeHost {
        screen: Rc<Screen>,
    }

    impl FakeHost {
        fn shows(&self) -> usize {
            self.screen.shown.borrow().len()
        }

        fn last_shown(&self) -> Rc<FakePicker> {
            self.screen
                .shown
                .borrow()
                .last()
                .and_then(Weak::upgrade)
                .expect("a picker was shown")
        }

        // Dismisses the picker the way the platform does: off screen first,
        // then the completion.
        fn finish(&self, outcome: ActivityOutcome) {
            let picker = self
                .screen
                .presented
                .borrow_mut()
                .take()
                .expect("a picker is on screen");
            assert!(picker.completion.fire(outcome));
        }

        fn release_without_completing(&self) -> Weak<FakePicker> {
            let picker = self
                .screen
                .presented
                .borrow_mut()
                .take()
                .expect("a picker is on screen");
            Rc::downgrade(&picker)
        }
    }

    impl Presenter for FakeHost {
        type Picker = FakePicker;

        fn make_picker(
            &self,
            items: &[ShareItem],
            actions: &[Arc<dyn CustomAction>],
        ) -> Rc<FakePicker> {
            Rc::new(FakePicker {
                title: RefCell::new(None),
                items: items.to_vec(),
                actions: actions.to_vec(),
                excluded: RefCell::new(BTreeSet::new()),
                directions: Cell::new(ArrowDirections::ANY),
                anchor: Cell::new(None),
                completion: CompletionSlot::default(),
            })
        }

        fn anchor(&self) -> Anchor {
            Anchor::centered(320.0, 480.0)
        }

        fn is_presenting(&self) -> bool {
            self.screen.presented.borrow().is_some()
        }

        fn present(&self, picker: Rc<FakePicker>) {
            self.screen.shown.borrow_mut().push(Rc::downgrade(&picker));
            self.screen.shown_items.borrow_mut().push(picker.items.clone());
            if self.screen.fail_next.replace(false) {
                let error = Error::Unsupported("no share UI".to_string());
                assert!(picker.completion.fire(ActivityOutcome::failed(None, error)));
                return;
            }
            *self.screen.presented.borrow_mut() = Some(picker);
        }
    }

    type Calls = Rc<RefCell<Vec<(Option<DestinationKind>, bool, Option<Vec<ShareItem>>, bool)>>>;

    fn recording_handler() -> (CompletionHandler, Calls) {
        let calls: Calls = Rc::default();
        let sink = Rc::clone(&calls);
        let handler: CompletionHandler = Rc::new(move |outcome: ActivityOutcome| {
            sink.borrow_mut().push((
                outcome.destination,
                outcome.completed,
                outcome.returned_items,
                outcome.error.is_some(),
            ));
        });
        (handler, calls)
    }

    fn mounted(completion: Option<CompletionHandler>) -> (PresentationController<FakeHost>, FakeHost, Binding<ShareRequest>) {
        let host = FakeHost::default();
        let binding = Binding::empty();
        let controller = PresentationController::new(
            host.clone(),
            binding.clone(),
            ArrowDirections::ANY,
            completion,
        );
        controller.did_mount();
        (controller, host, binding)
    }

    #[test]
    fn idle_with_empty_binding_shows_nothing() {
        let (controller, host, _binding) = mounted(None);
        controller.update_state();
        controller.update_state();
        assert_eq!(host.shows(), 0);
        assert_eq!(controller.state(), PresentationState::Idle);
    }

    #[test]
    fn setting_a_request_shows_exactly_one_picker() {
        let (controller, host, binding) = mounted(None);

        binding.set(Some(share_request!["A"]));
        controller.update(binding.clone(), None);

        assert_eq!(host.shows(), 1);
        assert_eq!(
            host.screen.shown_items.borrow()[0],
            vec![ShareItem::from("A")]
        );
        assert_eq!(controller.state(), PresentationState::Presenting);
    }

    #[test]
    fn repeated_updates_never_stack_pickers() {
        let (controller, host, binding) = mounted(None);

        for text in ["A", "B", "C"] {
            binding.set(Some(share_request![text]));
            controller.update(binding.clone(), None);
            controller.update_state();
        }

        assert_eq!(host.shows(), 1);
        assert_eq!(
            host.screen.shown_items.borrow()[0],
            vec![ShareItem::from("A")]
        );
    }

    #[test]
    fn completion_clears_binding_before_handler_runs() {
        let host = FakeHost::default();
        let binding: Binding<ShareRequest> = Binding::empty();
        let seen_while_handling = Rc::new(Cell::new(None));
        let (recorder, calls) = recording_handler();
        let observer = binding.clone();
        let seen = Rc::clone(&seen_while_handling);
        let handler: CompletionHandler = Rc::new(move |outcome| {
            seen.set(Some(observer.is_some()));
            recorder(outcome);
        });
        let controller = PresentationController::new(
            host.clone(),
            binding.clone(),
            ArrowDirections::ANY,
            Some(handler),
        );

        binding.set(Some(share_request!["A"]));
        controller.update_state();
        host.finish(ActivityOutcome::completed(DestinationKind::MAIL));

        assert_eq!(seen_while_handling.get(), Some(false));
        assert!(!binding.is_some());
        assert_eq!(
            *calls.borrow(),
            vec![(Some(DestinationKind::MAIL), true, None, false)]
        );
        assert_eq!(controller.state(), PresentationState::Idle);
    }

    #[test]
    fn handler_swapped_while_presenting_receives_completion() {
        let (old, old_calls) = recording_handler();
        let (new, new_calls) = recording_handler();
        let (controller, host, binding) = mounted(Some(old));

        binding.set(Some(share_request!["A"]));
        controller.update_state();
        controller.update(binding.clone(), Some(new));
        host.finish(ActivityOutcome::cancelled());

        assert!(old_calls.borrow().is_empty());
        assert_eq!(*new_calls.borrow(), vec![(None, false, None, false)]);
    }

    #[test]
    fn new_request_after_completion_shows_again() {
        let (controller, host, binding) = mounted(None);

        binding.set(Some(share_request!["A"]));
        controller.update(binding.clone(), None);
        host.finish(ActivityOutcome::cancelled());
        assert_eq!(controller.state(), PresentationState::Idle);

        binding.set(Some(share_request!["B"]));
        controller.update(binding.clone(), None);
        controller.update_state();

        assert_eq!(host.shows(), 2);
        assert_eq!(
            host.screen.shown_items.borrow()[1],
            vec![ShareItem::from("B")]
        );
    }

    #[test]
    fn picker_is_configured_from_request_and_presenter() {
        let host = FakeHost::default();
        let binding = Binding::new(Some(
            share_request!["A"]
                .with_title("Notes")
                .with_excluded_kinds([DestinationKind::PRINT]),
        ));
        let controller = PresentationController::new(
            host.clone(),
            binding,
            ArrowDirections::UP | ArrowDirections::DOWN,
            None,
        );
        controller.did_mount();

        let picker = host.last_shown();
        assert_eq!(picker.title.borrow().as_deref(), Some("Notes"));
        assert!(picker.excluded.borrow().contains(&DestinationKind::PRINT));
        assert_eq!(
            picker.directions.get(),
            ArrowDirections::UP | ArrowDirections::DOWN
        );
        assert_eq!(picker.anchor.get(), Some(Anchor::centered(320.0, 480.0)));
        assert!(picker.completion.is_registered());
    }

    #[test]
    fn directions_change_applies_to_next_presentation() {
        let (controller, host, binding) = mounted(None);
        controller.set_permitted_directions(ArrowDirections::LEFT);
        assert_eq!(controller.permitted_directions(), ArrowDirections::LEFT);

        binding.set(Some(share_request!["A"]));
        controller.update_state();

        assert_eq!(host.last_shown().directions.get(), ArrowDirections::LEFT);
    }

    #[test]
    fn completion_keeps_picker_alive_after_presenter_releases_it() {
        let (controller, host, binding) = mounted(None);
        binding.set(Some(share_request!["A"]));
        controller.update_state();

        let released = host.release_without_completing();
        let picker = released
            .upgrade()
            .expect("completion still holds the picker");
        assert!(picker.completion.fire(ActivityOutcome::cancelled()));
        assert!(!binding.is_some());

        drop(picker);
        assert!(released.upgrade().is_none());
    }

    #[test]
    fn completion_after_unmount_still_clears_binding() {
        let (handler, calls) = recording_handler();
        let (controller, host, binding) = mounted(Some(handler));
        binding.set(Some(share_request!["A"]));
        controller.update_state();

        drop(controller);
        host.finish(ActivityOutcome::completed(DestinationKind::MESSAGE));

        assert!(!binding.is_some());
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn external_reset_while_presenting_does_not_dismiss() {
        let (controller, host, binding) = mounted(None);
        binding.set(Some(share_request!["A"]));
        controller.update_state();

        binding.set(None);
        controller.update(binding.clone(), None);

        assert_eq!(controller.state(), PresentationState::Presenting);
        host.finish(ActivityOutcome::cancelled());
        assert_eq!(host.shows(), 1);
    }

    #[test]
    fn handler_may_present_again_from_completion() {
        let host = FakeHost::default();
        let binding: Binding<ShareRequest> = Binding::empty();
        let controller = Rc::new(RefCell::new(None::<PresentationController<FakeHost>>));
        let again = binding.clone();
        let weak_controller = Rc::downgrade(&controller);
        let handler: CompletionHandler = Rc::new(move |outcome: ActivityOutcome| {
            if outcome.destination == Some(DestinationKind::COPY_TO_PASTEBOARD) {
                again.set(Some(share_request!["follow-up"]));
                if let Some(controller) = weak_controller.upgrade() {
                    if let Some(controller) = controller.borrow().as_ref() {
                        controller.update_state();
                    }
                }
            }
        });
        *controller.borrow_mut() = Some(PresentationController::new(
            host.clone(),
            binding.clone(),
            ArrowDirections::ANY,
            Some(handler),
        ));

        binding.set(Some(share_request!["A"]));
        controller.borrow().as_ref().unwrap().update_state();
        host.finish(ActivityOutcome::completed(DestinationKind::COPY_TO_PASTEBOARD));

        assert_eq!(host.shows(), 2);
        assert!(binding.is_some());
        assert!(host.is_presenting());
    }

    #[test]
    fn completion_fired_inside_present_clears_binding() {
        let (handler, calls) = recording_handler();
        let (controller, host, binding) = mounted(Some(handler));
        host.screen.fail_next.set(true);

        binding.set(Some(share_request!["A"]));
        controller.update_state();

        assert!(!binding.is_some());
        assert_eq!(*calls.borrow(), vec![(None, false, None, true)]);
        assert_eq!(controller.state(), PresentationState::Idle);
    }

    #[test]
    fn handler_may_reconfigure_while_present_is_running() {
        let host = FakeHost::default();
        let binding: Binding<ShareRequest> = Binding::empty();
        let controller = Rc::new(PresentationController::new(
            host.clone(),
            binding.clone(),
            ArrowDirections::ANY,
            None,
        ));
        let retries = Rc::new(Cell::new(0));
        let handler: CompletionHandler = {
            let controller = Rc::downgrade(&controller);
            let binding = binding.clone();
            let retries = Rc::clone(&retries);
            Rc::new(move |outcome: ActivityOutcome| {
                if outcome.error.is_none() {
                    return;
                }
                retries.set(retries.get() + 1);
                let Some(controller) = controller.upgrade() else {
                    return;
                };
                binding.set(Some(share_request!["retry"]));
                controller.set_permitted_directions(ArrowDirections::DOWN);
                controller.update(binding.clone(), None);
            })
        };
        controller.update(binding.clone(), Some(handler));

        host.screen.fail_next.set(true);
        binding.set(Some(share_request!["A"]));
        controller.update_state();

        assert_eq!(retries.get(), 1);
        assert_eq!(host.shows(), 2);
        assert!(binding.is_some());
        assert_eq!(host.last_shown().directions.get(), ArrowDirections::DOWN);
        assert_eq!(controller.state(), PresentationState::Presenting);
    }

    #[test]
    fn custom_action_outcome_reaches_handler() {
        let (handler, calls) = recording_handler();
        let (controller, host, binding) = mounted(Some(handler));
        let pin: Arc<dyn CustomAction> = Arc::new(FnAction::new(
            DestinationKind::new("pin"),
            "Pin",
            |items| Ok(Some(items.to_vec())),
        ));
        binding.set(Some(share_request!["A"].with_actions([pin])));
        controller.update_state();

        let picker = host.last_shown();
        let outcome = perform_action(picker.actions[0].as_ref(), &picker.items);
        host.finish(outcome);

        assert_eq!(
            *calls.borrow(),
            vec![(
                Some(DestinationKind::new("pin")),
                true,
                Some(vec![ShareItem::from("A")]),
                false
            )]
        );
    }

    #[test]
    fn platform_error_is_passed_through() {
        let (handler, calls) = recording_handler();
        let (controller, host, binding) = mounted(Some(handler));
        binding.set(Some(share_request!["A"]));
        controller.update_state();

        host.finish(ActivityOutcome::failed(
            None,
            Error::NativeApi("presentation failed".to_string()),
        ));

        assert_eq!(*calls.borrow(), vec![(None, false, None, true)]);
        assert!(!binding.is_some());
    }
}
