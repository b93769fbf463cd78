use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;
use std::sync::Arc;

use log::{debug, error};
use tauri::{Runtime, Window};
use uuid::Uuid;

use crate::action::CustomAction;
use crate::config::DismissTiming;
use crate::models::{ActivityOutcome, ArrowDirections, DestinationKind, ShareItem};
use crate::picker::{Anchor, CompletionSlot, Picker, PickerCompletion, Presenter};

#[cfg(target_os = "windows")]
mod windows;
#[cfg(target_os = "windows")]
use self::windows as native;

#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "macos")]
use self::macos as native;

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
mod unsupported;
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
use self::unsupported as native;

#[cfg(target_os = "windows")]
mod focus;

pub use native::can_share;

trait OnScreen {
    fn finish(&self, outcome: ActivityOutcome);
}

// Pickers currently shown, by window label. This is what the platform
// "presents"; a picker leaves the map right before its completion fires.
thread_local! {
    static ON_SCREEN: RefCell<HashMap<String, (Uuid, Rc<dyn OnScreen>)>> = RefCell::new(HashMap::new());
}

/// Presents native pickers from a Tauri window.
pub(crate) struct WindowPresenter<R: Runtime> {
    window: Window<R>,
    timing: DismissTiming,
}

impl<R: Runtime> WindowPresenter<R> {
    pub(crate) fn new(window: Window<R>, timing: DismissTiming) -> Self {
        Self { window, timing }
    }
}

impl<R: Runtime> Presenter for WindowPresenter<R> {
    type Picker = NativePicker<R>;

    fn make_picker(
        &self,
        items: &[ShareItem],
        actions: &[Arc<dyn CustomAction>],
    ) -> Rc<NativePicker<R>> {
        if !actions.is_empty() {
            debug!(
                "{} custom action(s) are not offered by the desktop share UI",
                actions.len()
            );
        }
        Rc::new(NativePicker {
            id: Uuid::new_v4(),
            window: self.window.clone(),
            timing: self.timing,
            title: RefCell::new(None),
            items: items.to_vec(),
            excluded_kinds: RefCell::new(BTreeSet::new()),
            directions: Cell::new(ArrowDirections::ANY),
            anchor: Cell::new(Anchor::default()),
            completion: CompletionSlot::default(),
            handle: RefCell::new(None),
        })
    }

    fn anchor(&self) -> Anchor {
        let logical = self.window.inner_size().and_then(|size| {
            let scale = self.window.scale_factor()?;
            Ok(size.to_logical::<f64>(scale))
        });
        match logical {
            Ok(size) => Anchor::centered(size.width, size.height),
            Err(_) => Anchor::default(),
        }
    }

    fn is_presenting(&self) -> bool {
        ON_SCREEN.with(|shown| shown.borrow().contains_key(self.window.label()))
    }

    fn present(&self, picker: Rc<NativePicker<R>>) {
        let label = self.window.label().to_string();
        let on_screen: Rc<dyn OnScreen> = picker.clone();
        ON_SCREEN.with(|shown| {
            shown.borrow_mut().insert(label.clone(), (picker.id, on_screen));
        });

        match native::show(&picker) {
            Ok(handle) => *picker.handle.borrow_mut() = Some(handle),
            Err(err) => {
                debug!("native share UI could not be shown for window {}", label);
                finish_later(&self.window, picker.id, ActivityOutcome::failed(None, err));
            }
        }
    }
}

/// One presentation of the desktop share UI.
pub(crate) struct NativePicker<R: Runtime> {
    id: Uuid,
    #[cfg_attr(not(any(target_os = "windows", target_os = "macos")), allow(dead_code))]
    window: Window<R>,
    #[cfg_attr(not(target_os = "windows"), allow(dead_code))]
    timing: DismissTiming,
    #[cfg_attr(not(any(target_os = "windows", target_os = "macos")), allow(dead_code))]
    title: RefCell<Option<String>>,
    items: Vec<ShareItem>,
    #[cfg_attr(not(target_os = "macos"), allow(dead_code))]
    excluded_kinds: RefCell<BTreeSet<DestinationKind>>,
    #[cfg_attr(not(target_os = "macos"), allow(dead_code))]
    directions: Cell<ArrowDirections>,
    #[cfg_attr(not(target_os = "macos"), allow(dead_code))]
    anchor: Cell<Anchor>,
    completion: CompletionSlot,
    // Native objects that must outlive the share UI.
    handle: RefCell<Option<native::NativeHandle>>,
}

// Each platform reads only the settings its share UI supports.
impl<R: Runtime> NativePicker<R> {
    #[cfg(any(target_os = "windows", target_os = "macos"))]
    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    #[cfg(any(target_os = "windows", target_os = "macos"))]
    pub(crate) fn window(&self) -> &Window<R> {
        &self.window
    }

    #[cfg(target_os = "windows")]
    pub(crate) fn timing(&self) -> DismissTiming {
        self.timing
    }

    #[cfg(any(target_os = "windows", target_os = "macos"))]
    pub(crate) fn title(&self) -> Option<String> {
        self.title.borrow().clone()
    }

    pub(crate) fn items(&self) -> &[ShareItem] {
        &self.items
    }

    #[cfg(target_os = "macos")]
    pub(crate) fn excluded_kinds(&self) -> BTreeSet<DestinationKind> {
        self.excluded_kinds.borrow().clone()
    }

    #[cfg(target_os = "macos")]
    pub(crate) fn permitted_directions(&self) -> ArrowDirections {
        self.directions.get()
    }

    #[cfg(target_os = "macos")]
    pub(crate) fn anchor(&self) -> Anchor {
        self.anchor.get()
    }
}

impl<R: Runtime> Picker for NativePicker<R> {
    fn set_title(&self, title: Option<&str>) {
        *self.title.borrow_mut() = title.map(str::to_string);
    }

    fn set_excluded_kinds(&self, kinds: &BTreeSet<DestinationKind>) {
        *self.excluded_kinds.borrow_mut() = kinds.clone();
    }

    fn set_permitted_directions(&self, directions: ArrowDirections) {
        self.directions.set(directions);
    }

    fn set_anchor(&self, anchor: Anchor) {
        self.anchor.set(anchor);
    }

    fn set_completion(&self, completion: PickerCompletion) {
        self.completion.register(completion);
    }
}

impl<R: Runtime> OnScreen for NativePicker<R> {
    fn finish(&self, outcome: ActivityOutcome) {
        self.handle.borrow_mut().take();
        self.completion.fire(outcome);
    }
}

/// Finishes picker `id` on the main thread. Callable from any thread.
pub(crate) fn finish_later<R: Runtime>(window: &Window<R>, id: Uuid, outcome: ActivityOutcome) {
    let label = window.label().to_string();
    if let Err(e) = window.run_on_main_thread(move || finish(&label, id, outcome)) {
        error!("failed to dispatch activity sheet completion: {}", e);
    }
}

fn finish(label: &str, id: Uuid, outcome: ActivityOutcome) {
    let picker = ON_SCREEN.with(|shown| {
        let mut shown = shown.borrow_mut();
        let is_current = shown
            .get(label)
            .map_or(false, |(current, _)| *current == id);
        if is_current {
            shown.remove(label).map(|(_, picker)| picker)
        } else {
            None
        }
    });
    match picker {
        Some(picker) => picker.finish(outcome),
        None => debug!("ignoring completion of stale picker {}", id),
    }
}
