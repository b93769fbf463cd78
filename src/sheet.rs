use std::cell::RefCell;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::{mpsc, Arc};

use log::{debug, warn};
use tauri::{Emitter, Runtime, Window, WindowEvent};
use uuid::Uuid;

use crate::binding::Binding;
use crate::config::{Config, DismissTiming};
use crate::controller::PresentationController;
use crate::models::{
    ActivityOutcome, ArrowDirections, CanShareResult, ShareCompletedPayload, ShareOptions,
};
use crate::picker::{CompletionHandler, Presenter};
use crate::platform::{self, WindowPresenter};
use crate::state::TempFileRegistry;
use crate::{Error, Result, ShareRequest};

/// Emitted to the presenting window when its activity sheet is dismissed.
pub const COMPLETED_EVENT: &str = "activity-sheet://completed";

// One mounted controller per window, living on the main thread. Callers
// clone a session out before driving it, so a completion that fires while
// the platform is presenting can reach the map again.
thread_local! {
    static SESSIONS: RefCell<HashMap<String, Rc<dyn MountedSheet>>> = RefCell::new(HashMap::new());
}

trait MountedSheet {
    fn request(&self) -> Binding<ShareRequest>;
    fn update(&self, directions: ArrowDirections, completion: CompletionHandler);
}

impl<P: Presenter> MountedSheet for PresentationController<P> {
    fn request(&self) -> Binding<ShareRequest> {
        PresentationController::request(self)
    }

    fn update(&self, directions: ArrowDirections, completion: CompletionHandler) {
        self.set_permitted_directions(directions);
        let request = PresentationController::request(self);
        PresentationController::update(self, request, Some(completion));
    }
}

/// Access to the activity sheet APIs.
pub struct ActivitySheet<R: Runtime> {
    config: Config,
    files: Arc<TempFileRegistry>,
    _runtime: PhantomData<fn() -> R>,
}

impl<R: Runtime> ActivitySheet<R> {
    pub(crate) fn new(config: Config) -> Self {
        let files = Arc::new(TempFileRegistry::in_temp_dir(&config.temp_dir_name));
        Self {
            config,
            files,
            _runtime: PhantomData,
        }
    }

    /// Presents the sheet for frontend options and reports the outcome as a
    /// [`COMPLETED_EVENT`] on `window`.
    pub fn present(&self, window: Window<R>, options: ShareOptions) -> Result<()> {
        let owner = Uuid::new_v4();
        let directions = options.permitted_arrow_directions;
        let request = match options.into_request(&self.files, owner) {
            Ok(request) => request,
            Err(err) => {
                self.files.release(owner);
                return Err(err);
            }
        };

        let files = Arc::clone(&self.files);
        let target = window.clone();
        let result = self.present_with(window, request, directions, move |outcome| {
            files.release(owner);
            let payload = ShareCompletedPayload::from(&outcome);
            if let Err(e) = target.emit(COMPLETED_EVENT, payload) {
                warn!("failed to emit {}: {}", COMPLETED_EVENT, e);
            }
        });
        if result.is_err() {
            self.files.release(owner);
        }
        result
    }

    /// Presents `request` on `window` and calls `on_complete` on the main
    /// thread once the sheet is dismissed.
    ///
    /// Fails with [`Error::Busy`] while the window's previous request is
    /// still bound.
    pub fn present_with<F>(
        &self,
        window: Window<R>,
        request: ShareRequest,
        directions: Option<ArrowDirections>,
        on_complete: F,
    ) -> Result<()>
    where
        F: Fn(ActivityOutcome) + Send + 'static,
    {
        let directions = directions.unwrap_or(self.config.default_arrow_directions);
        let timing = self.config.dismiss_timing();
        let (tx, rx) = mpsc::channel();
        let target = window.clone();

        window.run_on_main_thread(move || {
            let completion: CompletionHandler = Rc::new(on_complete);
            let result = present_on_main_thread(&target, request, directions, timing, completion);
            tx.send(result).ok();
        })?;

        rx.recv()
            .map_err(|_| Error::NativeApi("Failed to receive result from main thread".to_string()))?
    }

    pub fn can_share(&self) -> Result<CanShareResult> {
        platform::can_share()
    }

    pub fn cleanup(&self) -> Result<()> {
        self.files.cleanup_all_managed_files();
        Ok(())
    }
}

fn present_on_main_thread<R: Runtime>(
    window: &Window<R>,
    request: ShareRequest,
    directions: ArrowDirections,
    timing: DismissTiming,
    completion: CompletionHandler,
) -> Result<()> {
    let label = window.label().to_string();
    let session = session_for(&label, || mount(window, directions, timing));
    present_in(session.as_ref(), &label, request, directions, completion)
}

fn present_in(
    session: &dyn MountedSheet,
    label: &str,
    request: ShareRequest,
    directions: ArrowDirections,
    completion: CompletionHandler,
) -> Result<()> {
    let binding = session.request();
    if binding.is_some() {
        return Err(Error::Busy(label.to_string()));
    }
    binding.set(Some(request));
    session.update(directions, completion);
    Ok(())
}

fn session_for(
    label: &str,
    mount: impl FnOnce() -> Rc<dyn MountedSheet>,
) -> Rc<dyn MountedSheet> {
    if let Some(session) = SESSIONS.with(|sessions| sessions.borrow().get(label).cloned()) {
        return session;
    }
    let session = mount();
    SESSIONS.with(|sessions| {
        sessions
            .borrow_mut()
            .insert(label.to_string(), Rc::clone(&session))
    });
    session
}

// An open picker is left to finish on its own.
fn unmount(label: &str) {
    let removed = SESSIONS.with(|sessions| sessions.borrow_mut().remove(label));
    if removed.is_some() {
        debug!("unmounted activity sheet for window {}", label);
    }
}

fn mount<R: Runtime>(
    window: &Window<R>,
    directions: ArrowDirections,
    timing: DismissTiming,
) -> Rc<dyn MountedSheet> {
    let label = window.label().to_string();
    debug!("mounting activity sheet for window {}", label);
    window.on_window_event(move |event| {
        if let WindowEvent::Destroyed = event {
            unmount(&label);
        }
    });

    let controller = PresentationController::new(
        WindowPresenter::new(window.clone(), timing),
        Binding::empty(),
        directions,
        None,
    );
    controller.did_mount();
    Rc::new(controller)
}
