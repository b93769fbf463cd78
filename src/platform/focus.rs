//! Watches a window for the end of a system share UI that takes focus away
//! from it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use log::debug;
use tauri::{Runtime, Window, WindowEvent};
use uuid::Uuid;

use crate::config::DismissTiming;
use crate::{Error, Result};

type OnDismissed = Box<dyn FnOnce() + Send>;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Dismissal {
    FocusReturned,
    WindowDestroyed,
    NeverOpened,
    TimedOut,
}

struct Watched {
    picker: Uuid,
    // Set once the window lost focus to the share UI.
    share_ui_open: bool,
    on_dismissed: OnDismissed,
}

struct Finished {
    picker: Uuid,
    reason: Dismissal,
    on_dismissed: OnDismissed,
}

/// The share UI presentation a window is waiting on, if any.
#[derive(Default)]
struct DismissalWatch {
    watched: Option<Watched>,
}

impl DismissalWatch {
    /// Hands `on_dismissed` back when another picker is still watched.
    fn watch(&mut self, picker: Uuid, on_dismissed: OnDismissed) -> std::result::Result<(), OnDismissed> {
        if self.watched.is_some() {
            return Err(on_dismissed);
        }
        self.watched = Some(Watched {
            picker,
            share_ui_open: false,
            on_dismissed,
        });
        Ok(())
    }

    fn focus_changed(&mut self, focused: bool) -> Option<Finished> {
        let watched = self.watched.as_mut()?;
        match (watched.share_ui_open, focused) {
            (false, false) => {
                watched.share_ui_open = true;
                None
            }
            (true, true) => self.finish(Dismissal::FocusReturned),
            _ => None,
        }
    }

    fn destroyed(&mut self) -> Option<Finished> {
        self.finish(Dismissal::WindowDestroyed)
    }

    // Timers belong to one picker and never end a later watch.
    fn grace_elapsed(&mut self, picker: Uuid) -> Option<Finished> {
        match &self.watched {
            Some(watched) if watched.picker == picker && !watched.share_ui_open => {
                self.finish(Dismissal::NeverOpened)
            }
            _ => None,
        }
    }

    fn timed_out(&mut self, picker: Uuid) -> Option<Finished> {
        match &self.watched {
            Some(watched) if watched.picker == picker => self.finish(Dismissal::TimedOut),
            _ => None,
        }
    }

    fn is_watching(&self, picker: Uuid) -> bool {
        self.watched
            .as_ref()
            .map_or(false, |watched| watched.picker == picker)
    }

    fn finish(&mut self, reason: Dismissal) -> Option<Finished> {
        self.watched.take().map(|watched| Finished {
            picker: watched.picker,
            reason,
            on_dismissed: watched.on_dismissed,
        })
    }
}

/// Runs `on_dismissed` once the share UI shown for `picker` is gone: focus
/// left `window` and came back, the window was destroyed, focus never left
/// within the grace period, or the timeout passed.
pub(crate) fn watch_dismissal<R, F>(
    window: &Window<R>,
    picker: Uuid,
    timing: DismissTiming,
    on_dismissed: F,
) -> Result<()>
where
    R: Runtime,
    F: FnOnce() + Send + 'static,
{
    let watch = watch_for(window)?;
    if lock(&watch).watch(picker, Box::new(on_dismissed)).is_err() {
        return Err(Error::Busy(window.label().to_string()));
    }

    std::thread::spawn(move || {
        let grace = timing.grace.min(timing.timeout);
        std::thread::sleep(grace);
        if settle(&watch, |watch| watch.grace_elapsed(picker)) || !lock(&watch).is_watching(picker) {
            return;
        }
        std::thread::sleep(timing.timeout - grace);
        settle(&watch, |watch| watch.timed_out(picker));
    });
    Ok(())
}

// Applies `event` and runs the dismissal it produced, outside the lock.
fn settle(
    watch: &Mutex<DismissalWatch>,
    event: impl FnOnce(&mut DismissalWatch) -> Option<Finished>,
) -> bool {
    let finished = event(&mut lock(watch));
    match finished {
        Some(finished) => {
            debug!(
                "share UI for picker {} dismissed: {:?}",
                finished.picker, finished.reason
            );
            (finished.on_dismissed)();
            true
        }
        None => false,
    }
}

fn lock(watch: &Mutex<DismissalWatch>) -> MutexGuard<'_, DismissalWatch> {
    watch.lock().unwrap_or_else(PoisonError::into_inner)
}

// The first watch for a window also installs its event listener.
fn watch_for<R: Runtime>(window: &Window<R>) -> Result<Arc<Mutex<DismissalWatch>>> {
    let label = window.label().to_string();
    let mut map = watches()
        .lock()
        .map_err(|_| Error::NativeApi("Dismissal watch registry poisoned.".to_string()))?;
    if let Some(watch) = map.get(&label) {
        return Ok(Arc::clone(watch));
    }

    let watch = Arc::new(Mutex::new(DismissalWatch::default()));
    map.insert(label.clone(), Arc::clone(&watch));
    let listener = Arc::clone(&watch);
    window.on_window_event(move |event| match event {
        WindowEvent::Focused(focused) => {
            settle(&listener, |watch| watch.focus_changed(*focused));
        }
        WindowEvent::Destroyed => {
            settle(&listener, DismissalWatch::destroyed);
            if let Ok(mut map) = watches().lock() {
                map.remove(&label);
            }
        }
        _ => {}
    });
    Ok(watch)
}

fn watches() -> &'static Mutex<HashMap<String, Arc<Mutex<DismissalWatch>>>> {
    static WATCHES: OnceLock<Mutex<HashMap<String, Arc<Mutex<DismissalWatch>>>>> = OnceLock::new();
    WATCHES.get_or_init(|| Mutex::new(HashMap::new()))
}
