//! # tauri-plugin-activity-sheet
//!
//! Presents the native share sheet ("activity sheet") while a share request is
//! bound, and clears the binding when the sheet is dismissed.
//!
//! The core is independent of Tauri. A host owns a [`Binding<ShareRequest>`],
//! mounts a [`PresentationController`] with a [`Presenter`] for its view, and
//! reconciles the controller whenever the binding or completion handler
//! changes:
//!
//! ```
//! # use std::rc::Rc;
//! # use tauri_plugin_activity_sheet::*;
//! # fn mount<P: Presenter>(presenter: P) {
//! let request: Binding<ShareRequest> = Binding::empty();
//! let controller = PresentationController::new(
//!     presenter,
//!     request.clone(),
//!     ArrowDirections::ANY,
//!     None,
//! );
//! controller.did_mount();
//!
//! // Showing the sheet means storing a request and reconciling.
//! request.set(Some(share_request!["Check this out", ShareItem::url("https://tauri.app")]));
//! let on_complete: CompletionHandler = Rc::new(|outcome: ActivityOutcome| {
//!     println!("shared via {:?}: {}", outcome.destination, outcome.completed);
//! });
//! controller.update(request.clone(), Some(on_complete));
//! # }
//! ```
//!
//! ## Tauri plugin
//!
//! With the `plugin` feature the crate is a Tauri plugin that hosts one
//! controller per window on the desktop share UI.
//!
//! ```rust,ignore
//! fn main() {
//!     tauri::Builder::default()
//!         .plugin(tauri_plugin_activity_sheet::init())
//!         .run(tauri::generate_context!())
//!         .expect("error while running tauri application");
//! }
//! ```
//!
//! The frontend invokes `plugin:activity-sheet|present` with
//! [`ShareOptions`] and listens for `activity-sheet://completed`, whose payload
//! is a [`ShareCompletedPayload`]. Shared files arrive as Base64, are written
//! to temporary files and removed once their sheet is dismissed or the
//! application exits.

#[cfg(feature = "plugin")]
use tauri::{
    plugin::{Builder, TauriPlugin},
    Manager, Runtime,
};

pub use action::{perform_action, CustomAction, FnAction};
pub use binding::Binding;
pub use config::{Config, DismissTiming};
pub use controller::{PresentationController, PresentationState};
pub use models::*;
pub use picker::{Anchor, CompletionHandler, CompletionSlot, Picker, PickerCompletion, Presenter};
pub use request::ShareRequest;
pub use state::TempFileRegistry;

mod action;
mod binding;
mod config;
mod controller;
mod error;
mod models;
mod picker;
mod request;
mod state;

#[cfg(feature = "plugin")]
mod commands;
#[cfg(feature = "plugin")]
mod platform;
#[cfg(feature = "plugin")]
mod sheet;

pub use error::{Error, Result};

#[cfg(feature = "plugin")]
pub use sheet::{ActivitySheet, COMPLETED_EVENT};

/// Extensions to [`tauri::App`], [`tauri::AppHandle`] and [`tauri::Window`] to access the activity sheet APIs.
#[cfg(feature = "plugin")]
pub trait ActivitySheetExt<R: Runtime> {
    fn activity_sheet(&self) -> &ActivitySheet<R>;
}

#[cfg(feature = "plugin")]
impl<R: Runtime, T: Manager<R>> crate::ActivitySheetExt<R> for T {
    fn activity_sheet(&self) -> &ActivitySheet<R> {
        self.state::<ActivitySheet<R>>().inner()
    }
}

/// Initializes the plugin.
///
/// Registers the commands, reads the optional `plugins.activity-sheet`
/// configuration and removes any remaining shared files when the plugin is
/// dropped.
#[cfg(feature = "plugin")]
pub fn init<R: Runtime>() -> TauriPlugin<R, Option<Config>> {
    Builder::<R, Option<Config>>::new("activity-sheet")
        .invoke_handler(tauri::generate_handler![
            commands::present,
            commands::can_share,
            commands::cleanup,
        ])
        .setup(|app, api| {
            let config = api.config().clone().unwrap_or_default();
            log::debug!("activity sheet plugin configured: {:?}", config);
            app.manage(ActivitySheet::<R>::new(config));
            Ok(())
        })
        .on_drop(|app| {
            if let Err(e) = app.state::<ActivitySheet<R>>().cleanup() {
                log::warn!("failed to clean up shared files: {}", e);
            }
        })
        .build()
}
