use tauri::{command, AppHandle, Runtime, Window};

use crate::{error, models, ActivitySheetExt};

#[command]
pub async fn present<R: Runtime>(
    app: AppHandle<R>,
    window: Window<R>,
    options: models::ShareOptions,
) -> Result<(), error::Error> {
    app.activity_sheet().present(window, options)
}

#[command]
pub async fn can_share<R: Runtime>(app: AppHandle<R>) -> Result<models::CanShareResult, error::Error> {
    app.activity_sheet().can_share()
}

#[command]
pub async fn cleanup<R: Runtime>(app: AppHandle<R>) -> Result<(), error::Error> {
    app.activity_sheet().cleanup()
}
