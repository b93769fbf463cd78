use tauri::Runtime;

use super::NativePicker;
use crate::models::CanShareResult;
use crate::{Error, Result};

pub(crate) struct NativeHandle;

pub fn can_share() -> Result<CanShareResult> {
    Ok(CanShareResult { value: false })
}

pub(crate) fn show<R: Runtime>(picker: &NativePicker<R>) -> Result<NativeHandle> {
    Err(Error::Unsupported(format!(
        "no native share UI on {} ({} item(s) not shared)",
        std::env::consts::OS,
        picker.items().len()
    )))
}
