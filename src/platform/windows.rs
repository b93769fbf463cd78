use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use log::warn;
use raw_window_handle::{HasWindowHandle, RawWindowHandle};
use tauri::{Manager, Runtime, Window};
use windows::ApplicationModel::DataTransfer::{
    DataPackage, DataRequestedEventArgs, DataTransferManager, TargetApplicationChosenEventArgs,
};
use windows::Storage::IStorageItem;
use windows::{
    core::{Interface, HSTRING},
    Foundation::TypedEventHandler,
    Storage::StorageFile,
    Win32::{
        Foundation::HWND,
        System::WinRT::{RoInitialize, RO_INIT_SINGLETHREADED},
        UI::Shell::IDataTransferManagerInterop,
    },
};
use windows_collections::IIterable;

use super::{focus, NativePicker};
use crate::models::{ActivityOutcome, CanShareResult, DestinationKind, ShareItem};
use crate::{Error, Result};

impl From<windows::core::Error> for Error {
    fn from(err: windows::core::Error) -> Self {
        Error::NativeApi(err.message().to_string())
    }
}

/// Keeps the `DataRequested` registration alive while the share UI is open.
pub(crate) struct NativeHandle {
    manager: DataTransferManager,
    token: i64,
}

impl Drop for NativeHandle {
    fn drop(&mut self) {
        if let Err(e) = self.manager.RemoveDataRequested(self.token) {
            warn!("failed to unregister share data handler: {}", e);
        }
    }
}

// Thread-safe copy of what the data package is filled with.
#[derive(Default)]
struct Content {
    title: String,
    text: Vec<String>,
    files: Vec<PathBuf>,
}

pub fn can_share() -> Result<CanShareResult> {
    Ok(CanShareResult { value: true })
}

pub(crate) fn show<R: Runtime>(picker: &NativePicker<R>) -> Result<NativeHandle> {
    initialize_winrt_thread()?;
    let hwnd = get_hwnd(picker.window())?;
    let (manager, interop) = get_data_transfer_manager(hwnd)?;

    let content = Arc::new(collect_content(picker));
    let chosen: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

    let data_requested_handler = TypedEventHandler::new({
        let content = content.clone();
        let chosen = chosen.clone();
        move |_, args: windows::core::Ref<'_, DataRequestedEventArgs>| -> windows::core::Result<()> {
            if let Some(request_args) = (*args).as_ref() {
                let request = request_args.Request()?;
                let data = request.Data()?;
                fill_package(&data, &content, &request)?;
                record_target(&data, chosen.clone())?;
            }
            Ok(())
        }
    });
    let token = manager.DataRequested(&data_requested_handler)?;
    let handle = NativeHandle { manager, token };

    let window = picker.window().clone();
    let id = picker.id();
    focus::watch_dismissal(picker.window(), id, picker.timing(), move || {
        let target = chosen.lock().ok().and_then(|chosen| chosen.clone());
        let outcome = match target {
            Some(app) => ActivityOutcome::completed(DestinationKind::new(app)),
            None => ActivityOutcome::cancelled(),
        };
        super::finish_later(&window, id, outcome);
    })?;

    unsafe { interop.ShowShareUIForWindow(hwnd) }?;
    Ok(handle)
}

fn collect_content<R: Runtime>(picker: &NativePicker<R>) -> Content {
    let app_name = &picker.window().app_handle().package_info().name;
    let mut content = Content {
        title: package_title(picker.title(), app_name),
        ..Content::default()
    };
    for item in picker.items() {
        match item {
            ShareItem::Text(text) | ShareItem::Url(text) => content.text.push(text.clone()),
            ShareItem::File(path) => content.files.push(path.clone()),
            ShareItem::Custom(_) => {}
        }
    }
    content
}

// The share UI refuses a package without a title.
fn package_title(requested: Option<String>, app_name: &str) -> String {
    requested
        .filter(|title| !title.trim().is_empty())
        .unwrap_or_else(|| app_name.to_string())
}

fn fill_package(
    data: &DataPackage,
    content: &Content,
    request: &windows::ApplicationModel::DataTransfer::DataRequest,
) -> windows::core::Result<()> {
    data.Properties()?.SetTitle(&HSTRING::from(content.title.as_str()))?;
    if !content.text.is_empty() {
        data.SetText(&HSTRING::from(content.text.join("\n")))?;
    }
    if content.files.is_empty() {
        return Ok(());
    }

    // Storage files resolve asynchronously; the deferral holds the request open.
    let deferral = request.GetDeferral()?;
    let data = data.clone();
    let files = content.files.clone();
    tauri::async_runtime::spawn(async move {
        let mut storage_items: Vec<Option<IStorageItem>> = Vec::new();
        for path in files {
            let path_str = path.to_string_lossy().to_string();
            match StorageFile::GetFileFromPathAsync(&HSTRING::from(path_str)).and_then(|op| op.get()) {
                Ok(storage_file) => match storage_file.cast() {
                    Ok(item) => storage_items.push(Some(item)),
                    Err(e) => warn!("failed to convert storage file: {}", e),
                },
                Err(e) => warn!("failed to open {} for sharing: {}", path.display(), e),
            }
        }
        if !storage_items.is_empty() {
            let iterable: windows::core::Result<IIterable<IStorageItem>> = storage_items.try_into();
            match iterable {
                Ok(items) => {
                    if let Err(e) = data.SetStorageItemsReadOnly(&items) {
                        warn!("failed to set storage items on data package: {}", e);
                    }
                }
                Err(e) => warn!("failed to convert storage items: {}", e),
            }
        }
        if let Err(e) = deferral.Complete() {
            warn!("failed to complete share deferral: {}", e);
        }
    });
    Ok(())
}

fn record_target(data: &DataPackage, chosen: Arc<Mutex<Option<String>>>) -> windows::core::Result<()> {
    data.TargetApplicationChosen(&TypedEventHandler::new(
        move |_, args: windows::core::Ref<'_, TargetApplicationChosenEventArgs>| -> windows::core::Result<()> {
            if let Some(args) = (*args).as_ref() {
                let name = args.ApplicationName()?.to_string();
                if let Ok(mut chosen) = chosen.lock() {
                    *chosen = Some(name);
                }
            }
            Ok(())
        },
    ))?;
    Ok(())
}

/// Initializes the Windows Runtime on the current thread.
fn initialize_winrt_thread() -> Result<()> {
    // Already initialized threads report S_FALSE, which is not an error.
    unsafe { RoInitialize(RO_INIT_SINGLETHREADED) }
        .map_err(|e| Error::NativeApi(format!("Failed to initialize WinRT: {}", e)))
}

fn get_hwnd<R: Runtime>(window: &Window<R>) -> Result<HWND> {
    let handle = window
        .window_handle()
        .map_err(|e| Error::NativeApi(e.to_string()))?;

    match handle.as_raw() {
        RawWindowHandle::Win32(handle) => Ok(HWND(handle.hwnd.get() as *mut std::ffi::c_void)),
        _ => Err(Error::NativeApi("Unsupported window handle type".to_string())),
    }
}

/// Desktop apps reach the share UI through the interop factory rather than
/// `DataTransferManager::GetForCurrentView`.
fn get_data_transfer_manager(
    hwnd: HWND,
) -> Result<(DataTransferManager, IDataTransferManagerInterop)> {
    let interop = windows::core::factory::<DataTransferManager, IDataTransferManagerInterop>()?;
    let manager = unsafe { interop.GetForWindow(hwnd) }?;
    Ok((manager, interop))
}
