use std::cell::RefCell;
use std::collections::BTreeSet;

use objc2::{
    define_class, msg_send,
    rc::{autoreleasepool, Retained},
    runtime::{AnyObject, NSObject, NSObjectProtocol, ProtocolObject},
    AnyThread, DefinedClass,
};
use objc2_app_kit::{
    NSSharingService, NSSharingServiceNameComposeEmail, NSSharingServiceNameComposeMessage,
    NSSharingServiceNameSendViaAirDrop, NSSharingServicePicker, NSSharingServicePickerDelegate,
    NSView,
};
use objc2_core_foundation::{CGPoint, CGRect, CGSize};
use objc2_foundation::{NSArray, NSRectEdge, NSString, NSURL};
use raw_window_handle::{HasWindowHandle, RawWindowHandle, WindowHandle};
use tauri::{Runtime, Window};

use super::NativePicker;
use crate::models::{ActivityOutcome, ArrowDirections, CanShareResult, DestinationKind, ShareItem};
use crate::{Error, Result};

/// Retains the picker and its delegate for as long as the presentation lasts.
pub(crate) struct NativeHandle {
    _picker: Retained<NSSharingServicePicker>,
    _delegate: Retained<PickerDelegate>,
}

type OnChosen = Box<dyn FnOnce(Option<DestinationKind>)>;

struct PickerDelegateIvars {
    subject: Option<String>,
    // Titles of the system services that have a destination kind.
    known: Vec<(DestinationKind, String)>,
    excluded: BTreeSet<DestinationKind>,
    on_chosen: RefCell<Option<OnChosen>>,
}

define_class!(
    // SAFETY: NSObject has no subclassing requirements and the delegate does
    // not implement Drop.
    #[unsafe(super(NSObject))]
    #[name = "TauriActivitySheetPickerDelegate"]
    #[ivars = PickerDelegateIvars]
    struct PickerDelegate;

    unsafe impl NSObjectProtocol for PickerDelegate {}

    unsafe impl NSSharingServicePickerDelegate for PickerDelegate {
        #[unsafe(method(sharingServicePicker:sharingServicesForItems:proposedSharingServices:))]
        fn sharing_services(
            &self,
            _picker: &NSSharingServicePicker,
            _items: &NSArray,
            proposed: &NSArray<NSSharingService>,
        ) -> Retained<NSArray<NSSharingService>> {
            self.offered(proposed)
        }

        // AppKit passes nil when the menu closes without a choice.
        #[unsafe(method(sharingServicePicker:didChooseSharingService:))]
        fn did_choose(&self, _picker: &NSSharingServicePicker, service: Option<&NSSharingService>) {
            self.chosen(service);
        }
    }
);

impl PickerDelegate {
    fn new(ivars: PickerDelegateIvars) -> Retained<Self> {
        let this = Self::alloc().set_ivars(ivars);
        unsafe { msg_send![super(this), init] }
    }

    fn offered(&self, proposed: &NSArray<NSSharingService>) -> Retained<NSArray<NSSharingService>> {
        let ivars = self.ivars();
        let subject = ivars.subject.as_deref().map(NSString::from_str);
        let mut offered = Vec::new();
        for service in proposed.iter() {
            let title = unsafe { service.title() }.to_string();
            if !is_offered(&title, &ivars.known, &ivars.excluded) {
                continue;
            }
            if let Some(subject) = &subject {
                unsafe { service.setSubject(Some(subject)) };
            }
            offered.push(service);
        }
        NSArray::from_retained_slice(&offered)
    }

    fn chosen(&self, service: Option<&NSSharingService>) {
        let ivars = self.ivars();
        let destination = service.map(|service| {
            let title = unsafe { service.title() }.to_string();
            destination_for(&title, &ivars.known)
        });
        let on_chosen = ivars.on_chosen.borrow_mut().take();
        if let Some(on_chosen) = on_chosen {
            on_chosen(destination);
        }
    }
}

pub fn can_share() -> Result<CanShareResult> {
    Ok(CanShareResult { value: true })
}

/// Shows `NSSharingServicePicker` anchored to the window's view.
///
/// The delegate drops excluded services from the menu and finishes the
/// picker with the chosen service, or as cancelled when none was chosen.
pub(crate) fn show<R: Runtime>(picker: &NativePicker<R>) -> Result<NativeHandle> {
    let ns_view = get_ns_view(picker.window())?;
    let objects = native_items(picker.items());
    if objects.is_empty() {
        return Err(Error::InvalidArgs("No content provided to share.".to_string()));
    }

    let window = picker.window().clone();
    let id = picker.id();
    let delegate = PickerDelegate::new(PickerDelegateIvars {
        subject: picker.title(),
        known: known_services(),
        excluded: picker.excluded_kinds(),
        on_chosen: RefCell::new(Some(Box::new(move |destination| {
            let outcome = match destination {
                Some(destination) => ActivityOutcome::completed(destination),
                None => ActivityOutcome::cancelled(),
            };
            super::finish_later(&window, id, outcome);
        }))),
    });

    let native = autoreleasepool(|_pool| {
        let items = NSArray::from_retained_slice(&objects);
        let native = unsafe {
            NSSharingServicePicker::initWithItems(NSSharingServicePicker::alloc(), &items)
        };
        unsafe { native.setDelegate(Some(ProtocolObject::from_ref(&*delegate))) };
        let anchor = picker.anchor();
        unsafe {
            native.showRelativeToRect_ofView_preferredEdge(
                CGRect {
                    origin: CGPoint {
                        x: anchor.x,
                        y: anchor.y,
                    },
                    size: CGSize {
                        width: anchor.width,
                        height: anchor.height,
                    },
                },
                &ns_view,
                preferred_edge(picker.permitted_directions()),
            );
        }
        native
    });

    Ok(NativeHandle {
        _picker: native,
        _delegate: delegate,
    })
}

fn known_services() -> Vec<(DestinationKind, String)> {
    let named = unsafe {
        [
            (DestinationKind::MAIL, NSSharingServiceNameComposeEmail),
            (DestinationKind::MESSAGE, NSSharingServiceNameComposeMessage),
            (DestinationKind::AIR_DROP, NSSharingServiceNameSendViaAirDrop),
        ]
    };
    named
        .into_iter()
        .filter_map(|(kind, name)| {
            let service = unsafe { NSSharingService::sharingServiceNamed(name) }?;
            Some((kind, unsafe { service.title() }.to_string()))
        })
        .collect()
}

fn destination_for(title: &str, known: &[(DestinationKind, String)]) -> DestinationKind {
    known
        .iter()
        .find(|(_, known_title)| known_title == title)
        .map(|(kind, _)| kind.clone())
        .unwrap_or_else(|| DestinationKind::new(title.to_string()))
}

fn is_offered(
    title: &str,
    known: &[(DestinationKind, String)],
    excluded: &BTreeSet<DestinationKind>,
) -> bool {
    !excluded.contains(&destination_for(title, known))
}

fn native_items(items: &[ShareItem]) -> Vec<Retained<AnyObject>> {
    let mut objects = Vec::new();
    for item in items {
        let object: Option<Retained<AnyObject>> = match item {
            ShareItem::Text(text) => {
                Some(Retained::into_super(Retained::into_super(NSString::from_str(text))))
            }
            ShareItem::Url(url) => unsafe { NSURL::URLWithString(&NSString::from_str(url)) }
                .map(|url| Retained::into_super(Retained::into_super(url))),
            ShareItem::File(path) => {
                let path_str = path.to_string_lossy().to_string();
                let url = unsafe { NSURL::fileURLWithPath(&NSString::from_str(&path_str)) };
                Some(Retained::into_super(Retained::into_super(url)))
            }
            ShareItem::Custom(_) => None,
        };
        objects.extend(object);
    }
    objects
}

// The arrow points at the anchor, so an upward arrow puts the picker below it.
fn preferred_edge(directions: ArrowDirections) -> NSRectEdge {
    if directions.contains(ArrowDirections::UP) {
        NSRectEdge::NSMinYEdge
    } else if directions.contains(ArrowDirections::DOWN) {
        NSRectEdge::NSMaxYEdge
    } else if directions.contains(ArrowDirections::LEFT) {
        NSRectEdge::NSMaxXEdge
    } else if directions.contains(ArrowDirections::RIGHT) {
        NSRectEdge::NSMinXEdge
    } else {
        NSRectEdge::NSMinYEdge
    }
}

/// Retrieves the window's `NSView` through `raw-window-handle`.
fn get_ns_view<R: Runtime>(window: &Window<R>) -> Result<Retained<NSView>> {
    let window_handle: WindowHandle<'_> = window
        .window_handle()
        .map_err(|e| Error::NativeApi(e.to_string()))?;
    if let RawWindowHandle::AppKit(handle) = window_handle.as_raw() {
        let ns_view_ptr = handle.ns_view.as_ptr();
        unsafe { Retained::retain(ns_view_ptr.cast()) }
            .ok_or_else(|| Error::NativeApi("Window has no NSView.".to_string()))
    } else {
        Err(Error::NativeApi(
            "Unsupported window handle type on macOS.".to_string(),
        ))
    }
}
