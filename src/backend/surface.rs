// Platform surface creation from raw window handles
//
// Covers the window systems winit hands us on desktop: Win32, Xlib, Xcb
// and Wayland. Anything else is reported as UnsupportedPlatform.

use ash::extensions::khr;
use ash::{vk, Entry, Instance};
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};
use std::ffi::CStr;

use crate::error::{RenderError, RenderResult};

/// Instance extensions needed to present to windows of this display
pub fn required_extensions(display: RawDisplayHandle) -> RenderResult<Vec<&'static CStr>> {
    let platform = match display {
        RawDisplayHandle::Windows(_) => khr::Win32Surface::name(),
        RawDisplayHandle::Xlib(_) => khr::XlibSurface::name(),
        RawDisplayHandle::Xcb(_) => khr::XcbSurface::name(),
        RawDisplayHandle::Wayland(_) => khr::WaylandSurface::name(),
        _ => return Err(RenderError::UnsupportedPlatform),
    };
    Ok(vec![khr::Surface::name(), platform])
}

/// # Safety
/// The handles must stay valid for as long as the surface lives, and the
/// instance must have been created with `required_extensions(display)`.
pub unsafe fn create_surface(
    entry: &Entry,
    instance: &Instance,
    display: RawDisplayHandle,
    window: RawWindowHandle,
) -> RenderResult<vk::SurfaceKHR> {
    let result = match (display, window) {
        (RawDisplayHandle::Windows(_), RawWindowHandle::Win32(window)) => {
            let hinstance = window.hinstance.map_or(0, |h| h.get());
            let create_info = vk::Win32SurfaceCreateInfoKHR::builder()
                .hinstance(hinstance as vk::HINSTANCE)
                .hwnd(window.hwnd.get() as vk::HWND);
            khr::Win32Surface::new(entry, instance).create_win32_surface(&create_info, None)
        }
        (RawDisplayHandle::Xlib(display), RawWindowHandle::Xlib(window)) => {
            let dpy = display.display.ok_or(RenderError::UnsupportedPlatform)?;
            let create_info = vk::XlibSurfaceCreateInfoKHR::builder()
                .dpy(dpy.as_ptr() as *mut _)
                .window(window.window);
            khr::XlibSurface::new(entry, instance).create_xlib_surface(&create_info, None)
        }
        (RawDisplayHandle::Xcb(display), RawWindowHandle::Xcb(window)) => {
            let connection = display.connection.ok_or(RenderError::UnsupportedPlatform)?;
            let create_info = vk::XcbSurfaceCreateInfoKHR::builder()
                .connection(connection.as_ptr() as *mut _)
                .window(window.window.get());
            khr::XcbSurface::new(entry, instance).create_xcb_surface(&create_info, None)
        }
        (RawDisplayHandle::Wayland(display), RawWindowHandle::Wayland(window)) => {
            let create_info = vk::WaylandSurfaceCreateInfoKHR::builder()
                .display(display.display.as_ptr() as *mut _)
                .surface(window.surface.as_ptr() as *mut _);
            khr::WaylandSurface::new(entry, instance).create_wayland_surface(&create_info, None)
        }
        _ => return Err(RenderError::UnsupportedPlatform),
    };
    result.map_err(|e| RenderError::creation("surface", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use raw_window_handle::{WaylandDisplayHandle, XlibDisplayHandle};
    use std::ptr::NonNull;

    #[test]
    fn surface_extension_comes_first() {
        let display = RawDisplayHandle::Xlib(XlibDisplayHandle::new(None, 0));
        let extensions = required_extensions(display).unwrap();
        assert_eq!(extensions, vec![khr::Surface::name(), khr::XlibSurface::name()]);
    }

    #[test]
    fn wayland_needs_the_wayland_extension() {
        let mut dummy = 0u8;
        let ptr = NonNull::from(&mut dummy).cast();
        let display = RawDisplayHandle::Wayland(WaylandDisplayHandle::new(ptr));
        let extensions = required_extensions(display).unwrap();
        assert!(extensions.contains(&khr::WaylandSurface::name()));
    }
}
