use anyhow::Result;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle, RawWindowHandle};
use std::ffi::c_void;
use std::os::raw::c_ulong;
use std::ptr;
use vulkanalia::vk;

/// Windowing systems a surface can be created for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NativeWindowPlatform {
    Win32,
    Xlib,
    Wayland,
    Unknown,
}

impl NativeWindowPlatform {
    /// Instance extension that creates surfaces for this platform.
    pub fn surface_extension(self) -> Option<vk::ExtensionName> {
        match self {
            Self::Win32 => Some(vk::KHR_WIN32_SURFACE_EXTENSION.name),
            Self::Xlib => Some(vk::KHR_XLIB_SURFACE_EXTENSION.name),
            Self::Wayland => Some(vk::KHR_WAYLAND_SURFACE_EXTENSION.name),
            Self::Unknown => None,
        }
    }
}

/// Platform handles of a window, in the shape each surface extension wants.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NativeWindowHandle {
    Win32 { hinstance: isize, hwnd: isize },
    Xlib { display: *mut c_void, window: c_ulong },
    Wayland { display: *mut c_void, surface: *mut c_void },
    Unknown,
}

impl NativeWindowHandle {
    pub fn from_window<W: HasWindowHandle + HasDisplayHandle>(window: &W) -> Result<Self> {
        let display = window.display_handle()?.as_raw();
        let window = window.window_handle()?.as_raw();
        Ok(Self::from_raw(display, window))
    }

    pub fn from_raw(display: RawDisplayHandle, window: RawWindowHandle) -> Self {
        match (display, window) {
            (_, RawWindowHandle::Win32(window)) => Self::Win32 {
                hinstance: window.hinstance.map_or(0, |h| h.get()),
                hwnd: window.hwnd.get(),
            },
            (RawDisplayHandle::Xlib(display), RawWindowHandle::Xlib(window)) => Self::Xlib {
                display: display.display.map_or(ptr::null_mut(), |d| d.as_ptr()),
                window: window.window,
            },
            (RawDisplayHandle::Wayland(display), RawWindowHandle::Wayland(window)) => {
                Self::Wayland {
                    display: display.display.as_ptr(),
                    surface: window.surface.as_ptr(),
                }
            }
            _ => Self::Unknown,
        }
    }

    pub fn platform(&self) -> NativeWindowPlatform {
        match self {
            Self::Win32 { .. } => NativeWindowPlatform::Win32,
            Self::Xlib { .. } => NativeWindowPlatform::Xlib,
            Self::Wayland { .. } => NativeWindowPlatform::Wayland,
            Self::Unknown => NativeWindowPlatform::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raw_window_handle::{
        WaylandDisplayHandle, WaylandWindowHandle, Win32WindowHandle, WindowsDisplayHandle,
        XcbDisplayHandle, XcbWindowHandle, XlibDisplayHandle, XlibWindowHandle,
    };
    use std::num::{NonZeroIsize, NonZeroU32};
    use std::ptr::NonNull;

    fn fake_ptr(value: usize) -> NonNull<c_void> {
        NonNull::new(value as *mut c_void).unwrap()
    }

    #[test]
    fn test_win32_handles() {
        let mut window = Win32WindowHandle::new(NonZeroIsize::new(0x1234).unwrap());
        window.hinstance = NonZeroIsize::new(0x40);
        let handle = NativeWindowHandle::from_raw(
            RawDisplayHandle::Windows(WindowsDisplayHandle::new()),
            RawWindowHandle::Win32(window),
        );

        assert_eq!(
            handle,
            NativeWindowHandle::Win32 {
                hinstance: 0x40,
                hwnd: 0x1234
            }
        );
        assert_eq!(handle.platform(), NativeWindowPlatform::Win32);
    }

    #[test]
    fn test_xlib_handles() {
        let handle = NativeWindowHandle::from_raw(
            RawDisplayHandle::Xlib(XlibDisplayHandle::new(Some(fake_ptr(0x100)), 0)),
            RawWindowHandle::Xlib(XlibWindowHandle::new(42)),
        );

        assert_eq!(
            handle,
            NativeWindowHandle::Xlib {
                display: 0x100 as *mut c_void,
                window: 42
            }
        );
        assert_eq!(handle.platform(), NativeWindowPlatform::Xlib);
    }

    #[test]
    fn test_wayland_handles() {
        let handle = NativeWindowHandle::from_raw(
            RawDisplayHandle::Wayland(WaylandDisplayHandle::new(fake_ptr(0x200))),
            RawWindowHandle::Wayland(WaylandWindowHandle::new(fake_ptr(0x300))),
        );

        assert_eq!(handle.platform(), NativeWindowPlatform::Wayland);
        assert_eq!(
            handle,
            NativeWindowHandle::Wayland {
                display: 0x200 as *mut c_void,
                surface: 0x300 as *mut c_void
            }
        );
    }

    #[test]
    fn test_xcb_is_unknown() {
        let handle = NativeWindowHandle::from_raw(
            RawDisplayHandle::Xcb(XcbDisplayHandle::new(Some(fake_ptr(0x100)), 0)),
            RawWindowHandle::Xcb(XcbWindowHandle::new(NonZeroU32::new(7).unwrap())),
        );
        assert_eq!(handle, NativeWindowHandle::Unknown);
    }

    #[test]
    fn test_mismatched_display_is_unknown() {
        let handle = NativeWindowHandle::from_raw(
            RawDisplayHandle::Wayland(WaylandDisplayHandle::new(fake_ptr(0x200))),
            RawWindowHandle::Xlib(XlibWindowHandle::new(42)),
        );
        assert_eq!(handle.platform(), NativeWindowPlatform::Unknown);
    }

    #[test]
    fn test_surface_extensions() {
        assert_eq!(
            NativeWindowPlatform::Xlib.surface_extension(),
            Some(vk::KHR_XLIB_SURFACE_EXTENSION.name)
        );
        assert_eq!(
            NativeWindowPlatform::Wayland.surface_extension(),
            Some(vk::KHR_WAYLAND_SURFACE_EXTENSION.name)
        );
        assert!(NativeWindowPlatform::Unknown.surface_extension().is_none());
    }
}
