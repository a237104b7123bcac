//! Top-level Win32 windows bound to the creating thread's dispatcher.
//!
//! The window procedure is thin: translate the message, publish the record
//! on the dispatcher's window hub, honor the response fields (`cancel`,
//! `handled`), and fall through to `DefWindowProcW` for everything else.

use std::sync::Once;

use windows::core::{w, HSTRING};
use windows::Win32::Foundation::{GetLastError, HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::Graphics::Gdi::ValidateRect;
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, InvalidateRect, LoadCursorW, PostMessageW,
    RegisterClassW, SetWindowTextW, ShowWindow, CS_HREDRAW, CS_VREDRAW, CW_USEDEFAULT, IDC_ARROW,
    SW_HIDE, SW_SHOW, WINDOW_EX_STYLE, WM_CLOSE, WNDCLASSW, WS_OVERLAPPEDWINDOW,
};

use super::translate;
use crate::dispatch::{Dispatcher, DispatcherObject};
use crate::error::{Error, Result};
use crate::events::{Event, WindowId};

static REGISTER_CLASS: Once = Once::new();

fn ensure_window_class() -> Result<()> {
    let mut result = Ok(());
    REGISTER_CLASS.call_once(|| {
        result = register_window_class();
    });
    result
}

fn register_window_class() -> Result<()> {
    unsafe {
        let instance = GetModuleHandleW(None)
            .map_err(|e| Error::platform("GetModuleHandleW", e.code().0 as u32))?;
        let wc = WNDCLASSW {
            style: CS_HREDRAW | CS_VREDRAW,
            lpfnWndProc: Some(wndproc),
            hInstance: instance.into(),
            hCursor: LoadCursorW(None, IDC_ARROW)
                .map_err(|e| Error::platform("LoadCursorW", e.code().0 as u32))?,
            lpszClassName: w!("SashWindow"),
            ..Default::default()
        };
        if RegisterClassW(&wc) == 0 {
            return Err(Error::platform("RegisterClassW", GetLastError().0));
        }
    }
    Ok(())
}

/// A native top-level window. Owned by the creating thread's dispatcher;
/// all methods must be called on that thread.
pub struct Window {
    hwnd: HWND,
    object: DispatcherObject,
}

impl Window {
    /// Create a hidden overlapped window on the calling thread's dispatcher.
    /// Call [`show`](Self::show) to make it visible.
    pub fn new(title: &str, width: i32, height: i32) -> Result<Self> {
        ensure_window_class()?;
        // Bind the dispatcher (creating it if needed) before the window
        // exists: the window procedure publishes through it.
        let object = DispatcherObject::new();
        let hwnd = unsafe {
            let instance = GetModuleHandleW(None)
                .map_err(|e| Error::platform("GetModuleHandleW", e.code().0 as u32))?;
            CreateWindowExW(
                WINDOW_EX_STYLE::default(),
                w!("SashWindow"),
                &HSTRING::from(title),
                WS_OVERLAPPEDWINDOW,
                CW_USEDEFAULT,
                CW_USEDEFAULT,
                width,
                height,
                None,
                None,
                Some(instance.into()),
                None,
            )
            .map_err(|e| Error::platform("CreateWindowExW", e.code().0 as u32))?
        };
        Ok(Self { hwnd, object })
    }

    /// Stable identifier carried by this window's events.
    pub fn id(&self) -> WindowId {
        translate::window_id(self.hwnd)
    }

    pub fn show(&self) {
        self.object.verify_access();
        unsafe {
            let _ = ShowWindow(self.hwnd, SW_SHOW);
        }
    }

    pub fn hide(&self) {
        self.object.verify_access();
        unsafe {
            let _ = ShowWindow(self.hwnd, SW_HIDE);
        }
    }

    pub fn set_title(&self, title: &str) -> Result<()> {
        self.object.verify_access();
        unsafe {
            SetWindowTextW(self.hwnd, &HSTRING::from(title))
                .map_err(|e| Error::platform("SetWindowTextW", e.code().0 as u32))
        }
    }

    /// Invalidate the client area, producing a `RedrawRequested` on the next
    /// loop iteration.
    pub fn request_redraw(&self) {
        self.object.verify_access();
        unsafe {
            let _ = InvalidateRect(Some(self.hwnd), None, false);
        }
    }

    /// Ask the window to close, as if the user clicked the close button.
    /// Subscribers may still veto via `CloseRequested::cancel`.
    pub fn close(&self) {
        self.object.verify_access();
        unsafe {
            let _ = PostMessageW(Some(self.hwnd), WM_CLOSE, WPARAM(0), LPARAM(0));
        }
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        // Already-destroyed windows make this fail; nothing to do about it.
        unsafe {
            let _ = DestroyWindow(self.hwnd);
        }
    }
}

extern "system" fn wndproc(hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    let Some(mut event) = translate::translate(hwnd, msg, wparam, lparam) else {
        return unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) };
    };

    Dispatcher::current().window_events().publish(&mut event);

    match event {
        Event::CloseRequested { cancel, .. } => {
            if !cancel {
                unsafe {
                    let _ = DestroyWindow(hwnd);
                }
            }
            LRESULT(0)
        }
        Event::RedrawRequested { .. } => {
            // Subscribers painted (or chose not to); retire the dirty region
            // either way so WM_PAINT does not spin.
            unsafe {
                let _ = ValidateRect(Some(hwnd), None);
            }
            LRESULT(0)
        }
        ref event if event.is_handled() => LRESULT(0),
        _ => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
    }
}
