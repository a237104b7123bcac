//! Mapping from raw Win32 messages to structured [`Event`] records.
//!
//! One message maps to zero or one records; anything without a mapping falls
//! through to `DefWindowProcW` in the window procedure.

use windows::Win32::Foundation::{HWND, LPARAM, WPARAM};
use windows::Win32::UI::WindowsAndMessaging::{
    WM_CLOSE, WM_KEYDOWN, WM_KEYUP, WM_KILLFOCUS, WM_LBUTTONDOWN, WM_LBUTTONUP, WM_MBUTTONDOWN,
    WM_MBUTTONUP, WM_MOUSEMOVE, WM_MOUSEWHEEL, WM_MOVE, WM_PAINT, WM_RBUTTONDOWN, WM_RBUTTONUP,
    WM_SETFOCUS, WM_SIZE,
};

use crate::events::{Event, MouseButton, WindowId};

/// One wheel detent, per the WHEEL_DELTA contract.
const WHEEL_DETENT: f32 = 120.0;

pub(crate) fn window_id(hwnd: HWND) -> WindowId {
    WindowId(hwnd.0 as isize)
}

/// Translate a message into a structured record, or `None` when the message
/// has no mapping.
pub(crate) fn translate(hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> Option<Event> {
    let window = window_id(hwnd);
    let event = match msg {
        WM_CLOSE => Event::CloseRequested {
            window,
            cancel: false,
        },
        WM_SIZE => Event::Resized {
            window,
            width: u32::from(loword(lparam.0)),
            height: u32::from(hiword(lparam.0)),
        },
        // WM_MOVE coordinates are signed: a window dragged to a monitor left
        // of the primary has negative x.
        WM_MOVE => Event::Moved {
            window,
            x: i32::from(loword(lparam.0) as i16),
            y: i32::from(hiword(lparam.0) as i16),
        },
        WM_SETFOCUS => Event::Focused {
            window,
            gained: true,
        },
        WM_KILLFOCUS => Event::Focused {
            window,
            gained: false,
        },
        WM_PAINT => Event::RedrawRequested { window },
        WM_KEYDOWN | WM_KEYUP => Event::Key {
            window,
            code: wparam.0 as u32,
            pressed: msg == WM_KEYDOWN,
            handled: false,
        },
        WM_LBUTTONDOWN | WM_LBUTTONUP | WM_RBUTTONDOWN | WM_RBUTTONUP | WM_MBUTTONDOWN
        | WM_MBUTTONUP => {
            let button = match msg {
                WM_LBUTTONDOWN | WM_LBUTTONUP => MouseButton::Left,
                WM_RBUTTONDOWN | WM_RBUTTONUP => MouseButton::Right,
                _ => MouseButton::Middle,
            };
            Event::MouseButton {
                window,
                button,
                pressed: matches!(msg, WM_LBUTTONDOWN | WM_RBUTTONDOWN | WM_MBUTTONDOWN),
                x: i32::from(loword(lparam.0) as i16),
                y: i32::from(hiword(lparam.0) as i16),
                handled: false,
            }
        }
        WM_MOUSEMOVE => Event::MouseMoved {
            window,
            x: i32::from(loword(lparam.0) as i16),
            y: i32::from(hiword(lparam.0) as i16),
            handled: false,
        },
        WM_MOUSEWHEEL => Event::MouseWheel {
            window,
            delta: f32::from(hiword(wparam.0 as isize) as i16) / WHEEL_DETENT,
            handled: false,
        },
        _ => return None,
    };
    Some(event)
}

fn loword(value: isize) -> u16 {
    (value as usize & 0xFFFF) as u16
}

fn hiword(value: isize) -> u16 {
    ((value as usize >> 16) & 0xFFFF) as u16
}
