//! Host-to-agent control messages and their version-aware serializer.
//!
//! Every control message starts with a one-byte type ordinal.  The ordinal is
//! the message type's *position* in the active version's type table, so the
//! serializer never hard-codes a byte: it looks the type up and, if the
//! version does not know it, reports the message as unsupported by returning
//! `None`.  Callers treat `None` as a no-op.
//!
//! Message bodies follow the version's [`WireLayout`]; see the layout enums
//! below for what changed when.

use crate::protocol::scroll::{ScrollController, ScrollSteps};
use crate::protocol::wire::{
    signed_fixed_i16, truncate_utf8, unsigned_fixed_u16, write_bytes_u16, write_string_u32,
    write_string_u8,
};
use crate::version::WireLayout;

/// Longest text accepted by an inject-text message, in bytes.
pub const INJECT_TEXT_MAX_LENGTH: usize = 300;

/// Longest clipboard text accepted by a set-clipboard message, in bytes.
pub const SET_CLIPBOARD_TEXT_MAX_LENGTH: usize = (1 << 18) - 14;

/// Pointer id used for mouse events.
pub const POINTER_ID_MOUSE: u64 = u64::MAX;

/// Pointer id used for a finger that is not tracked individually.
pub const POINTER_ID_GENERIC_FINGER: u64 = u64::MAX - 1;

// ── Message types ─────────────────────────────────────────────────────────────

/// Every control message type known to any supported version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlMessageType {
    InjectKeyCode,
    InjectText,
    InjectTouch,
    InjectScroll,
    BackOrScreenOn,
    ExpandNotificationPanel,
    ExpandSettingsPanel,
    CollapsePanels,
    GetClipboard,
    SetClipboard,
    SetScreenPowerMode,
    RotateDevice,
    UHidCreate,
    UHidInput,
    UHidDestroy,
    OpenHardKeyboardSettings,
    StartApp,
    ResetVideo,
}

// ── Wire layouts ──────────────────────────────────────────────────────────────

/// Body layout of inject-touch messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchLayout {
    /// `... pressure u16, buttons u32`
    Basic,
    /// `... pressure u16, action_button u32, buttons u32` (2.0+)
    WithActionButton,
}

/// Body layout of inject-scroll messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollLayout {
    /// Whole steps as i32, no buttons.
    IntegerSteps,
    /// Whole steps as i32, followed by buttons u32 (1.22+).
    IntegerStepsWithButtons,
    /// Signed fixed-point i16 of `steps / 16`, followed by buttons u32 (1.25+).
    FixedPoint,
}

/// Body layout of back-or-screen-on messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackOrScreenOnLayout {
    /// Type byte only; the agent presses and releases on receipt, so only a
    /// key-down is sent.
    DownOnly,
    /// Followed by the key action (1.18+).
    WithAction,
}

/// Body layout of get-clipboard messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GetClipboardLayout {
    Plain,
    /// Carries the copy key to press before reading (2.0+).
    WithCopyKey,
}

/// Body layout of set-clipboard messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetClipboardLayout {
    Unsequenced,
    /// Prefixed by a u64 acknowledgement sequence (1.21+).
    Sequenced,
}

/// Body layout of UHID create messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UHidCreateLayout {
    DescriptorOnly,
    /// Adds vendor id, product id and a device name (2.6+).
    Named,
}

// ── Android constants ─────────────────────────────────────────────────────────

/// `KeyEvent` actions.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AndroidKeyEventAction {
    Down = 0,
    Up = 1,
}

/// `MotionEvent` actions.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AndroidMotionEventAction {
    Down = 0,
    Up = 1,
    Move = 2,
    Cancel = 3,
    Outside = 4,
    PointerDown = 5,
    PointerUp = 6,
    HoverMove = 7,
    Scroll = 8,
    HoverEnter = 9,
    HoverExit = 10,
    ButtonPress = 11,
    ButtonRelease = 12,
}

/// Screen power modes accepted by set-screen-power-mode.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenPowerMode {
    Off = 0,
    Normal = 2,
}

/// Key the agent presses before reading its clipboard.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CopyKey {
    #[default]
    None = 0,
    Copy = 1,
    Cut = 2,
}

// ── Message bodies ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct InjectKeyCodeControlMessage {
    pub action: AndroidKeyEventAction,
    pub key_code: u32,
    pub repeat: u32,
    pub meta_state: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InjectTextControlMessage {
    pub text: String,
}

/// A touch or mouse pointer event in device screen coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct InjectTouchControlMessage {
    pub action: AndroidMotionEventAction,
    pub pointer_id: u64,
    pub pointer_x: i32,
    pub pointer_y: i32,
    pub screen_width: u16,
    pub screen_height: u16,
    /// Normalised pressure in `[0, 1]`.
    pub pressure: f64,
    /// Ignored before 2.0.
    pub action_button: u32,
    pub buttons: u32,
}

/// A scroll event.  `scroll_x`/`scroll_y` are in steps and may be fractional.
#[derive(Debug, Clone, PartialEq)]
pub struct InjectScrollControlMessage {
    pub pointer_x: i32,
    pub pointer_y: i32,
    pub screen_width: u16,
    pub screen_height: u16,
    pub scroll_x: f64,
    pub scroll_y: f64,
    /// Ignored before 1.22.
    pub buttons: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackOrScreenOnControlMessage {
    pub action: AndroidKeyEventAction,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetClipboardControlMessage {
    /// Ignored before 2.0.
    pub copy_key: CopyKey,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetClipboardControlMessage {
    pub text: String,
    pub paste: bool,
    /// Whether the caller wants to wait for the agent's acknowledgement.
    pub ack: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetScreenPowerModeControlMessage {
    pub mode: ScreenPowerMode,
}

/// Creates a virtual HID device on the agent.
#[derive(Debug, Clone, PartialEq)]
pub struct UHidCreateControlMessage {
    pub id: u16,
    /// Ignored before 2.6.
    pub vendor_id: u16,
    /// Ignored before 2.6.
    pub product_id: u16,
    /// Ignored before 2.6.
    pub name: String,
    pub report_descriptor: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UHidInputControlMessage {
    pub id: u16,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UHidDestroyControlMessage {
    pub id: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StartAppControlMessage {
    pub name: String,
}

/// Any host-to-agent control message.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlMessage {
    InjectKeyCode(InjectKeyCodeControlMessage),
    InjectText(InjectTextControlMessage),
    InjectTouch(InjectTouchControlMessage),
    /// Serialized statelessly: whatever the layout cannot carry is dropped.  Use a
    /// [`ScrollController`] to keep sub-step input.
    InjectScroll(InjectScrollControlMessage),
    BackOrScreenOn(BackOrScreenOnControlMessage),
    ExpandNotificationPanel,
    ExpandSettingsPanel,
    CollapsePanels,
    GetClipboard(GetClipboardControlMessage),
    /// Serialized without an acknowledgement; see
    /// [`Options::serialize_set_clipboard_control_message`](crate::Options::serialize_set_clipboard_control_message)
    /// for acknowledged writes.
    SetClipboard(SetClipboardControlMessage),
    SetScreenPowerMode(SetScreenPowerModeControlMessage),
    RotateDevice,
    UHidCreate(UHidCreateControlMessage),
    UHidInput(UHidInputControlMessage),
    UHidDestroy(UHidDestroyControlMessage),
    OpenHardKeyboardSettings,
    StartApp(StartAppControlMessage),
    ResetVideo,
}

impl ControlMessage {
    pub fn message_type(&self) -> ControlMessageType {
        match self {
            ControlMessage::InjectKeyCode(_) => ControlMessageType::InjectKeyCode,
            ControlMessage::InjectText(_) => ControlMessageType::InjectText,
            ControlMessage::InjectTouch(_) => ControlMessageType::InjectTouch,
            ControlMessage::InjectScroll(_) => ControlMessageType::InjectScroll,
            ControlMessage::BackOrScreenOn(_) => ControlMessageType::BackOrScreenOn,
            ControlMessage::ExpandNotificationPanel => ControlMessageType::ExpandNotificationPanel,
            ControlMessage::ExpandSettingsPanel => ControlMessageType::ExpandSettingsPanel,
            ControlMessage::CollapsePanels => ControlMessageType::CollapsePanels,
            ControlMessage::GetClipboard(_) => ControlMessageType::GetClipboard,
            ControlMessage::SetClipboard(_) => ControlMessageType::SetClipboard,
            ControlMessage::SetScreenPowerMode(_) => ControlMessageType::SetScreenPowerMode,
            ControlMessage::RotateDevice => ControlMessageType::RotateDevice,
            ControlMessage::UHidCreate(_) => ControlMessageType::UHidCreate,
            ControlMessage::UHidInput(_) => ControlMessageType::UHidInput,
            ControlMessage::UHidDestroy(_) => ControlMessageType::UHidDestroy,
            ControlMessage::OpenHardKeyboardSettings => ControlMessageType::OpenHardKeyboardSettings,
            ControlMessage::StartApp(_) => ControlMessageType::StartApp,
            ControlMessage::ResetVideo => ControlMessageType::ResetVideo,
        }
    }
}

// ── Serializer ────────────────────────────────────────────────────────────────

/// Encodes control messages for one protocol version.
#[derive(Debug, Clone)]
pub struct ControlMessageSerializer {
    types: Vec<ControlMessageType>,
    wire: WireLayout,
}

impl ControlMessageSerializer {
    pub fn new(types: &[ControlMessageType], wire: WireLayout) -> Self {
        Self {
            types: types.to_vec(),
            wire,
        }
    }

    /// The ordinal table this serializer writes.
    pub fn types(&self) -> &[ControlMessageType] {
        &self.types
    }

    /// The wire ordinal of `ty`, or `None` if the version does not know it.
    pub fn ordinal(&self, ty: ControlMessageType) -> Option<u8> {
        self.types
            .iter()
            .position(|t| *t == ty)
            .and_then(|index| u8::try_from(index).ok())
    }

    fn begin(&self, ty: ControlMessageType, body_len: usize) -> Option<Vec<u8>> {
        let ordinal = self.ordinal(ty)?;
        let mut buf = Vec::with_capacity(1 + body_len);
        buf.push(ordinal);
        Some(buf)
    }

    /// Encodes any message.  Returns `None` when the version lacks its type.
    pub fn serialize(&self, message: &ControlMessage) -> Option<Vec<u8>> {
        match message {
            ControlMessage::InjectKeyCode(m) => self.serialize_inject_keycode(m),
            ControlMessage::InjectText(m) => self.serialize_inject_text(m),
            ControlMessage::InjectTouch(m) => self.serialize_inject_touch(m),
            ControlMessage::InjectScroll(m) => {
                let steps = ScrollSteps::quantised(self.wire.scroll, m.scroll_x, m.scroll_y);
                let ordinal = self.ordinal(ControlMessageType::InjectScroll)?;
                Some(encode_scroll(ordinal, self.wire.scroll, m, steps))
            }
            ControlMessage::BackOrScreenOn(m) => self.serialize_back_or_screen_on(m),
            ControlMessage::GetClipboard(m) => self.serialize_get_clipboard(m),
            ControlMessage::SetClipboard(m) => self.serialize_set_clipboard(m, 0),
            ControlMessage::SetScreenPowerMode(m) => self.serialize_set_screen_power_mode(m),
            ControlMessage::UHidCreate(m) => self.serialize_uhid_create(m),
            ControlMessage::UHidInput(m) => self.serialize_uhid_input(m),
            ControlMessage::UHidDestroy(m) => self.serialize_uhid_destroy(m),
            ControlMessage::StartApp(m) => self.serialize_start_app(m),
            ControlMessage::ExpandNotificationPanel
            | ControlMessage::ExpandSettingsPanel
            | ControlMessage::CollapsePanels
            | ControlMessage::RotateDevice
            | ControlMessage::OpenHardKeyboardSettings
            | ControlMessage::ResetVideo => self.serialize_empty(message.message_type()),
        }
    }

    /// Type-only messages (panels, rotate, keyboard settings, reset video).
    pub fn serialize_empty(&self, ty: ControlMessageType) -> Option<Vec<u8>> {
        self.begin(ty, 0)
    }

    pub fn serialize_inject_keycode(&self, m: &InjectKeyCodeControlMessage) -> Option<Vec<u8>> {
        let mut buf = self.begin(ControlMessageType::InjectKeyCode, 13)?;
        buf.push(m.action as u8);
        buf.extend_from_slice(&m.key_code.to_be_bytes());
        buf.extend_from_slice(&m.repeat.to_be_bytes());
        buf.extend_from_slice(&m.meta_state.to_be_bytes());
        Some(buf)
    }

    /// Text longer than [`INJECT_TEXT_MAX_LENGTH`] bytes is truncated.
    pub fn serialize_inject_text(&self, m: &InjectTextControlMessage) -> Option<Vec<u8>> {
        let text = truncate_utf8(&m.text, INJECT_TEXT_MAX_LENGTH);
        let mut buf = self.begin(ControlMessageType::InjectText, 4 + text.len())?;
        write_string_u32(&mut buf, text, INJECT_TEXT_MAX_LENGTH);
        Some(buf)
    }

    pub fn serialize_inject_touch(&self, m: &InjectTouchControlMessage) -> Option<Vec<u8>> {
        let mut buf = self.begin(ControlMessageType::InjectTouch, 31)?;
        buf.push(m.action as u8);
        buf.extend_from_slice(&m.pointer_id.to_be_bytes());
        buf.extend_from_slice(&m.pointer_x.to_be_bytes());
        buf.extend_from_slice(&m.pointer_y.to_be_bytes());
        buf.extend_from_slice(&m.screen_width.to_be_bytes());
        buf.extend_from_slice(&m.screen_height.to_be_bytes());
        buf.extend_from_slice(&unsigned_fixed_u16(m.pressure).to_be_bytes());
        if self.wire.touch == TouchLayout::WithActionButton {
            buf.extend_from_slice(&m.action_button.to_be_bytes());
        }
        buf.extend_from_slice(&m.buttons.to_be_bytes());
        Some(buf)
    }

    /// Before 1.18 only a key-down is sent; a key-up is unsupported.
    pub fn serialize_back_or_screen_on(&self, m: &BackOrScreenOnControlMessage) -> Option<Vec<u8>> {
        match self.wire.back_or_screen_on {
            BackOrScreenOnLayout::WithAction => {
                let mut buf = self.begin(ControlMessageType::BackOrScreenOn, 1)?;
                buf.push(m.action as u8);
                Some(buf)
            }
            BackOrScreenOnLayout::DownOnly => match m.action {
                AndroidKeyEventAction::Down => self.begin(ControlMessageType::BackOrScreenOn, 0),
                AndroidKeyEventAction::Up => None,
            },
        }
    }

    pub fn serialize_get_clipboard(&self, m: &GetClipboardControlMessage) -> Option<Vec<u8>> {
        let mut buf = self.begin(ControlMessageType::GetClipboard, 1)?;
        if self.wire.get_clipboard == GetClipboardLayout::WithCopyKey {
            buf.push(m.copy_key as u8);
        }
        Some(buf)
    }

    /// Encodes a set-clipboard message with `sequence` (0 = no ack).
    ///
    /// Versions without sequenced set-clipboard drop the sequence.
    pub fn serialize_set_clipboard(
        &self,
        m: &SetClipboardControlMessage,
        sequence: u64,
    ) -> Option<Vec<u8>> {
        let text = truncate_utf8(&m.text, SET_CLIPBOARD_TEXT_MAX_LENGTH);
        let mut buf = self.begin(ControlMessageType::SetClipboard, 13 + text.len())?;
        if self.wire.set_clipboard == SetClipboardLayout::Sequenced {
            buf.extend_from_slice(&sequence.to_be_bytes());
        }
        buf.push(u8::from(m.paste));
        write_string_u32(&mut buf, text, SET_CLIPBOARD_TEXT_MAX_LENGTH);
        Some(buf)
    }

    pub fn serialize_set_screen_power_mode(
        &self,
        m: &SetScreenPowerModeControlMessage,
    ) -> Option<Vec<u8>> {
        let mut buf = self.begin(ControlMessageType::SetScreenPowerMode, 1)?;
        buf.push(m.mode as u8);
        Some(buf)
    }

    pub fn serialize_uhid_create(&self, m: &UHidCreateControlMessage) -> Option<Vec<u8>> {
        let mut buf = self.begin(
            ControlMessageType::UHidCreate,
            9 + m.name.len() + m.report_descriptor.len(),
        )?;
        buf.extend_from_slice(&m.id.to_be_bytes());
        if self.wire.uhid_create == UHidCreateLayout::Named {
            buf.extend_from_slice(&m.vendor_id.to_be_bytes());
            buf.extend_from_slice(&m.product_id.to_be_bytes());
            write_string_u8(&mut buf, &m.name);
        }
        write_bytes_u16(&mut buf, &m.report_descriptor);
        Some(buf)
    }

    pub fn serialize_uhid_input(&self, m: &UHidInputControlMessage) -> Option<Vec<u8>> {
        let mut buf = self.begin(ControlMessageType::UHidInput, 4 + m.data.len())?;
        buf.extend_from_slice(&m.id.to_be_bytes());
        write_bytes_u16(&mut buf, &m.data);
        Some(buf)
    }

    pub fn serialize_uhid_destroy(&self, m: &UHidDestroyControlMessage) -> Option<Vec<u8>> {
        let mut buf = self.begin(ControlMessageType::UHidDestroy, 2)?;
        buf.extend_from_slice(&m.id.to_be_bytes());
        Some(buf)
    }

    pub fn serialize_start_app(&self, m: &StartAppControlMessage) -> Option<Vec<u8>> {
        let mut buf = self.begin(ControlMessageType::StartApp, 1 + m.name.len())?;
        write_string_u8(&mut buf, &m.name);
        Some(buf)
    }

    /// A scroll controller bound to this version's scroll ordinal and layout.
    pub fn scroll_controller(&self) -> ScrollController {
        ScrollController::new(
            self.ordinal(ControlMessageType::InjectScroll),
            self.wire.scroll,
        )
    }
}

/// Writes an inject-scroll message whose steps have already been quantised.
pub(crate) fn encode_scroll(
    ordinal: u8,
    layout: ScrollLayout,
    m: &InjectScrollControlMessage,
    steps: ScrollSteps,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(25);
    buf.push(ordinal);
    buf.extend_from_slice(&m.pointer_x.to_be_bytes());
    buf.extend_from_slice(&m.pointer_y.to_be_bytes());
    buf.extend_from_slice(&m.screen_width.to_be_bytes());
    buf.extend_from_slice(&m.screen_height.to_be_bytes());
    match layout {
        ScrollLayout::IntegerSteps | ScrollLayout::IntegerStepsWithButtons => {
            buf.extend_from_slice(&(steps.x as i32).to_be_bytes());
            buf.extend_from_slice(&(steps.y as i32).to_be_bytes());
        }
        ScrollLayout::FixedPoint => {
            buf.extend_from_slice(&signed_fixed_i16(steps.x / ScrollSteps::FIXED_POINT_RANGE).to_be_bytes());
            buf.extend_from_slice(&signed_fixed_i16(steps.y / ScrollSteps::FIXED_POINT_RANGE).to_be_bytes());
        }
    }
    if layout != ScrollLayout::IntegerSteps {
        buf.extend_from_slice(&m.buttons.to_be_bytes());
    }
    buf
}
