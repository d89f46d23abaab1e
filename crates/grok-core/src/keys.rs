//! Key codes delivered by the keyboard view.

use crate::error::{CoreError, CoreResult};

/// Primary code of the shift key.
pub const KEYCODE_SHIFT: i32 = -1;
/// Primary code of the symbols/letters toggle.
pub const KEYCODE_MODE_CHANGE: i32 = -2;
/// Primary code of the hide-keyboard key.
pub const KEYCODE_CANCEL: i32 = -3;
/// Primary code of the backspace key.
pub const KEYCODE_DELETE: i32 = -5;
/// Primary code of the scan key.
pub const KEYCODE_TOGGLE_SCAN: i32 = 1000;
/// Primary code of the settings key.
pub const KEYCODE_SETTINGS: i32 = 1001;

/// A decoded key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Delete,
    Shift,
    Cancel,
    ModeChange,
    ToggleScan,
    Settings,
}

impl Key {
    /// Decodes a primary key code. Enter arrives as `Char('\n')`.
    pub fn from_primary_code(code: i32) -> CoreResult<Self> {
        match code {
            KEYCODE_SHIFT => Ok(Key::Shift),
            KEYCODE_MODE_CHANGE => Ok(Key::ModeChange),
            KEYCODE_CANCEL => Ok(Key::Cancel),
            KEYCODE_DELETE => Ok(Key::Delete),
            KEYCODE_TOGGLE_SCAN => Ok(Key::ToggleScan),
            KEYCODE_SETTINGS => Ok(Key::Settings),
            other => u32::try_from(other)
                .ok()
                .and_then(char::from_u32)
                .map(Key::Char)
                .ok_or(CoreError::UnknownKeyCode(other)),
        }
    }
}

/// Raw key events forwarded to the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorKey {
    Enter,
    Delete,
    /// A digit 0-9.
    Digit(u8),
}

impl EditorKey {
    /// Maps a separator character to a key event, or `None` when the
    /// character should be committed as text instead.
    pub fn for_separator(c: char) -> Option<Self> {
        match c {
            '\n' => Some(EditorKey::Enter),
            '0'..='9' => c.to_digit(10).map(|d| EditorKey::Digit(d as u8)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_special_codes() {
        assert_eq!(Key::from_primary_code(-1).unwrap(), Key::Shift);
        assert_eq!(Key::from_primary_code(-2).unwrap(), Key::ModeChange);
        assert_eq!(Key::from_primary_code(-3).unwrap(), Key::Cancel);
        assert_eq!(Key::from_primary_code(-5).unwrap(), Key::Delete);
        assert_eq!(Key::from_primary_code(1000).unwrap(), Key::ToggleScan);
        assert_eq!(Key::from_primary_code(1001).unwrap(), Key::Settings);
    }

    #[test]
    fn test_character_codes() {
        assert_eq!(Key::from_primary_code('a' as i32).unwrap(), Key::Char('a'));
        assert_eq!(Key::from_primary_code(10).unwrap(), Key::Char('\n'));
    }

    #[test]
    fn test_unknown_codes() {
        assert!(matches!(
            Key::from_primary_code(-4),
            Err(CoreError::UnknownKeyCode(-4))
        ));
        assert!(Key::from_primary_code(0xD800).is_err());
    }

    #[test]
    fn test_separator_key_events() {
        assert_eq!(EditorKey::for_separator('\n'), Some(EditorKey::Enter));
        assert_eq!(EditorKey::for_separator('7'), Some(EditorKey::Digit(7)));
        assert_eq!(EditorKey::for_separator(','), None);
    }
}
