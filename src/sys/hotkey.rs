use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use thiserror::Error;

bitflags! {
    /// Generic modifier set. Left and right variants are not distinguished.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const CONTROL = 0b0010;
        const ALT = 0b0100;
        const META = 0b1000;
        /// The full combined mask the Hyper key stands for.
        const HYPER = Self::SHIFT.bits() | Self::CONTROL.bits() | Self::ALT.bits() | Self::META.bits();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown key `{0}`")]
    UnknownKey(String),
    #[error("unknown modifier `{0}`")]
    UnknownModifier(String),
    #[error("no key specified in hotkey `{0}`")]
    MissingKey(String),
}

impl Modifiers {
    pub fn from_token(token: &str) -> Option<Modifiers> {
        let mods = match token.trim().to_lowercase().as_str() {
            "alt" | "option" | "opt" => Modifiers::ALT,
            "ctrl" | "control" => Modifiers::CONTROL,
            "shift" => Modifiers::SHIFT,
            "meta" | "cmd" | "command" => Modifiers::META,
            "hyper" => Modifiers::HYPER,
            _ => return None,
        };
        Some(mods)
    }

    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> Result<Modifiers, ParseError> {
        tokens.iter().try_fold(Modifiers::empty(), |acc, token| {
            let token = token.as_ref();
            Modifiers::from_token(token)
                .map(|m| acc | m)
                .ok_or_else(|| ParseError::UnknownModifier(token.to_string()))
        })
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Modifiers::HYPER {
            return f.write_str("Hyper");
        }
        let mut first = true;
        for (flag, name) in [
            (Modifiers::META, "Cmd"),
            (Modifiers::CONTROL, "Ctrl"),
            (Modifiers::ALT, "Alt"),
            (Modifiers::SHIFT, "Shift"),
        ] {
            if self.contains(flag) {
                if !first {
                    f.write_str(" + ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

macro_rules! key_codes {
    ($($variant:ident = $raw:literal => [$($name:literal),+ $(,)?]),* $(,)?) => {
        /// Physical keys, identified by their virtual key code.
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
        pub enum KeyCode {
            $($variant),*
        }

        impl KeyCode {
            pub const ALL: &'static [KeyCode] = &[$(KeyCode::$variant),*];

            pub fn from_raw(raw: u16) -> Option<KeyCode> {
                match raw {
                    $($raw => Some(KeyCode::$variant),)*
                    _ => None,
                }
            }

            pub fn raw(self) -> u16 {
                match self {
                    $(KeyCode::$variant => $raw),*
                }
            }

            fn names(self) -> &'static [&'static str] {
                match self {
                    $(KeyCode::$variant => &[$($name),+]),*
                }
            }
        }
    };
}

key_codes! {
    KeyA = 0x00 => ["A"],
    KeyS = 0x01 => ["S"],
    KeyD = 0x02 => ["D"],
    KeyF = 0x03 => ["F"],
    KeyH = 0x04 => ["H"],
    KeyG = 0x05 => ["G"],
    KeyZ = 0x06 => ["Z"],
    KeyX = 0x07 => ["X"],
    KeyC = 0x08 => ["C"],
    KeyV = 0x09 => ["V"],
    KeyB = 0x0B => ["B"],
    KeyQ = 0x0C => ["Q"],
    KeyW = 0x0D => ["W"],
    KeyE = 0x0E => ["E"],
    KeyR = 0x0F => ["R"],
    KeyY = 0x10 => ["Y"],
    KeyT = 0x11 => ["T"],
    Digit1 = 0x12 => ["1"],
    Digit2 = 0x13 => ["2"],
    Digit3 = 0x14 => ["3"],
    Digit4 = 0x15 => ["4"],
    Digit6 = 0x16 => ["6"],
    Digit5 = 0x17 => ["5"],
    Equal = 0x18 => ["=", "EQUAL"],
    Digit9 = 0x19 => ["9"],
    Digit7 = 0x1A => ["7"],
    Minus = 0x1B => ["-", "MINUS"],
    Digit8 = 0x1C => ["8"],
    Digit0 = 0x1D => ["0"],
    BracketRight = 0x1E => ["]", "RIGHTBRACKET"],
    KeyO = 0x1F => ["O"],
    KeyU = 0x20 => ["U"],
    BracketLeft = 0x21 => ["[", "LEFTBRACKET"],
    KeyI = 0x22 => ["I"],
    KeyP = 0x23 => ["P"],
    Enter = 0x24 => ["ENTER", "RETURN"],
    KeyL = 0x25 => ["L"],
    KeyJ = 0x26 => ["J"],
    Quote = 0x27 => ["'", "QUOTE"],
    KeyK = 0x28 => ["K"],
    Semicolon = 0x29 => [";", "SEMICOLON"],
    Backslash = 0x2A => ["\\", "BACKSLASH"],
    Comma = 0x2B => [",", "COMMA"],
    Slash = 0x2C => ["/", "SLASH"],
    KeyN = 0x2D => ["N"],
    KeyM = 0x2E => ["M"],
    Period = 0x2F => [".", "PERIOD"],
    Tab = 0x30 => ["TAB"],
    Space = 0x31 => ["SPACE"],
    Backquote = 0x32 => ["`", "GRAVE", "BACKQUOTE"],
    Backspace = 0x33 => ["BACKSPACE", "DELETE"],
    Escape = 0x35 => ["ESCAPE", "ESC"],
    CapsLock = 0x39 => ["CAPSLOCK"],
    F17 = 0x40 => ["F17"],
    F18 = 0x4F => ["F18"],
    F19 = 0x50 => ["F19"],
    F20 = 0x5A => ["F20"],
    F5 = 0x60 => ["F5"],
    F6 = 0x61 => ["F6"],
    F7 = 0x62 => ["F7"],
    F3 = 0x63 => ["F3"],
    F8 = 0x64 => ["F8"],
    F9 = 0x65 => ["F9"],
    F11 = 0x67 => ["F11"],
    F13 = 0x69 => ["F13"],
    F16 = 0x6A => ["F16"],
    F14 = 0x6B => ["F14"],
    F10 = 0x6D => ["F10"],
    F12 = 0x6F => ["F12"],
    F15 = 0x71 => ["F15"],
    Home = 0x73 => ["HOME"],
    PageUp = 0x74 => ["PAGEUP"],
    ForwardDelete = 0x75 => ["FORWARDDELETE"],
    F4 = 0x76 => ["F4"],
    End = 0x77 => ["END"],
    F2 = 0x78 => ["F2"],
    PageDown = 0x79 => ["PAGEDOWN"],
    F1 = 0x7A => ["F1"],
    ArrowLeft = 0x7B => ["LEFT", "ARROWLEFT"],
    ArrowRight = 0x7C => ["RIGHT", "ARROWRIGHT"],
    ArrowDown = 0x7D => ["DOWN", "ARROWDOWN"],
    ArrowUp = 0x7E => ["UP", "ARROWUP"],
}

impl FromStr for KeyCode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase();
        KeyCode::ALL
            .iter()
            .copied()
            .find(|key| key.names().iter().any(|name| *name == wanted))
            .ok_or_else(|| ParseError::UnknownKey(s.to_string()))
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.names()[0]) }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Hotkey {
    pub modifiers: Modifiers,
    pub key_code: KeyCode,
}

impl Hotkey {
    pub fn new(modifiers: Modifiers, key_code: KeyCode) -> Self { Self { modifiers, key_code } }

    /// Builds a hotkey from the separate key and modifier fields used by
    /// binding entries.
    pub fn from_parts<S: AsRef<str>>(key: &str, modifiers: &[S]) -> Result<Hotkey, ParseError> {
        Ok(Hotkey::new(Modifiers::from_tokens(modifiers)?, key.parse()?))
    }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.is_empty() {
            write!(f, "{}", self.key_code)
        } else {
            write!(f, "{} + {}", self.modifiers, self.key_code)
        }
    }
}

/// Parses strings such as `"Hyper + H"` or `"cmd+shift+1"`.
impl FromStr for Hotkey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens: Vec<&str> = s.split('+').map(str::trim).filter(|t| !t.is_empty()).collect();
        let key = tokens.pop().ok_or_else(|| ParseError::MissingKey(s.to_string()))?;
        if Modifiers::from_token(key).is_some() {
            return Err(ParseError::MissingKey(s.to_string()));
        }
        Hotkey::from_parts(key, &tokens[..])
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_hyper_is_all_four() {
        assert_eq!(
            Modifiers::HYPER,
            Modifiers::SHIFT | Modifiers::CONTROL | Modifiers::ALT | Modifiers::META
        );
        assert_eq!(Modifiers::from_token("Hyper"), Some(Modifiers::HYPER));
    }

    #[test]
    fn test_modifier_tokens() {
        let mods = Modifiers::from_tokens(&["cmd", "Option", "shift"]).unwrap();
        assert_eq!(mods, Modifiers::META | Modifiers::ALT | Modifiers::SHIFT);
        assert_eq!(
            Modifiers::from_tokens(&["cmd", "fn"]),
            Err(ParseError::UnknownModifier("fn".to_string()))
        );
    }

    #[test]
    fn test_key_code_names_round_trip_through_raw() {
        for key in KeyCode::ALL {
            assert_eq!(KeyCode::from_raw(key.raw()), Some(*key));
            assert_eq!(key.to_string().parse::<KeyCode>(), Ok(*key));
        }
    }

    #[test]
    fn test_key_code_aliases() {
        assert_eq!("return".parse::<KeyCode>(), Ok(KeyCode::Enter));
        assert_eq!("f18".parse::<KeyCode>(), Ok(KeyCode::F18));
        assert_eq!(KeyCode::from_raw(0x4F), Some(KeyCode::F18));
        assert_eq!(KeyCode::from_raw(0x0A), None);
        assert!("Hyperdrive".parse::<KeyCode>().is_err());
    }

    #[test]
    fn test_parse_hotkey() {
        let hotkey: Hotkey = "Hyper + H".parse().unwrap();
        assert_eq!(hotkey, Hotkey::new(Modifiers::HYPER, KeyCode::KeyH));

        let hotkey: Hotkey = "cmd+shift+1".parse().unwrap();
        assert_eq!(hotkey, Hotkey::new(Modifiers::META | Modifiers::SHIFT, KeyCode::Digit1));

        let hotkey: Hotkey = "F19".parse().unwrap();
        assert_eq!(hotkey, Hotkey::new(Modifiers::empty(), KeyCode::F19));
    }

    #[test]
    fn test_parse_hotkey_without_key() {
        assert!(matches!("cmd + shift".parse::<Hotkey>(), Err(ParseError::MissingKey(_))));
        assert!(matches!("".parse::<Hotkey>(), Err(ParseError::MissingKey(_))));
    }

    #[test]
    fn test_display() {
        assert_eq!(Hotkey::new(Modifiers::HYPER, KeyCode::KeyB).to_string(), "Hyper + B");
        assert_eq!(
            Hotkey::new(Modifiers::META | Modifiers::ALT, KeyCode::ArrowLeft).to_string(),
            "Cmd + Alt + LEFT"
        );
    }
}
