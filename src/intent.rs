// src/intent.rs
//! Rule-based intent detection for the "create file" shortcut.

/// Phrase that triggers the shortcut, matched case-insensitively anywhere in the text.
pub const CREATE_FILE_TRIGGER: &str = "создай файл";

pub const SHORTCUT_FILENAME: &str = "test.txt";
pub const SHORTCUT_FILE_CONTENT: &str = "Привет, мир!";
pub const SHORTCUT_REPLY: &str = "Файл test.txt создан.";

/// True when `text` asks for a file to be created.
pub fn is_create_file_intent(text: &str) -> bool {
    // `to_lowercase` is Unicode-aware, which the Cyrillic trigger needs.
    text.to_lowercase().contains(CREATE_FILE_TRIGGER)
}
