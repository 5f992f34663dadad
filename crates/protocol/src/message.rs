//! Chat-Nachricht
//!
//! Eine `Message` ist nach dem Erstellen unveraenderlich. Sie wird vom Client
//! erzeugt oder beim Dekodieren rekonstruiert.

use serde::{Deserialize, Serialize};

/// Eine Chat-Nachricht: wer hat was geschrieben
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    nickname: String,
    text: String,
}

impl Message {
    /// Erstellt eine neue Nachricht
    pub fn neu(nickname: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            nickname: nickname.into(),
            text: text.into(),
        }
    }

    /// Nickname des Absenders
    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    /// Nachrichtentext
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]: {}", self.nickname, self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anzeige_wie_im_chatfenster() {
        let m = Message::neu("Alice", "hi");
        assert_eq!(m.to_string(), "[Alice]: hi");
    }

    #[test]
    fn felder_lesen() {
        let m = Message::neu(String::from("Bob"), "");
        assert_eq!(m.nickname(), "Bob");
        assert_eq!(m.text(), "");
    }

    #[test]
    fn json_feldnamen_sind_stabil() {
        let json = serde_json::to_string(&Message::neu("Alice", "hi")).unwrap();
        assert_eq!(json, r#"{"nickname":"Alice","text":"hi"}"#);
    }
}
