use std::fmt;

use serde::{Deserialize, Serialize};

use crate::storage::SessionStore;

pub const GREETING_TITLE: &str = "Hi there!";
pub const GREETING_SUBTITLE: &str = "Let's get you started";
const LOADING_FALLBACK: &str = "Loading...";
const ERROR_FALLBACK: &str = "Invalid configuration";

/// Every screen the widget can show. Exactly one is current at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Screen {
    #[default]
    Loading,
    Error,
    Auth,
    Voice,
    Selection,
    Inbox,
    Chat,
    Contact,
}

impl Screen {
    pub const ALL: [Screen; 8] = [
        Screen::Loading,
        Screen::Error,
        Screen::Auth,
        Screen::Voice,
        Screen::Selection,
        Screen::Inbox,
        Screen::Chat,
        Screen::Contact,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Screen::Loading => "loading",
            Screen::Error => "error",
            Screen::Auth => "auth",
            Screen::Voice => "voice",
            Screen::Selection => "selection",
            Screen::Inbox => "inbox",
            Screen::Chat => "chat",
            Screen::Contact => "contact",
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text rendering of a screen, as a host would lay it out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub screen: Screen,
    pub title: String,
    pub lines: Vec<String>,
}

impl View {
    fn new(screen: Screen, title: &str, lines: Vec<String>) -> Self {
        Self {
            screen,
            title: title.to_string(),
            lines,
        }
    }
}

/// Render whichever screen is current in `store`.
pub fn render_current(store: &SessionStore) -> View {
    render(store.screen(), store)
}

pub fn render(screen: Screen, store: &SessionStore) -> View {
    match screen {
        Screen::Loading => View::new(
            screen,
            GREETING_TITLE,
            vec![
                GREETING_SUBTITLE.to_string(),
                store
                    .loading_message()
                    .unwrap_or_else(|| LOADING_FALLBACK.to_string()),
            ],
        ),
        Screen::Error => View::new(
            screen,
            "Something went wrong",
            vec![store
                .error_message()
                .unwrap_or_else(|| ERROR_FALLBACK.to_string())],
        ),
        Screen::Auth => View::new(
            screen,
            GREETING_TITLE,
            vec![
                GREETING_SUBTITLE.to_string(),
                "Your Name".to_string(),
                "Your Email".to_string(),
            ],
        ),
        Screen::Selection => View::new(
            screen,
            GREETING_TITLE,
            vec![
                "How would you like to get in touch?".to_string(),
                "Start chat".to_string(),
            ],
        ),
        Screen::Chat => {
            let conversation = match store.conversation_id() {
                Some(id) => format!("Conversation {}", id),
                None => "No conversation open".to_string(),
            };
            View::new(screen, "Chat", vec![conversation])
        }
        Screen::Voice => View::new(
            screen,
            "Voice",
            vec!["Voice calls are not available yet".to_string()],
        ),
        Screen::Inbox => View::new(screen, "Inbox", vec!["No conversations yet".to_string()]),
        Screen::Contact => View::new(
            screen,
            "Contact",
            vec!["Contact options are not available yet".to_string()],
        ),
    }
}
