//! Screen identities and their sub-modes.

/// Every top-level screen the navigator can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScreenId {
    /// Launcher with mesh status and the notification preview.
    Home,
    /// Audiobook file list and player.
    Audiobook,
    /// Plain-text e-book reader.
    Books,
    /// Notes list and editor.
    Notes,
    /// SMS inbox, conversations and contacts.
    Sms,
    /// Web reader.
    Web,
    /// Device settings (also hosts onboarding).
    Settings,
}

impl ScreenId {
    /// Launcher entries in menu order.
    pub const LAUNCHER: [ScreenId; 6] = [
        ScreenId::Audiobook,
        ScreenId::Books,
        ScreenId::Notes,
        ScreenId::Sms,
        ScreenId::Web,
        ScreenId::Settings,
    ];

    /// Title shown in the status bar and launcher.
    pub const fn title(self) -> &'static str {
        match self {
            Self::Home => "Home",
            Self::Audiobook => "Audiobooks",
            Self::Books => "Books",
            Self::Notes => "Notes",
            Self::Sms => "Messages",
            Self::Web => "Web",
            Self::Settings => "Settings",
        }
    }
}

/// Audiobook screen sub-modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AudiobookMode {
    /// Directory listing.
    FileList,
    /// Open book.
    Player,
}

/// Notes screen sub-modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NotesMode {
    /// List of notes.
    List,
    /// Editing a note.
    Edit,
    /// Typing a title for a new note.
    NewName,
    /// Typing a new title for the selected note.
    Rename,
    /// Asking before deleting the selected note.
    ConfirmDelete,
}

/// SMS screen sub-modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SmsMode {
    /// Conversation list.
    Inbox,
    /// One conversation.
    Conversation,
    /// Typing the recipient of a new message.
    NewRecipient,
    /// Typing a message.
    Compose,
    /// Contact list.
    Contacts,
}

/// Web reader sub-modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WebMode {
    /// Choosing a network / typing credentials.
    WifiSetup,
    /// Associating with the saved network.
    Connecting,
    /// Bookmarks and history.
    Home,
    /// Typing a URL.
    UrlEntry,
    /// Request in flight.
    Fetching,
    /// Paginated page text.
    Reading,
    /// Choosing a link on the page.
    LinkSelect,
    /// Filling a form.
    FormFill,
}

#[cfg(test)]
mod tests {
    use super::ScreenId;

    #[test]
    fn test_launcher_excludes_home() {
        assert!(!ScreenId::LAUNCHER.contains(&ScreenId::Home));
        assert_eq!(ScreenId::LAUNCHER.len(), 6);
    }

    #[test]
    fn test_screen_is_copy() {
        let a = ScreenId::Notes;
        let b = a;
        assert_eq!(a, b);
        assert_eq!(b.title(), "Notes");
    }
}
