//! Key bindings: the classic layout plus vim-style aliases.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MoveLeft,
    MoveRight,
    RotateLeft,
    RotateRight,
    /// One row down (`d`).
    SoftDrop,
    HardDrop,
    Pause,
    Restart,
    Quit,
    None,
}

impl Action {
    /// Actions that move or place the falling piece.
    pub fn is_piece_command(self) -> bool {
        matches!(
            self,
            Self::MoveLeft
                | Self::MoveRight
                | Self::RotateLeft
                | Self::RotateRight
                | Self::SoftDrop
                | Self::HardDrop
        )
    }
}

/// Map key event to game action. Up rotates left and Down rotates right, as in the classic game.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
        return Action::Quit;
    }
    if !no_mod {
        return Action::None;
    }
    match code {
        KeyCode::Char('q' | 'Q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('p' | 'P') => Action::Pause,
        KeyCode::Char('r' | 'R') => Action::Restart,
        KeyCode::Left | KeyCode::Char('h') => Action::MoveLeft,
        KeyCode::Right | KeyCode::Char('l') => Action::MoveRight,
        KeyCode::Up | KeyCode::Char('k') => Action::RotateLeft,
        KeyCode::Down | KeyCode::Char('j') => Action::RotateRight,
        KeyCode::Char(' ') => Action::HardDrop,
        KeyCode::Char('d' | 'D') => Action::SoftDrop,
        _ => Action::None,
    }
}
