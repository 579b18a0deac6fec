pub mod decks;
pub mod narration;
pub mod settings;
