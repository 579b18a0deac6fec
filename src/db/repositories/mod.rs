pub mod decks;
pub mod narration;
