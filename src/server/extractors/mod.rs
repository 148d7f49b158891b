mod player_session_extractor;

pub use player_session_extractor::*;
