pub mod codec;
pub mod score;
pub mod search;
