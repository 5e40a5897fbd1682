pub mod content;
pub mod flags;
pub mod moderation;
pub mod users;
