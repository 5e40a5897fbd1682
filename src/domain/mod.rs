pub mod content;
pub mod moderation;
pub mod user;
