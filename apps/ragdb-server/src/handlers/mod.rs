pub mod chat;
pub mod health;
pub mod search;
pub mod upload;
