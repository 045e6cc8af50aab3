pub mod attendants;
pub mod chats;
pub mod companies;
pub mod sweep;
