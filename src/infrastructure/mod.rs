//! Infrastructure layer - storage backends, THORNode client and alert channels

pub mod notify;
pub mod store;
pub mod thornode;
