pub mod store;
pub mod turn_lock;

pub use store::{ConversationStore, InMemoryConversationStore};
pub use turn_lock::TurnLocks;
