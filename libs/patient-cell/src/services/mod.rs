pub mod profile;

pub use profile::{merge_profile, InMemoryProfileStore, ProfileStore};
