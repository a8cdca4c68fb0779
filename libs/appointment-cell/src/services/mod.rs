pub mod booking;
pub mod directory;
pub mod slots;

pub use booking::{AppointmentStore, BookingEngine, InMemoryAppointmentStore};
pub use directory::AppointmentDirectory;
pub use slots::SlotFinder;
