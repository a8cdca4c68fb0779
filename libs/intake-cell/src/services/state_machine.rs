// libs/intake-cell/src/services/state_machine.rs
use conversation_cell::models::ThreadStatus;

/// What a completed turn established, in decreasing precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnEvent {
    /// A selected slot was booked this turn.
    Booked,
    NotReady,
    Ready { open_slots: usize },
}

/// Thread status after a turn.
///
/// Progress is monotone: a thread that left `collecting_details` is never sent
/// back there automatically, and `scheduled` only changes through a new booking.
pub fn next_status(current: ThreadStatus, event: TurnEvent) -> ThreadStatus {
    match (current, event) {
        (_, TurnEvent::Booked) => ThreadStatus::Scheduled,
        (ThreadStatus::Scheduled, _) => ThreadStatus::Scheduled,
        (current, TurnEvent::NotReady) if current.has_progressed() => current,
        (_, TurnEvent::NotReady) => ThreadStatus::CollectingDetails,
        (_, TurnEvent::Ready { open_slots }) if open_slots > 0 => ThreadStatus::AwaitingConfirmation,
        (_, TurnEvent::Ready { .. }) => ThreadStatus::ReadyToSchedule,
    }
}

/// Whether a ready turn should search for slots to offer.
pub fn needs_slot_offer(current: ThreadStatus) -> bool {
    current != ThreadStatus::Scheduled
}
