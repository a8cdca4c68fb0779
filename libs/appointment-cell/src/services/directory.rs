// libs/appointment-cell/src/services/directory.rs
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use conversation_cell::services::ConversationStore;
use patient_cell::services::ProfileStore;

use crate::models::{
    Appointment, AppointmentDetail, AppointmentError, AppointmentListItem, AppointmentView,
    MessageView, PatientContact,
};
use crate::services::booking::BookingEngine;

/// Read-side view of bookings joined with their patient and conversation.
pub struct AppointmentDirectory {
    booking: Arc<BookingEngine>,
    profiles: Arc<dyn ProfileStore>,
    conversations: Arc<dyn ConversationStore>,
}

impl AppointmentDirectory {
    pub fn new(
        booking: Arc<BookingEngine>,
        profiles: Arc<dyn ProfileStore>,
        conversations: Arc<dyn ConversationStore>,
    ) -> Self {
        Self {
            booking,
            profiles,
            conversations,
        }
    }

    pub async fn list_views(&self) -> Vec<AppointmentListItem> {
        let appointments = self.booking.list().await;
        let mut items = Vec::with_capacity(appointments.len());

        for appointment in &appointments {
            let contact = self.contact_for(&appointment.patient_id).await;

            items.push(AppointmentListItem {
                appointment: self.view_for(appointment).await,
                patient_name: contact.as_ref().and_then(|c| c.name.clone()),
                patient_email: contact.as_ref().and_then(|c| c.email.clone()),
                patient_phone: contact.as_ref().and_then(|c| c.phone.clone()),
                user: contact,
            });
        }

        debug!("Listed {} appointments", items.len());
        items
    }

    pub async fn detail(&self, appointment_id: Uuid) -> Result<AppointmentDetail, AppointmentError> {
        let appointment = self.booking.get(appointment_id).await?;

        let messages = self
            .conversations
            .messages(&appointment.thread_id)
            .await
            .iter()
            .map(MessageView::from)
            .collect();

        Ok(AppointmentDetail {
            appointment: self.view_for(&appointment).await,
            user: self.contact_for(&appointment.patient_id).await,
            messages,
        })
    }

    async fn view_for(&self, appointment: &Appointment) -> AppointmentView {
        let summary = self.conversations.summary(&appointment.thread_id).await;

        AppointmentView::new(
            appointment,
            summary.as_ref().map(|s| s.status),
            summary.as_ref().map(|s| s.updated_at),
        )
    }

    async fn contact_for(&self, patient_id: &str) -> Option<PatientContact> {
        self.profiles
            .get(patient_id)
            .await
            .as_ref()
            .map(PatientContact::from)
    }
}
