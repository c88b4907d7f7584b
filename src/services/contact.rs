use crate::{
    entities::{contact_message, ContactMessage, ContactMessageModel, ContactStatus},
    errors::ServiceError,
    notifications::{templates, Mailer},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

/// Contact-form intake and admin triage.
#[derive(Clone)]
pub struct ContactService {
    db: Arc<DatabaseConnection>,
    mailer: Arc<dyn Mailer>,
    admin_email: Option<String>,
}

impl ContactService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        mailer: Arc<dyn Mailer>,
        admin_email: Option<String>,
    ) -> Self {
        Self {
            db,
            mailer,
            admin_email,
        }
    }

    /// Store a submission and send the admin alert plus a confirmation to the
    /// sender, both best-effort.
    #[instrument(skip(self, input))]
    pub async fn submit(&self, input: ContactInput) -> Result<ContactMessageModel, ServiceError> {
        input.validate()?;

        let message = contact_message::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.clone()),
            email: Set(input.email.clone()),
            subject: Set(input.subject.clone()),
            message: Set(input.message.clone()),
            status: Set(ContactStatus::New),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };
        let message = message.insert(&*self.db).await?;

        if let Some(admin_email) = self.admin_email.clone() {
            self.send_or_warn(
                &admin_email,
                &format!("New Contact Us Message - {}", input.subject),
                &templates::contact_admin_alert(
                    &input.name,
                    &input.email,
                    &input.subject,
                    &input.message,
                ),
            )
            .await;
        }

        self.send_or_warn(
            &input.email,
            "We received your message",
            &templates::contact_acknowledgement(&input.name, &input.message),
        )
        .await;

        Ok(message)
    }

    pub async fn list(&self) -> Result<Vec<ContactMessageModel>, ServiceError> {
        Ok(ContactMessage::find()
            .order_by_desc(contact_message::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: Uuid,
        status: ContactStatus,
    ) -> Result<ContactMessageModel, ServiceError> {
        let message = ContactMessage::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Message not found".to_string()))?;

        let mut active: contact_message::ActiveModel = message.into();
        active.status = Set(status);
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }

    async fn send_or_warn(&self, to: &str, subject: &str, html: &str) {
        if let Err(e) = self.mailer.send(to, subject, html).await {
            warn!(%to, %subject, error = %e, "contact email not sent");
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ContactInput {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

impl ContactInput {
    fn validate(&self) -> Result<(), ServiceError> {
        for (field, value) in [
            ("name", &self.name),
            ("email", &self.email),
            ("subject", &self.subject),
            ("message", &self.message),
        ] {
            if value.trim().is_empty() {
                return Err(ServiceError::ValidationError(format!(
                    "All fields are required (missing {field})"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_input_requires_all_fields() {
        let input = ContactInput {
            name: "Ravi".to_string(),
            email: "ravi@example.com".to_string(),
            subject: "Delivery".to_string(),
            message: "".to_string(),
        };
        assert!(input.validate().is_err());
    }
}
