//! Contact form route handler.
//!
//! Accepted messages are recorded in the log; nothing is sent anywhere.

use axum::{Json, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bazaar_core::Email;

use crate::error::{AppError, Result};
use crate::routes::extract::ApiJson;

const MAX_NAME_LENGTH: usize = 100;
const MAX_SUBJECT_LENGTH: usize = 200;
const MIN_MESSAGE_LENGTH: usize = 10;

/// Contact form data.
#[derive(Debug, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

/// Response for form submission.
#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub success: bool,
    pub message: String,
}

/// A contact message that passed validation.
#[derive(Debug)]
struct ContactMessage {
    name: String,
    email: Email,
    subject: String,
    message: String,
}

fn validate(form: &ContactForm) -> Result<ContactMessage> {
    let name = form.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Name is required.".to_string()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Name must be at most {MAX_NAME_LENGTH} characters."
        )));
    }

    let email = Email::parse(&form.email)
        .map_err(|_| AppError::BadRequest("Please enter a valid email address.".to_string()))?;

    let subject = form.subject.trim();
    if subject.is_empty() || subject.chars().count() > MAX_SUBJECT_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Subject is required and must be at most {MAX_SUBJECT_LENGTH} characters."
        )));
    }

    let message = form.message.trim();
    if message.chars().count() < MIN_MESSAGE_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Message must be at least {MIN_MESSAGE_LENGTH} characters."
        )));
    }

    Ok(ContactMessage {
        name: name.to_owned(),
        email,
        subject: subject.to_owned(),
        message: message.to_owned(),
    })
}

/// Submit the contact form.
///
/// POST /contact
#[instrument(skip(form))]
pub async fn submit(
    ApiJson(form): ApiJson<ContactForm>,
) -> Result<(StatusCode, Json<ContactResponse>)> {
    let contact = validate(&form)?;

    tracing::info!(
        name = %contact.name,
        email = %contact.email,
        subject = %contact.subject,
        message_len = contact.message.len(),
        "Contact message received"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(ContactResponse {
            success: true,
            message: "Thanks for reaching out. We'll get back to you soon.".to_string(),
        }),
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(name: &str, email: &str, subject: &str, message: &str) -> ContactForm {
        ContactForm {
            name: name.to_owned(),
            email: email.to_owned(),
            subject: subject.to_owned(),
            message: message.to_owned(),
        }
    }

    #[test]
    fn test_valid_contact() {
        let contact = validate(&form(
            " Ada ",
            "Ada@Example.com",
            "Order question",
            "Where is my parcel?",
        ))
        .unwrap();
        assert_eq!(contact.name, "Ada");
        assert_eq!(contact.email.as_str(), "ada@example.com");
    }

    #[test]
    fn test_contact_limits() {
        let long_name = "n".repeat(MAX_NAME_LENGTH + 1);
        let long_subject = "s".repeat(MAX_SUBJECT_LENGTH + 1);
        assert!(validate(&form(&long_name, "a@b.co", "Hi", "long enough text")).is_err());
        assert!(validate(&form("Ada", "nope", "Hi", "long enough text")).is_err());
        assert!(validate(&form("Ada", "a@b.co", &long_subject, "long enough text")).is_err());
        assert!(validate(&form("Ada", "a@b.co", "Hi", "too short")).is_err());
        assert!(validate(&form("Ada", "a@b.co", "Hi", "just enough")).is_ok());
    }
}
