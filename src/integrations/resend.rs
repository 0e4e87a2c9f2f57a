use serde::{Deserialize, Serialize};
use tracing::error;

use crate::{constants::RESEND_EMAILS_URL, error::ServiceError, html::escape_html};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub turnstile_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Email {
    pub from: String,
    pub to: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: Option<String>,
}

/// Site owner identity used to sign confirmation emails.
#[derive(Debug, Clone)]
pub struct Signature {
    pub name: String,
    pub title: String,
}

pub struct Mailer<'a> {
    client: &'a reqwest::Client,
    api_key: &'a str,
    from_email: &'a str,
    to_email: &'a str,
}

impl<'a> Mailer<'a> {
    pub fn new(
        client: &'a reqwest::Client,
        api_key: &'a str,
        from_email: &'a str,
        to_email: &'a str,
    ) -> Self {
        Self {
            client,
            api_key,
            from_email,
            to_email,
        }
    }

    pub fn owner_notification(&self, contact: &ContactMessage) -> Email {
        let name = escape_html(&contact.name);
        let email = escape_html(&contact.email);
        let subject = escape_html(&contact.subject);
        let message = escape_html(&contact.message);

        Email {
            from: self.sender(),
            to: vec![self.to_email.to_string()],
            reply_to: Some(contact.email.clone()),
            subject: format!("[Portfolio Contact] {}", contact.subject),
            html: format!(
                r#"
<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
  <h2 style="color: #333; border-bottom: 2px solid #007bff; padding-bottom: 10px;">New Contact Form Submission</h2>
  <div style="background-color: #f8f9fa; padding: 20px; border-radius: 8px; margin: 20px 0;">
    <h3 style="color: #555; margin-top: 0;">Contact Details:</h3>
    <p><strong>Name:</strong> {name}</p>
    <p><strong>Email:</strong> {email}</p>
    <p><strong>Subject:</strong> {subject}</p>
  </div>
  <div style="background-color: #ffffff; padding: 20px; border: 1px solid #e9ecef; border-radius: 8px; margin: 20px 0;">
    <h3 style="color: #555; margin-top: 0;">Message:</h3>
    <p style="line-height: 1.6; white-space: pre-wrap;">{message}</p>
  </div>
  <div style="margin-top: 30px; padding-top: 20px; border-top: 1px solid #e9ecef; color: #666; font-size: 14px;">
    <p>This email was sent from your portfolio contact form.</p>
    <p>Reply directly to this email to respond to {name}.</p>
  </div>
</div>
"#
            ),
            text: format!(
                "New Contact Form Submission\n\nContact Details:\nName: {}\nEmail: {}\nSubject: {}\n\nMessage:\n{}\n\nThis email was sent from your portfolio contact form.\nReply directly to this email to respond to {}.\n",
                contact.name, contact.email, contact.subject, contact.message, contact.name
            ),
        }
    }

    pub fn sender_confirmation(&self, contact: &ContactMessage, signature: &Signature) -> Email {
        let name = escape_html(&contact.name);
        let subject = escape_html(&contact.subject);
        let message = escape_html(&contact.message);
        let owner = escape_html(&signature.name);
        let owner_title = escape_html(&signature.title);

        Email {
            from: self.sender(),
            to: vec![contact.email.clone()],
            reply_to: None,
            subject: "Thank you for contacting me!".to_string(),
            html: format!(
                r#"
<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
  <h2 style="color: #333; border-bottom: 2px solid #007bff; padding-bottom: 10px;">Thank You for Your Message!</h2>
  <p>Hi {name},</p>
  <p>Thank you for reaching out through my portfolio contact form. I've received your message and will get back to you as soon as possible.</p>
  <div style="background-color: #f8f9fa; padding: 20px; border-radius: 8px; margin: 20px 0;">
    <h3 style="color: #555; margin-top: 0;">Your Message:</h3>
    <p><strong>Subject:</strong> {subject}</p>
    <p><strong>Message:</strong></p>
    <p style="line-height: 1.6; white-space: pre-wrap; background-color: #ffffff; padding: 15px; border-radius: 5px; border-left: 4px solid #007bff;">{message}</p>
  </div>
  <p>I typically respond within 24-48 hours. If your message is urgent, feel free to reach out to me directly.</p>
  <div style="margin-top: 30px; padding-top: 20px; border-top: 1px solid #e9ecef; color: #666; font-size: 14px;">
    <p>Best regards,<br>{owner}</p>
    <p>{owner_title}</p>
  </div>
</div>
"#
            ),
            text: format!(
                "Thank You for Your Message!\n\nHi {},\n\nThank you for reaching out through my portfolio contact form. I've received your message and will get back to you as soon as possible.\n\nYour Message:\nSubject: {}\n\n{}\n\nI typically respond within 24-48 hours. If your message is urgent, feel free to reach out to me directly.\n\nBest regards,\n{}\n{}\n",
                contact.name, contact.subject, contact.message, signature.name, signature.title
            ),
        }
    }

    /// Returns the id Resend assigned to the email, when it reports one.
    pub async fn send(&self, email: &Email) -> Result<Option<String>, ServiceError> {
        let response = self
            .client
            .post(RESEND_EMAILS_URL)
            .bearer_auth(self.api_key)
            .json(email)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            error!("Resend error ({status}): {detail}");
            return Err(ServiceError::Internal("Failed to send email".to_string()));
        }

        let body: SendResponse = response.json().await?;
        Ok(body.id)
    }

    fn sender(&self) -> String {
        format!("Portfolio Contact <{}>", self.from_email)
    }
}
