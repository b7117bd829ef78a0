use std::time::Duration;

use reqwest::Client;

use serde::Serialize;

use secrecy::Secret;

use url::Url;

use crate::client::{DeliveryChannel, DeliveryError};
use crate::domain::EmailAddress;

const POSTMARK_TOKEN_HEADER: &str = "X-Postmark-Server-Token";

/// REST email API client
#[derive(Debug)]
pub struct EmailClient {
    client: Client,
    sender: EmailAddress,

    api_send_email_url: Url,
    api_auth_token: Secret<String>,
}

impl EmailClient {
    pub fn new(
        sender: EmailAddress,
        api_timeout: Duration,
        api_base_url: Url,
        api_auth_token: Secret<String>,
    ) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(api_timeout).build()?;

        let api_send_email_url = api_base_url.join("email")?;

        Ok(Self {
            client,
            sender,
            api_send_email_url,
            api_auth_token,
        })
    }

    #[tracing::instrument(name = "Send an email via API", skip(self, email), fields(subject = %email.subject))]
    pub async fn send(&self, recipient: &EmailAddress, email: &Email) -> reqwest::Result<()> {
        use secrecy::ExposeSecret;

        let body = email.as_request(&self.sender, recipient);

        self.client
            .post(self.api_send_email_url.clone())
            .header(POSTMARK_TOKEN_HEADER, self.api_auth_token.expose_secret())
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl DeliveryChannel for EmailClient {
    async fn deliver(&self, recipient: &EmailAddress, email: &Email) -> Result<(), DeliveryError> {
        self.send(recipient, email).await?;
        Ok(())
    }
}

/// Rendered email content
#[derive(Debug, Clone, PartialEq)]
pub struct Email {
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

impl Email {
    /// Email with an html body derived from plain text
    pub fn from_text(subject: impl Into<String>, text_body: impl Into<String>) -> Self {
        let text_body = text_body.into();
        let html_body = text_body
            .split("\n\n")
            .map(|paragraph| format!("<p>{}</p>", escape_html(paragraph).replace('\n', "<br>")))
            .collect();

        Self {
            subject: subject.into(),
            html_body,
            text_body,
        }
    }

    fn as_request<'a>(
        &'a self,
        sender: &'a EmailAddress,
        recipient: &'a EmailAddress,
    ) -> SendEmailRequest<'a> {
        SendEmailRequest {
            from: sender.as_ref(),
            to: recipient.as_ref(),
            subject: &self.subject,
            html_body: &self.html_body,
            text_body: &self.text_body,
        }
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html_body: &'a str,
    text_body: &'a str,
}
