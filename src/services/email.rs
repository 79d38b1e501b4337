use anyhow::Context;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use uuid::Uuid;

use crate::config::Config;

const BRAND: &str = "Find Your Preschool";

/// A message from a visitor, either to the site team or to one listing.
#[derive(Debug, Clone)]
pub struct Inquiry<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub phone: Option<&'a str>,
    pub message: &'a str,
}

pub struct EmailService {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailService {
    /// Returns None if SMTP is not fully configured.
    pub fn new(config: &Config) -> Option<Self> {
        let host = config.smtp_host.as_deref()?;
        let username = config.smtp_username.clone()?;
        let password = config.smtp_password.clone()?;
        let from_addr = config.smtp_from.as_deref()?;

        let port = config.smtp_port.unwrap_or(587);
        let creds = Credentials::new(username, password);

        let builder = if port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host).ok()?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host).ok()?
        };
        let transport = builder.port(port).credentials(creds).build();

        let from: Mailbox = from_addr.parse().ok()?;

        Some(Self { transport, from })
    }

    fn new_message_id(&self) -> String {
        format!("<{}@{}>", Uuid::new_v4(), self.from.email.domain())
    }

    fn wrap_html(title: &str, content: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>{title}</title></head>
<body style="margin:0;padding:0;background-color:#f8fafc;font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,Helvetica,Arial,sans-serif">
  <table role="presentation" width="100%" cellpadding="0" cellspacing="0" style="padding:32px 16px">
    <tr><td align="center">
      <table role="presentation" width="100%" cellpadding="0" cellspacing="0" style="max-width:560px">
        <tr><td style="padding-bottom:20px;font-size:20px;font-weight:700;color:#0f172a;text-align:center">{BRAND}</td></tr>
        <tr><td style="background:#ffffff;border-radius:10px;padding:32px">{content}</td></tr>
      </table>
    </td></tr>
  </table>
</body>
</html>"#
        )
    }

    fn inquiry_table(inquiry: &Inquiry<'_>) -> String {
        let row = |label: &str, value: &str| {
            format!(
                r#"<tr><td style="padding:8px 12px;font-size:14px;color:#64748b;width:110px">{label}</td><td style="padding:8px 12px;font-size:14px;color:#0f172a">{value}</td></tr>"#
            )
        };
        let message = escape_html(inquiry.message).replace('\n', "<br>");
        format!(
            r#"<table role="presentation" width="100%" cellpadding="0" cellspacing="0">{}{}{}{}</table>"#,
            row("Name", &escape_html(inquiry.name)),
            row("Email", &escape_html(inquiry.email)),
            row("Phone", &escape_html(inquiry.phone.unwrap_or("-"))),
            row("Message", &message),
        )
    }

    fn inquiry_text(intro: &str, inquiry: &Inquiry<'_>) -> String {
        format!(
            "{intro}\n\nName: {}\nEmail: {}\nPhone: {}\n\n{}",
            inquiry.name,
            inquiry.email,
            inquiry.phone.unwrap_or("-"),
            inquiry.message
        )
    }

    async fn send_email(
        &self,
        to: Mailbox,
        reply_to: Option<Mailbox>,
        subject: &str,
        text: &str,
        html: &str,
    ) -> anyhow::Result<()> {
        let mut builder = Message::builder()
            .message_id(Some(self.new_message_id()))
            .from(Mailbox::new(Some(BRAND.to_string()), self.from.email.clone()))
            .to(to)
            .subject(subject);
        if let Some(reply_to) = reply_to {
            builder = builder.reply_to(reply_to);
        }

        let email = builder
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html.to_string()),
                    ),
            )
            .context("Failed to build email message")?;

        self.transport
            .send(email)
            .await
            .context("Failed to send email")?;

        Ok(())
    }

    /// Contact form submission, delivered to the site contact address.
    pub async fn send_contact_message(&self, to_addr: &str, inquiry: &Inquiry<'_>) -> anyhow::Result<()> {
        let to: Mailbox = to_addr.parse().context("Invalid contact address")?;
        let subject = format!("New contact message from {}", inquiry.name);
        let text = Self::inquiry_text("New message received via the contact form.", inquiry);
        let content = format!(
            r#"<h1 style="margin:0 0 16px 0;font-size:18px;color:#0f172a">New contact message</h1>{}"#,
            Self::inquiry_table(inquiry)
        );
        let html = Self::wrap_html(&subject, &content);
        self.send_email(to, inquiry.email.parse().ok(), &subject, &text, &html).await
    }

    /// Parent inquiry forwarded to a listing.
    pub async fn send_school_inquiry(
        &self,
        to_addr: &str,
        school_name: &str,
        inquiry: &Inquiry<'_>,
    ) -> anyhow::Result<()> {
        let to = Mailbox::new(
            Some(school_name.to_string()),
            to_addr.parse().context("Invalid school address")?,
        );
        let subject = format!("Admission inquiry for {school_name}");
        let text = Self::inquiry_text(
            &format!("A parent sent an inquiry about {school_name} through {BRAND}."),
            inquiry,
        );
        let content = format!(
            r#"<h1 style="margin:0 0 16px 0;font-size:18px;color:#0f172a">Admission inquiry for {}</h1>{}"#,
            escape_html(school_name),
            Self::inquiry_table(inquiry)
        );
        let html = Self::wrap_html(&subject, &content);
        self.send_email(to, inquiry.email.parse().ok(), &subject, &text, &html).await
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inquiry() -> Inquiry<'static> {
        Inquiry {
            name: "Asha <script>",
            email: "asha@example.in",
            phone: None,
            message: "Seats for\nnursery?",
        }
    }

    #[test]
    fn inquiry_html_escapes_user_input() {
        let table = EmailService::inquiry_table(&inquiry());
        assert!(table.contains("Asha &lt;script&gt;"));
        assert!(table.contains("Seats for<br>nursery?"));
        assert!(table.contains(">-<"));
    }

    #[test]
    fn inquiry_text_lists_fields() {
        let text = EmailService::inquiry_text("Hello", &inquiry());
        assert!(text.starts_with("Hello\n\nName: Asha <script>"));
        assert!(text.contains("Phone: -"));
    }
}
