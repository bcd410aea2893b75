//! Email templates.

/// Which flow an email belongs to. Providers that support it tag messages with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    Verification,
    Receipt,
}

impl EmailKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailKind::Verification => "verification",
            EmailKind::Receipt => "receipt",
        }
    }
}

/// Rendered email, ready for any provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailContent {
    pub kind: EmailKind,
    pub subject: String,
    pub text: String,
    pub html: String,
}

const STYLE: &str = r#"body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; line-height: 1.6; color: #333; margin: 0; padding: 0; background: #f7f3ee; }
        .container { max-width: 600px; margin: 0 auto; padding: 40px 20px; }
        .card { background: white; border-radius: 8px; padding: 40px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }
        h1 { color: #1a1a1a; margin-top: 0; font-size: 24px; }
        .button { display: inline-block; padding: 14px 28px; background: #d99904; color: white; text-decoration: none; border-radius: 6px; font-weight: bold; }
        .amount { font-size: 32px; font-weight: bold; color: #d99904; text-align: center; margin: 24px 0; }
        .footer { margin-top: 32px; padding-top: 20px; border-top: 1px solid #eee; color: #888; font-size: 12px; }"#;

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <style>
        {}
    </style>
</head>
<body>
    <div class="container">
        <div class="card">
            <h1>{}</h1>
            {}
            <div class="footer">
                <p>Bistro Richter</p>
            </div>
        </div>
    </div>
</body>
</html>"#,
        STYLE, title, body
    )
}

/// Minimal escaping for values interpolated into HTML bodies.
fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

impl EmailContent {
    /// Account verification email pointing at `link`.
    pub fn verification(link: &str) -> Self {
        let text = format!(
            r#"Welcome to Bistro Richter!

Please confirm your email address by opening this link:

{}

If you didn't create an account, please ignore this email."#,
            link
        );
        let link = escape(link);
        let html = page(
            "Welcome to Bistro Richter!",
            &format!(
                r#"<p>Please confirm your email address to finish setting up your account.</p>
            <p style="text-align: center;"><a class="button" href="{0}">Verify email</a></p>
            <p>Or paste this link into your browser:<br>{0}</p>
            <p>If you didn't create an account, please ignore this email.</p>"#,
                link
            ),
        );

        Self {
            kind: EmailKind::Verification,
            subject: "Verify your email address".to_string(),
            text,
            html,
        }
    }

    /// Receipt sent after a payment is recorded.
    pub fn payment_receipt(transaction_id: &str, price: f64) -> Self {
        let text = format!(
            r#"Thank you for your order!

Amount paid: ${:.2}
Transaction: {}

We're getting it ready."#,
            price, transaction_id
        );
        let html = page(
            "Thank you for your order!",
            &format!(
                r#"<div class="amount">${:.2}</div>
            <p>Transaction: <code>{}</code></p>
            <p>We're getting it ready.</p>"#,
                price,
                escape(transaction_id)
            ),
        );

        Self {
            kind: EmailKind::Receipt,
            subject: "Your Bistro Richter receipt".to_string(),
            text,
            html,
        }
    }
}
