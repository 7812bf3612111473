//! Message bodies for outgoing mail. Each template yields a plain-text and an
//! HTML alternative.

use super::Email;

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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

pub fn password_reset(to: &str, reset_url: &str, valid_minutes: i64) -> Email {
    let text = format!(
        "Password Reset Request\n\n\
         We received a request to reset your password for your KTP account.\n\n\
         Email: {to}\n\
         Valid for: {valid_minutes} minutes\n\n\
         To reset your password, open the link below:\n\
         {reset_url}\n\n\
         If you didn't request this reset, ignore this email. \
         Your password will remain unchanged.\n\n\
         This is an automated email from KTP. Please do not reply.\n"
    );
    let url = escape_html(reset_url);
    let html = format!(
        "<!DOCTYPE html><html><body>\
         <h2>Password Reset Request</h2>\
         <p>We received a request to reset your password for your KTP account.</p>\
         <p><strong>Email:</strong> {email}<br>\
         <strong>Valid for:</strong> {valid_minutes} minutes</p>\
         <p><a href=\"{url}\">Reset Password</a></p>\
         <p>Or copy and paste this link into your browser:<br><code>{url}</code></p>\
         <p>If you didn't request this reset, ignore this email. \
         Your password will remain unchanged.</p>\
         <p><small>This is an automated email from KTP. Please do not reply.</small></p>\
         </body></html>",
        email = escape_html(to),
    );
    Email {
        to: to.to_string(),
        subject: "Password Reset Request - KTP".into(),
        text,
        html,
    }
}

pub fn welcome(to: &str, name: &str) -> Email {
    let text = format!(
        "Welcome to KTP!\n\n\
         Hi {name}!\n\n\
         Thank you for joining KTP. Your account has been created and you can \
         now start using all features.\n\n\
         Best regards,\nThe KTP Team\n"
    );
    let html = format!(
        "<!DOCTYPE html><html><body>\
         <h2>Hi {name}!</h2>\
         <p>Thank you for joining KTP. Your account has been created and you can \
         now start using all features.</p>\
         <p>Best regards,<br>The KTP Team</p>\
         </body></html>",
        name = escape_html(name),
    );
    Email {
        to: to.to_string(),
        subject: "Welcome to KTP!".into(),
        text,
        html,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_mail_carries_link_and_validity() {
        let mail = password_reset("a@x.com", "http://app/reset-password/abc", 10);
        assert!(mail.text.contains("http://app/reset-password/abc"));
        assert!(mail.text.contains("10 minutes"));
        assert!(mail.html.contains("href=\"http://app/reset-password/abc\""));
    }

    #[test]
    fn welcome_escapes_name_in_html() {
        let mail = welcome("a@x.com", "<b>Eve</b>");
        assert!(mail.html.contains("&lt;b&gt;Eve&lt;/b&gt;"));
        assert!(mail.text.contains("<b>Eve</b>"));
    }
}
