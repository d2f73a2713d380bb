//! Minimal server-rendered pages for the browser-facing forms.

use std::fmt::Write;

use rocket::response::{content::RawHtml, Redirect};

use crate::model::form::{petition::PetitionForm, registration::RegistrationForm, FieldErrors};

/// Outcome of a browser form submission: on to the next page, or the form
/// again with its errors.
#[derive(Debug, Responder)]
pub enum FormResponse {
    Redirect(Redirect),
    Page(RawHtml<String>),
}

/// Escape text for use in HTML content and double-quoted attributes.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn page(title: &str, body: &str) -> RawHtml<String> {
    RawHtml(format!(
        "<!DOCTYPE html>\n<html lang=\"es\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n<h1>{}</h1>\n{body}</body>\n</html>\n",
        escape(title),
        escape(title),
    ))
}

fn error_list(errors: &FieldErrors, field: &str) -> String {
    let messages = errors.for_field(field);
    if messages.is_empty() {
        return String::new();
    }
    let mut list = String::from("<ul class=\"errorlist\">");
    for message in messages {
        let _ = write!(list, "<li>{}</li>", escape(message));
    }
    list.push_str("</ul>\n");
    list
}

/// A labelled input, preceded by its errors. Values are only echoed back for
/// non-password inputs.
fn input(
    html: &mut String,
    errors: &FieldErrors,
    (name, label, kind): (&str, &str, &str),
    value: Option<&str>,
) {
    html.push_str(&error_list(errors, name));
    let value = match (kind, value) {
        ("password", _) | (_, None) => String::new(),
        (_, Some(value)) => format!(" value=\"{}\"", escape(value)),
    };
    let _ = writeln!(
        html,
        "<p><label for=\"id_{name}\">{label}</label> <input type=\"{kind}\" name=\"{name}\" id=\"id_{name}\"{value} required></p>"
    );
}

pub fn petition_page(form: &PetitionForm, errors: &FieldErrors, sent: bool) -> RawHtml<String> {
    let mut body = String::new();
    if sent {
        body.push_str("<p class=\"notice\">Your petition has been sent.</p>\n");
    }
    body.push_str("<form method=\"post\" action=\"/peticion\">\n");
    input(&mut body, errors, ("name", "Name", "text"), form.name.as_deref());
    input(&mut body, errors, ("email", "Email", "email"), form.email.as_deref());
    body.push_str(&error_list(errors, "content"));
    let _ = writeln!(
        body,
        "<p><label for=\"id_content\">Content</label> <textarea name=\"content\" id=\"id_content\" required>{}</textarea></p>",
        escape(form.content.as_deref().unwrap_or_default())
    );
    body.push_str("<button type=\"submit\">Send</button>\n</form>\n");
    page("Petition", &body)
}

pub fn registration_page(form: &RegistrationForm, errors: &FieldErrors) -> RawHtml<String> {
    let mut body = String::from("<form method=\"post\" action=\"/\">\n");
    input(&mut body, errors, ("username", "Username", "text"), form.username.as_deref());
    input(&mut body, errors, ("email", "Email", "email"), form.email.as_deref());
    input(&mut body, errors, ("password1", "Password", "password"), None);
    input(
        &mut body,
        errors,
        ("password2", "Password confirmation", "password"),
        None,
    );
    body.push_str("<button type=\"submit\">Sign up</button>\n</form>\n");
    page("Sign up", &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::form::REQUIRED;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape("<a href=\"x\">Tom & 'Jerry'</a>"),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#x27;Jerry&#x27;&lt;/a&gt;"
        );
    }

    #[test]
    fn petition_page_keeps_values_and_errors() {
        let form = PetitionForm {
            name: Some("<b>Ana</b>".to_string()),
            email: None,
            content: Some("Hi".to_string()),
        };
        let mut errors = FieldErrors::default();
        errors.add("email", REQUIRED);

        let RawHtml(html) = petition_page(&form, &errors, false);
        assert!(html.contains("value=\"&lt;b&gt;Ana&lt;/b&gt;\""));
        assert!(html.contains("<ul class=\"errorlist\"><li>This field is required.</li></ul>"));
        assert!(html.contains(">Hi</textarea>"));
        assert!(!html.contains("notice"));

        let RawHtml(html) = petition_page(&PetitionForm::default(), &FieldErrors::default(), true);
        assert!(html.contains("notice"));
        assert!(!html.contains("errorlist"));
    }

    #[test]
    fn registration_page_hides_passwords() {
        let form = RegistrationForm::example();
        let RawHtml(html) = registration_page(&form, &FieldErrors::default());
        assert!(html.contains("value=\"newvoter\""));
        assert!(!html.contains("decide-pass-123"));
    }
}
