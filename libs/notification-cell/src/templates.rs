//! HTML bodies of the emails the clinic sends.

use crate::models::AppointmentEmail;

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
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

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="pl">
  <head><meta charset="utf-8"><title>{title}</title></head>
  <body style="font-family: Arial, sans-serif; color: #1f2937; background: #f9fafb; padding: 24px;">
    <div style="max-width: 560px; margin: 0 auto; background: #ffffff; border-radius: 8px; padding: 24px;">
      <h1 style="font-size: 20px; margin-top: 0;">{title}</h1>
{body}
      <p style="font-size: 12px; color: #6b7280;">Wiadomość wygenerowana automatycznie, prosimy na nią nie odpowiadać.</p>
    </div>
  </body>
</html>"#,
        title = escape(title),
        body = body
    )
}

fn visit_details(data: &AppointmentEmail) -> String {
    format!(
        r#"      <ul>
        <li><strong>Lekarz:</strong> {doctor}</li>
        <li><strong>Termin:</strong> {when}</li>
        <li><strong>Rodzaj wizyty:</strong> {kind}</li>
        <li><strong>Forma wizyty:</strong> {mode}</li>
      </ul>"#,
        doctor = escape(&data.doctor_name),
        when = escape(&data.appointment_date_time),
        kind = escape(&data.appointment_type),
        mode = escape(&data.visit_mode),
    )
}

fn action_link(href: &str, label: &str) -> String {
    format!(
        r#"      <p><a href="{href}" style="display: inline-block; background: #2563eb; color: #ffffff; padding: 10px 16px; border-radius: 6px; text-decoration: none;">{label}</a></p>
      <p style="font-size: 12px; word-break: break-all;">{href}</p>"#,
        href = escape(href),
        label = escape(label),
    )
}

pub fn appointment_reminder(data: &AppointmentEmail) -> String {
    let body = format!(
        "      <p>Dzień dobry {name},</p>\n      <p>przypominamy o dzisiejszej wizycie.</p>\n{details}",
        name = escape(&data.patient_name),
        details = visit_details(data),
    );
    layout("Przypomnienie o wizycie", &body)
}

pub fn appointment_canceled(data: &AppointmentEmail) -> String {
    let body = format!(
        "      <p>Dzień dobry {name},</p>\n      <p>Twoja wizyta została odwołana.</p>\n{details}\n      <p>Zapraszamy do umówienia nowego terminu.</p>",
        name = escape(&data.patient_name),
        details = visit_details(data),
    );
    layout("Wizyta odwołana", &body)
}

pub fn verify_email(name: &str, link: &str) -> String {
    let body = format!(
        "      <p>Dzień dobry {name},</p>\n      <p>dziękujemy za rejestrację. Potwierdź adres email, klikając poniższy przycisk.</p>\n{action}",
        name = escape(name),
        action = action_link(link, "Potwierdź adres email"),
    );
    layout("Potwierdź adres email", &body)
}

pub fn set_password(name: &str, link: &str) -> String {
    let body = format!(
        "      <p>Dzień dobry {name},</p>\n      <p>utworzono dla Ciebie konto w systemie przychodni. Ustaw hasło, aby się zalogować. Link jest ważny przez godzinę.</p>\n{action}",
        name = escape(name),
        action = action_link(link, "Ustaw hasło"),
    );
    layout("Ustaw hasło", &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visit() -> AppointmentEmail {
        AppointmentEmail {
            patient_name: "Jan <Kowalski>".into(),
            doctor_name: "Anna Nowak".into(),
            appointment_date_time: "5 marca 2025, 09:40".into(),
            visit_mode: "Stacjonarna".into(),
            appointment_type: "Konsultacja".into(),
        }
    }

    #[test]
    fn reminder_contains_visit_details() {
        let html = appointment_reminder(&visit());
        assert!(html.contains("Anna Nowak"));
        assert!(html.contains("5 marca 2025, 09:40"));
        assert!(html.contains("Konsultacja"));
    }

    #[test]
    fn names_are_escaped() {
        let html = appointment_canceled(&visit());
        assert!(html.contains("Jan &lt;Kowalski&gt;"));
        assert!(!html.contains("<Kowalski>"));
    }

    #[test]
    fn links_are_rendered() {
        let html = verify_email("Jan", "http://localhost:3000/api/auth/verify-email?token=a&b");
        assert!(html.contains("verify-email?token=a&amp;b"));
    }
}
