//! Reminder message templates, one per (rule, channel) combination.
//!
//! Every rule kind maps exhaustively — an unknown kind cannot exist, so
//! there is no runtime fallback path.

use carillon_core::{Appointment, ClinicIdentity, RuleKind};

/// Chat message body for a reminder.
pub fn whatsapp_message(rule: RuleKind, apt: &Appointment, clinic: &ClinicIdentity) -> String {
    let name = &apt.patient_name;
    let procedure = &apt.procedure;
    let date = &apt.date;
    let time = &apt.time;
    match rule {
        RuleKind::ThreeDays => format!(
            "🏥 Hi {name}! This is a friendly reminder about your {procedure} appointment \
             in 3 days on {date} at {time}. Please confirm your attendance by replying to \
             this message. Thank you!"
        ),
        RuleKind::OneDay => format!(
            "🏥 Hello {name}! Your {procedure} appointment is tomorrow {date} at {time}. \
             Please arrive 15 minutes early for check-in. Looking forward to seeing you!"
        ),
        RuleKind::Morning => format!(
            "🌅 Good morning {name}! You have a {procedure} appointment TODAY at {time}. \
             Please arrive 15 minutes early. Our clinic address: {}. See you soon!",
            clinic.address
        ),
        RuleKind::OneHour => format!(
            "⏰ Hi {name}! Your {procedure} appointment is in 1 HOUR at {time}. Please make \
             your way to our clinic now. Don't forget to bring your ID and insurance card. \
             Thank you!"
        ),
        RuleKind::Manual => format!(
            "🏥 Hi {name}, a reminder about your {procedure} appointment on {date} at {time}. \
             Contact us at {} with any questions.",
            clinic.phone
        ),
    }
}

/// Email subject line for a reminder.
pub fn email_subject(rule: RuleKind, apt: &Appointment, clinic: &ClinicIdentity) -> String {
    let name = &apt.patient_name;
    let clinic_name = &clinic.name;
    match rule {
        RuleKind::ThreeDays | RuleKind::Manual => {
            format!("Appointment Reminder - {name} | {clinic_name}")
        }
        RuleKind::OneDay => format!("Tomorrow's Appointment - {name} | {clinic_name}"),
        RuleKind::Morning => format!("Today's Appointment - {name} | {clinic_name}"),
        RuleKind::OneHour => format!("Appointment in 1 Hour - {name} | {clinic_name}"),
    }
}

/// Email body for a reminder.
pub fn email_body(rule: RuleKind, apt: &Appointment, clinic: &ClinicIdentity) -> String {
    let name = &apt.patient_name;
    let procedure = &apt.procedure;
    let date = &apt.date;
    let time = &apt.time;
    let signature = format!(
        "If you need to reschedule or have any questions, please contact us at {}.\n\n\
         Best regards,\n{} Team\n",
        clinic.phone, clinic.name
    );
    match rule {
        RuleKind::ThreeDays => format!(
            "Dear {name},\n\n\
             This is a friendly reminder about your upcoming appointment:\n\n\
             Procedure: {procedure}\nDate: {date}\nTime: {time}\nLocation: {}\n\n\
             Your appointment is in 3 days. Please mark your calendar and prepare any \
             necessary documents.\n\n{signature}",
            clinic.address
        ),
        RuleKind::OneDay => format!(
            "Dear {name},\n\n\
             Your appointment is tomorrow! Here are the details:\n\n\
             Procedure: {procedure}\nDate: {date} (TOMORROW)\nTime: {time}\nLocation: {}\n\n\
             Please arrive 15 minutes early for check-in. Don't forget to bring:\n\
             - Photo ID\n- Insurance card\n- Any relevant medical records\n\n{signature}",
            clinic.address
        ),
        RuleKind::Morning => format!(
            "Dear {name},\n\n\
             Good morning! You have an appointment TODAY:\n\n\
             Procedure: {procedure}\nDate: TODAY ({date})\nTime: {time}\nLocation: {}\n\n\
             Please arrive 15 minutes early. Our team is ready to assist you.\n\n{signature}",
            clinic.address
        ),
        RuleKind::OneHour => format!(
            "Dear {name},\n\n\
             Your appointment is in 1 HOUR:\n\n\
             Procedure: {procedure}\nTime: {time} (in 1 hour)\nLocation: {}\n\n\
             Please make your way to our clinic now. Parking is available on-site.\n\n\
             {signature}",
            clinic.address
        ),
        RuleKind::Manual => format!(
            "Dear {name},\n\n\
             This is a reminder about your appointment:\n\n\
             Procedure: {procedure}\nDate: {date}\nTime: {time}\nLocation: {}\n\n\
             {signature}",
            clinic.address
        ),
    }
}
