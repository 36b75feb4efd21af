//! Session instructions sent to the model in `session.update`.

use crate::local_time::{business_tz, day_label, WEEKDAYS};
use chrono::{DateTime, Utc};
use ringline_types::{BusinessConfig, CallerContext};
use std::fmt::Write;

/// Renders the full instruction text for one call.
pub fn build_instructions(
    business: &BusinessConfig,
    context: &CallerContext,
    now: DateTime<Utc>,
) -> String {
    let tz = business_tz(business);
    let local = now.with_timezone(&tz);
    let mut out = String::new();

    let _ = writeln!(
        out,
        "You are the phone receptionist for {}. Speak in the language with tag \"{}\". \
         Keep answers short and natural; this is a voice call.",
        business.name, business.language
    );
    let _ = writeln!(
        out,
        "The current date and time is {} ({}).",
        local.format("%A, %B %-d, %Y %-I:%M %p"),
        tz.name()
    );

    if let Some(custom) = business.instructions.as_deref().filter(|s| !s.trim().is_empty()) {
        let _ = writeln!(out, "\nOwner instructions:\n{}", custom.trim());
    }

    if !business.hours.is_empty() {
        out.push_str("\nBusiness hours:\n");
        for day in WEEKDAYS {
            let Some(hours) = business.hours.day(day) else {
                continue;
            };
            match (hours.open, hours.start.as_deref(), hours.end.as_deref()) {
                (true, Some(start), Some(end)) => {
                    let _ = writeln!(out, "- {}: {}-{}", day_label(day), start, end);
                }
                _ => {
                    let _ = writeln!(out, "- {}: closed", day_label(day));
                }
            }
        }
    }

    if !business.services.is_empty() {
        out.push_str("\nServices:\n");
        for service in &business.services {
            let mut line = format!("- {}", service.name);
            let details: Vec<String> = service
                .price
                .iter()
                .cloned()
                .chain(service.duration_minutes.map(|m| format!("{} min", m)))
                .collect();
            if !details.is_empty() {
                let _ = write!(line, " ({})", details.join(", "));
            }
            if let Some(desc) = service.description.as_deref() {
                let _ = write!(line, ": {}", desc);
            }
            let _ = writeln!(out, "{}", line);
        }
    }

    if let Some(kb) = business.knowledge_base.as_deref().filter(|s| !s.trim().is_empty()) {
        let _ = writeln!(out, "\nReference information:\n{}", kb.trim());
    }

    out.push_str("\nCaller:\n");
    write_caller(&mut out, context);

    out.push_str(
        "\nUse the available tools to book, reschedule or cancel appointments, take messages, \
         update the caller's details, and answer questions about hours and services. \
         Confirm the date and time with the caller before booking. Never invent a \
         confirmation code; read back the one the tool returns.\n",
    );
    out
}

/// The text item injected so the assistant speaks first.
pub fn greeting_prompt(business: &BusinessConfig, context: &CallerContext) -> String {
    match context.caller_name() {
        Some(name) => format!(
            "Greet {} warmly by name on behalf of {} and ask how you can help today.",
            name, business.name
        ),
        None => format!(
            "Greet the caller warmly on behalf of {} and ask how you can help today.",
            business.name
        ),
    }
}

fn write_caller(out: &mut String, context: &CallerContext) {
    if context.is_first_time_caller() {
        out.push_str("- First-time caller; no history on file.\n");
        return;
    }

    if let Some(contact) = &context.contact {
        match contact.name.as_deref() {
            Some(name) => {
                let _ = writeln!(out, "- Returning caller: {}", name);
            }
            None => out.push_str("- Returning caller; name not on file, ask for it.\n"),
        }
        if let Some(email) = contact.email.as_deref() {
            let _ = writeln!(out, "- Email: {}", email);
        }
        if let Some(notes) = contact.notes.as_deref() {
            let _ = writeln!(out, "- Notes: {}", notes);
        }
        if !contact.tags.is_empty() {
            let _ = writeln!(out, "- Tags: {}", contact.tags.join(", "));
        }
    }

    for appt in &context.recent_appointments {
        let _ = writeln!(
            out,
            "- Appointment {} for {} ({})",
            appt.scheduled_at,
            appt.service_type.as_deref().unwrap_or("unspecified service"),
            appt.status
        );
    }
    for conv in &context.recent_conversations {
        if let Some(last) = conv.last_message.as_deref() {
            let _ = writeln!(out, "- Conversation {}: last said \"{}\"", conv.timestamp, last);
        }
    }
    if !context.recent_calls.is_empty() {
        let answered = context.recent_calls.iter().filter(|c| c.answered).count();
        let _ = writeln!(
            out,
            "- {} previous call(s), {} answered, most recent {}",
            context.recent_calls.len(),
            answered,
            context.recent_calls[0].timestamp
        );
    }
}
