//! crates/buildestimate_core/src/chat.rs
//!
//! The append-only message log attached to a project.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{ChatMessage, MediaType, Project, ProjectStatus, Role, User};
use crate::error::{DomainError, DomainResult};

/// A message as typed or uploaded by the sender.
#[derive(Debug, Clone, Default)]
pub struct MessageDraft {
    pub text: Option<String>,
    pub media_url: Option<String>,
    pub media_type: Option<MediaType>,
}

/// True when `user` is the owning customer or the engineer whose quote was accepted.
pub fn is_participant(project: &Project, user: &User) -> bool {
    match user.role() {
        Role::Customer => project.is_owned_by(user),
        Role::Engineer => project
            .accepted_estimate()
            .is_some_and(|e| e.engineer_id == user.id),
        Role::Admin => false,
    }
}

/// Participants and admins may read a thread.
pub fn can_read(project: &Project, user: &User) -> bool {
    user.role() == Role::Admin || is_participant(project, user)
}

/// Appends a message and returns a copy of it.
///
/// The thread opens once an engineer's quote has been accepted.
pub fn post(
    project: &mut Project,
    sender: &User,
    draft: MessageDraft,
    now: DateTime<Utc>,
) -> DomainResult<ChatMessage> {
    if project.status() == ProjectStatus::Submitted {
        return Err(DomainError::Forbidden(
            "chat opens once an engineer has quoted".to_string(),
        ));
    }
    if !is_participant(project, sender) {
        return Err(DomainError::Forbidden(
            "only the customer and the quoting engineer can chat".to_string(),
        ));
    }

    let text = draft.text.filter(|t| !t.trim().is_empty());
    let media_url = draft.media_url.filter(|u| !u.trim().is_empty());
    if text.is_none() && media_url.is_none() {
        return Err(DomainError::Validation(
            "a message needs text or an attachment".to_string(),
        ));
    }
    let media_type = media_url
        .as_ref()
        .map(|_| draft.media_type.unwrap_or(MediaType::File));

    let message = ChatMessage {
        id: Uuid::new_v4(),
        sender_id: sender.id,
        sender_name: sender.name.clone(),
        role: sender.role(),
        text,
        media_url,
        media_type,
        timestamp: now,
    };
    project.messages.push(message.clone());
    project.version += 1;
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConstructionDetails, EngineerProfile};
    use crate::lifecycle::{approve_with_quote, submit, QuoteRequest};

    struct Fixture {
        customer: User,
        engineer: User,
        project: Project,
    }

    fn fixture() -> Fixture {
        let customer = User::new("John Doe", "c@example.com", Role::Customer, EngineerProfile::default());
        let mut engineer = User::new("Eng", "e@example.com", Role::Engineer, EngineerProfile::default());
        engineer.is_approved = true;
        let project = submit(&customer, ConstructionDetails::default(), None, Vec::new(), Utc::now()).unwrap();
        Fixture { customer, engineer, project }
    }

    fn text(t: &str) -> MessageDraft {
        MessageDraft {
            text: Some(t.to_string()),
            ..MessageDraft::default()
        }
    }

    fn approve(f: &mut Fixture) {
        let quote = QuoteRequest {
            material_cost: Some(100),
            labor_cost: Some(100),
            ..QuoteRequest::default()
        };
        approve_with_quote(&mut f.project, &f.engineer, quote, Utc::now()).unwrap();
    }

    #[test]
    fn thread_is_closed_while_submitted() {
        let mut f = fixture();
        let err = post(&mut f.project, &f.customer, text("hello"), Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[test]
    fn participants_append_in_order() {
        let mut f = fixture();
        approve(&mut f);
        post(&mut f.project, &f.engineer, text("site visit monday"), Utc::now()).unwrap();
        post(&mut f.project, &f.customer, text("ok"), Utc::now()).unwrap();
        let texts: Vec<_> = f.project.messages().iter().map(|m| m.text.as_deref().unwrap()).collect();
        assert_eq!(texts, vec!["site visit monday", "ok"]);
        assert_eq!(f.project.messages()[0].role, Role::Engineer);
    }

    #[test]
    fn outsiders_cannot_post() {
        let mut f = fixture();
        approve(&mut f);
        let mut other = User::new("Other", "o@example.com", Role::Engineer, EngineerProfile::default());
        other.is_approved = true;
        assert!(post(&mut f.project, &other, text("hi"), Utc::now()).is_err());
        assert!(can_read(&f.project, &f.engineer));
        assert!(!can_read(&f.project, &other));
    }

    #[test]
    fn empty_message_is_rejected_and_media_defaults_to_file() {
        let mut f = fixture();
        approve(&mut f);
        assert!(matches!(
            post(&mut f.project, &f.customer, text("   "), Utc::now()),
            Err(DomainError::Validation(_))
        ));
        let draft = MessageDraft {
            media_url: Some("data:application/pdf;base64,AAAA".to_string()),
            ..MessageDraft::default()
        };
        let message = post(&mut f.project, &f.customer, draft, Utc::now()).unwrap();
        assert_eq!(message.media_type, Some(MediaType::File));
    }
}
