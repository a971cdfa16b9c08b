use crate::conversations::ConversationRepository;
use crate::error::{
    ConversationError, ErrorKind, HelpRequestError, MutualAidError, ProfileError,
};
use crate::help_requests::HelpRequestRepository;
use crate::messages::MessageRepository;
use crate::notify::Notifier;
use crate::policy::AccessPolicy;
use crate::profiles::ProfileRepository;
use crate::store::Store;
use crate::types::{
    Confirmation, Conversation, ConversationId, ConversationStatus, CreateHelpRequestInput,
    CreateProfileInput, HelpRequest, HelpRequestId, HelpRequestStatus, Message, NewConversation,
    NewHelpRequest, NewMessage, Profile, UserId,
};
use crate::validation::{
    normalize_content, normalize_description, normalize_display_name, normalize_message,
    normalize_reason, normalize_title, validate_conversation_transition, validate_request_finish,
};
use chrono::{DateTime, Utc};
use ma_events::types::{Notification, NotificationKind};

/// The authenticated caller of an operation.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user_id: UserId,
    pub correlation_id: Option<String>,
}

impl RequestContext {
    pub fn new(user_id: UserId, correlation_id: Option<String>) -> Self {
        Self {
            user_id,
            correlation_id,
        }
    }
}

pub struct Lifecycle<S: Store, N: Notifier> {
    store: S,
    notifier: N,
    policy: AccessPolicy,
}

impl<S: Store, N: Notifier> Lifecycle<S, N> {
    pub fn new(store: S, notifier: N) -> Self {
        Self {
            store,
            notifier,
            policy: AccessPolicy::new(),
        }
    }

    pub fn offers(&self) -> OffersApi<'_, S, N> {
        OffersApi { core: self }
    }

    pub fn requests(&self) -> RequestsApi<'_, S, N> {
        RequestsApi { core: self }
    }

    pub fn profiles(&self) -> ProfilesApi<'_, S, N> {
        ProfilesApi { core: self }
    }

    pub fn messages(&self) -> MessagesApi<'_, S, N> {
        MessagesApi { core: self }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs `f` in one transaction, then hands its notifications to the
    /// notifier. Delivery failures are logged and never reach the caller.
    fn with_notifications<T, F>(&self, ctx: &RequestContext, f: F) -> Result<T, MutualAidError>
    where
        F: FnOnce(&S) -> Result<(T, Vec<Notification>), MutualAidError>,
    {
        let (value, notifications) = self.store.with_tx(f)?;
        for mut notification in notifications {
            notification.correlation_id.clone_from(&ctx.correlation_id);
            let recipient_id = notification.recipient_id.clone();
            let kind = notification.kind.as_str();
            if let Err(err) = self.notifier.notify(notification) {
                tracing::warn!(
                    recipient_id = %recipient_id,
                    kind,
                    correlation_id = ?ctx.correlation_id,
                    error = %err,
                    "notification dispatch failed"
                );
            }
        }
        Ok(value)
    }
}

pub struct OffersApi<'a, S: Store, N: Notifier> {
    core: &'a Lifecycle<S, N>,
}

impl<S: Store, N: Notifier> OffersApi<'_, S, N> {
    pub fn offer_help(
        &self,
        ctx: &RequestContext,
        request_id: &HelpRequestId,
        message: Option<String>,
    ) -> Result<Confirmation<Conversation>, MutualAidError> {
        let result = normalize_message(message).and_then(|message| {
            self.core.with_notifications(ctx, |store| {
                let request = load_request(store, request_id)?;
                self.core.policy.offer_help(&ctx.user_id, &request)?;
                if !matches!(
                    request.status,
                    HelpRequestStatus::Open | HelpRequestStatus::InProgress
                ) {
                    return Err(ConversationError::InvalidState {
                        message: format!(
                            "help request is {} and no longer accepting offers",
                            request.status
                        ),
                    }
                    .into());
                }
                if request.helper_id.is_some() {
                    return Err(already_has_helper().into());
                }
                if store
                    .conversations()
                    .find_active(request_id, &ctx.user_id)?
                    .is_some()
                {
                    return Err(ConversationError::Conflict {
                        message: "you already have an active offer on this help request"
                            .to_string(),
                    }
                    .into());
                }
                let conversation = store.conversations().create(NewConversation {
                    help_request_id: request.id.clone(),
                    requester_id: request.owner_id.clone(),
                    helper_id: ctx.user_id.clone(),
                    initial_message: message,
                })?;
                if let Some(content) = &conversation.initial_message {
                    store.messages().create(NewMessage {
                        conversation_id: conversation.id.clone(),
                        sender_id: ctx.user_id.clone(),
                        content: content.clone(),
                    })?;
                }
                store.help_requests().mark_in_progress(&request.id)?;
                let notice = notification(
                    NotificationKind::OfferReceived,
                    &request.owner_id,
                    &ctx.user_id,
                    &request,
                    Some(&conversation.id),
                    None,
                );
                Ok((Confirmation::new("Offer sent", conversation), vec![notice]))
            })
        });
        log_outcome("offer_help", ctx, request_id.as_str(), &result);
        result
    }

    pub fn accept(
        &self,
        ctx: &RequestContext,
        id: &ConversationId,
    ) -> Result<Confirmation<Conversation>, MutualAidError> {
        let result = self.core.with_notifications(ctx, |store| {
            let conversation = load_conversation(store, id)?;
            self.core
                .policy
                .respond_to_offer(&ctx.user_id, &conversation)?;
            validate_conversation_transition(conversation.status, ConversationStatus::Accepted)?;
            let request = load_request(store, &conversation.help_request_id)?;
            if request.status.is_terminal() {
                return Err(ConversationError::InvalidState {
                    message: format!(
                        "help request is {} and no longer accepting offers",
                        request.status
                    ),
                }
                .into());
            }
            if request.helper_id.is_some() {
                return Err(already_has_helper().into());
            }

            let updated = apply_transition(
                store,
                &conversation,
                ConversationStatus::Accepted,
                Utc::now(),
                None,
            )?;
            store
                .help_requests()
                .assign_helper(&request.id, &updated.helper_id)?
                .ok_or_else(already_has_helper)?;
            let notice = notification(
                NotificationKind::OfferAccepted,
                &updated.helper_id,
                &ctx.user_id,
                &request,
                Some(&updated.id),
                None,
            );
            Ok((Confirmation::new("Offer accepted", updated), vec![notice]))
        });
        log_outcome("accept_offer", ctx, id.as_str(), &result);
        result
    }

    pub fn reject(
        &self,
        ctx: &RequestContext,
        id: &ConversationId,
        reason: Option<String>,
    ) -> Result<Confirmation<Conversation>, MutualAidError> {
        let result = normalize_reason(reason).and_then(|reason| {
            self.core.with_notifications(ctx, |store| {
                let conversation = load_conversation(store, id)?;
                self.core
                    .policy
                    .respond_to_offer(&ctx.user_id, &conversation)?;
                validate_conversation_transition(
                    conversation.status,
                    ConversationStatus::Rejected,
                )?;
                let request = load_request(store, &conversation.help_request_id)?;

                let updated = apply_transition(
                    store,
                    &conversation,
                    ConversationStatus::Rejected,
                    Utc::now(),
                    reason.as_deref(),
                )?;
                let notice = notification(
                    NotificationKind::OfferRejected,
                    &updated.helper_id,
                    &ctx.user_id,
                    &request,
                    Some(&updated.id),
                    reason.as_deref(),
                );
                Ok((Confirmation::new("Offer declined", updated), vec![notice]))
            })
        });
        log_outcome("reject_offer", ctx, id.as_str(), &result);
        result
    }

    pub fn close(
        &self,
        ctx: &RequestContext,
        id: &ConversationId,
    ) -> Result<Confirmation<Conversation>, MutualAidError> {
        let result = self.core.with_notifications(ctx, |store| {
            let conversation = load_conversation(store, id)?;
            self.core
                .policy
                .close_conversation(&ctx.user_id, &conversation)?;
            validate_conversation_transition(conversation.status, ConversationStatus::Closed)?;
            let updated = apply_transition(
                store,
                &conversation,
                ConversationStatus::Closed,
                Utc::now(),
                None,
            )?;
            Ok((Confirmation::new("Conversation closed", updated), Vec::new()))
        });
        log_outcome("close_conversation", ctx, id.as_str(), &result);
        result
    }

    pub fn get(
        &self,
        ctx: &RequestContext,
        id: &ConversationId,
    ) -> Result<Conversation, MutualAidError> {
        let conversation = load_conversation(&self.core.store, id)?;
        self.core
            .policy
            .view_conversation(&ctx.user_id, &conversation)?;
        Ok(conversation)
    }

    pub fn list_for_request(
        &self,
        ctx: &RequestContext,
        request_id: &HelpRequestId,
    ) -> Result<Vec<Conversation>, MutualAidError> {
        let request = load_request(&self.core.store, request_id)?;
        let conversations = self.core.store.conversations().list_for_request(request_id)?;
        if self.core.policy.sees_all_offers(&ctx.user_id, &request) {
            return Ok(conversations);
        }
        Ok(conversations
            .into_iter()
            .filter(|conversation| conversation.helper_id == ctx.user_id)
            .collect())
    }

    /// The caller's own conversations on either side, e.g. `Pending` for
    /// open offers or `Accepted` for active help.
    pub fn list_mine(
        &self,
        ctx: &RequestContext,
        status: Option<ConversationStatus>,
    ) -> Result<Vec<Conversation>, MutualAidError> {
        self.core
            .store
            .conversations()
            .list_for_user(&ctx.user_id, status)
    }
}

pub struct MessagesApi<'a, S: Store, N: Notifier> {
    core: &'a Lifecycle<S, N>,
}

impl<S: Store, N: Notifier> MessagesApi<'_, S, N> {
    pub fn send(
        &self,
        ctx: &RequestContext,
        conversation_id: &ConversationId,
        content: &str,
    ) -> Result<Confirmation<Message>, MutualAidError> {
        let result = normalize_content(content).and_then(|content| {
            self.core.with_notifications(ctx, |store| {
                let conversation = load_conversation(store, conversation_id)?;
                self.core
                    .policy
                    .send_message(&ctx.user_id, &conversation)?;
                if !conversation.accepts_messages() {
                    return Err(ConversationError::InvalidState {
                        message: format!(
                            "conversation is {} and no longer accepts messages",
                            conversation.status
                        ),
                    }
                    .into());
                }
                let request = load_request(store, &conversation.help_request_id)?;
                let message = store.messages().create(NewMessage {
                    conversation_id: conversation.id.clone(),
                    sender_id: ctx.user_id.clone(),
                    content,
                })?;
                let mut notice = notification(
                    NotificationKind::MessageReceived,
                    conversation.other_participant(&ctx.user_id),
                    &ctx.user_id,
                    &request,
                    Some(&conversation.id),
                    None,
                );
                notice.preview = Some(message.content.clone());
                Ok((Confirmation::new("Message sent", message), vec![notice]))
            })
        });
        log_outcome("send_message", ctx, conversation_id.as_str(), &result);
        result
    }

    pub fn list(
        &self,
        ctx: &RequestContext,
        conversation_id: &ConversationId,
        limit: u32,
    ) -> Result<Vec<Message>, MutualAidError> {
        let conversation = load_conversation(&self.core.store, conversation_id)?;
        self.core
            .policy
            .view_conversation(&ctx.user_id, &conversation)?;
        self.core
            .store
            .messages()
            .list_for_conversation(conversation_id, limit)
    }
}

pub struct RequestsApi<'a, S: Store, N: Notifier> {
    core: &'a Lifecycle<S, N>,
}

impl<S: Store, N: Notifier> RequestsApi<'_, S, N> {
    pub fn create(
        &self,
        ctx: &RequestContext,
        input: CreateHelpRequestInput,
    ) -> Result<Confirmation<HelpRequest>, MutualAidError> {
        let title = normalize_title(&input.title)?;
        let description = normalize_description(input.description)?;
        let request = self.core.store.with_tx(|store| {
            store.help_requests().create(NewHelpRequest {
                owner_id: ctx.user_id.clone(),
                title,
                description,
            })
        })?;
        tracing::info!(
            help_request_id = %request.id,
            user_id = %ctx.user_id,
            correlation_id = ?ctx.correlation_id,
            "help request created"
        );
        Ok(Confirmation::new("Help request created", request))
    }

    pub fn get(&self, id: &HelpRequestId) -> Result<HelpRequest, MutualAidError> {
        load_request(&self.core.store, id)
    }

    pub fn complete(
        &self,
        ctx: &RequestContext,
        id: &HelpRequestId,
    ) -> Result<Confirmation<HelpRequest>, MutualAidError> {
        let result = self.core.with_notifications(ctx, |store| {
            let request = load_request(store, id)?;
            let party = self.core.policy.complete_request(&ctx.user_id, &request)?;
            validate_request_finish(request.status)?;

            let now = Utc::now();
            let updated = finish_request(store, &request, HelpRequestStatus::Completed, now, None)?;
            close_accepted_offer(store, &updated.id, now)?;
            let notices: Vec<Notification> = updated
                .counterparty(party)
                .map(|recipient| {
                    notification(
                        NotificationKind::RequestCompleted,
                        recipient,
                        &ctx.user_id,
                        &updated,
                        None,
                        None,
                    )
                })
                .into_iter()
                .collect();
            Ok((
                Confirmation::new("Help request marked as completed", updated),
                notices,
            ))
        });
        log_outcome("complete_request", ctx, id.as_str(), &result);
        result
    }

    pub fn cancel(
        &self,
        ctx: &RequestContext,
        id: &HelpRequestId,
        reason: Option<String>,
    ) -> Result<Confirmation<HelpRequest>, MutualAidError> {
        let result = normalize_reason(reason).and_then(|reason| {
            self.core.with_notifications(ctx, |store| {
                let request = load_request(store, id)?;
                let party = self.core.policy.cancel_request(&ctx.user_id, &request)?;
                validate_request_finish(request.status)?;

                let now = Utc::now();
                let updated = finish_request(
                    store,
                    &request,
                    HelpRequestStatus::Cancelled,
                    now,
                    reason.as_deref(),
                )?;
                close_accepted_offer(store, &updated.id, now)?;
                let notices: Vec<Notification> = updated
                    .counterparty(party)
                    .map(|recipient| {
                        notification(
                            NotificationKind::RequestCancelled,
                            recipient,
                            &ctx.user_id,
                            &updated,
                            None,
                            reason.as_deref(),
                        )
                    })
                    .into_iter()
                    .collect();
                Ok((Confirmation::new("Help request cancelled", updated), notices))
            })
        });
        log_outcome("cancel_request", ctx, id.as_str(), &result);
        result
    }

    /// Owner-only administrative close. Needs no accepted offer.
    pub fn close(
        &self,
        ctx: &RequestContext,
        id: &HelpRequestId,
        reason: Option<String>,
    ) -> Result<Confirmation<HelpRequest>, MutualAidError> {
        let result = normalize_reason(reason).and_then(|reason| {
            self.core.with_notifications(ctx, |store| {
                let request = load_request(store, id)?;
                self.core.policy.close_request(&ctx.user_id, &request)?;
                validate_request_finish(request.status)?;

                let now = Utc::now();
                let updated = finish_request(
                    store,
                    &request,
                    HelpRequestStatus::Closed,
                    now,
                    reason.as_deref(),
                )?;
                close_accepted_offer(store, &updated.id, now)?;
                Ok((Confirmation::new("Help request closed", updated), Vec::new()))
            })
        });
        log_outcome("close_request", ctx, id.as_str(), &result);
        result
    }
}

pub struct ProfilesApi<'a, S: Store, N: Notifier> {
    core: &'a Lifecycle<S, N>,
}

impl<S: Store, N: Notifier> ProfilesApi<'_, S, N> {
    pub fn create(
        &self,
        ctx: &RequestContext,
        input: CreateProfileInput,
    ) -> Result<Confirmation<Profile>, MutualAidError> {
        let display_name = normalize_display_name(&input.display_name)?;
        let profile = self.core.store.with_tx(|store| {
            if store.profiles().get(&ctx.user_id)?.is_some() {
                return Err(ProfileError::AlreadyExists.into());
            }
            store.profiles().create(&ctx.user_id, &display_name)
        })?;
        Ok(Confirmation::new("Profile created", profile))
    }

    pub fn get(&self, id: &UserId) -> Result<Profile, MutualAidError> {
        self.find(id)?.ok_or_else(|| ProfileError::NotFound.into())
    }

    pub fn find(&self, id: &UserId) -> Result<Option<Profile>, MutualAidError> {
        self.core.store.profiles().get(id)
    }
}

fn load_conversation<S: Store>(
    store: &S,
    id: &ConversationId,
) -> Result<Conversation, MutualAidError> {
    store
        .conversations()
        .get(id)?
        .ok_or_else(|| ConversationError::NotFound.into())
}

fn load_request<S: Store>(store: &S, id: &HelpRequestId) -> Result<HelpRequest, MutualAidError> {
    store
        .help_requests()
        .get(id)?
        .ok_or_else(|| HelpRequestError::NotFound.into())
}

/// Applies a conditional transition; losing the row to a concurrent writer
/// reports the status that writer left behind.
fn apply_transition<S: Store>(
    store: &S,
    conversation: &Conversation,
    to: ConversationStatus,
    at: DateTime<Utc>,
    rejection_reason: Option<&str>,
) -> Result<Conversation, MutualAidError> {
    if let Some(updated) = store.conversations().transition(
        &conversation.id,
        conversation.status,
        to,
        at,
        rejection_reason,
    )? {
        return Ok(updated);
    }
    let current = load_conversation(store, &conversation.id)?;
    Err(ConversationError::InvalidTransition {
        from: current.status,
        to,
    }
    .into())
}

fn finish_request<S: Store>(
    store: &S,
    request: &HelpRequest,
    to: HelpRequestStatus,
    at: DateTime<Utc>,
    reason: Option<&str>,
) -> Result<HelpRequest, MutualAidError> {
    if let Some(updated) = store.help_requests().finish(&request.id, to, at, reason)? {
        return Ok(updated);
    }
    let current = load_request(store, &request.id)?;
    validate_request_finish(current.status)?;
    Err(HelpRequestError::InvalidState {
        message: format!("help request is {}", current.status),
    }
    .into())
}

fn close_accepted_offer<S: Store>(
    store: &S,
    request_id: &HelpRequestId,
    at: DateTime<Utc>,
) -> Result<(), MutualAidError> {
    if let Some(conversation) = store.conversations().find_accepted(request_id)? {
        store.conversations().transition(
            &conversation.id,
            ConversationStatus::Accepted,
            ConversationStatus::Closed,
            at,
            None,
        )?;
    }
    Ok(())
}

fn already_has_helper() -> ConversationError {
    ConversationError::InvalidState {
        message: "help request already has a helper".to_string(),
    }
}

fn notification(
    kind: NotificationKind,
    recipient: &UserId,
    actor: &UserId,
    request: &HelpRequest,
    conversation_id: Option<&ConversationId>,
    reason: Option<&str>,
) -> Notification {
    Notification {
        kind,
        recipient_id: recipient.to_string(),
        actor_id: actor.to_string(),
        help_request_id: request.id.to_string(),
        conversation_id: conversation_id.map(ToString::to_string),
        request_title: request.title.clone(),
        reason: reason.map(str::to_string),
        preview: None,
        correlation_id: None,
        at: Utc::now(),
    }
}

fn log_outcome<T>(
    operation: &'static str,
    ctx: &RequestContext,
    entity_id: &str,
    result: &Result<T, MutualAidError>,
) {
    match result {
        Ok(_) => tracing::info!(
            operation,
            entity_id,
            user_id = %ctx.user_id,
            correlation_id = ?ctx.correlation_id,
            "transition applied"
        ),
        Err(err) if err.kind() == ErrorKind::Internal => tracing::error!(
            operation,
            entity_id,
            user_id = %ctx.user_id,
            correlation_id = ?ctx.correlation_id,
            error = %err,
            "transition failed"
        ),
        Err(err) => tracing::warn!(
            operation,
            entity_id,
            user_id = %ctx.user_id,
            correlation_id = ?ctx.correlation_id,
            error = %err,
            "transition refused"
        ),
    }
}
