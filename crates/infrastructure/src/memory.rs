//! 内存存储
//!
//! 三个仓储共用一把读写锁，条件写入在同一次加锁内完成检查和修改。
//! 用于开发环境和测试，进程退出后数据丢失。

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use application::{
    ChatRepository, CreatedSession, ProfileWithUser, SessionRepository, UserRepository,
};
use async_trait::async_trait;
use domain::{
    Chat, ChatId, ChatMembership, MembershipStatus, Message, MessageId, NewMessage, NewSession,
    NewUser, Participant, Profile, RepositoryError, Session, SessionId, SessionMembership,
    Timestamp, User, UserEmail, UserId,
};
use tokio::sync::RwLock;

#[derive(Default)]
struct MemoryState {
    last_user_id: i64,
    last_session_id: i64,
    last_chat_id: i64,
    last_message_id: i64,
    users: BTreeMap<UserId, User>,
    profiles: HashMap<UserId, Profile>,
    sessions: BTreeMap<SessionId, Session>,
    memberships: HashMap<(UserId, SessionId), SessionMembership>,
    chats: HashMap<SessionId, Chat>,
    chat_members: HashSet<ChatMembership>,
    messages: Vec<Message>,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

impl MemoryState {
    fn chat_id_of(&self, session_id: SessionId) -> Option<ChatId> {
        self.chats.get(&session_id).map(|chat| chat.id)
    }

    // 删除活动及其聊天、成员和消息
    fn drop_session(&mut self, session_id: SessionId) {
        self.sessions.remove(&session_id);
        self.memberships.retain(|(_, sid), _| *sid != session_id);
        if let Some(chat) = self.chats.remove(&session_id) {
            self.chat_members.retain(|member| member.chat_id != chat.id);
            self.messages.retain(|message| message.chat_id != chat.id);
        }
    }
}

#[derive(Clone, Default)]
pub struct InMemoryStorage {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryStorage {
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(RepositoryError::Conflict);
        }
        let id = UserId::new(next_id(&mut state.last_user_id));
        let stored = user.with_id(id);
        state.users.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &UserEmail) -> Result<Option<User>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| &u.email == email).cloned())
    }

    async fn delete(&self, id: UserId) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        if state.users.remove(&id).is_none() {
            return Ok(false);
        }

        state.profiles.remove(&id);

        let owned: Vec<SessionId> = state
            .sessions
            .values()
            .filter(|session| session.owner_id == id)
            .map(|session| session.id)
            .collect();
        for session_id in owned {
            state.drop_session(session_id);
        }

        state.memberships.retain(|(uid, _), _| *uid != id);
        state.chat_members.retain(|member| member.user_id != id);
        for message in state.messages.iter_mut() {
            if message.sender_id == Some(id) {
                message.sender_id = None;
            }
        }
        Ok(true)
    }

    async fn upsert_profile(&self, profile: Profile) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&profile.user_id) {
            return Ok(false);
        }
        state.profiles.insert(profile.user_id, profile);
        Ok(true)
    }

    async fn find_profile(
        &self,
        user_id: UserId,
    ) -> Result<Option<ProfileWithUser>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.profiles.get(&user_id).map(|profile| ProfileWithUser {
            profile: profile.clone(),
            user: state.users.get(&user_id).cloned(),
        }))
    }
}

#[async_trait]
impl SessionRepository for InMemoryStorage {
    async fn create_session(&self, session: NewSession) -> Result<CreatedSession, RepositoryError> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&session.owner_id) {
            return Err(RepositoryError::NotFound);
        }

        let now = session.created_at;
        let session = session.with_id(SessionId::new(next_id(&mut state.last_session_id)));
        let chat = Chat {
            id: ChatId::from(next_id(&mut state.last_chat_id)),
            session_id: session.id,
        };

        state.memberships.insert(
            (session.owner_id, session.id),
            SessionMembership::new(session.owner_id, session.id, MembershipStatus::Accepted, now),
        );
        state.chat_members.insert(ChatMembership {
            user_id: session.owner_id,
            chat_id: chat.id,
        });
        state.chats.insert(session.id, chat);
        state.sessions.insert(session.id, session.clone());

        Ok(CreatedSession { session, chat })
    }

    async fn find_by_id(&self, id: SessionId) -> Result<Option<Session>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.sessions.get(&id).cloned())
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.sessions.values().cloned().collect())
    }

    async fn list_sessions_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Session>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .sessions
            .values()
            .filter(|session| state.memberships.contains_key(&(user_id, session.id)))
            .cloned()
            .collect())
    }

    async fn find_membership(
        &self,
        user_id: UserId,
        session_id: SessionId,
    ) -> Result<Option<SessionMembership>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.memberships.get(&(user_id, session_id)).cloned())
    }

    async fn list_participants(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<Participant>, RepositoryError> {
        let state = self.state.read().await;
        let mut participants: Vec<Participant> = state
            .memberships
            .values()
            .filter(|membership| membership.session_id == session_id)
            .map(|membership| Participant {
                user_id: membership.user_id,
                name: state
                    .profiles
                    .get(&membership.user_id)
                    .and_then(|profile| profile.name.clone()),
                status: membership.status,
            })
            .collect();
        participants.sort_by_key(|participant| participant.user_id);
        Ok(participants)
    }

    async fn insert_pending_membership(
        &self,
        user_id: UserId,
        session_id: SessionId,
        now: Timestamp,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&user_id) {
            return Err(RepositoryError::NotFound);
        }
        if !state.sessions.contains_key(&session_id)
            || state.memberships.contains_key(&(user_id, session_id))
        {
            return Ok(false);
        }
        state.memberships.insert(
            (user_id, session_id),
            SessionMembership::new(user_id, session_id, MembershipStatus::Pending, now),
        );
        Ok(true)
    }

    async fn update_membership_status(
        &self,
        user_id: UserId,
        session_id: SessionId,
        expected: MembershipStatus,
        new_status: MembershipStatus,
        now: Timestamp,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        let chat_id = state.chat_id_of(session_id);

        match state.memberships.get_mut(&(user_id, session_id)) {
            Some(membership) if membership.status == expected => {
                membership.status = new_status;
                membership.updated_at = now;
            }
            _ => return Ok(false),
        }

        if new_status.is_accepted() {
            if let Some(chat_id) = chat_id {
                state.chat_members.insert(ChatMembership { user_id, chat_id });
            }
        }
        Ok(true)
    }

    async fn remove_membership(
        &self,
        user_id: UserId,
        session_id: SessionId,
    ) -> Result<Option<MembershipStatus>, RepositoryError> {
        let mut state = self.state.write().await;
        let Some(removed) = state.memberships.remove(&(user_id, session_id)) else {
            return Ok(None);
        };
        if let Some(chat_id) = state.chat_id_of(session_id) {
            state
                .chat_members
                .remove(&ChatMembership { user_id, chat_id });
        }
        Ok(Some(removed.status))
    }
}

#[async_trait]
impl ChatRepository for InMemoryStorage {
    async fn find_by_session(&self, session_id: SessionId) -> Result<Option<Chat>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.chats.get(&session_id).copied())
    }

    async fn is_member(&self, chat_id: ChatId, user_id: UserId) -> Result<bool, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .chat_members
            .contains(&ChatMembership { user_id, chat_id }))
    }

    async fn list_members(&self, chat_id: ChatId) -> Result<Vec<UserId>, RepositoryError> {
        let state = self.state.read().await;
        let mut members: Vec<UserId> = state
            .chat_members
            .iter()
            .filter(|member| member.chat_id == chat_id)
            .map(|member| member.user_id)
            .collect();
        members.sort();
        Ok(members)
    }

    async fn add_message(&self, message: NewMessage) -> Result<Message, RepositoryError> {
        let mut state = self.state.write().await;
        if !state.chats.values().any(|chat| chat.id == message.chat_id) {
            return Err(RepositoryError::NotFound);
        }
        let stored = message.with_id(MessageId::from(next_id(&mut state.last_message_id)));
        state.messages.push(stored.clone());
        Ok(stored)
    }

    async fn list_messages(
        &self,
        chat_id: ChatId,
        limit: usize,
    ) -> Result<Vec<Message>, RepositoryError> {
        let state = self.state.read().await;
        let in_chat: Vec<&Message> = state
            .messages
            .iter()
            .filter(|message| message.chat_id == chat_id)
            .collect();
        let skip = in_chat.len().saturating_sub(limit);
        Ok(in_chat.into_iter().skip(skip).cloned().collect())
    }
}
