use std::sync::Arc;

use application::{
    ChatRepository, CreatedSession, ProfileWithUser, SessionRepository, UserRepository,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use domain::{
    Chat, ChatId, MembershipStatus, Message, MessageContent, MessageId, NewMessage, NewSession,
    NewUser, Participant, PasswordHash, Profile, RepositoryError, Session, SessionId,
    SessionMembership, Timestamp, User, UserEmail, UserId,
};
use sqlx::{postgres::PgPoolOptions, FromRow, PgConnection, PgPool};

fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    if matches!(err, sqlx::Error::RowNotFound) {
        return RepositoryError::NotFound;
    }
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return RepositoryError::Conflict;
        }
        // 引用的用户或活动已被删除
        if db.is_foreign_key_violation() {
            return RepositoryError::NotFound;
        }
    }
    RepositoryError::storage_with_source("database operation failed", err)
}

fn invalid_data(message: impl Into<String>) -> RepositoryError {
    RepositoryError::storage(message)
}

#[derive(Debug, FromRow)]
struct UserRecord {
    id: i64,
    email: String,
    password_hash: String,
    is_email_verified: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRecord> for User {
    type Error = RepositoryError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        let email = UserEmail::parse(value.email).map_err(|err| invalid_data(err.to_string()))?;
        let password =
            PasswordHash::new(value.password_hash).map_err(|err| invalid_data(err.to_string()))?;

        Ok(User {
            id: UserId::new(value.id),
            email,
            password,
            is_email_verified: value.is_email_verified,
            created_at: value.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ProfileRecord {
    user_id: i64,
    name: Option<String>,
    birth_date: NaiveDate,
    description: String,
    region: Option<String>,
    picture: Option<String>,
    updated_at: DateTime<Utc>,
}

impl From<ProfileRecord> for Profile {
    fn from(value: ProfileRecord) -> Self {
        Profile {
            user_id: UserId::new(value.user_id),
            name: value.name,
            birth_date: value.birth_date,
            description: value.description,
            region: value.region,
            picture: value.picture,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct SessionRecord {
    id: i64,
    owner_id: i64,
    title: String,
    description: Option<String>,
    age_range: Option<String>,
    tags: Vec<String>,
    is_visible: bool,
    created_at: DateTime<Utc>,
}

impl From<SessionRecord> for Session {
    fn from(value: SessionRecord) -> Self {
        Session {
            id: SessionId::new(value.id),
            owner_id: UserId::new(value.owner_id),
            title: value.title,
            description: value.description,
            age_range: value.age_range,
            tags: value.tags,
            is_visible: value.is_visible,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct MembershipRecord {
    user_id: i64,
    session_id: i64,
    status: String,
    updated_at: DateTime<Utc>,
}

impl TryFrom<MembershipRecord> for SessionMembership {
    type Error = RepositoryError;

    fn try_from(value: MembershipRecord) -> Result<Self, Self::Error> {
        Ok(SessionMembership {
            user_id: UserId::new(value.user_id),
            session_id: SessionId::new(value.session_id),
            status: parse_status(&value.status)?,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ParticipantRecord {
    user_id: i64,
    name: Option<String>,
    status: String,
}

impl TryFrom<ParticipantRecord> for Participant {
    type Error = RepositoryError;

    fn try_from(value: ParticipantRecord) -> Result<Self, Self::Error> {
        Ok(Participant {
            user_id: UserId::new(value.user_id),
            name: value.name,
            status: parse_status(&value.status)?,
        })
    }
}

#[derive(Debug, FromRow)]
struct ChatRecord {
    id: i64,
    session_id: i64,
}

impl From<ChatRecord> for Chat {
    fn from(value: ChatRecord) -> Self {
        Chat {
            id: ChatId::from(value.id),
            session_id: SessionId::new(value.session_id),
        }
    }
}

#[derive(Debug, FromRow)]
struct MessageRecord {
    id: i64,
    chat_id: i64,
    sender_id: Option<i64>,
    content: String,
    sent_at: DateTime<Utc>,
}

impl TryFrom<MessageRecord> for Message {
    type Error = RepositoryError;

    fn try_from(value: MessageRecord) -> Result<Self, Self::Error> {
        let content =
            MessageContent::new(value.content).map_err(|err| invalid_data(err.to_string()))?;
        Ok(Message {
            id: MessageId::from(value.id),
            chat_id: ChatId::from(value.chat_id),
            sender_id: value.sender_id.map(UserId::new),
            content,
            sent_at: value.sent_at,
        })
    }
}

fn parse_status(value: &str) -> Result<MembershipStatus, RepositoryError> {
    value
        .parse::<MembershipStatus>()
        .map_err(|err| invalid_data(err.to_string()))
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            INSERT INTO users (email, password_hash, is_email_verified, created_at)
            VALUES ($1, $2, FALSE, $3)
            ON CONFLICT (email) DO NOTHING
            RETURNING id, email, password_hash, is_email_verified, created_at
            "#,
        )
        .bind(user.email.as_str())
        .bind(user.password.as_str())
        .bind(user.created_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?
        .ok_or(RepositoryError::Conflict)?;

        User::try_from(record)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"SELECT id, email, password_hash, is_email_verified, created_at FROM users WHERE id = $1"#,
        )
        .bind(id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: &UserEmail) -> Result<Option<User>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"SELECT id, email, password_hash, is_email_verified, created_at FROM users WHERE email = $1"#,
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(User::try_from).transpose()
    }

    async fn delete(&self, id: UserId) -> Result<bool, RepositoryError> {
        // 个人资料、成员关系、拥有的活动由外键级联删除；消息的发送者置空
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn upsert_profile(&self, profile: Profile) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            INSERT INTO profiles (user_id, name, birth_date, description, region, picture, updated_at)
            SELECT $1, $2, $3, $4, $5, $6, $7
            WHERE EXISTS (SELECT 1 FROM users WHERE id = $1)
            ON CONFLICT (user_id) DO UPDATE
            SET name = EXCLUDED.name,
                birth_date = EXCLUDED.birth_date,
                description = EXCLUDED.description,
                region = EXCLUDED.region,
                picture = EXCLUDED.picture,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(profile.user_id.value())
        .bind(profile.name)
        .bind(profile.birth_date)
        .bind(profile.description)
        .bind(profile.region)
        .bind(profile.picture)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_profile(
        &self,
        user_id: UserId,
    ) -> Result<Option<ProfileWithUser>, RepositoryError> {
        let record = sqlx::query_as::<_, ProfileRecord>(
            r#"SELECT user_id, name, birth_date, description, region, picture, updated_at FROM profiles WHERE user_id = $1"#,
        )
        .bind(user_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        let Some(record) = record else {
            return Ok(None);
        };
        let user = self.find_by_id(user_id).await?;
        Ok(Some(ProfileWithUser {
            profile: Profile::from(record),
            user,
        }))
    }
}

#[derive(Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn ensure_user_exists(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<(), RepositoryError> {
    let exists = sqlx::query_scalar::<_, bool>(r#"SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)"#)
        .bind(user_id.value())
        .fetch_one(&mut *conn)
        .await
        .map_err(map_sqlx_err)?;

    if exists {
        Ok(())
    } else {
        Err(RepositoryError::NotFound)
    }
}

/// 为新活动创建聊天，并把房主加入聊天
async fn create_session_chat(
    conn: &mut PgConnection,
    session_id: SessionId,
    owner_id: UserId,
) -> Result<Chat, RepositoryError> {
    let chat = sqlx::query_as::<_, ChatRecord>(
        r#"INSERT INTO chats (session_id) VALUES ($1) RETURNING id, session_id"#,
    )
    .bind(session_id.value())
    .fetch_one(&mut *conn)
    .await
    .map_err(map_sqlx_err)?;

    sqlx::query(r#"INSERT INTO chat_memberships (user_id, chat_id) VALUES ($1, $2)"#)
        .bind(owner_id.value())
        .bind(chat.id)
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_err)?;

    Ok(Chat::from(chat))
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn create_session(&self, session: NewSession) -> Result<CreatedSession, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;
        ensure_user_exists(&mut *tx, session.owner_id).await?;

        let record = sqlx::query_as::<_, SessionRecord>(
            r#"
            INSERT INTO sessions (owner_id, title, description, age_range, tags, is_visible, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, owner_id, title, description, age_range, tags, is_visible, created_at
            "#,
        )
        .bind(session.owner_id.value())
        .bind(&session.title)
        .bind(&session.description)
        .bind(&session.age_range)
        .bind(&session.tags)
        .bind(session.is_visible)
        .bind(session.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;
        let stored = Session::from(record);

        sqlx::query(
            r#"
            INSERT INTO session_memberships (user_id, session_id, status, updated_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(stored.owner_id.value())
        .bind(stored.id.value())
        .bind(MembershipStatus::Accepted.as_str())
        .bind(stored.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        let chat = create_session_chat(&mut *tx, stored.id, stored.owner_id).await?;

        tx.commit().await.map_err(map_sqlx_err)?;
        Ok(CreatedSession {
            session: stored,
            chat,
        })
    }

    async fn find_by_id(&self, id: SessionId) -> Result<Option<Session>, RepositoryError> {
        let record = sqlx::query_as::<_, SessionRecord>(
            r#"SELECT id, owner_id, title, description, age_range, tags, is_visible, created_at FROM sessions WHERE id = $1"#,
        )
        .bind(id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(Session::from))
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, RepositoryError> {
        let records = sqlx::query_as::<_, SessionRecord>(
            r#"SELECT id, owner_id, title, description, age_range, tags, is_visible, created_at FROM sessions ORDER BY id"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(records.into_iter().map(Session::from).collect())
    }

    async fn list_sessions_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Session>, RepositoryError> {
        let records = sqlx::query_as::<_, SessionRecord>(
            r#"
            SELECT s.id, s.owner_id, s.title, s.description, s.age_range, s.tags, s.is_visible, s.created_at
            FROM sessions s
            JOIN session_memberships m ON m.session_id = s.id
            WHERE m.user_id = $1
            ORDER BY s.id
            "#,
        )
        .bind(user_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(records.into_iter().map(Session::from).collect())
    }

    async fn find_membership(
        &self,
        user_id: UserId,
        session_id: SessionId,
    ) -> Result<Option<SessionMembership>, RepositoryError> {
        let record = sqlx::query_as::<_, MembershipRecord>(
            r#"SELECT user_id, session_id, status, updated_at FROM session_memberships WHERE user_id = $1 AND session_id = $2"#,
        )
        .bind(user_id.value())
        .bind(session_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(SessionMembership::try_from).transpose()
    }

    async fn list_participants(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<Participant>, RepositoryError> {
        let records = sqlx::query_as::<_, ParticipantRecord>(
            r#"
            SELECT m.user_id, p.name, m.status
            FROM session_memberships m
            LEFT JOIN profiles p ON p.user_id = m.user_id
            WHERE m.session_id = $1
            ORDER BY m.user_id
            "#,
        )
        .bind(session_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(Participant::try_from).collect()
    }

    async fn insert_pending_membership(
        &self,
        user_id: UserId,
        session_id: SessionId,
        now: Timestamp,
    ) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_err)?;
        ensure_user_exists(&mut *conn, user_id).await?;

        let result = sqlx::query(
            r#"
            INSERT INTO session_memberships (user_id, session_id, status, updated_at)
            SELECT $1, $2, $3, $4
            WHERE EXISTS (SELECT 1 FROM sessions WHERE id = $2)
            ON CONFLICT (user_id, session_id) DO NOTHING
            "#,
        )
        .bind(user_id.value())
        .bind(session_id.value())
        .bind(MembershipStatus::Pending.as_str())
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn update_membership_status(
        &self,
        user_id: UserId,
        session_id: SessionId,
        expected: MembershipStatus,
        new_status: MembershipStatus,
        now: Timestamp,
    ) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        let result = sqlx::query(
            r#"
            UPDATE session_memberships
            SET status = $4, updated_at = $5
            WHERE user_id = $1 AND session_id = $2 AND status = $3
            "#,
        )
        .bind(user_id.value())
        .bind(session_id.value())
        .bind(expected.as_str())
        .bind(new_status.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        if new_status.is_accepted() {
            sqlx::query(
                r#"
                INSERT INTO chat_memberships (user_id, chat_id)
                SELECT $1, id FROM chats WHERE session_id = $2
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(user_id.value())
            .bind(session_id.value())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;
        }

        tx.commit().await.map_err(map_sqlx_err)?;
        Ok(true)
    }

    async fn remove_membership(
        &self,
        user_id: UserId,
        session_id: SessionId,
    ) -> Result<Option<MembershipStatus>, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        let removed: Option<String> = sqlx::query_scalar(
            r#"DELETE FROM session_memberships WHERE user_id = $1 AND session_id = $2 RETURNING status"#,
        )
        .bind(user_id.value())
        .bind(session_id.value())
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        let Some(status) = removed else {
            return Ok(None);
        };

        sqlx::query(
            r#"
            DELETE FROM chat_memberships
            WHERE user_id = $1 AND chat_id IN (SELECT id FROM chats WHERE session_id = $2)
            "#,
        )
        .bind(user_id.value())
        .bind(session_id.value())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        tx.commit().await.map_err(map_sqlx_err)?;
        parse_status(&status).map(Some)
    }
}

#[derive(Clone)]
pub struct PgChatRepository {
    pool: PgPool,
}

impl PgChatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatRepository for PgChatRepository {
    async fn find_by_session(&self, session_id: SessionId) -> Result<Option<Chat>, RepositoryError> {
        let record = sqlx::query_as::<_, ChatRecord>(
            r#"SELECT id, session_id FROM chats WHERE session_id = $1"#,
        )
        .bind(session_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(Chat::from))
    }

    async fn is_member(&self, chat_id: ChatId, user_id: UserId) -> Result<bool, RepositoryError> {
        sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS (SELECT 1 FROM chat_memberships WHERE chat_id = $1 AND user_id = $2)"#,
        )
        .bind(i64::from(chat_id))
        .bind(user_id.value())
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)
    }

    async fn list_members(&self, chat_id: ChatId) -> Result<Vec<UserId>, RepositoryError> {
        let ids: Vec<i64> = sqlx::query_scalar(
            r#"SELECT user_id FROM chat_memberships WHERE chat_id = $1 ORDER BY user_id"#,
        )
        .bind(i64::from(chat_id))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(ids.into_iter().map(UserId::new).collect())
    }

    async fn add_message(&self, message: NewMessage) -> Result<Message, RepositoryError> {
        let record = sqlx::query_as::<_, MessageRecord>(
            r#"
            INSERT INTO messages (chat_id, sender_id, content, sent_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, chat_id, sender_id, content, sent_at
            "#,
        )
        .bind(i64::from(message.chat_id))
        .bind(message.sender_id.value())
        .bind(message.content.as_str())
        .bind(message.sent_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Message::try_from(record)
    }

    async fn list_messages(
        &self,
        chat_id: ChatId,
        limit: usize,
    ) -> Result<Vec<Message>, RepositoryError> {
        let records = sqlx::query_as::<_, MessageRecord>(
            r#"
            SELECT id, chat_id, sender_id, content, sent_at FROM (
                SELECT id, chat_id, sender_id, content, sent_at
                FROM messages
                WHERE chat_id = $1
                ORDER BY sent_at DESC, id DESC
                LIMIT $2
            ) recent
            ORDER BY sent_at, id
            "#,
        )
        .bind(i64::from(chat_id))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(Message::try_from).collect()
    }
}

#[derive(Clone)]
pub struct PgStorage {
    pub pool: PgPool,
    pub user_repository: Arc<PgUserRepository>,
    pub session_repository: Arc<PgSessionRepository>,
    pub chat_repository: Arc<PgChatRepository>,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self {
            user_repository: Arc::new(PgUserRepository::new(pool.clone())),
            session_repository: Arc::new(PgSessionRepository::new(pool.clone())),
            chat_repository: Arc::new(PgChatRepository::new(pool.clone())),
            pool,
        }
    }
}

pub async fn create_pg_pool(
    database_url: &str,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}
