//! 活动聊天服务单元测试

use std::sync::Arc;

use domain::{
    Chat, ChatId, DomainError, Message, MessageContent, MessageId, SessionId, Timestamp, UserId,
};
use mockall::predicate::eq;

use crate::clock::tests::FixedClock;
use crate::repository::MockChatRepository;
use crate::services::chat_service::*;
use crate::ApplicationError;

const MEMBER: UserId = UserId(1);
const OUTSIDER: UserId = UserId(2);
const SESSION: SessionId = SessionId(10);
const CHAT: ChatId = ChatId(20);

fn now() -> Timestamp {
    "2025-06-15T12:00:00Z".parse().unwrap()
}

fn chats_with_membership() -> MockChatRepository {
    let mut chats = MockChatRepository::new();
    chats
        .expect_find_by_session()
        .with(eq(SESSION))
        .returning(|session_id| {
            Ok(Some(Chat {
                id: CHAT,
                session_id,
            }))
        });
    chats
        .expect_is_member()
        .returning(|_, user_id| Ok(user_id == MEMBER));
    chats
}

fn service(chats: MockChatRepository) -> ChatService {
    ChatService::new(ChatServiceDependencies {
        chat_repository: Arc::new(chats),
        clock: Arc::new(FixedClock(now())),
    })
}

#[tokio::test]
async fn test_member_sees_chat_participants() {
    let mut chats = chats_with_membership();
    chats
        .expect_list_members()
        .with(eq(CHAT))
        .returning(|_| Ok(vec![MEMBER, UserId(3)]));

    let detail = service(chats)
        .get_session_chat(SESSION, MEMBER)
        .await
        .unwrap();
    assert_eq!(detail.chat_id, CHAT);
    assert_eq!(detail.session_id, SESSION);
    assert_eq!(detail.participants, vec![MEMBER, UserId(3)]);
}

#[tokio::test]
async fn test_outsider_cannot_read_chat() {
    let mut chats = chats_with_membership();
    chats.expect_list_members().never();
    chats.expect_list_messages().never();

    let service = service(chats);
    let err = service
        .get_session_chat(SESSION, OUTSIDER)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::NotChatMember)
    ));

    let err = service
        .list_messages(SESSION, OUTSIDER, 50)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::NotChatMember)
    ));
}

#[tokio::test]
async fn test_missing_chat_is_not_found() {
    let mut chats = MockChatRepository::new();
    chats.expect_find_by_session().returning(|_| Ok(None));

    let err = service(chats)
        .get_session_chat(SESSION, MEMBER)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_member_posts_message() {
    let mut chats = chats_with_membership();
    chats
        .expect_add_message()
        .withf(|message| {
            message.chat_id == CHAT
                && message.sender_id == MEMBER
                && message.content.as_str() == "gg"
        })
        .times(1)
        .returning(|message| Ok(message.with_id(MessageId(1))));

    let message = service(chats)
        .post_message(SESSION, MEMBER, "gg".to_string())
        .await
        .unwrap();
    assert_eq!(message.id, MessageId(1));
    assert_eq!(message.sender_id, Some(MEMBER));
    assert_eq!(message.content, "gg");
    assert_eq!(message.sent_at, now());
}

#[tokio::test]
async fn test_outsider_cannot_post() {
    let mut chats = chats_with_membership();
    chats.expect_add_message().never();

    let err = service(chats)
        .post_message(SESSION, OUTSIDER, "hello".to_string())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::NotChatMember)
    ));
}

#[tokio::test]
async fn test_empty_message_is_rejected() {
    let mut chats = MockChatRepository::new();
    chats.expect_add_message().never();

    let err = service(chats)
        .post_message(SESSION, MEMBER, "   ".to_string())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::InvalidArgument { .. })
    ));
}

#[tokio::test]
async fn test_list_messages_clamps_limit() {
    let mut chats = chats_with_membership();
    chats
        .expect_list_messages()
        .with(eq(CHAT), eq(200usize))
        .times(1)
        .returning(|chat_id, _| {
            Ok(vec![Message {
                id: MessageId(1),
                chat_id,
                sender_id: None,
                content: MessageContent::new("left behind").unwrap(),
                sent_at: now(),
            }])
        });

    let messages = service(chats)
        .list_messages(SESSION, MEMBER, 10_000)
        .await
        .unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].sender_id, None);
}
