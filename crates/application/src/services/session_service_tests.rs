//! 活动服务单元测试
//!
//! 覆盖成员状态机在服务层的各条路径，包括条件写入未生效的情况。

use std::sync::Arc;

use domain::{
    Chat, ChatId, DomainError, MembershipRejection, MembershipStatus, Participant, Session,
    RepositoryError, SessionId, SessionMembership, Timestamp, UserId,
};
use mockall::predicate::eq;

use crate::clock::tests::FixedClock;
use crate::repository::{CreatedSession, MockChatRepository, MockSessionRepository};
use crate::services::session_service::*;
use crate::ApplicationError;

const OWNER: UserId = UserId(1);
const GUEST: UserId = UserId(2);
const SESSION: SessionId = SessionId(10);

fn now() -> Timestamp {
    "2025-06-15T12:00:00Z".parse().unwrap()
}

fn session(id: SessionId, owner_id: UserId) -> Session {
    Session {
        id,
        owner_id,
        title: "Raid night".to_string(),
        description: None,
        age_range: Some("18-30".to_string()),
        tags: vec!["mmo".to_string()],
        is_visible: true,
        created_at: now(),
    }
}

fn membership(user_id: UserId, status: MembershipStatus) -> SessionMembership {
    SessionMembership::new(user_id, SESSION, status, now())
}

fn service(sessions: MockSessionRepository, chats: MockChatRepository) -> SessionService {
    SessionService::new(SessionServiceDependencies {
        session_repository: Arc::new(sessions),
        chat_repository: Arc::new(chats),
        clock: Arc::new(FixedClock(now())),
    })
}

/// 活动存在，目标用户当前状态为 `current`
fn sessions_with(
    target: UserId,
    current: Option<MembershipStatus>,
) -> MockSessionRepository {
    let mut sessions = MockSessionRepository::new();
    sessions
        .expect_find_by_id()
        .with(eq(SESSION))
        .returning(|id| Ok(Some(session(id, OWNER))));
    sessions
        .expect_find_membership()
        .with(eq(target), eq(SESSION))
        .returning(move |user, _| Ok(current.map(|status| membership(user, status))));
    sessions
}

#[tokio::test]
async fn test_create_session_returns_owner_and_chat() {
    let mut sessions = MockSessionRepository::new();
    sessions
        .expect_create_session()
        .withf(|new| new.owner_id == OWNER && new.title == "Raid night")
        .times(1)
        .returning(|new| {
            let session = new.with_id(SESSION);
            Ok(CreatedSession {
                chat: Chat {
                    id: ChatId(100),
                    session_id: session.id,
                },
                session,
            })
        });
    sessions.expect_list_participants().returning(|_| {
        Ok(vec![Participant {
            user_id: OWNER,
            name: Some("Owner".to_string()),
            status: MembershipStatus::Accepted,
        }])
    });

    let summary = service(sessions, MockChatRepository::new())
        .create_session(
            OWNER,
            CreateSessionRequest {
                title: " Raid night ".to_string(),
                description: Some("weekly".to_string()),
                age_range: None,
                tags: vec!["mmo".to_string()],
                is_visible: true,
            },
        )
        .await
        .unwrap();

    assert_eq!(summary.session.id, SESSION);
    assert_eq!(summary.session.owner_id, OWNER);
    assert_eq!(summary.session.participants.len(), 1);
    assert_eq!(summary.session.participants[0].status, MembershipStatus::Accepted);
    let chat = summary.chat.expect("chat should be created with the session");
    assert_eq!(chat.chat_id, ChatId(100));
    assert_eq!(chat.session_id, SESSION);
}

#[tokio::test]
async fn test_create_session_rejects_blank_title() {
    let mut sessions = MockSessionRepository::new();
    sessions.expect_create_session().never();

    let result = service(sessions, MockChatRepository::new())
        .create_session(
            OWNER,
            CreateSessionRequest {
                title: "   ".to_string(),
                description: None,
                age_range: None,
                tags: vec![],
                is_visible: true,
            },
        )
        .await;
    assert!(matches!(result, Err(ApplicationError::Domain(_))));
}

#[tokio::test]
async fn test_join_missing_session() {
    let mut sessions = MockSessionRepository::new();
    sessions.expect_find_by_id().returning(|_| Ok(None));
    sessions.expect_insert_pending_membership().never();

    let outcome = service(sessions, MockChatRepository::new())
        .join(SESSION, GUEST)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        MembershipOutcome::Rejected(MembershipRejection::SessionNotFound)
    );
    assert!(!outcome.is_success());
}

#[tokio::test]
async fn test_join_inserts_pending() {
    let mut sessions = sessions_with(GUEST, None);
    sessions
        .expect_insert_pending_membership()
        .with(eq(GUEST), eq(SESSION), eq(now()))
        .times(1)
        .returning(|_, _, _| Ok(true));

    let outcome = service(sessions, MockChatRepository::new())
        .join(SESSION, GUEST)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        MembershipOutcome::Applied(Some(MembershipStatus::Pending))
    );
    assert!(outcome.is_success());
}

#[tokio::test]
async fn test_join_twice_is_rejected() {
    for current in [
        MembershipStatus::Pending,
        MembershipStatus::Accepted,
        MembershipStatus::Rejected,
    ] {
        let mut sessions = sessions_with(GUEST, Some(current));
        sessions.expect_insert_pending_membership().never();

        let outcome = service(sessions, MockChatRepository::new())
            .join(SESSION, GUEST)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            MembershipOutcome::Rejected(MembershipRejection::AlreadyMember)
        );
    }
}

#[tokio::test]
async fn test_join_race_reports_state_changed() {
    let mut sessions = sessions_with(GUEST, None);
    sessions
        .expect_insert_pending_membership()
        .returning(|_, _, _| Ok(false));

    let outcome = service(sessions, MockChatRepository::new())
        .join(SESSION, GUEST)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        MembershipOutcome::Rejected(MembershipRejection::StateChanged)
    );
}

#[tokio::test]
async fn test_join_by_deleted_user_is_user_not_found() {
    let mut sessions = sessions_with(GUEST, None);
    sessions
        .expect_insert_pending_membership()
        .returning(|_, _, _| Err(RepositoryError::NotFound));

    let result = service(sessions, MockChatRepository::new())
        .join(SESSION, GUEST)
        .await;
    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::UserNotFound))
    ));
}

#[tokio::test]
async fn test_create_session_for_deleted_owner_is_user_not_found() {
    let mut sessions = MockSessionRepository::new();
    sessions
        .expect_create_session()
        .returning(|_| Err(RepositoryError::NotFound));
    sessions.expect_list_participants().never();

    let result = service(sessions, MockChatRepository::new())
        .create_session(
            OWNER,
            CreateSessionRequest {
                title: "Raid night".to_string(),
                description: None,
                age_range: None,
                tags: vec![],
                is_visible: true,
            },
        )
        .await;
    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::UserNotFound))
    ));
}

#[tokio::test]
async fn test_accept_pending_request() {
    let mut sessions = sessions_with(GUEST, Some(MembershipStatus::Pending));
    sessions
        .expect_update_membership_status()
        .with(
            eq(GUEST),
            eq(SESSION),
            eq(MembershipStatus::Pending),
            eq(MembershipStatus::Accepted),
            eq(now()),
        )
        .times(1)
        .returning(|_, _, _, _, _| Ok(true));

    let outcome = service(sessions, MockChatRepository::new())
        .accept(SESSION, OWNER, GUEST)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        MembershipOutcome::Applied(Some(MembershipStatus::Accepted))
    );
}

#[tokio::test]
async fn test_accept_by_non_owner_is_rejected() {
    let third = UserId(3);
    let mut sessions = sessions_with(GUEST, Some(MembershipStatus::Pending));
    sessions.expect_update_membership_status().never();

    let outcome = service(sessions, MockChatRepository::new())
        .accept(SESSION, third, GUEST)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        MembershipOutcome::Rejected(MembershipRejection::NotOwner)
    );
}

#[tokio::test]
async fn test_accept_without_pending_request() {
    for current in [None, Some(MembershipStatus::Accepted), Some(MembershipStatus::Rejected)] {
        let mut sessions = sessions_with(GUEST, current);
        sessions.expect_update_membership_status().never();

        let outcome = service(sessions, MockChatRepository::new())
            .accept(SESSION, OWNER, GUEST)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            MembershipOutcome::Rejected(MembershipRejection::NoPendingRequest)
        );
    }
}

#[tokio::test]
async fn test_stale_accept_reports_state_changed() {
    let mut sessions = sessions_with(GUEST, Some(MembershipStatus::Pending));
    sessions
        .expect_update_membership_status()
        .returning(|_, _, _, _, _| Ok(false));

    let outcome = service(sessions, MockChatRepository::new())
        .accept(SESSION, OWNER, GUEST)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        MembershipOutcome::Rejected(MembershipRejection::StateChanged)
    );
}

#[tokio::test]
async fn test_reject_pending_request() {
    let mut sessions = sessions_with(GUEST, Some(MembershipStatus::Pending));
    sessions
        .expect_update_membership_status()
        .with(
            eq(GUEST),
            eq(SESSION),
            eq(MembershipStatus::Pending),
            eq(MembershipStatus::Rejected),
            eq(now()),
        )
        .returning(|_, _, _, _, _| Ok(true));

    let outcome = service(sessions, MockChatRepository::new())
        .reject(SESSION, OWNER, GUEST)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        MembershipOutcome::Applied(Some(MembershipStatus::Rejected))
    );
}

#[tokio::test]
async fn test_leave_removes_membership() {
    let mut sessions = sessions_with(GUEST, Some(MembershipStatus::Accepted));
    sessions
        .expect_remove_membership()
        .with(eq(GUEST), eq(SESSION))
        .times(1)
        .returning(|_, _| Ok(Some(MembershipStatus::Accepted)));

    let outcome = service(sessions, MockChatRepository::new())
        .leave(SESSION, GUEST)
        .await
        .unwrap();
    assert_eq!(outcome, MembershipOutcome::Applied(None));
}

#[tokio::test]
async fn test_leave_without_membership() {
    let mut sessions = sessions_with(GUEST, None);
    sessions.expect_remove_membership().never();

    let outcome = service(sessions, MockChatRepository::new())
        .leave(SESSION, GUEST)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        MembershipOutcome::Rejected(MembershipRejection::NotMember)
    );
}

#[tokio::test]
async fn test_owner_cannot_leave() {
    let mut sessions = sessions_with(OWNER, Some(MembershipStatus::Accepted));
    sessions.expect_remove_membership().never();

    let outcome = service(sessions, MockChatRepository::new())
        .leave(SESSION, OWNER)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        MembershipOutcome::Rejected(MembershipRejection::OwnerCannotLeave)
    );
}

#[tokio::test]
async fn test_leave_race_reports_state_changed() {
    let mut sessions = sessions_with(GUEST, Some(MembershipStatus::Pending));
    sessions.expect_remove_membership().returning(|_, _| Ok(None));

    let outcome = service(sessions, MockChatRepository::new())
        .leave(SESSION, GUEST)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        MembershipOutcome::Rejected(MembershipRejection::StateChanged)
    );
}

#[tokio::test]
async fn test_get_session_by_id_not_found() {
    let mut sessions = MockSessionRepository::new();
    sessions.expect_find_by_id().returning(|_| Ok(None));

    let err = service(sessions, MockChatRepository::new())
        .get_session_by_id(SESSION)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::SessionNotFound)
    ));
}

#[tokio::test]
async fn test_get_session_by_id_includes_participants() {
    let mut sessions = MockSessionRepository::new();
    sessions
        .expect_find_by_id()
        .returning(|id| Ok(Some(session(id, OWNER))));
    sessions.expect_list_participants().returning(|_| {
        Ok(vec![
            Participant {
                user_id: OWNER,
                name: Some("Owner".to_string()),
                status: MembershipStatus::Accepted,
            },
            Participant {
                user_id: GUEST,
                name: None,
                status: MembershipStatus::Pending,
            },
        ])
    });

    let detail = service(sessions, MockChatRepository::new())
        .get_session_by_id(SESSION)
        .await
        .unwrap();
    assert_eq!(detail.title, "Raid night");
    assert_eq!(detail.participants.len(), 2);
    assert_eq!(detail.participants[1].name, None);
}

#[tokio::test]
async fn test_get_sessions_tolerates_missing_chat() {
    let mut sessions = MockSessionRepository::new();
    sessions.expect_list_sessions().times(1).returning(|| {
        Ok(vec![
            session(SessionId(1), OWNER),
            session(SessionId(2), GUEST),
        ])
    });
    sessions.expect_list_sessions_for_user().never();
    sessions.expect_list_participants().returning(|_| Ok(vec![]));

    let mut chats = MockChatRepository::new();
    chats
        .expect_find_by_session()
        .with(eq(SessionId(1)))
        .returning(|session_id| {
            Ok(Some(Chat {
                id: ChatId(7),
                session_id,
            }))
        });
    chats
        .expect_find_by_session()
        .with(eq(SessionId(2)))
        .returning(|_| Ok(None));

    let summaries = service(sessions, chats).get_sessions(None).await.unwrap();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].chat.map(|chat| chat.chat_id), Some(ChatId(7)));
    assert!(summaries[1].chat.is_none());
}

#[tokio::test]
async fn test_get_sessions_for_user() {
    let mut sessions = MockSessionRepository::new();
    sessions.expect_list_sessions().never();
    sessions
        .expect_list_sessions_for_user()
        .with(eq(GUEST))
        .times(1)
        .returning(|_| Ok(vec![session(SESSION, OWNER)]));
    sessions.expect_list_participants().returning(|_| Ok(vec![]));

    let mut chats = MockChatRepository::new();
    chats.expect_find_by_session().returning(|session_id| {
        Ok(Some(Chat {
            id: ChatId(1),
            session_id,
        }))
    });

    let summaries = service(sessions, chats)
        .get_sessions(Some(GUEST))
        .await
        .unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].session.id, SESSION);
}
