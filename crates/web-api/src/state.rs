use std::sync::Arc;

use application::{
    AccountService, AccountServiceDependencies, ChatService, ChatServiceDependencies, Clock,
    ProfileService, ProfileServiceDependencies, SessionService, SessionServiceDependencies,
    TokenService,
};
use domain::ProfileRules;
use infrastructure::Infrastructure;

#[derive(Clone)]
pub struct AppState {
    pub account_service: Arc<AccountService>,
    pub profile_service: Arc<ProfileService>,
    pub session_service: Arc<SessionService>,
    pub chat_service: Arc<ChatService>,
    pub token_service: Arc<dyn TokenService>,
}

impl AppState {
    /// 基于已组装的基础设施创建全部用例服务
    pub fn new(infra: &Infrastructure, rules: ProfileRules, clock: Arc<dyn Clock>) -> Self {
        let account_service = AccountService::new(AccountServiceDependencies {
            user_repository: infra.user_repository.clone(),
            password_hasher: infra.password_hasher.clone(),
            token_service: infra.token_service.clone(),
            clock: clock.clone(),
        });
        let profile_service = ProfileService::new(ProfileServiceDependencies {
            user_repository: infra.user_repository.clone(),
            clock: clock.clone(),
            rules,
        });
        let session_service = SessionService::new(SessionServiceDependencies {
            session_repository: infra.session_repository.clone(),
            chat_repository: infra.chat_repository.clone(),
            clock: clock.clone(),
        });
        let chat_service = ChatService::new(ChatServiceDependencies {
            chat_repository: infra.chat_repository.clone(),
            clock,
        });

        Self {
            account_service: Arc::new(account_service),
            profile_service: Arc::new(profile_service),
            session_service: Arc::new(session_service),
            chat_service: Arc::new(chat_service),
            token_service: infra.token_service.clone(),
        }
    }
}
