mod account_service;
mod chat_service;
mod profile_service;
mod session_service;

#[cfg(test)]
mod session_service_tests;
#[cfg(test)]
mod chat_service_tests;

pub use account_service::{
    AccountService, AccountServiceDependencies, LoginRequest, RegisterRequest,
};
pub use chat_service::{ChatService, ChatServiceDependencies};
pub use profile_service::{
    profile_rules_from_config, ProfileService, ProfileServiceDependencies, UpdateProfileRequest,
    UpdateProfileStatus,
};
pub use session_service::{
    CreateSessionRequest, MembershipOutcome, SessionService, SessionServiceDependencies,
};
