use axum::extract::FromRef;

use std::sync::Arc;
use std::time::Instant;

use crate::notifications::NotificationService;

use super::identity::IdentityProvider;
use super::ServerConfig;

pub type GuardedNotificationService = Arc<NotificationService>;
pub type GuardedIdentityProvider = Arc<dyn IdentityProvider>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub notification_service: GuardedNotificationService,
    pub identity_provider: GuardedIdentityProvider,
    pub hash: String,
}

impl FromRef<ServerState> for GuardedNotificationService {
    fn from_ref(input: &ServerState) -> Self {
        input.notification_service.clone()
    }
}

impl FromRef<ServerState> for GuardedIdentityProvider {
    fn from_ref(input: &ServerState) -> Self {
        input.identity_provider.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
