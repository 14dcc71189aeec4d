/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - drinks: 永続化層 (DrinkRepo), auth: トークン検証 + 権限チェック (AuthService)
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;

use crate::repos::DrinkRepo;
use crate::services::auth::AuthService;

#[derive(Clone)]
pub struct AppState {
    pub drinks: Arc<dyn DrinkRepo>,
    pub auth: Arc<AuthService>,
}

impl AppState {
    pub fn new(drinks: Arc<dyn DrinkRepo>, auth: Arc<AuthService>) -> Self {
        Self { drinks, auth }
    }
}
