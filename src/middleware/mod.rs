/*
 * Responsibility
 * - middleware の公開インターフェース
 * - auth: route 単位の権限チェック (require permission)
 * - cors / http / security_headers: Router 全体に掛ける横断的な layer
 */
pub mod auth;
pub mod cors;
pub mod http;
pub mod security_headers;
