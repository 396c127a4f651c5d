/*
 * Responsibility
 * - middleware の公開インターフェース
 * - passport (authentication edge filter), http (request id / trace / limits), cors
 */
pub mod cors;
pub mod http;
pub mod passport;
