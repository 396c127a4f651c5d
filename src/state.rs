/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - filter: passport filter (read-only, shared by every request)
 *   - upstream: fabric stand-in target
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;

use crate::fabric::Upstream;
use crate::middleware::passport::PassportFilter;

#[derive(Clone, Debug)]
pub struct AppState {
    pub filter: Arc<PassportFilter>,
    pub upstream: Arc<Upstream>,
}

impl AppState {
    pub fn new(filter: Arc<PassportFilter>, upstream: Arc<Upstream>) -> Self {
        Self { filter, upstream }
    }
}
