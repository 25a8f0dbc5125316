//! Stop handle
//!
//! 중단 요청은 진행 중인 호출(backend 또는 도구)이 끝난 뒤에 반영된다.
//! 호출 도중 취소하는 기능은 없다.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable handle used to stop a running turn
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// 중단 요청
    pub fn request_stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// 중단 상태인지
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// 다음 턴을 위해 초기화
    pub fn reset(&self) {
        self.stopped.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_and_reset() {
        let handle = StopHandle::new();
        let clone = handle.clone();
        assert!(!handle.is_stopped());

        clone.request_stop();
        assert!(handle.is_stopped());

        handle.reset();
        assert!(!clone.is_stopped());
    }
}
