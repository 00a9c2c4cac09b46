//! 진행률 이벤트와 취소 제어.
//!
//! 장시간 실행되는 최적화/리더보드 작업은 콜백 대신 채널로 진행률을 보내고,
//! [`CancellationToken`]으로 중단 요청을 받습니다. `UnboundedSender::send`는
//! 블로킹하지 않으므로 tokio 런타임 밖(rayon 워커)에서도 사용할 수 있습니다.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;

/// 진행 단계
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStage {
    /// 그리드 탐색
    Grid,
    /// 유전 알고리즘 (세대 번호 포함)
    Genetic { generation: usize },
    /// 베이지안 탐색
    Bayesian,
    /// 리더보드 평가
    Leaderboard,
}

impl std::fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgressStage::Grid => write!(f, "grid"),
            ProgressStage::Genetic { generation } => write!(f, "genetic[{}]", generation),
            ProgressStage::Bayesian => write!(f, "bayesian"),
            ProgressStage::Leaderboard => write!(f, "leaderboard"),
        }
    }
}

/// 진행률 이벤트
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub stage: ProgressStage,
    /// 완료된 작업 수
    pub completed: usize,
    /// 전체 작업 수
    pub total: usize,
}

impl ProgressEvent {
    /// 완료율 (%)
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.completed as f64 / self.total as f64 * 100.0
        }
    }
}

/// 실행 제어: 진행률 송신 채널 + 취소 토큰
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    progress: Option<UnboundedSender<ProgressEvent>>,
    cancel: CancellationToken,
}

impl RunControl {
    /// 진행률/취소 없이 실행
    pub fn new() -> Self {
        Self::default()
    }

    /// 진행률 채널과 함께 생성. 수신 측을 함께 반환합니다.
    pub fn with_channel() -> (Self, UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = unbounded_channel();
        (Self::new().with_progress(tx), rx)
    }

    /// 진행률 송신자 설정
    pub fn with_progress(mut self, sender: UnboundedSender<ProgressEvent>) -> Self {
        self.progress = Some(sender);
        self
    }

    /// 외부 취소 토큰 사용
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// 취소 토큰
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// 취소 요청
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// 취소 여부
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// 진행률 전송. 수신 측이 닫혀 있으면 무시합니다.
    pub fn report(&self, stage: ProgressStage, completed: usize, total: usize) {
        if let Some(sender) = &self.progress {
            let _ = sender.send(ProgressEvent {
                stage,
                completed,
                total,
            });
        }
    }

    /// 병렬 작업용 진행률 카운터
    pub(crate) fn tracker(&self, stage: ProgressStage, total: usize) -> ProgressTracker<'_> {
        ProgressTracker {
            control: self,
            stage,
            total,
            completed: AtomicUsize::new(0),
        }
    }
}

/// rayon 워커들이 공유하는 완료 카운터
pub(crate) struct ProgressTracker<'a> {
    control: &'a RunControl,
    stage: ProgressStage,
    total: usize,
    completed: AtomicUsize,
}

impl ProgressTracker<'_> {
    /// 작업 하나 완료
    pub(crate) fn tick(&self) {
        let completed = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        self.control.report(self.stage, completed, self.total);
    }
}
