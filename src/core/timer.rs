//! Self-rearming timers whose pending deadline can be pushed back at runtime.

use chrono::{DateTime, Local, NaiveTime, TimeDelta, Utc};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerSchedule {
    /// 固定間隔，從上次執行結束起算
    Every(Duration),
    /// 每日本地時間
    DailyAt(NaiveTime),
}

impl TimerSchedule {
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Every(interval) => now + to_delta(*interval),
            Self::DailyAt(time) => {
                let local_now = now.with_timezone(&Local);
                let today = local_now
                    .date_naive()
                    .and_time(*time)
                    .and_local_timezone(Local)
                    .earliest();

                match today {
                    Some(at) if at >= local_now => at.with_timezone(&Utc),
                    Some(at) => (at + TimeDelta::days(1)).with_timezone(&Utc),
                    // 時間不存在於今日 (日光節約)，順延一天
                    None => now + TimeDelta::days(1),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayPolicy {
    Always,
    /// Only when the pending run is due within the delay amount.
    WhenImminent,
}

#[derive(Debug)]
struct TimerState {
    next_run: DateTime<Utc>,
    running: bool,
}

pub struct DelayableTimer {
    name: String,
    schedule: TimerSchedule,
    delay_amount: Duration,
    policy: DelayPolicy,
    state: Mutex<TimerState>,
    rearmed: Notify,
}

impl DelayableTimer {
    pub fn new(
        name: impl Into<String>,
        schedule: TimerSchedule,
        delay_amount: Duration,
        policy: DelayPolicy,
    ) -> Self {
        let next_run = schedule.next_after(Utc::now());
        let name = name.into();
        tracing::info!("⏰ {} timer armed, first run at {}", name, next_run);

        Self {
            name,
            schedule,
            delay_amount,
            policy,
            state: Mutex::new(TimerState {
                next_run,
                running: false,
            }),
            rearmed: Notify::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn next_execution(&self) -> DateTime<Utc> {
        self.lock().next_run
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    /// Pushes the pending run back by the delay amount, subject to the policy,
    /// and returns the resulting next execution time.
    pub fn delay(&self) -> DateTime<Utc> {
        let next = self.delay_at(Utc::now());
        self.rearmed.notify_one();
        next
    }

    fn delay_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let mut state = self.lock();

        if state.running {
            tracing::warn!("⚠️ {} is running, nothing to delay", self.name);
            return state.next_run;
        }

        let delay = to_delta(self.delay_amount);
        let remaining = state.next_run - now;
        if self.policy == DelayPolicy::WhenImminent && remaining > delay {
            tracing::debug!(
                "{} not imminent ({}s remaining), keeping {}",
                self.name,
                remaining.num_seconds(),
                state.next_run
            );
            return state.next_run;
        }

        // 過期的排程從現在起算
        let base = state.next_run.max(now);
        state.next_run = base + delay;
        tracing::info!(
            "⏸️ {} delayed by {}s, next run at {}",
            self.name,
            self.delay_amount.as_secs(),
            state.next_run
        );
        state.next_run
    }

    /// Runs `task` at every deadline until the surrounding task is dropped.
    /// The same timer never overlaps with itself.
    pub async fn run<F, Fut>(self: Arc<Self>, mut task: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        loop {
            let wait = (self.next_execution() - Utc::now())
                .to_std()
                .unwrap_or(Duration::ZERO);

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = self.rearmed.notified() => continue,
            }

            if !self.begin_run(Utc::now()) {
                continue;
            }

            tracing::debug!("▶️ {} run started", self.name);
            task().await;
            self.finish_run(Utc::now());
        }
    }

    fn begin_run(&self, now: DateTime<Utc>) -> bool {
        let mut state = self.lock();
        if state.next_run > now {
            return false;
        }
        state.running = true;
        true
    }

    fn finish_run(&self, now: DateTime<Utc>) {
        let mut state = self.lock();
        state.running = false;
        state.next_run = self.schedule.next_after(now);
        tracing::debug!("{} next run at {}", self.name, state.next_run);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn to_delta(duration: Duration) -> TimeDelta {
    TimeDelta::from_std(duration).unwrap_or_else(|_| TimeDelta::days(365))
}
