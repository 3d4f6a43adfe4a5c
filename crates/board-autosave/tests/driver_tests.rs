use async_trait::async_trait;
use board_activity::LivenessProbe;
use board_autosave::{BoardSaver, DriverState, PersistenceDriver, SaveError, TickOutcome};
use board_test_utils::CountingTimer;
use mockall::mock;
use proptest::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const INTERVAL: Duration = Duration::from_millis(20_000);

mock! {
    pub Saver {}

    #[async_trait]
    impl BoardSaver for Saver {
        async fn save(&self) -> Result<(), SaveError>;
    }
}

#[derive(Default)]
struct SwitchProbe(AtomicBool);

impl LivenessProbe for SwitchProbe {
    fn is_live_and_visible(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn saves_only_on_live_ticks() {
    let mut saver = MockSaver::new();
    saver.expect_save().times(2).returning(|| Ok(()));

    let probe = Arc::new(SwitchProbe(AtomicBool::new(true)));
    let driver = PersistenceDriver::start(INTERVAL, probe.clone(), Arc::new(saver));

    tokio::time::sleep(INTERVAL + Duration::from_millis(1)).await;
    probe.0.store(false, Ordering::SeqCst);
    tokio::time::sleep(INTERVAL).await;
    probe.0.store(true, Ordering::SeqCst);
    tokio::time::sleep(INTERVAL).await;

    let stats = driver.stats();
    assert_eq!(stats.ticks, 3);
    assert_eq!(stats.saves_succeeded, 2);
    assert_eq!(stats.skipped, 1);
    driver.stop();
}

#[tokio::test(start_paused = true)]
async fn rejected_save_is_not_retried_early() {
    let mut saver = MockSaver::new();
    saver
        .expect_save()
        .times(1)
        .returning(|| Err(SaveError::Rejected("board locked".into())));

    let probe = Arc::new(SwitchProbe(AtomicBool::new(true)));
    let driver = PersistenceDriver::start(INTERVAL, probe, Arc::new(saver));

    // One tick at 20s; the next would be at 40s.
    tokio::time::sleep(Duration::from_millis(39_999)).await;

    assert_eq!(driver.stats().last_outcome, Some(TickOutcome::Failed));
    assert_eq!(driver.state(), DriverState::Armed);
    driver.stop();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_exactly_one_timer_after_every_tick(
        rounds in prop::collection::vec((any::<bool>(), any::<bool>()), 1..16),
    ) {
        let runtime = paused_runtime();
        let plan = rounds.clone();
        let (armed, max_pending, pending, ticks) = runtime.block_on(async move {
            let probe = Arc::new(SwitchProbe::default());
            let fail = Arc::new(AtomicBool::new(false));
            let timer = CountingTimer::new();

            let mut saver = MockSaver::new();
            let fail_flag = Arc::clone(&fail);
            saver.expect_save().returning(move || {
                if fail_flag.load(Ordering::SeqCst) {
                    Err(SaveError::Unavailable("flaky".into()))
                } else {
                    Ok(())
                }
            });

            let driver = PersistenceDriver::start_with_timer(
                INTERVAL,
                probe.clone(),
                Arc::new(saver),
                timer.clone(),
            );
            let start = tokio::time::Instant::now();

            for (i, (live, failing)) in plan.iter().enumerate() {
                probe.0.store(*live, Ordering::SeqCst);
                fail.store(*failing, Ordering::SeqCst);
                let tick = INTERVAL * u32::try_from(i + 1).unwrap();
                tokio::time::sleep_until(start + tick + Duration::from_millis(1)).await;
                assert_eq!(timer.pending(), 1);
            }

            let result = (
                timer.armed(),
                timer.max_pending(),
                timer.pending(),
                driver.stats().ticks,
            );
            driver.stop();
            result
        });

        prop_assert_eq!(armed, rounds.len() + 1);
        prop_assert_eq!(max_pending, 1);
        prop_assert_eq!(pending, 1);
        prop_assert_eq!(ticks, rounds.len() as u64);
    }
}
