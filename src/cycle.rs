//! Compressor keep-alive cycle.
//!
//! Some power banks switch themselves off when the load stays low for too
//! long. Forcing the compressor on for a short while every few hours keeps
//! them awake. A cycle only acts when the fridge is off; if it is already
//! running there is nothing to do.

use std::time::Duration;

use log::{debug, info, trace};
use tokio::{
    task::JoinHandle,
    time::{MissedTickBehavior, interval, sleep},
};
use tokio_util::sync::CancellationToken;

use crate::fridge::Fridge;

/// How a single cycle invocation ended.
#[derive(Debug)]
pub enum CycleOutcome {
    /// Cancelled before real device data arrived. Nothing was sent.
    Cancelled,
    /// The fridge was already on. Nothing was sent.
    AlreadyOn,
    /// The cold command could not be delivered.
    SendFailed,
    /// The cold command was delivered and the reversion is pending.
    Cycled { reversion: JoinHandle<()> },
}

/// Runs one compressor cycle.
///
/// Waits until the fridge has reported real data (or `cancel_token` fires),
/// then, if the fridge is off, sends the cold target and schedules a
/// reversion to the captured settings after `on_time`.
///
/// The reversion runs on its own task and is not tied to `cancel_token`:
/// once scheduled it fires even if the scheduler is cancelled. It only dies
/// with the runtime.
pub async fn cycle_compressor(
    fridge: &Fridge,
    cancel_token: &CancellationToken,
    on_time: Duration,
) -> CycleOutcome {
    if !fridge.has_data() {
        trace!("Waiting to see some initialized data");
    }
    if !fridge.wait_for_data(cancel_token).await {
        debug!("Compressor cycle cancelled while waiting for data");
        return CycleOutcome::Cancelled;
    }

    let prev = fridge.settings().await;
    if prev.is_on() {
        debug!("Fridge already on, skipping compressor cycle");
        return CycleOutcome::AlreadyOn;
    }

    let target = prev.cold_target();
    trace!(
        "Fridge going to cold setting: on={} temp_set={}",
        target.on, target.temp_set
    );
    if !fridge.send(target).await {
        return CycleOutcome::SendFailed;
    }

    let reversion = tokio::spawn({
        let fridge = fridge.clone();
        async move {
            sleep(on_time).await;
            trace!("Fridge going back to previous settings: temp_set={}", prev.temp_set);
            fridge.send(prev).await;
        }
    });

    CycleOutcome::Cycled { reversion }
}

/// Launches a compressor cycle now and then once every `period`.
///
/// Every launch runs on its own task with a clone of `cancel_token`, so the
/// ticking loop never waits on a cycle and a single cancellation stops both
/// future ticks and launches still waiting for data.
pub async fn run_cycle_scheduler(
    fridge: Fridge,
    on_time: Duration,
    period: Duration,
    cancel_token: CancellationToken,
) {
    info!("Fridge interval turn-on/turn-off start (every {period:?}, on for {on_time:?})");
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = cancel_token.cancelled() => {
                info!("Cycle scheduler cancelled");
                break;
            }
            _instant = ticker.tick() => {
                debug!("Fridge compressor cycle tick");
                let fridge = fridge.clone();
                let cancel_token = cancel_token.clone();
                tokio::spawn(async move {
                    let outcome = cycle_compressor(&fridge, &cancel_token, on_time).await;
                    debug!("Compressor cycle finished: {outcome:?}");
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        drivers::LinkPorts,
        fridge::FridgeParts,
        status::{FREEZING_TEMP_SET, Settings, StatusReport},
    };
    use pretty_assertions::assert_eq;
    use tokio::time::{Instant, timeout};

    const ON_TIME: Duration = Duration::from_secs(1);

    async fn fridge_with(settings: Settings) -> (Fridge, LinkPorts) {
        let FridgeParts { fridge, ports, .. } = Fridge::build();
        fridge.install(StatusReport::new(settings, 8.0)).await;
        (fridge, ports)
    }

    #[tokio::test(start_paused = true)]
    async fn already_on_sends_nothing() {
        let (fridge, mut ports) = fridge_with(Settings::default().with_on(true)).await;

        let outcome = cycle_compressor(&fridge, &CancellationToken::new(), ON_TIME).await;
        assert!(matches!(outcome, CycleOutcome::AlreadyOn));

        drop(fridge);
        assert_eq!(ports.commands.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn cycles_cold_then_reverts_after_on_time() {
        let prev = Settings {
            on: 0,
            temp_set: 20,
            e5: 1,
            ..Settings::default()
        };
        let (fridge, mut ports) = fridge_with(prev).await;

        let cycle = tokio::spawn({
            let fridge = fridge.clone();
            async move { cycle_compressor(&fridge, &CancellationToken::new(), ON_TIME).await }
        });

        let started = Instant::now();
        let first = ports.commands.recv().await.unwrap();
        assert_eq!(
            first,
            Settings {
                on: 1,
                temp_set: FREEZING_TEMP_SET,
                ..prev
            }
        );
        assert_eq!(first.temp_set, 0xff - 10);

        let CycleOutcome::Cycled { reversion } = cycle.await.unwrap() else {
            panic!("expected a cycle");
        };

        let second = ports.commands.recv().await.unwrap();
        assert!(started.elapsed() >= ON_TIME);
        assert_eq!(second, prev);
        assert_eq!((second.on, second.temp_set), (0, 20));
        reversion.await.unwrap();

        drop(fridge);
        assert_eq!(ports.commands.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn reversion_survives_cancellation() {
        let prev = Settings {
            temp_set: 6,
            ..Settings::default()
        }
        .with_locked(true);
        let (fridge, mut ports) = fridge_with(prev).await;
        let token = CancellationToken::new();

        let cycle = tokio::spawn({
            let fridge = fridge.clone();
            let token = token.clone();
            async move { cycle_compressor(&fridge, &token, ON_TIME).await }
        });

        assert_eq!(ports.commands.recv().await.unwrap().on, 1);
        assert!(matches!(cycle.await.unwrap(), CycleOutcome::Cycled { .. }));
        token.cancel();

        assert_eq!(ports.commands.recv().await, Some(prev));
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_data_before_deciding() {
        let FridgeParts {
            fridge, mut ports, ..
        } = Fridge::build();

        let cycle = tokio::spawn({
            let fridge = fridge.clone();
            async move { cycle_compressor(&fridge, &CancellationToken::new(), ON_TIME).await }
        });

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(!cycle.is_finished());

        let prev = Settings {
            temp_set: 3,
            ..Settings::default()
        };
        fridge.install(StatusReport::new(prev, 9.0)).await;

        let first = ports.commands.recv().await.unwrap();
        assert_eq!(first.on, 1);
        assert_eq!(first.temp_set, 0);
        assert!(matches!(cycle.await.unwrap(), CycleOutcome::Cycled { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_while_waiting_sends_nothing() {
        let FridgeParts {
            fridge, mut ports, ..
        } = Fridge::build();
        let token = CancellationToken::new();

        let cycle = tokio::spawn({
            let fridge = fridge.clone();
            let token = token.clone();
            async move { cycle_compressor(&fridge, &token, ON_TIME).await }
        });

        tokio::time::sleep(Duration::from_secs(5)).await;
        token.cancel();

        assert!(matches!(cycle.await.unwrap(), CycleOutcome::Cancelled));
        drop(fridge);
        assert_eq!(ports.commands.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn send_failure_is_reported() {
        let (fridge, ports) = fridge_with(Settings::default().with_eco_mode(true)).await;
        drop(ports);

        let outcome = cycle_compressor(&fridge, &CancellationToken::new(), ON_TIME).await;
        assert!(matches!(outcome, CycleOutcome::SendFailed));
    }

    #[tokio::test(start_paused = true)]
    async fn scheduler_cycles_immediately_and_every_period() {
        let prev = Settings {
            temp_set: 5,
            e5: 1,
            ..Settings::default()
        };
        let (fridge, mut ports) = fridge_with(prev).await;
        let token = CancellationToken::new();
        let period = Duration::from_secs(60);

        let scheduler = tokio::spawn(run_cycle_scheduler(
            fridge.clone(),
            ON_TIME,
            period,
            token.clone(),
        ));

        let started = Instant::now();
        assert_eq!(ports.commands.recv().await.unwrap().on, 1);
        assert!(started.elapsed() < ON_TIME);
        assert_eq!(ports.commands.recv().await, Some(prev));

        assert_eq!(ports.commands.recv().await.unwrap().on, 1);
        assert!(started.elapsed() >= period);
        assert_eq!(ports.commands.recv().await, Some(prev));

        token.cancel();
        timeout(Duration::from_secs(1), scheduler)
            .await
            .expect("scheduler should stop on cancel")
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_scheduler_stops_ticking() {
        let (fridge, mut ports) = fridge_with(Settings::default().with_on(true)).await;
        let token = CancellationToken::new();
        token.cancel();

        run_cycle_scheduler(fridge.clone(), ON_TIME, Duration::from_secs(60), token).await;

        drop(fridge);
        assert_eq!(ports.commands.recv().await, None);
    }
}
