use futures::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::api::{ExecutionVenue, PriceOracle};
use crate::config::EngineSettings;
use crate::error::{BotError, BotResult};
use crate::models::{BotSession, BotState, Order, OrderOrigin, OrderSide, OrderStatus, PriceSnapshot, TradeIntent};
use crate::notify::{ErrorReporter, Notification, Notifier};
use crate::solana::WalletSession;
use crate::storage::{TransactionRecord, TransactionRecorder};
use crate::trading::config_store::{BotConfig, BotConfigPatch, ConfigStore};
use crate::trading::order_ledger::OrderLedger;
use crate::trading::price_feed::PriceFeed;
use crate::trading::risk::RiskMonitor;
use crate::trading::strategy;

const MIN_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// External services the controller drives.
#[derive(Clone)]
pub struct Collaborators {
    pub wallet: Arc<dyn WalletSession>,
    pub venue: Arc<dyn ExecutionVenue>,
    pub oracle: Arc<dyn PriceOracle>,
    pub recorder: Arc<dyn TransactionRecorder>,
    pub notifier: Arc<dyn Notifier>,
    pub reporter: Arc<dyn ErrorReporter>,
}

/// Point-in-time view of the controller for the UI.
#[derive(Debug, Clone, Serialize)]
pub struct ControllerStatus {
    pub state: BotState,
    pub session: Option<BotSession>,
    pub selected_token: Option<String>,
    pub active_orders: usize,
    pub total_orders: usize,
    pub last_error: Option<String>,
}

// Everything mutated by ticks and public operations; guarded by one lock.
struct Engine {
    config: ConfigStore,
    ledger: OrderLedger,
    state: BotState,
    session: Option<BotSession>,
    last_error: Option<String>,
}

impl Engine {
    fn owns(&self, session_id: Uuid) -> bool {
        self.session.as_ref().map(|s| s.id) == Some(session_id)
    }

    fn strategy_orders_in(&self, session_id: Uuid) -> usize {
        self.ledger
            .placed_in_session(session_id)
            .filter(|o| !o.origin.is_protective() && o.origin != OrderOrigin::Seed)
            .count()
    }
}

struct Inner {
    engine: Mutex<Engine>,
    task_handle: Mutex<Option<JoinHandle<()>>>, // The single tick loop, if armed
    price_feed: PriceFeed,
    collab: Collaborators,
    settings: EngineSettings,
}

/// Drives one wallet's bot: owns the config, the ledger and the tick loop.
/// Cheap to clone; clones share the same engine.
#[derive(Clone)]
pub struct BotController {
    inner: Arc<Inner>,
}

impl BotController {
    pub fn new(initial: BotConfig, mut settings: EngineSettings, collab: Collaborators) -> Self {
        if settings.tick_interval < MIN_TICK_INTERVAL {
            warn!(
                "Tick interval {:?} is below the minimum; using {:?}",
                settings.tick_interval, MIN_TICK_INTERVAL
            );
            settings.tick_interval = MIN_TICK_INTERVAL;
        }
        let price_feed = PriceFeed::new(collab.oracle.clone(), collab.reporter.clone(), settings.price_throttle);
        Self {
            inner: Arc::new(Inner {
                engine: Mutex::new(Engine {
                    config: ConfigStore::new(initial),
                    ledger: OrderLedger::new(),
                    state: BotState::Idle,
                    session: None,
                    last_error: None,
                }),
                task_handle: Mutex::new(None),
                price_feed,
                collab,
                settings,
            }),
        }
    }

    // --- Configuration ---

    pub async fn get_config(&self) -> BotConfig {
        self.inner.engine.lock().await.config.get()
    }

    /// Merges a partial update. Changing the token is refused while a session is active.
    pub async fn update_config(&self, patch: BotConfigPatch) -> BotResult<BotConfig> {
        let mut engine = self.inner.engine.lock().await;
        if patch.touches_token() && engine.state.is_active() {
            drop(engine);
            return Err(self.refuse("Token Locked", "Stop the bot before changing the token"));
        }
        let updated = engine.config.update(patch);
        info!("Bot config updated: {:?}", updated);
        Ok(updated)
    }

    pub async fn select_token(&self, token: Option<String>) -> BotResult<BotConfig> {
        self.update_config(BotConfigPatch::selecting_token(token)).await
    }

    // --- Lifecycle ---

    pub async fn start(&self) -> BotResult<()> {
        let mut engine = self.inner.engine.lock().await;
        if engine.state.is_active() {
            drop(engine);
            warn!("Bot start requested but already running.");
            return Err(self.refuse("Already Running", "The bot is already running"));
        }
        let config = engine.config.get();
        let Some(token) = config.selected_token.clone() else {
            drop(engine);
            return Err(self.refuse("No Token Selected", "Select a token before starting the bot"));
        };
        if !self.inner.collab.wallet.is_connected() {
            drop(engine);
            return Err(self.refuse("Wallet Not Connected", "Connect a wallet before starting the bot"));
        }

        let session = BotSession::new();
        let session_id = session.id;
        engine.session = Some(session);
        engine.state = BotState::Running;
        engine.last_error = None;
        drop(engine);

        info!("Bot started | Session: {} | Token: {} | Strategy: {}", session_id, token, config.strategy);
        self.inner.collab.notifier.status_changed(BotState::Running, Some(session_id));
        self.inner.collab.notifier.notify(Notification::info(
            "Bot Started",
            format!("Trading {} with the {} strategy", token, config.strategy),
        ));

        self.guarded(session_id, "seed order", self.place_seed(session_id, &token)).await?;

        // Arm only if the session survived the seed (stop() may have run meanwhile)
        let engine = self.inner.engine.lock().await;
        if engine.owns(session_id) {
            self.arm(session_id).await;
        }
        Ok(())
    }

    /// Disarms the tick, cancels pending orders and ends the session. No-op when idle.
    pub async fn stop(&self) -> BotResult<()> {
        let mut engine = self.inner.engine.lock().await;
        if let Some(handle) = self.inner.task_handle.lock().await.take() {
            handle.abort();
        }
        let Some(session) = engine.session.take() else {
            debug!("Bot stop requested while idle.");
            return Ok(());
        };
        let cancelled = engine.ledger.cancel_all_pending();
        engine.state = BotState::Idle;
        self.inner.price_feed.reset();
        drop(engine);

        info!("Bot stopped | Session: {} | Cancelled {} pending orders", session.id, cancelled.len());
        self.inner.collab.notifier.status_changed(BotState::Idle, None);
        self.inner.collab.notifier.notify(Notification::info("Bot Stopped", "Trading has been stopped"));
        Ok(())
    }

    pub async fn pause(&self) -> BotResult<()> {
        self.transition(BotState::Running, BotState::Paused).await
    }

    pub async fn resume(&self) -> BotResult<()> {
        self.transition(BotState::Paused, BotState::Running).await
    }

    async fn transition(&self, from: BotState, to: BotState) -> BotResult<()> {
        let mut engine = self.inner.engine.lock().await;
        if engine.state != from {
            let current = engine.state;
            drop(engine);
            return Err(self.refuse("Invalid State", format!("Cannot switch to {} while {}", to, current)));
        }
        engine.state = to;
        let session_id = engine.session.as_ref().map(|s| s.id);
        drop(engine);

        info!("Bot {} -> {}", from, to);
        self.inner.collab.notifier.status_changed(to, session_id);
        Ok(())
    }

    // --- Queries ---

    pub async fn status(&self) -> BotState {
        self.inner.engine.lock().await.state
    }

    pub async fn status_report(&self) -> ControllerStatus {
        let engine = self.inner.engine.lock().await;
        ControllerStatus {
            state: engine.state,
            session: engine.session.clone(),
            selected_token: engine.config.get().selected_token,
            active_orders: engine.ledger.pending().len(),
            total_orders: engine.ledger.len(),
            last_error: engine.last_error.clone(),
        }
    }

    pub async fn active_orders(&self) -> Vec<Order> {
        self.inner.engine.lock().await.ledger.pending()
    }

    pub async fn orders(&self) -> Vec<Order> {
        self.inner.engine.lock().await.ledger.orders().to_vec()
    }

    pub async fn session_id(&self) -> Option<Uuid> {
        self.inner.engine.lock().await.session.as_ref().map(|s| s.id)
    }

    pub async fn last_error(&self) -> Option<String> {
        self.inner.engine.lock().await.last_error.clone()
    }

    /// Last known price, without fetching.
    pub fn current_price(&self) -> Option<PriceSnapshot> {
        self.inner.price_feed.current()
    }

    /// Price of the selected token, fetched if the throttle allows.
    pub async fn refresh_price(&self) -> Option<PriceSnapshot> {
        let token = self.get_config().await.selected_token;
        self.inner.price_feed.refresh(token.as_deref()).await
    }

    #[cfg(test)]
    async fn is_armed(&self) -> bool {
        self.inner.task_handle.lock().await.is_some()
    }

    // --- Tick loop ---

    async fn arm(&self, session_id: Uuid) {
        let mut slot = self.inner.task_handle.lock().await;
        if let Some(previous) = slot.take() {
            warn!("Clearing a stale tick loop before arming a new one");
            previous.abort();
        }
        *slot = Some(Self::spawn_loop(Arc::downgrade(&self.inner), session_id, self.inner.settings.tick_interval));
        debug!("Tick loop armed for session {}", session_id);
    }

    fn spawn_loop(inner: Weak<Inner>, session_id: Uuid, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let run = AssertUnwindSafe(Self::run_loop(inner.clone(), session_id, period))
                .catch_unwind()
                .await;
            // A panic outside a tick (e.g. building the ticker) must not leave the bot running
            if let Err(panic) = run {
                if let Some(inner) = inner.upgrade() {
                    let error = BotError::Lifecycle(format!("tick loop panicked: {}", panic_message(&panic)));
                    BotController { inner }.fail_safe_stop(session_id, &error).await;
                }
            }
            debug!("Tick loop for session {} exited", session_id);
        })
    }

    async fn run_loop(inner: Weak<Inner>, session_id: Uuid, period: Duration) {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let Some(inner) = inner.upgrade() else { break };
            let controller = BotController { inner };
            if controller.session_id().await != Some(session_id) {
                break;
            }
            if controller.guarded(session_id, "tick", controller.tick(session_id)).await.is_err() {
                break;
            }
        }
    }

    // Runs `work` for `session_id`; any error or panic ends the session.
    async fn guarded<F>(&self, session_id: Uuid, context: &str, work: F) -> BotResult<()>
    where
        F: Future<Output = BotResult<()>>,
    {
        let error = match AssertUnwindSafe(work).catch_unwind().await {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(BotError::Lifecycle(msg))) => BotError::Lifecycle(msg),
            Ok(Err(e)) => BotError::Lifecycle(format!("{} failed: {}", context, e)),
            Err(panic) => BotError::Lifecycle(format!("{} panicked: {}", context, panic_message(&panic))),
        };
        self.fail_safe_stop(session_id, &error).await;
        Err(error)
    }

    // running -> error -> idle. Called from inside the tick loop, so the
    // loop's handle is released rather than aborted.
    async fn fail_safe_stop(&self, session_id: Uuid, error: &BotError) {
        let mut engine = self.inner.engine.lock().await;
        if !engine.owns(session_id) {
            return;
        }
        engine.state = BotState::Error;
        engine.last_error = Some(error.to_string());
        error!("Bot session {} failed: {}", session_id, error);
        self.inner.collab.notifier.status_changed(BotState::Error, Some(session_id));
        self.inner.collab.reporter.report(error, "bot tick");
        self.inner
            .collab
            .notifier
            .notify(Notification::failure("Bot Error", format!("The bot stopped: {}", error)));

        let cancelled = engine.ledger.cancel_all_pending();
        engine.session = None;
        engine.state = BotState::Idle;
        self.inner.price_feed.reset();
        drop(self.inner.task_handle.lock().await.take());
        drop(engine);

        warn!("Bot fail-safe stop | Cancelled {} pending orders", cancelled.len());
        self.inner.collab.notifier.status_changed(BotState::Idle, None);
    }

    async fn place_seed(&self, session_id: Uuid, token: &str) -> BotResult<()> {
        let config = self.get_config().await;
        if config.seed_fraction <= 0.0 {
            return Ok(());
        }
        let Some(snapshot) = self.inner.price_feed.refresh(Some(token)).await else {
            info!("No price for {} yet; skipping seed order", token);
            return Ok(());
        };

        let order = {
            let mut engine = self.inner.engine.lock().await;
            if !engine.owns(session_id) {
                return Ok(());
            }
            let intent = TradeIntent::buy(
                token,
                config.trade_amount * config.seed_fraction,
                snapshot.price,
                OrderOrigin::Seed,
            );
            engine.ledger.place(&intent, session_id)
        };
        self.execute(order, &snapshot, session_id).await
    }

    /// One pass of price -> strategy -> execution -> risk -> execution.
    async fn tick(&self, session_id: Uuid) -> BotResult<()> {
        let (config, paused) = {
            let engine = self.inner.engine.lock().await;
            if !engine.owns(session_id) {
                return Ok(());
            }
            (engine.config.get(), engine.state == BotState::Paused)
        };
        if paused {
            debug!("Bot paused; skipping tick");
            return Ok(());
        }

        let Some(snapshot) = self.inner.price_feed.refresh(config.selected_token.as_deref()).await else {
            debug!("No price snapshot available; skipping tick");
            return Ok(());
        };

        let placed = {
            let mut engine = self.inner.engine.lock().await;
            if !engine.owns(session_id) {
                return Ok(());
            }
            let config = engine.config.get();
            match strategy::evaluate(&config, &snapshot, &engine.ledger) {
                Some(_) if engine.strategy_orders_in(session_id) >= config.max_trades as usize => {
                    info!("Max trades ({}) reached for session {}; ignoring signal", config.max_trades, session_id);
                    None
                }
                Some(intent) => Some(engine.ledger.place(&intent, session_id)),
                None => None,
            }
        };
        if let Some(order) = placed {
            self.execute(order, &snapshot, session_id).await?;
        }

        let protective = {
            let mut engine = self.inner.engine.lock().await;
            if !engine.owns(session_id) {
                return Ok(());
            }
            let config = engine.config.get();
            RiskMonitor::check(&config, &snapshot, &engine.ledger).map(|intent| engine.ledger.place(&intent, session_id))
        };
        if let Some(order) = protective {
            self.execute(order, &snapshot, session_id).await?;
        }
        Ok(())
    }

    // Sends a placed order to the venue and settles it.
    async fn execute(&self, order: Order, snapshot: &PriceSnapshot, session_id: Uuid) -> BotResult<()> {
        let outcome = self.swap(&order).await;

        let settled = {
            let mut engine = self.inner.engine.lock().await;
            if !engine.owns(session_id) {
                debug!("Discarding venue result for order {} from an ended session", order.id);
                return Ok(());
            }
            engine.ledger.settle(&order.id, outcome.is_ok())?
        };

        let symbol = snapshot.display_symbol();
        if let Err(e) = self
            .inner
            .collab
            .recorder
            .record(TransactionRecord::from_order(&settled, &symbol))
            .await
        {
            self.inner
                .collab
                .reporter
                .report(&BotError::Execution(format!("{:#}", e)), "record transaction");
        }

        match outcome {
            Ok(()) if settled.status == OrderStatus::Completed => {
                if let Err(e) = self.inner.collab.wallet.refresh().await {
                    self.inner
                        .collab
                        .reporter
                        .report(&BotError::Wallet(format!("{:#}", e)), "wallet refresh");
                }
                info!(
                    "✅ {} order {} completed | {} {:.6} @ {:.8}",
                    settled.origin, settled.id, symbol, settled.amount, settled.price
                );
                self.inner.collab.notifier.notify(Notification::success(
                    &format!("{} Order Executed", side_title(settled.side)),
                    format!("{} {:.6} {} @ {:.8} ({})", settled.side, settled.amount, symbol, settled.price, settled.origin),
                ));
            }
            Ok(()) => {}
            Err(e) => {
                self.inner.collab.reporter.report(&e, &format!("order {}", settled.id));
                self.inner.collab.notifier.notify(Notification::failure(
                    &format!("{} Order Failed", side_title(settled.side)),
                    e.to_string(),
                ));
            }
        }
        Ok(())
    }

    async fn swap(&self, order: &Order) -> BotResult<()> {
        let wallet = self
            .inner
            .collab
            .wallet
            .address()
            .ok_or_else(|| BotError::Execution("Wallet is not connected".to_string()))?;
        let quote = self.inner.settings.quote_mint.as_str();
        let (from, to, amount) = match order.side {
            OrderSide::Buy => (quote, order.token.as_str(), order.amount),
            OrderSide::Sell => {
                if order.price <= 0.0 {
                    return Err(BotError::Execution(format!("No reference price for order {}", order.id)));
                }
                (order.token.as_str(), quote, order.amount / order.price)
            }
        };

        debug!("Swapping {:.9} {} -> {} for order {}", amount, from, to, order.id);
        let limit = self.inner.settings.execution_timeout;
        match timeout(limit, self.inner.collab.venue.swap(from, to, amount, &wallet)).await {
            Ok(Ok(true)) => Ok(()),
            Ok(Ok(false)) => Err(BotError::Execution(format!("Swap for order {} was not settled", order.id))),
            Ok(Err(e)) => Err(BotError::Execution(format!("Swap for order {} failed: {:#}", order.id, e))),
            Err(_) => Err(BotError::Execution(format!(
                "Swap for order {} timed out after {:?}",
                order.id, limit
            ))),
        }
    }

    fn refuse(&self, title: &str, message: impl Into<String>) -> BotError {
        let message = message.into();
        warn!("Refused: {}", message);
        self.inner.collab.notifier.notify(Notification::failure(title, message.clone()));
        BotError::Config(message)
    }
}

fn side_title(side: OrderSide) -> &'static str {
    match side {
        OrderSide::Buy => "Buy",
        OrderSide::Sell => "Sell",
    }
}

fn panic_message(panic: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
