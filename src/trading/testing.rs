//! Scripted collaborators for engine tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use uuid::Uuid;

use crate::api::{ExecutionVenue, OraclePrice, PriceOracle};
use crate::error::BotError;
use crate::models::{BotState, TokenBalance};
use crate::notify::{ErrorReporter, Notification, NotificationLevel, Notifier};
use crate::solana::WalletSession;
use crate::storage::{TransactionRecord, TransactionRecorder};

pub struct ScriptedOracle {
    quote: Mutex<(f64, f64)>,
    failing: AtomicBool,
    calls: AtomicUsize,
    gate: Mutex<Option<Arc<Notify>>>,
    called: Notify,
}

impl ScriptedOracle {
    pub fn new(price: f64, change_24h: f64) -> Self {
        Self {
            quote: Mutex::new((price, change_24h)),
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            gate: Mutex::new(None),
            called: Notify::new(),
        }
    }

    pub fn set_price(&self, price: f64, change_24h: f64) {
        *self.quote.lock().unwrap() = (price, change_24h);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Makes every following call wait until the returned gate is notified.
    pub fn hold(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub async fn wait_for_call(&self) {
        self.called.notified().await;
    }
}

#[async_trait]
impl PriceOracle for ScriptedOracle {
    async fn get_price(&self, _token_address: &str) -> Result<OraclePrice> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.called.notify_one();
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("oracle unavailable"));
        }
        let (price, change_24h) = *self.quote.lock().unwrap();
        Ok(OraclePrice {
            price,
            change_24h,
            symbol: Some("TEST".to_string()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VenueMode {
    Settle,
    Reject,
    Error,
    Hang,
    Panic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwapCall {
    pub from_mint: String,
    pub to_mint: String,
    pub amount: f64,
    pub wallet: String,
}

pub struct ScriptedVenue {
    mode: Mutex<VenueMode>,
    calls: Mutex<Vec<SwapCall>>,
    called: Notify,
}

impl ScriptedVenue {
    pub fn new(mode: VenueMode) -> Self {
        Self {
            mode: Mutex::new(mode),
            calls: Mutex::new(Vec::new()),
            called: Notify::new(),
        }
    }

    pub fn set_mode(&self, mode: VenueMode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn calls(&self) -> Vec<SwapCall> {
        self.calls.lock().unwrap().clone()
    }

    pub async fn wait_for_call(&self) {
        self.called.notified().await;
    }
}

#[async_trait]
impl ExecutionVenue for ScriptedVenue {
    async fn swap(&self, from_mint: &str, to_mint: &str, amount: f64, wallet_address: &str) -> Result<bool> {
        self.calls.lock().unwrap().push(SwapCall {
            from_mint: from_mint.to_string(),
            to_mint: to_mint.to_string(),
            amount,
            wallet: wallet_address.to_string(),
        });
        self.called.notify_one();
        let mode = *self.mode.lock().unwrap();
        match mode {
            VenueMode::Settle => Ok(true),
            VenueMode::Reject => Ok(false),
            VenueMode::Error => Err(anyhow!("venue exploded")),
            VenueMode::Hang => {
                std::future::pending::<()>().await;
                Ok(true)
            }
            VenueMode::Panic => panic!("venue panicked"),
        }
    }
}

pub struct StubWallet {
    connected: AtomicBool,
    refreshes: AtomicUsize,
}

pub const WALLET_ADDRESS: &str = "WalletAddr1111";

impl StubWallet {
    pub fn connected() -> Self {
        Self {
            connected: AtomicBool::new(true),
            refreshes: AtomicUsize::new(0),
        }
    }

    pub fn disconnected() -> Self {
        let wallet = Self::connected();
        wallet.connected.store(false, Ordering::SeqCst);
        wallet
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletSession for StubWallet {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn address(&self) -> Option<String> {
        self.is_connected().then(|| WALLET_ADDRESS.to_string())
    }

    async fn token_balances(&self) -> Vec<TokenBalance> {
        Vec::new()
    }

    async fn refresh(&self) -> Result<()> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryRecorder {
    records: Mutex<Vec<TransactionRecord>>,
    failing: AtomicBool,
}

impl MemoryRecorder {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn records(&self) -> Vec<TransactionRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransactionRecorder for MemoryRecorder {
    async fn record(&self, record: TransactionRecord) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("ledger offline"));
        }
        self.records.lock().unwrap().push(record);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
    states: Mutex<Vec<(BotState, Option<Uuid>)>>,
}

impl RecordingNotifier {
    pub fn levels(&self) -> Vec<NotificationLevel> {
        self.notifications.lock().unwrap().iter().map(|n| n.level).collect()
    }

    pub fn titles(&self) -> Vec<String> {
        self.notifications.lock().unwrap().iter().map(|n| n.title.clone()).collect()
    }

    pub fn states(&self) -> Vec<BotState> {
        self.states.lock().unwrap().iter().map(|(s, _)| *s).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.notifications.lock().unwrap().push(notification);
    }

    fn status_changed(&self, state: BotState, session_id: Option<Uuid>) {
        self.states.lock().unwrap().push((state, session_id));
    }
}

#[derive(Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<(BotError, String)>>,
}

impl RecordingReporter {
    pub fn kinds(&self) -> Vec<&'static str> {
        self.reports.lock().unwrap().iter().map(|(e, _)| e.kind()).collect()
    }
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, error: &BotError, context: &str) {
        self.reports.lock().unwrap().push((error.clone(), context.to_string()));
    }
}
