//! Correlation of un-tagged responses with their callers.
//!
//! The server does not echo a correlation id on most responses, so every
//! response kind has its own FIFO queue of single-shot waiters. The oldest
//! live waiter of a kind receives the next message of that kind.
//!
//! List responses can also be drained through a [`Subscription`], which
//! receives a copy of every message of the kind until it is dropped. Any
//! number of subscriptions may listen next to the single-shot waiters.

use crate::error::ClientError;
use ibwire_protocol::execution::CommissionReport;
use ibwire_protocol::message::*;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot};

/// A caller-held handle to the next message of one kind.
///
/// Resolves to [`ClientError::ConnectionClosed`] when the queue is failed.
#[derive(Debug)]
pub struct Pending<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> Future for Pending<T> {
    type Output = Result<T, ClientError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.map_err(|_| ClientError::ConnectionClosed))
    }
}

/// Receives every message of one kind while it is alive.
///
/// Yields `None` once the queue is failed.
#[derive(Debug)]
pub struct Subscription<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> Subscription<T> {
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Takes an already delivered message without waiting.
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Takes everything delivered so far.
    pub fn drain(&mut self) -> Vec<T> {
        let mut out = Vec::new();
        while let Some(item) = self.try_recv() {
            out.push(item);
        }
        out
    }
}

enum Waiter<T> {
    Once(oneshot::Sender<T>),
    Stream(mpsc::UnboundedSender<T>),
}

/// Ordered waiters for one message kind.
pub struct PendingQueue<T> {
    waiters: Mutex<VecDeque<Waiter<T>>>,
}

impl<T> PendingQueue<T> {
    pub fn new() -> Self {
        Self {
            waiters: Mutex::new(VecDeque::new()),
        }
    }

    /// Enqueues a waiter for the next message.
    pub fn next(&self) -> Pending<T> {
        let (tx, rx) = oneshot::channel();
        self.waiters.lock().push_back(Waiter::Once(tx));
        Pending { rx }
    }

    /// Enqueues a waiter that keeps receiving until dropped.
    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.waiters.lock().push_back(Waiter::Stream(tx));
        Subscription { rx }
    }

    /// Drops every waiter. Pending futures resolve to `ConnectionClosed`
    /// and subscriptions end.
    pub fn fail_all(&self) -> usize {
        let drained: Vec<_> = self.waiters.lock().drain(..).collect();
        drained.len()
    }

    pub fn len(&self) -> usize {
        self.waiters.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.lock().is_empty()
    }
}

impl<T: Clone> PendingQueue<T> {
    /// Copies `value` to every live subscription and hands it to the oldest
    /// single-shot waiter that is still listening.
    ///
    /// Waiters whose receiver was dropped are discarded on the way. Returns
    /// `false` when nobody took the value.
    pub fn fulfill(&self, value: T) -> bool {
        let mut waiters = self.waiters.lock();
        let mut delivered = false;
        waiters.retain(|waiter| match waiter {
            Waiter::Stream(tx) => {
                let sent = tx.send(value.clone()).is_ok();
                delivered |= sent;
                sent
            }
            Waiter::Once(tx) => !tx.is_closed(),
        });

        let mut value = value;
        while let Some(pos) = waiters.iter().position(|w| matches!(w, Waiter::Once(_))) {
            let Some(Waiter::Once(tx)) = waiters.remove(pos) else {
                break;
            };
            match tx.send(value) {
                Ok(()) => return true,
                Err(returned) => value = returned,
            }
        }
        delivered
    }
}

impl<T> Default for PendingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! correlator {
    ($( $(#[$doc:meta])* $name:ident: $ty:ty ),* $(,)?) => {
        /// One waiter queue per response kind.
        #[derive(Default)]
        pub struct Correlator {
            $( $name: PendingQueue<$ty>, )*
        }

        impl Correlator {
            pub fn new() -> Self {
                Self::default()
            }

            $(
                $(#[$doc])*
                pub fn $name(&self) -> Pending<$ty> {
                    self.$name.next()
                }
            )*

            /// Fails every waiter of every kind. Returns how many were dropped.
            pub fn fail_all(&self) -> usize {
                0 $( + self.$name.fail_all() )*
            }

            /// Number of waiters across all kinds.
            pub fn pending_count(&self) -> usize {
                0 $( + self.$name.len() )*
            }
        }
    };
}

correlator! {
    tick_price: TickPrice,
    /// Also fulfilled by the size ticks derived from price ticks.
    tick_size: TickSize,
    tick_option_computation: TickOptionComputation,
    tick_generic: TickGeneric,
    tick_string: TickString,
    tick_efp: TickEfp,
    tick_snapshot_end: TickSnapshotEnd,
    market_data_type: MarketDataType,
    market_depth: MarketDepth,
    market_depth_l2: MarketDepthL2,
    delta_neutral_validation: DeltaNeutralValidation,

    order_status: OrderStatus,
    open_order: OpenOrder,
    open_order_end: (),
    next_valid_id: NextValidId,
    execution_data: ExecutionData,
    execution_data_end: ExecutionDataEnd,
    commission_report: CommissionReport,

    account_value: AccountValue,
    portfolio_value: PortfolioValue,
    account_update_time: AccountUpdateTime,
    account_download_end: AccountDownloadEnd,
    managed_accounts: ManagedAccounts,
    receive_fa: ReceiveFa,
    position: Position,
    position_end: (),
    account_summary: AccountSummary,
    account_summary_end: AccountSummaryEnd,

    contract_details: ContractData,
    bond_contract_details: ContractData,
    contract_details_end: ContractDataEnd,
    fundamental_data: FundamentalData,
    news_bulletin: NewsBulletin,

    /// One bar per call; the list is closed by `historical_data_end`.
    historical_data: HistoricalBar,
    historical_data_end: HistoricalDataEnd,
    real_time_bar: RealTimeBar,
    scanner_parameters: ScannerParameters,
    scanner_data: ScannerData,
    scanner_data_end: ScannerDataEnd,

    /// Server errors and client-side decode reports.
    errors: ErrorMessage,
    current_time: CurrentTime,
    verify_message_api: VerifyMessageApi,
    verify_completed: VerifyCompleted,
    display_group_list: DisplayGroupList,
    display_group_updated: DisplayGroupUpdated,
}

impl Correlator {
    pub fn subscribe_tick_price(&self) -> Subscription<TickPrice> {
        self.tick_price.subscribe()
    }

    pub fn subscribe_tick_size(&self) -> Subscription<TickSize> {
        self.tick_size.subscribe()
    }

    pub fn subscribe_tick_generic(&self) -> Subscription<TickGeneric> {
        self.tick_generic.subscribe()
    }

    pub fn subscribe_tick_string(&self) -> Subscription<TickString> {
        self.tick_string.subscribe()
    }

    pub fn subscribe_tick_snapshot_end(&self) -> Subscription<TickSnapshotEnd> {
        self.tick_snapshot_end.subscribe()
    }

    pub fn subscribe_execution_data(&self) -> Subscription<ExecutionData> {
        self.execution_data.subscribe()
    }

    pub fn subscribe_execution_data_end(&self) -> Subscription<ExecutionDataEnd> {
        self.execution_data_end.subscribe()
    }

    pub fn subscribe_position(&self) -> Subscription<Position> {
        self.position.subscribe()
    }

    pub fn subscribe_account_summary(&self) -> Subscription<AccountSummary> {
        self.account_summary.subscribe()
    }

    pub fn subscribe_account_summary_end(&self) -> Subscription<AccountSummaryEnd> {
        self.account_summary_end.subscribe()
    }

    pub fn subscribe_contract_details(&self) -> Subscription<ContractData> {
        self.contract_details.subscribe()
    }

    pub fn subscribe_contract_details_end(&self) -> Subscription<ContractDataEnd> {
        self.contract_details_end.subscribe()
    }

    pub fn subscribe_historical_data(&self) -> Subscription<HistoricalBar> {
        self.historical_data.subscribe()
    }

    pub fn subscribe_historical_data_end(&self) -> Subscription<HistoricalDataEnd> {
        self.historical_data_end.subscribe()
    }

    pub fn subscribe_scanner_data(&self) -> Subscription<ScannerData> {
        self.scanner_data.subscribe()
    }

    /// Receives every error report until dropped.
    pub fn subscribe_errors(&self) -> Subscription<ErrorMessage> {
        self.errors.subscribe()
    }

    /// Delivers a decoded message to the waiters of its kind.
    pub(crate) fn route(&self, msg: Incoming) -> bool {
        let kind = msg.kind();
        let delivered = match msg {
            Incoming::TickPrice(m) => self.tick_price.fulfill(m),
            Incoming::TickSize(m) => self.tick_size.fulfill(m),
            Incoming::TickOptionComputation(m) => self.tick_option_computation.fulfill(m),
            Incoming::TickGeneric(m) => self.tick_generic.fulfill(m),
            Incoming::TickString(m) => self.tick_string.fulfill(m),
            Incoming::TickEfp(m) => self.tick_efp.fulfill(m),
            Incoming::TickSnapshotEnd(m) => self.tick_snapshot_end.fulfill(m),
            Incoming::MarketDataType(m) => self.market_data_type.fulfill(m),
            Incoming::MarketDepth(m) => self.market_depth.fulfill(m),
            Incoming::MarketDepthL2(m) => self.market_depth_l2.fulfill(m),
            Incoming::DeltaNeutralValidation(m) => self.delta_neutral_validation.fulfill(m),

            Incoming::OrderStatus(m) => self.order_status.fulfill(m),
            Incoming::OpenOrder(m) => self.open_order.fulfill(*m),
            Incoming::OpenOrderEnd => self.open_order_end.fulfill(()),
            Incoming::NextValidId(m) => self.next_valid_id.fulfill(m),
            Incoming::ExecutionData(m) => self.execution_data.fulfill(*m),
            Incoming::ExecutionDataEnd(m) => self.execution_data_end.fulfill(m),
            Incoming::CommissionReport(m) => self.commission_report.fulfill(m),

            Incoming::AccountValue(m) => self.account_value.fulfill(m),
            Incoming::PortfolioValue(m) => self.portfolio_value.fulfill(*m),
            Incoming::AccountUpdateTime(m) => self.account_update_time.fulfill(m),
            Incoming::AccountDownloadEnd(m) => self.account_download_end.fulfill(m),
            Incoming::ManagedAccounts(m) => self.managed_accounts.fulfill(m),
            Incoming::ReceiveFa(m) => self.receive_fa.fulfill(m),
            Incoming::Position(m) => self.position.fulfill(*m),
            Incoming::PositionEnd => self.position_end.fulfill(()),
            Incoming::AccountSummary(m) => self.account_summary.fulfill(m),
            Incoming::AccountSummaryEnd(m) => self.account_summary_end.fulfill(m),

            Incoming::ContractData(m) => self.contract_details.fulfill(*m),
            Incoming::BondContractData(m) => self.bond_contract_details.fulfill(*m),
            Incoming::ContractDataEnd(m) => self.contract_details_end.fulfill(m),
            Incoming::FundamentalData(m) => self.fundamental_data.fulfill(m),
            Incoming::NewsBulletin(m) => self.news_bulletin.fulfill(m),

            Incoming::HistoricalData(m) => self.historical_data.fulfill(m),
            Incoming::HistoricalDataEnd(m) => self.historical_data_end.fulfill(m),
            Incoming::RealTimeBar(m) => self.real_time_bar.fulfill(m),
            Incoming::ScannerParameters(m) => self.scanner_parameters.fulfill(m),
            Incoming::ScannerData(m) => self.scanner_data.fulfill(*m),
            Incoming::ScannerDataEnd(m) => self.scanner_data_end.fulfill(m),

            Incoming::Error(m) => self.errors.fulfill(m),
            Incoming::CurrentTime(m) => self.current_time.fulfill(m),
            Incoming::VerifyMessageApi(m) => self.verify_message_api.fulfill(m),
            Incoming::VerifyCompleted(m) => self.verify_completed.fulfill(m),
            Incoming::DisplayGroupList(m) => self.display_group_list.fulfill(m),
            Incoming::DisplayGroupUpdated(m) => self.display_group_updated.fulfill(m),
        };
        if !delivered {
            tracing::trace!("No waiter for {:?}, message dropped", kind);
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ibwire_protocol::ErrorCode;
    use tokio_test::{assert_pending, assert_ready, assert_ready_err, task};

    fn next_id(order_id: i32) -> Incoming {
        Incoming::NextValidId(NextValidId { order_id })
    }

    #[tokio::test]
    async fn test_fifo_fulfillment() {
        let correlator = Correlator::new();
        let first = correlator.next_valid_id();
        let second = correlator.next_valid_id();

        assert!(correlator.route(next_id(1)));
        assert!(correlator.route(next_id(2)));

        assert_eq!(first.await.unwrap().order_id, 1);
        assert_eq!(second.await.unwrap().order_id, 2);
    }

    #[test]
    fn test_waiter_stays_pending_until_routed() {
        let correlator = Correlator::new();
        let mut pending = task::spawn(correlator.current_time());
        assert_pending!(pending.poll());

        correlator.route(Incoming::CurrentTime(CurrentTime { time: 1_700_000_000 }));
        assert!(pending.is_woken());
        let value = assert_ready!(pending.poll()).unwrap();
        assert_eq!(value.time, 1_700_000_000);
    }

    #[test]
    fn test_no_waiter_drops_message() {
        let correlator = Correlator::new();
        assert!(!correlator.route(next_id(1)));

        // a later waiter does not see the dropped message
        let mut pending = task::spawn(correlator.next_valid_id());
        assert_pending!(pending.poll());
    }

    #[tokio::test]
    async fn test_dropped_waiter_is_skipped() {
        let correlator = Correlator::new();
        let abandoned = correlator.next_valid_id();
        let live = correlator.next_valid_id();
        drop(abandoned);

        assert!(correlator.route(next_id(5)));
        assert_eq!(live.await.unwrap().order_id, 5);
        assert_eq!(correlator.pending_count(), 0);
    }

    #[test]
    fn test_fail_all_closes_waiters() {
        let correlator = Correlator::new();
        let mut ids = task::spawn(correlator.next_valid_id());
        let mut errors = task::spawn(correlator.errors());
        assert_pending!(ids.poll());
        assert_eq!(correlator.pending_count(), 2);

        assert_eq!(correlator.fail_all(), 2);
        assert_eq!(correlator.pending_count(), 0);
        assert!(matches!(
            assert_ready_err!(ids.poll()),
            ClientError::ConnectionClosed
        ));
        assert!(matches!(
            assert_ready_err!(errors.poll()),
            ClientError::ConnectionClosed
        ));
    }

    #[tokio::test]
    async fn test_kinds_do_not_cross() {
        let correlator = Correlator::new();
        let end = correlator.position_end();
        let mut ids = task::spawn(correlator.next_valid_id());

        correlator.route(Incoming::PositionEnd);
        end.await.unwrap();
        assert_pending!(ids.poll());
    }

    #[tokio::test]
    async fn test_boxed_messages_are_unboxed() {
        let correlator = Correlator::new();
        let bond = correlator.bond_contract_details();
        let regular = correlator.contract_details();

        let data = |req_id| ContractData {
            req_id,
            details: Default::default(),
        };
        correlator.route(Incoming::BondContractData(Box::new(data(4))));
        correlator.route(Incoming::ContractData(Box::new(data(5))));

        assert_eq!(bond.await.unwrap().req_id, 4);
        assert_eq!(regular.await.unwrap().req_id, 5);
    }

    #[tokio::test]
    async fn test_subscription_takes_every_message() {
        let correlator = Correlator::new();
        let mut ids = correlator.subscribe_position();
        let end = correlator.position_end();

        let position = |account: &str| {
            Incoming::Position(Box::new(Position {
                account: account.to_string(),
                contract: Default::default(),
                position: 1,
                avg_cost: 0.0,
            }))
        };
        assert!(correlator.route(position("DU1")));
        assert!(correlator.route(position("DU2")));
        correlator.route(Incoming::PositionEnd);

        end.await.unwrap();
        let accounts: Vec<_> = ids.drain().into_iter().map(|p| p.account).collect();
        assert_eq!(accounts, vec!["DU1", "DU2"]);

        drop(ids);
        assert!(!correlator.route(position("DU3")));
        assert_eq!(correlator.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_subscription_ends_on_fail_all() {
        let correlator = Correlator::new();
        let mut bars = correlator.subscribe_historical_data();
        correlator.fail_all();
        assert!(bars.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_subscriptions_share_messages() {
        let correlator = Correlator::new();
        let mut first = correlator.subscribe_errors();
        let mut second = correlator.subscribe_errors();
        let once = correlator.errors();

        let report = ErrorMessage::client(ErrorCode::UnknownId, "99");
        assert!(correlator.route(Incoming::Error(report)));

        assert_eq!(first.try_recv().unwrap().code, 505);
        assert_eq!(second.try_recv().unwrap().code, 505);
        assert_eq!(once.await.unwrap().code, 505);
        // subscriptions stay queued, the single-shot waiter is gone
        assert_eq!(correlator.pending_count(), 2);
    }

    #[tokio::test]
    async fn test_subscription_does_not_block_later_waiter() {
        let correlator = Correlator::new();
        let _bars = correlator.subscribe_historical_data();
        let end = correlator.historical_data_end();

        correlator.route(Incoming::HistoricalDataEnd(HistoricalDataEnd {
            req_id: 3,
            start: String::new(),
            end: String::new(),
        }));
        assert_eq!(end.await.unwrap().req_id, 3);
    }

    #[test]
    fn test_queue_len() {
        let queue: PendingQueue<i32> = PendingQueue::new();
        assert!(queue.is_empty());
        let _a = queue.next();
        let _b = queue.next();
        assert_eq!(queue.len(), 2);
        assert!(queue.fulfill(1));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.fail_all(), 1);
        assert!(!queue.fulfill(2));
    }
}
