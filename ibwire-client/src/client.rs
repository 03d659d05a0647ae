//! High-level client API.

use crate::connection::{Connection, ConnectionConfig, ConnectionState};
use crate::correlation::{Correlator, Subscription};
use crate::dispatcher::{DispatchEvent, Dispatcher};
use crate::error::ClientError;
use crate::stream::Transport;
use ibwire_protocol::contract::{Contract, ContractDetails, ScannerSubscription, TagValue};
use ibwire_protocol::execution::ExecutionFilter;
use ibwire_protocol::message::*;
use ibwire_protocol::order::Order;
use ibwire_protocol::{OutgoingMessage, ProtocolError, RequestEncoder};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Ticks collected for one snapshot request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MarketSnapshot {
    pub prices: Vec<TickPrice>,
    pub sizes: Vec<TickSize>,
    pub generics: Vec<TickGeneric>,
    pub strings: Vec<TickString>,
}

/// High-level client for a gateway session.
///
/// Request methods only write; responses are picked up through
/// [`Client::responses`]. The query helpers register their waiters before
/// writing and resolve once the response has arrived.
pub struct Client {
    conn: Arc<Connection>,
    correlator: Arc<Correlator>,
    dispatcher: Dispatcher,
}

impl Client {
    /// Creates a new client with the given configuration.
    pub fn new(config: ConnectionConfig) -> Self {
        let conn = Arc::new(Connection::new(config));
        let correlator = Arc::new(Correlator::new());
        let dispatcher = Dispatcher::new(Arc::clone(&conn), Arc::clone(&correlator));
        Self {
            conn,
            correlator,
            dispatcher,
        }
    }

    /// Connects and negotiates the protocol version.
    pub async fn connect(&self) -> Result<(), ClientError> {
        self.conn.connect().await
    }

    /// Negotiates over a caller-supplied stream.
    pub async fn connect_stream<T: Transport>(&self, stream: T) -> Result<(), ClientError> {
        self.conn.connect_stream(stream).await
    }

    /// Activates a session opened with extra authentication.
    pub async fn start_api(&self) -> Result<(), ClientError> {
        self.conn.start_api().await
    }

    /// Stops the read loop, closes the connection and fails every pending
    /// response.
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        self.dispatcher.shutdown().await;
        self.conn.disconnect().await?;
        self.correlator.fail_all();
        Ok(())
    }

    pub fn start_dispatcher(&self) -> Result<(), ClientError> {
        self.dispatcher.start()
    }

    pub async fn stop_dispatcher(&self) -> Result<(), ClientError> {
        self.dispatcher.stop().await
    }

    pub fn is_dispatcher_running(&self) -> bool {
        self.dispatcher.is_running()
    }

    /// Subscribes to dispatcher lifecycle events.
    pub fn events(&self) -> broadcast::Receiver<DispatchEvent> {
        self.dispatcher.subscribe()
    }

    /// Per-kind response queues.
    pub fn responses(&self) -> &Correlator {
        &self.correlator
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    pub fn state(&self) -> ConnectionState {
        self.conn.state()
    }

    pub fn server_version(&self) -> i32 {
        self.conn.server_version()
    }

    /// Connection time reported by the server during the handshake.
    pub fn server_time(&self) -> Option<String> {
        self.conn.server_time()
    }

    /// Returns the underlying connection.
    pub fn connection(&self) -> Arc<Connection> {
        Arc::clone(&self.conn)
    }

    // =========================================================================
    // Helper methods
    // =========================================================================

    async fn send(
        &self,
        encode: impl FnOnce(&RequestEncoder) -> Result<OutgoingMessage, ProtocolError>,
    ) -> Result<(), ClientError> {
        let encoder = self.conn.encoder()?;
        let msg = encode(&encoder)?;
        self.conn.send(&msg).await
    }

    // =========================================================================
    // Session
    // =========================================================================

    pub async fn set_server_log_level(&self, level: i32) -> Result<(), ClientError> {
        self.send(|e| Ok(e.set_server_log_level(level))).await
    }

    pub async fn req_current_time(&self) -> Result<(), ClientError> {
        self.send(|e| e.req_current_time()).await
    }

    /// Starts the verify exchange. Allowed before the session is activated.
    pub async fn verify_request(
        &self,
        api_name: &str,
        api_version: &str,
    ) -> Result<(), ClientError> {
        let msg = self
            .conn
            .verify_encoder()?
            .verify_request(api_name, api_version)?;
        self.conn.send(&msg).await
    }

    pub async fn verify_message(&self, api_data: &str) -> Result<(), ClientError> {
        let msg = self.conn.verify_encoder()?.verify_message(api_data)?;
        self.conn.send(&msg).await
    }

    // =========================================================================
    // Market data
    // =========================================================================

    pub async fn req_mkt_data(
        &self,
        ticker_id: i32,
        contract: &Contract,
        generic_tick_list: &str,
        snapshot: bool,
        options: &[TagValue],
    ) -> Result<(), ClientError> {
        self.send(|e| e.req_mkt_data(ticker_id, contract, generic_tick_list, snapshot, options))
            .await
    }

    pub async fn cancel_mkt_data(&self, ticker_id: i32) -> Result<(), ClientError> {
        self.send(|e| Ok(e.cancel_mkt_data(ticker_id))).await
    }

    pub async fn calculate_implied_volatility(
        &self,
        req_id: i32,
        contract: &Contract,
        option_price: f64,
        under_price: f64,
        options: &[TagValue],
    ) -> Result<(), ClientError> {
        self.send(|e| {
            e.calculate_implied_volatility(req_id, contract, option_price, under_price, options)
        })
        .await
    }

    pub async fn cancel_calculate_implied_volatility(&self, req_id: i32) -> Result<(), ClientError> {
        self.send(|e| e.cancel_calculate_implied_volatility(req_id))
            .await
    }

    pub async fn calculate_option_price(
        &self,
        req_id: i32,
        contract: &Contract,
        volatility: f64,
        under_price: f64,
        options: &[TagValue],
    ) -> Result<(), ClientError> {
        self.send(|e| e.calculate_option_price(req_id, contract, volatility, under_price, options))
            .await
    }

    pub async fn cancel_calculate_option_price(&self, req_id: i32) -> Result<(), ClientError> {
        self.send(|e| e.cancel_calculate_option_price(req_id)).await
    }

    pub async fn req_market_data_type(&self, market_data_type: i32) -> Result<(), ClientError> {
        self.send(|e| e.req_market_data_type(market_data_type))
            .await
    }

    pub async fn req_mkt_depth(
        &self,
        ticker_id: i32,
        contract: &Contract,
        num_rows: i32,
        options: &[TagValue],
    ) -> Result<(), ClientError> {
        self.send(|e| e.req_mkt_depth(ticker_id, contract, num_rows, options))
            .await
    }

    pub async fn cancel_mkt_depth(&self, ticker_id: i32) -> Result<(), ClientError> {
        self.send(|e| Ok(e.cancel_mkt_depth(ticker_id))).await
    }

    // =========================================================================
    // Orders
    // =========================================================================

    pub async fn place_order(
        &self,
        id: i32,
        contract: &Contract,
        order: &Order,
    ) -> Result<(), ClientError> {
        self.send(|e| e.place_order(id, contract, order)).await
    }

    pub async fn cancel_order(&self, order_id: i32) -> Result<(), ClientError> {
        self.send(|e| Ok(e.cancel_order(order_id))).await
    }

    pub async fn req_open_orders(&self) -> Result<(), ClientError> {
        self.send(|e| Ok(e.req_open_orders())).await
    }

    pub async fn req_all_open_orders(&self) -> Result<(), ClientError> {
        self.send(|e| Ok(e.req_all_open_orders())).await
    }

    pub async fn req_auto_open_orders(&self, auto_bind: bool) -> Result<(), ClientError> {
        self.send(|e| Ok(e.req_auto_open_orders(auto_bind))).await
    }

    pub async fn req_ids(&self, num_ids: i32) -> Result<(), ClientError> {
        self.send(|e| Ok(e.req_ids(num_ids))).await
    }

    pub async fn exercise_options(
        &self,
        ticker_id: i32,
        contract: &Contract,
        exercise_action: i32,
        exercise_quantity: i32,
        account: &str,
        override_: i32,
    ) -> Result<(), ClientError> {
        self.send(|e| {
            e.exercise_options(
                ticker_id,
                contract,
                exercise_action,
                exercise_quantity,
                account,
                override_,
            )
        })
        .await
    }

    pub async fn req_global_cancel(&self) -> Result<(), ClientError> {
        self.send(|e| e.req_global_cancel()).await
    }

    // =========================================================================
    // Account and positions
    // =========================================================================

    pub async fn req_account_updates(
        &self,
        subscribe: bool,
        acct_code: &str,
    ) -> Result<(), ClientError> {
        self.send(|e| Ok(e.req_account_updates(subscribe, acct_code)))
            .await
    }

    pub async fn req_account_summary(
        &self,
        req_id: i32,
        group: &str,
        tags: &str,
    ) -> Result<(), ClientError> {
        self.send(|e| e.req_account_summary(req_id, group, tags))
            .await
    }

    pub async fn cancel_account_summary(&self, req_id: i32) -> Result<(), ClientError> {
        self.send(|e| e.cancel_account_summary(req_id)).await
    }

    pub async fn req_positions(&self) -> Result<(), ClientError> {
        self.send(|e| e.req_positions()).await
    }

    pub async fn cancel_positions(&self) -> Result<(), ClientError> {
        self.send(|e| e.cancel_positions()).await
    }

    pub async fn req_executions(
        &self,
        req_id: i32,
        filter: &ExecutionFilter,
    ) -> Result<(), ClientError> {
        self.send(|e| Ok(e.req_executions(req_id, filter))).await
    }

    pub async fn req_managed_accts(&self) -> Result<(), ClientError> {
        self.send(|e| Ok(e.req_managed_accts())).await
    }

    pub async fn request_fa(&self, fa_data_type: i32) -> Result<(), ClientError> {
        self.send(|e| Ok(e.request_fa(fa_data_type))).await
    }

    pub async fn replace_fa(&self, fa_data_type: i32, xml: &str) -> Result<(), ClientError> {
        self.send(|e| Ok(e.replace_fa(fa_data_type, xml))).await
    }

    // =========================================================================
    // Contracts and reference data
    // =========================================================================

    pub async fn req_contract_details(
        &self,
        req_id: i32,
        contract: &Contract,
    ) -> Result<(), ClientError> {
        self.send(|e| e.req_contract_details(req_id, contract))
            .await
    }

    pub async fn req_fundamental_data(
        &self,
        req_id: i32,
        contract: &Contract,
        report_type: &str,
        options: &[TagValue],
    ) -> Result<(), ClientError> {
        self.send(|e| e.req_fundamental_data(req_id, contract, report_type, options))
            .await
    }

    pub async fn cancel_fundamental_data(&self, req_id: i32) -> Result<(), ClientError> {
        self.send(|e| e.cancel_fundamental_data(req_id)).await
    }

    pub async fn req_news_bulletins(&self, all_messages: bool) -> Result<(), ClientError> {
        self.send(|e| Ok(e.req_news_bulletins(all_messages))).await
    }

    pub async fn cancel_news_bulletins(&self) -> Result<(), ClientError> {
        self.send(|e| Ok(e.cancel_news_bulletins())).await
    }

    // =========================================================================
    // Historical, real-time and scanner data
    // =========================================================================

    #[allow(clippy::too_many_arguments)]
    pub async fn req_historical_data(
        &self,
        ticker_id: i32,
        contract: &Contract,
        end_date_time: &str,
        duration: &str,
        bar_size: &str,
        what_to_show: &str,
        use_rth: i32,
        format_date: i32,
        options: &[TagValue],
    ) -> Result<(), ClientError> {
        self.send(|e| {
            e.req_historical_data(
                ticker_id,
                contract,
                end_date_time,
                duration,
                bar_size,
                what_to_show,
                use_rth,
                format_date,
                options,
            )
        })
        .await
    }

    pub async fn cancel_historical_data(&self, ticker_id: i32) -> Result<(), ClientError> {
        self.send(|e| e.cancel_historical_data(ticker_id)).await
    }

    pub async fn req_real_time_bars(
        &self,
        ticker_id: i32,
        contract: &Contract,
        bar_size: i32,
        what_to_show: &str,
        use_rth: bool,
        options: &[TagValue],
    ) -> Result<(), ClientError> {
        self.send(|e| {
            e.req_real_time_bars(ticker_id, contract, bar_size, what_to_show, use_rth, options)
        })
        .await
    }

    pub async fn cancel_real_time_bars(&self, ticker_id: i32) -> Result<(), ClientError> {
        self.send(|e| Ok(e.cancel_real_time_bars(ticker_id))).await
    }

    pub async fn req_scanner_parameters(&self) -> Result<(), ClientError> {
        self.send(|e| Ok(e.req_scanner_parameters())).await
    }

    pub async fn req_scanner_subscription(
        &self,
        req_id: i32,
        subscription: &ScannerSubscription,
        options: &[TagValue],
    ) -> Result<(), ClientError> {
        self.send(|e| Ok(e.req_scanner_subscription(req_id, subscription, options)))
            .await
    }

    pub async fn cancel_scanner_subscription(&self, req_id: i32) -> Result<(), ClientError> {
        self.send(|e| Ok(e.cancel_scanner_subscription(req_id)))
            .await
    }

    // =========================================================================
    // Display groups
    // =========================================================================

    pub async fn query_display_groups(&self, req_id: i32) -> Result<(), ClientError> {
        self.send(|e| e.query_display_groups(req_id)).await
    }

    pub async fn subscribe_to_group_events(
        &self,
        req_id: i32,
        group_id: i32,
    ) -> Result<(), ClientError> {
        self.send(|e| e.subscribe_to_group_events(req_id, group_id))
            .await
    }

    pub async fn update_display_group(
        &self,
        req_id: i32,
        contract_info: &str,
    ) -> Result<(), ClientError> {
        self.send(|e| e.update_display_group(req_id, contract_info))
            .await
    }

    pub async fn unsubscribe_from_group_events(&self, req_id: i32) -> Result<(), ClientError> {
        self.send(|e| e.unsubscribe_from_group_events(req_id))
            .await
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Requests and awaits the server clock.
    pub async fn current_time(&self) -> Result<CurrentTime, ClientError> {
        let pending = self.correlator.current_time();
        self.req_current_time().await?;
        pending.await
    }

    /// Requests and awaits the accounts this session manages.
    pub async fn managed_accounts(&self) -> Result<ManagedAccounts, ClientError> {
        let pending = self.correlator.managed_accounts();
        self.req_managed_accts().await?;
        pending.await
    }

    /// Requests and awaits the next usable order id.
    pub async fn next_valid_id(&self) -> Result<i32, ClientError> {
        let pending = self.correlator.next_valid_id();
        self.req_ids(1).await?;
        Ok(pending.await?.order_id)
    }

    pub async fn contract_details(
        &self,
        req_id: i32,
        contract: &Contract,
    ) -> Result<Vec<ContractDetails>, ClientError> {
        let mut items = self.correlator.subscribe_contract_details();
        let mut ends = self.correlator.subscribe_contract_details_end();
        self.req_contract_details(req_id, contract).await?;
        await_end(&mut ends, |e| e.req_id == req_id).await?;
        Ok(items
            .drain()
            .into_iter()
            .filter(|d| d.req_id == req_id)
            .map(|d| d.details)
            .collect())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn historical_data(
        &self,
        ticker_id: i32,
        contract: &Contract,
        end_date_time: &str,
        duration: &str,
        bar_size: &str,
        what_to_show: &str,
        use_rth: i32,
    ) -> Result<Vec<HistoricalBar>, ClientError> {
        let mut bars = self.correlator.subscribe_historical_data();
        let mut ends = self.correlator.subscribe_historical_data_end();
        self.req_historical_data(
            ticker_id,
            contract,
            end_date_time,
            duration,
            bar_size,
            what_to_show,
            use_rth,
            1,
            &[],
        )
        .await?;
        await_end(&mut ends, |e| e.req_id == ticker_id).await?;
        Ok(bars
            .drain()
            .into_iter()
            .filter(|b| b.req_id == ticker_id)
            .collect())
    }

    pub async fn positions(&self) -> Result<Vec<Position>, ClientError> {
        let mut items = self.correlator.subscribe_position();
        let end = self.correlator.position_end();
        self.req_positions().await?;
        end.await?;
        self.cancel_positions().await?;
        Ok(items.drain())
    }

    pub async fn account_summary(
        &self,
        req_id: i32,
        group: &str,
        tags: &str,
    ) -> Result<Vec<AccountSummary>, ClientError> {
        let mut items = self.correlator.subscribe_account_summary();
        let mut ends = self.correlator.subscribe_account_summary_end();
        self.req_account_summary(req_id, group, tags).await?;
        await_end(&mut ends, |e| e.req_id == req_id).await?;
        self.cancel_account_summary(req_id).await?;
        Ok(items
            .drain()
            .into_iter()
            .filter(|s| s.req_id == req_id)
            .collect())
    }

    pub async fn executions(
        &self,
        req_id: i32,
        filter: &ExecutionFilter,
    ) -> Result<Vec<ExecutionData>, ClientError> {
        let mut items = self.correlator.subscribe_execution_data();
        let mut ends = self.correlator.subscribe_execution_data_end();
        self.req_executions(req_id, filter).await?;
        await_end(&mut ends, |e| e.req_id == req_id).await?;
        Ok(items
            .drain()
            .into_iter()
            .filter(|e| e.req_id == req_id || e.req_id == -1)
            .collect())
    }

    /// Requests and awaits the scanner parameter document.
    pub async fn scanner_parameters(&self) -> Result<String, ClientError> {
        let pending = self.correlator.scanner_parameters();
        self.req_scanner_parameters().await?;
        Ok(pending.await?.xml)
    }

    /// Requests a one-off snapshot and collects its ticks.
    pub async fn snapshot(
        &self,
        ticker_id: i32,
        contract: &Contract,
    ) -> Result<MarketSnapshot, ClientError> {
        let mut prices = self.correlator.subscribe_tick_price();
        let mut sizes = self.correlator.subscribe_tick_size();
        let mut generics = self.correlator.subscribe_tick_generic();
        let mut strings = self.correlator.subscribe_tick_string();
        let mut ends = self.correlator.subscribe_tick_snapshot_end();
        self.req_mkt_data(ticker_id, contract, "", true, &[]).await?;
        await_end(&mut ends, |e| e.req_id == ticker_id).await?;
        Ok(MarketSnapshot {
            prices: prices
                .drain()
                .into_iter()
                .filter(|t| t.ticker_id == ticker_id)
                .collect(),
            sizes: sizes
                .drain()
                .into_iter()
                .filter(|t| t.ticker_id == ticker_id)
                .collect(),
            generics: generics
                .drain()
                .into_iter()
                .filter(|t| t.ticker_id == ticker_id)
                .collect(),
            strings: strings
                .drain()
                .into_iter()
                .filter(|t| t.ticker_id == ticker_id)
                .collect(),
        })
    }
}

/// Waits for the end marker of one request. Markers of other requests are
/// skipped.
async fn await_end<E>(
    ends: &mut Subscription<E>,
    is_mine: impl Fn(&E) -> bool,
) -> Result<(), ClientError> {
    while let Some(end) = ends.recv().await {
        if is_mine(&end) {
            return Ok(());
        }
    }
    Err(ClientError::ConnectionClosed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{read_tokens, write_tokens};
    use tokio::io::DuplexStream;
    use tokio_test::assert_ok;

    async fn active_client(server_version: i32) -> (Client, DuplexStream) {
        let (stream, mut server) = tokio::io::duplex(64 * 1024);
        let version = server_version.to_string();
        write_tokens(&mut server, &[&version, "20240101 09:30:00 EST"]).await;

        let client = Client::new(ConnectionConfig::default().with_client_id(2));
        assert_ok!(client.connect_stream(stream).await);
        let handshake = if server_version < 70 { 2 } else { 4 };
        read_tokens(&mut server, handshake).await;
        assert_ok!(client.start_dispatcher());
        (client, server)
    }

    #[tokio::test]
    async fn test_requests_require_active_session() {
        let client = Client::new(ConnectionConfig::default());
        assert!(matches!(
            client.req_ids(1).await,
            Err(ClientError::NotConnected)
        ));
        assert!(matches!(
            client.verify_message("data").await,
            Err(ClientError::NotConnected)
        ));
        assert!(matches!(
            client.disconnect().await,
            Err(ClientError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_current_time_query() {
        let (client, mut server) = active_client(71).await;

        let peer = tokio::spawn(async move {
            assert_eq!(read_tokens(&mut server, 2).await, vec!["49", "1"]);
            write_tokens(&mut server, &["49", "1", "1700000000"]).await;
            server
        });

        let time = client.current_time().await.unwrap();
        assert_eq!(time.time, 1_700_000_000);
        assert!(time.as_datetime().is_some());
        peer.await.unwrap();
    }

    #[tokio::test]
    async fn test_unsupported_request_writes_nothing() {
        let (client, mut server) = active_client(40).await;

        let err = client.req_positions().await.unwrap_err();
        assert!(matches!(err, ClientError::UnsupportedByServer { .. }));

        // the next request is the first thing on the wire
        assert_ok!(client.req_ids(3).await);
        assert_eq!(read_tokens(&mut server, 3).await, vec!["8", "1", "3"]);
    }

    #[tokio::test]
    async fn test_positions_query_collects_until_end() {
        let (client, mut server) = active_client(71).await;

        let peer = tokio::spawn(async move {
            assert_eq!(read_tokens(&mut server, 2).await, vec!["61", "1"]);
            let position = |account: &'static str| {
                [
                    "61", "3", account, "265598", "AAPL", "STK", "", "0", "", "", "SMART",
                    "USD", "AAPL", "NMS", "100", "150.5",
                ]
            };
            write_tokens(&mut server, &position("DU1")).await;
            write_tokens(&mut server, &position("DU2")).await;
            write_tokens(&mut server, &["62", "1"]).await;
            // cancel follows the end marker
            assert_eq!(read_tokens(&mut server, 2).await, vec!["64", "1"]);
            server
        });

        let positions = client.positions().await.unwrap();
        assert_eq!(positions.len(), 2);
        assert_eq!(positions[0].account, "DU1");
        assert_eq!(positions[1].contract.symbol, "AAPL");
        assert_eq!(positions[1].position, 100);
        peer.await.unwrap();
    }

    #[tokio::test]
    async fn test_reconnect_after_disconnect() {
        let (client, _old) = active_client(71).await;
        assert_ok!(client.disconnect().await);
        assert!(!client.is_dispatcher_running());

        let (stream, mut server) = tokio::io::duplex(64 * 1024);
        write_tokens(&mut server, &["71", "20240101 09:30:00 EST"]).await;
        assert_ok!(client.connect_stream(stream).await);
        read_tokens(&mut server, 4).await;

        let time = client.responses().current_time();
        assert_ok!(client.start_dispatcher());
        write_tokens(&mut server, &["49", "1", "1700000000"]).await;
        assert_eq!(time.await.unwrap().time, 1_700_000_000);
    }

    #[tokio::test]
    async fn test_concurrent_history_queries_keep_their_bars() {
        let (client, mut server) = active_client(71).await;
        let client = Arc::new(client);
        let contract = Contract {
            symbol: "AAPL".to_string(),
            sec_type: "STK".to_string(),
            ..Default::default()
        };

        let query = |id: i32| {
            let client = Arc::clone(&client);
            let contract = contract.clone();
            tokio::spawn(async move {
                client
                    .historical_data(id, &contract, "", "1 D", "1 hour", "TRADES", 1)
                    .await
            })
        };
        let first = query(1);
        let second = query(2);

        // both requests are written before any answer
        read_tokens(&mut server, 46).await;
        let bars = |id: &'static str| {
            [
                "17", "3", id, "a", "b", "1", "20240102", "1", "2", "0.5", "1.5", "10", "1.2",
                "false", "4",
            ]
        };
        write_tokens(&mut server, &bars("1")).await;
        write_tokens(&mut server, &bars("2")).await;

        let first = first.await.unwrap().unwrap();
        let second = second.await.unwrap().unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].req_id, 1);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].req_id, 2);
    }

    #[tokio::test]
    async fn test_disconnect_fails_pending() {
        let (client, _server) = active_client(71).await;
        let pending = client.responses().next_valid_id();

        assert_ok!(client.disconnect().await);
        assert!(matches!(pending.await, Err(ClientError::ConnectionClosed)));
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert_eq!(client.server_version(), 0);
    }
}
