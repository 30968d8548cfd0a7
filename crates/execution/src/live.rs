// In crates/execution/src/live.rs
use crate::{Error, Executor, Result};
use api_client::ApiClient;
use api_client::types::NewOrderResponse;
use async_trait::async_trait;
use core_types::{OrderRequest, OrderResult};

/// An executor that places real orders on the Binance exchange (or its
/// testnet, depending on the client's base URL).
#[derive(Debug, Clone)]
pub struct LiveExecutor {
    /// The API client for communicating with Binance.
    api_client: ApiClient,
}

impl LiveExecutor {
    pub fn new(api_client: ApiClient) -> Self {
        Self { api_client }
    }
}

#[async_trait]
impl Executor for LiveExecutor {
    fn name(&self) -> &'static str {
        "LiveExecutor"
    }

    async fn execute(&self, order_request: &OrderRequest) -> Result<OrderResult> {
        tracing::info!(?order_request, "Submitting market order...");

        let order_response = self
            .api_client
            .place_market_order(&order_request.symbol, order_request.side, order_request.quantity)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to place market order.");
                Error::ApiClientError(e)
            })?;
        tracing::info!(?order_response, "Market order accepted.");

        Ok(order_result(order_request, order_response))
    }
}

/// Builds the fill report for an accepted order. The side is the one that
/// was requested: once the exchange has accepted the order, an unexpected
/// echo must not turn it into a failure.
fn order_result(order_request: &OrderRequest, order_response: NewOrderResponse) -> OrderResult {
    if order_response.side != order_request.side.as_str() {
        tracing::warn!(
            order_id = order_response.order_id,
            requested = %order_request.side,
            reported = %order_response.side,
            "Exchange echoed a different side; keeping the requested one."
        );
    }

    // Fill figures come from the exchange.
    OrderResult {
        order_id: order_response.order_id,
        symbol: order_request.symbol.clone(),
        side: order_request.side,
        executed_quantity: order_response.executed_qty,
        average_price: order_response.avg_price,
        status: order_response.status,
    }
}
