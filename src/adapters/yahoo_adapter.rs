//! Latest price from Yahoo Finance's v8 chart API.
//!
//! The chart endpoint has no official contract; a response that does not
//! carry a usable price is reported as bad data for that symbol only.

use crate::domain::error::TradestoreError;
use crate::ports::quote_port::{QuoteError, QuotePort};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const SERVICE: &str = "yahoo_finance";
const BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    indicators: Option<Indicators>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    close: Vec<Option<f64>>,
}

pub struct YahooAdapter {
    client: reqwest::blocking::Client,
    base_url: String,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooAdapter {
    /// `timeout` bounds every request, so one symbol can never stall the pool.
    pub fn new(timeout: Duration) -> Result<Self, TradestoreError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| TradestoreError::service_unavailable(SERVICE, e.to_string()))?;

        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
            max_retries: 2,
            base_delay: Duration::from_millis(500),
        })
    }

    fn chart_url(&self, symbol: &str) -> String {
        format!("{}/{symbol}?range=5d&interval=1d", self.base_url)
    }

    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<f64, QuoteError> {
        let bad = |reason: &str| QuoteError::BadData {
            symbol: symbol.to_string(),
            reason: reason.to_string(),
        };

        let result = match (resp.chart.result, resp.chart.error) {
            (Some(result), _) => result,
            (None, Some(err)) if err.code == "Not Found" => {
                return Err(QuoteError::NotFound {
                    symbol: symbol.to_string(),
                });
            }
            (None, Some(err)) => return Err(bad(&format!("{}: {}", err.code, err.description))),
            (None, None) => return Err(bad("empty result with no error")),
        };

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| bad("result array is empty"))?;

        let from_meta = data
            .meta
            .and_then(|m| m.regular_market_price)
            .filter(|p| p.is_finite() && *p > 0.0);
        if let Some(price) = from_meta {
            return Ok(price);
        }

        data.indicators
            .and_then(|i| i.quote.into_iter().next())
            .and_then(|q| q.close.into_iter().rev().flatten().find(|p| p.is_finite()))
            .ok_or_else(|| QuoteError::NotFound {
                symbol: symbol.to_string(),
            })
    }
}

impl QuotePort for YahooAdapter {
    fn name(&self) -> &str {
        SERVICE
    }

    /// The client is built; reachability shows up per symbol as transport
    /// errors, which the refresher escalates when every symbol fails.
    fn ensure_available(&self) -> Result<(), TradestoreError> {
        Ok(())
    }

    fn latest_price(&self, symbol: &str) -> Result<f64, QuoteError> {
        let url = self.chart_url(symbol);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                std::thread::sleep(self.base_delay * 2u32.pow(attempt - 1));
            }

            match self.client.get(&url).send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(QuoteError::NotFound {
                            symbol: symbol.to_string(),
                        });
                    }
                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                        debug!(symbol, %status, attempt, "retrying quote");
                        last_error = Some(QuoteError::Transport {
                            symbol: symbol.to_string(),
                            reason: format!("HTTP {status}"),
                        });
                        continue;
                    }
                    if !status.is_success() {
                        return Err(QuoteError::BadData {
                            symbol: symbol.to_string(),
                            reason: format!("HTTP {status}"),
                        });
                    }

                    let chart: ChartResponse = resp.json().map_err(|e| QuoteError::BadData {
                        symbol: symbol.to_string(),
                        reason: format!("failed to parse response: {e}"),
                    })?;
                    return Self::parse_response(symbol, chart);
                }
                Err(e) if e.is_timeout() => {
                    last_error = Some(QuoteError::Timeout {
                        symbol: symbol.to_string(),
                    });
                }
                Err(e) if e.is_connect() => {
                    last_error = Some(QuoteError::Transport {
                        symbol: symbol.to_string(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    return Err(QuoteError::Transport {
                        symbol: symbol.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Err(last_error.unwrap_or_else(|| QuoteError::Transport {
            symbol: symbol.to_string(),
            reason: "max retries exceeded".into(),
        }))
    }
}
