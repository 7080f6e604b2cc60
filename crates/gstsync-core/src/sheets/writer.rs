//! Row writer with deterministic exponential backoff.

use std::time::Duration;

use tracing::{debug, error, warn};

use crate::models::record::InvoiceLineRecord;

use super::ValuesApi;

/// How long to keep retrying a single row.
///
/// `max_backoff` and `deadline` are counted in multiples of `unit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Cap on a single wait.
    pub max_backoff: u64,
    /// Total wait after which the row is given up.
    pub deadline: u64,
    /// Length of one wait unit.
    pub unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_backoff: 32,
            deadline: 300,
            unit: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self) -> Backoff {
        // a zero cap would never advance `waited`
        Backoff::new(self.max_backoff.max(1))
    }
}

/// Wait lengths `1, 2, 4, ...` capped at `max`. No jitter.
#[derive(Debug, Clone)]
pub struct Backoff {
    attempt: u32,
    max: u64,
}

impl Backoff {
    pub fn new(max: u64) -> Self {
        Self { attempt: 0, max }
    }
}

impl Iterator for Backoff {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let wait = 1u64
            .checked_shl(self.attempt)
            .filter(|w| *w <= self.max)
            .unwrap_or(self.max);
        self.attempt = self.attempt.saturating_add(1);
        Some(wait)
    }
}

/// Outcome of writing one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The row was written.
    Written {
        updated_cells: Option<u32>,
        attempts: u32,
    },
    /// Every attempt failed and the wait budget ran out.
    Exhausted {
        attempts: u32,
        /// Total units spent waiting.
        waited: u64,
        last_error: String,
    },
}

impl Delivery {
    pub fn is_written(&self) -> bool {
        matches!(self, Delivery::Written { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Delivery::Written { attempts, .. } | Delivery::Exhausted { attempts, .. } => *attempts,
        }
    }
}

/// Writes records to one spreadsheet, one API call per attempt.
pub struct RowWriter<A> {
    api: A,
    spreadsheet_id: String,
    policy: RetryPolicy,
}

impl<A: ValuesApi> RowWriter<A> {
    pub fn new(api: A, spreadsheet_id: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            api,
            spreadsheet_id: spreadsheet_id.into(),
            policy,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Write `record` to its target range, retrying any failure.
    ///
    /// After a failed attempt the writer sleeps for the next backoff step
    /// unless the total wait has already reached the deadline, in which
    /// case the row is reported as exhausted.
    pub async fn write(&self, record: &InvoiceLineRecord) -> Delivery {
        let range = record.target_cell_range.to_a1();
        let values = record.row_values();

        let mut backoff = self.policy.backoff();
        let mut attempts = 0u32;
        let mut waited = 0u64;

        loop {
            attempts += 1;
            debug!("Writing {} (attempt {})", range, attempts);

            let error = match self
                .api
                .update_values(&self.spreadsheet_id, &range, &values)
                .await
            {
                Ok(response) => {
                    return Delivery::Written {
                        updated_cells: response.updated_cells,
                        attempts,
                    };
                }
                Err(e) => e,
            };

            if waited >= self.policy.deadline {
                error!(
                    "Giving up on {} after {} attempts ({} units waited): {}",
                    range, attempts, waited, error
                );
                return Delivery::Exhausted {
                    attempts,
                    waited,
                    last_error: error.to_string(),
                };
            }

            let wait = backoff.next().unwrap_or(self.policy.max_backoff);
            warn!("Write to {} failed: {}; retrying in {} units", range, error, wait);

            let units = u32::try_from(wait).unwrap_or(u32::MAX);
            tokio::time::sleep(self.policy.unit.saturating_mul(units)).await;
            waited += wait;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SheetsError;
    use crate::models::record::{CellRange, GstType};
    use crate::sheets::{Result, UpdateValuesResponse};
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Fails the first `failures` calls, then succeeds.
    struct FlakyApi {
        failures: u32,
        calls: Mutex<Vec<(Instant, String, Vec<String>)>>,
    }

    impl FlakyApi {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn always_failing() -> Self {
            Self::new(u32::MAX)
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        /// Seconds between consecutive calls.
        fn gaps(&self) -> Vec<u64> {
            let calls = self.calls.lock().unwrap();
            calls
                .windows(2)
                .map(|w| (w[1].0 - w[0].0).as_secs())
                .collect()
        }
    }

    impl ValuesApi for FlakyApi {
        async fn update_values(
            &self,
            _spreadsheet_id: &str,
            range: &str,
            values: &[String],
        ) -> Result<UpdateValuesResponse> {
            let mut calls = self.calls.lock().unwrap();
            calls.push((Instant::now(), range.to_string(), values.to_vec()));

            if calls.len() as u32 <= self.failures {
                Err(SheetsError::Status {
                    status: 503,
                    body: "backend unavailable".to_string(),
                })
            } else {
                Ok(UpdateValuesResponse {
                    updated_cells: Some(values.len() as u32),
                    ..Default::default()
                })
            }
        }
    }

    fn record() -> InvoiceLineRecord {
        InvoiceLineRecord {
            supplier_id: "22AAICA7413H1ZX".to_string(),
            supplier_name: "ACME STEEL PVT LTD".to_string(),
            gst_type: GstType::Intra,
            gst_rate: Decimal::from(18),
            taxable_value: Decimal::from(15000),
            invoice_number: None,
            target_cell_range: CellRange::new("Sheet1", 8),
        }
    }

    #[test]
    fn test_backoff_sequence() {
        let waits: Vec<u64> = Backoff::new(32).take(9).collect();
        assert_eq!(waits, vec![1, 2, 4, 8, 16, 32, 32, 32, 32]);
    }

    #[test]
    fn test_backoff_never_exceeds_cap() {
        assert!(Backoff::new(32).take(200).all(|w| w <= 32));
        assert_eq!(Backoff::new(5).take(4).collect::<Vec<_>>(), vec![1, 2, 4, 5]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_attempt_succeeds() {
        let writer = RowWriter::new(FlakyApi::new(0), "sheet-id", RetryPolicy::default());
        let start = Instant::now();

        let delivery = writer.write(&record()).await;

        assert_eq!(
            delivery,
            Delivery::Written {
                updated_cells: Some(4),
                attempts: 1
            }
        );
        assert_eq!(start.elapsed().as_millis(), 0);

        let calls = writer.api().calls.lock().unwrap();
        assert_eq!(calls[0].1, "Sheet1!A8:D8");
        assert_eq!(calls[0].2[0], "22AAICA7413H1ZX  ACME STEEL PVT LTD");
        assert_eq!(calls[0].2[2], "INTRA");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_with_doubling_waits() {
        let writer = RowWriter::new(FlakyApi::new(7), "sheet-id", RetryPolicy::default());

        let delivery = writer.write(&record()).await;

        assert!(delivery.is_written());
        assert_eq!(delivery.attempts(), 8);
        assert_eq!(writer.api().gaps(), vec![1, 2, 4, 8, 16, 32, 32]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_at_deadline() {
        let writer = RowWriter::new(FlakyApi::always_failing(), "sheet-id", RetryPolicy::default());
        let start = Instant::now();

        let delivery = writer.write(&record()).await;

        // 1+2+4+8+16 then nine waits of 32 reach 319 >= 300.
        match delivery {
            Delivery::Exhausted {
                attempts,
                waited,
                last_error,
            } => {
                assert_eq!(attempts, 15);
                assert_eq!(waited, 319);
                assert!(last_error.contains("503"));
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
        assert_eq!(writer.api().call_count(), 15);
        assert_eq!(start.elapsed().as_secs(), 319);
    }

    #[tokio::test(start_paused = true)]
    async fn test_longer_deadline() {
        let policy = RetryPolicy {
            deadline: 600,
            ..RetryPolicy::default()
        };
        let writer = RowWriter::new(FlakyApi::always_failing(), "sheet-id", policy);

        let delivery = writer.write(&record()).await;

        // 31 + 18 * 32 = 607.
        assert_eq!(delivery.attempts(), 24);
        assert!(matches!(delivery, Delivery::Exhausted { waited: 607, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_deadline_tries_once() {
        let policy = RetryPolicy {
            deadline: 0,
            ..RetryPolicy::default()
        };
        let writer = RowWriter::new(FlakyApi::always_failing(), "sheet-id", policy);

        let delivery = writer.write(&record()).await;

        assert!(matches!(delivery, Delivery::Exhausted { attempts: 1, waited: 0, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unit_scales_waits() {
        let policy = RetryPolicy {
            unit: Duration::from_millis(10),
            ..RetryPolicy::default()
        };
        let writer = RowWriter::new(FlakyApi::new(3), "sheet-id", policy);
        let start = Instant::now();

        assert!(writer.write(&record()).await.is_written());
        assert_eq!(start.elapsed().as_millis(), 70);
    }
}
