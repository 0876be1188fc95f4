use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::transport::{DEFAULT_TIMEOUT, Transport};
use crate::core::{Clock, Config, EetError, FiscalCodes, Response, SaleRecord, SystemClock};
use crate::soap::{self, EnvelopeOptions, ParseOptions};

/// Where one submission attempt left a record.
#[derive(Debug)]
pub enum DeliveryOutcome {
    /// The authority issued a FIK. Terminal.
    Registered {
        record: SaleRecord,
        response: Response,
    },
    /// The authority answered with an error payload. Terminal —
    /// resubmitting an incorrect sale is a business decision, so the
    /// scheduler never retries it. The codes stay valid for the receipt.
    Rejected {
        record: SaleRecord,
        response: Response,
    },
    /// Transport failed or the reply could not be trusted; the record
    /// sits in the retry queue with its first-submission flag cleared.
    Pending { codes: FiscalCodes },
}

impl DeliveryOutcome {
    /// The offline codes the receipt must print, available in every
    /// outcome. `None` only for a record that was never built.
    pub fn codes(&self) -> Option<&FiscalCodes> {
        match self {
            Self::Registered { record, .. } | Self::Rejected { record, .. } => {
                record.codes.as_ref()
            }
            Self::Pending { codes } => Some(codes),
        }
    }

    /// Whether the authority produced a definitive answer.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending { .. })
    }
}

/// Drives registration over an injected [`Transport`], keeping failed
/// records in an in-memory FIFO retry queue.
///
/// One record is never in flight twice: submissions own their record
/// until it is either returned in a terminal outcome or parked in the
/// queue, and a dispatch pass removes records from the queue before
/// attempting them. Passes are serialized, so a pass always runs to
/// completion over its snapshot before the next one starts — later
/// records cannot be starved.
pub struct Scheduler<T: Transport, C: Clock = SystemClock> {
    config: Config,
    transport: T,
    clock: C,
    timeout: Duration,
    verify_playground: bool,
    queue: Mutex<VecDeque<SaleRecord>>,
    pass_lock: Mutex<()>,
}

impl<T: Transport> Scheduler<T, SystemClock> {
    pub fn new(config: Config, transport: T) -> Self {
        Self::with_clock(config, transport, SystemClock)
    }
}

impl<T: Transport, C: Clock> Scheduler<T, C> {
    pub fn with_clock(config: Config, transport: T, clock: C) -> Self {
        Self {
            config,
            transport,
            clock,
            timeout: DEFAULT_TIMEOUT,
            verify_playground: false,
            queue: Mutex::new(VecDeque::new()),
            pass_lock: Mutex::new(()),
        }
    }

    /// Per-attempt transport timeout (default 3 s).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Verify response signatures even in playground mode. Production
    /// responses are always verified; playground ones skip only the
    /// asymmetric signature check by default, since the playground signs
    /// with test material.
    pub fn verify_playground_responses(mut self, verify: bool) -> Self {
        self.verify_playground = verify;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Records currently waiting for a dispatch pass.
    pub fn pending(&self) -> usize {
        self.lock_queue().len()
    }

    /// First submission of a record. Build failures (validation,
    /// signing) surface immediately — they never reach the network.
    /// Everything after a successful build maps to an outcome.
    pub fn submit(&self, mut record: SaleRecord) -> Result<DeliveryOutcome, EetError> {
        let bytes = soap::build_envelope(
            &mut record,
            &self.config,
            self.clock.now(),
            &EnvelopeOptions::default(),
        )?;
        let codes = record
            .codes
            .clone()
            .ok_or_else(|| EetError::Crypto("fiscal codes missing after build".into()))?;
        match self.try_deliver(record, &bytes) {
            Ok(outcome) => Ok(outcome),
            Err(record) => {
                self.lock_queue().push_back(*record);
                Ok(DeliveryOutcome::Pending { codes })
            }
        }
    }

    /// Re-attempt every queued record in insertion order. Records that
    /// fail again keep their original relative order, ahead of anything
    /// submitted while the pass ran; terminal outcomes leave the queue.
    pub fn dispatch_pending(&self) -> Vec<DeliveryOutcome> {
        let _pass = self.pass_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let batch: Vec<SaleRecord> = self.lock_queue().drain(..).collect();
        let mut outcomes = Vec::with_capacity(batch.len());
        let mut retained: Vec<SaleRecord> = Vec::new();

        for mut record in batch {
            let attempt = match soap::build_envelope(
                &mut record,
                &self.config,
                self.clock.now(),
                &EnvelopeOptions::default(),
            ) {
                Ok(bytes) => self.try_deliver(record, &bytes),
                // local failure: leave the record queued rather than
                // lose it
                Err(_) => Err(Box::new(record)),
            };
            match attempt {
                Ok(outcome) => outcomes.push(outcome),
                Err(record) => {
                    if let Some(codes) = record.codes.clone() {
                        outcomes.push(DeliveryOutcome::Pending { codes });
                    }
                    retained.push(*record);
                }
            }
        }

        let mut queue = self.lock_queue();
        for record in retained.into_iter().rev() {
            queue.push_front(record);
        }
        outcomes
    }

    /// One network attempt. `Err` hands the record back with its
    /// first-submission flag cleared, ready for the queue.
    fn try_deliver(
        &self,
        record: SaleRecord,
        bytes: &[u8],
    ) -> Result<DeliveryOutcome, Box<SaleRecord>> {
        let url = super::endpoint(self.config.mode());
        let reply = match self.transport.post(url, bytes, self.timeout) {
            Ok(reply) => reply,
            Err(_) => return Err(park(record)),
        };

        let options = ParseOptions {
            ignore_invalid_cert: !self.config.mode().is_production() && !self.verify_playground,
            now: Some(self.clock.now()),
        };
        let response = match soap::parse_response(&reply, &options) {
            Ok(response) => response,
            // The reply, not the submission, was untrustworthy; the
            // record counts as not yet delivered.
            Err(_) => return Err(park(record)),
        };

        // A reply echoing someone else's BKP does not belong to this
        // record.
        if let (Some(echo), Some(codes)) = (&response.header.short_code, &record.codes) {
            if echo != &codes.bkp {
                return Err(park(record));
            }
        }

        if response.error.is_some() {
            Ok(DeliveryOutcome::Rejected { record, response })
        } else if response.confirmation.is_some() {
            Ok(DeliveryOutcome::Registered { record, response })
        } else {
            Err(park(record))
        }
    }

    fn lock_queue(&self) -> MutexGuard<'_, VecDeque<SaleRecord>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn park(mut record: SaleRecord) -> Box<SaleRecord> {
    record.header.first_submission = false;
    Box::new(record)
}
