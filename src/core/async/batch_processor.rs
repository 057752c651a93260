//! Batch processing with payment-based partitioning for concurrent replay
//!
//! This module provides the `BatchProcessor` struct, which replays a batch of
//! operations with payments processed in parallel while producing exactly the
//! state a sequential replay would.
//!
//! # Design
//!
//! A batch is split into runs at every group-level operation: creating,
//! retitling or deleting a group, joining, and creating or deleting a payment.
//! Those operations are barriers:
//! everything before them finishes, then they are applied on their own. The
//! payment-level operations between two barriers are partitioned by payment
//! and each partition is applied in a separate tokio task, in log order.
//!
//! ```text
//! group  join  join  payment  payment | set p1  set p2  insert p1 ... | delete | set p2 ...
//! \________ barriers, in order _____/ \____ one task per payment ___/  barrier  \__ ... __/
//! ```
//!
//! Payment-level operations on different payments touch disjoint state, and
//! barriers keep membership fixed while a run is in flight, so the outcome of
//! every operation matches the sequential replay.
//!
//! # Thread Safety
//!
//! The processor is cloneable and can be safely shared across async tasks.
//! All internal state is protected by Arc, and the underlying engine uses
//! thread-safe components.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error};

use super::AsyncLedgerEngine;
use crate::types::{EditOutcome, LedgerError, OperationRecord, PaymentId};

/// Result of processing a single operation
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// The operation that was processed
    pub record: OperationRecord,

    /// What the operation did, or why it was rejected
    pub result: Result<EditOutcome, LedgerError>,
}

/// Batch processor with payment-based partitioning
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    /// Thread-safe ledger engine
    ///
    /// Wrapped in Arc to enable sharing across async tasks.
    engine: Arc<AsyncLedgerEngine>,
}

impl BatchProcessor {
    /// Create a new BatchProcessor
    ///
    /// # Arguments
    ///
    /// * `engine` - Arc-wrapped AsyncLedgerEngine for operation processing
    pub fn new(engine: Arc<AsyncLedgerEngine>) -> Self {
        Self { engine }
    }

    /// Partition a run of payment-level operations by payment
    ///
    /// Each partition keeps the relative order the operations had in the run.
    /// Operations without a payment scope are not expected here; they are
    /// placed in no partition.
    pub fn partition_by_payment(
        &self,
        run: Vec<OperationRecord>,
    ) -> HashMap<PaymentId, Vec<OperationRecord>> {
        let mut partitions: HashMap<PaymentId, Vec<OperationRecord>> = HashMap::new();

        for record in run {
            if let Some(payment) = record.operation.payment_scope() {
                partitions
                    .entry(payment.clone())
                    .or_default()
                    .push(record);
            }
        }

        partitions
    }

    /// Apply one payment's operations sequentially, in order
    pub async fn process_payment_operations(
        &self,
        operations: Vec<OperationRecord>,
    ) -> Vec<ProcessingResult> {
        let mut results = Vec::with_capacity(operations.len());

        for record in operations {
            let result = self.engine.process(record.clone());
            results.push(ProcessingResult { record, result });
        }

        results
    }

    /// Apply a run of payment-level operations, one task per payment
    async fn process_run(&self, run: Vec<OperationRecord>) -> Vec<ProcessingResult> {
        let partitions = self.partition_by_payment(run);
        debug!(payments = partitions.len(), "processing run");

        let mut tasks = Vec::with_capacity(partitions.len());
        for (_payment, operations) in partitions {
            let processor = self.clone();
            tasks.push(tokio::spawn(async move {
                processor.process_payment_operations(operations).await
            }));
        }

        let mut results = Vec::new();
        for task in tasks {
            match task.await {
                Ok(payment_results) => results.extend(payment_results),
                Err(e) => error!(error = ?e, "payment task panicked"),
            }
        }
        results
    }

    /// Process a batch of operations
    ///
    /// # Returns
    ///
    /// One result per operation, ordered by log line.
    pub async fn process_batch(&self, batch: Vec<OperationRecord>) -> Vec<ProcessingResult> {
        let mut results = Vec::with_capacity(batch.len());
        let mut run = Vec::new();

        for record in batch {
            if record.operation.payment_scope().is_some() {
                run.push(record);
                continue;
            }

            if !run.is_empty() {
                results.extend(self.process_run(std::mem::take(&mut run)).await);
            }
            let result = self.engine.process(record.clone());
            results.push(ProcessingResult { record, result });
        }

        if !run.is_empty() {
            results.extend(self.process_run(run).await);
        }

        results.sort_by_key(|r| r.record.line);
        results
    }
}
