//! Capability traits the Payment Orchestrator programs against, rather than
//! a concrete transport. `payment-orchestrator` provides the real
//! `reqwest`-backed implementation; tests provide an in-memory one —
//! dynamic dispatch over stores (§9), applied at the RPC-client seam.

use crate::dto::*;
use crate::error::Result;
use async_trait::async_trait;

/// Client view of the Ledger RPC surface (§6.1), as consumed by the saga.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn get_balance(&self, req: GetBalanceRequest) -> Result<GetBalanceResponse>;
    async fn reserve_balance(&self, req: ReserveBalanceRequest) -> Result<ReserveBalanceResponse>;
    async fn commit_reservation(&self, req: CommitReservationRequest) -> Result<()>;
    async fn release_reservation(&self, req: ReleaseReservationRequest) -> Result<()>;
    async fn credit_balance(&self, req: CreditBalanceRequest) -> Result<CreditBalanceResponse>;
}

/// Client view of the Transaction Record surface (§6.2). In this repo the
/// Transaction Record Store lives in-process inside the orchestrator, but
/// the trait boundary is kept distinct per §6.4's configuration surface so
/// that splitting it into its own service later is a wiring change, not a
/// saga rewrite.
#[async_trait]
pub trait TransactionRecordClient: Send + Sync {
    async fn create_transaction(
        &self,
        req: CreateTransactionRequest,
    ) -> Result<CreateTransactionResponse>;
    async fn complete_transaction(&self, req: CompleteTransactionRequest) -> Result<()>;
    async fn fail_transaction(&self, req: FailTransactionRequest) -> Result<()>;
}
