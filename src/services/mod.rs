//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! Each one is constructed with its store (and configuration where needed)
//! — there is no process-wide state. They either complete successfully or
//! return a typed `AppError`; recovery happens only at the API boundary,
//! except for the escrow service's explicit compensation steps.

pub mod escrow_service;
pub mod ledger_service;
pub mod transaction_service;
pub mod wallet_service;

pub use escrow_service::EscrowService;
pub use ledger_service::LedgerService;
pub use transaction_service::TransactionService;
pub use wallet_service::WalletService;
