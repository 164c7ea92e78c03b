// src/services/mod.rs
//
// External collaborators consumed by the core: payment checkout, file
// storage and transactional mail. Each is a narrow trait injected through
// AppState so handlers never talk to a concrete SaaS client directly.

pub mod notifier;
pub mod payment;
pub mod storage;

pub use notifier::{HttpNotifier, LogNotifier, Notifier};
pub use payment::{
    CheckoutRequest, CheckoutSession, DisabledPayments, PaymentConfirmation, PaymentGateway,
    StripeGateway,
};
pub use storage::{DisabledFileStore, FileStore, HttpFileStore};
