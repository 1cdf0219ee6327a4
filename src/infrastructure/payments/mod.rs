//! Payment approval delegated to an external payment gateway.
//!
//! - [`PaymentGateway`] - trait used by the order service
//! - [`TossPayments`] - Toss Payments REST implementation

mod gateway;
mod toss;

pub use gateway::{GatewayError, GatewayPayment, GatewayPaymentStatus, PaymentGateway};
pub use toss::TossPayments;

#[cfg(test)]
pub use gateway::MockPaymentGateway;
