pub mod identity;
pub mod payments;
pub mod storage;

pub use identity::{HttpIdentity, IdentityError, IdentityProvider, VerifiedIdentity};
pub use payments::{
    CheckoutMode, CheckoutRequest, CheckoutSession, HttpPayments, PaymentsError,
    PaymentsProvider,
};
#[allow(unused_imports)]
pub use payments::Subscription;
pub use storage::{HttpStorage, ObjectStorage, StorageError};
