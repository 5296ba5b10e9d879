pub mod midtrans;

pub use midtrans::{
    signature_matches, DisabledGateway, GatewayNotification, MidtransClient, SnapGateway,
    SnapRequest,
};

#[cfg(any(test, feature = "test-utils"))]
pub use midtrans::{compute_signature, FakeSnapGateway};
