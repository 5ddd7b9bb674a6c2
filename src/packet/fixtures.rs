use std::str::FromStr;
use std::time::{Duration, SystemTime};

use once_cell::sync::Lazy;

use super::{
    Address, ErrorCode, Fulfill, FulfillBuilder, Prepare, PrepareBuilder, Reject, RejectBuilder,
};

pub static DATA: &[u8] = b"\x6c\x99\xf6\xa9\x69\x47\x31\x23\x07\x6a\x55\x3d\x27\x1e\xb2\x07\x52\x1f\x6a\x5c";
pub static EXECUTION_CONDITION: [u8; 32] = *b"\x11\x7b\x43\x4f\x1a\x54\xe9\x04\x4f\x4f\x54\x92\x3b\x2c\xff\x9e\x4a\x6d\x42\x0a\xe2\x81\xd5\x02\x5d\x7b\xb0\x40\xc4\xb4\xc0\x4a";
pub static FULFILLMENT: [u8; 32] = *b"\x11\x7b\x43\x4f\x1a\x54\xe9\x04\x4f\x4f\x54\x92\x3b\x2c\xff\x9e\x4a\x6d\x42\x0a\xe2\x81\xd5\x02\x5d\x7b\xb0\x40\xc4\xb4\xc0\x4a";

/// 2017-11-23T00:42:09Z
pub static EXPIRES_AT: Lazy<SystemTime> =
    Lazy::new(|| SystemTime::UNIX_EPOCH + Duration::from_secs(1_511_397_729));

pub static PREPARE_BUILDER: Lazy<PrepareBuilder<'static>> = Lazy::new(|| PrepareBuilder {
    amount: 107,
    expires_at: *EXPIRES_AT,
    execution_condition: &EXECUTION_CONDITION,
    destination: Address::from_str("example.alice").unwrap(),
    data: DATA,
});
pub static PREPARE: Lazy<Prepare> = Lazy::new(|| PREPARE_BUILDER.build());

pub static FULFILL: Lazy<Fulfill> = Lazy::new(|| {
    FulfillBuilder {
        fulfillment: &FULFILLMENT,
        data: DATA,
    }
    .build()
});

pub static CONNECTOR: Lazy<Address> =
    Lazy::new(|| Address::from_str("example.connector").unwrap());

pub static REJECT: Lazy<Reject> = Lazy::new(|| {
    RejectBuilder {
        code: ErrorCode::F99_APPLICATION_ERROR,
        message: b"Some error",
        triggered_by: Some(&*CONNECTOR),
        data: DATA,
    }
    .build()
});
