// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client-generated identifiers.
//!
//! IDs follow the hosted SDK's `ID.unique()` layout: hex seconds, five hex
//! digits of milliseconds, then random hex padding. They sort roughly by
//! creation time and fit the backend's 36-character ID limit.

use chrono::Utc;
use ring::error::Unspecified;
use ring::rand::{SecureRandom, SystemRandom};

const PADDING: usize = 7;

/// Generate a new unique document/file/account ID.
pub fn unique() -> Result<String, Unspecified> {
    let now = Utc::now();
    let mut id = format!(
        "{:x}{:05x}",
        now.timestamp(),
        now.timestamp_subsec_millis()
    );
    id.push_str(&random_hex(PADDING)?);
    Ok(id)
}

/// Random hex string of exactly `len` characters.
pub fn random_hex(len: usize) -> Result<String, Unspecified> {
    let mut bytes = vec![0u8; len.div_ceil(2)];
    SystemRandom::new().fill(&mut bytes)?;
    let mut out = hex::encode(bytes);
    out.truncate(len);
    Ok(out)
}
