// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! qs-storage: durable storage for the quicksilver scheduler
//!
//! Tasks and executions are kept as a JSON-lines write-ahead log shared by
//! every scheduler process on the host.

mod state;
mod store;
mod wal;

pub use state::MaterializedState;
pub use store::Store;
pub use wal::{Wal, WalError, WalLock};
