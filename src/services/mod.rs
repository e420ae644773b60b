// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - platform clients and business logic.

pub mod account;
pub mod identity;
pub mod location;
pub mod profile;
pub mod storage;

pub use account::{AccountService, Registration};
pub use identity::FirebaseAuthClient;
pub use location::ReportedPosition;
pub use profile::{PhotoUpload, ProfileEdit, ProfileService};
pub use storage::FirebaseStorageClient;
