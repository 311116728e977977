// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Interactions with the session storage backend
//!
//! Visitor sessions are accessed through the [`SessionStore`] trait, which
//! exposes the values of a single session as JSON values with get/set/remove
//! operations, and persists them on [`SessionStore::save`]. Stores are opened
//! by a [`SessionStoreFactory`], which holds each session exclusively until
//! its store is dropped, so that a request can read, update and save its
//! session without interference.
//!
//! The age gate state of a session (its verification tokens, outcome and last
//! pass marker) is managed through [`GateSession`], which wraps a
//! [`BoxSessionStore`].
//!
//! The only backend is [`MemorySessionStoreFactory`], which keeps sessions in
//! memory and forgets them after a period of inactivity.

#![deny(clippy::future_not_send, missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod gate;
pub mod memory;
mod store;

pub use self::{
    gate::GateSession,
    memory::MemorySessionStoreFactory,
    store::{
        BoxSessionStore, BoxSessionStoreFactory, SessionStore, SessionStoreError,
        SessionStoreFactory,
    },
};
