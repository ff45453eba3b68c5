// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Built-in Dataflow Operations
//!
//! The operations whose logic is dataflow mechanics rather than domain
//! work: field plumbing (`link`), count-reducing predicates (`filter`),
//! N→1 reduction (`collapse`), 1→N flatmap (`explode`), and pass-through
//! logging (`log`). They earn built-in status because each interacts
//! non-trivially with contract checking — dynamic declarations resolved
//! from the prefix schema, count-change flags, and delete contracts.

pub mod collapse;
pub mod explode;
pub mod filter;
pub mod link;
pub mod log;

pub use collapse::{CollapseMode, CollapseOperation};
pub use explode::ExplodeOperation;
pub use filter::FilterOperation;
pub use link::LinkOperation;
pub use log::LogOperation;
