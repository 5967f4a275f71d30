// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Darkroom-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Darkroom and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Darkroom: bookings and per-booking photo galleries for a photography studio.
//!
//! Uploads land in a [`store::FileStore`] under disambiguated names, each gallery's ledger keeps
//! the names clients uploaded, and [`gallery::Reconciler`] maps ledger references (including
//! older record shapes) back to stored files for listings and zip downloads.

pub mod config;
pub mod gallery;
pub mod http;
pub mod model;
pub mod store;
