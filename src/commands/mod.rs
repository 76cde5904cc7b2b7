// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod audit;
pub mod backup;
pub mod config;
pub mod counterparties;
pub mod doctor;
pub mod exporter;
pub mod payments;
pub mod reminders;
pub mod reports;
pub mod tasks;
pub mod transactions;
