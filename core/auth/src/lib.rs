// Copyright AGNTCY Contributors (https://github.com/agntcy)
// SPDX-License-Identifier: Apache-2.0

pub mod builder;
pub mod cache;
pub mod config;
pub mod errors;
pub mod fetcher;
pub mod keyset;
pub mod signature;
pub mod token;
pub mod traits;
pub mod verifier;
