// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod all_time;
pub mod allocation;
pub mod cache;
pub mod calc;
pub mod chain;
pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod models;
pub mod money;
pub mod period;
pub mod storage;
pub mod transfer;
pub mod utils;
pub mod window;
