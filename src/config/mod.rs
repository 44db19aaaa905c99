// ABOUTME: Configuration management module
// ABOUTME: Environment-driven settings for server, Redis, and deployment mode
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quotagate

/// Environment-based configuration management
pub mod environment;
