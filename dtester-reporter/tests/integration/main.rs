// Copyright (c) The dtester Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

mod fixtures;
mod scenarios;
