// SPDX-License-Identifier: Apache-2.0

//! Bootstrap pieces shared by the simulator binary and its integration
//! tests: the sample ladder program and its name registry.

pub mod modules;
